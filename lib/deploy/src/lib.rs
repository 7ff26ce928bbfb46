/*!
Provisioning and invocation of passkey smart accounts on zkSync Era.

Two procedures are exposed, each driven by explicit configuration:

- [`provision`] deploys an account factory, has it create one smart
  contract account and funds that account.
- [`invoke`] binds an already deployed signature validator and calls
  `validateSignature` on it.

Both talk to the rollup through a [`Node`]: [`HttpNode`] for a live node,
or any other implementation (e.g. an in-memory double in tests). Every
transaction is an EIP-712 (type `0x71`) transaction signed by an
[`Account`], so that bytecode can be published alongside deployments.

# Usage

```rust,no_run
use passkey_deploy::{environment::ProvisionConfig, provision};

# async fn example() -> passkey_deploy::Result<()> {
let config = ProvisionConfig::from_env()?;
let provisioned = provision::run(&config).await?;
println!("account: {}", provisioned.account);
# Ok(())
# }
```
*/

mod account;
pub mod address;
pub mod artifact;
pub mod bytecode;
pub mod contract;
mod deploy;
pub mod environment;
mod error;
pub mod invoke;
pub mod provision;
pub mod receipt;
mod system;
pub mod transaction;

pub use account::Account;
pub use deploy::Deployer;
pub use error::{Error, Result};
pub use system::{HttpNode, Node, CONTRACT_DEPLOYER_ADDRESS};
