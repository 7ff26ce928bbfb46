//! Deploys the `AAFactory`, has it create a `PasskeyAccount` and funds the
//! new account.
//!
//! Reads its configuration from the environment, or from a `.env` file in
//! the working directory. `DEPLOYER_PRIVATE_KEY` is required.
use eyre::WrapErr;
use passkey_deploy::{environment::ProvisionConfig, provision};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config =
        ProvisionConfig::from_env().wrap_err("failed to load configuration")?;
    let provisioned = provision::run(&config)
        .await
        .wrap_err("failed to provision account")?;

    println!("AA factory address: {}", provisioned.factory);
    println!("account: \"{}\",", provisioned.account);
    println!("funded with {} wei", provisioned.funding);
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(env_filter).try_init();
}
