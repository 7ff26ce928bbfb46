use alloy::{
    primitives::{Address, Bytes, B256},
    sol_types::SolCall,
};
use tracing::info;

use crate::{
    account::Account,
    artifact::Artifact,
    contract::IContractDeployer,
    error::Result,
    receipt::Receipt,
    system::{Node, CONTRACT_DEPLOYER_ADDRESS},
    transaction::TxRequest,
};

/// A basic smart contract deployer.
///
/// Deployments go through the contract deployer system contract, which only
/// accepts bytecode that was published alongside the transaction.
#[derive(Debug)]
pub struct Deployer<'a, N> {
    account: &'a Account<N>,
    ctr_args: Option<Bytes>,
    factory_deps: Vec<Bytes>,
}

impl<'a, N: Node> Deployer<'a, N> {
    /// A deployer sending on behalf of `account`.
    #[must_use]
    pub fn new(account: &'a Account<N>) -> Self {
        Self { account, ctr_args: None, factory_deps: Vec::new() }
    }

    /// Add ABI-encoded constructor arguments to the deployer.
    #[must_use]
    pub fn with_constructor(mut self, ctr_args: impl Into<Bytes>) -> Self {
        self.ctr_args = Some(ctr_args.into());
        self
    }

    /// Publish additional bytecodes with the deployment, for contracts the
    /// deployed contract creates itself.
    #[must_use]
    pub fn with_factory_deps(mut self, factory_deps: Vec<Bytes>) -> Self {
        self.factory_deps = factory_deps;
        self
    }

    /// Deploys the contract in `artifact` and waits for confirmation.
    /// Consumes currently configured deployer.
    ///
    /// # Errors
    ///
    /// May error if:
    ///
    /// - The artifact's bytecode is malformed.
    /// - The transaction is rejected, reverts or doesn't confirm.
    /// - The receipt records no deployment.
    pub async fn deploy(
        self,
        artifact: &Artifact,
    ) -> Result<(Receipt, Address)> {
        let bytecode_hash = artifact.bytecode_hash()?;
        let input = IContractDeployer::createCall {
            salt: B256::ZERO,
            bytecodeHash: bytecode_hash,
            input: self.ctr_args.unwrap_or_default(),
        }
        .abi_encode();

        let mut factory_deps = vec![artifact.bytecode.clone()];
        for dep in self.factory_deps {
            if !factory_deps.contains(&dep) {
                factory_deps.push(dep);
            }
        }

        info!(
            contract = %artifact.contract_name,
            %bytecode_hash,
            factory_deps = factory_deps.len(),
            "deploying contract"
        );
        let request = TxRequest::new(CONTRACT_DEPLOYER_ADDRESS)
            .with_data(input)
            .with_factory_deps(factory_deps);
        let receipt = self.account.send(request).await?;
        let address = receipt.deployed_address()?;

        info!(
            contract = %artifact.contract_name,
            %address,
            "deployed contract"
        );
        Ok((receipt, address))
    }
}
