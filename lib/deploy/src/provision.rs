//! Deploys an account factory, creates one account with it and funds the
//! account.
use alloy::{
    primitives::{Address, U256},
    sol_types::SolConstructor,
};
use tracing::info;

use crate::{
    account::Account,
    artifact::ArtifactStore,
    contract::{AAFactory, DeployedContract, Factory},
    environment::{ProvisionConfig, Provisioning},
    error::{Error, Result},
    system::{HttpNode, Node},
};

/// Outcome of a provisioning run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Provisioned {
    /// The deployed account factory.
    pub factory: Address,
    /// The account created by the factory.
    pub account: Address,
    /// Wei transferred to the account.
    pub funding: U256,
}

/// Provisions one account on behalf of `deployer`.
///
/// Both artifacts are loaded before anything is submitted. Every transaction
/// is awaited until confirmed; the first failure aborts the run.
///
/// # Errors
///
/// * [`Error::ArtifactNotFound`] if an artifact is missing.
/// * [`Error::TransactionReverted`] if a transaction is rejected or reverts.
/// * [`Error::DeployedAddressNotFound`] if the factory creates no account.
/// * [`Error::ConnectionFailure`] if the node is unreachable or a
///   transaction doesn't confirm in time.
pub async fn provision<N: Node>(
    deployer: &Account<N>,
    store: &ArtifactStore,
    provisioning: &Provisioning,
) -> Result<Provisioned> {
    let factory_artifact = store.load(&provisioning.factory_artifact)?;
    let account_artifact = store.load(&provisioning.account_artifact)?;
    let account_hash = account_artifact.bytecode_hash()?;

    let mut factory_deps = store.factory_deps(&factory_artifact)?;
    factory_deps.push(account_artifact.bytecode.clone());

    let ctr_args = AAFactory::constructorCall { aaBytecodeHash: account_hash }
        .abi_encode();
    let (_, factory_address) = deployer
        .as_deployer()
        .with_constructor(ctr_args)
        .with_factory_deps(factory_deps)
        .deploy(&factory_artifact)
        .await?;
    info!(address = %factory_address, "AA factory deployed");

    let factory = Factory::new(factory_address, deployer);
    let receipt = factory
        .deploy_account(
            provisioning.salt,
            provisioning.deploy_account_gas_limit,
        )
        .await?;
    // The account's own constructor may deploy further contracts; the
    // account is the first one created.
    let account_address = receipt
        .deployed_contracts()
        .first()
        .map(|deployment| deployment.address)
        .ok_or(Error::DeployedAddressNotFound(receipt.transaction_hash))?;
    let account =
        DeployedContract::new(account_address, account_artifact.abi, deployer);
    info!(address = %account.address(), "account created");

    info!(value = %provisioning.funding, "funding account");
    account.fund(provisioning.funding).await?;

    info!(
        factory = %factory.address(),
        account = %account.address(),
        "provisioning done"
    );
    Ok(Provisioned {
        factory: factory.address(),
        account: account.address(),
        funding: provisioning.funding,
    })
}

/// Connects to the node in `config` and provisions an account.
///
/// # Errors
///
/// See [`provision`]. Additionally fails with [`Error::Config`] if the
/// RPC URL is malformed.
pub async fn run(config: &ProvisionConfig) -> Result<Provisioned> {
    let node = HttpNode::connect(&config.rpc_url, &config.node)?;
    info!(url = %node.url(), "connected");

    let deployer = Account::new(config.signer.clone(), node);
    let store = ArtifactStore::new(&config.artifacts_dir);
    provision(&deployer, &store, &config.provisioning).await
}
