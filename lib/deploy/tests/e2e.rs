#![cfg(feature = "e2e")]
//! Runs against a live node at `RPC_URL` with a rich account in
//! `DEPLOYER_PRIVATE_KEY` and compiled artifacts in `ARTIFACTS_DIR`.

use alloy::primitives::{Address, B256};
use eyre::{Result, WrapErr};
use passkey_deploy::{
    artifact::ArtifactStore,
    contract::Factory,
    environment::ProvisionConfig,
    provision::provision,
    Account, Error, HttpNode, Node,
};

fn connect() -> Result<(ProvisionConfig, Account<HttpNode>)> {
    let config =
        ProvisionConfig::from_env().wrap_err("failed to load configuration")?;
    let node = HttpNode::connect(&config.rpc_url, &config.node)?;
    let account = Account::new(config.signer.clone(), node);
    Ok((config, account))
}

// ============================================================================
// Integration Tests: live node
// ============================================================================

#[tokio::test]
async fn provisions_and_funds_account() -> Result<()> {
    let (config, deployer) = connect()?;
    let store = ArtifactStore::new(&config.artifacts_dir);
    // Salt 0 can only be used once per factory, and every run deploys a
    // fresh factory.
    let provisioned = provision(&deployer, &store, &config.provisioning).await?;

    assert_ne!(provisioned.factory, Address::ZERO);
    assert_ne!(provisioned.account, Address::ZERO);
    assert!(!deployer.node().code(provisioned.account).await?.is_empty());

    let balance = deployer.node().balance(provisioned.account).await?;
    assert_eq!(balance, config.provisioning.funding);

    let factory = Factory::new(provisioned.factory, &deployer);
    let err = factory
        .deploy_account(
            config.provisioning.salt,
            config.provisioning.deploy_account_gas_limit,
        )
        .await
        .expect_err("should not create the same account twice");
    assert!(matches!(err, Error::TransactionReverted { .. }));

    Ok(())
}

#[tokio::test]
async fn fresh_salt_creates_another_account() -> Result<()> {
    let (config, deployer) = connect()?;
    let store = ArtifactStore::new(&config.artifacts_dir);
    let provisioned = provision(&deployer, &store, &config.provisioning).await?;

    let receipt = Factory::new(provisioned.factory, &deployer)
        .deploy_account(
            B256::repeat_byte(1),
            config.provisioning.deploy_account_gas_limit,
        )
        .await?;

    let created = receipt.deployed_contracts();
    assert_eq!(created.len(), 1);
    assert_ne!(created[0].address, provisioned.account);

    Ok(())
}
