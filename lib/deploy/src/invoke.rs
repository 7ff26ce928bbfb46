//! Calls `validateSignature` on a deployed validator.
use alloy::primitives::Address;
use tracing::info;

use crate::{
    account::Account,
    artifact::ArtifactStore,
    contract::{Invocation, SignatureArgs, Validator},
    environment::{InvokeConfig, Networks},
    error::Result,
    system::{HttpNode, Node},
};

/// Binds the validator at `address` with the interface of
/// `validator_artifact` and asks it to check `args`.
///
/// # Errors
///
/// * [`crate::Error::ArtifactNotFound`] if the interface is missing.
/// * [`crate::Error::TransactionReverted`] if there is no contract at
///   `address`, or the call reverts.
/// * [`crate::Error::ConnectionFailure`] if the node is unreachable.
pub async fn validate_signature<N: Node>(
    owner: &Account<N>,
    store: &ArtifactStore,
    validator_artifact: &str,
    address: Address,
    args: &SignatureArgs,
) -> Result<Invocation> {
    let artifact = store.load(validator_artifact)?;
    let validator = Validator::bind(address, &artifact, owner).await?;

    let invocation = validator.validate_signature(args).await?;
    info!(validator = %validator.address(), %invocation, "validator answered");
    Ok(invocation)
}

/// Connects to the network named in `config` and calls the validator.
///
/// # Errors
///
/// See [`validate_signature`]. Additionally fails with
/// [`crate::Error::UnknownNetwork`] if the network isn't defined.
pub async fn run(config: &InvokeConfig) -> Result<Invocation> {
    let networks = Networks::load(&config.networks_file)?;
    let network = networks.resolve(&config.network)?;
    let node = HttpNode::connect(&network.url, &config.node)?;
    info!(network = %config.network, url = %node.url(), "connected");

    let owner = Account::new(config.signer.clone(), node);
    let store = ArtifactStore::new(&config.artifacts_dir);
    validate_signature(
        &owner,
        &store,
        &config.validator_artifact,
        config.validator_address,
        &config.args,
    )
    .await
}
