use std::path::PathBuf;

use alloy::{
    primitives::{SignatureError, TxHash},
    transports::TransportError,
};

use crate::bytecode::BytecodeError;

/// Result alias used throughout this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can abort a provisioning or invocation run.
///
/// None of these are recovered from internally: they propagate to the
/// binary, which reports them and exits with a non-zero status.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The named contract artifact is missing from the artifact store.
    #[error("artifact `{name}` not found under {}", dir.display())]
    ArtifactNotFound {
        /// Contract name that was requested.
        name: String,
        /// Root of the artifact store that was searched.
        dir: PathBuf,
    },
    /// The artifact exists but can't be used as requested.
    #[error("invalid artifact `{name}`: {reason}")]
    InvalidArtifact {
        /// Contract name of the artifact.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
    /// Bytecode violates the rollup's bytecode format.
    #[error("invalid bytecode: {0}")]
    InvalidBytecode(#[from] BytecodeError),
    /// A transaction was rejected by the node or reverted on execution.
    #[error("transaction {} reverted: {reason}", display_hash(.tx_hash))]
    TransactionReverted {
        /// Hash of the transaction, if the node accepted it at all.
        tx_hash: Option<TxHash>,
        /// Node-provided reason or a description of the failure.
        reason: String,
    },
    /// A confirmed transaction carries no contract-creation record.
    #[error("transaction {0} did not deploy any contract")]
    DeployedAddressNotFound(TxHash),
    /// The node is unreachable or answered with something malformed.
    #[error("connection failure: {0}")]
    ConnectionFailure(String),
    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// The requested network name isn't defined in the networks file.
    #[error("network `{0}` is not defined")]
    UnknownNetwork(String),
    /// Signing failed.
    #[error(transparent)]
    Signer(#[from] alloy::signers::Error),
    /// A signature couldn't be parsed or recovered.
    #[error("invalid signature: {0}")]
    Signature(#[from] SignatureError),
    /// Malformed RLP transaction envelope.
    #[error("malformed transaction: {0}")]
    Rlp(#[from] alloy_rlp::Error),
}

impl Error {
    /// Shorthand for a [`Error::TransactionReverted`] without a hash.
    pub(crate) fn rejected(reason: impl Into<String>) -> Self {
        Self::TransactionReverted { tx_hash: None, reason: reason.into() }
    }

    /// Classifies a failed JSON-RPC request.
    ///
    /// An error response from the node means the node looked at the request
    /// and refused it, which for submissions and calls is a revert. Anything
    /// else never reached execution.
    pub(crate) fn from_rpc(err: TransportError) -> Self {
        if let Some(payload) = err.as_error_resp() {
            return Self::rejected(payload.message.to_string());
        }
        err.into()
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Self::ConnectionFailure(err.to_string())
    }
}

fn display_hash(tx_hash: &Option<TxHash>) -> String {
    tx_hash.map_or_else(|| "(not submitted)".to_owned(), |h| h.to_string())
}

#[cfg(test)]
mod tests {
    use alloy::transports::{TransportError, TransportErrorKind};

    use super::Error;

    #[test]
    fn error_response_is_a_revert() {
        let payload = serde_json::from_str(
            r#"{"code":3,"message":"execution reverted: account exists"}"#,
        )
        .unwrap();

        let err = Error::from_rpc(TransportError::ErrorResp(payload));

        assert!(matches!(
            err,
            Error::TransactionReverted { tx_hash: None, ref reason }
                if reason == "execution reverted: account exists"
        ));
    }

    #[test]
    fn transport_failure_is_a_connection_failure() {
        let err = Error::from_rpc(TransportErrorKind::custom_str(
            "connection refused",
        ));

        assert!(matches!(
            err,
            Error::ConnectionFailure(ref msg)
                if msg.contains("connection refused")
        ));
    }
}
