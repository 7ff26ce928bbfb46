//! Transaction receipts and the contract deployments they record.
use alloy::{
    primitives::{Address, Bytes, TxHash, B256, U64},
    sol_types::SolEvent,
};
use serde::{Deserialize, Serialize};

use crate::{
    contract::IContractDeployer::ContractDeployed,
    error::{Error, Result},
    system::CONTRACT_DEPLOYER_ADDRESS,
};

/// The parts of an `eth_getTransactionReceipt` response this crate reads.
///
/// Rollup receipts carry additional fields (L1 batch info, L2 to L1 logs)
/// that are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Hash of the transaction.
    pub transaction_hash: TxHash,
    /// Block the transaction was included in. `None` while pending.
    #[serde(default)]
    pub block_number: Option<U64>,
    /// `1` on success, `0` on revert.
    #[serde(default)]
    pub status: Option<U64>,
    /// Set by the node for deployment transactions.
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// Emitted logs.
    #[serde(default)]
    pub logs: Vec<Log>,
}

/// An emitted log.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Log {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics, event signature first.
    pub topics: Vec<B256>,
    /// Non-indexed data.
    pub data: Bytes,
}

/// A `ContractDeployed` record emitted by the contract deployer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContractDeployment {
    /// Account or contract that requested the deployment.
    pub deployer: Address,
    /// Versioned hash of the deployed bytecode.
    pub bytecode_hash: B256,
    /// Address of the new contract.
    pub address: Address,
}

impl Receipt {
    /// Whether the transaction executed successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Some(U64::from(1))
    }

    /// Returns `self` if the transaction succeeded.
    ///
    /// # Errors
    ///
    /// [`Error::TransactionReverted`] otherwise.
    pub fn ensure_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::TransactionReverted {
                tx_hash: Some(self.transaction_hash),
                reason: "execution reverted".to_owned(),
            })
        }
    }

    /// Every contract deployed by this transaction, in emission order.
    #[must_use]
    pub fn deployed_contracts(&self) -> Vec<ContractDeployment> {
        self.logs
            .iter()
            .filter(|log| log.address == CONTRACT_DEPLOYER_ADDRESS)
            .filter_map(|log| match log.topics.as_slice() {
                [signature, deployer, bytecode_hash, address]
                    if *signature == ContractDeployed::SIGNATURE_HASH =>
                {
                    Some(ContractDeployment {
                        deployer: Address::from_word(*deployer),
                        bytecode_hash: *bytecode_hash,
                        address: Address::from_word(*address),
                    })
                }
                _ => None,
            })
            .collect()
    }

    /// Address of the contract deployed by a direct deployment transaction.
    ///
    /// A contract's constructor may deploy further contracts, so the
    /// deployment requested by the sender is the last one recorded.
    ///
    /// # Errors
    ///
    /// [`Error::DeployedAddressNotFound`] if nothing was deployed.
    pub fn deployed_address(&self) -> Result<Address> {
        self.deployed_contracts()
            .last()
            .map(|deployment| deployment.address)
            .or(self.contract_address)
            .ok_or(Error::DeployedAddressNotFound(self.transaction_hash))
    }
}
