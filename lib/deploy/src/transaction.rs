//! EIP-712 (type `0x71`) rollup transactions.
//!
//! These are the only transactions able to carry factory dependencies, so
//! every transaction sent by an [`crate::Account`] uses this envelope, plain
//! value transfers included.
use alloy::{
    primitives::{Address, Bytes, Signature, B256, U256, U64},
    sol_types::{eip712_domain, SolStruct},
};
use alloy_rlp::{Decodable, Encodable, Header};
use serde::{Deserialize, Serialize};

use crate::{bytecode::hash_bytecode, error::Result};

/// Transaction type byte of EIP-712 rollup transactions.
pub const EIP712_TX_TYPE: u8 = 0x71;

/// Gas per pubdata byte limit used when the fee is not estimated.
pub const DEFAULT_GAS_PER_PUBDATA_LIMIT: u64 = 50_000;

mod typed {
    #![allow(missing_docs)]
    use alloy::sol;

    sol! {
        struct Transaction {
            uint256 txType;
            uint256 from;
            uint256 to;
            uint256 gasLimit;
            uint256 gasPerPubdataByteLimit;
            uint256 maxFeePerGas;
            uint256 maxPriorityFeePerGas;
            uint256 paymaster;
            uint256 nonce;
            uint256 value;
            bytes data;
            bytes32[] factoryDeps;
            bytes paymasterInput;
        }
    }
}

/// What the caller wants done. Nonce, chain id and fees are filled in by
/// the sending account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxRequest {
    /// Recipient.
    pub to: Address,
    /// Native value to transfer, in wei.
    pub value: U256,
    /// Calldata.
    pub data: Bytes,
    /// Raw bytecodes published alongside the transaction.
    pub factory_deps: Vec<Bytes>,
    /// Explicit gas ceiling. Skips fee estimation when set.
    pub gas_limit: Option<u64>,
}

impl TxRequest {
    /// A request with no value and no calldata sent to `to`.
    #[must_use]
    pub fn new(to: Address) -> Self {
        Self { to, ..Self::default() }
    }

    /// Sets the value to transfer.
    #[must_use]
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Sets the calldata.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Sets the factory dependencies.
    #[must_use]
    pub fn with_factory_deps(mut self, factory_deps: Vec<Bytes>) -> Self {
        self.factory_deps = factory_deps;
        self
    }

    /// Sets an explicit gas ceiling.
    #[must_use]
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// The `zks_estimateFee` request for this transaction sent by `from`.
    #[must_use]
    pub fn fee_request(&self, from: Address) -> FeeRequest {
        FeeRequest {
            from,
            to: self.to,
            data: self.data.clone(),
            value: self.value,
            transaction_type: U64::from(EIP712_TX_TYPE),
            eip712_meta: Eip712Meta {
                gas_per_pubdata: U256::from(DEFAULT_GAS_PER_PUBDATA_LIMIT),
                factory_deps: self
                    .factory_deps
                    .iter()
                    .map(|dep| dep.to_vec())
                    .collect(),
            },
        }
    }
}

/// Parameters of `zks_estimateFee`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRequest {
    /// Sender.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Calldata.
    pub data: Bytes,
    /// Value in wei.
    pub value: U256,
    /// Always [`EIP712_TX_TYPE`].
    #[serde(rename = "type")]
    pub transaction_type: U64,
    /// Rollup-specific part of the request.
    pub eip712_meta: Eip712Meta,
}

/// Rollup-specific request fields.
///
/// The node expects factory dependencies as arrays of byte values rather
/// than hex strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Meta {
    /// Gas per pubdata byte limit.
    pub gas_per_pubdata: U256,
    /// Raw factory dependency bytecodes.
    pub factory_deps: Vec<Vec<u8>>,
}

/// Result of `zks_estimateFee`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Fee {
    /// Estimated gas limit.
    pub gas_limit: U256,
    /// Max fee per gas, in wei.
    pub max_fee_per_gas: U256,
    /// Max priority fee per gas, in wei.
    pub max_priority_fee_per_gas: U256,
    /// Gas per pubdata byte limit.
    pub gas_per_pubdata_limit: U256,
}

/// Parameters of a read-only `eth_call`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    /// Caller.
    pub from: Address,
    /// Called contract.
    pub to: Address,
    /// Calldata.
    pub data: Bytes,
}

/// A fully populated, unsigned EIP-712 transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Eip712Transaction {
    /// Chain id, part of the signing domain.
    pub chain_id: u64,
    /// Sender nonce.
    pub nonce: U256,
    /// Sender.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Gas limit.
    pub gas_limit: U256,
    /// Gas per pubdata byte limit.
    pub gas_per_pubdata: U256,
    /// Max fee per gas.
    pub max_fee_per_gas: U256,
    /// Max priority fee per gas.
    pub max_priority_fee_per_gas: U256,
    /// Value in wei.
    pub value: U256,
    /// Calldata.
    pub data: Bytes,
    /// Raw factory dependency bytecodes.
    pub factory_deps: Vec<Bytes>,
}

impl Eip712Transaction {
    /// Hash the sender signs: the EIP-712 hash of the transaction under the
    /// `zkSync`/`2` domain, with factory dependencies replaced by their
    /// bytecode hashes.
    ///
    /// # Errors
    ///
    /// May fail if one of the factory dependencies is not valid bytecode.
    pub fn signing_hash(&self) -> Result<B256> {
        let factory_deps = self
            .factory_deps
            .iter()
            .map(|dep| hash_bytecode(dep))
            .collect::<Result<Vec<_>, _>>()?;

        let typed = typed::Transaction {
            txType: U256::from(EIP712_TX_TYPE),
            from: address_to_uint(self.from),
            to: address_to_uint(self.to),
            gasLimit: self.gas_limit,
            gasPerPubdataByteLimit: self.gas_per_pubdata,
            maxFeePerGas: self.max_fee_per_gas,
            maxPriorityFeePerGas: self.max_priority_fee_per_gas,
            paymaster: U256::ZERO,
            nonce: self.nonce,
            value: self.value,
            data: self.data.clone(),
            factoryDeps: factory_deps,
            paymasterInput: Bytes::new(),
        };
        let domain = eip712_domain! {
            name: "zkSync",
            version: "2",
            chain_id: self.chain_id,
        };

        Ok(typed.eip712_signing_hash(&domain))
    }

    /// Attaches the sender's signature.
    #[must_use]
    pub fn into_signed(self, signature: &Signature) -> SignedTransaction {
        SignedTransaction {
            tx: self,
            signature: Bytes::copy_from_slice(&signature.as_bytes()),
        }
    }
}

fn address_to_uint(address: Address) -> U256 {
    U256::from_be_slice(address.as_slice())
}

/// An EIP-712 transaction together with its 65-byte signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: Eip712Transaction,
    signature: Bytes,
}

impl SignedTransaction {
    /// The signed transaction.
    #[must_use]
    pub fn tx(&self) -> &Eip712Transaction {
        &self.tx
    }

    /// The raw `r || s || v` signature.
    #[must_use]
    pub fn signature(&self) -> &Bytes {
        &self.signature
    }

    /// Recovers the address that signed this transaction.
    ///
    /// # Errors
    ///
    /// May fail if the signature is malformed or the transaction carries
    /// invalid factory dependencies.
    pub fn recover_signer(&self) -> Result<Address> {
        let signature = Signature::from_raw(&self.signature)?;
        let hash = self.tx.signing_hash()?;
        Ok(signature.recover_address_from_prehash(&hash)?)
    }

    /// Serializes into the `0x71 || rlp([...])` wire format accepted by
    /// `eth_sendRawTransaction`.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let tx = &self.tx;
        let mut payload = Vec::new();
        tx.nonce.encode(&mut payload);
        tx.max_priority_fee_per_gas.encode(&mut payload);
        tx.max_fee_per_gas.encode(&mut payload);
        tx.gas_limit.encode(&mut payload);
        tx.to.encode(&mut payload);
        tx.value.encode(&mut payload);
        tx.data.encode(&mut payload);
        // The legacy signature slot holds `(chain_id, "", "")`; the real
        // signature travels as the custom signature below.
        tx.chain_id.encode(&mut payload);
        Bytes::new().encode(&mut payload);
        Bytes::new().encode(&mut payload);
        tx.chain_id.encode(&mut payload);
        tx.from.encode(&mut payload);
        tx.gas_per_pubdata.encode(&mut payload);
        tx.factory_deps.encode(&mut payload);
        self.signature.encode(&mut payload);
        // No paymaster.
        Header { list: true, payload_length: 0 }.encode(&mut payload);

        let header = Header { list: true, payload_length: payload.len() };
        let mut out = Vec::with_capacity(1 + header.length() + payload.len());
        out.push(EIP712_TX_TYPE);
        header.encode(&mut out);
        out.extend_from_slice(&payload);
        out.into()
    }

    /// Parses the wire format produced by [`SignedTransaction::encode`].
    ///
    /// # Errors
    ///
    /// May fail if `raw` is not an EIP-712 transaction, is truncated, or
    /// uses a paymaster.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let Some((&EIP712_TX_TYPE, rest)) = raw.split_first() else {
            return Err(
                alloy_rlp::Error::Custom("not an EIP-712 transaction").into()
            );
        };

        let buf = &mut &rest[..];
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString.into());
        }
        if buf.len() != header.payload_length {
            return Err(alloy_rlp::Error::Custom(
                "payload length does not match header",
            )
            .into());
        }

        let nonce = U256::decode(buf)?;
        let max_priority_fee_per_gas = U256::decode(buf)?;
        let max_fee_per_gas = U256::decode(buf)?;
        let gas_limit = U256::decode(buf)?;
        let to = Address::decode(buf)?;
        let value = U256::decode(buf)?;
        let data = Bytes::decode(buf)?;
        let _legacy_chain_id = u64::decode(buf)?;
        let _legacy_r = Bytes::decode(buf)?;
        let _legacy_s = Bytes::decode(buf)?;
        let chain_id = u64::decode(buf)?;
        let from = Address::decode(buf)?;
        let gas_per_pubdata = U256::decode(buf)?;
        let factory_deps = Vec::<Bytes>::decode(buf)?;
        let signature = Bytes::decode(buf)?;

        let paymaster = Header::decode(buf)?;
        if !paymaster.list || paymaster.payload_length != 0 {
            return Err(alloy_rlp::Error::Custom(
                "paymaster transactions are not supported",
            )
            .into());
        }
        if !buf.is_empty() {
            return Err(
                alloy_rlp::Error::Custom("trailing transaction bytes").into()
            );
        }

        let tx = Eip712Transaction {
            chain_id,
            nonce,
            from,
            to,
            gas_limit,
            gas_per_pubdata,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            value,
            data,
            factory_deps,
        };

        Ok(Self { tx, signature })
    }
}
