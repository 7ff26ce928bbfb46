//! Handles to deployed contracts and their typed interfaces.
//!
//! A handle is only ever built for an address that is known to hold code:
//! either the deployment transaction has been confirmed, or the node
//! reported non-empty code at the address.
#![allow(missing_docs)]
use std::fmt;

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    sol,
    sol_types::SolCall,
};
use alloy_json_abi::{JsonAbi, StateMutability};
use tracing::info;

use crate::{
    account::Account,
    artifact::Artifact,
    error::{Error, Result},
    receipt::Receipt,
    system::Node,
    transaction::{CallRequest, TxRequest},
};

sol! {
    contract AAFactory {
        constructor(bytes32 aaBytecodeHash);

        function deployAccount(bytes32 salt) external returns (address accountAddress);
    }
}

sol! {
    interface IValidator {
        function validateSignature(bytes32 messageHash, bytes signature, bytes32[2] publicKey) external view returns (bool);
    }
}

sol! {
    interface IContractDeployer {
        event ContractDeployed(address indexed deployerAddress, bytes32 indexed bytecodeHash, address indexed contractAddress);

        function create(bytes32 salt, bytes32 bytecodeHash, bytes input) external payable returns (address);
    }
}

/// A deployed contract bound to the account that talks to it.
#[derive(Clone, Debug)]
pub struct DeployedContract<'a, N> {
    address: Address,
    abi: JsonAbi,
    account: &'a Account<N>,
}

impl<'a, N: Node> DeployedContract<'a, N> {
    /// Binds the contract at `address`, whose deployment has been confirmed.
    #[must_use]
    pub fn new(
        address: Address,
        abi: JsonAbi,
        account: &'a Account<N>,
    ) -> Self {
        Self { address, abi, account }
    }

    /// Binds the contract at `address` after checking that the node knows
    /// code there.
    ///
    /// # Errors
    ///
    /// [`Error::TransactionReverted`] if there is no code at `address`, or
    /// any error of the underlying node.
    pub async fn at(
        address: Address,
        abi: JsonAbi,
        account: &'a Account<N>,
    ) -> Result<Self> {
        let code = account.node().code(address).await?;
        if code.is_empty() {
            return Err(Error::rejected(format!(
                "no contract code at {address}"
            )));
        }
        Ok(Self::new(address, abi, account))
    }

    /// Address of the contract.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Interface of the contract.
    #[must_use]
    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    /// Account the contract is bound to.
    #[must_use]
    pub fn account(&self) -> &'a Account<N> {
        self.account
    }

    /// Transfers `value` wei from the bound account to the contract.
    ///
    /// # Errors
    ///
    /// May fail if the transfer is rejected or reverts.
    pub async fn fund(&self, value: U256) -> Result<Receipt> {
        self.account.send_value(self.address, value).await
    }
}

/// Account factory deployed with the hash of an account implementation.
#[derive(Clone, Debug)]
pub struct Factory<'a, N> {
    address: Address,
    account: &'a Account<N>,
}

impl<'a, N: Node> Factory<'a, N> {
    /// Binds the factory at `address`.
    #[must_use]
    pub fn new(address: Address, account: &'a Account<N>) -> Self {
        Self { address, account }
    }

    /// Address of the factory.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Has the factory instantiate one account for `salt`.
    ///
    /// The call is sent with `gas_limit` instead of an estimate: the factory
    /// calls into the contract deployer, which estimation underprices.
    ///
    /// # Errors
    ///
    /// May fail if the transaction is rejected or reverts, e.g. because an
    /// account was already created for `salt`.
    pub async fn deploy_account(
        &self,
        salt: B256,
        gas_limit: u64,
    ) -> Result<Receipt> {
        let data = AAFactory::deployAccountCall { salt }.abi_encode();
        let request = TxRequest::new(self.address)
            .with_data(data)
            .with_gas_limit(gas_limit);

        info!(factory = %self.address, %salt, gas_limit, "creating account");
        self.account.send(request).await
    }
}

/// Arguments of `validateSignature`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignatureArgs {
    /// Hash of the signed message.
    pub message_hash: B256,
    /// Raw `r || s` signature.
    pub signature: Bytes,
    /// Affine `x` and `y` coordinates of the signing key.
    pub public_key: [B256; 2],
}

/// How a contract call was carried out, and what it yielded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    /// Read-only call: the raw return data.
    Returned(Bytes),
    /// State-changing call: the confirmed receipt.
    Confirmed(Receipt),
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Returned(data) => write!(f, "returned {data}"),
            Self::Confirmed(receipt) => write!(f, "confirmed {receipt:#?}"),
        }
    }
}

/// A deployed signature validator.
#[derive(Clone, Debug)]
pub struct Validator<'a, N> {
    contract: DeployedContract<'a, N>,
    name: String,
}

impl<'a, N: Node> Validator<'a, N> {
    /// Binds the validator at `address` using the interface in `artifact`.
    ///
    /// # Errors
    ///
    /// [`Error::TransactionReverted`] if there is no code at `address`.
    pub async fn bind(
        address: Address,
        artifact: &Artifact,
        account: &'a Account<N>,
    ) -> Result<Self> {
        let contract =
            DeployedContract::at(address, artifact.abi.clone(), account).await?;
        Ok(Self { contract, name: artifact.contract_name.clone() })
    }

    /// Address of the validator.
    #[must_use]
    pub fn address(&self) -> Address {
        self.contract.address()
    }

    /// Calls `validateSignature`.
    ///
    /// A `view` or `pure` declaration in the interface makes this an
    /// `eth_call` returning the raw result. Otherwise a transaction is sent
    /// and its receipt returned.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArtifact`] if the interface lacks
    /// `validateSignature(bytes32,bytes,bytes32[2])`, or any error of the
    /// call or transaction.
    pub async fn validate_signature(
        &self,
        args: &SignatureArgs,
    ) -> Result<Invocation> {
        let mutability = self
            .contract
            .abi()
            .function("validateSignature")
            .and_then(|overloads| {
                overloads.iter().find(|function| {
                    *function.selector()
                        == IValidator::validateSignatureCall::SELECTOR
                })
            })
            .map(|function| function.state_mutability)
            .ok_or_else(|| Error::InvalidArtifact {
                name: self.name.clone(),
                reason: format!(
                    "no `{}` method",
                    IValidator::validateSignatureCall::SIGNATURE
                ),
            })?;

        let data: Bytes = IValidator::validateSignatureCall {
            messageHash: args.message_hash,
            signature: args.signature.clone(),
            publicKey: args.public_key,
        }
        .abi_encode()
        .into();

        let account = self.contract.account();
        info!(validator = %self.address(), ?mutability, "validating signature");
        match mutability {
            StateMutability::View | StateMutability::Pure => {
                let request = CallRequest {
                    from: account.address(),
                    to: self.address(),
                    data,
                };
                let returned = account.node().call(&request).await?;
                Ok(Invocation::Returned(returned))
            }
            StateMutability::NonPayable | StateMutability::Payable => {
                let request = TxRequest::new(self.address()).with_data(data);
                let receipt = account.send(request).await?;
                Ok(Invocation::Confirmed(receipt))
            }
        }
    }
}
