#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use alloy::{
    primitives::{keccak256, uint, Address, Bytes, TxHash, B256, U256, U64},
    signers::local::PrivateKeySigner,
    sol_types::{SolCall, SolEvent},
};
use async_trait::async_trait;
use passkey_deploy::{
    address::{create2_address, create_address},
    bytecode::hash_bytecode,
    contract::{AAFactory, IContractDeployer},
    receipt::{Log, Receipt},
    transaction::{CallRequest, Fee, FeeRequest, SignedTransaction},
    Account, Error, Node, Result, CONTRACT_DEPLOYER_ADDRESS,
};
use serde_json::{json, Value};

pub const CHAIN_ID: u64 = 260;
pub const GAS_PRICE: U256 = uint!(250_000_000_U256);
/// What `zks_estimateFee` answers. Too little for account creation.
pub const ESTIMATED_GAS: U256 = uint!(500_000_U256);
/// Gas an account creation needs.
pub const ACCOUNT_CREATION_GAS: U256 = uint!(700_000_U256);
/// 10 ETH.
pub const DEPLOYER_BALANCE: U256 = uint!(10_000_000_000_000_000_000_U256);

/// In-memory rollup node.
///
/// Checks the signature, chain id and nonce of every submitted transaction,
/// keeps published bytecodes, and executes the handful of calls the
/// provisioning procedure makes: contract deployment through the contract
/// deployer, account creation through a factory and value transfers.
#[derive(Clone, Default)]
pub struct DevNode {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    block: u64,
    nonces: HashMap<Address, U256>,
    deployment_nonces: HashMap<Address, U256>,
    balances: HashMap<Address, U256>,
    code: HashMap<Address, Bytes>,
    published: HashMap<B256, Bytes>,
    /// Factory address to the account implementation hash it was built
    /// with.
    factories: HashMap<Address, B256>,
    call_results: HashMap<Address, Bytes>,
    receipts: Vec<Receipt>,
    submitted: usize,
}

impl DevNode {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn fund(&self, address: Address, value: U256) {
        *self.state().balances.entry(address).or_default() += value;
    }

    /// Places `code` at `address` as if it had been deployed earlier.
    pub fn install(&self, address: Address, code: Bytes) {
        self.state().code.insert(address, code);
    }

    /// Makes `eth_call` against `address` return `result`.
    pub fn answer_calls(&self, address: Address, result: Bytes) {
        self.state().call_results.insert(address, result);
    }

    /// Number of transactions accepted for execution.
    pub fn submitted(&self) -> usize {
        self.state().submitted
    }

    /// Receipts of every executed transaction, oldest first.
    pub fn receipts(&self) -> Vec<Receipt> {
        self.state().receipts.clone()
    }

    pub fn is_published(&self, bytecode_hash: B256) -> bool {
        self.state().published.contains_key(&bytecode_hash)
    }

    pub fn has_code(&self, address: Address) -> bool {
        self.state().code.contains_key(&address)
    }

    /// Implementation hash the factory at `address` was constructed with.
    pub fn factory_implementation(&self, address: Address) -> Option<B256> {
        self.state().factories.get(&address).copied()
    }

    /// A fresh account with [`DEPLOYER_BALANCE`] attached to this node.
    pub fn funded_account(&self) -> Account<DevNode> {
        let signer = PrivateKeySigner::random();
        self.fund(signer.address(), DEPLOYER_BALANCE);
        Account::new(signer, self.clone())
    }
}

fn rejected(reason: &str) -> Error {
    Error::TransactionReverted { tx_hash: None, reason: reason.to_owned() }
}

impl State {
    fn balance(&self, address: Address) -> U256 {
        self.balances.get(&address).copied().unwrap_or_default()
    }

    fn nonce(&self, address: Address) -> U256 {
        self.nonces.get(&address).copied().unwrap_or_default()
    }

    /// Runs an accepted transaction. `Err` reverts it.
    fn execute(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
        gas_limit: U256,
        data: &[u8],
    ) -> std::result::Result<Vec<Log>, String> {
        let mut logs = Vec::new();

        if to == CONTRACT_DEPLOYER_ADDRESS {
            let call = IContractDeployer::createCall::abi_decode(data)
                .map_err(|e| e.to_string())?;
            let address = self.deploy(from, call.bytecodeHash, &call.input)?;
            logs.push(deployed(from, call.bytecodeHash, address));
        } else if let Some(implementation) = self.factories.get(&to).copied() {
            let call = AAFactory::deployAccountCall::abi_decode(data)
                .map_err(|e| e.to_string())?;
            if gas_limit < ACCOUNT_CREATION_GAS {
                return Err("out of gas".to_owned());
            }
            let address = create2_address(to, call.salt, implementation, &[]);
            if self.code.contains_key(&address) {
                return Err("account already exists".to_owned());
            }
            let code = self.published[&implementation].clone();
            self.code.insert(address, code);
            logs.push(deployed(to, implementation, address));
        } else if !data.is_empty() && !self.code.contains_key(&to) {
            return Err("call to an address without code".to_owned());
        }

        let balance = self.balance(from);
        if balance < value {
            return Err("insufficient balance".to_owned());
        }
        self.balances.insert(from, balance - value);
        *self.balances.entry(to).or_default() += value;

        Ok(logs)
    }

    fn deploy(
        &mut self,
        sender: Address,
        bytecode_hash: B256,
        input: &[u8],
    ) -> std::result::Result<Address, String> {
        let code = self
            .published
            .get(&bytecode_hash)
            .cloned()
            .ok_or_else(|| format!("bytecode {bytecode_hash} not published"))?;

        let nonce = self.deployment_nonces.entry(sender).or_default();
        let address = create_address(sender, *nonce);
        *nonce += U256::from(1);

        // A constructor taking a single published bytecode hash is a
        // factory.
        if let Ok(implementation) = <[u8; 32]>::try_from(input) {
            let implementation = B256::from(implementation);
            if self.published.contains_key(&implementation) {
                self.factories.insert(address, implementation);
            }
        }
        self.code.insert(address, code);
        Ok(address)
    }
}

fn deployed(deployer: Address, bytecode_hash: B256, address: Address) -> Log {
    Log {
        address: CONTRACT_DEPLOYER_ADDRESS,
        topics: vec![
            IContractDeployer::ContractDeployed::SIGNATURE_HASH,
            deployer.into_word(),
            bytecode_hash,
            address.into_word(),
        ],
        data: Bytes::new(),
    }
}

#[async_trait]
impl Node for DevNode {
    async fn chain_id(&self) -> Result<u64> {
        Ok(CHAIN_ID)
    }

    async fn nonce(&self, address: Address) -> Result<U256> {
        Ok(self.state().nonce(address))
    }

    async fn gas_price(&self) -> Result<U256> {
        Ok(GAS_PRICE)
    }

    async fn estimate_fee(&self, request: &FeeRequest) -> Result<Fee> {
        assert_eq!(request.transaction_type, U64::from(0x71));
        Ok(Fee {
            gas_limit: ESTIMATED_GAS,
            max_fee_per_gas: GAS_PRICE,
            max_priority_fee_per_gas: U256::ZERO,
            gas_per_pubdata_limit: U256::from(50_000),
        })
    }

    async fn code(&self, address: Address) -> Result<Bytes> {
        Ok(self.state().code.get(&address).cloned().unwrap_or_default())
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        Ok(self.state().balance(address))
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes> {
        let state = self.state();
        if !state.code.contains_key(&request.to) {
            return Ok(Bytes::new());
        }
        state
            .call_results
            .get(&request.to)
            .cloned()
            .ok_or_else(|| rejected("execution reverted"))
    }

    async fn send_raw_transaction(&self, encoded: &Bytes) -> Result<TxHash> {
        let signed = SignedTransaction::decode(encoded)
            .map_err(|e| rejected(&e.to_string()))?;
        let tx = signed.tx();

        if signed.recover_signer()? != tx.from {
            return Err(rejected("invalid signature"));
        }
        if tx.chain_id != CHAIN_ID {
            return Err(rejected("wrong chain id"));
        }

        let mut state = self.state();
        if tx.nonce != state.nonce(tx.from) {
            return Err(rejected("nonce mismatch"));
        }

        state.submitted += 1;
        *state.nonces.entry(tx.from).or_default() += U256::from(1);
        for dep in &tx.factory_deps {
            let hash =
                hash_bytecode(dep).map_err(|e| rejected(&e.to_string()))?;
            state.published.insert(hash, dep.clone());
        }

        let tx_hash = keccak256(encoded);
        state.block += 1;
        let outcome =
            state.execute(tx.from, tx.to, tx.value, tx.gas_limit, &tx.data);
        let (status, logs) = match outcome {
            Ok(logs) => (1, logs),
            Err(_) => (0, Vec::new()),
        };
        let receipt = Receipt {
            transaction_hash: tx_hash,
            block_number: Some(U64::from(state.block)),
            status: Some(U64::from(status)),
            contract_address: None,
            logs,
        };
        state.receipts.push(receipt);

        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt> {
        self.state()
            .receipts
            .iter()
            .find(|receipt| receipt.transaction_hash == tx_hash)
            .cloned()
            .ok_or_else(|| {
                Error::ConnectionFailure(format!("unknown {tx_hash}"))
            })
    }
}

/// A one-word bytecode filled with `fill`.
pub fn bytecode(fill: u8) -> Bytes {
    Bytes::from(vec![fill; 32])
}

pub const FACTORY_CODE: u8 = 0xfa;
pub const ACCOUNT_CODE: u8 = 0xac;
pub const DEPENDENCY_CODE: u8 = 0xde;

/// Writes a hardhat-zksync artifact under `root`.
pub fn write_artifact(
    root: &Path,
    source: &str,
    name: &str,
    abi: Value,
    code: u8,
    factory_deps: &[&str],
) {
    let dir = root.join(source);
    std::fs::create_dir_all(&dir).unwrap();
    let deps: serde_json::Map<String, Value> = factory_deps
        .iter()
        .enumerate()
        .map(|(i, dep)| (format!("0x{:064x}", i + 1), json!(dep)))
        .collect();
    let artifact = json!({
        "_format": "hh-zksolc-artifact-1",
        "contractName": name,
        "sourceName": source,
        "abi": abi,
        "bytecode": bytecode(code),
        "deployedBytecode": bytecode(code),
        "linkReferences": {},
        "deployedLinkReferences": {},
        "factoryDeps": deps,
    });
    std::fs::write(dir.join(format!("{name}.json")), artifact.to_string())
        .unwrap();
}

fn factory_abi() -> Value {
    json!([
        {
            "type": "constructor",
            "stateMutability": "nonpayable",
            "inputs": [
                { "name": "aaBytecodeHash", "type": "bytes32", "internalType": "bytes32" }
            ]
        },
        {
            "type": "function",
            "name": "deployAccount",
            "stateMutability": "nonpayable",
            "inputs": [
                { "name": "salt", "type": "bytes32", "internalType": "bytes32" }
            ],
            "outputs": [
                { "name": "accountAddress", "type": "address", "internalType": "address" }
            ]
        }
    ])
}

/// `validateSignature` declared with `mutability`.
pub fn validator_abi(mutability: &str) -> Value {
    json!([
        {
            "type": "function",
            "name": "validateSignature",
            "stateMutability": mutability,
            "inputs": [
                { "name": "messageHash", "type": "bytes32", "internalType": "bytes32" },
                { "name": "signature", "type": "bytes", "internalType": "bytes" },
                { "name": "publicKey", "type": "bytes32[2]", "internalType": "bytes32[2]" }
            ],
            "outputs": [
                { "name": "", "type": "bool", "internalType": "bool" }
            ]
        }
    ])
}

/// Artifacts of the factory, the account implementation and a contract the
/// factory depends on.
pub fn write_provisioning_artifacts(root: &Path) {
    write_artifact(
        root,
        "contracts/AAFactory.sol",
        "AAFactory",
        factory_abi(),
        FACTORY_CODE,
        &["contracts/Dependency.sol:Dependency"],
    );
    write_artifact(
        root,
        "contracts/PasskeyAccount.sol",
        "PasskeyAccount",
        json!([]),
        ACCOUNT_CODE,
        &[],
    );
    write_artifact(
        root,
        "contracts/Dependency.sol",
        "Dependency",
        json!([]),
        DEPENDENCY_CODE,
        &[],
    );
}
