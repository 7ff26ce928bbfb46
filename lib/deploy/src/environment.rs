//! Configuration of both procedures, read from environment variables.
//!
//! Binaries load `.env` before calling the `from_env` constructors. Tests
//! go through `from_vars` with an explicit lookup instead.
use std::{
    collections::BTreeMap, fs, path::PathBuf, str::FromStr, time::Duration,
};

use alloy::{
    primitives::{
        b256, bytes, uint,
        utils::parse_ether,
        Address, Bytes, B256, U256,
    },
    signers::local::PrivateKeySigner,
};
use serde::Deserialize;

use crate::{
    contract::SignatureArgs,
    error::{Error, Result},
};

const RPC_URL: &str = "RPC_URL";
const DEPLOYER_PRIVATE_KEY: &str = "DEPLOYER_PRIVATE_KEY";
const ARTIFACTS_DIR: &str = "ARTIFACTS_DIR";
const FUNDING_AMOUNT: &str = "FUNDING_AMOUNT";
const DEPLOY_ACCOUNT_GAS_LIMIT: &str = "DEPLOY_ACCOUNT_GAS_LIMIT";
const NETWORK: &str = "NETWORK";
const NETWORKS_FILE: &str = "NETWORKS_FILE";
const OWNER_PRIVATE_KEY: &str = "OWNER_PRIVATE_KEY";
const VALIDATOR_ADDRESS: &str = "VALIDATOR_ADDRESS";
const MESSAGE_HASH: &str = "MESSAGE_HASH";
const SIGNATURE: &str = "SIGNATURE";
const PUBLIC_KEY_X: &str = "PUBLIC_KEY_X";
const PUBLIC_KEY_Y: &str = "PUBLIC_KEY_Y";
const POLL_INTERVAL_MS: &str = "POLL_INTERVAL_MS";
const CONFIRMATION_TIMEOUT_SECS: &str = "CONFIRMATION_TIMEOUT_SECS";

/// Local in-memory node.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8011";
/// Output directory of the zkSync hardhat compiler plugin.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts-zk";
/// Network used for invocation when none is named.
pub const DEFAULT_NETWORK: &str = "zkSyncTestnet";
/// Networks file looked up in the working directory.
pub const DEFAULT_NETWORKS_FILE: &str = "networks.toml";
/// Gas ceiling of the account creation call.
pub const DEFAULT_DEPLOY_ACCOUNT_GAS_LIMIT: u64 = 1_000_000;
/// 0.005 ETH.
pub const DEFAULT_FUNDING: U256 = uint!(5_000_000_000_000_000_U256);

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

// P-256 test vector checked by the validator.
const DEFAULT_MESSAGE_HASH: B256 =
    b256!("03e17259cbdd698089d9edac71d5fbb505b5d3f724e5776dd31711108e3f8dd9");
const DEFAULT_SIGNATURE: Bytes = bytes!(
    "0dfc52f4a13c03848e5553601685a5b262a06c50eaa6ef9fe997d6f7fcca9110615a29fdf780d6e60b030bddd268f0ffb2a4c0d05b8942c462f57929a5eba750"
);
const DEFAULT_PUBLIC_KEY: [B256; 2] = [
    b256!("779def53aa6758bf8fceebdc9778f843032ab0938fdcc260af677af87f40d8be"),
    b256!("4c7ac9619e91a27693c3e57f1dbd3c64c9c47e66cc5aef322ac5dc935cc22de1"),
];

/// Receipt polling of a [`crate::HttpNode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeConfig {
    /// Delay between two receipt lookups.
    pub poll_interval: Duration,
    /// How long to wait for a transaction to be included.
    pub confirmation_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

impl NodeConfig {
    /// Reads `POLL_INTERVAL_MS` and `CONFIRMATION_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// May fail if a variable is set but isn't a number.
    pub fn from_vars(vars: &Vars<'_>) -> Result<Self> {
        let default = Self::default();
        let poll_interval = vars
            .parsed::<u64>(POLL_INTERVAL_MS)?
            .map_or(default.poll_interval, Duration::from_millis);
        let confirmation_timeout = vars
            .parsed::<u64>(CONFIRMATION_TIMEOUT_SECS)?
            .map_or(default.confirmation_timeout, Duration::from_secs);
        Ok(Self { poll_interval, confirmation_timeout })
    }
}

/// What to deploy, and how.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Provisioning {
    /// Contract name of the account factory.
    pub factory_artifact: String,
    /// Contract name of the account implementation.
    pub account_artifact: String,
    /// Salt the account is created with.
    pub salt: B256,
    /// Gas ceiling of the account creation call.
    pub deploy_account_gas_limit: u64,
    /// Wei sent to the new account.
    pub funding: U256,
}

impl Default for Provisioning {
    fn default() -> Self {
        Self {
            factory_artifact: "AAFactory".to_owned(),
            account_artifact: "PasskeyAccount".to_owned(),
            salt: B256::ZERO,
            deploy_account_gas_limit: DEFAULT_DEPLOY_ACCOUNT_GAS_LIMIT,
            funding: DEFAULT_FUNDING,
        }
    }
}

/// Configuration of the provisioning procedure.
#[derive(Clone, Debug)]
pub struct ProvisionConfig {
    /// Node endpoint.
    pub rpc_url: String,
    /// Key that deploys and funds.
    pub signer: PrivateKeySigner,
    /// Root of the artifact store.
    pub artifacts_dir: PathBuf,
    /// Receipt polling.
    pub node: NodeConfig,
    /// What to deploy.
    pub provisioning: Provisioning,
}

impl ProvisionConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// May fail if `DEPLOYER_PRIVATE_KEY` is unset, or any variable is
    /// malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&Vars::from_env())
    }

    /// Reads the configuration from `vars`.
    ///
    /// # Errors
    ///
    /// See [`ProvisionConfig::from_env`].
    pub fn from_vars(vars: &Vars<'_>) -> Result<Self> {
        let mut provisioning = Provisioning::default();
        if let Some(funding) = vars.get(FUNDING_AMOUNT) {
            provisioning.funding = parse_ether(&funding).map_err(|e| {
                Error::Config(format!("invalid {FUNDING_AMOUNT}: {e}"))
            })?;
        }
        if let Some(limit) = vars.parsed(DEPLOY_ACCOUNT_GAS_LIMIT)? {
            provisioning.deploy_account_gas_limit = limit;
        }

        Ok(Self {
            rpc_url: vars.get_or(RPC_URL, DEFAULT_RPC_URL),
            signer: vars.signer(DEPLOYER_PRIVATE_KEY)?,
            artifacts_dir: vars
                .get_or(ARTIFACTS_DIR, DEFAULT_ARTIFACTS_DIR)
                .into(),
            node: NodeConfig::from_vars(vars)?,
            provisioning,
        })
    }
}

/// Configuration of the invocation procedure.
#[derive(Clone, Debug)]
pub struct InvokeConfig {
    /// Name of the network in the networks file.
    pub network: String,
    /// Path of the networks file.
    pub networks_file: PathBuf,
    /// Key the validator is called with.
    pub signer: PrivateKeySigner,
    /// Deployed validator.
    pub validator_address: Address,
    /// Root of the artifact store.
    pub artifacts_dir: PathBuf,
    /// Contract name of the validator interface.
    pub validator_artifact: String,
    /// Arguments of `validateSignature`.
    pub args: SignatureArgs,
    /// Receipt polling.
    pub node: NodeConfig,
}

impl InvokeConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// May fail if `OWNER_PRIVATE_KEY` or `VALIDATOR_ADDRESS` is unset, or
    /// any variable is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&Vars::from_env())
    }

    /// Reads the configuration from `vars`.
    ///
    /// # Errors
    ///
    /// See [`InvokeConfig::from_env`].
    pub fn from_vars(vars: &Vars<'_>) -> Result<Self> {
        let args = SignatureArgs {
            message_hash: vars
                .parsed(MESSAGE_HASH)?
                .unwrap_or(DEFAULT_MESSAGE_HASH),
            signature: vars.parsed(SIGNATURE)?.unwrap_or(DEFAULT_SIGNATURE),
            public_key: [
                vars.parsed(PUBLIC_KEY_X)?.unwrap_or(DEFAULT_PUBLIC_KEY[0]),
                vars.parsed(PUBLIC_KEY_Y)?.unwrap_or(DEFAULT_PUBLIC_KEY[1]),
            ],
        };

        Ok(Self {
            network: vars.get_or(NETWORK, DEFAULT_NETWORK),
            networks_file: vars
                .get_or(NETWORKS_FILE, DEFAULT_NETWORKS_FILE)
                .into(),
            signer: vars.signer(OWNER_PRIVATE_KEY)?,
            validator_address: vars.required(VALIDATOR_ADDRESS)?,
            artifacts_dir: vars
                .get_or(ARTIFACTS_DIR, DEFAULT_ARTIFACTS_DIR)
                .into(),
            validator_artifact: "Validator".to_owned(),
            args,
            node: NodeConfig::from_vars(vars)?,
        })
    }
}

/// Lookup of configuration variables by name.
pub struct Vars<'a> {
    lookup: Box<dyn Fn(&str) -> Option<String> + 'a>,
}

impl<'a> Vars<'a> {
    /// Variables read from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(|name| std::env::var(name).ok())
    }

    /// Variables resolved by `lookup`.
    #[must_use]
    pub fn new(lookup: impl Fn(&str) -> Option<String> + 'a) -> Self {
        Self { lookup: Box::new(lookup) }
    }

    /// Variables taken from `pairs`.
    #[must_use]
    pub fn from_pairs(pairs: &'a [(&'a str, &'a str)]) -> Self {
        Self::new(move |name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned())
        })
    }

    /// Value of `name`. Empty values count as unset.
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn get_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_owned())
    }

    fn parsed<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(name)
            .map(|value| {
                value.parse::<T>().map_err(|e| {
                    Error::Config(format!("invalid {name}: {e}"))
                })
            })
            .transpose()
    }

    fn required<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.parsed(name)?
            .ok_or_else(|| Error::Config(format!("{name} is not set")))
    }

    /// Key material is never echoed back in errors.
    fn signer(&self, name: &str) -> Result<PrivateKeySigner> {
        let key = self
            .get(name)
            .ok_or_else(|| Error::Config(format!("{name} is not set")))?;
        key.parse::<PrivateKeySigner>().map_err(|_| {
            Error::Config(format!("{name} is not a valid private key"))
        })
    }
}

impl std::fmt::Debug for Vars<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vars").finish_non_exhaustive()
    }
}

/// A network entry of the networks file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    /// JSON-RPC endpoint of the rollup.
    pub url: String,
    /// Name of the L1 network the rollup settles on.
    #[serde(default)]
    pub eth_network: Option<String>,
    /// Whether the network is a zkSync rollup.
    #[serde(default)]
    pub zksync: bool,
}

/// The networks file: named endpoints under `[networks.<name>]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Networks {
    #[serde(default)]
    networks: BTreeMap<String, Network>,
}

impl Networks {
    /// Reads the networks file at `path`.
    ///
    /// # Errors
    ///
    /// May fail if the file can't be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("can't read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses a networks file.
    ///
    /// # Errors
    ///
    /// May fail if `content` isn't a valid networks file.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("invalid networks file: {e}")))
    }

    /// The network called `name`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownNetwork`] if there's no such network.
    pub fn resolve(&self, name: &str) -> Result<&Network> {
        self.networks
            .get(name)
            .ok_or_else(|| Error::UnknownNetwork(name.to_owned()))
    }
}
