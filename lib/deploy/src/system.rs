use std::{borrow::Cow, fmt, time::Duration};

use alloy::{
    primitives::{address, Address, Bytes, TxHash, U256},
    providers::{Provider, RootProvider},
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::{
    environment::NodeConfig,
    error::{Error, Result},
    receipt::Receipt,
    transaction::{CallRequest, Fee, FeeRequest},
};

/// Contract deployer system contract. Every deployment is a call to it.
pub const CONTRACT_DEPLOYER_ADDRESS: Address =
    address!("0000000000000000000000000000000000008006");

/// The JSON-RPC surface of a rollup node used by this crate.
///
/// Every method is a single request/response round trip, except
/// [`Node::wait_for_receipt`] which blocks until the transaction is
/// included in a block.
#[async_trait]
pub trait Node: Send + Sync {
    /// `eth_chainId`.
    async fn chain_id(&self) -> Result<u64>;

    /// `eth_getTransactionCount` of `address`.
    async fn nonce(&self, address: Address) -> Result<U256>;

    /// `eth_gasPrice`.
    async fn gas_price(&self) -> Result<U256>;

    /// `zks_estimateFee`.
    async fn estimate_fee(&self, request: &FeeRequest) -> Result<Fee>;

    /// `eth_getCode` at `address`. Empty for accounts without code.
    async fn code(&self, address: Address) -> Result<Bytes>;

    /// `eth_getBalance` of `address`.
    async fn balance(&self, address: Address) -> Result<U256>;

    /// `eth_call` against the latest block.
    async fn call(&self, request: &CallRequest) -> Result<Bytes>;

    /// `eth_sendRawTransaction`. A node-side rejection is reported as
    /// [`Error::TransactionReverted`].
    async fn send_raw_transaction(&self, encoded: &Bytes) -> Result<TxHash>;

    /// Waits until `tx_hash` is included in a block and returns its receipt,
    /// whatever its status.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt>;
}

/// A [`Node`] reached over HTTP.
#[derive(Clone)]
pub struct HttpNode {
    provider: RootProvider,
    url: Url,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl HttpNode {
    /// Connects to the node at `url`.
    #[must_use]
    pub fn new(url: Url, config: &NodeConfig) -> Self {
        Self {
            provider: RootProvider::new_http(url.clone()),
            url,
            poll_interval: config.poll_interval,
            confirmation_timeout: config.confirmation_timeout,
        }
    }

    /// Parses `url` and connects to it.
    ///
    /// # Errors
    ///
    /// May fail if `url` is not a valid URL.
    pub fn connect(url: &str, config: &NodeConfig) -> Result<Self> {
        let url = url
            .parse::<Url>()
            .map_err(|e| Error::Config(format!("invalid RPC URL {url}: {e}")))?;
        Ok(Self::new(url, config))
    }

    /// The rpc endpoint this node is connected to.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Debug for HttpNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpNode")
            .field("url", &self.url.as_str())
            .field("poll_interval", &self.poll_interval)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Node for HttpNode {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn nonce(&self, address: Address) -> Result<U256> {
        let nonce = self.provider.get_transaction_count(address).await?;
        Ok(U256::from(nonce))
    }

    async fn gas_price(&self) -> Result<U256> {
        let price = self.provider.get_gas_price().await?;
        Ok(U256::from(price))
    }

    async fn estimate_fee(&self, request: &FeeRequest) -> Result<Fee> {
        self.provider
            .raw_request(Cow::Borrowed("zks_estimateFee"), (request.clone(),))
            .await
            .map_err(Error::from_rpc)
    }

    async fn code(&self, address: Address) -> Result<Bytes> {
        Ok(self.provider.get_code_at(address).await?)
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes> {
        self.provider
            .raw_request(Cow::Borrowed("eth_call"), (request.clone(), "latest"))
            .await
            .map_err(Error::from_rpc)
    }

    async fn send_raw_transaction(&self, encoded: &Bytes) -> Result<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(encoded)
            .await
            .map_err(Error::from_rpc)?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt> {
        let started = Instant::now();
        loop {
            let receipt: Option<Receipt> = self
                .provider
                .raw_request(
                    Cow::Borrowed("eth_getTransactionReceipt"),
                    (tx_hash,),
                )
                .await?;

            match receipt {
                Some(receipt) if receipt.block_number.is_some() => {
                    return Ok(receipt)
                }
                _ if started.elapsed() >= self.confirmation_timeout => {
                    return Err(Error::ConnectionFailure(format!(
                        "transaction {tx_hash} not confirmed after {:?}",
                        self.confirmation_timeout
                    )));
                }
                _ => {
                    debug!(%tx_hash, "waiting for confirmation");
                    sleep(self.poll_interval).await;
                }
            }
        }
    }
}
