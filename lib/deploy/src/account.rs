use alloy::{
    primitives::{Address, U256},
    signers::{local::PrivateKeySigner, Signer},
};
use tracing::debug;

use crate::{
    deploy::Deployer,
    error::Result,
    receipt::Receipt,
    system::Node,
    transaction::{
        Eip712Transaction, TxRequest, DEFAULT_GAS_PER_PUBDATA_LIMIT,
    },
};

/// A private key attached to the node it sends transactions through.
#[derive(Clone, Debug)]
pub struct Account<N> {
    /// The account's local private key wrapper.
    pub signer: PrivateKeySigner,
    node: N,
}

impl<N: Node> Account<N> {
    /// Attaches `signer` to `node`.
    #[must_use]
    pub fn new(signer: PrivateKeySigner, node: N) -> Self {
        Self { signer, node }
    }

    /// Retrieve this account's address.
    #[must_use]
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// The node this account sends through.
    #[must_use]
    pub fn node(&self) -> &N {
        &self.node
    }

    /// Get gas token balance.
    ///
    /// # Errors
    ///
    /// May fail if the node can't be reached.
    pub async fn balance(&self) -> Result<U256> {
        self.node.balance(self.address()).await
    }

    /// Create a configurable smart contract deployer on behalf of this
    /// account.
    #[must_use]
    pub fn as_deployer(&self) -> Deployer<'_, N> {
        Deployer::new(self)
    }

    /// Send gas token to an address.
    ///
    /// # Errors
    ///
    /// May fail if the transfer is rejected or reverts.
    pub async fn send_value(
        &self,
        to: Address,
        value: U256,
    ) -> Result<Receipt> {
        self.send(TxRequest::new(to).with_value(value)).await
    }

    /// Signs `request` as an EIP-712 transaction, submits it and waits for
    /// its receipt.
    ///
    /// # Errors
    ///
    /// [`crate::Error::TransactionReverted`] if the node rejects the
    /// transaction or it reverts, [`crate::Error::ConnectionFailure`] if it
    /// never confirms.
    pub async fn send(&self, request: TxRequest) -> Result<Receipt> {
        let tx = self.prepare(request).await?;
        let hash = tx.signing_hash()?;
        let signature = self.signer.sign_hash(&hash).await?;
        let encoded = tx.into_signed(&signature).encode();

        let tx_hash = self.node.send_raw_transaction(&encoded).await?;
        debug!(%tx_hash, from = %self.address(), "submitted transaction");

        let receipt = self.node.wait_for_receipt(tx_hash).await?;
        receipt.ensure_success()
    }

    /// Fills in chain id, nonce and fees.
    async fn prepare(&self, request: TxRequest) -> Result<Eip712Transaction> {
        let from = self.address();
        let chain_id = self.node.chain_id().await?;
        let nonce = self.node.nonce(from).await?;

        let (
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            gas_per_pubdata,
        ) = match request.gas_limit {
            Some(gas_limit) => {
                let gas_price = self.node.gas_price().await?;
                (
                    U256::from(gas_limit),
                    gas_price,
                    gas_price,
                    U256::from(DEFAULT_GAS_PER_PUBDATA_LIMIT),
                )
            }
            None => {
                let fee_request = request.fee_request(from);
                let fee = self.node.estimate_fee(&fee_request).await?;
                (
                    fee.gas_limit,
                    fee.max_fee_per_gas,
                    fee.max_priority_fee_per_gas,
                    fee.gas_per_pubdata_limit,
                )
            }
        };

        Ok(Eip712Transaction {
            chain_id,
            nonce,
            from,
            to: request.to,
            gas_limit,
            gas_per_pubdata,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            value: request.value,
            data: request.data,
            factory_deps: request.factory_deps,
        })
    }
}
