use alloy::primitives::{Address, TxHash};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use slp_payout_core::{ClaimAuthorization, Transaction};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("RPC call {method} failed: {reason}")]
    Rpc { method: &'static str, reason: String },
    #[error("broadcast rejected: {0}")]
    Broadcast(String),
    #[error("value {value} for {address} does not fit in u64")]
    Overflow { address: Address, value: String },
    #[error("invalid gateway setup: {0}")]
    Setup(String),
}

/// Final status of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Everything the payout run needs from the chain.
///
/// Submissions take an explicit nonce; the gateway never picks one itself.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Claimed (on-chain) SLP balance.
    async fn get_balance(&self, address: Address) -> Result<u64, GatewayError>;

    /// Next nonce according to the chain.
    async fn get_nonce(&self, address: Address) -> Result<u64, GatewayError>;

    async fn submit_transfer(
        &self,
        tx: &Transaction,
        signer: &PrivateKeySigner,
        nonce: u64,
    ) -> Result<TxHash, GatewayError>;

    async fn submit_claim(
        &self,
        owner: Address,
        authorization: &ClaimAuthorization,
        signer: &PrivateKeySigner,
        nonce: u64,
    ) -> Result<TxHash, GatewayError>;

    /// `Ok(None)` while the transaction is not mined yet.
    async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<ReceiptStatus>, GatewayError>;
}
