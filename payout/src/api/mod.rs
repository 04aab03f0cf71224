//! Game and identity HTTP APIs.

pub mod skymavis;

use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slp_payout_core::ClaimAuthorization;
use thiserror::Error;

pub use skymavis::SkyMavisClient;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{endpoint} request failed: {source}")]
    Http {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
    #[error("{endpoint} returned an unexpected payload: {reason}")]
    Malformed {
        endpoint: &'static str,
        reason: String,
    },
}

/// Off-chain SLP an account has earned but not yet checkpointed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnclaimedBalance {
    pub amount: u64,
    pub last_claimed_at: DateTime<Utc>,
}

#[async_trait]
pub trait RewardApi: Send + Sync {
    async fn get_unclaimed_balance(&self, address: Address) -> Result<UnclaimedBalance, ApiError>;

    /// Ask the game server to sign a claim for the account behind `access_token`.
    async fn request_claim_authorization(
        &self,
        address: Address,
        access_token: &str,
    ) -> Result<ClaimAuthorization, ApiError>;
}

#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// A fresh random message the account has to sign.
    async fn create_challenge(&self) -> Result<String, ApiError>;

    /// Trade the signed challenge for a bearer access token.
    async fn exchange_signed_challenge(
        &self,
        address: Address,
        message: &str,
        signature: &str,
    ) -> Result<String, ApiError>;
}
