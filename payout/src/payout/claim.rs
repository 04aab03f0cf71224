//! Claim phase: find accounts with claimable SLP and checkpoint it on chain.
//!
//! Accounts are inspected and claimed concurrently. A failed claim stays
//! pending with its authorization memoized and is re-driven on the next round
//! if the operator asks for it.

use alloy::primitives::{Address, TxHash};
use alloy::signers::Signer;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use slp_payout_core::{Account, ClaimAuthorization, ClaimState, ClaimTransitionError, NonceTable};
use std::sync::Arc;
use thiserror::Error;

use crate::api::{ApiError, IdentityApi, RewardApi, UnclaimedBalance};
use crate::blockchain::{wait_for_receipt, ChainGateway, Confirmation, ConfirmationPolicy, GatewayError};
use crate::presenter::{Presenter, RunEvent};

pub const CLAIM_PROMPT: &str = "Would you like to claim SLP?";
pub const RETRY_PROMPT: &str = "Would you like to retry claim process?";

#[derive(Debug, Error)]
pub enum ClaimFailure {
    #[error("identity gateway: {0}")]
    Identity(ApiError),
    #[error("could not sign the login challenge: {0}")]
    Signing(String),
    #[error("claim authorization: {0}")]
    Authorization(ApiError),
    #[error("no nonce known for {0}")]
    UnknownNonce(Address),
    #[error("claim submission: {0}")]
    Submission(GatewayError),
    #[error("claim transaction {0} reverted")]
    Reverted(TxHash),
    #[error("no receipt for claim transaction {0} within the confirmation budget")]
    Unconfirmed(TxHash),
    #[error(transparent)]
    Transition(#[from] ClaimTransitionError),
}

/// When the cooldown after the last claim ends. `None` if that lies beyond
/// the representable calendar.
pub fn next_claim_at(balance: &UnclaimedBalance, cooldown: chrono::Duration) -> Option<DateTime<Utc>> {
    balance.last_claimed_at.checked_add_signed(cooldown)
}

/// SLP that can be claimed right now. Zero while the last claim is inside the cooldown.
pub fn claimable_amount(
    balance: &UnclaimedBalance,
    now: DateTime<Utc>,
    cooldown: chrono::Duration,
) -> u64 {
    match next_claim_at(balance, cooldown) {
        Some(unlocks_at) if now >= unlocks_at => balance.amount,
        _ => 0,
    }
}

pub struct ClaimCoordinator {
    gateway: Arc<dyn ChainGateway>,
    rewards: Arc<dyn RewardApi>,
    identity: Arc<dyn IdentityApi>,
    nonces: Arc<NonceTable>,
    presenter: Arc<dyn Presenter>,
    policy: ConfirmationPolicy,
    claim_cooldown: chrono::Duration,
}

impl ClaimCoordinator {
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        rewards: Arc<dyn RewardApi>,
        identity: Arc<dyn IdentityApi>,
        nonces: Arc<NonceTable>,
        presenter: Arc<dyn Presenter>,
        policy: ConfirmationPolicy,
        claim_cooldown: chrono::Duration,
    ) -> Self {
        Self {
            gateway,
            rewards,
            identity,
            nonces,
            presenter,
            policy,
            claim_cooldown,
        }
    }

    /// Snapshot nonces for every account and return the ones with something to claim.
    pub async fn discover(&self, accounts: &[Account]) -> Vec<ClaimState> {
        self.presenter.report(RunEvent::CheckingUnclaimed);

        let inspections = accounts.iter().map(|account| self.inspect(account));
        let pending: Vec<ClaimState> = join_all(inspections).await.into_iter().flatten().collect();

        tracing::info!(
            "{} of {} account(s) have SLP to claim",
            pending.len(),
            accounts.len()
        );
        pending
    }

    async fn inspect(&self, account: &Account) -> Option<ClaimState> {
        let (nonce, claimed, unclaimed) = tokio::join!(
            self.gateway.get_nonce(account.address),
            self.gateway.get_balance(account.address),
            self.rewards.get_unclaimed_balance(account.address),
        );

        let nonce = match nonce {
            Ok(nonce) => {
                self.nonces.insert(account.address, nonce);
                nonce
            }
            Err(e) => {
                self.lookup_failed(account, format!("nonce lookup: {}", e));
                return None;
            }
        };
        // the claimed balance is informational; the payout re-reads it later
        let claimed = match claimed {
            Ok(claimed) => claimed,
            Err(e) => {
                self.lookup_failed(account, format!("balance lookup: {}", e));
                0
            }
        };
        let unclaimed = match unclaimed {
            Ok(unclaimed) => unclaimed,
            Err(e) => {
                self.lookup_failed(account, format!("unclaimed SLP lookup: {}", e));
                return None;
            }
        };

        let claimable = claimable_amount(&unclaimed, Utc::now(), self.claim_cooldown);
        if claimable == 0 {
            let next_claim_at = if unclaimed.amount > 0 {
                next_claim_at(&unclaimed, self.claim_cooldown)
            } else {
                None
            };
            self.presenter.report(RunEvent::NothingToClaim {
                account_name: account.name.clone(),
                address: account.address,
                claimed,
                next_claim_at,
            });
            return None;
        }

        self.presenter.report(RunEvent::UnclaimedFound {
            account_name: account.name.clone(),
            address: account.address,
            nonce,
            unclaimed: claimable,
            claimed,
        });
        Some(ClaimState::new(account.clone(), claimable, claimed))
    }

    fn lookup_failed(&self, account: &Account, reason: String) {
        tracing::warn!("Lookup failed for '{}': {}", account.name, reason);
        self.presenter.report(RunEvent::LookupFailed {
            account_name: account.name.clone(),
            address: account.address,
            reason,
        });
    }

    /// Claim rounds until nothing is pending or the operator stops.
    ///
    /// Returns the claims that were abandoned.
    pub async fn run(&self, mut pending: Vec<ClaimState>) -> Vec<ClaimState> {
        let mut prompt = CLAIM_PROMPT;
        let mut round = 0u32;

        while !pending.is_empty() {
            if !self.presenter.confirm(prompt) {
                break;
            }
            round += 1;
            tracing::info!("Claim round {}: {} account(s)", round, pending.len());

            join_all(pending.iter_mut().map(|claim| self.claim(claim))).await;
            pending.retain(|claim| !claim.is_confirmed());

            if pending.is_empty() {
                self.presenter.report(RunEvent::AllClaimsSucceeded);
            } else {
                self.presenter.report(RunEvent::ClaimRoundFinished {
                    pending: pending
                        .iter()
                        .map(|claim| (claim.account.name.clone(), claim.unclaimed_balance))
                        .collect(),
                });
            }
            prompt = RETRY_PROMPT;
        }

        if !pending.is_empty() {
            self.presenter.report(RunEvent::ClaimsAbandoned {
                accounts: pending.iter().map(|claim| claim.account.name.clone()).collect(),
            });
        }
        pending
    }

    async fn claim(&self, claim: &mut ClaimState) {
        self.presenter.report(RunEvent::ClaimStarted {
            account_name: claim.account.name.clone(),
            amount: claim.unclaimed_balance,
        });

        match self.attempt(claim).await {
            Ok(()) => self.presenter.report(RunEvent::ClaimSucceeded {
                account_name: claim.account.name.clone(),
                address: claim.address(),
            }),
            Err(failure) => {
                tracing::warn!("Claim for '{}' failed: {}", claim.account.name, failure);
                claim.mark_failed(failure.to_string());
                self.presenter.report(RunEvent::ClaimFailed {
                    account_name: claim.account.name.clone(),
                    address: claim.address(),
                    reason: failure.to_string(),
                });
            }
        }
    }

    async fn attempt(&self, claim: &mut ClaimState) -> Result<(), ClaimFailure> {
        let authorization = match claim.begin_attempt()? {
            Some(memoized) => {
                tracing::debug!("Reusing claim authorization for '{}'", claim.account.name);
                memoized
            }
            None => {
                let authorization = self.authorize(&claim.account).await?;
                claim.authorize(authorization.clone())?;
                authorization
            }
        };

        let address = claim.address();
        let nonce = self
            .nonces
            .next(&address)
            .ok_or(ClaimFailure::UnknownNonce(address))?;
        let tx_hash = self
            .gateway
            .submit_claim(address, &authorization, &claim.account.signer, nonce)
            .await
            .map_err(ClaimFailure::Submission)?;
        self.nonces.record_submitted(address, nonce);
        claim.mark_submitted(tx_hash)?;

        self.presenter.report(RunEvent::ClaimSubmitted {
            account_name: claim.account.name.clone(),
            tx_hash,
        });

        let label = format!("claim for '{}'", claim.account.name);
        match wait_for_receipt(self.gateway.as_ref(), tx_hash, &self.policy, &label).await {
            Confirmation::Confirmed => {
                claim.mark_confirmed()?;
                Ok(())
            }
            Confirmation::Reverted => Err(ClaimFailure::Reverted(tx_hash)),
            Confirmation::Unconfirmed => Err(ClaimFailure::Unconfirmed(tx_hash)),
        }
    }

    /// Log in with a signed challenge and ask the game server to sign the claim.
    async fn authorize(&self, account: &Account) -> Result<ClaimAuthorization, ClaimFailure> {
        let message = self
            .identity
            .create_challenge()
            .await
            .map_err(ClaimFailure::Identity)?;
        let signature = account
            .signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| ClaimFailure::Signing(e.to_string()))?;
        let signature = format!("0x{}", hex::encode(signature.as_bytes()));

        let access_token = self
            .identity
            .exchange_signed_challenge(account.address, &message, &signature)
            .await
            .map_err(ClaimFailure::Identity)?;

        self.rewards
            .request_claim_authorization(account.address, &access_token)
            .await
            .map_err(ClaimFailure::Authorization)
    }
}
