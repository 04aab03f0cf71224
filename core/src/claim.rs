//! Claim lifecycle for one account.
//!
//! ```text
//! Unclaimed ─► AwaitingSignature ─► Authorized ─► Submitted ─► Confirmed
//!                     │                  ▲            │
//!                     ▼                  │            ▼
//!              FailedRetryable ──────────┴──── FailedRetryable
//! ```
//!
//! The claim authorization (server signature, amount, timestamp) is memoized
//! as soon as it is obtained. A retry after a failed submission or an
//! unconfirmed receipt goes straight back to `Authorized` and reuses it.

use alloy::primitives::{Address, Bytes, TxHash};
use thiserror::Error;

use crate::account::Account;

/// Server-issued permission to checkpoint `amount` SLP on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimAuthorization {
    pub signature: Bytes,
    pub amount: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimStage {
    Unclaimed,
    AwaitingSignature,
    Authorized(ClaimAuthorization),
    Submitted {
        authorization: ClaimAuthorization,
        tx_hash: TxHash,
    },
    FailedRetryable {
        authorization: Option<ClaimAuthorization>,
        reason: String,
    },
    Confirmed {
        tx_hash: TxHash,
    },
}

impl ClaimStage {
    pub fn name(&self) -> &'static str {
        match self {
            ClaimStage::Unclaimed => "unclaimed",
            ClaimStage::AwaitingSignature => "awaiting-signature",
            ClaimStage::Authorized(_) => "authorized",
            ClaimStage::Submitted { .. } => "submitted",
            ClaimStage::FailedRetryable { .. } => "failed",
            ClaimStage::Confirmed { .. } => "confirmed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid claim transition from {from} to {to}")]
pub struct ClaimTransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Debug, Clone)]
pub struct ClaimState {
    pub account: Account,
    pub unclaimed_balance: u64,
    pub claimed_balance: u64,
    stage: ClaimStage,
}

impl ClaimState {
    pub fn new(account: Account, unclaimed_balance: u64, claimed_balance: u64) -> Self {
        Self {
            account,
            unclaimed_balance,
            claimed_balance,
            stage: ClaimStage::Unclaimed,
        }
    }

    pub fn address(&self) -> Address {
        self.account.address
    }

    pub fn stage(&self) -> &ClaimStage {
        &self.stage
    }

    /// The memoized authorization, if one has been obtained.
    pub fn authorization(&self) -> Option<&ClaimAuthorization> {
        match &self.stage {
            ClaimStage::Authorized(auth) => Some(auth),
            ClaimStage::Submitted { authorization, .. } => Some(authorization),
            ClaimStage::FailedRetryable { authorization, .. } => authorization.as_ref(),
            _ => None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.stage, ClaimStage::Confirmed { .. })
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.stage {
            ClaimStage::FailedRetryable { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Start an attempt.
    ///
    /// With a memoized authorization the claim moves straight to `Authorized`
    /// and the authorization is returned; otherwise it waits for a signature.
    pub fn begin_attempt(&mut self) -> Result<Option<ClaimAuthorization>, ClaimTransitionError> {
        match &self.stage {
            ClaimStage::Unclaimed | ClaimStage::FailedRetryable { authorization: None, .. } => {
                self.stage = ClaimStage::AwaitingSignature;
                Ok(None)
            }
            ClaimStage::FailedRetryable {
                authorization: Some(auth),
                ..
            } => {
                let auth = auth.clone();
                self.stage = ClaimStage::Authorized(auth.clone());
                Ok(Some(auth))
            }
            other => Err(ClaimTransitionError {
                from: other.name(),
                to: "attempt",
            }),
        }
    }

    pub fn authorize(&mut self, authorization: ClaimAuthorization) -> Result<(), ClaimTransitionError> {
        match self.stage {
            ClaimStage::AwaitingSignature => {
                self.stage = ClaimStage::Authorized(authorization);
                Ok(())
            }
            ref other => Err(ClaimTransitionError {
                from: other.name(),
                to: "authorized",
            }),
        }
    }

    pub fn mark_submitted(&mut self, tx_hash: TxHash) -> Result<(), ClaimTransitionError> {
        match &self.stage {
            ClaimStage::Authorized(auth) => {
                self.stage = ClaimStage::Submitted {
                    authorization: auth.clone(),
                    tx_hash,
                };
                Ok(())
            }
            other => Err(ClaimTransitionError {
                from: other.name(),
                to: "submitted",
            }),
        }
    }

    pub fn mark_confirmed(&mut self) -> Result<(), ClaimTransitionError> {
        match &self.stage {
            ClaimStage::Submitted { tx_hash, .. } => {
                self.stage = ClaimStage::Confirmed { tx_hash: *tx_hash };
                Ok(())
            }
            other => Err(ClaimTransitionError {
                from: other.name(),
                to: "confirmed",
            }),
        }
    }

    /// Record a failed attempt, keeping any memoized authorization.
    ///
    /// A confirmed claim stays confirmed.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        if self.is_confirmed() {
            return;
        }
        let authorization = self.authorization().cloned();
        self.stage = ClaimStage::FailedRetryable {
            authorization,
            reason: reason.into(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::local::PrivateKeySigner;
    use rust_decimal::Decimal;

    fn claim() -> ClaimState {
        let signer = PrivateKeySigner::random();
        let account = Account {
            name: "alpha".into(),
            address: signer.address(),
            signer,
            scholar_payout_address: Address::repeat_byte(0x01),
            academy_payout_address: Address::repeat_byte(0x02),
            scholar_payout_percentage: Decimal::new(5, 1),
        };
        ClaimState::new(account, 100, 0)
    }

    fn auth() -> ClaimAuthorization {
        ClaimAuthorization {
            signature: Bytes::from(vec![0xde, 0xad]),
            amount: 100,
            timestamp: 1_650_000_000,
        }
    }

    #[test]
    fn test_happy_path() {
        let mut c = claim();
        assert_eq!(c.begin_attempt().unwrap(), None);
        assert_eq!(c.stage(), &ClaimStage::AwaitingSignature);

        c.authorize(auth()).unwrap();
        c.mark_submitted(TxHash::repeat_byte(1)).unwrap();
        c.mark_confirmed().unwrap();
        assert!(c.is_confirmed());
        assert_eq!(
            c.stage(),
            &ClaimStage::Confirmed { tx_hash: TxHash::repeat_byte(1) }
        );
    }

    #[test]
    fn test_retry_reuses_memoized_authorization() {
        let mut c = claim();
        c.begin_attempt().unwrap();
        c.authorize(auth()).unwrap();
        c.mark_submitted(TxHash::repeat_byte(2)).unwrap();
        c.mark_failed("receipt not found after 24 attempts");

        assert_eq!(c.failure_reason(), Some("receipt not found after 24 attempts"));
        assert_eq!(c.authorization(), Some(&auth()));

        let memo = c.begin_attempt().unwrap();
        assert_eq!(memo, Some(auth()));
        assert_eq!(c.stage(), &ClaimStage::Authorized(auth()));
    }

    #[test]
    fn test_failure_before_signature_asks_again() {
        let mut c = claim();
        c.begin_attempt().unwrap();
        c.mark_failed("claim endpoint returned 500");
        assert_eq!(c.authorization(), None);
        assert_eq!(c.begin_attempt().unwrap(), None);
        assert_eq!(c.stage(), &ClaimStage::AwaitingSignature);
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let mut c = claim();
        assert_eq!(
            c.mark_submitted(TxHash::ZERO),
            Err(ClaimTransitionError { from: "unclaimed", to: "submitted" })
        );
        c.begin_attempt().unwrap();
        assert!(c.begin_attempt().is_err());
        assert!(c.mark_confirmed().is_err());
    }

    #[test]
    fn test_confirmed_is_terminal() {
        let mut c = claim();
        c.begin_attempt().unwrap();
        c.authorize(auth()).unwrap();
        c.mark_submitted(TxHash::repeat_byte(3)).unwrap();
        c.mark_confirmed().unwrap();
        c.mark_failed("late failure");
        assert!(c.is_confirmed());
    }
}
