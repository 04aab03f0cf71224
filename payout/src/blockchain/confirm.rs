//! Bounded receipt polling.
//!
//! A transaction gets `max_attempts` receipt lookups spaced by `delay`
//! (24 × 5 s by default). Running out of attempts is an outcome, not an error.

use alloy::primitives::TxHash;
use std::time::Duration;

use super::gateway::{ChainGateway, ReceiptStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 24,
            delay: Duration::from_secs(5),
        }
    }
}

impl ConfirmationPolicy {
    /// Upper bound on how long one wait can take.
    pub fn budget(&self) -> Duration {
        self.delay * self.max_attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Reverted,
    /// No receipt within the attempt budget. The operator has to check it.
    Unconfirmed,
}

/// Poll for the receipt of `tx_hash` until it shows up or the budget runs out.
///
/// Lookup errors count as an attempt and are otherwise treated like "not found yet".
pub async fn wait_for_receipt(
    gateway: &dyn ChainGateway,
    tx_hash: TxHash,
    policy: &ConfirmationPolicy,
    label: &str,
) -> Confirmation {
    for attempt in 1..=policy.max_attempts {
        match gateway.get_receipt(tx_hash).await {
            Ok(Some(ReceiptStatus::Success)) => {
                tracing::debug!("{}: {} confirmed after {} poll(s)", label, tx_hash, attempt);
                return Confirmation::Confirmed;
            }
            Ok(Some(ReceiptStatus::Reverted)) => {
                tracing::warn!("{}: {} reverted", label, tx_hash);
                return Confirmation::Reverted;
            }
            Ok(None) => {
                tracing::debug!(
                    "{}: waiting for {} ({}/{})",
                    label,
                    tx_hash,
                    attempt,
                    policy.max_attempts
                );
            }
            Err(e) => {
                tracing::warn!(
                    "{}: receipt lookup for {} failed ({}/{}): {}",
                    label,
                    tx_hash,
                    attempt,
                    policy.max_attempts,
                    e
                );
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    tracing::warn!(
        "{}: no receipt for {} after {} attempts (~{}s)",
        label,
        tx_hash,
        policy.max_attempts,
        policy.budget().as_secs()
    );
    Confirmation::Unconfirmed
}
