//! Payout execution.
//!
//! Phase 1 submits every account's transfers concurrently across accounts but
//! strictly in role order within an account, each on `starting_nonce + offset`.
//! Phase 2 waits for all submitted transfers in one concurrent batch.
//!
//! A failed submission aborts the remaining transfers of that account only.
//! Unconfirmed transfers are reported, never retried.

use alloy::primitives::TxHash;
use futures::future::join_all;
use slp_payout_core::{NonceTable, Payout, PayoutRole, Transaction};
use std::sync::Arc;
use std::time::Duration;

use crate::blockchain::{wait_for_receipt, ChainGateway, Confirmation, ConfirmationPolicy};
use crate::presenter::{Presenter, RunEvent};

pub const DEFAULT_SUBMIT_SPACING: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    /// Zero amount. Its nonce slot is left unused.
    Skipped,
    /// Not sent because an earlier transfer of the same payout failed.
    Aborted,
    SubmitFailed(String),
    /// Broadcast, outcome not known yet.
    Submitted(TxHash),
    Confirmed(TxHash),
    Reverted(TxHash),
    Unconfirmed(TxHash),
}

#[derive(Debug, Clone)]
pub struct TransferReport {
    pub role: PayoutRole,
    pub transaction: Transaction,
    pub nonce: u64,
    pub status: TransferStatus,
}

#[derive(Debug, Clone)]
pub struct PayoutReport {
    pub account_name: String,
    pub transfers: Vec<TransferReport>,
}

impl PayoutReport {
    pub fn transfer(&self, role: PayoutRole) -> Option<&TransferReport> {
        self.transfers.iter().find(|t| t.role == role)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub confirmed: usize,
    pub reverted: usize,
    pub unconfirmed: usize,
    pub failed: usize,
    pub aborted: usize,
    pub skipped: usize,
}

impl ExecutionSummary {
    pub fn from_reports(reports: &[PayoutReport]) -> Self {
        let mut summary = Self::default();
        for transfer in reports.iter().flat_map(|r| r.transfers.iter()) {
            match transfer.status {
                TransferStatus::Confirmed(_) => summary.confirmed += 1,
                TransferStatus::Reverted(_) => summary.reverted += 1,
                TransferStatus::Submitted(_) | TransferStatus::Unconfirmed(_) => summary.unconfirmed += 1,
                TransferStatus::SubmitFailed(_) => summary.failed += 1,
                TransferStatus::Aborted => summary.aborted += 1,
                TransferStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    /// True when every non-zero transfer confirmed.
    pub fn is_clean(&self) -> bool {
        self.reverted + self.unconfirmed + self.failed + self.aborted == 0
    }
}

pub struct PayoutExecutor {
    gateway: Arc<dyn ChainGateway>,
    nonces: Arc<NonceTable>,
    presenter: Arc<dyn Presenter>,
    policy: ConfirmationPolicy,
    submit_spacing: Duration,
}

impl PayoutExecutor {
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        nonces: Arc<NonceTable>,
        presenter: Arc<dyn Presenter>,
        policy: ConfirmationPolicy,
    ) -> Self {
        Self {
            gateway,
            nonces,
            presenter,
            policy,
            submit_spacing: DEFAULT_SUBMIT_SPACING,
        }
    }

    /// Pause after each broadcast within one account.
    pub fn with_submit_spacing(mut self, spacing: Duration) -> Self {
        self.submit_spacing = spacing;
        self
    }

    pub async fn execute(&self, payouts: &[Payout]) -> Vec<PayoutReport> {
        self.presenter.report(RunEvent::ExecutionStarted);

        let mut reports = join_all(payouts.iter().map(|payout| self.submit(payout))).await;

        let settles = reports.iter_mut().flat_map(|report| {
            let PayoutReport {
                account_name,
                transfers,
            } = report;
            let account_name: &str = account_name;
            transfers
                .iter_mut()
                .map(move |transfer| self.settle(account_name, transfer))
        });
        join_all(settles).await;

        reports
    }

    async fn submit(&self, payout: &Payout) -> PayoutReport {
        let mut transfers = Vec::with_capacity(PayoutRole::ALL.len());
        let mut aborted = false;

        for (role, tx) in payout.transactions() {
            let nonce = payout.nonce_for(role);
            let status = if aborted {
                self.presenter.report(RunEvent::TransferAborted {
                    account_name: payout.account_name.clone(),
                    role,
                    nonce,
                });
                TransferStatus::Aborted
            } else if tx.amount == 0 {
                self.presenter.report(RunEvent::TransferSkipped {
                    account_name: payout.account_name.clone(),
                    role,
                    nonce,
                });
                TransferStatus::Skipped
            } else {
                match self.gateway.submit_transfer(tx, &payout.signer, nonce).await {
                    Ok(tx_hash) => {
                        self.nonces.record_submitted(payout.from_address(), nonce);
                        tracing::info!(
                            "{} for '{}': {} SLP, nonce {}, hash {}",
                            role,
                            payout.account_name,
                            tx.amount,
                            nonce,
                            tx_hash
                        );
                        self.presenter.report(RunEvent::TransferSubmitted {
                            account_name: payout.account_name.clone(),
                            role,
                            nonce,
                            amount: tx.amount,
                            tx_hash,
                        });
                        tokio::time::sleep(self.submit_spacing).await;
                        TransferStatus::Submitted(tx_hash)
                    }
                    Err(e) => {
                        tracing::error!(
                            "{} for '{}' with nonce {} failed: {}",
                            role,
                            payout.account_name,
                            nonce,
                            e
                        );
                        aborted = true;
                        self.presenter.report(RunEvent::TransferFailed {
                            account_name: payout.account_name.clone(),
                            role,
                            nonce,
                            reason: e.to_string(),
                        });
                        TransferStatus::SubmitFailed(e.to_string())
                    }
                }
            };

            transfers.push(TransferReport {
                role,
                transaction: *tx,
                nonce,
                status,
            });
        }

        PayoutReport {
            account_name: payout.account_name.clone(),
            transfers,
        }
    }

    async fn settle(&self, account_name: &str, transfer: &mut TransferReport) {
        let TransferStatus::Submitted(tx_hash) = transfer.status else {
            return;
        };

        let label = format!("{} for '{}'", transfer.role, account_name);
        let outcome = wait_for_receipt(self.gateway.as_ref(), tx_hash, &self.policy, &label).await;
        transfer.status = match outcome {
            Confirmation::Confirmed => TransferStatus::Confirmed(tx_hash),
            Confirmation::Reverted => TransferStatus::Reverted(tx_hash),
            Confirmation::Unconfirmed => TransferStatus::Unconfirmed(tx_hash),
        };

        self.presenter.report(RunEvent::TransferSettled {
            account_name: account_name.to_string(),
            role: transfer.role,
            tx_hash,
            outcome,
        });
    }
}
