//! One payout run: claim, plan, review, execute.

use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use slp_payout_core::{plan_payout, Account, NonceTable, Payout};
use std::sync::Arc;
use std::time::Duration;

use super::claim::ClaimCoordinator;
use super::executor::{ExecutionSummary, PayoutExecutor, PayoutReport, DEFAULT_SUBMIT_SPACING};
use crate::api::{IdentityApi, RewardApi};
use crate::blockchain::ChainGateway;
use crate::config::Settings;
use crate::presenter::{Presenter, RunEvent};

pub const EXECUTE_PROMPT: &str = "Would you like to execute transactions";

/// External services a run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub gateway: Arc<dyn ChainGateway>,
    pub rewards: Arc<dyn RewardApi>,
    pub identity: Arc<dyn IdentityApi>,
    pub presenter: Arc<dyn Presenter>,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// No account had a positive balance.
    NothingToPay,
    /// The operator declined the reviewed payouts.
    Cancelled { planned: Vec<Payout> },
    Executed {
        reports: Vec<PayoutReport>,
        summary: ExecutionSummary,
    },
}

pub struct PayoutRun {
    settings: Settings,
    collaborators: Collaborators,
    nonces: Arc<NonceTable>,
    submit_spacing: Duration,
}

impl PayoutRun {
    pub fn new(settings: Settings, collaborators: Collaborators) -> Self {
        Self {
            settings,
            collaborators,
            nonces: Arc::new(NonceTable::new()),
            submit_spacing: DEFAULT_SUBMIT_SPACING,
        }
    }

    pub fn with_submit_spacing(mut self, spacing: Duration) -> Self {
        self.submit_spacing = spacing;
        self
    }

    pub async fn execute(&self) -> Result<RunOutcome> {
        let presenter = &self.collaborators.presenter;
        let policy = self.settings.network.confirmation_policy();
        presenter.report(RunEvent::Welcome { date: Utc::now() });

        let coordinator = ClaimCoordinator::new(
            self.collaborators.gateway.clone(),
            self.collaborators.rewards.clone(),
            self.collaborators.identity.clone(),
            self.nonces.clone(),
            presenter.clone(),
            policy,
            self.settings.network.claim_cooldown(),
        );
        let pending = coordinator.discover(&self.settings.accounts).await;
        let abandoned = coordinator.run(pending).await;
        if !abandoned.is_empty() {
            tracing::warn!("{} claim(s) abandoned by the operator", abandoned.len());
        }

        let payouts = self.plan().await?;
        if payouts.is_empty() {
            presenter.report(RunEvent::NothingToPay);
            return Ok(RunOutcome::NothingToPay);
        }
        for payout in &payouts {
            presenter.report(RunEvent::PayoutPreview(payout.clone()));
        }

        if !presenter.confirm(EXECUTE_PROMPT) {
            presenter.report(RunEvent::ExecutionCancelled);
            return Ok(RunOutcome::Cancelled { planned: payouts });
        }

        let executor = PayoutExecutor::new(
            self.collaborators.gateway.clone(),
            self.nonces.clone(),
            presenter.clone(),
            policy,
        )
        .with_submit_spacing(self.submit_spacing);
        let reports = executor.execute(&payouts).await;

        let summary = ExecutionSummary::from_reports(&reports);
        presenter.report(RunEvent::Summary(summary));
        tracing::info!("Payout run finished: {:?}", summary);

        Ok(RunOutcome::Executed { reports, summary })
    }

    /// Plan every account from its current on-chain balance, in config order.
    async fn plan(&self) -> Result<Vec<Payout>> {
        self.collaborators.presenter.report(RunEvent::ReviewPayouts);

        let plans = join_all(self.settings.accounts.iter().map(|account| self.plan_account(account))).await;
        let mut payouts = Vec::new();
        for plan in plans {
            if let Some(payout) = plan? {
                payouts.push(payout);
            }
        }
        Ok(payouts)
    }

    async fn plan_account(&self, account: &Account) -> Result<Option<Payout>> {
        let Some(starting_nonce) = self.nonces.next(&account.address) else {
            self.skip(account, "nonce is unknown because the chain lookup failed".to_string());
            return Ok(None);
        };
        let balance = match self.collaborators.gateway.get_balance(account.address).await {
            Ok(balance) => balance,
            Err(e) => {
                self.skip(account, format!("balance lookup failed: {}", e));
                return Ok(None);
            }
        };

        let payout = plan_payout(account, balance, starting_nonce, &self.settings.fee)
            .with_context(|| format!("planning payout for '{}'", account.name))?;
        if payout.is_none() {
            self.skip(account, "SLP balance is zero".to_string());
        }
        Ok(payout)
    }

    fn skip(&self, account: &Account, reason: String) {
        self.collaborators.presenter.report(RunEvent::PayoutSkipped {
            account_name: account.name.clone(),
            address: account.address,
            reason,
        });
    }
}
