//! Operator-facing console output and the y/n prompts.
//!
//! The run never prints directly. It hands [`RunEvent`]s to a [`Presenter`],
//! which keeps the pipeline testable and lets the console implementation
//! mirror every line into the run log.

use alloy::primitives::{Address, TxHash};
use chrono::{DateTime, Utc};
use slp_payout_core::{format_ronin_address, Payout, PayoutRole};
use std::io::{BufRead, Write};

use crate::blockchain::Confirmation;
use crate::payout::ExecutionSummary;

/// Tracing target of the transcript lines written to the run log.
pub const REPORT_TARGET: &str = "payout::report";

#[derive(Debug, Clone)]
pub enum RunEvent {
    Welcome { date: DateTime<Utc> },
    CheckingUnclaimed,
    UnclaimedFound {
        account_name: String,
        address: Address,
        nonce: u64,
        unclaimed: u64,
        claimed: u64,
    },
    NothingToClaim {
        account_name: String,
        address: Address,
        claimed: u64,
        /// Set when the account still has rewards but is inside the claim cooldown.
        next_claim_at: Option<DateTime<Utc>>,
    },
    LookupFailed {
        account_name: String,
        address: Address,
        reason: String,
    },
    ClaimStarted {
        account_name: String,
        amount: u64,
    },
    ClaimSubmitted {
        account_name: String,
        tx_hash: TxHash,
    },
    ClaimSucceeded {
        account_name: String,
        address: Address,
    },
    ClaimFailed {
        account_name: String,
        address: Address,
        reason: String,
    },
    /// End of one claim round; lists the accounts still pending.
    ClaimRoundFinished { pending: Vec<(String, u64)> },
    AllClaimsSucceeded,
    ClaimsAbandoned { accounts: Vec<String> },
    ReviewPayouts,
    PayoutSkipped {
        account_name: String,
        address: Address,
        reason: String,
    },
    PayoutPreview(Payout),
    NothingToPay,
    ExecutionCancelled,
    ExecutionStarted,
    TransferSubmitted {
        account_name: String,
        role: PayoutRole,
        nonce: u64,
        amount: u64,
        tx_hash: TxHash,
    },
    TransferSkipped {
        account_name: String,
        role: PayoutRole,
        nonce: u64,
    },
    TransferFailed {
        account_name: String,
        role: PayoutRole,
        nonce: u64,
        reason: String,
    },
    TransferAborted {
        account_name: String,
        role: PayoutRole,
        nonce: u64,
    },
    TransferSettled {
        account_name: String,
        role: PayoutRole,
        tx_hash: TxHash,
        outcome: Confirmation,
    },
    Summary(ExecutionSummary),
}

pub trait Presenter: Send + Sync {
    /// Ask a yes/no question. Anything but an explicit yes is a no.
    fn confirm(&self, prompt: &str) -> bool;

    fn report(&self, event: RunEvent);
}

/// Prints to stdout, reads answers from stdin.
pub struct ConsolePresenter {
    explorer_url: String,
}

impl ConsolePresenter {
    pub fn new(explorer_url: impl Into<String>) -> Self {
        Self {
            explorer_url: explorer_url.into(),
        }
    }

    fn explorer_link(&self, tx_hash: &TxHash) -> String {
        format!("{}{}", self.explorer_url, tx_hash)
    }

    pub fn render(&self, event: &RunEvent) -> Vec<String> {
        match event {
            RunEvent::Welcome { date } => vec![format!(
                "*** Welcome to the SLP Payout program *** ({})",
                date.format("%Y-%m-%d")
            )],
            RunEvent::CheckingUnclaimed => vec!["Checking for unclaimed SLP".to_string()],
            RunEvent::UnclaimedFound {
                account_name,
                address,
                nonce,
                unclaimed,
                claimed,
            } => vec![format!(
                "Account '{}' ({}, nonce {}) has {} unclaimed SLP and {} claimed SLP.",
                account_name,
                format_ronin_address(address),
                nonce,
                unclaimed,
                claimed
            )],
            RunEvent::NothingToClaim {
                account_name,
                address,
                claimed,
                next_claim_at,
            } => {
                let mut line = format!(
                    "Account '{}' ({}) has nothing to claim ({} claimed SLP).",
                    account_name,
                    format_ronin_address(address),
                    claimed
                );
                if let Some(at) = next_claim_at {
                    line.push_str(&format!(" Next claim possible on {}.", at.format("%Y-%m-%d %H:%M UTC")));
                }
                vec![line]
            }
            RunEvent::LookupFailed {
                account_name,
                address,
                reason,
            } => vec![format!(
                "Could not check account '{}' ({}): {}",
                account_name,
                format_ronin_address(address),
                reason
            )],
            RunEvent::ClaimStarted { account_name, amount } => {
                vec![format!("   Claiming {} SLP for '{}'...", amount, account_name)]
            }
            RunEvent::ClaimSubmitted { account_name, tx_hash } => vec![format!(
                "   Claim for '{}' submitted. Hash: {} - Explorer: {}",
                account_name,
                tx_hash,
                self.explorer_link(tx_hash)
            )],
            RunEvent::ClaimSucceeded { account_name, address } => vec![format!(
                "   SLP claimed for '{}' ({})!",
                account_name,
                format_ronin_address(address)
            )],
            RunEvent::ClaimFailed {
                account_name,
                address,
                reason,
            } => vec![format!(
                "   SLP claim for '{}' ({}) failed: {}",
                account_name,
                format_ronin_address(address),
                reason
            )],
            RunEvent::ClaimRoundFinished { pending } => {
                let mut lines = vec!["The following claims didn't complete successfully:".to_string()];
                lines.extend(
                    pending
                        .iter()
                        .map(|(name, amount)| format!("  - Account '{}' has {} unclaimed SLP.", name, amount)),
                );
                lines
            }
            RunEvent::AllClaimsSucceeded => vec!["All claims completed successfully!".to_string()],
            RunEvent::ClaimsAbandoned { accounts } => vec![format!(
                "Giving up on claims for: {}. Their payouts use the current on-chain balance.",
                accounts.join(", ")
            )],
            RunEvent::ReviewPayouts => vec![
                String::new(),
                "Please review the payouts for each scholar:".to_string(),
            ],
            RunEvent::PayoutSkipped {
                account_name,
                address,
                reason,
            } => vec![format!(
                "Skipping account '{}' ({}): {}",
                account_name,
                format_ronin_address(address),
                reason
            )],
            RunEvent::PayoutPreview(payout) => preview_tree(payout),
            RunEvent::NothingToPay => vec!["Nothing to pay out.".to_string()],
            RunEvent::ExecutionCancelled => {
                vec!["No transaction was executed. Program will now stop.".to_string()]
            }
            RunEvent::ExecutionStarted => vec![String::new(), "Executing transactions...".to_string()],
            RunEvent::TransferSubmitted {
                account_name,
                role,
                nonce,
                amount,
                tx_hash,
            } => vec![
                format!("'{}' ├─ {}: sent {} SLP (nonce {})", account_name, role, amount, nonce),
                format!(
                    "'{}' │  Hash: {} - Explorer: {}",
                    account_name,
                    tx_hash,
                    self.explorer_link(tx_hash)
                ),
            ],
            RunEvent::TransferSkipped {
                account_name,
                role,
                nonce,
            } => vec![format!(
                "'{}' ├─ Skipping {}: amount is 0 SLP (nonce {} left unused)",
                account_name, role, nonce
            )],
            RunEvent::TransferFailed {
                account_name,
                role,
                nonce,
                reason,
            } => vec![format!(
                "'{}' ├─ {} with nonce {} failed: {}",
                account_name, role, nonce, reason
            )],
            RunEvent::TransferAborted {
                account_name,
                role,
                nonce,
            } => vec![format!(
                "'{}' ├─ {} (nonce {}) not sent because an earlier transfer failed",
                account_name, role, nonce
            )],
            RunEvent::TransferSettled {
                account_name,
                role,
                tx_hash,
                outcome,
            } => {
                let status = match outcome {
                    Confirmation::Confirmed => "confirmed",
                    Confirmation::Reverted => "REVERTED",
                    Confirmation::Unconfirmed => "UNCONFIRMED, check it manually",
                };
                vec![format!(
                    "'{}' └─ {} {}: {}",
                    account_name,
                    role,
                    status,
                    self.explorer_link(tx_hash)
                )]
            }
            RunEvent::Summary(summary) => vec![
                String::new(),
                format!(
                    "Done: {} confirmed, {} reverted, {} unconfirmed, {} failed, {} aborted, {} skipped.",
                    summary.confirmed,
                    summary.reverted,
                    summary.unconfirmed,
                    summary.failed,
                    summary.aborted,
                    summary.skipped
                ),
            ],
        }
    }
}

fn preview_tree(payout: &Payout) -> Vec<String> {
    let mut lines = vec![
        format!("Payout for '{}'", payout.account_name),
        format!("├─ SLP balance: {} SLP", payout.slp_balance),
        format!("├─ Nonce: {}", payout.starting_nonce),
    ];
    let transactions = payout.transactions();
    let last = transactions.len() - 1;
    for (i, (role, tx)) in transactions.into_iter().enumerate() {
        let branch = if i == last { "└─" } else { "├─" };
        lines.push(format!(
            "{} {:<15}: send {:>5} SLP from {} to {}",
            branch,
            role.label(),
            tx.amount,
            format_ronin_address(&tx.from_address),
            format_ronin_address(&tx.to_address)
        ));
    }
    lines.push(String::new());
    lines
}

impl Presenter for ConsolePresenter {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} (y/n) ", prompt);
        if let Err(e) = std::io::stdout().flush() {
            tracing::warn!("Failed to flush prompt to stdout: {}", e);
        }

        let mut answer = String::new();
        if let Err(e) = std::io::stdin().lock().read_line(&mut answer) {
            tracing::warn!("Failed to read answer from stdin: {}", e);
            return false;
        }
        let answer = answer.trim();
        tracing::info!(target: REPORT_TARGET, "{} (y/n) {}", prompt, answer);

        answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
    }

    fn report(&self, event: RunEvent) {
        for line in self.render(&event) {
            println!("{}", line);
            tracing::info!(target: REPORT_TARGET, "{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::local::PrivateKeySigner;
    use slp_payout_core::Transaction;

    fn presenter() -> ConsolePresenter {
        ConsolePresenter::new("https://explorer.roninchain.com/tx/")
    }

    fn sample_payout() -> Payout {
        let signer: PrivateKeySigner = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
            .parse()
            .unwrap();
        let from = signer.address();
        Payout {
            account_name: "Alice".to_string(),
            signer,
            starting_nonce: 7,
            slp_balance: 500,
            scholar_tx: Transaction::new(from, Address::repeat_byte(0x11), 300),
            academy_tx: Transaction::new(from, Address::repeat_byte(0x22), 200),
            fee_tx: Transaction::new(from, Address::repeat_byte(0x33), 0),
        }
    }

    #[test]
    fn test_preview_tree_layout() {
        let lines = presenter().render(&RunEvent::PayoutPreview(sample_payout()));
        assert_eq!(lines[0], "Payout for 'Alice'");
        assert_eq!(lines[1], "├─ SLP balance: 500 SLP");
        assert_eq!(lines[2], "├─ Nonce: 7");
        assert!(lines[3].starts_with("├─ Scholar payout"));
        assert!(lines[3].contains("  300 SLP"));
        assert!(lines[3].contains("to ronin:1111111111111111111111111111111111111111"));
        assert!(lines[4].starts_with("├─ Academy payout"));
        assert!(lines[5].starts_with("└─ Fee payout"));
        assert!(lines[5].contains("    0 SLP"));
    }

    #[test]
    fn test_transfer_submitted_has_explorer_link() {
        let tx_hash = TxHash::repeat_byte(0xab);
        let lines = presenter().render(&RunEvent::TransferSubmitted {
            account_name: "Alice".to_string(),
            role: PayoutRole::Academy,
            nonce: 8,
            amount: 200,
            tx_hash,
        });
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Academy payout"));
        assert!(lines[0].contains("nonce 8"));
        assert!(lines[1].ends_with(&format!("https://explorer.roninchain.com/tx/{}", tx_hash)));
    }

    #[test]
    fn test_round_failure_lists_pending_accounts() {
        let lines = presenter().render(&RunEvent::ClaimRoundFinished {
            pending: vec![("Alice".to_string(), 100), ("Bob".to_string(), 42)],
        });
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "  - Account 'Alice' has 100 unclaimed SLP.");
        assert_eq!(lines[2], "  - Account 'Bob' has 42 unclaimed SLP.");
    }

    #[test]
    fn test_cancel_message() {
        let lines = presenter().render(&RunEvent::ExecutionCancelled);
        assert_eq!(lines, vec!["No transaction was executed. Program will now stop.".to_string()]);
    }

    #[test]
    fn test_unconfirmed_transfer_is_flagged() {
        let lines = presenter().render(&RunEvent::TransferSettled {
            account_name: "Bob".to_string(),
            role: PayoutRole::Scholar,
            tx_hash: TxHash::ZERO,
            outcome: Confirmation::Unconfirmed,
        });
        assert!(lines[0].contains("UNCONFIRMED"));
    }

    #[test]
    fn test_summary_counts() {
        let summary = ExecutionSummary {
            confirmed: 4,
            reverted: 0,
            unconfirmed: 1,
            failed: 1,
            aborted: 1,
            skipped: 2,
        };
        let lines = presenter().render(&RunEvent::Summary(summary));
        assert_eq!(
            lines[1],
            "Done: 4 confirmed, 0 reverted, 1 unconfirmed, 1 failed, 1 aborted, 2 skipped."
        );
    }
}
