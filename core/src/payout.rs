//! Payout transactions.
//!
//! A [`Payout`] is the fixed triple of transfers (scholar, academy, fee) that
//! drains one account's claimed SLP balance. The three transfers share the
//! account as sender and are bound to consecutive nonces by role, so the
//! nonce a transfer uses never depends on whether its siblings are sent.

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use std::fmt;

/// A single SLP transfer. Amounts are whole SLP (the token has no decimals).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    pub from_address: Address,
    pub to_address: Address,
    pub amount: u64,
}

impl Transaction {
    pub fn new(from_address: Address, to_address: Address, amount: u64) -> Self {
        Self {
            from_address,
            to_address,
            amount,
        }
    }
}

/// Position of a transfer inside a payout. Determines both submission order and nonce offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PayoutRole {
    Scholar,
    Academy,
    Fee,
}

impl PayoutRole {
    /// Submission order.
    pub const ALL: [PayoutRole; 3] = [PayoutRole::Scholar, PayoutRole::Academy, PayoutRole::Fee];

    pub fn nonce_offset(self) -> u64 {
        match self {
            PayoutRole::Scholar => 0,
            PayoutRole::Academy => 1,
            PayoutRole::Fee => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PayoutRole::Scholar => "Scholar payout",
            PayoutRole::Academy => "Academy payout",
            PayoutRole::Fee => "Fee payout",
        }
    }
}

impl fmt::Display for PayoutRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone)]
pub struct Payout {
    pub account_name: String,
    pub signer: PrivateKeySigner,
    pub starting_nonce: u64,
    pub slp_balance: u64,
    pub scholar_tx: Transaction,
    pub academy_tx: Transaction,
    pub fee_tx: Transaction,
}

impl Payout {
    pub fn from_address(&self) -> Address {
        self.scholar_tx.from_address
    }

    pub fn transaction(&self, role: PayoutRole) -> &Transaction {
        match role {
            PayoutRole::Scholar => &self.scholar_tx,
            PayoutRole::Academy => &self.academy_tx,
            PayoutRole::Fee => &self.fee_tx,
        }
    }

    /// Transfers in submission order, zero amounts included.
    pub fn transactions(&self) -> [(PayoutRole, &Transaction); 3] {
        PayoutRole::ALL.map(|role| (role, self.transaction(role)))
    }

    pub fn nonce_for(&self, role: PayoutRole) -> u64 {
        self.starting_nonce + role.nonce_offset()
    }

    pub fn total(&self) -> u64 {
        self.scholar_tx.amount + self.academy_tx.amount + self.fee_tx.amount
    }
}

impl fmt::Debug for Payout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payout")
            .field("account_name", &self.account_name)
            .field("starting_nonce", &self.starting_nonce)
            .field("slp_balance", &self.slp_balance)
            .field("scholar_tx", &self.scholar_tx)
            .field("academy_tx", &self.academy_tx)
            .field("fee_tx", &self.fee_tx)
            .finish_non_exhaustive()
    }
}
