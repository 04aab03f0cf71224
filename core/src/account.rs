use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use rust_decimal::Decimal;
use std::fmt;

use crate::address::format_ronin_address;

/// A managed player account. Loaded once from config and never mutated.
#[derive(Clone)]
pub struct Account {
    pub name: String,
    pub address: Address,
    /// Signing key for `address`; used for the identity challenge, claims and transfers.
    pub signer: PrivateKeySigner,
    pub scholar_payout_address: Address,
    pub academy_payout_address: Address,
    /// Scholar share of the post-fee balance, in [0, 1].
    pub scholar_payout_percentage: Decimal,
}

impl Account {
    pub fn ronin_address(&self) -> String {
        format_ronin_address(&self.address)
    }
}

// Keeps key material out of logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("scholar_payout_address", &self.scholar_payout_address)
            .field("academy_payout_address", &self.academy_payout_address)
            .field("scholar_payout_percentage", &self.scholar_payout_percentage)
            .finish_non_exhaustive()
    }
}
