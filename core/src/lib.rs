//! SLP Payout Core
//!
//! Pure domain for the guild payout tool: Ronin addresses, managed accounts,
//! payout transactions, the three-way balance split, the per-address nonce
//! table and the claim lifecycle. Nothing in this crate performs I/O.

pub mod address;
pub mod account;
pub mod payout;
pub mod planner;
pub mod nonce;
pub mod claim;

pub use account::Account;
pub use address::{format_ronin_address, parse_ronin_address, AddressError, RONIN_ADDRESS_PREFIX};
pub use claim::{ClaimAuthorization, ClaimStage, ClaimState, ClaimTransitionError};
pub use nonce::NonceTable;
pub use payout::{Payout, PayoutRole, Transaction};
pub use planner::{plan_payout, split_balance, FeePolicy, PayoutError, PayoutSplit};
