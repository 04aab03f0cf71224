//! Payout planner: exact integer split of a claimed balance.
//!
//! ```text
//! fee       = floor(balance × fee_percentage)
//! remainder = balance − fee
//! scholar   = ceil(remainder × scholar_percentage)
//! academy   = remainder − scholar
//! ```
//!
//! Rounding residue always goes to the scholar at the academy's expense.
//! Percentages are `Decimal`, so `0.6` is exactly six tenths and the floor and
//! ceiling see no binary float noise.

use alloy::primitives::Address;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::Account;
use crate::payout::{Payout, Transaction};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayoutError {
    #[error("{kind} percentage {value} is outside [0, 1]")]
    PercentageOutOfRange { kind: &'static str, value: Decimal },
    #[error("payout arithmetic overflowed for balance {balance}")]
    Overflow { balance: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutSplit {
    pub scholar: u64,
    pub academy: u64,
    pub fee: u64,
}

/// Where the fee goes and how large it is. Shared by every account in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    pub address: Address,
    pub percentage: Decimal,
}

fn check_percentage(kind: &'static str, value: Decimal) -> Result<(), PayoutError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(PayoutError::PercentageOutOfRange { kind, value });
    }
    Ok(())
}

fn scaled(balance: u64, amount: u64, percentage: Decimal) -> Result<Decimal, PayoutError> {
    Decimal::from(amount)
        .checked_mul(percentage)
        .ok_or(PayoutError::Overflow { balance })
}

/// Split `balance` into scholar, academy and fee amounts.
pub fn split_balance(
    balance: u64,
    scholar_percentage: Decimal,
    fee_percentage: Decimal,
) -> Result<PayoutSplit, PayoutError> {
    check_percentage("scholar", scholar_percentage)?;
    check_percentage("fee", fee_percentage)?;

    let fee = scaled(balance, balance, fee_percentage)?
        .floor()
        .to_u64()
        .ok_or(PayoutError::Overflow { balance })?;
    let remainder = balance - fee;
    let scholar = scaled(balance, remainder, scholar_percentage)?
        .ceil()
        .to_u64()
        .ok_or(PayoutError::Overflow { balance })?;
    let academy = remainder - scholar;

    debug_assert_eq!(scholar + academy + fee, balance);
    Ok(PayoutSplit {
        scholar,
        academy,
        fee,
    })
}

/// Build the payout for one account.
///
/// Returns `Ok(None)` when the claimed balance is zero; there is nothing to send.
pub fn plan_payout(
    account: &Account,
    slp_balance: u64,
    starting_nonce: u64,
    fee: &FeePolicy,
) -> Result<Option<Payout>, PayoutError> {
    if slp_balance == 0 {
        tracing::info!(
            "Skipping account '{}' ({}): SLP balance is zero",
            account.name,
            account.ronin_address()
        );
        return Ok(None);
    }

    let split = split_balance(slp_balance, account.scholar_payout_percentage, fee.percentage)?;
    let from = account.address;

    let payout = Payout {
        account_name: account.name.clone(),
        signer: account.signer.clone(),
        starting_nonce,
        slp_balance,
        scholar_tx: Transaction::new(from, account.scholar_payout_address, split.scholar),
        academy_tx: Transaction::new(from, account.academy_payout_address, split.academy),
        fee_tx: Transaction::new(from, fee.address, split.fee),
    };
    debug_assert_eq!(payout.total(), slp_balance);
    Ok(Some(payout))
}
