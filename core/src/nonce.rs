//! Per-address nonce bookkeeping for one run.
//!
//! Nonces are fetched from the chain once per account when the run starts and
//! then advanced locally as claims and transfers are broadcast. The lock is
//! only held for the map access itself, never across an await.

use alloy::primitives::Address;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct NonceTable {
    next: Mutex<HashMap<Address, u64>>,
}

impl NonceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the next unused nonce for `address` (as reported by the chain).
    pub fn insert(&self, address: Address, next_nonce: u64) {
        self.next.lock().insert(address, next_nonce);
    }

    /// Next unused nonce, if the address has been seeded.
    pub fn next(&self, address: &Address) -> Option<u64> {
        self.next.lock().get(address).copied()
    }

    /// Record that `nonce` was used by a broadcast transaction.
    ///
    /// The table never moves backwards: recording an older nonce is a no-op.
    /// Returns the next unused nonce afterwards.
    pub fn record_submitted(&self, address: Address, nonce: u64) -> u64 {
        let mut next = self.next.lock();
        let entry = next.entry(address).or_insert(0);
        if nonce + 1 > *entry {
            *entry = nonce + 1;
        }
        *entry
    }
}
