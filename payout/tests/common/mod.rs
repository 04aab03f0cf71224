//! In-memory collaborators shared by the payout integration suites.

#![allow(dead_code)]

use alloy::primitives::{Address, Bytes, Signature, TxHash};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use slp_payout::api::{ApiError, IdentityApi, RewardApi, UnclaimedBalance};
use slp_payout::blockchain::{ChainGateway, ConfirmationPolicy, GatewayError, ReceiptStatus};
use slp_payout::presenter::{Presenter, RunEvent};
use slp_payout_core::{Account, ClaimAuthorization, Transaction};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

pub const KEY_A: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const KEY_B: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub const CLAIM_TIMESTAMP: u64 = 1_650_000_000;

pub fn academy() -> Address {
    Address::repeat_byte(0xac)
}

pub fn fee_address() -> Address {
    Address::repeat_byte(0xfe)
}

pub fn account(name: &str, key: &str, split: Decimal) -> Account {
    let signer: PrivateKeySigner = key.parse().unwrap();
    Account {
        name: name.to_string(),
        address: signer.address(),
        signer,
        scholar_payout_address: Address::repeat_byte(name.as_bytes()[0]),
        academy_payout_address: academy(),
        scholar_payout_percentage: split,
    }
}

pub fn fast_policy(max_attempts: u32) -> ConfirmationPolicy {
    ConfirmationPolicy {
        max_attempts,
        delay: std::time::Duration::ZERO,
    }
}

fn hash_for(counter: u64) -> TxHash {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&counter.to_be_bytes());
    TxHash::from(bytes)
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTransfer {
    pub from: Address,
    pub to: Address,
    pub amount: u64,
    pub nonce: u64,
    pub tx_hash: TxHash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedClaim {
    pub owner: Address,
    pub authorization: ClaimAuthorization,
    pub nonce: u64,
    pub tx_hash: TxHash,
}

#[derive(Default)]
struct ChainState {
    balances: HashMap<Address, u64>,
    nonces: HashMap<Address, u64>,
    failing_nonce_lookups: HashSet<Address>,
    failing_balance_lookups: HashSet<Address>,
    claim_submit_failures: HashMap<Address, u32>,
    failing_transfers: HashSet<(Address, u64)>,
    unconfirmed: HashSet<(Address, u64)>,
    reverted: HashSet<(Address, u64)>,
    sent: HashMap<TxHash, (Address, u64)>,
    transfers: Vec<SubmittedTransfer>,
    claims: Vec<SubmittedClaim>,
    receipt_polls: HashMap<TxHash, u32>,
    hash_counter: u64,
}

/// Ledger of SLP balances and nonces. Every broadcast succeeds and confirms
/// unless a rule keyed by `(sender, nonce)` says otherwise.
#[derive(Default)]
pub struct FakeChain {
    state: Mutex<ChainState>,
}

impl FakeChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_account(&self, address: Address, balance: u64, nonce: u64) {
        let mut state = self.state.lock();
        state.balances.insert(address, balance);
        state.nonces.insert(address, nonce);
    }

    pub fn fail_nonce_lookup(&self, address: Address) {
        self.state.lock().failing_nonce_lookups.insert(address);
    }

    pub fn fail_balance_lookup(&self, address: Address) {
        self.state.lock().failing_balance_lookups.insert(address);
    }

    pub fn fail_claim_submissions(&self, address: Address, times: u32) {
        self.state.lock().claim_submit_failures.insert(address, times);
    }

    pub fn fail_transfer(&self, from: Address, nonce: u64) {
        self.state.lock().failing_transfers.insert((from, nonce));
    }

    pub fn never_confirm(&self, from: Address, nonce: u64) {
        self.state.lock().unconfirmed.insert((from, nonce));
    }

    pub fn revert(&self, from: Address, nonce: u64) {
        self.state.lock().reverted.insert((from, nonce));
    }

    pub fn transfers(&self) -> Vec<SubmittedTransfer> {
        self.state.lock().transfers.clone()
    }

    pub fn transfers_from(&self, from: Address) -> Vec<SubmittedTransfer> {
        self.transfers().into_iter().filter(|t| t.from == from).collect()
    }

    pub fn claims(&self) -> Vec<SubmittedClaim> {
        self.state.lock().claims.clone()
    }

    pub fn receipt_polls(&self, tx_hash: TxHash) -> u32 {
        self.state.lock().receipt_polls.get(&tx_hash).copied().unwrap_or(0)
    }

    fn next_hash(state: &mut ChainState, from: Address, nonce: u64) -> TxHash {
        state.hash_counter += 1;
        let tx_hash = hash_for(state.hash_counter);
        state.sent.insert(tx_hash, (from, nonce));
        tx_hash
    }
}

#[async_trait]
impl ChainGateway for FakeChain {
    async fn get_balance(&self, address: Address) -> Result<u64, GatewayError> {
        let state = self.state.lock();
        if state.failing_balance_lookups.contains(&address) {
            return Err(GatewayError::Rpc {
                method: "balanceOf",
                reason: "execution timeout".to_string(),
            });
        }
        Ok(state.balances.get(&address).copied().unwrap_or(0))
    }

    async fn get_nonce(&self, address: Address) -> Result<u64, GatewayError> {
        let state = self.state.lock();
        if state.failing_nonce_lookups.contains(&address) {
            return Err(GatewayError::Rpc {
                method: "eth_getTransactionCount",
                reason: "connection reset".to_string(),
            });
        }
        Ok(state.nonces.get(&address).copied().unwrap_or(0))
    }

    async fn submit_transfer(
        &self,
        tx: &Transaction,
        signer: &PrivateKeySigner,
        nonce: u64,
    ) -> Result<TxHash, GatewayError> {
        assert_eq!(signer.address(), tx.from_address, "transfer signed by the wrong key");
        let mut state = self.state.lock();
        if state.failing_transfers.contains(&(tx.from_address, nonce)) {
            return Err(GatewayError::Broadcast(format!("nonce {} rejected", nonce)));
        }

        let tx_hash = Self::next_hash(&mut state, tx.from_address, nonce);
        state.transfers.push(SubmittedTransfer {
            from: tx.from_address,
            to: tx.to_address,
            amount: tx.amount,
            nonce,
            tx_hash,
        });
        Ok(tx_hash)
    }

    async fn submit_claim(
        &self,
        owner: Address,
        authorization: &ClaimAuthorization,
        signer: &PrivateKeySigner,
        nonce: u64,
    ) -> Result<TxHash, GatewayError> {
        assert_eq!(signer.address(), owner, "claim signed by the wrong key");
        let mut state = self.state.lock();
        if let Some(remaining) = state.claim_submit_failures.get_mut(&owner) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(GatewayError::Broadcast("claim rejected by node".to_string()));
            }
        }

        let tx_hash = Self::next_hash(&mut state, owner, nonce);
        if !state.unconfirmed.contains(&(owner, nonce)) && !state.reverted.contains(&(owner, nonce)) {
            *state.balances.entry(owner).or_insert(0) += authorization.amount;
        }
        state.claims.push(SubmittedClaim {
            owner,
            authorization: authorization.clone(),
            nonce,
            tx_hash,
        });
        Ok(tx_hash)
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<ReceiptStatus>, GatewayError> {
        let mut state = self.state.lock();
        *state.receipt_polls.entry(tx_hash).or_insert(0) += 1;

        let Some(key) = state.sent.get(&tx_hash).copied() else {
            return Ok(None);
        };
        if state.unconfirmed.contains(&key) {
            Ok(None)
        } else if state.reverted.contains(&key) {
            Ok(Some(ReceiptStatus::Reverted))
        } else {
            Ok(Some(ReceiptStatus::Success))
        }
    }
}

// ---------------------------------------------------------------------------
// Game API and identity gateway
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRewards {
    unclaimed: Mutex<HashMap<Address, UnclaimedBalance>>,
    failing_lookups: Mutex<HashSet<Address>>,
    authorization_failures: Mutex<HashMap<Address, u32>>,
    authorization_requests: Mutex<HashMap<Address, u32>>,
}

impl FakeRewards {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Unclaimed SLP whose last claim is well outside any cooldown.
    pub fn set_unclaimed(&self, address: Address, amount: u64) {
        self.set_unclaimed_since(address, amount, Utc::now() - Duration::days(30));
    }

    pub fn set_unclaimed_since(&self, address: Address, amount: u64, last_claimed_at: DateTime<Utc>) {
        self.unclaimed.lock().insert(
            address,
            UnclaimedBalance {
                amount,
                last_claimed_at,
            },
        );
    }

    pub fn fail_lookup(&self, address: Address) {
        self.failing_lookups.lock().insert(address);
    }

    /// The next `times` claim authorization requests for `address` get a 500.
    pub fn fail_authorizations(&self, address: Address, times: u32) {
        self.authorization_failures.lock().insert(address, times);
    }

    pub fn authorization_requests(&self, address: Address) -> u32 {
        self.authorization_requests.lock().get(&address).copied().unwrap_or(0)
    }
}

pub fn access_token_for(address: Address) -> String {
    format!("token-{}", address)
}

#[async_trait]
impl RewardApi for FakeRewards {
    async fn get_unclaimed_balance(&self, address: Address) -> Result<UnclaimedBalance, ApiError> {
        if self.failing_lookups.lock().contains(&address) {
            return Err(ApiError::Status {
                endpoint: "items",
                status: 502,
                body: "Bad Gateway".to_string(),
            });
        }
        Ok(self
            .unclaimed
            .lock()
            .get(&address)
            .copied()
            .unwrap_or(UnclaimedBalance {
                amount: 0,
                last_claimed_at: Utc::now() - Duration::days(30),
            }))
    }

    async fn request_claim_authorization(
        &self,
        address: Address,
        access_token: &str,
    ) -> Result<ClaimAuthorization, ApiError> {
        if access_token != access_token_for(address) {
            return Err(ApiError::Status {
                endpoint: "claim",
                status: 401,
                body: "Unauthorized".to_string(),
            });
        }
        *self.authorization_requests.lock().entry(address).or_insert(0) += 1;
        if let Some(remaining) = self.authorization_failures.lock().get_mut(&address) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ApiError::Status {
                    endpoint: "claim",
                    status: 500,
                    body: "Internal Server Error".to_string(),
                });
            }
        }

        let amount = self.unclaimed.lock().get(&address).map(|u| u.amount).unwrap_or(0);
        Ok(ClaimAuthorization {
            signature: Bytes::from(vec![0x5a; 65]),
            amount,
            timestamp: CLAIM_TIMESTAMP,
        })
    }
}

/// Issues numbered challenges and only hands out a token when the signature
/// recovers to the claimed owner.
#[derive(Default)]
pub struct FakeIdentity {
    challenges: Mutex<u32>,
}

impl FakeIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn challenges(&self) -> u32 {
        *self.challenges.lock()
    }
}

#[async_trait]
impl IdentityApi for FakeIdentity {
    async fn create_challenge(&self) -> Result<String, ApiError> {
        let mut challenges = self.challenges.lock();
        *challenges += 1;
        Ok(format!("Sign this message to log in: {}", *challenges))
    }

    async fn exchange_signed_challenge(
        &self,
        address: Address,
        message: &str,
        signature: &str,
    ) -> Result<String, ApiError> {
        let malformed = |reason: String| ApiError::Malformed {
            endpoint: "CreateAccessTokenWithSignature",
            reason,
        };
        let raw = hex::decode(signature.trim_start_matches("0x")).map_err(|e| malformed(e.to_string()))?;
        let signature = Signature::from_raw(&raw).map_err(|e| malformed(e.to_string()))?;
        let signer = signature
            .recover_address_from_msg(message)
            .map_err(|e| malformed(e.to_string()))?;
        if signer != address {
            return Err(malformed(format!("signature is from {}, not {}", signer, address)));
        }
        Ok(access_token_for(address))
    }
}

// ---------------------------------------------------------------------------
// Presenter
// ---------------------------------------------------------------------------

/// Answers prompts from a script (missing answers are "no") and records everything.
#[derive(Default)]
pub struct RecordingPresenter {
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingPresenter {
    pub fn answering(answers: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            ..Self::default()
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&RunEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| matches(e)).count()
    }
}

impl Presenter for RecordingPresenter {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().push(prompt.to_string());
        self.answers.lock().pop_front().unwrap_or(false)
    }

    fn report(&self, event: RunEvent) {
        self.events.lock().push(event);
    }
}
