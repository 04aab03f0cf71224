//! Run configuration.
//!
//! The payout file is JSON with the guild's historical PascalCase keys:
//!
//! ```json
//! {
//!   "AcademyPayoutAddress": "ronin:…",
//!   "FeePayoutAddress": "ronin:…",
//!   "FeePayoutPercentage": 0,
//!   "Network": { "RpcUrl": "…" },
//!   "Scholars": [
//!     { "Name": "…", "AccountAddress": "ronin:…", "PrivateKey": "0x…",
//!       "ScholarPayoutAddress": "ronin:…", "ScholarPayoutPercentage": 0.5 }
//!   ]
//! }
//! ```
//!
//! Everything is validated here, before any network traffic.

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use rust_decimal::Decimal;
use serde::Deserialize;
use slp_payout_core::{format_ronin_address, parse_ronin_address, Account, AddressError, FeePolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::blockchain::ConfirmationPolicy;

pub const DEFAULT_FEE_PAYOUT_ADDRESS: &str = "ronin:a0caa7803205026ec08818664c4211aff7565f56";
pub const DEFAULT_SLP_CONTRACT: &str = "ronin:a8754b9fa15fc18bb59458815510e40a12cd2014";
/// Upper bound for `ClaimCooldownDays`. The game's own cooldown is 14 days.
pub const MAX_CLAIM_COOLDOWN_DAYS: i64 = 365;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{field}: {source}")]
    Address {
        field: String,
        #[source]
        source: AddressError,
    },
    #[error("{field}: percentage {value} is outside [0, 1]")]
    Percentage { field: String, value: Decimal },
    #[error("scholar '{name}': private key is not a valid secp256k1 key")]
    PrivateKey { name: String },
    #[error("scholar '{name}': private key controls {actual}, not the configured account {expected}")]
    KeyMismatch {
        name: String,
        expected: String,
        actual: String,
    },
    #[error("no scholars configured")]
    NoScholars,
    #[error("network: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub game_api_url: String,
    pub graphql_url: String,
    pub explorer_url: String,
    pub slp_contract: String,
    pub chain_id: u64,
    pub gas_limit: u64,
    pub gas_price_wei: u64,
    /// Receipt polls per transaction before giving up as unconfirmed.
    pub receipt_attempts: u32,
    pub receipt_delay_secs: u64,
    /// The game only allows one claim per this many days.
    pub claim_cooldown_days: i64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.roninchain.com/rpc".to_string(),
            game_api_url: "https://game-api-pre.skymavis.com".to_string(),
            graphql_url: "https://graphql-gateway.axieinfinity.com/graphql".to_string(),
            explorer_url: "https://explorer.roninchain.com/tx/".to_string(),
            slp_contract: DEFAULT_SLP_CONTRACT.to_string(),
            chain_id: 2020,
            gas_limit: 1_000_000,
            gas_price_wei: 1_000_000_000,
            receipt_attempts: 24,
            receipt_delay_secs: 5,
            claim_cooldown_days: 14,
        }
    }
}

impl NetworkConfig {
    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            max_attempts: self.receipt_attempts,
            delay: Duration::from_secs(self.receipt_delay_secs),
        }
    }

    pub fn claim_cooldown(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::try_days(self.claim_cooldown_days).unwrap_or(chrono::TimeDelta::MAX)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("RpcUrl", &self.rpc_url),
            ("GameApiUrl", &self.game_api_url),
            ("GraphqlUrl", &self.graphql_url),
        ] {
            url.parse::<reqwest::Url>()
                .map_err(|e| ConfigError::Network(format!("{} '{}' is not a valid URL: {}", name, url, e)))?;
        }
        if self.receipt_attempts == 0 {
            return Err(ConfigError::Network("ReceiptAttempts must be at least 1".to_string()));
        }
        if !(0..=MAX_CLAIM_COOLDOWN_DAYS).contains(&self.claim_cooldown_days) {
            return Err(ConfigError::Network(format!(
                "ClaimCooldownDays {} is outside [0, {}]",
                self.claim_cooldown_days, MAX_CLAIM_COOLDOWN_DAYS
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawConfig {
    academy_payout_address: String,
    #[serde(default)]
    fee_payout_address: Option<String>,
    #[serde(default)]
    fee_payout_percentage: Decimal,
    #[serde(default)]
    network: NetworkConfig,
    scholars: Vec<RawScholar>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawScholar {
    name: String,
    account_address: String,
    private_key: String,
    scholar_payout_address: String,
    scholar_payout_percentage: Decimal,
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub academy_address: Address,
    pub fee: FeePolicy,
    pub accounts: Vec<Account>,
    pub slp_contract: Address,
    pub network: NetworkConfig,
}

fn address(field: impl Into<String>, raw: &str) -> Result<Address, ConfigError> {
    parse_ronin_address(raw).map_err(|source| ConfigError::Address {
        field: field.into(),
        source,
    })
}

fn percentage(field: impl Into<String>, value: Decimal) -> Result<Decimal, ConfigError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ConfigError::Percentage {
            field: field.into(),
            value,
        });
    }
    Ok(value)
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_raw(raw)?;

        tracing::info!(
            "Loaded {} scholar account(s) from {} (fee {} to {})",
            settings.accounts.len(),
            path.display(),
            settings.fee.percentage,
            format_ronin_address(&settings.fee.address)
        );
        Ok(settings)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        raw.network.validate()?;

        let academy_address = address("AcademyPayoutAddress", &raw.academy_payout_address)?;
        let fee = FeePolicy {
            address: address(
                "FeePayoutAddress",
                raw.fee_payout_address
                    .as_deref()
                    .unwrap_or(DEFAULT_FEE_PAYOUT_ADDRESS),
            )?,
            percentage: percentage("FeePayoutPercentage", raw.fee_payout_percentage)?,
        };
        let slp_contract = address("Network.SlpContract", &raw.network.slp_contract)?;

        if raw.scholars.is_empty() {
            return Err(ConfigError::NoScholars);
        }

        let accounts = raw
            .scholars
            .into_iter()
            .map(|scholar| Self::account(scholar, academy_address))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            academy_address,
            fee,
            accounts,
            slp_contract,
            network: raw.network,
        })
    }

    fn account(raw: RawScholar, academy_address: Address) -> Result<Account, ConfigError> {
        let account_address = address(
            format!("Scholars[{}].AccountAddress", raw.name),
            &raw.account_address,
        )?;
        let scholar_payout_address = address(
            format!("Scholars[{}].ScholarPayoutAddress", raw.name),
            &raw.scholar_payout_address,
        )?;
        let scholar_payout_percentage = percentage(
            format!("Scholars[{}].ScholarPayoutPercentage", raw.name),
            raw.scholar_payout_percentage,
        )?;

        let signer: PrivateKeySigner = raw
            .private_key
            .trim()
            .parse()
            .map_err(|_| ConfigError::PrivateKey {
                name: raw.name.clone(),
            })?;
        if signer.address() != account_address {
            return Err(ConfigError::KeyMismatch {
                name: raw.name,
                expected: format_ronin_address(&account_address),
                actual: format_ronin_address(&signer.address()),
            });
        }

        Ok(Account {
            name: raw.name,
            address: account_address,
            signer,
            scholar_payout_address,
            academy_payout_address: academy_address,
            scholar_payout_percentage,
        })
    }
}
