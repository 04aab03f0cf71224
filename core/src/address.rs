//! Ronin address helpers.
//!
//! Ronin shows EVM addresses with a `ronin:` prefix instead of `0x`. Config
//! files and operator output use the prefixed form; everything internal works
//! on [`Address`].

use alloy::primitives::Address;
use thiserror::Error;

pub const RONIN_ADDRESS_PREFIX: &str = "ronin:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address '{0}' must start with 'ronin:'")]
    MissingPrefix(String),
    #[error("address '{0}' is not a 20-byte hex address")]
    InvalidHex(String),
}

/// Parse a `ronin:`-prefixed address. Case of the hex digits is not checked.
pub fn parse_ronin_address(raw: &str) -> Result<Address, AddressError> {
    let trimmed = raw.trim();
    let hex_part = trimmed
        .strip_prefix(RONIN_ADDRESS_PREFIX)
        .ok_or_else(|| AddressError::MissingPrefix(raw.to_string()))?;

    if hex_part.len() != 40 {
        return Err(AddressError::InvalidHex(raw.to_string()));
    }

    format!("0x{}", hex_part)
        .parse::<Address>()
        .map_err(|_| AddressError::InvalidHex(raw.to_string()))
}

/// Render an address as `ronin:` + EIP-55 checksummed hex.
pub fn format_ronin_address(address: &Address) -> String {
    let checksummed = address.to_checksum(None);
    format!(
        "{}{}",
        RONIN_ADDRESS_PREFIX,
        checksummed.trim_start_matches("0x")
    )
}
