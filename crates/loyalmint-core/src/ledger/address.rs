//! Ledger account identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PreconditionFailure;

/// Length of an account identifier in bytes.
pub const ADDRESS_LEN: usize = 32;

/// A 32-byte external-ledger account identifier, rendered in base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LedgerAddress([u8; ADDRESS_LEN]);

impl LedgerAddress {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// `ABCD...WXYZ` form used in transaction descriptions.
    pub fn masked(&self) -> String {
        mask(&self.to_string())
    }
}

/// Keep the first and last four characters of an address string.
pub fn mask(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 8 {
        return address.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

impl FromStr for LedgerAddress {
    type Err = PreconditionFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bytes = bs58::decode(trimmed)
            .into_vec()
            .map_err(|e| PreconditionFailure::MalformedRecipient(format!("{trimmed}: {e}")))?;
        let bytes: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            PreconditionFailure::MalformedRecipient(format!(
                "{trimmed}: expected {ADDRESS_LEN} bytes, got {}",
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for LedgerAddress {
    type Error = PreconditionFailure;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LedgerAddress> for String {
    fn from(value: LedgerAddress) -> Self {
        value.to_string()
    }
}

impl fmt::Display for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerAddress({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_renders_base58() {
        let addr = LedgerAddress::new([7u8; ADDRESS_LEN]);
        let text = addr.to_string();
        assert_eq!(text.parse::<LedgerAddress>().unwrap(), addr);
    }

    #[test]
    fn rejects_wrong_length_and_alphabet() {
        assert!(matches!(
            "abc".parse::<LedgerAddress>(),
            Err(PreconditionFailure::MalformedRecipient(_))
        ));
        // '0' and 'O' are not in the base58 alphabet.
        assert!("0OOO".parse::<LedgerAddress>().is_err());
        assert!("".parse::<LedgerAddress>().is_err());
    }

    #[test]
    fn masks_long_addresses() {
        let addr = LedgerAddress::new([1u8; ADDRESS_LEN]);
        let text = addr.to_string();
        let masked = addr.masked();
        assert!(masked.starts_with(&text[..4]));
        assert!(masked.ends_with(&text[text.len() - 4..]));
        assert_eq!(mask("short"), "short");
    }

    #[test]
    fn serializes_as_string() {
        let addr = LedgerAddress::new([9u8; ADDRESS_LEN]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));
        let back: LedgerAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
