//! Operations submitted to the external ledger.
//!
//! The core builds operations and hands them to collaborators. It never
//! encodes wire transactions itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::address::LedgerAddress;

/// One step of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    /// Native fee transfer bundled ahead of a mint.
    TransferFee {
        from: LedgerAddress,
        to: LedgerAddress,
        lamports: u64,
    },
    MintPoints {
        user: LedgerAddress,
        loyalty_account: LedgerAddress,
    },
    RedeemPoints {
        user: LedgerAddress,
        loyalty_account: LedgerAddress,
        amount: u64,
    },
    TransferPoints {
        from: LedgerAddress,
        to: LedgerAddress,
        from_account: LedgerAddress,
        to_account: LedgerAddress,
        amount: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedOperation {
    /// Distinguishes otherwise identical operations.
    pub nonce: Uuid,
    pub fee_payer: LedgerAddress,
    pub instructions: Vec<Instruction>,
}

impl UnsignedOperation {
    pub fn new(fee_payer: LedgerAddress, instructions: Vec<Instruction>) -> Self {
        Self {
            nonce: Uuid::new_v4(),
            fee_payer,
            instructions,
        }
    }

    /// Canonical bytes a wallet signs.
    pub fn message_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOperation {
    pub operation: UnsignedOperation,
    pub signer: LedgerAddress,
    pub signature: Vec<u8>,
}

/// Confirmation reference returned for a settled operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(pub String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl std::str::FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(format!("unknown commitment level: {other}")),
        }
    }
}

/// Submission policy handed to the ledger with every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOptions {
    pub commitment: Commitment,
    /// Retries the ledger may spend on transient failures.
    pub max_retries: u8,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            commitment: Commitment::Confirmed,
            max_retries: 5,
        }
    }
}
