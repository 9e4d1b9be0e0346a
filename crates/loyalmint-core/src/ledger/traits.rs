use async_trait::async_trait;
use thiserror::Error;

use super::address::LedgerAddress;
use super::operation::{Signature, SignedOperation, SubmitOptions, UnsignedOperation};

/// Failures reported by the external ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerClientError {
    /// Network hiccup; safe to retry the same signed operation.
    #[error("network error: {0}")]
    Transient(String),

    #[error("operation rejected: {0}")]
    Rejected(String),

    #[error("confirmation failed: {0}")]
    Confirmation(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),
}

impl LedgerClientError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerClientError::Transient(_))
    }
}

/// Failures reported by the wallet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("signing request declined by user")]
    Declined,

    #[error("wallet not connected")]
    NotConnected,

    #[error("wallet error: {0}")]
    Failed(String),
}

/// The remote program runtime holding authoritative balances.
///
/// Implementations own their retry loop: `submit_operation` may resubmit the
/// same signed payload up to `options.max_retries` times on transient errors.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Address of the loyalty program.
    fn program_id(&self) -> LedgerAddress;

    /// Deterministic account address for `seed` + `owner`.
    fn derive_account_address(&self, seed: &str, owner: &LedgerAddress) -> LedgerAddress;

    /// Points held by a loyalty account.
    async fn get_balance(&self, account: &LedgerAddress) -> Result<u64, LedgerClientError>;

    /// Native balance of a wallet, in lamports.
    async fn get_native_balance(&self, owner: &LedgerAddress) -> Result<u64, LedgerClientError>;

    /// Submit and wait for confirmation at `options.commitment`.
    async fn submit_operation(
        &self,
        signed: SignedOperation,
        options: SubmitOptions,
    ) -> Result<Signature, LedgerClientError>;
}

/// The user's wallet. Only the public address and signing are exposed.
#[async_trait]
pub trait Wallet: Send + Sync {
    fn is_connected(&self) -> bool;

    fn address(&self) -> Option<LedgerAddress>;

    /// Whether a signing function is available.
    fn can_sign(&self) -> bool;

    async fn sign(&self, operation: UnsignedOperation) -> Result<SignedOperation, WalletError>;
}
