//! # LoyalMint Core Library
//!
//! Client-side accounting for a loyalty-points program whose authoritative
//! balances live on an external ledger. The CLI is a thin surface over the
//! same library.
//!
//! ## Architecture
//!
//! - **Tier Engine**: maps a balance to a tier and reward multiplier
//! - **Expiry Ledger**: point blocks with a rolling lifetime, plus the
//!   "expiring soon" total
//! - **Transaction Log**: most-recent-first record of observed actions
//! - **Reconciliation Controller**: submits actions, updates local state only
//!   after confirmation, then re-reads the authoritative balance
//! - **Reward Catalog**: redeemable rewards and their costs
//!
//! The ledger and the wallet are collaborators behind the [`LedgerClient`]
//! and [`Wallet`] traits. [`sim`] provides in-process implementations.
//!
//! ## Key Components
//!
//! - [`ReconciliationController`]: action state machine and session store
//! - [`BalancePoller`]: interval refresh of the cached balance
//! - [`LoyaltyConfig`]: TOML configuration

pub mod catalog;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod expiry;
pub mod history;
pub mod ledger;
pub mod poller;
pub mod session;
pub mod sim;
pub mod tier;

pub use catalog::{RewardCatalog, RewardOption};
pub use clock::{Clock, SystemClock};
pub use config::LoyaltyConfig;
pub use controller::{ActionOutcome, ControllerSettings, ReconciliationController};
pub use error::{ActionFailure, ConfigError, CoreError, ErrorKind, PreconditionFailure};
pub use expiry::{ExpiryLedger, PointBlock};
pub use history::{TransactionKind, TransactionLog, TransactionRecord};
pub use ledger::{LedgerAddress, LedgerClient, Signature, Wallet};
pub use poller::BalancePoller;
pub use session::{ActionKind, ActionState, DashboardSnapshot, Session, TransferDraft};
pub use tier::{progress_for, tier_for, Tier, TierDefinition, TierProgress, TIERS};
