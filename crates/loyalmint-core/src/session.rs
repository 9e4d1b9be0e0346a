//! Per-user session store.
//!
//! Holds the cached authoritative balance, the expiry ledger, the transaction
//! log and the action state machine. The controller is the only writer of the
//! ledger and log; balance polls may overwrite the cached balance at any time
//! (last write wins).
//!
//! ```text
//! Idle -> Submitting -> (Settled | Failed)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::RewardOption;
use crate::error::{ActionFailure, PreconditionFailure};
use crate::expiry::ExpiryLedger;
use crate::history::{TransactionLog, TransactionRecord};
use crate::tier::TierProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionState {
    Idle,
    Submitting,
    Settled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Mint,
    QuickRedeem,
    RedeemReward,
    Transfer,
}

/// Last balance read from the external ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedBalance {
    pub points: u64,
    pub fetched_at: DateTime<Utc>,
}

/// Transfer form inputs, cleared after a successful transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDraft {
    pub amount: u64,
    pub recipient: String,
}

impl TransferDraft {
    pub fn is_empty(&self) -> bool {
        self.amount == 0 && self.recipient.is_empty()
    }
}

#[derive(Debug)]
pub struct Session {
    balance: Option<CachedBalance>,
    native_lamports: Option<u64>,
    pub(crate) ledger: ExpiryLedger,
    pub(crate) log: TransactionLog,
    state: ActionState,
    current_action: Option<ActionKind>,
    last_failure: Option<ActionFailure>,
    pub(crate) transfer_draft: TransferDraft,
}

impl Session {
    pub fn new(ledger: ExpiryLedger) -> Self {
        Self {
            balance: None,
            native_lamports: None,
            ledger,
            log: TransactionLog::new(),
            state: ActionState::Idle,
            current_action: None,
            last_failure: None,
            transfer_draft: TransferDraft::default(),
        }
    }

    /// Cached points, zero until the first successful read.
    pub fn balance(&self) -> u64 {
        self.balance.map(|b| b.points).unwrap_or(0)
    }

    pub fn cached_balance(&self) -> Option<CachedBalance> {
        self.balance
    }

    pub fn native_lamports(&self) -> Option<u64> {
        self.native_lamports
    }

    pub fn ledger(&self) -> &ExpiryLedger {
        &self.ledger
    }

    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn current_action(&self) -> Option<ActionKind> {
        self.current_action
    }

    pub fn is_busy(&self) -> bool {
        self.state == ActionState::Submitting
    }

    pub fn last_failure(&self) -> Option<&ActionFailure> {
        self.last_failure.as_ref()
    }

    pub fn transfer_draft(&self) -> &TransferDraft {
        &self.transfer_draft
    }

    pub(crate) fn set_balance(&mut self, points: u64, fetched_at: DateTime<Utc>) {
        self.balance = Some(CachedBalance { points, fetched_at });
    }

    pub(crate) fn set_native_lamports(&mut self, lamports: u64) {
        self.native_lamports = Some(lamports);
    }

    /// Enter `Submitting`. A second action while one is outstanding is
    /// rejected and leaves the running one untouched.
    pub(crate) fn begin(&mut self, kind: ActionKind) -> Result<(), PreconditionFailure> {
        if self.is_busy() {
            return Err(PreconditionFailure::ActionInProgress);
        }
        self.state = ActionState::Submitting;
        self.current_action = Some(kind);
        self.last_failure = None;
        Ok(())
    }

    pub(crate) fn settle(&mut self) {
        self.state = ActionState::Settled;
        self.current_action = None;
    }

    pub(crate) fn fail(&mut self, failure: ActionFailure) {
        self.state = ActionState::Failed;
        self.current_action = None;
        self.last_failure = Some(failure);
    }

    /// Record a rejection that did not take over the state machine.
    pub(crate) fn note_failure(&mut self, failure: ActionFailure) {
        self.last_failure = Some(failure);
    }
}

/// Catalog entry annotated for display.
#[derive(Debug, Clone, Serialize)]
pub struct RewardView {
    #[serde(flatten)]
    pub reward: RewardOption,
    pub affordable: bool,
}

/// Everything the display surface reads, captured at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub wallet: Option<String>,
    pub balance: u64,
    pub balance_fetched_at: Option<DateTime<Utc>>,
    pub native_lamports: Option<u64>,
    pub tier: TierProgress,
    pub multiplier: f64,
    pub active_points: u64,
    pub expiring_points: u64,
    pub can_quick_redeem: bool,
    pub rewards: Vec<RewardView>,
    pub history: Vec<TransactionRecord>,
    pub state: ActionState,
    pub busy: bool,
    pub last_failure: Option<ActionFailure>,
    pub transfer_draft: TransferDraft,
    pub at: DateTime<Utc>,
}
