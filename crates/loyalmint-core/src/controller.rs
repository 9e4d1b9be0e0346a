//! Reconciliation controller.
//!
//! Runs every user-initiated action through the same sequence:
//!
//! 1. enter `Submitting` (a concurrent action is rejected, not queued)
//! 2. check preconditions against the cached authoritative balance
//! 3. sign and submit to the external ledger
//! 4. on confirmation only, update the expiry ledger and transaction log
//! 5. re-fetch the authoritative balance
//!
//! Nothing local is written before step 4 succeeds, so a failed action
//! leaves the ledger and log exactly as they were.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::catalog::RewardCatalog;
use crate::clock::{Clock, SystemClock};
use crate::config::LoyaltyConfig;
use crate::error::{ActionFailure, CoreError, PreconditionFailure, Result};
use crate::expiry::ExpiryLedger;
use crate::history::{TransactionKind, TransactionRecord};
use crate::ledger::{
    Instruction, LedgerAddress, LedgerClient, Signature, SubmitOptions, UnsignedOperation, Wallet,
};
use crate::session::{
    ActionKind, ActionState, DashboardSnapshot, RewardView, Session, TransferDraft,
};
use crate::tier::{progress_for, tier_for};

/// Knobs the controller runs with, usually derived from [`LoyaltyConfig`].
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub account_seed: String,
    pub mint_fee_lamports: u64,
    pub base_mint_points: u64,
    pub quick_redeem_points: u64,
    pub lifetime: Duration,
    pub horizon: Duration,
    pub fifo_consumption: bool,
    pub submit: SubmitOptions,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&LoyaltyConfig::default())
    }
}

impl From<&LoyaltyConfig> for ControllerSettings {
    fn from(config: &LoyaltyConfig) -> Self {
        Self {
            account_seed: config.program.account_seed.clone(),
            mint_fee_lamports: config.program.mint_fee_lamports,
            base_mint_points: config.program.base_mint_points,
            quick_redeem_points: config.program.quick_redeem_points,
            lifetime: config.lifetime(),
            horizon: config.horizon(),
            fifo_consumption: config.expiry.fifo_consumption,
            submit: config.submit_options(),
        }
    }
}

/// Result of a settled action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub action: ActionKind,
    pub signature: Signature,
    /// Points minted, redeemed or transferred.
    pub points: u64,
    pub description: Option<String>,
    /// Balance re-read after settlement; `None` if that read failed.
    pub balance: Option<u64>,
}

/// Orchestrates actions for one wallet session. Cloning shares the session.
#[derive(Clone)]
pub struct ReconciliationController {
    ledger: Arc<dyn LedgerClient>,
    wallet: Arc<dyn Wallet>,
    catalog: Arc<RewardCatalog>,
    settings: Arc<ControllerSettings>,
    clock: Arc<dyn Clock>,
    session: Arc<Mutex<Session>>,
}

impl ReconciliationController {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        wallet: Arc<dyn Wallet>,
        catalog: RewardCatalog,
        settings: ControllerSettings,
    ) -> Self {
        let session = Session::new(ExpiryLedger::with_lifetime(settings.lifetime));
        Self {
            ledger,
            wallet,
            catalog: Arc::new(catalog),
            settings: Arc::new(settings),
            clock: Arc::new(SystemClock),
            session: Arc::new(Mutex::new(session)),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &RewardCatalog {
        &self.catalog
    }

    pub fn balance(&self) -> u64 {
        self.session().balance()
    }

    pub fn state(&self) -> ActionState {
        self.session().state()
    }

    pub fn is_busy(&self) -> bool {
        self.session().is_busy()
    }

    pub fn last_failure(&self) -> Option<ActionFailure> {
        self.session().last_failure().cloned()
    }

    pub fn history(&self) -> Vec<TransactionRecord> {
        self.session().log().all()
    }

    pub fn active_points(&self) -> u64 {
        let now = self.now();
        self.session().ledger().active_total(now)
    }

    pub fn expiring_points(&self) -> u64 {
        let now = self.now();
        self.session().ledger().expiring_within(now, self.settings.horizon)
    }

    /// Run a read-only closure against the session.
    pub fn inspect<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&self.session())
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let now = self.now();
        let session = self.session();
        let balance = session.balance();
        let tier = progress_for(balance);
        DashboardSnapshot {
            wallet: self.connected_address().map(|a| a.to_string()),
            balance,
            balance_fetched_at: session.cached_balance().map(|b| b.fetched_at),
            native_lamports: session.native_lamports(),
            multiplier: tier.current.multiplier(),
            tier,
            active_points: session.ledger().active_total(now),
            expiring_points: session.ledger().expiring_within(now, self.settings.horizon),
            can_quick_redeem: balance >= self.settings.quick_redeem_points,
            rewards: self
                .catalog
                .all()
                .iter()
                .map(|r| RewardView {
                    reward: r.clone(),
                    affordable: r.is_affordable(balance),
                })
                .collect(),
            history: session.log().all(),
            state: session.state(),
            busy: session.is_busy(),
            last_failure: session.last_failure().cloned(),
            transfer_draft: session.transfer_draft().clone(),
            at: now,
        }
    }

    // ── Balance reads ────────────────────────────────────────────────

    fn loyalty_account(&self, owner: &LedgerAddress) -> LedgerAddress {
        self.ledger
            .derive_account_address(&self.settings.account_seed, owner)
    }

    /// Read the authoritative balance without caching it.
    /// `Ok(None)` when no wallet is connected.
    pub async fn fetch_balance(&self) -> Result<Option<u64>> {
        let Some(owner) = self.connected_address() else {
            return Ok(None);
        };
        let account = self.loyalty_account(&owner);
        let points = self
            .ledger
            .get_balance(&account)
            .await
            .map_err(|e| CoreError::read(e.to_string()))?;
        Ok(Some(points))
    }

    /// Overwrite the cached balance. No staleness check: last write wins.
    pub fn apply_balance(&self, points: u64) {
        let now = self.now();
        self.session().set_balance(points, now);
    }

    /// Fetch and cache the authoritative balance. A failed read is logged
    /// and the last known value stays in place.
    pub async fn refresh_balance(&self) -> Result<Option<u64>> {
        match self.fetch_balance().await {
            Ok(Some(points)) => {
                self.apply_balance(points);
                debug!(points, "balance refreshed");
                Ok(Some(points))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(error = %e, "balance read failed; keeping last known value");
                Err(e)
            }
        }
    }

    pub async fn fetch_native_balance(&self) -> Result<Option<u64>> {
        let Some(owner) = self.connected_address() else {
            return Ok(None);
        };
        let lamports = self
            .ledger
            .get_native_balance(&owner)
            .await
            .map_err(|e| CoreError::read(e.to_string()))?;
        Ok(Some(lamports))
    }

    pub fn apply_native_balance(&self, lamports: u64) {
        self.session().set_native_lamports(lamports);
    }

    // ── Transfer draft ───────────────────────────────────────────────

    pub fn set_transfer_draft(&self, amount: u64, recipient: impl Into<String>) {
        self.session().transfer_draft = TransferDraft {
            amount,
            recipient: recipient.into(),
        };
    }

    pub fn transfer_draft(&self) -> TransferDraft {
        self.session().transfer_draft().clone()
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// Pay the mint fee and mint `base * tier multiplier` points.
    pub async fn mint(&self) -> Result<ActionOutcome> {
        self.run_action(ActionKind::Mint, self.execute_mint()).await
    }

    /// Redeem the fixed quick-redeem amount. Not recorded in the log.
    pub async fn quick_redeem(&self) -> Result<ActionOutcome> {
        self.run_action(ActionKind::QuickRedeem, self.execute_quick_redeem())
            .await
    }

    /// Redeem a catalog reward by id.
    pub async fn redeem_reward(&self, reward_id: &str) -> Result<ActionOutcome> {
        self.run_action(ActionKind::RedeemReward, self.execute_redeem_reward(reward_id))
            .await
    }

    /// Transfer points to another wallet's loyalty account.
    pub async fn transfer(&self, amount: u64, recipient: &str) -> Result<ActionOutcome> {
        self.run_action(ActionKind::Transfer, self.execute_transfer(amount, recipient))
            .await
    }

    /// Submit whatever is in the transfer draft.
    pub async fn submit_transfer_draft(&self) -> Result<ActionOutcome> {
        let draft = self.transfer_draft();
        self.transfer(draft.amount, &draft.recipient).await
    }

    /// Drop lapsed blocks and log them as one `EXPIRE` entry.
    /// Returns the lapsed total, or `None` when nothing expired.
    pub fn sweep_expired(&self) -> Option<u64> {
        let now = self.now();
        let mut session = self.session();
        let lapsed = session.ledger.compact(now);
        if lapsed == 0 {
            return None;
        }
        session.log.record_at(
            TransactionKind::Expire,
            lapsed,
            format!("expiry-{}", now.timestamp()),
            Some(format!("{lapsed} points expired")),
            None,
            now,
        );
        info!(lapsed, "expired points swept");
        Some(lapsed)
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Drive one action through the state machine. `action` is not polled
    /// until the session has entered `Submitting`.
    async fn run_action<Fut>(&self, kind: ActionKind, action: Fut) -> Result<ActionOutcome>
    where
        Fut: Future<Output = Result<ActionOutcome>>,
    {
        let begun = self.session().begin(kind);
        if let Err(busy) = begun {
            let err = CoreError::from(busy);
            let failure = ActionFailure::from_error(&err, self.now());
            self.session().note_failure(failure);
            warn!(action = ?kind, "rejected: another action is in progress");
            return Err(err);
        }

        let result = action.await;
        let now = self.now();
        match &result {
            Ok(outcome) => {
                info!(
                    action = ?kind,
                    points = outcome.points,
                    signature = %outcome.signature,
                    "action settled"
                );
                self.session().settle();
            }
            Err(e) => {
                error!(action = ?kind, kind = ?e.kind(), error = %e, "action failed");
                self.session().fail(ActionFailure::from_error(e, now));
            }
        }
        result
    }

    async fn execute_mint(&self) -> Result<ActionOutcome> {
        let owner = self.signer()?;
        let tier = tier_for(self.balance());
        let points = tier.apply(self.settings.base_mint_points);
        let operation = UnsignedOperation::new(
            owner,
            vec![
                Instruction::TransferFee {
                    from: owner,
                    to: self.ledger.program_id(),
                    lamports: self.settings.mint_fee_lamports,
                },
                Instruction::MintPoints {
                    user: owner,
                    loyalty_account: self.loyalty_account(&owner),
                },
            ],
        );
        let signature = self.sign_and_submit(operation).await?;

        let description = format!(
            "Minted {points} points with {}x multiplier",
            tier.multiplier()
        );
        let now = self.now();
        {
            let mut session = self.session();
            session.ledger.add_block(points, now)?;
            session.log.record_at(
                TransactionKind::Mint,
                points,
                signature.as_str(),
                Some(description.clone()),
                None,
                now,
            );
        }

        Ok(ActionOutcome {
            action: ActionKind::Mint,
            signature,
            points,
            description: Some(description),
            balance: self.refresh_after_settle().await,
        })
    }

    async fn execute_quick_redeem(&self) -> Result<ActionOutcome> {
        let amount = self.settings.quick_redeem_points;
        let owner = self.require_wallet()?;
        self.require_points(amount)?;
        self.require_signer()?;

        let signature = self
            .sign_and_submit(self.redeem_operation(owner, amount))
            .await?;
        self.consume_blocks(amount);

        Ok(ActionOutcome {
            action: ActionKind::QuickRedeem,
            signature,
            points: amount,
            description: None,
            balance: self.refresh_after_settle().await,
        })
    }

    async fn execute_redeem_reward(&self, reward_id: &str) -> Result<ActionOutcome> {
        let reward = self
            .catalog
            .find(reward_id)
            .cloned()
            .ok_or_else(|| PreconditionFailure::UnknownReward(reward_id.to_string()))?;
        let owner = self.require_wallet()?;
        self.require_points(reward.points_cost)?;
        self.require_signer()?;

        let signature = self
            .sign_and_submit(self.redeem_operation(owner, reward.points_cost))
            .await?;

        let description = format!("Redeemed {} ({} points)", reward.name, reward.points_cost);
        let now = self.now();
        self.session().log.record_at(
            TransactionKind::Redeem,
            reward.points_cost,
            signature.as_str(),
            Some(description.clone()),
            None,
            now,
        );
        self.consume_blocks(reward.points_cost);

        Ok(ActionOutcome {
            action: ActionKind::RedeemReward,
            signature,
            points: reward.points_cost,
            description: Some(description),
            balance: self.refresh_after_settle().await,
        })
    }

    async fn execute_transfer(&self, amount: u64, recipient: &str) -> Result<ActionOutcome> {
        if amount == 0 {
            return Err(PreconditionFailure::InvalidAmount.into());
        }
        let recipient_address: LedgerAddress = recipient.parse()?;
        self.require_points(amount)?;
        let owner = self.signer()?;

        let operation = UnsignedOperation::new(
            owner,
            vec![Instruction::TransferPoints {
                from: owner,
                to: recipient_address,
                from_account: self.loyalty_account(&owner),
                to_account: self.loyalty_account(&recipient_address),
                amount,
            }],
        );
        let signature = self.sign_and_submit(operation).await?;

        let description = format!("Transferred to {}", recipient_address.masked());
        let now = self.now();
        {
            let mut session = self.session();
            session.log.record_at(
                TransactionKind::Transfer,
                amount,
                signature.as_str(),
                Some(description.clone()),
                Some(recipient_address.to_string()),
                now,
            );
            session.transfer_draft = TransferDraft::default();
        }
        self.consume_blocks(amount);

        Ok(ActionOutcome {
            action: ActionKind::Transfer,
            signature,
            points: amount,
            description: Some(description),
            balance: self.refresh_after_settle().await,
        })
    }

    fn connected_address(&self) -> Option<LedgerAddress> {
        if self.wallet.is_connected() {
            self.wallet.address()
        } else {
            None
        }
    }

    fn require_wallet(&self) -> Result<LedgerAddress> {
        self.connected_address()
            .ok_or_else(|| PreconditionFailure::WalletNotConnected.into())
    }

    fn require_signer(&self) -> Result<()> {
        if self.wallet.can_sign() {
            Ok(())
        } else {
            Err(PreconditionFailure::SigningUnavailable.into())
        }
    }

    fn signer(&self) -> Result<LedgerAddress> {
        let owner = self.require_wallet()?;
        self.require_signer()?;
        Ok(owner)
    }

    fn require_points(&self, required: u64) -> Result<()> {
        let available = self.balance();
        if available < required {
            return Err(PreconditionFailure::InsufficientPoints {
                required,
                available,
            }
            .into());
        }
        Ok(())
    }

    fn redeem_operation(&self, owner: LedgerAddress, amount: u64) -> UnsignedOperation {
        UnsignedOperation::new(
            owner,
            vec![Instruction::RedeemPoints {
                user: owner,
                loyalty_account: self.loyalty_account(&owner),
                amount,
            }],
        )
    }

    async fn sign_and_submit(&self, operation: UnsignedOperation) -> Result<Signature> {
        let signed = self
            .wallet
            .sign(operation)
            .await
            .map_err(|e| CoreError::submission(e.to_string()))?;
        self.ledger
            .submit_operation(signed, self.settings.submit)
            .await
            .map_err(|e| CoreError::submission(e.to_string()))
    }

    fn consume_blocks(&self, amount: u64) {
        if !self.settings.fifo_consumption {
            return;
        }
        let now = self.now();
        let consumed = self.session().ledger.consume_fifo(amount, now);
        if consumed < amount {
            debug!(amount, consumed, "local blocks short of spent amount");
        }
    }

    async fn refresh_after_settle(&self) -> Option<u64> {
        self.refresh_balance().await.ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sim::{InMemoryLedger, LocalWallet, ManualClock};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn setup(
        wallet: LocalWallet,
    ) -> (ReconciliationController, Arc<InMemoryLedger>, Arc<ManualClock>) {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.fund(&wallet.public_key(), 1_000_000_000);
        let clock = Arc::new(ManualClock::new(t0()));
        let controller = ReconciliationController::new(
            ledger.clone(),
            Arc::new(wallet),
            RewardCatalog::reference(),
            ControllerSettings::default(),
        )
        .with_clock(clock.clone());
        (controller, ledger, clock)
    }

    #[tokio::test]
    async fn mint_from_zero_awards_base_points() {
        let (controller, ledger, _) = setup(LocalWallet::from_seed("alice"));
        let outcome = controller.mint().await.unwrap();

        assert_eq!(outcome.points, 10);
        assert_eq!(outcome.balance, Some(10));
        assert_eq!(controller.balance(), 10);
        assert_eq!(controller.state(), ActionState::Settled);
        assert_eq!(ledger.confirmed_operations(), 1);

        let blocks = controller.inspect(|s| s.ledger().blocks().to_vec());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].expiration_time, t0() + Duration::days(90));

        let history = controller.history();
        assert_eq!(history[0].kind, TransactionKind::Mint);
        assert_eq!(
            history[0].description.as_deref(),
            Some("Minted 10 points with 1x multiplier")
        );
        assert_eq!(history[0].external_reference, outcome.signature.0);
    }

    #[tokio::test]
    async fn mint_without_wallet_fails_before_submission() {
        let (controller, ledger, _) = setup(LocalWallet::from_seed("bob").disconnected());
        let err = controller.mint().await.unwrap_err();

        assert!(matches!(
            err,
            CoreError::Precondition(PreconditionFailure::WalletNotConnected)
        ));
        assert_eq!(ledger.submission_attempts(), 0);
        assert_eq!(controller.state(), ActionState::Failed);
        assert!(controller.history().is_empty());
    }

    #[tokio::test]
    async fn mint_without_signer_is_a_precondition_failure() {
        let (controller, ledger, _) = setup(LocalWallet::from_seed("carol").without_signer());
        let err = controller.mint().await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Precondition(PreconditionFailure::SigningUnavailable)
        ));
        assert_eq!(ledger.submission_attempts(), 0);
    }

    #[tokio::test]
    async fn rejected_submission_leaves_local_state_untouched() {
        let (controller, ledger, _) = setup(LocalWallet::from_seed("dave"));
        ledger.reject_next("custom program error: 0x1");

        let err = controller.mint().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalSubmissionFailure);
        assert!(controller.history().is_empty());
        assert_eq!(controller.active_points(), 0);

        let failure = controller.last_failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::ExternalSubmissionFailure);
        assert!(failure.message.contains("custom program error"));
    }

    #[tokio::test]
    async fn declined_signature_is_a_submission_failure() {
        let wallet = LocalWallet::from_seed("erin");
        wallet.decline_next();
        let (controller, ledger, _) = setup(wallet);

        let err = controller.mint().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalSubmissionFailure);
        assert_eq!(ledger.submission_attempts(), 0);
    }

    #[tokio::test]
    async fn quick_redeem_needs_the_threshold() {
        let wallet = LocalWallet::from_seed("frank");
        let owner = wallet.public_key();
        let (controller, ledger, _) = setup(wallet);

        ledger.set_points_for(&owner, "loyalty", 9);
        controller.refresh_balance().await.unwrap();
        let err = controller.quick_redeem().await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Precondition(PreconditionFailure::InsufficientPoints {
                required: 10,
                available: 9
            })
        ));
        assert_eq!(ledger.submission_attempts(), 0);

        ledger.set_points_for(&owner, "loyalty", 10);
        controller.refresh_balance().await.unwrap();
        let outcome = controller.quick_redeem().await.unwrap();
        assert_eq!(outcome.balance, Some(0));
        assert!(controller.history().is_empty());
    }

    #[tokio::test]
    async fn reward_redemption_is_logged_with_reward_name() {
        let wallet = LocalWallet::from_seed("gina");
        let owner = wallet.public_key();
        let (controller, ledger, _) = setup(wallet);
        ledger.set_points_for(&owner, "loyalty", 250);
        controller.refresh_balance().await.unwrap();

        let outcome = controller.redeem_reward("freeItem").await.unwrap();
        assert_eq!(outcome.balance, Some(50));
        let entry = &controller.history()[0];
        assert_eq!(entry.kind, TransactionKind::Redeem);
        assert_eq!(entry.amount, 200);
        assert_eq!(entry.description.as_deref(), Some("Redeemed Free Item (200 points)"));
    }

    #[tokio::test]
    async fn unknown_reward_is_rejected() {
        let (controller, ledger, _) = setup(LocalWallet::from_seed("hank"));
        let err = controller.redeem_reward("yacht").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Precondition(PreconditionFailure::UnknownReward(_))
        ));
        assert_eq!(ledger.submission_attempts(), 0);
    }

    #[tokio::test]
    async fn transfer_validates_inputs_in_order() {
        let wallet = LocalWallet::from_seed("ivy");
        let owner = wallet.public_key();
        let (controller, ledger, _) = setup(wallet);
        ledger.set_points_for(&owner, "loyalty", 30);
        controller.refresh_balance().await.unwrap();
        let recipient = LocalWallet::from_seed("jack").public_key().to_string();

        assert!(matches!(
            controller.transfer(0, &recipient).await,
            Err(CoreError::Precondition(PreconditionFailure::InvalidAmount))
        ));
        assert!(matches!(
            controller.transfer(5, "not an address").await,
            Err(CoreError::Precondition(PreconditionFailure::MalformedRecipient(_)))
        ));
        assert!(matches!(
            controller.transfer(31, &recipient).await,
            Err(CoreError::Precondition(PreconditionFailure::InsufficientPoints { .. }))
        ));
        assert_eq!(ledger.submission_attempts(), 0);
    }

    #[tokio::test]
    async fn transfer_records_masked_recipient_and_clears_draft() {
        let wallet = LocalWallet::from_seed("kate");
        let owner = wallet.public_key();
        let (controller, ledger, _) = setup(wallet);
        ledger.set_points_for(&owner, "loyalty", 30);
        controller.refresh_balance().await.unwrap();

        let recipient = LocalWallet::from_seed("liam").public_key();
        controller.set_transfer_draft(12, recipient.to_string());
        let outcome = controller.submit_transfer_draft().await.unwrap();

        assert_eq!(outcome.balance, Some(18));
        assert_eq!(ledger.points_for(&recipient, "loyalty"), Some(12));
        let entry = &controller.history()[0];
        assert_eq!(entry.kind, TransactionKind::Transfer);
        assert_eq!(
            entry.description.as_deref(),
            Some(format!("Transferred to {}", recipient.masked()).as_str())
        );
        assert_eq!(entry.counterparty_address, Some(recipient.to_string()));
        assert!(controller.transfer_draft().is_empty());
    }

    #[tokio::test]
    async fn failed_read_after_settle_keeps_the_action_settled() {
        let (controller, ledger, _) = setup(LocalWallet::from_seed("mia"));
        ledger.set_read_failure(true);

        let outcome = controller.mint().await.unwrap();
        assert_eq!(outcome.balance, None);
        assert_eq!(controller.state(), ActionState::Settled);
        assert_eq!(controller.balance(), 0);
        assert_eq!(controller.history().len(), 1);
    }

    #[tokio::test]
    async fn sweep_logs_expired_points_once() {
        let (controller, _, clock) = setup(LocalWallet::from_seed("noah"));
        controller.mint().await.unwrap();

        assert_eq!(controller.sweep_expired(), None);
        clock.advance(Duration::days(91));
        assert_eq!(controller.sweep_expired(), Some(10));
        assert_eq!(controller.sweep_expired(), None);

        let history = controller.history();
        assert_eq!(history[0].kind, TransactionKind::Expire);
        assert_eq!(history[0].amount, 10);
    }

    #[tokio::test]
    async fn fifo_consumption_keeps_blocks_in_line_with_spending() {
        let wallet = LocalWallet::from_seed("olga");
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.fund(&wallet.public_key(), 1_000_000_000);
        let settings = ControllerSettings {
            fifo_consumption: true,
            ..ControllerSettings::default()
        };
        let controller = ReconciliationController::new(
            ledger.clone(),
            Arc::new(wallet),
            RewardCatalog::reference(),
            settings,
        )
        .with_clock(Arc::new(ManualClock::new(t0())));

        controller.mint().await.unwrap();
        controller.mint().await.unwrap();
        assert_eq!(controller.active_points(), 20);

        controller.quick_redeem().await.unwrap();
        assert_eq!(controller.active_points(), 10);
        assert_eq!(controller.balance(), 10);
    }

    #[tokio::test]
    async fn transfer_above_signed_range_records_exact_amount() {
        let wallet = LocalWallet::from_seed("quinn");
        let owner = wallet.public_key();
        let (controller, ledger, _) = setup(wallet);
        ledger.set_points_for(&owner, "loyalty", u64::MAX);
        controller.refresh_balance().await.unwrap();

        let amount = i64::MAX as u64 + 1;
        let recipient = LocalWallet::from_seed("rita").public_key().to_string();
        controller.transfer(amount, &recipient).await.unwrap();

        let history = controller.history();
        assert_eq!(history[0].kind, TransactionKind::Transfer);
        assert_eq!(history[0].amount, amount);
        assert_eq!(controller.balance(), u64::MAX - amount);
    }

    #[tokio::test]
    async fn snapshot_reflects_session() {
        let (controller, _, _) = setup(LocalWallet::from_seed("pete"));
        controller.mint().await.unwrap();

        let snap = controller.snapshot();
        assert_eq!(snap.balance, 10);
        assert_eq!(snap.active_points, 10);
        assert_eq!(snap.expiring_points, 0);
        assert!(snap.can_quick_redeem);
        assert_eq!(snap.rewards.len(), 3);
        assert!(snap.rewards.iter().all(|r| !r.affordable));
        assert_eq!(snap.history.len(), 1);
        assert!(!snap.busy);
    }
}
