//! In-process stand-ins for the external collaborators.
//!
//! [`InMemoryLedger`] keeps balances in a map and applies operations
//! atomically, so tests and the CLI session can run without a network.
//! Failures can be injected to exercise retry and error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::clock::Clock;
use crate::ledger::{
    Instruction, LedgerAddress, LedgerClient, LedgerClientError, Signature, SignedOperation,
    SubmitOptions, UnsignedOperation, Wallet, WalletError, ADDRESS_LEN,
};

/// Points the program credits per mint instruction.
pub const DEFAULT_MINT_AWARD: u64 = 10;

const DEFAULT_SEED: &str = "loyalty";

fn sha256(parts: &[&[u8]]) -> [u8; ADDRESS_LEN] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; ADDRESS_LEN];
    out.copy_from_slice(&digest);
    out
}

/// Deterministic account address for `seed` + `owner` under `program_id`.
pub fn derive_program_address(
    seed: &str,
    owner: &LedgerAddress,
    program_id: &LedgerAddress,
) -> LedgerAddress {
    LedgerAddress::new(sha256(&[
        seed.as_bytes(),
        owner.as_bytes(),
        program_id.as_bytes(),
        b"ProgramDerivedAddress",
    ]))
}

#[derive(Debug, Default)]
struct LedgerState {
    points: HashMap<LedgerAddress, u64>,
    lamports: HashMap<LedgerAddress, u64>,
    attempts: usize,
    confirmed: usize,
    transient_failures: u32,
    reject_next: Option<String>,
    fail_reads: bool,
    read_delay: Option<StdDuration>,
}

#[derive(Debug)]
pub struct InMemoryLedger {
    program_id: LedgerAddress,
    account_seed: String,
    mint_award: u64,
    state: Mutex<LedgerState>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::with_program(LedgerAddress::new(sha256(&[b"loyalmint-program"])), DEFAULT_SEED)
    }

    pub fn with_program(program_id: LedgerAddress, account_seed: impl Into<String>) -> Self {
        Self {
            program_id,
            account_seed: account_seed.into(),
            mint_award: DEFAULT_MINT_AWARD,
            state: Mutex::new(LedgerState::default()),
        }
    }

    pub fn with_mint_award(mut self, award: u64) -> Self {
        self.mint_award = award;
        self
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Fixtures ─────────────────────────────────────────────────────

    pub fn fund(&self, owner: &LedgerAddress, lamports: u64) {
        *self.state().lamports.entry(*owner).or_insert(0) += lamports;
    }

    pub fn set_points_for(&self, owner: &LedgerAddress, seed: &str, points: u64) {
        let account = self.derive_account_address(seed, owner);
        self.state().points.insert(account, points);
    }

    pub fn points_for(&self, owner: &LedgerAddress, seed: &str) -> Option<u64> {
        let account = self.derive_account_address(seed, owner);
        self.state().points.get(&account).copied()
    }

    pub fn lamports_of(&self, owner: &LedgerAddress) -> u64 {
        self.state().lamports.get(owner).copied().unwrap_or(0)
    }

    /// The next `count` submission attempts fail with a transient error.
    pub fn fail_next_submissions(&self, count: u32) {
        self.state().transient_failures = count;
    }

    /// The next submission is rejected outright.
    pub fn reject_next(&self, reason: impl Into<String>) {
        self.state().reject_next = Some(reason.into());
    }

    pub fn set_read_failure(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    /// Delay every balance read, to keep a read in flight.
    pub fn set_read_delay(&self, delay: Option<StdDuration>) {
        self.state().read_delay = delay;
    }

    /// Every attempt, including retries.
    pub fn submission_attempts(&self) -> usize {
        self.state().attempts
    }

    pub fn confirmed_operations(&self) -> usize {
        self.state().confirmed
    }

    // ── Program ──────────────────────────────────────────────────────

    fn expect_account(
        &self,
        owner: &LedgerAddress,
        account: &LedgerAddress,
    ) -> Result<(), LedgerClientError> {
        if self.derive_account_address(&self.account_seed, owner) != *account {
            return Err(LedgerClientError::Rejected(format!(
                "account {account} is not the loyalty account of {owner}"
            )));
        }
        Ok(())
    }

    fn execute(
        &self,
        signer: &LedgerAddress,
        instruction: &Instruction,
        points: &mut HashMap<LedgerAddress, u64>,
        lamports: &mut HashMap<LedgerAddress, u64>,
    ) -> Result<(), LedgerClientError> {
        let require_signer = |who: &LedgerAddress| {
            if who == signer {
                Ok(())
            } else {
                Err(LedgerClientError::Rejected(format!("missing signature for {who}")))
            }
        };

        match instruction {
            Instruction::TransferFee { from, to, lamports: fee } => {
                require_signer(from)?;
                let balance = lamports.entry(*from).or_insert(0);
                if *balance < *fee {
                    return Err(LedgerClientError::Rejected(
                        "insufficient lamports for fee".into(),
                    ));
                }
                *balance -= fee;
                *lamports.entry(*to).or_insert(0) += fee;
            }
            Instruction::MintPoints {
                user,
                loyalty_account,
            } => {
                require_signer(user)?;
                self.expect_account(user, loyalty_account)?;
                let entry = points.entry(*loyalty_account).or_insert(0);
                *entry = entry.saturating_add(self.mint_award);
            }
            Instruction::RedeemPoints {
                user,
                loyalty_account,
                amount,
            } => {
                require_signer(user)?;
                self.expect_account(user, loyalty_account)?;
                let balance = points
                    .get_mut(loyalty_account)
                    .ok_or_else(|| LedgerClientError::AccountNotFound(loyalty_account.to_string()))?;
                if *balance < *amount {
                    return Err(LedgerClientError::Rejected("insufficient points".into()));
                }
                *balance -= amount;
            }
            Instruction::TransferPoints {
                from,
                to,
                from_account,
                to_account,
                amount,
            } => {
                require_signer(from)?;
                self.expect_account(from, from_account)?;
                self.expect_account(to, to_account)?;
                let balance = points
                    .get_mut(from_account)
                    .ok_or_else(|| LedgerClientError::AccountNotFound(from_account.to_string()))?;
                if *balance < *amount {
                    return Err(LedgerClientError::Rejected("insufficient points".into()));
                }
                *balance -= amount;
                let entry = points.entry(*to_account).or_insert(0);
                *entry = entry.saturating_add(*amount);
            }
        }
        Ok(())
    }

    /// One submission attempt. State changes only if every instruction
    /// succeeds.
    fn attempt(&self, signed: &SignedOperation) -> Result<Signature, LedgerClientError> {
        let mut state = self.state();
        state.attempts += 1;

        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(LedgerClientError::Transient("connection reset".into()));
        }
        if let Some(reason) = state.reject_next.take() {
            return Err(LedgerClientError::Rejected(reason));
        }

        let mut points = state.points.clone();
        let mut lamports = state.lamports.clone();
        for instruction in &signed.operation.instructions {
            self.execute(&signed.signer, instruction, &mut points, &mut lamports)?;
        }
        state.points = points;
        state.lamports = lamports;
        state.confirmed += 1;

        let message = signed.operation.message_bytes();
        let counter = state.confirmed.to_le_bytes();
        let mut sig = sha256(&[&message, &counter, b"0"]).to_vec();
        sig.extend_from_slice(&sha256(&[&message, &counter, b"1"]));
        Ok(Signature(bs58::encode(sig).into_string()))
    }

    async fn read_pause(&self) -> Result<(), LedgerClientError> {
        let (delay, fail) = {
            let state = self.state();
            (state.read_delay, state.fail_reads)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(LedgerClientError::Transient("rpc unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    fn program_id(&self) -> LedgerAddress {
        self.program_id
    }

    fn derive_account_address(&self, seed: &str, owner: &LedgerAddress) -> LedgerAddress {
        derive_program_address(seed, owner, &self.program_id)
    }

    async fn get_balance(&self, account: &LedgerAddress) -> Result<u64, LedgerClientError> {
        self.read_pause().await?;
        self.state()
            .points
            .get(account)
            .copied()
            .ok_or_else(|| LedgerClientError::AccountNotFound(account.to_string()))
    }

    async fn get_native_balance(&self, owner: &LedgerAddress) -> Result<u64, LedgerClientError> {
        self.read_pause().await?;
        Ok(self.lamports_of(owner))
    }

    async fn submit_operation(
        &self,
        signed: SignedOperation,
        options: SubmitOptions,
    ) -> Result<Signature, LedgerClientError> {
        if signed.signer != signed.operation.fee_payer {
            return Err(LedgerClientError::Rejected(
                "signature verification failed".into(),
            ));
        }
        let mut retries = 0u8;
        loop {
            match self.attempt(&signed) {
                Err(e) if e.is_transient() && retries < options.max_retries => {
                    retries += 1;
                }
                other => return other,
            }
        }
    }
}

/// Wallet backed by a key derived from a seed phrase.
#[derive(Debug)]
pub struct LocalWallet {
    secret: [u8; ADDRESS_LEN],
    address: LedgerAddress,
    connected: AtomicBool,
    signer: bool,
    decline_next: AtomicBool,
}

impl LocalWallet {
    pub fn from_seed(seed: &str) -> Self {
        let secret = sha256(&[b"loyalmint-wallet", seed.as_bytes()]);
        Self {
            secret,
            address: LedgerAddress::new(sha256(&[&secret])),
            connected: AtomicBool::new(true),
            signer: true,
            decline_next: AtomicBool::new(false),
        }
    }

    pub fn disconnected(self) -> Self {
        self.connected.store(false, Ordering::Release);
        self
    }

    /// Connected, but exposes no signing function.
    pub fn without_signer(mut self) -> Self {
        self.signer = false;
        self
    }

    pub fn public_key(&self) -> LedgerAddress {
        self.address
    }

    pub fn connect(&self) {
        self.connected.store(true, Ordering::Release);
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }

    /// The next signing request is declined.
    pub fn decline_next(&self) {
        self.decline_next.store(true, Ordering::Release);
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn address(&self) -> Option<LedgerAddress> {
        self.is_connected().then_some(self.address)
    }

    fn can_sign(&self) -> bool {
        self.signer && self.is_connected()
    }

    async fn sign(&self, operation: UnsignedOperation) -> Result<SignedOperation, WalletError> {
        if !self.is_connected() {
            return Err(WalletError::NotConnected);
        }
        if !self.signer {
            return Err(WalletError::Failed("no signing function available".into()));
        }
        if self.decline_next.swap(false, Ordering::AcqRel) {
            return Err(WalletError::Declined);
        }
        let signature = sha256(&[&self.secret, &operation.message_bytes()]).to_vec();
        Ok(SignedOperation {
            operation,
            signer: self.address,
            signature,
        })
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(wallet: &LocalWallet, instructions: Vec<Instruction>) -> SignedOperation {
        SignedOperation {
            signer: wallet.public_key(),
            signature: vec![],
            operation: UnsignedOperation::new(wallet.public_key(), instructions),
        }
    }

    #[test]
    fn derivation_is_deterministic_and_seed_sensitive() {
        let ledger = InMemoryLedger::new();
        let owner = LocalWallet::from_seed("a").public_key();
        assert_eq!(
            ledger.derive_account_address("loyalty", &owner),
            ledger.derive_account_address("loyalty", &owner)
        );
        assert_ne!(
            ledger.derive_account_address("loyalty", &owner),
            ledger.derive_account_address("other", &owner)
        );
    }

    #[tokio::test]
    async fn transient_failures_are_retried_up_to_the_cap() {
        let ledger = InMemoryLedger::new();
        let wallet = LocalWallet::from_seed("retry");
        let owner = wallet.public_key();
        let account = ledger.derive_account_address("loyalty", &owner);
        let op = signed(
            &wallet,
            vec![Instruction::MintPoints {
                user: owner,
                loyalty_account: account,
            }],
        );
        let options = SubmitOptions {
            max_retries: 2,
            ..SubmitOptions::default()
        };

        ledger.fail_next_submissions(2);
        assert!(ledger.submit_operation(op.clone(), options).await.is_ok());
        assert_eq!(ledger.submission_attempts(), 3);

        ledger.fail_next_submissions(3);
        let err = ledger.submit_operation(op, options).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(ledger.submission_attempts(), 6);
        assert_eq!(ledger.confirmed_operations(), 1);
    }

    #[tokio::test]
    async fn failed_instruction_rolls_back_the_whole_operation() {
        let ledger = InMemoryLedger::new();
        let wallet = LocalWallet::from_seed("poor");
        let owner = wallet.public_key();
        let account = ledger.derive_account_address("loyalty", &owner);
        let op = signed(
            &wallet,
            vec![
                Instruction::MintPoints {
                    user: owner,
                    loyalty_account: account,
                },
                Instruction::TransferFee {
                    from: owner,
                    to: ledger.program_id(),
                    lamports: 1,
                },
            ],
        );

        let err = ledger
            .submit_operation(op, SubmitOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerClientError::Rejected(_)));
        assert_eq!(ledger.points_for(&owner, "loyalty"), None);
    }

    #[tokio::test]
    async fn wrong_account_is_rejected() {
        let ledger = InMemoryLedger::new();
        let wallet = LocalWallet::from_seed("mallory");
        let op = signed(
            &wallet,
            vec![Instruction::MintPoints {
                user: wallet.public_key(),
                loyalty_account: LedgerAddress::new([0; ADDRESS_LEN]),
            }],
        );
        assert!(ledger
            .submit_operation(op, SubmitOptions::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn disconnected_wallet_cannot_sign() {
        let wallet = LocalWallet::from_seed("x").disconnected();
        assert!(wallet.address().is_none());
        let op = UnsignedOperation::new(wallet.public_key(), vec![]);
        assert_eq!(wallet.sign(op).await.unwrap_err(), WalletError::NotConnected);
    }

    #[test]
    fn manual_clock_advances() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        clock.advance(Duration::days(2));
        assert_eq!(clock.now(), start + Duration::days(2));
    }
}
