//! Expiry ledger: point blocks with a rolling lifetime.
//!
//! Every successful mint appends one [`PointBlock`] that lapses a fixed
//! lifetime after it was minted. Totals are computed as of a caller-supplied
//! `now`; expiration is derived, never stored.
//!
//! The ledger is an advisory breakdown. Spending points reduces the
//! authoritative balance only, so `active_total` can drift above it unless
//! FIFO consumption is enabled.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PreconditionFailure;

/// Default lifetime of minted points.
pub const DEFAULT_LIFETIME_DAYS: i64 = 90;

/// Default look-ahead for the "expiring soon" total.
pub const DEFAULT_HORIZON_DAYS: i64 = 30;

/// Points minted at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointBlock {
    pub amount: u64,
    pub mint_time: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
}

impl PointBlock {
    fn new(amount: u64, mint_time: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            amount,
            mint_time,
            expiration_time: mint_time
                .checked_add_signed(lifetime)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time > now
    }
}

#[derive(Debug, Clone)]
pub struct ExpiryLedger {
    blocks: Vec<PointBlock>,
    lifetime: Duration,
}

impl Default for ExpiryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpiryLedger {
    pub fn new() -> Self {
        Self::with_lifetime(Duration::days(DEFAULT_LIFETIME_DAYS))
    }

    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            blocks: Vec::new(),
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn blocks(&self) -> &[PointBlock] {
        &self.blocks
    }

    /// Append a block minted at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`PreconditionFailure::InvalidAmount`] for a zero amount.
    pub fn add_block(&mut self, amount: u64, now: DateTime<Utc>) -> Result<(), PreconditionFailure> {
        if amount == 0 {
            return Err(PreconditionFailure::InvalidAmount);
        }
        self.blocks.push(PointBlock::new(amount, now, self.lifetime));
        Ok(())
    }

    /// Sum of blocks that have not expired at `now`.
    pub fn active_total(&self, now: DateTime<Utc>) -> u64 {
        self.blocks
            .iter()
            .filter(|b| b.is_active(now))
            .map(|b| b.amount)
            .sum()
    }

    /// Sum of active blocks with `now < expiration < now + horizon`, so
    /// this never exceeds [`active_total`](Self::active_total).
    pub fn expiring_within(&self, now: DateTime<Utc>, horizon: Duration) -> u64 {
        let until = now
            .checked_add_signed(horizon)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.blocks
            .iter()
            .filter(|b| b.is_active(now) && b.expiration_time < until)
            .map(|b| b.amount)
            .sum()
    }

    /// Drop expired blocks and return how many points lapsed.
    pub fn compact(&mut self, now: DateTime<Utc>) -> u64 {
        let mut lapsed = 0;
        self.blocks.retain(|b| {
            if b.is_active(now) {
                true
            } else {
                lapsed += b.amount;
                false
            }
        });
        lapsed
    }

    /// Spend `amount` from active blocks, earliest expiration first.
    ///
    /// Returns the amount actually consumed, which is less than `amount` when
    /// the active blocks run out. Emptied blocks are removed.
    pub fn consume_fifo(&mut self, amount: u64, now: DateTime<Utc>) -> u64 {
        let mut order: Vec<usize> = (0..self.blocks.len())
            .filter(|&i| self.blocks[i].is_active(now))
            .collect();
        order.sort_by_key(|&i| self.blocks[i].expiration_time);

        let mut remaining = amount;
        for i in order {
            if remaining == 0 {
                break;
            }
            let block = &mut self.blocks[i];
            let take = block.amount.min(remaining);
            block.amount -= take;
            remaining -= take;
        }
        self.blocks.retain(|b| b.amount > 0);
        amount - remaining
    }
}
