//! Append-only transaction log of locally observed actions.
//!
//! Independent of on-chain state: entries are bookkeeping for display and
//! audit. Amounts are not validated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Mint,
    Redeem,
    Transfer,
    Expire,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Mint => "MINT",
            TransactionKind::Redeem => "REDEEM",
            TransactionKind::Transfer => "TRANSFER",
            TransactionKind::Expire => "EXPIRE",
        }
    }

    /// Only mints add points; everything else is shown as a debit.
    pub fn is_credit(&self) -> bool {
        matches!(self, TransactionKind::Mint)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub kind: TransactionKind,
    pub amount: u64,
    pub timestamp: DateTime<Utc>,
    /// Confirmation reference returned by the external ledger.
    pub external_reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_address: Option<String>,
}

impl TransactionRecord {
    /// Signed amount for display: `+10` for mints, `-10` otherwise.
    pub fn signed_display(&self) -> String {
        let sign = if self.kind.is_credit() { '+' } else { '-' };
        format!("{sign}{}", self.amount)
    }
}

/// Most-recent-first log.
#[derive(Debug, Clone, Default)]
pub struct TransactionLog {
    // Stored oldest-first; reversed on read.
    entries: Vec<TransactionRecord>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry stamped with the current time.
    pub fn record(
        &mut self,
        kind: TransactionKind,
        amount: u64,
        external_reference: impl Into<String>,
        description: Option<String>,
        counterparty: Option<String>,
    ) {
        self.record_at(
            kind,
            amount,
            external_reference,
            description,
            counterparty,
            Utc::now(),
        );
    }

    pub fn record_at(
        &mut self,
        kind: TransactionKind,
        amount: u64,
        external_reference: impl Into<String>,
        description: Option<String>,
        counterparty: Option<String>,
        timestamp: DateTime<Utc>,
    ) {
        self.entries.push(TransactionRecord {
            kind,
            amount,
            timestamp,
            external_reference: external_reference.into(),
            description,
            counterparty_address: counterparty,
        });
    }

    /// Snapshot of every entry, most recent first. Later appends do not
    /// show up in a snapshot already taken.
    pub fn all(&self) -> Vec<TransactionRecord> {
        self.entries.iter().rev().cloned().collect()
    }

    pub fn latest(&self) -> Option<&TransactionRecord> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_returns_most_recent_first() {
        let mut log = TransactionLog::new();
        log.record(TransactionKind::Mint, 10, "sig-1", None, None);
        log.record(TransactionKind::Redeem, 10, "sig-2", None, None);
        log.record(TransactionKind::Transfer, 5, "sig-3", None, Some("addr".into()));

        let refs: Vec<_> = log.all().into_iter().map(|r| r.external_reference).collect();
        assert_eq!(refs, vec!["sig-3", "sig-2", "sig-1"]);
        assert_eq!(log.latest().map(|r| r.kind), Some(TransactionKind::Transfer));
    }

    #[test]
    fn snapshot_ignores_later_appends() {
        let mut log = TransactionLog::new();
        log.record(TransactionKind::Mint, 10, "sig-1", None, None);
        let snapshot = log.all();
        log.record(TransactionKind::Mint, 12, "sig-2", None, None);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn amounts_are_not_validated() {
        let mut log = TransactionLog::new();
        log.record(TransactionKind::Redeem, 0, "zero", None, None);
        log.record(TransactionKind::Transfer, u64::MAX, "max", None, None);
        assert_eq!(log.len(), 2);
        assert_eq!(log.all()[0].signed_display(), format!("-{}", u64::MAX));
    }

    #[test]
    fn signed_display_marks_credits() {
        let mut log = TransactionLog::new();
        log.record(TransactionKind::Mint, 12, "a", None, None);
        log.record(TransactionKind::Expire, 3, "b", None, None);
        let all = log.all();
        assert_eq!(all[0].signed_display(), "-3");
        assert_eq!(all[1].signed_display(), "+12");
    }

    #[test]
    fn record_serializes_without_empty_optionals() {
        let mut log = TransactionLog::new();
        log.record(TransactionKind::Mint, 10, "sig", None, None);
        let json = serde_json::to_value(&log.all()[0]).unwrap();
        assert_eq!(json["kind"], "MINT");
        assert!(json.get("description").is_none());
    }
}
