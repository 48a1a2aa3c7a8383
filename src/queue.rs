//! Pure, fetch-independent filtering over the verification collection.
//!
//! The backend returns full collections with no server-side filtering; every
//! view the portal renders is a derived subset computed here. Keeping these
//! as plain functions over slices keeps them independently testable and
//! marks the scalability boundary explicitly.

use crate::models::{VerificationRecord, VerificationStatus};

/// Which slice of the queue a view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// Everything not yet rejected: the working queue (Pending + Verified).
    Active,
    /// Rejected records only: the history view.
    History,
}

/// Risk scores strictly above this are surfaced as fraud alerts.
pub const FRAUD_RISK_THRESHOLD: i64 = 70;

/// Filters the full collection down to one view.
///
/// The active/history split is applied first, then the free-text search.
/// `Active` and `History` partition any input collection: every record lands
/// in exactly one of the two, regardless of the search term applied after.
pub fn filter_queue<'a>(
    records: &'a [VerificationRecord],
    mode: QueueMode,
    search: &str,
) -> Vec<&'a VerificationRecord> {
    records
        .iter()
        .filter(|r| match mode {
            QueueMode::Active => r.status != VerificationStatus::Rejected,
            QueueMode::History => r.status == VerificationStatus::Rejected,
        })
        .filter(|r| matches_search(r, search))
        .collect()
}

/// Case-insensitive match against name, national ID and serial number.
/// An empty or whitespace-only term matches everything.
pub fn matches_search(record: &VerificationRecord, search: &str) -> bool {
    let term = search.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    record.full_name.to_lowercase().contains(&term)
        || record.cnic.to_lowercase().contains(&term)
        || record.serial_no.to_lowercase().contains(&term)
}

/// Splits an active view into its Pending and Verified halves for display.
pub fn split_active<'a>(
    active: &[&'a VerificationRecord],
) -> (Vec<&'a VerificationRecord>, Vec<&'a VerificationRecord>) {
    let pending = active
        .iter()
        .copied()
        .filter(|r| r.status == VerificationStatus::Pending)
        .collect();
    let verified = active
        .iter()
        .copied()
        .filter(|r| r.status == VerificationStatus::Verified)
        .collect();
    (pending, verified)
}

/// Derives the fraud-alert view from the pending collection.
///
/// There is no separate alert ledger: fraud alerts are exactly the pending
/// records whose risk score exceeds the threshold.
pub fn fraud_alerts(pending: &[VerificationRecord]) -> Vec<&VerificationRecord> {
    pending
        .iter()
        .filter(|r| r.risk_score > FRAUD_RISK_THRESHOLD)
        .collect()
}

/// The "unread notifications" badge is the size of the pending queue; the
/// portal has no real notification feed for admins.
pub fn unread_count(pending: &[VerificationRecord]) -> usize {
    pending.len()
}
