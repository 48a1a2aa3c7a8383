/// Property-based tests using proptest
/// Tests invariants of the pure queue filtering and the submission guard
/// that should hold for all inputs.
use kyc_portal::models::{VerificationRecord, VerificationStatus};
use kyc_portal::queue::{filter_queue, fraud_alerts, matches_search, split_active, QueueMode};
use kyc_portal::review::{effective_reason, Outcome, DEFAULT_APPROVAL_REASON};
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = VerificationStatus> {
    prop::sample::select(vec![
        VerificationStatus::Pending,
        VerificationStatus::Verified,
        VerificationStatus::Rejected,
    ])
}

prop_compose! {
    fn record_strategy()(
        id in 1i64..10_000,
        name in "[A-Za-z][A-Za-z ]{0,20}",
        cnic in "[0-9]{5}-[0-9]{7}-[0-9]",
        status in status_strategy(),
        risk in 0i64..=100,
    ) -> VerificationRecord {
        VerificationRecord {
            id,
            customer_id: id,
            serial_no: format!("SN-{:06}", id),
            full_name: name,
            cnic,
            email: None,
            phone: None,
            status,
            risk_score: risk,
            trust_score: Some(100 - risk),
            remarks: String::new(),
            fraud_flagged: risk > 70,
            fraud_alerts: Vec::new(),
            date: None,
            created_at: None,
        }
    }
}

proptest! {
    // Active and History partition any collection: every record lands in
    // exactly one of the two views, with no overlap.
    #[test]
    fn active_and_history_partition(records in prop::collection::vec(record_strategy(), 0..50)) {
        let active = filter_queue(&records, QueueMode::Active, "");
        let history = filter_queue(&records, QueueMode::History, "");

        prop_assert_eq!(active.len() + history.len(), records.len());

        for r in &active {
            prop_assert_ne!(r.status, VerificationStatus::Rejected);
        }
        for r in &history {
            prop_assert_eq!(r.status, VerificationStatus::Rejected);
        }
        for a in &active {
            prop_assert!(!history.iter().any(|h| std::ptr::eq(*a, *h)));
        }
    }

    // A searched view is always a subset of the unsearched view, and the
    // search never resurrects records excluded by the split.
    #[test]
    fn search_only_narrows(
        records in prop::collection::vec(record_strategy(), 0..50),
        term in "[A-Za-z0-9 ]{0,8}",
    ) {
        for mode in [QueueMode::Active, QueueMode::History] {
            let unsearched = filter_queue(&records, mode, "");
            let searched = filter_queue(&records, mode, &term);
            prop_assert!(searched.len() <= unsearched.len());
            for r in &searched {
                prop_assert!(unsearched.iter().any(|u| std::ptr::eq(*u, *r)));
            }
        }
    }

    // Search matching never panics and is case-insensitive.
    #[test]
    fn search_is_case_insensitive(
        record in record_strategy(),
        term in "[a-zA-Z0-9 -]{0,16}",
    ) {
        let lower = matches_search(&record, &term.to_lowercase());
        let upper = matches_search(&record, &term.to_uppercase());
        prop_assert_eq!(lower, upper);
    }

    // Splitting the active view never loses a record.
    #[test]
    fn split_active_covers_the_view(records in prop::collection::vec(record_strategy(), 0..50)) {
        let active = filter_queue(&records, QueueMode::Active, "");
        let (pending, verified) = split_active(&active);
        prop_assert_eq!(pending.len() + verified.len(), active.len());
    }

    // Fraud alerts are exactly the records strictly above the threshold.
    #[test]
    fn fraud_alerts_respect_threshold(records in prop::collection::vec(record_strategy(), 0..50)) {
        let alerts = fraud_alerts(&records);
        for r in &alerts {
            prop_assert!(r.risk_score > 70);
        }
        let expected = records.iter().filter(|r| r.risk_score > 70).count();
        prop_assert_eq!(alerts.len(), expected);
    }
}

proptest! {
    // Rejections never pass the guard without substantive remarks.
    #[test]
    fn reject_guard_blocks_blank_remarks(padding in "[ \\t\\r\\n]{0,10}") {
        prop_assert!(effective_reason(Outcome::Reject, &padding).is_err());
    }

    // Approvals always pass, defaulting when remarks are blank.
    #[test]
    fn approve_always_resolves_a_reason(remarks in "\\PC{0,40}") {
        let reason = effective_reason(Outcome::Approve, &remarks).unwrap();
        if remarks.trim().is_empty() {
            prop_assert_eq!(reason, DEFAULT_APPROVAL_REASON);
        } else {
            prop_assert_eq!(reason, remarks.trim());
        }
    }

    // Non-blank remarks pass the reject guard verbatim (trimmed).
    #[test]
    fn reject_with_substance_passes(core in "[a-zA-Z]{1,20}", pad in "[ \\t]{0,4}") {
        let remarks = format!("{}{}{}", pad, core, pad);
        let reason = effective_reason(Outcome::Reject, &remarks).unwrap();
        prop_assert_eq!(reason, core);
    }
}
