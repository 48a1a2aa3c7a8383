/// Integration tests for the review workflow state machine against a mocked
/// backend: the submission guard, the default approval reason, input
/// preservation on failure and the post-decision re-fetch contract.
use kyc_portal::api_client::PortalClient;
use kyc_portal::errors::PortalError;
use kyc_portal::models::{LoginResponse, VerificationStatus};
use kyc_portal::queue::{filter_queue, QueueMode};
use kyc_portal::review::{Outcome, ReviewItem, ReviewWorkflow, DEFAULT_APPROVAL_REASON};
use kyc_portal::session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn logged_in_client(server: &MockServer) -> PortalClient {
    let session = Arc::new(SessionStore::ephemeral());
    session
        .login(&LoginResponse {
            access_token: "tok-abc".into(),
            token_type: Some("bearer".into()),
            role: "admin".into(),
            user_id: 1,
            full_name: "Portal Admin".into(),
        })
        .unwrap();
    PortalClient::new(server.uri(), Duration::from_secs(5), session).unwrap()
}

fn pending_record(id: i64, name: &str, risk: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "customer_id": id,
        "serial_no": format!("SN-{:06}", id),
        "full_name": name,
        "cnic": format!("42101-000000{}-1", id),
        "status": "Pending",
        "risk_score": risk,
        "trust_score": 100 - risk
    })
}

async fn mount_queue(server: &MockServer, records: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/admin/all-verifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records))
        .mount(server)
        .await;
}

#[tokio::test]
async fn reject_with_empty_remarks_never_reaches_the_network() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;
    mount_queue(&server, serde_json::json!([pending_record(1, "Ali Khan", 80)])).await;

    // The guard must fire before any POST is issued.
    Mock::given(method("POST"))
        .and(path("/api/admin/verify/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut workflow = ReviewWorkflow::new(client);
    workflow.open_verification(1).await.unwrap();
    workflow.set_outcome(Outcome::Reject).unwrap();

    for remarks in ["", "   ", "\t"] {
        workflow.set_remarks(remarks).unwrap();
        let err = workflow.submit().await.unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)), "{:?}", remarks);
        // The review stays open with the operator's choice intact.
        assert!(workflow.is_open());
        assert_eq!(workflow.outcome(), Some(Outcome::Reject));
    }
}

#[tokio::test]
async fn approve_with_empty_remarks_sends_default_reason() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;
    mount_queue(&server, serde_json::json!([pending_record(1, "Ali Khan", 80)])).await;

    Mock::given(method("POST"))
        .and(path("/api/admin/verify/1"))
        .and(body_partial_json(serde_json::json!({
            "status": "Verified",
            "remarks": DEFAULT_APPROVAL_REASON,
            "risk_score": 80
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"status": "success", "message": "Verification status updated"}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut workflow = ReviewWorkflow::new(client);
    workflow.open_verification(1).await.unwrap();
    workflow.set_outcome(Outcome::Approve).unwrap();
    workflow.set_remarks("").unwrap();

    let receipt = workflow.submit().await.unwrap();
    assert_eq!(receipt.message, "Verification status updated");
    assert!(receipt.pdf_url.is_none());
    // Success closes the review and discards the detail.
    assert!(!workflow.is_open());
}

#[tokio::test]
async fn reject_with_reason_is_transmitted_verbatim() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;
    mount_queue(&server, serde_json::json!([pending_record(4, "Shady Co", 95)])).await;

    Mock::given(method("POST"))
        .and(path("/api/admin/verify/4"))
        .and(body_partial_json(serde_json::json!({
            "status": "Rejected",
            "remarks": "CNIC does not match documents"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"status": "success", "message": "Verification status updated"}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut workflow = ReviewWorkflow::new(client);
    workflow.open_verification(4).await.unwrap();
    workflow.set_outcome(Outcome::Reject).unwrap();
    workflow
        .set_remarks("CNIC does not match documents")
        .unwrap();
    workflow.submit().await.unwrap();
}

#[tokio::test]
async fn failed_submission_preserves_operator_input() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;
    mount_queue(&server, serde_json::json!([pending_record(1, "Ali Khan", 80)])).await;

    // First attempt hits a server error; the retry succeeds.
    Mock::given(method("POST"))
        .and(path("/api/admin/verify/1"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(serde_json::json!({"detail": "db locked"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/admin/verify/1"))
        .and(body_partial_json(serde_json::json!({"remarks": "Income unverifiable"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"status": "success", "message": "Verification status updated"}),
        ))
        .mount(&server)
        .await;

    let mut workflow = ReviewWorkflow::new(client);
    workflow.open_verification(1).await.unwrap();
    workflow.set_outcome(Outcome::Reject).unwrap();
    workflow.set_remarks("Income unverifiable").unwrap();

    let err = workflow.submit().await.unwrap_err();
    assert!(err.is_retryable());
    // Back in Ready with outcome and remarks intact.
    assert!(workflow.is_open());
    assert!(!workflow.is_submitting());
    assert_eq!(workflow.outcome(), Some(Outcome::Reject));
    assert_eq!(workflow.remarks(), "Income unverifiable");

    workflow.submit().await.unwrap();
    assert!(!workflow.is_open());
}

#[tokio::test]
async fn loan_approval_returns_document_reference() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/admin/loans/7/details"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "loan": {
                "id": 7,
                "customer_id": 3,
                "full_name": "Bilal Ahmed",
                "cnic": "42101-0000003-1",
                "risk_score": 25,
                "income_range": "50k-100k",
                "eligibility_status": "Manual Review",
                "max_limit": 500000
            },
            "customer": {"id": 3, "full_name": "Bilal Ahmed"},
            "documents": [{"doc_type": "cnic_front", "file_path": "/uploads/3/front.jpg"}],
            "verification": {"status": "Verified"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/admin/loan-decision"))
        .and(body_partial_json(serde_json::json!({
            "loan_id": 7,
            "decision": "Approved",
            "reason": DEFAULT_APPROVAL_REASON
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "message": "Loan Approved",
            "pdf_url": "/generated/decision_7.pdf"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut workflow = ReviewWorkflow::new(client);
    let item = workflow.open_loan(7).await.unwrap();
    match item {
        ReviewItem::Loan(details) => {
            assert_eq!(details.documents.len(), 1);
            assert!(details.loan.eligibility_status.needs_review());
        }
        other => panic!("expected loan item, got {:?}", other),
    }

    workflow.set_outcome(Outcome::Approve).unwrap();
    let receipt = workflow.submit().await.unwrap();
    assert_eq!(receipt.message, "Loan Approved");
    assert_eq!(receipt.pdf_url.as_deref(), Some("/generated/decision_7.pdf"));
}

#[tokio::test]
async fn decided_item_leaves_the_pending_subset_on_refetch() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;

    // The queue before the decision: id 1 pending. After the decision the
    // stub backend reports it verified.
    Mock::given(method("GET"))
        .and(path("/api/admin/all-verifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            pending_record(1, "Ali Khan", 80)
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/admin/verify/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"status": "success", "message": "Verification status updated"}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/admin/all-verifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "id": 1,
            "customer_id": 1,
            "serial_no": "SN-000001",
            "full_name": "Ali Khan",
            "cnic": "42101-0000001-1",
            "status": "Verified",
            "risk_score": 80
        }])))
        .mount(&server)
        .await;

    let mut workflow = ReviewWorkflow::new(client.clone());
    workflow.open_verification(1).await.unwrap();
    workflow.set_outcome(Outcome::Approve).unwrap();
    workflow.submit().await.unwrap();

    // No optimistic patch happened; the re-fetch is what moves the record.
    let refreshed = client.all_verifications().await.unwrap();
    let active = filter_queue(&refreshed, QueueMode::Active, "");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].status, VerificationStatus::Verified);
    let still_pending: Vec<_> = active
        .iter()
        .filter(|r| r.status == VerificationStatus::Pending)
        .collect();
    assert!(still_pending.is_empty());
}

#[tokio::test]
async fn already_decided_records_cannot_be_opened() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;
    mount_queue(
        &server,
        serde_json::json!([{
            "id": 3,
            "customer_id": 3,
            "serial_no": "SN-000003",
            "full_name": "Bilal Ahmed",
            "cnic": "42101-0000003-1",
            "status": "Verified",
            "risk_score": 10
        }]),
    )
    .await;

    let mut workflow = ReviewWorkflow::new(client);
    let err = workflow.open_verification(3).await.unwrap_err();
    assert!(matches!(err, PortalError::InvalidState(_)));
    assert!(!workflow.is_open());
}

#[tokio::test]
async fn submit_requires_an_outcome() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;
    mount_queue(&server, serde_json::json!([pending_record(1, "Ali Khan", 80)])).await;

    let mut workflow = ReviewWorkflow::new(client);
    workflow.open_verification(1).await.unwrap();

    let err = workflow.submit().await.unwrap_err();
    assert!(matches!(err, PortalError::Validation(_)));
    assert!(workflow.is_open());
}

#[tokio::test]
async fn cancel_discards_the_review() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server).await;
    mount_queue(&server, serde_json::json!([pending_record(1, "Ali Khan", 80)])).await;

    let mut workflow = ReviewWorkflow::new(client);
    workflow.open_verification(1).await.unwrap();
    workflow.set_outcome(Outcome::Approve).unwrap();
    workflow.cancel().unwrap();

    assert!(!workflow.is_open());
    assert_eq!(workflow.outcome(), None);
    assert_eq!(workflow.remarks(), "");
}
