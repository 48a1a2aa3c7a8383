use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============ Verification Models ============

/// Verification state of a customer record, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    /// Awaiting an operator decision.
    Pending,
    /// Approved by an operator (or auto-verified upstream).
    Verified,
    /// Rejected by an operator.
    Rejected,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Pending => write!(f, "Pending"),
            VerificationStatus::Verified => write!(f, "Verified"),
            VerificationStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

/// A customer verification record as observed through the API boundary.
///
/// The backend owns this entity; the client treats it as an opaque DTO and
/// never mutates it locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    /// Unique identifier of the verification record.
    pub id: i64,
    /// Identifier of the owning customer.
    pub customer_id: i64,
    /// Display serial, e.g. "SN-000042".
    #[serde(default)]
    pub serial_no: String,
    /// Full name of the applicant.
    pub full_name: String,
    /// National identity card number.
    pub cnic: String,
    /// Email address, if on file.
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number, if on file.
    #[serde(default)]
    pub phone: Option<String>,
    /// Current verification state.
    pub status: VerificationStatus,
    /// Backend-computed risk score, 0-100. Opaque to this client.
    pub risk_score: i64,
    /// Backend-computed trust score.
    #[serde(default)]
    pub trust_score: Option<i64>,
    /// Free-text remarks attached by operators or the risk engine.
    #[serde(default)]
    pub remarks: String,
    /// Whether the backend flagged this record for fraud review.
    #[serde(default)]
    pub fraud_flagged: bool,
    /// Ordered list of fraud-rule hits, most significant first.
    #[serde(default)]
    pub fraud_alerts: Vec<String>,
    /// Last-activity timestamp (update time, falling back to creation).
    #[serde(default)]
    pub date: Option<String>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Decision payload posted to `/api/admin/verify/{customer_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationUpdate {
    /// Target state: `Verified` or `Rejected`.
    pub status: VerificationStatus,
    /// Operator remarks (the effective decision reason).
    pub remarks: String,
    /// Risk score echoed back from the reviewed record.
    pub risk_score: i64,
    /// Trust score echoed back from the reviewed record.
    pub trust_score: Option<i64>,
}

// ============ Loan Models ============

/// Loan eligibility state. `Review` and `ManualReview` both mean the
/// application is waiting for an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EligibilityStatus {
    Pending,
    Review,
    #[serde(rename = "Manual Review")]
    ManualReview,
    Approved,
    Rejected,
    #[serde(rename = "Auto-Approved")]
    AutoApproved,
}

impl EligibilityStatus {
    /// Whether the application still needs an operator decision.
    pub fn needs_review(&self) -> bool {
        matches!(
            self,
            EligibilityStatus::Pending | EligibilityStatus::Review | EligibilityStatus::ManualReview
        )
    }
}

/// A loan application row from `/api/admin/loans`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanApplication {
    /// Unique identifier of the application.
    pub id: i64,
    /// Identifier of the applying customer.
    pub customer_id: i64,
    /// Applicant full name.
    pub full_name: String,
    /// Applicant national identity number.
    pub cnic: String,
    /// Risk score carried over from verification.
    #[serde(default)]
    pub risk_score: Option<i64>,
    /// Declared income bracket.
    #[serde(default)]
    pub income_range: Option<String>,
    /// Current eligibility state.
    pub eligibility_status: EligibilityStatus,
    /// Maximum approved disbursement limit.
    #[serde(default)]
    pub max_limit: Option<i64>,
    /// When eligibility was last computed.
    #[serde(default)]
    pub calculated_at: Option<String>,
}

/// A document reference attached to a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRef {
    pub doc_type: String,
    pub file_path: String,
}

/// Expanded detail for a single loan, from `/api/admin/loans/{id}/details`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanDetails {
    /// The application under review.
    pub loan: LoanApplication,
    /// The applicant record, as the backend returns it.
    pub customer: serde_json::Value,
    /// Uploaded identity documents.
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
    /// The applicant's verification record, when one exists.
    #[serde(default)]
    pub verification: Option<serde_json::Value>,
}

/// Decision payload posted to `/api/admin/loan-decision`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanDecisionRequest {
    pub loan_id: i64,
    /// "Approved" or "Rejected".
    pub decision: String,
    pub reason: String,
}

/// Acknowledgement returned by decision endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionAck {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Reference to a generated decision document, when one was produced.
    #[serde(default)]
    pub pdf_url: Option<String>,
}

// ============ Auth & Admin Models ============

/// Response from `POST /api/auth/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub role: String,
    pub user_id: i64,
    pub full_name: String,
}

/// An administrator account row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

// ============ Stats & Reporting Models ============

/// Headline counters for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_customers: i64,
    pub pending_verifications: i64,
    pub approved_loans: i64,
}

/// Aggregate status counts for the reports page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCounts {
    pub verified: i64,
    pub rejected: i64,
    pub pending: i64,
}

/// One time bucket of verification activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityBucket {
    /// Bucket label, e.g. a weekday abbreviation.
    pub name: String,
    pub verified: i64,
    pub rejected: i64,
}

/// Response from `/api/admin/reports/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportStats {
    pub overall: StatusCounts,
    #[serde(default)]
    pub daily_activity: Vec<ActivityBucket>,
}

// ============ Customer Dashboard Models ============

/// Loan application submitted by a customer from their own dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanApplicationRequest {
    pub amount: i64,
    pub purpose: String,
    pub monthly_income: i64,
}

/// A customer-facing notification entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub is_read: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Generic acknowledgement `{status, message}` used by several endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Arbitrary per-admin settings object. The backend stores it opaquely, so
/// the client round-trips it as a string-keyed JSON map.
pub type SettingsMap = BTreeMap<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_record_decodes_with_missing_optionals() {
        let raw = serde_json::json!({
            "id": 1,
            "customer_id": 1,
            "full_name": "Ali Khan",
            "cnic": "42101-1234567-1",
            "status": "Pending",
            "risk_score": 80
        });
        let rec: VerificationRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(rec.status, VerificationStatus::Pending);
        assert!(rec.fraud_alerts.is_empty());
        assert_eq!(rec.remarks, "");
    }

    #[test]
    fn eligibility_status_wire_names() {
        let s: EligibilityStatus = serde_json::from_value(serde_json::json!("Manual Review")).unwrap();
        assert_eq!(s, EligibilityStatus::ManualReview);
        assert!(s.needs_review());

        let s: EligibilityStatus = serde_json::from_value(serde_json::json!("Auto-Approved")).unwrap();
        assert_eq!(s, EligibilityStatus::AutoApproved);
        assert!(!s.needs_review());
    }

    #[test]
    fn decision_ack_tolerates_minimal_body() {
        let ack: DecisionAck = serde_json::from_str(r#"{"message":"Loan Approved"}"#).unwrap();
        assert_eq!(ack.message.as_deref(), Some("Loan Approved"));
        assert!(ack.pdf_url.is_none());
    }
}
