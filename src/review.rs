//! The review workflow: drives the approve/reject decision for a single
//! pending verification or loan application.
//!
//! Lifecycle: `Closed -> Loading -> Ready -> Submitting -> Closed`. The
//! displayed queue is never patched optimistically; after a successful
//! submission the caller re-fetches the owning list, so the screen is only
//! ever as fresh as the last successful fetch.

use crate::api_client::PortalClient;
use crate::errors::PortalError;
use crate::models::{
    LoanDecisionRequest, LoanDetails, VerificationRecord, VerificationStatus, VerificationUpdate,
};

/// Reason transmitted when an approval is submitted without remarks.
pub const DEFAULT_APPROVAL_REASON: &str = "Approved by Admin";

/// The operator's choice for the open item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Approve,
    Reject,
}

impl Outcome {
    /// The verification status a decision resolves to.
    pub fn verification_status(&self) -> VerificationStatus {
        match self {
            Outcome::Approve => VerificationStatus::Verified,
            Outcome::Reject => VerificationStatus::Rejected,
        }
    }

    /// The wire value used by the loan-decision endpoint.
    pub fn loan_decision(&self) -> &'static str {
        match self {
            Outcome::Approve => "Approved",
            Outcome::Reject => "Rejected",
        }
    }
}

/// What is under review: a verification record or a loan application.
#[derive(Debug, Clone)]
pub enum ReviewItem {
    Verification(VerificationRecord),
    Loan(LoanDetails),
}

impl ReviewItem {
    /// Display name of the applicant under review.
    pub fn applicant(&self) -> &str {
        match self {
            ReviewItem::Verification(v) => &v.full_name,
            ReviewItem::Loan(d) => &d.loan.full_name,
        }
    }
}

/// Workflow state. Exactly one decision may be in flight per opened item;
/// `Submitting` refuses both a second submission and opening another row.
#[derive(Debug)]
enum State {
    Closed,
    Ready {
        item: ReviewItem,
        outcome: Option<Outcome>,
        remarks: String,
    },
    Submitting,
}

/// Result of a successful submission, handed back to the shell so it can
/// re-fetch the owning list and open any generated document.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub message: String,
    /// Reference to a generated decision document. Opening it is a side
    /// effect; failure to open is not a workflow error.
    pub pdf_url: Option<String>,
}

/// Resolves the effective decision reason, enforcing the submission guard:
/// a rejection requires non-empty remarks (whitespace does not count), and
/// an approval without remarks falls back to the default reason.
pub fn effective_reason(outcome: Outcome, remarks: &str) -> Result<String, PortalError> {
    let trimmed = remarks.trim();
    match outcome {
        Outcome::Reject if trimmed.is_empty() => Err(PortalError::Validation(
            "A reason is required when rejecting".to_string(),
        )),
        Outcome::Approve if trimmed.is_empty() => Ok(DEFAULT_APPROVAL_REASON.to_string()),
        _ => Ok(trimmed.to_string()),
    }
}

/// Drives one review at a time against the portal backend.
pub struct ReviewWorkflow {
    client: PortalClient,
    state: State,
}

impl ReviewWorkflow {
    pub fn new(client: PortalClient) -> Self {
        Self {
            client,
            state: State::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, State::Closed)
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, State::Submitting)
    }

    /// The item currently under review, when the workflow is `Ready`.
    pub fn item(&self) -> Option<&ReviewItem> {
        match &self.state {
            State::Ready { item, .. } => Some(item),
            _ => None,
        }
    }

    /// Remarks entered so far. Preserved across failed submissions.
    pub fn remarks(&self) -> &str {
        match &self.state {
            State::Ready { remarks, .. } => remarks,
            _ => "",
        }
    }

    /// The outcome picked so far, if any.
    pub fn outcome(&self) -> Option<Outcome> {
        match &self.state {
            State::Ready { outcome, .. } => *outcome,
            _ => None,
        }
    }

    /// Opens a verification review: fetches the record's current detail by
    /// identity and becomes `Ready`. Fails back to `Closed` when the fetch
    /// fails, and refuses to open while a submission is in flight.
    pub async fn open_verification(&mut self, record_id: i64) -> Result<&ReviewItem, PortalError> {
        self.ensure_openable()?;

        let records = self.client.all_verifications().await?;
        let record = records
            .into_iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| PortalError::Api {
                status: 404,
                message: format!("Verification {} not found", record_id),
            })?;

        if record.status != VerificationStatus::Pending {
            return Err(PortalError::InvalidState(format!(
                "Verification {} is already {}",
                record_id, record.status
            )));
        }

        tracing::info!("Opened verification review for {}", record.full_name);
        self.state = State::Ready {
            item: ReviewItem::Verification(record),
            outcome: None,
            remarks: String::new(),
        };
        Ok(self.item().expect("just set Ready"))
    }

    /// Opens a loan review: fetches the loan detail and becomes `Ready`.
    pub async fn open_loan(&mut self, loan_id: i64) -> Result<&ReviewItem, PortalError> {
        self.ensure_openable()?;

        let details = self.client.loan_details(loan_id).await?;
        tracing::info!("Opened loan review for {}", details.loan.full_name);
        self.state = State::Ready {
            item: ReviewItem::Loan(details),
            outcome: None,
            remarks: String::new(),
        };
        Ok(self.item().expect("just set Ready"))
    }

    /// Records the operator's outcome choice. Only valid in `Ready`.
    pub fn set_outcome(&mut self, choice: Outcome) -> Result<(), PortalError> {
        match &mut self.state {
            State::Ready { outcome, .. } => {
                *outcome = Some(choice);
                Ok(())
            }
            _ => Err(PortalError::InvalidState(
                "No review is open".to_string(),
            )),
        }
    }

    /// Records free-text remarks. Only valid in `Ready`.
    pub fn set_remarks(&mut self, text: impl Into<String>) -> Result<(), PortalError> {
        match &mut self.state {
            State::Ready { remarks, .. } => {
                *remarks = text.into();
                Ok(())
            }
            _ => Err(PortalError::InvalidState(
                "No review is open".to_string(),
            )),
        }
    }

    /// Closes the review, discarding operator input. Refused mid-submission.
    pub fn cancel(&mut self) -> Result<(), PortalError> {
        if self.is_submitting() {
            return Err(PortalError::InvalidState(
                "A decision is being submitted".to_string(),
            ));
        }
        self.state = State::Closed;
        Ok(())
    }

    /// Submits the decision.
    ///
    /// The guard runs first: a rejection without remarks is blocked locally
    /// and no network call is issued. On success the workflow closes and the
    /// in-memory detail is discarded; on failure it returns to `Ready` with
    /// the outcome and remarks intact so the operator can retry.
    pub async fn submit(&mut self) -> Result<SubmitReceipt, PortalError> {
        // Validate in place before taking the state, so a guard failure
        // leaves the review untouched.
        let (outcome, reason) = match &self.state {
            State::Ready { outcome, remarks, .. } => {
                let outcome = outcome.ok_or_else(|| {
                    PortalError::Validation("Select Approve or Reject first".to_string())
                })?;
                (outcome, effective_reason(outcome, remarks)?)
            }
            State::Submitting => {
                return Err(PortalError::InvalidState(
                    "A decision is already in flight".to_string(),
                ))
            }
            State::Closed => {
                return Err(PortalError::InvalidState("No review is open".to_string()))
            }
        };

        let State::Ready { item, remarks, .. } = std::mem::replace(&mut self.state, State::Submitting)
        else {
            unreachable!("state checked above");
        };

        let result = self.post_decision(&item, outcome, &reason).await;

        match result {
            Ok(receipt) => {
                // Detail is dropped here; the caller re-fetches the list.
                self.state = State::Closed;
                tracing::info!("Decision submitted: {}", receipt.message);
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!("Decision submission failed: {}", e);
                self.state = State::Ready {
                    item,
                    outcome: Some(outcome),
                    remarks,
                };
                Err(e)
            }
        }
    }

    async fn post_decision(
        &self,
        item: &ReviewItem,
        outcome: Outcome,
        reason: &str,
    ) -> Result<SubmitReceipt, PortalError> {
        match item {
            ReviewItem::Verification(record) => {
                let update = VerificationUpdate {
                    status: outcome.verification_status(),
                    remarks: reason.to_string(),
                    risk_score: record.risk_score,
                    trust_score: record.trust_score,
                };
                let ack = self
                    .client
                    .submit_verification(record.customer_id, &update)
                    .await?;
                Ok(SubmitReceipt {
                    message: ack
                        .message
                        .unwrap_or_else(|| "Verification status updated".to_string()),
                    pdf_url: None,
                })
            }
            ReviewItem::Loan(details) => {
                let request = LoanDecisionRequest {
                    loan_id: details.loan.id,
                    decision: outcome.loan_decision().to_string(),
                    reason: reason.to_string(),
                };
                let ack = self.client.submit_loan_decision(&request).await?;
                Ok(SubmitReceipt {
                    message: ack
                        .message
                        .unwrap_or_else(|| format!("Loan {}", outcome.loan_decision())),
                    pdf_url: ack.pdf_url,
                })
            }
        }
    }

    fn ensure_openable(&self) -> Result<(), PortalError> {
        if self.is_submitting() {
            return Err(PortalError::InvalidState(
                "Cannot open another review while a decision is being submitted".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_requires_remarks() {
        for remarks in ["", "   ", "\t\n"] {
            let err = effective_reason(Outcome::Reject, remarks).unwrap_err();
            assert!(matches!(err, PortalError::Validation(_)), "{:?}", remarks);
        }
    }

    #[test]
    fn approve_without_remarks_uses_default_reason() {
        assert_eq!(
            effective_reason(Outcome::Approve, "").unwrap(),
            DEFAULT_APPROVAL_REASON
        );
        assert_eq!(
            effective_reason(Outcome::Approve, "  ").unwrap(),
            DEFAULT_APPROVAL_REASON
        );
    }

    #[test]
    fn explicit_remarks_pass_through_trimmed() {
        assert_eq!(
            effective_reason(Outcome::Reject, " CNIC mismatch ").unwrap(),
            "CNIC mismatch"
        );
        assert_eq!(
            effective_reason(Outcome::Approve, "Clean record").unwrap(),
            "Clean record"
        );
    }

    #[test]
    fn outcome_wire_values() {
        assert_eq!(
            Outcome::Approve.verification_status(),
            VerificationStatus::Verified
        );
        assert_eq!(
            Outcome::Reject.verification_status(),
            VerificationStatus::Rejected
        );
        assert_eq!(Outcome::Approve.loan_decision(), "Approved");
        assert_eq!(Outcome::Reject.loan_decision(), "Rejected");
    }
}
