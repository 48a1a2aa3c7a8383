use crate::errors::PortalError;
use crate::models::*;
use crate::reports::{ExportCategory, TimeRange};
use crate::session::SessionStore;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Client for the KYC portal backend.
///
/// One instance per process: a single reqwest client configured with one
/// base URL, attaching the session bearer token per call. No retries, no
/// caching, no request de-duplication.
#[derive(Clone)]
pub struct PortalClient {
    client: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl PortalClient {
    /// Creates a new `PortalClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the portal backend, without trailing slash.
    /// * `timeout` - Per-request timeout.
    /// * `session` - The session store supplying the bearer token.
    pub fn new(
        base_url: String,
        timeout: Duration,
        session: Arc<SessionStore>,
    ) -> Result<Self, PortalError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortalError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// The session store this client authenticates with.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    // ---- auth ----

    /// Exchanges credentials for a bearer token via `POST /api/auth/token`
    /// (form-encoded) and records the session on success.
    ///
    /// Customers authenticate with CNIC + password + customer code; the code
    /// travels in the OAuth `client_secret` field.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        customer_code: Option<&str>,
    ) -> Result<LoginResponse, PortalError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(PortalError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let url = format!("{}/api/auth/token", self.base_url);
        tracing::info!("Authenticating {} against {}", username, url);

        let mut form = vec![("username", username), ("password", password)];
        if let Some(code) = customer_code {
            form.push(("client_secret", code));
        }

        let response = self.client.post(&url).form(&form).send().await?;
        let login: LoginResponse = Self::decode(response).await?;
        self.session.login(&login)?;
        Ok(login)
    }

    /// Clears the local session. The backend keeps no server-side session
    /// state, so no network call is involved.
    pub fn logout(&self) {
        self.session.clear();
    }

    // ---- admin: verifications ----

    /// Fetches the pending verification queue.
    pub async fn pending_verifications(&self) -> Result<Vec<VerificationRecord>, PortalError> {
        self.get("/api/admin/pending").await
    }

    /// Fetches every verification record (pending, verified and rejected),
    /// enriched with risk scores and fraud flags.
    pub async fn all_verifications(&self) -> Result<Vec<VerificationRecord>, PortalError> {
        self.get("/api/admin/all-verifications").await
    }

    /// Submits a verification decision for one customer.
    pub async fn submit_verification(
        &self,
        customer_id: i64,
        update: &VerificationUpdate,
    ) -> Result<Ack, PortalError> {
        tracing::info!(
            "Submitting {} decision for customer {}",
            update.status,
            customer_id
        );
        self.post(&format!("/api/admin/verify/{}", customer_id), update)
            .await
    }

    /// Permanently deletes a rejected verification record and its customer.
    /// Irreversible; callers must confirm with the operator first.
    pub async fn delete_verification(&self, customer_id: i64) -> Result<Ack, PortalError> {
        tracing::info!("Deleting verification record for customer {}", customer_id);
        self.request(
            Method::DELETE,
            &format!("/api/admin/verifications/{}", customer_id),
            None::<&()>,
        )
        .await
    }

    // ---- admin: loans ----

    /// Fetches all loan applications.
    pub async fn loans(&self) -> Result<Vec<LoanApplication>, PortalError> {
        self.get("/api/admin/loans").await
    }

    /// Fetches the expanded detail for one loan: the application plus the
    /// applicant, their documents and their verification record.
    pub async fn loan_details(&self, loan_id: i64) -> Result<LoanDetails, PortalError> {
        self.get(&format!("/api/admin/loans/{}/details", loan_id))
            .await
    }

    /// Submits an approve/reject decision for a loan. The ack may carry a
    /// `pdf_url` pointing at the generated decision document.
    pub async fn submit_loan_decision(
        &self,
        decision: &LoanDecisionRequest,
    ) -> Result<DecisionAck, PortalError> {
        tracing::info!(
            "Submitting loan decision {} for loan {}",
            decision.decision,
            decision.loan_id
        );
        self.post("/api/admin/loan-decision", decision).await
    }

    // ---- admin: stats, reports, settings ----

    /// Fetches headline dashboard counters.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, PortalError> {
        self.get("/api/admin/stats").await
    }

    /// Fetches aggregate counts and the bucketed activity series for the
    /// given time range.
    pub async fn report_stats(&self, range: TimeRange) -> Result<ReportStats, PortalError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/api/admin/reports/stats", self.base_url),
            &[("time_range", range.label())],
        )
        .map_err(|e| PortalError::Network(format!("Failed to build URL: {}", e)))?;

        let response = self.authed(Method::GET, url)?.send().await?;
        Self::decode(self.check_auth(response)?).await
    }

    /// Builds the CSV export link for a category. The backend authenticates
    /// the download with the session token as a query credential, so the
    /// returned URL must not be logged.
    pub fn export_url(&self, category: ExportCategory) -> Result<url::Url, PortalError> {
        let token = self
            .session
            .token()
            .ok_or_else(|| PortalError::Unauthorized("Not logged in".to_string()))?;

        url::Url::parse_with_params(
            &format!("{}/api/admin/reports/export/{}", self.base_url, category.as_path()),
            &[("token", token.as_str())],
        )
        .map_err(|e| PortalError::Network(format!("Failed to build export URL: {}", e)))
    }

    /// Lists administrator accounts.
    pub async fn admins(&self) -> Result<Vec<AdminUser>, PortalError> {
        self.get("/api/admin/admins").await
    }

    /// Registers a new administrator account.
    pub async fn register_admin(
        &self,
        username: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Ack, PortalError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(PortalError::Validation(
                "Username and password are required".to_string(),
            ));
        }
        let body = serde_json::json!({
            "username": username,
            "password": password,
            "full_name": full_name,
        });
        self.post("/api/auth/admin/register", &body).await
    }

    /// Fetches the stored settings object for the logged-in admin.
    pub async fn get_settings(&self) -> Result<SettingsMap, PortalError> {
        self.get("/api/admin/settings").await
    }

    /// Replaces the stored settings object.
    pub async fn update_settings(&self, settings: &SettingsMap) -> Result<Ack, PortalError> {
        self.post("/api/admin/settings", settings).await
    }

    // ---- customer dashboard ----

    /// Fetches the customer's own dashboard payload.
    pub async fn customer_dashboard(&self) -> Result<serde_json::Value, PortalError> {
        self.get("/api/dashboard/stats").await
    }

    /// Submits a loan application on behalf of the logged-in customer.
    pub async fn apply_for_loan(
        &self,
        application: &LoanApplicationRequest,
    ) -> Result<Ack, PortalError> {
        if application.amount <= 0 || application.purpose.trim().is_empty() {
            return Err(PortalError::Validation(
                "Amount and purpose are required".to_string(),
            ));
        }
        self.post("/api/dashboard/loan/apply", application).await
    }

    /// Fetches (and server-side marks as read) the customer's notifications.
    pub async fn notifications(&self) -> Result<Vec<Notification>, PortalError> {
        self.get("/api/dashboard/notifications").await
    }

    // ---- plumbing ----

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PortalError> {
        self.request(Method::GET, path, None::<&()>).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PortalError> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Issues one authenticated request. A missing token short-circuits to
    /// `Unauthorized` without touching the network; a 401 response clears
    /// the session so the caller lands back at the login prompt.
    async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, PortalError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);

        let mut builder = self.authed(method, url)?;
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        Self::decode(self.check_auth(response)?).await
    }

    fn authed(
        &self,
        method: Method,
        url: impl reqwest::IntoUrl,
    ) -> Result<reqwest::RequestBuilder, PortalError> {
        let token = self
            .session
            .token()
            .ok_or_else(|| PortalError::Unauthorized("Not logged in".to_string()))?;
        Ok(self
            .client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", token)))
    }

    /// Maps a 401 to `Unauthorized` and clears the stored session, which is
    /// the client's only signal that the token went stale.
    fn check_auth(&self, response: reqwest::Response) -> Result<reqwest::Response, PortalError> {
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("Backend rejected the session token; clearing session");
            self.session.clear();
            return Err(PortalError::Unauthorized(
                "Session expired or invalid".to_string(),
            ));
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PortalError> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(PortalError::Unauthorized(
                "Session expired or invalid".to_string(),
            ));
        }

        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PortalError::Api {
                status: status.as_u16(),
                message: extract_error_message(&text),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| PortalError::Decode(format!("Failed to parse response: {}", e)))
    }
}

/// Pulls the human-readable message out of an error body. The backend uses
/// `{"detail": ...}`; `{"error": ...}` and plain text are tolerated.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "error", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    if body.trim().is_empty() {
        "Unknown error".to_string()
    } else {
        body.trim().to_string()
    }
}
