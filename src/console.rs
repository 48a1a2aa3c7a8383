//! Interactive operator console: the shell around the review workflow and
//! the list views. Presentation only; everything it renders comes from one
//! of the pure filters in `queue` or straight from the API client.

use crate::api_client::PortalClient;
use crate::config::Config;
use crate::errors::{PortalError, ResultExt};
use crate::models::{LoanApplicationRequest, VerificationRecord};
use crate::queue::{self, QueueMode};
use crate::reports::{ExportCategory, TimeRange};
use crate::review::{Outcome, ReviewItem, ReviewWorkflow};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Background task that polls the pending queue and keeps the "unread"
/// badge count. The portal has no push channel; the badge is a derived view
/// of the pending collection.
pub struct NotificationPoller {
    count: Arc<AtomicUsize>,
    handle: tokio::task::JoinHandle<()>,
}

impl NotificationPoller {
    /// Spawns the poller. The task stops by itself once the session goes
    /// away, and can be aborted eagerly via `shutdown`.
    pub fn spawn(client: PortalClient, interval: Duration) -> Self {
        let count = Arc::new(AtomicUsize::new(0));
        let shared = count.clone();

        let handle = tokio::spawn(async move {
            loop {
                match client.pending_verifications().await {
                    Ok(pending) => {
                        shared.store(queue::unread_count(&pending), Ordering::Relaxed);
                    }
                    Err(e) if e.is_auth_failure() => {
                        tracing::debug!("Notification poll stopped: not authenticated");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!("Notification poll failed: {}", e);
                    }
                }
                tokio::time::sleep(interval).await;
            }
        });

        Self { count, handle }
    }

    pub fn unread(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Aborts the poll task so a late response cannot outlive the session
    /// that owned it.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// One parsed operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login,
    Logout,
    Queue { mode: QueueMode, search: String },
    Review(i64),
    Loans,
    Loan(i64),
    Fraud,
    Stats,
    Reports(TimeRange),
    Export(ExportCategory),
    Delete(i64),
    Settings,
    SettingsSet { key: String, value: String },
    Admins,
    RegisterAdmin { username: String, full_name: String },
    Apply { amount: i64, income: i64, purpose: String },
    Notifications,
    Help,
    Quit,
}

/// Parses one input line. Errors are operator-facing usage messages.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Err(String::new());
    };
    let rest: Vec<&str> = parts.collect();

    match head.to_lowercase().as_str() {
        "login" => Ok(Command::Login),
        "logout" => Ok(Command::Logout),
        "queue" => {
            let (mode, search_parts) = match rest.first() {
                Some(&"history") => (QueueMode::History, &rest[1..]),
                Some(&"active") => (QueueMode::Active, &rest[1..]),
                _ => (QueueMode::Active, &rest[..]),
            };
            Ok(Command::Queue {
                mode,
                search: search_parts.join(" "),
            })
        }
        "review" => parse_id(&rest, "review <verification-id>").map(Command::Review),
        "loans" => Ok(Command::Loans),
        "loan" => parse_id(&rest, "loan <loan-id>").map(Command::Loan),
        "fraud" => Ok(Command::Fraud),
        "stats" => Ok(Command::Stats),
        "reports" => {
            if rest.is_empty() {
                return Ok(Command::Reports(TimeRange::default()));
            }
            let label = rest.join(" ");
            TimeRange::parse(&label)
                .map(Command::Reports)
                .ok_or_else(|| format!("Unknown time range '{}'", label))
        }
        "export" => rest
            .first()
            .and_then(|s| ExportCategory::parse(s))
            .map(Command::Export)
            .ok_or_else(|| "Usage: export <verified|rejected|pending>".to_string()),
        "delete" => parse_id(&rest, "delete <customer-id>").map(Command::Delete),
        "settings" => match rest.as_slice() {
            [] => Ok(Command::Settings),
            [key, value @ ..] if !value.is_empty() => Ok(Command::SettingsSet {
                key: key.to_string(),
                value: value.join(" "),
            }),
            _ => Err("Usage: settings [<key> <value>]".to_string()),
        },
        "admins" => Ok(Command::Admins),
        "register" => match rest.as_slice() {
            [username, name @ ..] if !name.is_empty() => Ok(Command::RegisterAdmin {
                username: username.to_string(),
                full_name: name.join(" "),
            }),
            _ => Err("Usage: register <username> <full name>".to_string()),
        },
        "apply" => match rest.as_slice() {
            [amount, income, purpose @ ..] if !purpose.is_empty() => {
                let amount = amount
                    .parse()
                    .map_err(|_| "Amount must be a number".to_string())?;
                let income = income
                    .parse()
                    .map_err(|_| "Income must be a number".to_string())?;
                Ok(Command::Apply {
                    amount,
                    income,
                    purpose: purpose.join(" "),
                })
            }
            _ => Err("Usage: apply <amount> <monthly-income> <purpose>".to_string()),
        },
        "notifications" => Ok(Command::Notifications),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command '{}'. Try 'help'.", other)),
    }
}

fn parse_id(rest: &[&str], usage: &str) -> Result<i64, String> {
    rest.first()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| format!("Usage: {}", usage))
}

const HELP: &str = "\
Commands:
  login                              authenticate against the backend
  logout                             clear the stored session
  queue [active|history] [search]    verification queue views
  review <id>                        open the decision workflow for a pending verification
  loans                              list loan applications
  loan <id>                          open the decision workflow for a loan
  fraud                              high-risk pending customers
  stats                              dashboard counters
  reports [range]                    report stats (e.g. 'reports 1 Week')
  export <verified|rejected|pending> CSV export link
  delete <customer-id>               permanently remove a rejected record
  settings [<key> <value>]           show or update admin settings
  admins                             list administrator accounts
  register <username> <full name>    create an administrator
  apply <amount> <income> <purpose>  submit a loan application (customer role)
  notifications                      customer notifications
  quit";

/// The interactive shell. Owns the client, the stdin reader and the
/// notification poller for the current session.
pub struct Console {
    client: PortalClient,
    config: Config,
    input: Lines<BufReader<Stdin>>,
    poller: Option<NotificationPoller>,
}

impl Console {
    pub fn new(client: PortalClient, config: Config) -> Self {
        Self {
            client,
            config,
            input: BufReader::new(tokio::io::stdin()).lines(),
            poller: None,
        }
    }

    /// Runs the command loop until the operator quits or stdin closes.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        println!("KYC portal console. Type 'help' for commands.");
        if let Some(session) = self.client.session().session() {
            println!("Logged in as {} ({})", session.full_name, session.role);
            self.start_poller();
        }

        loop {
            self.print_prompt();
            let Some(line) = self.input.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let command = match parse_command(&line) {
                Ok(c) => c,
                Err(msg) => {
                    if !msg.is_empty() {
                        println!("{}", msg);
                    }
                    continue;
                }
            };

            if matches!(command, Command::Quit) {
                break;
            }

            if let Err(e) = self.dispatch(command).await {
                println!("Error: {}", e);
                if e.is_auth_failure() {
                    self.stop_poller();
                    println!("Please log in again.");
                }
            }
        }

        self.stop_poller();
        Ok(())
    }

    fn print_prompt(&self) {
        let badge = self
            .poller
            .as_ref()
            .map(|p| p.unread())
            .filter(|n| *n > 0)
            .map(|n| format!(" [{} pending]", n))
            .unwrap_or_default();
        let who = self
            .client
            .session()
            .session()
            .map(|s| s.full_name)
            .unwrap_or_else(|| "guest".to_string());
        print!("{}{}> ", who, badge);
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }

    async fn dispatch(&mut self, command: Command) -> Result<(), PortalError> {
        match command {
            Command::Login => self.login().await,
            Command::Logout => {
                self.stop_poller();
                self.client.logout();
                println!("Logged out.");
                Ok(())
            }
            Command::Queue { mode, search } => self.show_queue(mode, &search).await,
            Command::Review(id) => self.run_review(ReviewTarget::Verification(id)).await,
            Command::Loans => self.show_loans().await,
            Command::Loan(id) => self.run_review(ReviewTarget::Loan(id)).await,
            Command::Fraud => self.show_fraud().await,
            Command::Stats => self.show_stats().await,
            Command::Reports(range) => self.show_reports(range).await,
            Command::Export(category) => self.export(category),
            Command::Delete(id) => self.delete_record(id).await,
            Command::Settings => self.show_settings().await,
            Command::SettingsSet { key, value } => self.set_setting(&key, &value).await,
            Command::Admins => self.show_admins().await,
            Command::RegisterAdmin { username, full_name } => {
                self.register_admin(&username, &full_name).await
            }
            Command::Apply { amount, income, purpose } => {
                let ack = self
                    .client
                    .apply_for_loan(&LoanApplicationRequest {
                        amount,
                        purpose,
                        monthly_income: income,
                    })
                    .await?;
                println!("{}", ack.message.unwrap_or_else(|| "Submitted".to_string()));
                Ok(())
            }
            Command::Notifications => {
                let items = self.client.notifications().await?;
                if items.is_empty() {
                    println!("No notifications.");
                }
                for n in items {
                    println!("- {}: {}", n.title, n.message);
                }
                Ok(())
            }
            Command::Help => {
                println!("{}", HELP);
                Ok(())
            }
            Command::Quit => Ok(()),
        }
    }

    async fn login(&mut self) -> Result<(), PortalError> {
        let username = self.ask("Username: ").await?;
        let password = self.ask("Password: ").await?;
        let code = self.ask("Customer code (blank for admin): ").await?;
        let code = code.trim();
        let customer_code = if code.is_empty() { None } else { Some(code) };

        let login = self
            .client
            .login(username.trim(), &password, customer_code)
            .await?;
        println!("Welcome, {} ({})", login.full_name, login.role);
        self.start_poller();
        Ok(())
    }

    async fn show_queue(&mut self, mode: QueueMode, search: &str) -> Result<(), PortalError> {
        let records = self
            .client
            .all_verifications()
            .await
            .context("Fetching verification queue")?;
        let view = queue::filter_queue(&records, mode, search);

        match mode {
            QueueMode::Active => {
                let (pending, verified) = queue::split_active(&view);
                println!("Pending ({})", pending.len());
                for r in &pending {
                    print_verification_row(r);
                }
                println!("Verified ({})", verified.len());
                for r in &verified {
                    print_verification_row(r);
                }
            }
            QueueMode::History => {
                println!("Rejected ({})", view.len());
                for r in &view {
                    let reason = if r.remarks.is_empty() {
                        "No reason provided"
                    } else {
                        &r.remarks
                    };
                    println!(
                        "  #{:<5} {} {:<24} {:<18} risk {:>3}  {}",
                        r.id, r.serial_no, r.full_name, r.cnic, r.risk_score, reason
                    );
                }
            }
        }
        Ok(())
    }

    async fn show_loans(&mut self) -> Result<(), PortalError> {
        let loans = self.client.loans().await.context("Fetching loan applications")?;
        let needs_review = loans
            .iter()
            .filter(|l| l.eligibility_status.needs_review())
            .count();
        println!("{} applications, {} awaiting review", loans.len(), needs_review);
        for l in &loans {
            println!(
                "  #{:<5} {:<24} {:<18} {:?}  limit {}",
                l.id,
                l.full_name,
                l.cnic,
                l.eligibility_status,
                l.max_limit.unwrap_or(0)
            );
        }
        Ok(())
    }

    async fn show_fraud(&mut self) -> Result<(), PortalError> {
        let pending = self
            .client
            .pending_verifications()
            .await
            .context("Fetching pending customers")?;
        let alerts = queue::fraud_alerts(&pending);
        if alerts.is_empty() {
            println!("No high-risk pending customers.");
            return Ok(());
        }
        println!("{} high-risk pending customers:", alerts.len());
        for r in alerts {
            println!(
                "  #{:<5} {:<24} score {:>3}  {}",
                r.customer_id,
                r.full_name,
                r.risk_score,
                r.fraud_alerts.first().map(String::as_str).unwrap_or("")
            );
        }
        Ok(())
    }

    async fn show_stats(&mut self) -> Result<(), PortalError> {
        let stats = self.client.dashboard_stats().await?;
        println!(
            "Customers: {}  Pending verifications: {}  Approved loans: {}",
            stats.total_customers, stats.pending_verifications, stats.approved_loans
        );
        Ok(())
    }

    async fn show_reports(&mut self, range: TimeRange) -> Result<(), PortalError> {
        let stats = self.client.report_stats(range).await?;
        println!(
            "Range {}: verified {}  rejected {}  pending {}",
            range, stats.overall.verified, stats.overall.rejected, stats.overall.pending
        );
        for bucket in &stats.daily_activity {
            println!(
                "  {:<4} verified {:>4}  rejected {:>4}",
                bucket.name, bucket.verified, bucket.rejected
            );
        }
        Ok(())
    }

    fn export(&self, category: ExportCategory) -> Result<(), PortalError> {
        let url = self.client.export_url(category)?;
        println!(
            "Download {} as {}:",
            category.as_path(),
            category.suggested_filename()
        );
        println!("{}", url);
        Ok(())
    }

    async fn delete_record(&mut self, customer_id: i64) -> Result<(), PortalError> {
        let records = self.client.all_verifications().await?;
        let target = records
            .iter()
            .find(|r| r.customer_id == customer_id)
            .ok_or_else(|| PortalError::Api {
                status: 404,
                message: format!("Customer {} not found", customer_id),
            })?;

        if target.status != crate::models::VerificationStatus::Rejected {
            return Err(PortalError::Validation(
                "Only rejected records can be deleted".to_string(),
            ));
        }

        let answer = self
            .ask(&format!(
                "Permanently delete {} ({})? This cannot be undone. Type 'yes' to confirm: ",
                target.full_name, target.serial_no
            ))
            .await?;
        if answer.trim().to_lowercase() != "yes" {
            println!("Cancelled.");
            return Ok(());
        }

        let ack = self.client.delete_verification(customer_id).await?;
        println!("{}", ack.message.unwrap_or_else(|| "Deleted".to_string()));
        Ok(())
    }

    async fn show_settings(&mut self) -> Result<(), PortalError> {
        let settings = self.client.get_settings().await?;
        if settings.is_empty() {
            println!("No settings stored.");
        }
        for (key, value) in &settings {
            println!("  {} = {}", key, value);
        }
        Ok(())
    }

    async fn set_setting(&mut self, key: &str, value: &str) -> Result<(), PortalError> {
        let mut settings = self.client.get_settings().await?;
        // Accept JSON values; fall back to a plain string.
        let parsed = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        settings.insert(key.to_string(), parsed);
        let ack = self.client.update_settings(&settings).await?;
        println!("{}", ack.message.unwrap_or_else(|| "Settings updated".to_string()));
        Ok(())
    }

    async fn show_admins(&mut self) -> Result<(), PortalError> {
        let admins = self.client.admins().await?;
        for a in &admins {
            println!(
                "  #{:<4} {:<16} {:<24} {}",
                a.id,
                a.username,
                a.full_name,
                a.role.as_deref().unwrap_or("Admin")
            );
        }
        Ok(())
    }

    async fn register_admin(&mut self, username: &str, full_name: &str) -> Result<(), PortalError> {
        let password = self.ask("New admin password: ").await?;
        let ack = self
            .client
            .register_admin(username, password.trim(), full_name)
            .await?;
        println!("{}", ack.message.unwrap_or_else(|| "Admin created".to_string()));
        Ok(())
    }

    /// Runs one full review dialog: open, choose, submit, re-fetch.
    async fn run_review(&mut self, target: ReviewTarget) -> Result<(), PortalError> {
        let mut workflow = ReviewWorkflow::new(self.client.clone());

        let item = match target {
            ReviewTarget::Verification(id) => workflow.open_verification(id).await?,
            ReviewTarget::Loan(id) => workflow.open_loan(id).await?,
        };
        print_review_detail(item);

        let receipt = loop {
            println!("approve [remarks] | reject <remarks> | cancel");
            let Some(line) = self.input.next_line().await.map_err(io_err)? else {
                workflow.cancel()?;
                return Ok(());
            };
            let line = line.trim();
            let (verb, remarks) = match line.split_once(' ') {
                Some((v, r)) => (v, r),
                None => (line, ""),
            };

            match verb.to_lowercase().as_str() {
                "cancel" => {
                    workflow.cancel()?;
                    println!("Review closed, no decision recorded.");
                    return Ok(());
                }
                "approve" => workflow.set_outcome(Outcome::Approve)?,
                "reject" => workflow.set_outcome(Outcome::Reject)?,
                _ => {
                    println!("Unknown choice '{}'.", verb);
                    continue;
                }
            }
            workflow.set_remarks(remarks)?;

            match workflow.submit().await {
                Ok(receipt) => break receipt,
                Err(e) if e.is_retryable() || matches!(e, PortalError::Validation(_)) => {
                    // Input is preserved; let the operator adjust and retry.
                    println!("Error: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            }
        };

        println!("{}", receipt.message);
        if let Some(url) = &receipt.pdf_url {
            open_document(url);
        }
        // The queue on screen is stale until this re-fetch.
        self.refresh_after_decision(&target).await;
        Ok(())
    }

    /// Re-fetches the owning list so the console reflects the new status.
    /// A failed refresh is reported but does not undo the decision.
    async fn refresh_after_decision(&mut self, target: &ReviewTarget) {
        let result = match target {
            ReviewTarget::Verification(_) => self.show_queue(QueueMode::Active, "").await,
            ReviewTarget::Loan(_) => self.show_loans().await,
        };
        if let Err(e) = result {
            println!("List refresh failed: {}", e);
        }
    }

    async fn ask(&mut self, prompt: &str) -> Result<String, PortalError> {
        print!("{}", prompt);
        use std::io::Write;
        let _ = std::io::stdout().flush();
        match self.input.next_line().await.map_err(io_err)? {
            Some(line) => Ok(line),
            None => Err(PortalError::Validation("Input closed".to_string())),
        }
    }

    fn start_poller(&mut self) {
        self.stop_poller();
        self.poller = Some(NotificationPoller::spawn(
            self.client.clone(),
            Duration::from_secs(self.config.notification_poll_secs),
        ));
    }

    fn stop_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.shutdown();
        }
    }
}

/// Targets the review dialog can be opened on.
#[derive(Debug, Clone, Copy)]
enum ReviewTarget {
    Verification(i64),
    Loan(i64),
}

fn io_err(e: std::io::Error) -> PortalError {
    PortalError::Network(format!("stdin: {}", e))
}

fn print_verification_row(r: &VerificationRecord) {
    let flag = if r.fraud_flagged { " [FRAUD]" } else { "" };
    println!(
        "  #{:<5} {} {:<24} {:<18} risk {:>3}{}",
        r.id, r.serial_no, r.full_name, r.cnic, r.risk_score, flag
    );
    if let Some(alert) = r.fraud_alerts.first() {
        println!("         ! {}", alert);
    }
}

fn print_review_detail(item: &ReviewItem) {
    match item {
        ReviewItem::Verification(v) => {
            println!("Reviewing verification #{} - {}", v.id, v.full_name);
            println!("  CNIC: {}", v.cnic);
            if let Some(email) = &v.email {
                println!("  Email: {}", email);
            }
            if let Some(phone) = &v.phone {
                println!("  Phone: {}", phone);
            }
            println!("  Risk score: {}", v.risk_score);
            if !v.remarks.is_empty() {
                println!("  Remarks: {}", v.remarks);
            }
            for alert in &v.fraud_alerts {
                println!("  ! {}", alert);
            }
        }
        ReviewItem::Loan(d) => {
            println!("Reviewing loan #{} - {}", d.loan.id, d.loan.full_name);
            println!(
                "  Status: {:?}  Risk: {}  Income: {}",
                d.loan.eligibility_status,
                d.loan.risk_score.unwrap_or(0),
                d.loan.income_range.as_deref().unwrap_or("-")
            );
            if let Some(limit) = d.loan.max_limit {
                println!("  Max limit: {}", limit);
            }
            for doc in &d.documents {
                println!("  Document: {} ({})", doc.doc_type, doc.file_path);
            }
        }
    }
}

/// Hands a generated document to the platform opener. Best effort only;
/// failure is logged and ignored.
fn open_document(url: &str) {
    println!("Decision document: {}", url);
    #[cfg(target_os = "macos")]
    let opener = "open";
    #[cfg(not(target_os = "macos"))]
    let opener = "xdg-open";

    if let Err(e) = std::process::Command::new(opener)
        .arg(url)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
    {
        tracing::debug!("Could not open document viewer: {}", e);
    }
}
