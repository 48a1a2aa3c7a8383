//! KYC Portal Client Library
//!
//! This library provides the operator-facing client for the KYC and
//! micro-lending backend: authentication, the verification review queue,
//! loan decisions, fraud-alert listing, reporting/export and settings. All
//! business logic (risk scoring, loan eligibility, persistence) lives
//! behind the REST API; this crate only calls it.
//!
//! # Modules
//!
//! - `api_client`: the single HTTP gateway adapter for the backend.
//! - `config`: configuration management.
//! - `console`: interactive operator shell.
//! - `errors`: error handling types.
//! - `models`: DTOs observed at the API boundary.
//! - `queue`: pure filtering for the list views.
//! - `reports`: report ranges and CSV export links.
//! - `review`: the approve/reject decision workflow.
//! - `session`: explicit session context with file persistence.

pub mod api_client;
pub mod config;
pub mod console;
pub mod errors;
pub mod models;
pub mod queue;
pub mod reports;
pub mod review;
pub mod session;
