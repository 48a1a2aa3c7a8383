use crate::errors::PortalError;
use crate::models::LoginResponse;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// The authenticated operator identity.
///
/// Overwritten wholesale on login and discarded on logout; never merged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Bearer token attached to every authenticated request.
    pub token: String,
    /// "admin" or "customer".
    pub role: String,
    /// Backend identifier of the logged-in user.
    pub user_id: i64,
    /// Display name shown in the console prompt.
    pub full_name: String,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Holds the current session and mirrors it to a JSON file, the analog of
/// the browser-scoped key/value store the portal originally used.
///
/// Mutation happens only through `login` and `clear`; components that need
/// identity receive this store explicitly rather than reading globals.
pub struct SessionStore {
    path: PathBuf,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Creates a store backed by `path`, restoring any persisted session.
    ///
    /// A missing or unreadable file is treated as "not logged in" rather
    /// than an error; token validity is decided by the backend anyway.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let current = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Session>(&raw) {
                Ok(session) => {
                    tracing::info!("Restored session for {}", session.full_name);
                    Some(session)
                }
                Err(e) => {
                    tracing::warn!("Discarding unreadable session file: {}", e);
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            path,
            current: RwLock::new(current),
        }
    }

    /// In-memory store for tests and one-shot invocations; nothing is
    /// persisted because the path is never written on a login that fails,
    /// and `/dev/null`-style sinks differ per platform.
    pub fn ephemeral() -> Self {
        Self {
            path: PathBuf::new(),
            current: RwLock::new(None),
        }
    }

    /// Records a successful login, replacing any previous session.
    pub fn login(&self, response: &LoginResponse) -> Result<Session, PortalError> {
        let session = Session {
            token: response.access_token.clone(),
            role: response.role.clone(),
            user_id: response.user_id,
            full_name: response.full_name.clone(),
        };
        self.persist(&session);
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        tracing::info!("Session established for {} ({})", session.full_name, session.role);
        Ok(session)
    }

    /// The current bearer token, if logged in.
    pub fn token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.token.clone())
    }

    /// A copy of the current session, if logged in.
    pub fn session(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Removes the session from memory and disk. Called on explicit logout
    /// and whenever the backend rejects the token.
    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
        if !self.path.as_os_str().is_empty() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove session file: {}", e);
                }
            }
        }
        tracing::info!("Session cleared");
    }

    fn persist(&self, session: &Session) {
        if self.path.as_os_str().is_empty() {
            return;
        }
        match serde_json::to_string_pretty(session) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(&self.path, raw) {
                    tracing::warn!("Failed to persist session: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize session: {}", e),
        }
    }
}
