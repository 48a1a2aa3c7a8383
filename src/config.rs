use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub session_path: PathBuf,
    pub request_timeout_secs: u64,
    pub notification_poll_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            api_base_url: std::env::var("PORTAL_API_BASE_URL")
                .map_err(|_| {
                    anyhow::anyhow!("PORTAL_API_BASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("PORTAL_API_BASE_URL cannot be empty");
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("PORTAL_API_BASE_URL must start with http:// or https://");
                    }
                    Ok(url.trim_end_matches('/').to_string())
                })?,
            session_path: std::env::var("PORTAL_SESSION_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".portal-session.json")),
            request_timeout_secs: std::env::var("PORTAL_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("PORTAL_REQUEST_TIMEOUT_SECS must be a valid number")
                })?,
            notification_poll_secs: std::env::var("PORTAL_NOTIFICATION_POLL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("PORTAL_NOTIFICATION_POLL_SECS must be a valid number")
                })?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("API base URL: {}", config.api_base_url);
        tracing::debug!("Session path: {}", config.session_path.display());
        tracing::debug!("Request timeout: {}s", config.request_timeout_secs);

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn base_url_scheme_is_validated() {
        let _guard = lock_env();
        std::env::set_var("PORTAL_API_BASE_URL", "ftp://portal.example.com");
        assert!(Config::from_env().is_err());
        std::env::remove_var("PORTAL_API_BASE_URL");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let _guard = lock_env();
        std::env::set_var("PORTAL_API_BASE_URL", "https://portal.example.com/");
        let config = Config::from_env().unwrap();
        assert_eq!(config.api_base_url, "https://portal.example.com");
        std::env::remove_var("PORTAL_API_BASE_URL");
    }
}
