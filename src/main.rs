use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kyc_portal::api_client::PortalClient;
use kyc_portal::config::Config;
use kyc_portal::console::Console;
use kyc_portal::session::SessionStore;

/// Main entry point for the portal console.
///
/// Initializes tracing and configuration, restores any persisted session,
/// builds the API client and hands control to the interactive shell.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kyc_portal=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Restore the persisted session, if any
    let session = Arc::new(SessionStore::open(&config.session_path));

    let client = PortalClient::new(
        config.api_base_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
        session,
    )?;
    tracing::info!("Portal client initialized: {}", config.api_base_url);

    let mut console = Console::new(client, config);
    console.run().await
}
