pub mod application;
pub mod domain;
pub mod http;
pub mod infrastructure;

use application::bootstrap::{bootstrap_workspace, build_persistence_service};
use application::commands::{load_remote_state, AppState};
use infrastructure::config::load_remote_store_env;
use infrastructure::credential_store::KeyringSecretStore;
use infrastructure::error::InfraError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workspace_root: PathBuf,
    pub host: Option<String>,
    pub port: Option<u16>,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// Bootstraps the workspace, merges remote state in the background and
/// serves the HTTP API until shutdown.
pub async fn run(options: RunOptions) -> Result<(), InfraError> {
    let bootstrap = bootstrap_workspace(&options.workspace_root)?;
    let host = options
        .host
        .unwrap_or_else(|| bootstrap.config.server_host.clone());
    let port = options.port.unwrap_or(bootstrap.config.server_port);
    info!(
        workspace = %bootstrap.workspace_root.display(),
        database = %bootstrap.database_path.display(),
        "workspace ready"
    );

    let persistence = build_persistence_service(
        &load_remote_store_env(),
        &KeyringSecretStore::default(),
        bootstrap.config.debounce,
    )?;
    let state = Arc::new(AppState::from_bootstrap(bootstrap, Arc::new(persistence))?);

    let merge_state = Arc::clone(&state);
    tokio::spawn(async move {
        match load_remote_state(&merge_state).await {
            Ok(_) => {}
            Err(InfraError::Unauthorized(_)) => {
                merge_state.log_info("load_remote_state", "no signed-in user; cloud sync disabled");
            }
            Err(error) => {
                merge_state.log_error("load_remote_state", &format!("remote load failed: {error}"));
            }
        }
    });

    let driver = http::driver::spawn_timer_driver(Arc::clone(&state));
    let result = http::serve(state, &host, port).await;
    driver.abort();
    result
}
