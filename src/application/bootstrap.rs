use crate::application::persistence::{
    KvPersistenceGateway, LocalOnlyGateway, PersistenceGateway, PersistenceService,
};
use crate::infrastructure::config::{
    ensure_default_configs, kv_token_keys, load_app_config, AppConfig, RemoteStoreEnv,
};
use crate::infrastructure::credential_store::SecretStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::identity::StaticIdentity;
use crate::infrastructure::kv_client::UpstashKvClient;
use crate::infrastructure::storage::initialize_database;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub database_path: PathBuf,
    pub config: AppConfig,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let logs_dir = workspace_root.join("logs");
    let database_path = state_dir.join("daygrid.sqlite");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&state_dir)?;
    fs::create_dir_all(&logs_dir)?;

    ensure_default_configs(&config_dir)?;
    let config = load_app_config(&config_dir)?;
    initialize_database(&database_path)?;

    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        config_dir,
        logs_dir,
        database_path,
        config,
    })
}

/// Wires identity and the remote gateway from the environment. The REST
/// token comes from the environment first, then the secret store. Without a
/// URL or token the service runs local-only.
pub fn build_persistence_service(
    env: &RemoteStoreEnv,
    secrets: &dyn SecretStore,
    quiet_period: Duration,
) -> Result<PersistenceService, InfraError> {
    let identity = Arc::new(StaticIdentity::new(env.user_id.as_deref()));
    let gateway: Arc<dyn PersistenceGateway> = match env.rest_url.as_deref() {
        None => {
            info!("no remote store url configured; running local-only");
            Arc::new(LocalOnlyGateway)
        }
        Some(rest_url) => {
            let token = match env.rest_token.clone() {
                Some(token) => Some(token),
                None => secrets.load_secret()?,
            };
            match token {
                Some(token) => {
                    let client = Arc::new(UpstashKvClient::new(rest_url, token)?);
                    info!(rest_url, "remote store configured");
                    Arc::new(KvPersistenceGateway::new(client))
                }
                None => {
                    warn!(
                        keys = %kv_token_keys().join(", "),
                        "remote store url set without a token; running local-only"
                    );
                    Arc::new(LocalOnlyGateway)
                }
            }
        }
    };

    Ok(PersistenceService::new(identity, gateway, quiet_period))
}
