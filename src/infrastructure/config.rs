use crate::domain::models::{TimezoneList, DEFAULT_TIMEZONES};
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

const APP_JSON: &str = "app.json";
pub const DEFAULT_APP_NAME: &str = "DayGrid";
pub const DEFAULT_DEBOUNCE_MS: u64 = 1_000;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 4180;

const KV_URL_KEYS: [&str; 2] = ["DAYGRID_KV_REST_URL", "UPSTASH_REDIS_REST_URL"];
const KV_TOKEN_KEYS: [&str; 2] = ["DAYGRID_KV_REST_TOKEN", "UPSTASH_REDIS_REST_TOKEN"];
const USER_ID_KEYS: [&str; 1] = ["DAYGRID_USER_ID"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub app_name: String,
    pub timezone: Tz,
    pub default_timezones: TimezoneList,
    pub debounce: Duration,
    pub server_host: String,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            timezone: Tz::UTC,
            default_timezones: TimezoneList::default(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            server_host: DEFAULT_HOST.to_string(),
            server_port: DEFAULT_PORT,
        }
    }
}

/// Connection settings for the remote key-value store, as found in the
/// environment. The token may still come from the OS keyring.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteStoreEnv {
    pub rest_url: Option<String>,
    pub rest_token: Option<String>,
    pub user_id: Option<String>,
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([(
        APP_JSON,
        serde_json::json!({
            "schema": 1,
            "appName": DEFAULT_APP_NAME,
            "timezone": "UTC",
            "defaultTimezones": DEFAULT_TIMEZONES,
            "sync": {
                "debounceMs": DEFAULT_DEBOUNCE_MS
            },
            "server": {
                "host": DEFAULT_HOST,
                "port": DEFAULT_PORT
            }
        }),
    )])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

fn non_empty_str<'a>(value: &'a serde_json::Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    let app = read_config(&path)?;
    let defaults = AppConfig::default();

    let timezone = match non_empty_str(&app, "/timezone") {
        Some(name) => name.parse::<Tz>().map_err(|_| {
            InfraError::InvalidConfig(format!("unknown timezone '{name}' in {}", path.display()))
        })?,
        None => defaults.timezone,
    };

    let default_timezones = match app.get("defaultTimezones") {
        Some(value) if !value.is_null() => {
            let names = serde_json::from_value::<Vec<String>>(value.clone())?;
            for name in &names {
                if name.trim().parse::<Tz>().is_err() {
                    return Err(InfraError::InvalidConfig(format!(
                        "unknown timezone '{name}' in defaultTimezones of {}",
                        path.display()
                    )));
                }
            }
            TimezoneList::new(names).map_err(InfraError::InvalidConfig)?
        }
        _ => defaults.default_timezones,
    };

    let debounce = app
        .pointer("/sync/debounceMs")
        .and_then(serde_json::Value::as_u64)
        .map(Duration::from_millis)
        .unwrap_or(defaults.debounce);

    let server_port = match app.pointer("/server/port").and_then(serde_json::Value::as_u64) {
        Some(port) => u16::try_from(port).map_err(|_| {
            InfraError::InvalidConfig(format!("server.port {port} out of range in {}", path.display()))
        })?,
        None => defaults.server_port,
    };

    Ok(AppConfig {
        app_name: non_empty_str(&app, "/appName")
            .map(ToOwned::to_owned)
            .unwrap_or(defaults.app_name),
        timezone,
        default_timezones,
        debounce,
        server_host: non_empty_str(&app, "/server/host")
            .map(ToOwned::to_owned)
            .unwrap_or(defaults.server_host),
        server_port,
    })
}

pub fn load_remote_store_env() -> RemoteStoreEnv {
    load_remote_store_env_from_lookup(|key| std::env::var(key).ok())
}

pub fn load_remote_store_env_from_lookup<F>(lookup: F) -> RemoteStoreEnv
where
    F: Fn(&str) -> Option<String>,
{
    RemoteStoreEnv {
        rest_url: optional_lookup_value(&lookup, &KV_URL_KEYS),
        rest_token: optional_lookup_value(&lookup, &KV_TOKEN_KEYS),
        user_id: optional_lookup_value(&lookup, &USER_ID_KEYS),
    }
}

pub fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}

pub fn kv_token_keys() -> &'static [&'static str] {
    &KV_TOKEN_KEYS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_CONFIG_DIR: AtomicUsize = AtomicUsize::new(0);

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let sequence = NEXT_CONFIG_DIR.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "daygrid-config-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp config dir");
            Self { path }
        }

        fn write_app(&self, value: serde_json::Value) {
            fs::write(self.path.join(APP_JSON), value.to_string()).expect("write app.json");
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn default_app_config_round_trips_through_disk() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");

        let config = load_app_config(&dir.path).expect("load app config");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.debounce, Duration::from_millis(1_000));
        assert_eq!(config.server_port, 4180);
    }

    #[test]
    fn ensure_default_configs_keeps_existing_files() {
        let dir = TempConfigDir::new();
        dir.write_app(serde_json::json!({ "schema": 1, "timezone": "Asia/Tokyo" }));
        ensure_default_configs(&dir.path).expect("ensure defaults");

        let config = load_app_config(&dir.path).expect("load app config");
        assert_eq!(config.timezone, Tz::Asia__Tokyo);
        assert_eq!(config.app_name, DEFAULT_APP_NAME);
    }

    #[test]
    fn load_app_config_reads_overrides() {
        let dir = TempConfigDir::new();
        dir.write_app(serde_json::json!({
            "schema": 1,
            "appName": "Planner",
            "timezone": "Europe/London",
            "defaultTimezones": ["UTC", "Asia/Tokyo"],
            "sync": { "debounceMs": 250 },
            "server": { "host": "0.0.0.0", "port": 9000 }
        }));

        let config = load_app_config(&dir.path).expect("load app config");
        assert_eq!(config.app_name, "Planner");
        assert_eq!(config.timezone, Tz::Europe__London);
        assert_eq!(
            config.default_timezones.as_slice(),
            ["UTC".to_string(), "Asia/Tokyo".to_string()]
        );
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.server_port, 9000);
    }

    #[test]
    fn load_app_config_rejects_unknown_schema_and_timezones() {
        let dir = TempConfigDir::new();
        dir.write_app(serde_json::json!({ "schema": 2 }));
        assert!(matches!(
            load_app_config(&dir.path),
            Err(InfraError::InvalidConfig(_))
        ));

        dir.write_app(serde_json::json!({ "schema": 1, "timezone": "Mars/Base" }));
        assert!(matches!(
            load_app_config(&dir.path),
            Err(InfraError::InvalidConfig(_))
        ));

        dir.write_app(serde_json::json!({ "schema": 1, "defaultTimezones": [] }));
        assert!(matches!(
            load_app_config(&dir.path),
            Err(InfraError::InvalidConfig(_))
        ));
    }

    #[test]
    fn remote_store_env_prefers_first_non_empty_key() {
        let env = load_remote_store_env_from_lookup(|key| match key {
            "DAYGRID_KV_REST_URL" => Some("   ".to_string()),
            "UPSTASH_REDIS_REST_URL" => Some("https://kv.example.com".to_string()),
            "DAYGRID_KV_REST_TOKEN" => Some("token-a".to_string()),
            "UPSTASH_REDIS_REST_TOKEN" => Some("token-b".to_string()),
            _ => None,
        });

        assert_eq!(env.rest_url.as_deref(), Some("https://kv.example.com"));
        assert_eq!(env.rest_token.as_deref(), Some("token-a"));
        assert_eq!(env.user_id, None);
    }
}
