use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// String-valued key-value store reached over the network.
#[async_trait]
pub trait KvClient: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError>;
}

/// Redis over the Upstash REST protocol: each command is POSTed as a JSON
/// array and answered with `{"result": ...}` or `{"error": ...}`.
#[derive(Debug, Clone)]
pub struct UpstashKvClient {
    client: Client,
    endpoint: Url,
    token: String,
}

impl UpstashKvClient {
    pub fn new(rest_url: &str, token: impl Into<String>) -> Result<Self, InfraError> {
        Self::ensure_non_empty(rest_url, "kv rest url")?;
        let token = token.into();
        Self::ensure_non_empty(&token, "kv rest token")?;

        let endpoint = Url::parse(rest_url.trim())
            .map_err(|error| InfraError::InvalidConfig(format!("invalid kv rest url '{rest_url}': {error}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(InfraError::InvalidConfig(format!(
                "kv rest url must be http(s): {rest_url}"
            )));
        }

        Ok(Self {
            client: Client::new(),
            endpoint,
            token: token.trim().to_string(),
        })
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::InvalidConfig(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn remote_http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("kv store error: http {}", status.as_u16())
        } else {
            format!("kv store error: http {}; body={body}", status.as_u16())
        };
        InfraError::Remote(message)
    }

    async fn command(&self, command: &[&str]) -> Result<serde_json::Value, InfraError> {
        let name = command.first().copied().unwrap_or_default();
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.token)
            .json(command)
            .send()
            .await
            .map_err(|error| InfraError::Remote(format!("network error during {name}: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Remote(format!("failed reading {name} response: {error}")))?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(InfraError::Remote(format!("kv store rejected credentials during {name}")));
        }
        if !status.is_success() {
            return Err(Self::remote_http_error(status, &body));
        }

        let parsed: CommandResponse = serde_json::from_str(&body).map_err(|error| {
            InfraError::Remote(format!("invalid {name} payload: {error}; body={body}"))
        })?;
        if let Some(error) = parsed.error {
            return Err(InfraError::Remote(format!("kv store rejected {name}: {error}")));
        }
        Ok(parsed.result)
    }
}

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: serde_json::Value,
    error: Option<String>,
}

#[async_trait]
impl KvClient for UpstashKvClient {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        Self::ensure_non_empty(key, "key")?;
        match self.command(&["GET", key]).await? {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::String(value) => Ok(Some(value)),
            other => Err(InfraError::Remote(format!(
                "unexpected GET result for {key}: {other}"
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        Self::ensure_non_empty(key, "key")?;
        self.command(&["SET", key, value]).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryKvClient {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryKvClient {
    pub fn insert(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|error| InfraError::Remote(format!("kv lock poisoned: {error}")))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl KvClient for InMemoryKvClient {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let entries = self
            .entries
            .lock()
            .map_err(|error| InfraError::Remote(format!("kv lock poisoned: {error}")))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        self.insert(key, value)
    }
}
