use crate::infrastructure::error::InfraError;
use std::sync::Mutex;

pub const KV_TOKEN_SERVICE: &str = "daygrid.kv";

/// Holds the remote store's REST token when it is not provided through the
/// environment.
pub trait SecretStore: Send + Sync {
    fn save_secret(&self, secret: &str) -> Result<(), InfraError>;
    fn load_secret(&self) -> Result<Option<String>, InfraError>;
    fn delete_secret(&self) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct KeyringSecretStore {
    service_name: String,
    account_name: String,
}

impl KeyringSecretStore {
    pub fn new(service_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account_name: account_name.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, InfraError> {
        keyring::Entry::new(&self.service_name, &self.account_name)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new(KV_TOKEN_SERVICE, "default")
    }
}

impl SecretStore for KeyringSecretStore {
    fn save_secret(&self, secret: &str) -> Result<(), InfraError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(InfraError::Credential("secret must not be empty".to_string()));
        }
        self.entry()?
            .set_password(secret)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }

    fn load_secret(&self) -> Result<Option<String>, InfraError> {
        match self.entry()?.get_password() {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => Ok(Some(value.trim().to_string())),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(InfraError::Credential(error.to_string())),
        }
    }

    fn delete_secret(&self) -> Result<(), InfraError> {
        match self.entry()?.delete_credential() {
            Ok(_) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(InfraError::Credential(error.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secret: Mutex<Option<String>>,
}

impl SecretStore for InMemorySecretStore {
    fn save_secret(&self, secret: &str) -> Result<(), InfraError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(InfraError::Credential("secret must not be empty".to_string()));
        }
        let mut guard = self
            .secret
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = Some(secret.to_string());
        Ok(())
    }

    fn load_secret(&self) -> Result<Option<String>, InfraError> {
        let guard = self
            .secret
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        Ok(guard.clone())
    }

    fn delete_secret(&self) -> Result<(), InfraError> {
        let mut guard = self
            .secret
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = None;
        Ok(())
    }
}
