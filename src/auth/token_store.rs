use async_trait::async_trait;
use keyring::{Entry, Error as KeyringError};
use log::{debug, error};
use std::fmt::Debug;
use std::sync::RwLock;

use crate::constants::{ACCOUNT_NAME_FOR_KEYRING, SERVICE_NAME_FOR_KEYRING};
use crate::error::{AppError, AppResult};

/// Durable storage for the bearer token.
#[async_trait]
pub trait TokenStore: Send + Sync + Debug {
    async fn load(&self) -> AppResult<Option<String>>;
    async fn save(&self, token: &str) -> AppResult<()>;
    async fn clear(&self) -> AppResult<()>;
}

/// OS keyring backed store; the persistent counterpart of the original
/// console's browser storage.
#[derive(Debug)]
pub struct KeyringStore {
    service: String,
    account: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self {
            service: SERVICE_NAME_FOR_KEYRING.to_string(),
            account: ACCOUNT_NAME_FOR_KEYRING.to_string(),
        }
    }
}

impl KeyringStore {
    fn entry(&self) -> AppResult<Entry> {
        Entry::new(&self.service, &self.account).map_err(|e| {
            error!(
                "Failed to create keyring entry - OS: {:?}, Error: {}",
                std::env::consts::OS,
                e
            );
            AppError::StorageError(format!("Failed to create keyring entry: {}", e))
        })
    }
}

#[async_trait]
impl TokenStore for KeyringStore {
    async fn load(&self) -> AppResult<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => {
                debug!("Token retrieved from keyring");
                Ok(Some(token))
            }
            Err(KeyringError::NoEntry) => {
                debug!("No token entry found in keyring (not logged in)");
                Ok(None)
            }
            Err(e) => Err(AppError::StorageError(format!(
                "Failed to retrieve token from keyring: {}",
                e
            ))),
        }
    }

    async fn save(&self, token: &str) -> AppResult<()> {
        self.entry()?
            .set_password(token)
            .map_err(|e| AppError::StorageError(format!("Failed to store token: {}", e)))?;
        debug!("Token saved to keyring");
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(KeyringError::NoEntry) => {
                debug!("Token cleared from keyring");
                Ok(())
            }
            Err(e) => Err(AppError::StorageError(format!(
                "Failed to clear token: {}",
                e
            ))),
        }
    }
}

/// In-memory store for tests and session-only mode.
#[derive(Debug, Default)]
pub struct MemoryStore {
    token: RwLock<Option<String>>,
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn load(&self) -> AppResult<Option<String>> {
        self.token
            .read()
            .map(|guard| guard.clone())
            .map_err(|e| AppError::StorageError(format!("Failed to read session token: {}", e)))
    }

    async fn save(&self, token: &str) -> AppResult<()> {
        self.token
            .write()
            .map(|mut guard| *guard = Some(token.to_string()))
            .map_err(|e| AppError::StorageError(format!("Failed to write session token: {}", e)))
    }

    async fn clear(&self) -> AppResult<()> {
        self.token
            .write()
            .map(|mut guard| *guard = None)
            .map_err(|e| AppError::StorageError(format!("Failed to write session token: {}", e)))
    }
}
