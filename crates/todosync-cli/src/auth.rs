//! GitHub token storage in the system keychain.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
#[cfg(not(test))]
use keyring::Entry;
use todosync_core::auth::{TokenProvider, TOKEN_ENV_VAR};
use todosync_core::util::non_blank;

use crate::error::CliError;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "todosync-cli";
const KEYRING_USERNAME: &str = "github_token";

/// Where the active token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    Keychain,
}

#[derive(Clone)]
pub struct TokenStore {
    username: String,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(KEYRING_USERNAME)
    }
}

impl TokenStore {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> Result<Entry, CliError> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| CliError::Auth(error.to_string()))
    }

    #[cfg(not(test))]
    pub fn load(&self) -> Result<Option<String>, CliError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(non_blank(Some(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(CliError::Auth(error.to_string())),
        }
    }

    #[cfg(test)]
    pub fn load(&self) -> Result<Option<String>, CliError> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::Auth(error.to_string()))?;
        Ok(non_blank(guard.get(&self.username).cloned()))
    }

    #[cfg(not(test))]
    pub fn save(&self, token: &str) -> Result<(), CliError> {
        self.entry()?
            .set_password(token)
            .map_err(|error| CliError::Auth(error.to_string()))
    }

    #[cfg(test)]
    pub fn save(&self, token: &str) -> Result<(), CliError> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::Auth(error.to_string()))?;
        guard.insert(self.username.clone(), token.to_string());
        Ok(())
    }

    #[cfg(not(test))]
    pub fn clear(&self) -> Result<(), CliError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(CliError::Auth(error.to_string())),
        }
    }

    #[cfg(test)]
    pub fn clear(&self) -> Result<(), CliError> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::Auth(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

/// Token from `TODOSYNC_GITHUB_TOKEN`, falling back to the keychain.
#[derive(Clone, Default)]
pub struct KeychainTokenProvider {
    store: TokenStore,
}

impl KeychainTokenProvider {
    pub const fn new(store: TokenStore) -> Self {
        Self { store }
    }

    pub fn resolve(&self) -> Result<Option<(String, TokenSource)>, CliError> {
        if let Some(token) = non_blank(std::env::var(TOKEN_ENV_VAR).ok()) {
            return Ok(Some((token, TokenSource::Environment)));
        }
        Ok(self
            .store
            .load()?
            .map(|token| (token, TokenSource::Keychain)))
    }
}

#[async_trait]
impl TokenProvider for KeychainTokenProvider {
    async fn token(&self) -> Option<String> {
        match self.resolve() {
            Ok(resolved) => resolved.map(|(token, _)| token),
            Err(error) => {
                tracing::warn!("Failed to read GitHub token: {}", error);
                None
            }
        }
    }
}

/// Mask all but the last four characters of a token.
pub fn redact_token(token: &str) -> String {
    let visible: String = token
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if token.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("****{visible}")
    }
}
