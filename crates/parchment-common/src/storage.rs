//! Key-value storage standing in for the browser's local and session
//! storage, plus the token helpers built on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use smol_str::SmolStr;

/// Key under which the bearer token is stored.
pub const TOKEN_KEY: &str = "token";
/// Key of the persisted authentication flag (`"true"`/`"false"`).
pub const AUTH_FLAG_KEY: &str = "isAuthenticated";

/// A string key-value store.
pub trait Storage: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// Process-local [`Storage`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<SmolStr, String>>,
}

impl MemoryStorage {
    pub fn with(items: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        let items = items
            .into_iter()
            .map(|(k, v)| (SmolStr::new_static(k), v.to_owned()))
            .collect();
        Self {
            items: Mutex::new(items),
        }
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(SmolStr::new(key), value);
    }

    fn remove(&self, key: &str) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
    }
}

/// Local + session storage pair. Tokens are read from local storage and
/// cleared from both.
#[derive(Clone)]
pub struct SessionStore {
    pub local: Arc<dyn Storage>,
    pub session: Arc<dyn Storage>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStorage::default()), Arc::new(MemoryStorage::default()))
    }
}

impl SessionStore {
    pub fn new(local: Arc<dyn Storage>, session: Arc<dyn Storage>) -> Self {
        Self { local, session }
    }

    /// Stored bearer token, if any and non-empty.
    pub fn token(&self) -> Option<String> {
        self.local.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.local.set(TOKEN_KEY, token.into());
    }

    pub fn clear_tokens(&self) {
        self.local.remove(TOKEN_KEY);
        self.session.remove(TOKEN_KEY);
        tracing::debug!("cleared stored tokens");
    }

    /// The persisted authentication flag. Anything but `"true"` is false.
    pub fn is_authenticated(&self) -> bool {
        self.local.get(AUTH_FLAG_KEY).as_deref() == Some("true")
    }
}
