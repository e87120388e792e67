use std::sync::{Mutex, PoisonError};

/// Client-side router as seen by non-UI code.
pub trait Navigator: Send + Sync + 'static {
    /// Path of the current location, e.g. `/templates`.
    fn current_path(&self) -> String;
    /// Navigate to `path`, replacing the current history entry.
    fn replace(&self, path: &str);
    /// Navigate to `path`, pushing a history entry.
    fn push(&self, path: &str);
    /// Go back one history entry, if there is one.
    fn back(&self);
}

/// History stack kept in memory.
#[derive(Debug)]
pub struct MemoryNavigator {
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(vec![start.into()]),
        }
    }

    pub fn history(&self) -> Vec<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.lock().last().cloned().unwrap_or_else(|| "/".to_owned())
    }

    fn replace(&self, path: &str) {
        let mut history = self.lock();
        history.pop();
        history.push(path.to_owned());
        tracing::debug!(path, "navigate (replace)");
    }

    fn push(&self, path: &str) {
        self.lock().push(path.to_owned());
        tracing::debug!(path, "navigate");
    }

    fn back(&self) {
        let mut history = self.lock();
        if history.len() > 1 {
            history.pop();
        }
    }
}
