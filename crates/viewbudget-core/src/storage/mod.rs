mod config;
pub mod database;
pub mod ledger;

pub use config::{Config, EngineConfig, LimitsConfig, ResetConfig, SitesConfig, UiConfig};
pub use database::{Database, OriginStore};
pub use ledger::{day_key, Ledger, ResetBoundary};

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::Result;

/// Origin-scoped string key/value storage, the shape of a page's local storage.
///
/// Stores are shared by every tab on the same origin without any locking;
/// concurrent writers race and the last write wins.
pub trait KvStore {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: KvStore + ?Sized> KvStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// In-process store. Cheap to create; used for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, bypassing any encoding.
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Returns the data directory, creating it if needed.
///
/// `VIEWBUDGET_HOME` overrides the location outright. Otherwise this is
/// `~/.config/viewbudget[-dev]/`, with `VIEWBUDGET_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("VIEWBUDGET_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("VIEWBUDGET_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("viewbudget-dev")
            } else {
                base_dir.join("viewbudget")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
