//! Store connection, established once and reused for the process lifetime.
//!
//! Credentials are resolved in order:
//!   1. `{data_dir}/credentials.json` (local development)
//!   2. the `RANCHO_STORE_DATABASE` environment variable (deployed secrets)
//!
//! A failed resolution is remembered too: later interactions short-circuit
//! to "not connected" instead of retrying.

use crate::{
    error::{FailureClass, RanchoError, RanchoResult},
    notice::Notices,
    store::{SheetStore, TabularStore},
};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::path::Path;
use uuid::Uuid;

pub const CREDENTIALS_FILE: &str = "credentials.json";
pub const CREDENTIALS_ENV: &str = "RANCHO_STORE_DATABASE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreCredentials {
    /// SQLite database path; relative paths resolve against the data dir.
    pub database: String,
}

/// An authenticated store plus a stable identity used in cache keys.
pub struct StoreHandle {
    pub id: Uuid,
    store:  Box<dyn TabularStore>,
}

impl StoreHandle {
    pub fn new(store: Box<dyn TabularStore>) -> Self {
        Self { id: Uuid::new_v4(), store }
    }

    pub fn store(&self) -> &dyn TabularStore {
        self.store.as_ref()
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle").field("id", &self.id).finish()
    }
}

pub struct Connector {
    data_dir: String,
    handle:   OnceCell<Result<StoreHandle, String>>,
}

impl Connector {
    pub fn new(data_dir: &str) -> Self {
        Self { data_dir: data_dir.to_string(), handle: OnceCell::new() }
    }

    /// A connector already holding `store`. Used by tests and fixtures.
    pub fn with_store(store: Box<dyn TabularStore>) -> Self {
        let handle = OnceCell::new();
        let _ = handle.set(Ok(StoreHandle::new(store)));
        Self { data_dir: String::new(), handle }
    }

    /// The shared handle, connecting on first use. Every call that finds no
    /// handle pushes a connectivity error.
    pub fn handle(&self, notices: &mut Notices) -> Option<&StoreHandle> {
        let resolved = self.handle.get_or_init(|| {
            self.connect().map_err(|e| {
                log::error!("store authentication failed: {e}");
                e.to_string()
            })
        });
        match resolved {
            Ok(handle) => Some(handle),
            Err(reason) => {
                notices.error(
                    FailureClass::Connectivity,
                    format!("Connection to the spreadsheet store failed: {reason}"),
                );
                None
            }
        }
    }

    fn connect(&self) -> RanchoResult<StoreHandle> {
        let credentials = self.resolve_credentials()?;
        let path = self.resolve_path(&credentials.database);
        let store = SheetStore::open(&path)?;
        store.migrate()?;
        log::info!("connected to spreadsheet store at {path}");
        Ok(StoreHandle::new(Box::new(store)))
    }

    fn resolve_credentials(&self) -> RanchoResult<StoreCredentials> {
        let file = Path::new(&self.data_dir).join(CREDENTIALS_FILE);
        if file.exists() {
            let content = std::fs::read_to_string(&file)?;
            return Ok(serde_json::from_str(&content)?);
        }
        match std::env::var(CREDENTIALS_ENV) {
            Ok(database) if !database.trim().is_empty() => Ok(StoreCredentials { database }),
            _ => Err(RanchoError::Credentials(format!(
                "no credentials found; add {} to the data directory or set {CREDENTIALS_ENV}",
                CREDENTIALS_FILE
            ))),
        }
    }

    fn resolve_path(&self, database: &str) -> String {
        let path = Path::new(database);
        if path.is_absolute() || database.starts_with("file:") || self.data_dir.is_empty() {
            database.to_string()
        } else {
            Path::new(&self.data_dir).join(path).to_string_lossy().into_owned()
        }
    }
}
