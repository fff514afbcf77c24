//! Visitor identity persistence
//!
//! The widget identifies an anonymous visitor by a generated display
//! name and an opaque customer id handed out by the backend. The pair
//! is written once per browser profile and read back on every start;
//! business logic receives it as an explicit value, never through
//! ambient lookups.

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Storage key for the visitor's backend customer id
pub const CUSTOMER_ID_KEY: &str = "supportline-customer-id";
/// Storage key for the visitor's generated display name
pub const CUSTOMER_NAME_KEY: &str = "supportline-customer-name";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("identity storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A visitor identity, immutable after creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub customer_id: String,
    pub display_name: String,
}

/// Key-value persistence surface for the visitor identity
pub trait IdentityStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Load the persisted identity, if both keys are present
pub fn load_identity(store: &impl IdentityStore) -> StoreResult<Option<Identity>> {
    let customer_id = store.get(CUSTOMER_ID_KEY)?;
    let display_name = store.get(CUSTOMER_NAME_KEY)?;
    match (customer_id, display_name) {
        (Some(customer_id), Some(display_name)) => Ok(Some(Identity {
            customer_id,
            display_name,
        })),
        _ => Ok(None),
    }
}

/// Persist an identity; called exactly once, after customer creation succeeds
pub fn save_identity(store: &impl IdentityStore, identity: &Identity) -> StoreResult<()> {
    store.set(CUSTOMER_ID_KEY, &identity.customer_id)?;
    store.set(CUSTOMER_NAME_KEY, &identity.display_name)?;
    Ok(())
}

/// Explicit reset; not part of the normal widget flow
pub fn reset_identity(store: &impl IdentityStore) -> StoreResult<()> {
    store.remove(CUSTOMER_ID_KEY)?;
    store.remove(CUSTOMER_NAME_KEY)?;
    Ok(())
}

/// Sqlite-backed identity store
#[derive(Clone)]
pub struct SqliteIdentityStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteIdentityStore {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS identity_kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )?;
        Ok(())
    }
}

impl IdentityStore for SqliteIdentityStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT value FROM identity_kv WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO identity_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM identity_kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}
