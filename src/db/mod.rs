//! Database collaborator.
//!
//! # Responsibilities
//! - Key/value storage addressed by `(table, key)`
//! - Immediate or buffered write modes with an explicit flush
//! - Round-tripping typed records through [`Persistible`]
//!
//! # Design Decisions
//! - Consumers depend on `dyn Db`, never a concrete store
//! - Values are JSON so records stay schema-free at this layer
//! - Reads observe buffered writes that have not been flushed yet

pub mod memory;

use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryDb;

/// Errors from a [`Db`] implementation.
#[derive(Debug, Error)]
pub enum DbError {
    /// A stored value could not be converted to or from a record.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing store refused the operation.
    #[error("database unavailable: {0}")]
    Unavailable(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// When writes reach the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachingMode {
    /// Every write is applied as it is made.
    #[default]
    Immediate,
    /// Writes queue until [`Db::flush_write_cache`] is called.
    Buffered,
}

/// Table-scoped key/value store.
pub trait Db: Send + Sync {
    fn set_value(&self, table: &str, key: &str, value: Value) -> DbResult<()>;

    fn get_value(&self, table: &str, key: &str) -> DbResult<Option<Value>>;

    fn delete_value(&self, table: &str, key: &str) -> DbResult<()>;

    /// Switch write mode. Leaving [`CachingMode::Buffered`] flushes pending
    /// writes first.
    fn set_caching_mode(&self, mode: CachingMode) -> DbResult<()>;

    fn caching_mode(&self) -> CachingMode;

    /// Apply all pending writes, returning how many were applied.
    fn flush_write_cache(&self) -> DbResult<usize>;
}

/// A record that lives in one table of a [`Db`].
pub trait Persistible: Sized {
    /// Table the record is stored in.
    const TABLE: &'static str;

    fn key(&self) -> String;

    fn to_data(&self) -> DbResult<Value>;

    fn from_data(key: &str, data: Value) -> DbResult<Self>;

    /// Write this record under its key.
    fn persist(&self, db: &dyn Db) -> DbResult<()> {
        db.set_value(Self::TABLE, &self.key(), self.to_data()?)
    }

    /// Load the record stored under `key`, if any.
    fn create_from_data(db: &dyn Db, key: &str) -> DbResult<Option<Self>> {
        match db.get_value(Self::TABLE, key)? {
            Some(data) => Self::from_data(key, data).map(Some),
            None => Ok(None),
        }
    }
}
