//! In-memory [`Db`] backed by a concurrent map.
//!
//! Locks are taken in the order `mode` → `pending` → row shard. A buffered
//! write is visible in `pending` until the flush that moves it into `rows`
//! has finished.

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::db::{CachingMode, Db, DbResult};

#[derive(Debug, Clone)]
enum PendingWrite {
    Set { table: String, key: String, value: Value },
    Delete { table: String, key: String },
}

impl PendingWrite {
    fn targets(&self, t: &str, k: &str) -> bool {
        match self {
            PendingWrite::Set { table, key, .. } | PendingWrite::Delete { table, key } => {
                table == t && key == k
            }
        }
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryDb {
    rows: DashMap<(String, String), Value>,
    pending: Mutex<Vec<PendingWrite>>,
    mode: Mutex<CachingMode>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed rows across all tables.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of writes waiting for a flush.
    pub fn pending_writes(&self) -> usize {
        self.pending.lock().len()
    }

    fn apply(&self, write: PendingWrite) {
        match write {
            PendingWrite::Set { table, key, value } => {
                self.rows.insert((table, key), value);
            }
            PendingWrite::Delete { table, key } => {
                self.rows.remove(&(table, key));
            }
        }
    }

    fn write(&self, write: PendingWrite) {
        let mode = self.mode.lock();
        if *mode == CachingMode::Buffered {
            self.pending.lock().push(write);
        } else {
            self.apply(write);
        }
    }
}

impl Db for MemoryDb {
    fn set_value(&self, table: &str, key: &str, value: Value) -> DbResult<()> {
        self.write(PendingWrite::Set {
            table: table.to_string(),
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    fn get_value(&self, table: &str, key: &str) -> DbResult<Option<Value>> {
        let pending = self.pending.lock();
        if let Some(write) = pending.iter().rev().find(|w| w.targets(table, key)) {
            return Ok(match write {
                PendingWrite::Set { value, .. } => Some(value.clone()),
                PendingWrite::Delete { .. } => None,
            });
        }

        Ok(self
            .rows
            .get(&(table.to_string(), key.to_string()))
            .map(|r| r.value().clone()))
    }

    fn delete_value(&self, table: &str, key: &str) -> DbResult<()> {
        self.write(PendingWrite::Delete {
            table: table.to_string(),
            key: key.to_string(),
        });
        Ok(())
    }

    fn set_caching_mode(&self, mode: CachingMode) -> DbResult<()> {
        let mut current = self.mode.lock();
        let previous = std::mem::replace(&mut *current, mode);
        if previous == CachingMode::Buffered && mode == CachingMode::Immediate {
            let flushed = self.flush_write_cache()?;
            tracing::debug!(flushed, "Write cache flushed on mode change");
        }
        Ok(())
    }

    fn caching_mode(&self) -> CachingMode {
        *self.mode.lock()
    }

    fn flush_write_cache(&self) -> DbResult<usize> {
        let mut pending = self.pending.lock();
        let count = pending.len();
        for write in pending.drain(..) {
            self.apply(write);
        }
        Ok(count)
    }
}
