//! # Table store
//!
//! Owns the backing CSV file and the lock that serialises writers.
//!
//! Every read loads a fresh snapshot from disk; there is no cache held
//! across requests. Writes run load, mutate and persist under one
//! [`tokio::sync::Mutex`] so concurrent decrements never lose updates.
//! Persisting writes a complete replacement next to the target and renames
//! it into place, so readers and crashes only ever observe whole tables.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use crate::{
    error::{CellError, NotFound, StorageError},
    table::{Decrement, ParseError, Table},
};

/// Result of [`TableStore::decrement`].
#[derive(Debug)]
pub enum DecrementOutcome {
    Applied(Decrement),
    NotFound(NotFound),
}

/// File-backed inventory table.
#[derive(Debug, Clone)]
pub struct TableStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl TableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the backing file.
    pub fn load(&self) -> Result<Table, StorageError> {
        let file = File::open(&self.path)
            .map_err(|e| StorageError::unreadable(&self.path, e))?;
        let table = Table::from_csv(BufReader::new(file)).map_err(|e| match e {
            ParseError::Unreadable(reason) => StorageError::unreadable(&self.path, reason),
            ParseError::Malformed(reason) => StorageError::malformed(&self.path, reason),
        })?;
        tracing::debug!(
            "store: loaded {} rows x {} columns from {}",
            table.len(),
            table.columns().len(),
            self.path.display()
        );
        Ok(table)
    }

    /// Replace the backing file with `table`, all or nothing.
    ///
    /// Callers that mutate must hold the write lock; [`TableStore::decrement`]
    /// does this for them.
    pub fn persist(&self, table: &Table) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)
            .map_err(|e| StorageError::unwritable(&self.path, e))?;
        // keep the existing file's mode instead of the temp file's 0600
        if let Ok(meta) = std::fs::metadata(&self.path) {
            if let Err(e) = tmp.as_file().set_permissions(meta.permissions()) {
                tracing::warn!(
                    "store: could not keep mode of {}: {}",
                    self.path.display(),
                    e
                );
            }
        }

        {
            let mut writer = BufWriter::new(tmp.as_file());
            table
                .write_csv(&mut writer)
                .map_err(|e| StorageError::unwritable(&self.path, e))?;
            writer
                .flush()
                .map_err(|e| StorageError::unwritable(&self.path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| StorageError::unwritable(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| StorageError::unwritable(&self.path, e.error))?;
        Ok(())
    }

    /// Subtract `amount` from the `(bin, sku)` cell, flooring at zero, and
    /// rewrite the file before returning.
    ///
    /// The whole load-mutate-persist sequence runs under the store's write
    /// lock. An unknown bin or SKU leaves the file untouched. So does a
    /// target cell that is not a whole quantity, which is reported as
    /// [`StorageError::Malformed`].
    pub async fn decrement(
        &self,
        bin: &str,
        sku: &str,
        amount: u64,
    ) -> Result<DecrementOutcome, StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut table = self.load()?;
        let change = match table.decrement(bin, sku, amount) {
            Ok(change) => change,
            Err(CellError::NotFound(missing)) => return Ok(DecrementOutcome::NotFound(missing)),
            Err(e @ CellError::NotAQuantity { .. }) => {
                return Err(StorageError::malformed(&self.path, e))
            }
        };
        self.persist(&table)?;

        tracing::info!(
            "store: decrement bin={} sku={} amount={} previous={} updated={}",
            bin,
            sku,
            amount,
            change.previous,
            change.updated
        );
        Ok(DecrementOutcome::Applied(change))
    }
}
