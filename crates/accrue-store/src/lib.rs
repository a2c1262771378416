//! RocksDB-backed persistent storage for the distribution engine.
//!
//! [`RocksKv`] implements [`KvStore`] over a single RocksDB instance. Batched
//! writes go through one [`WriteBatch`], so a committed [`CacheKv`] lands
//! atomically or not at all.
//!
//! [`CacheKv`]: accrue_core::kv::CacheKv

use std::path::Path;

use rocksdb::{DB, Direction, IteratorMode, Options, WriteBatch};

use accrue_core::error::StoreError;
use accrue_core::kv::{BatchOp, KvIter, KvStore};

/// Persistent key-value store backed by RocksDB.
pub struct RocksKv {
    db: DB,
}

impl RocksKv {
    /// Open or create a database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path.as_ref()).map_err(backend)?;
        tracing::info!(path = %path.as_ref().display(), "opened distribution store");
        Ok(Self { db })
    }

    /// Flush memtables to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush().map_err(backend)
    }
}

fn backend(e: rocksdb::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl KvStore for RocksKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.db.get(key).map_err(backend)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db.put(key, value).map_err(backend)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.db.delete(key).map_err(backend)
    }

    fn range<'a>(&'a self, start: &[u8], end: Option<&[u8]>) -> KvIter<'a> {
        let end = end.map(<[u8]>::to_vec);
        let iter = self
            .db
            .iterator(IteratorMode::From(start, Direction::Forward))
            .map(|item| {
                item.map(|(k, v)| (k.into_vec(), v.into_vec()))
                    .map_err(backend)
            })
            .take_while(move |item| match (item, &end) {
                (Ok((key, _)), Some(end)) => key.as_slice() < end.as_slice(),
                _ => true,
            });
        Box::new(iter)
    }

    fn write_batch(&mut self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        let mut batch = WriteBatch::default();
        let count = ops.len();
        for op in ops {
            match op {
                BatchOp::Put(key, value) => batch.put(key, value),
                BatchOp::Delete(key) => batch.delete(key),
            }
        }
        self.db.write(batch).map_err(backend)?;
        tracing::debug!(ops = count, "committed write batch");
        Ok(())
    }
}
