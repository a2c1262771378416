//! Ordered key-value storage interface, in-memory backend, and a
//! write-buffering overlay.
//!
//! [`KvStore`] is the single shared mutable resource of the engine. Keys are
//! byte strings compared lexicographically; [`KvStore::range`] yields entries
//! lazily in ascending key order so callers can stop early.
//!
//! [`CacheKv`] buffers every write over a parent store. [`CacheKv::commit`]
//! hands the buffered writes to the parent as one batch; dropping the cache
//! discards them. [`atomically`] wraps one accounting step this way so a
//! failure leaves the parent untouched.

use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::ops::Bound;

use crate::error::StoreError;

pub type KvPair = (Vec<u8>, Vec<u8>);

/// Lazy ascending iterator over stored entries.
pub type KvIter<'a> = Box<dyn Iterator<Item = Result<KvPair, StoreError>> + 'a>;

/// A single mutation in a write batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// Ordered byte-keyed storage.
///
/// Not thread-safe; one accounting step owns the store at a time.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// Entries with `start <= key < end` in ascending order. `None` leaves
    /// the range open above.
    fn range<'a>(&'a self, start: &[u8], end: Option<&[u8]>) -> KvIter<'a>;

    /// Apply a batch of mutations in order.
    ///
    /// Default implementation applies them one by one; persistent backends
    /// override it to make the batch atomic.
    fn write_batch(&mut self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        for op in ops {
            match op {
                BatchOp::Put(key, value) => self.put(&key, &value)?,
                BatchOp::Delete(key) => self.delete(&key)?,
            }
        }
        Ok(())
    }

    /// All entries whose key starts with `prefix`, ascending.
    fn prefix<'a>(&'a self, prefix: &[u8]) -> KvIter<'a> {
        match prefix_end(prefix) {
            Some(end) => self.range(prefix, Some(&end)),
            None => self.range(prefix, None),
        }
    }
}

/// Smallest key greater than every key starting with `prefix`.
///
/// Returns `None` when no such key exists (empty or all-`0xFF` prefix).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// In-memory store for tests and ephemeral engines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryKv {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn bounds<'k>(start: &'k [u8], end: Option<&'k [u8]>) -> (Bound<&'k [u8]>, Bound<&'k [u8]>) {
    (
        Bound::Included(start),
        end.map_or(Bound::Unbounded, Bound::Excluded),
    )
}

impl KvStore for MemoryKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn range<'a>(&'a self, start: &[u8], end: Option<&[u8]>) -> KvIter<'a> {
        if end.is_some_and(|e| e <= start) {
            return Box::new(std::iter::empty());
        }
        Box::new(
            self.entries
                .range::<[u8], _>(bounds(start, end))
                .map(|(k, v)| Ok((k.clone(), v.clone()))),
        )
    }
}

/// Write-buffering overlay over a parent store.
pub struct CacheKv<'p> {
    parent: &'p mut dyn KvStore,
    /// `None` marks a pending delete.
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'p> CacheKv<'p> {
    pub fn new(parent: &'p mut dyn KvStore) -> Self {
        Self {
            parent,
            pending: BTreeMap::new(),
        }
    }

    /// Number of buffered mutations.
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Flush buffered writes to the parent as one batch.
    pub fn commit(self) -> Result<(), StoreError> {
        let ops = self
            .pending
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOp::Put(key, value),
                None => BatchOp::Delete(key),
            })
            .collect();
        self.parent.write_batch(ops)
    }
}

impl KvStore for CacheKv<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self.pending.get(key) {
            Some(value) => Ok(value.clone()),
            None => self.parent.get(key),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.pending.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.pending.insert(key.to_vec(), None);
        Ok(())
    }

    fn range<'a>(&'a self, start: &[u8], end: Option<&[u8]>) -> KvIter<'a> {
        if end.is_some_and(|e| e <= start) {
            return Box::new(std::iter::empty());
        }
        Box::new(MergeIter {
            parent: self.parent.range(start, end).peekable(),
            pending: self.pending.range::<[u8], _>(bounds(start, end)).peekable(),
        })
    }
}

/// Merges the parent's entries with buffered writes, buffered side winning.
struct MergeIter<'a> {
    parent: Peekable<KvIter<'a>>,
    pending: Peekable<btree_map::Range<'a, Vec<u8>, Option<Vec<u8>>>>,
}

enum Step {
    Done,
    Parent,
    Pending,
    Both,
}

impl MergeIter<'_> {
    /// Next buffered entry, or `None` for a pending delete.
    fn take_pending(&mut self) -> Option<KvPair> {
        let (key, value) = self.pending.next()?;
        value.as_ref().map(|v| (key.clone(), v.clone()))
    }
}

impl Iterator for MergeIter<'_> {
    type Item = Result<KvPair, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = match (self.parent.peek(), self.pending.peek()) {
                (None, None) => Step::Done,
                (Some(Err(_)), _) => Step::Parent,
                (Some(Ok(_)), None) => Step::Parent,
                (None, Some(_)) => Step::Pending,
                (Some(Ok((parent_key, _))), Some((pending_key, _))) => {
                    match parent_key.as_slice().cmp(pending_key.as_slice()) {
                        Ordering::Less => Step::Parent,
                        Ordering::Greater => Step::Pending,
                        Ordering::Equal => Step::Both,
                    }
                }
            };

            match step {
                Step::Done => return None,
                Step::Parent => return self.parent.next(),
                Step::Both => {
                    self.parent.next();
                    if let Some(entry) = self.take_pending() {
                        return Some(Ok(entry));
                    }
                }
                Step::Pending => {
                    if let Some(entry) = self.take_pending() {
                        return Some(Ok(entry));
                    }
                }
            }
        }
    }
}

/// Run `f` against a [`CacheKv`] over `store`, committing only on success.
pub fn atomically<T, E>(
    store: &mut dyn KvStore,
    f: impl FnOnce(&mut dyn KvStore) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<StoreError>,
{
    let mut cache = CacheKv::new(store);
    let out = f(&mut cache)?;
    cache.commit()?;
    Ok(out)
}
