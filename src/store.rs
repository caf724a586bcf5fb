//! Transactional access to the sled keyspace
//!
//! Every mutation runs inside [`Store::transact`]: the write gate is held for
//! the whole read-check-write sequence, writes are staged into a [`Batch`],
//! and the batch is applied atomically only when the closure returns `Ok`.
//! An `Err` drops the batch, so a failed operation leaves nothing behind.
use crate::error::{LedgerError, Result};
use parking_lot::Mutex;
use sled::{Batch, Db, IVec};
use std::collections::HashMap;
use std::sync::Arc;

pub struct Store {
    instance: Arc<Db>,
    write_gate: Mutex<()>,
    sync_commits: bool,
}

/// Read access to committed state.
#[derive(Clone, Copy)]
pub struct Reader<'a> {
    db: &'a Db,
}

/// A write transaction. Reads see committed state plus this transaction's
/// own staged inserts and removals for key-existence checks.
pub struct Txn<'a> {
    reader: Reader<'a>,
    batch: Batch,
    // true = staged insert, false = staged removal
    pending: HashMap<Vec<u8>, bool>,
}

impl Store {
    pub fn new(instance: Arc<Db>) -> Self {
        Self {
            instance,
            write_gate: Mutex::new(()),
            sync_commits: true,
        }
    }

    /// Flush to disk after every committed batch (on by default).
    ///
    /// The batch is already applied when the flush runs, so a failed flush
    /// is logged and the transaction still reports success. sled flushes in
    /// the background on its own schedule, and the final flush at shutdown
    /// picks up whatever is left.
    pub fn sync_commits(mut self, enabled: bool) -> Self {
        self.sync_commits = enabled;
        self
    }

    pub fn reader(&self) -> Reader<'_> {
        Reader { db: &self.instance }
    }

    /// Run `op` as one serialized write transaction.
    pub fn transact<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Txn<'_>) -> Result<T>,
    {
        let _gate = self.write_gate.lock();

        let mut txn = Txn {
            reader: self.reader(),
            batch: Batch::default(),
            pending: HashMap::new(),
        };
        let out = op(&mut txn)?;

        let staged = txn.pending.len();
        self.instance.apply_batch(txn.batch)?;
        if self.sync_commits {
            if let Err(err) = self.instance.flush() {
                tracing::warn!(error = %err, "flush after commit failed");
            }
        }
        tracing::trace!(staged, "transaction committed");

        Ok(out)
    }
}

impl<'a> Reader<'a> {
    pub fn get<T>(&self, key: &[u8]) -> Result<Option<T>>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        match self.db.get(key)? {
            Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.db.contains_key(key)?)
    }

    /// All records under `prefix`, in key order.
    pub fn scan<T>(&self, prefix: &[u8]) -> Result<Vec<T>>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        let mut records = Vec::new();
        for entry in self.db.scan_prefix(prefix) {
            let (_, bytes) = entry?;
            records.push(minicbor::decode(&bytes)?);
        }
        Ok(records)
    }

    pub fn scan_keys(&self, prefix: &[u8]) -> Result<Vec<IVec>> {
        let mut keys = Vec::new();
        for entry in self.db.scan_prefix(prefix) {
            let (key, _) = entry?;
            keys.push(key);
        }
        Ok(keys)
    }

    /// The greatest key under `prefix`.
    pub fn last_key(&self, prefix: &[u8]) -> Result<Option<IVec>> {
        match self.db.scan_prefix(prefix).next_back() {
            Some(entry) => Ok(Some(entry?.0)),
            None => Ok(None),
        }
    }
}

impl<'a> Txn<'a> {
    pub fn reader(&self) -> Reader<'a> {
        self.reader
    }

    /// Key existence, including what this transaction has staged.
    pub fn contains(&self, key: &[u8]) -> Result<bool> {
        match self.pending.get(key) {
            Some(staged) => Ok(*staged),
            None => self.reader.contains(key),
        }
    }

    /// Insert a row whose key must not exist yet.
    pub fn insert_unique<T>(&mut self, key: Vec<u8>, value: &T, what: &str) -> Result<()>
    where
        T: minicbor::Encode<()>,
    {
        let bytes = encode(value)?;
        self.insert_unique_raw(key, bytes, what)
    }

    pub fn insert_unique_raw(&mut self, key: Vec<u8>, bytes: Vec<u8>, what: &str) -> Result<()> {
        if self.contains(&key)? {
            return Err(LedgerError::Conflict(format!("{what} already exists")));
        }
        self.stage_insert(key, bytes);
        Ok(())
    }

    /// Overwrite a row.
    pub fn put<T>(&mut self, key: Vec<u8>, value: &T) -> Result<()>
    where
        T: minicbor::Encode<()>,
    {
        let bytes = encode(value)?;
        self.stage_insert(key, bytes);
        Ok(())
    }

    pub fn remove(&mut self, key: &[u8]) {
        self.batch.remove(key);
        self.pending.insert(key.to_vec(), false);
    }

    fn stage_insert(&mut self, key: Vec<u8>, bytes: Vec<u8>) {
        self.batch.insert(key.as_slice(), bytes);
        self.pending.insert(key, true);
    }
}

fn encode<T>(value: &T) -> Result<Vec<u8>>
where
    T: minicbor::Encode<()>,
{
    minicbor::to_vec(value).map_err(|err| LedgerError::Codec(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Policy;
    use tempfile::tempdir;

    fn open_store() -> (tempfile::TempDir, Store) {
        let temp_dir = tempdir().unwrap();
        let db = sled::open(temp_dir.path().join("store.db")).unwrap();
        (temp_dir, Store::new(Arc::new(db)).sync_commits(false))
    }

    fn policy(policy_id: u32) -> Policy {
        Policy {
            policy_id,
            policyholder_id: 1,
            coverage: 10.0,
            status: "active".into(),
        }
    }

    #[test]
    fn failed_transaction_leaves_no_rows() {
        let (_dir, store) = open_store();

        let res: Result<()> = store.transact(|txn| {
            txn.put(b"p-one".to_vec(), &policy(1))?;
            Err(LedgerError::Conflict("abort".into()))
        });

        assert!(res.is_err());
        assert!(!store.reader().contains(b"p-one").unwrap());
    }

    #[test]
    fn unique_insert_sees_staged_rows() {
        let (_dir, store) = open_store();

        let res = store.transact(|txn| {
            txn.insert_unique(b"k".to_vec(), &policy(1), "Policy")?;
            txn.insert_unique(b"k".to_vec(), &policy(2), "Policy")
        });

        assert!(matches!(res, Err(LedgerError::Conflict(_))));
        assert!(!store.reader().contains(b"k").unwrap());
    }

    #[test]
    fn staged_removal_frees_the_key() {
        let (_dir, store) = open_store();
        store
            .transact(|txn| txn.put(b"k".to_vec(), &policy(1)))
            .unwrap();

        store
            .transact(|txn| {
                txn.remove(b"k");
                txn.insert_unique(b"k".to_vec(), &policy(2), "Policy")
            })
            .unwrap();

        let stored: Policy = store.reader().get(b"k").unwrap().unwrap();
        assert_eq!(stored.policy_id, 2);
    }

    #[test]
    fn synced_commit_is_readable() {
        let temp_dir = tempdir().unwrap();
        let db = sled::open(temp_dir.path().join("synced.db")).unwrap();
        let store = Store::new(Arc::new(db));

        store
            .transact(|txn| txn.insert_unique(b"k".to_vec(), &policy(3), "Policy"))
            .unwrap();

        let stored: Policy = store.reader().get(b"k").unwrap().unwrap();
        assert_eq!(stored.policy_id, 3);
    }

    #[test]
    fn last_key_is_greatest_under_prefix() {
        let (_dir, store) = open_store();
        store
            .transact(|txn| {
                txn.put(b"a\x01".to_vec(), &policy(1))?;
                txn.put(b"a\x09".to_vec(), &policy(9))?;
                txn.put(b"b\x0f".to_vec(), &policy(15))
            })
            .unwrap();

        let last = store.reader().last_key(b"a").unwrap().unwrap();
        assert_eq!(last.as_ref(), b"a\x09");
        assert!(store.reader().last_key(b"z").unwrap().is_none());
    }
}
