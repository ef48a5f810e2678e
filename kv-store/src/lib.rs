pub mod prefix;

use anyhow::Result;
use node_logger::info;
use node_metrics::OpMetrics;
use once_cell::sync::Lazy;
use rocksdb::{IteratorMode, Options, DB};
use std::path::Path;
use std::time::Instant;

static OP_COUNTERS: Lazy<OpMetrics> = Lazy::new(|| OpMetrics::new_and_registered("kv_store"));

pub struct KvStore {
    db: DB,
}

impl KvStore {
    /// Opens (creating if absent) an ordered key-value store at
    /// `path`. `read_only` mirrors the source codebase's own read-only
    /// open mode, used by inspection tools that must not write.
    pub fn open<P: AsRef<Path>>(path: P, read_only: bool) -> Result<Self> {
        let start = Instant::now();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = if read_only {
            DB::open_for_read_only(&opts, path.as_ref(), false)?
        } else {
            DB::open(&opts, path.as_ref())?
        };
        info!(
            path = %path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "opened kv-store",
        );
        Ok(Self { db })
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        OP_COUNTERS.counter("reads").inc();
        Ok(self.db.get(key)?)
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        OP_COUNTERS.counter("writes").inc();
        Ok(self.db.put(key, value)?)
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        OP_COUNTERS.counter("deletes").inc();
        Ok(self.db.delete(key)?)
    }

    /// Iterates all keys sharing `prefix`, in lexicographic order.
    pub fn iter_prefix<'a>(&'a self, prefix: &'a [u8]) -> impl Iterator<Item = (Box<[u8]>, Box<[u8]>)> + 'a {
        self.db
            .iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward))
            .filter_map(|item| item.ok())
            .take_while(move |(k, _)| k.starts_with(prefix))
    }

    pub fn batch(&self) -> WriteBatch {
        WriteBatch(rocksdb::WriteBatch::default())
    }

    /// Commits `batch` atomically: either every put/delete in it lands
    /// or none do.
    pub fn commit(&self, batch: WriteBatch) -> Result<()> {
        OP_COUNTERS.counter("batch_commits").inc();
        self.db.write(batch.0)?;
        Ok(())
    }
}

pub struct WriteBatch(rocksdb::WriteBatch);

impl WriteBatch {
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.0.put(key, value);
    }

    pub fn delete(&mut self, key: &[u8]) {
        self.0.delete(key);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, KvStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path(), false).unwrap();
        (dir, store)
    }

    #[test]
    fn put_then_get_round_trips() {
        let (_dir, store) = open_temp();
        store.put(b"k1", b"v1").unwrap();
        assert_eq!(store.get(b"k1").unwrap(), Some(b"v1".to_vec()));
    }

    #[test]
    fn delete_removes_key() {
        let (_dir, store) = open_temp();
        store.put(b"k1", b"v1").unwrap();
        store.delete(b"k1").unwrap();
        assert_eq!(store.get(b"k1").unwrap(), None);
    }

    #[test]
    fn batch_commit_is_all_or_nothing_on_success() {
        let (_dir, store) = open_temp();
        let mut batch = store.batch();
        batch.put(b"a", b"1");
        batch.put(b"b", b"2");
        store.commit(batch).unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn iter_prefix_is_ordered_and_scoped() {
        let (_dir, store) = open_temp();
        store.put(&[0x06, 1], b"a").unwrap();
        store.put(&[0x06, 2], b"b").unwrap();
        store.put(&[0x07, 1], b"c").unwrap();
        let got: Vec<_> = store.iter_prefix(&[0x06]).map(|(k, v)| (k.to_vec(), v.to_vec())).collect();
        assert_eq!(got, vec![(vec![0x06, 1], b"a".to_vec()), (vec![0x06, 2], b"b".to_vec())]);
    }
}
