use node_crypto::HashValue;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum WriteOp {
    Value(Vec<u8>),
    Deletion,
}

/// A deterministic set of key/value writes produced by speculative block
/// execution. Entries are kept sorted by key so that `hash()` is a pure
/// function of content, independent of execution order.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct WriteSet {
    entries: Vec<(Vec<u8>, WriteOp)>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.push((key, WriteOp::Value(value)));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.entries.push((key, WriteOp::Deletion));
    }

    /// Sorts by key and drops earlier duplicates, keeping the last write
    /// for any key written more than once during execution.
    pub fn finalize(mut self) -> Self {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        self.entries.dedup_by(|a, b| {
            if a.0 == b.0 {
                std::mem::swap(a, b);
                true
            } else {
                false
            }
        });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Vec<u8>, WriteOp)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `H(len(key) || key || len(val) || val)` for writes and
    /// `H(len(key) || key)` for deletes, concatenated in sorted key order
    /// and hashed once. Assumes `self` is already sorted via `finalize`.
    pub fn hash(&self) -> HashValue {
        let mut buf = Vec::new();
        for (key, op) in &self.entries {
            buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
            buf.extend_from_slice(key);
            match op {
                WriteOp::Value(value) => {
                    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
                    buf.extend_from_slice(value);
                }
                WriteOp::Deletion => {}
            }
        }
        HashValue::sha256(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_independent_of_insertion_order() {
        let mut a = WriteSet::new();
        a.put(b"k1".to_vec(), b"v1".to_vec());
        a.put(b"k2".to_vec(), b"v2".to_vec());

        let mut b = WriteSet::new();
        b.put(b"k2".to_vec(), b"v2".to_vec());
        b.put(b"k1".to_vec(), b"v1".to_vec());

        assert_eq!(a.finalize().hash(), b.finalize().hash());
    }

    #[test]
    fn later_write_wins_on_duplicate_key() {
        let mut ws = WriteSet::new();
        ws.put(b"k".to_vec(), b"old".to_vec());
        ws.put(b"k".to_vec(), b"new".to_vec());
        let ws = ws.finalize();
        assert_eq!(ws.len(), 1);
        assert_eq!(ws.iter().next().unwrap().1, WriteOp::Value(b"new".to_vec()));
    }
}
