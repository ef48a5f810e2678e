mod codec;
pub mod error;
pub mod vm;

use error::StateStoreError;
use kv_store::{prefix, KvStore};
use merkle_accumulator::MerkleAccumulator;
use node_infallible::Mutex;
use node_logger::{info, warn};
use node_metrics::OpMetrics;
use node_types::bufpool::BufferPool;
use node_types::{Block, ExecuteResult, HashValue, Notification};
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;
use vm::VMExecutor;

static OP_COUNTERS: Lazy<OpMetrics> = Lazy::new(|| OpMetrics::new_and_registered("state_store"));

/// Internal-only prefixes for the accumulators' raw leaf stores. Not
/// part of the externally addressed keyspace in `kv_store::prefix`.
const BLOCK_LEAVES: u8 = 0xF0;
const STATE_LEAVES: u8 = 0xF1;

pub struct StateStore {
    kv: Arc<KvStore>,
    vm: Arc<dyn VMExecutor>,
    effective_state_hash_height: u64,
    block_acc: Mutex<MerkleAccumulator>,
    state_acc: Mutex<MerkleAccumulator>,
    buf_pool: BufferPool,
}

impl StateStore {
    pub fn open<P: AsRef<Path>>(
        path: P,
        vm: Arc<dyn VMExecutor>,
        effective_state_hash_height: u64,
    ) -> Result<Self, StateStoreError> {
        let kv = Arc::new(KvStore::open(path, false).map_err(StateStoreError::CommitFail)?);
        let current_height = Self::read_current_height(&kv).map_err(StateStoreError::CommitFail)?;
        let block_acc = Self::load_accumulator(&kv, BLOCK_LEAVES, prefix::BLOCK_MERKLE_SNAPSHOT, current_height.map(|h| h + 1))
            .map_err(StateStoreError::CommitFail)?;
        let state_acc = Self::load_accumulator(&kv, STATE_LEAVES, prefix::STATE_MERKLE_SNAPSHOT, None)
            .map_err(StateStoreError::CommitFail)?;

        if let Some(height) = current_height {
            let expected = height + 1;
            if block_acc.num_leaves() != 0 && block_acc.num_leaves() != expected {
                return Err(StateStoreError::InconsistentMerkle {
                    actual: block_acc.num_leaves(),
                    expected,
                });
            }
        }

        Ok(Self {
            kv,
            vm,
            effective_state_hash_height,
            block_acc: Mutex::new(block_acc),
            state_acc: Mutex::new(state_acc),
            buf_pool: BufferPool::new(),
        })
    }

    fn read_current_height(kv: &KvStore) -> anyhow::Result<Option<u64>> {
        match kv.get(&[prefix::CURRENT_BLOCK])? {
            Some(bytes) => Ok(Some(codec::decode_current_block(&bytes)?.1)),
            None => Ok(None),
        }
    }

    /// Loads an accumulator from its persisted snapshot and leaf store.
    /// If the leaf store is entirely missing, persistence is treated as
    /// disabled for this accumulator and an empty one is returned with
    /// a warning, rather than failing startup (§7, `InconsistentMerkle`
    /// recovery note).
    fn load_accumulator(
        kv: &KvStore,
        leaves_prefix: u8,
        snapshot_prefix: u8,
        expected_leaves: Option<u64>,
    ) -> anyhow::Result<MerkleAccumulator> {
        let leaves_bytes = kv.get(&[leaves_prefix])?;
        let snapshot_bytes = kv.get(&[snapshot_prefix])?;
        match (leaves_bytes, snapshot_bytes) {
            (Some(leaves_raw), Some(snapshot_raw)) => {
                let leaves = codec::decode_leaves(&leaves_raw)?;
                let snapshot = codec::decode_snapshot(leaves.len() as u64, &snapshot_raw)?;
                Ok(MerkleAccumulator::from_snapshot_and_leaves(&snapshot, leaves)?)
            }
            (None, None) => Ok(MerkleAccumulator::new()),
            _ => {
                warn!("accumulator leaf store and snapshot disagree on presence; starting empty, persistence effectively reset");
                let _ = expected_leaves;
                Ok(MerkleAccumulator::new())
            }
        }
    }

    /// Speculatively executes `block`; does not mutate persisted state.
    pub fn execute_block(&self, block: &Block) -> Result<ExecuteResult, StateStoreError> {
        let write_set = self
            .vm
            .execute_block(block)
            .map_err(StateStoreError::ExecFail)?;
        let write_set_hash = write_set.hash();
        let state_root = if block.height() >= self.effective_state_hash_height {
            self.state_acc.lock().root_with_new_leaf(write_set_hash)
        } else {
            HashValue::zero()
        };
        Ok(ExecuteResult {
            write_set,
            state_root,
            notifications: Vec::<Notification>::new(),
        })
    }

    /// Atomically commits `execute_result` for `block` at `height`:
    /// write-set to the KV store, block-root accumulator append, and
    /// (once at or past the activation height) state-root accumulator
    /// append plus the height-keyed state root record.
    pub fn commit(&self, height: u64, block: &Block, execute_result: &ExecuteResult) -> Result<(), StateStoreError> {
        let tx_root = block.tx_root();
        let mut batch = self.kv.batch();

        for (key, op) in execute_result.write_set.iter() {
            match op {
                node_types::WriteOp::Value(value) => batch.put(key, value),
                node_types::WriteOp::Deletion => batch.delete(key),
            }
        }

        let mut block_acc = self.block_acc.lock();
        block_acc.append(tx_root);
        batch.put(&[BLOCK_LEAVES], &codec::encode_leaves(&self.buf_pool, &Self::all_leaves(&block_acc)));
        batch.put(&[prefix::BLOCK_MERKLE_SNAPSHOT], &codec::encode_snapshot(&self.buf_pool, &block_acc.snapshot()));

        if height >= self.effective_state_hash_height {
            let write_set_hash = execute_result.write_set.hash();
            let mut state_acc = self.state_acc.lock();
            state_acc.append(write_set_hash);
            batch.put(&[STATE_LEAVES], &codec::encode_leaves(&self.buf_pool, &Self::all_leaves(&state_acc)));
            batch.put(&[prefix::STATE_MERKLE_SNAPSHOT], &codec::encode_snapshot(&self.buf_pool, &state_acc.snapshot()));
            batch.put(
                &codec::height_key(prefix::STATE_ROOT_BY_HEIGHT, height),
                &codec::encode_height_state_root(&self.buf_pool, write_set_hash, execute_result.state_root),
            );
        }

        batch.put(&[prefix::CURRENT_BLOCK], &codec::encode_current_block(&self.buf_pool, block.hash(), height));

        self.kv.commit(batch).map_err(StateStoreError::CommitFail)?;
        OP_COUNTERS.counter("blocks_committed").inc();
        info!(height, "committed block");
        Ok(())
    }

    fn all_leaves(acc: &MerkleAccumulator) -> Vec<HashValue> {
        // The accumulator already retains its full leaf history; we
        // only need a way to read it back out for persistence.
        acc.leaves_snapshot()
    }

    pub fn get_state_merkle_root(&self, height: u64) -> anyhow::Result<Option<HashValue>> {
        match self.kv.get(&codec::height_key(prefix::STATE_ROOT_BY_HEIGHT, height))? {
            Some(bytes) => Ok(Some(codec::decode_height_state_root(&bytes)?.1)),
            None => Ok(None),
        }
    }

    pub fn get_block_root_with_new_tx_root(&self, tx_root: HashValue) -> HashValue {
        self.block_acc.lock().root_with_new_leaf(tx_root)
    }

    pub fn get_state_merkle_root_with_new(&self, write_set_hash: HashValue) -> HashValue {
        self.state_acc.lock().root_with_new_leaf(write_set_hash)
    }

    pub fn block_root(&self) -> HashValue {
        self.block_acc.lock().root()
    }

    /// The height of the last committed block, or `None` if nothing has
    /// been committed yet.
    pub fn current_height(&self) -> Result<Option<u64>, StateStoreError> {
        Self::read_current_height(&self.kv).map_err(StateStoreError::CommitFail)
    }

    /// Truncates both accumulators and the height-keyed state-root index
    /// back to `height`, for the `revert` recovery tool. Rejects a
    /// `height` at or past the current committed height with
    /// `StateStoreError::InvalidHeight` — there is nothing to revert.
    ///
    /// The original per-block hash chain isn't persisted independently of
    /// the write-set it produced, so the restored current-block record
    /// points at the truncated block-root accumulator's new root rather
    /// than the historical block hash — callers relying on an exact
    /// historical block hash after a revert need a separate block index.
    pub fn revert_to_height(&self, height: u64) -> Result<(), StateStoreError> {
        let current = match self.current_height()? {
            Some(h) => h,
            None => return Ok(()),
        };
        if height >= current {
            return Err(StateStoreError::InvalidHeight { requested: height, current });
        }

        let mut batch = self.kv.batch();

        let mut block_acc = self.block_acc.lock();
        let kept_block_leaves: Vec<HashValue> =
            block_acc.leaves_snapshot().into_iter().take(height as usize).collect();
        *block_acc = MerkleAccumulator::new();
        for leaf in &kept_block_leaves {
            block_acc.append(*leaf);
        }
        batch.put(&[BLOCK_LEAVES], &codec::encode_leaves(&self.buf_pool, &kept_block_leaves));
        batch.put(&[prefix::BLOCK_MERKLE_SNAPSHOT], &codec::encode_snapshot(&self.buf_pool, &block_acc.snapshot()));
        let new_block_hash = block_acc.root();

        let keep_state_leaves = if height >= self.effective_state_hash_height {
            (height - self.effective_state_hash_height + 1) as usize
        } else {
            0
        };
        let mut state_acc = self.state_acc.lock();
        let kept_state_leaves: Vec<HashValue> =
            state_acc.leaves_snapshot().into_iter().take(keep_state_leaves).collect();
        *state_acc = MerkleAccumulator::new();
        for leaf in &kept_state_leaves {
            state_acc.append(*leaf);
        }
        batch.put(&[STATE_LEAVES], &codec::encode_leaves(&self.buf_pool, &kept_state_leaves));
        batch.put(&[prefix::STATE_MERKLE_SNAPSHOT], &codec::encode_snapshot(&self.buf_pool, &state_acc.snapshot()));

        for (key, _) in self.kv.iter_prefix(&[prefix::STATE_ROOT_BY_HEIGHT]) {
            if key.len() < 5 {
                continue;
            }
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&key[1..5]);
            let key_height = u32::from_le_bytes(raw) as u64;
            if key_height > height {
                batch.delete(&key);
            }
        }

        batch.put(&[prefix::CURRENT_BLOCK], &codec::encode_current_block(&self.buf_pool, new_block_hash, height));
        drop(block_acc);
        drop(state_acc);
        self.kv.commit(batch).map_err(StateStoreError::CommitFail)?;
        info!(height, "reverted state store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_types::{Address, BlockHeader, Transaction, TransactionKind};
    use vm::MockVm;

    fn block(height: u64, prev: HashValue, nonce: u64) -> Block {
        Block {
            header: BlockHeader {
                prev_hash: prev,
                height,
                timestamp: 0,
                tx_root: HashValue::zero(),
                state_root: HashValue::zero(),
                bookkeepers: vec![],
            },
            transactions: vec![Transaction {
                hash: HashValue::sha256(format!("tx{}", height).as_bytes()),
                kind: TransactionKind::Native,
                payer: Address::new([1u8; 20]),
                nonce,
                gas_price: 1,
                gas_limit: 1,
                signature: None,
            }],
        }
    }

    fn open_store(effective_height: u64) -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path(), Arc::new(MockVm), effective_height).unwrap();
        (dir, store)
    }

    #[test]
    fn execute_then_commit_advances_block_root() {
        let (_dir, store) = open_store(0);
        let b1 = block(1, HashValue::zero(), 0);
        let result = store.execute_block(&b1).unwrap();
        let root_before = store.block_root();
        store.commit(1, &b1, &result).unwrap();
        assert_ne!(store.block_root(), root_before);
    }

    #[test]
    fn state_root_suppressed_before_activation_height() {
        let (_dir, store) = open_store(100);
        let b1 = block(1, HashValue::zero(), 0);
        let result = store.execute_block(&b1).unwrap();
        assert_eq!(result.state_root, HashValue::zero());
        store.commit(1, &b1, &result).unwrap();
        assert_eq!(store.get_state_merkle_root(1).unwrap(), None);
    }

    #[test]
    fn state_root_recorded_from_activation_height_onward() {
        let (_dir, store) = open_store(1);
        let b1 = block(1, HashValue::zero(), 0);
        let result = store.execute_block(&b1).unwrap();
        assert_ne!(result.state_root, HashValue::zero());
        store.commit(1, &b1, &result).unwrap();
        assert!(store.get_state_merkle_root(1).unwrap().is_some());
    }

    #[test]
    fn reopening_store_restores_accumulator_state() {
        let dir = tempfile::tempdir().unwrap();
        let root_after_reopen;
        {
            let store = StateStore::open(dir.path(), Arc::new(MockVm), 0).unwrap();
            let b1 = block(1, HashValue::zero(), 0);
            let result = store.execute_block(&b1).unwrap();
            store.commit(1, &b1, &result).unwrap();
        }
        {
            let store = StateStore::open(dir.path(), Arc::new(MockVm), 0).unwrap();
            root_after_reopen = store.block_root();
        }
        assert_ne!(root_after_reopen, HashValue::zero());
    }

    #[test]
    fn revert_to_height_truncates_both_accumulators_and_height_index() {
        let (_dir, store) = open_store(1);
        let mut prev = HashValue::zero();
        for height in 1..=3u64 {
            let b = block(height, prev, 0);
            let result = store.execute_block(&b).unwrap();
            store.commit(height, &b, &result).unwrap();
            prev = b.hash();
        }
        assert!(store.get_state_merkle_root(3).unwrap().is_some());

        store.revert_to_height(1).unwrap();

        assert_eq!(store.current_height().unwrap(), Some(1));
        assert!(store.get_state_merkle_root(3).unwrap().is_none());
        assert!(store.get_state_merkle_root(2).unwrap().is_none());
        assert!(store.get_state_merkle_root(1).unwrap().is_some());
    }

    #[test]
    fn revert_to_height_above_current_is_rejected() {
        let (_dir, store) = open_store(0);
        let b1 = block(1, HashValue::zero(), 0);
        let result = store.execute_block(&b1).unwrap();
        store.commit(1, &b1, &result).unwrap();
        assert!(matches!(
            store.revert_to_height(5),
            Err(StateStoreError::InvalidHeight { requested: 5, current: 1 })
        ));
    }
}
