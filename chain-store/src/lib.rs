//! The lag-by-one block sequencer standing between consensus and the
//! ledger: `add_block` speculatively executes the new block immediately
//! but only submits the *previous* pending block's result, so a block
//! consensus has already declared decided still has its write-set held
//! in memory for one more round. Grounded directly on the reference
//! node's `ChainStore`/`PendingBlock`/`AddBlock` (the per-block-result
//! variant; see the design notes on the two parallel definitions found
//! in the source).

use node_infallible::Mutex;
use node_logger::{info, warn};
use node_metrics::OpMetrics;
use node_types::{Block, PendingBlock};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

static OP_COUNTERS: Lazy<OpMetrics> = Lazy::new(|| OpMetrics::new_and_registered("chain_store"));

#[derive(Debug, Error)]
pub enum ChainStoreError {
    #[error("block execution failed: {0}")]
    ExecFail(#[source] anyhow::Error),
    #[error("submitting pending block failed: {0}")]
    CommitFail(#[source] anyhow::Error),
}

impl From<state_store::error::StateStoreError> for ChainStoreError {
    fn from(e: state_store::error::StateStoreError) -> Self {
        match e {
            state_store::error::StateStoreError::ExecFail(err) => ChainStoreError::ExecFail(err),
            other => ChainStoreError::CommitFail(anyhow::anyhow!(other)),
        }
    }
}

/// Notified once a block has been accepted into the chain store
/// (the node side of what the reference node expresses as an actor
/// message to consensus).
pub trait ConsensusNotify: Send + Sync {
    fn on_block_consensus_complete(&self, height: u64);
}

struct State {
    chained_height: Option<u64>,
    pending_blocks: HashMap<u64, PendingBlock>,
    needs_submit_block: bool,
}

pub struct ChainStore {
    state_store: Arc<state_store::StateStore>,
    notify: Arc<dyn ConsensusNotify>,
    state: Mutex<State>,
}

impl ChainStore {
    pub fn new(state_store: Arc<state_store::StateStore>, notify: Arc<dyn ConsensusNotify>) -> Self {
        Self {
            state_store,
            notify,
            state: Mutex::new(State {
                chained_height: None,
                pending_blocks: HashMap::new(),
                needs_submit_block: false,
            }),
        }
    }

    /// Loads `chained_height` from the ledger's current committed
    /// height, clearing any stale pending blocks. Should be called once
    /// after construction and again whenever `add_block` detects it has
    /// fallen behind the ledger.
    pub fn reload_from_ledger(&self) -> Result<(), ChainStoreError> {
        let ledger_height = self.state_store.current_height()?;
        let mut state = self.state.lock();
        state.pending_blocks.retain(|height, _| match ledger_height {
            Some(lh) => *height > lh,
            None => true,
        });
        state.chained_height = ledger_height;
        state.needs_submit_block = false;
        info!(ledger_height = ?ledger_height, "reloaded chain store from ledger");
        Ok(())
    }

    pub fn chained_height(&self) -> Option<u64> {
        self.state.lock().chained_height
    }

    /// Speculatively executes `block` and, once its predecessor is
    /// known decided, submits that predecessor to the ledger. A block
    /// at or below the already-chained height is a no-op.
    pub fn add_block(&self, block: Block) -> Result<(), ChainStoreError> {
        let height = block.height();
        {
            let state = self.state.lock();
            if let Some(chained) = state.chained_height {
                if height <= chained {
                    return Ok(());
                }
            }
        }

        let exec_result = self
            .state_store
            .execute_block(&block)
            .map_err(ChainStoreError::from)?;

        let mut state = self.state.lock();
        state.pending_blocks.insert(height, PendingBlock { block, exec_result });

        if state.needs_submit_block {
            if let Some(prev) = state.pending_blocks.get(&(height - 1)).cloned() {
                self.state_store
                    .commit(height - 1, &prev.block, &prev.exec_result)
                    .map_err(ChainStoreError::from)?;
                OP_COUNTERS.counter("blocks_submitted").inc();
            } else {
                warn!(height, "needs_submit_block set but predecessor missing from pending buffer");
            }
            if height >= 2 {
                state.pending_blocks.remove(&(height - 2));
            }
        }

        state.needs_submit_block = true;
        state.chained_height = Some(height);
        drop(state);

        self.notify.on_block_consensus_complete(height);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_types::{Address, BlockHeader, HashValue, Transaction, TransactionKind};
    use state_store::vm::MockVm;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct RecordingNotify(AtomicU64);

    impl ConsensusNotify for RecordingNotify {
        fn on_block_consensus_complete(&self, height: u64) {
            self.0.store(height, Ordering::SeqCst);
        }
    }

    fn block(height: u64, prev: HashValue) -> Block {
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
                nonce: 0,
                gas_price: 1,
                gas_limit: 1,
                signature: None,
            }],
        }
    }

    fn setup() -> (tempfile::TempDir, ChainStore, Arc<RecordingNotify>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(state_store::StateStore::open(dir.path(), Arc::new(MockVm), 0).unwrap());
        let notify = Arc::new(RecordingNotify(AtomicU64::new(0)));
        let chain_store = ChainStore::new(store, notify.clone());
        (dir, chain_store, notify)
    }

    #[test]
    fn add_block_below_chained_height_is_noop() {
        let (_dir, chain_store, _notify) = setup();
        chain_store.add_block(block(10, HashValue::zero())).unwrap();
        chain_store.add_block(block(10, HashValue::zero())).unwrap();
        assert_eq!(chain_store.chained_height(), Some(10));
    }

    #[test]
    fn submission_lags_by_one_block() {
        let (_dir, chain_store, notify) = setup();
        chain_store.add_block(block(10, HashValue::zero())).unwrap();
        assert_eq!(chain_store.state_store.current_height().unwrap(), None);
        assert_eq!(notify.0.load(Ordering::SeqCst), 10);

        chain_store.add_block(block(11, HashValue::zero())).unwrap();
        assert_eq!(chain_store.state_store.current_height().unwrap(), Some(10));

        chain_store.add_block(block(12, HashValue::zero())).unwrap();
        assert_eq!(chain_store.state_store.current_height().unwrap(), Some(11));
    }

    #[test]
    fn reload_from_ledger_drops_stale_pending_entries() {
        let (_dir, chain_store, _notify) = setup();
        chain_store.add_block(block(10, HashValue::zero())).unwrap();
        chain_store.add_block(block(11, HashValue::zero())).unwrap();
        chain_store.reload_from_ledger().unwrap();
        assert_eq!(chain_store.chained_height(), Some(10));
        assert!(chain_store.state.lock().pending_blocks.is_empty());
    }
}
