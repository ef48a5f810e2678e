use crate::transaction::Transaction;
use crate::write_set::WriteSet;
use node_crypto::{Address, HashValue};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockHeader {
    pub prev_hash: HashValue,
    pub height: u64,
    pub timestamp: u64,
    pub tx_root: HashValue,
    pub state_root: HashValue,
    pub bookkeepers: Vec<Address>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// The Merkle root of this block's transaction hashes, combined
    /// left-to-right; used as the accumulator leaf submitted to the
    /// block-root accumulator.
    /// Identifies this block's content: `H(prev_hash ∥ tx_root)`.
    pub fn hash(&self) -> HashValue {
        HashValue::combine(&self.header.prev_hash, &self.tx_root())
    }

    pub fn tx_root(&self) -> HashValue {
        let hashes: Vec<HashValue> = self.transactions.iter().map(|t| t.hash).collect();
        match hashes.len() {
            0 => HashValue::zero(),
            _ => hashes
                .into_iter()
                .reduce(|acc, h| HashValue::combine(&acc, &h))
                .expect("non-empty"),
        }
    }
}

/// The result of speculatively executing a block: a deterministic
/// write-set, the resulting state root, and any notifications raised
/// during execution (reconfiguration events, etc).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecuteResult {
    pub write_set: WriteSet,
    pub state_root: HashValue,
    pub notifications: Vec<Notification>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    pub kind: String,
    pub payload: Vec<u8>,
}

/// A block the chain store has speculatively executed but not yet
/// submitted to the ledger, held until its successor arrives.
#[derive(Clone, Debug)]
pub struct PendingBlock {
    pub block: Block,
    pub exec_result: ExecuteResult,
}
