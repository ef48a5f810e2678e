use node_types::{Block, WriteSet};

/// The collaborator that actually executes a block's transactions
/// against a read-through view of state. Real contract execution is out
/// of scope; this trait is the seam a real VM would implement.
pub trait VMExecutor: Send + Sync {
    fn execute_block(&self, block: &Block) -> anyhow::Result<WriteSet>;
}

/// Derives a write-set purely from each transaction's payer and nonce,
/// with no notion of contract semantics, so the commit pipeline is
/// exercisable end-to-end without a real VM. One entry per transaction:
/// `storage[payer][nonce] = tx_hash`.
pub struct MockVm;

impl VMExecutor for MockVm {
    fn execute_block(&self, block: &Block) -> anyhow::Result<WriteSet> {
        let mut write_set = WriteSet::new();
        for tx in &block.transactions {
            let mut key = vec![kv_store::prefix::STORAGE];
            key.extend_from_slice(tx.payer.as_slice());
            key.extend_from_slice(&tx.nonce.to_le_bytes());
            write_set.put(key, tx.hash.to_vec());
        }
        Ok(write_set.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_types::{Address, BlockHeader, HashValue, Transaction, TransactionKind};

    fn block_with_one_tx() -> Block {
        Block {
            header: BlockHeader {
                prev_hash: HashValue::zero(),
                height: 1,
                timestamp: 0,
                tx_root: HashValue::zero(),
                state_root: HashValue::zero(),
                bookkeepers: vec![],
            },
            transactions: vec![Transaction {
                hash: HashValue::sha256(b"tx1"),
                kind: TransactionKind::Native,
                payer: Address::new([1u8; 20]),
                nonce: 0,
                gas_price: 1,
                gas_limit: 1,
                signature: None,
            }],
        }
    }

    #[test]
    fn mock_vm_is_deterministic() {
        let block = block_with_one_tx();
        let a = MockVm.execute_block(&block).unwrap();
        let b = MockVm.execute_block(&block).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.len(), 1);
    }
}
