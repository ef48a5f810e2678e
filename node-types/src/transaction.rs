use node_crypto::{Address, HashValue, Signature};
use serde::{Deserialize, Serialize};

/// The two transaction shapes this node admits. Native transactions use a
/// per-account counter that need not be contiguous across accounts; EIP-like
/// transactions carry a strictly sequential per-payer nonce and are subject
/// to replace-by-fee.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TransactionKind {
    Native,
    Eip,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: HashValue,
    pub kind: TransactionKind,
    pub payer: Address,
    pub nonce: u64,
    pub gas_price: u64,
    pub gas_limit: u64,
    pub signature: Option<Signature>,
}

impl Transaction {
    pub fn is_eip(&self) -> bool {
        matches!(self.kind, TransactionKind::Eip)
    }
}
