mod block;
pub mod bufpool;
mod transaction;
mod write_set;

pub use block::{Block, BlockHeader, ExecuteResult, Notification, PendingBlock};
pub use node_crypto::{Address, HashValue, PublicKey, Signature};
pub use transaction::{Transaction, TransactionKind};
pub use write_set::{WriteOp, WriteSet};
