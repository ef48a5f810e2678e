use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("block execution failed: {0}")]
    ExecFail(#[source] anyhow::Error),
    #[error("batch commit failed: {0}")]
    CommitFail(#[source] anyhow::Error),
    #[error("accumulator size {actual} does not match ledger height + 1 ({expected}) on init")]
    InconsistentMerkle { actual: u64, expected: u64 },
    #[error("cannot revert to height {requested}: current height is {current}")]
    InvalidHeight { requested: u64, current: u64 },
}
