use crate::error::PoolError;
use node_types::{HashValue, Transaction};
use tokio::sync::{oneshot, OwnedSemaphorePermit};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TxOrigin {
    Network,
    Http,
    Consensus,
    Nil,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    Stateless,
    Stateful,
}

pub struct CheckResponse {
    pub hash: HashValue,
    pub stage: Stage,
    pub result: Result<(), PoolError>,
    pub checked_height: u64,
}

pub type SubmitOutcome = Result<(), PoolError>;

/// A transaction admitted but not yet fully validated.
pub struct PendingTx {
    pub tx: Transaction,
    pub origin: TxOrigin,
    pub reply: Option<oneshot::Sender<SubmitOutcome>>,
    pub stateless_passed: bool,
    pub stateful_passed: bool,
    pub validated_at_height: u64,
    pub permit: Option<OwnedSemaphorePermit>,
}

/// A transaction that has cleared both validation stages and is
/// eligible for block assembly.
pub struct VerifiedTx {
    pub tx: Transaction,
    pub verified_height: u64,
    pub permit: Option<OwnedSemaphorePermit>,
}
