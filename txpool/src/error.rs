use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum PoolError {
    #[error("no admission slot available")]
    PoolFull,
    #[error("gas price below the pool's current threshold")]
    GasTooLow,
    #[error("transaction hash already in the pool")]
    Duplicate,
    #[error("a higher- or equal-fee transaction already occupies this nonce")]
    DuplicateNonce,
    #[error("nonce does not match the next expected nonce for this payer")]
    NonceGap,
    #[error("superseded by a higher-fee transaction at the same nonce")]
    ReplacedByHigherNonce,
    #[error("stateless validation failed")]
    StatelessFail,
    #[error("stateful validation failed")]
    StatefulFail,
    #[error("gas price below threshold in block verification")]
    GasPrice,
    #[error("duplicate transaction hash within the block")]
    DoubleSpend,
}
