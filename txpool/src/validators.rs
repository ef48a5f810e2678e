use crate::error::PoolError;
use node_types::{Address, Transaction};

/// Signature/structural checks with no ledger access. Dispatched to the
/// smaller of the two worker pools.
pub trait StatelessValidator: Send + Sync {
    fn validate(&self, tx: &Transaction) -> Result<(), PoolError>;
}

/// Ledger-dependent checks: balance, payer nonce, contract existence.
/// Dispatched to the single-worker stateful pool since it must read a
/// consistent ledger snapshot.
pub trait StatefulValidator: Send + Sync {
    fn validate(&self, tx: &Transaction, height: u64) -> Result<(), PoolError>;
    fn ledger_nonce(&self, payer: Address) -> u64;
}

/// An in-memory ledger view for tests and for the CLI's demo mode,
/// grounded on the role `vm-validator`/the mock ledger play in the
/// reference codebase's own test harnesses: balances and nonces an
/// operator can set directly instead of running a real VM.
pub struct TestLedger {
    balances: node_infallible::RwLock<std::collections::HashMap<Address, u64>>,
    nonces: node_infallible::RwLock<std::collections::HashMap<Address, u64>>,
}

impl TestLedger {
    pub fn new() -> Self {
        Self {
            balances: node_infallible::RwLock::new(std::collections::HashMap::new()),
            nonces: node_infallible::RwLock::new(std::collections::HashMap::new()),
        }
    }

    pub fn set_balance(&self, payer: Address, balance: u64) {
        self.balances.write().insert(payer, balance);
    }

    pub fn set_nonce(&self, payer: Address, nonce: u64) {
        self.nonces.write().insert(payer, nonce);
    }

    fn balance(&self, payer: Address) -> u64 {
        self.balances.read().get(&payer).copied().unwrap_or(0)
    }
}

impl Default for TestLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl StatelessValidator for TestLedger {
    fn validate(&self, tx: &Transaction) -> Result<(), PoolError> {
        if tx.gas_limit == 0 {
            return Err(PoolError::StatelessFail);
        }
        Ok(())
    }
}

impl StatefulValidator for TestLedger {
    fn validate(&self, tx: &Transaction, _height: u64) -> Result<(), PoolError> {
        let required = tx.gas_price.saturating_mul(tx.gas_limit);
        if self.balance(tx.payer) < required {
            return Err(PoolError::StatefulFail);
        }
        Ok(())
    }

    fn ledger_nonce(&self, payer: Address) -> u64 {
        self.nonces.read().get(&payer).copied().unwrap_or(0)
    }
}
