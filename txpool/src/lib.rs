//! Admits, validates, orders, and serves transactions to consensus.
//! Grounded on the reference node's `TXPoolServer`: a counting-semaphore
//! slot pool (`slots`), separate stateless/stateful worker pools feeding
//! a single serialized response handler (`rspCh`/`handleRsp`), and
//! per-payer nonce tracking for the EIP-like transaction kind
//! (`eipTxPool`/`pendingEipTxs`/`pendingNonces`). The single Go
//! goroutine that owned `rspCh` is replaced here by a lock-guarded
//! `Inner` plus one background task draining the response channel —
//! equivalent serialization, idiomatic Rust shared-state form.

pub mod config;
pub mod error;
pub mod types;
pub mod validators;

use config::PoolConfig;
use error::PoolError;
use indexmap::IndexMap;
use node_infallible::Mutex;
use node_logger::warn;
use node_metrics::OpMetrics;
use node_types::{Address, HashValue, Transaction};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Semaphore};
use types::{CheckResponse, PendingTx, Stage, SubmitOutcome, TxOrigin, VerifiedTx};
use validators::{StatefulValidator, StatelessValidator};

static OP_COUNTERS: Lazy<OpMetrics> = Lazy::new(|| OpMetrics::new_and_registered("txpool"));

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TxStatus {
    Pending,
    Verified,
    Unknown,
}

#[derive(Clone, Debug)]
pub struct ReadyTx {
    pub tx: Transaction,
    pub verified_height: u64,
}

#[derive(Debug)]
pub struct BlockVerifyResult {
    /// The index into the submitted batch and error code of the first
    /// transaction that failed, if any. Per the "short-circuit" rule,
    /// nothing past this index was checked.
    pub first_failure: Option<(usize, PoolError)>,
}

struct Inner {
    pending: HashMap<HashValue, PendingTx>,
    verified: IndexMap<HashValue, VerifiedTx>,
    eip_by_payer: HashMap<Address, BTreeMap<u64, HashValue>>,
    pending_nonces: HashMap<Address, u64>,
    gas_price_threshold: u64,
    height: u64,
    blocks_since_price_check: u64,
}

pub struct TxPool {
    inner: Mutex<Inner>,
    slots: Arc<Semaphore>,
    stateless_pool: node_bounded_executor::BoundedExecutor,
    stateful_pool: node_bounded_executor::BoundedExecutor,
    stateless_validator: Arc<dyn StatelessValidator>,
    stateful_validator: Arc<dyn StatefulValidator>,
    resp_tx: node_channel::Sender<CheckResponse>,
    broadcast_tx: Option<node_channel::Sender<(HashValue, Vec<u8>)>>,
    config: PoolConfig,
}

impl TxPool {
    pub fn new(
        config: PoolConfig,
        stateless_validator: Arc<dyn StatelessValidator>,
        stateful_validator: Arc<dyn StatefulValidator>,
        broadcast_tx: Option<node_channel::Sender<(HashValue, Vec<u8>)>>,
    ) -> Arc<Self> {
        let handle = tokio::runtime::Handle::current();
        let (resp_tx, resp_rx) = node_channel::new(4096, "txpool_responses");
        let pool = Arc::new(Self {
            inner: Mutex::new(Inner {
                pending: HashMap::new(),
                verified: IndexMap::new(),
                eip_by_payer: HashMap::new(),
                pending_nonces: HashMap::new(),
                gas_price_threshold: config.initial_gas_price_threshold,
                height: 0,
                blocks_since_price_check: 0,
            }),
            slots: Arc::new(Semaphore::new(config.max_pending)),
            stateless_pool: node_bounded_executor::BoundedExecutor::new(config.stateless_workers, handle.clone()),
            stateful_pool: node_bounded_executor::BoundedExecutor::new(config.stateful_workers, handle),
            stateless_validator,
            stateful_validator,
            resp_tx,
            broadcast_tx,
            config,
        });
        let loop_pool = Arc::clone(&pool);
        tokio::spawn(async move { loop_pool.response_loop(resp_rx).await });
        pool
    }

    pub fn current_height(&self) -> u64 {
        self.inner.lock().height
    }

    pub fn set_gas_price_threshold(&self, threshold: u64) {
        self.inner.lock().gas_price_threshold = threshold;
    }

    pub fn pending_list_size(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn verified_list_size(&self) -> usize {
        self.inner.lock().verified.len()
    }

    pub fn get_tx_status(&self, hash: HashValue) -> TxStatus {
        let inner = self.inner.lock();
        if inner.verified.contains_key(&hash) {
            TxStatus::Verified
        } else if inner.pending.contains_key(&hash) {
            TxStatus::Pending
        } else {
            TxStatus::Unknown
        }
    }

    /// Admits `tx`. Returns a receiver that resolves once validation
    /// completes (success, rejection, or later replacement); the fast
    /// rejects (full pool, low gas, duplicate, nonce mismatch) are
    /// returned synchronously instead.
    pub fn submit(
        self: &Arc<Self>,
        tx: Transaction,
        origin: TxOrigin,
    ) -> Result<oneshot::Receiver<SubmitOutcome>, PoolError> {
        let permit = Arc::clone(&self.slots)
            .try_acquire_owned()
            .map_err(|_| PoolError::PoolFull)?;

        let mut inner = self.inner.lock();
        if tx.gas_price < inner.gas_price_threshold {
            return Err(PoolError::GasTooLow);
        }
        let hash = tx.hash;
        if inner.pending.contains_key(&hash) || inner.verified.contains_key(&hash) {
            return Err(PoolError::Duplicate);
        }

        if tx.is_eip() {
            let payer = tx.payer;
            let existing_hash = inner.eip_by_payer.get(&payer).and_then(|m| m.get(&tx.nonce)).copied();
            if let Some(old_hash) = existing_hash {
                let old_gas_price = inner
                    .pending
                    .get(&old_hash)
                    .map(|p| p.tx.gas_price)
                    .or_else(|| inner.verified.get(&old_hash).map(|v| v.tx.gas_price))
                    .unwrap_or(0);
                let bump = self.config.replacement_bump_percent;
                if tx.gas_price.saturating_mul(100) >= old_gas_price.saturating_mul(100 + bump) {
                    inner
                        .eip_by_payer
                        .get_mut(&payer)
                        .expect("checked above")
                        .insert(tx.nonce, hash);
                    self.evict_any(&mut inner, old_hash, Err(PoolError::ReplacedByHigherNonce));
                } else {
                    return Err(PoolError::DuplicateNonce);
                }
            } else {
                let ledger_nonce = self.stateful_validator.ledger_nonce(payer);
                let required = inner.pending_nonces.entry(payer).or_insert(ledger_nonce);
                *required = (*required).max(ledger_nonce);
                let required = *required;
                if tx.nonce != required {
                    return Err(PoolError::NonceGap);
                }
                inner.eip_by_payer.entry(payer).or_insert_with(BTreeMap::new).insert(tx.nonce, hash);
            }
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let height = inner.height;
        inner.pending.insert(
            hash,
            PendingTx {
                tx: tx.clone(),
                origin,
                reply: Some(reply_tx),
                stateless_passed: false,
                stateful_passed: false,
                validated_at_height: 0,
                permit: Some(permit),
            },
        );
        drop(inner);

        OP_COUNTERS.counter("admitted").inc();
        self.dispatch_stateless(tx.clone(), height);
        self.dispatch_stateful(tx, height);
        Ok(reply_rx)
    }

    fn dispatch_stateless(self: &Arc<Self>, tx: Transaction, height: u64) {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let validator = Arc::clone(&pool.stateless_validator);
            let resp_tx = pool.resp_tx.clone();
            let hash = tx.hash;
            pool.stateless_pool
                .spawn(async move {
                    let result = validator.validate(&tx);
                    let _ = resp_tx
                        .send(CheckResponse { hash, stage: Stage::Stateless, result, checked_height: height })
                        .await;
                })
                .await;
        });
    }

    fn dispatch_stateful(self: &Arc<Self>, tx: Transaction, height: u64) {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let validator = Arc::clone(&pool.stateful_validator);
            let resp_tx = pool.resp_tx.clone();
            let hash = tx.hash;
            pool.stateful_pool
                .spawn(async move {
                    let result = validator.validate(&tx, height);
                    let _ = resp_tx
                        .send(CheckResponse { hash, stage: Stage::Stateful, result, checked_height: height })
                        .await;
                })
                .await;
        });
    }

    fn dispatch_stateful_by_hash(self: &Arc<Self>, hash: HashValue) {
        let (tx, height) = {
            let inner = self.inner.lock();
            match inner.pending.get(&hash) {
                Some(p) => (p.tx.clone(), inner.height),
                None => return,
            }
        };
        self.dispatch_stateful(tx, height);
    }

    async fn response_loop(self: Arc<Self>, mut rx: node_channel::Receiver<CheckResponse>) {
        while let Some(resp) = rx.recv().await {
            self.handle_response(resp);
        }
    }

    fn evict_any(&self, inner: &mut Inner, hash: HashValue, outcome: SubmitOutcome) {
        if inner.pending.contains_key(&hash) {
            self.evict_pending(inner, hash, outcome);
        } else if let Some(v) = inner.verified.shift_remove(&hash) {
            if v.tx.is_eip() {
                if let Some(m) = inner.eip_by_payer.get_mut(&v.tx.payer) {
                    m.remove(&v.tx.nonce);
                }
            }
        }
    }

    fn evict_pending(&self, inner: &mut Inner, hash: HashValue, outcome: SubmitOutcome) {
        if let Some(mut p) = inner.pending.remove(&hash) {
            if p.tx.is_eip() {
                if let Some(m) = inner.eip_by_payer.get_mut(&p.tx.payer) {
                    m.remove(&p.tx.nonce);
                }
            }
            if let Some(reply) = p.reply.take() {
                let _ = reply.send(outcome);
            }
        }
    }

    fn handle_response(self: &Arc<Self>, resp: CheckResponse) {
        let hash = resp.hash;
        let mut inner = self.inner.lock();

        if !inner.pending.contains_key(&hash) {
            return; // stale response against an already-removed tx
        }

        if resp.result.is_err() {
            let code = match resp.stage {
                Stage::Stateless => PoolError::StatelessFail,
                Stage::Stateful => PoolError::StatefulFail,
            };
            self.evict_pending(&mut inner, hash, Err(code));
            return;
        }

        let both_passed = {
            let entry = inner.pending.get_mut(&hash).expect("checked above");
            match resp.stage {
                Stage::Stateless => entry.stateless_passed = true,
                Stage::Stateful => {
                    entry.stateful_passed = true;
                    entry.validated_at_height = resp.checked_height;
                }
            }
            entry.stateless_passed && entry.stateful_passed
        };

        if resp.stage == Stage::Stateful && resp.checked_height < inner.height {
            drop(inner);
            self.dispatch_stateful_by_hash(hash);
            return;
        }

        if !both_passed {
            return;
        }

        let mut pending = inner.pending.remove(&hash).expect("checked above");
        let payer = pending.tx.payer;
        let is_eip = pending.tx.is_eip();

        if is_eip {
            let expected = inner
                .pending_nonces
                .get(&payer)
                .copied()
                .unwrap_or(0)
                .max(self.stateful_validator.ledger_nonce(payer));
            if pending.tx.nonce != expected {
                if let Some(m) = inner.eip_by_payer.get_mut(&payer) {
                    m.remove(&pending.tx.nonce);
                }
                if let Some(reply) = pending.reply.take() {
                    let _ = reply.send(Err(PoolError::NonceGap));
                }
                return;
            }
        }

        let verified_height = pending.validated_at_height;
        let permit = pending.permit.take();
        let origin = pending.origin;
        let tx = pending.tx.clone();
        if let Some(reply) = pending.reply.take() {
            let _ = reply.send(Ok(()));
        }

        inner.verified.insert(hash, VerifiedTx { tx: tx.clone(), verified_height, permit });
        if is_eip {
            inner.pending_nonces.insert(payer, tx.nonce + 1);
        }
        OP_COUNTERS.counter("verified").inc();

        let should_broadcast =
            matches!(origin, TxOrigin::Http) || (matches!(origin, TxOrigin::Network) && self.config.broadcast_on_relay);
        drop(inner);
        if should_broadcast {
            if let Some(bc) = &self.broadcast_tx {
                let _ = bc.try_send((hash, Vec::new()));
            }
        }
    }

    /// Drains up to `limit` verified transactions for a candidate block
    /// at `height`. Entries whose `verified_height` has aged past
    /// `stale_threshold` are sent back through a stateful-only recheck
    /// instead of being returned.
    pub fn take_block_txs(self: &Arc<Self>, limit: usize, height: u64) -> Vec<ReadyTx> {
        let stale_threshold = self.config.stale_threshold;
        let mut inner = self.inner.lock();
        inner.height = height;

        let mut stale_hashes = Vec::new();
        let mut available_hashes = Vec::new();
        for (hash, v) in inner.verified.iter() {
            if v.verified_height + stale_threshold < height {
                stale_hashes.push(*hash);
            } else if available_hashes.len() < limit {
                available_hashes.push(*hash);
            }
        }

        let mut ready = Vec::with_capacity(available_hashes.len());
        for hash in &available_hashes {
            if let Some(v) = inner.verified.shift_remove(hash) {
                ready.push(ReadyTx { tx: v.tx, verified_height: v.verified_height });
            }
        }

        let mut restale = Vec::new();
        for hash in &stale_hashes {
            if let Some(v) = inner.verified.shift_remove(hash) {
                restale.push((*hash, v));
            }
        }
        drop(inner);

        for (hash, v) in restale {
            let tx = v.tx.clone();
            {
                let mut inner = self.inner.lock();
                inner.pending.insert(
                    hash,
                    PendingTx {
                        tx: tx.clone(),
                        origin: TxOrigin::Nil,
                        reply: None,
                        stateless_passed: true,
                        stateful_passed: false,
                        validated_at_height: v.verified_height,
                        permit: v.permit,
                    },
                );
            }
            self.dispatch_stateful(tx, height);
        }

        ready
    }

    /// Consensus-side pre-check of a candidate block's transactions.
    pub async fn verify_block(self: &Arc<Self>, txs: &[Transaction], height: u64) -> BlockVerifyResult {
        let threshold = self.inner.lock().gas_price_threshold;
        let mut seen = HashSet::new();
        for (i, tx) in txs.iter().enumerate() {
            if tx.gas_price < threshold {
                return BlockVerifyResult { first_failure: Some((i, PoolError::GasPrice)) };
            }
            if !seen.insert(tx.hash) {
                return BlockVerifyResult { first_failure: Some((i, PoolError::DoubleSpend)) };
            }
        }

        const MAX_WAIT_SECS: u64 = 30;
        let mut waited = 0;
        while self.inner.lock().height < height {
            if waited >= MAX_WAIT_SECS {
                warn!(height, "gave up waiting for local ledger to catch up before block verification");
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
            waited += 1;
        }

        for (i, tx) in txs.iter().enumerate() {
            let verified_height = {
                let inner = self.inner.lock();
                inner.verified.get(&tx.hash).map(|v| v.verified_height)
            };
            if let Some(vh) = verified_height {
                if vh + self.config.stale_threshold >= height {
                    continue; // already verified and fresh
                }
            } else if self.stateless_validator.validate(tx).is_err() {
                return BlockVerifyResult { first_failure: Some((i, PoolError::StatelessFail)) };
            }
            if self.stateful_validator.validate(tx, height).is_err() {
                return BlockVerifyResult { first_failure: Some((i, PoolError::StatefulFail)) };
            }
        }
        BlockVerifyResult { first_failure: None }
    }

    /// Cleans up after a block has been committed: drops its
    /// transactions from the verified pool and per-payer nonce
    /// tracking, and — every `update_frequency` blocks — evicts
    /// verified transactions that fall below the current gas-price
    /// threshold and re-runs stateful validation against the rest, to
    /// catch environmental drift (a newly-deployed contract, a balance
    /// that no longer covers gas) a purely stateless check can't see.
    pub fn on_block_committed(self: &Arc<Self>, txs: &[Transaction], height: u64) {
        let mut to_recheck: Vec<(HashValue, Transaction)> = Vec::new();
        {
            let mut inner = self.inner.lock();
            inner.height = height;
            for tx in txs {
                inner.verified.shift_remove(&tx.hash);
                if tx.is_eip() {
                    if let Some(m) = inner.eip_by_payer.get_mut(&tx.payer) {
                        m.remove(&tx.nonce);
                    }
                    let ledger_nonce = self.stateful_validator.ledger_nonce(tx.payer);
                    inner.pending_nonces.insert(tx.payer, ledger_nonce.max(tx.nonce + 1));
                }
            }
            let payers: Vec<Address> = inner.eip_by_payer.keys().copied().collect();
            for payer in payers {
                let ledger_nonce = self.stateful_validator.ledger_nonce(payer);
                if let Some(nonces) = inner.eip_by_payer.get_mut(&payer) {
                    nonces.retain(|&n, _| n >= ledger_nonce);
                }
            }

            inner.blocks_since_price_check += 1;
            if inner.blocks_since_price_check >= self.config.update_frequency {
                inner.blocks_since_price_check = 0;
                let threshold = inner.gas_price_threshold;
                let stale: Vec<HashValue> =
                    inner.verified.iter().filter(|(_, v)| v.tx.gas_price < threshold).map(|(h, _)| *h).collect();
                for hash in stale {
                    inner.verified.shift_remove(&hash);
                }
                for (hash, v) in inner.verified.iter() {
                    if self.stateful_validator.validate(&v.tx, height).is_err() {
                        to_recheck.push((*hash, v.tx.clone()));
                    }
                }
            }
        }

        for (hash, tx) in to_recheck {
            let taken = {
                let mut inner = self.inner.lock();
                inner.verified.shift_remove(&hash)
            };
            if let Some(v) = taken {
                {
                    let mut inner = self.inner.lock();
                    inner.pending.insert(
                        hash,
                        PendingTx {
                            tx: tx.clone(),
                            origin: TxOrigin::Nil,
                            reply: None,
                            stateless_passed: true,
                            stateful_passed: false,
                            validated_at_height: v.verified_height,
                            permit: v.permit,
                        },
                    );
                }
                self.dispatch_stateful(tx, height);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_types::TransactionKind;
    use validators::TestLedger;

    fn make_pool(cfg: PoolConfig) -> (Arc<TxPool>, Arc<TestLedger>) {
        let ledger = Arc::new(TestLedger::new());
        let pool = TxPool::new(cfg, ledger.clone(), ledger.clone(), None);
        (pool, ledger)
    }

    fn native_tx(seed: u8, gas_price: u64, gas_limit: u64) -> Transaction {
        Transaction {
            hash: HashValue::sha256(&[seed]),
            kind: TransactionKind::Native,
            payer: Address::new([seed; 20]),
            nonce: 0,
            gas_price,
            gas_limit,
            signature: None,
        }
    }

    fn eip_tx(payer: Address, nonce: u64, gas_price: u64, gas_limit: u64) -> Transaction {
        let mut seed = payer.as_slice().to_vec();
        seed.extend_from_slice(&nonce.to_be_bytes());
        seed.extend_from_slice(&gas_price.to_be_bytes());
        Transaction {
            hash: HashValue::sha256(&seed),
            kind: TransactionKind::Eip,
            payer,
            nonce,
            gas_price,
            gas_limit,
            signature: None,
        }
    }

    #[tokio::test]
    async fn submit_native_tx_is_admitted_and_verifies() {
        let (pool, ledger) = make_pool(PoolConfig::default());
        let tx = native_tx(1, 10, 100);
        ledger.set_balance(tx.payer, 10_000);
        let rx = pool.submit(tx, TxOrigin::Http).unwrap();
        assert_eq!(rx.await.unwrap(), Ok(()));
        assert_eq!(pool.verified_list_size(), 1);
        assert_eq!(pool.pending_list_size(), 0);
    }

    #[tokio::test]
    async fn pool_full_rejects_admission_beyond_capacity() {
        let mut cfg = PoolConfig::default();
        cfg.max_pending = 1;
        let (pool, ledger) = make_pool(cfg);
        let tx1 = native_tx(1, 10, 100);
        let tx2 = native_tx(2, 10, 100);
        ledger.set_balance(tx1.payer, 10_000);
        ledger.set_balance(tx2.payer, 10_000);
        let _rx = pool.submit(tx1, TxOrigin::Http).unwrap();
        assert_eq!(pool.submit(tx2, TxOrigin::Http).unwrap_err(), PoolError::PoolFull);
    }

    #[tokio::test]
    async fn gas_price_below_threshold_is_rejected() {
        let (pool, _ledger) = make_pool(PoolConfig::default());
        pool.set_gas_price_threshold(5);
        let tx = native_tx(1, 1, 100);
        assert_eq!(pool.submit(tx, TxOrigin::Http).unwrap_err(), PoolError::GasTooLow);
    }

    #[tokio::test]
    async fn duplicate_hash_is_rejected() {
        let (pool, ledger) = make_pool(PoolConfig::default());
        let tx = native_tx(1, 10, 100);
        ledger.set_balance(tx.payer, 10_000);
        let _rx = pool.submit(tx.clone(), TxOrigin::Http).unwrap();
        assert_eq!(pool.submit(tx, TxOrigin::Http).unwrap_err(), PoolError::Duplicate);
    }

    #[tokio::test]
    async fn eip_nonce_gap_is_rejected() {
        let (pool, ledger) = make_pool(PoolConfig::default());
        let payer = Address::new([7u8; 20]);
        ledger.set_balance(payer, 10_000);
        let tx = eip_tx(payer, 3, 10, 100);
        assert_eq!(pool.submit(tx, TxOrigin::Http).unwrap_err(), PoolError::NonceGap);
    }

    #[tokio::test]
    async fn eip_replacement_requires_minimum_bump() {
        let (pool, ledger) = make_pool(PoolConfig::default());
        let payer = Address::new([9u8; 20]);
        ledger.set_balance(payer, 1_000_000);

        let original = eip_tx(payer, 0, 100, 100);
        let original_rx = pool.submit(original, TxOrigin::Http).unwrap();

        // +1% bump: below the 10% minimum, rejected outright.
        let small_bump = eip_tx(payer, 0, 101, 100);
        assert_eq!(pool.submit(small_bump, TxOrigin::Http).unwrap_err(), PoolError::DuplicateNonce);

        // +20% bump: accepted, and the original is notified it was replaced.
        let big_bump = eip_tx(payer, 0, 120, 100);
        let replacement_rx = pool.submit(big_bump, TxOrigin::Http).unwrap();

        assert_eq!(original_rx.await.unwrap(), Err(PoolError::ReplacedByHigherNonce));
        assert_eq!(replacement_rx.await.unwrap(), Ok(()));
        assert_eq!(pool.verified_list_size(), 1);
    }

    #[tokio::test]
    async fn eip_replacement_accepts_exact_minimum_bump() {
        let (pool, ledger) = make_pool(PoolConfig::default());
        let payer = Address::new([11u8; 20]);
        ledger.set_balance(payer, 1_000_000);

        let original = eip_tx(payer, 5, 10, 100);
        let original_rx = pool.submit(original, TxOrigin::Http).unwrap();

        // Exactly +10%: at the minimum bump, must be accepted as a replacement.
        let replacement = eip_tx(payer, 5, 11, 100);
        let replacement_rx = pool.submit(replacement, TxOrigin::Http).unwrap();

        assert_eq!(original_rx.await.unwrap(), Err(PoolError::ReplacedByHigherNonce));
        assert_eq!(replacement_rx.await.unwrap(), Ok(()));
        assert_eq!(pool.verified_list_size(), 1);
    }

    #[tokio::test]
    async fn take_block_txs_respects_limit_and_fifo_order() {
        let (pool, ledger) = make_pool(PoolConfig::default());
        let mut rxs = Vec::new();
        for seed in 1..=3u8 {
            let tx = native_tx(seed, 10, 100);
            ledger.set_balance(tx.payer, 10_000);
            rxs.push((tx.hash, pool.submit(tx, TxOrigin::Http).unwrap()));
        }
        for (_, rx) in rxs.drain(..) {
            rx.await.unwrap().unwrap();
        }

        let ready = pool.take_block_txs(2, 1);
        assert_eq!(ready.len(), 2);
        assert_eq!(pool.verified_list_size(), 1);
    }

    #[tokio::test]
    async fn verify_block_rejects_low_gas_price() {
        let (pool, _ledger) = make_pool(PoolConfig::default());
        pool.set_gas_price_threshold(50);
        let tx = native_tx(1, 10, 100);
        let result = pool.verify_block(&[tx], 0).await;
        assert_eq!(result.first_failure, Some((0, PoolError::GasPrice)));
    }

    #[tokio::test]
    async fn verify_block_rejects_duplicate_hash_within_batch() {
        let (pool, _ledger) = make_pool(PoolConfig::default());
        let tx = native_tx(1, 10, 100);
        let result = pool.verify_block(&[tx.clone(), tx], 0).await;
        assert_eq!(result.first_failure, Some((1, PoolError::DoubleSpend)));
    }

    #[tokio::test]
    async fn on_block_committed_clears_verified_and_advances_nonce() {
        let (pool, ledger) = make_pool(PoolConfig::default());
        let payer = Address::new([3u8; 20]);
        ledger.set_balance(payer, 10_000);
        let tx = eip_tx(payer, 0, 10, 100);
        let rx = pool.submit(tx.clone(), TxOrigin::Http).unwrap();
        rx.await.unwrap().unwrap();
        assert_eq!(pool.verified_list_size(), 1);

        pool.on_block_committed(&[tx], 1);
        assert_eq!(pool.verified_list_size(), 0);
        assert_eq!(pool.current_height(), 1);

        ledger.set_nonce(payer, 1);
        let next = eip_tx(payer, 1, 10, 100);
        let rx = pool.submit(next, TxOrigin::Http).unwrap();
        assert_eq!(rx.await.unwrap(), Ok(()));
    }
}
