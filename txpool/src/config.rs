#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_pending: usize,
    pub stateless_workers: usize,
    pub stateful_workers: usize,
    pub stale_threshold: u64,
    pub update_frequency: u64,
    pub initial_gas_price_threshold: u64,
    pub broadcast_on_relay: bool,
    /// Minimum gas-price bump (expressed as a percentage over the
    /// existing transaction's price, e.g. 10 = 10%) required for a
    /// same-nonce transaction to replace one already admitted.
    pub replacement_bump_percent: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_pending: 4096,
            stateless_workers: 2,
            stateful_workers: 1,
            stale_threshold: 10,
            update_frequency: 50,
            initial_gas_price_threshold: 0,
            broadcast_on_relay: false,
            replacement_bump_percent: 10,
        }
    }
}
