//! Reserved one-byte key prefixes partitioning the single-column-family
//! keyspace. Namespace separation is by key-prefix byte, not by RocksDB
//! column family, since external readers address records by prefixed
//! key.

pub const CURRENT_BLOCK: u8 = 0x01;
pub const BLOCK_MERKLE_SNAPSHOT: u8 = 0x02;
pub const STATE_MERKLE_SNAPSHOT: u8 = 0x03;
pub const STATE_ROOT_BY_HEIGHT: u8 = 0x04;
pub const CONTRACT: u8 = 0x05;
pub const STORAGE: u8 = 0x06;
pub const BOOKKEEPER: u8 = 0x07;
