//! Binary encodings for the records this crate persists, matching the
//! wire layout fixed by the external interface contract: little-endian
//! integers, raw 32-byte hash fields.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use merkle_accumulator::Snapshot;
use node_crypto::HashValue;
use node_types::bufpool::{BufferPool, PooledBuffer};
use std::convert::TryFrom;
use std::io::{Cursor, Write};

pub fn encode_snapshot(pool: &BufferPool, snapshot: &Snapshot) -> PooledBuffer {
    let mut buf = pool.get();
    buf.reserve(4 + snapshot.frozen_subtree_roots.len() * 32);
    buf.write_u32::<LittleEndian>(snapshot.frozen_subtree_roots.len() as u32)
        .expect("write to Vec cannot fail");
    for hash in &snapshot.frozen_subtree_roots {
        buf.write_all(hash.as_slice()).expect("write to Vec cannot fail");
    }
    buf
}

pub fn decode_snapshot(num_leaves: u64, bytes: &[u8]) -> anyhow::Result<Snapshot> {
    let mut cursor = Cursor::new(bytes);
    let count = cursor.read_u32::<LittleEndian>()?;
    let mut roots = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mut raw = [0u8; 32];
        std::io::Read::read_exact(&mut cursor, &mut raw)?;
        roots.push(HashValue::new(raw));
    }
    Ok(Snapshot {
        num_leaves,
        frozen_subtree_roots: roots,
    })
}

pub fn encode_leaves(pool: &BufferPool, leaves: &[HashValue]) -> PooledBuffer {
    let mut buf = pool.get();
    buf.reserve(leaves.len() * 32);
    for leaf in leaves {
        buf.extend_from_slice(leaf.as_slice());
    }
    buf
}

pub fn decode_leaves(bytes: &[u8]) -> anyhow::Result<Vec<HashValue>> {
    anyhow::ensure!(bytes.len() % 32 == 0, "leaf store length not a multiple of 32");
    bytes
        .chunks_exact(32)
        .map(HashValue::try_from)
        .map(|r| r.map_err(anyhow::Error::from))
        .collect()
}

/// `(block_hash, height)` — the current-block record.
pub fn encode_current_block(pool: &BufferPool, block_hash: HashValue, height: u64) -> PooledBuffer {
    let mut buf = pool.get();
    buf.reserve(40);
    buf.extend_from_slice(block_hash.as_slice());
    buf.write_u64::<LittleEndian>(height).expect("write to Vec cannot fail");
    buf
}

pub fn decode_current_block(bytes: &[u8]) -> anyhow::Result<(HashValue, u64)> {
    anyhow::ensure!(bytes.len() == 40, "current-block record must be 40 bytes");
    let hash = HashValue::try_from(&bytes[..32])?;
    let height = (&bytes[32..]).read_u64::<LittleEndian>()?;
    Ok((hash, height))
}

/// `write_set_hash ∥ state_root` keyed by height.
pub fn encode_height_state_root(pool: &BufferPool, write_set_hash: HashValue, state_root: HashValue) -> PooledBuffer {
    let mut buf = pool.get();
    buf.reserve(64);
    buf.extend_from_slice(write_set_hash.as_slice());
    buf.extend_from_slice(state_root.as_slice());
    buf
}

pub fn decode_height_state_root(bytes: &[u8]) -> anyhow::Result<(HashValue, HashValue)> {
    anyhow::ensure!(bytes.len() == 64, "height state-root record must be 64 bytes");
    Ok((HashValue::try_from(&bytes[..32])?, HashValue::try_from(&bytes[32..])?))
}

pub fn height_key(prefix: u8, height: u64) -> Vec<u8> {
    let mut buf = vec![prefix];
    buf.write_u32::<LittleEndian>(height as u32).expect("write to Vec cannot fail");
    buf
}
