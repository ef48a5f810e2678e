//! A reusable byte-buffer pool for the encode/decode paths in the KV
//! adapter and write-set hashing. Checked-out buffers come back with
//! length reset to zero; released buffers return their capacity to the
//! pool instead of being freed. Safe for concurrent `get`/`put`.

use node_infallible::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

struct Inner {
    free: Mutex<Vec<Vec<u8>>>,
}

#[derive(Clone)]
pub struct BufferPool(Arc<Inner>);

impl BufferPool {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            free: Mutex::new(Vec::new()),
        }))
    }

    pub fn get(&self) -> PooledBuffer {
        let buf = self.0.free.lock().pop().unwrap_or_default();
        PooledBuffer {
            buf: Some(buf),
            pool: self.0.clone(),
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PooledBuffer {
    buf: Option<Vec<u8>>,
    pool: Arc<Inner>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        self.buf.as_ref().expect("buffer taken")
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        self.buf.as_mut().expect("buffer taken")
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(mut buf) = self.buf.take() {
            buf.clear();
            self.pool.free.lock().push(buf);
        }
    }
}
