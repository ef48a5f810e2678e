//! A task spawner bounded to `capacity` concurrent futures, used for the
//! stateless and stateful validator pools so that neither can run more
//! than its configured number of checks at once regardless of how many
//! transactions are admitted simultaneously.

use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

#[derive(Clone)]
pub struct BoundedExecutor {
    semaphore: Arc<Semaphore>,
    executor: Handle,
}

impl BoundedExecutor {
    pub fn new(capacity: usize, executor: Handle) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            executor,
        }
    }

    /// Waits for a free slot, then spawns `future` onto the underlying
    /// runtime. The slot is held for the lifetime of the spawned task.
    pub async fn spawn<F>(&self, future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permit = self.acquire_permit().await.expect("semaphore closed");
        self.spawn_with_permit(future, permit)
    }

    /// Returns `None` immediately instead of waiting if every slot is busy.
    pub fn try_spawn<F>(&self, future: F) -> Option<tokio::task::JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permit = Arc::clone(&self.semaphore).try_acquire_owned().ok()?;
        Some(self.spawn_with_permit(future, permit))
    }

    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        Arc::clone(&self.semaphore).acquire_owned().await
    }

    fn spawn_with_permit<F>(
        &self,
        future: F,
        permit: OwnedSemaphorePermit,
    ) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.executor.spawn(async move {
            let result = future.await;
            drop(permit);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn caps_concurrency_at_capacity() {
        let executor = BoundedExecutor::new(2, Handle::current());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            handles.push(
                executor
                    .spawn(async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await,
            );
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn try_spawn_fails_when_saturated() {
        let executor = BoundedExecutor::new(1, Handle::current());
        let _h = executor
            .spawn(async { tokio::time::sleep(Duration::from_millis(100)).await })
            .await;
        assert!(executor.try_spawn(async {}).is_none());
    }
}
