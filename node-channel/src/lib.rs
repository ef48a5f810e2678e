//! A bounded mpsc channel that reports its queue depth as a metric,
//! grounded on the node's own resolution of "use the platform's
//! idiomatic MPSC rather than hand-rolling a lock-free queue" (see
//! the design notes on the original's intrusive MPSC implementation).

use futures::stream::Stream;
use futures::task::{Context, Poll};
use node_metrics::OpMetrics;
use once_cell::sync::Lazy;
use std::pin::Pin;
use tokio::sync::mpsc;

static OP_COUNTERS: Lazy<OpMetrics> = Lazy::new(|| OpMetrics::new_and_registered("node_channel"));

pub struct Sender<T> {
    inner: mpsc::Sender<T>,
    name: &'static str,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            name: self.name,
        }
    }
}

impl<T> Sender<T> {
    /// Non-blocking send; returns the value back on `Err` if the
    /// channel is full or the receiver has been dropped.
    pub fn try_send(&self, value: T) -> Result<(), T> {
        match self.inner.try_send(value) {
            Ok(()) => {
                OP_COUNTERS.gauge(&format!("{}_queue_depth", self.name)).inc();
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(v)) => {
                OP_COUNTERS.counter(&format!("{}_dropped", self.name)).inc();
                Err(v)
            }
            Err(mpsc::error::TrySendError::Closed(v)) => Err(v),
        }
    }

    pub async fn send(&self, value: T) -> Result<(), mpsc::error::SendError<T>> {
        let result = self.inner.send(value).await;
        if result.is_ok() {
            OP_COUNTERS.gauge(&format!("{}_queue_depth", self.name)).inc();
        }
        result
    }
}

pub struct Receiver<T> {
    inner: mpsc::Receiver<T>,
    name: &'static str,
}

impl<T> Receiver<T> {
    pub async fn recv(&mut self) -> Option<T> {
        let value = self.inner.recv().await;
        if value.is_some() {
            OP_COUNTERS.gauge(&format!("{}_queue_depth", self.name)).dec();
        }
        value
    }
}

impl<T> Stream for Receiver<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let poll = self.inner.poll_recv(cx);
        if let Poll::Ready(Some(_)) = &poll {
            OP_COUNTERS.gauge(&format!("{}_queue_depth", self.name)).dec();
        }
        poll
    }
}

/// Creates a bounded channel labeled `name` for metrics purposes.
pub fn new<T>(capacity: usize, name: &'static str) -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Sender { inner: tx, name }, Receiver { inner: rx, name })
}
