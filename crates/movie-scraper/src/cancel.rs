//! Caller-driven cancellation.
//!
//! A `CancelHandle` flips a `tokio::sync::watch` flag; every clone of the
//! matching `CancelSignal` observes it. Operations race each network call
//! against the signal and report `ScrapeError::Cancelled` instead of a result.

use crate::error::ScrapeError;
use std::future::Future;
use tokio::sync::watch;

/// Trigger side of a cancellation pair
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observer side of a cancellation pair
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle/signal pair
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    /// Cancel every operation observing the paired signal
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested
    ///
    /// If the handle is dropped without cancelling, this never resolves.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run `fut` unless cancellation is requested first
    pub async fn guard<F, T>(&self, fut: F) -> Result<T, ScrapeError>
    where
        F: Future<Output = T>,
    {
        if self.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ScrapeError::Cancelled),
            out = fut => Ok(out),
        }
    }
}
