//! One-shot "the map is ready" signal.
//!
//! The bootstrap side keeps the [`ReadySignal`] and fires it once the surface
//! can take primitives. Any number of layers hold clones of [`MapReady`] and
//! await it before their first animation cycle.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};

use crate::error::BootstrapAborted;

pub fn map_ready() -> (ReadySignal, MapReady) {
    let (tx, rx) = oneshot::channel();
    (ReadySignal { tx }, MapReady { rx: rx.shared() })
}

#[derive(Debug)]
pub struct ReadySignal {
    tx: oneshot::Sender<()>,
}

impl ReadySignal {
    pub fn fire(self) {
        // Every waiter may already be gone; nothing to report then.
        let _ = self.tx.send(());
    }
}

/// Resolves once the paired [`ReadySignal`] fires, or errors if it was dropped unfired.
#[derive(Clone, Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct MapReady {
    rx: Shared<oneshot::Receiver<()>>,
}

impl MapReady {
    /// A signal that has already fired.
    pub fn already() -> Self {
        let (signal, ready) = map_ready();
        signal.fire();
        ready
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.rx.peek(), Some(Ok(())))
    }
}

impl Future for MapReady {
    type Output = Result<(), BootstrapAborted>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.map_err(|_| BootstrapAborted))
    }
}
