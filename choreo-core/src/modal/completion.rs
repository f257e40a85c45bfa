//! Transition-completion events.
//!
//! The renderer reports "transition on property P of element E ended" here;
//! modal hosts wait on it instead of guessing durations.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

use crate::error::{MotionError, Result};
use crate::platform::{ElementId, ElementRef};

struct Waiter {
    element: ElementId,
    property: String,
    tx: oneshot::Sender<()>,
}

/// Hub for transition-end notifications.
#[derive(Default)]
pub struct TransitionEvents {
    waiters: Mutex<Vec<Waiter>>,
}

impl TransitionEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the next transition end of `property` on `element`.
    ///
    /// The waiter is registered before this returns, so a dispatch that
    /// lands before the future is first polled is not lost. Under reduced
    /// motion nothing animates and the returned future is ready at once.
    pub fn wait_for(&self, element: &ElementRef, property: &str, reduced_motion: bool) -> TransitionEnd {
        if reduced_motion {
            return TransitionEnd { rx: None };
        }
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().push(Waiter {
            element: element.id(),
            property: property.to_owned(),
            tx,
        });
        TransitionEnd { rx: Some(rx) }
    }

    /// Report a finished transition. Returns how many waiters it woke.
    pub fn dispatch(&self, element: ElementId, property: &str) -> usize {
        let fired: Vec<Waiter> = {
            let mut waiters = self.waiters.lock();
            let (fired, kept): (Vec<Waiter>, Vec<Waiter>) = waiters
                .drain(..)
                .filter(|waiter| !waiter.tx.is_closed())
                .partition(|waiter| waiter.element == element && waiter.property == property);
            *waiters = kept;
            fired
        };

        let woken = fired
            .into_iter()
            .filter_map(|waiter| waiter.tx.send(()).ok())
            .count();
        trace!(%element, property, woken, "transition end");
        woken
    }

    /// Drop every waiter; their futures resolve to `TransitionCancelled`.
    pub fn cancel_all(&self) {
        self.waiters.lock().clear();
    }

    pub fn pending(&self) -> usize {
        self.waiters.lock().len()
    }
}

impl std::fmt::Debug for TransitionEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionEvents")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Resolves when the awaited transition ends.
#[derive(Debug)]
pub struct TransitionEnd {
    rx: Option<oneshot::Receiver<()>>,
}

impl TransitionEnd {
    /// True when no transition is awaited (reduced motion).
    pub fn is_immediate(&self) -> bool {
        self.rx.is_none()
    }
}

impl Future for TransitionEnd {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.rx.as_mut() {
            None => Poll::Ready(Ok(())),
            Some(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.map_err(|_| MotionError::TransitionCancelled)),
        }
    }
}
