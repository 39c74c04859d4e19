//! Handler dispatch utilities.
//!
//! Every handler registered with the broker gets its own worker task fed by
//! an unbounded queue. The worker invokes the handler once per event, in
//! publish order, and isolates each invocation in a spawned task so that a
//! failing or panicking handler cannot take down the worker, other
//! handlers, or the publisher.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use super::EventHandler;
use crate::event::Event;

/// Message sent to a handler worker.
#[derive(Debug)]
pub(crate) enum Envelope {
    /// Deliver an event to the handler.
    Event(Arc<Event>),
    /// Acknowledge once everything queued before has been handled.
    Flush(oneshot::Sender<()>),
}

/// Outcome of a single handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    /// Handler completed successfully.
    Success,
    /// Handler returned an error.
    HandlerFailed,
    /// Handler panicked, either while building its future or while running it.
    Panicked,
}

impl DispatchResult {
    /// Returns true if the handler succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Invoke a handler for one event, containing errors and panics.
pub async fn dispatch_isolated(handler: &Arc<dyn EventHandler>, event: Arc<Event>) -> DispatchResult {
    let sequence = event.sequence;

    let future = match std::panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
        Ok(future) => future,
        Err(_) => {
            error!(handler = handler.name(), event.sequence = sequence, "Handler panicked");
            return DispatchResult::Panicked;
        }
    };

    match tokio::spawn(future).await {
        Ok(Ok(())) => DispatchResult::Success,
        Ok(Err(e)) => {
            warn!(
                handler = handler.name(),
                event.sequence = sequence,
                error = %e,
                "Handler failed"
            );
            DispatchResult::HandlerFailed
        }
        Err(join_error) => {
            error!(
                handler = handler.name(),
                event.sequence = sequence,
                error = %join_error,
                "Handler panicked"
            );
            DispatchResult::Panicked
        }
    }
}

/// Spawn the worker task for a handler and return its queue.
///
/// The worker stops once every sender of the queue is dropped.
pub(crate) fn spawn_worker(handler: Arc<dyn EventHandler>) -> mpsc::UnboundedSender<Envelope> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();

    tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            match envelope {
                Envelope::Event(event) => {
                    dispatch_isolated(&handler, event).await;
                }
                Envelope::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!(handler = handler.name(), "Handler queue closed, worker stopping");
    });

    tx
}
