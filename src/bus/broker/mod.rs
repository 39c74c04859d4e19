//! In-memory event broker.
//!
//! Stamps published payloads with time and sequence, then hands a shared
//! reference to every registered handler without waiting for any of them.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::dispatch::{spawn_worker, Envelope};
use super::{EventHandler, Publisher};
use crate::event::{Event, EventKind, UserIdentifier};

/// Registered handler and the queue feeding its worker.
struct HandlerWorker {
    name: String,
    queue: mpsc::UnboundedSender<Envelope>,
}

/// Source of the broker's total order.
#[derive(Default)]
struct Clock {
    last_time: Option<DateTime<Utc>>,
    next_sequence: u64,
}

impl Clock {
    /// Next stamp; time never goes backwards even if the wall clock does.
    fn stamp(&mut self) -> (DateTime<Utc>, u64) {
        let now = Utc::now();
        let time = match self.last_time {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_time = Some(time);

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        (time, sequence)
    }
}

/// Fan-out hub for domain events.
///
/// Each handler is served by its own worker task, so handlers run
/// independently of each other and of the publisher. Events reach every
/// handler in publish order. Publishing after a handler registered
/// guarantees that handler sees the event; events published before
/// registration are never replayed.
///
/// Handler registration spawns a task and must happen inside a Tokio
/// runtime. Publishing never blocks and does not require one.
#[derive(Default)]
pub struct EventBroker {
    handlers: RwLock<Vec<HandlerWorker>>,
    clock: Mutex<Clock>,
}

impl EventBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for all events published from now on.
    pub fn handle(&self, handler: Arc<dyn EventHandler>) {
        let name = handler.name().to_string();
        let queue = spawn_worker(handler);

        let count = {
            let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
            handlers.push(HandlerWorker {
                name: name.clone(),
                queue,
            });
            handlers.len()
        };

        info!(handler = %name, handler_count = count, "Handler registered with broker");
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Wait until every handler has processed all events published so far.
    pub async fn flush(&self) {
        let acks: Vec<_> = {
            let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            handlers
                .iter()
                .filter_map(|worker| {
                    let (done_tx, done_rx) = oneshot::channel();
                    worker.queue.send(Envelope::Flush(done_tx)).ok()?;
                    Some(done_rx)
                })
                .collect()
        };

        join_all(acks).await;
    }
}

impl Publisher for EventBroker {
    #[tracing::instrument(name = "broker.publish", skip_all, fields(event.kind = kind.name()))]
    fn publish(&self, kind: EventKind) -> Arc<Event> {
        // The clock lock is held while enqueueing so that queue order
        // matches stamp order for every handler.
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        let (time, sequence) = clock.stamp();
        let event = Arc::new(Event::new(time, sequence, kind));

        match event.kind.user() {
            Some((id, details)) => info!(
                event.sequence = sequence,
                user = %UserIdentifier { id, details },
                receiver = ?event.kind.receiver(),
                "publish"
            ),
            None => info!(event.sequence = sequence, "publish"),
        }

        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        for worker in handlers.iter() {
            if worker
                .queue
                .send(Envelope::Event(Arc::clone(&event)))
                .is_err()
            {
                warn!(handler = %worker.name, "Handler worker stopped, event not delivered");
            }
        }
        debug!(
            event.sequence = sequence,
            handlers = handlers.len(),
            "Event queued for handlers"
        );

        event
    }
}
