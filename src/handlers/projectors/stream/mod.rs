//! Live event streams for connected users.
//!
//! The [`SubscriptionRegistry`] keeps at most one subscription per user and
//! forwards every broker event to the subscriptions it concerns: directed
//! events only to their receiver, everything else to everyone. Each
//! subscription is a bounded channel; the consuming side is an
//! [`EventStream`].
//!
//! Delivery waits for channel capacity rather than dropping events, so a
//! consumer that stops reading holds up delivery to everyone until it is
//! unsubscribed, replaced, or dropped. Each pending send is raced against
//! the subscription's shutdown signal so any of those releases it.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::future::{join_all, BoxFuture};
use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::bus::{BusError, EventHandler};
use crate::config::{SubscriptionConfig, DEFAULT_CHANNEL_CAPACITY};
use crate::event::{Event, EventKind, UserId};

type SubscriberMap = HashMap<UserId, Subscriber>;

/// Subscriber registration.
struct Subscriber {
    sender: mpsc::Sender<Arc<Event>>,
    /// Dropped together with the registration; wakes the cleanup task and
    /// any delivery still waiting on this channel.
    shutdown: watch::Sender<()>,
}

/// Registry of per-user event channels.
pub struct SubscriptionRegistry {
    subscriptions: Arc<RwLock<SubscriberMap>>,
    channel_capacity: usize,
}

impl SubscriptionRegistry {
    /// Create a registry whose channels buffer `channel_capacity` events.
    /// A capacity of 0 selects the default.
    pub fn new(channel_capacity: usize) -> Self {
        let channel_capacity = if channel_capacity == 0 {
            DEFAULT_CHANNEL_CAPACITY
        } else {
            channel_capacity
        };

        Self {
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            channel_capacity,
        }
    }

    pub fn from_config(config: &SubscriptionConfig) -> Self {
        Self::new(config.channel_capacity)
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    /// Open the event stream for `user_id`.
    ///
    /// An existing subscription for the same user is closed before the new
    /// one is registered. Dropping the returned stream unsubscribes it.
    pub async fn subscribe(&self, user_id: UserId) -> EventStream {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let (shutdown, shutdown_rx) = watch::channel(());
        let (disconnect, disconnected) = oneshot::channel();
        let weak_tx = tx.downgrade();
        let mut cleanup_shutdown = shutdown_rx.clone();

        let replaced = {
            let mut subs = self.subscriptions.write().await;
            // The previous channel closes before the new one is registered.
            let replaced = subs.remove(&user_id).is_some();
            subs.insert(
                user_id,
                Subscriber {
                    sender: tx,
                    shutdown,
                },
            );
            replaced
        };

        if replaced {
            info!(user = %user_id, "Subscription replaced, previous stream closed");
        } else {
            info!(user = %user_id, "Subscription registered");
        }

        // Removes the registration once the consumer goes away. Holds only
        // weak references so that dropping the registry ends every stream.
        let subscriptions = Arc::downgrade(&self.subscriptions);
        tokio::spawn(async move {
            tokio::select! {
                _ = disconnected => {
                    remove_if_current(&subscriptions, user_id, &weak_tx).await;
                }
                _ = cleanup_shutdown.changed() => {}
            }
        });

        EventStream::new(user_id, rx, shutdown_rx, disconnect)
    }

    /// Close and remove the subscription for `user_id`, if any.
    ///
    /// The stream ends as soon as this returns, after yielding whatever it
    /// had already buffered.
    pub async fn unsubscribe(&self, user_id: UserId) {
        let removed = self.subscriptions.write().await.remove(&user_id);
        if removed.is_some() {
            info!(user = %user_id, "Subscription removed");
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    pub async fn is_subscribed(&self, user_id: UserId) -> bool {
        self.subscriptions.read().await.contains_key(&user_id)
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

async fn remove_if_current(
    subscriptions: &Weak<RwLock<SubscriberMap>>,
    user_id: UserId,
    sender: &mpsc::WeakSender<Arc<Event>>,
) {
    let Some(subscriptions) = subscriptions.upgrade() else {
        return;
    };

    let mut subs = subscriptions.write().await;
    if subs
        .get(&user_id)
        .is_some_and(|s| sender.upgrade().is_some_and(|tx| s.sender.same_channel(&tx)))
    {
        subs.remove(&user_id);
        info!(user = %user_id, "Subscriber disconnected, cleaning up subscription");
    }
}

/// One pending delivery, detached from the registry lock.
struct Delivery {
    user_id: UserId,
    sender: mpsc::Sender<Arc<Event>>,
    shutdown: watch::Receiver<()>,
}

impl Delivery {
    async fn send(mut self, event: Arc<Event>) -> bool {
        tokio::select! {
            result = self.sender.send(event) => result.is_ok(),
            _ = self.shutdown.changed() => {
                debug!(user = %self.user_id, "Subscription closed while delivery was pending");
                false
            }
        }
    }
}

fn deliveries(subs: &SubscriberMap, event: &Event) -> Vec<Delivery> {
    let delivery = |(user_id, sub): (&UserId, &Subscriber)| Delivery {
        user_id: *user_id,
        sender: sub.sender.clone(),
        shutdown: sub.shutdown.subscribe(),
    };

    match event.kind.receiver() {
        Some(receiver) => subs.get_key_value(&receiver).map(delivery).into_iter().collect(),
        None => subs.iter().map(delivery).collect(),
    }
}

impl EventHandler for SubscriptionRegistry {
    fn name(&self) -> &str {
        "subscriptions"
    }

    fn handle(&self, event: Arc<Event>) -> BoxFuture<'static, Result<(), BusError>> {
        let subscriptions = Arc::clone(&self.subscriptions);

        Box::pin(async move {
            let targets = deliveries(&*subscriptions.read().await, &event);
            if targets.is_empty() {
                return Ok(());
            }

            let attempted = targets.len();
            let sent = join_all(
                targets
                    .into_iter()
                    .map(|delivery| delivery.send(Arc::clone(&event))),
            )
            .await
            .into_iter()
            .filter(|sent| *sent)
            .count();

            debug!(
                event.sequence = event.sequence,
                event.kind = event.kind.name(),
                sent,
                attempted,
                "Event delivered to subscribers"
            );
            Ok(())
        })
    }
}

/// Consuming side of a subscription.
///
/// Yields events in broker order, skipping the subscriber's own typing
/// indications. Ends with `None` once the subscription is closed.
pub struct EventStream {
    user_id: UserId,
    inner: ReceiverStream<Arc<Event>>,
    /// Errors once the registration is gone.
    shutdown: watch::Receiver<()>,
    /// Dropped with the stream; tells the registry the consumer left.
    _disconnect: oneshot::Sender<()>,
}

impl EventStream {
    fn new(
        user_id: UserId,
        rx: mpsc::Receiver<Arc<Event>>,
        shutdown: watch::Receiver<()>,
        disconnect: oneshot::Sender<()>,
    ) -> Self {
        Self {
            user_id,
            inner: ReceiverStream::new(rx),
            shutdown,
            _disconnect: disconnect,
        }
    }

    /// The subscribed user.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Receive the next event, or `None` once the subscription is closed.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        self.next().await
    }

    fn is_own_typing(&self, event: &Event) -> bool {
        matches!(&event.kind, EventKind::UserTyping(t) if t.user_id == self.user_id)
    }
}

impl Stream for EventStream {
    type Item = Arc<Event>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.inner.poll_next_unpin(cx) {
                Poll::Ready(Some(event)) if this.is_own_typing(&event) => continue,
                Poll::Ready(next) => return Poll::Ready(next),
                // A delivery still in flight may hold a sender; stop
                // accepting and drain what is left.
                Poll::Pending if this.shutdown.has_changed().is_err() => this.inner.close(),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
