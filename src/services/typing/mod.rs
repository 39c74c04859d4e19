//! Typing indicator debouncing.
//!
//! Clients report typing on every keystroke but rarely report stopping.
//! The debouncer turns that into a clean start/stop signal per user: each
//! "typing" report re-arms an expiry timer, and when the timer runs out
//! without a newer report the user is reported as no longer typing.
//!
//! Every user has one signal queue drained by its own task. Reports and
//! expiries are enqueued under the timer lock, so callbacks observe them
//! in the order they happened even when a callback is slow.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::bus::Publisher;
use crate::config::{TypingConfig, DEFAULT_TYPING_TIMEOUT_SECS};
use crate::event::{EventKind, UserDetails, UserId, UserTyping};

/// Default time after which an unrefreshed typing indication expires.
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TYPING_TIMEOUT_SECS);

type TypingCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// A start/stop signal waiting for its callback to run.
struct Signal {
    typing: bool,
    callback: TypingCallback,
}

/// Per-user debounce state. Created on first use and kept for the
/// lifetime of the debouncer.
struct TypingTimer {
    /// Bumped on every indication; an expiry only fires for the generation
    /// that armed it.
    generation: u64,
    expiry: Option<JoinHandle<()>>,
    signals: mpsc::UnboundedSender<Signal>,
}

impl TypingTimer {
    fn new(user_id: UserId) -> Self {
        let (signals, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_signals(user_id, rx));

        Self {
            generation: 0,
            expiry: None,
            signals,
        }
    }

    fn signal(&self, typing: bool, callback: TypingCallback) {
        // The drain task only exits once this sender is gone.
        let _ = self.signals.send(Signal { typing, callback });
    }
}

/// Run the queued callbacks of one user, one at a time.
async fn run_signals(user_id: UserId, mut rx: mpsc::UnboundedReceiver<Signal>) {
    while let Some(Signal { typing, callback }) = rx.recv().await {
        if std::panic::catch_unwind(AssertUnwindSafe(|| callback(typing))).is_err() {
            error!(user = %user_id, typing, "Typing callback panicked");
        }
    }
}

/// Debounces typing indications per user.
///
/// Callbacks run on spawned tasks and never on the caller's stack, so they
/// may freely publish events. Must be used inside a Tokio runtime.
pub struct TypingDebouncer {
    timeout: Duration,
    timers: Arc<Mutex<HashMap<UserId, TypingTimer>>>,
}

impl TypingDebouncer {
    /// Create a debouncer. A zero timeout selects the default of 5 seconds.
    pub fn new(timeout: Duration) -> Self {
        let timeout = if timeout.is_zero() {
            DEFAULT_TYPING_TIMEOUT
        } else {
            timeout
        };

        Self {
            timeout,
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &TypingConfig) -> Self {
        Self::new(config.timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Report that `user_id` started (`typing == true`) or stopped typing.
    ///
    /// `callback` is invoked once with `typing` straight away. A `true`
    /// report also arms an expiry: unless another report for the same user
    /// arrives within the timeout, `callback(false)` is invoked exactly once
    /// when it runs out. Any report cancels the expiry armed by the
    /// previous one.
    ///
    /// Callbacks for one user run in report order, never concurrently.
    pub fn indicate_typing<F>(&self, user_id: UserId, typing: bool, callback: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let callback: TypingCallback = Arc::new(callback);

        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        let timer = timers
            .entry(user_id)
            .or_insert_with(|| TypingTimer::new(user_id));

        if let Some(expiry) = timer.expiry.take() {
            expiry.abort();
        }
        timer.generation = timer.generation.wrapping_add(1);
        let generation = timer.generation;

        timer.signal(typing, Arc::clone(&callback));

        if typing {
            let all_timers = Arc::clone(&self.timers);
            let timeout = self.timeout;
            timer.expiry = Some(tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if expire(&all_timers, user_id, generation, callback) {
                    debug!(user = %user_id, "Typing indication expired");
                }
            }));
        }
    }

    /// Report a typing indication and publish the debounced result as
    /// `UserTyping` events.
    pub fn publish_typing(
        &self,
        publisher: Arc<dyn Publisher>,
        user_id: UserId,
        details: UserDetails,
        receiver_id: Option<UserId>,
        typing: bool,
    ) {
        self.indicate_typing(user_id, typing, move |typing| {
            publisher.publish(EventKind::UserTyping(UserTyping {
                user_id,
                details: details.clone(),
                receiver_id,
                typing,
            }));
        });
    }

    /// Number of users that have ever reported typing.
    pub fn tracked_users(&self) -> usize {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for TypingDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_TIMEOUT)
    }
}

/// Queue the stop signal of `user_id` if `generation` is still the latest.
fn expire(
    timers: &Mutex<HashMap<UserId, TypingTimer>>,
    user_id: UserId,
    generation: u64,
    callback: TypingCallback,
) -> bool {
    let mut timers = timers.lock().unwrap_or_else(PoisonError::into_inner);
    match timers.get_mut(&user_id) {
        Some(timer) if timer.generation == generation => {
            timer.expiry = None;
            timer.signal(false, callback);
            true
        }
        _ => false,
    }
}
