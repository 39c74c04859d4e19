//! Mock publisher implementation for testing.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;

use super::Publisher;
use crate::event::{Event, EventKind};

/// Publisher that records every event instead of distributing it.
#[derive(Default)]
pub struct MockPublisher {
    published: Mutex<Vec<Arc<Event>>>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published_count(&self) -> usize {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn take_published(&self) -> Vec<Arc<Event>> {
        std::mem::take(&mut *self.published.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Publisher for MockPublisher {
    fn publish(&self, kind: EventKind) -> Arc<Event> {
        let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
        let event = Arc::new(Event::new(Utc::now(), published.len() as u64, kind));
        published.push(Arc::clone(&event));
        event
    }
}
