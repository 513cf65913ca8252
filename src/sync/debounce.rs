use std::time::{Duration, Instant};

/// A single-slot debounced queue.
///
/// Holds at most one pending value and its deadline. Every [`push`](Self::push)
/// overwrites the value and restarts the delay; [`take_ready`](Self::take_ready)
/// hands the value out once its deadline has passed.
#[derive(Debug, Clone)]
pub struct Debounced<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debounced<T> {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Queue `value`, replacing anything pending, due `delay` after `now`.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// Queue `value` with an explicit deadline.
    pub fn push_until(&mut self, value: T, deadline: Instant) {
        self.pending = Some((value, deadline));
    }

    /// Take the pending value if its deadline has passed.
    pub fn take_ready(&mut self, now: Instant) -> Option<T> {
        let (_, deadline) = self.pending.as_ref()?;
        if now >= *deadline {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    /// Drop the pending value.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref().map(|(value, _)| value)
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }
}
