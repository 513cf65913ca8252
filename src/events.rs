//! Typed change notifications with drop-based unsubscribe.
//!
//! Every subscriber gets its own channel. Dropping a [`Subscription`] closes
//! the channel and the next [`Listeners::emit`] forgets the sender.

use std::sync::mpsc::{self, Receiver, Sender};

/// The emitting side: a set of subscriber channels.
#[derive(Debug)]
pub struct Listeners<T> {
    senders: Vec<Sender<T>>,
}

impl<T: Clone> Listeners<T> {
    pub const fn new() -> Self {
        Self {
            senders: Vec::new(),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&mut self) -> Subscription<T> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        Subscription { rx }
    }

    /// Deliver `event` to every live subscriber, pruning closed ones.
    pub fn emit(&mut self, event: &T) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of subscribers that were live at the last emit.
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

impl<T: Clone> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The receiving side of one subscriber.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: Receiver<T>,
}

impl<T> Subscription<T> {
    /// Next queued event, if any.
    pub fn try_next(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Take every queued event.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_subscriber_sees_every_event() {
        let mut listeners = Listeners::new();
        let a = listeners.subscribe();
        let b = listeners.subscribe();
        listeners.emit(&1);
        listeners.emit(&2);
        assert_eq!(a.drain(), vec![1, 2]);
        assert_eq!(b.drain(), vec![1, 2]);
        assert!(a.try_next().is_none());
    }

    #[test]
    fn test_dropped_subscription_is_pruned_on_emit() {
        let mut listeners = Listeners::new();
        let kept = listeners.subscribe();
        let dropped = listeners.subscribe();
        assert_eq!(listeners.len(), 2);
        drop(dropped);
        listeners.emit(&"hello");
        assert_eq!(listeners.len(), 1);
        assert_eq!(kept.try_next(), Some("hello"));
    }
}
