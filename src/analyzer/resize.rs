//! Resize notifications, delivered through per-subscriber channels.
//!
//! The host publishes the container's new content box; each live subscription
//! queues it until the owning analyzer drains it on its next tick.

#![allow(missing_docs)]

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use crate::render::surface::Rect;

#[derive(Debug, Default)]
struct Subscribers {
    next_id: u64,
    senders: Vec<(u64, Sender<Rect>)>,
}

/// Fan-out point for resize notifications. Clones share subscribers.
#[derive(Debug, Clone, Default)]
pub struct ResizeBus {
    inner: Arc<Mutex<Subscribers>>,
}

impl ResizeBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subscribe(&self) -> ResizeSubscription {
        let (tx, rx) = unbounded();
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.senders.push((id, tx));
        ResizeSubscription {
            id,
            rx,
            bus: Arc::clone(&self.inner),
        }
    }

    /// Queue `rect` for every live subscription. Returns how many received it.
    pub fn publish(&self, rect: Rect) -> usize {
        let mut inner = self.inner.lock();
        inner.senders.retain(|(_, tx)| tx.send(rect).is_ok());
        inner.senders.len()
    }

    #[must_use]
    pub fn live_subscriptions(&self) -> usize {
        self.inner.lock().senders.len()
    }
}

/// One subscriber's queue. Dropping it stops delivery.
#[derive(Debug)]
pub struct ResizeSubscription {
    id: u64,
    rx: Receiver<Rect>,
    bus: Arc<Mutex<Subscribers>>,
}

impl ResizeSubscription {
    /// Take every queued notification, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<Rect> {
        self.rx.try_iter().collect()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for ResizeSubscription {
    fn drop(&mut self) {
        let id = self.id;
        self.bus.lock().senders.retain(|(sid, _)| *sid != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_arrive_in_order() {
        let bus = ResizeBus::new();
        let sub = bus.subscribe();
        assert_eq!(bus.publish(Rect::new(100.0, 50.0)), 1);
        bus.publish(Rect::new(120.0, 50.0));
        assert_eq!(sub.pending(), 2);
        assert_eq!(
            sub.drain(),
            vec![Rect::new(100.0, 50.0), Rect::new(120.0, 50.0)]
        );
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn dropping_a_subscription_stops_delivery() {
        let bus = ResizeBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        assert_eq!(bus.live_subscriptions(), 2);
        drop(a);
        assert_eq!(bus.live_subscriptions(), 1);
        b.unsubscribe();
        assert_eq!(bus.live_subscriptions(), 0);
        assert_eq!(bus.publish(Rect::new(1.0, 1.0)), 0);
    }

    #[test]
    fn clones_share_subscribers() {
        let bus = ResizeBus::new();
        let publisher = bus.clone();
        let sub = bus.subscribe();
        publisher.publish(Rect::new(9.0, 9.0));
        assert_eq!(sub.drain().len(), 1);
        assert_eq!(publisher.live_subscriptions(), 1);
    }
}
