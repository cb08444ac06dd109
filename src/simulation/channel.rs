//! Single-slot hand-off channels between the simulation loop and an outside
//! consumer.
//!
//! The slot holds at most one value. Publishing into a full slot evicts the
//! unread value, so a slow consumer always sees the freshest one and the
//! producer never blocks.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use log::trace;

/// What happened to a published value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The slot was empty
    Delivered,
    /// An unread value was evicted to make room
    Replaced,
    /// The consumer is gone, or the slot refilled under us
    Dropped,
}

pub struct SlotSender<T> {
    tx: Sender<T>,
    /// Producer-side handle on the slot, used only for eviction
    evict: Receiver<T>,
}

pub struct SlotReceiver<T> {
    rx: Receiver<T>,
}

/// Create a connected sender/receiver pair around one capacity-1 slot
pub fn slot<T>() -> (SlotSender<T>, SlotReceiver<T>) {
    let (tx, rx) = bounded(1);
    let evict = rx.clone();
    (SlotSender { tx, evict }, SlotReceiver { rx })
}

impl<T> SlotSender<T> {
    /// Non-blocking publish with replace-oldest semantics
    pub fn publish(&self, value: T) -> Delivery {
        match self.tx.try_send(value) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Disconnected(_)) => Delivery::Dropped,
            Err(TrySendError::Full(value)) => {
                let evicted = self.evict.try_recv().is_ok();
                match self.tx.try_send(value) {
                    Ok(()) if evicted => Delivery::Replaced,
                    Ok(()) => Delivery::Delivered,
                    Err(_) => {
                        trace!("slot refilled during eviction; value dropped");
                        Delivery::Dropped
                    }
                }
            }
        }
    }
}

impl<T> SlotReceiver<T> {
    /// Take the pending value if there is one
    pub fn try_take(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for a value
    pub fn wait(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}
