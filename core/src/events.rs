//! Block-committed notifications for external subscribers.

use quorumdb_types::TxId;
use std::sync::mpsc;

/// Events published by the lifecycle. One kind today; the websocket/API
/// layer consuming it is outside this crate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    BlockCommitted {
        height: u64,
        transactions: Vec<TxId>,
    },
}

/// Synchronous fan-out bus, decoupled from Commit's outcome.
///
/// Listeners are invoked inline on the committing thread and their
/// behavior can never fail Commit; long-running consumers should attach
/// through [`EventBus::subscribe_channel`] and drain on their own thread.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&Event) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&Event) + Send + Sync>) {
        self.listeners.push(listener);
    }

    /// Subscribe via an unbounded channel. Sends never block, and a
    /// dropped receiver is ignored, so a slow or dead consumer cannot
    /// stall block processing.
    pub fn subscribe_channel(&mut self) -> mpsc::Receiver<Event> {
        let (sender, receiver) = mpsc::channel();
        self.subscribe(Box::new(move |event| {
            let _ = sender.send(event.clone());
        }));
        receiver
    }

    pub fn emit(&self, event: &Event) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
