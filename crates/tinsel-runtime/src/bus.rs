use std::collections::{BTreeSet, HashMap};

use tinsel_core::{Edge, EntityId, InputMode, KeyCode, MouseButton};

/// The event a one-shot handler is being invoked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Firing {
    /// A broadcast with this name.
    Broadcast(String),
    /// A key transition or hold.
    Key {
        /// The key.
        code: KeyCode,
        /// Pressed, held, or released.
        mode: InputMode,
    },
    /// A pointer button transition or hold.
    Mouse {
        /// The button.
        button: MouseButton,
        /// Pressed, held, or released.
        mode: InputMode,
    },
    /// The handler's entity touches this side of the stage.
    Edge(Edge),
    /// The handler's entity touches another entity.
    Contact {
        /// The entity being touched.
        other: EntityId,
        /// Its name at detection time.
        other_name: String,
        /// Its entity type.
        other_type: String,
    },
}

/// Broadcast queue and history.
///
/// Broadcasts issued during a tick are queued and delivered in that tick's
/// dispatch phase. Anything still queued when the cascade limit is reached
/// stays queued for the next tick.
#[derive(Debug, Default)]
pub struct EventBus {
    queued: Vec<String>,
    fired: BTreeSet<String>,
    history: HashMap<String, u64>,
}

impl EventBus {
    /// An empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a broadcast issued at time `now`.
    pub fn broadcast(&mut self, name: impl Into<String>, now: u64) {
        let name = name.into();
        self.fired.insert(name.clone());
        self.history.insert(name.clone(), now);
        self.queued.push(name);
    }

    /// True if `name` was broadcast during the current tick.
    pub fn received(&self, name: &str) -> bool {
        self.fired.contains(name)
    }

    /// Time `name` was last broadcast.
    pub fn last_at(&self, name: &str) -> Option<u64> {
        self.history.get(name).copied()
    }

    /// Number of broadcasts waiting for delivery.
    pub fn pending(&self) -> usize {
        self.queued.len()
    }

    /// Take everything queued so far, in issue order.
    pub(crate) fn take_queued(&mut self) -> Vec<String> {
        std::mem::take(&mut self.queued)
    }

    /// Forget which broadcasts happened this tick. History is kept, and
    /// anything still queued counts as received again on the tick it is
    /// delivered.
    pub(crate) fn end_tick(&mut self) {
        self.fired = self.queued.iter().cloned().collect();
    }

    /// Drop queued broadcasts and per-tick state, as on a scene switch.
    pub(crate) fn reset_queue(&mut self) {
        self.queued.clear();
        self.fired.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_queues_and_records() {
        let mut bus = EventBus::new();
        bus.broadcast("go", 32);
        bus.broadcast("stop", 32);
        bus.broadcast("go", 48);

        assert!(bus.received("go"));
        assert!(!bus.received("jump"));
        assert_eq!(bus.last_at("go"), Some(48));
        assert_eq!(bus.pending(), 3);
        assert_eq!(bus.take_queued(), vec!["go", "stop", "go"]);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn end_tick_keeps_history() {
        let mut bus = EventBus::new();
        bus.broadcast("go", 16);
        bus.end_tick();
        assert!(!bus.received("go"));
        assert_eq!(bus.last_at("go"), Some(16));
    }

    #[test]
    fn carried_over_broadcasts_stay_received() {
        let mut bus = EventBus::new();
        bus.broadcast("early", 0);
        bus.take_queued();
        bus.broadcast("late", 0);
        bus.end_tick();
        assert!(!bus.received("early"));
        assert!(bus.received("late"));
        assert_eq!(bus.pending(), 1);
    }
}
