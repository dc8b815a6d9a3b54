use tinsel_core::EntityId;

use crate::task::TaskId;

/// What kind of runtime event occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEventKind {
    // Registry
    /// An entity became live.
    EntitySpawned {
        /// The new entity.
        entity: EntityId,
        /// Its registered type.
        type_name: String,
        /// The template it was cloned from, if any.
        clone_of: Option<EntityId>,
    },
    /// An entity was removed and its tasks cancelled.
    EntityRemoved {
        /// The removed entity.
        entity: EntityId,
    },
    /// A scene replaced every live entity.
    SceneSwitched {
        /// The newly active scene.
        scene: String,
    },

    // Tasks
    /// A persistent task returned without requesting another wait.
    TaskCompleted {
        /// The finished task.
        task: TaskId,
        /// Its owner.
        entity: EntityId,
    },
    /// A task body returned an error and was cancelled.
    TaskFailed {
        /// The failed task.
        task: TaskId,
        /// Its owner.
        entity: EntityId,
        /// The error, rendered.
        error: String,
    },

    // Bus
    /// A broadcast reached its listeners.
    BroadcastDelivered {
        /// The broadcast name.
        name: String,
        /// Number of handler invocations.
        listeners: usize,
    },
    /// Broadcasts left over after the cascade limit, carried to the next tick.
    BroadcastsDeferred {
        /// How many broadcasts were carried over.
        count: usize,
    },

    // Behaviors
    /// A message logged by a behavior.
    Log {
        /// The logging entity.
        entity: EntityId,
        /// The message text.
        message: String,
    },
}

impl RuntimeEventKind {
    /// Check whether a given entity is involved in this event.
    pub fn involves(&self, id: EntityId) -> bool {
        match self {
            Self::EntitySpawned {
                entity, clone_of, ..
            } => *entity == id || *clone_of == Some(id),
            Self::EntityRemoved { entity }
            | Self::TaskCompleted { entity, .. }
            | Self::TaskFailed { entity, .. }
            | Self::Log { entity, .. } => *entity == id,
            Self::SceneSwitched { .. }
            | Self::BroadcastDelivered { .. }
            | Self::BroadcastsDeferred { .. } => false,
        }
    }
}

/// A record of something that happened during a run.
#[derive(Debug, Clone)]
pub struct RuntimeEvent {
    /// The tick during which this event occurred.
    pub tick: u64,
    /// Simulated time of that tick, in milliseconds.
    pub time: u64,
    /// The specific kind of event that occurred.
    pub kind: RuntimeEventKind,
    /// A human-readable description of the event.
    pub description: String,
}

impl RuntimeEvent {
    /// Create a new event.
    pub fn new(
        tick: u64,
        time: u64,
        kind: RuntimeEventKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            tick,
            time,
            kind,
            description: description.into(),
        }
    }
}

/// Accumulates events during a run.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<RuntimeEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create a new event log with the given maximum capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest events if the log exceeds its capacity.
    pub fn push(&mut self, event: RuntimeEvent) {
        self.events.push(event);
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// Return a slice of all recorded events.
    pub fn events(&self) -> &[RuntimeEvent] {
        &self.events
    }

    /// Return all events that occurred at the given tick.
    pub fn events_at_tick(&self, tick: u64) -> Vec<&RuntimeEvent> {
        self.events.iter().filter(|e| e.tick == tick).collect()
    }

    /// Return all events involving the given entity.
    pub fn events_for_entity(&self, id: EntityId) -> Vec<&RuntimeEvent> {
        self.events.iter().filter(|e| e.kind.involves(id)).collect()
    }

    /// Return the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Return `true` if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn removed(tick: u64, id: u64) -> RuntimeEvent {
        RuntimeEvent::new(
            tick,
            tick * 16,
            RuntimeEventKind::EntityRemoved {
                entity: EntityId(id),
            },
            "removed",
        )
    }

    #[test]
    fn event_log_push_and_query() {
        let mut log = EventLog::new(0);
        log.push(removed(1, 3));
        assert_eq!(log.len(), 1);
        assert_eq!(log.events_at_tick(1).len(), 1);
        assert_eq!(log.events_for_entity(EntityId(3)).len(), 1);
        assert!(log.events_for_entity(EntityId(4)).is_empty());
    }

    #[test]
    fn event_log_max_events_trims() {
        let mut log = EventLog::new(2);
        for i in 0..5 {
            log.push(removed(i, 1));
        }
        assert_eq!(log.len(), 2);
        // Oldest events were dropped, newest remain
        assert_eq!(log.events()[0].tick, 3);
        assert_eq!(log.events()[1].tick, 4);
    }

    #[test]
    fn spawn_involves_template() {
        let kind = RuntimeEventKind::EntitySpawned {
            entity: EntityId(5),
            type_name: "Cat".into(),
            clone_of: Some(EntityId(1)),
        };
        assert!(kind.involves(EntityId(5)));
        assert!(kind.involves(EntityId(1)));
        assert!(!kind.involves(EntityId(2)));

        let kind = RuntimeEventKind::BroadcastDelivered {
            name: "go".into(),
            listeners: 3,
        };
        assert!(!kind.involves(EntityId(5)));
    }

    #[test]
    fn event_log_clear() {
        let mut log = EventLog::new(0);
        log.push(removed(1, 1));
        assert!(!log.is_empty());
        log.clear();
        assert!(log.is_empty());
    }
}
