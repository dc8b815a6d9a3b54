use serde::{Deserialize, Serialize};

/// How collision handlers fire while a contact persists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionTrigger {
    /// Every tick the contact holds.
    #[default]
    Continuous,
    /// Only on the first tick of a contact.
    OnEnter,
}

/// Configuration for a runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// RNG seed for deterministic runs.
    pub seed: u64,
    /// Simulated milliseconds per tick.
    pub tick_ms: u64,
    /// Stage width used for edge detection and random placement.
    pub stage_width: f64,
    /// Stage height used for edge detection and random placement.
    pub stage_height: f64,
    /// Maximum number of live entities; clones beyond it are refused.
    pub max_entities: usize,
    /// Maximum event log size (oldest events dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
    /// Rounds of broadcasts-raised-by-handlers delivered in one dispatch phase.
    pub max_broadcast_cascade: usize,
    /// Continuous or enter-only collision handlers.
    pub collision_trigger: CollisionTrigger,
    /// Whether a one-shot handler that fails stays cancelled.
    pub disarm_failed_handlers: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_ms: 16,
            stage_width: 800.0,
            stage_height: 600.0,
            max_entities: 500,
            max_events: 0,
            max_broadcast_cascade: 16,
            collision_trigger: CollisionTrigger::Continuous,
            disarm_failed_handlers: true,
        }
    }
}

impl RuntimeConfig {
    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the simulated milliseconds per tick.
    pub fn with_tick_ms(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms;
        self
    }

    /// Set the stage size.
    pub fn with_stage(mut self, width: f64, height: f64) -> Self {
        self.stage_width = width;
        self.stage_height = height;
        self
    }

    /// Set the live entity limit.
    pub fn with_max_entities(mut self, max: usize) -> Self {
        self.max_entities = max;
        self
    }

    /// Set the maximum event log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    /// Set the broadcast cascade limit per dispatch phase.
    pub fn with_max_broadcast_cascade(mut self, rounds: usize) -> Self {
        self.max_broadcast_cascade = rounds;
        self
    }

    /// Choose continuous or enter-only collision handlers.
    pub fn with_collision_trigger(mut self, trigger: CollisionTrigger) -> Self {
        self.collision_trigger = trigger;
        self
    }

    /// Choose whether failed one-shot handlers stay cancelled.
    pub fn with_disarm_failed_handlers(mut self, disarm: bool) -> Self {
        self.disarm_failed_handlers = disarm;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = RuntimeConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.tick_ms, 16);
        assert_eq!(config.max_entities, 500);
        assert_eq!(config.max_events, 0);
        assert_eq!(config.collision_trigger, CollisionTrigger::Continuous);
        assert!(config.disarm_failed_handlers);
    }

    #[test]
    fn config_builder_chain() {
        let config = RuntimeConfig::default()
            .with_seed(7)
            .with_tick_ms(100)
            .with_stage(320.0, 240.0)
            .with_max_entities(10)
            .with_collision_trigger(CollisionTrigger::OnEnter);
        assert_eq!(config.seed, 7);
        assert_eq!(config.tick_ms, 100);
        assert!((config.stage_width - 320.0).abs() < f64::EPSILON);
        assert_eq!(config.max_entities, 10);
        assert_eq!(config.collision_trigger, CollisionTrigger::OnEnter);
    }

    #[test]
    fn config_from_partial_json() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{"tick_ms": 50, "collision_trigger": "on_enter"}"#).unwrap();
        assert_eq!(config.tick_ms, 50);
        assert_eq!(config.collision_trigger, CollisionTrigger::OnEnter);
        assert_eq!(config.seed, 42);
    }
}
