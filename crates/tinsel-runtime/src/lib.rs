//! Cooperative, tick-based behavior scheduler for Tinsel.
//!
//! Entity types declare their behaviors once in a [`BehaviorTable`]: a
//! resumable MAIN routine, CLONE routines, and one-shot handlers for
//! broadcasts, keys, pointer buttons, stage edges and contacts. The
//! [`Runtime`] turns those declarations into tasks and interleaves them
//! deterministically on a single thread, one [`Runtime::tick`] at a time.
//! Structural changes made by behaviors (clones, deletions, scene switches)
//! are buffered and applied at the end of each tick.

/// Per-type behavior declarations and the type registry.
pub mod behavior;
/// Broadcast queue and the [`Firing`] passed to handlers.
pub mod bus;
/// Simulated time.
pub mod clock;
/// Clone snapshots.
pub mod clone;
/// Collision sources and the default shape-based detector.
pub mod collision;
/// Configuration for a runtime.
pub mod config;
/// The context handed to every running task.
pub mod context;
/// Error types for the runtime crate.
pub mod error;
/// Runtime event types and the event log.
pub mod event;
/// Keyboard and pointer state.
pub mod input;
/// The live entity set.
pub mod registry;
/// The resumable routine abstraction.
pub mod routine;
/// The scheduler.
pub mod runtime;
/// Scenes and the scene catalog.
pub mod scene;
/// Sequences, glides and other routine building blocks.
pub mod script;
/// Tasks and the task queue.
pub mod task;

/// Re-exports of behavior declaration types.
pub use behavior::{
    BehaviorDecl, BehaviorTable, BehaviorTableBuilder, Entry, HandlerFn, Trigger, TypeRegistry,
};
/// Re-exports of [`bus::EventBus`] and [`bus::Firing`].
pub use bus::{EventBus, Firing};
/// Re-export of [`clock::Clock`].
pub use clock::Clock;
/// Re-export of [`clone::CloneRecord`].
pub use clone::CloneRecord;
/// Re-exports of collision types.
pub use collision::{CollisionFact, CollisionSource, ShapeCollider, Stage};
/// Re-exports of [`config::RuntimeConfig`] and [`config::CollisionTrigger`].
pub use config::{CollisionTrigger, RuntimeConfig};
/// Re-exports of [`context::TaskContext`] and [`context::FaceTarget`].
pub use context::{FaceTarget, TaskContext};
/// Re-exports of error types.
pub use error::{BehaviorError, BehaviorResult, RegistrationError, RuntimeError, RuntimeResult};
/// Re-exports of [`event::EventLog`], [`event::RuntimeEvent`], and [`event::RuntimeEventKind`].
pub use event::{EventLog, RuntimeEvent, RuntimeEventKind};
/// Re-export of [`input::InputState`].
pub use input::InputState;
/// Re-exports of [`registry::EntityRegistry`] and [`registry::EntityQuery`].
pub use registry::{EntityQuery, EntityRegistry};
/// Re-exports of routine types.
pub use routine::{Routine, RoutineFactory, Step, routine};
/// Re-exports of [`runtime::Runtime`] and [`runtime::TickReport`].
pub use runtime::{Runtime, TickReport};
/// Re-exports of scene types.
pub use scene::{Scene, SceneCatalog, Spawn};
/// Re-exports of routine building blocks.
pub use script::{Glide, Op, Sequence};
/// Re-exports of task types.
pub use task::{Task, TaskId, TaskQueue, TaskState};
