//! Core types for Tinsel: entities, attributes, and the trigger vocabulary.
//!
//! This crate defines the plain data model that the scheduler in
//! `tinsel-runtime` operates on. It holds no scheduling logic: an [`Entity`]
//! here is only identity plus a mutable [`Attributes`] set, and the trigger
//! enums only describe *when* a behavior should run, never how.

/// Mutable per-entity attributes: position, heading, size, shape, speech, physics.
pub mod attributes;
/// Entity identity, role, and the dynamic [`Value`] type for variables.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// Trigger vocabulary: key/mouse modes, stage edges, easing curves.
pub mod trigger;

/// Re-export attribute types.
pub use attributes::{Attributes, PhysicsState, Rgb, Shape, Speech, SpeechKind, Vec2};
/// Re-export core entity types.
pub use entity::{Entity, EntityId, EntityRole, Value};
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export trigger vocabulary.
pub use trigger::{Easing, Edge, InputMode, KeyCode, MouseButton};
