use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attributes::Attributes;

/// Stable identifier for every entity in a runtime.
///
/// Ids are allocated from a monotonic counter, so comparing two ids also
/// compares their creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What part an entity plays in its scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRole {
    /// A regular on-stage sprite. Takes part in collision detection.
    #[default]
    Sprite,
    /// The scene's own backdrop entity. Runs behaviors but never collides.
    Stage,
}

/// A dynamic value stored in entity variables and runtime globals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A boolean value.
    Boolean(bool),
    /// A 64-bit signed integer value.
    Integer(i64),
    /// A 64-bit floating-point value.
    Float(f64),
    /// A text value.
    String(String),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A string-keyed map of values.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Integer view of the value. Floats are truncated.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Float(n) => Some(*n as i64),
            _ => None,
        }
    }

    /// Floating-point view of the value.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// String view of the value, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view of the value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Self::Map(_) => write!(f, "{{...}}"),
        }
    }
}

/// A live game object: identity, the type it was declared as, and its
/// mutable attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: EntityId,
    /// Name of the registered entity type whose behavior table drives it.
    pub type_name: String,
    /// Sprite or scene stage.
    pub role: EntityRole,
    /// True if this entity was created by a clone call.
    pub is_clone: bool,
    /// Mutable attribute set.
    pub attrs: Attributes,
}

impl Entity {
    /// Create a sprite entity of the given type.
    pub fn new(id: EntityId, type_name: impl Into<String>, attrs: Attributes) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            role: EntityRole::Sprite,
            is_clone: false,
            attrs,
        }
    }

    /// Create the stage entity of a scene.
    pub fn stage(id: EntityId, type_name: impl Into<String>, attrs: Attributes) -> Self {
        Self {
            role: EntityRole::Stage,
            ..Self::new(id, type_name, attrs)
        }
    }

    /// Display name, taken from the attribute set.
    pub fn name(&self) -> &str {
        &self.attrs.name
    }

    /// True if this entity takes part in collision detection this tick.
    pub fn is_collidable(&self) -> bool {
        self.role == EntityRole::Sprite && self.attrs.visible
    }

    /// Build a clone of this entity under a fresh id.
    ///
    /// Attributes are deep-copied so later mutation of `self` never reaches
    /// the clone. A speech bubble stays with the original.
    pub fn snapshot_as(&self, id: EntityId) -> Self {
        let mut attrs = self.attrs.clone();
        attrs.speech = None;
        Self {
            id,
            type_name: self.type_name.clone(),
            role: EntityRole::Sprite,
            is_clone: true,
            attrs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_display_and_ordering() {
        assert_eq!(EntityId(7).to_string(), "#7");
        assert!(EntityId(3) < EntityId(4));
    }

    #[test]
    fn stage_entities_never_collide() {
        let stage = Entity::stage(EntityId(1), "Backdrop", Attributes::named("Stage"));
        assert_eq!(stage.role, EntityRole::Stage);
        assert!(!stage.is_collidable());

        let mut sprite = Entity::new(EntityId(2), "Cat", Attributes::named("Cat"));
        assert!(sprite.is_collidable());
        sprite.attrs.visible = false;
        assert!(!sprite.is_collidable());
    }

    #[test]
    fn snapshot_is_independent_of_source() {
        let mut source = Entity::new(EntityId(1), "Cat", Attributes::named("Cat"));
        source.attrs.vars.insert("lives".into(), Value::Integer(3));
        source.attrs.say("meow", 1000);

        let clone = source.snapshot_as(EntityId(9));
        source.attrs.position.x += 50.0;
        source.attrs.vars.insert("lives".into(), Value::Integer(0));

        assert_eq!(clone.id, EntityId(9));
        assert!(clone.is_clone);
        assert_eq!(clone.attrs.position, Attributes::default().position);
        assert_eq!(clone.attrs.vars.get("lives"), Some(&Value::Integer(3)));
        assert!(clone.attrs.speech.is_none());
    }

    #[test]
    fn stage_snapshot_becomes_sprite() {
        let stage = Entity::stage(EntityId(1), "Backdrop", Attributes::named("Stage"));
        assert_eq!(stage.snapshot_as(EntityId(2)).role, EntityRole::Sprite);
    }

    #[test]
    fn value_numeric_views() {
        assert_eq!(Value::Integer(4).as_float(), Some(4.0));
        assert_eq!(Value::Float(2.9).as_int(), Some(2));
        assert_eq!(Value::from("hi").as_int(), None);
        assert_eq!(Value::from(true).as_bool(), Some(true));
    }

    #[test]
    fn value_display() {
        let list = Value::List(vec![Value::Integer(1), Value::from("a")]);
        assert_eq!(list.to_string(), "[1, a]");
        assert_eq!(Value::Map(BTreeMap::new()).to_string(), "{...}");
    }

    #[test]
    fn value_untagged_json() {
        let v: Value = serde_json::from_str("[1, 2.5, \"x\", false]").unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::Integer(1),
                Value::Float(2.5),
                Value::from("x"),
                Value::Boolean(false),
            ])
        );
    }
}
