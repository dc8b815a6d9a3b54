use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tinsel_core::Attributes;

use crate::error::RegistrationError;

/// One entity to create when a scene activates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spawn {
    /// Registered type whose behavior table drives the entity.
    pub type_name: String,
    /// Starting attributes.
    #[serde(default)]
    pub attrs: Attributes,
}

/// A named set of entities that replace everything live when activated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Scene name.
    pub name: String,
    /// Backdrop entity carrying scene-level behaviors. Never collides.
    #[serde(default)]
    pub stage: Option<Spawn>,
    /// Sprites, created in order.
    #[serde(default)]
    pub spawns: Vec<Spawn>,
}

impl Scene {
    /// An empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: None,
            spawns: Vec::new(),
        }
    }

    /// Builder: set the stage entity.
    pub fn with_stage(mut self, type_name: impl Into<String>, attrs: Attributes) -> Self {
        self.stage = Some(Spawn {
            type_name: type_name.into(),
            attrs,
        });
        self
    }

    /// Builder: add a sprite.
    pub fn spawn(mut self, type_name: impl Into<String>, attrs: Attributes) -> Self {
        self.spawns.push(Spawn {
            type_name: type_name.into(),
            attrs,
        });
        self
    }

    /// Number of entities the scene creates, stage included.
    pub fn entity_count(&self) -> usize {
        self.spawns.len() + usize::from(self.stage.is_some())
    }

    /// Every type name the scene refers to, stage first.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.stage
            .iter()
            .chain(self.spawns.iter())
            .map(|s| s.type_name.as_str())
    }
}

/// Registered scenes by name.
#[derive(Debug, Clone, Default)]
pub struct SceneCatalog {
    scenes: BTreeMap<String, Scene>,
}

impl SceneCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scene. Each name may be registered once.
    pub fn register(&mut self, scene: Scene) -> Result<(), RegistrationError> {
        if self.scenes.contains_key(&scene.name) {
            return Err(RegistrationError::DuplicateScene(scene.name));
        }
        self.scenes.insert(scene.name.clone(), scene);
        Ok(())
    }

    /// Look up a scene.
    pub fn get(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    /// True if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.scenes.contains_key(name)
    }

    /// Scene names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.scenes.keys().map(String::as_str).collect()
    }

    /// Number of registered scenes.
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// True if no scene is registered.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}
