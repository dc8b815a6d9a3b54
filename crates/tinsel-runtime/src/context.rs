use std::collections::BTreeMap;

use rand::Rng;
use rand::rngs::StdRng;
use tinsel_core::{Attributes, Entity, EntityId, KeyCode, MouseButton, Rgb, Value, Vec2};
use tracing::info;

use crate::behavior::TypeRegistry;
use crate::bus::EventBus;
use crate::clock::Clock;
use crate::clone::prepare_clone;
use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::event::{EventLog, RuntimeEvent, RuntimeEventKind};
use crate::input::InputState;
use crate::registry::{EntityQuery, EntityRegistry, Mutation};
use crate::scene::SceneCatalog;
use crate::task::TaskId;

/// Something an entity can turn to face.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceTarget {
    /// A live entity.
    Entity(EntityId),
    /// The first other live entity with this name, in id order.
    Named(String),
    /// The last reported pointer position.
    Pointer,
    /// The point straight across on the closest side of the stage.
    NearestEdge,
    /// A fixed point on the stage.
    Point(Vec2),
}

/// Everything a task body can see and do while it runs.
///
/// The task's own entity is lent mutably; every other entity is read-only.
/// Structural changes (clone, delete, scene switch) are buffered until the
/// mutation-apply phase of the current tick.
pub struct TaskContext<'a> {
    pub(crate) this: &'a mut Entity,
    pub(crate) task: TaskId,
    pub(crate) registry: &'a mut EntityRegistry,
    pub(crate) types: &'a TypeRegistry,
    pub(crate) scenes: &'a SceneCatalog,
    pub(crate) clock: &'a Clock,
    pub(crate) bus: &'a mut EventBus,
    pub(crate) input: &'a InputState,
    pub(crate) events: &'a mut EventLog,
    pub(crate) globals: &'a mut BTreeMap<String, Value>,
    pub(crate) rng: &'a mut StdRng,
    pub(crate) config: &'a RuntimeConfig,
}

impl TaskContext<'_> {
    /// Id of the entity running this task.
    pub fn entity_id(&self) -> EntityId {
        self.this.id
    }

    /// Id of the running task.
    pub fn task_id(&self) -> TaskId {
        self.task
    }

    /// The running entity.
    pub fn this(&self) -> &Entity {
        &*self.this
    }

    /// Current simulated time in milliseconds. Constant for the whole tick.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// The running entity's attributes.
    pub fn attrs(&self) -> &Attributes {
        &self.this.attrs
    }

    /// The running entity's attributes, mutably.
    pub fn attrs_mut(&mut self) -> &mut Attributes {
        &mut self.this.attrs
    }

    /// Look up any live entity, including the running one.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        if id == self.this.id {
            Some(&*self.this)
        } else {
            self.registry.get(id)
        }
    }

    /// All live entities with this name, in id order.
    pub fn find_by_name(&self, name: &str) -> Vec<&Entity> {
        self.query().name(name).execute()
    }

    /// Start a filtered search over all live entities.
    pub fn query(&self) -> EntityQuery<'_> {
        let mut candidates: Vec<&Entity> = self.registry.iter().collect();
        candidates.push(&*self.this);
        EntityQuery::new(candidates)
    }

    /// Distance from the running entity to another one.
    pub fn distance_to(&self, id: EntityId) -> Option<f64> {
        self.entity(id)
            .map(|other| self.this.attrs.position.distance(other.attrs.position))
    }

    /// Where `target` is right now, if it exists.
    pub fn locate(&self, target: &FaceTarget) -> Option<Vec2> {
        match target {
            FaceTarget::Entity(id) => self.entity(*id).map(|e| e.attrs.position),
            FaceTarget::Named(name) => self
                .registry
                .find_by_name(name)
                .first()
                .map(|e| e.attrs.position),
            FaceTarget::Pointer => Some(self.input.pointer()),
            FaceTarget::NearestEdge => {
                let (w, h) = self.stage_size();
                Some(self.this.attrs.nearest_edge(w, h).1)
            }
            FaceTarget::Point(point) => Some(*point),
        }
    }

    /// Turn towards `target`. Returns false, leaving the heading alone, if
    /// it cannot be found.
    pub fn face_towards(&mut self, target: &FaceTarget) -> bool {
        match self.locate(target) {
            Some(point) => {
                self.this.attrs.point_towards(point);
                true
            }
            None => false,
        }
    }

    /// Turn directly away from `target`. Returns false if it cannot be found.
    pub fn face_away_from(&mut self, target: &FaceTarget) -> bool {
        let found = self.face_towards(target);
        if found {
            self.this.attrs.turn_left(180.0);
        }
        found
    }

    /// Point in a uniformly random direction.
    pub fn face_random_direction(&mut self) {
        let degrees = self.rng.random_range(0.0..360.0);
        self.this.attrs.point_in_direction(degrees);
    }

    /// Move left, stopping at the left side of the stage.
    pub fn move_left(&mut self, distance: f64) {
        self.shift_on_stage(-distance, 0.0);
    }

    /// Move right, stopping at the right side of the stage.
    pub fn move_right(&mut self, distance: f64) {
        self.shift_on_stage(distance, 0.0);
    }

    /// Move up, stopping at the top of the stage.
    pub fn move_up(&mut self, distance: f64) {
        self.shift_on_stage(0.0, -distance);
    }

    /// Move down, stopping at the bottom of the stage.
    pub fn move_down(&mut self, distance: f64) {
        self.shift_on_stage(0.0, distance);
    }

    fn shift_on_stage(&mut self, dx: f64, dy: f64) {
        let (w, h) = self.stage_size();
        self.this.attrs.shift_within(dx, dy, w, h);
    }

    /// True if the running entity is visible and the pointer is inside its footprint.
    pub fn touches_pointer(&self) -> bool {
        self.this.attrs.visible && self.this.attrs.contains_point(self.input.pointer())
    }

    /// Distance from the running entity to the pointer.
    pub fn distance_to_pointer(&self) -> f64 {
        self.this.attrs.position.distance(self.input.pointer())
    }

    /// Jump to the pointer.
    pub fn goto_pointer(&mut self) {
        self.this.attrs.position = self.input.pointer();
    }

    /// Switch to a random fill colour.
    pub fn change_color_random(&mut self) {
        let color = Rgb(self.rng.random(), self.rng.random(), self.rng.random());
        self.this.attrs.color = color;
    }

    /// Clone the running entity. The clone goes live at the end of the tick.
    pub fn clone_self(&mut self) -> RuntimeResult<EntityId> {
        let record = prepare_clone(self.registry, self.this, self.config.max_entities)?;
        Ok(record.clone)
    }

    /// Clone another live entity, snapshotting its attributes now.
    pub fn clone_of(&mut self, target: EntityId) -> RuntimeResult<EntityId> {
        if target == self.this.id {
            return self.clone_self();
        }
        let template = self
            .registry
            .get(target)
            .cloned()
            .ok_or(RuntimeError::EntityNotFound(target))?;
        let record = prepare_clone(self.registry, &template, self.config.max_entities)?;
        Ok(record.clone)
    }

    /// Remove the running entity at the end of the tick, cancelling all its tasks.
    ///
    /// Its handlers still fire for the rest of this tick.
    pub fn delete_self(&mut self) {
        let id = self.this.id;
        if !self.registry.is_marked_deleted(id) {
            self.registry.queue(Mutation::Remove(id));
        }
    }

    /// Replace every live entity with the named scene at the end of the tick.
    pub fn switch_scene(&mut self, name: &str) -> RuntimeResult<()> {
        let scene = self
            .scenes
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownScene(name.to_string()))?;
        if scene.entity_count() > self.config.max_entities {
            return Err(RuntimeError::EntityLimit(self.config.max_entities));
        }
        self.registry.queue(Mutation::SwitchScene(name.to_string()));
        Ok(())
    }

    /// Fire a broadcast, delivered in this tick's dispatch phase.
    pub fn broadcast(&mut self, name: &str) {
        let now = self.clock.now();
        self.bus.broadcast(name, now);
    }

    /// True if `name` was broadcast during this tick.
    pub fn received_broadcast(&self, name: &str) -> bool {
        self.bus.received(name)
    }

    /// Time `name` was last broadcast.
    pub fn last_broadcast_at(&self, name: &str) -> Option<u64> {
        self.bus.last_at(name)
    }

    /// True if `type_name` is a registered entity type.
    pub fn is_registered(&self, type_name: &str) -> bool {
        self.types.contains(type_name)
    }

    /// Runtime-wide variables.
    pub fn globals(&self) -> &BTreeMap<String, Value> {
        &*self.globals
    }

    /// Runtime-wide variables, mutably.
    pub fn globals_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut *self.globals
    }

    /// The runtime's seeded RNG.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut *self.rng
    }

    /// Stage width and height.
    pub fn stage_size(&self) -> (f64, f64) {
        (self.config.stage_width, self.config.stage_height)
    }

    /// Jump to a uniformly random point on the stage.
    pub fn goto_random_position(&mut self) {
        let (w, h) = self.stage_size();
        let x = self.rng.random_range(0.0..=w);
        let y = self.rng.random_range(0.0..=h);
        self.this.attrs.goto(x, y);
    }

    /// True while `code` is held down.
    pub fn key_down(&self, code: KeyCode) -> bool {
        self.input.key_down(code)
    }

    /// True while `button` is held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.input.mouse_down(button)
    }

    /// Last reported pointer position.
    pub fn pointer(&self) -> Vec2 {
        self.input.pointer()
    }

    /// Record a message from this behavior.
    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(entity = %self.this.id, task = %self.task, "{message}");
        let description = format!("{} ({}): {message}", self.this.name(), self.this.id);
        self.events.push(RuntimeEvent::new(
            self.clock.tick(),
            self.clock.now(),
            RuntimeEventKind::Log {
                entity: self.this.id,
                message,
            },
            description,
        ));
    }
}
