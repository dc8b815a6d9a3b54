use std::collections::{BTreeMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tinsel_core::{Attributes, Entity, EntityId, Value};
use tracing::{debug, warn};

use crate::behavior::{BehaviorTable, Entry, Trigger, TypeRegistry};
use crate::bus::{EventBus, Firing};
use crate::clock::Clock;
use crate::collision::{CollisionFact, CollisionSource, ShapeCollider, Stage};
use crate::config::{CollisionTrigger, RuntimeConfig};
use crate::context::TaskContext;
use crate::error::{BehaviorError, RegistrationError, RuntimeError, RuntimeResult};
use crate::event::{EventLog, RuntimeEvent, RuntimeEventKind};
use crate::input::InputState;
use crate::registry::{EntityQuery, EntityRegistry, Mutation};
use crate::routine::Step;
use crate::scene::{Scene, SceneCatalog};
use crate::task::{Task, TaskBody, TaskId, TaskQueue, TaskState};

/// Counters for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Index of the tick (completed ticks before it).
    pub tick: u64,
    /// Simulated time the tick ran at.
    pub time: u64,
    /// Persistent tasks resumed.
    pub resumed: usize,
    /// One-shot handler invocations.
    pub handlers_fired: usize,
    /// Task bodies that returned an error.
    pub failed: usize,
    /// Broadcasts delivered to at least one listener.
    pub broadcasts: usize,
    /// Entities that went live.
    pub spawned: usize,
    /// Entities removed.
    pub removed: usize,
}

/// Everything a task context borrows, kept apart from the task queue so a
/// task can run while the queue holds it.
struct Shared {
    config: RuntimeConfig,
    clock: Clock,
    rng: StdRng,
    types: TypeRegistry,
    scenes: SceneCatalog,
    registry: EntityRegistry,
    bus: EventBus,
    input: InputState,
    events: EventLog,
    globals: BTreeMap<String, Value>,
}

impl Shared {
    fn context<'a>(&'a mut self, this: &'a mut Entity, task: TaskId) -> TaskContext<'a> {
        TaskContext {
            this,
            task,
            registry: &mut self.registry,
            types: &self.types,
            scenes: &self.scenes,
            clock: &self.clock,
            bus: &mut self.bus,
            input: &self.input,
            events: &mut self.events,
            globals: &mut self.globals,
            rng: &mut self.rng,
            config: &self.config,
        }
    }

    fn record(&mut self, kind: RuntimeEventKind, description: impl Into<String>) {
        let event = RuntimeEvent::new(self.clock.tick(), self.clock.now(), kind, description);
        self.events.push(event);
    }

    fn task_failed(
        &mut self,
        task: TaskId,
        entity: EntityId,
        trigger: &Trigger,
        err: &BehaviorError,
    ) {
        warn!(task = %task, entity = %entity, trigger = %trigger, error = %err, "task failed");
        self.record(
            RuntimeEventKind::TaskFailed {
                task,
                entity,
                error: err.to_string(),
            },
            format!("{task} ({trigger}) of {entity} failed: {err}"),
        );
    }
}

/// The cooperative scheduler.
///
/// Owns the clock, entities, tasks, broadcast bus, input state, RNG and
/// event log. Each [`tick`](Self::tick) runs four phases in fixed order:
/// resume due persistent tasks, detect collisions, dispatch one-shot
/// handlers, apply buffered structural changes. Time then advances by
/// `tick_ms`.
pub struct Runtime {
    shared: Shared,
    tasks: TaskQueue,
    collider: Box<dyn CollisionSource>,
    contacts: HashSet<CollisionFact>,
    active_scene: Option<String>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("tick", &self.shared.clock.tick())
            .field("now", &self.shared.clock.now())
            .field("entities", &self.shared.registry.live_count())
            .field("tasks", &self.tasks.len())
            .field("events", &self.shared.events.len())
            .finish()
    }
}

impl Runtime {
    /// Create an empty runtime with the default [`ShapeCollider`].
    pub fn new(config: RuntimeConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        let events = EventLog::new(config.max_events);
        Self {
            shared: Shared {
                config,
                clock: Clock::new(),
                rng,
                types: TypeRegistry::new(),
                scenes: SceneCatalog::new(),
                registry: EntityRegistry::new(),
                bus: EventBus::new(),
                input: InputState::new(),
                events,
                globals: BTreeMap::new(),
            },
            tasks: TaskQueue::new(),
            collider: Box::new(ShapeCollider),
            contacts: HashSet::new(),
            active_scene: None,
        }
    }

    /// Replace the collision source.
    pub fn set_collision_source<C: CollisionSource + 'static>(&mut self, source: C) {
        self.collider = Box::new(source);
        self.contacts.clear();
    }

    /// Register the behavior table of an entity type.
    pub fn register_type(&mut self, table: BehaviorTable) -> RuntimeResult<()> {
        debug!(type_name = table.type_name(), behaviors = table.len(), "type registered");
        self.shared.types.register(table)?;
        Ok(())
    }

    /// Register a scene. Every type it mentions must already be registered.
    pub fn register_scene(&mut self, scene: Scene) -> RuntimeResult<()> {
        if let Some(missing) = scene
            .type_names()
            .find(|t| !self.shared.types.contains(t))
        {
            return Err(RegistrationError::UnknownType(missing.to_string()).into());
        }
        self.shared.scenes.register(scene)?;
        Ok(())
    }

    /// Activate a scene right away, replacing every live entity.
    pub fn set_scene(&mut self, name: &str) -> RuntimeResult<()> {
        let scene = self
            .shared
            .scenes
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownScene(name.to_string()))?;
        if scene.entity_count() > self.shared.config.max_entities {
            return Err(RuntimeError::EntityLimit(self.shared.config.max_entities));
        }
        self.activate_scene(name, &mut TickReport::default());
        Ok(())
    }

    /// Add a sprite right away. Its MAIN and handler tasks are created now.
    pub fn add_entity(&mut self, type_name: &str, attrs: Attributes) -> RuntimeResult<EntityId> {
        if !self.shared.types.contains(type_name) {
            return Err(RegistrationError::UnknownType(type_name.to_string()).into());
        }
        let max = self.shared.config.max_entities;
        if self.shared.registry.projected_count() >= max {
            return Err(RuntimeError::EntityLimit(max));
        }
        let id = self.shared.registry.allocate_id();
        self.instantiate(Entity::new(id, type_name, attrs), None);
        Ok(id)
    }

    /// Schedule removal of an entity at the end of the next tick.
    pub fn mark_deleted(&mut self, id: EntityId) -> RuntimeResult<()> {
        if !self.shared.registry.contains(id) {
            return Err(RuntimeError::EntityNotFound(id));
        }
        if !self.shared.registry.is_marked_deleted(id) {
            self.shared.registry.queue(Mutation::Remove(id));
        }
        Ok(())
    }

    /// Fire a broadcast from outside; delivered in the next dispatch phase.
    pub fn broadcast(&mut self, name: &str) {
        let now = self.shared.clock.now();
        self.shared.bus.broadcast(name, now);
    }

    /// Input state, for feeding key and pointer transitions between ticks.
    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.shared.input
    }

    /// Current input state.
    pub fn input(&self) -> &InputState {
        &self.shared.input
    }

    /// Run one tick.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport {
            tick: self.shared.clock.tick(),
            time: self.shared.clock.now(),
            ..TickReport::default()
        };

        self.resume_phase(&mut report);
        let collisions = self.collision_phase();
        self.dispatch_phase(collisions, &mut report);
        self.apply_phase(&mut report);

        self.tasks.purge();
        self.shared.input.end_tick();
        self.shared.bus.end_tick();
        let tick_ms = self.shared.config.tick_ms;
        for entity in self.shared.registry.iter_mut() {
            entity.attrs.count_down_speech(tick_ms);
        }
        self.shared.clock.advance(tick_ms);
        report
    }

    /// Run `n` ticks.
    pub fn run(&mut self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Run ticks while the clock is at or before `time`.
    pub fn run_until(&mut self, time: u64) {
        while self.shared.clock.now() <= time {
            self.tick();
            if self.shared.config.tick_ms == 0 {
                break;
            }
        }
    }

    fn resume_phase(&mut self, report: &mut TickReport) {
        let now = self.shared.clock.now();
        for index in 0..self.tasks.len() {
            let Some(task) = self.tasks.get_mut(index) else {
                break;
            };
            if !task.is_due(now) {
                continue;
            }
            let (task_id, owner) = (task.id, task.entity);
            let Some(mut entity) = self.shared.registry.check_out(owner) else {
                task.state = TaskState::Cancelled;
                continue;
            };

            task.state = TaskState::Ready;
            let result = match &mut task.body {
                TaskBody::Routine(routine) => {
                    let mut ctx = self.shared.context(&mut entity, task_id);
                    catch_unwind(AssertUnwindSafe(|| routine.resume(&mut ctx)))
                        .unwrap_or_else(|payload| Err(BehaviorError::from_panic(payload)))
                }
                TaskBody::Handler(_) => Ok(Step::Done),
            };
            self.shared.registry.check_in(entity);
            report.resumed += 1;

            match result {
                Ok(Step::Wait(ms)) => {
                    task.state = TaskState::Suspended;
                    task.wake_at = now.saturating_add(ms);
                }
                Ok(Step::Done) => {
                    task.state = TaskState::Done;
                    let description = format!("{task_id} ({}) of {owner} finished", task.trigger);
                    self.shared.record(
                        RuntimeEventKind::TaskCompleted {
                            task: task_id,
                            entity: owner,
                        },
                        description,
                    );
                }
                Err(err) => {
                    task.state = TaskState::Cancelled;
                    report.failed += 1;
                    self.shared.task_failed(task_id, owner, &task.trigger, &err);
                }
            }
        }
    }

    /// Detect collisions and turn them into per-entity firings: edges first,
    /// then contacts, each in detection order.
    fn collision_phase(&mut self) -> Vec<(EntityId, Firing)> {
        let stage = Stage {
            width: self.shared.config.stage_width,
            height: self.shared.config.stage_height,
        };
        let collidable: Vec<&Entity> = self
            .shared
            .registry
            .iter()
            .filter(|e| e.is_collidable())
            .collect();
        let facts = self.collider.detect(stage, &collidable);

        let facts = match self.shared.config.collision_trigger {
            CollisionTrigger::Continuous => {
                self.contacts = facts.iter().copied().collect();
                facts
            }
            CollisionTrigger::OnEnter => {
                let fresh: Vec<CollisionFact> = facts
                    .iter()
                    .filter(|f| !self.contacts.contains(*f))
                    .copied()
                    .collect();
                self.contacts = facts.into_iter().collect();
                fresh
            }
        };

        let registry = &self.shared.registry;
        let contact_with = |id: EntityId| {
            let (other_name, other_type) = registry
                .get(id)
                .map(|e| (e.name().to_string(), e.type_name.clone()))
                .unwrap_or_default();
            Firing::Contact {
                other: id,
                other_name,
                other_type,
            }
        };
        let mut edges = Vec::new();
        let mut contacts = Vec::new();
        for fact in facts {
            match fact {
                CollisionFact::Edge { entity, edge } => edges.push((entity, Firing::Edge(edge))),
                CollisionFact::Contact { a, b } => {
                    contacts.push((a, contact_with(b)));
                    contacts.push((b, contact_with(a)));
                }
            }
        }
        edges.extend(contacts);
        edges
    }

    fn dispatch_phase(&mut self, collisions: Vec<(EntityId, Firing)>, report: &mut TickReport) {
        let mut rounds = self.shared.config.max_broadcast_cascade.saturating_add(1);
        self.deliver_broadcasts(&mut rounds, report);

        for firing in self.shared.input.firings() {
            self.fire(None, &firing, report);
        }
        for (target, firing) in &collisions {
            self.fire(Some(*target), firing, report);
        }

        self.deliver_broadcasts(&mut rounds, report);
        let deferred = self.shared.bus.pending();
        if deferred > 0 {
            warn!(count = deferred, "broadcast cascade limit reached, deferring");
            self.shared.record(
                RuntimeEventKind::BroadcastsDeferred { count: deferred },
                format!("{deferred} broadcast(s) deferred to the next tick"),
            );
        }
    }

    fn deliver_broadcasts(&mut self, rounds: &mut usize, report: &mut TickReport) {
        while *rounds > 0 {
            let batch = self.shared.bus.take_queued();
            if batch.is_empty() {
                return;
            }
            *rounds -= 1;
            for name in batch {
                let listeners = self.fire(None, &Firing::Broadcast(name.clone()), report);
                if listeners == 0 {
                    continue;
                }
                report.broadcasts += 1;
                let description = format!("\"{name}\" reached {listeners} handler(s)");
                self.shared
                    .record(RuntimeEventKind::BroadcastDelivered { name, listeners }, description);
            }
        }
    }

    /// Invoke every armed handler matching `firing`, in task creation order
    /// (entity id order, then declaration order). `target` restricts the
    /// firing to one entity's handlers.
    fn fire(
        &mut self,
        target: Option<EntityId>,
        firing: &Firing,
        report: &mut TickReport,
    ) -> usize {
        let disarm = self.shared.config.disarm_failed_handlers;
        let mut fired = 0;
        for index in 0..self.tasks.len() {
            let Some(task) = self.tasks.get_mut(index) else {
                break;
            };
            if task.is_persistent() || !task.state.is_armed() {
                continue;
            }
            if target.is_some_and(|t| t != task.entity) || !task.trigger.matches(firing) {
                continue;
            }
            let TaskBody::Handler(handler) = &task.body else {
                continue;
            };
            let handler = Rc::clone(handler);
            let (task_id, owner) = (task.id, task.entity);
            let Some(mut entity) = self.shared.registry.check_out(owner) else {
                continue;
            };

            task.state = TaskState::Ready;
            let result = {
                let mut ctx = self.shared.context(&mut entity, task_id);
                catch_unwind(AssertUnwindSafe(|| handler(&mut ctx, firing)))
                    .unwrap_or_else(|payload| Err(BehaviorError::from_panic(payload)))
            };
            self.shared.registry.check_in(entity);
            fired += 1;
            report.handlers_fired += 1;

            match result {
                Ok(()) => task.state = TaskState::Suspended,
                Err(err) => {
                    task.state = if disarm {
                        TaskState::Cancelled
                    } else {
                        TaskState::Suspended
                    };
                    report.failed += 1;
                    self.shared.task_failed(task_id, owner, &task.trigger, &err);
                }
            }
        }
        fired
    }

    fn apply_phase(&mut self, report: &mut TickReport) {
        let batch = self.shared.registry.take_pending();
        let scene = batch.iter().rev().find_map(|m| match m {
            Mutation::SwitchScene(name) => Some(name.clone()),
            _ => None,
        });
        if let Some(scene) = scene {
            let dropped = batch
                .iter()
                .filter(|m| !matches!(m, Mutation::SwitchScene(_)))
                .count();
            if dropped > 0 {
                debug!(scene = %scene, dropped, "scene switch supersedes pending changes");
            }
            self.activate_scene(&scene, report);
            return;
        }

        for mutation in batch {
            match mutation {
                Mutation::Spawn { entity, clone_of } => {
                    self.instantiate(entity, clone_of);
                    report.spawned += 1;
                }
                Mutation::Remove(id) => {
                    if self.remove_entity(id) {
                        report.removed += 1;
                    }
                }
                Mutation::SwitchScene(_) => {}
            }
        }
    }

    /// Make an entity live and create its tasks in declaration order:
    /// MAIN for originals, CLONE routines for clones, handlers for both.
    fn instantiate(&mut self, entity: Entity, clone_of: Option<EntityId>) {
        let Some(table) = self.shared.types.get(&entity.type_name).cloned() else {
            warn!(
                entity = %entity.id,
                type_name = %entity.type_name,
                "no behavior table, entity dropped"
            );
            return;
        };
        let now = self.shared.clock.now();
        let mut created = 0;
        for decl in table.declarations() {
            let body = match (&decl.trigger, &decl.entry) {
                (Trigger::Main, Entry::Routine(make)) if !entity.is_clone => {
                    TaskBody::Routine(make())
                }
                (Trigger::Clone, Entry::Routine(make)) if entity.is_clone => {
                    TaskBody::Routine(make())
                }
                (_, Entry::Handler(handler)) => TaskBody::Handler(Rc::clone(handler)),
                _ => continue,
            };
            self.tasks.push(entity.id, decl.trigger.clone(), body, now);
            created += 1;
        }

        debug!(
            entity = %entity.id,
            type_name = %entity.type_name,
            clone_of = ?clone_of.map(|c| c.get()),
            tasks = created,
            "entity spawned"
        );
        let description = match clone_of {
            Some(template) => format!("{} ({}) cloned from {template}", entity.name(), entity.id),
            None => format!("{} ({}) spawned as {}", entity.name(), entity.id, entity.type_name),
        };
        self.shared.record(
            RuntimeEventKind::EntitySpawned {
                entity: entity.id,
                type_name: entity.type_name.clone(),
                clone_of,
            },
            description,
        );
        self.shared.registry.insert(entity);
    }

    fn remove_entity(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.shared.registry.remove(id) else {
            return false;
        };
        let cancelled = self.tasks.cancel_entity(id);
        debug!(entity = %id, tasks = cancelled, "entity removed");
        self.shared.record(
            RuntimeEventKind::EntityRemoved { entity: id },
            format!("{} ({id}) removed", entity.name()),
        );
        true
    }

    fn activate_scene(&mut self, name: &str, report: &mut TickReport) {
        let Some(scene) = self.shared.scenes.get(name).cloned() else {
            warn!(scene = name, "unknown scene, switch ignored");
            return;
        };

        for id in self.shared.registry.ids() {
            if self.remove_entity(id) {
                report.removed += 1;
            }
        }
        self.tasks.cancel_all();
        self.shared.bus.reset_queue();
        self.contacts.clear();

        if let Some(stage) = scene.stage {
            let id = self.shared.registry.allocate_id();
            self.instantiate(Entity::stage(id, stage.type_name, stage.attrs), None);
            report.spawned += 1;
        }
        for spawn in scene.spawns {
            let id = self.shared.registry.allocate_id();
            self.instantiate(Entity::new(id, spawn.type_name, spawn.attrs), None);
            report.spawned += 1;
        }

        debug!(scene = name, entities = self.shared.registry.live_count(), "scene activated");
        self.active_scene = Some(name.to_string());
        self.shared.record(
            RuntimeEventKind::SceneSwitched {
                scene: name.to_string(),
            },
            format!("scene \"{name}\" activated"),
        );
    }

    /// The configuration this runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    /// The simulation clock.
    pub fn clock(&self) -> &Clock {
        &self.shared.clock
    }

    /// Current simulated time in milliseconds.
    pub fn now(&self) -> u64 {
        self.shared.clock.now()
    }

    /// Number of completed ticks.
    pub fn current_tick(&self) -> u64 {
        self.shared.clock.tick()
    }

    /// Look up a live entity.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.shared.registry.get(id)
    }

    /// Mutable access to a live entity between ticks.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.shared.registry.get_mut(id)
    }

    /// Live entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.shared.registry.iter()
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.shared.registry.live_count()
    }

    /// All live entities with this name, in id order.
    pub fn find_by_name(&self, name: &str) -> Vec<&Entity> {
        self.shared.registry.find_by_name(name)
    }

    /// Start a filtered search over live entities.
    pub fn query(&self) -> EntityQuery<'_> {
        self.shared.registry.query()
    }

    /// The entity registry.
    pub fn registry(&self) -> &EntityRegistry {
        &self.shared.registry
    }

    /// Unfinished tasks in creation order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.state().is_finished())
    }

    /// Unfinished tasks owned by `id`.
    pub fn tasks_for(&self, id: EntityId) -> impl Iterator<Item = &Task> {
        self.tasks().filter(move |t| t.entity() == id)
    }

    /// The event log.
    pub fn events(&self) -> &EventLog {
        &self.shared.events
    }

    /// The broadcast bus.
    pub fn bus(&self) -> &EventBus {
        &self.shared.bus
    }

    /// Runtime-wide variables.
    pub fn globals(&self) -> &BTreeMap<String, Value> {
        &self.shared.globals
    }

    /// Runtime-wide variables, mutably.
    pub fn globals_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.shared.globals
    }

    /// Registered entity types.
    pub fn types(&self) -> &TypeRegistry {
        &self.shared.types
    }

    /// Registered scenes.
    pub fn scenes(&self) -> &SceneCatalog {
        &self.shared.scenes
    }

    /// Name of the active scene, if one was activated.
    pub fn active_scene(&self) -> Option<&str> {
        self.active_scene.as_deref()
    }
}
