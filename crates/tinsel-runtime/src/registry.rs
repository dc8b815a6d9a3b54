use std::collections::BTreeMap;

use tinsel_core::{Entity, EntityId, EntityRole, Vec2};

/// A structural change requested during a tick and applied in the
/// mutation-apply phase.
#[derive(Debug, Clone)]
pub(crate) enum Mutation {
    /// Make a prepared entity live.
    Spawn {
        entity: Entity,
        clone_of: Option<EntityId>,
    },
    /// Remove an entity and cancel its tasks.
    Remove(EntityId),
    /// Replace every live entity with a scene's spawns.
    SwitchScene(String),
}

/// Owns the live entity set and the buffer of pending structural changes.
///
/// While a task runs, its own entity is checked out of the map and lent to
/// the task directly; [`EntityRegistry::live_count`] still counts it.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<EntityId, Entity>,
    pending: Vec<Mutation>,
    checked_out: Option<EntityId>,
    next_id: u64,
}

impl EntityRegistry {
    /// An empty registry. Ids start at 1.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Reserve the next entity id.
    pub(crate) fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Lend an entity to a running task.
    pub(crate) fn check_out(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        self.checked_out = Some(id);
        Some(entity)
    }

    /// Return an entity lent with [`check_out`](Self::check_out).
    pub(crate) fn check_in(&mut self, entity: Entity) {
        self.checked_out = None;
        self.entities.insert(entity.id, entity);
    }

    pub(crate) fn queue(&mut self, mutation: Mutation) {
        self.pending.push(mutation);
    }

    pub(crate) fn take_pending(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.pending)
    }

    /// Live entities plus those queued for spawning; what the entity limit
    /// is checked against.
    pub fn projected_count(&self) -> usize {
        self.live_count() + self.pending_spawns()
    }

    /// Entities queued for spawning in the current tick.
    pub fn pending_spawns(&self) -> usize {
        self.pending
            .iter()
            .filter(|m| matches!(m, Mutation::Spawn { .. }))
            .count()
    }

    /// True if a removal of `id` is queued.
    pub fn is_marked_deleted(&self, id: EntityId) -> bool {
        self.pending
            .iter()
            .any(|m| matches!(m, Mutation::Remove(marked) if *marked == id))
    }

    /// Look up a live entity (not the one currently checked out).
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable lookup, for hosts between ticks.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// True if `id` is live, whether or not it is checked out.
    pub fn contains(&self, id: EntityId) -> bool {
        self.checked_out == Some(id) || self.entities.contains_key(&id)
    }

    /// Number of live entities, including a checked-out one.
    pub fn live_count(&self) -> usize {
        self.entities.len() + usize::from(self.checked_out.is_some())
    }

    /// Live entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Live ids in id order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// All live entities with this name, in id order.
    pub fn find_by_name(&self, name: &str) -> Vec<&Entity> {
        self.iter().filter(|e| e.name() == name).collect()
    }

    /// All live entities of this type, in id order.
    pub fn of_type(&self, type_name: &str) -> Vec<&Entity> {
        self.iter().filter(|e| e.type_name == type_name).collect()
    }

    /// Start a filtered search over the live entities.
    pub fn query(&self) -> EntityQuery<'_> {
        EntityQuery::new(self.iter().collect())
    }
}

/// A builder for filtering live entities.
///
/// Results always come back in id order.
#[derive(Debug)]
pub struct EntityQuery<'r> {
    candidates: Vec<&'r Entity>,
    type_name: Option<String>,
    name: Option<String>,
    name_contains: Option<String>,
    role: Option<EntityRole>,
    clones: Option<bool>,
    visible_only: bool,
    within: Option<(Vec2, f64)>,
    has_var: Option<String>,
    exclude: Vec<EntityId>,
    limit: Option<usize>,
}

impl<'r> EntityQuery<'r> {
    /// Query over an explicit candidate set.
    pub fn new(mut candidates: Vec<&'r Entity>) -> Self {
        candidates.sort_by_key(|e| e.id);
        Self {
            candidates,
            type_name: None,
            name: None,
            name_contains: None,
            role: None,
            clones: None,
            visible_only: false,
            within: None,
            has_var: None,
            exclude: Vec::new(),
            limit: None,
        }
    }

    /// Filter by registered type.
    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Filter by exact name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Filter to names containing the given substring (case-insensitive).
    pub fn name_contains(mut self, s: impl Into<String>) -> Self {
        self.name_contains = Some(s.into().to_lowercase());
        self
    }

    /// Filter by role.
    pub fn role(mut self, role: EntityRole) -> Self {
        self.role = Some(role);
        self
    }

    /// Only clones.
    pub fn clones(mut self) -> Self {
        self.clones = Some(true);
        self
    }

    /// Only entities that are not clones.
    pub fn originals(mut self) -> Self {
        self.clones = Some(false);
        self
    }

    /// Only visible entities.
    pub fn visible(mut self) -> Self {
        self.visible_only = true;
        self
    }

    /// Only entities whose position is within `radius` of `center`.
    pub fn within(mut self, center: Vec2, radius: f64) -> Self {
        self.within = Some((center, radius));
        self
    }

    /// Only entities that have the given variable set.
    pub fn has_var(mut self, key: impl Into<String>) -> Self {
        self.has_var = Some(key.into());
        self
    }

    /// Leave out one entity.
    pub fn exclude(mut self, id: EntityId) -> Self {
        self.exclude.push(id);
        self
    }

    /// Limit the number of results.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Execute the query and return matching entities.
    pub fn execute(self) -> Vec<&'r Entity> {
        let limit = self.limit.unwrap_or(usize::MAX);
        self.candidates
            .iter()
            .copied()
            .filter(|e| self.matches(e))
            .take(limit)
            .collect()
    }

    /// First match, if any.
    pub fn first(self) -> Option<&'r Entity> {
        self.limit(1).execute().into_iter().next()
    }

    /// Count matching entities without collecting them.
    pub fn count(self) -> usize {
        self.candidates.iter().filter(|e| self.matches(e)).count()
    }

    fn matches(&self, entity: &Entity) -> bool {
        if let Some(ref t) = self.type_name
            && entity.type_name != *t
        {
            return false;
        }

        if let Some(ref n) = self.name
            && entity.name() != n.as_str()
        {
            return false;
        }

        if let Some(ref s) = self.name_contains
            && !entity.name().to_lowercase().contains(s)
        {
            return false;
        }

        if let Some(role) = self.role
            && entity.role != role
        {
            return false;
        }

        if let Some(clones) = self.clones
            && entity.is_clone != clones
        {
            return false;
        }

        if self.visible_only && !entity.attrs.visible {
            return false;
        }

        if let Some((center, radius)) = self.within
            && entity.attrs.position.distance(center) > radius
        {
            return false;
        }

        if let Some(ref key) = self.has_var
            && entity.attrs.var(key).is_none()
        {
            return false;
        }

        !self.exclude.contains(&entity.id)
    }
}
