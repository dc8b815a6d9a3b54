use tinsel_core::{Entity, EntityId};
use tracing::{debug, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::registry::{EntityRegistry, Mutation};

/// Links a clone to the entity whose attributes it was copied from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloneRecord {
    /// The new entity.
    pub clone: EntityId,
    /// The entity it was snapshotted from.
    pub template: EntityId,
}

/// Snapshot `template` into a new entity and queue it for spawning.
///
/// The id is allocated and the attributes copied now; the clone goes live
/// in the mutation-apply phase. Nothing is queued if the live entities plus
/// the clones already queued this tick have reached `max_entities`.
pub(crate) fn prepare_clone(
    registry: &mut EntityRegistry,
    template: &Entity,
    max_entities: usize,
) -> RuntimeResult<CloneRecord> {
    if registry.projected_count() >= max_entities {
        warn!(
            template = %template.id,
            limit = max_entities,
            "clone refused, entity limit reached"
        );
        return Err(RuntimeError::EntityLimit(max_entities));
    }

    let id = registry.allocate_id();
    let entity = template.snapshot_as(id);
    debug!(clone = %id, template = %template.id, "clone queued");
    registry.queue(Mutation::Spawn {
        entity,
        clone_of: Some(template.id),
    });
    Ok(CloneRecord {
        clone: id,
        template: template.id,
    })
}
