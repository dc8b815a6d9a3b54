use tinsel_core::{Attributes, Edge, Entity, EntityId, Shape, Vec2};

/// Stage bounds handed to a [`CollisionSource`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    /// Width in stage units.
    pub width: f64,
    /// Height in stage units.
    pub height: f64,
}

/// A contact detected during the collision phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionFact {
    /// `entity` touches a side of the stage.
    Edge {
        /// The entity at the boundary.
        entity: EntityId,
        /// Which side. Never [`Edge::Any`].
        edge: Edge,
    },
    /// Two entities overlap. Built through [`CollisionFact::contact`], so `a < b`.
    Contact {
        /// Lower id.
        a: EntityId,
        /// Higher id.
        b: EntityId,
    },
}

impl CollisionFact {
    /// A contact fact with its ids in canonical order.
    pub fn contact(x: EntityId, y: EntityId) -> Self {
        if x <= y {
            Self::Contact { a: x, b: y }
        } else {
            Self::Contact { a: y, b: x }
        }
    }
}

/// Computes contact and edge facts once per tick.
///
/// The runtime passes only collidable entities (visible sprites), in id order.
pub trait CollisionSource {
    /// Facts for the current positions.
    fn detect(&mut self, stage: Stage, entities: &[&Entity]) -> Vec<CollisionFact>;
}

/// Geometric detection from each entity's [`Shape`], scaled by its size.
///
/// An entity touching several sides reports one edge, chosen left, right,
/// top, bottom in that order. Contacts require strict overlap.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeCollider;

impl ShapeCollider {
    fn edge(stage: Stage, attrs: &Attributes) -> Option<Edge> {
        let half = attrs.half_extents();
        let pos = attrs.position;
        if pos.x - half.x <= 0.0 {
            Some(Edge::Left)
        } else if pos.x + half.x >= stage.width {
            Some(Edge::Right)
        } else if pos.y - half.y <= 0.0 {
            Some(Edge::Top)
        } else if pos.y + half.y >= stage.height {
            Some(Edge::Bottom)
        } else {
            None
        }
    }

    fn overlaps(a: &Attributes, b: &Attributes) -> bool {
        match (a.shape, b.shape) {
            (Shape::Circle { .. }, Shape::Circle { .. }) => {
                let reach = a.half_extents().x + b.half_extents().x;
                let d = b.position - a.position;
                d.x * d.x + d.y * d.y < reach * reach
            }
            (Shape::Rect { .. }, Shape::Circle { .. }) => rect_circle(a, b),
            (Shape::Circle { .. }, Shape::Rect { .. }) => rect_circle(b, a),
            (Shape::Rect { .. }, Shape::Rect { .. }) => {
                let (ha, hb) = (a.half_extents(), b.half_extents());
                let d = b.position - a.position;
                d.x.abs() < ha.x + hb.x && d.y.abs() < ha.y + hb.y
            }
        }
    }
}

fn rect_circle(rect: &Attributes, circle: &Attributes) -> bool {
    let half = rect.half_extents();
    let radius = circle.half_extents().x;
    let c = circle.position;
    let closest = Vec2::new(
        c.x.clamp(rect.position.x - half.x, rect.position.x + half.x),
        c.y.clamp(rect.position.y - half.y, rect.position.y + half.y),
    );
    let d = c - closest;
    d.x * d.x + d.y * d.y < radius * radius
}

impl CollisionSource for ShapeCollider {
    fn detect(&mut self, stage: Stage, entities: &[&Entity]) -> Vec<CollisionFact> {
        let mut facts = Vec::new();
        for entity in entities {
            if let Some(edge) = Self::edge(stage, &entity.attrs) {
                facts.push(CollisionFact::Edge {
                    entity: entity.id,
                    edge,
                });
            }
        }
        for (i, a) in entities.iter().enumerate() {
            for b in &entities[i + 1..] {
                if Self::overlaps(&a.attrs, &b.attrs) {
                    facts.push(CollisionFact::contact(a.id, b.id));
                }
            }
        }
        facts
    }
}
