use std::collections::BTreeMap;
use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::entity::Value;
use crate::error::{CoreError, CoreResult};
use crate::trigger::Edge;

/// A 2D point or vector in stage coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Vec2 {
    /// Construct a vector from its components.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Distance to another point.
    pub fn distance(self, other: Vec2) -> f64 {
        (other - self).length()
    }

    /// Linear interpolation towards `other`; `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(self, other: Vec2, t: f64) -> Vec2 {
        self + (other - self) * t
    }

    /// Unit vector for a heading in degrees (0 = right, 90 = up).
    pub fn from_heading(degrees: f64) -> Vec2 {
        let rad = degrees.to_radians();
        Vec2::new(rad.cos(), -rad.sin())
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// An 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Collision footprint, before scaling by [`Attributes::size`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Axis-aligned rectangle centred on the position.
    Rect {
        /// Unscaled width.
        width: f64,
        /// Unscaled height.
        height: f64,
    },
    /// Circle centred on the position.
    Circle {
        /// Unscaled radius.
        radius: f64,
    },
}

impl Default for Shape {
    fn default() -> Self {
        Self::Rect {
            width: 40.0,
            height: 40.0,
        }
    }
}

/// Velocity and the coefficients a physics integrator would apply.
///
/// The runtime only stores these; integrating them is up to the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsState {
    /// Current velocity in stage units per tick.
    pub velocity: Vec2,
    /// Constant acceleration added each tick.
    pub gravity: Vec2,
    /// Velocity multiplier per tick, in `[0, 1]`.
    pub friction: f64,
    /// Bounce coefficient on boundary hits, in `[0, 1]`.
    pub elasticity: f64,
    /// Rotation speed in degrees per tick.
    pub angular_velocity: f64,
}

impl Default for PhysicsState {
    fn default() -> Self {
        Self {
            velocity: Vec2::default(),
            gravity: Vec2::new(0.0, 0.2),
            friction: 0.98,
            elasticity: 0.8,
            angular_velocity: 0.0,
        }
    }
}

/// How a speech bubble is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechKind {
    /// Spoken out loud.
    Say,
    /// A thought cloud.
    Think,
}

/// Text shown next to an entity until its timer runs out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speech {
    /// The words.
    pub text: String,
    /// Bubble style.
    pub kind: SpeechKind,
    /// Milliseconds left before the bubble clears.
    pub remaining: u64,
}

/// The mutable attribute set of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    /// Display name, also used for broadcast and collision addressing.
    pub name: String,
    /// Centre position on the stage.
    pub position: Vec2,
    /// Heading in degrees; 90 points up.
    pub direction: f64,
    /// Uniform scale factor, never below 0.01.
    pub size: f64,
    /// Hidden entities are skipped by collision detection.
    pub visible: bool,
    /// Costume names; decoding the images is the renderer's job.
    pub costumes: Vec<String>,
    /// Index into `costumes`.
    pub costume: usize,
    /// Fill colour used when no costume is set.
    pub color: Rgb,
    /// Collision footprint.
    pub shape: Shape,
    /// Physics hooks, present once a behavior has requested any.
    pub physics: Option<PhysicsState>,
    /// Current speech bubble, if any.
    pub speech: Option<Speech>,
    /// Per-entity variables.
    pub vars: BTreeMap<String, Value>,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            name: "Sprite".to_string(),
            position: Vec2::new(400.0, 300.0),
            direction: 90.0,
            size: 1.0,
            visible: true,
            costumes: Vec::new(),
            costume: 0,
            color: Rgb(255, 100, 100),
            shape: Shape::default(),
            physics: None,
            speech: None,
            vars: BTreeMap::new(),
        }
    }
}

impl Attributes {
    /// Default attributes with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder: set the starting position.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Vec2::new(x, y);
        self
    }

    /// Builder: set the collision shape.
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    /// Builder: set the costume list, selecting the first.
    pub fn with_costumes<I, S>(mut self, costumes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.costumes = costumes.into_iter().map(Into::into).collect();
        self.costume = 0;
        self
    }

    /// Builder: set the fill colour.
    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    /// Half-width and half-height of the scaled footprint.
    pub fn half_extents(&self) -> Vec2 {
        match self.shape {
            Shape::Rect { width, height } => Vec2::new(width / 2.0, height / 2.0) * self.size,
            Shape::Circle { radius } => Vec2::new(radius, radius) * self.size,
        }
    }

    /// Move along the current heading.
    pub fn move_steps(&mut self, steps: f64) {
        self.position += Vec2::from_heading(self.direction) * steps;
    }

    /// Shift by an offset, ignoring the stage bounds.
    pub fn shift(&mut self, dx: f64, dy: f64) {
        self.position += Vec2::new(dx, dy);
    }

    /// Shift by an offset, stopping where the footprint meets the side of a
    /// `width` x `height` stage it is moving towards.
    pub fn shift_within(&mut self, dx: f64, dy: f64, width: f64, height: f64) {
        let half = self.half_extents();
        let mut next = self.position + Vec2::new(dx, dy);
        if dx < 0.0 {
            next.x = next.x.max(half.x);
        } else if dx > 0.0 {
            next.x = next.x.min(width - half.x);
        }
        if dy < 0.0 {
            next.y = next.y.max(half.y);
        } else if dy > 0.0 {
            next.y = next.y.min(height - half.y);
        }
        self.position = next;
    }

    /// True if `point` lies inside the scaled footprint.
    pub fn contains_point(&self, point: Vec2) -> bool {
        let d = point - self.position;
        match self.shape {
            Shape::Circle { .. } => d.length() <= self.half_extents().x,
            Shape::Rect { .. } => {
                let half = self.half_extents();
                d.x.abs() <= half.x && d.y.abs() <= half.y
            }
        }
    }

    /// The side of a `width` x `height` stage closest to the position, and
    /// the point on it straight across from the entity. Ties go left, right,
    /// top, bottom.
    pub fn nearest_edge(&self, width: f64, height: f64) -> (Edge, Vec2) {
        let Vec2 { x, y } = self.position;
        let candidates = [
            (Edge::Left, x, Vec2::new(0.0, y)),
            (Edge::Right, width - x, Vec2::new(width, y)),
            (Edge::Top, y, Vec2::new(x, 0.0)),
            (Edge::Bottom, height - y, Vec2::new(x, height)),
        ];
        let mut best = candidates[0];
        for candidate in &candidates[1..] {
            if candidate.1 < best.1 {
                best = *candidate;
            }
        }
        (best.0, best.2)
    }

    /// Rotate clockwise.
    pub fn turn_right(&mut self, degrees: f64) {
        self.direction = (self.direction - degrees).rem_euclid(360.0);
    }

    /// Rotate counter-clockwise.
    pub fn turn_left(&mut self, degrees: f64) {
        self.direction = (self.direction + degrees).rem_euclid(360.0);
    }

    /// Set the heading, normalised into `[0, 360)`.
    pub fn point_in_direction(&mut self, degrees: f64) {
        self.direction = degrees.rem_euclid(360.0);
    }

    /// Turn to face a point on the stage.
    pub fn point_towards(&mut self, target: Vec2) {
        let degrees = (self.position.y - target.y)
            .atan2(target.x - self.position.x)
            .to_degrees();
        self.point_in_direction(degrees);
    }

    /// Jump to a position.
    pub fn goto(&mut self, x: f64, y: f64) {
        self.position = Vec2::new(x, y);
    }

    /// Set the scale factor.
    pub fn set_size(&mut self, size: f64) {
        self.size = size.max(0.01);
    }

    /// Grow or shrink the scale factor.
    pub fn change_size(&mut self, delta: f64) {
        self.set_size(self.size + delta);
    }

    /// Name of the current costume, if any are set.
    pub fn current_costume(&self) -> Option<&str> {
        self.costumes.get(self.costume).map(String::as_str)
    }

    /// Advance to the next costume, wrapping around.
    pub fn next_costume(&mut self) {
        if !self.costumes.is_empty() {
            self.costume = (self.costume + 1) % self.costumes.len();
        }
    }

    /// Select a costume by name.
    pub fn switch_costume(&mut self, name: &str) -> CoreResult<()> {
        let index = self
            .costumes
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| CoreError::UnknownCostume(name.to_string()))?;
        self.costume = index;
        Ok(())
    }

    /// Show `text` in a speech bubble for `duration` milliseconds.
    pub fn say(&mut self, text: impl Into<String>, duration: u64) {
        self.speech = Some(Speech {
            text: text.into(),
            kind: SpeechKind::Say,
            remaining: duration,
        });
    }

    /// Show `text` in a thought cloud for `duration` milliseconds.
    pub fn think(&mut self, text: impl Into<String>, duration: u64) {
        self.speech = Some(Speech {
            text: text.into(),
            kind: SpeechKind::Think,
            remaining: duration,
        });
    }

    /// Remove any bubble right away.
    pub fn clear_speech(&mut self) {
        self.speech = None;
    }

    /// Count the bubble timer down by `elapsed` milliseconds, clearing it
    /// once it reaches zero. Returns true if a bubble was cleared.
    pub fn count_down_speech(&mut self, elapsed: u64) -> bool {
        let Some(speech) = self.speech.as_mut() else {
            return false;
        };
        speech.remaining = speech.remaining.saturating_sub(elapsed);
        if speech.remaining == 0 {
            self.speech = None;
            return true;
        }
        false
    }

    /// Physics state, created with defaults on first use.
    pub fn physics_mut(&mut self) -> &mut PhysicsState {
        self.physics.get_or_insert_with(PhysicsState::default)
    }

    /// Accelerate by a force (unit mass).
    pub fn apply_force(&mut self, fx: f64, fy: f64) {
        self.physics_mut().velocity += Vec2::new(fx, fy);
    }

    /// Change velocity instantly.
    pub fn apply_impulse(&mut self, ix: f64, iy: f64) {
        self.physics_mut().velocity += Vec2::new(ix, iy);
    }

    /// Replace the velocity.
    pub fn set_velocity(&mut self, vx: f64, vy: f64) {
        self.physics_mut().velocity = Vec2::new(vx, vy);
    }

    /// Replace the gravity vector.
    pub fn set_gravity(&mut self, gx: f64, gy: f64) {
        self.physics_mut().gravity = Vec2::new(gx, gy);
    }

    /// Set friction, clamped into `[0, 1]`.
    pub fn set_friction(&mut self, friction: f64) {
        self.physics_mut().friction = friction.clamp(0.0, 1.0);
    }

    /// Set elasticity, clamped into `[0, 1]`.
    pub fn set_elasticity(&mut self, elasticity: f64) {
        self.physics_mut().elasticity = elasticity.clamp(0.0, 1.0);
    }

    /// Read a variable.
    pub fn var(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Write a variable.
    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }
}
