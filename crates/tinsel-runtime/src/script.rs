//! Building blocks for writing routines without hand-rolled state machines.

use tinsel_core::{Easing, Vec2};

use crate::context::TaskContext;
use crate::error::BehaviorResult;
use crate::routine::{Routine, RoutineFactory, Step, factory};

type Action = Box<dyn FnMut(&mut TaskContext<'_>) -> BehaviorResult<()>>;

/// One instruction of a [`Sequence`].
pub enum Op {
    /// Suspend for the given number of milliseconds.
    Wait(u64),
    /// Run a closure to completion without suspending.
    Run(Action),
    /// Glide somewhere; the destination is resolved when the op is reached.
    Glide(Glide),
    /// Run a nested routine, built fresh each time the op is reached, until it finishes.
    Routine(RoutineFactory),
}

impl std::fmt::Debug for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wait(ms) => write!(f, "Wait({ms})"),
            Self::Run(_) => write!(f, "Run(..)"),
            Self::Glide(glide) => std::fmt::Debug::fmt(glide, f),
            Self::Routine(_) => write!(f, "Routine(..)"),
        }
    }
}

impl Op {
    /// Suspend for `ms` milliseconds.
    pub fn wait(ms: u64) -> Self {
        Self::Wait(ms)
    }

    /// Run a closure.
    pub fn run<F>(f: F) -> Self
    where
        F: FnMut(&mut TaskContext<'_>) -> BehaviorResult<()> + 'static,
    {
        Self::Run(Box::new(f))
    }

    /// Glide to `(x, y)` over `duration` milliseconds.
    pub fn glide_to(x: f64, y: f64, duration: u64, easing: Easing) -> Self {
        Self::Glide(Glide::to(x, y, duration, easing))
    }

    /// Glide by `(dx, dy)` over `duration` milliseconds.
    pub fn glide_by(dx: f64, dy: f64, duration: u64, easing: Easing) -> Self {
        Self::Glide(Glide::by(dx, dy, duration, easing))
    }

    /// Glide `distance` units along a heading in degrees.
    pub fn glide_in_direction(
        direction: f64,
        distance: f64,
        duration: u64,
        easing: Easing,
    ) -> Self {
        Self::Glide(Glide::in_direction(direction, distance, duration, easing))
    }

    /// Glide to wherever the pointer is when the op is reached.
    pub fn glide_to_pointer(duration: u64, easing: Easing) -> Self {
        Self::Glide(Glide::to_pointer(duration, easing))
    }

    /// Run a nested routine to completion.
    pub fn routine<F, R>(make: F) -> Self
    where
        F: Fn() -> R + 'static,
        R: Routine + 'static,
    {
        Self::Routine(factory(make))
    }
}

/// A list of [`Op`]s executed in order, once or forever.
///
/// A forever sequence whose pass contained no wait yields `Wait(0)` at the
/// loop boundary, so it gives up the tick instead of spinning.
#[derive(Debug)]
pub struct Sequence {
    ops: Vec<Op>,
    repeat: bool,
    cursor: usize,
    waited: bool,
    active: Option<Active>,
}

enum Active {
    Glide(Glide),
    Nested(Box<dyn Routine>),
}

impl std::fmt::Debug for Active {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Glide(g) => std::fmt::Debug::fmt(g, f),
            Self::Nested(_) => write!(f, "Nested(..)"),
        }
    }
}

impl Sequence {
    /// Run the ops once, then finish.
    pub fn once(ops: Vec<Op>) -> Self {
        Self {
            ops,
            repeat: false,
            cursor: 0,
            waited: false,
            active: None,
        }
    }

    /// Run the ops in a loop that never finishes.
    pub fn forever(ops: Vec<Op>) -> Self {
        Self {
            repeat: true,
            ..Self::once(ops)
        }
    }

    fn start(&mut self, ctx: &mut TaskContext<'_>) -> BehaviorResult<Option<Step>> {
        let Some(op) = self.ops.get_mut(self.cursor) else {
            return Ok(None);
        };
        match op {
            Op::Wait(ms) => {
                let ms = *ms;
                self.cursor += 1;
                self.waited = true;
                return Ok(Some(Step::Wait(ms)));
            }
            Op::Run(action) => {
                action(ctx)?;
                self.cursor += 1;
            }
            Op::Glide(glide) => {
                self.active = Some(Active::Glide(glide.clone()));
            }
            Op::Routine(make) => {
                self.active = Some(Active::Nested(make()));
            }
        }
        Ok(None)
    }
}

impl Routine for Sequence {
    fn resume(&mut self, ctx: &mut TaskContext<'_>) -> BehaviorResult<Step> {
        loop {
            if let Some(active) = self.active.as_mut() {
                let step = match active {
                    Active::Glide(glide) => glide.resume(ctx)?,
                    Active::Nested(routine) => routine.resume(ctx)?,
                };
                match step {
                    Step::Wait(ms) => {
                        self.waited = true;
                        return Ok(Step::Wait(ms));
                    }
                    Step::Done => {
                        self.active = None;
                        self.cursor += 1;
                        continue;
                    }
                }
            }

            if self.cursor >= self.ops.len() {
                if !self.repeat || self.ops.is_empty() {
                    return Ok(Step::Done);
                }
                self.cursor = 0;
                if !std::mem::take(&mut self.waited) {
                    return Ok(Step::Wait(0));
                }
                continue;
            }

            if let Some(step) = self.start(ctx)? {
                return Ok(step);
            }
        }
    }
}

/// Moves the owning entity to a target over a duration.
///
/// The start position, destination and time are captured on the first
/// resumption. Each tick sets the position along the eased path and yields
/// `Wait(0)`; the final resumption snaps exactly onto the destination.
#[derive(Debug, Clone)]
pub struct Glide {
    goal: Goal,
    duration: u64,
    easing: Easing,
    start: Option<Leg>,
}

#[derive(Debug, Clone, Copy)]
enum Goal {
    Point(Vec2),
    Offset(Vec2),
    Heading { direction: f64, distance: f64 },
    Pointer,
}

#[derive(Debug, Clone, Copy)]
struct Leg {
    from: Vec2,
    to: Vec2,
    at: u64,
}

impl Glide {
    fn new(goal: Goal, duration: u64, easing: Easing) -> Self {
        Self {
            goal,
            duration,
            easing,
            start: None,
        }
    }

    /// Glide to an absolute position.
    pub fn to(x: f64, y: f64, duration: u64, easing: Easing) -> Self {
        Self::new(Goal::Point(Vec2::new(x, y)), duration, easing)
    }

    /// Glide by an offset from the position at the first resumption.
    pub fn by(dx: f64, dy: f64, duration: u64, easing: Easing) -> Self {
        Self::new(Goal::Offset(Vec2::new(dx, dy)), duration, easing)
    }

    /// Glide `distance` units along a heading in degrees (90 is up).
    pub fn in_direction(direction: f64, distance: f64, duration: u64, easing: Easing) -> Self {
        Self::new(
            Goal::Heading {
                direction,
                distance,
            },
            duration,
            easing,
        )
    }

    /// Glide to the pointer position at the first resumption.
    pub fn to_pointer(duration: u64, easing: Easing) -> Self {
        Self::new(Goal::Pointer, duration, easing)
    }

    fn destination(&self, ctx: &TaskContext<'_>, from: Vec2) -> Vec2 {
        match self.goal {
            Goal::Point(point) => point,
            Goal::Offset(offset) => from + offset,
            Goal::Heading {
                direction,
                distance,
            } => from + Vec2::from_heading(direction) * distance,
            Goal::Pointer => ctx.pointer(),
        }
    }
}

impl Routine for Glide {
    fn resume(&mut self, ctx: &mut TaskContext<'_>) -> BehaviorResult<Step> {
        let now = ctx.now();
        let leg = match self.start {
            Some(leg) => leg,
            None => {
                let from = ctx.attrs().position;
                let to = self.destination(ctx, from);
                let leg = Leg { from, to, at: now };
                self.start = Some(leg);
                leg
            }
        };

        let elapsed = now.saturating_sub(leg.at);
        if elapsed >= self.duration {
            ctx.attrs_mut().position = leg.to;
            return Ok(Step::Done);
        }

        let t = elapsed as f64 / self.duration as f64;
        ctx.attrs_mut().position = leg.from.lerp(leg.to, self.easing.apply(t));
        Ok(Step::Wait(0))
    }
}
