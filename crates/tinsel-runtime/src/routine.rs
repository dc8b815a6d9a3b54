use std::rc::Rc;

use crate::context::TaskContext;
use crate::error::{BehaviorResult, RegistrationError, RuntimeResult};

/// What a persistent task asks for when it yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Suspend for at least this many milliseconds. Zero means "next tick".
    Wait(u64),
    /// The routine has finished and will never be resumed again.
    Done,
}

impl Step {
    /// A wait from an untyped duration, rejecting negative values.
    pub fn try_wait(ms: i64) -> RuntimeResult<Step> {
        u64::try_from(ms)
            .map(Step::Wait)
            .map_err(|_| RegistrationError::NegativeWait(ms).into())
    }
}

/// A resumable body for MAIN and CLONE behaviors.
///
/// Each call runs from the previous suspension point to the next one. All
/// state that must survive a suspension lives in `self`.
pub trait Routine {
    /// Run until the next suspension or completion.
    fn resume(&mut self, ctx: &mut TaskContext<'_>) -> BehaviorResult<Step>;
}

impl<F> Routine for F
where
    F: FnMut(&mut TaskContext<'_>) -> BehaviorResult<Step>,
{
    fn resume(&mut self, ctx: &mut TaskContext<'_>) -> BehaviorResult<Step> {
        self(ctx)
    }
}

/// Pin a closure to the [`Routine`] signature so its argument type is inferred.
pub fn routine<F>(f: F) -> F
where
    F: FnMut(&mut TaskContext<'_>) -> BehaviorResult<Step>,
{
    f
}

/// Builds a fresh routine for every task instantiated from a declaration.
pub type RoutineFactory = Rc<dyn Fn() -> Box<dyn Routine>>;

/// Wrap a typed factory closure.
pub(crate) fn factory<F, R>(make: F) -> RoutineFactory
where
    F: Fn() -> R + 'static,
    R: Routine + 'static,
{
    Rc::new(move || Box::new(make()) as Box<dyn Routine>)
}

/// MAIN body given to types that never declared one.
#[derive(Debug, Default)]
pub(crate) struct Idle;

impl Routine for Idle {
    fn resume(&mut self, _ctx: &mut TaskContext<'_>) -> BehaviorResult<Step> {
        Ok(Step::Done)
    }
}
