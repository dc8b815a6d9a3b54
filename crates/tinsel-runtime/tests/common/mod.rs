#![allow(dead_code)]

use tinsel_core::Value;
use tinsel_runtime::{BehaviorResult, Firing, Runtime, TaskContext};

/// Increment a runtime-wide counter.
pub fn bump(ctx: &mut TaskContext<'_>, key: &str) {
    let n = ctx
        .globals()
        .get(key)
        .and_then(Value::as_int)
        .unwrap_or(0);
    ctx.globals_mut().insert(key.to_string(), Value::Integer(n + 1));
}

/// Read a runtime-wide counter.
pub fn counter(rt: &Runtime, key: &str) -> i64 {
    rt.globals()
        .get(key)
        .and_then(Value::as_int)
        .unwrap_or(0)
}

/// A handler that only bumps `key`.
pub fn counting(
    key: &'static str,
) -> impl Fn(&mut TaskContext<'_>, &Firing) -> BehaviorResult<()> + 'static {
    move |ctx, _firing| {
        bump(ctx, key);
        Ok(())
    }
}
