mod common;

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use tinsel_core::Attributes;
use tinsel_runtime::{
    BehaviorTable, Op, Runtime, RuntimeConfig, RuntimeEventKind, Sequence, Step, TaskState,
    routine,
};

use common::{bump, counter};

type Trace = Rc<RefCell<Vec<(String, u64)>>>;

/// A type whose MAIN waits `wait` ms, then records its name and the time on every resume.
fn tracer(type_name: &str, trace: &Trace, wait: u64) -> BehaviorTable {
    let trace = Rc::clone(trace);
    BehaviorTable::builder(type_name)
        .main(move || {
            let trace = Rc::clone(&trace);
            let mut started = false;
            routine(move |ctx| {
                if started {
                    trace
                        .borrow_mut()
                        .push((ctx.attrs().name.clone(), ctx.now()));
                }
                started = true;
                Ok(Step::Wait(wait))
            })
        })
        .build()
        .unwrap()
}

#[test]
fn same_tick_wakeups_resume_in_creation_order() {
    let trace: Trace = Rc::default();
    let mut rt = Runtime::new(RuntimeConfig::default().with_tick_ms(1));
    rt.register_type(tracer("Sleeper", &trace, 5)).unwrap();
    rt.add_entity("Sleeper", Attributes::named("A")).unwrap();
    rt.add_entity("Sleeper", Attributes::named("B")).unwrap();

    rt.run(6); // ticks at t=0..=5
    assert_eq!(
        *trace.borrow(),
        vec![("A".to_string(), 5), ("B".to_string(), 5)]
    );
}

#[test]
fn zero_wait_resumes_next_tick() {
    let trace: Trace = Rc::default();
    let mut rt = Runtime::new(RuntimeConfig::default().with_tick_ms(16));
    rt.register_type(tracer("Spinner", &trace, 0)).unwrap();
    rt.add_entity("Spinner", Attributes::named("S")).unwrap();

    rt.run(4);
    let times: Vec<u64> = trace.borrow().iter().map(|(_, t)| *t).collect();
    assert_eq!(times, vec![16, 32, 48]);
}

#[test]
fn completed_main_is_never_restarted() {
    let mut rt = Runtime::new(RuntimeConfig::default());
    rt.register_type(
        BehaviorTable::builder("Once")
            .main(|| {
                routine(|ctx| {
                    bump(ctx, "runs");
                    Ok(Step::Done)
                })
            })
            .build()
            .unwrap(),
    )
    .unwrap();
    let id = rt.add_entity("Once", Attributes::default()).unwrap();

    rt.run(10);
    assert_eq!(counter(&rt, "runs"), 1);
    assert_eq!(rt.tasks_for(id).count(), 0);
    assert!(rt.entity(id).is_some());
    let completed = rt.events().events().iter().any(|e| {
        matches!(e.kind, RuntimeEventKind::TaskCompleted { entity, .. } if entity == id)
    });
    assert!(completed);
}

#[test]
fn failing_task_does_not_stop_the_others() {
    let mut rt = Runtime::new(RuntimeConfig::default());
    rt.register_type(
        BehaviorTable::builder("Broken")
            .main(|| routine(|_ctx| Err(tinsel_runtime::BehaviorError::msg("out of fuel"))))
            .build()
            .unwrap(),
    )
    .unwrap();
    rt.register_type(
        BehaviorTable::builder("Steady")
            .main(|| {
                routine(|ctx| {
                    bump(ctx, "steady");
                    Ok(Step::Wait(0))
                })
            })
            .build()
            .unwrap(),
    )
    .unwrap();
    let broken = rt.add_entity("Broken", Attributes::default()).unwrap();
    rt.add_entity("Steady", Attributes::default()).unwrap();

    let first = rt.tick();
    assert_eq!(first.failed, 1);
    assert_eq!(first.resumed, 2);
    rt.run(2);

    assert_eq!(counter(&rt, "steady"), 3);
    assert_eq!(rt.tasks_for(broken).count(), 0);
    let failures: Vec<String> = rt
        .events()
        .events()
        .iter()
        .filter_map(|e| match &e.kind {
            RuntimeEventKind::TaskFailed { error, .. } => Some(error.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec!["out of fuel"]);
}

#[test]
fn panicking_behavior_is_cancelled_and_its_entity_kept() {
    let mut rt = Runtime::new(RuntimeConfig::default());
    rt.register_type(
        BehaviorTable::builder("Glitch")
            .main(|| {
                routine(|ctx| {
                    let readings: Vec<u64> = Vec::new();
                    Ok(Step::Wait(readings[ctx.tick() as usize]))
                })
            })
            .on_broadcast("poke", |_ctx, _f| panic!("poked too hard"))
            .on_broadcast("poke", |ctx, _f| {
                bump(ctx, "calm");
                Ok(())
            })
            .build()
            .unwrap(),
    )
    .unwrap();
    let glitch = rt.add_entity("Glitch", Attributes::named("Glitch")).unwrap();

    let first = rt.tick();
    assert_eq!(first.failed, 1);
    assert_eq!(rt.entity_count(), 1);
    assert_eq!(rt.entities().count(), 1);
    assert!(rt.entity(glitch).is_some());

    rt.broadcast("poke");
    let second = rt.tick();
    assert_eq!(second.failed, 1);
    assert_eq!(counter(&rt, "calm"), 1);
    assert!(rt.entity(glitch).is_some());
    // MAIN and the panicking handler are gone; the calm handler remains.
    assert_eq!(rt.tasks_for(glitch).count(), 1);

    let failures: Vec<String> = rt
        .events()
        .events()
        .iter()
        .filter_map(|e| match &e.kind {
            RuntimeEventKind::TaskFailed { error, .. } => Some(error.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(failures.len(), 2);
    assert!(failures[0].starts_with("behavior panicked: index out of bounds"));
    assert_eq!(failures[1], "behavior panicked: poked too hard");
}

#[test]
fn spawner_clones_every_three_seconds() {
    let mut rt = Runtime::new(RuntimeConfig::default().with_tick_ms(100));
    rt.register_type(
        BehaviorTable::builder("Spawner")
            .main(|| {
                Sequence::forever(vec![
                    Op::wait(3000),
                    Op::run(|ctx| {
                        ctx.clone_self()?;
                        Ok(())
                    }),
                ])
            })
            .build()
            .unwrap(),
    )
    .unwrap();
    rt.add_entity("Spawner", Attributes::named("Egg")).unwrap();
    let clones = |rt: &Runtime| rt.query().clones().count();

    rt.run_until(2999);
    assert_eq!(clones(&rt), 0);

    rt.tick(); // t=3000
    assert_eq!(clones(&rt), 1);

    rt.run_until(5999);
    assert_eq!(clones(&rt), 1);

    rt.tick(); // t=6000
    assert_eq!(clones(&rt), 2);
    // Clones have no CLONE routines, so only the original keeps spawning.
    assert_eq!(rt.tasks().count(), 1);
}

#[test]
fn tasks_report_their_state() {
    let mut rt = Runtime::new(RuntimeConfig::default());
    rt.register_type(
        BehaviorTable::builder("Napper")
            .main(|| routine(|_ctx| Ok(Step::Wait(1000))))
            .on_broadcast("wake", |_ctx, _f| Ok(()))
            .build()
            .unwrap(),
    )
    .unwrap();
    let id = rt.add_entity("Napper", Attributes::default()).unwrap();
    let states: Vec<TaskState> = rt.tasks_for(id).map(|t| t.state()).collect();
    assert_eq!(states, vec![TaskState::Created, TaskState::Created]);

    rt.tick();
    let main = rt.tasks_for(id).next().unwrap();
    assert_eq!(main.state(), TaskState::Suspended);
    assert_eq!(main.wake_at(), 1000);
}

proptest! {
    #[test]
    fn resumption_never_comes_early(wait in 0u64..500, tick_ms in 1u64..50) {
        let trace: Trace = Rc::default();
        let mut rt = Runtime::new(RuntimeConfig::default().with_tick_ms(tick_ms));
        rt.register_type(tracer("Sleeper", &trace, wait)).unwrap();
        rt.add_entity("Sleeper", Attributes::named("S")).unwrap();

        rt.run_until(3 * wait + 3 * tick_ms);
        let times: Vec<u64> = trace.borrow().iter().map(|(_, t)| *t).collect();
        prop_assert!(times.len() >= 2);
        // The first recorded resume follows the wait requested at t=0.
        let mut previous = 0;
        for t in times {
            let elapsed = t - previous;
            prop_assert!(elapsed >= wait);
            prop_assert!(elapsed <= wait + tick_ms);
            previous = t;
        }
    }

    #[test]
    fn fifo_holds_for_any_population(n in 2usize..8, wait in 0u64..300) {
        let trace: Trace = Rc::default();
        let mut rt = Runtime::new(RuntimeConfig::default().with_tick_ms(10));
        rt.register_type(tracer("Sleeper", &trace, wait)).unwrap();
        for i in 0..n {
            rt.add_entity("Sleeper", Attributes::named(format!("s{i}"))).unwrap();
        }

        rt.run_until(wait + 10);
        let names: Vec<String> = trace
            .borrow()
            .iter()
            .take(n)
            .map(|(name, _)| name.clone())
            .collect();
        let expected: Vec<String> = (0..n).map(|i| format!("s{i}")).collect();
        prop_assert_eq!(names, expected);
    }
}
