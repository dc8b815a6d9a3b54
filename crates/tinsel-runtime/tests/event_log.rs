use tinsel_core::{Attributes, EntityId};
use tinsel_runtime::{BehaviorTable, Op, Runtime, RuntimeConfig, Sequence};

fn narrate(rt: &Runtime) -> String {
    rt.events()
        .events()
        .iter()
        .map(|e| format!("[{}] {}", e.tick, e.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn cat_runtime(config: RuntimeConfig) -> Runtime {
    let mut rt = Runtime::new(config.with_tick_ms(100));
    rt.register_type(
        BehaviorTable::builder("Cat")
            .main(|| {
                Sequence::once(vec![
                    Op::run(|ctx| {
                        ctx.clone_self()?;
                        ctx.broadcast("meow");
                        Ok(())
                    }),
                    Op::wait(100),
                    Op::run(|ctx| {
                        ctx.delete_self();
                        Ok(())
                    }),
                ])
            })
            .on_broadcast("meow", |ctx, _f| {
                ctx.log("heard meow");
                Ok(())
            })
            .build()
            .unwrap(),
    )
    .unwrap();
    rt.add_entity("Cat", Attributes::named("Tom")).unwrap();
    rt
}

#[test]
fn narrated_run() {
    let mut rt = cat_runtime(RuntimeConfig::default());
    rt.run(3);
    insta::assert_snapshot!(narrate(&rt), @r###"
    [0] Tom (#1) spawned as Cat
    [0] Tom (#1): heard meow
    [0] "meow" reached 1 handler(s)
    [0] Tom (#2) cloned from #1
    [1] task#0 (main) of #1 finished
    [1] Tom (#1) removed
    "###);
}

#[test]
fn events_filter_by_tick_and_entity() {
    let mut rt = cat_runtime(RuntimeConfig::default());
    rt.run(3);
    let log = rt.events();
    assert_eq!(log.events_at_tick(0).len(), 4);
    assert_eq!(log.events_at_tick(1).len(), 2);
    assert!(log.events_at_tick(2).is_empty());

    let clone_events = log.events_for_entity(EntityId(2));
    assert_eq!(clone_events.len(), 1);
    assert_eq!(clone_events[0].time, 0);
    assert!(log.events_at_tick(1).iter().all(|e| e.time == 100));
}

#[test]
fn bounded_log_keeps_the_newest() {
    let mut rt = cat_runtime(RuntimeConfig::default().with_max_events(2));
    rt.run(3);
    let descriptions: Vec<&str> = rt
        .events()
        .events()
        .iter()
        .map(|e| e.description.as_str())
        .collect();
    assert_eq!(
        descriptions,
        vec!["task#0 (main) of #1 finished", "Tom (#1) removed"]
    );
}
