//! Built-in demo scenes.
//!
//! Each demo registers its entity types and scenes on a fresh [`Runtime`],
//! then activates its starting scene. Demos that need keyboard input carry
//! a fixed script of key transitions the runner feeds in between ticks.

use tinsel_core::{Attributes, Easing, KeyCode, Shape, Value};
use tinsel_runtime::{
    BehaviorTable, FaceTarget, Op, Runtime, RuntimeResult, Scene, Sequence, Step, TaskContext,
    routine,
};

/// A key transition the runner applies before a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostInput {
    /// Press and hold a key.
    Press(KeyCode),
    /// Let go of a key.
    Release(KeyCode),
}

/// A named, self-contained demo.
pub struct Demo {
    /// Name used on the command line.
    pub name: &'static str,
    /// One-line description.
    pub about: &'static str,
    /// Scene activated at start.
    pub scene: &'static str,
    setup: fn(&mut Runtime) -> RuntimeResult<()>,
    inputs: &'static [(u64, HostInput)],
}

impl Demo {
    /// Register the demo's types and scenes, then activate its first scene.
    pub fn install(&self, rt: &mut Runtime) -> RuntimeResult<()> {
        (self.setup)(rt)?;
        rt.set_scene(self.scene)
    }

    /// Apply the key transitions scripted for the runtime's next tick.
    pub fn feed_input(&self, rt: &mut Runtime) {
        let tick = rt.current_tick();
        for (at, input) in self.inputs {
            if *at != tick {
                continue;
            }
            match *input {
                HostInput::Press(code) => rt.input_mut().press_key(code),
                HostInput::Release(code) => rt.input_mut().release_key(code),
            }
        }
    }

    /// Number of scripted key transitions.
    pub fn scripted_inputs(&self) -> usize {
        self.inputs.len()
    }
}

/// Every built-in demo.
pub const DEMOS: &[Demo] = &[
    Demo {
        name: "spawner",
        about: "An egg hatches a chick every three seconds; chicks drift up and vanish",
        scene: "meadow",
        setup: spawner,
        inputs: &[],
    },
    Demo {
        name: "bounce",
        about: "A ball bounces off the walls and a paddle that tracks it or follows the arrow keys",
        scene: "court",
        setup: bounce,
        inputs: &[
            (40, HostInput::Press(KeyCode::LEFT)),
            (70, HostInput::Release(KeyCode::LEFT)),
        ],
    },
    Demo {
        name: "chase",
        about: "A cat chases a hopping mouse; three catches switch to the victory scene",
        scene: "field",
        setup: chase,
        inputs: &[],
    },
];

/// Look up a demo by name.
pub fn find(name: &str) -> Option<&'static Demo> {
    DEMOS.iter().find(|d| d.name == name)
}

/// Increment a runtime-wide counter and return its new value.
fn bump(ctx: &mut TaskContext<'_>, key: &str) -> i64 {
    let n = ctx.globals().get(key).and_then(Value::as_int).unwrap_or(0) + 1;
    ctx.globals_mut().insert(key.to_string(), Value::Integer(n));
    n
}

fn spawner(rt: &mut Runtime) -> RuntimeResult<()> {
    rt.register_type(BehaviorTable::builder("Backdrop").build()?)?;
    rt.register_type(
        BehaviorTable::builder("Spawner")
            .main(|| {
                Sequence::forever(vec![
                    Op::wait(3000),
                    Op::run(|ctx| {
                        ctx.clone_self()?;
                        ctx.log("hatched");
                        Ok(())
                    }),
                ])
            })
            .on_clone(|| {
                Sequence::once(vec![
                    Op::run(|ctx| {
                        ctx.attrs_mut().name = "Chick".to_string();
                        ctx.attrs_mut().set_size(0.5);
                        ctx.goto_random_position();
                        Ok(())
                    }),
                    Op::glide_by(0.0, -60.0, 2000, Easing::EaseOut),
                    Op::wait(8000),
                    Op::run(|ctx| {
                        ctx.delete_self();
                        Ok(())
                    }),
                ])
            })
            .build()?,
    )?;
    rt.register_scene(
        Scene::new("meadow")
            .with_stage("Backdrop", Attributes::named("Meadow"))
            .spawn("Spawner", Attributes::named("Egg")),
    )
}

fn steer_x(ctx: &mut TaskContext<'_>, sign: f64) {
    let physics = ctx.attrs_mut().physics_mut();
    physics.velocity.x = sign * physics.velocity.x.abs();
}

fn steer_y(ctx: &mut TaskContext<'_>, sign: f64) {
    let physics = ctx.attrs_mut().physics_mut();
    physics.velocity.y = sign * physics.velocity.y.abs();
}

fn bounce(rt: &mut Runtime) -> RuntimeResult<()> {
    rt.register_type(
        BehaviorTable::builder("Court")
            .on_broadcast("hit", |ctx, _firing| {
                let rallies = bump(ctx, "rallies");
                if rallies % 5 == 0 {
                    ctx.log(format!("{rallies} rallies"));
                }
                Ok(())
            })
            .build()?,
    )?;
    rt.register_type(
        BehaviorTable::builder("Ball")
            .main(|| {
                routine(|ctx| {
                    let attrs = ctx.attrs_mut();
                    if attrs.physics.is_none() {
                        attrs.set_velocity(6.0, 4.0);
                    }
                    let velocity = attrs.physics_mut().velocity;
                    attrs.position += velocity;
                    Ok(Step::Wait(0))
                })
            })
            .on_edge("left", |ctx, _firing| {
                steer_x(ctx, 1.0);
                Ok(())
            })
            .on_edge("right", |ctx, _firing| {
                steer_x(ctx, -1.0);
                Ok(())
            })
            .on_edge("top", |ctx, _firing| {
                steer_y(ctx, 1.0);
                Ok(())
            })
            .on_edge("bottom", |ctx, _firing| {
                bump(ctx, "misses");
                steer_y(ctx, -1.0);
                Ok(())
            })
            .on_sprite_collision("Paddle", |ctx, _firing| {
                let physics = ctx.attrs_mut().physics_mut();
                let falling = physics.velocity.y > 0.0;
                if falling {
                    physics.velocity.y = -physics.velocity.y;
                    ctx.broadcast("hit");
                }
                Ok(())
            })
            .build()?,
    )?;
    rt.register_type(
        BehaviorTable::builder("Paddle")
            .main(|| {
                routine(|ctx| {
                    let steering = ctx.key_down(KeyCode::LEFT) || ctx.key_down(KeyCode::RIGHT);
                    if !steering
                        && let Some(ball_x) = ctx
                            .query()
                            .name("Ball")
                            .first()
                            .map(|ball| ball.attrs.position.x)
                    {
                        let x = ctx.attrs().position.x;
                        ctx.attrs_mut().position.x = x + (ball_x - x).clamp(-5.0, 5.0);
                    }
                    Ok(Step::Wait(0))
                })
            })
            .on_key(KeyCode::LEFT, "held", |ctx, _firing| {
                ctx.attrs_mut().position.x -= 8.0;
                Ok(())
            })
            .on_key(KeyCode::RIGHT, "held", |ctx, _firing| {
                ctx.attrs_mut().position.x += 8.0;
                Ok(())
            })
            .build()?,
    )?;
    rt.register_scene(
        Scene::new("court")
            .with_stage("Court", Attributes::named("Court"))
            .spawn(
                "Ball",
                Attributes::named("Ball")
                    .at(400.0, 200.0)
                    .with_shape(Shape::Circle { radius: 10.0 }),
            )
            .spawn(
                "Paddle",
                Attributes::named("Paddle")
                    .at(400.0, 560.0)
                    .with_shape(Shape::Rect {
                        width: 120.0,
                        height: 16.0,
                    }),
            ),
    )
}

fn chase(rt: &mut Runtime) -> RuntimeResult<()> {
    rt.register_type(
        BehaviorTable::builder("Field")
            .on_broadcast("caught", |ctx, _firing| {
                let catches = bump(ctx, "catches");
                ctx.log(format!("catch #{catches}"));
                if catches >= 3 {
                    ctx.switch_scene("victory")?;
                }
                Ok(())
            })
            .build()?,
    )?;
    rt.register_type(
        BehaviorTable::builder("Mouse")
            .main(|| {
                Sequence::forever(vec![
                    Op::run(|ctx| {
                        ctx.goto_random_position();
                        Ok(())
                    }),
                    Op::wait(1500),
                ])
            })
            .on_broadcast("caught", |ctx, _firing| {
                ctx.attrs_mut().say("eek", 1000);
                ctx.goto_random_position();
                Ok(())
            })
            .build()?,
    )?;
    rt.register_type(
        BehaviorTable::builder("Cat")
            .main(|| {
                routine(|ctx| {
                    if ctx.face_towards(&FaceTarget::Named("Mouse".into())) {
                        ctx.attrs_mut().move_steps(8.0);
                    }
                    Ok(Step::Wait(0))
                })
            })
            .on_sprite_collision("Mouse", |ctx, _firing| {
                ctx.log("caught the mouse");
                ctx.broadcast("caught");
                Ok(())
            })
            .build()?,
    )?;
    rt.register_type(
        BehaviorTable::builder("Banner")
            .main(|| {
                Sequence::once(vec![Op::run(|ctx| {
                    ctx.log("game over");
                    Ok(())
                })])
            })
            .build()?,
    )?;
    rt.register_type(
        BehaviorTable::builder("Trophy")
            .main(|| {
                Sequence::once(vec![
                    Op::glide_to(400.0, 300.0, 2000, Easing::EaseInOut),
                    Op::run(|ctx| {
                        ctx.log("trophy landed");
                        Ok(())
                    }),
                ])
            })
            .build()?,
    )?;
    rt.register_scene(
        Scene::new("field")
            .with_stage("Field", Attributes::named("Field"))
            .spawn("Cat", Attributes::named("Cat").at(100.0, 100.0))
            .spawn("Mouse", Attributes::named("Mouse").at(600.0, 400.0)),
    )?;
    rt.register_scene(
        Scene::new("victory")
            .with_stage("Banner", Attributes::named("Podium"))
            .spawn("Trophy", Attributes::named("Trophy").at(400.0, 0.0)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinsel_runtime::RuntimeConfig;

    #[test]
    fn every_demo_installs() {
        for demo in DEMOS {
            let mut rt = Runtime::new(RuntimeConfig::default());
            demo.install(&mut rt).unwrap();
            assert_eq!(rt.active_scene(), Some(demo.scene));
            assert!(rt.entity_count() >= 2, "{} is too empty", demo.name);
        }
    }

    #[test]
    fn find_by_name() {
        assert_eq!(find("bounce").map(|d| d.scene), Some("court"));
        assert!(find("pong").is_none());
    }

    #[test]
    fn scripted_keys_steer_the_paddle() {
        let demo = find("bounce").unwrap();
        let mut rt = Runtime::new(RuntimeConfig::default());
        demo.install(&mut rt).unwrap();
        for _ in 0..45 {
            demo.feed_input(&mut rt);
            rt.tick();
        }
        assert!(rt.input().key_down(KeyCode::LEFT));
        for _ in 0..30 {
            demo.feed_input(&mut rt);
            rt.tick();
        }
        assert!(!rt.input().key_down(KeyCode::LEFT));
    }

    #[test]
    fn ball_stays_on_stage() {
        let mut rt = Runtime::new(RuntimeConfig::default());
        find("bounce").unwrap().install(&mut rt).unwrap();
        rt.run(500);
        let ball = rt.find_by_name("Ball")[0].attrs.position;
        assert!((-20.0..=820.0).contains(&ball.x));
        assert!((-20.0..=620.0).contains(&ball.y));
    }
}
