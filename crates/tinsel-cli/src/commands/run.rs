use std::path::{Path, PathBuf};

use clap::Args;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;
use tinsel_core::{Entity, EntityRole};
use tinsel_runtime::{Runtime, RuntimeConfig, RuntimeEventKind, TickReport};
use tracing::debug;

use crate::demos::{self, Demo};

#[derive(Args)]
pub struct RunArgs {
    /// Demo to run (see `tinsel demos`)
    pub demo: String,

    /// Number of ticks to run
    #[arg(short, long, default_value = "600")]
    pub ticks: u64,

    /// Simulated milliseconds per tick (overrides the config file)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: Option<u64>,

    /// RNG seed (overrides the config file)
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// JSON file with runtime configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the final state as JSON instead of tables
    #[arg(long)]
    pub json: bool,

    /// Show the full event log and debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Counters summed over every tick of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub resumed: usize,
    pub handlers_fired: usize,
    pub failed: usize,
    pub broadcasts: usize,
    pub spawned: usize,
    pub removed: usize,
}

impl Totals {
    fn add(&mut self, report: &TickReport) {
        self.resumed += report.resumed;
        self.handlers_fired += report.handlers_fired;
        self.failed += report.failed;
        self.broadcasts += report.broadcasts;
        self.spawned += report.spawned;
        self.removed += report.removed;
    }
}

#[derive(Serialize)]
struct RunSummary<'a> {
    demo: &'a str,
    ticks: u64,
    time: u64,
    scene: Option<&'a str>,
    totals: &'a Totals,
    entities: Vec<&'a Entity>,
}

pub fn run(args: &RunArgs) -> Result<(), String> {
    let demo = demos::find(&args.demo)
        .ok_or_else(|| format!("unknown demo '{}' (try `tinsel demos`)", args.demo))?;

    let mut config = load_config(args.config.as_deref())?;
    if let Some(tick_ms) = args.tick_ms {
        config.tick_ms = tick_ms;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let (rt, totals) = simulate(demo, config, args.ticks)?;

    if args.json {
        let summary = RunSummary {
            demo: demo.name,
            ticks: args.ticks,
            time: rt.now(),
            scene: rt.active_scene(),
            totals: &totals,
            entities: rt.entities().collect(),
        };
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| format!("JSON serialization failed: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    print_report(demo, &rt, &totals, args);
    Ok(())
}

/// Read a runtime configuration, or fall back to the defaults.
fn load_config(path: Option<&Path>) -> Result<RuntimeConfig, String> {
    let Some(path) = path else {
        return Ok(RuntimeConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid config {}: {e}", path.display()))
}

/// Install a demo and run it for `ticks` ticks.
pub fn simulate(
    demo: &Demo,
    config: RuntimeConfig,
    ticks: u64,
) -> Result<(Runtime, Totals), String> {
    let mut rt = Runtime::new(config);
    demo.install(&mut rt)
        .map_err(|e| format!("demo '{}' failed to start: {e}", demo.name))?;
    debug!(demo = demo.name, ticks, "running demo");

    let mut totals = Totals::default();
    for _ in 0..ticks {
        demo.feed_input(&mut rt);
        totals.add(&rt.tick());
    }
    Ok((rt, totals))
}

fn print_report(demo: &Demo, rt: &Runtime, totals: &Totals, args: &RunArgs) {
    let config = rt.config();
    println!(
        "  {} '{}' {}",
        "Demo".bold(),
        demo.name,
        format!(
            "({} ticks, seed={}, {}ms/tick)",
            args.ticks, config.seed, config.tick_ms
        )
        .dimmed()
    );
    println!(
        "  {} entities live, {} events logged, scene {}",
        rt.entity_count(),
        rt.events().len(),
        rt.active_scene().unwrap_or("-")
    );
    println!(
        "  {} resumed, {} handlers fired, {} failed, {} broadcasts, {} spawned, {} removed",
        totals.resumed,
        totals.handlers_fired,
        totals.failed,
        totals.broadcasts,
        totals.spawned,
        totals.removed
    );
    println!("  Simulated time: {}ms", rt.now());
    println!();

    if args.verbose {
        println!("  {}", "Event Log".bold().underline());
        println!();
        for event in rt.events().events() {
            let tick_label = format!("[tick {:>4}]", event.tick).dimmed();
            let desc = colorize_event(&event.kind, &event.description);
            println!("  {tick_label} {desc}");
        }
        if rt.events().is_empty() {
            println!("  {}", "(no events)".dimmed());
        }
        println!();
    } else {
        let notable: Vec<_> = rt
            .events()
            .events()
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    RuntimeEventKind::TaskFailed { .. }
                        | RuntimeEventKind::BroadcastsDeferred { .. }
                )
            })
            .collect();
        if !notable.is_empty() {
            println!("  {}", "Notable Events".bold().underline());
            for event in notable {
                let label = match event.kind {
                    RuntimeEventKind::TaskFailed { .. } => "FAIL".red().bold(),
                    _ => "WARN".yellow().bold(),
                };
                println!("  {label}  {}", event.description);
            }
            println!();
        }
    }

    println!("  {}", "Entities".bold().underline());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Name", "Type", "Role", "Position", "Direction", "Tasks"]);

    for entity in rt.entities() {
        let role = match (entity.role, entity.is_clone) {
            (EntityRole::Stage, _) => "stage",
            (EntityRole::Sprite, true) => "clone",
            (EntityRole::Sprite, false) => "sprite",
        };
        let pos = entity.attrs.position;
        table.add_row(vec![
            entity.id.to_string(),
            entity.name().to_string(),
            entity.type_name.clone(),
            role.to_string(),
            format!("({:.1}, {:.1})", pos.x, pos.y),
            format!("{:.0}", entity.attrs.direction),
            rt.tasks_for(entity.id).count().to_string(),
        ]);
    }

    println!("{table}");
    println!();
}

fn colorize_event(kind: &RuntimeEventKind, description: &str) -> colored::ColoredString {
    match kind {
        RuntimeEventKind::TaskFailed { .. } => description.red().bold(),
        RuntimeEventKind::BroadcastsDeferred { .. } => description.yellow(),
        RuntimeEventKind::EntitySpawned { .. } => description.green(),
        RuntimeEventKind::EntityRemoved { .. } => description.red(),
        RuntimeEventKind::SceneSwitched { .. } => description.magenta().bold(),
        RuntimeEventKind::BroadcastDelivered { .. } => description.cyan(),
        RuntimeEventKind::TaskCompleted { .. } => description.dimmed(),
        RuntimeEventKind::Log { .. } => description.normal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narrate(rt: &Runtime) -> String {
        rt.events()
            .events()
            .iter()
            .map(|e| format!("[{}] {}", e.tick, e.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn spawner_summary() {
        let demo = demos::find("spawner").unwrap();
        let (rt, totals) = simulate(demo, RuntimeConfig::default().with_tick_ms(1000), 7).unwrap();

        assert_eq!(
            totals,
            Totals {
                resumed: 7,
                handlers_fired: 0,
                failed: 0,
                broadcasts: 0,
                spawned: 2,
                removed: 0,
            }
        );
        assert_eq!(rt.now(), 7000);
        assert_eq!(rt.entity_count(), 4);
        insta::assert_snapshot!(narrate(&rt), @r###"
        [0] Meadow (#1) spawned as Backdrop
        [0] Egg (#2) spawned as Spawner
        [0] scene "meadow" activated
        [0] task#0 (main) of #1 finished
        [3] Egg (#2): hatched
        [3] Egg (#3) cloned from #2
        [6] Egg (#2): hatched
        [6] Egg (#4) cloned from #2
        "###);
    }

    #[test]
    fn same_seed_same_run() {
        let demo = demos::find("chase").unwrap();
        let positions = |seed| {
            let (rt, _) = simulate(demo, RuntimeConfig::default().with_seed(seed), 200).unwrap();
            rt.entities()
                .map(|e| (e.attrs.position.x, e.attrs.position.y))
                .collect::<Vec<_>>()
        };
        assert_eq!(positions(7), positions(7));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/tinsel.json"))).unwrap_err();
        assert!(err.starts_with("cannot read"));
        assert_eq!(load_config(None).unwrap(), RuntimeConfig::default());
    }
}
