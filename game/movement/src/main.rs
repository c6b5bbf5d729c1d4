use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use common::*;
use config::ConfigType;
use movement::{
    ObserverSet, PathBroadcaster, PathCollaborators, PathSettings, Runtime, StraightLinePathfinder,
    Units,
};

/// Spawns a few units, walks them across open ground and prints every path update observers see
#[derive(argh::FromArgs)]
struct Args {
    /// config file to load and watch for changes
    #[argh(option)]
    config: Option<PathBuf>,

    /// maximum number of ticks to run, overrides config
    #[argh(option)]
    ticks: Option<u32>,

    /// number of units to spawn, overrides config
    #[argh(option)]
    units: Option<u32>,
}

static TICK: AtomicU64 = AtomicU64::new(0);

fn log_time(out: &mut dyn Write) -> std::io::Result<()> {
    write!(out, "T{:04}", TICK.load(Ordering::Relaxed))
}

fn main() {
    let args = argh::from_env::<Args>();

    let _logging = logging::LoggerBuilder::with_env()
        .and_then(|builder| builder.init(log_time))
        .expect("logging failed");
    info!("initialized logging"; "level" => ?_logging.level());

    if let Err(err) = run(args) {
        error!("demo failed: {}", err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    if let Some(path) = args.config.as_deref() {
        info!("loading config from '{}'", path.display());
        config::init(ConfigType::WatchedFile(path))?;
    }

    let initial = config::get();
    let ticks = args.ticks.unwrap_or(initial.simulation.ticks);
    let unit_count = args.units.unwrap_or(initial.simulation.units);
    let spacing = initial.simulation.spacing;
    let speed = initial.movement.move_speed;

    let runtime = Runtime::default();
    let observers = Rc::new(ObserverSet::default());
    let mut updates = observers.subscribe();

    let collaborators = PathCollaborators {
        runtime: runtime.clone(),
        pathfinder: Rc::new(StraightLinePathfinder::from_config(&initial.navigation)),
        broadcaster: PathBroadcaster::new(observers),
    };
    let mut units = Units::new(collaborators, PathSettings::from(&initial.movement));
    drop(initial);

    let spawned = (0..unit_count)
        .map(|i| units.spawn_linear(Position::new(i as F * spacing, 0.0, 0.0), speed))
        .collect_vec();

    for (i, &unit) in spawned.iter().enumerate() {
        let target = Position::new(i as F * spacing, 0.0, spacing * 2.0);
        let request = units.move_to(unit, target)?;
        info!("requested move"; unit, "target" => ?target, "result" => ?request);
    }

    // change of mind halfway across
    let supersede_at = u64::from(ticks / 4);
    let mut superseded = false;

    for _ in 0..ticks {
        let tick = runtime.current_tick() + 1;
        TICK.store(tick, Ordering::Relaxed);

        // picks up edits made to a watched config file
        units.set_settings(PathSettings::from(&config::get().movement));

        if !superseded && tick >= supersede_at {
            superseded = true;
            if let Some(&unit) = spawned.first() {
                let target = Position::new(-spacing, 0.0, spacing);
                let request = units.move_to(unit, target)?;
                info!("superseding move"; unit, "target" => ?target, "result" => ?request);
            }
        }

        runtime.tick();

        while let Ok(Some(update)) = updates.try_next() {
            println!("{}", update.encode()?);
        }

        if superseded && !units.any_moving() && runtime.is_idle() {
            info!("all units arrived after {} ticks", tick);
            break;
        }
    }

    for unit in units.iter() {
        info!("final position"; unit.id(), "position" => ?unit.position(), "outcome" => ?unit.path().last_outcome());
    }

    for unit in spawned {
        units.despawn(unit);
    }

    Ok(())
}
