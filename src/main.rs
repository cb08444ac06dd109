use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use traffic_signal_sim::simulation::{
    spawn_perception, CountingPerception, Direction, RunOptions, SimConfig, SimWorld,
    SimulationLoop, VehicleCategory,
};

#[derive(Parser)]
#[command(name = "traffic_signal_sim")]
#[command(about = "Adaptive signal control at a single four-way intersection")]
struct Cli {
    /// Number of simulation ticks to run (Ctrl-C stops earlier)
    #[arg(long, default_value = "3600")]
    ticks: u64,

    /// Simulation ticks per second
    #[arg(long, default_value = "60")]
    tick_rate: u32,

    /// Seed for reproducible arrivals
    #[arg(long)]
    seed: Option<u64>,

    /// Chance per tick of a new arrival
    #[arg(long, default_value = "0.05")]
    spawn_probability: f64,

    /// Inject an emergency vehicle every N ticks (0 disables)
    #[arg(long, default_value = "0")]
    emergency_every: u64,

    /// Hour of day at simulated time zero (defaults to the current UTC hour)
    #[arg(long)]
    start_hour: Option<u32>,

    /// Perception processing interval in milliseconds
    #[arg(long, default_value = "100")]
    perception_interval_ms: u64,

    /// Run as fast as possible instead of holding the tick rate
    #[arg(long)]
    fast: bool,

    /// Print dashboard snapshots as JSON instead of log summaries
    #[arg(long)]
    json: bool,

    /// Report every N ticks
    #[arg(long, default_value = "60")]
    report_every: u64,
}

fn current_utc_hour() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| ((elapsed.as_secs() / 3600) % 24) as u32)
        .unwrap_or(0)
}

const EMERGENCY_ROTATION: [VehicleCategory; 3] = [
    VehicleCategory::Ambulance,
    VehicleCategory::Police,
    VehicleCategory::Fire,
];

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = SimConfig {
        tick_rate: cli.tick_rate,
        spawn_probability: cli.spawn_probability,
        start_hour: cli.start_hour.unwrap_or_else(current_utc_hour),
        seed: cli.seed,
        ..SimConfig::default()
    };
    let world = SimWorld::new(config).context("invalid simulation configuration")?;

    info!(
        "Running {} ticks at {} Hz{}",
        cli.ticks,
        cli.tick_rate,
        if cli.fast { " (unpaced)" } else { "" }
    );

    let (mut sim_loop, link) = SimulationLoop::connect(world);
    let perception = spawn_perception(
        link,
        CountingPerception::default(),
        Duration::from_millis(cli.perception_interval_ms),
    )
    .context("failed to start perception thread")?;

    // Ctrl-C ends the run at the next tick boundary
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        if stop_tx.try_send(()).is_ok() {
            eprintln!("Stopping simulation...");
        }
    })
    .context("failed to install Ctrl-C handler")?;
    let options = RunOptions {
        max_ticks: Some(cli.ticks),
        paced: !cli.fast,
    };
    let report_every = cli.report_every.max(1);
    let mut injected = 0usize;

    let stats = sim_loop.run(&stop_rx, options, |world| {
        let tick = world.tick_count;

        if cli.emergency_every > 0 && tick % cli.emergency_every == 0 {
            let direction = Direction::ALL[injected % Direction::ALL.len()];
            let category = EMERGENCY_ROTATION[injected % EMERGENCY_ROTATION.len()];
            match world.inject_vehicle(direction, category) {
                Ok(_) => injected += 1,
                Err(err) => warn!("Emergency injection skipped: {err:#}"),
            }
        }

        if tick % report_every == 0 {
            if cli.json {
                match serde_json::to_string(&world.dashboard()) {
                    Ok(line) => println!("{line}"),
                    Err(err) => warn!("Could not encode dashboard snapshot: {err}"),
                }
            } else {
                info!("{}", world.summary_line());
            }
        }
    });

    // Dropping the loop closes the frame slot, which stops perception
    let world = sim_loop.into_world();
    let perception = perception
        .join()
        .map_err(|_| anyhow::anyhow!("perception thread panicked"))?;

    info!("=== SIMULATION COMPLETE ===");
    info!("Elapsed time: {:.2}s", world.time);
    info!("Total ticks: {}", stats.ticks);
    info!("Vehicles processed: {}", world.vehicles_processed());
    info!("Active vehicles: {}", world.vehicles.len());
    info!("Emergency vehicles injected: {}", injected);
    info!(
        "Frames delivered: {}, replaced: {}",
        stats.frames_delivered, stats.frames_replaced
    );
    info!(
        "Perception frames seen: {}, decisions sent: {}, applied: {}",
        perception.frames_seen, perception.decisions_sent, stats.decisions_applied
    );

    if !cli.json {
        world.print_summary();
    }
    Ok(())
}
