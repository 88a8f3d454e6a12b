//! Headless Runner
//!
//! Runs the village with scripted phone drops and prints a JSON (or text)
//! summary of how long society lasted.

use clap::Parser;
use phonefall::core::types::Vec2;
use phonefall::core::SimulationConfig;
use phonefall::phone::PhoneType;
use phonefall::simulation::{CollapseReport, LifecycleHost, Simulation, SimulationEvent};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Headless Runner - scripted phone drops until collapse or timeout
#[derive(Parser, Debug)]
#[command(name = "headless")]
#[command(about = "Run the village without a terminal UI and report the outcome")]
struct Args {
    /// TOML config file (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated seconds before giving up
    #[arg(long, default_value_t = 300.0)]
    seconds: f32,

    /// Fixed timestep in seconds
    #[arg(long, default_value_t = 0.05)]
    dt: f32,

    /// Seconds between scripted drop attempts (0 disables drops)
    #[arg(long, default_value_t = 4.0)]
    drop_interval: f32,

    /// Random seed; overrides the config seed
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Include the final snapshot in JSON output
    #[arg(long)]
    snapshot: bool,
}

#[derive(Default)]
struct RecordingHost {
    report: Option<CollapseReport>,
}

impl LifecycleHost for RecordingHost {
    fn on_collapse(&mut self, report: &CollapseReport) {
        self.report = Some(report.clone());
    }
}

/// JSON output structure
#[derive(Serialize)]
struct RunResult {
    seed: u64,
    collapsed: bool,
    collapse: Option<CollapseReport>,
    time_alive: f32,
    ticks: u64,
    phones_dropped: u32,
    villagers_killed: u32,
    buildings_completed: u32,
    buildings_destroyed: u32,
    final_productivity: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<phonefall::simulation::SimulationSnapshot>,
}

fn main() -> phonefall::core::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("phonefall=warn")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load_from_toml(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let seed = config.seed;
    let spawn_points = config.buildings.spawn_points.clone();

    let mut simulation = Simulation::new(config)?;
    let mut host = RecordingHost::default();
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));

    let mut result = RunResult {
        seed,
        collapsed: false,
        collapse: None,
        time_alive: 0.0,
        ticks: 0,
        phones_dropped: 0,
        villagers_killed: 0,
        buildings_completed: 0,
        buildings_destroyed: 0,
        final_productivity: 0.0,
        snapshot: None,
    };

    let dt = args.dt.max(0.001);
    let steps = (args.seconds / dt).round() as u64;
    let mut until_drop = args.drop_interval;

    for _ in 0..steps {
        if args.drop_interval > 0.0 {
            until_drop -= dt;
            if until_drop <= 0.0 && simulation.phones().can_spawn() {
                let x = spawn_points
                    .get(rng.gen_range(0..spawn_points.len().max(1)))
                    .map(|p| p.x)
                    .unwrap_or(0.0)
                    + rng.gen_range(-1.0f32..=1.0);
                let phone_type = PhoneType::ALL[rng.gen_range(0..PhoneType::ALL.len())];
                if simulation.drop_phone(Vec2::new(x, 0.0), phone_type).is_ok() {
                    result.phones_dropped += 1;
                    until_drop = args.drop_interval;
                }
            }
        }

        for event in simulation.advance(dt, &mut host) {
            match event {
                SimulationEvent::VillagerKilled { .. } => result.villagers_killed += 1,
                SimulationEvent::Building(phonefall::city::BuildingEvent::Completed { .. }) => {
                    result.buildings_completed += 1
                }
                SimulationEvent::Building(phonefall::city::BuildingEvent::Destroyed { .. }) => {
                    result.buildings_destroyed += 1
                }
                _ => {}
            }
        }

        if simulation.is_collapsed() {
            break;
        }
    }

    result.collapsed = host.report.is_some();
    result.collapse = host.report;
    result.time_alive = simulation.time_alive();
    result.ticks = simulation.current_tick();
    result.final_productivity = simulation.economy().current_productivity();
    if args.snapshot {
        result.snapshot = Some(simulation.snapshot());
    }

    if args.format == "text" {
        println!("Seed: {}", result.seed);
        match &result.collapse {
            Some(report) => println!(
                "Collapsed ({:?}) after {:.1}s / {} ticks",
                report.reason, report.time_alive, report.tick
            ),
            None => println!("Still standing after {:.1}s / {} ticks", result.time_alive, result.ticks),
        }
        println!("Phones dropped: {}", result.phones_dropped);
        println!("Villagers killed: {}", result.villagers_killed);
        println!(
            "Buildings completed: {}, destroyed: {}",
            result.buildings_completed, result.buildings_destroyed
        );
        println!("Final productivity: {:.1}", result.final_productivity);
    } else {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(())
}
