//! Phonefall - interactive terminal driver
//!
//! Reads commands from stdin and drives the simulation by hand: advance
//! time, drop and tap phones, inspect the village.

use phonefall::city::BuildingState;
use phonefall::core::error::Result;
use phonefall::core::types::{BuildingId, Vec2};
use phonefall::core::SimulationConfig;
use phonefall::entity::VillagerState;
use phonefall::phone::PhoneType;
use phonefall::simulation::{CollapseReport, LifecycleHost, Simulation, SimulationEvent};

use std::io::{self, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Fixed timestep used by `tick` and `run`
const TICK_SECONDS: f32 = 0.1;

/// Prints the collapse summary and remembers the best run
#[derive(Default)]
struct TerminalHost {
    best_time_alive: f32,
}

impl LifecycleHost for TerminalHost {
    fn on_collapse(&mut self, report: &CollapseReport) {
        self.best_time_alive = self.best_time_alive.max(report.time_alive);
        println!();
        println!("=== SOCIETY COLLAPSED ({:?}) ===", report.reason);
        println!(
            "  Survived {:.1}s ({} ticks), {} survivors, {} buildings standing complete",
            report.time_alive, report.tick, report.survivors, report.buildings_completed
        );
        println!("  Best run so far: {:.1}s", self.best_time_alive);
        println!("  Type 'reset' to start again.");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("phonefall=info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load_from_toml(Path::new(&path))?,
        None => SimulationConfig::default(),
    };
    let mut simulation = Simulation::new(config)?;
    let mut host = TerminalHost::default();

    tracing::info!("Phonefall starting...");

    println!("\n=== PHONEFALL ===");
    println!("A village builds; phones fall; productivity erodes.");
    println!();
    println!("Commands:");
    println!("  tick / t             - Advance {:.1}s", TICK_SECONDS);
    println!("  run <n>              - Advance n ticks");
    println!("  drop <x> <y> <type>  - Drop a phone (social, streaming, mainstream, gambling)");
    println!("  tap                  - Dismiss the active phone");
    println!("  raze <id>            - Collapse a building outright");
    println!("  status / s           - Show detailed status");
    println!("  reset                - Start a new run");
    println!("  quit / q             - Exit");
    println!();

    loop {
        display_status(&simulation);

        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        let mut parts = input.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };

        match command {
            "quit" | "q" => break,
            "tick" | "t" => {
                let events = simulation.advance(TICK_SECONDS, &mut host);
                print_events(&events);
            }
            "run" => match parts.next().and_then(|n| n.parse::<u32>().ok()) {
                Some(n) => {
                    let events = simulation.run_for(n as f32 * TICK_SECONDS, TICK_SECONDS, &mut host);
                    print_events(&events);
                    println!("Now at tick {}.", simulation.current_tick());
                }
                None => println!("Usage: run <number>"),
            },
            "drop" => {
                let x = parts.next().and_then(|v| v.parse::<f32>().ok());
                let y = parts.next().and_then(|v| v.parse::<f32>().ok());
                let phone_type = parts.next().map(str::parse::<PhoneType>);
                match (x, y, phone_type) {
                    (Some(x), Some(y), Some(Ok(phone_type))) => {
                        match simulation.drop_phone(Vec2::new(x, y), phone_type) {
                            Ok((phone, Some(responder))) => {
                                println!("Dropped {} ({}); {} is responding", phone, phone_type, responder)
                            }
                            Ok((phone, None)) => {
                                println!("Dropped {} ({}); nobody is responding", phone, phone_type)
                            }
                            Err(e) => println!("Drop rejected: {}", e),
                        }
                    }
                    (_, _, Some(Err(e))) => println!("{}", e),
                    _ => println!("Usage: drop <x> <y> <social|streaming|mainstream|gambling>"),
                }
            }
            "tap" => {
                let events = simulation.tap_phone();
                if events.is_empty() {
                    println!("No phone to tap.");
                }
                print_events(&events);
            }
            "raze" => match parts.next().and_then(|v| v.trim_start_matches("b-").parse::<u64>().ok()) {
                Some(id) => {
                    if simulation.buildings_mut().force_collapse(BuildingId(id)) {
                        println!("Building b-{} collapsed.", id);
                    } else {
                        println!("No standing building b-{}.", id);
                    }
                }
                None => println!("Usage: raze <building id>"),
            },
            "status" | "s" => display_detailed_status(&simulation),
            "reset" => {
                simulation.reset_all();
                println!("New run started.");
            }
            _ => println!("Unknown command. Available: tick, run <n>, drop, tap, raze, status, reset, quit"),
        }
    }

    println!(
        "\nGoodbye! Final state: {} villagers, {} ticks elapsed.",
        simulation.population().total_count(),
        simulation.current_tick()
    );
    Ok(())
}

fn print_events(events: &[SimulationEvent]) {
    for event in events {
        match event {
            SimulationEvent::VillagerStateChanged { .. } => {}
            other => println!("  {:?}", other),
        }
    }
}

/// Display a brief status summary
fn display_status(simulation: &Simulation) {
    let economy = simulation.economy();
    let stats = simulation.population().stats();
    println!();
    println!(
        "--- {:.1}s | Productivity {:.1} ({:?}) | Villagers {} (working {}, idle {}, addicted {}, destructive {}) ---",
        simulation.time_alive(),
        economy.current_productivity(),
        economy.band(),
        stats.total,
        stats.active,
        stats.idle,
        stats.phone_addiction,
        stats.destructive
    );

    match simulation.phones().active() {
        Some(phone) => println!(
            "  Phone {} ({}) {:?} at ({:.1}, {:.1})",
            phone.id, phone.phone_type, phone.phase, phone.position.x, phone.position.y
        ),
        None if simulation.phones().cooldown_remaining() > 0.0 => {
            println!("  Next phone in {:.1}s", simulation.phones().cooldown_remaining())
        }
        None => println!("  Ready to drop a phone"),
    }
}

/// Display every building and villager
fn display_detailed_status(simulation: &Simulation) {
    println!();
    println!("=== Detailed Status (Tick {}) ===", simulation.current_tick());

    let snapshot = simulation.economy().snapshot();
    println!(
        "Economy: factor {:.2}, construction {:.0}%, farming {:.0}%, infrastructure {:.0}%, {} disruptions",
        snapshot.productivity_factor,
        snapshot.construction_fill * 100.0,
        snapshot.farming_fill * 100.0,
        snapshot.infrastructure_fill * 100.0,
        snapshot.disruptions
    );

    println!();
    println!("Buildings:");
    for building in simulation.buildings().iter() {
        let detail = match building.state() {
            BuildingState::UnderConstruction => {
                format!("{:.0}% built", building.progress_fraction() * 100.0)
            }
            _ => building
                .health()
                .map(|h| format!("health {:.0}", h))
                .unwrap_or_default(),
        };
        println!(
            "  {} {} at x={:.1}: {:?} {}",
            building.id,
            building.name,
            building.position.x,
            building.state(),
            detail
        );
    }

    println!();
    println!("Villagers:");
    let villagers = simulation.population().villagers();
    for idx in villagers.iter_living() {
        let mut flags = Vec::new();
        if villagers.responders[idx] {
            flags.push("responder");
        }
        if villagers.frozen[idx] {
            flags.push("frozen");
        }
        if villagers.idle_locked[idx] {
            flags.push("locked");
        }
        let mode = match (villagers.states[idx], villagers.destructive_modes[idx]) {
            (VillagerState::Destructive, Some(mode)) => format!(" [{:?}]", mode),
            _ => String::new(),
        };
        println!(
            "  {} at x={:.1}: {:?}{} {}",
            villagers.names[idx],
            villagers.positions[idx].x,
            villagers.states[idx],
            mode,
            flags.join(", ")
        );
    }
    println!();
}
