//! QFab - headless runner
//! Loads a level, runs the fixed-step simulation and reports the outcome

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use qfab_factory::Cell;
use qfab_quantum::{ArcadeBackend, Circuit, CircuitBackend};
use qfab_sim::{GateBehavior, LevelData, SimConfig, SimulationWorld, StepReport, TickLoop};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "qfab")]
#[command(version = "2026.1.16")]
#[command(about = "QFab - quantum factory simulation runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a level for a number of ticks
    Run {
        /// Level file (.toml or .json)
        #[arg(value_name = "LEVEL")]
        level: PathBuf,

        /// Number of ticks to simulate
        #[arg(short, long, default_value_t = 100)]
        ticks: u64,

        /// Seed for measurement outcomes
        #[arg(short, long)]
        seed: Option<u64>,

        /// Simulation config file (TOML)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Sleep between ticks instead of running as fast as possible
        #[arg(long)]
        realtime: bool,

        /// Print the final summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect one cell after running a level
    Inspect {
        /// Level file (.toml or .json)
        #[arg(value_name = "LEVEL")]
        level: PathBuf,

        /// Cell to inspect, as "x,y"
        #[arg(long, value_name = "X,Y")]
        at: Cell,

        /// Ticks to run before inspecting
        #[arg(short, long, default_value_t = 0)]
        ticks: u64,

        /// Seed for measurement outcomes
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print the inspection as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a small circuit (JSON) on the arcade backend
    Circuit {
        /// Circuit file: {"qubits": n, "gates": [...]}
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the standard gate library
    Gates {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qfab_sim=info,qfab_factory=info,qfab_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            level,
            ticks,
            seed,
            config,
            realtime,
            json,
        } => run_command(&level, ticks, seed, config.as_deref(), realtime, json),
        Commands::Inspect {
            level,
            at,
            ticks,
            seed,
            json,
        } => inspect_command(&level, at, ticks, seed, json),
        Commands::Circuit { file, json } => circuit_command(&file, json),
        Commands::Gates { json } => gates_command(json),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Padrões → arquivo → ambiente → flags
fn load_config(path: Option<&Path>, seed: Option<u64>) -> Result<SimConfig> {
    let mut config = match path {
        Some(path) => SimConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SimConfig::default(),
    };
    config.apply_env();
    if seed.is_some() {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

fn load_world(level_path: &Path, config: SimConfig) -> Result<SimulationWorld> {
    let level = LevelData::from_file(level_path)
        .with_context(|| format!("failed to load level {}", level_path.display()))?;
    let mut world = SimulationWorld::new(config)?;
    world.load_level(level);
    Ok(world)
}

// ============================================================================
// Commands
// ============================================================================

fn run_command(
    level: &Path,
    ticks: u64,
    seed: Option<u64>,
    config: Option<&Path>,
    realtime: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(config, seed)?;
    let world = load_world(level, config)?;
    let mut tick_loop = TickLoop::new(world);

    if !json {
        println!("{} {}", "Running".green().bold(), level.display().to_string().cyan());
        tick_loop.on_tick(print_events);
    }

    info!(ticks, realtime, "starting simulation");
    if realtime {
        tick_loop.run_realtime(ticks);
    } else {
        tick_loop.run_headless(ticks);
    }

    let stats = tick_loop.stats();
    let summary = tick_loop.world().summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!();
    println!("{}", "Summary".bold());
    println!("  ticks:    {}", summary.tick);
    println!("  items:    {} ({} systems)", summary.items, summary.systems);
    println!("  credits:  {}", summary.credits.to_string().yellow());
    println!("  score:    {}", summary.score);
    println!("  scans:    0={} 1={}", summary.scans[0], summary.scans[1]);
    if let Some(contract) = &summary.contract {
        let status = if contract.completed {
            "completed".green().bold()
        } else {
            format!("{} remaining", contract.remaining()).yellow()
        };
        println!(
            "  contract: {} [{}] {}/{} {}",
            contract.id.cyan(),
            contract.target.name(),
            contract.delivered,
            contract.required,
            status
        );
    }
    if !summary.congested.is_empty() {
        let cells: Vec<String> = summary.congested.iter().map(|c| c.to_string()).collect();
        println!("  congested: {}", cells.join(" ").red());
    }
    println!(
        "  timing:   avg {:?}, max {:?}, missed {}",
        stats.avg_execution_time, stats.max_execution_time, stats.missed_ticks
    );

    Ok(())
}

fn print_events(report: &StepReport, world: &SimulationWorld) {
    if report.controlled_applied > 0 {
        println!(
            "{} tick {}: {} controlled gate(s)",
            "   Entangled".blue().bold(),
            report.tick,
            report.controlled_applied
        );
    }
    if report.delivered > 0 {
        println!(
            "{} tick {}: {} item(s), credits {}",
            "   Delivered".green().bold(),
            report.tick,
            report.delivered,
            world.store().credits()
        );
    }
    if report.rejected > 0 {
        println!(
            "{} tick {}: {} item(s) outside the contract band",
            "    Rejected".red().bold(),
            report.tick,
            report.rejected
        );
    }
}

fn inspect_command(level: &Path, at: Cell, ticks: u64, seed: Option<u64>, json: bool) -> Result<()> {
    let config = load_config(None, seed)?;
    let mut world = load_world(level, config)?;
    world.run(ticks);
    let inspection = world.inspect(at);

    if json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
        return Ok(());
    }

    let tile = match &inspection.tile {
        Some(tile) => {
            let mut label = tile.kind.to_string();
            if let Some(gate) = &tile.gate_id {
                label.push_str(&format!(" ({})", gate));
            }
            if let Some(dir) = tile.direction {
                label.push_str(&format!(" → {}", dir));
            }
            if tile.locked {
                label.push_str(" [locked]");
            }
            label
        }
        None => "empty".to_string(),
    };
    println!("{} {} after {} ticks: {}", "Cell".bold(), at.to_string().cyan(), ticks, tile);

    if inspection.items.is_empty() {
        println!("  no items");
    }
    for item in &inspection.items {
        println!(
            "  item {} in {} (qubit {}/{}): P(1) = {:.3} {}",
            item.id,
            item.system,
            item.qubit,
            item.system_qubits,
            item.excitation,
            item.classification
        );
    }
    Ok(())
}

fn circuit_command(path: &Path, json: bool) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read circuit {}", path.display()))?;
    let circuit: Circuit = serde_json::from_str(&content).context("invalid circuit document")?;
    let backend = ArcadeBackend;
    let result = backend.run_circuit(&circuit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{} {} qubit(s), {} gate(s) on {}",
        "Circuit".bold(),
        circuit.qubits,
        circuit.gates.len(),
        backend.label().cyan()
    );
    for (index, (amp, p)) in result.amplitudes.iter().zip(&result.probabilities).enumerate() {
        if *p > 1e-12 {
            println!(
                "  |{:0width$b}⟩  {}  p = {:.4}",
                index,
                amp,
                p,
                width = circuit.qubits
            );
        }
    }
    for note in &result.notes {
        println!("  {} {}", "note:".yellow(), note);
    }
    Ok(())
}

fn gates_command(json: bool) -> Result<()> {
    let gates = qfab_sim::GateRegistry::standard();

    if json {
        println!("{}", serde_json::to_string_pretty(&gates.list())?);
        return Ok(());
    }

    println!("{}", "Standard gates".bold());
    for gate in gates.list() {
        let behavior = match &gate.behavior {
            GateBehavior::Classical => "classical".to_string(),
            GateBehavior::Unitary { .. } => "unitary".to_string(),
            GateBehavior::Controlled {
                control_count,
                target,
            } => format!(
                "controlled ({} control, target {})",
                control_count,
                target.as_deref().unwrap_or("x")
            ),
            GateBehavior::Measurement => "measurement".to_string(),
        };
        println!(
            "  {:<8} {:<16} cost {:>3}  chapter {}  {}",
            gate.id.cyan(),
            gate.name,
            gate.cost,
            gate.unlocked_at_chapter,
            behavior
        );
    }
    Ok(())
}
