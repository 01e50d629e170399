use anyhow::Result;
use clap::Parser;
use terrafauna_core::{EngineConfig, SimulationState};
use tracing::{info, warn};

/// Headless driver for the terrafauna ecology engine.
#[derive(Debug, Parser)]
#[command(name = "terrafauna", about = "Run the terrafauna ecology simulation without a renderer")]
struct Args {
    /// Number of simulation steps to run.
    #[arg(long, default_value_t = 500)]
    steps: u32,

    /// RNG seed; omit for a fresh world each run.
    #[arg(long)]
    seed: Option<u64>,

    /// Terrain width in tiles.
    #[arg(long, default_value_t = 120)]
    width: u32,

    /// Terrain height in tiles.
    #[arg(long, default_value_t = 80)]
    height: u32,

    /// Number of procedurally rolled species.
    #[arg(long, default_value_t = 5)]
    species: u32,

    /// Founder creatures placed per species.
    #[arg(long, default_value_t = 12)]
    founders: u32,

    /// Steps between progress reports.
    #[arg(long, default_value_t = 100)]
    report_interval: u32,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut sim = bootstrap(&args)?;
    run(&mut sim, &args);
    inspect_center(&sim)?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn bootstrap(args: &Args) -> Result<SimulationState> {
    let config = EngineConfig {
        world_width: args.width,
        world_height: args.height,
        species_count: args.species,
        creatures_per_species: args.founders,
        rng_seed: args.seed,
        ..EngineConfig::default()
    };
    let sim = SimulationState::new(config)?;
    info!(
        width = args.width,
        height = args.height,
        species = sim.species_count(),
        creatures = sim.alive_count(),
        palette = ?sim.terrain().palette(),
        "World generated"
    );
    Ok(sim)
}

fn run(sim: &mut SimulationState, args: &Args) {
    let report = args.report_interval.max(1);
    let mut remaining = args.steps;
    while remaining > 0 {
        let chunk = remaining.min(report);
        sim.advance(chunk);
        remaining -= chunk;
        if let Some(summary) = sim.history().last() {
            info!(
                step = summary.step.0,
                year = summary.year,
                alive = summary.alive,
                births = summary.births,
                deaths = summary.deaths,
                mean_energy = summary.mean_energy,
                "Population summary"
            );
        }
        if sim.alive_count() == 0 {
            warn!("Population extinct; stopping early");
            break;
        }
    }
}

fn inspect_center(sim: &SimulationState) -> Result<()> {
    let center_x = sim.config().world_width as f32 / 2.0;
    let center_y = sim.config().world_height as f32 / 2.0;
    match sim.creature_near(center_x, center_y, 30.0) {
        Some(id) => {
            if let Some(snapshot) = sim.snapshot_creature(id) {
                info!(
                    creature = %serde_json::to_string(&snapshot)?,
                    "Creature nearest world center"
                );
            }
        }
        None => info!("No creature within inspection range of world center"),
    }
    Ok(())
}
