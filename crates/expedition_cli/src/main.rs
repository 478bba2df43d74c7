use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use expedition_control::{AutopilotController, CommandSource, InputSource};
use expedition_core::{
    load_progress, save_progress, Event, GameContent, GameState, GridPos, Mode,
};
use expedition_world::{build_initial_state, load_content, DirStore};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "expedition_cli", about = "Asteroid mining expedition simulator")]
struct Cli {
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play unattended for a fixed number of ticks, saving progress as it changes.
    Run {
        #[arg(long)]
        ticks: u64,
        /// Seed for field generation. Drawn from entropy when omitted.
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        #[arg(long, default_value = "./saves")]
        save_dir: String,
        #[arg(long, default_value_t = 500)]
        print_every: u64,
    },
    /// Print the persisted ledger and station.
    Status {
        #[arg(long, default_value = "./content")]
        content_dir: String,
        #[arg(long, default_value = "./saves")]
        save_dir: String,
    },
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn run(
    ticks: u64,
    seed: Option<u64>,
    content_dir: &str,
    save_dir: &str,
    print_every: u64,
) -> Result<()> {
    let content = load_content(content_dir)?;
    let mut store = DirStore::open(save_dir)?;
    let progress = load_progress(&store, &content);

    let resolved_seed = seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(resolved_seed);
    let mut state = build_initial_state(&content, Some(resolved_seed), progress);

    let mut autopilot = AutopilotController::default();
    let mut next_command_id = 0u64;
    let print_every = print_every.max(1);

    info!(
        ticks,
        seed = resolved_seed,
        saves = %store.root().display(),
        "starting run"
    );
    println!(
        "Starting run: ticks={ticks} seed={resolved_seed} resources={} content_version={}",
        state.ledger.total_resources, content.content_version,
    );
    println!("{}", "-".repeat(80));

    for _ in 0..ticks {
        let commands = autopilot.generate_commands(&state, &content, &mut next_command_id);
        let input = autopilot.frame_input(&state, &content);
        let events = expedition_core::tick(
            &mut state,
            &commands,
            &input,
            &content,
            &mut rng,
            chrono::Utc::now(),
        );

        let mut dirty = false;
        for envelope in &events {
            dirty |= envelope.event.changes_progress();
            print_notable(state.meta.tick, &envelope.event);
        }
        if dirty {
            if let Err(err) = save_progress(&mut store, &state) {
                warn!(error = %err, "saving progress failed, continuing");
            }
        }

        if state.meta.tick % print_every == 0 {
            print_status(&state);
        }
    }

    save_progress(&mut store, &state).context("final progress save")?;

    println!("{}", "-".repeat(80));
    println!("Done. Final state at tick {}:", state.meta.tick);
    print_status(&state);
    print_station(&state, &content);
    Ok(())
}

fn print_notable(tick: u64, event: &Event) {
    match event {
        Event::ModuleBuilt { module, pos, cost } => {
            println!(
                "*** MODULE BUILT: {module} at ({},{}) for {cost} tick={tick:05} ***",
                pos.x, pos.y
            );
        }
        Event::ArtifactCollected { artifact_id, value } => {
            println!("*** ARTIFACT: {artifact_id} worth {value} tick={tick:05} ***");
        }
        Event::CargoSettled {
            mode,
            items,
            value_added,
        } => {
            println!("    settled {items} items ({mode:?}) for {value_added} tick={tick:05}");
        }
        _ => {}
    }
}

fn print_status(state: &GameState) {
    let mode = match state.mode {
        Mode::Station => "station",
        Mode::Mining => "mining",
    };
    println!(
        "[tick={tick:05}]  mode={mode:7}  field={field}/{max}  fuel={fuel:6.1}/{max_fuel:.0}  \
         cargo={cargo:2}/{max_cargo}  asteroids={asteroids:2}  resources={resources}  tier={tier}",
        tick = state.meta.tick,
        field = state.expedition.current_field,
        max = state.expedition.max_fields,
        fuel = state.craft.fuel,
        max_fuel = state.craft.max_fuel,
        cargo = state.craft.cargo.len(),
        max_cargo = state.craft.max_cargo,
        asteroids = state.field.asteroids.len(),
        resources = state.ledger.total_resources,
        tier = state.station.tier(),
    );
}

/// Draws the station grid, one cell per module icon; `.` marks a free cell.
fn print_station(state: &GameState, content: &GameContent) {
    let grid = &state.station.grid;
    println!(
        "Station: {} modules, tier {}, size {}",
        state.station.built_count(),
        state.station.tier(),
        state.station.station_size(),
    );
    for y in 0..grid.size() {
        let row: Vec<String> = (0..grid.size())
            .map(|x| match grid.module_at(GridPos::new(x, y)) {
                Some(key) => content
                    .module(key)
                    .map_or_else(|| key.to_string(), |def| def.icon.clone()),
                None => ".".to_string(),
            })
            .collect();
        println!("  {}", row.join(" "));
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

fn status(content_dir: &str, save_dir: &str) -> Result<()> {
    let content = load_content(content_dir)?;
    let store = DirStore::open(save_dir)?;
    let progress = load_progress(&store, &content);
    let state = build_initial_state(&content, None, progress);

    println!("Resources: {}", state.ledger.total_resources);
    println!(
        "Artifacts: {} collected",
        state.ledger.discovered_artifacts.len()
    );
    for entry in &state.ledger.discovered_artifacts {
        println!(
            "  {} {} ({:?}, {}) found {}",
            entry.artifact.icon,
            entry.artifact.name,
            entry.artifact.rarity,
            entry.artifact.value,
            entry.discovered_at.to_rfc3339(),
        );
    }
    print_station(&state, &content);

    let unlocked: Vec<String> = content
        .modules
        .iter()
        .filter(|def| state.station.is_unlocked(&def.key) && !state.station.is_built(&def.key))
        .map(|def| format!("{} ({})", def.key, def.cost))
        .collect();
    println!("Buildable: [{}]", unlocked.join(", "));
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    match cli.command {
        Commands::Run {
            ticks,
            seed,
            content_dir,
            save_dir,
            print_every,
        } => run(ticks, seed, &content_dir, &save_dir, print_every)?,
        Commands::Status {
            content_dir,
            save_dir,
        } => status(&content_dir, &save_dir)?,
    }
    Ok(())
}
