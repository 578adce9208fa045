//! Total War Sim - headless runner
//!
//! Loads a scenario (bundled data or a synthetic world), optionally restores a
//! snapshot, applies policy changes and a queued player action, advances the
//! requested number of turns and prints the regression checksum.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use total_war_sim::core::error::{Result, SimError};
use total_war_sim::core::types::CountryCode;
use total_war_sim::sim::{
    check_invariants, rehydrate_str, simulate_turn, ActionKind, Checksum, PolicyUpdate, SimState,
};
use total_war_sim::world::{generate_scenario, load_scenario};
use total_war_sim::SimConfig;

/// Run the geopolitical simulation headlessly
#[derive(Parser, Debug)]
#[command(name = "total-war")]
#[command(about = "Advance a deterministic geopolitical simulation and print its checksum")]
struct Args {
    /// Country index JSON
    #[arg(long, default_value = "data/countries.json")]
    countries: PathBuf,

    /// Neighbour adjacency JSON
    #[arg(long, default_value = "data/neighbours.json")]
    neighbours: PathBuf,

    /// Generate a synthetic world with this many countries instead of loading data
    #[arg(long)]
    synthetic: Option<usize>,

    /// Game seed
    #[arg(long, default_value_t = 202501)]
    seed: u64,

    /// Turns to advance
    #[arg(long, default_value_t = 200)]
    turns: u32,

    /// TOML tunables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Restore this snapshot before running
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write a snapshot here after running
    #[arg(long)]
    save: Option<PathBuf>,

    /// Queue a player action for the first turn, as kind:actor:target
    #[arg(long)]
    player_action: Option<String>,

    /// Policy change applied before the first turn, as CODE:field=value
    #[arg(long)]
    policy: Vec<String>,

    /// Check invariants after every turn
    #[arg(long, default_value_t = false)]
    audit: bool,

    /// Print this many of the most recent events at the end
    #[arg(long, default_value_t = 0)]
    events: usize,
}

fn parse_code(raw: &str) -> Result<CountryCode> {
    CountryCode::parse(raw).map_err(|err| SimError::InvalidArgument(err.to_string()))
}

fn apply_policy(state: &mut SimState, raw: &str) -> Result<()> {
    let (code, change) = raw
        .split_once(':')
        .ok_or_else(|| SimError::InvalidArgument(format!("policy must be CODE:field=value, got {raw:?}")))?;
    let code = parse_code(code)?;
    let update: PolicyUpdate = change
        .parse()
        .map_err(|err: total_war_sim::sim::PolicyRejected| SimError::InvalidArgument(err.to_string()))?;
    state
        .set_policy_field(code, update)
        .map_err(|_| SimError::UnknownCountry(code.to_string()))?;
    tracing::info!(%code, ?update, "policy updated");
    Ok(())
}

fn queue_action(state: &mut SimState, raw: &str) -> Result<()> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [kind, actor, target] = parts.as_slice() else {
        return Err(SimError::InvalidArgument(format!(
            "player action must be kind:actor:target, got {raw:?}"
        )));
    };
    let kind: ActionKind = kind
        .parse()
        .map_err(|_| SimError::InvalidArgument(format!("unknown action type {kind:?}")))?;
    let actor = parse_code(actor)?;
    let target = parse_code(target)?;
    state
        .queue_player_action(kind, target, actor)
        .map_err(|reason| SimError::InvalidArgument(format!("{kind} {actor}->{target} rejected: {reason}")))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("total_war_sim=info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    let scenario = Arc::new(match args.synthetic {
        Some(count) => generate_scenario(count, args.seed, config),
        None => load_scenario(&args.countries, &args.neighbours, config)?,
    });

    let mut state = match &args.load {
        Some(path) => {
            let state = rehydrate_str(scenario, &std::fs::read_to_string(path)?)?;
            tracing::info!(path = %path.display(), turn = state.turn, "restored snapshot");
            state
        }
        None => SimState::new_game(scenario, args.seed),
    };

    for raw in &args.policy {
        apply_policy(&mut state, raw)?;
    }
    if let Some(raw) = &args.player_action {
        queue_action(&mut state, raw)?;
    }

    if args.audit {
        check_invariants(&state)?;
    }
    for _ in 0..args.turns {
        state = simulate_turn(&state);
        if args.audit {
            check_invariants(&state)?;
        }
    }

    tracing::info!(turn = state.turn, events = state.events.len(), "run complete");

    for event in state.events.recent().take(args.events) {
        println!("{event}");
    }
    println!("{}", Checksum::compute(&state));

    if let Some(path) = &args.save {
        std::fs::write(path, state.snapshot().to_json()?)?;
        tracing::info!(path = %path.display(), "snapshot written");
    }

    Ok(())
}
