use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use furnish::config::RoomConfig;
use furnish::metrics::EvaluationMetrics;
use furnish::policy::{Policy, RandomPolicy};
use furnish::room::{RoomEpisode, RoomLayout};
use furnish::scene::AgentBlueprint;
use furnish::services::{ManifestCapture, PrefabCatalog};

#[derive(Parser, Debug)]
#[command(
    name = "room_sim",
    version,
    about = "Run a furniture placement room with a baseline policy"
)]
struct Cli {
    /// Episodes to evaluate.
    #[arg(long, default_value_t = 10)]
    episodes: usize,

    /// Step budget per episode.
    #[arg(long, default_value_t = 2_000)]
    max_steps: u32,

    /// Seed for placement and the policy.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Room width along x.
    #[arg(long, default_value_t = 8.0)]
    width: f64,

    /// Room depth along z.
    #[arg(long, default_value_t = 6.0)]
    depth: f64,

    /// Swap agents for catalog variants between episodes.
    #[arg(long)]
    replace: bool,

    /// Append the label of every successful episode to this file.
    #[arg(long)]
    capture: Option<PathBuf>,

    /// Room index used in capture labels.
    #[arg(long, default_value_t = 0)]
    room_number: u32,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = RoomConfig {
        max_environment_steps: cli.max_steps,
        replace_between_episodes: cli.replace,
        capture_episodes: cli.capture.is_some(),
        room_number: cli.room_number,
        ..RoomConfig::default()
    };

    let mut room = RoomEpisode::new(config, living_room(cli.width, cli.depth), cli.seed)
        .context("failed to build room")?
        .with_replacer(Box::new(catalog()));
    if let Some(path) = cli.capture {
        room = room.with_capture(Box::new(ManifestCapture::new(path)));
    }

    let mut policy = RandomPolicy::new(cli.seed);
    info!(
        policy = policy.name(),
        episodes = cli.episodes,
        "starting evaluation"
    );
    let metrics = EvaluationMetrics::evaluate(&mut room, &mut policy, cli.episodes);
    println!("{metrics}");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn living_room(width: f64, depth: f64) -> RoomLayout {
    RoomLayout::rectangular(width, depth)
        .with_agent(AgentBlueprint::furniture("Table_01", 1.2, 0.8))
        .with_agent(AgentBlueprint::furniture("Sofa_01", 2.0, 0.9))
        .with_agent(AgentBlueprint::furniture("Shelf_01", 1.5, 0.4))
        .with_agent(AgentBlueprint::child("Chair_01", 0.5, 0.5, Some("Table_01")))
}

fn catalog() -> PrefabCatalog {
    PrefabCatalog::new()
        .with_variant(AgentBlueprint::furniture("Table_Round", 1.0, 1.0))
        .with_variant(AgentBlueprint::furniture("Table_Long", 1.8, 0.8))
        .with_variant(AgentBlueprint::furniture("Sofa_Corner", 2.2, 1.2))
        .with_variant(AgentBlueprint::child("Chair_Stool", 0.4, 0.4, None))
}
