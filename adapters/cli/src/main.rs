#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that pits two restraint dispatchers against each other.

mod config;
mod session;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use restraint_core::Topology;
use restraint_world::{query, Team, World};
use tracing_subscriber::EnvFilter;

use crate::{config::Config, session::Session};

const DEFAULT_MAP: &str = include_str!("../maps/duel.txt");

/// Match options.
#[derive(Parser, Debug)]
#[command(
    name = "restraint",
    about = "Self-play driver for the territory control bot",
    version
)]
struct Cli {
    /// Map file using `#` for walls, `A`/`B` for spawns and `.` for open ground.
    #[arg(long)]
    map: Option<PathBuf>,

    /// Maximum number of turns to play.
    #[arg(long, default_value_t = 200)]
    turns: u64,

    /// Seed for both sides' random generators.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// TOML file with `[field]` and `[dispatch]` tuning sections.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop movement at the map edges instead of wrapping around.
    #[arg(long)]
    bounded: bool,
}

/// Entry point for the restraint command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let text = match &cli.map {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read map {}", path.display()))?,
        None => DEFAULT_MAP.to_owned(),
    };
    let topology = if cli.bounded {
        Topology::Bounded
    } else {
        Topology::Toroidal
    };
    let world = World::from_map_with_topology(&text, topology).context("failed to load map")?;

    let mut session = Session::new(world, &config, cli.seed);
    let played = session.run(cli.turns);

    let world = session.world();
    let dimensions = query::dimensions(world);
    println!(
        "map {}x{}, turns played: {played}",
        dimensions.columns(),
        dimensions.rows()
    );
    for team in [Team::A, Team::B] {
        println!(
            "team {team:?}: territory {}, strength {}, units {}",
            query::territory(world, team),
            query::strength(world, team),
            query::roster(world, team).len(),
        );
    }
    Ok(())
}
