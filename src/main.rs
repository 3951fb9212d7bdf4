//! igo: a parallel Monte-Carlo Tree Search Go engine core.
//!
//! This binary is the thin driver a real GTP adapter would sit behind: it
//! drives [`igo::session::EngineSession`] directly for a scripted self-play
//! benchmark, the way the teacher's `main.rs` ran a fixed-playout-count
//! demo instead of speaking GTP itself.
//!
//! ## Usage
//!
//! - `igo selfplay` - play the engine against itself and print the result
//! - `igo bench` - run a fixed playout count on an empty board and report timing

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;

use igo::geometry::{BLACK, PASS, WHITE};
use igo::session::{EngineSession, GenmoveResult};

/// igo: a parallel Monte-Carlo Tree Search Go engine core.
#[derive(Parser)]
#[command(name = "igo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Board size (5-19).
    #[arg(long, global = true, default_value_t = 9)]
    board_size: u8,

    /// Komi (area scoring).
    #[arg(long, global = true, default_value_t = 7.5)]
    komi: f32,

    /// Directory containing the tree-search parameter tables.
    #[arg(long, global = true, default_value = "uct_params")]
    param_dir: PathBuf,

    /// Directory containing the playout parameter tables.
    #[arg(long, global = true, default_value = "sim_params")]
    sim_param_dir: PathBuf,

    /// Playouts per move.
    #[arg(long, global = true, default_value_t = 400)]
    playouts: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the engine against itself until both sides pass or resign.
    Selfplay {
        /// Hard cap on moves, in case both sides refuse to pass.
        #[arg(long, default_value_t = 400)]
        max_moves: u32,
    },
    /// Run one `genmove` on an empty board and report timing.
    Bench,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut session = EngineSession::configure_with_param_dirs(
        cli.board_size,
        cli.komi,
        &cli.param_dir,
        &cli.sim_param_dir,
    )
    .with_context(|| {
        format!(
            "loading parameter tables from {:?} and {:?}",
            cli.param_dir, cli.sim_param_dir
        )
    })?;
    session.set_playouts(cli.playouts);

    match cli.command.unwrap_or(Commands::Selfplay { max_moves: 400 }) {
        Commands::Selfplay { max_moves } => run_selfplay(&mut session, max_moves),
        Commands::Bench => run_bench(&mut session),
    }
}

fn run_selfplay(session: &mut EngineSession, max_moves: u32) -> anyhow::Result<()> {
    let mut color = BLACK;
    let mut consecutive_passes = 0u32;
    let mut moves = 0u32;

    while consecutive_passes < 2 && moves < max_moves {
        match session.genmove(color) {
            GenmoveResult::Move(pt) => {
                println!("{} plays {}", color_name(color), session.position().str_coord(pt));
                consecutive_passes = 0;
            }
            GenmoveResult::Pass => {
                println!("{} passes", color_name(color));
                consecutive_passes += 1;
            }
            GenmoveResult::Resign => {
                println!("{} resigns", color_name(color));
                println!("{}", session.position());
                return Ok(());
            }
        }
        color = if color == BLACK { WHITE } else { BLACK };
        moves += 1;
    }

    println!("{}", session.position());
    let score = session.final_score();
    println!(
        "final score: {:+.1} ({})",
        score,
        if score > 0.0 { "black wins" } else { "white wins" }
    );
    Ok(())
}

fn run_bench(session: &mut EngineSession) -> anyhow::Result<()> {
    let start = std::time::Instant::now();
    let result = session.genmove(BLACK);
    let elapsed = start.elapsed();
    match result {
        GenmoveResult::Move(pt) if pt != PASS => {
            println!("chose {} in {:.2}s", session.position().str_coord(pt), elapsed.as_secs_f64());
        }
        GenmoveResult::Move(_) | GenmoveResult::Pass => {
            println!("chose pass in {:.2}s", elapsed.as_secs_f64());
        }
        GenmoveResult::Resign => println!("resigned immediately"),
    }
    info!("bench complete");
    Ok(())
}

fn color_name(color: u8) -> &'static str {
    if color == BLACK {
        "black"
    } else {
        "white"
    }
}
