mod render;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use atomic_ai::SearchBudget;
use atomic_session::{Difficulty, EngineConfig, GameSession};
use chess_core::Color;
use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

#[derive(Parser)]
#[command(name = "atomic-chess")]
#[command(about = "Atomic chess against a search engine")]
struct Cli {
    /// Engine configuration file (default: atomic.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More logging: -v for moves, -vv for search details
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play against the engine on the terminal
    Play {
        /// Your color: white or black
        #[arg(long, default_value = "white")]
        color: String,
        /// Engine strength: easy, medium, hard or expert
        #[arg(short, long)]
        difficulty: Option<Difficulty>,
        /// Starting position
        #[arg(long)]
        fen: Option<String>,
    },
    /// Let the engine play both sides
    Selfplay {
        /// White's search: ab:<depth> or mcts:<millis>[:<simulations>]
        #[arg(long, default_value = "ab:2")]
        white: SearchBudget,
        /// Black's search
        #[arg(long, default_value = "ab:2")]
        black: SearchBudget,
        /// Stop after this many plies
        #[arg(long, default_value = "200")]
        max_plies: u32,
        /// Starting position
        #[arg(long)]
        fen: Option<String>,
        /// Seed for reproducible games
        #[arg(long)]
        seed: Option<u64>,
        /// One JSON object per ply
        #[arg(long)]
        json: bool,
    },
    /// Show where a piece may move
    Hints {
        /// Square of the piece, e.g. g1
        square: String,
        /// Position to inspect
        #[arg(long)]
        fen: Option<String>,
        /// Print a JSON array
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Play {
            color,
            difficulty,
            fen,
        } => {
            let Some(human) = Color::from_name(&color) else {
                bail!("unknown color: {}", color);
            };
            let mut config = config;
            if let Some(difficulty) = difficulty {
                config.difficulty = difficulty;
            }
            play(open_session(config, fen.as_deref())?, human)
        }
        Commands::Selfplay {
            white,
            black,
            max_plies,
            fen,
            seed,
            json,
        } => {
            let mut config = config;
            if seed.is_some() {
                config.seed = seed;
            }
            selfplay(
                open_session(config, fen.as_deref())?,
                [white, black],
                max_plies,
                json,
            )
        }
        Commands::Hints { square, fen, json } => {
            let game = open_session(config, fen.as_deref())?;
            let targets = game.legal_destinations(&square)?;
            if json {
                println!("{}", serde_json::to_string(&targets)?);
            } else {
                println!("{}", render::destinations(&square, &targets));
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load_from(&path)
            .with_context(|| format!("loading {}", path.display())),
        None => EngineConfig::load().context("loading atomic.toml"),
    }
}

fn open_session(config: EngineConfig, fen: Option<&str>) -> Result<GameSession> {
    match fen {
        Some(fen) => GameSession::from_fen(config, fen).context("bad starting position"),
        None => Ok(GameSession::new(config)),
    }
}

fn play(mut game: GameSession, human: Color) -> Result<()> {
    println!("{}", render::board(game.position(), &[]));
    println!("Enter moves like e2e4. Other commands: hint <square>, board, fen, quit.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if game.status().is_over() {
            println!("{}", render::status_line(game.status()));
            return Ok(());
        }

        if game.side_to_move() != human {
            let ai = game.compute_ai_move(None)?;
            println!(
                "Engine plays {} ({}, score {}, {} nodes)",
                render::move_line(&ai.report),
                ai.strategy,
                ai.score,
                ai.nodes
            );
            println!("{}", render::board(game.position(), &ai.report.exploded));
            continue;
        }

        print!("{}> ", game.side_to_move());
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line?;

        match line.split_whitespace().collect::<Vec<_>>().as_slice() {
            [] => {}
            ["quit"] | ["exit"] => return Ok(()),
            ["fen"] => println!("{}", game.fen()),
            ["board"] => println!("{}", render::board(game.position(), &[])),
            ["hint", square] => match game.legal_destinations(square) {
                Ok(targets) => println!("{}", render::destinations(square, &targets)),
                Err(e) => println!("{}", e),
            },
            [mv] => match game.apply_validated_move(mv) {
                Ok(report) => {
                    println!("{}", render::move_line(&report));
                    println!("{}", render::board(game.position(), &report.exploded));
                }
                Err(e) => println!("{}", e),
            },
            _ => println!("Commands: <move>, hint <square>, board, fen, quit"),
        }
    }
}

/// Budgets are indexed by color.
fn selfplay(
    mut game: GameSession,
    budgets: [SearchBudget; 2],
    max_plies: u32,
    json: bool,
) -> Result<()> {
    let mut plies = 0;
    while plies < max_plies && !game.status().is_over() {
        let side = game.side_to_move();
        let ai = game.compute_ai_move(Some(budgets[side.index()]))?;
        plies += 1;

        if json {
            println!("{}", serde_json::to_string(&ai)?);
        } else {
            println!(
                "{:>3}. {:<5} {} [{} {}, {} nodes]",
                plies,
                side,
                render::move_line(&ai.report),
                ai.strategy,
                ai.score,
                ai.nodes
            );
        }
    }

    if !json {
        println!("{}", render::board(game.position(), &[]));
        println!("{} after {} plies", render::status_line(game.status()), plies);
    }
    Ok(())
}
