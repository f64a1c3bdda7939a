use std::error::Error;
use std::panic;
use std::path::PathBuf;
use std::time::Duration;

use checkers_engine::config::{self, EngineConfig};
use checkers_engine::egdb::Egdb;
use checkers_engine::game::{Board, Color, Engine};
use checkers_engine::worker::{EngineEvent, SearchWorker};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the endgame database files
    #[arg(long)]
    egdb_path: Option<PathBuf>,

    /// Position as 32 characters, one per playable square (b, B, w, W or .)
    #[arg(long)]
    position: Option<String>,

    /// Side to move
    #[arg(long, default_value = "black")]
    side: Color,

    /// Time budget in seconds
    #[arg(long, default_value_t = 1.0)]
    time: f64,

    /// Search profile stored under profiles/
    #[arg(long)]
    profile: Option<String>,

    /// Engine configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only look the position up in the endgame database
    #[arg(long)]
    probe: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);
    panic::set_hook(Box::new(tracing_panic::panic_hook));

    let mut engine_config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => EngineConfig::default(),
    };
    if let Some(name) = &args.profile {
        engine_config.search = config::load_profile(name)?;
    }
    let egdb_path = args.egdb_path.clone().or_else(|| engine_config.egdb_path.clone());

    let board: Board = match &args.position {
        Some(text) => text.parse()?,
        None => Board::initial(),
    };
    let budget = Duration::try_from_secs_f64(args.time)?;

    if args.probe {
        let Some(dir) = &egdb_path else {
            return Err("--probe needs --egdb-path or an egdb_path in the config".into());
        };
        let mut egdb = Egdb::initialize(dir, &engine_config.egdb);
        let verdict = egdb.lookup(&board, args.side);
        println!("{board} {}: {verdict:?}", args.side);
        return Ok(());
    }

    let worker = SearchWorker::spawn(Engine::new(engine_config.search.clone()));
    if let Some(dir) = egdb_path {
        worker.initialize_egdb(dir, engine_config.egdb.clone())?;
    }
    worker.request_search(board, args.side, budget)?;

    for event in worker.events().iter() {
        match event {
            EngineEvent::EgdbReady { max_pieces } => {
                println!("endgame databases: up to {max_pieces} pieces");
            }
            EngineEvent::Progress(p) => {
                let best = p.best_move.map(|m| m.to_string()).unwrap_or_default();
                println!(
                    "depth {:>2}  score {:>8}  nodes {:>10}  time {:>6}ms  {}",
                    p.depth,
                    p.score,
                    p.nodes,
                    p.elapsed.as_millis(),
                    best
                );
            }
            EngineEvent::Finished(report) => {
                println!("{} ({} ms)", report.status, report.elapsed.as_millis());
                if let Some(m) = report.best_move {
                    println!("bestmove {m}");
                }
                break;
            }
        }
    }

    Ok(())
}
