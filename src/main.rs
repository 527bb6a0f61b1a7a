//! credence: confidence analysis for one chess move.
//!
//! # Usage
//!
//! ```bash
//! # Position + played move (SAN or UCI)
//! credence "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1" e4
//! credence startpos g1h3
//!
//! # Optional environment configuration
//! export CONFIDENCE_TARGET=80        # baseline
//! export CONFIDENCE_BRANCH=true      # enable extension
//! export CONFIDENCE_MAX_PLY=18
//! export ENGINE_DEPTH=4              # built-in searcher depth clamp
//! export CONFIDENCE_JSON=true        # also print the JSON payload
//! ```

use dotenv::dotenv;
use log::info;

use credence::analyzer::material::MaterialAnalyzer;
use credence::engine::summary::render_report;
use credence::{compute_move_confidence, ConfidenceOptions};

const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: credence <fen|startpos> <move>");
        eprintln!("Example: credence startpos e4");
        std::process::exit(2);
    }
    let fen = if args[1] == "startpos" {
        STARTPOS.to_string()
    } else {
        args[1].clone()
    };
    let move_text = &args[2];

    let options = ConfidenceOptions::from_env();
    let engine_depth = std::env::var("ENGINE_DEPTH")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(4);
    let analyzer = MaterialAnalyzer::with_depth_cap(engine_depth);

    info!(
        "config: baseline={}, branch={}, max_ply={}, deep_depth={}, engine_depth={}",
        options.target_conf, options.branch, options.max_ply_from_s0, options.deep_depth,
        engine_depth
    );

    match compute_move_confidence(&analyzer, &fen, move_text, &options).await {
        Ok(report) => {
            print!("{}", render_report(&report));
            let want_json = std::env::var("CONFIDENCE_JSON")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false);
            if want_json {
                let json = serde_json::to_string_pretty(&report)
                    .expect("report serializes to JSON");
                println!("{}", json);
            }
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    }
}
