//! Endgame test-suite runner.
//!
//! Solves a set of known endgame positions exactly and reports scores,
//! best moves, node counts and solve times. Used to validate the solver
//! and to track its speed across changes.

mod test_case;

use std::time::Instant;

use clap::Parser;
use colored::Colorize;
use num_format::{Locale, ToFormattedString};

use othello_core::level::Level;
use othello_core::probcut::NO_SELECTIVITY;
use othello_core::search::{Search, SearchOptions, SearchRequest};
use test_case::{TestCase, test_suite};

#[derive(Parser)]
#[command(about = "Run the endgame test suite through the solver")]
struct Args {
    /// Maximum empties of the positions to run.
    #[arg(long, default_value_t = 20)]
    max_empties: u32,

    /// Number of search threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Transposition table size in megabytes.
    #[arg(long, default_value_t = 256)]
    tt_mb: usize,
}

struct CaseOutcome {
    elapsed: std::time::Duration,
    nodes: u64,
    score_ok: bool,
    move_ok: bool,
}

fn run_case(search: &mut Search, case: &TestCase) -> CaseOutcome {
    let board = case.board();
    let request = SearchRequest::with_level(Level::perfect(), NO_SELECTIVITY);

    let started = Instant::now();
    let result = search.run(&board, &request);
    let elapsed = started.elapsed();

    let score_ok = result.score as i32 == case.expected_score;
    let move_ok = result
        .best_move
        .map(|sq| case.is_best_move(&sq.to_string()))
        .unwrap_or(false);

    let status = if score_ok && move_ok {
        "PASS".green()
    } else {
        "FAIL".red()
    };
    let mv = result
        .best_move
        .map(|sq| sq.to_string())
        .unwrap_or_else(|| "--".to_string());

    println!(
        "{status}  {case} [{:>2} empties]  got {:+3} {}  {:>14} nodes  {:>9.2?}",
        case.n_empties(),
        result.score as i32,
        mv,
        result.n_nodes.to_formatted_string(&Locale::en),
        elapsed,
    );

    CaseOutcome {
        elapsed,
        nodes: result.n_nodes,
        score_ok,
        move_ok,
    }
}

fn main() {
    let args = Args::parse();

    let options = SearchOptions::new(args.tt_mb).with_threads(args.threads);
    let mut search = Search::new(&options);

    let cases: Vec<TestCase> = test_suite()
        .into_iter()
        .filter(|c| c.n_empties() <= args.max_empties)
        .collect();

    let mut total_nodes: u64 = 0;
    let mut total_time = std::time::Duration::ZERO;
    let mut failures = 0usize;

    for case in &cases {
        search.init();
        let outcome = run_case(&mut search, case);
        total_nodes += outcome.nodes;
        total_time += outcome.elapsed;
        if !(outcome.score_ok && outcome.move_ok) {
            failures += 1;
        }
    }

    let nps = if total_time.as_secs_f64() > 0.0 {
        (total_nodes as f64 / total_time.as_secs_f64()) as u64
    } else {
        0
    };

    println!();
    println!(
        "{} cases, {} failed, {} nodes in {:.2?} ({} nodes/s)",
        cases.len(),
        failures,
        total_nodes.to_formatted_string(&Locale::en),
        total_time,
        nps.to_formatted_string(&Locale::en),
    );

    if failures > 0 {
        std::process::exit(1);
    }
}
