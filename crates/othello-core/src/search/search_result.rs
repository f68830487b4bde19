//! Search result types.

use crate::probcut;
use crate::search::root_move::{RootMove, RootMoves};
use crate::square::Square;
use crate::types::{Depth, Score, Scoref, Selectivity};

/// Proven score window of one root move.
#[derive(Clone, Debug)]
pub struct MoveBound {
    pub sq: Square,
    pub score: Score,
    pub lower: Score,
    pub upper: Score,
    pub pv: Vec<Square>,
}

/// The outcome of one search request.
pub struct SearchResult {
    /// Depth of the last completed iteration.
    pub depth: Depth,
    /// Selectivity the result was obtained at; `NO_SELECTIVITY` means
    /// the score is exact.
    pub selectivity: Selectivity,
    pub best_move: Option<Square>,
    pub score: Scoref,
    /// Per-root-move proven bounds and lines (all moves in multi-PV
    /// mode, otherwise as far as the search got).
    pub bounds: Vec<MoveBound>,
    pub pv_line: Vec<Square>,
    pub n_nodes: u64,
    /// Wall-clock time of the search, in milliseconds.
    pub time_ms: u64,
    /// Whether the move came from the opening book (no search ran).
    pub book_move: bool,
}

impl SearchResult {
    /// A result for a move chosen without searching.
    pub fn new_instant_move(mv: Square, book_move: bool) -> Self {
        Self {
            depth: 0,
            selectivity: 0,
            best_move: Some(mv),
            score: 0.0,
            bounds: vec![],
            pv_line: vec![mv],
            n_nodes: 0,
            time_ms: 0,
            book_move,
        }
    }

    /// A result for a position with no legal move.
    pub fn new_pass() -> Self {
        Self {
            depth: 0,
            selectivity: probcut::NO_SELECTIVITY,
            best_move: Some(Square::Pass),
            score: 0.0,
            bounds: vec![],
            pv_line: vec![Square::Pass],
            n_nodes: 0,
            time_ms: 0,
            book_move: false,
        }
    }

    /// Assembles a result from the root move table.
    pub fn from_root_moves(
        root_moves: &RootMoves,
        best: &RootMove,
        n_nodes: u64,
        depth: Depth,
        selectivity: Selectivity,
    ) -> Self {
        let bounds = root_moves.map(|rm| MoveBound {
            sq: rm.sq,
            score: rm.score,
            lower: rm.lower,
            upper: rm.upper,
            pv: rm.pv.clone(),
        });

        Self {
            depth,
            selectivity,
            best_move: Some(best.sq),
            score: best.score as Scoref,
            bounds,
            pv_line: best.pv.clone(),
            n_nodes,
            time_ms: 0,
            book_move: false,
        }
    }

    /// Confidence percentage attached to the selectivity level.
    pub fn get_probability(&self) -> i32 {
        probcut::get_probability(self.selectivity)
    }
}
