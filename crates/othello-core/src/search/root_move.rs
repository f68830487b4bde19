//! Root move management.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::board::Board;
use crate::constants::{MAX_PLY, SCORE_INF, SCORE_MAX, SCORE_MIN};
use crate::move_list::MoveList;
use crate::square::Square;
use crate::types::Score;

/// One root move with its running search results.
#[derive(Clone, Debug)]
pub struct RootMove {
    pub sq: Square,
    /// Best score in the current iteration; `-SCORE_INF` when the move
    /// fell below the window.
    pub score: Score,
    /// Score from the previous iteration (aspiration window center).
    pub previous_score: Score,
    /// Proven score window for this move at the root so far.
    pub lower: Score,
    pub upper: Score,
    /// Principal variation starting with this move.
    pub pv: Vec<Square>,
}

impl RootMove {
    pub fn new(sq: Square) -> Self {
        Self {
            sq,
            score: -SCORE_INF,
            previous_score: -SCORE_INF,
            lower: SCORE_MIN,
            upper: SCORE_MAX,
            pv: Vec::new(),
        }
    }
}

/// Thread-safe container for the root move list and multi-PV state.
///
/// Moves at indices below `pv_idx` belong to PV lines already searched
/// and are skipped by the current line.
#[derive(Clone)]
pub struct RootMoves {
    moves: Arc<Mutex<Vec<RootMove>>>,
    pv_idx: Arc<AtomicUsize>,
}

impl RootMoves {
    pub fn new(board: &Board) -> Self {
        let move_list = MoveList::new(board);
        let moves = move_list.iter().map(|m| RootMove::new(m.sq)).collect();
        Self {
            moves: Arc::new(Mutex::new(moves)),
            pv_idx: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Records a search result for the move at `sq`.
    ///
    /// `move_count` is the move's 1-based position in the search order;
    /// the first move and any move improving alpha define the PV.
    pub fn update(
        &self,
        sq: Square,
        score: Score,
        move_count: usize,
        alpha: Score,
        beta: Score,
        pv: &[Square; MAX_PLY],
    ) {
        let is_pv = move_count == 1 || score > alpha;

        let mut moves = self.moves.lock().unwrap();
        let Some(rm) = moves.iter_mut().find(|rm| rm.sq == sq) else {
            return;
        };

        // Proven bound bookkeeping, by the fail-soft recovery rule.
        if score >= beta {
            rm.lower = rm.lower.max(score);
        } else if score <= alpha {
            rm.upper = rm.upper.min(score);
        } else {
            rm.lower = score;
            rm.upper = score;
        }

        if is_pv {
            rm.score = score;
            rm.pv.clear();
            for sq in pv.iter() {
                if *sq == Square::None {
                    break;
                }
                rm.pv.push(*sq);
            }
        } else {
            rm.score = -SCORE_INF;
        }
    }

    /// The root move the current PV line starts with.
    pub fn get_current_pv(&self) -> Option<RootMove> {
        let moves = self.moves.lock().unwrap();
        moves.get(self.pv_idx()).cloned()
    }

    /// Best root move (index 0 after sorting).
    pub fn get_best(&self) -> Option<RootMove> {
        let moves = self.moves.lock().unwrap();
        moves.first().cloned()
    }

    pub fn set_pv_idx(&self, idx: usize) {
        self.pv_idx.store(idx, Ordering::Relaxed);
    }

    #[inline]
    pub fn pv_idx(&self) -> usize {
        self.pv_idx.load(Ordering::Relaxed)
    }

    /// Opens a new iteration: scores become aspiration centers and the
    /// per-move bounds reset (they describe one iteration's proof).
    pub fn new_iteration(&self) {
        let mut moves = self.moves.lock().unwrap();
        for rm in moves.iter_mut() {
            if rm.score != -SCORE_INF {
                rm.previous_score = rm.score;
            }
            rm.lower = SCORE_MIN;
            rm.upper = SCORE_MAX;
        }
    }

    /// Stable-sorts moves from `pv_idx` on by decreasing score.
    pub fn sort_from_pv_idx(&self) {
        let pv_idx = self.pv_idx();
        let mut moves = self.moves.lock().unwrap();
        if pv_idx < moves.len() {
            moves[pv_idx..].sort_by(|a, b| b.score.cmp(&a.score));
        }
    }

    /// Stable-sorts the whole list by decreasing score.
    pub fn sort_all(&self) {
        let mut moves = self.moves.lock().unwrap();
        moves.sort_by(|a, b| b.score.cmp(&a.score));
    }

    pub fn count(&self) -> usize {
        self.moves.lock().unwrap().len()
    }

    pub fn map<T, F>(&self, f: F) -> Vec<T>
    where
        F: FnMut(&RootMove) -> T,
    {
        let moves = self.moves.lock().unwrap();
        moves.iter().map(f).collect()
    }

    /// Squares of the PV lines already searched (indices below
    /// `pv_idx`); the current line must skip them.
    pub fn excluded_squares(&self) -> Vec<Square> {
        let pv_idx = self.pv_idx();
        let moves = self.moves.lock().unwrap();
        moves.iter().take(pv_idx).map(|rm| rm.sq).collect()
    }

    /// Whether `sq` is still searchable by the current PV line.
    pub fn contains_from_pv_idx(&self, sq: Square) -> bool {
        let pv_idx = self.pv_idx();
        let moves = self.moves.lock().unwrap();
        moves.iter().skip(pv_idx).any(|rm| rm.sq == sq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_sort() {
        let rm = RootMoves::new(&Board::new());
        assert_eq!(rm.count(), 4);

        let pv = [Square::None; MAX_PLY];
        let squares: Vec<Square> = rm.map(|m| m.sq);
        rm.update(squares[0], 2, 1, -SCORE_INF, SCORE_INF, &pv);
        rm.update(squares[1], 6, 2, 2, SCORE_INF, &pv);
        rm.update(squares[2], -4, 3, 6, SCORE_INF, &pv);

        rm.sort_all();
        assert_eq!(rm.get_best().unwrap().sq, squares[1]);
        assert_eq!(rm.get_best().unwrap().score, 6);
    }

    #[test]
    fn test_bounds_follow_recovery_rule() {
        let rm = RootMoves::new(&Board::new());
        let pv = [Square::None; MAX_PLY];
        let sq = rm.map(|m| m.sq)[0];

        // fail low against alpha = 4
        rm.update(sq, 0, 2, 4, 10, &pv);
        let m = rm.map(|m| m.clone()).into_iter().find(|m| m.sq == sq).unwrap();
        assert_eq!((m.lower, m.upper), (SCORE_MIN, 0));

        // exact within the window
        rm.update(sq, 6, 2, 4, 10, &pv);
        let m = rm.map(|m| m.clone()).into_iter().find(|m| m.sq == sq).unwrap();
        assert_eq!((m.lower, m.upper), (6, 6));
    }

    #[test]
    fn test_multi_pv_exclusion() {
        let rm = RootMoves::new(&Board::new());
        let squares: Vec<Square> = rm.map(|m| m.sq);

        rm.set_pv_idx(1);
        assert_eq!(rm.excluded_squares(), vec![squares[0]]);
        assert!(!rm.contains_from_pv_idx(squares[0]));
        assert!(rm.contains_from_pv_idx(squares[1]));
    }

    #[test]
    fn test_new_iteration_resets_bounds() {
        let rm = RootMoves::new(&Board::new());
        let pv = [Square::None; MAX_PLY];
        let sq = rm.map(|m| m.sq)[0];
        rm.update(sq, 8, 1, -SCORE_INF, SCORE_INF, &pv);

        rm.new_iteration();
        let m = rm.map(|m| m.clone()).into_iter().find(|m| m.sq == sq).unwrap();
        assert_eq!(m.previous_score, 8);
        assert_eq!((m.lower, m.upper), (SCORE_MIN, SCORE_MAX));
    }
}
