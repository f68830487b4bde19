use std::sync::Arc;

use crate::board::Board;
use crate::constants::MAX_PLY;
use crate::empty_list::EmptyList;
use crate::eval::Eval;
use crate::search::root_move::RootMoves;
use crate::search::threading::SplitPoint;
use crate::search::{SearchProgress, SearchProgressCallback};
use crate::square::Square;
use crate::transposition_table::TranspositionTable;
use crate::types::{Depth, Score, Scoref, Selectivity};

/// Per-ply record on the search stack.
#[derive(Clone, Copy)]
pub struct StackRecord {
    /// Principal variation from this ply downward.
    pub pv: [Square; MAX_PLY],
}

/// All mutable state one worker carries through a search.
pub struct SearchContext {
    /// Nodes searched by this context.
    pub n_nodes: u64,
    /// Current selectivity level.
    pub selectivity: Selectivity,
    /// Empty squares of the current position, parity included.
    pub empty_list: EmptyList,
    /// Main transposition table.
    pub tt: Arc<TranspositionTable>,
    /// PV-node table, used to rebuild lines across iterations.
    pub pv_table: Arc<TranspositionTable>,
    /// Scratch table for move-ordering scout searches.
    pub shallow_table: Arc<TranspositionTable>,
    /// Root move list shared by all workers.
    pub root_moves: RootMoves,
    /// Evaluator.
    pub eval: Arc<Eval>,
    /// Optional progress reporting hook.
    pub callback: Option<Arc<SearchProgressCallback>>,
    /// PV stack, indexed by game ply.
    stack: Box<[StackRecord; MAX_PLY]>,
}

impl SearchContext {
    pub fn new(
        board: &Board,
        selectivity: Selectivity,
        tt: Arc<TranspositionTable>,
        pv_table: Arc<TranspositionTable>,
        shallow_table: Arc<TranspositionTable>,
        root_moves: RootMoves,
        eval: Arc<Eval>,
    ) -> SearchContext {
        SearchContext {
            n_nodes: 0,
            selectivity,
            empty_list: EmptyList::new(board),
            tt,
            pv_table,
            shallow_table,
            root_moves,
            eval,
            callback: None,
            stack: Box::new(
                [StackRecord {
                    pv: [Square::None; MAX_PLY],
                }; MAX_PLY],
            ),
        }
    }

    /// Builds a context for a helper thread joining a split point.
    pub fn from_split_point(sp: &Arc<SplitPoint>) -> SearchContext {
        let state = sp.state();
        let task = state.task.as_ref().unwrap();
        SearchContext {
            n_nodes: 0,
            selectivity: task.selectivity,
            empty_list: task.empty_list.clone(),
            tt: task.tt.clone(),
            pv_table: task.pv_table.clone(),
            shallow_table: task.shallow_table.clone(),
            root_moves: task.root_moves.clone(),
            eval: task.eval.clone(),
            callback: None,
            stack: Box::new(
                [StackRecord {
                    pv: [Square::None; MAX_PLY],
                }; MAX_PLY],
            ),
        }
    }

    /// Applies a move: bumps the node counter and unlinks the square.
    #[inline]
    pub fn update(&mut self, sq: Square) {
        self.increment_nodes();
        self.empty_list.remove(sq);
    }

    /// Undoes a move applied with [`update`](Self::update).
    #[inline]
    pub fn undo(&mut self, sq: Square) {
        self.empty_list.restore(sq);
    }

    /// Applies a pass.
    #[inline]
    pub fn update_pass(&mut self) {
        self.increment_nodes();
    }

    #[inline]
    pub fn undo_pass(&mut self) {}

    /// Game ply of the current position.
    #[inline]
    pub fn ply(&self) -> usize {
        self.empty_list.ply()
    }

    #[inline]
    pub fn increment_nodes(&mut self) {
        self.n_nodes += 1;
    }

    /// Writes `sq` at the head of this ply's PV and appends the child
    /// ply's line after it.
    pub fn update_pv(&mut self, sq: Square) {
        let ply = self.ply();
        self.stack[ply].pv[0] = sq;
        let mut idx = 0;
        while idx + 2 < MAX_PLY && self.stack[ply + 1].pv[idx] != Square::None {
            self.stack[ply].pv[idx + 1] = self.stack[ply + 1].pv[idx];
            idx += 1;
        }
        self.stack[ply].pv[idx + 1] = Square::None;
    }

    /// Clears this ply's PV before a re-search.
    pub fn clear_pv(&mut self) {
        self.stack[self.ply()].pv.fill(Square::None);
    }

    /// Makes `sq` the whole PV of this ply (terminal moves).
    pub fn set_single_pv(&mut self, sq: Square) {
        let ply = self.ply();
        self.stack[ply].pv.fill(Square::None);
        self.stack[ply].pv[0] = sq;
    }

    /// Shifts this ply's PV right and leads it with a pass. A pass does
    /// not consume a ply, so the passing node and its child share the
    /// stack slot.
    pub fn prepend_pass_to_pv(&mut self) {
        let ply = self.ply();
        let line = self.stack[ply].pv;
        self.stack[ply].pv[0] = Square::Pass;
        self.stack[ply].pv[1..].copy_from_slice(&line[..MAX_PLY - 1]);
    }

    /// PV of the current ply.
    #[inline]
    pub fn get_pv(&self) -> &[Square; MAX_PLY] {
        &self.stack[self.ply()].pv
    }

    /// Overwrites the current ply's PV (split-point join).
    #[inline]
    pub fn set_pv(&mut self, pv: &[Square; MAX_PLY]) {
        self.stack[self.ply()].pv.copy_from_slice(pv);
    }

    pub fn set_callback(&mut self, callback: Arc<SearchProgressCallback>) {
        self.callback = Some(callback);
    }

    /// Pushes an iteration result to the registered observer.
    pub fn notify_progress(
        &self,
        depth: Depth,
        score: Scoref,
        best_move: Square,
        selectivity: Selectivity,
        pv: Vec<Square>,
    ) {
        if let Some(ref callback) = self.callback {
            callback(SearchProgress {
                depth,
                score,
                best_move,
                selectivity,
                probability: crate::probcut::get_probability(selectivity),
                n_nodes: self.n_nodes,
                pv,
            });
        }
    }

    /// Records a root move result, including its PV when it improves.
    pub fn update_root_move(
        &mut self,
        sq: Square,
        score: Score,
        move_count: usize,
        alpha: Score,
        beta: Score,
    ) {
        let is_pv = move_count == 1 || score > alpha;
        if is_pv {
            self.update_pv(sq);
        }
        let pv = *self.get_pv();
        self.root_moves.update(sq, score, move_count, alpha, beta, &pv);
    }
}
