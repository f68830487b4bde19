pub mod endgame;
pub mod midgame;
pub mod node_type;
pub mod root_move;
pub mod search_context;
pub mod search_result;
pub mod threading;
pub mod time_control;

use std::path::PathBuf;
use std::sync::Arc;

use search_result::SearchResult;
use threading::{Stop, Thread, ThreadPool};
use time_control::{TimeControl, TimeManager};

use crate::board::Board;
use crate::eval::Eval;
use crate::level::Level;
use crate::move_list::MoveList;
use crate::probcut::NO_SELECTIVITY;
use crate::square::Square;
use crate::transposition_table::{StoreRequest, TranspositionTable};
use crate::types::{Depth, Score, Scoref, Selectivity};

/// Engine-wide configuration.
pub struct SearchOptions {
    /// Size of the main transposition table, in megabytes. The PV and
    /// shallow tables take a fraction of it on top.
    pub tt_mb_size: usize,
    /// Worker thread count (clamped to the CPU count).
    pub n_threads: usize,
    /// Evaluation weight file; built-in weights when absent.
    pub eval_path: Option<PathBuf>,
}

impl SearchOptions {
    #[must_use]
    pub fn new(tt_mb_size: usize) -> Self {
        SearchOptions {
            tt_mb_size,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_threads(mut self, n_threads: Option<usize>) -> Self {
        if let Some(value) = n_threads {
            self.n_threads = value;
        }
        self
    }

    #[must_use]
    pub fn with_eval_path(mut self, eval_path: Option<PathBuf>) -> Self {
        self.eval_path = eval_path;
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            tt_mb_size: 64,
            n_threads: num_cpus::get(),
            eval_path: None,
        }
    }
}

/// Parameters of one search request, as given to the thread pool.
#[derive(Clone, Copy)]
pub struct SearchRequest {
    pub level: Level,
    pub selectivity: Selectivity,
    pub time: TimeControl,
    pub multi_pv: bool,
}

impl SearchRequest {
    pub fn with_level(level: Level, selectivity: Selectivity) -> Self {
        SearchRequest {
            level,
            selectivity,
            time: TimeControl::Infinite,
            multi_pv: false,
        }
    }
}

/// Task handed to the main search thread.
pub struct SearchTask {
    pub board: Board,
    pub level: Level,
    pub selectivity: Selectivity,
    pub multi_pv: bool,
    pub tt: Arc<TranspositionTable>,
    pub pv_table: Arc<TranspositionTable>,
    pub shallow_table: Arc<TranspositionTable>,
    pub pool: Arc<ThreadPool>,
    pub eval: Arc<Eval>,
    pub time_manager: Option<Arc<TimeManager>>,
    pub callback: Option<Arc<SearchProgressCallback>>,
}

/// Progress snapshot handed to the observer after each iteration.
pub struct SearchProgress {
    pub depth: Depth,
    pub score: Scoref,
    pub best_move: Square,
    pub selectivity: Selectivity,
    pub probability: i32,
    pub n_nodes: u64,
    pub pv: Vec<Square>,
}

pub type SearchProgressCallback = dyn Fn(SearchProgress) + Send + Sync + 'static;

/// The engine core: owns the transposition tables, the thread pool and
/// the evaluator; runs searches against them.
pub struct Search {
    tt: Arc<TranspositionTable>,
    pv_table: Arc<TranspositionTable>,
    shallow_table: Arc<TranspositionTable>,
    threads: Arc<ThreadPool>,
    eval: Arc<Eval>,
}

impl Search {
    pub fn new(options: &SearchOptions) -> Search {
        let n_threads = options.n_threads.min(num_cpus::get()).max(1);
        let eval = match &options.eval_path {
            Some(path) => Eval::from_file(path)
                .unwrap_or_else(|err| panic!("failed to load evaluation weights: {err}")),
            None => Eval::uniform(),
        };

        crate::init();

        let tt_mb = options.tt_mb_size.max(1);
        Search {
            tt: Arc::new(TranspositionTable::with_capacity_mb(tt_mb)),
            pv_table: Arc::new(TranspositionTable::with_capacity_mb((tt_mb / 16).max(1))),
            shallow_table: Arc::new(TranspositionTable::with_capacity_mb((tt_mb / 4).max(1))),
            threads: ThreadPool::new(n_threads),
            eval: Arc::new(eval),
        }
    }

    /// Clears all cached state between games.
    pub fn init(&mut self) {
        self.tt.clear();
        self.pv_table.clear();
        self.shallow_table.clear();
        self.eval.cache.clear();
    }

    /// Runs a synchronous search.
    pub fn run(&mut self, board: &Board, request: &SearchRequest) -> SearchResult {
        self.run_with_callback::<fn(SearchProgress)>(board, request, None)
    }

    pub fn run_with_callback<F>(
        &mut self,
        board: &Board,
        request: &SearchRequest,
        callback: Option<F>,
    ) -> SearchResult
    where
        F: Fn(SearchProgress) + Send + Sync + 'static,
    {
        let callback = callback.map(|f| Arc::new(f) as Arc<SearchProgressCallback>);
        let receiver = self.submit(board, request, callback);
        let mut result = receiver.recv().unwrap();
        self.threads.stop_timer();
        result.time_ms = self
            .threads
            .search_started()
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        result
    }

    /// Starts a background (pondering) search; the caller joins through
    /// the returned receiver after [`Search::abort`].
    pub fn start_pondering(
        &mut self,
        board: &Board,
        request: &SearchRequest,
    ) -> std::sync::mpsc::Receiver<SearchResult> {
        self.submit(board, request, None)
    }

    fn submit(
        &mut self,
        board: &Board,
        request: &SearchRequest,
        callback: Option<Arc<SearchProgressCallback>>,
    ) -> std::sync::mpsc::Receiver<SearchResult> {
        self.tt.new_search();
        self.pv_table.new_search();
        self.shallow_table.new_search();

        let time_manager = match request.time {
            TimeControl::Infinite => None,
            mode => Some(Arc::new(TimeManager::new(mode, board.get_empty_count()))),
        };

        let task = SearchTask {
            board: *board,
            level: request.level,
            selectivity: request.selectivity,
            multi_pv: request.multi_pv,
            tt: self.tt.clone(),
            pv_table: self.pv_table.clone(),
            shallow_table: self.shallow_table.clone(),
            pool: self.threads.clone(),
            eval: self.eval.clone(),
            time_manager: time_manager.clone(),
            callback,
        };

        let receiver = self.threads.start_thinking(task);
        // The timer arms after the stop flag was reset for this search.
        if let Some(tm) = time_manager {
            self.threads.start_timer(tm);
        }
        receiver
    }

    /// Requests the current search to stop.
    pub fn abort(&self, reason: Stop) {
        self.threads.abort_search(reason);
    }

    pub fn is_aborted(&self) -> bool {
        self.threads.is_aborted()
    }

    pub fn stop_reason(&self) -> Stop {
        self.threads.stop_reason()
    }

    pub fn get_thread_pool(&self) -> Arc<ThreadPool> {
        self.threads.clone()
    }
}

impl Drop for Search {
    fn drop(&mut self) {
        assert!(Arc::strong_count(&self.threads) == 1);
    }
}

/// Entry point for the main thread: hands the task to the midgame or
/// the endgame driver depending on whether the level solves this many
/// empties.
pub fn search_root(task: SearchTask, thread: &Arc<Thread>) -> SearchResult {
    let n_empties = task.board.get_empty_count();

    if !task.board.has_legal_moves() {
        if task.board.is_game_over() {
            return SearchResult {
                depth: 0,
                selectivity: NO_SELECTIVITY,
                best_move: None,
                score: endgame::solve(&task.board, n_empties) as Scoref,
                bounds: vec![],
                pv_line: vec![],
                n_nodes: 0,
                time_ms: 0,
                book_move: false,
            };
        }
        return SearchResult::new_pass();
    }

    let max_end_depth = task.level.get_end_depth(task.selectivity);
    if max_end_depth >= n_empties {
        endgame::search_root(task, thread)
    } else {
        midgame::search_root(task, thread)
    }
}

/// Enhanced transposition cutoff: probes every successor before the
/// search expands any of them. A stored child upper bound `u` proves a
/// parent score of at least `-u`; when that clears alpha at sufficient
/// draft the node fails high immediately.
pub(crate) fn enhanced_transposition_cutoff(
    ctx: &mut search_context::SearchContext,
    board: &Board,
    move_list: &MoveList,
    depth: Depth,
    alpha: Score,
) -> Option<Score> {
    let etc_depth = (depth - 1) as u8;
    for mv in move_list.iter() {
        let next = board.make_move_with_flipped(mv.flipped, mv.sq);
        ctx.increment_nodes();

        if let Some(data) = ctx.tt.probe(&next)
            && data.depth >= etc_depth
            && data.selectivity >= ctx.selectivity
        {
            let score = -(data.upper as Score);
            if score > alpha {
                ctx.tt.store(
                    board,
                    &StoreRequest {
                        depth,
                        selectivity: ctx.selectivity,
                        cost: 0,
                        alpha,
                        beta: alpha + 1,
                        score,
                        best_move: mv.sq,
                    },
                );
                return Some(score);
            }
        }
    }
    None
}

/// Cost of a finished node for the transposition table's replacement
/// key: the bit length of its subtree's node count.
#[inline]
pub(crate) fn search_cost(nodes: u64) -> u8 {
    nodes.max(1).ilog2() as u8
}
