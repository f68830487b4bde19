//! Parallel search: thread pool, split points and stop propagation.
//!
//! Young-Brothers-Wait parallelism: a node's first move is searched
//! sequentially; once it has established a bound, the remaining moves
//! may be distributed to idle helper threads through a split point. The
//! split point owns the shared window and best score under a spin lock;
//! a beta cutoff raises its stop flag, which every helper observes
//! through its split-point chain.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{JoinHandle, sleep};
use std::time::{Duration, Instant};

use lock_api::RawMutex;

use crate::board::Board;
use crate::constants::MAX_PLY;
use crate::empty_list::EmptyList;
use crate::eval::Eval;
use crate::move_list::ConcurrentMoveIterator;
use crate::search::node_type::{NodeType, NonPV, PV, Root};
use crate::search::root_move::RootMoves;
use crate::search::search_context::SearchContext;
use crate::search::search_result::SearchResult;
use crate::search::time_control::TimeManager;
use crate::search::{self, SearchTask, endgame, midgame};
use crate::square::Square;
use crate::transposition_table::TranspositionTable;
use crate::types::{Depth, Score, Selectivity};
use crate::util::bitset::AtomicBitSet;
use crate::util::spinlock::RawSpinLock;

/// Maximum number of split points one thread may own at once.
const MAX_SPLITPOINTS_PER_THREAD: usize = 8;

/// Maximum number of threads working one split point.
const MAX_HELPERS_PER_SPLITPOINT: u32 = 5;

/// Why a search is stopping (or that it is not).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Stop {
    Running = 0,
    /// A split-point cutoff is unwinding helper threads.
    StopParallelSearch,
    /// A pondering search yields its workers to the real search.
    StopPondering,
    /// The time manager's hard limit fired.
    StopTimeout,
    /// The host asked for the best answer so far.
    StopOnDemand,
    /// The engine is shutting down.
    StopEnd,
}

impl Stop {
    fn from_u8(value: u8) -> Stop {
        match value {
            0 => Stop::Running,
            1 => Stop::StopParallelSearch,
            2 => Stop::StopPondering,
            3 => Stop::StopTimeout,
            4 => Stop::StopOnDemand,
            _ => Stop::StopEnd,
        }
    }
}

/// Shared state of one split point.
pub struct SplitPointState {
    /// False once any helper went idle; late joiners need all helpers
    /// active to be worth the locking.
    all_helpers_searching: AtomicBool,

    /// Current alpha of the node's window.
    alpha: AtomicI32,

    /// Beta of the node's window (constant during the split).
    pub beta: Score,

    best_score: AtomicI32,

    best_move: AtomicU8,

    /// Dispenser of the node's remaining moves.
    pub move_iter: Option<Arc<ConcurrentMoveIterator>>,

    /// `NodeType::TYPE_ID` of the node being split.
    node_type: u32,

    /// Set when a beta cutoff was proved at this node.
    cutoff: AtomicBool,

    owner_thread_idx: usize,

    /// Which threads currently work this split point.
    helpers_mask: AtomicBitSet,

    depth: Depth,

    /// Nodes searched by helpers, merged on join.
    n_nodes: AtomicU64,

    /// The position and context snapshot helpers start from.
    pub task: Option<SplitPointTask>,

    parent_split_point: Option<Arc<SplitPoint>>,

    /// PV found at this split point (PV nodes only).
    pv: [Square; MAX_PLY],
}

impl SplitPointState {
    #[inline]
    pub fn alpha(&self) -> Score {
        self.alpha.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_alpha(&self, value: Score) {
        self.alpha.store(value, Ordering::Relaxed);
    }

    #[inline]
    pub fn all_helpers_searching(&self) -> bool {
        self.all_helpers_searching.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_all_helpers_searching(&self, value: bool) {
        self.all_helpers_searching.store(value, Ordering::Relaxed);
    }

    #[inline]
    pub fn cutoff(&self) -> bool {
        self.cutoff.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_cutoff(&self, value: bool) {
        self.cutoff.store(value, Ordering::Relaxed);
    }

    #[inline]
    pub fn best_score(&self) -> Score {
        self.best_score.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_best_score(&self, value: Score) {
        self.best_score.store(value, Ordering::Relaxed);
    }

    #[inline]
    pub fn best_move(&self) -> Square {
        Square::from_u8_unchecked(self.best_move.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set_best_move(&self, value: Square) {
        self.best_move.store(value as u8, Ordering::Relaxed);
    }

    #[inline]
    pub fn n_nodes(&self) -> u64 {
        self.n_nodes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn add_nodes(&self, count: u64) {
        self.n_nodes.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_endgame(&self) -> bool {
        self.task.as_ref().is_some_and(|t| t.is_endgame)
    }

    #[inline]
    pub fn copy_pv(&mut self, src: &[Square; MAX_PLY]) {
        self.pv.copy_from_slice(src);
    }

    #[inline]
    pub fn pv(&self) -> &[Square; MAX_PLY] {
        &self.pv
    }
}

/// Context snapshot a helper needs to reconstruct the split node.
pub struct SplitPointTask {
    pub board: Board,
    pub selectivity: Selectivity,
    pub is_endgame: bool,
    pub tt: Arc<TranspositionTable>,
    pub pv_table: Arc<TranspositionTable>,
    pub shallow_table: Arc<TranspositionTable>,
    pub root_moves: RootMoves,
    pub eval: Arc<Eval>,
    pub empty_list: EmptyList,
}

/// A split point: a spin lock plus the state it guards.
pub struct SplitPoint {
    mutex: RawSpinLock,
    state: UnsafeCell<SplitPointState>,
}

unsafe impl Sync for SplitPoint {}

impl Default for SplitPoint {
    fn default() -> Self {
        SplitPoint {
            mutex: RawSpinLock::INIT,
            state: UnsafeCell::new(SplitPointState {
                all_helpers_searching: AtomicBool::new(false),
                alpha: AtomicI32::new(0),
                beta: 0,
                best_score: AtomicI32::new(0),
                best_move: AtomicU8::new(Square::None as u8),
                move_iter: None,
                node_type: 0,
                cutoff: AtomicBool::new(false),
                owner_thread_idx: 0,
                helpers_mask: AtomicBitSet::new(),
                depth: 0,
                n_nodes: AtomicU64::new(0),
                task: None,
                parent_split_point: None,
                pv: [Square::None; MAX_PLY],
            }),
        }
    }
}

impl SplitPoint {
    #[inline]
    pub fn state(&self) -> &SplitPointState {
        unsafe { &*self.state.get() }
    }

    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub fn state_mut(&self) -> &mut SplitPointState {
        unsafe { &mut *self.state.get() }
    }

    #[inline]
    pub fn lock(&self) {
        self.mutex.lock();
    }

    #[inline]
    pub fn unlock(&self) {
        unsafe { self.mutex.unlock() };
    }
}

/// Mutable state of one worker thread, guarded by its spin lock.
pub struct ThreadState {
    /// Split point this thread currently works on.
    pub active_split_point: Option<Arc<SplitPoint>>,

    /// Number of live entries in `split_points`.
    pub split_points_size: usize,

    /// Stack of split points owned by this thread.
    split_points: [Arc<SplitPoint>; MAX_SPLITPOINTS_PER_THREAD],
}

/// One worker thread of the pool.
pub struct Thread {
    mutex_for_sleep_condition: Mutex<()>,

    mutex_for_state: RawSpinLock,

    sleep_condition: std::sync::Condvar,

    idx: usize,

    pool: Weak<ThreadPool>,

    thinking: Arc<AtomicBool>,

    state: UnsafeCell<ThreadState>,

    ready: AtomicBool,

    searching: AtomicBool,

    exit: AtomicBool,
}

unsafe impl Sync for Thread {}

impl Thread {
    fn new(idx: usize, thinking: Arc<AtomicBool>, pool: Weak<ThreadPool>) -> Thread {
        let split_points = std::array::from_fn(|_| Arc::new(SplitPoint::default()));

        Thread {
            mutex_for_sleep_condition: Mutex::new(()),
            mutex_for_state: RawSpinLock::INIT,
            sleep_condition: std::sync::Condvar::new(),
            idx,
            pool,
            thinking,
            state: UnsafeCell::new(ThreadState {
                active_split_point: None,
                split_points_size: 0,
                split_points,
            }),
            ready: AtomicBool::new(false),
            searching: AtomicBool::new(false),
            exit: AtomicBool::new(false),
        }
    }

    pub fn lock(&self) {
        self.mutex_for_state.lock();
    }

    pub fn unlock(&self) {
        unsafe { self.mutex_for_state.unlock() };
    }

    #[inline]
    pub fn state(&self) -> &ThreadState {
        unsafe { &*self.state.get() }
    }

    #[inline]
    #[allow(clippy::mut_from_ref)]
    fn state_mut(&self) -> &mut ThreadState {
        unsafe { &mut *self.state.get() }
    }

    /// Whether this thread may open another split point: the pool must
    /// have more than one thread, the thread must be below its split
    /// limit, and its active split point (if any) must be able to
    /// absorb or release helpers.
    pub fn can_split(&self) -> bool {
        let thread_pool_size = self.pool.upgrade().map_or(1, |p| p.size) as u32;
        if thread_pool_size <= 1 {
            return false;
        }

        let th_state = self.state();

        let cond = if let Some(sp) = &th_state.active_split_point {
            let sp_state = sp.state();
            !sp_state.all_helpers_searching()
                || thread_pool_size > MAX_HELPERS_PER_SPLITPOINT
                    && sp_state.helpers_mask.count() == MAX_HELPERS_PER_SPLITPOINT
        } else {
            true
        };

        cond && (th_state.split_points_size < MAX_SPLITPOINTS_PER_THREAD)
    }

    fn notify_one(&self) {
        let _lock = self.mutex_for_sleep_condition.lock();
        self.sleep_condition.notify_one();
    }

    /// Whether a beta cutoff fired anywhere up this thread's chain of
    /// split points.
    pub fn cutoff_occurred(&self) -> bool {
        let mut current_sp = self.state().active_split_point.as_ref();
        while let Some(sp) = current_sp {
            let sp_state = sp.state();
            if sp_state.cutoff() {
                return true;
            }
            current_sp = sp_state.parent_split_point.as_ref();
        }
        false
    }

    /// Whether this thread may join `sp`: it must be idle and, as an
    /// owner of other split points, may only help its own helpers
    /// (the helpful-owner rule).
    fn can_join(&self, sp: &Arc<SplitPoint>) -> bool {
        if self.searching.load(Ordering::Acquire) {
            return false;
        }

        let th_state = self.state();
        let size = th_state.split_points_size;

        if size == 0 {
            return true;
        }

        let sp_state = th_state.split_points[size - 1].state();
        let owner_idx = sp.state().owner_thread_idx;
        sp_state.helpers_mask.test(owner_idx)
    }

    /// Opens a split point over the node's remaining moves, recruits
    /// idle helpers, participates in the search, and returns the merged
    /// `(best_score, best_move, helper_nodes)` once every helper left.
    #[allow(clippy::too_many_arguments)]
    pub fn split(
        self: &Arc<Self>,
        ctx: &mut SearchContext,
        board: &Board,
        alpha: Score,
        beta: Score,
        best_score: Score,
        best_move: Square,
        depth: Depth,
        move_iter: &Arc<ConcurrentMoveIterator>,
        node_type: u32,
        is_endgame: bool,
    ) -> (Score, Square, u64) {
        let sp = {
            let th_state = self.state();
            th_state.split_points[th_state.split_points_size].clone()
        };

        self.initialize_split_point(
            &sp, ctx, depth, best_score, best_move, alpha, beta, node_type, is_endgame, move_iter,
            board,
        );

        // Owner enters the idle loop; it returns when every helper is
        // done with this split point.
        self.idle_loop();

        self.finalize_split_point(&sp);

        let sp_state = sp.state();
        ctx.set_pv(sp_state.pv());

        (
            sp_state.best_score(),
            sp_state.best_move(),
            sp_state.n_nodes(),
        )
    }

    #[inline]
    #[allow(clippy::too_many_arguments)]
    fn initialize_split_point(
        &self,
        sp: &Arc<SplitPoint>,
        ctx: &SearchContext,
        depth: Depth,
        best_score: Score,
        best_move: Square,
        alpha: Score,
        beta: Score,
        node_type: u32,
        is_endgame: bool,
        move_iter: &Arc<ConcurrentMoveIterator>,
        board: &Board,
    ) {
        let th_state = self.state_mut();
        debug_assert!(self.searching.load(Ordering::Acquire));
        debug_assert!(th_state.split_points_size < MAX_SPLITPOINTS_PER_THREAD);

        sp.lock();
        let sp_state = sp.state_mut();
        sp_state.owner_thread_idx = self.idx;
        sp_state.parent_split_point = th_state.active_split_point.clone();
        sp_state.helpers_mask.clear();
        sp_state.helpers_mask.set(self.idx);
        sp_state.depth = depth;
        sp_state.set_best_score(best_score);
        sp_state.set_best_move(best_move);
        sp_state.set_alpha(alpha);
        sp_state.beta = beta;
        sp_state.node_type = node_type;
        sp_state.move_iter = Some(move_iter.clone());
        sp_state.task = Some(SplitPointTask {
            board: *board,
            selectivity: ctx.selectivity,
            is_endgame,
            tt: ctx.tt.clone(),
            pv_table: ctx.pv_table.clone(),
            shallow_table: ctx.shallow_table.clone(),
            root_moves: ctx.root_moves.clone(),
            eval: ctx.eval.clone(),
            empty_list: ctx.empty_list.clone(),
        });
        sp_state.n_nodes.store(0, Ordering::Relaxed);
        sp_state.set_cutoff(false);
        sp_state.set_all_helpers_searching(true); // set under lock
        sp_state.copy_pv(ctx.get_pv());

        th_state.split_points_size += 1;
        th_state.active_split_point = Some(sp.clone());

        self.pool
            .upgrade()
            .unwrap()
            .assign_helpers_to_split_point(sp);

        sp.unlock();
    }

    #[inline]
    fn finalize_split_point(&self, sp: &Arc<SplitPoint>) {
        debug_assert!(!self.searching.load(Ordering::Acquire));

        self.lock();

        // Decreasing split_points_size must happen under the lock to
        // avoid racing Thread::can_join.
        self.searching.store(true, Ordering::Release);
        let th_state = self.state_mut();
        th_state.split_points_size -= 1;
        th_state.active_split_point = sp.state().parent_split_point.clone();

        self.unlock();

        sp.state_mut().task = None;
    }

    /// Worker main loop: search when assigned to a split point, late-
    /// join other split points when idle, sleep between searches. Also
    /// entered by a split owner, which leaves as soon as its split
    /// point has no helpers left.
    fn idle_loop(self: &Arc<Self>) {
        // Non-empty only when called from split(): we own this split
        // point and leave once its helpers are gone.
        let this_sp = self.state().active_split_point.clone();

        while !self.exit.load(Ordering::Acquire) {
            if let Some(ref sp) = this_sp
                && sp.state().helpers_mask.none()
            {
                break;
            }

            while self.searching.load(Ordering::Acquire) {
                self.lock();
                let sp = self.state().active_split_point.clone().unwrap();
                self.unlock();

                let (board, depth, node_type, is_endgame) = {
                    sp.lock();
                    let sp_state = sp.state();
                    let task = sp_state.task.as_ref().unwrap();
                    let snapshot = (task.board, sp_state.depth, sp_state.node_type, task.is_endgame);
                    sp.unlock();
                    snapshot
                };

                let mut ctx = SearchContext::from_split_point(&sp);
                self.dispatch_search(&mut ctx, &board, depth, node_type, is_endgame, &sp);

                self.lock();
                self.searching.store(false, Ordering::Release);
                self.unlock();

                sp.lock();
                let sp_state = sp.state_mut();
                sp_state.helpers_mask.reset(self.idx);
                sp_state.set_all_helpers_searching(false);
                sp_state.add_nodes(ctx.n_nodes);

                // After this unlock the split point may be recycled by
                // its owner at any moment.
                sp.unlock();

                self.try_late_join();
            }

            if !self.thinking.load(Ordering::Acquire) {
                debug_assert!(this_sp.is_none());

                let lock = self.mutex_for_sleep_condition.lock().unwrap();
                self.ready.store(true, Ordering::Release);
                let _guard = self
                    .sleep_condition
                    .wait_while(lock, |_| {
                        !self.exit.load(Ordering::Acquire)
                            && !self.thinking.load(Ordering::Acquire)
                    })
                    .unwrap();
            } else {
                std::thread::yield_now();
            }
        }
    }

    /// Main-thread loop: receives search tasks, wakes the workers, runs
    /// the root search and reports the result.
    fn main_thread_loop(self: Arc<Self>, receiver: Arc<Mutex<Receiver<Message>>>) {
        loop {
            if self.exit.load(Ordering::Acquire) {
                break;
            }

            let message = {
                let receiver_guard = receiver.lock().unwrap();
                receiver_guard.recv()
            };

            match message {
                Ok(Message::StartThinking(task, thread, result_sender)) => {
                    thread.searching.store(true, Ordering::Release);

                    task.pool.notify_all();
                    let pool = task.pool.clone();

                    let result = search::search_root(task, &thread);

                    thread.searching.store(false, Ordering::Release);
                    pool.thinking.store(false, Ordering::Release);

                    let _ = result_sender.send(result);
                }
                Ok(Message::Exit) | Err(_) => {
                    self.exit.store(true, Ordering::Release);
                    break;
                }
            }
        }
    }

    /// Runs the split-point search matching the owner's node.
    fn dispatch_search(
        self: &Arc<Self>,
        ctx: &mut SearchContext,
        board: &Board,
        depth: Depth,
        node_type: u32,
        is_endgame: bool,
        sp: &Arc<SplitPoint>,
    ) {
        match (is_endgame, node_type) {
            (true, NonPV::TYPE_ID) => {
                endgame::search_sp::<NonPV>(ctx, board, self, sp);
            }
            (true, PV::TYPE_ID) => {
                endgame::search_sp::<PV>(ctx, board, self, sp);
            }
            (true, Root::TYPE_ID) => {
                endgame::search_sp::<Root>(ctx, board, self, sp);
            }
            (false, NonPV::TYPE_ID) => {
                midgame::search_sp::<NonPV>(ctx, board, depth, self, sp);
            }
            (false, PV::TYPE_ID) => {
                midgame::search_sp::<PV>(ctx, board, depth, self, sp);
            }
            (false, Root::TYPE_ID) => {
                midgame::search_sp::<Root>(ctx, board, depth, self, sp);
            }
            _ => unreachable!("invalid node type: {node_type}"),
        }
    }

    /// After finishing its work, a thread offers itself to the highest
    /// split point it is allowed to join.
    fn try_late_join(&self) {
        let mut best_sp = None;
        let mut min_level = i32::MAX;
        let pool = self.pool.upgrade().unwrap();
        for th in &pool.threads {
            let size = th.state().split_points_size;
            if size == 0 {
                continue;
            }

            let sp = &th.state().split_points[size - 1];
            let sp_state = sp.state();
            if sp_state.all_helpers_searching()
                && sp_state.helpers_mask.count() < MAX_HELPERS_PER_SPLITPOINT
                && self.can_join(sp)
            {
                let mut level = 0;
                let mut active_sp = &th.state().active_split_point;
                while let Some(p) = active_sp {
                    level += 1;
                    active_sp = &p.state().parent_split_point;
                }

                if level < min_level {
                    min_level = level;
                    best_sp = Some(sp);
                }
            }
        }

        if let Some(sp) = best_sp {
            // Conditions may have changed; recheck under the lock.
            sp.lock();

            let sp_state = sp.state_mut();
            if sp_state.all_helpers_searching()
                && sp_state.helpers_mask.count() < MAX_HELPERS_PER_SPLITPOINT
            {
                self.lock();

                if self.can_join(sp) {
                    sp_state.helpers_mask.set(self.idx);
                    let th_state = self.state_mut();
                    th_state.active_split_point = Some(sp.clone());
                    self.searching.store(true, Ordering::Release);
                }

                self.unlock();
            }

            sp.unlock();
        }
    }

    pub fn is_search_aborted(&self) -> bool {
        self.pool.upgrade().is_some_and(|pool| pool.is_aborted())
    }
}

enum Message {
    StartThinking(SearchTask, Arc<Thread>, Sender<SearchResult>),
    Exit,
}

/// The fixed pool of search threads.
pub struct ThreadPool {
    threads: Vec<Arc<Thread>>,

    thread_handles: Vec<JoinHandle<()>>,

    pub size: usize,

    thinking: Arc<AtomicBool>,

    sender: Arc<Sender<Message>>,

    receiver: Arc<Mutex<Receiver<Message>>>,

    /// Stop state of the current search.
    stop: Arc<AtomicU8>,

    /// When the running search started.
    search_start: Mutex<Option<Instant>>,

    timer_handle: Mutex<Option<JoinHandle<()>>>,

    timer_stop: Arc<AtomicBool>,
}

impl ThreadPool {
    /// Creates the pool and starts its threads.
    pub fn new(n_threads: usize) -> Arc<ThreadPool> {
        Arc::new_cyclic(|weak| {
            let (sender, receiver) = std::sync::mpsc::channel();

            let mut pool = ThreadPool {
                threads: Vec::new(),
                thread_handles: Vec::new(),
                size: n_threads.clamp(1, 64),
                thinking: Arc::new(AtomicBool::new(false)),
                sender: Arc::new(sender),
                receiver: Arc::new(Mutex::new(receiver)),
                stop: Arc::new(AtomicU8::new(Stop::Running as u8)),
                search_start: Mutex::new(None),
                timer_handle: Mutex::new(None),
                timer_stop: Arc::new(AtomicBool::new(false)),
            };

            pool.init(weak);
            pool
        })
    }

    fn init(&mut self, pool: &Weak<ThreadPool>) {
        self.create_main_thread(pool);
        self.create_worker_threads(pool);
        self.wait_for_threads_ready();
    }

    fn create_main_thread(&mut self, pool: &Weak<ThreadPool>) {
        let main_thread = Arc::new(Thread::new(0, self.thinking.clone(), pool.clone()));
        let main_thread_clone = main_thread.clone();
        let receiver_clone = self.receiver.clone();

        let handle = std::thread::spawn(move || main_thread_clone.main_thread_loop(receiver_clone));

        self.threads.push(main_thread);
        self.thread_handles.push(handle);
    }

    fn create_worker_threads(&mut self, pool: &Weak<ThreadPool>) {
        for i in 1..self.size {
            let thread = Arc::new(Thread::new(i, self.thinking.clone(), pool.clone()));
            let thread_clone = thread.clone();

            let handle = std::thread::spawn(move || thread_clone.idle_loop());

            self.threads.push(thread);
            self.thread_handles.push(handle);
        }
    }

    fn wait_for_threads_ready(&self) {
        self.main().ready.store(true, Ordering::Release);

        while !self
            .threads
            .iter()
            .all(|thread| thread.ready.load(Ordering::Relaxed))
        {
            sleep(Duration::from_millis(10));
        }
    }

    fn exit(&mut self) {
        if self.threads.is_empty() {
            return;
        }

        self.stop_timer();
        self.abort_search(Stop::StopEnd);

        for thread in &self.threads {
            let _lock = thread.mutex_for_sleep_condition.lock();
            thread.exit.store(true, Ordering::Release);
        }

        for thread in &self.threads {
            thread.notify_one();
        }

        let _ = self.sender.send(Message::Exit);

        for (_idx, thread_handle) in self.thread_handles.drain(..).enumerate() {
            if let Err(_panic_info) = thread_handle.join() {
                #[cfg(debug_assertions)]
                eprintln!("warning: thread {_idx} panicked during shutdown");
            }
        }

        self.threads.clear();
    }

    /// Books idle threads onto a freshly initialized split point.
    fn assign_helpers_to_split_point(&self, sp: &Arc<SplitPoint>) {
        let sp_state = sp.state_mut();
        while sp_state.helpers_mask.count() < MAX_HELPERS_PER_SPLITPOINT {
            if let Some(helper) = self.threads.iter().find(|t| t.can_join(sp)).cloned() {
                helper.lock();

                if helper.can_join(sp) {
                    sp_state.helpers_mask.set(helper.idx);
                    let helper_state = helper.state_mut();
                    helper_state.active_split_point = Some(sp.clone());
                    helper.searching.store(true, Ordering::Release);
                }
                helper.unlock();
            } else {
                break;
            }
        }
    }

    /// Submits a search task; the result arrives on the returned
    /// channel.
    pub fn start_thinking(&self, task: SearchTask) -> Receiver<SearchResult> {
        debug_assert!(
            !self.threads.is_empty(),
            "cannot start thinking: thread pool has been shut down"
        );

        let (result_sender, result_receiver) = std::sync::mpsc::channel();

        self.stop.store(Stop::Running as u8, Ordering::Release);
        *self.search_start.lock().unwrap() = Some(Instant::now());

        self.thinking.store(true, Ordering::Release);

        self.sender
            .send(Message::StartThinking(
                task,
                self.main().clone(),
                result_sender,
            ))
            .expect("failed to send search task: main thread receiver disconnected");

        result_receiver
    }

    pub fn main(&self) -> &Arc<Thread> {
        &self.threads[0]
    }

    fn notify_all(&self) {
        for thread in &self.threads {
            thread.notify_one();
        }
    }

    /// Blocks until the running search is done.
    pub fn wait_for_think_finished(&self) {
        const POLL_INTERVAL: Duration = Duration::from_millis(5);

        while self.thinking.load(Ordering::Acquire) {
            sleep(POLL_INTERVAL);
        }
    }

    /// Raises the stop flag with the given reason; never downgrades a
    /// stop back to `Running`.
    pub fn abort_search(&self, reason: Stop) {
        if reason == Stop::Running {
            return;
        }
        let _ = self.stop.compare_exchange(
            Stop::Running as u8,
            reason as u8,
            Ordering::AcqRel,
            Ordering::Relaxed,
        );
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.stop.load(Ordering::Acquire) != Stop::Running as u8
    }

    pub fn stop_reason(&self) -> Stop {
        Stop::from_u8(self.stop.load(Ordering::Acquire))
    }

    pub fn search_started(&self) -> Option<Instant> {
        *self.search_start.lock().unwrap()
    }

    /// Spawns the watchdog that fires `StopTimeout` at the manager's
    /// deadline. The deadline is re-read every tick so extensions are
    /// honored.
    pub fn start_timer(&self, time_manager: Arc<TimeManager>) {
        self.timer_stop.store(false, Ordering::Release);

        let stop = self.stop.clone();
        let stop_flag = self.timer_stop.clone();

        let handle = std::thread::Builder::new()
            .name("search-timer".to_string())
            .spawn(move || {
                Self::timer_loop(&time_manager, &stop, &stop_flag);
            })
            .expect("failed to spawn timer thread");

        *self.timer_handle.lock().unwrap() = Some(handle);
    }

    fn timer_loop(time_manager: &TimeManager, stop: &AtomicU8, stop_flag: &AtomicBool) {
        const CHECK_INTERVAL: Duration = Duration::from_millis(1);

        loop {
            if stop_flag.load(Ordering::Acquire) {
                return;
            }

            match time_manager.deadline() {
                Some(deadline) if Instant::now() >= deadline => {
                    let _ = stop.compare_exchange(
                        Stop::Running as u8,
                        Stop::StopTimeout as u8,
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    );
                    return;
                }
                Some(_) => {}
                None => return,
            }

            std::thread::sleep(CHECK_INTERVAL);
        }
    }

    /// Stops and joins the watchdog, if one is running.
    pub fn stop_timer(&self) {
        self.timer_stop.store(true, Ordering::Release);

        if let Some(handle) = self.timer_handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.exit();
    }
}
