//! Time management for timed games.
//!
//! A move's budget is split into three thresholds: `mini` (keep
//! iterating below it), `maxi` (stop after finishing an iteration past
//! `mini`), and `extra` (the watchdog hard-stops here). An unstable PV
//! may raise `mini` to `maxi` once per move.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::types::{Depth, Score, Scoref};

/// Fixed overhead subtracted from each move budget, in milliseconds.
const TIME_OVERHEAD_MS: u64 = 10;

/// Smallest useful per-move budget.
const MIN_MOVE_TIME_MS: u64 = 100;

/// Depth from which PV changes are meaningful enough to extend time.
const MIN_EXTENSION_DEPTH: Depth = 10;

/// Score drop (discs) between iterations that triggers an extension.
const SCORE_DROP_THRESHOLD: Score = 3;

/// Budget assigned to one search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeControl {
    /// Search until depth or an explicit stop.
    #[default]
    Infinite,

    /// Fixed budget for this single move.
    MoveTime { budget_ms: u64 },

    /// Budget for the rest of the game; the manager allots a slice for
    /// this move.
    GameTime { remaining_ms: u64 },
}

/// Deepest endgame (empties) that a given budget can usually solve
/// exactly. Log-linear in the budget; used to estimate how many plies
/// the midgame must cover.
fn solvable_depth(budget_ms: u64) -> u32 {
    const STEPS: [(u64, u32); 7] = [
        (100, 18),
        (1_000, 21),
        (10_000, 24),
        (60_000, 26),
        (300_000, 28),
        (1_800_000, 30),
        (u64::MAX, 32),
    ];
    for (limit, depth) in STEPS {
        if budget_ms <= limit {
            return depth;
        }
    }
    32
}

pub struct TimeManager {
    mode: TimeControl,
    start: Instant,
    mini_ms: AtomicU64,
    maxi_ms: AtomicU64,
    extra_ms: AtomicU64,
    /// Set once the single allowed extension is spent.
    extended: AtomicBool,
    prev_score: Mutex<Option<Scoref>>,
}

impl TimeManager {
    /// Creates a manager and starts its clock.
    pub fn new(mode: TimeControl, n_empties: u32) -> Self {
        let (mini, maxi, extra) = Self::allot(mode, n_empties);

        TimeManager {
            mode,
            start: Instant::now(),
            mini_ms: AtomicU64::new(mini),
            maxi_ms: AtomicU64::new(maxi),
            extra_ms: AtomicU64::new(extra),
            extended: AtomicBool::new(false),
            prev_score: Mutex::new(None),
        }
    }

    /// Computes `(mini, maxi, extra)` for a mode.
    fn allot(mode: TimeControl, n_empties: u32) -> (u64, u64, u64) {
        match mode {
            TimeControl::Infinite => (u64::MAX, u64::MAX, u64::MAX),

            TimeControl::MoveTime { budget_ms } => {
                let t = budget_ms.max(1);
                (t * 9 / 10, t * 99 / 100, t)
            }

            TimeControl::GameTime { remaining_ms } => {
                // Plies the midgame must still carry before the endgame
                // solver takes over, assuming a tenth of the budget per
                // unsolved move pair.
                let solvable = solvable_depth(remaining_ms / 10);
                let unsolvable_plies = (n_empties.saturating_sub(solvable) / 2).max(2) as u64;
                let t = (remaining_ms / unsolvable_plies)
                    .saturating_sub(TIME_OVERHEAD_MS)
                    .max(MIN_MOVE_TIME_MS);
                (t / 4, t * 3 / 4, t)
            }
        }
    }

    #[inline]
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Whether another iteration should start: spent time must still be
    /// below `mini`.
    pub fn should_continue_iteration(&self) -> bool {
        if self.mode == TimeControl::Infinite {
            return true;
        }
        self.elapsed_ms() <= self.mini_ms.load(Ordering::Relaxed)
    }

    /// Whether the hard limit has been reached.
    #[inline]
    pub fn is_time_up(&self) -> bool {
        self.mode != TimeControl::Infinite
            && self.elapsed_ms() >= self.extra_ms.load(Ordering::Relaxed)
    }

    /// The watchdog deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        if self.mode == TimeControl::Infinite {
            None
        } else {
            Some(self.start + Duration::from_millis(self.extra_ms.load(Ordering::Relaxed)))
        }
    }

    /// Reports an iteration result; grants the one-shot extension when
    /// the score dropped or the PV flipped at meaningful depth.
    ///
    /// Returns whether the extension was applied.
    pub fn try_extend(&self, score: Scoref, pv_changed: bool, depth: Depth) -> bool {
        let prev = {
            let mut guard = self.prev_score.lock().unwrap();
            let prev = *guard;
            *guard = Some(score);
            prev
        };

        if self.mode == TimeControl::Infinite || self.extended.load(Ordering::Relaxed) {
            return false;
        }

        let score_dropped =
            prev.is_some_and(|p| score < p - SCORE_DROP_THRESHOLD as Scoref);
        let unstable = score_dropped || (pv_changed && depth >= MIN_EXTENSION_DEPTH);
        if !unstable {
            return false;
        }

        // Keep iterating until the previous stop point: mini rises to
        // maxi (never past extra).
        let maxi = self.maxi_ms.load(Ordering::Relaxed);
        let extra = self.extra_ms.load(Ordering::Relaxed);
        self.mini_ms.store(maxi.min(extra), Ordering::Relaxed);
        self.extended.store(true, Ordering::Relaxed);
        true
    }

    pub fn mode(&self) -> TimeControl {
        self.mode
    }

    pub fn mini_ms(&self) -> u64 {
        self.mini_ms.load(Ordering::Relaxed)
    }

    pub fn maxi_ms(&self) -> u64 {
        self.maxi_ms.load(Ordering::Relaxed)
    }

    pub fn extra_ms(&self) -> u64 {
        self.extra_ms.load(Ordering::Relaxed)
    }
}

/// Whether the iterative-deepening loop should stop after the iteration
/// that just finished.
pub fn should_stop_iteration(time_manager: &Option<std::sync::Arc<TimeManager>>) -> bool {
    match time_manager {
        Some(tm) => !tm.should_continue_iteration(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infinite_never_stops() {
        let tm = TimeManager::new(TimeControl::Infinite, 40);
        assert!(tm.should_continue_iteration());
        assert!(!tm.is_time_up());
        assert!(tm.deadline().is_none());
    }

    #[test]
    fn test_move_time_split() {
        let tm = TimeManager::new(TimeControl::MoveTime { budget_ms: 1000 }, 40);
        assert_eq!(tm.mini_ms(), 900);
        assert_eq!(tm.maxi_ms(), 990);
        assert_eq!(tm.extra_ms(), 1000);
        assert!(tm.deadline().is_some());
    }

    #[test]
    fn test_game_time_split() {
        let tm = TimeManager::new(TimeControl::GameTime { remaining_ms: 60_000 }, 40);
        let t = tm.extra_ms();
        assert!(t >= MIN_MOVE_TIME_MS);
        assert!(t < 60_000);
        assert_eq!(tm.mini_ms(), t / 4);
        assert_eq!(tm.maxi_ms(), t * 3 / 4);
    }

    #[test]
    fn test_game_time_minimum_budget() {
        let tm = TimeManager::new(TimeControl::GameTime { remaining_ms: 50 }, 55);
        assert_eq!(tm.extra_ms(), MIN_MOVE_TIME_MS);
    }

    #[test]
    fn test_extension_is_one_shot() {
        let tm = TimeManager::new(TimeControl::MoveTime { budget_ms: 1000 }, 40);

        // A stable result never extends.
        assert!(!tm.try_extend(2.0, false, 20));

        // A score drop extends once.
        assert!(tm.try_extend(-6.0, false, 20));
        assert_eq!(tm.mini_ms(), tm.maxi_ms());

        // Further instability cannot extend again.
        assert!(!tm.try_extend(-20.0, true, 20));
    }

    #[test]
    fn test_pv_change_needs_depth() {
        let tm = TimeManager::new(TimeControl::MoveTime { budget_ms: 1000 }, 40);
        assert!(!tm.try_extend(0.0, true, MIN_EXTENSION_DEPTH - 1));
        assert!(tm.try_extend(0.0, true, MIN_EXTENSION_DEPTH));
    }

    #[test]
    fn test_solvable_depth_monotone() {
        let mut last = 0;
        for ms in [50, 500, 5_000, 50_000, 500_000, 5_000_000] {
            let d = solvable_depth(ms);
            assert!(d >= last);
            last = d;
        }
    }
}
