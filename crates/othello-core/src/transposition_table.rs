//! Shared transposition table.
//!
//! Entries hold the full board (two masks) for exact disambiguation, a
//! proven `[lower, upper]` score window, the two best replies, and a
//! packed draft `(depth, selectivity, cost, date)` acting as the
//! replacement key. Buckets are `N_WAY` consecutive entries; writes and
//! probe hits are serialised by a spin lock picked from a per-table lock
//! array by the hash code. Buckets never overlap, so two different locks
//! never guard the same entry.

use std::cell::UnsafeCell;
use std::mem;
use std::sync::atomic::{AtomicU8, Ordering};

use aligned_vec::{AVec, ConstAlign};
use lock_api::RawMutex;

use crate::board::Board;
use crate::constants::{SCORE_MAX, SCORE_MIN};
use crate::square::Square;
use crate::types::{Depth, Score, Selectivity};
use crate::util::spinlock::RawSpinLock;

/// Entries per bucket.
pub const N_WAY: usize = 4;

/// A generation distance beyond which an entry is stale and replaceable
/// regardless of its cost, unless its draft dominates the incoming one.
const AGE_LIMIT: u8 = 3;

/// The searchable payload of a table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashData {
    pub depth: u8,
    pub selectivity: Selectivity,
    pub cost: u8,
    pub date: u8,
    pub lower: i8,
    pub upper: i8,
    pub moves: [u8; 2],
}

impl HashData {
    const EMPTY: HashData = HashData {
        depth: 0,
        selectivity: 0,
        cost: 0,
        date: 0,
        lower: SCORE_MIN as i8,
        upper: SCORE_MAX as i8,
        moves: [Square::None as u8; 2],
    };

    /// Replacement key: higher is more valuable. Field order makes depth
    /// dominate, then selectivity, cost and recency.
    #[inline]
    pub fn draft(&self) -> u32 {
        ((self.depth as u32) << 24)
            | ((self.selectivity as u32) << 16)
            | ((self.cost as u32) << 8)
            | self.date as u32
    }

    #[inline]
    pub fn best_move(&self) -> Square {
        Square::from_u8_unchecked(self.moves[0])
    }

    #[inline]
    pub fn second_move(&self) -> Square {
        Square::from_u8_unchecked(self.moves[1])
    }

    #[inline]
    pub fn best_moves(&self) -> [Square; 2] {
        [self.best_move(), self.second_move()]
    }

    /// Whether the stored bounds prove a cutoff against the null window
    /// `(beta - 1, beta)`.
    #[inline]
    pub fn can_cut(&self, beta: Score) -> bool {
        (self.lower as Score) >= beta || (self.upper as Score) < beta
    }

    /// Applies the alpha-beta bound-recovery rule to fresh bounds.
    fn reset_bounds(&mut self, alpha: Score, beta: Score, score: Score) {
        if score >= beta {
            self.lower = score as i8;
            self.upper = SCORE_MAX as i8;
        } else if score <= alpha {
            self.lower = SCORE_MIN as i8;
            self.upper = score as i8;
        } else {
            self.lower = score as i8;
            self.upper = score as i8;
        }
    }

    /// Intersects the stored bounds with a result from the same draft.
    fn amend_bounds(&mut self, alpha: Score, beta: Score, score: Score) {
        if score >= beta {
            self.lower = self.lower.max(score as i8);
        } else if score <= alpha {
            self.upper = self.upper.min(score as i8);
        } else {
            self.lower = score as i8;
            self.upper = score as i8;
        }
    }

    /// Records `mv` as the best reply, demoting the previous best.
    fn record_move(&mut self, mv: Square) {
        if mv == Square::None {
            return;
        }
        if self.moves[0] != mv as u8 {
            self.moves[1] = self.moves[0];
            self.moves[0] = mv as u8;
        }
    }
}

struct HashEntry {
    board: Board,
    data: HashData,
}

impl HashEntry {
    const EMPTY: HashEntry = HashEntry {
        // An impossible position (overlapping masks) that can never be
        // probed, so empty entries never produce false hits.
        board: Board {
            player: u64::MAX,
            opponent: u64::MAX,
        },
        data: HashData::EMPTY,
    };
}

/// Parameters of one `store`, bundled to keep call sites readable.
#[derive(Clone, Copy)]
pub struct StoreRequest {
    pub depth: Depth,
    pub selectivity: Selectivity,
    pub cost: u8,
    pub alpha: Score,
    pub beta: Score,
    pub score: Score,
    pub best_move: Square,
}

pub struct TranspositionTable {
    entries: AVec<UnsafeCell<HashEntry>, ConstAlign<32>>,
    bucket_mask: u64,
    locks: Box<[RawSpinLock]>,
    lock_mask: u64,
    date: AtomicU8,
}

// Entries are only touched while holding the bucket's lock.
unsafe impl Sync for TranspositionTable {}
unsafe impl Send for TranspositionTable {}

impl TranspositionTable {
    /// Creates a table with `1 << log2_buckets` buckets of `N_WAY`
    /// entries and a lock array sized to `n_locks` (rounded up to a
    /// power of two).
    pub fn new(log2_buckets: u32, n_locks: usize) -> Self {
        let n_buckets = 1usize << log2_buckets;
        let n_locks = n_locks.max(1).next_power_of_two();

        TranspositionTable {
            entries: AVec::from_iter(
                32,
                (0..n_buckets * N_WAY).map(|_| UnsafeCell::new(HashEntry::EMPTY)),
            ),
            bucket_mask: (n_buckets - 1) as u64,
            locks: (0..n_locks).map(|_| RawSpinLock::INIT).collect(),
            lock_mask: (n_locks - 1) as u64,
            date: AtomicU8::new(1),
        }
    }

    /// Creates a table using roughly `mb_size` megabytes.
    pub fn with_capacity_mb(mb_size: usize) -> Self {
        let bucket_bytes = mem::size_of::<HashEntry>() * N_WAY;
        let budget = (mb_size.max(1) * 1024 * 1024) / bucket_bytes;
        let log2_buckets = budget.max(16).ilog2();
        Self::new(log2_buckets, num_cpus::get() * 4)
    }

    /// Number of entries.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Wipes every entry and resets the generation.
    pub fn clear(&self) {
        for entry in self.entries.iter() {
            unsafe { *entry.get() = HashEntry::EMPTY };
        }
        self.date.store(1, Ordering::Relaxed);
    }

    /// Current generation.
    #[inline]
    pub fn date(&self) -> u8 {
        self.date.load(Ordering::Relaxed)
    }

    /// Opens a new generation; wipes the table on date overflow.
    ///
    /// Must be called between searches, never concurrently with them.
    pub fn new_search(&self) {
        let date = self.date.load(Ordering::Relaxed);
        if date >= 127 {
            self.clear();
        } else {
            self.date.store(date + 1, Ordering::Relaxed);
        }
    }

    /// Prefetches the bucket of `hash` into cache.
    #[inline]
    pub fn prefetch(&self, hash: u64) {
        #[cfg(target_arch = "x86_64")]
        unsafe {
            let index = self.bucket_index(hash);
            let addr = self.entries.as_ptr().add(index) as *const i8;
            std::arch::x86_64::_mm_prefetch(addr, std::arch::x86_64::_MM_HINT_T0);
        }

        #[cfg(not(target_arch = "x86_64"))]
        {
            let _ = hash;
        }
    }

    /// Looks the position up. A hit requires a full board match; the
    /// entry's date is refreshed to the current generation.
    pub fn probe(&self, board: &Board) -> Option<HashData> {
        let hash = board.hash();
        let base = self.bucket_index(hash);
        let lock = self.lock(hash);

        lock.lock();
        let mut result = None;
        for i in 0..N_WAY {
            let entry = unsafe { &mut *self.entries[base + i].get() };
            if entry.board == *board && entry.data.date != 0 {
                entry.data.date = self.date();
                result = Some(entry.data);
                break;
            }
        }
        unsafe { lock.unlock() };
        result
    }

    /// Records a search result for the position.
    ///
    /// A matching entry is amended (same draft: bounds intersect) or
    /// reset (deeper draft). Otherwise the least valuable entry of the
    /// bucket is overwritten.
    pub fn store(&self, board: &Board, req: &StoreRequest) {
        let hash = board.hash();
        let base = self.bucket_index(hash);
        let lock = self.lock(hash);
        let date = self.date();

        lock.lock();

        // 1. same position already stored
        let mut stored = false;
        for i in 0..N_WAY {
            let entry = unsafe { &mut *self.entries[base + i].get() };
            if entry.board == *board && entry.data.date != 0 {
                Self::merge(&mut entry.data, req, date);
                stored = true;
                break;
            }
        }

        // 2. evict the smallest-draft entry
        if !stored {
            let mut victim = 0;
            let mut victim_draft = u32::MAX;
            for i in 0..N_WAY {
                let entry = unsafe { &*self.entries[base + i].get() };
                let draft = Self::replacement_draft(&entry.data, req, date);
                if draft < victim_draft {
                    victim_draft = draft;
                    victim = i;
                }
            }

            let entry = unsafe { &mut *self.entries[base + victim].get() };
            entry.board = *board;
            entry.data = HashData {
                depth: req.depth as u8,
                selectivity: req.selectivity,
                cost: req.cost,
                date,
                lower: SCORE_MIN as i8,
                upper: SCORE_MAX as i8,
                moves: [Square::None as u8; 2],
            };
            entry.data.reset_bounds(req.alpha, req.beta, req.score);
            entry.data.record_move(req.best_move);
        }

        unsafe { lock.unlock() };
    }

    /// Removes `mv` from the entry's reply slots and drops the proven
    /// lower bound, so a multi-PV root can search the remaining moves.
    pub fn exclude_move(&self, board: &Board, mv: Square) {
        let hash = board.hash();
        let base = self.bucket_index(hash);
        let lock = self.lock(hash);

        lock.lock();
        for i in 0..N_WAY {
            let entry = unsafe { &mut *self.entries[base + i].get() };
            if entry.board == *board && entry.data.date != 0 {
                if entry.data.moves[0] == mv as u8 {
                    entry.data.moves[0] = entry.data.moves[1];
                    entry.data.moves[1] = Square::None as u8;
                } else if entry.data.moves[1] == mv as u8 {
                    entry.data.moves[1] = Square::None as u8;
                }
                entry.data.lower = SCORE_MIN as i8;
                break;
            }
        }
        unsafe { lock.unlock() };
    }

    /// Merges a new result into an existing entry for the same position.
    fn merge(data: &mut HashData, req: &StoreRequest, date: u8) {
        let new_level = ((req.depth as u32) << 8) | req.selectivity as u32;
        let old_level = ((data.depth as u32) << 8) | data.selectivity as u32;

        if new_level > old_level {
            // Deeper or less selective search: previous bounds no longer
            // describe the same game tree.
            data.depth = req.depth as u8;
            data.selectivity = req.selectivity;
            data.reset_bounds(req.alpha, req.beta, req.score);
        } else if new_level == old_level {
            data.amend_bounds(req.alpha, req.beta, req.score);
        } else {
            // Shallower result: keep the stored bounds, refresh recency.
            data.date = date;
            return;
        }

        if req.score > req.alpha {
            data.record_move(req.best_move);
        }
        data.cost = data.cost.max(req.cost);
        data.date = date;
    }

    /// Draft used when choosing a victim: stale entries whose draft does
    /// not dominate the incoming one lose their standing entirely.
    fn replacement_draft(data: &HashData, req: &StoreRequest, date: u8) -> u32 {
        if data.date == 0 {
            return 0;
        }
        let age = date.wrapping_sub(data.date);
        let dominates =
            data.depth as u32 >= req.depth && data.selectivity >= req.selectivity;
        if age > AGE_LIMIT && !dominates {
            return 0;
        }
        data.draft()
    }

    #[inline]
    fn bucket_index(&self, hash: u64) -> usize {
        ((hash & self.bucket_mask) as usize) * N_WAY
    }

    #[inline]
    fn lock(&self, hash: u64) -> &RawSpinLock {
        &self.locks[((hash >> 32) & self.lock_mask) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::Disc;

    fn small_table() -> TranspositionTable {
        TranspositionTable::new(8, 4)
    }

    fn store_simple(tt: &TranspositionTable, board: &Board, depth: Depth, score: Score) {
        tt.store(
            board,
            &StoreRequest {
                depth,
                selectivity: 5,
                cost: 10,
                alpha: -10,
                beta: 10,
                score,
                best_move: Square::C4,
            },
        );
    }

    #[test]
    fn test_probe_miss_then_hit() {
        let tt = small_table();
        let board = Board::new();
        assert!(tt.probe(&board).is_none());

        store_simple(&tt, &board, 8, 4);
        let data = tt.probe(&board).expect("stored entry not found");
        assert_eq!(data.depth, 8);
        assert_eq!(data.lower, 4);
        assert_eq!(data.upper, 4);
        assert_eq!(data.best_move(), Square::C4);
    }

    #[test]
    fn test_full_board_compare_rejects_collisions() {
        let tt = small_table();
        let board = Board::new();
        store_simple(&tt, &board, 8, 4);
        assert!(tt.probe(&board.switch_players()).is_none());
    }

    #[test]
    fn test_bound_recovery_rules() {
        let tt = small_table();
        let board = Board::new();

        // fail high: lower = score, upper = SCORE_MAX
        tt.store(
            &board,
            &StoreRequest {
                depth: 6,
                selectivity: 5,
                cost: 5,
                alpha: -4,
                beta: 2,
                score: 6,
                best_move: Square::D3,
            },
        );
        let data = tt.probe(&board).unwrap();
        assert_eq!((data.lower, data.upper), (6, SCORE_MAX as i8));
        assert!(data.can_cut(2));
        assert!(!data.can_cut(10));
    }

    #[test]
    fn test_same_draft_intersects_bounds() {
        let tt = small_table();
        let board = Board::new();

        // First search fails high at beta = 2, second fails low at
        // alpha = 12: the window tightens to [6, 8].
        tt.store(
            &board,
            &StoreRequest {
                depth: 6,
                selectivity: 5,
                cost: 5,
                alpha: -4,
                beta: 2,
                score: 6,
                best_move: Square::D3,
            },
        );
        tt.store(
            &board,
            &StoreRequest {
                depth: 6,
                selectivity: 5,
                cost: 5,
                alpha: 12,
                beta: 20,
                score: 8,
                best_move: Square::None,
            },
        );
        let data = tt.probe(&board).unwrap();
        assert_eq!((data.lower, data.upper), (6, 8));
    }

    #[test]
    fn test_deeper_draft_resets_bounds() {
        let tt = small_table();
        let board = Board::new();
        store_simple(&tt, &board, 6, 2);
        tt.store(
            &board,
            &StoreRequest {
                depth: 10,
                selectivity: 5,
                cost: 12,
                alpha: -10,
                beta: 10,
                score: -2,
                best_move: Square::E6,
            },
        );
        let data = tt.probe(&board).unwrap();
        assert_eq!(data.depth, 10);
        assert_eq!((data.lower, data.upper), (-2, -2));
        assert_eq!(data.best_move(), Square::E6);
        // Previous best move is demoted, not lost.
        assert_eq!(data.second_move(), Square::C4);
    }

    #[test]
    fn test_shallower_result_keeps_entry() {
        let tt = small_table();
        let board = Board::new();
        store_simple(&tt, &board, 10, 4);
        store_simple(&tt, &board, 2, -30);
        let data = tt.probe(&board).unwrap();
        assert_eq!(data.depth, 10);
        assert_eq!(data.lower, 4);
    }

    #[test]
    fn test_exclude_move() {
        let tt = small_table();
        let board = Board::new();
        store_simple(&tt, &board, 8, 4);
        tt.exclude_move(&board, Square::C4);
        let data = tt.probe(&board).unwrap();
        assert_eq!(data.best_move(), Square::None);
        assert_eq!(data.lower, SCORE_MIN as i8);
    }

    #[test]
    fn test_date_wipe_on_overflow() {
        let tt = small_table();
        let board = Board::new();
        store_simple(&tt, &board, 8, 4);

        for _ in 0..126 {
            tt.new_search();
        }
        assert!(tt.date() >= 127);
        tt.new_search();
        assert_eq!(tt.date(), 1);
        assert!(tt.probe(&board).is_none());
    }

    #[test]
    fn test_eviction_prefers_smallest_draft() {
        let tt = TranspositionTable::new(0, 1); // one bucket of N_WAY entries
        let mut board = Board::new();
        let mut boards = Vec::new();

        // Fill the single bucket with distinct positions, rising depth.
        for depth in [4u32, 6, 8, 10, 12] {
            store_simple(&tt, &board, depth, 0);
            boards.push((board, depth));
            board = board.make_move(crate::bitboard::BitboardIterator::new(board.get_moves()).next().unwrap());
        }

        // The shallowest entry (depth 4) must have been evicted.
        assert!(tt.probe(&boards[0].0).is_none());
        for (b, _) in &boards[1..] {
            assert!(tt.probe(b).is_some(), "deeper entry was evicted");
        }
    }

    #[test]
    fn test_concurrent_store_probe_integrity() {
        use std::sync::Arc;

        let tt = Arc::new(TranspositionTable::new(4, 2));
        let mut handles = Vec::new();

        for t in 0..4u64 {
            let tt = tt.clone();
            handles.push(std::thread::spawn(move || {
                let mut board = Board::new();
                for i in 0..2000u64 {
                    let score = ((t + i) % 64) as Score - 32;
                    store_simple(&tt, &board, ((i % 20) + 1) as Depth, score);
                    if let Some(data) = tt.probe(&board) {
                        // Bounds stay ordered whatever the interleaving.
                        assert!(data.lower <= data.upper);
                    }
                    board = match board.get_moves() {
                        0 => Board::new(),
                        moves => {
                            let sq = crate::bitboard::BitboardIterator::new(moves).next().unwrap();
                            board.make_move(sq)
                        }
                    };
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_from_string_board_integration() {
        // Entries for distinct colors of the same layout do not alias.
        let tt = small_table();
        let b1 = Board::from_string(
            "---------------------------OX------XO---------------------------",
            Disc::Black,
        )
        .unwrap();
        let b2 = b1.switch_players();
        store_simple(&tt, &b1, 8, 10);
        store_simple(&tt, &b2, 8, -10);
        assert_eq!(tt.probe(&b1).unwrap().lower, 10);
        assert_eq!(tt.probe(&b2).unwrap().lower, -10);
    }
}
