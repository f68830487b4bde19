//! Position evaluation wrapper.
//!
//! The engine treats the evaluator as an opaque collaborator: it turns a
//! position into an integer score in disc-difference units. This wrapper
//! computes a small set of cheap board functionals and weighs them with
//! per-phase coefficients loaded from a versioned weight blob,
//! interpolating between the two phase buckets bracketing the current
//! ply. A direct-mapped cache memoises scores by position hash.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::bitboard;
use crate::board::Board;
use crate::constants::{SCORE_MAX, SCORE_MIN};
use crate::types::Score;

/// Magic identifier of a weight file.
pub const WEIGHT_MAGIC: [u8; 4] = *b"OWTS";

/// Supported weight-file format version.
pub const WEIGHT_VERSION: u8 = 1;

/// Number of board functionals fed to the weight vector.
pub const N_FEATURES: usize = 8;

/// Number of game phases; a phase spans four plies.
pub const N_PHASES: usize = 16;

const PLIES_PER_PHASE: usize = 4;

/// Weights are fixed-point with 7 fractional bits (1/128 disc).
const WEIGHT_SCALE_BITS: i32 = 7;

type PhaseWeights = [i16; N_FEATURES + 1];

#[derive(Debug)]
pub struct Eval {
    /// One weight row per phase, plus one padding row so interpolation
    /// never reads past the final phase.
    weights: Vec<PhaseWeights>,
    pub cache: EvalCache,
}

impl Eval {
    /// Loads weights from a blob: `OWTS`, version byte, phase count,
    /// feature count, then a zstd-compressed stream of little-endian
    /// `i16` rows (features + bias per phase).
    pub fn from_file(path: &Path) -> io::Result<Eval> {
        let mut file = File::open(path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if magic != WEIGHT_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "not an evaluation weight file (bad magic)",
            ));
        }

        let version = file.read_u8()?;
        if version != WEIGHT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported weight file version {version}"),
            ));
        }

        let n_phases = file.read_u8()? as usize;
        let n_features = file.read_u8()? as usize;
        if n_phases != N_PHASES || n_features != N_FEATURES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("weight file shape mismatch: {n_phases} phases, {n_features} features"),
            ));
        }

        let mut decoder = zstd::Decoder::new(file)?;
        let mut weights = Vec::with_capacity(N_PHASES + 1);
        for _ in 0..N_PHASES {
            let mut row: PhaseWeights = [0; N_FEATURES + 1];
            for w in row.iter_mut() {
                *w = decoder.read_i16::<LittleEndian>()?;
            }
            weights.push(row);
        }
        weights.push(weights[N_PHASES - 1]);

        Ok(Eval {
            weights,
            cache: EvalCache::new(17),
        })
    }

    /// Built-in deterministic weights, used when no file is supplied:
    /// mobility and frontier control fade over the game while the disc
    /// count takes over.
    pub fn uniform() -> Eval {
        let mut weights = Vec::with_capacity(N_PHASES + 1);
        for phase in 0..N_PHASES as i32 {
            let late = phase; // 0 at the opening, 15 before the endgame
            let early = N_PHASES as i32 - 1 - late;
            let mut row: PhaseWeights = [0; N_FEATURES + 1];
            let mobility = (90 * early + 25 * late) / (N_PHASES as i32 - 1);
            let potential = (30 * early + 5 * late) / (N_PHASES as i32 - 1);
            let corner = 300;
            let discs = (128 * late) / (N_PHASES as i32 - 1);
            row[0] = mobility as i16;
            row[1] = -mobility as i16;
            row[2] = potential as i16;
            row[3] = -potential as i16;
            row[4] = corner as i16;
            row[5] = -corner as i16;
            row[6] = discs as i16;
            row[7] = (10 * late / (N_PHASES as i32 - 1)) as i16;
            weights.push(row);
        }
        weights.push(weights[N_PHASES - 1]);

        Eval {
            weights,
            cache: EvalCache::new(17),
        }
    }

    /// Evaluates `board` at search ply `ply`, from the mover's point of
    /// view, in disc-difference units rounded to even.
    pub fn evaluate(&self, board: &Board, ply: usize) -> Score {
        let key = board.hash();
        if let Some(score) = self.cache.probe(key) {
            return score;
        }

        let score = self.evaluate_uncached(board, ply);
        self.cache.store(key, score);
        score
    }

    fn evaluate_uncached(&self, board: &Board, ply: usize) -> Score {
        let features = extract_features(board);

        let ply = ply.min(N_PHASES * PLIES_PER_PHASE - 1);
        let phase = ply / PLIES_PER_PHASE;
        let frac = (ply % PLIES_PER_PHASE) as i32;

        let lo = &self.weights[phase];
        let hi = &self.weights[phase + 1];

        let mut acc: i32 = 0;
        for i in 0..N_FEATURES {
            let w = lo[i] as i32 * (PLIES_PER_PHASE as i32 - frac) + hi[i] as i32 * frac;
            acc += w * features[i];
        }
        acc += lo[N_FEATURES] as i32 * (PLIES_PER_PHASE as i32 - frac)
            + hi[N_FEATURES] as i32 * frac;
        acc /= PLIES_PER_PHASE as i32;

        let score = (acc >> WEIGHT_SCALE_BITS).clamp(SCORE_MIN + 2, SCORE_MAX - 2);
        // Round toward zero to an even value, matching the parity of
        // final disc differences.
        score - score % 2
    }
}

/// The feature vector: mover/opponent mobility, potential mobility and
/// corner stability, disc difference, and empties parity.
#[inline]
fn extract_features(board: &Board) -> [i32; N_FEATURES] {
    let p_moves = bitboard::get_moves(board.player, board.opponent);
    let o_moves = bitboard::get_moves(board.opponent, board.player);
    [
        bitboard::corner_weighted_count(p_moves) as i32,
        bitboard::corner_weighted_count(o_moves) as i32,
        bitboard::corner_weighted_count(bitboard::get_potential_moves(
            board.player,
            board.opponent,
        )) as i32,
        bitboard::corner_weighted_count(bitboard::get_potential_moves(
            board.opponent,
            board.player,
        )) as i32,
        bitboard::get_corner_stability(board.player) as i32,
        bitboard::get_corner_stability(board.opponent) as i32,
        board.get_player_count() as i32 - board.get_opponent_count() as i32,
        (board.get_empty_count() & 1) as i32,
    ]
}

/// Direct-mapped score cache: 48 bits of key, 16 bits of score per slot.
#[derive(Debug)]
pub struct EvalCache {
    slots: Vec<AtomicU64>,
    mask: u64,
}

impl EvalCache {
    /// Creates a cache with `1 << log2_size` slots.
    pub fn new(log2_size: u32) -> EvalCache {
        let n = 1usize << log2_size;
        EvalCache {
            slots: (0..n).map(|_| AtomicU64::new(0)).collect(),
            mask: (n - 1) as u64,
        }
    }

    #[inline]
    pub fn probe(&self, key: u64) -> Option<Score> {
        let slot = &self.slots[(key & self.mask) as usize];
        let entry = slot.load(Ordering::Relaxed);
        if entry != 0 && (entry & !0xFFFF) == (key & !0xFFFF) {
            Some((entry as u16 as i16) as Score)
        } else {
            None
        }
    }

    #[inline]
    pub fn store(&self, key: u64, score: Score) {
        let entry = (key & !0xFFFF) | (score as i16 as u16 as u64);
        self.slots[(key & self.mask) as usize].store(entry, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        for slot in &self.slots {
            slot.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::Disc;
    use std::io::Write;

    #[test]
    fn test_uniform_eval_is_symmetric() {
        let eval = Eval::uniform();
        let board = Board::new();
        // The starting position is symmetric: near-zero evaluation.
        let score = eval.evaluate(&board, 0);
        assert!(score.abs() <= 2, "start position scored {score}");
    }

    #[test]
    fn test_eval_is_antisymmetric_late() {
        let eval = Eval::uniform();
        // Heavy material imbalance late in the game.
        let board = Board::from_string(
            "XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXOOOOOOOO----------------",
            Disc::Black,
        )
        .unwrap();
        let score = eval.evaluate(&board, 48);
        assert!(score > 0, "material lead scored {score}");
    }

    #[test]
    fn test_eval_in_range_and_even() {
        let eval = Eval::uniform();
        let mut board = Board::new();
        for ply in 0..20 {
            let score = eval.evaluate(&board, ply);
            assert!((SCORE_MIN..=SCORE_MAX).contains(&score));
            assert_eq!(score % 2, 0);
            match board.get_moves() {
                0 => break,
                moves => {
                    let sq = bitboard::BitboardIterator::new(moves).next().unwrap();
                    board = board.make_move(sq);
                }
            }
        }
    }

    #[test]
    fn test_eval_cache() {
        let cache = EvalCache::new(8);
        assert_eq!(cache.probe(0x1234567890ABCDEF), None);
        cache.store(0x1234567890ABCDEF, -42);
        assert_eq!(cache.probe(0x1234567890ABCDEF), Some(-42));

        cache.clear();
        assert_eq!(cache.probe(0x1234567890ABCDEF), None);
    }

    #[test]
    fn test_weight_file_round_trip() {
        let dir = std::env::temp_dir();
        let path = dir.join("othello_core_eval_test.owts");

        // Assemble a file holding the uniform weights.
        let uniform = Eval::uniform();
        let mut raw = Vec::new();
        for row in uniform.weights.iter().take(N_PHASES) {
            for w in row {
                raw.extend_from_slice(&w.to_le_bytes());
            }
        }
        let compressed = zstd::encode_all(&raw[..], 0).unwrap();

        let mut file = File::create(&path).unwrap();
        file.write_all(&WEIGHT_MAGIC).unwrap();
        file.write_all(&[WEIGHT_VERSION, N_PHASES as u8, N_FEATURES as u8])
            .unwrap();
        file.write_all(&compressed).unwrap();
        drop(file);

        let eval = Eval::from_file(&path).unwrap();
        let board = Board::new().make_move(crate::square::Square::D3);
        assert_eq!(
            eval.evaluate(&board, 1),
            uniform.evaluate(&board, 1),
            "loaded weights must reproduce the source evaluation"
        );

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_weight_file_bad_magic() {
        let dir = std::env::temp_dir();
        let path = dir.join("othello_core_eval_bad_magic.owts");
        std::fs::write(&path, b"NOPE....").unwrap();
        let err = Eval::from_file(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        std::fs::remove_file(&path).ok();
    }
}
