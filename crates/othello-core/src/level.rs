//! Skill levels and their search depth configuration.

use crate::probcut::NO_SELECTIVITY;
use crate::types::{Depth, Selectivity};

/// One skill level: a midgame depth plus the deepest endgame (empties
/// count) solvable at each selectivity.
///
/// `end_depth[0]` is the most selective tier (73% confidence) and
/// `end_depth[NO_SELECTIVITY]` the exact one. Stronger levels solve
/// exactly at more empties and probe more selectively further out.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Level {
    pub mid_depth: Depth,
    pub end_depth: [Depth; NO_SELECTIVITY as usize + 1],
}

impl Level {
    /// Endgame depth reachable at `selectivity`.
    #[inline]
    pub fn get_end_depth(&self, selectivity: Selectivity) -> Depth {
        self.end_depth[selectivity as usize]
    }

    /// A level that solves any position exactly.
    pub fn perfect() -> Level {
        LEVELS[60]
    }
}

/// Maps a skill level (0..=60) to its search configuration.
///
/// # Panics
///
/// Panics if `lv > 60`.
pub fn get_level(lv: usize) -> Level {
    if lv >= LEVELS.len() {
        panic!("invalid level: {lv}. valid range is 0 to {}", LEVELS.len() - 1);
    }
    LEVELS[lv]
}

/// The level table. Levels 1-10 search `2 * level` empties exactly;
/// from 11 on, the probabilistic tiers reach a handful of plies past
/// the exact horizon, and from 48 the whole game is in exact reach.
#[rustfmt::skip]
const LEVELS: [Level; 61] = [
    Level { mid_depth:  0, end_depth: [  0,  0,  0,  0,  0,  0] },
    Level { mid_depth:  1, end_depth: [  2,  2,  2,  2,  2,  2] },
    Level { mid_depth:  2, end_depth: [  4,  4,  4,  4,  4,  4] },
    Level { mid_depth:  3, end_depth: [  6,  6,  6,  6,  6,  6] },
    Level { mid_depth:  4, end_depth: [  8,  8,  8,  8,  8,  8] },
    Level { mid_depth:  5, end_depth: [ 10, 10, 10, 10, 10, 10] },
    Level { mid_depth:  6, end_depth: [ 12, 12, 12, 12, 12, 12] },
    Level { mid_depth:  7, end_depth: [ 14, 14, 14, 14, 14, 14] },
    Level { mid_depth:  8, end_depth: [ 16, 16, 16, 16, 16, 16] },
    Level { mid_depth:  9, end_depth: [ 18, 18, 18, 18, 18, 18] },
    Level { mid_depth: 10, end_depth: [ 20, 20, 20, 20, 20, 20] },
    Level { mid_depth: 11, end_depth: [ 23, 23, 22, 22, 21, 21] },
    Level { mid_depth: 12, end_depth: [ 24, 24, 23, 23, 22, 22] },
    Level { mid_depth: 13, end_depth: [ 25, 24, 24, 23, 23, 22] },
    Level { mid_depth: 14, end_depth: [ 25, 25, 24, 24, 23, 23] },
    Level { mid_depth: 15, end_depth: [ 26, 26, 25, 25, 24, 24] },
    Level { mid_depth: 16, end_depth: [ 27, 26, 26, 25, 25, 24] },
    Level { mid_depth: 17, end_depth: [ 28, 27, 27, 26, 26, 25] },
    Level { mid_depth: 18, end_depth: [ 29, 28, 28, 27, 27, 26] },
    Level { mid_depth: 19, end_depth: [ 29, 28, 28, 27, 27, 26] },
    Level { mid_depth: 20, end_depth: [ 30, 29, 29, 28, 28, 27] },
    Level { mid_depth: 21, end_depth: [ 31, 30, 30, 29, 29, 28] },
    Level { mid_depth: 22, end_depth: [ 32, 31, 30, 30, 29, 28] },
    Level { mid_depth: 23, end_depth: [ 33, 32, 31, 31, 30, 29] },
    Level { mid_depth: 24, end_depth: [ 33, 32, 32, 31, 31, 30] },
    Level { mid_depth: 25, end_depth: [ 34, 33, 32, 32, 31, 30] },
    Level { mid_depth: 26, end_depth: [ 35, 34, 33, 33, 32, 31] },
    Level { mid_depth: 27, end_depth: [ 36, 35, 34, 34, 33, 32] },
    Level { mid_depth: 28, end_depth: [ 37, 36, 35, 34, 33, 32] },
    Level { mid_depth: 29, end_depth: [ 37, 36, 35, 35, 34, 33] },
    Level { mid_depth: 30, end_depth: [ 38, 37, 36, 36, 35, 34] },
    Level { mid_depth: 31, end_depth: [ 39, 38, 37, 36, 35, 34] },
    Level { mid_depth: 32, end_depth: [ 40, 39, 38, 37, 36, 35] },
    Level { mid_depth: 33, end_depth: [ 41, 40, 39, 38, 37, 36] },
    Level { mid_depth: 34, end_depth: [ 42, 41, 40, 38, 37, 36] },
    Level { mid_depth: 35, end_depth: [ 42, 41, 40, 39, 38, 37] },
    Level { mid_depth: 36, end_depth: [ 43, 42, 41, 40, 39, 38] },
    Level { mid_depth: 37, end_depth: [ 44, 43, 42, 40, 39, 38] },
    Level { mid_depth: 38, end_depth: [ 45, 44, 43, 41, 40, 39] },
    Level { mid_depth: 39, end_depth: [ 46, 45, 44, 42, 41, 40] },
    Level { mid_depth: 40, end_depth: [ 46, 45, 44, 42, 41, 40] },
    Level { mid_depth: 41, end_depth: [ 47, 46, 45, 43, 42, 41] },
    Level { mid_depth: 42, end_depth: [ 48, 47, 46, 44, 43, 42] },
    Level { mid_depth: 43, end_depth: [ 49, 48, 46, 45, 43, 42] },
    Level { mid_depth: 44, end_depth: [ 50, 49, 47, 46, 44, 43] },
    Level { mid_depth: 45, end_depth: [ 50, 49, 48, 46, 45, 44] },
    Level { mid_depth: 46, end_depth: [ 51, 50, 48, 47, 45, 44] },
    Level { mid_depth: 47, end_depth: [ 52, 51, 49, 48, 46, 45] },
    Level { mid_depth: 48, end_depth: [ 48, 48, 48, 48, 48, 48] },
    Level { mid_depth: 49, end_depth: [ 49, 49, 49, 49, 49, 49] },
    Level { mid_depth: 50, end_depth: [ 50, 50, 50, 50, 50, 50] },
    Level { mid_depth: 51, end_depth: [ 51, 51, 51, 51, 51, 51] },
    Level { mid_depth: 52, end_depth: [ 52, 52, 52, 52, 52, 52] },
    Level { mid_depth: 53, end_depth: [ 53, 53, 53, 53, 53, 53] },
    Level { mid_depth: 54, end_depth: [ 54, 54, 54, 54, 54, 54] },
    Level { mid_depth: 55, end_depth: [ 55, 55, 55, 55, 55, 55] },
    Level { mid_depth: 56, end_depth: [ 56, 56, 56, 56, 56, 56] },
    Level { mid_depth: 57, end_depth: [ 57, 57, 57, 57, 57, 57] },
    Level { mid_depth: 58, end_depth: [ 58, 58, 58, 58, 58, 58] },
    Level { mid_depth: 59, end_depth: [ 59, 59, 59, 59, 59, 59] },
    Level { mid_depth: 60, end_depth: [ 60, 60, 60, 60, 60, 60] },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_level_whole_range() {
        for (i, &expected) in LEVELS.iter().enumerate() {
            assert_eq!(get_level(i), expected);
        }
    }

    #[test]
    #[should_panic]
    fn test_get_level_out_of_range() {
        get_level(61);
    }

    #[test]
    fn test_exact_depth_is_monotone() {
        for i in 0..60 {
            assert!(
                get_level(i + 1).get_end_depth(NO_SELECTIVITY)
                    >= get_level(i).get_end_depth(NO_SELECTIVITY),
                "exact depth regresses at level {}",
                i + 1
            );
        }
    }

    #[test]
    fn test_selective_depth_dominates_exact() {
        for i in 0..=60 {
            let level = get_level(i);
            for s in 0..NO_SELECTIVITY {
                assert!(level.get_end_depth(s) >= level.get_end_depth(NO_SELECTIVITY));
            }
        }
    }

    #[test]
    fn test_perfect_solves_everything() {
        assert_eq!(Level::perfect().get_end_depth(NO_SELECTIVITY), 60);
    }
}
