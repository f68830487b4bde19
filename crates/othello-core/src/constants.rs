//! Global constants

use crate::types::Score;

/// Maximum number of plies in a game plus the search stack slack.
pub const MAX_PLY: usize = 64;

/// Maximum possible score (all 64 discs).
pub const SCORE_MAX: Score = 64;

/// Minimum possible score.
pub const SCORE_MIN: Score = -64;

/// Infinity score for search windows; fits in an `i8` when stored.
pub const SCORE_INF: Score = 127;
