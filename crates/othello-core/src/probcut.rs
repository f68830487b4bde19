//! Selective forward pruning (ProbCut) and the selectivity table.
//!
//! A reduced-depth null-window search predicts the outcome of the deep
//! search; when the shallow result clears beta by a margin of `t * sigma`
//! the node is cut with the confidence attached to the selectivity
//! level. Level 5 (`NO_SELECTIVITY`) disables pruning entirely.

use std::sync::Arc;

use crate::board::Board;
use crate::constants::{SCORE_MAX, SCORE_MIN};
use crate::search::midgame;
use crate::search::search_context::SearchContext;
use crate::search::threading::Thread;
use crate::types::{Depth, Score, Selectivity};

/// The exact selectivity level: no forward pruning.
pub const NO_SELECTIVITY: Selectivity = 5;

/// `(t, confidence%)` per selectivity level. The `t` factor scales the
/// error margin of the reduced search; infinity means never cut.
const SELECTIVITY_TABLE: [(f64, i32); NO_SELECTIVITY as usize + 1] = [
    (1.1, 73),
    (1.5, 87),
    (2.0, 95),
    (2.6, 98),
    (3.3, 99),
    (f64::INFINITY, 100),
];

/// Confidence percentage of a selectivity level.
#[inline]
pub fn get_probability(selectivity: Selectivity) -> i32 {
    SELECTIVITY_TABLE[selectivity as usize].1
}

#[inline]
fn get_t(selectivity: Selectivity) -> f64 {
    SELECTIVITY_TABLE[selectivity as usize].0
}

/// Depth of the reduced search: about half the deep depth, preserving
/// its parity so both searches see the same side at the horizon.
#[inline]
fn probcut_depth(depth: Depth) -> Depth {
    let mut pc_depth = 2 * (depth / 4) + (depth & 1);
    if pc_depth == 0 {
        pc_depth = depth - 2;
    }
    pc_depth
}

/// Expected error (one standard deviation, in discs) between a search at
/// `shallow` and one at `deep` plies, from ply `ply`. The coefficients
/// were fitted offline on self-play positions and kept conservative.
fn error_sigma(ply: usize, shallow: Depth, deep: Depth) -> f64 {
    let gap = (deep - shallow) as f64;
    let remaining = (60 - ply.min(60)) as f64;
    1.2 + 0.26 * gap + 0.013 * remaining
}

/// Attempts a ProbCut at a midgame node searched with window
/// `(beta - 1, beta)`. Returns the forced bound on success.
pub fn probcut_midgame(
    ctx: &mut SearchContext,
    board: &Board,
    depth: Depth,
    alpha: Score,
    beta: Score,
    thread: &Arc<Thread>,
) -> Option<Score> {
    if ctx.selectivity < NO_SELECTIVITY {
        return probcut(ctx, board, depth, alpha, beta, thread);
    }
    None
}

/// Attempts a ProbCut at an endgame node; worthwhile only when the
/// remaining solve is still deep.
pub fn probcut_endgame(
    ctx: &mut SearchContext,
    board: &Board,
    n_empties: Depth,
    alpha: Score,
    beta: Score,
    thread: &Arc<Thread>,
) -> Option<Score> {
    if n_empties >= 10 && ctx.selectivity < NO_SELECTIVITY {
        return probcut(ctx, board, n_empties, alpha, beta, thread);
    }
    None
}

fn probcut(
    ctx: &mut SearchContext,
    board: &Board,
    depth: Depth,
    alpha: Score,
    beta: Score,
    thread: &Arc<Thread>,
) -> Option<Score> {
    let ply = ctx.ply();
    let pc_depth = probcut_depth(depth);
    let sigma = error_sigma(ply, pc_depth, depth);
    let eval_sigma = error_sigma(ply, 0, depth);
    let t = get_t(ctx.selectivity);
    let saved_selectivity = ctx.selectivity;

    let eval_score = midgame::evaluate(ctx, board);

    // Fail-high attempt: the static eval must already clear a raised
    // beta before the reduced search is paid for.
    let pc_beta = (beta as f64 + t * sigma).ceil() as Score;
    let eval_beta = (beta as f64 - t * eval_sigma).floor() as Score;
    if pc_beta < SCORE_MAX && eval_score >= eval_beta {
        ctx.selectivity = NO_SELECTIVITY; // no nested probcut
        let score = midgame::search::<crate::search::node_type::NonPV>(
            ctx,
            board,
            pc_depth,
            pc_beta - 1,
            pc_beta,
            thread,
        );
        ctx.selectivity = saved_selectivity;
        if score >= pc_beta {
            return Some(beta);
        }
    }

    // Fail-low attempt, mirrored.
    let pc_alpha = (alpha as f64 - t * sigma).floor() as Score;
    let eval_alpha = (alpha as f64 + t * eval_sigma).ceil() as Score;
    if pc_alpha > SCORE_MIN && eval_score < eval_alpha {
        ctx.selectivity = NO_SELECTIVITY;
        let score = midgame::search::<crate::search::node_type::NonPV>(
            ctx,
            board,
            pc_depth,
            pc_alpha,
            pc_alpha + 1,
            thread,
        );
        ctx.selectivity = saved_selectivity;
        if score <= pc_alpha {
            return Some(alpha);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectivity_table_shape() {
        assert_eq!(get_probability(NO_SELECTIVITY), 100);
        assert_eq!(get_probability(0), 73);
        for s in 0..NO_SELECTIVITY {
            assert!(get_t(s) < get_t(s + 1));
            assert!(get_probability(s) < get_probability(s + 1));
        }
    }

    #[test]
    fn test_probcut_depth_parity() {
        for depth in 3..=40 {
            let pc = probcut_depth(depth);
            assert!(pc < depth);
            assert_eq!(pc & 1, depth & 1, "parity mismatch at depth {depth}");
        }
    }

    #[test]
    fn test_sigma_grows_with_gap() {
        let near = error_sigma(30, 8, 10);
        let far = error_sigma(30, 2, 10);
        assert!(far > near);
        assert!(near > 0.0);
    }
}
