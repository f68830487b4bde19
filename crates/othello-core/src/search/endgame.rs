//! Exact endgame solving.
//!
//! The solver is a chain of per-empties specializations: a general PVS
//! with transposition table, ETC and parallel splitting down to 14
//! empties; a leaner null-window search to 8; a parity-ordered shallow
//! search over the empty list to 5; and branch-free leaves for the last
//! four squares.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::bitboard;
use crate::board::Board;
use crate::constants::{SCORE_INF, SCORE_MAX, SCORE_MIN};
use crate::count_last_flip::count_last_flip;
use crate::move_list::{ConcurrentMoveIterator, MoveList};
use crate::probcut::{self, NO_SELECTIVITY};
use crate::search::midgame;
use crate::search::node_type::{NodeType, NonPV, PV, Root};
use crate::search::root_move::RootMoves;
use crate::search::search_context::SearchContext;
use crate::search::search_result::SearchResult;
use crate::search::threading::{SplitPoint, Thread};
use crate::search::{SearchTask, enhanced_transposition_cutoff, search_cost};
use crate::square::Square;
use crate::stability;
use crate::transposition_table::StoreRequest;
use crate::types::{Depth, Score, Scoref};

/// Mask of the squares belonging to the quadrants selected by a parity
/// nibble. Odd-parity quadrants are searched first at low empties.
#[rustfmt::skip]
const QUADRANT_MASK: [u64; 16] = [
    0x0000000000000000, 0x000000000F0F0F0F, 0x00000000F0F0F0F0, 0x00000000FFFFFFFF,
    0x0F0F0F0F00000000, 0x0F0F0F0F0F0F0F0F, 0x0F0F0F0FF0F0F0F0, 0x0F0F0F0FFFFFFFFF,
    0xF0F0F0F000000000, 0xF0F0F0F00F0F0F0F, 0xF0F0F0F0F0F0F0F0, 0xF0F0F0F0FFFFFFFF,
    0xFFFFFFFF00000000, 0xFFFFFFFF0F0F0F0F, 0xFFFFFFFFF0F0F0F0, 0xFFFFFFFFFFFFFFFF,
];

/// Empties bound of the parity-ordered shallow search.
const DEPTH_TO_SHALLOW: Depth = 7;

/// Empties bound of the dedicated null-window endgame search.
const DEPTH_TO_NWS: Depth = 13;

/// Minimum empties before an endgame node may be split.
const MIN_SPLIT_DEPTH: Depth = 9;

/// Root driver for exact endgame solving.
///
/// Runs the selectivity ladder: each enabled tier re-searches the
/// position with less pruning, ending at the exact tier, each centering
/// its aspiration window on the previous result.
pub fn search_root(task: SearchTask, thread: &Arc<Thread>) -> SearchResult {
    let board = task.board;
    let level = task.level;

    let root_moves = RootMoves::new(&board);
    let mut ctx = SearchContext::new(
        &board,
        task.selectivity,
        task.tt.clone(),
        task.pv_table.clone(),
        task.shallow_table.clone(),
        root_moves.clone(),
        task.eval.clone(),
    );
    if let Some(ref callback) = task.callback {
        ctx.set_callback(callback.clone());
    }

    let n_empties = ctx.empty_list.count;
    let center = estimate_aspiration_center(&mut ctx, &board, n_empties, thread);

    let pv_count = if task.multi_pv {
        root_moves.count()
    } else {
        1
    };

    let mut best_score: Score = center;
    let mut reached_selectivity = task.selectivity;

    for pv_idx in 0..pv_count {
        root_moves.set_pv_idx(pv_idx);
        root_moves.new_iteration();

        let (mut alpha, mut beta) = if pv_idx == 0 {
            (
                (center - 3).max(-SCORE_INF),
                (center + 3).min(SCORE_INF),
            )
        } else {
            // Later lines cannot beat the lines before them.
            (-SCORE_INF, best_score.min(SCORE_MAX))
        };

        for selectivity in task.selectivity..=NO_SELECTIVITY {
            if level.get_end_depth(selectivity) < n_empties {
                continue;
            }

            ctx.selectivity = selectivity;
            let mut delta = 2;

            loop {
                best_score = search::<Root, false>(&mut ctx, &board, alpha, beta, thread, None);

                if thread.is_search_aborted() {
                    break;
                }

                if best_score <= alpha {
                    beta = alpha;
                    alpha = (best_score - delta).max(-SCORE_INF);
                } else if best_score >= beta {
                    alpha = (beta - delta).max(alpha);
                    beta = (best_score + delta).min(SCORE_INF);
                } else {
                    break;
                }

                delta += delta;
            }

            root_moves.sort_from_pv_idx();
            reached_selectivity = selectivity;

            alpha = (best_score - 2).max(-SCORE_INF);
            beta = (best_score + 2).min(SCORE_INF);

            if let Some(rm) = root_moves.get_current_pv() {
                ctx.notify_progress(
                    n_empties,
                    best_score as Scoref,
                    rm.sq,
                    selectivity,
                    rm.pv.clone(),
                );
            }

            if thread.is_search_aborted() {
                break;
            }
        }

        if thread.is_search_aborted() {
            break;
        }

        // Multi-PV: force later lines to look past this one's move.
        if task.multi_pv
            && let Some(rm) = root_moves.get_current_pv()
        {
            ctx.tt.exclude_move(&board, rm.sq);
            ctx.pv_table.exclude_move(&board, rm.sq);
        }
    }

    root_moves.set_pv_idx(0);
    root_moves.sort_all();
    let best = root_moves.get_best().unwrap();
    SearchResult::from_root_moves(
        &root_moves,
        &best,
        ctx.n_nodes,
        n_empties,
        reached_selectivity,
    )
}

/// Estimates a score to center the endgame aspiration window on, from
/// the transposition table or a midgame probe of roughly half depth.
fn estimate_aspiration_center(
    ctx: &mut SearchContext,
    board: &Board,
    n_empties: u32,
    thread: &Arc<Thread>,
) -> Score {
    let midgame_depth = n_empties / 2;

    if let Some(data) = ctx.tt.probe(board)
        && data.lower == data.upper
        && data.depth as Depth >= midgame_depth
    {
        return data.lower as Score;
    }

    if n_empties >= 22 {
        let saved = ctx.selectivity;
        ctx.selectivity = 0;
        let score =
            midgame::search::<PV>(ctx, board, midgame_depth, -SCORE_INF, SCORE_INF, thread);
        ctx.selectivity = saved;
        score
    } else if n_empties >= 12 {
        midgame::evaluate_depth2(ctx, board, -SCORE_INF, SCORE_INF)
    } else {
        midgame::evaluate(ctx, board)
    }
}

/// Principal variation search over endgame nodes. The depth is implied
/// by the empties count.
///
/// `SP_NODE` marks re-entry at a split point, where the window and move
/// iterator live in the split-point state.
pub fn search<NT: NodeType, const SP_NODE: bool>(
    ctx: &mut SearchContext,
    board: &Board,
    mut alpha: Score,
    beta: Score,
    thread: &Arc<Thread>,
    split_point: Option<&Arc<SplitPoint>>,
) -> Score {
    let org_alpha = alpha;
    let n_empties = ctx.empty_list.count;
    let mut best_move = Square::None;
    let mut best_score = -SCORE_INF;
    let move_iter: Arc<ConcurrentMoveIterator>;
    let nodes_org = ctx.n_nodes;

    if SP_NODE {
        let sp_state = split_point.as_ref().unwrap().state();
        best_move = sp_state.best_move();
        best_score = sp_state.best_score();
        move_iter = sp_state.move_iter.clone().unwrap();
    } else {
        if NT::PV_NODE {
            if n_empties == 0 {
                return calculate_final_score(board);
            }
        } else {
            if n_empties <= DEPTH_TO_NWS {
                return null_window_search(ctx, board, alpha);
            }

            if let Some(score) = stability::stability_cutoff(board, n_empties, alpha) {
                return score;
            }
        }

        ctx.tt.prefetch(board.hash());

        let mut move_list = MoveList::new(board);
        if move_list.count() == 0 {
            let next = board.switch_players();
            if next.has_legal_moves() {
                ctx.update_pass();
                let score = -search::<NT, false>(ctx, &next, -beta, -alpha, thread, None);
                ctx.undo_pass();
                if NT::PV_NODE {
                    ctx.prepend_pass_to_pv();
                }
                return score;
            } else {
                if NT::PV_NODE {
                    ctx.clear_pv();
                }
                return solve(board, n_empties);
            }
        } else if let Some(sq) = move_list.wipeout_move {
            if NT::ROOT_NODE {
                ctx.set_single_pv(sq);
                let pv = *ctx.get_pv();
                ctx.root_moves.update(sq, SCORE_MAX, 1, alpha, beta, &pv);
            } else if NT::PV_NODE {
                ctx.set_single_pv(sq);
            }
            return SCORE_MAX;
        }

        let tt_data = if NT::PV_NODE {
            ctx.pv_table.probe(board).or_else(|| ctx.tt.probe(board))
        } else {
            ctx.tt.probe(board)
        };
        let tt_moves = tt_data.map_or([Square::None; 2], |d| d.best_moves());

        if !NT::PV_NODE {
            if let Some(data) = tt_data
                && data.depth as Depth >= n_empties
                && data.selectivity >= ctx.selectivity
            {
                if data.lower as Score >= beta {
                    return data.lower as Score;
                }
                if (data.upper as Score) <= alpha {
                    return data.upper as Score;
                }
            }

            if let Some(score) =
                enhanced_transposition_cutoff(ctx, board, &move_list, n_empties, alpha)
            {
                return score;
            }

            if let Some(score) =
                probcut::probcut_endgame(ctx, board, n_empties, alpha, beta, thread)
            {
                return score;
            }
        }

        if NT::ROOT_NODE {
            for sq in ctx.root_moves.excluded_squares() {
                move_list.remove(sq);
            }
        }

        if move_list.count() > 1 {
            move_list.evaluate_moves(ctx, board, n_empties, tt_moves);
            move_list.sort();
        }

        move_iter = Arc::new(ConcurrentMoveIterator::new(move_list));
    }

    if SP_NODE {
        split_point.as_ref().unwrap().lock();
    }
    while let Some((mv, move_count)) = move_iter.next() {
        if SP_NODE {
            split_point.as_ref().unwrap().unlock();
        }

        let next = board.make_move_with_flipped(mv.flipped, mv.sq);
        ctx.update(mv.sq);

        let mut score = -SCORE_INF;
        if !NT::PV_NODE || move_count > 1 {
            if SP_NODE {
                alpha = split_point.as_ref().unwrap().state().alpha();
            }
            score = -search::<NonPV, false>(ctx, &next, -(alpha + 1), -alpha, thread, None);
        }

        if NT::PV_NODE && (move_count == 1 || score > alpha) {
            ctx.clear_pv();
            if SP_NODE {
                alpha = split_point.as_ref().unwrap().state().alpha();
            }
            score = -search::<PV, false>(ctx, &next, -beta, -alpha, thread, None);
        }

        ctx.undo(mv.sq);

        if SP_NODE {
            let sp = split_point.as_ref().unwrap();
            sp.lock();
            let sp_state = sp.state();
            best_score = sp_state.best_score();
            alpha = sp_state.alpha();
        }

        if thread.is_search_aborted() || thread.cutoff_occurred() {
            if SP_NODE {
                break;
            }
            return 0;
        }

        if NT::ROOT_NODE {
            ctx.update_root_move(mv.sq, score, move_count, alpha, beta);
        }

        if score > best_score {
            best_score = score;
            if SP_NODE {
                split_point.as_ref().unwrap().state().set_best_score(score);
            }

            if score > alpha {
                best_move = mv.sq;
                if SP_NODE {
                    split_point.as_ref().unwrap().state().set_best_move(mv.sq);
                }

                if NT::PV_NODE && !NT::ROOT_NODE {
                    ctx.update_pv(mv.sq);
                    if SP_NODE {
                        let sp = split_point.as_ref().unwrap();
                        sp.state_mut().copy_pv(ctx.get_pv());
                    }
                }

                if NT::PV_NODE && score < beta {
                    alpha = score;
                    if SP_NODE {
                        split_point.as_ref().unwrap().state().set_alpha(score);
                    }
                } else {
                    if SP_NODE {
                        split_point.as_ref().unwrap().state().set_cutoff(true);
                    }
                    break;
                }
            }
        }

        if !SP_NODE
            && n_empties >= MIN_SPLIT_DEPTH
            && move_iter.count() > 1
            && thread.can_split()
        {
            let (s, m, n) = thread.split(
                ctx,
                board,
                alpha,
                beta,
                best_score,
                best_move,
                n_empties,
                &move_iter,
                NT::TYPE_ID,
                true,
            );
            best_score = s;
            best_move = m;
            ctx.n_nodes += n;

            if thread.is_search_aborted() || thread.cutoff_occurred() {
                return 0;
            }

            if best_score >= beta {
                break;
            }
        }
    }

    if SP_NODE {
        let sp = split_point.as_ref().unwrap();
        let score = sp.state().best_score();
        sp.unlock();
        return score;
    }

    let req = StoreRequest {
        depth: n_empties,
        selectivity: ctx.selectivity,
        cost: search_cost(ctx.n_nodes - nodes_org),
        alpha: org_alpha,
        beta,
        score: best_score,
        best_move,
    };
    ctx.tt.store(board, &req);
    if NT::PV_NODE {
        ctx.pv_table.store(board, &req);
    }

    best_score
}

/// Split-point re-entry used by helper threads.
pub fn search_sp<NT: NodeType>(
    ctx: &mut SearchContext,
    board: &Board,
    thread: &Arc<Thread>,
    split_point: &Arc<SplitPoint>,
) -> Score {
    let beta = split_point.state().beta;
    let alpha = split_point.state().alpha();
    search::<NT, true>(ctx, board, alpha, beta, thread, Some(split_point))
}

/// Null-window endgame search for 8 to 13 empties: stability cutoff,
/// transposition table, statically ordered moves.
pub fn null_window_search(ctx: &mut SearchContext, board: &Board, alpha: Score) -> Score {
    let n_empties = ctx.empty_list.count;
    let beta = alpha + 1;

    ctx.tt.prefetch(board.hash());

    if let Some(score) = stability::stability_cutoff(board, n_empties, alpha) {
        return score;
    }

    let mut move_list = MoveList::new(board);
    if move_list.wipeout_move.is_some() {
        return SCORE_MAX;
    } else if move_list.count() == 0 {
        let next = board.switch_players();
        if next.has_legal_moves() {
            ctx.update_pass();
            let score = -null_window_search(ctx, &next, -beta);
            ctx.undo_pass();
            return score;
        } else {
            return solve(board, n_empties);
        }
    }

    let tt_data = ctx.tt.probe(board);
    let tt_moves = tt_data.map_or([Square::None; 2], |d| d.best_moves());

    if let Some(data) = tt_data
        && data.depth as Depth >= n_empties
        && data.selectivity >= ctx.selectivity
    {
        if data.lower as Score >= beta {
            return data.lower as Score;
        }
        if (data.upper as Score) <= alpha {
            return data.upper as Score;
        }
    }

    let nodes_org = ctx.n_nodes;
    let mut best_score = -SCORE_INF;
    let mut best_move = Square::None;

    move_list.evaluate_moves_fast(ctx, board, tt_moves);
    for mv in move_list.best_first_iter() {
        let next = board.make_move_with_flipped(mv.flipped, mv.sq);

        ctx.update(mv.sq);
        let score = if ctx.empty_list.count <= DEPTH_TO_SHALLOW {
            -shallow_search(ctx, &next, -beta)
        } else {
            -null_window_search(ctx, &next, -beta)
        };
        ctx.undo(mv.sq);

        if score > best_score {
            best_move = mv.sq;
            best_score = score;
            if score >= beta {
                break;
            }
        }
    }

    ctx.tt.store(
        board,
        &StoreRequest {
            depth: n_empties,
            selectivity: NO_SELECTIVITY,
            cost: search_cost(ctx.n_nodes - nodes_org),
            alpha,
            beta,
            score: best_score,
            best_move,
        },
    );

    best_score
}

/// Parity-ordered search for 5 to 7 empties: no move list and no table,
/// just the empty list walked odd-parity quadrants first.
fn shallow_search(ctx: &mut SearchContext, board: &Board, alpha: Score) -> Score {
    let n_empties = ctx.empty_list.count;
    let beta = alpha + 1;

    fn search_child(ctx: &mut SearchContext, next: &Board, beta: Score) -> Score {
        if ctx.empty_list.count == 4 {
            if let Some(score) = stability::stability_cutoff(next, 4, -beta) {
                -score
            } else {
                let (sq1, sq2, sq3, sq4) = sort_empties_at_4(ctx);
                -solve4(ctx, next, -beta, sq1, sq2, sq3, sq4)
            }
        } else {
            -shallow_search(ctx, next, -beta)
        }
    }

    let mut moves = board.get_moves();
    if moves == 0 {
        let next = board.switch_players();
        if next.has_legal_moves() {
            ctx.update_pass();
            let score = -shallow_search(ctx, &next, -beta);
            ctx.undo_pass();
            return score;
        } else {
            return solve(board, n_empties);
        }
    }

    if let Some(score) = stability::stability_cutoff(board, n_empties, alpha) {
        return score;
    }

    let mut best_score = -SCORE_INF;

    let mut priority_moves = moves & QUADRANT_MASK[ctx.empty_list.parity as usize];
    if priority_moves == 0 {
        priority_moves = moves;
    }

    loop {
        moves ^= priority_moves;
        let mut sq = ctx.empty_list.first();
        loop {
            while !bitboard::is_set(priority_moves, sq) {
                sq = ctx.empty_list.next(sq);
            }

            priority_moves &= !sq.bitboard();
            let next = board.make_move(sq);

            ctx.update(sq);
            let score = search_child(ctx, &next, beta);
            ctx.undo(sq);

            if score > best_score {
                if score >= beta {
                    return score;
                }
                best_score = score;
            }

            if priority_moves == 0 {
                break;
            }
        }

        priority_moves = moves;
        if priority_moves == 0 {
            break;
        }
    }

    best_score
}

/// Orders the last four empties so that odd-parity quadrants come
/// first, preserving list order inside each class.
#[inline(always)]
fn sort_empties_at_4(ctx: &SearchContext) -> (Square, Square, Square, Square) {
    let (sq1, quad1) = ctx.empty_list.first_with_quadrant();
    let (sq2, quad2) = ctx.empty_list.next_with_quadrant(sq1);
    let (sq3, quad3) = ctx.empty_list.next_with_quadrant(sq2);
    let sq4 = ctx.empty_list.next(sq3);
    let parity = ctx.empty_list.parity;

    if parity & quad1 == 0 {
        if parity & quad2 != 0 {
            if parity & quad3 != 0 {
                (sq2, sq3, sq1, sq4)
            } else {
                (sq2, sq4, sq1, sq3)
            }
        } else if parity & quad3 != 0 {
            (sq3, sq4, sq1, sq2)
        } else {
            (sq1, sq2, sq3, sq4)
        }
    } else if parity & quad2 == 0 {
        if parity & quad3 != 0 {
            (sq1, sq3, sq2, sq4)
        } else {
            (sq1, sq4, sq2, sq3)
        }
    } else {
        (sq1, sq2, sq3, sq4)
    }
}

/// Exact solver for four empties: try each square, recurse into the
/// three-empties solver.
fn solve4(
    ctx: &mut SearchContext,
    board: &Board,
    alpha: Score,
    sq1: Square,
    sq2: Square,
    sq3: Square,
    sq4: Square,
) -> Score {
    let beta = alpha + 1;
    let mut best_score = -SCORE_INF;

    if let Some(next) = board.try_make_move(sq1) {
        best_score = -solve3(ctx, &next, -beta, sq2, sq3, sq4);
        if best_score > alpha {
            return best_score;
        }
    }

    if let Some(next) = board.try_make_move(sq2) {
        let score = -solve3(ctx, &next, -beta, sq1, sq3, sq4);
        if score > alpha {
            return score;
        }
        best_score = score.max(best_score);
    }

    if let Some(next) = board.try_make_move(sq3) {
        let score = -solve3(ctx, &next, -beta, sq1, sq2, sq4);
        if score > alpha {
            return score;
        }
        best_score = score.max(best_score);
    }

    if let Some(next) = board.try_make_move(sq4) {
        let score = -solve3(ctx, &next, -beta, sq1, sq2, sq3);
        return score.max(best_score);
    }

    if best_score == -SCORE_INF {
        let pass = board.switch_players();
        if pass.has_legal_moves() {
            best_score = -solve4(ctx, &pass, -beta, sq1, sq2, sq3, sq4);
        } else {
            best_score = solve(board, 4);
        }
    }

    best_score
}

/// Exact solver for three empties. Passing is folded in: when the mover
/// has no move the roles flip and the bound comparisons invert.
fn solve3(
    ctx: &mut SearchContext,
    board: &Board,
    alpha: Score,
    sq1: Square,
    sq2: Square,
    sq3: Square,
) -> Score {
    ctx.increment_nodes();
    let beta = alpha + 1;
    let mut best_score = -SCORE_INF;

    // mover plays
    if let Some(next) = board.try_make_move(sq1) {
        best_score = -solve2(ctx, &next, -beta, sq2, sq3);
        if best_score > alpha {
            return best_score;
        }
    }

    if let Some(next) = board.try_make_move(sq2) {
        let score = -solve2(ctx, &next, -beta, sq1, sq3);
        if score > alpha {
            return score;
        }
        best_score = score.max(best_score);
    }

    if let Some(next) = board.try_make_move(sq3) {
        let score = -solve2(ctx, &next, -beta, sq1, sq2);
        return score.max(best_score);
    }

    if best_score != -SCORE_INF {
        return best_score;
    }

    // mover passes
    ctx.increment_nodes();
    best_score = SCORE_INF;
    let pass = board.switch_players();

    if let Some(next) = pass.try_make_move(sq1) {
        best_score = solve2(ctx, &next, alpha, sq2, sq3);
        if best_score <= alpha {
            return best_score;
        }
    }

    if let Some(next) = pass.try_make_move(sq2) {
        let score = solve2(ctx, &next, alpha, sq1, sq3);
        if score <= alpha {
            return score;
        }
        best_score = score.min(best_score);
    }

    if let Some(next) = pass.try_make_move(sq3) {
        let score = solve2(ctx, &next, alpha, sq1, sq2);
        return score.min(best_score);
    }

    if best_score != SCORE_INF {
        return best_score;
    }

    // both pass
    solve(board, 3)
}

/// Exact solver for two empties.
#[inline(always)]
fn solve2(ctx: &mut SearchContext, board: &Board, alpha: Score, sq1: Square, sq2: Square) -> Score {
    ctx.increment_nodes();
    let beta = alpha + 1;

    // mover plays
    if let Some(next) = board.try_make_move(sq1) {
        let best_score = -solve1(ctx, &next, -beta, sq2);
        if best_score > alpha {
            return best_score;
        }
        if let Some(next) = board.try_make_move(sq2) {
            let score = -solve1(ctx, &next, -beta, sq1);
            return score.max(best_score);
        } else {
            return best_score;
        }
    } else if let Some(next) = board.try_make_move(sq2) {
        return -solve1(ctx, &next, -beta, sq1);
    }

    // mover passes
    ctx.increment_nodes();
    let pass = board.switch_players();
    if let Some(next) = pass.try_make_move(sq1) {
        let best_score = solve1(ctx, &next, alpha, sq2);
        if best_score <= alpha {
            return best_score;
        }
        if let Some(next) = pass.try_make_move(sq2) {
            let score = solve1(ctx, &next, alpha, sq1);
            return score.min(best_score);
        } else {
            return best_score;
        }
    } else if let Some(next) = pass.try_make_move(sq2) {
        return solve1(ctx, &next, alpha, sq1);
    }

    // both pass
    solve(board, 2)
}

/// Exact solver for the final empty square, built on the doubled
/// last-flip count. Handles the mover pass and the dead square.
#[inline(always)]
fn solve1(ctx: &mut SearchContext, board: &Board, alpha: Score, sq: Square) -> Score {
    ctx.increment_nodes();
    let mut score = board.get_player_count() as Score * 2 - 64 + 2;
    let mut n_flipped = count_last_flip(board.player, sq);
    score += n_flipped;

    if n_flipped == 0 {
        // The mover cannot play the last square.
        let score_after_pass = score - 2;
        if score <= 0 {
            score = score_after_pass;
        }

        if score > alpha {
            n_flipped = count_last_flip(board.opponent, sq);
            if n_flipped != 0 {
                score = score_after_pass - n_flipped;
            }
        }
    }

    score
}

/// Final score when neither side can move: the winner is credited with
/// the remaining empties.
#[inline(always)]
pub fn solve(board: &Board, n_empties: u32) -> Score {
    let score = board.get_player_count() as Score * 2 - 64;
    let diff = score + n_empties as Score;

    match diff.cmp(&0) {
        Ordering::Equal => diff,
        Ordering::Greater => diff + n_empties as Score,
        Ordering::Less => score,
    }
}

/// Disc difference of a completely filled board.
#[inline(always)]
pub fn calculate_final_score(board: &Board) -> Score {
    board.get_player_count() as Score * 2 - 64
}
