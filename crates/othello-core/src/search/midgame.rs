//! Midgame search: iterative deepening, aspiration windows, PVS.

use std::sync::Arc;

use rand::seq::IteratorRandom;

use crate::bitboard::BitboardIterator;
use crate::board::Board;
use crate::constants::{SCORE_INF, SCORE_MAX, SCORE_MIN};
use crate::flip;
use crate::move_list::{ConcurrentMoveIterator, MoveList};
use crate::probcut;
use crate::search::endgame;
use crate::search::node_type::{NodeType, NonPV, PV, Root};
use crate::search::root_move::RootMoves;
use crate::search::search_context::SearchContext;
use crate::search::search_result::SearchResult;
use crate::search::threading::{SplitPoint, Thread};
use crate::search::time_control::should_stop_iteration;
use crate::search::{SearchTask, enhanced_transposition_cutoff, search_cost};
use crate::square::Square;
use crate::stability;
use crate::transposition_table::StoreRequest;
use crate::types::{Depth, Score, Scoref};

/// Minimum depth before a node may be split for parallel search.
const MIN_SPLIT_DEPTH: Depth = 5;

/// Minimum depth for the enhanced transposition cutoff.
const MIN_ETC_DEPTH: Depth = 6;

/// Minimum depth for ProbCut.
const MIN_PROBCUT_DEPTH: Depth = 3;

/// Initial half-width of the aspiration window, in discs.
const ASPIRATION_DELTA: Score = 3;

/// Iterative-deepening driver for midgame positions.
pub fn search_root(task: SearchTask, thread: &Arc<Thread>) -> SearchResult {
    let board = task.board;
    let time_manager = task.time_manager.clone();

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

    // Nothing distinguishes the four opening moves; pick one at random.
    if n_empties == 60 && !task.multi_pv {
        return SearchResult::new_instant_move(random_move(&board), false);
    }

    let pv_count = if task.multi_pv {
        root_moves.count()
    } else {
        1
    };
    let max_depth = task.level.mid_depth.max(1).min(n_empties);

    let mut prev_best: Option<Square> = None;
    let mut depth = compute_start_depth(max_depth);
    let mut completed_depth = 0;

    loop {
        root_moves.new_iteration();

        for pv_idx in 0..pv_count {
            root_moves.set_pv_idx(pv_idx);

            // Center the window on this line's previous score.
            let (alpha, beta) = root_moves
                .get_current_pv()
                .filter(|rm| depth >= 5 && rm.previous_score != -SCORE_INF)
                .map(|rm| {
                    (
                        (rm.previous_score - ASPIRATION_DELTA).max(-SCORE_INF),
                        (rm.previous_score + ASPIRATION_DELTA).min(SCORE_INF),
                    )
                })
                .unwrap_or((-SCORE_INF, SCORE_INF));

            let score = aspiration_search(&mut ctx, &board, depth, alpha, beta, thread);

            root_moves.sort_from_pv_idx();

            if thread.is_search_aborted() {
                break;
            }

            if let Some(rm) = root_moves.get_current_pv() {
                ctx.notify_progress(
                    depth,
                    score as Scoref,
                    rm.sq,
                    ctx.selectivity,
                    rm.pv.clone(),
                );
            }
        }

        root_moves.set_pv_idx(0);
        root_moves.sort_all();
        let best = root_moves.get_best().unwrap();

        let aborted = thread.is_search_aborted();
        if !aborted {
            completed_depth = depth;
        }

        if let Some(ref tm) = time_manager {
            let pv_changed = prev_best.is_some_and(|sq| sq != best.sq);
            tm.try_extend(best.score as Scoref, pv_changed, depth);
        }
        prev_best = Some(best.sq);

        if aborted || should_stop_iteration(&time_manager) || depth >= max_depth {
            return SearchResult::from_root_moves(
                &root_moves,
                &best,
                ctx.n_nodes,
                completed_depth.max(1),
                ctx.selectivity,
            );
        }

        // Two-ply steps while shallow keep the horizon parity stable.
        depth = if depth <= 10 {
            (depth + 2).min(max_depth)
        } else {
            depth + 1
        };
    }
}

/// Starting depth matching the parity of the target depth.
fn compute_start_depth(max_depth: Depth) -> Depth {
    let start = if max_depth.is_multiple_of(2) { 2 } else { 1 };
    start.min(max_depth)
}

/// Repeats the root search, widening the window around the result until
/// the score fits inside it.
fn aspiration_search(
    ctx: &mut SearchContext,
    board: &Board,
    depth: Depth,
    mut alpha: Score,
    mut beta: Score,
    thread: &Arc<Thread>,
) -> Score {
    let mut delta = ASPIRATION_DELTA;

    loop {
        let score = search::<Root>(ctx, board, depth, alpha, beta, thread);

        if thread.is_search_aborted() {
            return score;
        }

        if score <= alpha {
            beta = alpha;
            alpha = (score - delta).max(-SCORE_INF);
        } else if score >= beta {
            alpha = (beta - delta).max(alpha);
            beta = (score + delta).min(SCORE_INF);
        } else {
            return score;
        }

        delta += delta / 2;
    }
}

/// Picks a random legal move (used only at the opening position).
fn random_move(board: &Board) -> Square {
    let mut rng = rand::rng();
    BitboardIterator::new(board.get_moves())
        .choose(&mut rng)
        .unwrap()
}

/// Principal variation search over midgame nodes.
///
/// Dispatches to depth-specialized leaves near the horizon and to the
/// endgame solver once the remaining depth covers the empties.
pub fn search<NT: NodeType>(
    ctx: &mut SearchContext,
    board: &Board,
    depth: Depth,
    mut alpha: Score,
    beta: Score,
    thread: &Arc<Thread>,
) -> Score {
    let org_alpha = alpha;
    let n_empties = ctx.empty_list.count;

    // The window would see past the end of the game: resolve exactly.
    if depth >= n_empties {
        let a = alpha.clamp(SCORE_MIN - 1, SCORE_MAX);
        let b = beta.clamp(a + 1, SCORE_MAX + 1);
        return endgame::search::<NT, false>(ctx, board, a, b, thread, None);
    }

    if NT::PV_NODE {
        if depth == 0 {
            // The line ends here; drop leftovers from sibling subtrees.
            ctx.clear_pv();
            return evaluate(ctx, board);
        }
    } else {
        match depth {
            0 => return evaluate(ctx, board),
            1 => return evaluate_depth1(ctx, board, alpha, beta),
            2 => return evaluate_depth2(ctx, board, alpha, beta),
            _ => {}
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
            let score = -search::<NT>(ctx, &next, depth, -beta, -alpha, thread);
            ctx.undo_pass();
            if NT::PV_NODE {
                ctx.prepend_pass_to_pv();
            }
            return score;
        } else {
            if NT::PV_NODE {
                ctx.clear_pv();
            }
            return endgame::solve(board, n_empties);
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

    // Probe the PV table first at PV nodes so lines survive iterations.
    let tt_data = if NT::PV_NODE {
        ctx.pv_table.probe(board).or_else(|| ctx.tt.probe(board))
    } else {
        ctx.tt.probe(board)
    };
    let tt_moves = tt_data.map_or([Square::None; 2], |d| d.best_moves());

    if !NT::PV_NODE {
        if let Some(data) = tt_data
            && data.depth as Depth >= depth
            && data.selectivity >= ctx.selectivity
        {
            if data.lower as Score >= beta {
                return data.lower as Score;
            }
            if (data.upper as Score) <= alpha {
                return data.upper as Score;
            }
        }

        if depth >= MIN_ETC_DEPTH
            && let Some(score) =
                enhanced_transposition_cutoff(ctx, board, &move_list, depth, alpha)
        {
            return score;
        }

        if depth >= MIN_PROBCUT_DEPTH
            && let Some(score) = probcut::probcut_midgame(ctx, board, depth, alpha, beta, thread)
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
        move_list.evaluate_moves(ctx, board, depth, tt_moves);
        move_list.sort();
    }

    let nodes_org = ctx.n_nodes;
    let move_iter = Arc::new(ConcurrentMoveIterator::new(move_list));
    let mut best_move = Square::None;
    let mut best_score = -SCORE_INF;

    while let Some((mv, move_count)) = move_iter.next() {
        let next = board.make_move_with_flipped(mv.flipped, mv.sq);
        ctx.update(mv.sq);

        let mut score = -SCORE_INF;
        if !NT::PV_NODE || move_count > 1 {
            score = -search::<NonPV>(ctx, &next, depth - 1, -(alpha + 1), -alpha, thread);
        }

        if NT::PV_NODE && (move_count == 1 || score > alpha) {
            ctx.clear_pv();
            score = -search::<PV>(ctx, &next, depth - 1, -beta, -alpha, thread);
        }

        ctx.undo(mv.sq);

        if thread.is_search_aborted() || thread.cutoff_occurred() {
            return 0;
        }

        if NT::ROOT_NODE {
            ctx.update_root_move(mv.sq, score, move_count, alpha, beta);
        }

        if score > best_score {
            best_score = score;

            if score > alpha {
                best_move = mv.sq;

                if NT::PV_NODE && !NT::ROOT_NODE {
                    ctx.update_pv(mv.sq);
                }

                if NT::PV_NODE && score < beta {
                    alpha = score;
                } else {
                    break;
                }
            }
        }

        if depth >= MIN_SPLIT_DEPTH && move_iter.count() > 1 && thread.can_split() {
            let (s, m, n) = thread.split(
                ctx,
                board,
                alpha,
                beta,
                best_score,
                best_move,
                depth,
                &move_iter,
                NT::TYPE_ID,
                false,
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

    let req = StoreRequest {
        depth,
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

/// Split-point side of [`search`]: helpers pull moves from the shared
/// iterator and publish results into the split-point state.
pub fn search_sp<NT: NodeType>(
    ctx: &mut SearchContext,
    board: &Board,
    depth: Depth,
    thread: &Arc<Thread>,
    split_point: &Arc<SplitPoint>,
) -> Score {
    let beta = split_point.state().beta;
    let move_iter = split_point.state().move_iter.clone().unwrap();

    split_point.lock();
    while let Some((mv, move_count)) = move_iter.next() {
        split_point.unlock();

        let next = board.make_move_with_flipped(mv.flipped, mv.sq);
        ctx.update(mv.sq);

        let alpha = split_point.state().alpha();
        let mut score = -SCORE_INF;
        if !NT::PV_NODE || move_count > 1 {
            score = -search::<NonPV>(ctx, &next, depth - 1, -(alpha + 1), -alpha, thread);
        }

        if NT::PV_NODE && score > alpha {
            ctx.clear_pv();
            let alpha = split_point.state().alpha();
            score = -search::<PV>(ctx, &next, depth - 1, -beta, -alpha, thread);
        }

        ctx.undo(mv.sq);

        split_point.lock();

        if thread.is_search_aborted() || thread.cutoff_occurred() {
            break;
        }

        let sp = split_point.state();

        if NT::ROOT_NODE {
            ctx.update_root_move(mv.sq, score, move_count, sp.alpha(), beta);
        }

        if score > sp.best_score() {
            sp.set_best_score(score);

            if score > sp.alpha() {
                sp.set_best_move(mv.sq);

                if NT::PV_NODE && !NT::ROOT_NODE {
                    ctx.update_pv(mv.sq);
                    split_point.state_mut().copy_pv(ctx.get_pv());
                }

                if NT::PV_NODE && score < beta {
                    sp.set_alpha(score);
                } else {
                    sp.set_cutoff(true);
                    break;
                }
            }
        }
    }
    split_point.unlock();

    split_point.state().best_score()
}

/// Two-ply specialization: move ordering is worth it here, recursion
/// into depth-1 is not.
pub fn evaluate_depth2(
    ctx: &mut SearchContext,
    board: &Board,
    mut alpha: Score,
    beta: Score,
) -> Score {
    let mut move_list = MoveList::new(board);
    if move_list.count() == 0 {
        let next = board.switch_players();
        if next.has_legal_moves() {
            ctx.update_pass();
            let score = -evaluate_depth2(ctx, &next, -beta, -alpha);
            ctx.undo_pass();
            return score;
        } else {
            return endgame::solve(board, ctx.empty_list.count);
        }
    }

    let mut best_score = -SCORE_INF;
    if move_list.count() >= 3 {
        move_list.evaluate_moves_fast(ctx, board, [Square::None; 2]);
        for mv in move_list.best_first_iter() {
            let next = board.make_move_with_flipped(mv.flipped, mv.sq);

            ctx.update(mv.sq);
            let score = -evaluate_depth1(ctx, &next, -beta, -alpha);
            ctx.undo(mv.sq);

            if score > best_score {
                best_score = score;
                if score >= beta {
                    break;
                }
                if score > alpha {
                    alpha = score;
                }
            }
        }
    } else {
        for mv in move_list.iter() {
            let next = board.make_move_with_flipped(mv.flipped, mv.sq);

            ctx.update(mv.sq);
            let score = -evaluate_depth1(ctx, &next, -beta, -alpha);
            ctx.undo(mv.sq);

            if score > best_score {
                best_score = score;
                if score >= beta {
                    break;
                }
                if score > alpha {
                    alpha = score;
                }
            }
        }
    }

    best_score
}

/// One-ply specialization.
pub fn evaluate_depth1(
    ctx: &mut SearchContext,
    board: &Board,
    alpha: Score,
    beta: Score,
) -> Score {
    let moves = board.get_moves();
    if moves == 0 {
        let next = board.switch_players();
        if next.has_legal_moves() {
            ctx.update_pass();
            let score = -evaluate_depth1(ctx, &next, -beta, -alpha);
            ctx.undo_pass();
            return score;
        } else {
            return endgame::solve(board, ctx.empty_list.count);
        }
    }

    let mut best_score = -SCORE_INF;
    for sq in BitboardIterator::new(moves) {
        let flipped = flip::flip(sq, board.player, board.opponent);
        if flipped == board.opponent {
            return SCORE_MAX;
        }
        let next = board.make_move_with_flipped(flipped, sq);

        ctx.update(sq);
        let score = -evaluate(ctx, &next);
        ctx.undo(sq);

        if score > best_score {
            best_score = score;
            if score >= beta {
                break;
            }
        }
    }

    best_score
}

/// Static evaluation of a leaf; a filled board scores exactly.
#[inline(always)]
pub fn evaluate(ctx: &SearchContext, board: &Board) -> Score {
    if ctx.empty_list.count == 0 {
        return endgame::calculate_final_score(board);
    }

    ctx.eval.evaluate(board, ctx.ply())
}

/// Fixed-depth full-window scout used by move ordering. Depths past the
/// specialized leaves run a plain alpha-beta backed by the shallow
/// table, so ordering searches do not pollute the main table.
pub fn shallow_search(ctx: &mut SearchContext, board: &Board, depth: Depth) -> Score {
    match depth {
        0 => evaluate(ctx, board),
        1 => evaluate_depth1(ctx, board, -SCORE_INF, SCORE_INF),
        2 => evaluate_depth2(ctx, board, -SCORE_INF, SCORE_INF),
        _ => shallow_alphabeta(ctx, board, depth, -SCORE_INF, SCORE_INF),
    }
}

fn shallow_alphabeta(
    ctx: &mut SearchContext,
    board: &Board,
    depth: Depth,
    mut alpha: Score,
    beta: Score,
) -> Score {
    let org_alpha = alpha;

    let mut move_list = MoveList::new(board);
    if move_list.count() == 0 {
        let next = board.switch_players();
        if next.has_legal_moves() {
            ctx.update_pass();
            let score = -shallow_alphabeta(ctx, &next, depth, -beta, -alpha);
            ctx.undo_pass();
            return score;
        } else {
            return endgame::solve(board, ctx.empty_list.count);
        }
    }

    let tt_moves = ctx
        .shallow_table
        .probe(board)
        .map_or([Square::None; 2], |d| d.best_moves());

    move_list.evaluate_moves_fast(ctx, board, tt_moves);

    let mut best_move = Square::None;
    let mut best_score = -SCORE_INF;
    for mv in move_list.best_first_iter() {
        let next = board.make_move_with_flipped(mv.flipped, mv.sq);

        ctx.update(mv.sq);
        let score = if depth == 3 {
            -evaluate_depth2(ctx, &next, -beta, -alpha)
        } else {
            -shallow_alphabeta(ctx, &next, depth - 1, -beta, -alpha)
        };
        ctx.undo(mv.sq);

        if score > best_score {
            best_score = score;
            if score >= beta {
                best_move = mv.sq;
                break;
            }
            if score > alpha {
                alpha = score;
                best_move = mv.sq;
            }
        }
    }

    ctx.shallow_table.store(
        board,
        &StoreRequest {
            depth,
            selectivity: ctx.selectivity,
            cost: 0,
            alpha: org_alpha,
            beta,
            score: best_score,
            best_move,
        },
    );

    best_score
}
