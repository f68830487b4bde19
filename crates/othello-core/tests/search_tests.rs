use othello_core::bitboard::BitboardIterator;
use othello_core::board::Board;
use othello_core::disc::Disc;
use othello_core::level::{Level, get_level};
use othello_core::probcut::NO_SELECTIVITY;
use othello_core::search::time_control::TimeControl;
use othello_core::search::{Search, SearchOptions, SearchRequest};
use othello_core::square::Square;

/// Reference negamax over the raw board, with the empties-to-winner
/// terminal rule. Slow but obviously correct.
fn negamax_reference(board: &Board) -> i32 {
    let moves = board.get_moves();
    if moves == 0 {
        let pass = board.switch_players();
        if pass.has_legal_moves() {
            return -negamax_reference(&pass);
        }
        let diff = board.get_player_count() as i32 - board.get_opponent_count() as i32;
        let empties = board.get_empty_count() as i32;
        return match diff {
            0 => 0,
            d if d > 0 => d + empties,
            d => d - empties,
        };
    }

    let mut best = i32::MIN;
    for sq in BitboardIterator::new(moves) {
        best = best.max(-negamax_reference(&board.make_move(sq)));
    }
    best
}

/// Plays random moves until `target_empties` squares remain. Returns
/// `None` when the game ends too early.
fn random_position(seed: u64, target_empties: u32) -> Option<Board> {
    let mut state = seed;
    let mut board = Board::new();

    while board.get_empty_count() > target_empties {
        let moves = board.get_moves();
        if moves == 0 {
            let pass = board.switch_players();
            if !pass.has_legal_moves() {
                return None;
            }
            board = pass;
            continue;
        }

        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let candidates: Vec<Square> = BitboardIterator::new(moves).collect();
        let sq = candidates[(state >> 33) as usize % candidates.len()];
        board = board.make_move(sq);
    }

    // The side to move must have a move: a forced pass at the root is
    // answered with `pa`, not a score.
    if board.has_legal_moves() { Some(board) } else { None }
}

fn exact_request() -> SearchRequest {
    SearchRequest::with_level(Level::perfect(), NO_SELECTIVITY)
}

/// The specialized low-empties solvers must agree with plain negamax.
#[test]
fn test_boundary_solvers_match_reference() {
    let mut checked = 0;
    for target in 1..=6u32 {
        for seed in 1..=8u64 {
            let Some(board) = random_position(seed * 7919, target) else {
                continue;
            };

            let expected = negamax_reference(&board);

            let mut search = Search::new(&SearchOptions::new(1).with_threads(Some(1)));
            let result = search.run(&board, &exact_request());
            assert_eq!(
                result.score as i32, expected,
                "mismatch at {target} empties, seed {seed}:\n{board}"
            );
            checked += 1;
        }
    }
    assert!(checked >= 20, "too few positions generated: {checked}");
}

/// Midgame scores stay in the disc range and the move is legal.
#[test]
fn test_midgame_search_basics() {
    let board = random_position(999, 40).unwrap();

    let mut search = Search::new(&SearchOptions::new(4).with_threads(Some(1)));
    let request = SearchRequest::with_level(get_level(8), 0);
    let result = search.run(&board, &request);

    let mv = result.best_move.expect("a legal move exists");
    assert!(board.is_legal_move(mv));
    assert!((-64.0..=64.0).contains(&result.score));
    assert!(result.n_nodes > 0);
    assert!(result.depth >= 1);
    assert_eq!(result.pv_line.first(), Some(&mv));
}

/// Multi-PV bounds: lines are sorted and each proven window contains
/// its own score.
#[test]
fn test_multi_pv_bounds() {
    let board = random_position(555, 44).unwrap();

    let mut search = Search::new(&SearchOptions::new(4).with_threads(Some(1)));
    let request = SearchRequest {
        level: get_level(4),
        selectivity: 0,
        time: TimeControl::Infinite,
        multi_pv: true,
    };
    let result = search.run(&board, &request);

    assert_eq!(result.bounds.len(), board.get_moves().count_ones() as usize);
    for pair in result.bounds.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    let best = &result.bounds[0];
    assert!(best.lower <= best.upper);
    assert!((best.lower..=best.upper).contains(&best.score));
}

/// A per-move budget is honored within a generous margin, and the
/// partial result is still usable.
#[test]
fn test_move_time_budget() {
    let board = random_position(12345, 46).unwrap();

    let mut search = Search::new(&SearchOptions::new(8).with_threads(Some(1)));
    let request = SearchRequest {
        level: get_level(60),
        selectivity: NO_SELECTIVITY,
        time: TimeControl::MoveTime { budget_ms: 200 },
        multi_pv: false,
    };

    let start = std::time::Instant::now();
    let result = search.run(&board, &request);
    let elapsed = start.elapsed();

    assert!(
        elapsed.as_millis() < 5_000,
        "time control ignored: {elapsed:?}"
    );
    let mv = result.best_move.expect("search must return its best so far");
    assert!(board.is_legal_move(mv) || mv == Square::Pass);
}

/// The selectivity ladder reports what it reached: an exact request
/// ends exact, a selective one never exceeds its confidence tier.
#[test]
fn test_selectivity_reporting() {
    let board_str = "XXXXXXXXXXXXXXXXOOOXXXOXXOXXXXOX-OOXXOOX--OOOXXX--OOXXXX----XXXX";
    let board = Board::from_string(board_str, Disc::Black).unwrap();

    let mut search = Search::new(&SearchOptions::new(8).with_threads(Some(1)));
    let result = search.run(&board, &exact_request());
    assert_eq!(result.selectivity, NO_SELECTIVITY);
    assert_eq!(result.get_probability(), 100);
}
