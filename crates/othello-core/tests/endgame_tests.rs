use othello_core::board::Board;
use othello_core::disc::Disc;
use othello_core::level::Level;
use othello_core::probcut::NO_SELECTIVITY;
use othello_core::search::{Search, SearchOptions, SearchRequest};
use othello_core::square::Square;

fn exact_search() -> Search {
    Search::new(&SearchOptions::new(16).with_threads(Some(1)))
}

fn exact_request() -> SearchRequest {
    SearchRequest::with_level(Level::perfect(), NO_SELECTIVITY)
}

fn solve(board_str: &str, side: Disc) -> othello_core::search::search_result::SearchResult {
    let mut search = exact_search();
    let board = Board::from_string(board_str, side).unwrap();
    search.run(&board, &exact_request())
}

#[test]
fn test_solve_2_empties() {
    let result = solve(
        "XXXXXXXXXXXXXXXXXXOOXOXXXXXXOXXXXXXOXOXXXXOXOXOXXOOOOOOX--OOOOOX",
        Disc::Black,
    );
    assert_eq!(result.score as i32, 46);
}

#[test]
fn test_solve_2_empties_losing_side() {
    let result = solve(
        "X-XXXXOXOOOOOOOXOOXXOXOOOOXXXXOOOOOXXOXOOOOOXXXOOOOOOX-OOOOOOOOO",
        Disc::Black,
    );
    assert_eq!(result.score as i32, -32);
}

#[test]
fn test_solve_2_empties_as_white() {
    let result = solve(
        "-OXOOOX-XXXXOOXXXOXOXXXXXOXXXOOXXOOXXOOXXOXOXXOXXXOOOXXXXXXXXXXX",
        Disc::White,
    );
    assert_eq!(result.score as i32, -20);
}

#[test]
fn test_solve_3_empties() {
    let result = solve(
        "XXXXXXXXXXXXXXXXXXOOXOXXXXXXOXXXXXXOXOXXXXOXOXOX-OOOOOOX--OOOOOX",
        Disc::Black,
    );
    assert_eq!(result.score as i32, 44);
}

#[test]
fn test_solve_3_empties_losing_side() {
    let result = solve(
        "X-XXXXOXOOOOOOOXOOXXOXOOOOXXXXOOOOOXXOXOOOOOXXXOOOOOOX-OOOOOOO-O",
        Disc::Black,
    );
    assert_eq!(result.score as i32, -38);
}

#[test]
fn test_solve_3_empties_as_white() {
    let result = solve(
        "-OXOOO--XXXXOOXXXOXOXXXXXOXXXOOXXOOXXOOXXOXOXXOXXXOOOXXXXXXXXXXX",
        Disc::White,
    );
    assert_eq!(result.score as i32, -28);
}

#[test]
fn test_solve_4_empties() {
    let result = solve(
        "XOOOOOO-XXOOOOOOXXXOXOOOXXOOOOOOXXXOOOOOXXOOXOOOXO-OOOOOOOO-XXX-",
        Disc::Black,
    );
    assert_eq!(result.score as i32, 32);
}

#[test]
fn test_solve_4_empties_2() {
    let result = solve(
        "XXXXXX-OXXXXXXOOXXXOXOOOXXXXOOOOXXXXOOOOXXXOOOOOXXXXOO-XOOOOOO--",
        Disc::Black,
    );
    assert_eq!(result.score as i32, 20);
}

#[test]
fn test_solve_4_empties_as_white() {
    let result = solve(
        "XXXXXXXXXXOXOOXXXXXXXXOXXXXXXXXOXXXXXXX-XXXXXXX-XXXXXX-XXXXXXOO-",
        Disc::White,
    );
    assert_eq!(result.score as i32, -52);
}

#[test]
fn test_solve_5_empties() {
    let result = solve(
        "-OOOOOO-XXXXXXX---XOXXXOXXXOXXOOXXXXXOXOXXXOOOXOXOOOOXXOXOOOOOOO",
        Disc::White,
    );
    assert_eq!(result.score as i32, 32);
}

#[test]
fn test_solve_5_empties_2() {
    let result = solve(
        "--O--O----OOOOO-XOOOOOOOXXOOXOOOXXXXXOXXXOXXOOXXXXXXOXOXXOOOOOOX",
        Disc::Black,
    );
    assert_eq!(result.score as i32, 28);
}

#[test]
fn test_solve_9_empties() {
    let result = solve(
        "XXXXXXXXXXXXXXXXOOOXXXOXXOXXXXOX-OOXXOOX--OOOXXX--OOXXXX----XXXX",
        Disc::Black,
    );
    assert_eq!(result.score as i32, 50);
}

#[test]
fn test_solve_15_empties() {
    let result = solve(
        "--OXXO--XOXXXX--XOOOOXXXXOOOXXXXX-OOOXXX--OOOOXX--XXOOO----XXOO-",
        Disc::Black,
    );
    assert_eq!(result.score as i32, 8);
}

/// FFO test #40. Exact score +38 with a2 as the only best move.
#[test]
fn test_ffo_40() {
    let result = solve(
        "--XXXXX--OOOOXX-OOOOXXXOXOOXOOXOXXOXOXXOX-XOXXOXO---OOOXO---O---",
        Disc::Black,
    );
    assert_eq!(result.score as i32, 38);
    assert_eq!(result.best_move, Some(Square::A2));
    assert_eq!(result.selectivity, NO_SELECTIVITY);
}

/// A wipeout is worth the whole board: winner takes the empties.
#[test]
fn test_wipeout_scores_sixty_four() {
    let result = solve(
        "XO--------------------------------------------------------------",
        Disc::Black,
    );
    assert_eq!(result.score as i32, 64);
    assert_eq!(result.best_move, Some(Square::C1));
}

/// Black cannot move but White can: the engine must answer with an
/// explicit pass.
#[test]
fn test_forced_pass() {
    // A1 = White, A2 = Black; Black has no flip anywhere.
    let result = solve(
        "O-------X-------------------------------------------------------",
        Disc::Black,
    );
    assert_eq!(result.best_move, Some(Square::Pass));
    assert_eq!(result.pv_line.first(), Some(&Square::Pass));
}

/// A finished game returns its final score and no move.
#[test]
fn test_game_over_scores_position() {
    let board = Board::from_bitboards(0xFFFFFFFF00000000, 0x00000000FFFFFFFF);
    let mut search = exact_search();
    let result = search.run(&board, &exact_request());
    assert_eq!(result.best_move, None);
    assert_eq!(result.score as i32, 0);
}

/// Exact endgame results are independent of the thread count.
#[test]
fn test_thread_count_equivalence() {
    let board_str = "XXXXXXXXXXXXXXXXOOOXXXOXXOXXXXOX-OOXXOOX--OOOXXX--OOXXXX----XXXX";
    let board = Board::from_string(board_str, Disc::Black).unwrap();

    let mut scores = Vec::new();
    for n_threads in [1usize, 2, 4] {
        let mut search = Search::new(&SearchOptions::new(16).with_threads(Some(n_threads)));
        let result = search.run(&board, &exact_request());
        scores.push(result.score as i32);
    }
    assert_eq!(scores[0], scores[1]);
    assert_eq!(scores[0], scores[2]);
}

/// Two fresh engines searching the same position must agree on
/// everything, node count included.
#[test]
fn test_search_is_deterministic() {
    let board_str = "--OXXO--XOXXXX--XOOOOXXXXOOOXXXXX-OOOXXX--OOOOXX--XXOOO----XXOO-";
    let board = Board::from_string(board_str, Disc::Black).unwrap();

    let run = || {
        let mut search = exact_search();
        search.run(&board, &exact_request())
    };
    let a = run();
    let b = run();

    assert_eq!(a.score, b.score);
    assert_eq!(a.best_move, b.best_move);
    assert_eq!(a.n_nodes, b.n_nodes);
    assert_eq!(a.pv_line, b.pv_line);
}

/// Replaying the returned PV must reach a terminal position whose disc
/// difference equals the reported score.
#[test]
fn test_pv_replay_matches_score() {
    let board_str = "XOOOOOO-XXOOOOOOXXXOXOOOXXOOOOOOXXXOOOOOXXOOXOOOXO-OOOOOOOO-XXX-";
    let mut board = Board::from_string(board_str, Disc::Black).unwrap();
    let mut search = exact_search();
    let result = search.run(&board, &exact_request());

    let mut mover_is_root = true;
    for &sq in &result.pv_line {
        if sq == Square::Pass {
            board = board.switch_players();
        } else {
            board = board.make_move(sq);
        }
        mover_is_root = !mover_is_root;
    }

    // Complete the game along any legal continuation is unnecessary:
    // an exact PV ends at a terminal position.
    assert!(board.is_game_over());
    let mut diff =
        board.get_player_count() as i32 - board.get_opponent_count() as i32;
    let empties = board.get_empty_count() as i32;
    if diff > 0 {
        diff += empties;
    } else if diff < 0 {
        diff -= empties;
    }
    if !mover_is_root {
        diff = -diff;
    }
    assert_eq!(diff, result.score as i32);
}
