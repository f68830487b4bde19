//! Endgame test case definitions.

use std::fmt;

use othello_core::{board::Board, disc::Disc};

/// One solved endgame position with its known optimal outcome.
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Short identifier shown in reports (e.g. `4-empties`, `ffo-40`).
    pub name: &'static str,
    board_str: &'static str,
    side_to_move: Disc,
    pub expected_score: i32,
    best_moves: Vec<&'static str>,
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<10} ({} to move, score {:+})",
            self.name,
            if self.side_to_move == Disc::Black {
                "Black"
            } else {
                "White"
            },
            self.expected_score
        )
    }
}

impl TestCase {
    pub fn new(
        name: &'static str,
        board_str: &'static str,
        side_to_move: &'static str,
        expected_score: i32,
        best_moves: &'static str,
    ) -> Self {
        let stm = match side_to_move {
            "X" => Disc::Black,
            "O" => Disc::White,
            _ => panic!("invalid side to move: {side_to_move}"),
        };

        Self {
            name,
            board_str,
            side_to_move: stm,
            expected_score,
            best_moves: best_moves
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn board(&self) -> Board {
        Board::from_string(self.board_str, self.side_to_move)
            .expect("embedded test position must parse")
    }

    pub fn n_empties(&self) -> u32 {
        self.board().get_empty_count()
    }

    /// Whether `mv` (in `a1` notation) is one of the known best moves.
    /// An empty list accepts any move (score-only case).
    pub fn is_best_move(&self, mv: &str) -> bool {
        self.best_moves.is_empty()
            || self
                .best_moves
                .iter()
                .any(|best| best.eq_ignore_ascii_case(mv))
    }
}

/// The embedded suite: one solved position per boundary empties count
/// (exercising each solver specialization in turn), capped by the
/// classic FFO #40 benchmark. The boundary positions are generic solved
/// fixtures, not FFO-suite entries; scores were verified with
/// independent solvers.
pub fn test_suite() -> Vec<TestCase> {
    vec![
        TestCase::new(
            "2-empties",
            "XXXXXXXXXXXXXXXXXXOOXOXXXXXXOXXXXXXOXOXXXXOXOXOXXOOOOOOX--OOOOOX",
            "X",
            46,
            "",
        ),
        TestCase::new(
            "3-empties",
            "XXXXXXXXXXXXXXXXXXOOXOXXXXXXOXXXXXXOXOXXXXOXOXOX-OOOOOOX--OOOOOX",
            "X",
            44,
            "",
        ),
        TestCase::new(
            "4-empties",
            "XOOOOOO-XXOOOOOOXXXOXOOOXXOOOOOOXXXOOOOOXXOOXOOOXO-OOOOOOOO-XXX-",
            "X",
            32,
            "",
        ),
        TestCase::new(
            "5-empties",
            "-OOOOOO-XXXXXXX---XOXXXOXXXOXXOOXXXXXOXOXXXOOOXOXOOOOXXOXOOOOOOO",
            "O",
            32,
            "",
        ),
        TestCase::new(
            "9-empties",
            "XXXXXXXXXXXXXXXXOOOXXXOXXOXXXXOX-OOXXOOX--OOOXXX--OOXXXX----XXXX",
            "X",
            50,
            "",
        ),
        TestCase::new(
            "15-empties",
            "--OXXO--XOXXXX--XOOOOXXXXOOOXXXXX-OOOXXX--OOOOXX--XXOOO----XXOO-",
            "X",
            8,
            "",
        ),
        TestCase::new(
            "ffo-40",
            "--XXXXX--OOOOXX-OOOOXXXOXOOXOOXOXXOXOXXOX-XOXXOXO---OOOXO---O---",
            "X",
            38,
            "a2",
        ),
    ]
}
