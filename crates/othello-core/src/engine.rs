//! The engine facade hosts talk to.
//!
//! Wraps the search core with position management, the opening book
//! hook, level selection, pondering and hints. Board input accepts the
//! 64-cell text format with a side-to-move suffix, or a FEN-like form.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use crate::board::{Board, ParseBoardError};
use crate::book::Book;
use crate::level::{Level, get_level};
use crate::probcut::NO_SELECTIVITY;
use crate::search::search_result::{MoveBound, SearchResult};
use crate::search::threading::Stop;
use crate::search::time_control::TimeControl;
use crate::search::{Search, SearchOptions, SearchRequest};
use crate::square::Square;
use crate::disc::Disc;
use crate::types::Selectivity;

/// Error parsing a position string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePositionError {
    Board(ParseBoardError),
    /// The trailing side-to-move marker is missing or invalid.
    BadSideToMove,
}

impl fmt::Display for ParsePositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsePositionError::Board(e) => write!(f, "{e}"),
            ParsePositionError::BadSideToMove => write!(f, "missing or invalid side to move"),
        }
    }
}

impl std::error::Error for ParsePositionError {}

impl From<ParseBoardError> for ParsePositionError {
    fn from(e: ParseBoardError) -> Self {
        ParsePositionError::Board(e)
    }
}

/// Error for a move that is not legal in the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalMoveError(pub Square);

impl fmt::Display for IllegalMoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal move: {}", self.0)
    }
}

impl std::error::Error for IllegalMoveError {}

pub struct Engine {
    search: Search,
    board: Board,
    side_to_move: Disc,
    level: Level,
    selectivity: Selectivity,
    book: Option<Arc<dyn Book>>,
    pondering: Option<Receiver<SearchResult>>,
}

impl Engine {
    pub fn new(options: &SearchOptions) -> Engine {
        Engine {
            search: Search::new(options),
            board: Board::new(),
            side_to_move: Disc::Black,
            level: get_level(21),
            selectivity: 0,
            book: None,
            pondering: None,
        }
    }

    /// Resets cached search state between games.
    pub fn new_game(&mut self) {
        self.search.init();
        self.board = Board::new();
        self.side_to_move = Disc::Black;
    }

    /// Sets the position from text.
    ///
    /// Accepted forms:
    /// - 64 cells of `X`/`O`/`-`/`.` (row-major from A1) followed by the
    ///   side to move (`X`/`B` or `O`/`W`, any case);
    /// - a FEN-like form `8/8/8/3Pp3/3pP3/8/8/8 w ...` where uppercase
    ///   letters are Black discs and the second field is `b` or `w`.
    pub fn set_board(&mut self, text: &str) -> Result<(), ParsePositionError> {
        let text = text.trim();
        if text.contains('/') {
            return self.set_board_fen(text);
        }

        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.len() < 65 {
            return Err(ParsePositionError::BadSideToMove);
        }

        let (body, side_marker) = compact.split_at(compact.len() - 1);
        let side = match side_marker.chars().next().unwrap() {
            'X' | 'x' | 'B' | 'b' | '*' => Disc::Black,
            'O' | 'o' | 'W' | 'w' => Disc::White,
            _ => return Err(ParsePositionError::BadSideToMove),
        };

        let board = Board::from_string(body, side)?;
        self.board = board;
        self.side_to_move = side;
        Ok(())
    }

    fn set_board_fen(&mut self, text: &str) -> Result<(), ParsePositionError> {
        let mut fields = text.split_whitespace();
        let ranks = fields.next().ok_or(ParsePositionError::BadSideToMove)?;
        let side = match fields.next() {
            Some("b") | Some("B") => Disc::Black,
            Some("w") | Some("W") => Disc::White,
            _ => return Err(ParsePositionError::BadSideToMove),
        };

        let mut cells = String::with_capacity(64);
        for rank in ranks.split('/') {
            for c in rank.chars() {
                if let Some(n) = c.to_digit(10) {
                    for _ in 0..n {
                        cells.push('-');
                    }
                } else if c.is_uppercase() {
                    cells.push('X');
                } else {
                    cells.push('O');
                }
            }
        }

        let board = Board::from_string(&cells, side)?;
        self.board = board;
        self.side_to_move = side;
        Ok(())
    }

    /// Sets the position directly.
    pub fn set_position(&mut self, board: Board, side_to_move: Disc) {
        self.board = board;
        self.side_to_move = side_to_move;
    }

    /// Selects the skill level (0..=60).
    pub fn set_level(&mut self, level: usize) {
        self.level = get_level(level);
    }

    /// Overrides the selectivity the ladder starts at; `NO_SELECTIVITY`
    /// requests exact-only search.
    pub fn set_selectivity(&mut self, selectivity: Selectivity) {
        self.selectivity = selectivity.min(NO_SELECTIVITY);
    }

    pub fn set_book(&mut self, book: Option<Arc<dyn Book>>) {
        self.book = book;
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Disc {
        self.side_to_move
    }

    /// Plays a move (or a pass) and flips the side to move.
    pub fn play(&mut self, sq: Square) -> Result<(), IllegalMoveError> {
        if sq == Square::Pass {
            if self.board.has_legal_moves() {
                return Err(IllegalMoveError(sq));
            }
            self.board = self.board.switch_players();
            self.side_to_move = self.side_to_move.opposite();
            return Ok(());
        }

        match self.board.try_make_move(sq) {
            Some(next) => {
                self.board = next;
                self.side_to_move = self.side_to_move.opposite();
                Ok(())
            }
            None => Err(IllegalMoveError(sq)),
        }
    }

    /// Finds the best move within `time`. The opening book takes
    /// precedence; the result is flagged when it answered.
    pub fn search(&mut self, time: TimeControl) -> SearchResult {
        if let Some(book) = &self.book
            && let Some(mv) = book.probe(&self.board)
        {
            return SearchResult::new_instant_move(mv, true);
        }

        let request = SearchRequest {
            level: self.level,
            selectivity: self.selectivity,
            time,
            multi_pv: false,
        };
        self.search.run(&self.board, &request)
    }

    /// Scores the top `n` moves of the position via a multi-PV search.
    pub fn hint(&mut self, n: usize, time: TimeControl) -> Vec<MoveBound> {
        let request = SearchRequest {
            level: self.level,
            selectivity: self.selectivity,
            time,
            multi_pv: true,
        };
        let mut result = self.search.run(&self.board, &request);
        result.bounds.truncate(n);
        result.bounds
    }

    /// Starts a background search on the position after the guessed
    /// opponent move. Stop it with [`Engine::stop_pondering`].
    pub fn ponder(&mut self, guess: Square) -> Result<(), IllegalMoveError> {
        let next = self
            .board
            .try_make_move(guess)
            .ok_or(IllegalMoveError(guess))?;

        let request = SearchRequest {
            level: self.level,
            selectivity: self.selectivity,
            time: TimeControl::Infinite,
            multi_pv: false,
        };
        self.pondering = Some(self.search.start_pondering(&next, &request));
        Ok(())
    }

    /// Interrupts a pondering search and returns its best effort.
    pub fn stop_pondering(&mut self) -> Option<SearchResult> {
        let receiver = self.pondering.take()?;
        self.search.abort(Stop::StopPondering);
        receiver.recv().ok()
    }

    /// Asks the running search to return its best answer so far.
    pub fn stop(&self) {
        self.search.abort(Stop::StopOnDemand);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_engine() -> Engine {
        Engine::new(&SearchOptions::new(1).with_threads(Some(1)))
    }

    #[test]
    fn test_set_board_text_format() {
        let mut engine = small_engine();
        engine
            .set_board("...........................OX......XO........................... X")
            .unwrap();
        assert_eq!(*engine.board(), Board::new());
        assert_eq!(engine.side_to_move(), Disc::Black);

        // Same position without the separating space.
        engine
            .set_board("---------------------------OX------XO---------------------------O")
            .unwrap();
        assert_eq!(engine.side_to_move(), Disc::White);
    }

    #[test]
    fn test_set_board_fen_format() {
        let mut engine = small_engine();
        engine.set_board("8/8/8/3Pp3/3pP3/8/8/8 w").unwrap();
        assert_eq!(engine.side_to_move(), Disc::White);
        assert_eq!(engine.board().get_empty_count(), 60);
    }

    #[test]
    fn test_set_board_rejects_garbage() {
        let mut engine = small_engine();
        assert!(engine.set_board("").is_err());
        assert!(engine.set_board("XO").is_err());
        let no_side = "-".repeat(64);
        assert!(engine.set_board(&no_side).is_err());
    }

    #[test]
    fn test_play_moves_and_pass() {
        let mut engine = small_engine();
        assert!(engine.play(Square::D3).is_ok());
        assert_eq!(engine.side_to_move(), Disc::White);
        assert_eq!(engine.play(Square::A1), Err(IllegalMoveError(Square::A1)));
        // Passing is illegal while moves exist.
        assert_eq!(
            engine.play(Square::Pass),
            Err(IllegalMoveError(Square::Pass))
        );
    }

    #[test]
    fn test_book_short_circuits_search() {
        use crate::book::tests::MapBook;

        let mut engine = small_engine();
        let book = MapBook::new([(Board::new(), Square::D3)]);
        engine.set_book(Some(Arc::new(book)));

        let result = engine.search(TimeControl::Infinite);
        assert!(result.book_move);
        assert_eq!(result.best_move, Some(Square::D3));
        assert_eq!(result.n_nodes, 0);
    }

    #[test]
    fn test_search_returns_legal_move() {
        let mut engine = small_engine();
        engine.set_level(2);
        let result = engine.search(TimeControl::Infinite);
        let mv = result.best_move.unwrap();
        assert!(engine.board().is_legal_move(mv));
        assert!(!result.book_move);
    }

    #[test]
    fn test_hint_orders_moves() {
        let mut engine = small_engine();
        engine.set_level(2);
        let hints = engine.hint(3, TimeControl::Infinite);
        assert!(!hints.is_empty());
        assert!(hints.len() <= 3);
        for pair in hints.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_ponder_stop() {
        let mut engine = small_engine();
        engine.set_level(3);
        engine.ponder(Square::D3).unwrap();
        let result = engine.stop_pondering();
        assert!(result.is_some());
        // The engine's own position is untouched by pondering.
        assert_eq!(*engine.board(), Board::new());
    }
}
