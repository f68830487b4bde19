//! Opening book interface.
//!
//! Book storage and retrieval live outside the engine; the engine only
//! asks for a move before starting a search. Implementations should
//! normalize positions through [`Board::canonical`] so all eight
//! symmetry images share one entry.

use crate::board::Board;
use crate::square::Square;

pub trait Book: Send + Sync {
    /// Returns the book move for `board`, if the position is known.
    fn probe(&self, board: &Board) -> Option<Square>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory book used by the engine tests.
    pub struct MapBook {
        entries: HashMap<Board, Square>,
    }

    impl MapBook {
        pub fn new(entries: impl IntoIterator<Item = (Board, Square)>) -> MapBook {
            MapBook {
                entries: entries
                    .into_iter()
                    .map(|(b, sq)| (b.canonical(), sq))
                    .collect(),
            }
        }
    }

    impl Book for MapBook {
        fn probe(&self, board: &Board) -> Option<Square> {
            self.entries.get(&board.canonical()).copied()
        }
    }

    #[test]
    fn test_map_book_probe_is_symmetry_invariant() {
        let board = Board::new().make_move(Square::D3);
        let book = MapBook::new([(board, Square::C3)]);

        assert_eq!(book.probe(&board), Some(Square::C3));
        assert_eq!(book.probe(&board.rotate_180()), Some(Square::C3));
        assert_eq!(book.probe(&Board::new()), None);
    }
}
