use othello_core::board::Board;
use othello_core::perft::perft;

#[test]
fn test_perft_depth_8() {
    assert_eq!(perft(&Board::new(), 8), 390_216);
}

#[test]
fn test_perft_depth_9() {
    assert_eq!(perft(&Board::new(), 9), 3_005_288);
}
