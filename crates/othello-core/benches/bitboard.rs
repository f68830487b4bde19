use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use othello_core::bitboard;
use othello_core::board::Board;
use othello_core::square::Square;

fn bench_get_moves(c: &mut Criterion) {
    let board = Board::new().make_move(Square::D3).make_move(Square::C3);

    c.bench_function("get_moves", |b| {
        b.iter(|| bitboard::get_moves(black_box(board.player), black_box(board.opponent)))
    });
}

fn bench_make_move(c: &mut Criterion) {
    let board = Board::new();

    c.bench_function("make_move", |b| {
        b.iter(|| black_box(board).make_move(black_box(Square::D3)))
    });
}

criterion_group!(benches, bench_get_moves, bench_make_move);
criterion_main!(benches);
