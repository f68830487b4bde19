use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use othello_core::board::Board;
use othello_core::perft::perft;

fn bench_perft(c: &mut Criterion) {
    let board = Board::new();

    c.bench_function("perft_6", |b| b.iter(|| perft(black_box(&board), 6)));
}

criterion_group!(benches, bench_perft);
criterion_main!(benches);
