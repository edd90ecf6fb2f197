//! Criterion benchmarks for the JIS table lookup and keystroke synthesis.
//!
//! Run with:
//! ```bash
//! cargo bench --package msx-core --bench keymap_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use msx_core::keymap::lookup;
use msx_core::{sanitize_lines, KeystrokeEmitter, ModifierState};

// ── Representative inputs ─────────────────────────────────────────────────────

const BENCH_CHARS: &[char] = &['A', 'z', '1', '"', '日', '┼', 'か', 'カ', 'ッ', '゛', '猫'];

const BENCH_PROGRAM: &[&str] = &[
    "10 SCREEN 1:COLOR 15,4,4",
    "20 PRINT \"カタカナ と ひらがな\"",
    "30 FOR I=0 TO 255:PRINT CHR$(I);:NEXT",
    "40 ' がぎぐげご",
    "50 GOTO 50",
];

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("msx_jis_lookup");
    for &ch in BENCH_CHARS {
        group.bench_with_input(BenchmarkId::from_parameter(ch), &ch, |b, &ch| {
            b.iter(|| lookup(black_box(ch)))
        });
    }
    group.finish();
}

fn bench_sanitize(c: &mut Criterion) {
    c.bench_function("sanitize_program", |b| {
        b.iter(|| sanitize_lines(black_box(BENCH_PROGRAM)))
    });
}

fn bench_emit(c: &mut Criterion) {
    let lines = match sanitize_lines(BENCH_PROGRAM) {
        Ok(s) => s.lines,
        Err(e) => panic!("bench program must sanitize: {e}"),
    };
    c.bench_function("emit_program", |b| {
        b.iter(|| {
            KeystrokeEmitter::new(black_box(&lines), ModifierState::default())
                .with_capture(true)
                .count()
        })
    });
}

criterion_group!(benches, bench_lookup, bench_sanitize, bench_emit);
criterion_main!(benches);
