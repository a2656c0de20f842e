//! Performance benchmarks for paragraph segmentation.
//!
//! Run with: `cargo bench --bench segmentation`
//!
//! Segmentation is synchronous and sits on the hot path of every chapter
//! task, so regressions here multiply across the whole document.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use atom_graph_kernel::segment;

/// Build a paragraph of `n` sentences with citations and abbreviations
/// sprinkled in, approximating scholarly prose.
fn make_paragraph(n: usize) -> String {
    let sentences = [
        "The justification for this belief seems to depend on sensory experience.",
        "That is not a happy result, e.g. for proof-based justification.",
        "The argument is familiar (Williamson 2007: 99-105) and contested.",
        "The ratio cited is 3.14 in the standard treatment.[12]",
        "The upshot is this: the criterion fails on its own terms.",
    ];
    let mut out = String::new();
    for i in 0..n {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(sentences[i % sentences.len()]);
    }
    out
}

fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmentation");

    for sentence_count in [5, 50, 500] {
        let paragraph = make_paragraph(sentence_count);

        group.throughput(Throughput::Bytes(paragraph.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("sentences", sentence_count),
            &paragraph,
            |b, paragraph| {
                b.iter(|| {
                    let spans = segment(black_box(paragraph), 0);
                    assert!(!spans.is_empty());
                    spans
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_segmentation);
criterion_main!(benches);
