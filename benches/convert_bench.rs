use canopy::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[derive(Debug, PartialEq, TreeCodec)]
enum Entry {
    Leaf {
        #[tree(default)]
        weight: i64,
    },
    Branch {
        label: String,
        #[tree(variadic)]
        children: Vec<Entry>,
    },
}

fn sample(depth: usize) -> Entry {
    if depth == 0 {
        Entry::Leaf { weight: 7 }
    } else {
        Entry::Branch {
            label: format!("level-{depth}"),
            children: (0..4).map(|_| sample(depth - 1)).collect(),
        }
    }
}

fn bench_assemble(c: &mut Criterion) {
    c.bench_function("assemble_entry_converter", |b| {
        b.iter(|| {
            let mut knot = Knot::new();
            black_box(knot.resolve::<Entry>().unwrap());
        })
    });
}

fn bench_round_trip(c: &mut Criterion) {
    let conv = converter::<Entry>().unwrap();
    let value = sample(4);
    c.bench_function("write_entry_tree", |b| {
        b.iter(|| black_box(conv.write(&value)))
    });
    let tree = conv.write(&value);
    c.bench_function("read_entry_tree", |b| {
        b.iter(|| black_box(conv.read(&tree).unwrap()))
    });
    let text = canopy::to_text(&tree);
    c.bench_function("parse_entry_text", |b| {
        b.iter(|| black_box(canopy::from_text(&text).unwrap()))
    });
}

criterion_group!(benches, bench_assemble, bench_round_trip);
criterion_main!(benches);
