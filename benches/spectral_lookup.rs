use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use photclass::{
    catalog::{colors::ColorValue, CatalogEntry},
    classification::ClassificationAggregator,
    crossmatch::select_best,
    lookup::{spectral_type::SpectralTypeMatcher, LookupTableKind},
};

/// Deterministic spread of W1-W2 / J-K values covering the M/L/T sequence.
fn color_grid(n: usize) -> Vec<[ColorValue; 2]> {
    (0..n)
        .map(|i| {
            let t = i as f64 / n as f64;
            [
                ColorValue::new("W1-W2", -0.1 + 2.0 * t),
                ColorValue::new("J-K", 0.7 + 1.3 * t),
            ]
        })
        .collect()
}

fn bench_matcher(c: &mut Criterion) {
    let table = LookupTableKind::MltDwarfs.load().unwrap();
    let matcher = SpectralTypeMatcher::new(&table);
    let grid = color_grid(1_000);

    c.bench_function("spectral_lookup/mlt_1000_targets", |b| {
        b.iter(|| {
            for colors in &grid {
                black_box(matcher.lookup(black_box(colors)));
            }
        })
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let table = LookupTableKind::MltDwarfs.load().unwrap();
    let matcher = SpectralTypeMatcher::new(&table);
    let entry = CatalogEntry::new("AllWISE", "bench", 10.0, 20.0);
    let matches: Vec<_> = color_grid(1_000)
        .iter()
        .flat_map(|colors| matcher.lookup(colors))
        .collect();

    c.bench_function("spectral_lookup/aggregate_2000_matches", |b| {
        b.iter_batched(
            ClassificationAggregator::new,
            |mut agg| {
                agg.add_matches(&entry, &matches);
                black_box(agg.ranked())
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_select_best(c: &mut Criterion) {
    let candidates: Vec<CatalogEntry> = (0..200)
        .map(|i| {
            let d = (i * 37 % 200) as f64 / 3600.0 * 0.025;
            CatalogEntry::new("Gaia", format!("g{i}"), 10.0, 20.0 + d).with_target(10.0, 20.0)
        })
        .collect();

    c.bench_function("crossmatch/select_best_200", |b| {
        b.iter_batched(
            || candidates.clone(),
            |cands| black_box(select_best(cands)),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_matcher, bench_aggregate, bench_select_best);
criterion_main!(benches);
