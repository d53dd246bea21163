use criterion::{criterion_group, criterion_main, Criterion};
use stepblock::{
    tagset, Bounds, ConsolidatedSeries, Datapoint, FirstPresent, MemorySeries, MultiSeriesBlock,
    NamespaceBlock, SeriesMeta,
};

fn raw(from: u128, to: u128, every: u128) -> MemorySeries {
    MemorySeries::new(
        (from..to)
            .step_by(every as usize)
            .map(|ts| Datapoint::new(ts, ts as f64))
            .collect(),
    )
    .unwrap()
}

fn step_iter(c: &mut Criterion) {
    let bounds = Bounds::new(0, 100_000, 10).unwrap();
    let coarse = bounds.with_step_size(60).unwrap();

    let mut builder = MultiSeriesBlock::builder(bounds).consolidation(FirstPresent);

    for host in 0..10 {
        let host = format!("h-{host}");

        builder = builder.series(
            ConsolidatedSeries::new(SeriesMeta::new("cpu.total", tagset!("host" => &*host)), bounds)
                .with_namespace(NamespaceBlock::new("raw", bounds).with_source(raw(0, 100_000, 7)))
                .with_namespace(NamespaceBlock::new("agg", coarse).with_source(raw(0, 100_000, 60))),
        );
    }

    let block = builder.build().unwrap();

    c.bench_function("step iter (10 series x 10k steps)", |b| {
        b.iter(|| {
            let mut rows = 0;
            for row in block.step_iter().unwrap() {
                row.unwrap();
                rows += 1;
            }
            assert_eq!(10_000, rows);
        });
    });

    c.bench_function("series iter (10 series x 10k steps)", |b| {
        b.iter(|| {
            for series in block.series_iter().unwrap() {
                let series = series.unwrap();
                assert_eq!(10_000, series.values.count());
            }
        });
    });
}

fn namespace_iter(c: &mut Criterion) {
    let bounds = Bounds::new(0, 1_000_000, 10).unwrap();
    let series = ConsolidatedSeries::new(SeriesMeta::new("cpu.total", tagset!()), bounds)
        .with_namespace(
            NamespaceBlock::new("raw", bounds)
                .with_source(raw(0, 500_000, 3))
                .with_source(raw(500_000, 1_000_000, 3)),
        );
    let block = MultiSeriesBlock::builder(bounds).series(series).build().unwrap();

    c.bench_function("namespace iter (2 cursors, 100k steps)", |b| {
        b.iter(|| block.step_iter().unwrap().count());
    });
}

criterion_group!(benches, step_iter, namespace_iter);
criterion_main!(benches);
