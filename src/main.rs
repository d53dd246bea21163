use rand::Rng;
use std::path::Path;
use std::time::Instant;
use stepblock::{
    tagset, Bounds, ConsolidatedSeries, Datapoint, Duration, FirstPresent, GridIterator,
    MultiSeriesBlock, SeriesMeta, Store, Value,
};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const RAW: &str = "raw_10s";
const AGG: &str = "agg_1m";

fn main() -> stepblock::Result<()> {
    env_logger::builder()
        .filter_module("lsm_tree", log::LevelFilter::Warn)
        .filter_module("fjall", log::LevelFilter::Warn)
        .filter_module("stepblock", log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    let path = Path::new(".stepblock");

    if path.try_exists()? {
        std::fs::remove_dir_all(path)?;
    }

    let store = Store::builder().cache_size_mib(32).open(path)?;

    let end = stepblock::timestamp();
    let start = end - Duration::minutes(15);
    let bounds = Bounds::new(start, end, Duration::minutes(1))?;

    let hosts = ["h-0", "h-1", "h-2"]
        .into_iter()
        .map(|host| {
            SeriesMeta::new(
                "cpu.total",
                tagset!(
                    "env" => "prod",
                    "service" => "db",
                    "host" => host,
                ),
            )
        })
        .collect::<Vec<_>>();

    let ingest = Instant::now();

    {
        let mut rng = rand::thread_rng();

        for series in &hosts {
            // NOTE: Raw data only covers the last 5 minutes, the rest is rolled up
            let mut ts = end - Duration::minutes(5);
            while ts < end {
                let value: Value = 75.0 + rng.gen_range(-5.0..5.0);
                store.write(RAW, series, Datapoint::new(ts, value))?;
                ts += Duration::seconds(10);
            }

            let mut ts = start;
            while ts < end {
                let value: Value = 70.0 + rng.gen_range(-5.0..5.0);
                store.write(AGG, series, Datapoint::new(ts, value))?;
                ts += Duration::minutes(1);
            }
        }
    }

    log::info!("ingested in {:?}", ingest.elapsed());

    let mut builder = MultiSeriesBlock::builder(bounds)
        .tag("env", "prod")
        .consolidation(FirstPresent);

    for series in &hosts {
        builder = builder.series(
            ConsolidatedSeries::new(series.clone(), bounds)
                .with_namespace(store.namespace_block(
                    RAW,
                    series,
                    bounds.with_step_size(Duration::seconds(10))?,
                )?)
                .with_namespace(store.namespace_block(AGG, series, bounds)?),
        );
    }

    let mut block = builder.build()?;

    log::info!(
        "block {} has {} steps x {} series",
        block.meta().bounds,
        block.step_count(),
        block.series_count()
    );

    let query = Instant::now();

    let mut steps = block.step_iter()?;
    while steps.advance()? {
        let row = steps.current_row();
        log::info!("{} => {:?}", row.time, row.values);
    }
    steps.release();

    log::info!("stepped in {:?}", query.elapsed());

    for series in block.series_iter()? {
        let series = series?;
        let values = series.values.collect::<stepblock::Result<Vec<_>>>()?;
        let present = values.iter().filter(|v| !v.is_nan()).count();

        log::info!("{}: {present}/{} steps present", series.meta, values.len());
    }

    block.release();

    Ok(())
}
