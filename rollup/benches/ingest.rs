use divan::{Bencher, black_box};
use rollup::test_util::manual_group;
use rollup::traits::Aggregator;
use rollup::{Diverse, FirstWindow, Group, GroupConfig, Quantile, RawPoint, Sum};

fn main() {
    divan::main();
}

const THREADS: &[usize] = &[1, 2, 4, 8];
const SERIES: &[usize] = &[1, 100, 10_000];
const T: i64 = 1_000_007;

fn config() -> GroupConfig {
    GroupConfig {
        first_window: FirstWindow::Current,
        ..Default::default()
    }
}

fn group() -> Group {
    manual_group(T, config()).expect("config is valid").0
}

fn point(series: usize, aggregation: &str) -> RawPoint {
    RawPoint::new("bench", "latency")
        .with_tag("series", series.to_string())
        .with_value(series as f64)
        .with_timestamp(T)
        .with_step(10)
        .with_aggregation(aggregation)
}

#[divan::bench(consts = THREADS, args = SERIES)]
fn put<const N: usize>(bencher: Bencher, series: usize) {
    let points: Vec<RawPoint> = (0..series).map(|i| point(i, "SUM")).collect();
    bencher.with_inputs(group).bench_values(|group| {
        std::thread::scope(|s| {
            for _ in 0..N {
                let (group, points) = (&group, &points);
                s.spawn(move || {
                    for p in points {
                        group.put(black_box(p));
                    }
                });
            }
        });
        group
    });
}

#[divan::bench(args = SERIES)]
fn collect(bencher: Bencher, series: usize) {
    bencher
        .with_inputs(|| {
            let (group, clock) = manual_group(T, config()).expect("config is valid");
            for i in 0..series {
                group.put(&point(i, "DIVERSE"));
            }
            clock.advance(std::time::Duration::from_secs(10));
            group
        })
        .bench_values(|group| black_box(group.collect()));
}

#[divan::bench(types = [Sum, Quantile, Diverse], args = [100, 10_000])]
fn add<A: Aggregator + Fresh>(bencher: Bencher, items: usize) {
    bencher.with_inputs(A::fresh).bench_values(|aggregator| {
        for i in 0..items {
            aggregator.add(black_box(i as f64));
        }
        black_box(aggregator.values())
    });
}

trait Fresh {
    fn fresh() -> Self;
}

impl Fresh for Sum {
    fn fresh() -> Self {
        Sum::default()
    }
}

impl Fresh for Quantile {
    fn fresh() -> Self {
        Quantile::p99()
    }
}

impl Fresh for Diverse {
    fn fresh() -> Self {
        Diverse::new()
    }
}
