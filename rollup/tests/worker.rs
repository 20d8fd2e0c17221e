use std::sync::Arc;
use std::time::Duration;

use assert2::{check, let_assert};
use rollup::test_util::{manual_group, test_point_sink};
use rollup::{CollectWorker, FirstWindow, GroupConfig, RawPoint};

const T: i64 = 1_000_007;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config() -> GroupConfig {
    GroupConfig {
        first_window: FirstWindow::Current,
        ..Default::default()
    }
}

fn point(value: f64) -> RawPoint {
    RawPoint::new("e1", "m1")
        .with_value(value)
        .with_timestamp(T - 5)
        .with_step(10)
        .with_aggregation("SUM")
}

#[tokio::test]
async fn flush_delivers_collected_points() {
    init_tracing();
    let_assert!(Ok((group, clock)) = manual_group(T, config()));
    let group = Arc::new(group);
    let sink = test_point_sink();
    let_assert!(
        Ok(worker) =
            CollectWorker::with_interval(group.clone(), sink.sink, Duration::from_secs(3_600))
    );

    group.put(&point(20.0));
    group.put(&point(34.0));
    check!(worker.flush().await == 0);
    check!(sink.inspector.points().is_empty());

    clock.advance(Duration::from_secs(10));
    check!(worker.flush().await == 1);
    let points = sink.inspector.take();
    check!(points.len() == 1);
    check!(points[0].value == 54.0);
    check!(points[0].timestamp == 1_000_000);

    check!(worker.flush().await == 0);
    worker.shutdown();
}

#[tokio::test]
async fn shutdown_runs_a_last_collection() {
    init_tracing();
    let_assert!(Ok((group, clock)) = manual_group(T, config()));
    let group = Arc::new(group);
    let sink = test_point_sink();
    let_assert!(Ok(worker) = CollectWorker::spawn(group.clone(), sink.sink));

    group.put(&point(1.0));
    clock.advance(Duration::from_secs(10));
    worker.shutdown();

    let points = sink.inspector.points();
    check!(points.len() == 1);
    check!(points[0].value == 1.0);
}

#[test]
fn dropping_the_worker_stops_it() {
    init_tracing();
    let_assert!(Ok((group, clock)) = manual_group(T, config()));
    let group = Arc::new(group);
    let sink = test_point_sink();
    let_assert!(Ok(worker) = CollectWorker::spawn(group.clone(), sink.sink));

    group.put(&point(2.0));
    clock.advance(Duration::from_secs(10));
    drop(worker);

    check!(sink.inspector.points().len() == 1);
    // the worker released its handle on the group
    check!(Arc::strong_count(&group) == 1);
}

#[test]
fn channel_sink_receives_points() {
    let_assert!(Ok((group, clock)) = manual_group(T, config()));
    let group = Arc::new(group);
    let (tx, rx) = std::sync::mpsc::channel();
    let_assert!(Ok(worker) = CollectWorker::spawn(group.clone(), tx));

    group.put(&point(5.0));
    clock.advance(Duration::from_secs(10));
    worker.shutdown();

    let values: Vec<f64> = rx.try_iter().map(|p| p.value).collect();
    check!(values == [5.0]);
}
