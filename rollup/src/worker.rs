//! Background thread driving [`Group::collect`]

use std::{
    io,
    sync::{
        Arc,
        mpsc::{RecvTimeoutError, Sender, channel},
    },
    thread,
    time::Duration,
};
use tokio::sync::oneshot;

use crate::group::Group;
use crate::sink::PointSink;

enum Control {
    Flush(oneshot::Sender<usize>),
    Shutdown,
}

/// Collects a [`Group`] on a timer and appends the points to a [`PointSink`]
///
/// Unless an interval is given, the worker wakes up every [`Group::min_step`] seconds, re-read
/// after each pass so a series with a smaller step speeds it up. The worker stops, after one last
/// collection, when [`CollectWorker::shutdown`] is called or the handle is dropped.
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> std::io::Result<()> {
/// use rollup::{CollectWorker, Group};
/// use rollup::test_util::test_point_sink;
/// use std::sync::Arc;
///
/// let group = Arc::new(Group::new());
/// let sink = test_point_sink();
/// let worker = CollectWorker::spawn(group.clone(), sink.sink)?;
/// assert_eq!(worker.flush().await, 0);
/// worker.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct CollectWorker {
    sender: Sender<Control>,
    handle: Option<thread::JoinHandle<()>>,
}

impl std::fmt::Debug for CollectWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectWorker").finish_non_exhaustive()
    }
}

impl CollectWorker {
    /// Start collecting every [`Group::min_step`] seconds
    pub fn spawn(group: Arc<Group>, sink: impl PointSink + 'static) -> io::Result<Self> {
        Self::start(group, sink, None)
    }

    /// Start collecting every `interval`
    pub fn with_interval(
        group: Arc<Group>,
        sink: impl PointSink + 'static,
        interval: Duration,
    ) -> io::Result<Self> {
        Self::start(group, sink, Some(interval))
    }

    fn start(
        group: Arc<Group>,
        sink: impl PointSink + 'static,
        interval: Option<Duration>,
    ) -> io::Result<Self> {
        let (sender, receiver) = channel();
        let handle = thread::Builder::new()
            .name("rollup-collect".into())
            .spawn(move || {
                let collect = || {
                    let points = group.collect();
                    let count = points.len();
                    sink.append_all(points);
                    count
                };
                loop {
                    let wait = interval.unwrap_or_else(|| {
                        Duration::from_secs(group.min_step().max(1).unsigned_abs())
                    });
                    match receiver.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            collect();
                        }
                        Ok(Control::Flush(ack)) => {
                            let _ = ack.send(collect());
                        }
                        Ok(Control::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                            let count = collect();
                            tracing::debug!(points = count, "collect worker stopped");
                            return;
                        }
                    }
                }
            })?;
        Ok(Self {
            sender,
            handle: Some(handle),
        })
    }

    /// Collect now, outside the timer, and wait until the points reached the sink
    ///
    /// Returns how many points were appended, or 0 if the worker thread is gone.
    pub async fn flush(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        let _ = self.sender.send(Control::Flush(tx));
        rx.await.unwrap_or(0)
    }

    /// Run a last collection and stop the worker thread, blocking until it exits
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.sender.send(Control::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("collect worker panicked");
            }
        }
    }
}

impl Drop for CollectWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
