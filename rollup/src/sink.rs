//! Destinations for collected points

use std::sync::{Arc, mpsc::Sender};

use crate::point::ReducedPoint;

/// Receives the points a collection pass produced
///
/// Implementations hand points off to storage or transport. `append` is called from the collect
/// worker's thread and should not block for long; buffer and ship asynchronously if delivery is
/// slow.
pub trait PointSink: Send + Sync {
    /// Deliver one point
    fn append(&self, point: ReducedPoint);

    /// Deliver every point of one collection pass
    fn append_all(&self, points: Vec<ReducedPoint>) {
        for point in points {
            self.append(point);
        }
    }
}

/// A boxed [`PointSink`]
pub type BoxPointSink = Box<dyn PointSink>;

impl<S: PointSink + ?Sized> PointSink for Arc<S> {
    fn append(&self, point: ReducedPoint) {
        (**self).append(point)
    }

    fn append_all(&self, points: Vec<ReducedPoint>) {
        (**self).append_all(points)
    }
}

impl<S: PointSink + ?Sized> PointSink for Box<S> {
    fn append(&self, point: ReducedPoint) {
        (**self).append(point)
    }

    fn append_all(&self, points: Vec<ReducedPoint>) {
        (**self).append_all(points)
    }
}

/// Points sent to a closed channel are dropped
impl PointSink for Sender<ReducedPoint> {
    fn append(&self, point: ReducedPoint) {
        let _ = self.send(point);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, mpsc::channel};

    use assert2::check;

    use super::{BoxPointSink, PointSink};
    use crate::point::{PointTemplate, ReducedPoint};

    fn point(value: f64) -> ReducedPoint {
        ReducedPoint {
            template: Arc::new(PointTemplate {
                endpoint: "e".into(),
                metric: "m".into(),
                tags: Default::default(),
                step: 10,
            }),
            value,
            timestamp: 0,
        }
    }

    #[test]
    fn channel_sink_forwards_points() {
        let (tx, rx) = channel();
        let sink: BoxPointSink = Box::new(tx);
        sink.append_all(vec![point(1.0), point(2.0)]);
        let values: Vec<_> = rx.try_iter().map(|p| p.value).collect();
        check!(values == [1.0, 2.0]);
    }

    #[test]
    fn closed_channel_drops_points() {
        let (tx, rx) = channel();
        drop(rx);
        Arc::new(tx).append(point(1.0));
    }
}
