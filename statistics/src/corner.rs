use common::vision::{corners_from_flat, TargetCorner};
use pubsub::{PubSub, Publisher};

use crate::{math, Statistics, TimedBuffer};

/// Spread of the detected corners in the image.
///
/// Corners are tracked by position in the detection list: buffer `i` holds whatever was reported as
/// the `i`-th corner, so a change in the number of corners mixes samples of different physical
/// corners into the same buffer. The total deviation pools the squared errors of all buffers and
/// divides by the total number of retained samples.
pub struct CornerStatistics {
    window: f64,
    buffers: Vec<TimedBuffer<TargetCorner>>,

    corner_means: Vec<TargetCorner>,
    corner_std_devs: Vec<TargetCorner>,
    total_sq_error: TargetCorner,
    total_std_dev: TargetCorner,

    telemetry: Option<CornerTelemetry>,
}

struct CornerTelemetry {
    total_std_dev_x: Publisher<f64>,
    total_std_dev_y: Publisher<f64>,
}

impl CornerStatistics {
    pub fn new(window: f64) -> Self {
        Self {
            window,
            buffers: Vec::new(),
            corner_means: Vec::new(),
            corner_std_devs: Vec::new(),
            total_sq_error: TargetCorner::default(),
            total_std_dev: TargetCorner::default(),
            telemetry: None,
        }
    }

    /// Same as [`CornerStatistics::new`] but publishes every result to `table` on the bus.
    pub fn with_telemetry(window: f64, pubsub: &mut PubSub, table: &str) -> Self {
        let mut table = pubsub.table(table);
        Self {
            telemetry: Some(CornerTelemetry {
                total_std_dev_x: table.publish("TotalCornerStdDevX"),
                total_std_dev_y: table.publish("TotalCornerStdDevY"),
            }),
            ..Self::new(window)
        }
    }

    /// Update from a flat `[x0, y0, x1, y1, ...]` array. Odd-length or empty arrays are ignored.
    pub fn update_flat(&mut self, tcornxy: &[f64], timestamp: f64) {
        let corners = corners_from_flat(tcornxy);
        self.update(Some(&corners), timestamp);
    }

    fn calculate(&mut self) {
        self.corner_means.clear();
        self.corner_std_devs.clear();

        let mut total_sq_error = TargetCorner::default();
        let mut total_count = 0;
        for buffer in &self.buffers {
            let corners: Vec<TargetCorner> = buffer.values().copied().collect();
            total_count += corners.len();

            let mean = math::corner_mean(&corners);
            let sq_error = math::corner_sq_error_sum(&mean, &corners);
            total_sq_error.x += sq_error.x;
            total_sq_error.y += sq_error.y;

            self.corner_means.push(mean);
            self.corner_std_devs
                .push(math::pooled_std_dev(&sq_error, corners.len()));
        }

        self.total_sq_error = total_sq_error;
        self.total_std_dev = math::pooled_std_dev(&total_sq_error, total_count);
    }

    /// Mean of every corner index, in detection order.
    pub fn corner_means(&self) -> &[TargetCorner] {
        &self.corner_means
    }

    pub fn corner_std_devs(&self) -> &[TargetCorner] {
        &self.corner_std_devs
    }

    /// Squared errors summed over all corner indices.
    pub fn total_sq_error(&self) -> TargetCorner {
        self.total_sq_error
    }

    pub fn total_std_dev(&self) -> TargetCorner {
        self.total_std_dev
    }

    /// Number of corner indices that currently have a buffer.
    pub fn corner_count(&self) -> usize {
        self.buffers.len()
    }

    /// Total number of corner samples inside the window.
    pub fn sample_count(&self) -> usize {
        self.buffers.iter().map(TimedBuffer::len).sum()
    }
}

impl Statistics for CornerStatistics {
    type Input = [TargetCorner];

    fn update(&mut self, corners: Option<&[TargetCorner]>, timestamp: f64) {
        let Some(corners) = corners.filter(|c| !c.is_empty()) else {
            return;
        };

        // drop buffers of corner indices that have not been seen for a whole window
        let window = self.window;
        let before = self.buffers.len();
        self.buffers.retain(|b| {
            b.newest_timestamp()
                .is_some_and(|newest| timestamp - newest <= window)
        });
        if self.buffers.len() != before {
            tracing::debug!(
                dropped = before - self.buffers.len(),
                "removed stale corner buffers"
            );
        }

        for (i, corner) in corners.iter().enumerate() {
            if self.buffers.len() <= i {
                tracing::debug!(index = i, "tracking new corner index");
                self.buffers.push(TimedBuffer::new(self.window));
            }
            self.buffers[i].update(*corner, timestamp);
        }

        self.calculate();
        tracing::trace!(
            corners = self.buffers.len(),
            samples = self.sample_count(),
            timestamp,
            "corner statistics updated"
        );

        self.publish();
    }

    fn window(&self) -> f64 {
        self.window
    }

    fn set_window(&mut self, seconds: f64) {
        self.window = seconds;
        for buffer in &mut self.buffers {
            buffer.set_window(seconds);
        }
    }

    fn publish(&mut self) {
        if let Some(telemetry) = &mut self.telemetry {
            telemetry.total_std_dev_x.set(self.total_std_dev.x);
            telemetry.total_std_dev_y.set(self.total_std_dev.y);
        }
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use pubsub::topic_name;

    use super::*;

    fn corners(xy: &[(f64, f64)]) -> Vec<TargetCorner> {
        xy.iter().map(|&(x, y)| TargetCorner::new(x, y)).collect()
    }

    #[test]
    fn per_index_and_pooled_deviation() {
        let mut stats = CornerStatistics::new(20.0);
        // index 0 gets three samples, index 1 only one
        stats.update(Some(&corners(&[(0.0, 10.0), (100.0, 50.0)])), 0.0);
        stats.update(Some(&corners(&[(2.0, 10.0)])), 1.0);
        stats.update(Some(&corners(&[(4.0, 13.0)])), 2.0);

        assert_eq!(stats.corner_count(), 2);
        assert_eq!(stats.sample_count(), 4);

        assert_relative_eq!(stats.corner_means()[0].x, 2.0);
        assert_relative_eq!(stats.corner_means()[0].y, 11.0);
        assert_relative_eq!(stats.corner_means()[1].x, 100.0);
        assert_relative_eq!(stats.corner_std_devs()[0].x, (8.0f64 / 3.0).sqrt());
        assert_relative_eq!(stats.corner_std_devs()[1].x, 0.0);

        assert_relative_eq!(stats.total_sq_error().x, 8.0);
        assert_relative_eq!(stats.total_sq_error().y, 6.0);
        assert_relative_eq!(stats.total_std_dev().x, (8.0f64 / 4.0).sqrt());
        assert_relative_eq!(stats.total_std_dev().y, (6.0f64 / 4.0).sqrt());
    }

    #[test]
    fn stale_corner_indices_are_dropped() {
        let mut stats = CornerStatistics::new(1.0);
        stats.update(
            Some(&corners(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)])),
            0.0,
        );
        assert_eq!(stats.corner_count(), 4);

        // fewer corners do not remove anything while the old ones are still in the window
        stats.update(Some(&corners(&[(0.0, 0.0), (1.0, 1.0)])), 0.5);
        assert_eq!(stats.corner_count(), 4);

        stats.update(Some(&corners(&[(0.0, 0.0), (1.0, 1.0)])), 1.2);
        assert_eq!(stats.corner_count(), 2);
        assert_eq!(stats.corner_means().len(), 2);
    }

    #[test]
    fn empty_and_missing_corners_are_ignored() {
        let mut ps = PubSub::new();
        let mut stats = CornerStatistics::with_telemetry(20.0, &mut ps, "Corners");
        let mut std_x = ps.subscribe::<f64>(&topic_name("Corners", "TotalCornerStdDevX"));

        stats.update(Some(&corners(&[(1.0, 1.0)])), 0.0);
        stats.update(Some(&corners(&[(3.0, 1.0)])), 1.0);
        ps.tick();
        assert_eq!(*std_x.try_recv().unwrap(), 0.0);
        assert_eq!(*std_x.try_recv().unwrap(), 1.0);

        stats.update(Some(&[]), 2.0);
        stats.update(None, 3.0);
        stats.update_flat(&[1.0, 2.0, 3.0], 4.0);
        stats.update_flat(&[], 5.0);
        ps.tick();

        assert!(std_x.try_recv().is_none());
        assert_eq!(stats.sample_count(), 2);
        assert_relative_eq!(stats.total_std_dev().x, 1.0);
    }

    #[test]
    fn flat_input() {
        let mut stats = CornerStatistics::new(20.0);
        stats.update_flat(&[0.0, 0.0, 10.0, 10.0], 0.0);
        stats.update_flat(&[2.0, 0.0, 10.0, 14.0], 1.0);

        assert_eq!(stats.corner_count(), 2);
        assert_relative_eq!(stats.corner_means()[0].x, 1.0);
        assert_relative_eq!(stats.corner_means()[1].y, 12.0);
        // x: 1 + 1, y: 4 + 4 over four samples
        assert_relative_eq!(stats.total_std_dev().x, (2.0f64 / 4.0).sqrt());
        assert_relative_eq!(stats.total_std_dev().y, (8.0f64 / 4.0).sqrt());
    }

    #[test]
    fn window_change_reaches_every_buffer() {
        let mut stats = CornerStatistics::new(10.0);
        for t in 0..4 {
            stats.update(Some(&corners(&[(t as f64, 0.0), (0.0, t as f64)])), t as f64);
        }
        stats.set_window(0.5);
        assert_eq!(stats.window(), 0.5);

        stats.update(Some(&corners(&[(10.0, 0.0), (0.0, 10.0)])), 4.0);
        assert_eq!(stats.sample_count(), 2);
        assert_relative_eq!(stats.total_std_dev().x, 0.0);
    }
}
