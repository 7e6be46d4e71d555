use common::vision::{corners_from_flat, Pose3, TargetCorner, TrackedTarget};
use pubsub::PubSub;

use crate::{CornerStatistics, PoseStatistics, Statistics};

/// Pose and corner statistics of one tracked target (or of a fused multi-target estimate), sharing
/// a window and a telemetry table.
pub struct TargetStatistics {
    pose: PoseStatistics,
    corners: CornerStatistics,
    last_timestamp: Option<f64>,
}

impl TargetStatistics {
    pub fn new(window: f64) -> Self {
        Self {
            pose: PoseStatistics::new(window),
            corners: CornerStatistics::new(window),
            last_timestamp: None,
        }
    }

    pub fn with_telemetry(window: f64, pubsub: &mut PubSub, table: &str) -> Self {
        Self {
            pose: PoseStatistics::with_telemetry(window, pubsub, table),
            corners: CornerStatistics::with_telemetry(window, pubsub, table),
            last_timestamp: None,
        }
    }

    /// Updates pose and corners independently. A missing pose or an empty corner list only skips
    /// its own half.
    pub fn update_parts(&mut self, pose: Option<&Pose3>, corners: &[TargetCorner], timestamp: f64) {
        if pose.is_none() && corners.is_empty() {
            return;
        }
        self.pose.update(pose, timestamp);
        self.corners.update(Some(corners), timestamp);
        self.last_timestamp = Some(timestamp);
    }

    /// Same as [`TargetStatistics::update_parts`] with the corners given as `[x0, y0, x1, y1, ...]`.
    pub fn update_flat(&mut self, pose: Option<&Pose3>, tcornxy: &[f64], timestamp: f64) {
        let corners = corners_from_flat(tcornxy);
        self.update_parts(pose, &corners, timestamp);
    }

    pub fn pose(&self) -> &PoseStatistics {
        &self.pose
    }

    pub fn corners(&self) -> &CornerStatistics {
        &self.corners
    }

    /// Timestamp of the last update that carried any data.
    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }
}

impl Statistics for TargetStatistics {
    type Input = TrackedTarget;

    fn update(&mut self, target: Option<&TrackedTarget>, timestamp: f64) {
        if let Some(target) = target {
            self.update_parts(Some(&target.camera_to_target), &target.corners, timestamp);
        }
    }

    fn window(&self) -> f64 {
        self.pose.window()
    }

    fn set_window(&mut self, seconds: f64) {
        tracing::debug!(seconds, "changing statistics window");
        self.pose.set_window(seconds);
        self.corners.set_window(seconds);
    }

    fn publish(&mut self) {
        self.pose.publish();
        self.corners.publish();
    }
}
