use common::{math::rotation_angles, vision::Pose3};
use nalgebra::{UnitQuaternion, Vector3};
use pubsub::{PubSub, Publisher, Table};

use crate::{math, Statistics, TimedBuffer};

/// Mean and spread of a stream of poses, translation and rotation handled separately.
pub struct PoseStatistics {
    translations: TimedBuffer<Vector3<f64>>,
    rotations: TimedBuffer<UnitQuaternion<f64>>,

    translation_mean: Vector3<f64>,
    translation_std_dev: Vector3<f64>,
    rotation_mean: UnitQuaternion<f64>,
    rotation_std_dev: Vector3<f64>,

    telemetry: Option<PoseTelemetry>,
}

struct PoseTelemetry {
    translation_mean: [Publisher<f64>; 3],
    rotation_mean_deg: [Publisher<f64>; 3],
    translation_std_dev: [Publisher<f64>; 3],
    rotation_std_dev_deg: [Publisher<f64>; 3],
}

fn axis_publishers(table: &mut Table<'_>, prefix: &str, suffix: &str) -> [Publisher<f64>; 3] {
    ["X", "Y", "Z"].map(|axis| table.publish(&format!("{prefix}{axis}{suffix}")))
}

impl PoseTelemetry {
    fn new(table: &mut Table<'_>) -> Self {
        Self {
            translation_mean: axis_publishers(table, "TranslationAverage", ""),
            rotation_mean_deg: axis_publishers(table, "RotationAverage", "Deg"),
            translation_std_dev: axis_publishers(table, "TranslationStdDev", ""),
            rotation_std_dev_deg: axis_publishers(table, "RotationStdDev", "Deg"),
        }
    }
}

fn set_all(publishers: &mut [Publisher<f64>; 3], values: Vector3<f64>) {
    for (publisher, value) in publishers.iter_mut().zip(values.iter()) {
        publisher.set(*value);
    }
}

impl PoseStatistics {
    pub fn new(window: f64) -> Self {
        Self {
            translations: TimedBuffer::new(window),
            rotations: TimedBuffer::new(window),
            translation_mean: Vector3::zeros(),
            translation_std_dev: Vector3::zeros(),
            rotation_mean: UnitQuaternion::identity(),
            rotation_std_dev: Vector3::zeros(),
            telemetry: None,
        }
    }

    /// Same as [`PoseStatistics::new`] but publishes every result to `table` on the bus.
    pub fn with_telemetry(window: f64, pubsub: &mut PubSub, table: &str) -> Self {
        Self {
            telemetry: Some(PoseTelemetry::new(&mut pubsub.table(table))),
            ..Self::new(window)
        }
    }

    fn calculate(&mut self) {
        let translations: Vec<Vector3<f64>> = self.translations.values().copied().collect();
        self.translation_mean = math::translation_mean(&translations);
        self.translation_std_dev = math::translation_std_dev(&self.translation_mean, &translations);

        let rotations: Vec<UnitQuaternion<f64>> = self.rotations.values().copied().collect();
        self.rotation_mean = math::rotation_mean(&rotations);
        self.rotation_std_dev = math::rotation_std_dev(&self.rotation_mean, &rotations);
    }

    pub fn translation_mean(&self) -> Vector3<f64> {
        self.translation_mean
    }

    pub fn translation_std_dev(&self) -> Vector3<f64> {
        self.translation_std_dev
    }

    pub fn rotation_mean(&self) -> UnitQuaternion<f64> {
        self.rotation_mean
    }

    /// Roll, pitch and yaw standard deviation in radians.
    pub fn rotation_std_dev(&self) -> Vector3<f64> {
        self.rotation_std_dev
    }

    pub fn mean(&self) -> Pose3 {
        Pose3::new(self.translation_mean, self.rotation_mean)
    }

    /// Number of poses currently inside the window.
    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }
}

impl Statistics for PoseStatistics {
    type Input = Pose3;

    fn update(&mut self, pose: Option<&Pose3>, timestamp: f64) {
        let Some(pose) = pose else {
            return;
        };

        self.translations.update(pose.translation, timestamp);
        self.rotations.update(pose.rotation, timestamp);

        self.calculate();
        tracing::trace!(samples = self.len(), timestamp, "pose statistics updated");

        self.publish();
    }

    fn window(&self) -> f64 {
        self.translations.window()
    }

    fn set_window(&mut self, seconds: f64) {
        self.translations.set_window(seconds);
        self.rotations.set_window(seconds);
    }

    fn publish(&mut self) {
        let Some(telemetry) = &mut self.telemetry else {
            return;
        };

        let rotation_mean_deg = rotation_angles(&self.rotation_mean).map(f64::to_degrees);
        set_all(&mut telemetry.translation_mean, self.translation_mean);
        set_all(&mut telemetry.rotation_mean_deg, rotation_mean_deg);
        set_all(&mut telemetry.translation_std_dev, self.translation_std_dev);
        set_all(
            &mut telemetry.rotation_std_dev_deg,
            self.rotation_std_dev.map(f64::to_degrees),
        );
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use pubsub::{topic_name, Subscription};

    use super::*;

    fn received(sub: &mut Subscription<f64>) -> Vec<f64> {
        let mut values = Vec::new();
        while let Some(v) = sub.try_recv() {
            values.push(*v);
        }
        values
    }

    #[test]
    fn three_translations() {
        let mut stats = PoseStatistics::new(20.0);
        for t in 0..3 {
            let pose = Pose3::from_euler(t as f64, 0.0, 0.0, 0.0, 0.0, 0.0);
            stats.update(Some(&pose), t as f64);
        }

        assert_relative_eq!(stats.translation_mean(), Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(stats.translation_std_dev().x, (2.0f64 / 3.0).sqrt());
        assert_relative_eq!(stats.translation_std_dev().y, 0.0);
        assert_relative_eq!(stats.translation_std_dev().z, 0.0);
        assert_eq!(stats.len(), 3);

        let mean = stats.mean();
        assert_relative_eq!(mean.translation, Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(mean.rotation.angle_to(&UnitQuaternion::identity()), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn cold_start_is_zero() {
        let stats = PoseStatistics::new(20.0);
        assert_eq!(stats.translation_mean(), Vector3::zeros());
        assert_eq!(stats.translation_std_dev(), Vector3::zeros());
        assert_eq!(stats.rotation_mean(), UnitQuaternion::identity());
        assert_eq!(stats.rotation_std_dev(), Vector3::zeros());
        assert!(stats.is_empty());
    }

    #[test]
    fn rotation_spread_about_the_wraparound() {
        let mut stats = PoseStatistics::new(20.0);
        stats.update(
            Some(&Pose3::from_euler(0.0, 0.0, 0.0, 0.0, 0.0, 179f64.to_radians())),
            0.0,
        );
        stats.update(
            Some(&Pose3::from_euler(0.0, 0.0, 0.0, 0.0, 0.0, (-179f64).to_radians())),
            0.1,
        );
        assert_relative_eq!(stats.rotation_std_dev().z.to_degrees(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn old_poses_leave_the_window() {
        let mut stats = PoseStatistics::new(1.0);
        stats.update(Some(&Pose3::from_euler(100.0, 0.0, 0.0, 0.0, 0.0, 0.0)), 0.0);
        stats.update(Some(&Pose3::from_euler(1.0, 0.0, 0.0, 0.0, 0.0, 0.0)), 5.0);
        stats.update(Some(&Pose3::from_euler(3.0, 0.0, 0.0, 0.0, 0.0, 0.0)), 5.5);

        assert_eq!(stats.len(), 2);
        assert_relative_eq!(stats.translation_mean().x, 2.0);
        assert_relative_eq!(stats.translation_std_dev().x, 1.0);
    }

    #[test]
    fn window_change_reaches_both_buffers() {
        let mut stats = PoseStatistics::new(10.0);
        for t in 0..5 {
            let pose = Pose3::from_euler(t as f64, 0.0, 0.0, 0.0, 0.0, t as f64 * 0.1);
            stats.update(Some(&pose), t as f64);
        }
        stats.set_window(0.5);
        assert_eq!(stats.window(), 0.5);
        assert_eq!(stats.len(), 5);

        stats.update(Some(&Pose3::from_euler(5.0, 0.0, 0.0, 0.0, 0.0, 0.5)), 5.0);
        assert_eq!(stats.len(), 1);
        assert_relative_eq!(stats.translation_std_dev().x, 0.0);
        assert_relative_eq!(stats.rotation_std_dev().z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn publishes_once_per_update() {
        let mut ps = PubSub::new();
        let mut stats = PoseStatistics::with_telemetry(20.0, &mut ps, "Pose");
        let mut std_x = ps.subscribe::<f64>(&topic_name("Pose", "TranslationStdDevX"));
        let mut yaw = ps.subscribe::<f64>(&topic_name("Pose", "RotationAverageZDeg"));

        stats.update(Some(&Pose3::from_euler(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)), 0.0);
        stats.update(
            Some(&Pose3::from_euler(2.0, 0.0, 0.0, 0.0, 0.0, 20f64.to_radians())),
            1.0,
        );
        ps.tick();

        assert_eq!(received(&mut std_x), vec![0.0, 1.0]);
        let yaws = received(&mut yaw);
        assert_eq!(yaws.len(), 2);
        assert_relative_eq!(yaws[1], 10.0, epsilon = 1e-6);
    }

    #[test]
    fn missing_pose_changes_nothing() {
        let mut ps = PubSub::new();
        let mut stats = PoseStatistics::with_telemetry(20.0, &mut ps, "Pose");
        let mut mean_x = ps.subscribe::<f64>(&topic_name("Pose", "TranslationAverageX"));

        stats.update(Some(&Pose3::from_euler(4.0, 0.0, 0.0, 0.0, 0.0, 0.0)), 0.0);
        ps.tick();
        assert_eq!(received(&mut mean_x), vec![4.0]);

        stats.update(None, 1.0);
        ps.tick();
        assert!(received(&mut mean_x).is_empty());
        assert_relative_eq!(stats.translation_mean().x, 4.0);
        assert_eq!(stats.len(), 1);
    }
}
