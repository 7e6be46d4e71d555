use std::collections::BTreeMap;

use common::{
    node::{Node, NodeConfig},
    vision::{all_target_corners, PipelineResult},
};
use pubsub::{topic_name, PubSub, Publisher, Subscription};
use serde::Deserialize;
use statistics::{Statistics, TargetStatistics};

use super::{default_window_seconds, valid_window};

pub const MULTITAG_TABLE: &str = "Photon Multitag Stats";

pub fn target_table(fiducial_id: i32) -> String {
    format!("Photon Target({fiducial_id}) Stats")
}

/// Statistics of every fiducial a camera reports plus those of the fused multi-target estimate.
pub struct VisionStatisticsNode {
    sub_result: Subscription<PipelineResult>,
    sub_window: Subscription<f64>,
    pub_pose_array: Publisher<[f64; 6]>,

    window: f64,
    forget_after: Option<f64>,
    targets: BTreeMap<i32, TargetStatistics>,
    multitag: TargetStatistics,
}

#[derive(Clone, Deserialize)]
pub struct VisionStatisticsNodeConfig {
    camera: String,
    topic_result: String,
    topic_window: String,
    #[serde(default = "default_window_seconds")]
    window_seconds: f64,
    /// Drop the statistics of fiducials that were not seen for this long.
    #[serde(default)]
    forget_after_seconds: Option<f64>,
}

impl NodeConfig for VisionStatisticsNodeConfig {
    fn instantiate(&self, pubsub: &mut PubSub) -> anyhow::Result<Box<dyn Node>> {
        Ok(Box::new(VisionStatisticsNode::new(self, pubsub)?))
    }
}

impl VisionStatisticsNode {
    pub fn new(config: &VisionStatisticsNodeConfig, pubsub: &mut PubSub) -> anyhow::Result<Self> {
        anyhow::ensure!(
            valid_window(config.window_seconds),
            "window_seconds must be finite and not negative, got {}",
            config.window_seconds
        );

        Ok(Self {
            sub_result: pubsub.subscribe(&config.topic_result),
            sub_window: pubsub.subscribe(&config.topic_window),
            pub_pose_array: pubsub.publish(&topic_name(&config.camera, "EstPoseArray")),
            window: config.window_seconds,
            forget_after: config.forget_after_seconds,
            targets: BTreeMap::new(),
            multitag: TargetStatistics::with_telemetry(config.window_seconds, pubsub, MULTITAG_TABLE),
        })
    }

    fn set_window(&mut self, seconds: f64) {
        if !valid_window(seconds) {
            tracing::warn!(seconds, "ignoring invalid statistics window");
            return;
        }

        tracing::info!(seconds, "statistics window changed");
        self.window = seconds;
        self.multitag.set_window(seconds);
        for stats in self.targets.values_mut() {
            stats.set_window(seconds);
        }
    }

    fn process(&mut self, result: &PipelineResult, pubsub: &mut PubSub) {
        let timestamp = result.timestamp;

        for target in &result.targets {
            let window = self.window;
            let stats = self.targets.entry(target.fiducial_id).or_insert_with(|| {
                tracing::info!(fiducial_id = target.fiducial_id, "tracking new fiducial");
                TargetStatistics::with_telemetry(window, pubsub, &target_table(target.fiducial_id))
            });
            stats.update(Some(target), timestamp);
        }

        if let Some(estimate) = &result.estimate {
            let corners = all_target_corners(result.targets_used());
            self.multitag
                .update_parts(Some(&estimate.pose), &corners, timestamp);
            self.pub_pose_array.set(estimate.pose.to_array_deg());
        }

        if let Some(forget_after) = self.forget_after {
            self.targets.retain(|fiducial_id, stats| {
                let keep = stats
                    .last_timestamp()
                    .is_some_and(|last| timestamp - last <= forget_after);
                if !keep {
                    tracing::info!(fiducial_id, "forgetting fiducial");
                }
                keep
            });
        }
    }

    pub fn target(&self, fiducial_id: i32) -> Option<&TargetStatistics> {
        self.targets.get(&fiducial_id)
    }

    pub fn multitag(&self) -> &TargetStatistics {
        &self.multitag
    }

    pub fn window(&self) -> f64 {
        self.window
    }
}

impl Node for VisionStatisticsNode {
    fn update(&mut self, pubsub: &mut PubSub) {
        // a new window applies before any of the results of this tick
        if let Some(window) = self.sub_window.try_recv_latest() {
            self.set_window(*window);
        }

        while let Some(result) = self.sub_result.try_recv() {
            self.process(&result, pubsub);
        }
    }
}
