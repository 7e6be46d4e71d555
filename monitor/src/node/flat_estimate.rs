use common::{
    node::{Node, NodeConfig},
    vision::FlatEstimate,
};
use pubsub::{PubSub, Subscription};
use serde::Deserialize;
use statistics::{Statistics, TargetStatistics};

use super::{default_window_seconds, valid_window};

/// Statistics of a single estimator that reports a pose with its corners as a flat array.
pub struct FlatEstimateStatisticsNode {
    sub_estimate: Subscription<FlatEstimate>,
    sub_window: Subscription<f64>,
    stats: TargetStatistics,
}

#[derive(Clone, Deserialize)]
pub struct FlatEstimateStatisticsNodeConfig {
    table: String,
    topic_estimate: String,
    topic_window: String,
    #[serde(default = "default_window_seconds")]
    window_seconds: f64,
}

impl NodeConfig for FlatEstimateStatisticsNodeConfig {
    fn instantiate(&self, pubsub: &mut PubSub) -> anyhow::Result<Box<dyn Node>> {
        anyhow::ensure!(
            valid_window(self.window_seconds),
            "window_seconds must be finite and not negative, got {}",
            self.window_seconds
        );

        Ok(Box::new(FlatEstimateStatisticsNode {
            sub_estimate: pubsub.subscribe(&self.topic_estimate),
            sub_window: pubsub.subscribe(&self.topic_window),
            stats: TargetStatistics::with_telemetry(self.window_seconds, pubsub, &self.table),
        }))
    }
}

impl Node for FlatEstimateStatisticsNode {
    fn update(&mut self, _pubsub: &mut PubSub) {
        if let Some(window) = self.sub_window.try_recv_latest() {
            if valid_window(*window) {
                self.stats.set_window(*window);
            } else {
                tracing::warn!(seconds = *window, "ignoring invalid statistics window");
            }
        }

        while let Some(estimate) = self.sub_estimate.try_recv() {
            self.stats
                .update_flat(estimate.pose.as_ref(), &estimate.tcornxy, estimate.timestamp);
        }
    }
}
