use common::node::{Node, NodeConfig};
use pubsub::{PubSub, Subscription};
use serde::Deserialize;

/// Writes every value received on the configured topics to the log.
pub struct TelemetryLogNode {
    subscriptions: Vec<Subscription<f64>>,
    received: usize,
}

#[derive(Clone, Deserialize)]
pub struct TelemetryLogNodeConfig {
    topics: Vec<String>,
}

impl NodeConfig for TelemetryLogNodeConfig {
    fn instantiate(&self, pubsub: &mut PubSub) -> anyhow::Result<Box<dyn Node>> {
        Ok(Box::new(TelemetryLogNode::new(pubsub, &self.topics)))
    }
}

impl TelemetryLogNode {
    pub fn new(pubsub: &mut PubSub, topics: &[String]) -> Self {
        Self {
            subscriptions: topics.iter().map(|t| pubsub.subscribe(t)).collect(),
            received: 0,
        }
    }

    /// Number of values logged so far.
    pub fn received(&self) -> usize {
        self.received
    }
}

impl Node for TelemetryLogNode {
    fn update(&mut self, _pubsub: &mut PubSub) {
        for sub in &mut self.subscriptions {
            while let Some(value) = sub.try_recv() {
                tracing::info!(topic = sub.topic(), value = *value);
                self.received += 1;
            }
        }
    }

    fn terminate(&mut self) {
        tracing::info!(received = self.received, "telemetry log closed");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counts_values_of_every_topic() {
        let mut ps = PubSub::new();
        let mut node = TelemetryLogNode::new(&mut ps, &["a/x".to_string(), "b/y".to_string()]);
        let mut x = ps.publish::<f64>("a/x");
        let mut y = ps.publish::<f64>("b/y");
        let mut other = ps.publish::<f64>("c/z");

        x.set(1.0);
        x.set(2.0);
        y.set(3.0);
        other.set(4.0);
        ps.tick();
        node.update(&mut ps);

        assert_eq!(node.received(), 3);
    }
}
