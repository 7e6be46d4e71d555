use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use common::{
    node::{Node, NodeConfig},
    vision::{FlatEstimate, PipelineResult},
};
use pubsub::{PubSub, Publisher};
use serde::Deserialize;

/// One entry of a recording, as written by the vision pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum Record {
    Pipeline(PipelineResult),
    Flat(FlatEstimate),
}

/// Plays back a recording, one record per tick.
pub struct ReplayNode {
    records: Vec<Record>,
    next: usize,
    pub_result: Publisher<PipelineResult>,
    pub_flat_estimate: Publisher<FlatEstimate>,
}

#[derive(Clone, Deserialize)]
pub struct ReplayNodeConfig {
    path: PathBuf,
    topic_result: String,
    topic_flat_estimate: String,
}

impl ReplayNode {
    pub fn new(
        records: Vec<Record>,
        pubsub: &mut PubSub,
        topic_result: &str,
        topic_flat_estimate: &str,
    ) -> Self {
        Self {
            records,
            next: 0,
            pub_result: pubsub.publish(topic_result),
            pub_flat_estimate: pubsub.publish(topic_flat_estimate),
        }
    }

    pub fn remaining(&self) -> usize {
        self.records.len() - self.next
    }
}

/// Parses a YAML list of [`Record`]s written as `- Pipeline: {...}` / `- Flat: {...}` maps.
pub fn parse_recording(contents: &str) -> anyhow::Result<Vec<Record>> {
    let deserializer = serde_yaml::Deserializer::from_str(contents);
    Ok(serde_yaml::with::singleton_map_recursive::deserialize(
        deserializer,
    )?)
}

/// Reads a recording from disk, see [`parse_recording`].
pub fn load_recording(path: &Path) -> anyhow::Result<Vec<Record>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("could not read recording {}", path.display()))?;
    parse_recording(&contents)
        .with_context(|| format!("could not parse recording {}", path.display()))
}

impl NodeConfig for ReplayNodeConfig {
    fn instantiate(&self, pubsub: &mut PubSub) -> anyhow::Result<Box<dyn Node>> {
        let records = load_recording(&self.path)?;
        tracing::info!(path = %self.path.display(), records = records.len(), "loaded recording");

        Ok(Box::new(ReplayNode::new(
            records,
            pubsub,
            &self.topic_result,
            &self.topic_flat_estimate,
        )))
    }
}

impl Node for ReplayNode {
    fn update(&mut self, _pubsub: &mut PubSub) {
        let Some(record) = self.records.get(self.next) else {
            return;
        };
        self.next += 1;

        match record {
            Record::Pipeline(result) => self.pub_result.set(result.clone()),
            Record::Flat(estimate) => self.pub_flat_estimate.set(estimate.clone()),
        }

        if self.finished() {
            tracing::info!("recording finished");
        }
    }

    fn finished(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const RECORDING: &str = r#"
- Pipeline:
    timestamp: 0.0
    targets:
      - fiducial_id: 3
        camera_to_target: { translation: [2.0, 0.1, 0.3], rotation_deg: [0.0, 0.0, 180.0] }
        corners: [{ x: 10.0, y: 20.0 }, { x: 30.0, y: 20.0 }]
    estimate:
      pose: { translation: [1.0, 2.0, 0.0], rotation_deg: [0.0, 0.0, 90.0] }
      fiducials_used: [3]
- Flat:
    timestamp: 0.02
    pose: { translation: [1.0, 2.0, 0.0] }
    tcornxy: [10.0, 20.0, 30.0, 20.0]
- Pipeline:
    timestamp: 0.04
"#;

    #[test]
    fn parses_recordings() {
        let records = parse_recording(RECORDING).unwrap();
        assert_eq!(records.len(), 3);

        let Record::Pipeline(first) = &records[0] else {
            panic!("expected a pipeline result");
        };
        assert_eq!(first.targets[0].fiducial_id, 3);
        assert_eq!(first.targets[0].corners.len(), 2);
        assert_eq!(first.targets_used().len(), 1);

        let Record::Flat(flat) = &records[1] else {
            panic!("expected a flat estimate");
        };
        assert_eq!(flat.tcornxy.len(), 4);
        assert!(flat.pose.is_some());

        let Record::Pipeline(last) = &records[2] else {
            panic!("expected a pipeline result");
        };
        assert!(last.targets.is_empty());
        assert!(last.estimate.is_none());
    }

    #[test]
    fn publishes_one_record_per_tick() {
        let records = parse_recording(RECORDING).unwrap();
        let mut ps = PubSub::new();
        let mut results = ps.subscribe::<PipelineResult>("result");
        let mut flats = ps.subscribe::<FlatEstimate>("flat");
        let mut node = ReplayNode::new(records, &mut ps, "result", "flat");

        node.update(&mut ps);
        ps.tick();
        assert_eq!(results.try_recv().map(|r| r.timestamp), Some(0.0));
        assert!(flats.try_recv().is_none());
        assert!(!node.finished());

        node.update(&mut ps);
        ps.tick();
        assert!(results.try_recv().is_none());
        assert_eq!(flats.try_recv().map(|f| f.timestamp), Some(0.02));

        node.update(&mut ps);
        ps.tick();
        assert_eq!(results.try_recv().map(|r| r.timestamp), Some(0.04));
        assert!(node.finished());

        // nothing left to play
        node.update(&mut ps);
        ps.tick();
        assert!(results.try_recv().is_none());
        assert_eq!(node.remaining(), 0);
    }

    #[test]
    fn missing_recording_fails_to_instantiate() {
        let config = ReplayNodeConfig {
            path: PathBuf::from("no/such/recording.yaml"),
            topic_result: "result".into(),
            topic_flat_estimate: "flat".into(),
        };
        assert!(config.instantiate(&mut PubSub::new()).is_err());
    }
}
