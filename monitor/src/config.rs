use std::{fs, path::Path};

use anyhow::Context;
use common::node::{Node, NodeConfig as _};
use pubsub::PubSub;
use serde::Deserialize;

use crate::node::{
    FlatEstimateStatisticsNodeConfig, ReplayNodeConfig, TelemetryLogNodeConfig,
    VisionStatisticsNodeConfig,
};

#[derive(Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    /// Written as `- Replay: {...}` maps rather than YAML tags.
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub nodes: Vec<NodeConfig>,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Time between two ticks of the main loop.
    pub period_ms: u64,
    /// Stop after this many ticks, runs until all sources are done otherwise.
    pub max_ticks: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            period_ms: 20,
            max_ticks: None,
        }
    }
}

#[derive(Deserialize)]
pub enum NodeConfig {
    Replay(ReplayNodeConfig),
    VisionStatistics(VisionStatisticsNodeConfig),
    FlatEstimateStatistics(FlatEstimateStatisticsNodeConfig),
    TelemetryLog(TelemetryLogNodeConfig),
}

impl NodeConfig {
    fn instantiate(&self, pubsub: &mut PubSub) -> anyhow::Result<Box<dyn Node>> {
        use NodeConfig::*;
        match self {
            Replay(c) => c.instantiate(pubsub),
            VisionStatistics(c) => c.instantiate(pubsub),
            FlatEstimateStatistics(c) => c.instantiate(pubsub),
            TelemetryLog(c) => c.instantiate(pubsub),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;

        Self::from_contents(&contents)
            .with_context(|| format!("could not parse config file {}", path.display()))
    }

    pub fn from_contents(contents: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn instantiate_nodes(&self, pubsub: &mut PubSub) -> anyhow::Result<Vec<Box<dyn Node>>> {
        self.nodes
            .iter()
            .map(|config| config.instantiate(pubsub))
            .collect()
    }
}
