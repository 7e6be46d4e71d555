use std::{thread, time::Duration};

use common::node::Node;
use pubsub::PubSub;

use crate::config::Config;

/// Extra ticks after a source is done, so results still in flight reach every node.
const DRAIN_TICKS: u64 = 3;

/// Drives all nodes from a single loop: every node updates once, then the bus is ticked.
pub struct Runner {
    pubsub: PubSub,
    nodes: Vec<Box<dyn Node>>,
    period: Duration,
    max_ticks: Option<u64>,
    ticks: u64,
}

impl Runner {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut pubsub = PubSub::new();
        let nodes = config.instantiate_nodes(&mut pubsub)?;

        Ok(Self::from_parts(
            pubsub,
            nodes,
            Duration::from_millis(config.settings.period_ms),
            config.settings.max_ticks,
        ))
    }

    pub fn from_parts(
        pubsub: PubSub,
        nodes: Vec<Box<dyn Node>>,
        period: Duration,
        max_ticks: Option<u64>,
    ) -> Self {
        Self {
            pubsub,
            nodes,
            period,
            max_ticks,
            ticks: 0,
        }
    }

    pub fn pubsub(&mut self) -> &mut PubSub {
        &mut self.pubsub
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Updates every node once and distributes what they published.
    pub fn step(&mut self) {
        for n in self.nodes.iter_mut() {
            n.update(&mut self.pubsub);
        }
        self.pubsub.tick();
        self.ticks += 1;
    }

    /// Runs until `max_ticks` is reached or shortly after a source has finished, then terminates
    /// all nodes. Returns the number of ticks.
    pub fn run(&mut self) -> u64 {
        if self.nodes.is_empty() {
            tracing::warn!("no nodes configured, nothing to run");
            return 0;
        }

        tracing::info!(nodes = self.nodes.len(), "starting");
        let mut drain: Option<u64> = None;

        loop {
            if self.max_ticks.is_some_and(|max| self.ticks >= max) {
                tracing::info!(ticks = self.ticks, "reached tick limit");
                break;
            }

            self.step();

            if drain.is_none() && self.nodes.iter().any(|n| n.finished()) {
                tracing::info!(ticks = self.ticks, "source finished, draining");
                drain = Some(DRAIN_TICKS);
            }
            match drain {
                Some(0) => break,
                Some(ref mut left) => *left -= 1,
                None => {}
            }

            if !self.period.is_zero() {
                thread::sleep(self.period);
            }
        }

        for n in self.nodes.iter_mut() {
            n.terminate();
        }
        tracing::info!(ticks = self.ticks, "stopped");

        self.ticks
    }
}
