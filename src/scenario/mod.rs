// RipScenarios: Distance-vector routing scenarios
// Copyright (C) 2023 Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # Scenarios
//!
//! A scenario builds one of the topologies, assigns the addresses, excludes the host links from
//! the routing protocol, configures the default routes of both hosts, applies metric overrides,
//! schedules link failures and routing table snapshots, and installs the probe from the source
//! to the destination. All of this is described by a [`ScenarioConfig`].

mod chain;
mod ring;

use std::{fmt, fs, path::Path};

use clap::ValueEnum;
use ipnet::Ipv4Net;
use log::*;
use ripsim::{
    builder::LinkSelection,
    event::LinkAction,
    formatter::NetworkFormatter,
    network::{Network, SimulationConfig, DEFAULT_HORIZON},
    probe::{Probe, ProbeId},
    rip::RipConfig,
    topology::Topology,
    types::{IfIndex, LinkId, Metric, NetworkError, NodeId},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::report::Report;

pub use ring::RING_ORDER;

/// Times at which the routing tables of all routers are recorded by default.
pub const DEFAULT_SNAPSHOTS: [f64; 3] = [30.0, 60.0, 90.0];

/// Error thrown while building or running a scenario
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Error of the simulator
    #[error("{0}")]
    Network(#[from] NetworkError),
    /// Cannot read or write a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Cannot parse or generate JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Two nodes referenced in the configuration are not connected.
    #[error("There is no link between {0} and {1}")]
    NoLink(String, String),
    /// The configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// The topology of a scenario
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    /// Ring of seven routers `A` to `G`, with the source attached to `A` and the destination
    /// attached to `B`.
    #[default]
    Ring,
    /// Chain of routers between the source and the destination, with optional shortcut links.
    Chain,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioKind::Ring => write!(f, "ring"),
            ScenarioKind::Chain => write!(f, "chain"),
        }
    }
}

/// Parameters of the chain topology.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Number of routers in the chain (at least 2)
    pub routers: usize,
    /// Connect each router with the router two positions further down the chain.
    pub shortcuts: bool,
    /// Take down some of the shortcut links during the run.
    pub removal: Option<ShortcutRemoval>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            routers: 4,
            shortcuts: false,
            removal: None,
        }
    }
}

/// Random removal of shortcut links.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortcutRemoval {
    /// Time at which the selected shortcuts go down.
    pub time: f64,
    /// How the shortcuts are selected. The random number generator is seeded with
    /// [`ScenarioConfig::seed`].
    pub selection: LinkSelection,
}

impl Default for ShortcutRemoval {
    fn default() -> Self {
        Self {
            time: 40.0,
            selection: LinkSelection::ExactlyOne,
        }
    }
}

/// A link state change between two named nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureConfig {
    /// Time of the change
    pub time: f64,
    /// Name of the first node
    pub a: String,
    /// Name of the second node
    pub b: String,
    /// Take the link down (default), or bring it back up.
    #[serde(default = "link_down")]
    pub action: LinkAction,
}

/// Default action of a [`FailureConfig`].
fn link_down() -> LinkAction {
    LinkAction::Down
}

impl FailureConfig {
    /// Take down the link between `a` and `b` at `time`.
    pub fn down(time: f64, a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            time,
            a: a.into(),
            b: b.into(),
            action: LinkAction::Down,
        }
    }

    /// Bring the link between `a` and `b` back up at `time`.
    pub fn up(time: f64, a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            action: LinkAction::Up,
            ..Self::down(time, a, b)
        }
    }
}

/// Override the metric of a single interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricOverride {
    /// Name of the node
    pub node: String,
    /// Index of the interface (interface 0 is the loopback)
    pub interface: IfIndex,
    /// New metric
    pub metric: Metric,
}

/// Parameters of the probe from the source to the destination. All times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Time between two requests
    pub interval: f64,
    /// Time of the first request
    pub start: f64,
    /// No request is sent at or after this time.
    pub stop: f64,
    /// Packet size in bytes
    pub size: usize,
    /// Time after which a request is considered lost
    pub timeout: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval: 1.0,
            start: 1.0,
            stop: 200.0,
            size: 1024,
            timeout: 1.0,
        }
    }
}

/// Configuration of a scenario. Every field has a default, such that a JSON file only needs to
/// contain the fields that differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Which topology to build
    pub kind: ScenarioKind,
    /// Parameters of the chain topology (ignored for the ring)
    pub chain: ChainConfig,
    /// Configuration of the routing protocol
    pub rip: RipConfig,
    /// End of the simulation in seconds
    pub horizon: f64,
    /// Link state changes. If `None`, the default failures of the topology are used (the ring
    /// loses the link between `F` and `G` at 40 seconds, and the chain has no failures).
    pub failures: Option<Vec<FailureConfig>>,
    /// Interface metric overrides
    pub metric_overrides: Vec<MetricOverride>,
    /// Times at which the routing tables of all routers are recorded.
    pub snapshots: Vec<f64>,
    /// The probe from the source to the destination, or `None` to disable it.
    pub probe: Option<ProbeConfig>,
    /// Seed for the random number generator.
    pub seed: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            kind: ScenarioKind::Ring,
            chain: ChainConfig::default(),
            rip: RipConfig::default(),
            horizon: DEFAULT_HORIZON,
            failures: None,
            metric_overrides: Vec::new(),
            snapshots: DEFAULT_SNAPSHOTS.to_vec(),
            probe: Some(ProbeConfig::default()),
            seed: 0,
        }
    }
}

impl ScenarioConfig {
    /// Default configuration of the ring scenario
    pub fn ring() -> Self {
        Self::default()
    }

    /// Default configuration of a chain with `routers` routers.
    pub fn chain(routers: usize) -> Self {
        Self {
            kind: ScenarioKind::Chain,
            chain: ChainConfig {
                routers,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON.
    pub fn from_json(s: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read the configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Generate the JSON representation of the configuration.
    pub fn to_json(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The link state changes of this scenario, either configured explicitly, or the default
    /// ones of the topology.
    pub fn failures(&self) -> Vec<FailureConfig> {
        match (&self.failures, self.kind) {
            (Some(f), _) => f.clone(),
            (None, ScenarioKind::Ring) => ring::default_failures(),
            (None, ScenarioKind::Chain) => Vec::new(),
        }
    }

    /// Build the topology and the network of this scenario.
    pub fn build(&self) -> Result<Scenario, ScenarioError> {
        if !(self.horizon.is_finite() && self.horizon > 0.0) {
            return Err(ScenarioError::InvalidConfig(format!(
                "horizon must be positive, but was {}",
                self.horizon
            )));
        }
        self.rip
            .check()
            .map_err(|e| ScenarioError::InvalidConfig(e.to_string()))?;
        let layout = match self.kind {
            ScenarioKind::Ring => ring::build()?,
            ScenarioKind::Chain => chain::build(&self.chain, self.seed)?,
        };
        self.finish(layout)
    }

    /// Configure the network on top of a freshly built topology.
    fn finish(&self, layout: Layout) -> Result<Scenario, ScenarioError> {
        let Layout {
            mut topo,
            source,
            destination,
            shortcuts,
            removed,
        } = layout;

        for o in self.metric_overrides.iter() {
            let node = topo.node_id(&o.node)?;
            topo.set_interface_metric(node, o.interface, o.metric)?;
        }

        // resolve the named failures before the topology is moved into the network
        let failures = self
            .failures()
            .into_iter()
            .map(|f| {
                let link = find_link(&topo, &f.a, &f.b)?;
                Ok((f.time, link, f.action))
            })
            .collect::<Result<Vec<_>, ScenarioError>>()?;

        let mut network = Network::new(
            topo,
            SimulationConfig {
                rip: self.rip,
                horizon: self.horizon,
                scheduled_failures: Vec::new(),
            },
        );
        network.set_default_route(source, 1)?;
        network.set_default_route(destination, 1)?;

        for (time, link, action) in failures {
            network.schedule_link_state(time, link, action.is_up())?;
        }
        if let Some(removal) = self.chain.removal {
            for link in removed.iter() {
                debug!(
                    "Remove the shortcut {} at {}s",
                    link.fmt(network.topology()),
                    removal.time
                );
                network.schedule_link_state(removal.time, *link, false)?;
            }
        }
        for time in self.snapshots.iter() {
            network.request_snapshot(*time, None)?;
        }

        let probe = match self.probe {
            Some(p) => {
                let target = network
                    .topology()
                    .node(destination)?
                    .primary_address()
                    .ok_or(NetworkError::NoAddress(destination))?;
                Some(
                    network.add_probe(
                        Probe::new(source, target)
                            .interval(p.interval)
                            .active(p.start, p.stop)
                            .size(p.size)
                            .timeout(p.timeout),
                    )?,
                )
            }
            None => None,
        };

        Ok(Scenario {
            kind: self.kind,
            network,
            source,
            destination,
            probe,
            shortcuts,
            removed,
        })
    }
}

/// Parse one of the fixed networks of the scenarios.
fn network(s: &str) -> Result<Ipv4Net, ScenarioError> {
    s.parse()
        .map_err(|_| ScenarioError::InvalidConfig(format!("invalid network {s}")))
}

/// Find the link between two named nodes.
fn find_link(topo: &Topology, a: &str, b: &str) -> Result<LinkId, ScenarioError> {
    let (x, y) = (topo.node_id(a)?, topo.node_id(b)?);
    topo.link_between(x, y)
        .ok_or_else(|| ScenarioError::NoLink(a.to_string(), b.to_string()))
}

/// Topology of a scenario before the network is created.
#[derive(Debug)]
struct Layout {
    /// The topology, with all addresses assigned
    topo: Topology,
    /// The source host
    source: NodeId,
    /// The destination host
    destination: NodeId,
    /// All shortcut links
    shortcuts: Vec<LinkId>,
    /// Shortcut links selected for removal
    removed: Vec<LinkId>,
}

/// A scenario ready to run.
#[derive(Debug)]
pub struct Scenario {
    /// The topology of the scenario
    pub kind: ScenarioKind,
    /// The network, including all scheduled events
    pub network: Network,
    /// The source host
    pub source: NodeId,
    /// The destination host
    pub destination: NodeId,
    /// The probe from the source to the destination, if enabled
    pub probe: Option<ProbeId>,
    /// All shortcut links (only in the chain)
    pub shortcuts: Vec<LinkId>,
    /// Shortcut links that are taken down during the run
    pub removed: Vec<LinkId>,
}

impl Scenario {
    /// Run the simulation until the horizon and summarize the result.
    pub fn run(&mut self) -> Result<Report, ScenarioError> {
        info!(
            "Run the {} scenario with {} until {}s",
            self.kind,
            self.network.config().rip.split_horizon,
            self.network.config().horizon
        );
        self.network.run()?;
        Ok(Report::new(self))
    }
}
