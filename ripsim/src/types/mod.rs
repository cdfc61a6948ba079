// RipSim: Distance-Vector Routing Simulator written in Rust
// Copyright (C) 2022-2023 Tibor Schneider <sctibor@ethz.ch>
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

//! Module containing all type definitions

use ipnet::Ipv4Net;
use petgraph::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) type IndexType = u32;
/// Node Identification (and index into the topology graph)
pub type NodeId = NodeIndex<IndexType>;
/// Link Identification (and edge index into the topology graph)
pub type LinkId = EdgeIndex<IndexType>;
/// Interface number of a node. Interfaces are numbered sequentially in the order in which links
/// are attached to the node. Interface `0` is always the loopback.
pub type IfIndex = u32;

/// Hop-count metric of a route.
pub type Metric = u32;

/// Metric signaling that a destination is unreachable.
pub const INFINITY: Metric = 16;

/// Add two metrics, clamping the result at [`INFINITY`]. This prevents count-to-infinity from
/// growing a metric without bound.
pub fn add_metric(a: Metric, b: Metric) -> Metric {
    let sum = a.saturating_add(b);
    if sum > INFINITY {
        log::trace!("Clamping metric {a} + {b} to infinity");
        INFINITY
    } else {
        sum
    }
}

/// One end of a link: the node and its interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// The node on this end of the link.
    pub node: NodeId,
    /// Interface of the node that the link is attached to.
    pub interface: IfIndex,
}

impl Endpoint {
    /// Create a new endpoint
    pub fn new(node: NodeId, interface: IfIndex) -> Self {
        Self { node, interface }
    }
}

/// How does a routing table entry change after an event has been processed?
///
/// `old` and `new` contain the outgoing interface and the metric, or `None` if the destination
/// was (or is now) unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepUpdate {
    /// Which destination was affected
    pub destination: Ipv4Net,
    /// Old interface and metric
    pub old: Option<(IfIndex, Metric)>,
    /// New interface and metric
    pub new: Option<(IfIndex, Metric)>,
}

impl StepUpdate {
    /// Create a new StepUpdate
    pub fn new(
        destination: Ipv4Net,
        old: Option<(IfIndex, Metric)>,
        new: Option<(IfIndex, Metric)>,
    ) -> Self {
        Self {
            destination,
            old,
            new,
        }
    }

    /// Returns `true` if the state has changed.
    pub fn changed(&self) -> bool {
        self.old != self.new
    }
}

/// Scheduler errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SchedulerError {
    /// The event would fire at or before the current virtual time.
    #[error("Cannot schedule an event at {at}, the clock is already at {now}")]
    PastDeadline {
        /// Requested time
        at: f64,
        /// Current virtual time
        now: f64,
    },
    /// The time is not a number.
    #[error("Invalid time: {0}")]
    InvalidTime(f64),
}

/// Network Errors
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Scheduling error
    #[error("Scheduler Error: {0}")]
    SchedulerError(#[from] SchedulerError),
    /// Node is not present in the topology
    #[error("Node was not found in topology: {0:?}")]
    NodeNotFound(NodeId),
    /// Node name is not present in the topology
    #[error("Node name was not found in topology: {0}")]
    NodeNameNotFound(String),
    /// Link is not present in the topology
    #[error("Link does not exist: {0:?}")]
    LinkNotFound(LinkId),
    /// Interface is not present on the node
    #[error("Interface {1} does not exist on node {0:?}")]
    InterfaceNotFound(NodeId, IfIndex),
    /// The node is a host and does not run the routing protocol.
    #[error("Node {0:?} is not a router")]
    NotARouter(NodeId),
    /// The node is a router, but a host was expected.
    #[error("Node {0:?} is not a host")]
    NotAHost(NodeId),
    /// Address already in use, or overlapping with another network of the same node.
    #[error("Address {0} overlaps with the address of interface {2} on node {1:?}")]
    DuplicateAddress(Ipv4Net, NodeId, IfIndex),
    /// A link must connect two distinct nodes.
    #[error("Cannot connect node {0:?} with itself")]
    SelfLoop(NodeId),
    /// The loopback interface cannot be reconfigured.
    #[error("Cannot reconfigure the loopback interface of {0:?}")]
    LoopbackInterface(NodeId),
    /// The network is too small to assign addresses to both ends of a link.
    #[error("Network {0} has not enough host addresses for a link")]
    NetworkTooSmall(Ipv4Net),
    /// Invalid link delay or data rate.
    #[error("Invalid link parameter: {0}")]
    InvalidLinkParameter(String),
    /// A timer of the routing protocol is not a positive, finite number of seconds.
    #[error("Invalid value of the protocol timer {0}: {1}")]
    InvalidTimer(&'static str, f64),
    /// The probe does not exist.
    #[error("Probe {0} does not exist")]
    ProbeNotFound(usize),
    /// The node has no address from which it could send a probe.
    #[error("Node {0:?} has no address assigned")]
    NoAddress(NodeId),
    /// Json error
    #[error("{0}")]
    JsonError(Box<serde_json::Error>),
}

impl NetworkError {
    /// Returns `true` if the error was caused by referencing a node, link, or interface that does
    /// not exist.
    pub fn is_invalid_reference(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound(_)
                | Self::NodeNameNotFound(_)
                | Self::LinkNotFound(_)
                | Self::InterfaceNotFound(_, _)
                | Self::ProbeNotFound(_)
        )
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(value: serde_json::Error) -> Self {
        Self::JsonError(Box::new(value))
    }
}

impl PartialEq for NetworkError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::SchedulerError(l0), Self::SchedulerError(r0)) => l0 == r0,
            (Self::NodeNotFound(l0), Self::NodeNotFound(r0)) => l0 == r0,
            (Self::NodeNameNotFound(l0), Self::NodeNameNotFound(r0)) => l0 == r0,
            (Self::LinkNotFound(l0), Self::LinkNotFound(r0)) => l0 == r0,
            (Self::InterfaceNotFound(l0, l1), Self::InterfaceNotFound(r0, r1)) => {
                l0 == r0 && l1 == r1
            }
            (Self::NotARouter(l0), Self::NotARouter(r0)) => l0 == r0,
            (Self::NotAHost(l0), Self::NotAHost(r0)) => l0 == r0,
            (Self::DuplicateAddress(l0, l1, l2), Self::DuplicateAddress(r0, r1, r2)) => {
                l0 == r0 && l1 == r1 && l2 == r2
            }
            (Self::SelfLoop(l0), Self::SelfLoop(r0)) => l0 == r0,
            (Self::LoopbackInterface(l0), Self::LoopbackInterface(r0)) => l0 == r0,
            (Self::NetworkTooSmall(l0), Self::NetworkTooSmall(r0)) => l0 == r0,
            (Self::InvalidLinkParameter(l0), Self::InvalidLinkParameter(r0)) => l0 == r0,
            (Self::InvalidTimer(l0, l1), Self::InvalidTimer(r0, r1)) => l0 == r0 && l1 == r1,
            (Self::ProbeNotFound(l0), Self::ProbeNotFound(r0)) => l0 == r0,
            (Self::NoAddress(l0), Self::NoAddress(r0)) => l0 == r0,
            (Self::JsonError(l), Self::JsonError(r)) => l.to_string() == r.to_string(),
            _ => false,
        }
    }
}
