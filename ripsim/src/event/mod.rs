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

//! Module for defining events

use std::fmt;

use serde::{Deserialize, Serialize};

mod queue;
pub use queue::{EventId, Scheduler};

use crate::{
    probe::{Packet, ProbeId},
    rip::RipMessage,
    topology::Topology,
    types::{Endpoint, LinkId, NetworkError, NodeId},
};

/// Event to handle
#[derive(Debug)]
pub enum Event {
    /// Send the regular update of the full routing table.
    PeriodicUpdate(NodeId),
    /// Send a (rate-limited) triggered update of the full routing table.
    TriggeredUpdate(NodeId),
    /// Housekeeping timer of a router: observe interface state, age routes and collect garbage.
    Tick(NodeId),
    /// Routing protocol message arriving at `to`, sent by `from` over `link`.
    Message {
        /// Link over which the message travels
        link: LinkId,
        /// Sender
        from: Endpoint,
        /// Receiver
        to: Endpoint,
        /// Content
        message: RipMessage,
    },
    /// Bring a link up or down.
    LinkState {
        /// The link to change
        link: LinkId,
        /// New state
        up: bool,
    },
    /// Data packet arriving at a node on an interface.
    Packet {
        /// Receiving node and interface
        at: Endpoint,
        /// The packet itself
        packet: Packet,
    },
    /// Send the next echo request of a probe.
    ProbeSend(ProbeId),
    /// Check whether an echo request was answered in time.
    ProbeTimeout {
        /// Which probe
        probe: ProbeId,
        /// Sequence number of the request
        seq: u32,
    },
    /// Take a snapshot of the routing table of a router, or of all routers if `None`.
    Snapshot(Option<NodeId>),
    /// Arbitrary modification of the topology.
    Action(ScheduledAction),
}

/// Boxed closure that modifies the topology at a scheduled time. The closure only receives the
/// topology; routers observe its effects on their next tick.
pub struct ScheduledAction {
    description: String,
    action: Box<dyn FnOnce(&mut Topology) -> Result<(), NetworkError>>,
}

impl ScheduledAction {
    /// Create a new action with a description that is used for logging and the record.
    pub fn new<F>(description: impl Into<String>, action: F) -> Self
    where
        F: FnOnce(&mut Topology) -> Result<(), NetworkError> + 'static,
    {
        Self {
            description: description.into(),
            action: Box::new(action),
        }
    }

    /// Description of the action
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Execute the action
    pub fn apply(self, topo: &mut Topology) -> Result<(), NetworkError> {
        (self.action)(topo)
    }
}

impl fmt::Debug for ScheduledAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScheduledAction")
            .field(&self.description)
            .finish()
    }
}

/// Desired state of a link at a scheduled time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkAction {
    /// Take the link down
    Down,
    /// Bring the link back up
    Up,
}

impl LinkAction {
    /// Returns `true` for [`LinkAction::Up`].
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Up)
    }
}

/// A link state change at a fixed time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkEvent {
    /// Time at which the change happens
    pub time: f64,
    /// The link to change
    pub link: LinkId,
    /// What happens to the link
    pub action: LinkAction,
}
