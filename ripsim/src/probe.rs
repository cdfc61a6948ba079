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

//! # Traffic Probe
//!
//! A probe periodically sends echo requests from a node to a destination address. The
//! destination answers every request with an echo reply. Packets are forwarded hop by hop, using
//! the routing table of each router (or the connected networks and the default route of hosts).

use std::{collections::BTreeMap, net::Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::{
    event::EventId,
    rip::RoutingTable,
    topology::Topology,
    types::{IfIndex, NetworkError, NodeId},
};

/// Identification of a probe
pub type ProbeId = usize;

/// Initial time-to-live of every packet.
pub const DEFAULT_TTL: u8 = 64;

/// Echo application sending requests from `source` to `destination`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    /// Node that sends the requests
    pub source: NodeId,
    /// Address to which the requests are sent
    pub destination: Ipv4Addr,
    /// Time between two requests
    pub interval: f64,
    /// Time of the first request
    pub start: f64,
    /// No request is sent at or after this time.
    pub stop: f64,
    /// Packet size in bytes
    pub size: usize,
    /// Time after which a request without reply is considered lost.
    pub timeout: f64,
}

impl Probe {
    /// Create a new probe that sends a 1024-byte request every second from `1s` to `200s`.
    pub fn new(source: NodeId, destination: Ipv4Addr) -> Self {
        Self {
            source,
            destination,
            interval: 1.0,
            start: 1.0,
            stop: 200.0,
            size: 1024,
            timeout: 1.0,
        }
    }

    /// Set the interval between two requests
    pub fn interval(mut self, interval: f64) -> Self {
        self.interval = interval;
        self
    }

    /// Set the time of the first and the end of the last request.
    pub fn active(mut self, start: f64, stop: f64) -> Self {
        self.start = start;
        self.stop = stop;
        self
    }

    /// Set the size of each packet
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Set the timeout after which a request is considered lost.
    pub fn timeout(mut self, timeout: f64) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn check(&self) -> Result<(), NetworkError> {
        let positive = |x: f64| x.is_finite() && x > 0.0;
        if !positive(self.interval) || !positive(self.timeout) || self.start < 0.0 {
            return Err(NetworkError::InvalidLinkParameter(format!(
                "invalid probe timing: interval {}, timeout {}, start {}",
                self.interval, self.timeout, self.start
            )));
        }
        Ok(())
    }
}

/// Kind of a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    /// Echo request
    EchoRequest,
    /// Echo reply
    EchoReply,
}

/// A data packet of a probe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Probe that generated the packet
    pub probe: ProbeId,
    /// Sequence number of the request
    pub seq: u32,
    /// Request or reply
    pub kind: PacketKind,
    /// Source address
    pub src: Ipv4Addr,
    /// Destination address
    pub dst: Ipv4Addr,
    /// Remaining hops
    pub ttl: u8,
    /// Size in bytes
    pub size: usize,
    /// Time at which the request was sent
    pub sent_at: f64,
}

impl Packet {
    /// Create the echo reply for this request.
    pub fn reply(&self) -> Self {
        Self {
            kind: PacketKind::EchoReply,
            src: self.dst,
            dst: self.src,
            ttl: DEFAULT_TTL,
            ..*self
        }
    }
}

/// Why a packet was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropReason {
    /// No valid route towards the destination
    NoRoute,
    /// The outgoing interface (or the link) is down.
    InterfaceDown,
    /// The time-to-live reached zero.
    TtlExpired,
}

/// Forwarding decision of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarding {
    /// The packet is addressed to this node.
    Deliver,
    /// Send the packet out of the interface.
    Send(IfIndex),
}

/// Decide what a node does with a packet destined to `dst`. Routers use the longest-prefix match
/// on their valid routes. Hosts use their connected networks, and then their default route.
pub fn forward(
    topo: &Topology,
    node: NodeId,
    table: Option<&RoutingTable>,
    default_route: Option<IfIndex>,
    dst: Ipv4Addr,
) -> Result<Result<Forwarding, DropReason>, NetworkError> {
    let n = topo.node(node)?;
    if n.has_address(dst) {
        return Ok(Ok(Forwarding::Deliver));
    }
    let out = match table {
        Some(table) => table.lookup(dst).map(|e| e.interface),
        None => n
            .link_interfaces()
            .find(|i| i.up && i.address.map(|a| a.contains(&dst)).unwrap_or(false))
            .map(|i| i.index)
            .or(default_route),
    };
    let Some(out) = out else {
        return Ok(Err(DropReason::NoRoute));
    };
    let iface = topo.interface(node, out)?;
    let link_up = match iface.link {
        Some(link) => topo.link(link)?.up,
        None => false,
    };
    if iface.up && link_up {
        Ok(Ok(Forwarding::Send(out)))
    } else {
        Ok(Err(DropReason::InterfaceDown))
    }
}

/// Runtime state of a probe
#[derive(Debug, Clone)]
pub(crate) struct ProbeState {
    pub(crate) probe: Probe,
    pub(crate) next_seq: u32,
    /// Pending timeout events, indexed by the sequence number.
    pub(crate) pending: BTreeMap<u32, EventId>,
}

impl ProbeState {
    pub(crate) fn new(probe: Probe) -> Self {
        Self {
            probe,
            next_seq: 0,
            pending: BTreeMap::new(),
        }
    }
}
