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

//! Module that introduces a formatter to display all types containing a `NodeId` or a `LinkId`
//! with the names of the nodes.

use std::fmt::Write;

use ipnet::Ipv4Net;
use itertools::Itertools;

use crate::{
    event::Event,
    rip::{RipMessage, RouteEntry, RoutingTable},
    record::{RouteChange, TableSnapshot},
    topology::Topology,
    types::{Endpoint, LinkId, NetworkError, NodeId, StepUpdate},
};

/// Trait to format a type that contains node or link ids
pub trait NetworkFormatter<'a, 't> {
    /// Type that is returned, which implements `std::fmt::Display`.
    type Formatter;

    /// Return a struct that can be formatted and displayed. Unknown ids are shown as `?`.
    fn fmt(&'a self, topo: &'t Topology) -> Self::Formatter;
}

impl<'a, 't> NetworkFormatter<'a, 't> for NodeId {
    type Formatter = &'t str;

    fn fmt(&'a self, topo: &'t Topology) -> Self::Formatter {
        topo.name(*self)
    }
}

impl<'a, 't> NetworkFormatter<'a, 't> for Endpoint {
    type Formatter = String;

    fn fmt(&'a self, topo: &'t Topology) -> Self::Formatter {
        format!("{}[{}]", self.node.fmt(topo), self.interface)
    }
}

impl<'a, 't> NetworkFormatter<'a, 't> for LinkId {
    type Formatter = String;

    fn fmt(&'a self, topo: &'t Topology) -> Self::Formatter {
        match topo.link(*self) {
            Ok(l) => format!(
                "{} -- {}",
                l.endpoints[0].node.fmt(topo),
                l.endpoints[1].node.fmt(topo)
            ),
            Err(_) => "?".to_string(),
        }
    }
}

//
// Events
//

impl<'a, 't> NetworkFormatter<'a, 't> for RipMessage {
    type Formatter = String;

    fn fmt(&'a self, _topo: &'t Topology) -> Self::Formatter {
        match self {
            RipMessage::Request => "Request".to_string(),
            RipMessage::Response(entries) => format!(
                "Response [{}]",
                entries
                    .iter()
                    .map(|e| format!("{}: {}", e.network, e.metric))
                    .join(", ")
            ),
        }
    }
}

impl<'a, 't> NetworkFormatter<'a, 't> for Event {
    type Formatter = String;

    fn fmt(&'a self, topo: &'t Topology) -> Self::Formatter {
        match self {
            Event::PeriodicUpdate(n) => format!("Periodic update at {}", n.fmt(topo)),
            Event::TriggeredUpdate(n) => format!("Triggered update at {}", n.fmt(topo)),
            Event::Tick(n) => format!("Tick at {}", n.fmt(topo)),
            Event::Message {
                from, to, message, ..
            } => format!(
                "RIP {} => {}: {}",
                from.fmt(topo),
                to.fmt(topo),
                message.fmt(topo)
            ),
            Event::LinkState { link, up } => format!(
                "Link {} {}",
                link.fmt(topo),
                if *up { "up" } else { "down" }
            ),
            Event::Packet { at, packet } => format!(
                "{:?} {} -> {} (seq {}, ttl {}) arrives at {}",
                packet.kind,
                packet.src,
                packet.dst,
                packet.seq,
                packet.ttl,
                at.fmt(topo)
            ),
            Event::ProbeSend(p) => format!("Probe {p} sends a request"),
            Event::ProbeTimeout { probe, seq } => format!("Probe {probe} timeout of {seq}"),
            Event::Snapshot(Some(n)) => format!("Snapshot of {}", n.fmt(topo)),
            Event::Snapshot(None) => "Snapshot of all routers".to_string(),
            Event::Action(a) => format!("Action: {}", a.description()),
        }
    }
}

//
// Routing tables
//

impl<'a, 't> NetworkFormatter<'a, 't> for StepUpdate {
    type Formatter = String;

    fn fmt(&'a self, _topo: &'t Topology) -> Self::Formatter {
        let f = |x: &Option<(u32, u32)>| match x {
            Some((iface, metric)) => format!("if {iface} metric {metric}"),
            None => "X".to_string(),
        };
        format!("{}: {} => {}", self.destination, f(&self.old), f(&self.new))
    }
}

impl<'a, 't> NetworkFormatter<'a, 't> for RouteChange {
    type Formatter = String;

    fn fmt(&'a self, topo: &'t Topology) -> Self::Formatter {
        format!(
            "{:.3} {}: {}",
            self.time,
            self.node.fmt(topo),
            self.update.fmt(topo)
        )
    }
}

impl<'a, 't> NetworkFormatter<'a, 't> for RouteEntry {
    type Formatter = String;

    fn fmt(&'a self, topo: &'t Topology) -> Self::Formatter {
        let via = match self.next_hop {
            Some(n) => format!("via {}", n.fmt(topo)),
            None => "connected".to_string(),
        };
        format!(
            "{} metric {} on if {} {}{}",
            self.destination,
            self.metric,
            self.interface,
            via,
            if self.is_valid() { "" } else { " (invalid)" }
        )
    }
}

impl<'a, 't> NetworkFormatter<'a, 't> for RoutingTable {
    type Formatter = String;

    fn fmt(&'a self, topo: &'t Topology) -> Self::Formatter {
        self.iter().map(|e| e.fmt(topo)).join("\n")
    }
}

/// Width of the columns of the routing table printout.
const COL: usize = 16;

impl<'a, 't> NetworkFormatter<'a, 't> for TableSnapshot {
    type Formatter = String;

    /// Print the table in the style of `route -n`. Only valid routes are shown.
    fn fmt(&'a self, _topo: &'t Topology) -> Self::Formatter {
        let mut s = String::new();
        let f = &mut s;
        // writing to a string cannot fail.
        let _ = writeln!(
            f,
            "Node: {}, Time: +{}s, IPv4 RIP table",
            self.name, self.time
        );
        let _ = writeln!(
            f,
            "{:<COL$}{:<COL$}{:<COL$}{:<6}{:<7}{:<7}{:<4}Iface",
            "Destination", "Gateway", "Genmask", "Flags", "Metric", "Ref", "Use"
        );
        for e in self.entries.iter().filter(|e| e.valid) {
            let gateway = e
                .next_hop
                .map(|a| a.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            let flags = if e.next_hop.is_some() { "UG" } else { "U" };
            let _ = writeln!(
                f,
                "{:<COL$}{:<COL$}{:<COL$}{:<6}{:<7}{:<7}{:<4}{}",
                e.destination.network().to_string(),
                gateway,
                netmask(&e.destination),
                flags,
                e.metric,
                "-",
                "-",
                e.interface
            );
        }
        s
    }
}

fn netmask(net: &Ipv4Net) -> String {
    net.netmask().to_string()
}

impl<'a, 't> NetworkFormatter<'a, 't> for NetworkError {
    type Formatter = String;

    fn fmt(&'a self, topo: &'t Topology) -> Self::Formatter {
        match self {
            NetworkError::NodeNotFound(n) => format!("Node {} was not found", n.index()),
            NetworkError::InterfaceNotFound(n, i) => {
                format!("Interface {i} does not exist on {}", n.fmt(topo))
            }
            NetworkError::NotARouter(n) => format!("{} is not a router", n.fmt(topo)),
            NetworkError::NotAHost(n) => format!("{} is not a host", n.fmt(topo)),
            NetworkError::DuplicateAddress(a, n, i) => format!(
                "Address {a} overlaps with interface {i} of {}",
                n.fmt(topo)
            ),
            NetworkError::SelfLoop(n) => format!("Cannot connect {} with itself", n.fmt(topo)),
            NetworkError::LoopbackInterface(n) => {
                format!("Cannot reconfigure the loopback of {}", n.fmt(topo))
            }
            NetworkError::NoAddress(n) => format!("{} has no address", n.fmt(topo)),
            e => e.to_string(),
        }
    }
}
