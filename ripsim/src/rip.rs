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

//! # Distance-Vector Routing Table
//!
//! This module contains the routing table of a single router together with the rules to apply
//! received advertisements, age routes, and generate advertisements according to the configured
//! [`SplitHorizon`] mode. The table never contains two entries for the same destination, and no
//! metric ever exceeds [`INFINITY`].

use std::{collections::BTreeMap, fmt, net::Ipv4Addr, str::FromStr};

use ipnet::Ipv4Net;
use log::*;
use serde::{Deserialize, Serialize};

use crate::types::{add_metric, Endpoint, IfIndex, Metric, NetworkError, StepUpdate, INFINITY};

/// How routes are advertised back on the interface over which they were learned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SplitHorizon {
    /// Advertise every route on every interface.
    NoSplitHorizon,
    /// Do not advertise routes on their own interface.
    SplitHorizon,
    /// Advertise routes on their own interface with an infinite metric.
    #[default]
    PoisonReverse,
}

impl fmt::Display for SplitHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitHorizon::NoSplitHorizon => write!(f, "NoSplitHorizon"),
            SplitHorizon::SplitHorizon => write!(f, "SplitHorizon"),
            SplitHorizon::PoisonReverse => write!(f, "PoisonReverse"),
        }
    }
}

impl FromStr for SplitHorizon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "nosplithorizon" | "none" => Ok(Self::NoSplitHorizon),
            "splithorizon" | "split" => Ok(Self::SplitHorizon),
            "poisonreverse" | "poison" => Ok(Self::PoisonReverse),
            _ => Err(format!(
                "unknown split horizon strategy `{s}` (expected NoSplitHorizon, SplitHorizon, or PoisonReverse)"
            )),
        }
    }
}

/// Timers and options of the routing protocol. All times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RipConfig {
    /// Interval between two periodic updates
    pub update_interval: f64,
    /// Time after which a route (or neighbor) that was not refreshed becomes invalid.
    pub failure_timeout: f64,
    /// Time an invalid route is kept (and advertised as unreachable) before it is removed.
    pub garbage_collection_delay: f64,
    /// Delay of a triggered update after the first change that requested it.
    pub triggered_update_delay: f64,
    /// Interval of the housekeeping timer.
    pub tick_interval: f64,
    /// Split-horizon mode
    pub split_horizon: SplitHorizon,
}

impl Default for RipConfig {
    fn default() -> Self {
        Self {
            update_interval: 30.0,
            failure_timeout: 180.0,
            garbage_collection_delay: 120.0,
            triggered_update_delay: 1.0,
            tick_interval: 1.0,
            split_horizon: SplitHorizon::default(),
        }
    }
}

impl RipConfig {
    /// Check that all timers are positive and finite.
    pub fn check(&self) -> Result<(), NetworkError> {
        [
            ("update_interval", self.update_interval),
            ("failure_timeout", self.failure_timeout),
            ("garbage_collection_delay", self.garbage_collection_delay),
            ("triggered_update_delay", self.triggered_update_delay),
            ("tick_interval", self.tick_interval),
        ]
        .into_iter()
        .try_for_each(|(name, value)| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(NetworkError::InvalidTimer(name, value))
            }
        })
    }

    /// Set the split horizon mode
    pub fn with_split_horizon(mut self, split_horizon: SplitHorizon) -> Self {
        self.split_horizon = split_horizon;
        self
    }
}

/// A single advertised destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RipEntry {
    /// Destination network
    pub network: Ipv4Net,
    /// Metric of the sender
    pub metric: Metric,
}

/// Message of the routing protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RipMessage {
    /// Ask the neighbor to send its full table.
    Request,
    /// Table of the sender (or a part of it).
    Response(Vec<RipEntry>),
}

/// Size of the IP and UDP header plus the RIP header, in bytes.
const RIP_HEADER_SIZE: usize = 20 + 8 + 4;
/// Size of a single route table entry on the wire.
const RIP_ENTRY_SIZE: usize = 20;
/// Maximum number of entries in a single RIP message.
const RIP_MAX_ENTRIES: usize = 25;

/// Size of the frame that carries any routing message, in bytes. Every message is transmitted as
/// a full frame, such that its delay does not depend on the number of (possibly poisoned)
/// entries.
pub const RIP_FRAME_SIZE: usize = RIP_HEADER_SIZE + RIP_ENTRY_SIZE * RIP_MAX_ENTRIES;

/// Entry of the routing table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Destination network
    pub destination: Ipv4Net,
    /// Hop count (including the interface costs)
    pub metric: Metric,
    /// Outgoing interface
    pub interface: IfIndex,
    /// Neighbor from which the route was learned. `None` for connected routes.
    pub next_hop: Option<Endpoint>,
    /// Time of the last update or refresh
    pub last_update: f64,
    /// Time at which the route became invalid.
    pub invalid_since: Option<f64>,
}

impl RouteEntry {
    /// Returns `true` if the destination is reachable.
    pub fn is_valid(&self) -> bool {
        self.metric < INFINITY
    }

    /// Returns `true` if the destination is directly connected.
    pub fn is_connected(&self) -> bool {
        self.next_hop.is_none()
    }

    fn state(&self) -> (IfIndex, Metric) {
        (self.interface, self.metric)
    }

    fn invalidate(&mut self, now: f64) -> StepUpdate {
        let old = self.state();
        self.metric = INFINITY;
        self.invalid_since = Some(now);
        StepUpdate::new(self.destination, Some(old), Some(self.state()))
    }
}

/// Routing table of a router, ordered by destination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingTable {
    entries: BTreeMap<Ipv4Net, RouteEntry>,
}

impl RoutingTable {
    /// Create an empty routing table
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry for a destination
    pub fn get(&self, destination: &Ipv4Net) -> Option<&RouteEntry> {
        self.entries.get(destination)
    }

    /// Iterate over all entries, ordered by destination.
    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.values()
    }

    /// Number of entries (including invalid ones)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Install (or refresh) a directly connected route. Any learned route for the same
    /// destination is replaced.
    pub fn install_connected(
        &mut self,
        destination: Ipv4Net,
        interface: IfIndex,
        metric: Metric,
        now: f64,
    ) -> Option<StepUpdate> {
        let new = RouteEntry {
            destination,
            metric,
            interface,
            next_hop: None,
            last_update: now,
            invalid_since: None,
        };
        let old = self.entries.insert(destination, new);
        let update = StepUpdate::new(destination, old.map(|e| e.state()), Some(new.state()));
        match old {
            Some(old) if old.is_connected() && old.state() == new.state() => None,
            _ => Some(update),
        }
    }

    /// Apply a single advertised entry received on `interface` (with cost `cost`) from `from`.
    /// Returns the change of the table, if any.
    ///
    /// - Unknown destinations are added unless they are unreachable.
    /// - A valid connected route is never replaced.
    /// - Advertisements over the current interface always overwrite the route.
    /// - Advertisements over any other interface only replace the route if strictly better.
    pub fn apply_update(
        &mut self,
        entry: &RipEntry,
        interface: IfIndex,
        cost: Metric,
        from: Endpoint,
        now: f64,
    ) -> Option<StepUpdate> {
        let metric = add_metric(entry.metric, cost);
        let destination = entry.network;

        let Some(current) = self.entries.get_mut(&destination) else {
            if metric >= INFINITY {
                return None;
            }
            let new = RouteEntry {
                destination,
                metric,
                interface,
                next_hop: Some(from),
                last_update: now,
                invalid_since: None,
            };
            self.entries.insert(destination, new);
            return Some(StepUpdate::new(destination, None, Some(new.state())));
        };

        if current.is_connected() && current.is_valid() {
            return None;
        }

        let old = current.state();
        if current.interface == interface && !current.is_connected() {
            if metric == current.metric {
                // refresh only the timer of a valid route. Invalid routes must keep their
                // deletion time.
                if current.is_valid() {
                    current.last_update = now;
                }
                return None;
            }
            current.metric = metric;
            current.next_hop = Some(from);
            current.last_update = now;
            current.invalid_since = if metric >= INFINITY { Some(now) } else { None };
        } else if metric < current.metric {
            *current = RouteEntry {
                destination,
                metric,
                interface,
                next_hop: Some(from),
                last_update: now,
                invalid_since: None,
            };
        } else {
            return None;
        }

        let update = StepUpdate::new(destination, Some(old), Some(current.state()));
        debug!(
            "Route to {} changed: {:?} => {:?}",
            destination, update.old, update.new
        );
        Some(update)
    }

    /// Invalidate every valid route through `interface`, including its connected route.
    pub fn invalidate_interface(&mut self, interface: IfIndex, now: f64) -> Vec<StepUpdate> {
        self.entries
            .values_mut()
            .filter(|e| e.interface == interface && e.is_valid())
            .map(|e| e.invalidate(now))
            .collect()
    }

    /// Invalidate every valid route that was learned over `interface`.
    pub fn invalidate_learned(&mut self, interface: IfIndex, now: f64) -> Vec<StepUpdate> {
        self.entries
            .values_mut()
            .filter(|e| e.interface == interface && e.is_valid() && !e.is_connected())
            .map(|e| e.invalidate(now))
            .collect()
    }

    /// Invalidate every learned route that was not refreshed for longer than `timeout`.
    pub fn expire(&mut self, now: f64, timeout: f64) -> Vec<StepUpdate> {
        self.entries
            .values_mut()
            .filter(|e| e.is_valid() && !e.is_connected() && now - e.last_update > timeout)
            .map(|e| e.invalidate(now))
            .collect()
    }

    /// Remove all routes that are invalid for at least `delay`.
    pub fn collect_garbage(&mut self, now: f64, delay: f64) -> Vec<StepUpdate> {
        let garbage: Vec<Ipv4Net> = self
            .entries
            .values()
            .filter(|e| e.invalid_since.map(|t| now - t >= delay).unwrap_or(false))
            .map(|e| e.destination)
            .collect();
        garbage
            .into_iter()
            .filter_map(|d| self.entries.remove(&d))
            .map(|e| StepUpdate::new(e.destination, Some(e.state()), None))
            .collect()
    }

    /// Generate the advertisement sent out of `out_interface`.
    pub fn advertisement(&self, out_interface: IfIndex, mode: SplitHorizon) -> Vec<RipEntry> {
        self.entries
            .values()
            .filter_map(|e| {
                let own = e.interface == out_interface;
                let metric = match (mode, own) {
                    (SplitHorizon::SplitHorizon, true) => return None,
                    (SplitHorizon::PoisonReverse, true) => INFINITY,
                    _ => e.metric,
                };
                Some(RipEntry {
                    network: e.destination,
                    metric,
                })
            })
            .collect()
    }

    /// Longest-prefix match over all valid routes.
    pub fn lookup(&self, addr: Ipv4Addr) -> Option<&RouteEntry> {
        self.entries
            .values()
            .filter(|e| e.is_valid() && e.destination.contains(&addr))
            .max_by_key(|e| e.destination.prefix_len())
    }
}
