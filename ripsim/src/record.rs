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

//! # Records of a simulation run
//!
//! The [`Record`] collects everything that can be observed during a run: routing table snapshots,
//! every change of a routing table, link state changes, the outcome of every probe request, and
//! scheduled actions that failed. Outage intervals are derived from the probe records.

use std::{collections::BTreeMap, net::Ipv4Addr};

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::{
    probe::{DropReason, ProbeId},
    types::{IfIndex, LinkId, Metric, NetworkError, NodeId, StepUpdate},
};

/// A single row of a routing table snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Destination network
    pub destination: Ipv4Net,
    /// Metric of the route
    pub metric: Metric,
    /// Address of the neighbor, `None` for connected routes.
    pub next_hop: Option<Ipv4Addr>,
    /// Outgoing interface
    pub interface: IfIndex,
    /// Whether the route is valid.
    pub valid: bool,
}

/// Routing table of a router at a given time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// Time of the snapshot
    pub time: f64,
    /// The router
    pub node: NodeId,
    /// Name of the router
    pub name: String,
    /// All entries, ordered by destination
    pub entries: Vec<SnapshotEntry>,
}

/// A change of a routing table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteChange {
    /// Time of the change
    pub time: f64,
    /// Router whose table changed
    pub node: NodeId,
    /// The change
    pub update: StepUpdate,
}

/// A change of the link state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Time of the change
    pub time: f64,
    /// The link
    pub link: LinkId,
    /// New state
    pub up: bool,
}

/// What happened to a probe request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProbeOutcome {
    /// The request was sent.
    Sent,
    /// The reply was received in time.
    Received {
        /// Round-trip time
        rtt: f64,
    },
    /// No reply was received within the timeout.
    Timeout,
    /// The request or the reply was dropped.
    Dropped {
        /// Node that dropped the packet
        node: NodeId,
        /// Why it was dropped
        reason: DropReason,
    },
    /// The reply arrived after the timeout.
    Late {
        /// Round-trip time
        rtt: f64,
    },
}

/// Record of a single probe event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeRecord {
    /// Time of the event
    pub time: f64,
    /// The probe
    pub probe: ProbeId,
    /// Sequence number of the request
    pub seq: u32,
    /// What happened
    pub outcome: ProbeOutcome,
}

/// A scheduled action that returned an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedAction {
    /// Time of the action
    pub time: f64,
    /// Description of the action
    pub description: String,
    /// The error message
    pub error: String,
}

/// Interval in which a probe did not receive any reply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outage {
    /// Send time of the first request without reply
    pub start: f64,
    /// Send time of the next request that was answered, or `None` if no request was answered
    /// afterwards.
    pub end: Option<f64>,
    /// Number of requests without reply
    pub lost: u32,
}

impl Outage {
    /// Duration of the outage, if it ended.
    pub fn duration(&self) -> Option<f64> {
        self.end.map(|end| end - self.start)
    }
}

/// Everything observed during a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Routing table snapshots, in the order in which they were taken
    pub snapshots: Vec<TableSnapshot>,
    /// Every change of any routing table
    pub route_changes: Vec<RouteChange>,
    /// Link state changes
    pub link_changes: Vec<LinkRecord>,
    /// Probe events
    pub probes: Vec<ProbeRecord>,
    /// Failed scheduled actions
    pub failed_actions: Vec<FailedAction>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn route_changes(&mut self, time: f64, node: NodeId, updates: Vec<StepUpdate>) {
        self.route_changes.extend(
            updates
                .into_iter()
                .filter(|u| u.changed())
                .map(|update| RouteChange { time, node, update }),
        );
    }

    pub(crate) fn probe(&mut self, time: f64, probe: ProbeId, seq: u32, outcome: ProbeOutcome) {
        self.probes.push(ProbeRecord {
            time,
            probe,
            seq,
            outcome,
        })
    }

    /// All snapshots of a router
    pub fn snapshots_of(&self, node: NodeId) -> impl Iterator<Item = &TableSnapshot> {
        self.snapshots.iter().filter(move |s| s.node == node)
    }

    /// All changes of the routing table of a router
    pub fn route_changes_of(&self, node: NodeId) -> impl Iterator<Item = &RouteChange> {
        self.route_changes.iter().filter(move |c| c.node == node)
    }

    /// All records of a probe
    pub fn probe_records(&self, probe: ProbeId) -> impl Iterator<Item = &ProbeRecord> {
        self.probes.iter().filter(move |p| p.probe == probe)
    }

    /// Number of requests sent and number of replies received in time.
    pub fn reachability(&self, probe: ProbeId) -> (usize, usize) {
        self.probe_records(probe)
            .fold((0, 0), |(sent, recv), r| match r.outcome {
                ProbeOutcome::Sent => (sent + 1, recv),
                ProbeOutcome::Received { .. } => (sent, recv + 1),
                _ => (sent, recv),
            })
    }

    /// Round-trip times of all replies received in time, ordered by sequence number.
    pub fn round_trip_times(&self, probe: ProbeId) -> Vec<(u32, f64)> {
        let mut rtts: Vec<(u32, f64)> = self
            .probe_records(probe)
            .filter_map(|r| match r.outcome {
                ProbeOutcome::Received { rtt } => Some((r.seq, rtt)),
                _ => None,
            })
            .collect();
        rtts.sort_by_key(|(seq, _)| *seq);
        rtts
    }

    /// Compute the outage intervals of a probe. An outage is a maximal run of consecutive
    /// requests that failed (timed out or dropped, without a reply in time). Requests whose
    /// outcome is still unknown at the end of the run are ignored.
    pub fn outages(&self, probe: ProbeId) -> Vec<Outage> {
        // seq -> (send time, Some(success) once resolved)
        let mut requests: BTreeMap<u32, (f64, Option<bool>)> = BTreeMap::new();
        for r in self.probe_records(probe) {
            match r.outcome {
                ProbeOutcome::Sent => {
                    requests.entry(r.seq).or_insert((r.time, None)).0 = r.time;
                }
                ProbeOutcome::Received { .. } => {
                    requests.entry(r.seq).or_insert((r.time, None)).1 = Some(true);
                }
                ProbeOutcome::Timeout
                | ProbeOutcome::Dropped { .. }
                | ProbeOutcome::Late { .. } => {
                    let e = requests.entry(r.seq).or_insert((r.time, None));
                    if e.1 != Some(true) {
                        e.1 = Some(false);
                    }
                }
            }
        }

        let mut outages = Vec::new();
        let mut current: Option<Outage> = None;
        for (time, success) in requests.into_values() {
            match (success, current.as_mut()) {
                (Some(false), Some(o)) => o.lost += 1,
                (Some(false), None) => {
                    current = Some(Outage {
                        start: time,
                        end: None,
                        lost: 1,
                    })
                }
                (Some(true), Some(_)) => {
                    if let Some(mut o) = current.take() {
                        o.end = Some(time);
                        outages.push(o);
                    }
                }
                _ => {}
            }
        }
        outages.extend(current);
        outages
    }

    /// Serialize the record as JSON.
    pub fn to_json(&self) -> Result<String, NetworkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize a record from JSON.
    pub fn from_json(s: &str) -> Result<Self, NetworkError> {
        Ok(serde_json::from_str(s)?)
    }
}
