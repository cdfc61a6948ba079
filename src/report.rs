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

//! Summary of a finished scenario, and its JSON export.

use std::{
    fmt::Write as _,
    fs::{remove_file, OpenOptions},
    io::Write,
    path::Path,
};

use itertools::Itertools;
use ripsim::{
    formatter::NetworkFormatter,
    record::{Outage, ProbeOutcome, ProbeRecord, Record},
    rip::SplitHorizon,
    topology::Topology,
    types::LinkId,
};
use serde::{Deserialize, Serialize};

use crate::scenario::{Scenario, ScenarioError, ScenarioKind};

/// Result of a scenario run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// The topology of the scenario
    pub kind: ScenarioKind,
    /// Split horizon mode of all routers
    pub split_horizon: SplitHorizon,
    /// Names of the endpoints of all shortcut links that were taken down
    pub removed_links: Vec<(String, String)>,
    /// Number of requests sent by the probe
    pub sent: usize,
    /// Number of replies received in time
    pub received: usize,
    /// Intervals without replies
    pub outages: Vec<Outage>,
    /// Time of the last route change (removals of expired routes are ignored).
    pub last_route_change: Option<f64>,
    /// Everything that was recorded during the run
    pub record: Record,
}

impl Report {
    /// Summarize the run of a scenario.
    pub fn new(scenario: &Scenario) -> Self {
        let net = &scenario.network;
        let record = net.record().clone();
        let (sent, received) = scenario
            .probe
            .map(|p| record.reachability(p))
            .unwrap_or_default();
        let outages = scenario
            .probe
            .map(|p| record.outages(p))
            .unwrap_or_default();
        let last_route_change = record
            .route_changes
            .iter()
            .filter(|c| c.update.new.is_some())
            .map(|c| c.time)
            .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t))));
        Self {
            kind: scenario.kind,
            split_horizon: net.config().rip.split_horizon,
            removed_links: scenario
                .removed
                .iter()
                .map(|l| link_names(net.topology(), *l))
                .collect(),
            sent,
            received,
            outages,
            last_route_change,
            record,
        }
    }

    /// Short textual summary of the run.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        let f = &mut s;
        // writing into a string never fails.
        let _ = writeln!(f, "Scenario: {} ({})", self.kind, self.split_horizon);
        if !self.removed_links.is_empty() {
            let _ = writeln!(
                f,
                "Removed links: {}",
                self.removed_links
                    .iter()
                    .map(|(a, b)| format!("{a} -- {b}"))
                    .join(", ")
            );
        }
        let _ = writeln!(
            f,
            "Probe: {} sent, {} received ({:.1}% loss)",
            self.sent,
            self.received,
            self.loss() * 100.0
        );
        for o in self.outages.iter() {
            match o.end {
                Some(end) => {
                    let _ = writeln!(
                        f,
                        "Outage: {:.3}s - {:.3}s ({} requests lost)",
                        o.start, end, o.lost
                    );
                }
                None => {
                    let _ = writeln!(
                        f,
                        "Outage: {:.3}s - end ({} requests lost)",
                        o.start, o.lost
                    );
                }
            }
        }
        if let Some(t) = self.last_route_change {
            let _ = writeln!(f, "Last route change: {t:.3}s");
        }
        s
    }

    /// Fraction of requests without reply in time
    pub fn loss(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            (self.sent - self.received) as f64 / self.sent as f64
        }
    }

    /// Generate the JSON representation of the report.
    pub fn to_json(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report to a json file.
    ///
    /// This function will overwrite any existing file.
    pub fn write_json(&self, file: impl AsRef<Path>) -> Result<(), ScenarioError> {
        let content = self.to_json()?;
        let file = file.as_ref();
        if file.exists() {
            remove_file(file)?;
        }
        let mut file = OpenOptions::new().create(true).write(true).open(file)?;
        writeln!(file, "{content}")?;
        Ok(())
    }
}

/// Names of both endpoints of a link.
fn link_names(topo: &Topology, link: LinkId) -> (String, String) {
    match topo.link(link) {
        Ok(l) => (
            l.endpoints[0].node.fmt(topo).to_string(),
            l.endpoints[1].node.fmt(topo).to_string(),
        ),
        Err(_) => ("?".to_string(), "?".to_string()),
    }
}

/// Print a probe record in the style of `ping`. Returns `None` for records of sent requests.
pub fn ping_line(record: &ProbeRecord, size: usize, topo: &Topology) -> Option<String> {
    match record.outcome {
        ProbeOutcome::Sent => None,
        ProbeOutcome::Received { rtt } => Some(format!(
            "{:>9.3}s: Received Echo Reply size={size} seq={} time={:.3} ms",
            record.time,
            record.seq,
            rtt * 1000.0
        )),
        ProbeOutcome::Late { rtt } => Some(format!(
            "{:>9.3}s: Late Echo Reply seq={} time={:.3} ms",
            record.time,
            record.seq,
            rtt * 1000.0
        )),
        ProbeOutcome::Timeout => Some(format!(
            "{:>9.3}s: Request timeout seq={}",
            record.time, record.seq
        )),
        ProbeOutcome::Dropped { node, reason } => Some(format!(
            "{:>9.3}s: {} dropped seq={} ({reason:?})",
            record.time,
            node.fmt(topo),
            record.seq
        )),
    }
}
