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

//! # RipScenarios: Distance-vector routing scenarios
//!
//! This crate drives the [`ripsim`] simulator through a small set of parameterized scenarios.
//! Each scenario builds a topology with a source and a destination host, runs the routing
//! protocol with the selected split-horizon mode, pings the destination from the source, tears
//! down links, and reports the observed routing tables and outages.
//!
//! ## Structure
//! - The module [`scenario`] contains the [`ScenarioConfig`] (which can be read from a JSON
//!   file) and builds the two topologies: the ring of seven routers ([`ScenarioKind::Ring`]), and
//!   the chain of routers with optional shortcut links ([`ScenarioKind::Chain`]).
//! - The module [`report`] summarizes a finished run, and writes it to a JSON file.
//!
//! ```
//! use rip_scenarios::{ScenarioConfig, ScenarioKind};
//!
//! # fn main() -> Result<(), rip_scenarios::ScenarioError> {
//! let mut config = ScenarioConfig::chain(4);
//! config.horizon = 30.0;
//! let mut scenario = config.build()?;
//! let report = scenario.run()?;
//! assert_eq!(report.kind, ScenarioKind::Chain);
//! assert!(report.received > 0);
//! # Ok(())
//! # }
//! ```

#![deny(
    missing_docs,
    clippy::missing_docs_in_private_items,
    missing_debug_implementations,
    rust_2018_idioms
)]

pub mod report;
pub mod scenario;
#[cfg(test)]
mod test;

pub use report::Report;
pub use scenario::{Scenario, ScenarioConfig, ScenarioError, ScenarioKind};
