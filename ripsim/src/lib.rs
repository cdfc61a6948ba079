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

#![deny(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # RipSim
//!
//! This is a library for simulating a distance-vector routing protocol (RIP) on a network
//! topology, using a discrete-event simulation with a virtual clock.
//!
//! ## Main Concepts
//!
//! The [`topology::Topology`] stores all nodes, their interfaces, and the links between them,
//! on a graph (see [Petgraph](https://docs.rs/petgraph/latest/petgraph/index.html)). Nodes are
//! either routers, running the routing protocol, or hosts with a static default route.
//!
//! The [`network::Network`] takes the topology and simulates it. It owns a
//! [`router::Router`] for each router node, the [`probe::Probe`]s, and the
//! [`event::Scheduler`]. Every event (a periodic or triggered update, a timer tick, a message
//! arriving at a router, a link changing its state, a packet arriving at a node) is processed at
//! its virtual time. Events at the same time are processed in the order in which they were
//! scheduled. Runs are deterministic.
//!
//! Routers exchange their routing tables every 30 seconds, and send triggered updates whenever
//! their table changes. Routes are advertised back on the interface they were learned from
//! according to the [`rip::SplitHorizon`] mode. Routers observe link failures on their next timer
//! tick, and routes expire if they are not refreshed.
//!
//! Everything that can be observed during a run is collected in a [`record::Record`].
//!
//! ## Optional Features
//!
//! - `rand`: This feature enables helper functions in the [`builder`] for selecting random
//!   links.
//!
//! ## Example usage
//!
//! The following example builds a ring of four routers, lets the routing protocol converge, takes
//! down one link, and checks that the router reroutes over the remaining path.
//!
//! ```
//! use ripsim::prelude::*;
//!
//! fn main() -> Result<(), NetworkError> {
//!     let mut topo = Topology::new();
//!     let a = topo.add_router("a");
//!     let b = topo.add_router("b");
//!     let c = topo.add_router("c");
//!     let d = topo.add_router("d");
//!     let ab = topo.add_link(a, b)?;
//!     let bc = topo.add_link(b, c)?;
//!     let cd = topo.add_link(c, d)?;
//!     let da = topo.add_link(d, a)?;
//!     topo.assign_link_network(ab, "10.0.1.0/24".parse().unwrap())?;
//!     topo.assign_link_network(bc, "10.0.2.0/24".parse().unwrap())?;
//!     topo.assign_link_network(cd, "10.0.3.0/24".parse().unwrap())?;
//!     topo.assign_link_network(da, "10.0.4.0/24".parse().unwrap())?;
//!
//!     let mut net = Network::new(topo, SimulationConfig::default());
//!     net.schedule_link_state(50.0, ab, false)?;
//!     net.run_until(40.0)?;
//!
//!     // a reaches the network between b and c via b
//!     let bc_net = "10.0.2.0/24".parse().unwrap();
//!     assert_eq!(net.routing_table(a)?.get(&bc_net).unwrap().metric, 2);
//!
//!     net.run_until(100.0)?;
//!     // after the failure, the same network is reached via d and c
//!     assert_eq!(net.routing_table(a)?.get(&bc_net).unwrap().metric, 3);
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod event;
#[cfg(not(tarpaulin_include))]
pub mod formatter;
pub mod network;
pub mod prelude;
pub mod probe;
pub mod record;
pub mod rip;
pub mod router;
pub mod topology;
pub mod types;

#[cfg(test)]
#[cfg(not(tarpaulin_include))]
mod test;
