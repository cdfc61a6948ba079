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

//! The ring scenario: seven routers connected in a ring, the source attached to router `A` and
//! the destination attached to router `B`. The shortest path from `A` to `B` goes over `F` and
//! `G`, and the alternative path over `C`, `D`, and `E` is one hop longer.

use std::iter::once;

use ripsim::{
    builder::{AddressAllocator, TopologyBuilder},
    topology::{LinkOptions, Topology},
};

use super::{network, FailureConfig, Layout, ScenarioError};

/// Names of the routers, in the order of the ring.
pub const RING_ORDER: [&str; 7] = ["A", "F", "G", "B", "E", "D", "C"];

/// By default, the link between `F` and `G` goes down after 40 seconds.
pub(super) fn default_failures() -> Vec<FailureConfig> {
    vec![FailureConfig::down(40.0, "F", "G")]
}

/// Build the ring topology. The networks are numbered from `10.0.1.0/24` (source to `A`), along
/// the ring starting at `A`, up to `10.0.9.0/24` (`B` to destination).
pub(super) fn build() -> Result<Layout, ScenarioError> {
    let mut topo = Topology::new();
    let source = topo.add_host("src");
    let destination = topo.add_host("dst");
    let (routers, ring_links) = topo.build_ring(&RING_ORDER)?;
    let (a, b) = (routers[0], routers[3]);

    // the host links do not carry any routing messages.
    let src_link = topo.add_link_with(
        source,
        a,
        LinkOptions {
            exclude_b: true,
            ..Default::default()
        },
    )?;
    let dst_link = topo.add_link_with(
        b,
        destination,
        LinkOptions {
            exclude_a: true,
            ..Default::default()
        },
    )?;

    let mut alloc = AddressAllocator::new(network("10.0.0.0/16")?, 24)?;
    // 10.0.0.0/24 is not used.
    alloc.next_network()?;
    topo.assign_networks(
        once(src_link).chain(ring_links).chain(once(dst_link)),
        &mut alloc,
    )?;

    Ok(Layout {
        topo,
        source,
        destination,
        shortcuts: Vec::new(),
        removed: Vec::new(),
    })
}
