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

//! The chain scenario: a chain of routers `R0` to `R{n-1}`, the source attached to the first and
//! the destination attached to the last router. Optionally, every router is connected to the
//! router two positions further down the chain, and some of those shortcuts are taken down
//! during the run.

use rand::{rngs::StdRng, SeedableRng};
use ripsim::{
    builder::{pick_links_seeded, AddressAllocator, TopologyBuilder},
    topology::{LinkOptions, Topology},
};

use super::{network, ChainConfig, Layout, ScenarioError};

/// Build the chain. Router links get the networks `10.0.{i}.0/24`, the source link
/// `10.6.0.0/24`, the destination link `10.7.0.0/24`, and the shortcuts `10.1.{i}.0/24`.
pub(super) fn build(config: &ChainConfig, seed: u64) -> Result<Layout, ScenarioError> {
    let n = config.routers;
    if n < 2 {
        return Err(ScenarioError::InvalidConfig(format!(
            "the chain needs at least 2 routers, but got {n}"
        )));
    }
    if n > 256 {
        return Err(ScenarioError::InvalidConfig(format!(
            "the chain supports at most 256 routers, but got {n}"
        )));
    }

    if config.removal.is_some() && !config.shortcuts {
        return Err(ScenarioError::InvalidConfig(
            "shortcuts can only be removed if the chain has shortcuts".to_string(),
        ));
    }

    let mut topo = Topology::new();
    let source = topo.add_host("src");
    let destination = topo.add_host("dst");
    let (routers, links) = topo.build_chain("R", n)?;

    // the host links do not carry any routing messages.
    let src_link = topo.add_link_with(
        source,
        routers[0],
        LinkOptions {
            exclude_b: true,
            ..Default::default()
        },
    )?;
    let dst_link = topo.add_link_with(
        routers[n - 1],
        destination,
        LinkOptions {
            exclude_a: true,
            ..Default::default()
        },
    )?;

    let mut alloc = AddressAllocator::new(network("10.0.0.0/16")?, 24)?;
    topo.assign_networks(links, &mut alloc)?;
    topo.assign_link_network(src_link, network("10.6.0.0/24")?)?;
    topo.assign_link_network(dst_link, network("10.7.0.0/24")?)?;

    let shortcuts = if config.shortcuts {
        let shortcuts = topo.build_shortcuts(&routers, 2)?;
        let mut alloc = AddressAllocator::new(network("10.1.0.0/16")?, 24)?;
        topo.assign_networks(shortcuts.iter().copied(), &mut alloc)?;
        shortcuts
    } else {
        Vec::new()
    };

    let removed = match config.removal {
        Some(removal) => {
            let mut rng = StdRng::seed_from_u64(seed);
            pick_links_seeded(&mut rng, &shortcuts, removal.selection)
        }
        None => Vec::new(),
    };

    Ok(Layout {
        topo,
        source,
        destination,
        shortcuts,
        removed,
    })
}
