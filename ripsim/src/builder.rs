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

//! Module for generating topologies, allocating addresses, and selecting links, according to
//! parameters.
//!
//! ```
//! use ripsim::prelude::*;
//! use ripsim::builder::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut topo = Topology::new();
//! // create a chain of 4 routers
//! let (routers, links) = topo.build_chain("r", 4)?;
//! // add shortcuts from each router to the one after the next
//! let shortcuts = topo.build_shortcuts(&routers, 2)?;
//! // address every link out of 10.0.0.0/16
//! let mut alloc = AddressAllocator::new("10.0.0.0/16".parse()?, 24)?;
//! topo.assign_networks(links.iter().chain(shortcuts.iter()).copied(), &mut alloc)?;
//! # assert_eq!(shortcuts.len(), 2);
//! # Ok(())
//! # }
//! ```

use ipnet::{Ipv4Net, Ipv4Subnets};
use serde::{Deserialize, Serialize};

#[cfg(feature = "rand")]
use rand::prelude::*;

use crate::{
    topology::Topology,
    types::{LinkId, NetworkError, NodeId},
};

/// Trait for generating topologies quickly.
pub trait TopologyBuilder {
    /// Create `n` routers named `{prefix}0` to `{prefix}{n-1}`, and connect each router with the
    /// next one. Returns the routers and the links, both in order of the chain.
    fn build_chain(
        &mut self,
        prefix: &str,
        n: usize,
    ) -> Result<(Vec<NodeId>, Vec<LinkId>), NetworkError>;

    /// Create a router for each name and connect them in a ring, in the order of `names`. The
    /// last link connects the last router with the first one.
    fn build_ring(&mut self, names: &[&str]) -> Result<(Vec<NodeId>, Vec<LinkId>), NetworkError>;

    /// Connect each node in `nodes` with the node `skip` positions later. For `skip = 2`, these
    /// are links parallel to two consecutive links of a chain.
    fn build_shortcuts(&mut self, nodes: &[NodeId], skip: usize)
        -> Result<Vec<LinkId>, NetworkError>;

    /// Assign the next network of `alloc` to each link.
    fn assign_networks<I>(&mut self, links: I, alloc: &mut AddressAllocator) -> Result<(), NetworkError>
    where
        I: IntoIterator<Item = LinkId>;
}

impl TopologyBuilder for Topology {
    fn build_chain(
        &mut self,
        prefix: &str,
        n: usize,
    ) -> Result<(Vec<NodeId>, Vec<LinkId>), NetworkError> {
        let routers: Vec<NodeId> = (0..n)
            .map(|i| self.add_router(format!("{prefix}{i}")))
            .collect();
        let links = routers
            .windows(2)
            .map(|w| self.add_link(w[0], w[1]))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((routers, links))
    }

    fn build_ring(&mut self, names: &[&str]) -> Result<(Vec<NodeId>, Vec<LinkId>), NetworkError> {
        let routers: Vec<NodeId> = names.iter().map(|n| self.add_router(*n)).collect();
        let mut links = routers
            .windows(2)
            .map(|w| self.add_link(w[0], w[1]))
            .collect::<Result<Vec<_>, _>>()?;
        if routers.len() > 2 {
            links.push(self.add_link(routers[routers.len() - 1], routers[0])?);
        }
        Ok((routers, links))
    }

    fn build_shortcuts(
        &mut self,
        nodes: &[NodeId],
        skip: usize,
    ) -> Result<Vec<LinkId>, NetworkError> {
        if skip == 0 {
            return Ok(Vec::new());
        }
        (0..nodes.len().saturating_sub(skip))
            .map(|i| self.add_link(nodes[i], nodes[i + skip]))
            .collect()
    }

    fn assign_networks<I>(&mut self, links: I, alloc: &mut AddressAllocator) -> Result<(), NetworkError>
    where
        I: IntoIterator<Item = LinkId>,
    {
        for link in links {
            let network = alloc.next_network()?;
            self.assign_link_network(link, network)?;
        }
        Ok(())
    }
}

/// Hands out consecutive subnets of a base network.
#[derive(Debug, Clone)]
pub struct AddressAllocator {
    base: Ipv4Net,
    subnets: Ipv4Subnets,
}

impl AddressAllocator {
    /// Create an allocator that splits `base` into networks of length `prefix_len`.
    pub fn new(base: Ipv4Net, prefix_len: u8) -> Result<Self, NetworkError> {
        let base = base.trunc();
        let subnets = base
            .subnets(prefix_len)
            .map_err(|_| NetworkError::NetworkTooSmall(base))?;
        Ok(Self { base, subnets })
    }

    /// Get the next free network.
    pub fn next_network(&mut self) -> Result<Ipv4Net, NetworkError> {
        self.subnets
            .next()
            .ok_or(NetworkError::NetworkTooSmall(self.base))
    }
}

/// Policy to select links, for instance links that are removed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum LinkSelection {
    /// Select exactly one link, chosen uniformly at random.
    #[default]
    ExactlyOne,
    /// Select each link independently with the given probability. If `at_least_one` is set and
    /// no link was selected, a single link is chosen uniformly at random instead.
    Bernoulli {
        /// Probability that a link is selected
        probability: f64,
        /// Fall back to a single link if nothing was selected.
        at_least_one: bool,
    },
}

/// Select links according to `selection`, using the thread-local random number generator. The
/// selected links are returned in the order of `links`.
#[cfg(feature = "rand")]
#[cfg_attr(docsrs, doc(cfg(feature = "rand")))]
pub fn pick_links(links: &[LinkId], selection: LinkSelection) -> Vec<LinkId> {
    pick_links_seeded(&mut thread_rng(), links, selection)
}

/// Select links according to `selection`, using the random number generator `rng`. The selected
/// links are returned in the order of `links`. For the same state of `rng`, the same links are
/// selected.
#[cfg(feature = "rand")]
#[cfg_attr(docsrs, doc(cfg(feature = "rand")))]
pub fn pick_links_seeded<R: RngCore>(
    rng: &mut R,
    links: &[LinkId],
    selection: LinkSelection,
) -> Vec<LinkId> {
    if links.is_empty() {
        return Vec::new();
    }
    match selection {
        LinkSelection::ExactlyOne => links.choose(rng).copied().into_iter().collect(),
        LinkSelection::Bernoulli {
            probability,
            at_least_one,
        } => {
            let p = probability.clamp(0.0, 1.0);
            let picked: Vec<LinkId> = links.iter().copied().filter(|_| rng.gen_bool(p)).collect();
            if picked.is_empty() && at_least_one {
                links.choose(rng).copied().into_iter().collect()
            } else {
                picked
            }
        }
    }
}
