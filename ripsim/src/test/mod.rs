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

use ipnet::Ipv4Net;

use crate::{
    topology::Topology,
    types::{LinkId, NodeId},
};

mod test_probe;
mod test_rip;
mod test_topology;

/// Parse a network, panicking if it is invalid.
pub(crate) fn net(s: &str) -> Ipv4Net {
    s.parse().unwrap()
}

/// Build a ring of `n` routers `r0` to `r{n-1}`, where link `i` connects `r{i}` with `r{i+1}`
/// and gets the network `10.0.{i}.0/24`.
pub(crate) fn ring(n: usize) -> (Topology, Vec<NodeId>, Vec<LinkId>) {
    let mut topo = Topology::new();
    let routers: Vec<NodeId> = (0..n).map(|i| topo.add_router(format!("r{i}"))).collect();
    let links: Vec<LinkId> = (0..n)
        .map(|i| topo.add_link(routers[i], routers[(i + 1) % n]).unwrap())
        .collect();
    for (i, l) in links.iter().enumerate() {
        topo.assign_link_network(*l, net(&format!("10.0.{i}.0/24")))
            .unwrap();
    }
    (topo, routers, links)
}

/// Build a chain `src - r0 - ... - r{n-1} - dst`. The hosts are connected first, such that the
/// routers interfaces towards the hosts have index `1`. Router links get `10.0.{i}.0/24`, the
/// source link `10.6.0.0/24`, and the destination link `10.7.0.0/24`. Returns the topology, the
/// source, the destination, the routers, and the router links.
pub(crate) fn chain_with_hosts(n: usize) -> (Topology, NodeId, NodeId, Vec<NodeId>, Vec<LinkId>) {
    let mut topo = Topology::new();
    let src = topo.add_host("src");
    let dst = topo.add_host("dst");
    let routers: Vec<NodeId> = (0..n).map(|i| topo.add_router(format!("r{i}"))).collect();
    let src_link = topo.add_link(routers[0], src).unwrap();
    let dst_link = topo.add_link(routers[n - 1], dst).unwrap();
    topo.assign_link_network(src_link, net("10.6.0.0/24")).unwrap();
    topo.assign_link_network(dst_link, net("10.7.0.0/24")).unwrap();
    let links: Vec<LinkId> = routers
        .windows(2)
        .map(|w| topo.add_link(w[0], w[1]).unwrap())
        .collect();
    for (i, l) in links.iter().enumerate() {
        topo.assign_link_network(*l, net(&format!("10.0.{i}.0/24")))
            .unwrap();
    }
    (topo, src, dst, routers, links)
}
