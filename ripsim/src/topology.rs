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

//! # Topology Graph
//!
//! The topology stores all nodes, their interfaces, and the links between them. Each node has an
//! ordered list of interfaces. Interface `0` is the loopback, every link that is attached to a
//! node creates the next interface on that node. Link and interface state can be changed at any
//! time. Routers do not observe these changes synchronously, but only on their next timer tick.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use petgraph::{stable_graph::StableGraph, visit::EdgeRef, Undirected};
use serde::{Deserialize, Serialize};

use crate::types::{Endpoint, IfIndex, IndexType, LinkId, Metric, NetworkError, NodeId, INFINITY};

/// Default propagation delay of a link, in seconds.
pub const DEFAULT_LINK_DELAY: f64 = 0.002;
/// Default data rate of a link, in bits per second.
pub const DEFAULT_DATA_RATE: u64 = 5_000_000;

/// Kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Node running the routing protocol
    Router,
    /// End host with only a static default route
    Host,
}

/// Interface of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    /// Number of the interface on its node
    pub index: IfIndex,
    /// Link attached to the interface. Only the loopback has no link.
    pub link: Option<LinkId>,
    /// Assigned address, together with the prefix length of the network.
    pub address: Option<Ipv4Net>,
    /// Whether the interface is up.
    pub up: bool,
    /// Interfaces excluded from the routing protocol neither send nor accept updates.
    pub excluded: bool,
    /// Cost added to every route learned over this interface.
    pub metric: Metric,
}

impl Interface {
    fn loopback() -> Self {
        Self {
            index: 0,
            link: None,
            address: Ipv4Net::new(Ipv4Addr::LOCALHOST, 8).ok(),
            up: true,
            excluded: true,
            metric: 1,
        }
    }

    /// Returns `true` if this is the loopback interface.
    pub fn is_loopback(&self) -> bool {
        self.index == 0
    }

    /// Network to which this interface is attached (the address with host bits cleared).
    pub fn network(&self) -> Option<Ipv4Net> {
        self.address.map(|a| a.trunc())
    }

    /// Returns `true` if the routing protocol sends and accepts messages on this interface.
    pub fn is_active(&self) -> bool {
        self.up && !self.excluded && self.link.is_some()
    }
}

/// A node in the topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Name of the node
    pub name: String,
    /// Router or host
    pub kind: NodeKind,
    /// All interfaces, indexed by their interface number.
    pub interfaces: Vec<Interface>,
}

impl Node {
    /// Returns `true` if the node is a router.
    pub fn is_router(&self) -> bool {
        self.kind == NodeKind::Router
    }

    /// Returns `true` if the node is a host.
    pub fn is_host(&self) -> bool {
        self.kind == NodeKind::Host
    }

    /// Get an interface of the node.
    pub fn interface(&self, index: IfIndex) -> Option<&Interface> {
        self.interfaces.get(index as usize)
    }

    /// Iterate over all interfaces except the loopback.
    pub fn link_interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter().filter(|i| !i.is_loopback())
    }

    /// Returns `true` if `addr` is assigned to any interface of this node (excluding loopback).
    pub fn has_address(&self, addr: Ipv4Addr) -> bool {
        self.link_interfaces()
            .any(|i| i.address.map(|a| a.addr() == addr).unwrap_or(false))
    }

    /// First assigned (non-loopback) address of the node.
    pub fn primary_address(&self) -> Option<Ipv4Addr> {
        self.link_interfaces()
            .find_map(|i| i.address)
            .map(|a| a.addr())
    }
}

/// A point-to-point link between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Both ends of the link. Endpoint `0` is the node passed first when creating the link.
    pub endpoints: [Endpoint; 2],
    /// Propagation delay in seconds.
    pub delay: f64,
    /// Data rate in bits per second.
    pub data_rate: u64,
    /// Whether the link is up.
    pub up: bool,
}

impl Link {
    /// Time required to transmit `bytes` over this link, including the propagation delay.
    pub fn transmission_time(&self, bytes: usize) -> f64 {
        self.delay + (bytes as f64 * 8.0) / self.data_rate as f64
    }

    /// Get the endpoint on the other side of `node`.
    pub fn other(&self, node: NodeId) -> Option<Endpoint> {
        if self.endpoints[0].node == node {
            Some(self.endpoints[1])
        } else if self.endpoints[1].node == node {
            Some(self.endpoints[0])
        } else {
            None
        }
    }

    /// Get the endpoint of `node`.
    pub fn endpoint(&self, node: NodeId) -> Option<Endpoint> {
        self.endpoints.iter().copied().find(|e| e.node == node)
    }
}

/// Parameters of a new link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkOptions {
    /// Metric of both endpoint interfaces
    pub cost: Metric,
    /// Exclude the interface of the first node from the routing protocol.
    pub exclude_a: bool,
    /// Exclude the interface of the second node from the routing protocol.
    pub exclude_b: bool,
    /// Propagation delay in seconds
    pub delay: f64,
    /// Data rate in bits per second
    pub data_rate: u64,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            cost: 1,
            exclude_a: false,
            exclude_b: false,
            delay: DEFAULT_LINK_DELAY,
            data_rate: DEFAULT_DATA_RATE,
        }
    }
}

impl LinkOptions {
    fn check(&self) -> Result<(), NetworkError> {
        if !(self.delay.is_finite() && self.delay > 0.0) {
            return Err(NetworkError::InvalidLinkParameter(format!(
                "delay must be positive, but was {}",
                self.delay
            )));
        }
        if self.data_rate == 0 {
            return Err(NetworkError::InvalidLinkParameter(
                "data rate must be positive".to_string(),
            ));
        }
        check_metric(self.cost)
    }
}

fn check_metric(metric: Metric) -> Result<(), NetworkError> {
    if metric == 0 || metric >= INFINITY {
        Err(NetworkError::InvalidLinkParameter(format!(
            "metric must be between 1 and {}, but was {metric}",
            INFINITY - 1
        )))
    } else {
        Ok(())
    }
}

/// The physical topology of the network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    graph: StableGraph<Node, Link, Undirected, IndexType>,
}

impl Topology {
    /// Create an empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new node. The node only has a loopback interface.
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        self.graph.add_node(Node {
            name: name.into(),
            kind,
            interfaces: vec![Interface::loopback()],
        })
    }

    /// Add a new router.
    pub fn add_router(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(name, NodeKind::Router)
    }

    /// Add a new host.
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(name, NodeKind::Host)
    }

    /// Connect two nodes with cost 1 and default delay and data rate. Both nodes get a new
    /// interface.
    pub fn add_link(&mut self, a: NodeId, b: NodeId) -> Result<LinkId, NetworkError> {
        self.add_link_with(a, b, LinkOptions::default())
    }

    /// Connect two nodes with the given parameters. Both nodes get a new interface, numbered
    /// after the last interface of the node.
    pub fn add_link_with(
        &mut self,
        a: NodeId,
        b: NodeId,
        options: LinkOptions,
    ) -> Result<LinkId, NetworkError> {
        if a == b {
            return Err(NetworkError::SelfLoop(a));
        }
        options.check()?;
        let if_a = self.node(a)?.interfaces.len() as IfIndex;
        let if_b = self.node(b)?.interfaces.len() as IfIndex;
        let link = self.graph.add_edge(
            a,
            b,
            Link {
                endpoints: [Endpoint::new(a, if_a), Endpoint::new(b, if_b)],
                delay: options.delay,
                data_rate: options.data_rate,
                up: true,
            },
        );
        for (node, index, excluded) in [(a, if_a, options.exclude_a), (b, if_b, options.exclude_b)]
        {
            self.node_mut(node)?.interfaces.push(Interface {
                index,
                link: Some(link),
                address: None,
                up: true,
                excluded,
                metric: options.cost,
            });
        }
        Ok(link)
    }

    /// Change the state of a link and both of its endpoint interfaces.
    pub fn set_link_state(&mut self, link: LinkId, up: bool) -> Result<(), NetworkError> {
        let l = self
            .graph
            .edge_weight_mut(link)
            .ok_or(NetworkError::LinkNotFound(link))?;
        l.up = up;
        let endpoints = l.endpoints;
        for e in endpoints {
            self.interface_mut(e.node, e.interface)?.up = up;
        }
        Ok(())
    }

    /// Change the state of a single interface. The link itself is considered up as long as one of
    /// its interfaces is up.
    pub fn set_interface_state(
        &mut self,
        node: NodeId,
        interface: IfIndex,
        up: bool,
    ) -> Result<(), NetworkError> {
        if interface == 0 {
            return Err(NetworkError::LoopbackInterface(node));
        }
        let iface = self.interface_mut(node, interface)?;
        iface.up = up;
        let Some(link) = iface.link else {
            return Ok(());
        };
        let endpoints = self.link(link)?.endpoints;
        let any_up = endpoints
            .iter()
            .map(|e| self.interface(e.node, e.interface).map(|i| i.up))
            .collect::<Result<Vec<bool>, _>>()?
            .into_iter()
            .any(|x| x);
        if let Some(l) = self.graph.edge_weight_mut(link) {
            l.up = any_up;
        }
        Ok(())
    }

    /// Assign an address to an interface. Fails if the address is already used by any other
    /// interface, or if the network overlaps with the network of another interface on the same
    /// node.
    pub fn assign_address(
        &mut self,
        node: NodeId,
        interface: IfIndex,
        address: Ipv4Net,
    ) -> Result<(), NetworkError> {
        if interface == 0 {
            return Err(NetworkError::LoopbackInterface(node));
        }
        // make sure that the interface exists
        self.interface(node, interface)?;
        for n in self.graph.node_indices() {
            for other in self.graph[n].link_interfaces() {
                if n == node && other.index == interface {
                    continue;
                }
                let Some(other_addr) = other.address else {
                    continue;
                };
                let conflict = if n == node {
                    other_addr.contains(&address.network())
                        || address.contains(&other_addr.network())
                } else {
                    other_addr.addr() == address.addr()
                };
                if conflict {
                    return Err(NetworkError::DuplicateAddress(address, n, other.index));
                }
            }
        }
        self.interface_mut(node, interface)?.address = Some(address);
        Ok(())
    }

    /// Assign the first two host addresses of `network` to the two endpoints of the link. The
    /// first endpoint gets the first address.
    pub fn assign_link_network(
        &mut self,
        link: LinkId,
        network: Ipv4Net,
    ) -> Result<[Ipv4Net; 2], NetworkError> {
        let network = network.trunc();
        let mut hosts = network.hosts();
        let (Some(first), Some(second)) = (hosts.next(), hosts.next()) else {
            return Err(NetworkError::NetworkTooSmall(network));
        };
        let addrs = [
            Ipv4Net::new(first, network.prefix_len()).unwrap_or(network),
            Ipv4Net::new(second, network.prefix_len()).unwrap_or(network),
        ];
        let endpoints = self.link(link)?.endpoints;
        for (e, addr) in endpoints.iter().zip(addrs) {
            self.assign_address(e.node, e.interface, addr)?;
        }
        Ok(addrs)
    }

    /// Override the metric of an interface.
    pub fn set_interface_metric(
        &mut self,
        node: NodeId,
        interface: IfIndex,
        metric: Metric,
    ) -> Result<(), NetworkError> {
        if interface == 0 {
            return Err(NetworkError::LoopbackInterface(node));
        }
        check_metric(metric)?;
        self.interface_mut(node, interface)?.metric = metric;
        Ok(())
    }

    /// Exclude an interface from the routing protocol.
    pub fn exclude_interface(
        &mut self,
        node: NodeId,
        interface: IfIndex,
    ) -> Result<(), NetworkError> {
        if interface == 0 {
            return Err(NetworkError::LoopbackInterface(node));
        }
        self.interface_mut(node, interface)?.excluded = true;
        Ok(())
    }

    /// Get a node
    pub fn node(&self, node: NodeId) -> Result<&Node, NetworkError> {
        self.graph
            .node_weight(node)
            .ok_or(NetworkError::NodeNotFound(node))
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut Node, NetworkError> {
        self.graph
            .node_weight_mut(node)
            .ok_or(NetworkError::NodeNotFound(node))
    }

    /// Get a link
    pub fn link(&self, link: LinkId) -> Result<&Link, NetworkError> {
        self.graph
            .edge_weight(link)
            .ok_or(NetworkError::LinkNotFound(link))
    }

    /// Get an interface of a node
    pub fn interface(&self, node: NodeId, interface: IfIndex) -> Result<&Interface, NetworkError> {
        self.node(node)?
            .interface(interface)
            .ok_or(NetworkError::InterfaceNotFound(node, interface))
    }

    fn interface_mut(
        &mut self,
        node: NodeId,
        interface: IfIndex,
    ) -> Result<&mut Interface, NetworkError> {
        self.node_mut(node)?
            .interfaces
            .get_mut(interface as usize)
            .ok_or(NetworkError::InterfaceNotFound(node, interface))
    }

    /// Get the name of a node, or `"?"` if the node does not exist.
    pub fn name(&self, node: NodeId) -> &str {
        self.graph
            .node_weight(node)
            .map(|n| n.name.as_str())
            .unwrap_or("?")
    }

    /// Find a node by its name.
    pub fn node_id(&self, name: &str) -> Result<NodeId, NetworkError> {
        self.graph
            .node_indices()
            .find(|n| self.graph[*n].name == name)
            .ok_or_else(|| NetworkError::NodeNameNotFound(name.to_string()))
    }

    /// Get the link and the endpoint on the other side of an interface. Returns `None` for the
    /// loopback.
    pub fn neighbor(
        &self,
        node: NodeId,
        interface: IfIndex,
    ) -> Result<Option<(LinkId, Endpoint)>, NetworkError> {
        let Some(link) = self.interface(node, interface)?.link else {
            return Ok(None);
        };
        Ok(self.link(link)?.other(node).map(|e| (link, e)))
    }

    /// Find the interface that owns an address.
    pub fn owner_of(&self, addr: Ipv4Addr) -> Option<Endpoint> {
        self.graph.node_indices().find_map(|n| {
            self.graph[n]
                .link_interfaces()
                .find(|i| i.address.map(|a| a.addr() == addr).unwrap_or(false))
                .map(|i| Endpoint::new(n, i.index))
        })
    }

    /// Find a link between two nodes.
    pub fn link_between(&self, a: NodeId, b: NodeId) -> Option<LinkId> {
        self.graph.find_edge(a, b)
    }

    /// Iterate over all nodes in ascending order of their id.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Iterate over all routers.
    pub fn routers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph
            .node_indices()
            .filter(|n| self.graph[*n].is_router())
    }

    /// Iterate over all hosts.
    pub fn hosts(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph
            .node_indices()
            .filter(|n| self.graph[*n].is_host())
    }

    /// Iterate over all links in ascending order of their id.
    pub fn links(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.graph.edge_indices()
    }

    /// Iterate over all links attached to a node, together with the neighboring node.
    pub fn links_of(&self, node: NodeId) -> impl Iterator<Item = (LinkId, NodeId)> + '_ {
        self.graph
            .edges(node)
            .map(move |e| (e.id(), if e.source() == node { e.target() } else { e.source() }))
    }

    /// Number of nodes
    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of links
    pub fn num_links(&self) -> usize {
        self.graph.edge_count()
    }

    /// Access the underlying graph.
    pub fn graph(&self) -> &StableGraph<Node, Link, Undirected, IndexType> {
        &self.graph
    }
}
