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

//! Test the topology graph

use std::net::Ipv4Addr;

use crate::{
    test::net,
    topology::{LinkOptions, NodeKind, Topology},
    types::{Endpoint, NetworkError},
};

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;

#[test]
fn interfaces_are_numbered_sequentially() {
    let mut t = Topology::new();
    let a = t.add_router("a");
    let b = t.add_router("b");
    let c = t.add_host("c");
    assert_eq!(t.node(c).unwrap().kind, NodeKind::Host);

    let ab = t.add_link(a, b).unwrap();
    let ac = t.add_link(a, c).unwrap();
    let bc = t.add_link(b, c).unwrap();

    assert_eq!(t.node(a).unwrap().interfaces.len(), 3);
    assert!(t.interface(a, 0).unwrap().is_loopback());
    assert!(t.interface(a, 0).unwrap().excluded);
    assert_eq!(
        t.link(ab).unwrap().endpoints,
        [Endpoint::new(a, 1), Endpoint::new(b, 1)]
    );
    assert_eq!(
        t.link(ac).unwrap().endpoints,
        [Endpoint::new(a, 2), Endpoint::new(c, 1)]
    );
    assert_eq!(
        t.link(bc).unwrap().endpoints,
        [Endpoint::new(b, 2), Endpoint::new(c, 2)]
    );
    assert_eq!(t.neighbor(a, 2).unwrap(), Some((ac, Endpoint::new(c, 1))));
    assert_eq!(t.neighbor(a, 0).unwrap(), None);
    assert_eq!(t.link_between(b, c), Some(bc));
    assert_eq!(t.link_between(c, b), Some(bc));
    assert_eq!(t.routers().collect::<Vec<_>>(), vec![a, b]);
    assert_eq!(t.hosts().collect::<Vec<_>>(), vec![c]);
    assert_eq!(t.node_id("b"), Ok(b));
    assert_eq!(
        t.node_id("x"),
        Err(NetworkError::NodeNameNotFound("x".to_string()))
    );
}

#[test]
fn link_options() {
    let mut t = Topology::new();
    let a = t.add_router("a");
    let b = t.add_router("b");
    let l = t
        .add_link_with(
            a,
            b,
            LinkOptions {
                cost: 3,
                exclude_a: true,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(t.interface(a, 1).unwrap().metric, 3);
    assert_eq!(t.interface(b, 1).unwrap().metric, 3);
    assert!(t.interface(a, 1).unwrap().excluded);
    assert!(!t.interface(b, 1).unwrap().excluded);
    assert!(!t.interface(a, 1).unwrap().is_active());
    assert!(t.interface(b, 1).unwrap().is_active());

    // 2ms + 1024 * 8 bit / 5 Mbit/s
    assert_relative_eq!(t.link(l).unwrap().transmission_time(1024), 0.0036384);

    t.set_interface_metric(b, 1, 10).unwrap();
    assert_eq!(t.interface(b, 1).unwrap().metric, 10);
    assert!(matches!(
        t.set_interface_metric(b, 1, 16),
        Err(NetworkError::InvalidLinkParameter(_))
    ));
    t.exclude_interface(b, 1).unwrap();
    assert!(t.interface(b, 1).unwrap().excluded);
}

#[test]
fn invalid_links() {
    let mut t = Topology::new();
    let a = t.add_router("a");
    let b = t.add_router("b");
    assert_eq!(t.add_link(a, a), Err(NetworkError::SelfLoop(a)));
    let zero_delay = LinkOptions {
        delay: 0.0,
        ..Default::default()
    };
    assert!(matches!(
        t.add_link_with(a, b, zero_delay),
        Err(NetworkError::InvalidLinkParameter(_))
    ));
    let zero_rate = LinkOptions {
        data_rate: 0,
        ..Default::default()
    };
    assert!(matches!(
        t.add_link_with(a, b, zero_rate),
        Err(NetworkError::InvalidLinkParameter(_))
    ));
    // failed attempts do not create interfaces
    assert_eq!(t.node(a).unwrap().interfaces.len(), 1);
    assert_eq!(t.num_links(), 0);
}

#[test]
fn invalid_references() {
    let mut t = Topology::new();
    let a = t.add_router("a");
    let b = t.add_router("b");
    let l = t.add_link(a, b).unwrap();
    let ghost = 17.into();
    let ghost_link = 9.into();
    assert_eq!(t.add_link(a, ghost), Err(NetworkError::NodeNotFound(ghost)));
    assert_eq!(
        t.set_link_state(ghost_link, false),
        Err(NetworkError::LinkNotFound(ghost_link))
    );
    assert_eq!(
        t.assign_address(a, 5, net("10.0.0.1/24")),
        Err(NetworkError::InterfaceNotFound(a, 5))
    );
    assert_eq!(
        t.assign_address(a, 0, net("10.0.0.1/24")),
        Err(NetworkError::LoopbackInterface(a))
    );
    t.set_link_state(l, false).unwrap();
    assert!(t
        .assign_address(a, 5, net("10.0.0.1/24"))
        .unwrap_err()
        .is_invalid_reference());
}

#[test]
fn addresses() {
    let mut t = Topology::new();
    let a = t.add_router("a");
    let b = t.add_router("b");
    let c = t.add_router("c");
    let ab = t.add_link(a, b).unwrap();
    let bc = t.add_link(b, c).unwrap();

    let addrs = t.assign_link_network(ab, net("10.0.1.77/24")).unwrap();
    assert_eq!(addrs, [net("10.0.1.1/24"), net("10.0.1.2/24")]);
    assert_eq!(t.interface(a, 1).unwrap().address, Some(net("10.0.1.1/24")));
    assert_eq!(t.interface(b, 1).unwrap().network(), Some(net("10.0.1.0/24")));
    assert_eq!(
        t.owner_of(Ipv4Addr::new(10, 0, 1, 2)),
        Some(Endpoint::new(b, 1))
    );
    assert_eq!(t.owner_of(Ipv4Addr::new(10, 0, 1, 3)), None);
    assert!(t.node(a).unwrap().has_address(Ipv4Addr::new(10, 0, 1, 1)));
    assert_eq!(
        t.node(a).unwrap().primary_address(),
        Some(Ipv4Addr::new(10, 0, 1, 1))
    );

    // the same address on another node
    assert_eq!(
        t.assign_address(c, 1, net("10.0.1.2/24")),
        Err(NetworkError::DuplicateAddress(net("10.0.1.2/24"), b, 1))
    );
    // overlapping network on the same node
    assert_eq!(
        t.assign_address(b, 2, net("10.0.0.1/16")),
        Err(NetworkError::DuplicateAddress(net("10.0.0.1/16"), b, 1))
    );
    // reassigning the same interface is fine
    t.assign_address(b, 1, net("10.0.1.5/24")).unwrap();

    t.assign_link_network(bc, net("10.0.2.0/24")).unwrap();
    assert_eq!(
        t.assign_link_network(bc, net("10.0.3.0/32")),
        Err(NetworkError::NetworkTooSmall(net("10.0.3.0/32")))
    );
}

#[test]
fn link_state() {
    let mut t = Topology::new();
    let a = t.add_router("a");
    let b = t.add_router("b");
    let l = t.add_link(a, b).unwrap();
    t.set_link_state(l, false).unwrap();
    assert!(!t.link(l).unwrap().up);
    assert!(!t.interface(a, 1).unwrap().up);
    assert!(!t.interface(b, 1).unwrap().up);
    t.set_link_state(l, true).unwrap();
    assert!(t.link(l).unwrap().up);
    assert!(t.interface(a, 1).unwrap().up);

    t.set_interface_state(a, 1, false).unwrap();
    assert!(t.link(l).unwrap().up);
    t.set_interface_state(b, 1, false).unwrap();
    assert!(!t.link(l).unwrap().up);
    assert_eq!(
        t.set_interface_state(b, 0, false),
        Err(NetworkError::LoopbackInterface(b))
    );
}
