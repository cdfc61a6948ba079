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

//! Test the routing table and its update rules

use std::net::Ipv4Addr;

use crate::{
    rip::{RipConfig, RipEntry, RoutingTable, SplitHorizon, RIP_FRAME_SIZE},
    test::net,
    types::{add_metric, Endpoint, NetworkError, StepUpdate, INFINITY},
};

use lazy_static::lazy_static;
use maplit::btreemap;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

lazy_static! {
    static ref N1: Endpoint = Endpoint::new(1.into(), 1);
    static ref N2: Endpoint = Endpoint::new(2.into(), 1);
}

fn entry(network: &str, metric: u32) -> RipEntry {
    RipEntry {
        network: net(network),
        metric,
    }
}

fn metrics(t: &RoutingTable) -> BTreeMap<String, (u32, u32)> {
    t.iter()
        .map(|e| (e.destination.to_string(), (e.interface, e.metric)))
        .collect()
}

#[test]
fn metric_is_clamped() {
    assert_eq!(add_metric(1, 1), 2);
    assert_eq!(add_metric(15, 1), INFINITY);
    assert_eq!(add_metric(INFINITY, 1), INFINITY);
    assert_eq!(add_metric(u32::MAX, 3), INFINITY);
}

#[test]
fn unknown_destination() {
    let mut t = RoutingTable::new();
    // unreachable destinations are not added
    assert_eq!(t.apply_update(&entry("10.0.9.0/24", 15), 1, 1, *N1, 0.0), None);
    assert_eq!(t.apply_update(&entry("10.0.9.0/24", 16), 1, 1, *N1, 0.0), None);
    assert!(t.is_empty());

    assert_eq!(
        t.apply_update(&entry("10.0.9.0/24", 2), 1, 1, *N1, 0.0),
        Some(StepUpdate::new(net("10.0.9.0/24"), None, Some((1, 3))))
    );
    let e = t.get(&net("10.0.9.0/24")).unwrap();
    assert_eq!(e.next_hop, Some(*N1));
    assert!(e.is_valid());
    assert!(!e.is_connected());
}

#[test]
fn apply_twice_is_idempotent() {
    let mut t = RoutingTable::new();
    t.install_connected(net("10.0.1.0/24"), 1, 1, 0.0);
    let adv = vec![entry("10.0.2.0/24", 1), entry("10.0.3.0/24", 4), entry("10.0.1.0/24", 1)];
    for e in adv.iter() {
        t.apply_update(e, 1, 1, *N1, 1.0);
    }
    let first = metrics(&t);
    for e in adv.iter() {
        assert_eq!(t.apply_update(e, 1, 1, *N1, 2.0), None);
    }
    assert_eq!(metrics(&t), first);
    // the refresh updates the timer
    assert_eq!(t.get(&net("10.0.2.0/24")).unwrap().last_update, 2.0);
}

#[test]
fn connected_routes_are_sticky() {
    let mut t = RoutingTable::new();
    t.install_connected(net("10.0.1.0/24"), 1, 1, 0.0);
    assert_eq!(t.apply_update(&entry("10.0.1.0/24", 0), 2, 1, *N2, 1.0), None);
    assert_eq!(t.apply_update(&entry("10.0.1.0/24", 5), 1, 1, *N1, 1.0), None);
    assert_eq!(metrics(&t), btreemap! {"10.0.1.0/24".to_string() => (1, 1)});

    // once invalid, the destination can be learned over another interface
    t.invalidate_interface(1, 2.0);
    assert_eq!(
        t.apply_update(&entry("10.0.1.0/24", 2), 2, 1, *N2, 3.0),
        Some(StepUpdate::new(
            net("10.0.1.0/24"),
            Some((1, INFINITY)),
            Some((2, 3))
        ))
    );
    // installing the connected route again replaces the learned route
    assert_eq!(
        t.install_connected(net("10.0.1.0/24"), 1, 1, 4.0),
        Some(StepUpdate::new(
            net("10.0.1.0/24"),
            Some((2, 3)),
            Some((1, 1))
        ))
    );
    assert_eq!(t.install_connected(net("10.0.1.0/24"), 1, 1, 5.0), None);
}

#[test]
fn same_interface_always_overwrites() {
    let mut t = RoutingTable::new();
    t.apply_update(&entry("10.0.9.0/24", 2), 1, 1, *N1, 0.0);
    assert_eq!(
        t.apply_update(&entry("10.0.9.0/24", 7), 1, 1, *N1, 1.0),
        Some(StepUpdate::new(
            net("10.0.9.0/24"),
            Some((1, 3)),
            Some((1, 8))
        ))
    );
    // unreachable over the same interface invalidates the route
    t.apply_update(&entry("10.0.9.0/24", INFINITY), 1, 1, *N1, 2.0);
    let e = t.get(&net("10.0.9.0/24")).unwrap();
    assert_eq!(e.metric, INFINITY);
    assert_eq!(e.invalid_since, Some(2.0));
    // repeating it does not reset the deletion timer
    assert_eq!(
        t.apply_update(&entry("10.0.9.0/24", INFINITY), 1, 1, *N1, 3.0),
        None
    );
    assert_eq!(t.get(&net("10.0.9.0/24")).unwrap().invalid_since, Some(2.0));
}

#[test]
fn other_interface_only_if_better() {
    let mut t = RoutingTable::new();
    t.apply_update(&entry("10.0.9.0/24", 2), 1, 1, *N1, 0.0);
    // equal is not better
    assert_eq!(t.apply_update(&entry("10.0.9.0/24", 2), 2, 1, *N2, 1.0), None);
    assert_eq!(t.apply_update(&entry("10.0.9.0/24", 5), 2, 1, *N2, 1.0), None);
    assert_eq!(
        t.apply_update(&entry("10.0.9.0/24", 0), 2, 1, *N2, 1.0),
        Some(StepUpdate::new(
            net("10.0.9.0/24"),
            Some((1, 3)),
            Some((2, 1))
        ))
    );
    assert_eq!(t.get(&net("10.0.9.0/24")).unwrap().next_hop, Some(*N2));
    // interface cost is added
    t.apply_update(&entry("10.0.8.0/24", 2), 1, 10, *N1, 1.0);
    assert_eq!(t.get(&net("10.0.8.0/24")).unwrap().metric, 12);
    t.apply_update(&entry("10.0.7.0/24", 10), 1, 10, *N1, 1.0);
    assert!(t.get(&net("10.0.7.0/24")).is_none());
}

#[test]
fn aging_and_garbage_collection() {
    let mut t = RoutingTable::new();
    t.install_connected(net("10.0.1.0/24"), 1, 1, 0.0);
    t.apply_update(&entry("10.0.2.0/24", 1), 1, 1, *N1, 0.0);
    t.apply_update(&entry("10.0.3.0/24", 1), 2, 1, *N2, 100.0);

    assert!(t.expire(180.0, 180.0).is_empty());
    let expired = t.expire(181.0, 180.0);
    assert_eq!(
        expired,
        vec![StepUpdate::new(
            net("10.0.2.0/24"),
            Some((1, 2)),
            Some((1, INFINITY))
        )]
    );
    // connected routes never expire
    assert!(t.get(&net("10.0.1.0/24")).unwrap().is_valid());

    assert!(t.collect_garbage(300.0, 120.0).is_empty());
    assert_eq!(
        t.collect_garbage(301.0, 120.0),
        vec![StepUpdate::new(net("10.0.2.0/24"), Some((1, INFINITY)), None)]
    );
    assert_eq!(t.len(), 2);

    let invalid = t.invalidate_learned(2, 302.0);
    assert_eq!(invalid.len(), 1);
    let invalid = t.invalidate_interface(1, 302.0);
    assert_eq!(invalid.len(), 1);
    assert!(t.iter().all(|e| !e.is_valid()));
    assert_eq!(t.lookup(Ipv4Addr::new(10, 0, 1, 1)), None);
}

#[test]
fn advertisement_modes() {
    let mut t = RoutingTable::new();
    t.install_connected(net("10.0.1.0/24"), 1, 1, 0.0);
    t.install_connected(net("10.0.2.0/24"), 2, 1, 0.0);
    t.apply_update(&entry("10.0.3.0/24", 1), 1, 1, *N1, 0.0);

    let no = t.advertisement(1, SplitHorizon::NoSplitHorizon);
    assert_eq!(
        no,
        vec![
            entry("10.0.1.0/24", 1),
            entry("10.0.2.0/24", 1),
            entry("10.0.3.0/24", 2)
        ]
    );
    let split = t.advertisement(1, SplitHorizon::SplitHorizon);
    assert_eq!(split, vec![entry("10.0.2.0/24", 1)]);
    let poison = t.advertisement(1, SplitHorizon::PoisonReverse);
    assert_eq!(
        poison,
        vec![
            entry("10.0.1.0/24", INFINITY),
            entry("10.0.2.0/24", 1),
            entry("10.0.3.0/24", INFINITY)
        ]
    );

    // invalid routes are still advertised, but never as reachable
    t.invalidate_interface(2, 1.0);
    let adv = t.advertisement(1, SplitHorizon::NoSplitHorizon);
    assert_eq!(adv[1], entry("10.0.2.0/24", INFINITY));
    assert!(t
        .advertisement(2, SplitHorizon::PoisonReverse)
        .iter()
        .all(|e| e.metric <= INFINITY));
}

#[test]
fn longest_prefix_match() {
    let mut t = RoutingTable::new();
    t.apply_update(&entry("10.0.0.0/8", 1), 1, 1, *N1, 0.0);
    t.apply_update(&entry("10.1.0.0/16", 1), 2, 1, *N2, 0.0);
    assert_eq!(t.lookup(Ipv4Addr::new(10, 1, 2, 3)).unwrap().interface, 2);
    assert_eq!(t.lookup(Ipv4Addr::new(10, 2, 2, 3)).unwrap().interface, 1);
    assert_eq!(t.lookup(Ipv4Addr::new(11, 0, 0, 1)), None);
    t.invalidate_interface(2, 1.0);
    assert_eq!(t.lookup(Ipv4Addr::new(10, 1, 2, 3)).unwrap().interface, 1);
}

#[test]
fn frame_size() {
    // IP, UDP and RIP headers plus 25 entries
    assert_eq!(RIP_FRAME_SIZE, 532);
}

#[test]
fn timers_are_checked() {
    assert_eq!(RipConfig::default().check(), Ok(()));
    let cfg = RipConfig {
        garbage_collection_delay: f64::INFINITY,
        ..Default::default()
    };
    assert_eq!(
        cfg.check(),
        Err(NetworkError::InvalidTimer(
            "garbage_collection_delay",
            f64::INFINITY
        ))
    );
    let cfg = RipConfig {
        failure_timeout: 0.0,
        ..Default::default()
    };
    assert_eq!(
        cfg.check(),
        Err(NetworkError::InvalidTimer("failure_timeout", 0.0))
    );
}

#[test]
fn parse_split_horizon() {
    assert_eq!("PoisonReverse".parse(), Ok(SplitHorizon::PoisonReverse));
    assert_eq!("split-horizon".parse(), Ok(SplitHorizon::SplitHorizon));
    assert_eq!("no_split_horizon".parse(), Ok(SplitHorizon::NoSplitHorizon));
    assert!("foo".parse::<SplitHorizon>().is_err());
    assert_eq!(SplitHorizon::default(), SplitHorizon::PoisonReverse);
    assert_eq!(SplitHorizon::SplitHorizon.to_string(), "SplitHorizon");
}
