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

//! Test the traffic probes and the packet forwarding

use std::net::Ipv4Addr;

use approx::assert_abs_diff_eq;

use crate::{
    network::{Network, SimulationConfig},
    probe::{forward, DropReason, Forwarding, Probe},
    record::ProbeOutcome,
    rip::RoutingTable,
    test::chain_with_hosts,
    types::{LinkId, NetworkError, NodeId},
};

use pretty_assertions::assert_eq;

const DST: Ipv4Addr = Ipv4Addr::new(10, 7, 0, 2);

/// One-way time of a 1024-byte packet over a single default link.
const HOP: f64 = 0.002 + 1024.0 * 8.0 / 5_000_000.0;

/// Chain of three routers between `src` and `dst`, with default routes configured on both hosts.
fn setup() -> (Network, NodeId, Vec<LinkId>) {
    let (topo, src, dst, _, links) = chain_with_hosts(3);
    let mut net = Network::new(topo, SimulationConfig::default());
    net.set_default_route(src, 1).unwrap();
    net.set_default_route(dst, 1).unwrap();
    (net, src, links)
}

#[test]
fn round_trip_time() {
    let (mut net, src, _) = setup();
    let p = net.add_probe(Probe::new(src, DST).active(10.0, 15.0)).unwrap();
    net.run_until(20.0).unwrap();

    assert_eq!(net.record().reachability(p), (5, 5));
    let rtts = net.record().round_trip_times(p);
    assert_eq!(rtts.iter().map(|(seq, _)| *seq).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    for (_, rtt) in rtts {
        assert_abs_diff_eq!(rtt, 8.0 * HOP, epsilon = 1e-9);
    }
    assert!(net.record().outages(p).is_empty());
}

#[test]
fn echo_from_router() {
    let (mut net, src, _) = setup();
    // address of r1 towards r2
    let target = Ipv4Addr::new(10, 0, 1, 1);
    let p = net.add_probe(Probe::new(src, target).active(10.0, 12.0)).unwrap();
    net.run_until(20.0).unwrap();
    assert_eq!(net.record().reachability(p), (2, 2));
    for (_, rtt) in net.record().round_trip_times(p) {
        assert_abs_diff_eq!(rtt, 4.0 * HOP, epsilon = 1e-9);
    }
}

#[test]
fn smaller_packets_are_faster() {
    let (mut net, src, _) = setup();
    let p = net
        .add_probe(Probe::new(src, DST).active(10.0, 11.0).size(64))
        .unwrap();
    net.run_until(20.0).unwrap();
    let rtts = net.record().round_trip_times(p);
    assert_eq!(rtts.len(), 1);
    assert_abs_diff_eq!(rtts[0].1, 8.0 * (0.002 + 64.0 * 8.0 / 5_000_000.0), epsilon = 1e-9);
}

#[test]
fn outage_during_failure() {
    let (mut net, src, links) = setup();
    let p = net.add_probe(Probe::new(src, DST).active(10.0, 60.0)).unwrap();
    net.schedule_link_state(20.0, links[1], false).unwrap();
    net.schedule_link_state(40.0, links[1], true).unwrap();
    net.run_until(70.0).unwrap();

    let outages = net.record().outages(p);
    assert_eq!(outages.len(), 1);
    let outage = outages[0];
    assert_eq!(outage.start, 20.0);
    let end = outage.end.unwrap();
    assert!(end > 40.0 && end <= 50.0, "outage ended at {end}");
    assert_eq!(outage.lost as f64, end - 20.0);
    assert_eq!(outage.duration(), Some(end - 20.0));

    let (sent, received) = net.record().reachability(p);
    assert_eq!(sent, 50);
    assert_eq!(received, 50 - outage.lost as usize);

    // requests during the outage are dropped by r0 or r1, and then time out.
    let dropped = net
        .record()
        .probe_records(p)
        .filter(|r| matches!(r.outcome, ProbeOutcome::Dropped { .. }))
        .count();
    let timeouts = net
        .record()
        .probe_records(p)
        .filter(|r| r.outcome == ProbeOutcome::Timeout)
        .count();
    assert_eq!(dropped, outage.lost as usize);
    assert_eq!(timeouts, outage.lost as usize);
}

#[test]
fn host_without_default_route() {
    let (topo, src, _, _, _) = chain_with_hosts(3);
    let mut net = Network::new(topo, SimulationConfig::default());
    let p = net.add_probe(Probe::new(src, DST).active(10.0, 11.0)).unwrap();
    net.run_until(20.0).unwrap();
    let outcomes: Vec<ProbeOutcome> = net.record().probe_records(p).map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            ProbeOutcome::Sent,
            ProbeOutcome::Dropped {
                node: src,
                reason: DropReason::NoRoute
            },
            ProbeOutcome::Timeout,
        ]
    );
    assert_eq!(net.record().outages(p).len(), 1);
    assert_eq!(net.record().outages(p)[0].end, None);
}

#[test]
fn probe_added_after_start() {
    let (mut net, src, _) = setup();
    net.run_until(5.0).unwrap();
    let p = net.add_probe(Probe::new(src, DST).active(1.0, 10.0)).unwrap();
    net.run_until(20.0).unwrap();
    let sent: Vec<f64> = net
        .record()
        .probe_records(p)
        .filter(|r| r.outcome == ProbeOutcome::Sent)
        .map(|r| r.time)
        .collect();
    assert_eq!(sent, vec![6.0, 7.0, 8.0, 9.0]);
}

#[test]
fn probe_errors() {
    let (mut topo, src, _, _, _) = chain_with_hosts(2);
    let lonely = topo.add_host("lonely");
    let mut net = Network::new(topo, SimulationConfig::default());
    assert_eq!(
        net.add_probe(Probe::new(lonely, DST)),
        Err(NetworkError::NoAddress(lonely))
    );
    assert!(matches!(
        net.add_probe(Probe::new(src, DST).interval(0.0)),
        Err(NetworkError::InvalidLinkParameter(_))
    ));
    assert_eq!(net.probe(3), Err(NetworkError::ProbeNotFound(3)));
    let p = net.add_probe(Probe::new(src, DST)).unwrap();
    assert_eq!(net.probe(p).unwrap().destination, DST);
}

#[test]
fn forwarding_decisions() {
    let (mut topo, src, dst, routers, links) = chain_with_hosts(2);
    // hosts deliver to themselves and use the connected network and their default route.
    assert_eq!(
        forward(&topo, src, None, None, Ipv4Addr::new(10, 6, 0, 2)),
        Ok(Ok(Forwarding::Deliver))
    );
    assert_eq!(
        forward(&topo, src, None, None, Ipv4Addr::new(10, 6, 0, 1)),
        Ok(Ok(Forwarding::Send(1)))
    );
    assert_eq!(
        forward(&topo, src, None, None, DST),
        Ok(Err(DropReason::NoRoute))
    );
    assert_eq!(
        forward(&topo, src, None, Some(1), DST),
        Ok(Ok(Forwarding::Send(1)))
    );

    topo.set_link_state(links[0], false).unwrap();
    let table = RoutingTable::new();
    assert_eq!(
        forward(&topo, routers[0], Some(&table), None, DST),
        Ok(Err(DropReason::NoRoute))
    );

    let src_link = topo.link_between(routers[0], src).unwrap();
    topo.set_link_state(src_link, false).unwrap();
    assert_eq!(
        forward(&topo, src, None, Some(1), DST),
        Ok(Err(DropReason::InterfaceDown))
    );
    assert_eq!(
        forward(&topo, dst, None, None, DST),
        Ok(Ok(Forwarding::Deliver))
    );
}
