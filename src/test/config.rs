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

use pretty_assertions::assert_eq;
use ripsim::{builder::LinkSelection, event::LinkAction, rip::SplitHorizon, types::NetworkError};
use test_log::test;

use crate::{
    scenario::{FailureConfig, MetricOverride, ScenarioError, DEFAULT_SNAPSHOTS},
    Report, ScenarioConfig, ScenarioKind,
};

#[test]
fn empty_json_is_default() {
    let config = ScenarioConfig::from_json("{}").unwrap();
    assert_eq!(config, ScenarioConfig::default());
    assert_eq!(config.kind, ScenarioKind::Ring);
    assert_eq!(config.rip.split_horizon, SplitHorizon::PoisonReverse);
    assert_eq!(config.rip.update_interval, 30.0);
    assert_eq!(config.horizon, 200.0);
    assert_eq!(config.snapshots, DEFAULT_SNAPSHOTS.to_vec());
    assert_eq!(config.failures(), vec![FailureConfig::down(40.0, "F", "G")]);
}

#[test]
fn partial_json() {
    let config = ScenarioConfig::from_json(
        r#"{
            "kind": "chain",
            "chain": {
                "routers": 7,
                "shortcuts": true,
                "removal": { "selection": { "Bernoulli": { "probability": 0.3, "at_least_one": false } } }
            },
            "rip": { "split_horizon": "SplitHorizon" },
            "failures": [ { "time": 50.0, "a": "R2", "b": "R3" } ],
            "probe": null,
            "seed": 12
        }"#,
    )
    .unwrap();
    assert_eq!(config.kind, ScenarioKind::Chain);
    assert_eq!(config.chain.routers, 7);
    assert!(config.chain.shortcuts);
    let removal = config.chain.removal.unwrap();
    assert_eq!(removal.time, 40.0);
    assert_eq!(
        removal.selection,
        LinkSelection::Bernoulli {
            probability: 0.3,
            at_least_one: false
        }
    );
    assert_eq!(config.rip.split_horizon, SplitHorizon::SplitHorizon);
    assert_eq!(config.rip.failure_timeout, 180.0);
    assert_eq!(config.failures().len(), 1);
    assert_eq!(config.failures()[0].action, LinkAction::Down);
    assert_eq!(config.probe, None);
    assert_eq!(config.seed, 12);

    let mut scenario = config.build().unwrap();
    assert_eq!(scenario.probe, None);
    let report = scenario.run().unwrap();
    assert_eq!(report.sent, 0);
    assert_eq!(report.loss(), 0.0);
}

#[test]
fn json_round_trip() {
    let mut config = ScenarioConfig::chain(3);
    config.metric_overrides.push(MetricOverride {
        node: "R1".to_string(),
        interface: 1,
        metric: 3,
    });
    config.failures = Some(vec![
        FailureConfig::down(20.0, "R0", "R1"),
        FailureConfig::up(60.0, "R0", "R1"),
    ]);
    let json = config.to_json().unwrap();
    assert_eq!(ScenarioConfig::from_json(&json).unwrap(), config);
}

#[test]
fn unknown_links() {
    // A and B are not adjacent in the ring.
    let mut config = ScenarioConfig::ring();
    config.failures = Some(vec![FailureConfig::down(10.0, "A", "B")]);
    match config.build() {
        Err(ScenarioError::NoLink(a, b)) => assert_eq!((a.as_str(), b.as_str()), ("A", "B")),
        r => panic!("unexpected result: {:?}", r.map(|_| ())),
    }

    config.failures = Some(vec![FailureConfig::down(10.0, "A", "Z")]);
    match config.build() {
        Err(ScenarioError::Network(NetworkError::NodeNameNotFound(n))) => assert_eq!(n, "Z"),
        r => panic!("unexpected result: {:?}", r.map(|_| ())),
    }
}

#[test]
fn invalid_horizon() {
    let mut config = ScenarioConfig::ring();
    config.horizon = -1.0;
    assert!(matches!(config.build(), Err(ScenarioError::InvalidConfig(_))));
}

#[test]
fn invalid_timers() {
    let config =
        ScenarioConfig::from_json(r#"{ "rip": { "triggered_update_delay": 0.0 } }"#).unwrap();
    match config.build() {
        Err(ScenarioError::InvalidConfig(msg)) => assert!(msg.contains("triggered_update_delay")),
        r => panic!("unexpected result: {:?}", r.map(|_| ())),
    }

    let mut config = ScenarioConfig::chain(3);
    config.rip.tick_interval = -1.0;
    assert!(matches!(config.build(), Err(ScenarioError::InvalidConfig(_))));
}

#[test]
fn metric_override() {
    let mut config = ScenarioConfig::ring();
    config.failures = Some(Vec::new());
    config.snapshots = vec![30.0];
    config.horizon = 40.0;
    let a_to_f = config.build().unwrap();
    let topo = a_to_f.network.topology();
    let a = topo.node_id("A").unwrap();
    let f = topo.node_id("F").unwrap();
    let iface = topo
        .link(topo.link_between(a, f).unwrap())
        .unwrap()
        .endpoint(a)
        .unwrap()
        .interface;
    // make the path over F longer than the one over C
    config.metric_overrides.push(MetricOverride {
        node: "A".to_string(),
        interface: iface,
        metric: 5,
    });
    let report = config.build().unwrap().run().unwrap();
    let dst: ipnet::Ipv4Net = "10.0.9.0/24".parse().unwrap();
    let entry = report
        .record
        .snapshots
        .iter()
        .find(|s| s.name == "A")
        .unwrap()
        .entries
        .iter()
        .find(|e| e.destination == dst)
        .copied()
        .unwrap();
    assert_eq!(entry.metric, 5);
    assert_eq!(entry.next_hop, Some("10.0.8.1".parse().unwrap()));
}

#[test]
fn write_report() {
    let mut config = ScenarioConfig::chain(2);
    config.horizon = 20.0;
    let report = config.build().unwrap().run().unwrap();
    let path = std::env::temp_dir().join("rip-scenarios-test-report.json");
    report.write_json(&path).unwrap();
    // writing twice overwrites the file
    report.write_json(&path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    let parsed: Report = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed.kind, report.kind);
    assert_eq!(parsed.sent, report.sent);
    assert_eq!(parsed.received, report.received);
    assert_eq!(parsed.record.route_changes.len(), report.record.route_changes.len());
}
