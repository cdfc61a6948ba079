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

//! # Top-level Network module
//!
//! This module owns the topology, all routers and hosts, the probes, and the scheduler, and it
//! drives the simulation forward by dispatching every due event.

use std::{collections::BTreeMap, net::Ipv4Addr};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    event::{Event, EventId, LinkEvent, ScheduledAction, Scheduler},
    formatter::NetworkFormatter,
    probe::{
        forward, DropReason, Forwarding, Packet, PacketKind, Probe, ProbeId, ProbeState,
        DEFAULT_TTL,
    },
    record::{FailedAction, LinkRecord, ProbeOutcome, Record, SnapshotEntry, TableSnapshot},
    rip::{RipConfig, RoutingTable},
    router::Router,
    topology::Topology,
    types::{Endpoint, IfIndex, LinkId, NetworkError, NodeId, StepUpdate},
};

/// Default end of the simulation, in seconds.
pub const DEFAULT_HORIZON: f64 = 200.0;

/// Configuration of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Configuration of the routing protocol, shared by all routers
    pub rip: RipConfig,
    /// No event after this time is executed.
    pub horizon: f64,
    /// Link state changes scheduled when the simulation starts.
    pub scheduled_failures: Vec<LinkEvent>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rip: RipConfig::default(),
            horizon: DEFAULT_HORIZON,
            scheduled_failures: Vec::new(),
        }
    }
}

/// # Network struct
/// The network contains the [`Topology`], a [`Router`] for every router node, the default routes
/// of all hosts, the probes, and the [`Scheduler`].
///
/// ```rust
/// use ripsim::prelude::*;
///
/// fn main() -> Result<(), NetworkError> {
///     let mut topo = Topology::new();
///     let r1 = topo.add_router("r1");
///     let r2 = topo.add_router("r2");
///     let link = topo.add_link(r1, r2)?;
///     topo.assign_link_network(link, "10.0.1.0/24".parse().unwrap())?;
///
///     let mut net = Network::new(topo, SimulationConfig::default());
///     net.run_until(10.0)?;
///     assert_eq!(net.routing_table(r1)?.len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Network {
    pub(crate) topology: Topology,
    pub(crate) routers: BTreeMap<NodeId, Router>,
    pub(crate) hosts: BTreeMap<NodeId, Option<IfIndex>>,
    pub(crate) probes: Vec<ProbeState>,
    pub(crate) queue: Scheduler<Event>,
    pub(crate) config: SimulationConfig,
    pub(crate) record: Record,
    pub(crate) started: bool,
    pub(crate) verbose: bool,
}

impl Network {
    /// Create a new network from a topology. Every router node gets a router with the routing
    /// protocol configured in `config`.
    pub fn new(topology: Topology, config: SimulationConfig) -> Self {
        let mut net = Self {
            topology,
            routers: BTreeMap::new(),
            hosts: BTreeMap::new(),
            probes: Vec::new(),
            queue: Scheduler::new(),
            config,
            record: Record::new(),
            started: false,
            verbose: false,
        };
        net.create_devices();
        net
    }

    /// Make sure that every node of the topology has its router or host entry.
    fn create_devices(&mut self) {
        let routers: Vec<NodeId> = self.topology.routers().collect();
        for r in routers {
            let name = self.topology.name(r).to_string();
            let rip = self.config.rip;
            self.routers
                .entry(r)
                .or_insert_with(|| Router::new(name, r, rip));
        }
        let hosts: Vec<NodeId> = self.topology.hosts().collect();
        for h in hosts {
            self.hosts.entry(h).or_insert(None);
        }
    }

    /// Get the topology
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Get a mutable reference to the topology. Routers observe changes on their next tick.
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    /// Get the configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Set the network into verbose mode (or not). In verbose mode, every processed event is
    /// printed to stdout.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Current virtual time
    pub fn now(&self) -> f64 {
        self.queue.now()
    }

    /// Returns `true` if the simulation was started.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Get a reference to the scheduler
    pub fn queue(&self) -> &Scheduler<Event> {
        &self.queue
    }

    /// Get a router
    pub fn router(&self, router: NodeId) -> Result<&Router, NetworkError> {
        self.topology.node(router)?;
        self.routers
            .get(&router)
            .ok_or(NetworkError::NotARouter(router))
    }

    /// Iterate over all routers, ordered by their id.
    pub fn routers(&self) -> impl Iterator<Item = &Router> {
        self.routers.values()
    }

    /// Get the routing table of a router
    pub fn routing_table(&self, router: NodeId) -> Result<&RoutingTable, NetworkError> {
        Ok(self.router(router)?.table())
    }

    /// Set the default route of a host to the given interface.
    pub fn set_default_route(
        &mut self,
        host: NodeId,
        interface: IfIndex,
    ) -> Result<(), NetworkError> {
        if !self.topology.node(host)?.is_host() {
            return Err(NetworkError::NotAHost(host));
        }
        if interface == 0 {
            return Err(NetworkError::LoopbackInterface(host));
        }
        self.topology.interface(host, interface)?;
        self.hosts.insert(host, Some(interface));
        Ok(())
    }

    /// Get the default route of a host
    pub fn default_route(&self, host: NodeId) -> Result<Option<IfIndex>, NetworkError> {
        if !self.topology.node(host)?.is_host() {
            return Err(NetworkError::NotAHost(host));
        }
        Ok(self.hosts.get(&host).copied().flatten())
    }

    /// Add a probe. The probe starts sending once the simulation reaches its start time.
    pub fn add_probe(&mut self, probe: Probe) -> Result<ProbeId, NetworkError> {
        probe.check()?;
        if self.topology.node(probe.source)?.primary_address().is_none() {
            return Err(NetworkError::NoAddress(probe.source));
        }
        let id = self.probes.len();
        self.probes.push(ProbeState::new(probe));
        if self.started {
            let at = if probe.start > self.now() {
                probe.start
            } else {
                self.now() + probe.interval
            };
            self.schedule_probe(id, at)?;
        }
        Ok(id)
    }

    /// Get a probe
    pub fn probe(&self, probe: ProbeId) -> Result<&Probe, NetworkError> {
        self.probes
            .get(probe)
            .map(|p| &p.probe)
            .ok_or(NetworkError::ProbeNotFound(probe))
    }

    fn schedule_probe(&mut self, probe: ProbeId, at: f64) -> Result<(), NetworkError> {
        let state = self
            .probes
            .get(probe)
            .ok_or(NetworkError::ProbeNotFound(probe))?;
        if at < state.probe.stop {
            self.queue.schedule(at, Event::ProbeSend(probe))?;
        }
        Ok(())
    }

    /// Schedule a link to go up or down at the given time.
    pub fn schedule_link_state(
        &mut self,
        time: f64,
        link: LinkId,
        up: bool,
    ) -> Result<EventId, NetworkError> {
        self.topology.link(link)?;
        Ok(self.queue.schedule(time, Event::LinkState { link, up })?)
    }

    /// Schedule an arbitrary modification of the topology. Errors returned by the action are
    /// logged and recorded, but they do not stop the simulation.
    pub fn schedule_action(
        &mut self,
        time: f64,
        action: ScheduledAction,
    ) -> Result<EventId, NetworkError> {
        Ok(self.queue.schedule(time, Event::Action(action))?)
    }

    /// Take a snapshot of the routing tables of all routers (`None`), or of a single router, at
    /// the given time.
    pub fn request_snapshot(
        &mut self,
        time: f64,
        router: Option<NodeId>,
    ) -> Result<EventId, NetworkError> {
        if let Some(r) = router {
            self.router(r)?;
        }
        Ok(self.queue.schedule(time, Event::Snapshot(router))?)
    }

    /// Cancel a scheduled event. Returns `true` if the event was still pending.
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.queue.cancel(id)
    }

    /// Start all routers and probes, and schedule the configured link failures. Calling this
    /// function again has no effect.
    pub fn start(&mut self) -> Result<(), NetworkError> {
        if self.started {
            return Ok(());
        }
        self.config.rip.check()?;
        self.create_devices();
        for failure in self.config.scheduled_failures.clone() {
            self.schedule_link_state(failure.time, failure.link, failure.action.is_up())?;
        }
        let now = self.queue.now();
        for (id, router) in self.routers.iter_mut() {
            let updates = router.start(&self.topology, &mut self.queue)?;
            self.record.route_changes(now, *id, updates);
        }
        for probe in 0..self.probes.len() {
            let at = self.probes[probe].probe.start;
            self.schedule_probe(probe, at)?;
        }
        self.started = true;
        Ok(())
    }

    /// Process the next event, unless it is after the horizon. Returns the time of the processed
    /// event, or `None` if no event is due.
    pub fn step(&mut self) -> Result<Option<f64>, NetworkError> {
        self.start()?;
        let Some((time, id, event)) = self.queue.pop_until(self.config.horizon) else {
            return Ok(None);
        };
        trace!("{time:.3} {id} {}", event.fmt(&self.topology));
        if self.verbose {
            println!("{time:>10.6} | {}", event.fmt(&self.topology));
        }
        self.handle_event(time, event)?;
        Ok(Some(time))
    }

    /// Run the simulation until `time` (clamped at the horizon). Events exactly at `time` are
    /// processed.
    pub fn run_until(&mut self, time: f64) -> Result<(), NetworkError> {
        self.start()?;
        let until = time.min(self.config.horizon);
        while self.queue.peek_time().map(|t| t <= until).unwrap_or(false) {
            self.step()?;
        }
        self.queue.advance_to(until);
        Ok(())
    }

    /// Run the simulation until the horizon.
    pub fn run(&mut self) -> Result<(), NetworkError> {
        self.run_until(self.config.horizon)
    }

    /// Get the record of the simulation
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Consume the network and return its record.
    pub fn into_record(self) -> Record {
        self.record
    }

    /// Take a snapshot of the current routing table of a router.
    pub fn snapshot(&self, router: NodeId) -> Result<TableSnapshot, NetworkError> {
        let r = self.router(router)?;
        let entries = r
            .table()
            .iter()
            .map(|e| SnapshotEntry {
                destination: e.destination,
                metric: e.metric,
                next_hop: e.next_hop.and_then(|n| self.address_of(n)),
                interface: e.interface,
                valid: e.is_valid(),
            })
            .collect();
        Ok(TableSnapshot {
            time: self.now(),
            node: router,
            name: r.name().to_string(),
            entries,
        })
    }

    fn address_of(&self, endpoint: Endpoint) -> Option<Ipv4Addr> {
        self.topology
            .interface(endpoint.node, endpoint.interface)
            .ok()?
            .address
            .map(|a| a.addr())
    }

    fn handle_event(&mut self, time: f64, event: Event) -> Result<(), NetworkError> {
        match event {
            Event::PeriodicUpdate(n) => {
                self.routers
                    .get_mut(&n)
                    .ok_or(NetworkError::NotARouter(n))?
                    .handle_periodic_update(&self.topology, &mut self.queue)?;
            }
            Event::TriggeredUpdate(n) => {
                self.routers
                    .get_mut(&n)
                    .ok_or(NetworkError::NotARouter(n))?
                    .handle_triggered_update(&self.topology, &mut self.queue)?;
            }
            Event::Tick(n) => {
                let updates = self
                    .routers
                    .get_mut(&n)
                    .ok_or(NetworkError::NotARouter(n))?
                    .handle_tick(&self.topology, &mut self.queue)?;
                self.log_updates(n, &updates);
                self.record.route_changes(time, n, updates);
            }
            Event::Message {
                link,
                from,
                to,
                message,
            } => {
                let Some(router) = self.routers.get_mut(&to.node) else {
                    trace!("{} ignores routing messages", self.topology.name(to.node));
                    return Ok(());
                };
                let updates = router.handle_message(
                    &self.topology,
                    &mut self.queue,
                    link,
                    from,
                    to.interface,
                    message,
                )?;
                self.log_updates(to.node, &updates);
                self.record.route_changes(time, to.node, updates);
            }
            Event::LinkState { link, up } => {
                self.topology.set_link_state(link, up)?;
                info!(
                    "{time:.3}: link {} is {}",
                    link.fmt(&self.topology),
                    if up { "up" } else { "down" }
                );
                self.record.link_changes.push(LinkRecord { time, link, up });
            }
            Event::Packet { at, packet } => {
                if !self.topology.interface(at.node, at.interface)?.up {
                    self.drop_packet(at.node, packet, DropReason::InterfaceDown);
                } else {
                    self.send_packet(at.node, packet, true)?;
                }
            }
            Event::ProbeSend(probe) => self.send_probe(probe)?,
            Event::ProbeTimeout { probe, seq } => {
                let state = self
                    .probes
                    .get_mut(probe)
                    .ok_or(NetworkError::ProbeNotFound(probe))?;
                if state.pending.remove(&seq).is_some() {
                    debug!("{time:.3}: probe {probe} request {seq} timed out");
                    self.record.probe(time, probe, seq, ProbeOutcome::Timeout);
                }
            }
            Event::Snapshot(router) => {
                let routers: Vec<NodeId> = match router {
                    Some(r) => vec![r],
                    None => self.routers.keys().copied().collect(),
                };
                for r in routers {
                    let snapshot = self.snapshot(r)?;
                    self.record.snapshots.push(snapshot);
                }
            }
            Event::Action(action) => {
                let description = action.description().to_string();
                if let Err(e) = action.apply(&mut self.topology) {
                    warn!("{time:.3}: action `{description}` failed: {e}");
                    self.record.failed_actions.push(FailedAction {
                        time,
                        description,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn log_updates(&self, node: NodeId, updates: &[StepUpdate]) {
        if log_enabled!(Level::Debug) {
            for u in updates {
                debug!(
                    "{:.3}: {}: {}",
                    self.now(),
                    self.topology.name(node),
                    u.fmt(&self.topology)
                );
            }
        }
    }

    /// Send the next request of a probe and schedule its timeout and the next request.
    fn send_probe(&mut self, probe: ProbeId) -> Result<(), NetworkError> {
        let now = self.now();
        let state = self
            .probes
            .get_mut(probe)
            .ok_or(NetworkError::ProbeNotFound(probe))?;
        let p = state.probe;
        let seq = state.next_seq;
        state.next_seq += 1;
        let src = self
            .topology
            .node(p.source)?
            .primary_address()
            .ok_or(NetworkError::NoAddress(p.source))?;

        let timeout = self
            .queue
            .schedule_in(p.timeout, Event::ProbeTimeout { probe, seq })?;
        state.pending.insert(seq, timeout);
        self.record.probe(now, probe, seq, ProbeOutcome::Sent);

        let packet = Packet {
            probe,
            seq,
            kind: PacketKind::EchoRequest,
            src,
            dst: p.destination,
            ttl: DEFAULT_TTL,
            size: p.size,
            sent_at: now,
        };
        self.send_packet(p.source, packet, false)?;
        self.schedule_probe(probe, now + p.interval)
    }

    /// Forward a packet at `node`, or deliver it locally. If `transit` is set, the TTL is
    /// decremented before forwarding.
    fn send_packet(
        &mut self,
        node: NodeId,
        mut packet: Packet,
        transit: bool,
    ) -> Result<(), NetworkError> {
        let table = self.routers.get(&node).map(|r| r.table());
        let default_route = self.hosts.get(&node).copied().flatten();
        let out = match forward(&self.topology, node, table, default_route, packet.dst)? {
            Ok(Forwarding::Deliver) => return self.deliver_packet(node, packet),
            Ok(Forwarding::Send(out)) => out,
            Err(reason) => {
                self.drop_packet(node, packet, reason);
                return Ok(());
            }
        };
        if transit {
            packet.ttl = packet.ttl.saturating_sub(1);
            if packet.ttl == 0 {
                self.drop_packet(node, packet, DropReason::TtlExpired);
                return Ok(());
            }
        }
        let Some((link, to)) = self.topology.neighbor(node, out)? else {
            self.drop_packet(node, packet, DropReason::InterfaceDown);
            return Ok(());
        };
        let delay = self.topology.link(link)?.transmission_time(packet.size);
        self.queue
            .schedule_in(delay, Event::Packet { at: to, packet })?;
        Ok(())
    }

    fn deliver_packet(&mut self, node: NodeId, packet: Packet) -> Result<(), NetworkError> {
        match packet.kind {
            PacketKind::EchoRequest => self.send_packet(node, packet.reply(), false),
            PacketKind::EchoReply => {
                let now = self.now();
                let rtt = now - packet.sent_at;
                let state = self
                    .probes
                    .get_mut(packet.probe)
                    .ok_or(NetworkError::ProbeNotFound(packet.probe))?;
                let outcome = match state.pending.remove(&packet.seq) {
                    Some(timeout) => {
                        self.queue.cancel(timeout);
                        ProbeOutcome::Received { rtt }
                    }
                    None => ProbeOutcome::Late { rtt },
                };
                trace!("{now:.3}: probe {} request {}: {outcome:?}", packet.probe, packet.seq);
                self.record.probe(now, packet.probe, packet.seq, outcome);
                Ok(())
            }
        }
    }

    fn drop_packet(&mut self, node: NodeId, packet: Packet, reason: DropReason) {
        debug!(
            "{:.3}: {} drops packet to {} ({:?})",
            self.now(),
            self.topology.name(node),
            packet.dst,
            reason
        );
        self.record.probe(
            self.now(),
            packet.probe,
            packet.seq,
            ProbeOutcome::Dropped { node, reason },
        );
    }
}
