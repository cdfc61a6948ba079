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

//! Module defining a router running the distance-vector routing protocol.

use std::collections::BTreeMap;

use log::*;

use crate::{
    event::{Event, EventId, Scheduler},
    rip::{RipConfig, RipMessage, RoutingTable, RIP_FRAME_SIZE},
    topology::Topology,
    types::{Endpoint, IfIndex, LinkId, NetworkError, NodeId, StepUpdate},
};

/// Router running the distance-vector routing protocol
#[derive(Debug, Clone)]
pub struct Router {
    /// Name of the router
    name: String,
    /// ID of the router
    router_id: NodeId,
    /// The routing table
    pub(crate) table: RoutingTable,
    /// Time at which each neighbor (identified by the interface) was last heard from.
    pub(crate) neighbors: BTreeMap<IfIndex, f64>,
    /// Interface state as observed on the last tick.
    pub(crate) observed: BTreeMap<IfIndex, bool>,
    /// Handle of the pending triggered update.
    pub(crate) pending_update: Option<EventId>,
    /// Protocol timers and split horizon mode
    config: RipConfig,
}

impl Router {
    pub(crate) fn new(name: String, router_id: NodeId, config: RipConfig) -> Router {
        Router {
            name,
            router_id,
            table: RoutingTable::new(),
            neighbors: BTreeMap::new(),
            observed: BTreeMap::new(),
            pending_update: None,
            config,
        }
    }

    /// Return the idx of the Router
    pub fn router_id(&self) -> NodeId {
        self.router_id
    }

    /// Return the name of the Router
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Get the routing table
    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Get the configuration of the routing protocol
    pub fn config(&self) -> &RipConfig {
        &self.config
    }

    /// Time at which each neighbor was last heard from, indexed by the interface.
    pub fn neighbors(&self) -> &BTreeMap<IfIndex, f64> {
        &self.neighbors
    }

    /// Returns `true` if a triggered update is pending.
    pub fn has_pending_update(&self) -> bool {
        self.pending_update.is_some()
    }

    /// Install all connected routes, send a request on every active interface, and start the
    /// periodic timers.
    pub(crate) fn start(
        &mut self,
        topo: &Topology,
        queue: &mut Scheduler<Event>,
    ) -> Result<Vec<StepUpdate>, NetworkError> {
        let node = topo.node(self.router_id)?;
        self.observed = node.link_interfaces().map(|i| (i.index, i.up)).collect();
        let updates = self.reconcile_connected(topo, queue.now())?;
        for iface in node.link_interfaces().filter(|i| i.is_active()) {
            self.send(topo, queue, iface.index, RipMessage::Request)?;
        }
        queue.schedule_in(
            self.config.update_interval,
            Event::PeriodicUpdate(self.router_id),
        )?;
        queue.schedule_in(self.config.tick_interval, Event::Tick(self.router_id))?;
        Ok(updates)
    }

    /// Send the full table out of every active interface and schedule the next periodic update.
    pub(crate) fn handle_periodic_update(
        &mut self,
        topo: &Topology,
        queue: &mut Scheduler<Event>,
    ) -> Result<(), NetworkError> {
        // the full table is sent now, so a pending triggered update is obsolete.
        if let Some(id) = self.pending_update.take() {
            queue.cancel(id);
        }
        self.send_table(topo, queue)?;
        queue.schedule_in(
            self.config.update_interval,
            Event::PeriodicUpdate(self.router_id),
        )?;
        Ok(())
    }

    /// Send the full table out of every active interface.
    pub(crate) fn handle_triggered_update(
        &mut self,
        topo: &Topology,
        queue: &mut Scheduler<Event>,
    ) -> Result<(), NetworkError> {
        self.pending_update = None;
        self.send_table(topo, queue)
    }

    /// Handle a message received on `interface` over `link`.
    pub(crate) fn handle_message(
        &mut self,
        topo: &Topology,
        queue: &mut Scheduler<Event>,
        link: LinkId,
        from: Endpoint,
        interface: IfIndex,
        message: RipMessage,
    ) -> Result<Vec<StepUpdate>, NetworkError> {
        let iface = topo.interface(self.router_id, interface)?;
        if !iface.is_active() || !topo.link(link)?.up {
            trace!(
                "{}: drop message received on inactive interface {}",
                self.name,
                interface
            );
            return Ok(Vec::new());
        }
        let cost = iface.metric;
        let now = queue.now();
        self.neighbors.insert(interface, now);

        match message {
            RipMessage::Request => {
                let entries = self
                    .table
                    .advertisement(interface, self.config.split_horizon);
                self.send(topo, queue, interface, RipMessage::Response(entries))?;
                Ok(Vec::new())
            }
            RipMessage::Response(entries) => {
                let updates: Vec<StepUpdate> = entries
                    .iter()
                    .filter_map(|e| self.table.apply_update(e, interface, cost, from, now))
                    .filter(|u| u.changed())
                    .collect();
                if !updates.is_empty() {
                    self.request_triggered_update(queue)?;
                }
                Ok(updates)
            }
        }
    }

    /// Observe the interface state, age routes and neighbors, collect garbage, and schedule the
    /// next tick.
    pub(crate) fn handle_tick(
        &mut self,
        topo: &Topology,
        queue: &mut Scheduler<Event>,
    ) -> Result<Vec<StepUpdate>, NetworkError> {
        let now = queue.now();
        let node = topo.node(self.router_id)?;
        let mut updates = Vec::new();
        let mut trigger = false;

        for iface in node.link_interfaces() {
            let was_up = self.observed.insert(iface.index, iface.up).unwrap_or(iface.up);
            match (was_up, iface.up) {
                (true, false) => {
                    info!("{}: interface {} went down", self.name, iface.index);
                    updates.extend(self.table.invalidate_interface(iface.index, now));
                    self.neighbors.remove(&iface.index);
                    trigger = true;
                }
                (false, true) => {
                    info!("{}: interface {} came back up", self.name, iface.index);
                    if let Some(id) = self.pending_update.take() {
                        queue.cancel(id);
                    }
                    if iface.is_active() {
                        self.send(topo, queue, iface.index, RipMessage::Request)?;
                    }
                    trigger = true;
                }
                _ => {}
            }
        }

        updates.extend(self.reconcile_connected(topo, now)?);

        let timeout = self.config.failure_timeout;
        let silent: Vec<IfIndex> = self
            .neighbors
            .iter()
            .filter(|(_, last)| now - **last > timeout)
            .map(|(i, _)| *i)
            .collect();
        for i in silent {
            debug!("{}: neighbor on interface {} timed out", self.name, i);
            self.neighbors.remove(&i);
            updates.extend(self.table.invalidate_learned(i, now));
        }
        updates.extend(self.table.expire(now, timeout));

        if updates.iter().any(|u| u.changed()) {
            trigger = true;
        }

        updates.extend(
            self.table
                .collect_garbage(now, self.config.garbage_collection_delay),
        );

        if trigger {
            self.request_triggered_update(queue)?;
        }
        queue.schedule_in(self.config.tick_interval, Event::Tick(self.router_id))?;
        Ok(updates.into_iter().filter(|u| u.changed()).collect())
    }

    /// Make sure that every up interface with an address has its connected route, with the
    /// current interface metric.
    fn reconcile_connected(
        &mut self,
        topo: &Topology,
        now: f64,
    ) -> Result<Vec<StepUpdate>, NetworkError> {
        let node = topo.node(self.router_id)?;
        let missing: Vec<_> = node
            .link_interfaces()
            .filter(|i| i.up)
            .filter_map(|i| i.network().map(|n| (n, i.index, i.metric)))
            .filter(|(net, index, metric)| match self.table.get(net) {
                Some(e) => {
                    !(e.is_connected() && e.is_valid() && e.interface == *index && e.metric == *metric)
                }
                None => true,
            })
            .collect();
        Ok(missing
            .into_iter()
            .filter_map(|(net, index, metric)| {
                self.table.install_connected(net, index, metric, now)
            })
            .collect())
    }

    /// Schedule a triggered update, unless one is already pending.
    fn request_triggered_update(&mut self, queue: &mut Scheduler<Event>) -> Result<(), NetworkError> {
        if let Some(id) = self.pending_update {
            if queue.is_scheduled(id) {
                return Ok(());
            }
        }
        let id = queue.schedule_in(
            self.config.triggered_update_delay,
            Event::TriggeredUpdate(self.router_id),
        )?;
        self.pending_update = Some(id);
        Ok(())
    }

    /// Send the advertisement for each active interface.
    fn send_table(
        &mut self,
        topo: &Topology,
        queue: &mut Scheduler<Event>,
    ) -> Result<(), NetworkError> {
        let node = topo.node(self.router_id)?;
        for iface in node.link_interfaces().filter(|i| i.is_active()) {
            let entries = self
                .table
                .advertisement(iface.index, self.config.split_horizon);
            if entries.is_empty() {
                continue;
            }
            self.send(topo, queue, iface.index, RipMessage::Response(entries))?;
        }
        Ok(())
    }

    /// Put a message on the link attached to `interface`.
    fn send(
        &self,
        topo: &Topology,
        queue: &mut Scheduler<Event>,
        interface: IfIndex,
        message: RipMessage,
    ) -> Result<(), NetworkError> {
        let Some((link, to)) = topo.neighbor(self.router_id, interface)? else {
            return Ok(());
        };
        let delay = topo.link(link)?.transmission_time(RIP_FRAME_SIZE);
        trace!(
            "{}: send {:?} on interface {}",
            self.name,
            message,
            interface
        );
        queue.schedule_in(
            delay,
            Event::Message {
                link,
                from: Endpoint::new(self.router_id, interface),
                to,
                message,
            },
        )?;
        Ok(())
    }
}
