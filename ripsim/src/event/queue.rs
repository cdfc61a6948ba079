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

//! Module containing the timed event queue with a virtual clock.

use ordered_float::NotNan;
use priority_queue::PriorityQueue;
use std::{cmp::Reverse, collections::HashMap};

use crate::types::SchedulerError;

/// Handle of a scheduled event, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u64);

impl EventId {
    /// Sequence number of the event. Events scheduled later have larger numbers.
    pub fn seq(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discrete-event scheduler. Events are returned in the order of their time. Events scheduled
/// for the same time are returned in the order in which they were scheduled.
///
/// The clock only moves forward. Before the first event was popped, the clock is unset and any
/// non-negative time can be scheduled. Afterwards, events must be scheduled strictly after the
/// current time.
#[derive(Debug)]
pub struct Scheduler<E> {
    q: PriorityQueue<EventId, Reverse<(NotNan<f64>, EventId)>>,
    events: HashMap<EventId, (NotNan<f64>, E)>,
    next_id: u64,
    now: Option<NotNan<f64>>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    /// Create a new, empty scheduler with an unset clock.
    pub fn new() -> Self {
        Self {
            q: PriorityQueue::new(),
            events: HashMap::new(),
            next_id: 0,
            now: None,
        }
    }

    /// Current virtual time. Returns `0.0` if no event was processed yet.
    pub fn now(&self) -> f64 {
        self.now.map(|t| t.into_inner()).unwrap_or_default()
    }

    /// Returns `true` if the clock was started, i.e., at least one event was popped or the clock
    /// was advanced explicitly.
    pub fn is_started(&self) -> bool {
        self.now.is_some()
    }

    fn check_time(&self, at: f64) -> Result<NotNan<f64>, SchedulerError> {
        let t = NotNan::new(at).map_err(|_| SchedulerError::InvalidTime(at))?;
        match self.now {
            Some(now) if t <= now => Err(SchedulerError::PastDeadline {
                at,
                now: now.into_inner(),
            }),
            None if at < 0.0 => Err(SchedulerError::PastDeadline { at, now: 0.0 }),
            _ => Ok(t),
        }
    }

    /// Schedule an event at an absolute time.
    pub fn schedule(&mut self, at: f64, event: E) -> Result<EventId, SchedulerError> {
        let t = self.check_time(at)?;
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.q.push(id, Reverse((t, id)));
        self.events.insert(id, (t, event));
        Ok(id)
    }

    /// Schedule an event `delay` seconds after the current time.
    pub fn schedule_in(&mut self, delay: f64, event: E) -> Result<EventId, SchedulerError> {
        self.schedule(self.now() + delay, event)
    }

    /// Cancel a scheduled event. Returns `true` if the event was still pending. Cancelling an
    /// event that already fired (or was cancelled before) has no effect.
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.q.remove(&id);
        self.events.remove(&id).is_some()
    }

    /// Returns `true` if the event is still pending.
    pub fn is_scheduled(&self, id: EventId) -> bool {
        self.events.contains_key(&id)
    }

    /// Time of the event that fires next.
    pub fn peek_time(&self) -> Option<f64> {
        self.q.peek().map(|(_, Reverse((t, _)))| t.into_inner())
    }

    /// Get the time and the payload of a pending event.
    pub fn get(&self, id: EventId) -> Option<(f64, &E)> {
        self.events.get(&id).map(|(t, e)| (t.into_inner(), e))
    }

    /// Pop the next event and advance the clock to its time.
    pub fn pop(&mut self) -> Option<(f64, EventId, E)> {
        let (id, _) = self.q.pop()?;
        let (t, event) = self.events.remove(&id)?;
        self.now = Some(t);
        Some((t.into_inner(), id, event))
    }

    /// Pop the next event only if it fires at or before `horizon`.
    pub fn pop_until(&mut self, horizon: f64) -> Option<(f64, EventId, E)> {
        match self.peek_time() {
            Some(t) if t <= horizon => self.pop(),
            _ => None,
        }
    }

    /// Move the clock forward to `t` without processing anything. Does nothing if `t` is not
    /// later than the current time, or if an event is pending before `t`.
    pub fn advance_to(&mut self, t: f64) {
        let Ok(t) = NotNan::new(t) else { return };
        if self.now.map(|now| now >= t).unwrap_or(false) {
            return;
        }
        if self.peek_time().map(|next| next < t.into_inner()).unwrap_or(false) {
            return;
        }
        self.now = Some(t);
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no event is pending.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove all pending events. The clock is not changed.
    pub fn clear(&mut self) {
        self.q.clear();
        self.events.clear();
    }

    /// Iterate over all pending events in an arbitrary order.
    pub fn pending(&self) -> impl Iterator<Item = (EventId, f64, &E)> {
        self.events
            .iter()
            .map(|(id, (t, e))| (*id, t.into_inner(), e))
    }
}
