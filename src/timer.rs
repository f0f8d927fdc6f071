// RipSim: IPv4 Router and RIPv2 Simulator written in Rust
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

//! Deterministic timer queue driven by an injected monotonic clock.
//!
//! Timers do not carry callbacks. They carry plain event values that the
//! owner interprets when [`TimerQueue::advance`] hands them back; this keeps
//! closures out of the data plane and makes cancellation a simple removal.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque handle of a scheduled timer, used only to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct TimerEntry<E> {
    handle: TimerHandle,
    deadline: Duration,
    period: Option<Duration>,
    event: E,
}

/// A queue of pending timers ordered by deadline.
///
/// Time only moves when the owner calls [`TimerQueue::advance`]; the queue
/// never reads a wall clock. Periodic timers are re-armed relative to their
/// previous deadline, so a large jump of the clock fires them once per
/// elapsed period.
#[derive(Debug, Clone)]
pub struct TimerQueue<E> {
    now: Duration,
    next_handle: u64,
    entries: Vec<TimerEntry<E>>,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_handle: 0,
            entries: Vec::new(),
        }
    }
}

impl<E: Clone> TimerQueue<E> {
    /// Create an empty queue at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current time of the queue.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no timer is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Schedule `event` to fire once after `delay`.
    pub fn schedule_once(&mut self, delay: Duration, event: E) -> TimerHandle {
        self.schedule(self.now + delay, None, event)
    }

    /// Schedule `event` to fire every `period`, first after one full period.
    pub fn schedule_periodic(&mut self, period: Duration, event: E) -> TimerHandle {
        self.schedule(self.now + period, Some(period), event)
    }

    fn schedule(&mut self, deadline: Duration, period: Option<Duration>, event: E) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push(TimerEntry {
            handle,
            deadline,
            period,
            event,
        });
        handle
    }

    /// Cancel a timer. Unknown or already-fired handles are ignored.
    pub fn cancel(&mut self, handle: TimerHandle) {
        self.entries.retain(|e| e.handle != handle);
    }

    /// Move the clock to `now` and collect every event whose deadline has
    /// passed, in (deadline, creation) order. The clock never moves
    /// backwards; an older `now` is clamped to the current time.
    pub fn advance(&mut self, now: Duration) -> Vec<E> {
        let target = now.max(self.now);
        let mut fired = Vec::new();
        loop {
            let next = self
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.deadline <= target)
                .min_by_key(|(_, e)| (e.deadline, e.handle))
                .map(|(i, _)| i);
            let Some(i) = next else { break };
            match self.entries[i].period {
                Some(period) => {
                    fired.push(self.entries[i].event.clone());
                    self.entries[i].deadline += period;
                }
                None => fired.push(self.entries.remove(i).event),
            }
        }
        self.now = target;
        fired
    }
}
