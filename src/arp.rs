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

//! ARP cache and resolver state.
//!
//! The resolver carries no callbacks. A packet whose next hop is unresolved
//! is parked in a per-target FIFO; the presence of that FIFO doubles as the
//! "request in flight" flag, so any number of packets to the same next hop
//! cause exactly one broadcast request. An inbound reply drains the FIFO,
//! and a per-packet timer drops parked packets that waited too long.

use std::{collections::HashMap, net::Ipv4Addr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    timer::TimerHandle,
    types::MacAddr,
    wire::Ipv4Packet,
};

/// How long a packet may wait for ARP resolution before it is dropped.
pub const ARP_QUEUE_TIMEOUT: Duration = Duration::from_secs(2);

/// A resolved IP-to-MAC mapping.
///
/// Entries are learned from every received ARP packet, requests and
/// gratuitous announcements included, and have no aging timer; they persist
/// until the cache is explicitly cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArpEntry {
    /// Hardware address of the neighbor.
    pub mac: MacAddr,
    /// Port the mapping was learned on.
    pub iface: String,
    /// Time of the most recent ARP packet from this neighbor.
    pub last_seen: Duration,
}

/// How an egress packet is accounted when it finally leaves the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EgressKind {
    /// A transit datagram: counts towards `ip_forw_datagrams` and
    /// `if_out_octets`.
    Forwarded,
    /// A locally generated echo reply: counts towards `if_out_octets` only.
    EchoReply,
    /// Other locally generated traffic (ICMP errors): not octet-counted.
    Control,
}

/// A packet parked while its next hop resolves.
#[derive(Debug, Clone)]
pub(crate) struct QueuedPacket {
    /// The finished datagram, header already rewritten.
    pub packet: Ipv4Packet,
    /// Egress port it will leave through.
    pub out_iface: String,
    /// Accounting class on emission.
    pub kind: EgressKind,
    /// Identifies this packet to its drop timer.
    pub token: u64,
    /// The drop timer guarding this packet.
    pub timer: TimerHandle,
}

/// ARP cache plus the pending-resolution table.
#[derive(Debug, Default)]
pub struct ArpTable {
    cache: HashMap<Ipv4Addr, ArpEntry>,
    pending: HashMap<Ipv4Addr, Vec<QueuedPacket>>,
}

impl ArpTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn or refresh a mapping.
    pub(crate) fn learn(&mut self, ip: Ipv4Addr, mac: MacAddr, iface: &str, now: Duration) {
        self.cache.insert(
            ip,
            ArpEntry {
                mac,
                iface: iface.to_string(),
                last_seen: now,
            },
        );
    }

    /// Look up a resolved mapping.
    pub fn get(&self, ip: &Ipv4Addr) -> Option<&ArpEntry> {
        self.cache.get(ip)
    }

    /// Returns `true` if a broadcast request for `ip` is in flight.
    pub fn is_pending(&self, ip: &Ipv4Addr) -> bool {
        self.pending.contains_key(ip)
    }

    /// Drop all learned mappings. Pending resolutions are unaffected.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Park a packet awaiting resolution of `target`. Returns `true` if
    /// this target had no pending list yet, i.e. the caller must send the
    /// broadcast request.
    pub(crate) fn enqueue(&mut self, target: Ipv4Addr, packet: QueuedPacket) -> bool {
        match self.pending.get_mut(&target) {
            Some(waiting) => {
                waiting.push(packet);
                false
            }
            None => {
                self.pending.insert(target, vec![packet]);
                true
            }
        }
    }

    /// Take the whole waiting list for `target`, in arrival order. Called
    /// when a reply resolves the mapping.
    pub(crate) fn resolve(&mut self, target: Ipv4Addr) -> Vec<QueuedPacket> {
        self.pending.remove(&target).unwrap_or_default()
    }

    /// Remove one parked packet whose drop timer fired. Returns the packet
    /// if it was still parked; stale timers find nothing and do nothing.
    pub(crate) fn expire(&mut self, target: Ipv4Addr, token: u64) -> Option<QueuedPacket> {
        let waiting = self.pending.get_mut(&target)?;
        let idx = waiting.iter().position(|p| p.token == token)?;
        let packet = waiting.remove(idx);
        if waiting.is_empty() {
            self.pending.remove(&target);
        }
        Some(packet)
    }

    /// Value copy of the cache for the management plane.
    pub fn snapshot(&self) -> HashMap<Ipv4Addr, ArpEntry> {
        self.cache.clone()
    }
}
