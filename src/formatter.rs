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

//! Human-readable rendering of the router's tables, consumed by the vendor
//! shells for their `show` commands.

use std::fmt::Write;

use itertools::Itertools;

use crate::router::{FrameSink, Router};

impl<S: FrameSink> Router<S> {
    /// Render the routing table, one route per line.
    pub fn fmt_routing_table(&self) -> String {
        let mut result = String::new();
        let f = &mut result;
        for r in self.fib.entries() {
            match r.next_hop {
                Some(nh) => writeln!(
                    f,
                    "{} {} [{}/{}] via {}, {}",
                    r.kind, r.net, r.ad, r.metric, nh, r.iface
                ),
                None => writeln!(f, "{} {} is directly connected, {}", r.kind, r.net, r.iface),
            }
            .unwrap();
        }
        result
    }

    /// Render the ARP cache sorted by address.
    pub fn fmt_arp_table(&self) -> String {
        let mut result = String::new();
        let f = &mut result;
        for (ip, entry) in self.arp.snapshot().iter().sorted_by_key(|(ip, _)| **ip) {
            writeln!(
                f,
                "{} {} on {} (age {}s)",
                ip,
                entry.mac,
                entry.iface,
                self.now().saturating_sub(entry.last_seen).as_secs()
            )
            .unwrap();
        }
        result
    }

    /// Render the RIP route table sorted by prefix.
    pub fn fmt_rip_table(&self) -> String {
        let mut result = String::new();
        let f = &mut result;
        for (net, info) in self.rip_routes().iter().sorted_by_key(|(net, _)| **net) {
            writeln!(
                f,
                "{} metric {} via {} (age {}s{})",
                net,
                info.metric,
                info.learned_from,
                info.age.as_secs(),
                if info.gc { ", garbage collecting" } else { "" }
            )
            .unwrap();
        }
        result
    }

    /// Render the counters, one per line.
    pub fn fmt_counters(&self) -> String {
        let c = self.counters();
        let mut result = String::new();
        let f = &mut result;
        writeln!(f, "ifInOctets: {}", c.if_in_octets).unwrap();
        writeln!(f, "ifOutOctets: {}", c.if_out_octets).unwrap();
        writeln!(f, "ipInHdrErrors: {}", c.ip_in_hdr_errors).unwrap();
        writeln!(f, "ipInAddrErrors: {}", c.ip_in_addr_errors).unwrap();
        writeln!(f, "ipForwDatagrams: {}", c.ip_forw_datagrams).unwrap();
        writeln!(f, "icmpOutMsgs: {}", c.icmp_out_msgs).unwrap();
        writeln!(f, "icmpOutDestUnreachs: {}", c.icmp_out_dest_unreachs).unwrap();
        writeln!(f, "icmpOutTimeExcds: {}", c.icmp_out_time_excds).unwrap();
        writeln!(f, "icmpOutEchoReps: {}", c.icmp_out_echo_reps).unwrap();
        result
    }
}
