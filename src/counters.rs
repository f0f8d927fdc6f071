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

//! SNMP-style counters of the data plane. Monotonic; the only way to observe
//! silent drops.

use serde::{Deserialize, Serialize};

/// Value copy of all router counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Octets of accepted inbound IPv4 traffic (IP total length).
    pub if_in_octets: u64,
    /// Octets of forwarded IPv4 traffic and locally generated echo replies.
    pub if_out_octets: u64,
    /// Datagrams dropped in header validation (version, IHL, length,
    /// checksum).
    pub ip_in_hdr_errors: u64,
    /// Datagrams dropped because no route matched their destination.
    pub ip_in_addr_errors: u64,
    /// Datagrams successfully forwarded.
    pub ip_forw_datagrams: u64,
    /// ICMP messages generated, of any type.
    pub icmp_out_msgs: u64,
    /// Destination-unreachable messages generated.
    pub icmp_out_dest_unreachs: u64,
    /// Time-exceeded messages generated.
    pub icmp_out_time_excds: u64,
    /// Echo replies generated.
    pub icmp_out_echo_reps: u64,
}
