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

//! ARP packets (RFC 826), restricted to Ethernet/IPv4.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::types::{MacAddr, WireError};

const HTYPE_ETHERNET: u16 = 1;
const PTYPE_IPV4: u16 = 0x0800;

/// Operation field of an ARP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArpOp {
    /// Who-has request, broadcast on the link.
    Request,
    /// Unicast reply carrying the resolved mapping.
    Reply,
}

/// An ARP packet for IPv4 over Ethernet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArpPacket {
    /// Request or reply.
    pub op: ArpOp,
    /// Hardware address of the sender.
    pub sender_mac: MacAddr,
    /// Protocol address of the sender.
    pub sender_ip: Ipv4Addr,
    /// Hardware address of the target. Broadcast in requests.
    pub target_mac: MacAddr,
    /// Protocol address being resolved.
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    /// Build a broadcast who-has request for `target_ip`.
    pub fn request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        Self {
            op: ArpOp::Request,
            sender_mac,
            sender_ip,
            target_mac: MacAddr::BROADCAST,
            target_ip,
        }
    }

    /// Build a unicast reply answering `request` with our own mapping.
    pub fn reply(sender_mac: MacAddr, sender_ip: Ipv4Addr, request: &ArpPacket) -> Self {
        Self {
            op: ArpOp::Reply,
            sender_mac,
            sender_ip,
            target_mac: request.sender_mac,
            target_ip: request.sender_ip,
        }
    }

    /// Serialize into the 28-byte RFC 826 layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(28);
        buf.extend_from_slice(&HTYPE_ETHERNET.to_be_bytes());
        buf.extend_from_slice(&PTYPE_IPV4.to_be_bytes());
        buf.push(6);
        buf.push(4);
        let oper: u16 = match self.op {
            ArpOp::Request => 1,
            ArpOp::Reply => 2,
        };
        buf.extend_from_slice(&oper.to_be_bytes());
        buf.extend_from_slice(&self.sender_mac.0);
        buf.extend_from_slice(&self.sender_ip.octets());
        buf.extend_from_slice(&self.target_mac.0);
        buf.extend_from_slice(&self.target_ip.octets());
        buf
    }

    /// Parse from the RFC 826 layout.
    pub fn from_bytes(b: &[u8]) -> Result<Self, WireError> {
        if b.len() < 28 {
            return Err(WireError::Truncated {
                need: 28,
                got: b.len(),
            });
        }
        let htype = u16::from_be_bytes([b[0], b[1]]);
        let ptype = u16::from_be_bytes([b[2], b[3]]);
        if htype != HTYPE_ETHERNET || ptype != PTYPE_IPV4 || b[4] != 6 || b[5] != 4 {
            return Err(WireError::UnsupportedArp);
        }
        let op = match u16::from_be_bytes([b[6], b[7]]) {
            1 => ArpOp::Request,
            2 => ArpOp::Reply,
            other => return Err(WireError::UnknownArpOp(other)),
        };
        Ok(Self {
            op,
            sender_mac: MacAddr(b[8..14].try_into().unwrap()),
            sender_ip: Ipv4Addr::new(b[14], b[15], b[16], b[17]),
            target_mac: MacAddr(b[18..24].try_into().unwrap()),
            target_ip: Ipv4Addr::new(b[24], b[25], b[26], b[27]),
        })
    }
}
