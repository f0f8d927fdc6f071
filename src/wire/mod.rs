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

//! Wire representation of every protocol the router speaks.
//!
//! Each layer is a tagged union: an [`EthernetFrame`] carries either an ARP
//! packet or an IPv4 packet, an IPv4 packet carries ICMP, UDP or opaque
//! bytes, and a UDP datagram carries RIP or opaque bytes. Parsers descend the
//! union; there is no dynamic typing anywhere in the data plane.
//!
//! Every type converts to and from the standards-compliant byte layout
//! (RFC 791, 826, 792, 768 and 2453). In simulated sibling-device delivery
//! the structured values travel as-is; semantic equality is the same on both
//! sides.

use serde::{Deserialize, Serialize};

use crate::types::{MacAddr, WireError};

mod arp;
mod icmp;
mod ipv4;
mod rip;
mod udp;

pub use arp::{ArpOp, ArpPacket};
pub use icmp::{IcmpMessage, UNREACH_FRAG_NEEDED, UNREACH_NET};
pub use ipv4::{checksum_valid, ones_complement, Ipv4Packet, Ipv4Payload};
pub use rip::{RipCommand, RipEntry, RipMessage, AFI_IPV4, AFI_UNSPEC};
pub use udp::{UdpDatagram, UdpPayload};

/// EtherType of ARP packets.
pub const ETHERTYPE_ARP: u16 = 0x0806;
/// EtherType of IPv4 packets.
pub const ETHERTYPE_IPV4: u16 = 0x0800;
/// IP protocol number of ICMP.
pub const IP_PROTO_ICMP: u8 = 1;
/// IP protocol number of UDP.
pub const IP_PROTO_UDP: u8 = 17;
/// TTL of packets originated by the router (ICMP).
pub const DEFAULT_TTL: u8 = 255;
/// TTL of RIP messages. RIP never leaves the local link.
pub const RIP_TTL: u8 = 1;
/// UDP port RIP speaks on (source and destination).
pub const RIP_PORT: u16 = 520;
/// The RIP metric representing an unreachable route.
pub const RIP_INFINITY: u32 = 16;
/// Maximum number of route entries in a single RIP message.
pub const RIP_MAX_ENTRIES: usize = 25;

/// An Ethernet frame as it travels between simulated devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthernetFrame {
    /// Source MAC address.
    pub src: MacAddr,
    /// Destination MAC address.
    pub dst: MacAddr,
    /// The layer-3 payload, tagged by EtherType.
    pub payload: EtherPayload,
}

/// Payload of an [`EthernetFrame`], tagged by EtherType.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EtherPayload {
    /// An ARP packet (EtherType 0x0806).
    Arp(ArpPacket),
    /// An IPv4 packet (EtherType 0x0800).
    Ipv4(Ipv4Packet),
}

impl EthernetFrame {
    /// The EtherType matching the payload tag.
    pub fn ether_type(&self) -> u16 {
        match &self.payload {
            EtherPayload::Arp(_) => ETHERTYPE_ARP,
            EtherPayload::Ipv4(_) => ETHERTYPE_IPV4,
        }
    }

    /// Serialize the frame (without FCS) into its wire layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(14);
        buf.extend_from_slice(&self.dst.0);
        buf.extend_from_slice(&self.src.0);
        buf.extend_from_slice(&self.ether_type().to_be_bytes());
        match &self.payload {
            EtherPayload::Arp(arp) => buf.extend_from_slice(&arp.to_bytes()),
            EtherPayload::Ipv4(ip) => buf.extend_from_slice(&ip.to_bytes()),
        }
        buf
    }

    /// Parse a frame from its wire layout. Frames with an EtherType the
    /// router does not dispatch on yield [`WireError::UnknownEtherType`]; the
    /// caller treats that as a silent drop.
    pub fn from_bytes(b: &[u8]) -> Result<Self, WireError> {
        if b.len() < 14 {
            return Err(WireError::Truncated {
                need: 14,
                got: b.len(),
            });
        }
        let dst = MacAddr(b[0..6].try_into().unwrap());
        let src = MacAddr(b[6..12].try_into().unwrap());
        let ether_type = u16::from_be_bytes([b[12], b[13]]);
        let payload = match ether_type {
            ETHERTYPE_ARP => EtherPayload::Arp(ArpPacket::from_bytes(&b[14..])?),
            ETHERTYPE_IPV4 => EtherPayload::Ipv4(Ipv4Packet::from_bytes(&b[14..])?),
            other => return Err(WireError::UnknownEtherType(other)),
        };
        Ok(Self { src, dst, payload })
    }
}
