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

//! IPv4 packets (RFC 791) and the internet checksum.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::{IcmpMessage, UdpDatagram, IP_PROTO_ICMP, IP_PROTO_UDP};
use crate::types::WireError;

/// The Don't-Fragment bit within the flags field.
const FLAG_DF: u8 = 0b010;

/// Fold a byte slice into the 16-bit one's complement sum used by the
/// internet checksum. An odd trailing byte is padded with zero.
pub fn ones_complement(bytes: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = bytes.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    if let [last] = chunks.remainder() {
        sum += u32::from(u16::from_be_bytes([*last, 0]));
    }
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    sum as u16
}

/// Returns `true` iff the one's complement sum over `bytes` (which include
/// the stored checksum) equals `0xffff`.
pub fn checksum_valid(bytes: &[u8]) -> bool {
    ones_complement(bytes) == 0xffff
}

/// An IPv4 packet. All header fields are kept explicit so that a parsed
/// packet serializes back to the identical byte layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv4Packet {
    /// IP version. Always 4 for packets built by this crate.
    pub version: u8,
    /// Header length in 32-bit words. 5 without options.
    pub ihl: u8,
    /// Type of service / DSCP+ECN byte.
    pub tos: u8,
    /// Length of header plus payload in bytes.
    pub total_length: u16,
    /// Identification field, used only for display.
    pub identification: u16,
    /// The three flag bits (`0b010` is Don't Fragment).
    pub flags: u8,
    /// Fragment offset in 8-byte units. This router never fragments.
    pub fragment_offset: u16,
    /// Time to live.
    pub ttl: u8,
    /// Protocol of the payload.
    pub protocol: u8,
    /// Header checksum as stored in the header.
    pub checksum: u16,
    /// Source address.
    pub src: Ipv4Addr,
    /// Destination address.
    pub dst: Ipv4Addr,
    /// Raw option bytes, `(ihl - 5) * 4` of them. Options are carried
    /// opaquely; only their length is validated.
    pub options: Vec<u8>,
    /// The layer-4 payload, tagged by protocol.
    pub payload: Ipv4Payload,
}

/// Payload of an [`Ipv4Packet`], tagged by protocol number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ipv4Payload {
    /// An ICMP message (protocol 1).
    Icmp(IcmpMessage),
    /// A UDP datagram (protocol 17).
    Udp(UdpDatagram),
    /// Opaque bytes of any other protocol.
    Raw(Vec<u8>),
}

impl Ipv4Payload {
    /// Serialized length of the payload in bytes.
    pub fn byte_len(&self) -> usize {
        match self {
            Ipv4Payload::Icmp(msg) => msg.byte_len(),
            Ipv4Payload::Udp(udp) => udp.byte_len(),
            Ipv4Payload::Raw(data) => data.len(),
        }
    }

    /// The IP protocol number matching the payload tag, if determined by it.
    fn protocol(&self) -> Option<u8> {
        match self {
            Ipv4Payload::Icmp(_) => Some(IP_PROTO_ICMP),
            Ipv4Payload::Udp(_) => Some(IP_PROTO_UDP),
            Ipv4Payload::Raw(_) => None,
        }
    }
}

impl Ipv4Packet {
    /// Build a packet with an ICMP or UDP payload. The protocol field is
    /// derived from the payload tag, the total length from its size, and the
    /// header checksum is computed once here.
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr, ttl: u8, payload: Ipv4Payload) -> Self {
        let protocol = payload.protocol().unwrap_or(0);
        let mut pkt = Self {
            version: 4,
            ihl: 5,
            tos: 0,
            total_length: (20 + payload.byte_len()) as u16,
            identification: 0,
            flags: 0,
            fragment_offset: 0,
            ttl,
            protocol,
            checksum: 0,
            src,
            dst,
            options: Vec::new(),
            payload,
        };
        pkt.compute_checksum();
        pkt
    }

    /// Build a packet carrying opaque bytes of the given protocol.
    pub fn new_raw(src: Ipv4Addr, dst: Ipv4Addr, ttl: u8, protocol: u8, data: Vec<u8>) -> Self {
        let mut pkt = Self::new(src, dst, ttl, Ipv4Payload::Raw(data));
        pkt.protocol = protocol;
        pkt.compute_checksum();
        pkt
    }

    /// Returns `true` if the Don't-Fragment flag is set.
    pub fn df(&self) -> bool {
        self.flags & FLAG_DF != 0
    }

    /// Set or clear the Don't-Fragment flag and recompute the checksum.
    pub fn set_df(&mut self, df: bool) {
        if df {
            self.flags |= FLAG_DF;
        } else {
            self.flags &= !FLAG_DF;
        }
        self.compute_checksum();
    }

    /// Header length in bytes.
    pub fn header_len(&self) -> usize {
        usize::from(self.ihl) * 4
    }

    /// Serialize the header with the currently stored checksum field.
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.header_len());
        buf.push((self.version << 4) | (self.ihl & 0x0f));
        buf.push(self.tos);
        buf.extend_from_slice(&self.total_length.to_be_bytes());
        buf.extend_from_slice(&self.identification.to_be_bytes());
        let flags_frag = (u16::from(self.flags) << 13) | (self.fragment_offset & 0x1fff);
        buf.extend_from_slice(&flags_frag.to_be_bytes());
        buf.push(self.ttl);
        buf.push(self.protocol);
        buf.extend_from_slice(&self.checksum.to_be_bytes());
        buf.extend_from_slice(&self.src.octets());
        buf.extend_from_slice(&self.dst.octets());
        buf.extend_from_slice(&self.options);
        buf
    }

    /// Zero the checksum field, sum the header, and store the one's
    /// complement of the sum. Forwarded packets call this after every header
    /// mutation.
    pub fn compute_checksum(&mut self) {
        self.checksum = 0;
        self.checksum = !ones_complement(&self.header_bytes());
    }

    /// Returns `true` iff the one's complement sum over the entire header,
    /// including the stored checksum, equals `0xffff`.
    pub fn verify_checksum(&self) -> bool {
        checksum_valid(&self.header_bytes())
    }

    /// Serialize header and payload into the wire layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = self.header_bytes();
        match &self.payload {
            Ipv4Payload::Icmp(msg) => buf.extend_from_slice(&msg.to_bytes()),
            Ipv4Payload::Udp(udp) => buf.extend_from_slice(&udp.to_bytes()),
            Ipv4Payload::Raw(data) => buf.extend_from_slice(data),
        }
        buf
    }

    /// Parse a packet from its wire layout. The payload is parsed according
    /// to the protocol field; a payload that fails its own parser is kept as
    /// [`Ipv4Payload::Raw`] so that header validation can still run.
    pub fn from_bytes(b: &[u8]) -> Result<Self, WireError> {
        if b.len() < 20 {
            return Err(WireError::Truncated {
                need: 20,
                got: b.len(),
            });
        }
        let version = b[0] >> 4;
        let ihl = b[0] & 0x0f;
        let header_len = usize::from(ihl) * 4;
        if header_len > b.len() {
            return Err(WireError::BadIpv4Length);
        }
        let total_length = u16::from_be_bytes([b[2], b[3]]);
        let flags_frag = u16::from_be_bytes([b[6], b[7]]);
        let protocol = b[9];
        let options = if header_len > 20 {
            b[20..header_len].to_vec()
        } else {
            Vec::new()
        };
        let end = usize::from(total_length).clamp(header_len.min(b.len()), b.len());
        let body = &b[header_len.min(b.len())..end];
        let payload = match protocol {
            IP_PROTO_ICMP => IcmpMessage::from_bytes(body)
                .map(Ipv4Payload::Icmp)
                .unwrap_or_else(|_| Ipv4Payload::Raw(body.to_vec())),
            IP_PROTO_UDP => UdpDatagram::from_bytes(body)
                .map(Ipv4Payload::Udp)
                .unwrap_or_else(|_| Ipv4Payload::Raw(body.to_vec())),
            _ => Ipv4Payload::Raw(body.to_vec()),
        };
        Ok(Self {
            version,
            ihl,
            tos: b[1],
            total_length,
            identification: u16::from_be_bytes([b[4], b[5]]),
            flags: (flags_frag >> 13) as u8,
            fragment_offset: flags_frag & 0x1fff,
            ttl: b[8],
            protocol,
            checksum: u16::from_be_bytes([b[10], b[11]]),
            src: Ipv4Addr::new(b[12], b[13], b[14], b[15]),
            dst: Ipv4Addr::new(b[16], b[17], b[18], b[19]),
            options,
            payload,
        })
    }
}
