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

//! The subset of ICMP (RFC 792) a router needs: echo, time exceeded and
//! destination unreachable.

use serde::{Deserialize, Serialize};

use super::ipv4::ones_complement;
use crate::types::WireError;

const TYPE_ECHO_REPLY: u8 = 0;
const TYPE_DEST_UNREACHABLE: u8 = 3;
const TYPE_ECHO_REQUEST: u8 = 8;
const TYPE_TIME_EXCEEDED: u8 = 11;

/// Destination-unreachable code for "no route to destination network".
pub const UNREACH_NET: u8 = 0;
/// Destination-unreachable code for "fragmentation needed and DF set".
pub const UNREACH_FRAG_NEEDED: u8 = 4;

/// An ICMP message.
///
/// Error messages carry the leading bytes (IP header plus 64 bits) of the
/// offending datagram, exactly as they appear on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IcmpMessage {
    /// Echo request (type 8).
    EchoRequest {
        /// Identifier, echoed back in the reply.
        ident: u16,
        /// Sequence number, echoed back in the reply.
        seq: u16,
        /// Arbitrary probe data, echoed back in the reply.
        data: Vec<u8>,
    },
    /// Echo reply (type 0).
    EchoReply {
        /// Identifier copied from the request.
        ident: u16,
        /// Sequence number copied from the request.
        seq: u16,
        /// Probe data copied from the request.
        data: Vec<u8>,
    },
    /// Time exceeded in transit (type 11, code 0).
    TimeExceeded {
        /// Leading bytes of the datagram whose TTL expired.
        original: Vec<u8>,
    },
    /// Destination unreachable (type 3).
    DestinationUnreachable {
        /// [`UNREACH_NET`] or [`UNREACH_FRAG_NEEDED`].
        code: u8,
        /// Leading bytes of the datagram that could not be delivered.
        original: Vec<u8>,
    },
}

impl IcmpMessage {
    /// Returns `true` if this message is an ICMP *error*. Routers never
    /// generate errors about errors (RFC 1812).
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            IcmpMessage::TimeExceeded { .. } | IcmpMessage::DestinationUnreachable { .. }
        )
    }

    /// Serialized length in bytes.
    pub fn byte_len(&self) -> usize {
        match self {
            IcmpMessage::EchoRequest { data, .. } | IcmpMessage::EchoReply { data, .. } => {
                8 + data.len()
            }
            IcmpMessage::TimeExceeded { original }
            | IcmpMessage::DestinationUnreachable { original, .. } => 8 + original.len(),
        }
    }

    /// Serialize into the RFC 792 layout, computing the ICMP checksum.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.byte_len());
        match self {
            IcmpMessage::EchoRequest { ident, seq, data } => {
                buf.push(TYPE_ECHO_REQUEST);
                buf.push(0);
                buf.extend_from_slice(&[0, 0]);
                buf.extend_from_slice(&ident.to_be_bytes());
                buf.extend_from_slice(&seq.to_be_bytes());
                buf.extend_from_slice(data);
            }
            IcmpMessage::EchoReply { ident, seq, data } => {
                buf.push(TYPE_ECHO_REPLY);
                buf.push(0);
                buf.extend_from_slice(&[0, 0]);
                buf.extend_from_slice(&ident.to_be_bytes());
                buf.extend_from_slice(&seq.to_be_bytes());
                buf.extend_from_slice(data);
            }
            IcmpMessage::TimeExceeded { original } => {
                buf.push(TYPE_TIME_EXCEEDED);
                buf.push(0);
                buf.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
                buf.extend_from_slice(original);
            }
            IcmpMessage::DestinationUnreachable { code, original } => {
                buf.push(TYPE_DEST_UNREACHABLE);
                buf.push(*code);
                buf.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
                buf.extend_from_slice(original);
            }
        }
        let checksum = !ones_complement(&buf);
        buf[2..4].copy_from_slice(&checksum.to_be_bytes());
        buf
    }

    /// Parse from the RFC 792 layout.
    pub fn from_bytes(b: &[u8]) -> Result<Self, WireError> {
        if b.len() < 8 {
            return Err(WireError::Truncated {
                need: 8,
                got: b.len(),
            });
        }
        let (ty, code) = (b[0], b[1]);
        match (ty, code) {
            (TYPE_ECHO_REQUEST, 0) => Ok(IcmpMessage::EchoRequest {
                ident: u16::from_be_bytes([b[4], b[5]]),
                seq: u16::from_be_bytes([b[6], b[7]]),
                data: b[8..].to_vec(),
            }),
            (TYPE_ECHO_REPLY, 0) => Ok(IcmpMessage::EchoReply {
                ident: u16::from_be_bytes([b[4], b[5]]),
                seq: u16::from_be_bytes([b[6], b[7]]),
                data: b[8..].to_vec(),
            }),
            (TYPE_TIME_EXCEEDED, 0) => Ok(IcmpMessage::TimeExceeded {
                original: b[8..].to_vec(),
            }),
            (TYPE_DEST_UNREACHABLE, UNREACH_NET | UNREACH_FRAG_NEEDED) => {
                Ok(IcmpMessage::DestinationUnreachable {
                    code,
                    original: b[8..].to_vec(),
                })
            }
            (ty, code) => Err(WireError::UnknownIcmpType(ty, code)),
        }
    }
}
