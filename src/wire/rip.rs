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

//! RIPv2 messages (RFC 2453), without authentication.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::RIP_INFINITY;
use crate::types::WireError;

/// Address family identifier of IPv4 entries.
pub const AFI_IPV4: u16 = 2;
/// Address family identifier used in a whole-table request.
pub const AFI_UNSPEC: u16 = 0;

/// Command field of a RIP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RipCommand {
    /// Ask a neighbor for (part of) its routing table.
    Request,
    /// Advertise routes, either periodically or as an answer to a request.
    Response,
}

/// One route advertisement within a RIP message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RipEntry {
    /// Address family identifier. [`AFI_IPV4`] for routes.
    pub afi: u16,
    /// Route tag, carried but not interpreted by this implementation.
    pub route_tag: u16,
    /// Address of the advertised network.
    pub ip: Ipv4Addr,
    /// Subnet mask of the advertised network.
    pub mask: Ipv4Addr,
    /// Next hop hint. Zero means "route via the sender".
    pub next_hop: Ipv4Addr,
    /// Metric, 1 to 16 where 16 is unreachable.
    pub metric: u32,
}

/// A RIP message: a command and up to 25 route entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RipMessage {
    /// Request or response.
    pub command: RipCommand,
    /// Protocol version. This implementation emits 2.
    pub version: u8,
    /// Route entries, at most [`super::RIP_MAX_ENTRIES`].
    pub entries: Vec<RipEntry>,
}

impl RipMessage {
    /// Build a response carrying the given entries.
    pub fn response(entries: Vec<RipEntry>) -> Self {
        Self {
            command: RipCommand::Response,
            version: 2,
            entries,
        }
    }

    /// Build the whole-table request sent when RIP is enabled: a single
    /// entry with AFI zero and metric 16.
    pub fn request_full() -> Self {
        Self {
            command: RipCommand::Request,
            version: 2,
            entries: vec![RipEntry {
                afi: AFI_UNSPEC,
                route_tag: 0,
                ip: Ipv4Addr::UNSPECIFIED,
                mask: Ipv4Addr::UNSPECIFIED,
                next_hop: Ipv4Addr::UNSPECIFIED,
                metric: RIP_INFINITY,
            }],
        }
    }

    /// Serialized length in bytes.
    pub fn byte_len(&self) -> usize {
        4 + 20 * self.entries.len()
    }

    /// Serialize into the RFC 2453 layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.byte_len());
        buf.push(match self.command {
            RipCommand::Request => 1,
            RipCommand::Response => 2,
        });
        buf.push(self.version);
        buf.extend_from_slice(&[0, 0]);
        for e in &self.entries {
            buf.extend_from_slice(&e.afi.to_be_bytes());
            buf.extend_from_slice(&e.route_tag.to_be_bytes());
            buf.extend_from_slice(&e.ip.octets());
            buf.extend_from_slice(&e.mask.octets());
            buf.extend_from_slice(&e.next_hop.octets());
            buf.extend_from_slice(&e.metric.to_be_bytes());
        }
        buf
    }

    /// Parse from the RFC 2453 layout. Trailing partial entries are
    /// rejected as truncation.
    pub fn from_bytes(b: &[u8]) -> Result<Self, WireError> {
        if b.len() < 4 {
            return Err(WireError::Truncated {
                need: 4,
                got: b.len(),
            });
        }
        let command = match b[0] {
            1 => RipCommand::Request,
            2 => RipCommand::Response,
            other => return Err(WireError::UnknownRipCommand(other)),
        };
        let version = b[1];
        let body = &b[4..];
        if body.len() % 20 != 0 {
            return Err(WireError::Truncated {
                need: 4 + (body.len() / 20 + 1) * 20,
                got: b.len(),
            });
        }
        let entries = body
            .chunks_exact(20)
            .map(|c| RipEntry {
                afi: u16::from_be_bytes([c[0], c[1]]),
                route_tag: u16::from_be_bytes([c[2], c[3]]),
                ip: Ipv4Addr::new(c[4], c[5], c[6], c[7]),
                mask: Ipv4Addr::new(c[8], c[9], c[10], c[11]),
                next_hop: Ipv4Addr::new(c[12], c[13], c[14], c[15]),
                metric: u32::from_be_bytes([c[16], c[17], c[18], c[19]]),
            })
            .collect();
        Ok(Self {
            command,
            version,
            entries,
        })
    }
}
