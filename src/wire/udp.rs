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

//! UDP datagrams (RFC 768). The router only ever looks at port 520.

use serde::{Deserialize, Serialize};

use super::{RipMessage, RIP_PORT};
use crate::types::WireError;

/// A UDP datagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdpDatagram {
    /// Source port.
    pub src_port: u16,
    /// Destination port.
    pub dst_port: u16,
    /// Checksum as stored on the wire. RIP messages built by this crate
    /// carry zero (checksum not computed).
    pub checksum: u16,
    /// The application payload.
    pub payload: UdpPayload,
}

/// Payload of a [`UdpDatagram`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UdpPayload {
    /// A RIP message (port 520 on either side).
    Rip(RipMessage),
    /// Opaque bytes of any other application.
    Raw(Vec<u8>),
}

impl UdpDatagram {
    /// Build the RIP encapsulation: source and destination port 520,
    /// checksum zero.
    pub fn rip(msg: RipMessage) -> Self {
        Self {
            src_port: RIP_PORT,
            dst_port: RIP_PORT,
            checksum: 0,
            payload: UdpPayload::Rip(msg),
        }
    }

    /// Serialized length in bytes, including the 8-byte header.
    pub fn byte_len(&self) -> usize {
        8 + match &self.payload {
            UdpPayload::Rip(msg) => msg.byte_len(),
            UdpPayload::Raw(data) => data.len(),
        }
    }

    /// Serialize into the RFC 768 layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.byte_len());
        buf.extend_from_slice(&self.src_port.to_be_bytes());
        buf.extend_from_slice(&self.dst_port.to_be_bytes());
        buf.extend_from_slice(&(self.byte_len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.checksum.to_be_bytes());
        match &self.payload {
            UdpPayload::Rip(msg) => buf.extend_from_slice(&msg.to_bytes()),
            UdpPayload::Raw(data) => buf.extend_from_slice(data),
        }
        buf
    }

    /// Parse from the RFC 768 layout. Payloads on port 520 that parse as RIP
    /// become [`UdpPayload::Rip`]; everything else stays raw.
    pub fn from_bytes(b: &[u8]) -> Result<Self, WireError> {
        if b.len() < 8 {
            return Err(WireError::Truncated {
                need: 8,
                got: b.len(),
            });
        }
        let src_port = u16::from_be_bytes([b[0], b[1]]);
        let dst_port = u16::from_be_bytes([b[2], b[3]]);
        let length = usize::from(u16::from_be_bytes([b[4], b[5]]));
        let checksum = u16::from_be_bytes([b[6], b[7]]);
        let end = length.clamp(8.min(b.len()), b.len());
        let body = &b[8.min(b.len())..end];
        let payload = if dst_port == RIP_PORT || src_port == RIP_PORT {
            RipMessage::from_bytes(body)
                .map(UdpPayload::Rip)
                .unwrap_or_else(|_| UdpPayload::Raw(body.to_vec()))
        } else {
            UdpPayload::Raw(body.to_vec())
        };
        Ok(Self {
            src_port,
            dst_port,
            checksum,
            payload,
        })
    }
}
