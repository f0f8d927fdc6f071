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

//! Module containing all type definitions shared between the data plane and
//! the control plane.

use std::{fmt::Display, net::Ipv4Addr, str::FromStr};

use ipnet::Ipv4Net;
use serde::{de::Error, Deserialize, Serialize};
use thiserror::Error;

/// MAC address of a port. The all-ones address is the link-layer broadcast
/// address.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// The link-layer broadcast address `ff:ff:ff:ff:ff:ff`.
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    /// Returns `true` if `self` is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl std::fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// Error while parsing a [`MacAddr`] from its textual form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid MAC address: {0}")]
pub struct MacParseError(pub String);

impl FromStr for MacAddr {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(|| MacParseError(s.to_string()))?;
            *byte = u8::from_str_radix(part, 16).map_err(|_| MacParseError(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(MacParseError(s.to_string()));
        }
        Ok(MacAddr(bytes))
    }
}

impl Serialize for MacAddr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MacAddr::from_str(&s).map_err(|e| D::Error::custom(e.to_string()))
    }
}

/// Source of a route in the FIB. The source determines the administrative
/// distance used to arbitrate between routes for the same prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteKind {
    /// Route to a network directly attached to a configured interface.
    Connected,
    /// Route installed by [`crate::router::Router::add_static_route`].
    Static,
    /// The gateway of last resort (`0.0.0.0/0`).
    Default,
    /// Route learned from a RIPv2 neighbor.
    Rip,
}

impl RouteKind {
    /// Administrative distance of routes from this source.
    pub fn ad(&self) -> u8 {
        match self {
            RouteKind::Connected => 0,
            RouteKind::Static | RouteKind::Default => 1,
            RouteKind::Rip => 120,
        }
    }
}

impl Display for RouteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteKind::Connected => write!(f, "C"),
            RouteKind::Static => write!(f, "S"),
            RouteKind::Default => write!(f, "S*"),
            RouteKind::Rip => write!(f, "R"),
        }
    }
}

/// A single entry of the FIB.
///
/// Connected routes carry no next hop (the destination is on-link); all other
/// kinds carry the address of the neighbor to forward to. The egress
/// interface is resolved at install time and stored in the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Destination network. Always truncated (`net == net & mask`).
    pub net: Ipv4Net,
    /// Next-hop address, or `None` for connected routes.
    pub next_hop: Option<Ipv4Addr>,
    /// Name of the egress interface.
    pub iface: String,
    /// Source of the route.
    pub kind: RouteKind,
    /// Administrative distance. Lower is preferred on equal prefix length.
    pub ad: u8,
    /// Route metric. Lower is preferred on equal administrative distance.
    pub metric: u32,
}

impl RouteEntry {
    /// Create a connected route for the given interface network.
    pub fn connected(net: Ipv4Net, iface: impl Into<String>) -> Self {
        Self {
            net: net.trunc(),
            next_hop: None,
            iface: iface.into(),
            kind: RouteKind::Connected,
            ad: RouteKind::Connected.ad(),
            metric: 0,
        }
    }
}

/// Operating system emulated by the vendor shell attached to a router.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsType {
    /// Cisco IOS-like shell.
    #[default]
    Ios,
    /// Huawei VRP-like shell.
    Vrp,
}

impl Display for OsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsType::Ios => write!(f, "IOS"),
            OsType::Vrp => write!(f, "VRP"),
        }
    }
}

/// Configuration Error.
///
/// Returned by the mutating operations of the router facade. Malformed
/// addresses and masks are unrepresentable ([`Ipv4Net`] rejects them at
/// construction), so the only failures left are the two below.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    /// The named port does not exist on this router.
    #[error("interface {0} does not exist")]
    UnknownInterface(String),
    /// The next hop of a static or default route is not covered by any
    /// connected route.
    #[error("next hop {0} is not reachable via any connected network")]
    NextHopUnreachable(Ipv4Addr),
}

/// Error while parsing a frame from its wire representation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ended before the fixed part of the header.
    #[error("truncated packet: need {need} bytes, got {got}")]
    Truncated {
        /// Number of bytes the decoder needed.
        need: usize,
        /// Number of bytes that were available.
        got: usize,
    },
    /// EtherType that this router does not dispatch on.
    #[error("unhandled ethertype {0:#06x}")]
    UnknownEtherType(u16),
    /// ARP packet with a hardware or protocol type other than Ethernet/IPv4.
    #[error("unsupported ARP hardware or protocol type")]
    UnsupportedArp,
    /// ARP operation other than request (1) or reply (2).
    #[error("unknown ARP operation {0}")]
    UnknownArpOp(u16),
    /// The IP header declares fewer bytes than its own fixed size.
    #[error("invalid IPv4 header length")]
    BadIpv4Length,
    /// RIP command other than request (1) or response (2).
    #[error("unknown RIP command {0}")]
    UnknownRipCommand(u8),
    /// ICMP type this implementation does not model.
    #[error("unknown ICMP type {0} code {1}")]
    UnknownIcmpType(u8, u8),
}
