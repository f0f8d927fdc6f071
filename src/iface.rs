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

//! Router ports. Created at device construction, configured later, never
//! destroyed.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::types::MacAddr;

/// Default MTU of a port.
pub const DEFAULT_MTU: u16 = 1500;

/// A single router port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    /// Port name, the key under which the router owns this interface.
    pub name: String,
    /// Hardware address of the port.
    pub mac: MacAddr,
    /// Configured address and mask, or `None` while unnumbered.
    pub addr: Option<Ipv4Net>,
    /// Maximum transmission unit for egress IPv4 datagrams.
    pub mtu: u16,
    /// Administrative link state.
    pub up: bool,
}

impl Interface {
    /// Create an unconfigured port that is administratively up.
    pub fn new(name: impl Into<String>, mac: MacAddr) -> Self {
        Self {
            name: name.into(),
            mac,
            addr: None,
            mtu: DEFAULT_MTU,
            up: true,
        }
    }

    /// The configured interface address, if any.
    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.addr.map(|a| a.addr())
    }

    /// The connected network of this port (address bits below the mask
    /// cleared), if configured.
    pub fn network(&self) -> Option<Ipv4Net> {
        self.addr.map(|a| a.trunc())
    }

    /// Returns `true` if the port has an address and is up.
    pub fn is_operational(&self) -> bool {
        self.up && self.addr.is_some()
    }
}
