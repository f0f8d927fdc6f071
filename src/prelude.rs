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

//! Convenient re-export of the most important types.

pub use crate::arp::ArpEntry;
pub use crate::counters::Counters;
pub use crate::fib::Fib;
pub use crate::iface::Interface;
pub use crate::rip::{RipConfig, RipRouteInfo};
pub use crate::router::{FrameSink, Router, RouterSnapshot, Shell, VecSink};
pub use crate::timer::{TimerHandle, TimerQueue};
pub use crate::types::{ConfigError, MacAddr, OsType, RouteEntry, RouteKind, WireError};
pub use crate::wire::{
    ArpOp, ArpPacket, EtherPayload, EthernetFrame, IcmpMessage, Ipv4Packet, Ipv4Payload,
    RipCommand, RipEntry, RipMessage, UdpDatagram, UdpPayload,
};

pub use ipnet::Ipv4Net;
