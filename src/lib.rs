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

#![deny(missing_docs, missing_debug_implementations)]

//! # RipSim
//!
//! A software IPv4 router for network simulation: a layer-3 forwarding
//! engine with an ARP resolver, an ICMP generator, and a RIPv2 engine.
//!
//! The [`router::Router`] is the main datastructure to operate on. It owns
//! its ports, routing table ([`fib::Fib`]), ARP state ([`arp::ArpTable`]),
//! timers and counters exclusively, and is driven from the outside by
//! exactly two calls: [`router::Router::handle_frame`] for every frame the
//! simulation delivers to one of its ports, and [`router::Router::tick`] to
//! move the monotonic clock forward and fire due timers. Egress frames leave
//! through the [`router::FrameSink`] supplied at construction, so the router
//! never blocks: packets whose next hop is unresolved wait in the ARP queue
//! and are emitted (or dropped) later.
//!
//! Frames are structured values ([`wire::EthernetFrame`]); every layer also
//! converts to and from its standards-compliant byte layout, so the same
//! router can sit behind a real wire.
//!
//! ## Example usage
//!
//! ```
//! use ripsim::prelude::*;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let mut r = Router::new("r1", VecSink::default());
//!     r.add_port("eth0", MacAddr([0, 0, 0, 0, 0, 1]));
//!     r.add_port("eth1", MacAddr([0, 0, 0, 0, 0, 2]));
//!
//!     r.configure_interface("eth0", "10.0.0.1/24".parse().unwrap())?;
//!     r.configure_interface("eth1", "10.0.1.1/24".parse().unwrap())?;
//!     r.set_default_route("10.0.1.2".parse().unwrap(), 0)?;
//!
//!     // one connected route per port, plus the default route
//!     assert_eq!(r.routing_table().len(), 3);
//!
//!     // learn routes dynamically
//!     let mut rip = RipConfig::default();
//!     rip.networks.push("10.0.0.0/16".parse().unwrap());
//!     r.enable_rip(rip);
//!
//!     Ok(())
//! }
//! ```

pub mod arp;
pub mod counters;
pub mod fib;
#[cfg(not(tarpaulin_include))]
pub mod formatter;
pub mod icmp;
pub mod iface;
pub mod prelude;
pub mod rip;
pub mod router;
pub mod timer;
pub mod types;
pub mod wire;

#[cfg(test)]
#[cfg(not(tarpaulin_include))]
mod test;
