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

//! The router facade and its forwarding pipeline.
//!
//! A [`Router`] owns its ports, FIB, ARP state, timers, RIP state and
//! counters exclusively. It has exactly one ingress entry point,
//! [`Router::handle_frame`], and one timer entry point, [`Router::tick`].
//! Both run to completion without suspending; packets that must wait for
//! ARP are parked in the resolver queue and the call returns. Egress frames
//! leave through the [`FrameSink`] supplied at construction.

use std::{collections::HashMap, net::Ipv4Addr, time::Duration};

use ipnet::Ipv4Net;
use log::*;
use serde::Serialize;

use crate::{
    arp::{ArpEntry, ArpTable, EgressKind, QueuedPacket, ARP_QUEUE_TIMEOUT},
    counters::Counters,
    fib::Fib,
    iface::Interface,
    rip::{Rip, RipRouteInfo},
    timer::TimerQueue,
    types::{ConfigError, MacAddr, OsType, RouteEntry, RouteKind, WireError},
    wire::{
        ArpOp, ArpPacket, EtherPayload, EthernetFrame, IcmpMessage, Ipv4Packet, Ipv4Payload,
        UdpPayload, RIP_PORT,
    },
};

/// Egress delivery sink of a router.
///
/// The sink is synchronous and infallible from the router's point of view;
/// the embedding simulator decides what a "wire" is.
pub trait FrameSink {
    /// Deliver `frame` out of port `port`.
    fn send(&mut self, port: &str, frame: EthernetFrame);
}

/// A [`FrameSink`] that collects every emitted frame. Used by the tests and
/// by embedders that poll for output.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VecSink {
    /// All emitted frames with the port they left through, oldest first.
    pub frames: Vec<(String, EthernetFrame)>,
}

impl FrameSink for VecSink {
    fn send(&mut self, port: &str, frame: EthernetFrame) {
        self.frames.push((port.to_string(), frame));
    }
}

impl VecSink {
    /// Take all collected frames, leaving the sink empty.
    pub fn take(&mut self) -> Vec<(String, EthernetFrame)> {
        std::mem::take(&mut self.frames)
    }
}

/// A vendor shell attached to a router.
///
/// The shell interprets one command line at a time against the router's
/// public API. The router itself treats the line as opaque.
pub trait Shell<S: FrameSink> {
    /// Execute one command line and render its output.
    fn execute(&mut self, router: &mut Router<S>, line: &str) -> String;
}

/// Events carried by the router's timers. Timer callbacks re-check the
/// owning map on firing, so cancellation races degrade to no-ops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TimerEvent {
    /// The drop timer of one parked packet fired.
    ArpExpire {
        /// Next-hop address the packet was waiting on.
        target: Ipv4Addr,
        /// Token identifying the packet in the waiting list.
        token: u64,
    },
    /// The periodic RIP update timer fired.
    RipUpdate,
    /// The timeout timer of a RIP route fired.
    RipTimeout(Ipv4Net),
    /// The garbage-collection timer of a RIP route fired.
    RipGc(Ipv4Net),
}

/// A software IPv4 router with ARP, ICMP and RIPv2.
pub struct Router<S: FrameSink> {
    pub(crate) name: String,
    pub(crate) os: OsType,
    pub(crate) sink: S,
    pub(crate) ports: HashMap<String, Interface>,
    pub(crate) fib: Fib,
    pub(crate) arp: ArpTable,
    pub(crate) counters: Counters,
    pub(crate) timers: TimerQueue<TimerEvent>,
    pub(crate) rip: Rip,
    next_token: u64,
    shell: Option<Box<dyn Shell<S>>>,
}

impl<S: FrameSink> std::fmt::Debug for Router<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("name", &self.name)
            .field("os", &self.os)
            .field("ports", &self.ports)
            .field("fib", &self.fib)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

/// Value copy of the router's observable state, for the management plane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouterSnapshot {
    /// All FIB entries in insertion order.
    pub routing_table: Vec<RouteEntry>,
    /// All learned ARP mappings.
    pub arp_table: HashMap<Ipv4Addr, ArpEntry>,
    /// The counter values.
    pub counters: Counters,
    /// The RIP route table.
    pub rip_routes: HashMap<Ipv4Net, RipRouteInfo>,
}

impl RouterSnapshot {
    /// Render the snapshot as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl<S: FrameSink> Router<S> {
    /// Create a router with no ports, delivering egress frames to `sink`.
    pub fn new(name: impl Into<String>, sink: S) -> Self {
        Self {
            name: name.into(),
            os: OsType::default(),
            sink,
            ports: HashMap::new(),
            fib: Fib::new(),
            arp: ArpTable::new(),
            counters: Counters::default(),
            timers: TimerQueue::new(),
            rip: Rip::default(),
            next_token: 0,
            shell: None,
        }
    }

    /// The device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The operating system the attached shell emulates.
    pub fn os_type(&self) -> OsType {
        self.os
    }

    /// Set the operating system reported to management clients.
    pub fn set_os_type(&mut self, os: OsType) {
        self.os = os;
    }

    /// Attach a vendor shell for [`Router::execute_command`].
    pub fn set_shell(&mut self, shell: Box<dyn Shell<S>>) {
        self.shell = Some(shell);
    }

    /// Pass one opaque command line to the attached shell. Without a shell,
    /// or when called re-entrantly from within the shell, this returns an
    /// empty string.
    pub fn execute_command(&mut self, line: &str) -> String {
        match self.shell.take() {
            Some(mut shell) => {
                let out = shell.execute(self, line);
                self.shell = Some(shell);
                out
            }
            None => String::new(),
        }
    }

    /// Create a port. Ports are created while the device is built and live
    /// as long as the router.
    pub fn add_port(&mut self, name: impl Into<String>, mac: MacAddr) {
        let iface = Interface::new(name, mac);
        self.ports.insert(iface.name.clone(), iface);
    }

    /// Access a port by name.
    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.ports.get(name)
    }

    /// All port names in alphabetical order.
    pub fn port_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.ports.keys().cloned().collect();
        names.sort();
        names
    }

    /// Access the egress sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the egress sink, e.g. to drain a [`VecSink`].
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// The current time of the router's clock.
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    // ------------------------------------------------------------------
    // Configuration operations
    // ------------------------------------------------------------------

    /// Assign an address to a port and install the matching connected route,
    /// replacing any previous one for this port.
    pub fn configure_interface(&mut self, name: &str, addr: Ipv4Net) -> Result<(), ConfigError> {
        let port = self
            .ports
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownInterface(name.to_string()))?;
        port.addr = Some(addr);
        let up = port.up;
        let owned = name.to_string();
        self.fib
            .remove_where(|r| r.kind == RouteKind::Connected && r.iface == owned);
        if up {
            self.fib.insert(RouteEntry::connected(addr.trunc(), name));
        }
        info!("{}: {} is now {}", self.name, name, addr);
        Ok(())
    }

    /// Remove the address of a port and withdraw its connected route.
    pub fn clear_interface(&mut self, name: &str) -> Result<(), ConfigError> {
        let port = self
            .ports
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownInterface(name.to_string()))?;
        port.addr = None;
        let owned = name.to_string();
        self.fib
            .remove_where(|r| r.kind == RouteKind::Connected && r.iface == owned);
        Ok(())
    }

    /// Set the MTU of a port.
    pub fn set_mtu(&mut self, name: &str, mtu: u16) -> Result<(), ConfigError> {
        self.ports
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownInterface(name.to_string()))?
            .mtu = mtu;
        Ok(())
    }

    /// Administratively enable or disable a port. A port that goes down
    /// takes its connected route with it; bringing it back up restores the
    /// route.
    pub fn set_interface_state(&mut self, name: &str, up: bool) -> Result<(), ConfigError> {
        let port = self
            .ports
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownInterface(name.to_string()))?;
        if port.up == up {
            return Ok(());
        }
        port.up = up;
        let addr = port.addr;
        let owned = name.to_string();
        if up {
            if let Some(addr) = addr {
                self.fib.insert(RouteEntry::connected(addr.trunc(), name));
            }
        } else {
            self.fib
                .remove_where(|r| r.kind == RouteKind::Connected && r.iface == owned);
        }
        info!("{}: {} {}", self.name, name, if up { "up" } else { "down" });
        Ok(())
    }

    /// Install a static route towards `net` via `next_hop`. The next hop
    /// must be covered by a connected route, which also determines the
    /// egress interface.
    pub fn add_static_route(
        &mut self,
        net: Ipv4Net,
        next_hop: Ipv4Addr,
        metric: u32,
    ) -> Result<(), ConfigError> {
        let via = self
            .fib
            .connected_route_to(next_hop)
            .ok_or(ConfigError::NextHopUnreachable(next_hop))?;
        let iface = via.iface.clone();
        self.fib.insert(RouteEntry {
            net: net.trunc(),
            next_hop: Some(next_hop),
            iface,
            kind: RouteKind::Static,
            ad: RouteKind::Static.ad(),
            metric,
        });
        Ok(())
    }

    /// Remove all static routes towards `net`. Returns `true` if any entry
    /// was removed.
    pub fn remove_static_route(&mut self, net: Ipv4Net) -> bool {
        let net = net.trunc();
        let before = self.fib.len();
        self.fib
            .remove_where(|r| r.kind == RouteKind::Static && r.net == net);
        self.fib.len() != before
    }

    /// Install the gateway of last resort, replacing any previous one.
    pub fn set_default_route(&mut self, next_hop: Ipv4Addr, metric: u32) -> Result<(), ConfigError> {
        let via = self
            .fib
            .connected_route_to(next_hop)
            .ok_or(ConfigError::NextHopUnreachable(next_hop))?;
        let iface = via.iface.clone();
        self.fib.remove_where(|r| r.kind == RouteKind::Default);
        self.fib.insert(RouteEntry {
            net: Ipv4Net::default(),
            next_hop: Some(next_hop),
            iface,
            kind: RouteKind::Default,
            ad: RouteKind::Default.ad(),
            metric,
        });
        Ok(())
    }

    /// Flush the ARP cache. Pending resolutions keep waiting.
    pub fn clear_arp_table(&mut self) {
        self.arp.clear();
    }

    // ------------------------------------------------------------------
    // Observability
    // ------------------------------------------------------------------

    /// Value copy of the routing table, in insertion order.
    pub fn routing_table(&self) -> Vec<RouteEntry> {
        self.fib.entries().to_vec()
    }

    /// Value copy of the ARP cache.
    pub fn arp_table(&self) -> HashMap<Ipv4Addr, ArpEntry> {
        self.arp.snapshot()
    }

    /// Value copy of the counters.
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Value copy of the whole observable state.
    pub fn snapshot(&self) -> RouterSnapshot {
        RouterSnapshot {
            routing_table: self.routing_table(),
            arp_table: self.arp_table(),
            counters: self.counters(),
            rip_routes: self.rip_routes(),
        }
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Advance the clock to `now` and run every timer that became due:
    /// pending-ARP drops, the periodic RIP update, and per-route timeout and
    /// garbage collection.
    pub fn tick(&mut self, now: Duration) {
        for event in self.timers.advance(now) {
            match event {
                TimerEvent::ArpExpire { target, token } => {
                    if let Some(dropped) = self.arp.expire(target, token) {
                        debug!(
                            "{}: drop packet to {} awaiting ARP for {}",
                            self.name, dropped.packet.dst, target
                        );
                    }
                }
                TimerEvent::RipUpdate => self.rip_periodic_update(),
                TimerEvent::RipTimeout(net) => self.rip_route_timeout(net),
                TimerEvent::RipGc(net) => self.rip_route_gc(net),
            }
        }
    }

    /// Handle one frame delivered to the named port. This is the sole
    /// ingress entry point; it never blocks and never panics on malformed
    /// input.
    pub fn handle_frame(&mut self, port: &str, frame: EthernetFrame) {
        let Some(iface) = self.ports.get(port) else {
            debug!("{}: frame on unknown port {}", self.name, port);
            return;
        };
        if !iface.up {
            trace!("{}: drop frame on disabled port {}", self.name, port);
            return;
        }
        if frame.dst != iface.mac && !frame.dst.is_broadcast() {
            trace!("{}: frame on {} not for us ({})", self.name, port, frame.dst);
            return;
        }
        match frame.payload {
            EtherPayload::Arp(arp) => self.handle_arp(port, arp),
            EtherPayload::Ipv4(pkt) => self.handle_ipv4(port, pkt),
        }
    }

    /// Parse a frame from its wire bytes and handle it. Frames that do not
    /// parse (unknown EtherType included) are dropped silently, as on a real
    /// wire.
    pub fn handle_frame_bytes(&mut self, port: &str, bytes: &[u8]) {
        match EthernetFrame::from_bytes(bytes) {
            Ok(frame) => self.handle_frame(port, frame),
            Err(WireError::UnknownEtherType(ty)) => {
                trace!("{}: ignoring ethertype {:#06x} on {}", self.name, ty, port)
            }
            Err(e) => debug!("{}: unparseable frame on {}: {}", self.name, port, e),
        }
    }

    // ------------------------------------------------------------------
    // ARP handling
    // ------------------------------------------------------------------

    fn handle_arp(&mut self, port: &str, arp: ArpPacket) {
        let now = self.timers.now();
        self.arp.learn(arp.sender_ip, arp.sender_mac, port, now);
        match arp.op {
            ArpOp::Request => {
                let our_ip = self.ports.get(port).and_then(|p| p.ip());
                if our_ip == Some(arp.target_ip) {
                    let mac = self.ports[port].mac;
                    let reply = ArpPacket::reply(mac, arp.target_ip, &arp);
                    self.sink.send(
                        port,
                        EthernetFrame {
                            src: mac,
                            dst: arp.sender_mac,
                            payload: EtherPayload::Arp(reply),
                        },
                    );
                }
            }
            ArpOp::Reply => {
                let mac = arp.sender_mac;
                for parked in self.arp.resolve(arp.sender_ip) {
                    self.timers.cancel(parked.timer);
                    self.emit_ipv4(&parked.out_iface, mac, parked.packet, parked.kind);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // IPv4 pipeline
    // ------------------------------------------------------------------

    fn handle_ipv4(&mut self, port: &str, pkt: Ipv4Packet) {
        self.counters.if_in_octets += u64::from(pkt.total_length);

        // header sanity; failures are silent drops, never ICMP
        if pkt.version != 4
            || pkt.ihl < 5
            || usize::from(pkt.total_length) < pkt.header_len()
            || !pkt.verify_checksum()
        {
            self.counters.ip_in_hdr_errors += 1;
            debug!("{}: bad IPv4 header on {}", self.name, port);
            return;
        }

        let local = pkt.dst == Ipv4Addr::BROADCAST
            || self.ports.values().any(|p| p.ip() == Some(pkt.dst));
        if local {
            self.deliver_local(port, pkt);
        } else {
            self.forward(port, pkt);
        }
    }

    fn deliver_local(&mut self, port: &str, pkt: Ipv4Packet) {
        match &pkt.payload {
            Ipv4Payload::Icmp(IcmpMessage::EchoRequest { .. }) => self.send_echo_reply(port, &pkt),
            Ipv4Payload::Udp(udp) if udp.dst_port == RIP_PORT => {
                if let UdpPayload::Rip(msg) = &udp.payload {
                    let msg = msg.clone();
                    self.rip_handle_message(port, pkt.src, msg);
                }
            }
            _ => trace!(
                "{}: no local handler for protocol {} on {}",
                self.name,
                pkt.protocol,
                port
            ),
        }
    }

    fn forward(&mut self, ingress: &str, pkt: Ipv4Packet) {
        if pkt.ttl <= 1 {
            self.send_time_exceeded(ingress, &pkt);
            return;
        }
        let Some(route) = self.fib.lookup(pkt.dst).cloned() else {
            self.counters.ip_in_addr_errors += 1;
            self.send_no_route(ingress, &pkt);
            return;
        };

        let mut fwd = pkt.clone();
        fwd.ttl -= 1;
        fwd.compute_checksum();

        let Some(out) = self.ports.get(&route.iface) else {
            return;
        };
        if !out.up {
            trace!("{}: egress {} is down", self.name, route.iface);
            return;
        }
        if usize::from(fwd.total_length) > usize::from(out.mtu) {
            if fwd.df() {
                self.send_frag_needed(ingress, &pkt);
            } else {
                debug!(
                    "{}: {} byte datagram exceeds mtu of {}, dropped",
                    self.name, fwd.total_length, route.iface
                );
            }
            return;
        }

        let next_hop = route.next_hop.unwrap_or(pkt.dst);
        self.resolve_and_send(&route.iface, next_hop, fwd, EgressKind::Forwarded);
    }

    /// Send a finished datagram towards `next_hop` out of `out_iface`,
    /// parking it in the ARP queue if the hop is unresolved.
    pub(crate) fn resolve_and_send(
        &mut self,
        out_iface: &str,
        next_hop: Ipv4Addr,
        pkt: Ipv4Packet,
        kind: EgressKind,
    ) {
        match self.arp.get(&next_hop).map(|e| e.mac) {
            Some(mac) => self.emit_ipv4(out_iface, mac, pkt, kind),
            None => {
                let token = self.next_token;
                self.next_token += 1;
                let timer = self
                    .timers
                    .schedule_once(ARP_QUEUE_TIMEOUT, TimerEvent::ArpExpire {
                        target: next_hop,
                        token,
                    });
                let first = self.arp.enqueue(
                    next_hop,
                    QueuedPacket {
                        packet: pkt,
                        out_iface: out_iface.to_string(),
                        kind,
                        token,
                        timer,
                    },
                );
                if first {
                    self.send_arp_request(out_iface, next_hop);
                }
            }
        }
    }

    fn send_arp_request(&mut self, out_iface: &str, target: Ipv4Addr) {
        let Some(port) = self.ports.get(out_iface) else {
            return;
        };
        let Some(sender_ip) = port.ip() else {
            warn!(
                "{}: cannot resolve {} on unnumbered port {}",
                self.name, target, out_iface
            );
            return;
        };
        let request = ArpPacket::request(port.mac, sender_ip, target);
        let src = port.mac;
        self.sink.send(
            out_iface,
            EthernetFrame {
                src,
                dst: MacAddr::BROADCAST,
                payload: EtherPayload::Arp(request),
            },
        );
    }

    /// Final layer-2 rewrite and emission, with per-class accounting.
    pub(crate) fn emit_ipv4(
        &mut self,
        out_iface: &str,
        dst_mac: MacAddr,
        pkt: Ipv4Packet,
        kind: EgressKind,
    ) {
        let Some(port) = self.ports.get(out_iface) else {
            return;
        };
        if !port.up {
            trace!("{}: egress {} went down, dropping", self.name, out_iface);
            return;
        }
        match kind {
            EgressKind::Forwarded => {
                self.counters.ip_forw_datagrams += 1;
                self.counters.if_out_octets += u64::from(pkt.total_length);
            }
            EgressKind::EchoReply => {
                self.counters.if_out_octets += u64::from(pkt.total_length);
            }
            EgressKind::Control => {}
        }
        let src = port.mac;
        self.sink.send(
            out_iface,
            EthernetFrame {
                src,
                dst: dst_mac,
                payload: EtherPayload::Ipv4(pkt),
            },
        );
    }
}
