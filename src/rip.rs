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

//! The RIPv2 engine.
//!
//! Each learned prefix walks a three-state lifecycle. While updates from its
//! neighbor keep arriving it is *active*. When the route timeout elapses, or
//! the neighbor poisons the route with metric 16, it turns *invalid*: it
//! stays in the FIB at metric 16 (so it keeps being advertised as
//! unreachable), a triggered update goes out, and the garbage-collection
//! timer starts. When that fires the route is gone from both the FIB and
//! the RIP table.
//!
//! Updates apply split horizon: a route is never advertised back out the
//! interface it was learned on, except with poisoned reverse, where RIP
//! routes are advertised there with metric 16.

use std::{collections::HashMap, net::Ipv4Addr, time::Duration};

use ipnet::Ipv4Net;
use log::*;
use prefix_trie::PrefixMap;
use serde::{Deserialize, Serialize};

use crate::{
    router::{FrameSink, Router, TimerEvent},
    timer::TimerHandle,
    types::{MacAddr, RouteEntry, RouteKind},
    wire::{
        EtherPayload, EthernetFrame, Ipv4Packet, Ipv4Payload, RipCommand, RipEntry, RipMessage,
        UdpDatagram, AFI_IPV4, AFI_UNSPEC, RIP_INFINITY, RIP_MAX_ENTRIES, RIP_TTL,
    },
};

/// Configuration of the RIP process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RipConfig {
    /// Networks the process covers. A port participates in RIP iff its
    /// connected network is contained in one of these.
    pub networks: Vec<Ipv4Net>,
    /// Period of the full-table update.
    pub update_interval: Duration,
    /// Silence from a route's neighbor after which the route turns invalid.
    pub route_timeout: Duration,
    /// Time an invalid route lingers (advertised at metric 16) before it is
    /// garbage collected.
    pub gc_timeout: Duration,
    /// Never advertise a route out the interface it was learned on.
    pub split_horizon: bool,
    /// Instead of omitting such routes, advertise them with metric 16.
    /// Only effective together with `split_horizon`.
    pub poisoned_reverse: bool,
}

impl Default for RipConfig {
    fn default() -> Self {
        Self {
            networks: Vec::new(),
            update_interval: Duration::from_secs(30),
            route_timeout: Duration::from_secs(180),
            gc_timeout: Duration::from_secs(120),
            split_horizon: true,
            poisoned_reverse: true,
        }
    }
}

/// Snapshot of one RIP-learned route, for the management plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RipRouteInfo {
    /// Current metric as installed in the FIB (16 when invalid).
    pub metric: u32,
    /// Neighbor the route was learned from.
    pub learned_from: Ipv4Addr,
    /// Time since the last accepted update for this route.
    pub age: Duration,
    /// `true` once the route turned invalid and awaits garbage collection.
    pub gc: bool,
}

/// Book-keeping for one learned prefix. The timers guarding the route live
/// in this record; whoever removes the record must cancel them.
#[derive(Debug, Clone)]
pub(crate) struct RipRouteState {
    pub(crate) learned_from: Ipv4Addr,
    pub(crate) learned_on: String,
    pub(crate) last_update: Duration,
    pub(crate) gc: bool,
    pub(crate) timeout_timer: Option<TimerHandle>,
    pub(crate) gc_timer: Option<TimerHandle>,
}

/// State of the RIP process within a router.
#[derive(Debug)]
pub(crate) struct Rip {
    pub(crate) enabled: bool,
    pub(crate) cfg: RipConfig,
    pub(crate) routes: PrefixMap<Ipv4Net, RipRouteState>,
    pub(crate) update_timer: Option<TimerHandle>,
}

impl Default for Rip {
    fn default() -> Self {
        Self {
            enabled: false,
            cfg: RipConfig::default(),
            routes: PrefixMap::new(),
            update_timer: None,
        }
    }
}

impl<S: FrameSink> Router<S> {
    // ------------------------------------------------------------------
    // Facade
    // ------------------------------------------------------------------

    /// Start the RIP process: arm the periodic update timer and ask every
    /// participating neighbor for its full table. A running process is
    /// restarted with the new configuration.
    pub fn enable_rip(&mut self, cfg: RipConfig) {
        if self.rip.enabled {
            self.disable_rip();
        }
        self.rip.cfg = cfg;
        self.rip.enabled = true;
        let interval = self.rip.cfg.update_interval;
        self.rip.update_timer = Some(self.timers.schedule_periodic(interval, TimerEvent::RipUpdate));
        info!("{}: RIP enabled", self.name);
        for iface in self.rip_interfaces() {
            self.rip_send_message(&iface, RipMessage::request_full());
        }
    }

    /// Stop the RIP process: cancel every timer it owns, drop all learned
    /// routes from the FIB, and clear the RIP table.
    pub fn disable_rip(&mut self) {
        if !self.rip.enabled {
            return;
        }
        if let Some(t) = self.rip.update_timer.take() {
            self.timers.cancel(t);
        }
        let handles: Vec<TimerHandle> = self
            .rip
            .routes
            .iter()
            .flat_map(|(_, st)| [st.timeout_timer, st.gc_timer])
            .flatten()
            .collect();
        for handle in handles {
            self.timers.cancel(handle);
        }
        self.rip.routes = PrefixMap::new();
        self.fib.remove_where(|r| r.kind == RouteKind::Rip);
        self.rip.enabled = false;
        info!("{}: RIP disabled", self.name);
    }

    /// Add a network to the set RIP covers. Ports whose connected network
    /// falls inside it participate from the next update on.
    pub fn rip_advertise_network(&mut self, net: Ipv4Net) {
        let net = net.trunc();
        if !self.rip.cfg.networks.contains(&net) {
            self.rip.cfg.networks.push(net);
        }
    }

    /// Returns `true` while the RIP process runs.
    pub fn rip_enabled(&self) -> bool {
        self.rip.enabled
    }

    /// The active RIP configuration.
    pub fn rip_config(&self) -> &RipConfig {
        &self.rip.cfg
    }

    /// Value copy of the RIP route table.
    pub fn rip_routes(&self) -> HashMap<Ipv4Net, RipRouteInfo> {
        let now = self.timers.now();
        self.rip
            .routes
            .iter()
            .map(|(net, st)| {
                (
                    *net,
                    RipRouteInfo {
                        metric: self.fib_rip_metric(*net).unwrap_or(RIP_INFINITY),
                        learned_from: st.learned_from,
                        age: now.saturating_sub(st.last_update),
                        gc: st.gc,
                    },
                )
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    /// Ports participating in RIP: up, numbered, and covered by an
    /// advertised network.
    fn rip_interfaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .ports
            .values()
            .filter(|p| p.up)
            .filter_map(|p| p.network().map(|net| (p, net)))
            .filter(|(_, net)| self.rip.cfg.networks.iter().any(|cfg| cfg.contains(net)))
            .map(|(p, _)| p.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Encapsulate one RIP message: UDP 520 to 520, checksum zero, IPv4 to
    /// the limited broadcast with TTL 1, Ethernet to the broadcast MAC.
    fn rip_send_message(&mut self, iface: &str, msg: RipMessage) {
        let Some(port) = self.ports.get(iface) else {
            return;
        };
        let Some(src_ip) = port.ip() else {
            return;
        };
        let mac = port.mac;
        let pkt = Ipv4Packet::new(
            src_ip,
            Ipv4Addr::BROADCAST,
            RIP_TTL,
            Ipv4Payload::Udp(UdpDatagram::rip(msg)),
        );
        self.sink.send(
            iface,
            EthernetFrame {
                src: mac,
                dst: MacAddr::BROADCAST,
                payload: EtherPayload::Ipv4(pkt),
            },
        );
    }

    /// Advertise `routes` on `iface`, applying split horizon and chunking
    /// into messages of at most 25 entries. `include_invalid` lets a
    /// triggered update carry a metric-16 route that periodic updates skip.
    fn rip_send_update_on(&mut self, iface: &str, routes: &[RouteEntry], include_invalid: bool) {
        let split_horizon = self.rip.cfg.split_horizon;
        let poisoned_reverse = self.rip.cfg.poisoned_reverse;
        let mut entries = Vec::new();
        for r in routes {
            if !include_invalid && r.kind == RouteKind::Rip && r.metric >= RIP_INFINITY {
                continue;
            }
            let metric = if split_horizon && r.iface == iface {
                if poisoned_reverse && r.kind == RouteKind::Rip {
                    RIP_INFINITY
                } else {
                    continue;
                }
            } else {
                match r.kind {
                    RouteKind::Connected => 1,
                    _ => (r.metric + 1).min(RIP_INFINITY),
                }
            };
            entries.push(RipEntry {
                afi: AFI_IPV4,
                route_tag: 0,
                ip: r.net.network(),
                mask: r.net.netmask(),
                next_hop: Ipv4Addr::UNSPECIFIED,
                metric,
            });
        }
        for chunk in entries.chunks(RIP_MAX_ENTRIES) {
            self.rip_send_message(iface, RipMessage::response(chunk.to_vec()));
        }
    }

    fn rip_send_full_update_on(&mut self, iface: &str) {
        let routes = self.fib.entries().to_vec();
        self.rip_send_update_on(iface, &routes, false);
    }

    /// The periodic full-table update on every participating port.
    pub(crate) fn rip_periodic_update(&mut self) {
        if !self.rip.enabled {
            return;
        }
        for iface in self.rip_interfaces() {
            self.rip_send_full_update_on(&iface);
        }
    }

    /// A triggered update carries exactly the changed route.
    fn rip_send_triggered(&mut self, route: &RouteEntry) {
        for iface in self.rip_interfaces() {
            self.rip_send_update_on(&iface, std::slice::from_ref(route), true);
        }
    }

    // ------------------------------------------------------------------
    // Receiving
    // ------------------------------------------------------------------

    /// Entry point for a RIP message delivered to UDP port 520.
    pub(crate) fn rip_handle_message(&mut self, port: &str, src: Ipv4Addr, msg: RipMessage) {
        if !self.rip.enabled {
            return;
        }
        match msg.command {
            RipCommand::Request => self.rip_send_full_update_on(port),
            RipCommand::Response => {
                for entry in &msg.entries {
                    self.rip_process_entry(port, src, entry);
                }
            }
        }
    }

    fn rip_process_entry(&mut self, port: &str, src: Ipv4Addr, entry: &RipEntry) {
        if entry.afi != AFI_IPV4 && entry.afi != AFI_UNSPEC {
            return;
        }
        if entry.metric < 1 || entry.metric > RIP_INFINITY {
            return;
        }
        // a non-contiguous mask is unrepresentable as a prefix: reject
        let Ok(net) = Ipv4Net::with_netmask(entry.ip, entry.mask) else {
            return;
        };
        let net = net.trunc();
        let new_metric = entry.metric.min(RIP_INFINITY);

        // never let a neighbor override a directly connected network
        if self
            .fib
            .entries()
            .iter()
            .any(|r| r.kind == RouteKind::Connected && r.net == net)
        {
            return;
        }

        match self.rip.routes.get(&net).map(|st| st.learned_from) {
            None => {
                if new_metric < RIP_INFINITY {
                    self.rip_install(net, src, port, new_metric);
                }
            }
            Some(from) if from == src => self.rip_refresh(net, new_metric),
            Some(_) => {
                let current = self.fib_rip_metric(net).unwrap_or(RIP_INFINITY);
                if new_metric < current {
                    self.rip_remove(net);
                    self.rip_install(net, src, port, new_metric);
                }
            }
        }
    }

    /// Install a fresh route and its state, and arm the timeout timer.
    fn rip_install(&mut self, net: Ipv4Net, src: Ipv4Addr, iface: &str, metric: u32) {
        self.fib.insert(RouteEntry {
            net,
            next_hop: Some(src),
            iface: iface.to_string(),
            kind: RouteKind::Rip,
            ad: RouteKind::Rip.ad(),
            metric,
        });
        let timeout = self.rip.cfg.route_timeout;
        let handle = self.timers.schedule_once(timeout, TimerEvent::RipTimeout(net));
        let now = self.timers.now();
        self.rip.routes.insert(
            net,
            RipRouteState {
                learned_from: src,
                learned_on: iface.to_string(),
                last_update: now,
                gc: false,
                timeout_timer: Some(handle),
                gc_timer: None,
            },
        );
        info!(
            "{}: RIP learned {} via {} metric {}",
            self.name, net, src, metric
        );
    }

    /// An in-range update from the route's own neighbor: refresh, or turn
    /// invalid if the neighbor poisoned it.
    fn rip_refresh(&mut self, net: Ipv4Net, new_metric: u32) {
        let now = self.timers.now();
        let Some(st) = self.rip.routes.get_mut(&net) else {
            return;
        };
        st.last_update = now;
        let was_gc = st.gc;
        if new_metric >= RIP_INFINITY {
            if !was_gc {
                self.rip_enter_invalid(net);
            }
            return;
        }
        let old_timeout = st.timeout_timer.take();
        let old_gc = st.gc_timer.take();
        st.gc = false;
        if let Some(t) = old_timeout {
            self.timers.cancel(t);
        }
        if let Some(t) = old_gc {
            self.timers.cancel(t);
        }
        let timeout = self.rip.cfg.route_timeout;
        let handle = self.timers.schedule_once(timeout, TimerEvent::RipTimeout(net));
        if let Some(st) = self.rip.routes.get_mut(&net) {
            st.timeout_timer = Some(handle);
        }
        self.fib_set_rip_metric(net, new_metric);
    }

    /// Active to invalid: metric 16 in the FIB, garbage collection armed,
    /// a triggered update carrying the poisoned route.
    fn rip_enter_invalid(&mut self, net: Ipv4Net) {
        let gc_timeout = self.rip.cfg.gc_timeout;
        let gc_handle = self.timers.schedule_once(gc_timeout, TimerEvent::RipGc(net));
        let Some(st) = self.rip.routes.get_mut(&net) else {
            self.timers.cancel(gc_handle);
            return;
        };
        let old_timeout = st.timeout_timer.take();
        st.gc = true;
        st.gc_timer = Some(gc_handle);
        if let Some(t) = old_timeout {
            self.timers.cancel(t);
        }
        self.fib_set_rip_metric(net, RIP_INFINITY);
        info!("{}: RIP route {} is now unreachable", self.name, net);
        if let Some(route) = self.fib_rip_entry(net) {
            let route = route.clone();
            self.rip_send_triggered(&route);
        }
    }

    /// Drop a route and its state, cancelling whatever timers it owns.
    fn rip_remove(&mut self, net: Ipv4Net) {
        if let Some(st) = self.rip.routes.remove(&net) {
            if let Some(t) = st.timeout_timer {
                self.timers.cancel(t);
            }
            if let Some(t) = st.gc_timer {
                self.timers.cancel(t);
            }
        }
        self.fib
            .remove_where(|r| r.kind == RouteKind::Rip && r.net == net);
    }

    // ------------------------------------------------------------------
    // Timer events
    // ------------------------------------------------------------------

    /// The route went `route_timeout` without a refresh from its neighbor.
    pub(crate) fn rip_route_timeout(&mut self, net: Ipv4Net) {
        if !self.rip.enabled {
            return;
        }
        let active = self.rip.routes.get(&net).map(|st| !st.gc).unwrap_or(false);
        if active {
            debug!("{}: RIP route {} timed out", self.name, net);
            self.rip_enter_invalid(net);
        }
    }

    /// The invalid route lingered long enough; forget it entirely.
    pub(crate) fn rip_route_gc(&mut self, net: Ipv4Net) {
        if !self.rip.enabled {
            return;
        }
        let invalid = self.rip.routes.get(&net).map(|st| st.gc).unwrap_or(false);
        if invalid {
            self.rip.routes.remove(&net);
            self.fib
                .remove_where(|r| r.kind == RouteKind::Rip && r.net == net);
            debug!("{}: RIP route {} garbage collected", self.name, net);
        }
    }

    // ------------------------------------------------------------------
    // FIB helpers
    // ------------------------------------------------------------------

    fn fib_rip_entry(&self, net: Ipv4Net) -> Option<&RouteEntry> {
        self.fib
            .entries()
            .iter()
            .find(|r| r.kind == RouteKind::Rip && r.net == net)
    }

    fn fib_rip_metric(&self, net: Ipv4Net) -> Option<u32> {
        self.fib_rip_entry(net).map(|r| r.metric)
    }

    fn fib_set_rip_metric(&mut self, net: Ipv4Net, metric: u32) {
        for r in self.fib.entries_mut() {
            if r.kind == RouteKind::Rip && r.net == net {
                r.metric = metric;
            }
        }
    }
}
