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

use pretty_assertions::assert_eq;

use super::{ip, net};
use crate::{
    fib::Fib,
    types::{RouteEntry, RouteKind},
};

fn route(n: &str, kind: RouteKind, ad: u8, metric: u32, iface: &str) -> RouteEntry {
    RouteEntry {
        net: net(n),
        next_hop: match kind {
            RouteKind::Connected => None,
            _ => Some(ip("10.0.0.254")),
        },
        iface: iface.to_string(),
        kind,
        ad,
        metric,
    }
}

#[test]
fn longest_prefix_wins() {
    let mut fib = Fib::new();
    fib.insert(route("10.0.0.0/8", RouteKind::Static, 1, 0, "eth0"));
    fib.insert(route("10.1.0.0/16", RouteKind::Static, 1, 0, "eth1"));
    fib.insert(route("10.1.2.0/24", RouteKind::Rip, 120, 5, "eth2"));

    assert_eq!(fib.lookup(ip("10.1.2.3")).unwrap().iface, "eth2");
    assert_eq!(fib.lookup(ip("10.1.9.9")).unwrap().iface, "eth1");
    assert_eq!(fib.lookup(ip("10.9.9.9")).unwrap().iface, "eth0");
    assert!(fib.lookup(ip("11.0.0.1")).is_none());
}

#[test]
fn ad_breaks_prefix_ties() {
    let mut fib = Fib::new();
    fib.insert(route("10.1.0.0/16", RouteKind::Rip, 120, 1, "rip"));
    fib.insert(route("10.1.0.0/16", RouteKind::Static, 1, 4, "static"));

    // lower AD wins even with a worse metric
    assert_eq!(fib.lookup(ip("10.1.0.1")).unwrap().iface, "static");
}

#[test]
fn metric_breaks_ad_ties() {
    let mut fib = Fib::new();
    fib.insert(route("10.1.0.0/16", RouteKind::Rip, 120, 7, "worse"));
    fib.insert(route("10.1.0.0/16", RouteKind::Rip, 120, 2, "better"));

    assert_eq!(fib.lookup(ip("10.1.0.1")).unwrap().iface, "better");
}

#[test]
fn insertion_order_breaks_full_ties() {
    let mut fib = Fib::new();
    fib.insert(route("10.1.0.0/16", RouteKind::Rip, 120, 2, "first"));
    fib.insert(route("10.1.0.0/16", RouteKind::Rip, 120, 2, "second"));

    assert_eq!(fib.lookup(ip("10.1.0.1")).unwrap().iface, "first");
}

#[test]
fn default_route_is_last_resort() {
    let mut fib = Fib::new();
    fib.insert(route("0.0.0.0/0", RouteKind::Default, 1, 0, "gw"));
    fib.insert(route("10.1.0.0/16", RouteKind::Connected, 0, 0, "eth0"));

    assert_eq!(fib.lookup(ip("10.1.0.1")).unwrap().iface, "eth0");
    assert_eq!(fib.lookup(ip("8.8.8.8")).unwrap().iface, "gw");
}

#[test]
fn remove_where_deletes_in_place() {
    let mut fib = Fib::new();
    fib.insert(route("10.1.0.0/16", RouteKind::Rip, 120, 2, "a"));
    fib.insert(route("10.2.0.0/16", RouteKind::Static, 1, 0, "b"));
    fib.insert(route("10.3.0.0/16", RouteKind::Rip, 120, 3, "c"));

    fib.remove_where(|r| r.kind == RouteKind::Rip);
    assert_eq!(fib.len(), 1);
    assert_eq!(fib.entries()[0].iface, "b");
}

#[test]
fn connected_route_to_picks_most_specific() {
    let mut fib = Fib::new();
    fib.insert(route("10.0.0.0/8", RouteKind::Connected, 0, 0, "wide"));
    fib.insert(route("10.0.1.0/24", RouteKind::Connected, 0, 0, "narrow"));
    fib.insert(route("10.0.1.0/24", RouteKind::Rip, 120, 1, "rip"));

    assert_eq!(fib.connected_route_to(ip("10.0.1.7")).unwrap().iface, "narrow");
    assert_eq!(fib.connected_route_to(ip("10.2.0.1")).unwrap().iface, "wide");
    assert!(fib.connected_route_to(ip("192.168.0.1")).is_none());
}
