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

//! The Forwarding Information Base: an ordered multiset of routes with
//! longest-prefix-match lookup.

use std::cmp::Reverse;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::types::{RouteEntry, RouteKind};

/// The routing table of a router.
///
/// Routes are kept in insertion order. Lookup is longest-prefix match; ties
/// on prefix length fall back to administrative distance, then metric, then
/// insertion order. Transient duplicates for the same prefix (as they occur
/// while RIP replaces a route) are tolerated and filtered by the tie-break.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fib {
    routes: Vec<RouteEntry>,
}

impl Fib {
    /// Create an empty FIB.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. No deduplication happens here; replacement is
    /// remove-then-insert by the caller.
    pub fn insert(&mut self, route: RouteEntry) {
        self.routes.push(route);
    }

    /// Remove every route matching the predicate.
    pub fn remove_where<F: FnMut(&RouteEntry) -> bool>(&mut self, mut pred: F) {
        self.routes.retain(|r| !pred(r));
    }

    /// All routes in insertion order.
    pub fn entries(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Mutable iteration, for in-place metric updates by the control plane.
    pub(crate) fn entries_mut(&mut self) -> std::slice::IterMut<'_, RouteEntry> {
        self.routes.iter_mut()
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if the FIB holds no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Longest-prefix-match lookup.
    pub fn lookup(&self, dst: Ipv4Addr) -> Option<&RouteEntry> {
        self.routes
            .iter()
            .enumerate()
            .filter(|(_, r)| r.net.contains(&dst))
            .min_by_key(|(idx, r)| (Reverse(r.net.prefix_len()), r.ad, r.metric, *idx))
            .map(|(_, r)| r)
    }

    /// The most specific connected route covering `ip`, used to validate
    /// next hops and to pick the egress interface of static routes.
    pub fn connected_route_to(&self, ip: Ipv4Addr) -> Option<&RouteEntry> {
        self.routes
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind == RouteKind::Connected && r.net.contains(&ip))
            .min_by_key(|(idx, r)| (Reverse(r.net.prefix_len()), *idx))
            .map(|(_, r)| r)
    }
}
