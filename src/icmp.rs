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

//! ICMP generation.
//!
//! Every message is sourced from the address of the interface the offending
//! datagram arrived on and sent back to that datagram's source. Generated
//! packets take the same route lookup and ARP resolution path as transit
//! traffic, so they too can end up parked in the resolver queue, and they
//! are silently lost if resolution times out.

use log::*;

use crate::{
    arp::EgressKind,
    router::{FrameSink, Router},
    wire::{
        IcmpMessage, Ipv4Packet, Ipv4Payload, DEFAULT_TTL, UNREACH_FRAG_NEEDED, UNREACH_NET,
    },
};

/// Returns `true` if the packet carries an ICMP error message. Per RFC 1812
/// the router never generates an error about an error.
fn is_icmp_error(pkt: &Ipv4Packet) -> bool {
    matches!(&pkt.payload, Ipv4Payload::Icmp(msg) if msg.is_error())
}

/// The quoted part of an offending datagram: IP header plus 64 bits of
/// payload, as RFC 792 requires.
fn quote_original(pkt: &Ipv4Packet) -> Vec<u8> {
    let bytes = pkt.to_bytes();
    let keep = (pkt.header_len() + 8).min(bytes.len());
    bytes[..keep].to_vec()
}

impl<S: FrameSink> Router<S> {
    /// Answer an echo request addressed to one of our interfaces.
    pub(crate) fn send_echo_reply(&mut self, ingress: &str, request: &Ipv4Packet) {
        let Ipv4Payload::Icmp(IcmpMessage::EchoRequest { ident, seq, data }) = &request.payload
        else {
            return;
        };
        let reply = IcmpMessage::EchoReply {
            ident: *ident,
            seq: *seq,
            data: data.clone(),
        };
        self.counters.icmp_out_echo_reps += 1;
        self.counters.icmp_out_msgs += 1;
        self.originate_icmp(ingress, request, reply, EgressKind::EchoReply);
    }

    /// Report that the TTL of a transit datagram expired.
    pub(crate) fn send_time_exceeded(&mut self, ingress: &str, offending: &Ipv4Packet) {
        if is_icmp_error(offending) {
            trace!("{}: suppressing time-exceeded about an ICMP error", self.name);
            return;
        }
        let msg = IcmpMessage::TimeExceeded {
            original: quote_original(offending),
        };
        self.counters.icmp_out_time_excds += 1;
        self.counters.icmp_out_msgs += 1;
        self.originate_icmp(ingress, offending, msg, EgressKind::Control);
    }

    /// Report that no route matches the destination of a transit datagram.
    pub(crate) fn send_no_route(&mut self, ingress: &str, offending: &Ipv4Packet) {
        self.send_unreachable(ingress, offending, UNREACH_NET);
    }

    /// Report that a transit datagram with DF set exceeds the egress MTU.
    pub(crate) fn send_frag_needed(&mut self, ingress: &str, offending: &Ipv4Packet) {
        self.send_unreachable(ingress, offending, UNREACH_FRAG_NEEDED);
    }

    fn send_unreachable(&mut self, ingress: &str, offending: &Ipv4Packet, code: u8) {
        if is_icmp_error(offending) {
            trace!("{}: suppressing unreachable about an ICMP error", self.name);
            return;
        }
        let msg = IcmpMessage::DestinationUnreachable {
            code,
            original: quote_original(offending),
        };
        self.counters.icmp_out_dest_unreachs += 1;
        self.counters.icmp_out_msgs += 1;
        self.originate_icmp(ingress, offending, msg, EgressKind::Control);
    }

    /// Build the IPv4 envelope around `msg` and hand it to the forwarding
    /// egress path. Without an address on the ingress port, or without a
    /// route back to the source, the message is silently dropped.
    fn originate_icmp(
        &mut self,
        ingress: &str,
        offending: &Ipv4Packet,
        msg: IcmpMessage,
        kind: EgressKind,
    ) {
        let Some(src) = self.ports.get(ingress).and_then(|p| p.ip()) else {
            return;
        };
        let pkt = Ipv4Packet::new(src, offending.src, DEFAULT_TTL, Ipv4Payload::Icmp(msg));
        let Some(route) = self.fib.lookup(pkt.dst).cloned() else {
            trace!("{}: no route for ICMP towards {}", self.name, pkt.dst);
            return;
        };
        let next_hop = route.next_hop.unwrap_or(pkt.dst);
        self.resolve_and_send(&route.iface, next_hop, pkt, kind);
    }
}
