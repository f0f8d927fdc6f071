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

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use crate::prelude::*;

/// A MAC address in the test range `aa:bb:cc:dd:ee:xx`.
fn mac(x: u8) -> MacAddr {
    MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, x])
}

fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

fn net(s: &str) -> Ipv4Net {
    s.parse().unwrap()
}

/// A router with `eth0 = 10.0.0.1/24` (MAC `...:10`) and `eth1 = 10.0.1.1/24`
/// (MAC `...:11`), collecting egress frames in a [`VecSink`].
fn two_port_router() -> Router<VecSink> {
    let mut r = Router::new("r1", VecSink::default());
    r.add_port("eth0", mac(0x10));
    r.add_port("eth1", mac(0x11));
    r.configure_interface("eth0", net("10.0.0.1/24")).unwrap();
    r.configure_interface("eth1", net("10.0.1.1/24")).unwrap();
    r
}

/// Teach the router a neighbor mapping by feeding it an ARP reply, and
/// discard any output.
fn learn(r: &mut Router<VecSink>, port: &str, neighbor: &str, neighbor_mac: MacAddr) {
    let port_mac = r.interface(port).unwrap().mac;
    let port_ip = r.interface(port).unwrap().ip().unwrap();
    let arp = ArpPacket {
        op: ArpOp::Reply,
        sender_mac: neighbor_mac,
        sender_ip: ip(neighbor),
        target_mac: port_mac,
        target_ip: port_ip,
    };
    r.handle_frame(
        port,
        EthernetFrame {
            src: neighbor_mac,
            dst: port_mac,
            payload: EtherPayload::Arp(arp),
        },
    );
    r.sink_mut().take();
}

/// A transit datagram of some uninteresting protocol, 40 bytes total.
fn raw_packet(src: &str, dst: &str, ttl: u8) -> Ipv4Packet {
    Ipv4Packet::new_raw(ip(src), ip(dst), ttl, 99, vec![0; 20])
}

/// Wrap a packet in a frame addressed to the given port of the router.
fn frame_for(r: &Router<VecSink>, port: &str, pkt: Ipv4Packet) -> EthernetFrame {
    EthernetFrame {
        src: mac(0xfe),
        dst: r.interface(port).unwrap().mac,
        payload: EtherPayload::Ipv4(pkt),
    }
}

/// Unwrap the RIP message inside an emitted frame.
fn rip_payload(frame: &EthernetFrame) -> &RipMessage {
    let EtherPayload::Ipv4(pkt) = &frame.payload else {
        panic!("expected an IPv4 frame");
    };
    let Ipv4Payload::Udp(udp) = &pkt.payload else {
        panic!("expected a UDP datagram");
    };
    let UdpPayload::Rip(msg) = &udp.payload else {
        panic!("expected a RIP message");
    };
    msg
}

mod test_fib;
mod test_router;
