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

use super::{frame_for, ip, learn, mac, net, raw_packet, two_port_router};
use crate::{
    prelude::*,
    wire::{UNREACH_FRAG_NEEDED, UNREACH_NET},
};

fn unwrap_ipv4(frame: &EthernetFrame) -> &Ipv4Packet {
    let EtherPayload::Ipv4(pkt) = &frame.payload else {
        panic!("expected an IPv4 frame");
    };
    pkt
}

fn unwrap_icmp(frame: &EthernetFrame) -> &IcmpMessage {
    let Ipv4Payload::Icmp(msg) = &unwrap_ipv4(frame).payload else {
        panic!("expected an ICMP payload");
    };
    msg
}

#[test]
fn connected_route_install() {
    let mut r = Router::new("r1", VecSink::default());
    r.add_port("eth0", mac(0x10));
    r.configure_interface("eth0", net("10.0.0.1/24")).unwrap();

    assert_eq!(
        r.routing_table(),
        vec![RouteEntry {
            net: net("10.0.0.0/24"),
            next_hop: None,
            iface: "eth0".to_string(),
            kind: RouteKind::Connected,
            ad: 0,
            metric: 0,
        }]
    );

    // reconfiguring replaces the connected route instead of stacking one
    r.configure_interface("eth0", net("10.0.7.1/24")).unwrap();
    assert_eq!(r.routing_table().len(), 1);
    assert_eq!(r.routing_table()[0].net, net("10.0.7.0/24"));
}

#[test]
fn forwarding_happy_path() {
    let mut r = two_port_router();
    learn(&mut r, "eth1", "10.0.1.2", mac(2));

    let pkt = raw_packet("10.0.0.2", "10.0.1.2", 64);
    let total_length = u64::from(pkt.total_length);
    r.handle_frame("eth0", frame_for(&r, "eth0", pkt.clone()));

    let frames = r.sink_mut().take();
    assert_eq!(frames.len(), 1);
    let (port, frame) = &frames[0];
    assert_eq!(port, "eth1");
    assert_eq!(frame.src, mac(0x11));
    assert_eq!(frame.dst, mac(2));
    let out = unwrap_ipv4(frame);
    assert_eq!(out.ttl, 63);
    assert!(out.verify_checksum());
    assert_eq!(out.src, pkt.src);
    assert_eq!(out.dst, pkt.dst);
    assert_eq!(out.payload, pkt.payload);

    let c = r.counters();
    assert_eq!(c.if_in_octets, total_length);
    assert_eq!(c.ip_forw_datagrams, 1);
    assert_eq!(c.if_out_octets, total_length);
    assert_eq!(c.ip_in_hdr_errors, 0);
    assert_eq!(c.ip_in_addr_errors, 0);
}

#[test]
fn ttl_expiry_generates_time_exceeded() {
    let mut r = two_port_router();
    learn(&mut r, "eth0", "10.0.0.2", mac(1));
    learn(&mut r, "eth1", "10.0.1.2", mac(2));

    let pkt = raw_packet("10.0.0.2", "10.0.1.2", 1);
    let quoted = pkt.to_bytes()[..28].to_vec();
    r.handle_frame("eth0", frame_for(&r, "eth0", pkt));

    let frames = r.sink_mut().take();
    assert_eq!(frames.len(), 1);
    let (port, frame) = &frames[0];
    assert_eq!(port, "eth0");
    assert_eq!(frame.dst, mac(1));
    let out = unwrap_ipv4(frame);
    assert_eq!(out.src, ip("10.0.0.1"));
    assert_eq!(out.dst, ip("10.0.0.2"));
    assert_eq!(out.ttl, 255);
    assert_eq!(
        unwrap_icmp(frame),
        &IcmpMessage::TimeExceeded { original: quoted }
    );

    let c = r.counters();
    assert_eq!(c.icmp_out_time_excds, 1);
    assert_eq!(c.icmp_out_msgs, 1);
    assert_eq!(c.ip_forw_datagrams, 0);
}

#[test]
fn no_route_generates_unreachable() {
    let mut r = two_port_router();
    learn(&mut r, "eth0", "10.0.0.2", mac(1));

    r.handle_frame("eth0", frame_for(&r, "eth0", raw_packet("10.0.0.2", "8.8.8.8", 64)));

    let frames = r.sink_mut().take();
    assert_eq!(frames.len(), 1);
    let msg = unwrap_icmp(&frames[0].1);
    let IcmpMessage::DestinationUnreachable { code, .. } = msg else {
        panic!("expected destination unreachable, got {msg:?}");
    };
    assert_eq!(*code, UNREACH_NET);

    let c = r.counters();
    assert_eq!(c.ip_in_addr_errors, 1);
    assert_eq!(c.icmp_out_dest_unreachs, 1);
    assert_eq!(c.icmp_out_msgs, 1);
}

#[test]
fn header_sanity_failures_drop_silently() {
    let mut r = two_port_router();
    learn(&mut r, "eth0", "10.0.0.2", mac(1));
    learn(&mut r, "eth1", "10.0.1.2", mac(2));

    // corrupted checksum
    let mut pkt = raw_packet("10.0.0.2", "10.0.1.2", 64);
    pkt.checksum ^= 0xffff;
    r.handle_frame("eth0", frame_for(&r, "eth0", pkt));

    // wrong version
    let mut pkt = raw_packet("10.0.0.2", "10.0.1.2", 64);
    pkt.version = 6;
    pkt.compute_checksum();
    r.handle_frame("eth0", frame_for(&r, "eth0", pkt));

    // total length shorter than the header
    let mut pkt = raw_packet("10.0.0.2", "10.0.1.2", 64);
    pkt.total_length = 12;
    pkt.compute_checksum();
    r.handle_frame("eth0", frame_for(&r, "eth0", pkt));

    // sanity failures never produce ICMP
    assert!(r.sink_mut().take().is_empty());
    let c = r.counters();
    assert_eq!(c.ip_in_hdr_errors, 3);
    assert_eq!(c.icmp_out_msgs, 0);
    assert_eq!(c.ip_forw_datagrams, 0);
}

#[test]
fn limited_broadcast_is_always_local() {
    let mut r = two_port_router();
    learn(&mut r, "eth1", "10.0.1.2", mac(2));
    r.set_default_route(ip("10.0.1.2"), 0).unwrap();

    // even with a default route, 255.255.255.255 takes the local branch
    let pkt = Ipv4Packet::new(
        ip("10.0.0.2"),
        ip("255.255.255.255"),
        64,
        Ipv4Payload::Udp(UdpDatagram {
            src_port: 4000,
            dst_port: 9,
            checksum: 0,
            payload: UdpPayload::Raw(vec![0; 4]),
        }),
    );
    r.handle_frame("eth0", frame_for(&r, "eth0", pkt));

    assert!(r.sink_mut().take().is_empty());
    assert_eq!(r.counters().ip_forw_datagrams, 0);
    assert_eq!(r.counters().ip_in_addr_errors, 0);
}

#[test]
fn echo_request_to_us_is_answered() {
    let mut r = two_port_router();
    learn(&mut r, "eth0", "10.0.0.2", mac(1));

    let request = Ipv4Packet::new(
        ip("10.0.0.2"),
        ip("10.0.0.1"),
        64,
        Ipv4Payload::Icmp(IcmpMessage::EchoRequest {
            ident: 7,
            seq: 9,
            data: vec![1, 2, 3],
        }),
    );
    let request_len = u64::from(request.total_length);
    r.handle_frame("eth0", frame_for(&r, "eth0", request));

    let frames = r.sink_mut().take();
    assert_eq!(frames.len(), 1);
    let (port, frame) = &frames[0];
    assert_eq!(port, "eth0");
    assert_eq!(frame.dst, mac(1));
    let reply = unwrap_ipv4(frame);
    assert_eq!(reply.src, ip("10.0.0.1"));
    assert_eq!(reply.dst, ip("10.0.0.2"));
    assert_eq!(reply.ttl, 255);
    assert_eq!(
        unwrap_icmp(frame),
        &IcmpMessage::EchoReply {
            ident: 7,
            seq: 9,
            data: vec![1, 2, 3],
        }
    );

    let c = r.counters();
    assert_eq!(c.icmp_out_echo_reps, 1);
    assert_eq!(c.icmp_out_msgs, 1);
    assert_eq!(c.if_in_octets, request_len);
    assert_eq!(c.if_out_octets, u64::from(reply.total_length));
}

#[test]
fn echo_reply_sourced_from_ingress_port() {
    let mut r = two_port_router();
    learn(&mut r, "eth0", "10.0.0.2", mac(1));

    // ping the *other* port's address; the reply is still sourced from the
    // port the request came in on
    let request = Ipv4Packet::new(
        ip("10.0.0.2"),
        ip("10.0.1.1"),
        64,
        Ipv4Payload::Icmp(IcmpMessage::EchoRequest {
            ident: 1,
            seq: 1,
            data: vec![],
        }),
    );
    r.handle_frame("eth0", frame_for(&r, "eth0", request));

    let frames = r.sink_mut().take();
    assert_eq!(frames.len(), 1);
    assert_eq!(unwrap_ipv4(&frames[0].1).src, ip("10.0.0.1"));
}

#[test]
fn other_local_traffic_drops_silently() {
    let mut r = two_port_router();
    learn(&mut r, "eth0", "10.0.0.2", mac(1));

    // an ICMP error addressed to us
    let pkt = Ipv4Packet::new(
        ip("10.0.0.2"),
        ip("10.0.0.1"),
        64,
        Ipv4Payload::Icmp(IcmpMessage::TimeExceeded {
            original: vec![0; 28],
        }),
    );
    r.handle_frame("eth0", frame_for(&r, "eth0", pkt));

    // a UDP datagram to a port nobody listens on
    let pkt = Ipv4Packet::new(
        ip("10.0.0.2"),
        ip("10.0.0.1"),
        64,
        Ipv4Payload::Udp(UdpDatagram {
            src_port: 4000,
            dst_port: 53,
            checksum: 0,
            payload: UdpPayload::Raw(vec![0; 10]),
        }),
    );
    r.handle_frame("eth0", frame_for(&r, "eth0", pkt));

    // some other transport protocol
    r.handle_frame("eth0", frame_for(&r, "eth0", raw_packet("10.0.0.2", "10.0.0.1", 64)));

    assert!(r.sink_mut().take().is_empty());
    assert_eq!(r.counters().icmp_out_msgs, 0);
}

#[test]
fn mtu_exceeded_with_df_generates_unreachable() {
    let mut r = two_port_router();
    learn(&mut r, "eth0", "10.0.0.2", mac(1));
    learn(&mut r, "eth1", "10.0.1.2", mac(2));
    r.set_mtu("eth1", 100).unwrap();

    let mut pkt = Ipv4Packet::new_raw(ip("10.0.0.2"), ip("10.0.1.2"), 64, 99, vec![0; 120]);
    pkt.set_df(true);
    r.handle_frame("eth0", frame_for(&r, "eth0", pkt));

    let frames = r.sink_mut().take();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].0, "eth0");
    let IcmpMessage::DestinationUnreachable { code, .. } = unwrap_icmp(&frames[0].1) else {
        panic!("expected destination unreachable");
    };
    assert_eq!(*code, UNREACH_FRAG_NEEDED);
    assert_eq!(r.counters().icmp_out_dest_unreachs, 1);
    assert_eq!(r.counters().ip_forw_datagrams, 0);
}

#[test]
fn mtu_exceeded_without_df_drops_silently() {
    let mut r = two_port_router();
    learn(&mut r, "eth1", "10.0.1.2", mac(2));
    r.set_mtu("eth1", 100).unwrap();

    let pkt = Ipv4Packet::new_raw(ip("10.0.0.2"), ip("10.0.1.2"), 64, 99, vec![0; 120]);
    r.handle_frame("eth0", frame_for(&r, "eth0", pkt));

    assert!(r.sink_mut().take().is_empty());
    assert_eq!(r.counters().icmp_out_msgs, 0);
}

#[test]
fn no_error_about_an_icmp_error() {
    let mut r = two_port_router();
    learn(&mut r, "eth0", "10.0.0.2", mac(1));

    // a transit ICMP error whose TTL expires
    let pkt = Ipv4Packet::new(
        ip("10.0.0.2"),
        ip("10.0.1.2"),
        1,
        Ipv4Payload::Icmp(IcmpMessage::TimeExceeded {
            original: vec![0; 28],
        }),
    );
    r.handle_frame("eth0", frame_for(&r, "eth0", pkt));

    // and one that has no route
    let pkt = Ipv4Packet::new(
        ip("10.0.0.2"),
        ip("9.9.9.9"),
        64,
        Ipv4Payload::Icmp(IcmpMessage::DestinationUnreachable {
            code: UNREACH_NET,
            original: vec![0; 28],
        }),
    );
    r.handle_frame("eth0", frame_for(&r, "eth0", pkt));

    assert!(r.sink_mut().take().is_empty());
    assert_eq!(r.counters().icmp_out_msgs, 0);
    // the drop is still accounted as an addressing error
    assert_eq!(r.counters().ip_in_addr_errors, 1);
}

#[test]
fn frames_not_for_us_are_dropped() {
    let mut r = two_port_router();
    let pkt = raw_packet("10.0.0.2", "10.0.1.2", 64);
    r.handle_frame(
        "eth0",
        EthernetFrame {
            src: mac(1),
            dst: mac(0x99),
            payload: EtherPayload::Ipv4(pkt.clone()),
        },
    );
    // unknown ingress port
    r.handle_frame("eth9", frame_for(&r, "eth0", pkt));

    assert!(r.sink_mut().take().is_empty());
    assert_eq!(r.counters().if_in_octets, 0);
}

#[test]
fn static_and_default_routes() {
    let mut r = two_port_router();
    learn(&mut r, "eth1", "10.0.1.2", mac(2));

    assert_eq!(
        r.add_static_route(net("10.9.0.0/16"), ip("192.168.0.1"), 0),
        Err(ConfigError::NextHopUnreachable(ip("192.168.0.1")))
    );

    r.add_static_route(net("10.9.0.0/16"), ip("10.0.1.2"), 0).unwrap();
    r.handle_frame("eth0", frame_for(&r, "eth0", raw_packet("10.0.0.2", "10.9.1.1", 64)));
    let frames = r.sink_mut().take();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].0, "eth1");
    assert_eq!(frames[0].1.dst, mac(2));

    // the default route catches the rest, and is replaced, not stacked
    r.set_default_route(ip("10.0.1.2"), 0).unwrap();
    r.set_default_route(ip("10.0.1.2"), 5).unwrap();
    let defaults: Vec<RouteEntry> = r
        .routing_table()
        .into_iter()
        .filter(|e| e.kind == RouteKind::Default)
        .collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].metric, 5);
    assert_eq!(defaults[0].net, net("0.0.0.0/0"));

    r.handle_frame("eth0", frame_for(&r, "eth0", raw_packet("10.0.0.2", "8.8.8.8", 64)));
    let frames = r.sink_mut().take();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].0, "eth1");

    assert!(r.remove_static_route(net("10.9.0.0/16")));
    assert!(!r.remove_static_route(net("10.9.0.0/16")));
}

#[test]
fn interface_state_controls_connected_route() {
    let mut r = two_port_router();
    learn(&mut r, "eth0", "10.0.0.2", mac(1));

    r.set_interface_state("eth1", false).unwrap();
    assert_eq!(r.routing_table().len(), 1);

    // with eth1 down, its network is unreachable
    r.handle_frame("eth0", frame_for(&r, "eth0", raw_packet("10.0.0.2", "10.0.1.2", 64)));
    let frames = r.sink_mut().take();
    assert_eq!(frames.len(), 1);
    assert!(matches!(
        unwrap_icmp(&frames[0].1),
        IcmpMessage::DestinationUnreachable { .. }
    ));

    // frames arriving on a down port are ignored
    let pkt = raw_packet("10.0.1.2", "10.0.0.2", 64);
    r.handle_frame("eth1", frame_for(&r, "eth1", pkt));
    assert!(r.sink_mut().take().is_empty());

    // bringing it back restores the connected route
    r.set_interface_state("eth1", true).unwrap();
    assert_eq!(r.routing_table().len(), 2);
}

#[test]
fn config_errors_do_not_mutate() {
    let mut r = two_port_router();
    assert_eq!(
        r.configure_interface("eth9", net("10.2.0.1/24")),
        Err(ConfigError::UnknownInterface("eth9".to_string()))
    );
    assert_eq!(
        r.set_mtu("eth9", 900),
        Err(ConfigError::UnknownInterface("eth9".to_string()))
    );
    assert_eq!(r.routing_table().len(), 2);
}

#[test]
fn wire_bytes_roundtrip_through_pipeline() {
    let mut r = two_port_router();
    learn(&mut r, "eth1", "10.0.1.2", mac(2));

    let frame = frame_for(&r, "eth0", raw_packet("10.0.0.2", "10.0.1.2", 64));
    r.handle_frame_bytes("eth0", &frame.to_bytes());

    let frames = r.sink_mut().take();
    assert_eq!(frames.len(), 1);
    assert_eq!(unwrap_ipv4(&frames[0].1).ttl, 63);

    // garbage on the wire is dropped without a panic
    r.handle_frame_bytes("eth0", &[0x42; 11]);
    assert!(r.sink_mut().take().is_empty());
}

#[test]
fn snapshot_serializes() {
    let mut r = two_port_router();
    learn(&mut r, "eth1", "10.0.1.2", mac(2));
    let json = r.snapshot().to_json();
    assert!(json.is_object());
    assert_eq!(json["routing_table"].as_array().unwrap().len(), 2);
    assert_eq!(json["counters"]["ip_forw_datagrams"], 0);
}
