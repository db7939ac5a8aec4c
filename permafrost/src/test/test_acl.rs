// Permafrost: Verifying Network-Wide Configuration Properties
// Copyright (C) 2021  Tibor Schneider
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

use crate::encoder::acl::compile_acl;
use crate::encoder::symbolic::SymbolicPacket;
use crate::encoder::EncodeError;
use crate::netmodel::config::{Acl, AclLine, AclMatch, TcpFlags};
use crate::netmodel::types::{IpWildcard, LineAction, SubRange};
use crate::netmodel::Prefix;
use crate::smt::eval::evaluate_bool;
use crate::smt::Model;

fn packet_model(dst_ip: i64) -> Model {
    let mut model = Model::new();
    model.set_int("dst-ip", dst_ip);
    model.set_int("src-ip", 0);
    model.set_int("dst-port", 0);
    model.set_int("src-port", 0);
    model.set_int("icmp-code", 0);
    model.set_int("icmp-type", 0);
    model.set_int("ip-protocol", 6);
    for f in &["tcp-ack", "tcp-cwr", "tcp-ece", "tcp-fin", "tcp-psh", "tcp-rst", "tcp-syn",
        "tcp-urg"]
    {
        model.set_bool(*f, false);
    }
    model
}

fn dst_match(prefix: Prefix) -> AclMatch {
    AclMatch::DstIp(vec![IpWildcard::from_prefix(prefix)])
}

#[test]
fn first_declared_match_wins() {
    // the reject /24 line shadows the later accept /8 line for addresses under both
    let acl = Acl {
        name: "filter".to_string(),
        lines: vec![
            AclLine::new(
                LineAction::Reject,
                vec![dst_match(Prefix::from_octets(10, 0, 0, 0, 24))],
            ),
            AclLine::new(
                LineAction::Accept,
                vec![dst_match(Prefix::from_octets(10, 0, 0, 0, 8))],
            ),
        ],
    };
    let packet = SymbolicPacket::new("");
    let term = compile_acl(&acl, &packet).unwrap();

    // 10.0.0.1 matches both lines, the first declared one rejects
    assert_eq!(evaluate_bool(&term, &packet_model(0x0a000001)), Ok(false));
    // 10.1.2.3 matches only the accept line
    assert_eq!(evaluate_bool(&term, &packet_model(0x0a010203)), Ok(true));
    // 11.0.0.1 matches no line and falls through to the implicit reject
    assert_eq!(evaluate_bool(&term, &packet_model(0x0b000001)), Ok(false));
}

#[test]
fn port_ranges_and_protocol_numbers() {
    let acl = Acl {
        name: "web".to_string(),
        lines: vec![AclLine::new(
            LineAction::Accept,
            vec![
                AclMatch::DstPort(vec![SubRange::new(80, 80), SubRange::new(8000, 8100)]),
                AclMatch::IpProtocol(vec![6]),
            ],
        )],
    };
    let packet = SymbolicPacket::new("");
    let term = compile_acl(&acl, &packet).unwrap();

    let mut model = packet_model(0);
    model.set_int("dst-port", 80);
    assert_eq!(evaluate_bool(&term, &model), Ok(true));
    let mut model = packet_model(0);
    model.set_int("dst-port", 8050);
    assert_eq!(evaluate_bool(&term, &model), Ok(true));
    let mut model = packet_model(0);
    model.set_int("dst-port", 443);
    assert_eq!(evaluate_bool(&term, &model), Ok(false));
    // wrong protocol number
    let mut model = packet_model(0);
    model.set_int("dst-port", 80);
    model.set_int("ip-protocol", 17);
    assert_eq!(evaluate_bool(&term, &model), Ok(false));
}

#[test]
fn tcp_flag_combinations() {
    let acl = Acl {
        name: "syn".to_string(),
        lines: vec![AclLine::new(
            LineAction::Accept,
            vec![AclMatch::TcpFlags(vec![TcpFlags::syn_only()])],
        )],
    };
    let packet = SymbolicPacket::new("");
    let term = compile_acl(&acl, &packet).unwrap();

    let mut model = packet_model(0);
    model.set_bool("tcp-syn", true);
    assert_eq!(evaluate_bool(&term, &model), Ok(true));

    let mut model = packet_model(0);
    model.set_bool("tcp-syn", true);
    model.set_bool("tcp-ack", true);
    assert_eq!(evaluate_bool(&term, &model), Ok(false));
}

#[test]
fn negated_lines_invert_the_match() {
    let mut line = AclLine::new(
        LineAction::Accept,
        vec![dst_match(Prefix::from_octets(10, 0, 0, 0, 8))],
    );
    line.negate = true;
    let acl = Acl { name: "inv".to_string(), lines: vec![line] };
    let packet = SymbolicPacket::new("");
    let term = compile_acl(&acl, &packet).unwrap();

    assert_eq!(evaluate_bool(&term, &packet_model(0x0a000001)), Ok(false));
    assert_eq!(evaluate_bool(&term, &packet_model(0x0b000001)), Ok(true));
}

#[test]
fn lines_without_supported_matches_are_skipped() {
    // an empty line cannot decide, so the packet falls through to the implicit reject
    let acl = Acl {
        name: "noop".to_string(),
        lines: vec![AclLine::new(LineAction::Accept, vec![])],
    };
    let packet = SymbolicPacket::new("");
    let term = compile_acl(&acl, &packet).unwrap();
    assert_eq!(evaluate_bool(&term, &packet_model(0)), Ok(false));
}

#[test]
fn unsupported_match_fields_are_fatal() {
    let packet = SymbolicPacket::new("");

    let acl = Acl {
        name: "dscp".to_string(),
        lines: vec![AclLine::new(LineAction::Accept, vec![AclMatch::Dscp(vec![46])])],
    };
    assert!(matches!(
        compile_acl(&acl, &packet),
        Err(EncodeError::UnsupportedMatchField(_))
    ));

    let acl = Acl {
        name: "state".to_string(),
        lines: vec![AclLine::new(
            LineAction::Accept,
            vec![AclMatch::State(vec!["established".to_string()])],
        )],
    };
    assert!(matches!(
        compile_acl(&acl, &packet),
        Err(EncodeError::UnsupportedMatchField(_))
    ));

    let acl = Acl {
        name: "notdst".to_string(),
        lines: vec![AclLine::new(
            LineAction::Accept,
            vec![AclMatch::NotDstIp(vec![IpWildcard::from_prefix(Prefix::from_octets(
                10, 0, 0, 0, 8,
            ))])],
        )],
    };
    assert!(matches!(
        compile_acl(&acl, &packet),
        Err(EncodeError::UnsupportedMatchField(_))
    ));
}

#[test]
fn non_contiguous_wildcards_are_fatal() {
    let acl = Acl {
        name: "wild".to_string(),
        lines: vec![AclLine::new(
            LineAction::Accept,
            vec![AclMatch::DstIp(vec![IpWildcard::new(0x0a000000, 0x00ff00ff)])],
        )],
    };
    let packet = SymbolicPacket::new("");
    assert!(matches!(
        compile_acl(&acl, &packet),
        Err(EncodeError::UnsupportedMatchField(_))
    ));
}
