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

//! # ACL Compilation
//!
//! An ACL compiles into a nested if-then-else chain over the symbolic packet, built in reverse
//! declaration order so that the first matching line (in original order) decides, terminating in
//! an unconditional reject when no line matches. Lines carrying no supported match condition are
//! skipped; lines carrying an unsupported one abort the translation.

use crate::encoder::symbolic::SymbolicPacket;
use crate::encoder::transfer::prefix_bits_match;
use crate::encoder::EncodeError;
use crate::netmodel::config::{Acl, AclMatch, TcpFlags};
use crate::netmodel::types::{IpWildcard, SubRange};
use crate::smt::Term;

/// Compile an ACL into a boolean term over the symbolic packet.
pub(crate) fn compile_acl(acl: &Acl, packet: &SymbolicPacket) -> Result<Term, EncodeError> {
    let mut acc = Term::bool(false);
    for line in acl.lines.iter().rev() {
        let mut local: Option<Term> = None;
        let mut add = |t: Term| {
            local = Some(match local.take() {
                None => t,
                Some(prev) => Term::and(vec![prev, t]),
            });
        };
        for m in line.matches.iter() {
            match m {
                AclMatch::DstIp(wcs) => add(wildcard_match(acl, wcs, &packet.dst_ip)?),
                AclMatch::SrcIp(wcs) => add(wildcard_match(acl, wcs, &packet.src_ip)?),
                AclMatch::DstPort(rs) => add(range_match(rs, &packet.dst_port)),
                AclMatch::SrcPort(rs) => add(range_match(rs, &packet.src_port)),
                AclMatch::IcmpType(rs) => add(range_match(rs, &packet.icmp_type)),
                AclMatch::IcmpCode(rs) => add(range_match(rs, &packet.icmp_code)),
                AclMatch::TcpFlags(fs) => add(tcp_flags_match(fs, packet)),
                AclMatch::IpProtocol(ps) => add(Term::or(
                    ps.iter()
                        .map(|p| packet.ip_protocol.clone().eq(Term::int(*p as i64)))
                        .collect(),
                )),
                m => {
                    return Err(EncodeError::UnsupportedMatchField(format!(
                        "{:?} in ACL {}",
                        m, acl.name
                    )))
                }
            }
        }
        // lines without any supported match condition are skipped
        if let Some(mut cond) = local {
            if line.negate {
                cond = cond.not();
            }
            acc = Term::ite(cond, Term::bool(line.action.is_accept()), acc);
        }
    }
    Ok(acc)
}

fn wildcard_match(
    acl: &Acl,
    wildcards: &[IpWildcard],
    field: &Term,
) -> Result<Term, EncodeError> {
    let mut terms = Vec::with_capacity(wildcards.len());
    for wc in wildcards {
        match wc.to_prefix() {
            Some(p) => terms.push(prefix_bits_match(field, &p)),
            None => {
                return Err(EncodeError::UnsupportedMatchField(format!(
                    "non-contiguous wildcard mask in ACL {}",
                    acl.name
                )))
            }
        }
    }
    Ok(Term::or(terms))
}

fn range_match(ranges: &[SubRange], field: &Term) -> Term {
    Term::or(
        ranges
            .iter()
            .map(|r| {
                if r.is_singleton() {
                    field.clone().eq(Term::int(r.start as i64))
                } else {
                    Term::and(vec![
                        field.clone().ge(Term::int(r.start as i64)),
                        field.clone().le(Term::int(r.end as i64)),
                    ])
                }
            })
            .collect(),
    )
}

fn tcp_flags_match(combinations: &[TcpFlags], packet: &SymbolicPacket) -> Term {
    Term::or(combinations.iter().map(|f| one_tcp_flags(f, packet)).collect())
}

fn one_tcp_flags(flags: &TcpFlags, packet: &SymbolicPacket) -> Term {
    let mut terms = Vec::new();
    let mut check = |use_it: bool, val: bool, field: &Term| {
        if use_it {
            terms.push(field.clone().eq(Term::bool(val)));
        }
    };
    check(flags.use_ack, flags.ack, &packet.tcp_ack);
    check(flags.use_cwr, flags.cwr, &packet.tcp_cwr);
    check(flags.use_ece, flags.ece, &packet.tcp_ece);
    check(flags.use_fin, flags.fin, &packet.tcp_fin);
    check(flags.use_psh, flags.psh, &packet.tcp_psh);
    check(flags.use_rst, flags.rst, &packet.tcp_rst);
    check(flags.use_syn, flags.syn, &packet.tcp_syn);
    check(flags.use_urg, flags.urg, &packet.tcp_urg);
    Term::and(terms)
}
