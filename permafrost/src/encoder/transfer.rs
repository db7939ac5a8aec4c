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

//! # Transfer Function
//!
//! Translates a routing policy's statement tree into the constraint "the output record holds the
//! (possibly modified) input route iff the policy accepts it". Field modifications accumulate
//! into a [`Modifications`] record instead of being applied immediately, since their effect
//! depends on which terminal statement is eventually reached. `If` statements duplicate all
//! trailing statements into both branches, so each branch sees its own modifications. A policy
//! call is inlined with the in-call flag switching the meaning of bare returns; cyclic calls are
//! a fatal translation error. Everything outside the supported construct set is rejected, never
//! approximated.

use crate::encoder::symbolic::{SymbolicPacket, SymbolicRecord};
use crate::encoder::{
    default_admin_distance, default_id, default_length, default_local_pref, default_med,
    default_metric, safe_eq, safe_eq_add, EncodeError,
};
use crate::netmodel::config::RouterConfig;
use crate::netmodel::policy::{
    BooleanExpr, IntExpr, PrefixRange, RouteFilterList, Statement,
};
use crate::netmodel::types::{Prefix, Protocol, TopologyError};
use crate::smt::Term;

use log::*;

/// The accumulated field modifications along one evaluation path.
#[derive(Debug, Clone, Default)]
pub(crate) struct Modifications {
    set_metric: Option<IntExpr>,
    set_local_pref: Option<IntExpr>,
    default_accept: bool,
}

/// Constraint `field` has the first `p.len` bits of the prefix `p`.
pub(crate) fn prefix_bits_match(field: &Term, p: &Prefix) -> Term {
    if p.len == 0 {
        return Term::bool(true);
    }
    let net = p.network_address() as i64;
    let bound = 1i64 << (32 - p.len as u32);
    Term::and(vec![
        field.clone().ge(Term::int(net)),
        field.clone().lt(Term::int(net + bound)),
    ])
}

/// Compiles one policy against one pair of symbolic records.
pub(crate) struct TransferCompiler<'a> {
    conf: &'a RouterConfig,
    packet: &'a SymbolicPacket,
    from_proto: Protocol,
    added_cost: Option<i64>,
}

impl<'a> TransferCompiler<'a> {
    /// Create a compiler for routes learned via `from_proto`, optionally adding a protocol cost
    /// to the metric on acceptance.
    pub(crate) fn new(
        conf: &'a RouterConfig,
        packet: &'a SymbolicPacket,
        from_proto: Protocol,
        added_cost: Option<i64>,
    ) -> Self {
        Self { conf, packet, from_proto, added_cost }
    }

    /// Compile the policy: the resulting term holds iff `current` is the outcome of applying the
    /// policy to `other`.
    pub(crate) fn compile(
        &self,
        other: &SymbolicRecord,
        current: &SymbolicRecord,
        statements: &[Statement],
    ) -> Result<Term, EncodeError> {
        trace!("compiling transfer function on {} ({})", self.conf.name, self.from_proto);
        let mut mods = Modifications::default();
        let mut calls = Vec::new();
        self.eval_statements(other, current, statements, &mut mods, false, &mut calls)
    }

    fn eval_statements(
        &self,
        other: &SymbolicRecord,
        current: &SymbolicRecord,
        statements: &[Statement],
        mods: &mut Modifications,
        in_call: bool,
        calls: &mut Vec<String>,
    ) -> Result<Term, EncodeError> {
        let mut it = statements.iter().enumerate();
        while let Some((idx, s)) = it.next() {
            match s {
                Statement::ExitAccept => {
                    return Ok(self.apply_modifications(other, current, mods))
                }
                Statement::ExitReject => return Ok(current.permitted().clone().not()),
                Statement::ReturnTrue => {
                    return if in_call {
                        Ok(Term::bool(true))
                    } else {
                        Ok(self.apply_modifications(other, current, mods))
                    }
                }
                Statement::ReturnFalse => {
                    return if in_call {
                        Ok(Term::bool(false))
                    } else {
                        Ok(current.permitted().clone().not())
                    }
                }
                Statement::ReturnLocalDefaultAction => return Ok(Term::bool(false)),
                Statement::SetDefaultActionAccept => mods.default_accept = true,
                Statement::SetDefaultActionReject => mods.default_accept = false,
                Statement::SetMetric(e) => mods.set_metric = Some(e.clone()),
                Statement::SetLocalPref(e) => mods.set_local_pref = Some(e.clone()),
                // the metric type has no counterpart in the record; accepted but inert
                Statement::SetOspfMetricType(_) => {}
                Statement::If { guard, then_stmts, else_stmts } => {
                    // duplicate the trailing statements into both branches: the policies are not
                    // in single-assignment form, so each branch must see its own modifications
                    let rest = &statements[idx + 1..];
                    let mut then_branch = then_stmts.clone();
                    then_branch.extend_from_slice(rest);
                    let mut else_branch = else_stmts.clone();
                    else_branch.extend_from_slice(rest);

                    let guard_term =
                        self.eval_expr(other, current, guard, mods, in_call, calls)?;
                    let mut mods_true = mods.clone();
                    let mut mods_false = mods.clone();
                    let t = self.eval_statements(
                        other,
                        current,
                        &then_branch,
                        &mut mods_true,
                        in_call,
                        calls,
                    )?;
                    let f = self.eval_statements(
                        other,
                        current,
                        &else_branch,
                        &mut mods_false,
                        in_call,
                        calls,
                    )?;
                    return Ok(Term::ite(guard_term, t, f));
                }
                s => {
                    return Err(EncodeError::UnsupportedStatement(format!("{:?}", s)));
                }
            }
        }

        // fell through all statements: the default action decides
        if mods.default_accept {
            Ok(self.apply_modifications(other, current, mods))
        } else {
            Ok(current.permitted().clone().not())
        }
    }

    fn eval_expr(
        &self,
        other: &SymbolicRecord,
        current: &SymbolicRecord,
        expr: &BooleanExpr,
        mods: &mut Modifications,
        in_call: bool,
        calls: &mut Vec<String>,
    ) -> Result<Term, EncodeError> {
        match expr {
            BooleanExpr::Conjunction(es) => {
                // the empty conjunction never holds
                if es.is_empty() {
                    return Ok(Term::bool(false));
                }
                let mut terms = Vec::with_capacity(es.len());
                for e in es {
                    terms.push(self.eval_expr(other, current, e, mods, in_call, calls)?);
                }
                Ok(Term::and(terms))
            }
            BooleanExpr::Disjunction(es) => {
                // the empty disjunction always holds
                if es.is_empty() {
                    return Ok(Term::bool(true));
                }
                let mut terms = Vec::with_capacity(es.len());
                for e in es {
                    terms.push(self.eval_expr(other, current, e, mods, in_call, calls)?);
                }
                Ok(Term::or(terms))
            }
            BooleanExpr::Not(e) => {
                Ok(self.eval_expr(other, current, e, mods, in_call, calls)?.not())
            }
            BooleanExpr::MatchProtocol(p) => Ok(Term::bool(*p == self.from_proto)),
            BooleanExpr::MatchPrefixSet(pse) => self.match_prefix_set(other, pse),
            BooleanExpr::Call(name) => {
                if calls.iter().any(|c| c == name) {
                    let mut cycle = calls.clone();
                    cycle.push(name.clone());
                    return Err(EncodeError::PolicyCycle(cycle));
                }
                let pol = self.conf.policies.get(name).ok_or_else(|| {
                    EncodeError::Topology(TopologyError::UnknownPolicy {
                        router: self.conf.name.clone(),
                        name: name.clone(),
                    })
                })?;
                calls.push(name.clone());
                let res = self.eval_statements(
                    other,
                    current,
                    &pol.statements,
                    mods,
                    true,
                    calls,
                );
                calls.pop();
                res
            }
            BooleanExpr::WithEnvironment(e) => {
                self.eval_expr(other, current, e, mods, in_call, calls)
            }
            e => Err(EncodeError::UnsupportedExpression(format!("{:?}", e))),
        }
    }

    fn match_prefix_set(
        &self,
        other: &SymbolicRecord,
        pse: &crate::netmodel::policy::PrefixSetExpr,
    ) -> Result<Term, EncodeError> {
        use crate::netmodel::policy::PrefixSetExpr;
        match pse {
            PrefixSetExpr::Explicit(ranges) => {
                if ranges.is_empty() {
                    return Ok(Term::bool(true));
                }
                Ok(Term::or(
                    ranges.iter().map(|r| self.is_relevant_for(other, r)).collect(),
                ))
            }
            PrefixSetExpr::Named(name) => {
                let fl = self.conf.route_filters.get(name).ok_or_else(|| {
                    EncodeError::Topology(TopologyError::UnknownRouteFilter {
                        router: self.conf.name.clone(),
                        name: name.clone(),
                    })
                })?;
                Ok(self.match_filter_list(other, fl))
            }
        }
    }

    /// A filter list compiles to a nested if-then-else chain, built in reverse declaration order
    /// so that the first matching line (in original order) decides.
    fn match_filter_list(&self, other: &SymbolicRecord, list: &RouteFilterList) -> Term {
        let mut acc = Term::bool(false);
        for line in list.lines.iter().rev() {
            let range = PrefixRange { prefix: line.prefix, length: line.length };
            let matches = self.is_relevant_for(other, &range);
            acc = Term::ite(matches, Term::bool(line.action.is_accept()), acc);
        }
        acc
    }

    /// A route is relevant for a prefix range when the symbolic destination lies under the
    /// range's prefix and the route's declared length lies within the allowed range.
    pub(crate) fn is_relevant_for(&self, other: &SymbolicRecord, range: &PrefixRange) -> Term {
        let bits = prefix_bits_match(&self.packet.dst_ip, &range.prefix);
        let len_ok = match other.prefix_length() {
            None => Term::bool(true),
            Some(len) => {
                if range.length.is_singleton() {
                    len.clone().eq(Term::int(range.length.start as i64))
                } else {
                    Term::and(vec![
                        len.clone().ge(Term::int(range.length.start as i64)),
                        len.clone().le(Term::int(range.length.end as i64)),
                    ])
                }
            }
        };
        Term::and(vec![len_ok, bits])
    }

    /// Emit the field equalities of a terminal accept, applying the accumulated modifications.
    fn apply_modifications(
        &self,
        other: &SymbolicRecord,
        current: &SymbolicRecord,
        mods: &Modifications,
    ) -> Term {
        let from = self.from_proto;
        let other_met =
            other.metric().cloned().unwrap_or_else(|| Term::int(default_metric(from)));
        let met = match &mods.set_metric {
            None => safe_eq_add(current.metric(), other_met, self.added_cost),
            Some(ie) => {
                safe_eq_add(current.metric(), apply_int_expr(other_met, ie), self.added_cost)
            }
        };

        let other_lp =
            other.local_pref().cloned().unwrap_or_else(|| Term::int(default_local_pref()));
        let lp = match &mods.set_local_pref {
            None => safe_eq(current.local_pref(), other_lp),
            Some(ie) => safe_eq(current.local_pref(), apply_int_expr(other_lp, ie)),
        };

        let per = current.permitted().clone().eq(other.permitted().clone());
        let len = safe_eq(
            current.prefix_length(),
            other
                .prefix_length()
                .cloned()
                .unwrap_or_else(|| Term::int(default_length())),
        );
        let id = safe_eq(
            current.router_id(),
            other.router_id().cloned().unwrap_or_else(|| Term::int(default_id())),
        );
        let ad = safe_eq(
            current.admin_dist(),
            other
                .admin_dist()
                .cloned()
                .unwrap_or_else(|| Term::int(default_admin_distance(from))),
        );
        let med = safe_eq(
            current.med(),
            other.med().cloned().unwrap_or_else(|| Term::int(default_med(from))),
        );

        Term::and(vec![per, len, ad, med, lp, met, id])
    }
}

/// Apply an integer modification expression to the given base term.
fn apply_int_expr(base: Term, e: &IntExpr) -> Term {
    match e {
        IntExpr::Literal(v) => Term::int(*v),
        IntExpr::IncrementMetric(v) | IntExpr::IncrementLocalPref(v) => {
            base.add(Term::int(*v))
        }
        IntExpr::DecrementMetric(v) | IntExpr::DecrementLocalPref(v) => {
            base.sub(Term::int(*v))
        }
    }
}
