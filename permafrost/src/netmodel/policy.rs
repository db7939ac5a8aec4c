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

//! # Routing Policies
//!
//! Routing policies are statement trees applied to a route when it is imported, exported, or
//! redistributed. The statement and expression kinds form closed sums; the symbolic translation
//! supports an enumerable subset of them and rejects everything else. Variants that the
//! translation rejects are still part of the model, so that the parser layer can represent any
//! configuration it encounters.

use crate::netmodel::config::RouterConfig;
use crate::netmodel::types::{LineAction, Prefix, Protocol, SubRange};

use std::collections::HashSet;

/// A named routing policy: an ordered list of statements.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingPolicy {
    /// Name under which the policy is referenced
    pub name: String,
    /// The statements, in declaration order
    pub statements: Vec<Statement>,
}

impl RoutingPolicy {
    /// Create a new policy.
    pub fn new<S: Into<String>>(name: S, statements: Vec<Statement>) -> Self {
        Self { name: name.into(), statements }
    }
}

/// A single policy statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Conditional execution. Statements following the `If` in the surrounding list are executed
    /// regardless of the branch taken.
    If {
        /// The guard expression
        guard: BooleanExpr,
        /// Statements executed when the guard holds
        then_stmts: Vec<Statement>,
        /// Statements executed when the guard does not hold
        else_stmts: Vec<Statement>,
    },
    /// Accept the route and stop evaluating the whole policy chain
    ExitAccept,
    /// Reject the route and stop evaluating the whole policy chain
    ExitReject,
    /// Inside a called policy: return true to the caller. At top level: accept.
    ReturnTrue,
    /// Inside a called policy: return false to the caller. At top level: reject.
    ReturnFalse,
    /// Return the locally configured default action
    ReturnLocalDefaultAction,
    /// Change the fall-through action to accept
    SetDefaultActionAccept,
    /// Change the fall-through action to reject
    SetDefaultActionReject,
    /// Modify the route metric
    SetMetric(IntExpr),
    /// Modify the local preference
    SetLocalPref(IntExpr),
    /// Set the OSPF metric type of the route
    SetOspfMetricType(OspfMetricType),
    /// Set a community value (not supported by the translation)
    SetCommunity(u32),
    /// Delete a community value (not supported by the translation)
    DeleteCommunity(u32),
    /// Overwrite the next hop (not supported by the translation)
    SetNextHop(u32),
    /// Prepend the own AS to the AS path (not supported by the translation)
    PrependAsPath(u32),
}

/// OSPF external metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OspfMetricType {
    /// Type 1 external metric
    E1,
    /// Type 2 external metric
    E2,
}

/// A boolean policy expression.
#[derive(Debug, Clone, PartialEq)]
pub enum BooleanExpr {
    /// All sub-expressions must hold. The empty conjunction never holds.
    Conjunction(Vec<BooleanExpr>),
    /// At least one sub-expression must hold. The empty disjunction always holds.
    Disjunction(Vec<BooleanExpr>),
    /// Negation
    Not(Box<BooleanExpr>),
    /// True iff the route was learned via the given protocol
    MatchProtocol(Protocol),
    /// True iff the route's network matches the prefix set
    MatchPrefixSet(PrefixSetExpr),
    /// Evaluate another named policy of the same router
    Call(String),
    /// Evaluate the inner expression in the neighbor-session environment
    WithEnvironment(Box<BooleanExpr>),
    /// Match on a community list (not supported by the translation)
    MatchCommunity(String),
    /// Match on the AS path (not supported by the translation)
    MatchAsPath(String),
}

/// An integer-valued expression, used by the field-set statements.
#[derive(Debug, Clone, PartialEq)]
pub enum IntExpr {
    /// A literal value
    Literal(i64),
    /// Add to the current metric
    IncrementMetric(i64),
    /// Subtract from the current metric
    DecrementMetric(i64),
    /// Add to the current local preference
    IncrementLocalPref(i64),
    /// Subtract from the current local preference
    DecrementLocalPref(i64),
}

/// A set of prefixes, either given inline or by reference to a named route-filter list.
#[derive(Debug, Clone, PartialEq)]
pub enum PrefixSetExpr {
    /// An explicit list of prefix ranges
    Explicit(Vec<PrefixRange>),
    /// A reference to a named [`RouteFilterList`]
    Named(String),
}

/// A prefix together with a range of acceptable prefix lengths. A route matches when its network
/// bits equal the prefix's bits and its length lies within the range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefixRange {
    /// The prefix whose bits must match
    pub prefix: Prefix,
    /// The allowed prefix-length range
    pub length: SubRange,
}

impl PrefixRange {
    /// Range matching exactly the given prefix.
    pub fn exact(prefix: Prefix) -> Self {
        Self { prefix, length: SubRange::singleton(prefix.len as u32) }
    }

    /// Range matching the prefix and any more-specific route up to /32.
    pub fn or_longer(prefix: Prefix) -> Self {
        Self { prefix, length: SubRange::new(prefix.len as u32, 32) }
    }
}

/// A named list of route-filter lines, evaluated first-match-wins with an implicit final reject.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteFilterList {
    /// Name of the list
    pub name: String,
    /// The lines, in declaration order
    pub lines: Vec<RouteFilterLine>,
}

/// One line of a route-filter list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteFilterLine {
    /// Action when the line matches
    pub action: LineAction,
    /// The prefix whose bits must match
    pub prefix: Prefix,
    /// The allowed prefix-length range
    pub length: SubRange,
}

/// Walk all statements of a policy (following `If` branches and policy calls) and feed every
/// statement and every boolean expression to the given callbacks. Policy calls are followed at
/// most once, so cyclic references terminate.
pub fn visit_statements<FS, FE>(
    conf: &RouterConfig,
    statements: &[Statement],
    fs: &mut FS,
    fe: &mut FE,
) where
    FS: FnMut(&Statement),
    FE: FnMut(&BooleanExpr),
{
    let mut seen_calls: HashSet<String> = HashSet::new();
    visit_stmts_rec(conf, statements, fs, fe, &mut seen_calls);
}

fn visit_stmts_rec<FS, FE>(
    conf: &RouterConfig,
    statements: &[Statement],
    fs: &mut FS,
    fe: &mut FE,
    seen: &mut HashSet<String>,
) where
    FS: FnMut(&Statement),
    FE: FnMut(&BooleanExpr),
{
    for s in statements {
        fs(s);
        if let Statement::If { guard, then_stmts, else_stmts } = s {
            visit_expr_rec(conf, guard, fs, fe, seen);
            visit_stmts_rec(conf, then_stmts, fs, fe, seen);
            visit_stmts_rec(conf, else_stmts, fs, fe, seen);
        }
    }
}

fn visit_expr_rec<FS, FE>(
    conf: &RouterConfig,
    expr: &BooleanExpr,
    fs: &mut FS,
    fe: &mut FE,
    seen: &mut HashSet<String>,
) where
    FS: FnMut(&Statement),
    FE: FnMut(&BooleanExpr),
{
    fe(expr);
    match expr {
        BooleanExpr::Conjunction(es) | BooleanExpr::Disjunction(es) => {
            for e in es {
                visit_expr_rec(conf, e, fs, fe, seen);
            }
        }
        BooleanExpr::Not(e) | BooleanExpr::WithEnvironment(e) => {
            visit_expr_rec(conf, e, fs, fe, seen)
        }
        BooleanExpr::Call(name) => {
            if seen.insert(name.clone()) {
                if let Some(pol) = conf.policies.get(name) {
                    visit_stmts_rec(conf, &pol.statements, fs, fe, seen);
                }
            }
        }
        _ => {}
    }
}
