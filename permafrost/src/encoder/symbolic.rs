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

//! # Symbolic Values
//!
//! The symbolic counterparts of a route ([`SymbolicRecord`]), a packet header
//! ([`SymbolicPacket`]), the link failures ([`SymbolicFailures`]), and the decision variables
//! ([`SymbolicDecisions`]). Every field is a named solver variable; fields the optimizer elides
//! are simply absent and compare against protocol defaults instead.

use crate::encoder::logical::{LogicalEdgeId, RedistEdgeId};
use crate::netmodel::graph::GraphEdge;
use crate::netmodel::types::{Protocol, RouterId};
use crate::smt::{Sort, Term};

use std::collections::HashMap;

/// Index of a [`SymbolicRecord`] in the encoder's record arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(pub(crate) usize);

/// Which fields a symbolic record carries. Fields not kept are represented by protocol default
/// constants wherever the record is compared or copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFields {
    /// keep the administrative distance
    pub admin_dist: bool,
    /// keep the local preference
    pub local_pref: bool,
    /// keep the metric
    pub metric: bool,
    /// keep the multi-exit discriminator
    pub med: bool,
    /// keep the neighbor router-id
    pub router_id: bool,
}

impl RecordFields {
    /// Field-wise union of two field sets.
    pub fn union(self, other: RecordFields) -> RecordFields {
        RecordFields {
            admin_dist: self.admin_dist || other.admin_dist,
            local_pref: self.local_pref || other.local_pref,
            metric: self.metric || other.metric,
            med: self.med || other.med,
            router_id: self.router_id || other.router_id,
        }
    }
}

/// One candidate route, as seen at one point in the network, with every attribute a solver
/// variable. When `permitted` is false, all numeric fields are forced to zero by the encoder, so
/// an unused record can never leak an arbitrary value into a model.
#[derive(Debug, Clone)]
pub struct SymbolicRecord {
    name: String,
    is_used: bool,
    permitted: Term,
    prefix_length: Option<Term>,
    admin_dist: Option<Term>,
    local_pref: Option<Term>,
    metric: Option<Term>,
    med: Option<Term>,
    router_id: Option<Term>,
}

impl SymbolicRecord {
    /// Create a record with the given base name and field set.
    pub fn new<S: Into<String>>(name: S, fields: RecordFields) -> Self {
        let name = name.into();
        let field = |keep: bool, suffix: &str| -> Option<Term> {
            if keep {
                Some(Term::var(format!("{}_{}", name, suffix)))
            } else {
                None
            }
        };
        Self {
            permitted: Term::var(format!("{}_permitted", name)),
            prefix_length: field(true, "prefix-length"),
            admin_dist: field(fields.admin_dist, "admin-dist"),
            local_pref: field(fields.local_pref, "local-pref"),
            metric: field(fields.metric, "metric"),
            med: field(fields.med, "med"),
            router_id: field(fields.router_id, "router-id"),
            is_used: true,
            name,
        }
    }

    /// Create a placeholder record carrying no variables at all. Used when the optimizer merges
    /// an import record with the peer's export record; the placeholder only keeps the slot in the
    /// logical graph.
    pub fn unused<S: Into<String>>(name: S) -> Self {
        let name = name.into();
        Self {
            permitted: Term::var(format!("{}_permitted", name)),
            prefix_length: None,
            admin_dist: None,
            local_pref: None,
            metric: None,
            med: None,
            router_id: None,
            is_used: false,
            name,
        }
    }

    /// The base name of the record.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this record carries its own variables.
    pub fn is_used(&self) -> bool {
        self.is_used
    }

    /// The `permitted` variable.
    pub fn permitted(&self) -> &Term {
        &self.permitted
    }

    /// The prefix-length variable, if kept.
    pub fn prefix_length(&self) -> Option<&Term> {
        self.prefix_length.as_ref()
    }

    /// The administrative-distance variable, if kept.
    pub fn admin_dist(&self) -> Option<&Term> {
        self.admin_dist.as_ref()
    }

    /// The local-preference variable, if kept.
    pub fn local_pref(&self) -> Option<&Term> {
        self.local_pref.as_ref()
    }

    /// The metric variable, if kept.
    pub fn metric(&self) -> Option<&Term> {
        self.metric.as_ref()
    }

    /// The multi-exit-discriminator variable, if kept.
    pub fn med(&self) -> Option<&Term> {
        self.med.as_ref()
    }

    /// The router-id variable, if kept.
    pub fn router_id(&self) -> Option<&Term> {
        self.router_id.as_ref()
    }

    /// All numeric field variables that are present.
    pub fn numeric_fields(&self) -> impl Iterator<Item = &Term> {
        self.prefix_length
            .iter()
            .chain(self.admin_dist.iter())
            .chain(self.local_pref.iter())
            .chain(self.metric.iter())
            .chain(self.med.iter())
            .chain(self.router_id.iter())
    }

    /// Register all variables of this record. Placeholders register nothing.
    pub fn register(&self, vars: &mut Vec<(String, Sort)>) {
        if !self.is_used {
            return;
        }
        vars.push((format!("{}_permitted", self.name), Sort::Bool));
        for t in self.numeric_fields() {
            if let Term::Var(n) = t {
                vars.push((n.clone(), Sort::Int));
            }
        }
    }
}

/// The one symbolic packet of an analysis run: every header field inspected by ACLs, as a solver
/// variable shared by all constraints.
#[derive(Debug, Clone)]
pub struct SymbolicPacket {
    /// destination address
    pub dst_ip: Term,
    /// source address
    pub src_ip: Term,
    /// destination port
    pub dst_port: Term,
    /// source port
    pub src_port: Term,
    /// ICMP code
    pub icmp_code: Term,
    /// ICMP type
    pub icmp_type: Term,
    /// IP protocol number
    pub ip_protocol: Term,
    /// TCP ACK flag
    pub tcp_ack: Term,
    /// TCP CWR flag
    pub tcp_cwr: Term,
    /// TCP ECE flag
    pub tcp_ece: Term,
    /// TCP FIN flag
    pub tcp_fin: Term,
    /// TCP PSH flag
    pub tcp_psh: Term,
    /// TCP RST flag
    pub tcp_rst: Term,
    /// TCP SYN flag
    pub tcp_syn: Term,
    /// TCP URG flag
    pub tcp_urg: Term,
    prefix: String,
}

impl SymbolicPacket {
    /// Create the packet variables, with all names carrying the given encoding prefix.
    pub fn new(prefix: &str) -> Self {
        let v = |s: &str| Term::var(format!("{}{}", prefix, s));
        Self {
            dst_ip: v("dst-ip"),
            src_ip: v("src-ip"),
            dst_port: v("dst-port"),
            src_port: v("src-port"),
            icmp_code: v("icmp-code"),
            icmp_type: v("icmp-type"),
            ip_protocol: v("ip-protocol"),
            tcp_ack: v("tcp-ack"),
            tcp_cwr: v("tcp-cwr"),
            tcp_ece: v("tcp-ece"),
            tcp_fin: v("tcp-fin"),
            tcp_psh: v("tcp-psh"),
            tcp_rst: v("tcp-rst"),
            tcp_syn: v("tcp-syn"),
            tcp_urg: v("tcp-urg"),
            prefix: prefix.to_string(),
        }
    }

    /// Register all packet variables.
    pub fn register(&self, vars: &mut Vec<(String, Sort)>) {
        for s in &["dst-ip", "src-ip", "dst-port", "src-port", "icmp-code", "icmp-type",
            "ip-protocol"]
        {
            vars.push((format!("{}{}", self.prefix, s), Sort::Int));
        }
        for s in
            &["tcp-ack", "tcp-cwr", "tcp-ece", "tcp-fin", "tcp-psh", "tcp-rst", "tcp-syn",
                "tcp-urg"]
        {
            vars.push((format!("{}{}", self.prefix, s), Sort::Bool));
        }
    }
}

/// One 0/1 indicator variable per physical link: boundary edges get one per edge, internal links
/// one per (unordered) router pair.
#[derive(Debug, Clone, Default)]
pub struct SymbolicFailures {
    edge_links: Vec<(GraphEdge, Term)>,
    internal_links: Vec<((RouterId, RouterId), Term)>,
    by_edge: HashMap<GraphEdge, Term>,
    by_pair: HashMap<(RouterId, RouterId), Term>,
}

impl SymbolicFailures {
    /// Create an empty set of failure indicators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the indicator for a boundary edge.
    pub fn add_edge_link(&mut self, edge: GraphEdge, var: Term) {
        self.edge_links.push((edge, var.clone()));
        self.by_edge.insert(edge, var);
    }

    /// Add the indicator for an internal link between two routers.
    pub fn add_internal_link(&mut self, a: RouterId, b: RouterId, var: Term) {
        let pair = if a < b { (a, b) } else { (b, a) };
        self.internal_links.push((pair, var.clone()));
        self.by_pair.insert(pair, var);
    }

    /// The failure indicator governing the given edge.
    pub fn failed_variable(&self, edge: &GraphEdge) -> Option<&Term> {
        match edge.peer {
            None => self.by_edge.get(edge),
            Some((peer, _)) => {
                let pair = if edge.router < peer { (edge.router, peer) } else { (peer, edge.router) };
                self.by_pair.get(&pair)
            }
        }
    }

    /// All failure indicators, in allocation order.
    pub fn all(&self) -> impl Iterator<Item = &Term> {
        self.edge_links.iter().map(|(_, t)| t).chain(self.internal_links.iter().map(|(_, t)| t))
    }
}

/// A candidate source of a route at a router: either a logical graph edge or a redistribution
/// edge, referenced by its arena index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateEdge {
    /// An import logical edge
    Graph(LogicalEdgeId),
    /// A redistribution edge
    Redist(RedistEdgeId),
}

/// The decision variables of the encoding: per-router best records, per-(router, protocol) best
/// records, choice variables, and the control/data forwarding booleans.
#[derive(Debug, Clone, Default)]
pub struct SymbolicDecisions {
    /// overall best record per router
    pub best_overall: HashMap<RouterId, RecordId>,
    /// per-protocol best record (absent for single-protocol routers)
    pub best_per_proto: HashMap<(RouterId, Protocol), RecordId>,
    /// choice variable per candidate
    pub choice: HashMap<(RouterId, Protocol, CandidateEdge), Term>,
    /// control-plane forwarding per (router, edge)
    pub control_forwarding: HashMap<(RouterId, GraphEdge), Term>,
    /// data-plane forwarding per (router, edge)
    pub data_forwarding: HashMap<(RouterId, GraphEdge), Term>,
}

impl SymbolicDecisions {
    /// Create an empty set of decision variables.
    pub fn new() -> Self {
        Self::default()
    }
}
