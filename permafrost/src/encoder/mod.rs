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

//! # Constraint Encoder
//!
//! The [`Encoder`] compiles the entire routing behavior of a network into one symbolic formula:
//! route origination, import/export along every link, policy evaluation, per-protocol and
//! router-wide best-route selection, redistribution, ACLs, and data-plane forwarding, all under a
//! bounded number of link failures. Satisfiability of the formula (together with a property
//! assertion) is decided by an external oracle implementing
//! [`SmtSolver`](crate::smt::SmtSolver).
//!
//! Construction is strictly phased: variables are allocated first, then each constraint phase may
//! only reference variables allocated before it. The encoder is single-threaded and builds the
//! whole formula before the one blocking call into the solver. To layer a second encoding on top
//! of an already-asserted one (e.g. for a different destination set), build it with
//! [`Encoder::derived`]: it carries a bumped encoding id, so its variable names cannot collide
//! with the base encoding inside a shared solver instance.

pub(crate) mod acl;
pub mod logical;
pub mod optimize;
pub(crate) mod selection;
pub mod symbolic;
pub(crate) mod transfer;

use crate::netmodel::graph::{Graph, GraphEdge};
use crate::netmodel::types::{Prefix, Protocol, RouterId, TopologyError};
use crate::smt::eval::evaluate_bool;
use crate::smt::{Model, SatResult, SmtSolver, Sort, Term};

use logical::{EdgeDir, LogicalGraph};
use optimize::Optimizations;
use symbolic::{
    CandidateEdge, RecordId, SymbolicDecisions, SymbolicFailures, SymbolicPacket, SymbolicRecord,
};
use transfer::{prefix_bits_match, TransferCompiler};

use log::*;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors raised while building an encoding. All of them abort the analysis run; in particular,
/// a policy or ACL construct outside the supported set is never silently approximated.
#[derive(Error, Debug, PartialEq)]
pub enum EncodeError {
    /// The topology is inconsistent
    #[error("Topology Error: {0}")]
    Topology(#[from] TopologyError),
    /// A policy expression outside the supported set
    #[error("Unsupported policy expression: {0}")]
    UnsupportedExpression(String),
    /// A policy statement outside the supported set
    #[error("Unsupported policy statement: {0}")]
    UnsupportedStatement(String),
    /// An ACL match field outside the supported set
    #[error("Unsupported ACL match field: {0}")]
    UnsupportedMatchField(String),
    /// Policies call each other in a cycle
    #[error("Cyclic policy reference: {0:?}")]
    PolicyCycle(Vec<String>),
}

pub(crate) fn default_admin_distance(proto: Protocol) -> i64 {
    proto.default_admin_distance() as i64
}

pub(crate) fn default_med(proto: Protocol) -> i64 {
    match proto {
        Protocol::Bgp => 100,
        _ => 0,
    }
}

pub(crate) fn default_metric(_proto: Protocol) -> i64 {
    0
}

pub(crate) fn default_local_pref() -> i64 {
    0
}

pub(crate) fn default_length() -> i64 {
    0
}

pub(crate) fn default_id() -> i64 {
    0
}

/// Equality against an optional field: absent fields are unconstrained.
pub(crate) fn safe_eq(x: Option<&Term>, value: Term) -> Term {
    match x {
        None => Term::bool(true),
        Some(x) => x.clone().eq(value),
    }
}

/// Equality against an optional field, adding a cost to the right-hand side.
pub(crate) fn safe_eq_add(x: Option<&Term>, value: Term, cost: Option<i64>) -> Term {
    match x {
        None => Term::bool(true),
        Some(x) => match cost {
            None => x.clone().eq(value),
            Some(c) => x.clone().eq(value.add(Term::int(c))),
        },
    }
}

/// Outcome of one verification query.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationStatus {
    /// The property holds for every consistent routing state
    Verified,
    /// The property fails; the map assigns every symbolic variable its value in the failing
    /// scenario
    CounterExample(BTreeMap<String, String>),
    /// The solver could not decide within its effort budget
    Inconclusive(String),
}

/// Size and timing figures of one verification query, intended for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationStats {
    /// Number of routers in the topology
    pub num_nodes: usize,
    /// Number of directed internal adjacencies
    pub num_edges: usize,
    /// Number of solver variables
    pub num_variables: usize,
    /// Number of asserted constraints
    pub num_constraints: usize,
    /// Wall-clock time of the solver query
    pub solve_time: Duration,
}

/// Result of one verification query.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    /// The verdict
    pub status: VerificationStatus,
    /// Diagnostic figures
    pub stats: VerificationStats,
}

impl VerificationResult {
    /// `Some(true)` if the property holds, `Some(false)` if a counterexample exists, `None` if
    /// the solver was inconclusive.
    pub fn holds(&self) -> Option<bool> {
        match &self.status {
            VerificationStatus::Verified => Some(true),
            VerificationStatus::CounterExample(_) => Some(false),
            VerificationStatus::Inconclusive(_) => None,
        }
    }

    /// The counterexample assignment, if one was found.
    pub fn counterexample(&self) -> Option<&BTreeMap<String, String>> {
        match &self.status {
            VerificationStatus::CounterExample(m) => Some(m),
            _ => None,
        }
    }
}

/// # Symbolic Encoder
///
/// Owns the topology, the symbolic state, and the formula under construction. Usage:
///
/// 1. [`Encoder::new`] with the topology and the destination prefixes under analysis,
/// 2. [`Encoder::encode`] with the failure bound `k`,
/// 3. optionally [`Encoder::add_assertion`] with the negated property to check,
/// 4. [`Encoder::verify`] against a solver backend.
#[derive(Debug)]
pub struct Encoder {
    graph: Graph,
    destinations: Vec<Prefix>,
    encoding_id: u32,
    opts: Optimizations,
    ospf_costs: HashMap<(RouterId, usize), i64>,
    logical: LogicalGraph,
    records: Vec<SymbolicRecord>,
    decisions: SymbolicDecisions,
    failures: SymbolicFailures,
    packet: SymbolicPacket,
    inbound_acls: HashMap<GraphEdge, Term>,
    outbound_acls: HashMap<GraphEdge, Term>,
    variables: Vec<(String, Sort)>,
    constraints: Vec<Term>,
    failure_bound: usize,
}

impl Encoder {
    /// Create a fresh encoder for the given topology and destination set. This initializes the
    /// interface costs and runs the optimizer, but does not allocate any route variables yet.
    pub fn new(graph: Graph, destinations: Vec<Prefix>) -> Result<Self, EncodeError> {
        Self::with_encoding_id(graph, destinations, 0)
    }

    /// Create a follow-up encoder sharing a solver instance with `other`. The encoding id is
    /// bumped, so all variable names of the new encoding are distinct from the base one.
    pub fn derived(
        other: &Encoder,
        graph: Graph,
        destinations: Vec<Prefix>,
    ) -> Result<Self, EncodeError> {
        Self::with_encoding_id(graph, destinations, other.encoding_id + 1)
    }

    fn with_encoding_id(
        graph: Graph,
        destinations: Vec<Prefix>,
        encoding_id: u32,
    ) -> Result<Self, EncodeError> {
        let ospf_costs = Self::init_interface_costs(&graph)?;
        let opts = Optimizations::compute(&graph, &ospf_costs);
        let prefix = if encoding_id == 0 {
            String::new()
        } else {
            format!("{}_", encoding_id)
        };
        let packet = SymbolicPacket::new(&prefix);
        let mut variables = Vec::new();
        packet.register(&mut variables);
        Ok(Self {
            graph,
            destinations,
            encoding_id,
            opts,
            ospf_costs,
            logical: LogicalGraph::new(),
            records: Vec::new(),
            decisions: SymbolicDecisions::new(),
            failures: SymbolicFailures::new(),
            packet,
            inbound_acls: HashMap::new(),
            outbound_acls: HashMap::new(),
            variables,
            constraints: Vec::new(),
            failure_bound: 0,
        })
    }

    /// Derive the OSPF cost of every active OSPF interface: the explicit cost if set, otherwise
    /// `max(reference_bandwidth / bandwidth, 1)`. An interface with neither is a topology error.
    fn init_interface_costs(
        graph: &Graph,
    ) -> Result<HashMap<(RouterId, usize), i64>, EncodeError> {
        let mut costs = HashMap::new();
        for r in graph.routers() {
            let conf = graph.config(*r);
            if !conf.protocols.contains(&Protocol::Ospf) {
                continue;
            }
            for (i, iface) in conf.interfaces.iter().enumerate() {
                if !iface.active || !iface.ospf_enabled {
                    continue;
                }
                let cost = match iface.ospf_cost {
                    Some(c) => c as i64,
                    None => match iface.bandwidth {
                        Some(bw) => ((conf.ospf_reference_bandwidth / bw) as i64).max(1),
                        None => {
                            return Err(EncodeError::Topology(TopologyError::MissingBandwidth {
                                router: conf.name.clone(),
                                interface: iface.name.clone(),
                            }))
                        }
                    },
                };
                costs.insert((*r, i), cost);
            }
        }
        Ok(costs)
    }

    /// Build the entire formula for a scenario with at most `k` simultaneous link failures.
    /// Must be called exactly once per encoder.
    pub fn encode(&mut self, k: usize) -> Result<(), EncodeError> {
        self.failure_bound = k;
        self.alloc_forwarding_vars();
        self.alloc_best_vars();
        self.alloc_symbolic_records()?;
        self.alloc_redistribution_vars();
        self.alloc_choice_vars();
        self.alloc_environment_vars();
        self.alloc_failure_vars();

        self.add_bound_constraints();
        self.add_failure_constraints(k);
        self.add_redistribution_constraints()?;
        self.add_import_export_constraints()?;
        self.add_best_per_protocol_constraints()?;
        self.add_best_overall_constraints();
        self.add_choice_constraints()?;
        self.add_control_forwarding_constraints()?;
        self.add_acl_constraints()?;
        self.add_data_forwarding_constraints();
        self.add_default_value_constraints();
        self.add_destination_constraint();

        debug!(
            "encoding complete: {} variables, {} constraints",
            self.variables.len(),
            self.constraints.len()
        );
        Ok(())
    }

    fn prefixed(&self, base: String) -> String {
        if self.encoding_id == 0 {
            base
        } else {
            format!("{}_{}", self.encoding_id, base)
        }
    }

    fn alloc_bool(&mut self, name: String) -> Term {
        self.variables.push((name.clone(), Sort::Bool));
        Term::Var(name)
    }

    fn alloc_int(&mut self, name: String) -> Term {
        self.variables.push((name.clone(), Sort::Int));
        Term::Var(name)
    }

    fn new_record(&mut self, name: String, fields: symbolic::RecordFields) -> RecordId {
        let rec = SymbolicRecord::new(self.prefixed(name), fields);
        rec.register(&mut self.variables);
        self.records.push(rec);
        RecordId(self.records.len() - 1)
    }

    fn new_unused_record(&mut self, name: String) -> RecordId {
        let rec = SymbolicRecord::unused(self.prefixed(name));
        self.records.push(rec);
        RecordId(self.records.len() - 1)
    }

    fn record(&self, id: RecordId) -> &SymbolicRecord {
        &self.records[id.0]
    }

    /// The record holding the best route of a protocol on a router. On single-protocol routers
    /// this is the overall best record.
    fn best_vars(&self, router: RouterId, proto: Protocol) -> RecordId {
        if self.opts.has_single_protocol(router) {
            self.decisions.best_overall[&router]
        } else {
            self.decisions.best_per_proto[&(router, proto)]
        }
    }

    /// All candidate edges feeding the best-route selection of a (router, protocol) pair: the
    /// import logical edges plus the redistribution edges.
    fn import_candidates(&self, router: RouterId, proto: Protocol) -> Vec<CandidateEdge> {
        let mut out: Vec<CandidateEdge> = self
            .logical
            .edges_for(router, proto)
            .iter()
            .filter(|id| self.logical.edge(**id).dir == EdgeDir::Import)
            .map(|id| CandidateEdge::Graph(*id))
            .collect();
        out.extend(self.logical.redist_for(router, proto).iter().map(|id| {
            CandidateEdge::Redist(*id)
        }));
        out
    }

    /// Resolve the record carrying the variables of a candidate, following merged import records
    /// to the peer's export record.
    fn candidate_record(&self, cand: CandidateEdge) -> Result<RecordId, TopologyError> {
        match cand {
            CandidateEdge::Graph(id) => {
                self.logical.correct_record(id, &self.records, &self.graph)
            }
            CandidateEdge::Redist(id) => Ok(self.logical.redist_edge(id).record),
        }
    }

    /// The peer router-id behind a candidate, for the selection tie-break.
    fn candidate_peer_id(&self, cand: CandidateEdge) -> Option<i64> {
        match cand {
            CandidateEdge::Graph(id) => self.graph.find_router_id(&self.logical.edge(id).edge),
            CandidateEdge::Redist(_) => None,
        }
    }

    /// Sharing one export record (and merging import records away) loses the per-edge failure
    /// gate, so both are only sound in the baseline encoding without failures.
    fn shares_export(&self, router: RouterId, proto: Protocol) -> bool {
        self.failure_bound == 0 && self.opts.can_share_export(router, proto)
    }

    fn merges_import(&self, router: RouterId, proto: Protocol, edge: &GraphEdge) -> bool {
        self.failure_bound == 0 && self.opts.merges_import_export(router, proto, edge)
    }

    fn added_cost(&self, proto: Protocol, edge: &GraphEdge) -> i64 {
        match proto {
            Protocol::Ospf => self
                .ospf_costs
                .get(&(edge.router, edge.iface))
                .copied()
                .unwrap_or(1),
            _ => 1,
        }
    }

    // ------------------------------------------------------------------------------------------
    // Variable allocation
    // ------------------------------------------------------------------------------------------

    fn alloc_forwarding_vars(&mut self) {
        let mut plan: Vec<(RouterId, GraphEdge, String)> = Vec::new();
        for r in self.graph.routers() {
            for e in self.graph.edges(*r) {
                plan.push((*r, *e, self.graph.interface(e).name.clone()));
            }
        }
        for (r, e, iface) in plan {
            let router = self.graph.router_name(r).to_string();
            let c = self.alloc_bool(self.prefixed(format!(
                "control-forwarding_{}_{}",
                router, iface
            )));
            self.decisions.control_forwarding.insert((r, e), c);
            let d = self
                .alloc_bool(self.prefixed(format!("data-forwarding_{}_{}", router, iface)));
            self.decisions.data_forwarding.insert((r, e), d);
        }
    }

    fn alloc_best_vars(&mut self) {
        let routers: Vec<RouterId> = self.graph.routers().to_vec();
        for r in routers.iter() {
            let name = format!("{}_OVERALL_BEST", self.graph.router_name(*r));
            let fields = self.opts.overall_fields(&self.graph, *r);
            let id = self.new_record(name, fields);
            self.decisions.best_overall.insert(*r, id);
        }
        for r in routers.iter() {
            if self.opts.has_single_protocol(*r) {
                continue;
            }
            let protos: Vec<Protocol> = self.graph.protocols(*r).collect();
            for proto in protos {
                let name = format!("{}_{}_BEST", self.graph.router_name(*r), proto.name());
                let fields = self.opts.record_fields(proto);
                let id = self.new_record(name, fields);
                self.decisions.best_per_proto.insert((*r, proto), id);
            }
        }
    }

    /// Allocate the import and export records of every (router, protocol, edge) in use, reusing
    /// one shared export record where the optimizer allows it, and link the opposite ends.
    fn alloc_symbolic_records(&mut self) -> Result<(), EncodeError> {
        struct EdgePlan {
            router: RouterId,
            proto: Protocol,
            edge: GraphEdge,
            iface: String,
            share_export: bool,
            merge_import: bool,
        }
        let mut plan: Vec<EdgePlan> = Vec::new();
        for r in self.graph.routers() {
            for proto in self.graph.protocols(*r) {
                for e in self.graph.edges(*r) {
                    if !self.graph.is_interface_used(proto, e) {
                        continue;
                    }
                    plan.push(EdgePlan {
                        router: *r,
                        proto,
                        edge: *e,
                        iface: self.graph.interface(e).name.clone(),
                        share_export: self.shares_export(*r, proto),
                        merge_import: self.merges_import(*r, proto, e),
                    });
                }
            }
        }

        let mut shared_export: HashMap<(RouterId, Protocol), RecordId> = HashMap::new();
        for p in plan {
            let router_name = self.graph.router_name(p.router).to_string();
            let fields = self.opts.record_fields(p.proto);

            let export_rec = if p.share_export {
                match shared_export.get(&(p.router, p.proto)) {
                    Some(id) => *id,
                    None => {
                        let id = self.new_record(
                            format!("{}_{}_SINGLE-EXPORT", router_name, p.proto.name()),
                            fields,
                        );
                        shared_export.insert((p.router, p.proto), id);
                        id
                    }
                }
            } else {
                self.new_record(
                    format!("{}_{}_EXPORT_{}", router_name, p.proto.name(), p.iface),
                    fields,
                )
            };
            self.logical.add_edge(p.edge, p.proto, EdgeDir::Export, export_rec);

            let import_name = format!("{}_{}_IMPORT_{}", router_name, p.proto.name(), p.iface);
            let import_rec = if p.merge_import {
                self.new_unused_record(import_name)
            } else {
                self.new_record(import_name, fields)
            };
            self.logical.add_edge(p.edge, p.proto, EdgeDir::Import, import_rec);
        }

        self.logical.link_opposites(&self.graph)?;
        Ok(())
    }

    fn alloc_redistribution_vars(&mut self) {
        let mut plan: Vec<(RouterId, Protocol, Protocol, Option<String>, String)> = Vec::new();
        for r in self.graph.routers() {
            let conf = self.graph.config(*r);
            for rd in conf.redistributions.iter() {
                plan.push((*r, rd.to, rd.from, rd.policy.clone(), conf.name.clone()));
            }
        }
        for (r, to, from, policy, router_name) in plan {
            let conf = self.graph.config(r);
            if to == from
                || !conf.protocols.contains(&to)
                || !conf.protocols.contains(&from)
            {
                warn!(
                    "ignoring redistribution {} -> {} on {}: protocol not enabled",
                    from, to, router_name
                );
                continue;
            }
            let fields = self.opts.record_fields(to);
            let rec = self.new_record(
                format!("{}_{}_REDIST-FROM-{}", router_name, to.name(), from.name()),
                fields,
            );
            self.logical.add_redist_edge(r, to, from, rec, policy);
        }
    }

    fn alloc_choice_vars(&mut self) {
        let mut plan: Vec<(RouterId, Protocol, CandidateEdge, String)> = Vec::new();
        for r in self.graph.routers() {
            for proto in self.graph.protocols(*r) {
                for cand in self.import_candidates(*r, proto) {
                    let record = match cand {
                        CandidateEdge::Graph(id) => self.logical.edge(id).record,
                        CandidateEdge::Redist(id) => self.logical.redist_edge(id).record,
                    };
                    let name = self.record(record).name().to_string();
                    plan.push((*r, proto, cand, name));
                }
            }
        }
        for (r, proto, cand, name) in plan {
            let var = self.alloc_bool(format!("{}_choice", name));
            self.decisions.choice.insert((r, proto, cand), var);
        }
    }

    /// A BGP import edge at the network boundary with a configured neighbor reads from an
    /// environment record standing in for the unknown peer. Boundary imports without a neighbor
    /// are never permitted.
    fn alloc_environment_vars(&mut self) {
        let mut plan: Vec<(logical::LogicalEdgeId, String, String)> = Vec::new();
        for (id, e) in self.logical.all_edges() {
            if e.proto == Protocol::Bgp
                && e.dir == EdgeDir::Import
                && e.edge.peer.is_none()
                && self.graph.bgp_neighbor(&e.edge).is_some()
            {
                plan.push((
                    id,
                    self.graph.router_name(e.edge.router).to_string(),
                    self.graph.interface(&e.edge).name.clone(),
                ));
            }
        }
        for (id, router_name, iface) in plan {
            let fields = self.opts.record_fields(Protocol::Bgp);
            let rec = self.new_record(format!("{}_BGP_ENV_{}", router_name, iface), fields);
            self.logical.set_env_record(id, rec);
        }
    }

    fn alloc_failure_vars(&mut self) {
        let mut boundary: Vec<(GraphEdge, String, String)> = Vec::new();
        for r in self.graph.routers() {
            for e in self.graph.edges(*r) {
                if e.peer.is_none() {
                    boundary.push((
                        *e,
                        self.graph.router_name(e.router).to_string(),
                        self.graph.interface(e).name.clone(),
                    ));
                }
            }
        }
        for (e, router, iface) in boundary {
            let var = self.alloc_int(self.prefixed(format!("failed-edge_{}_{}", router, iface)));
            self.failures.add_edge_link(e, var);
        }

        let links: Vec<(RouterId, RouterId, String, String)> = self
            .graph
            .links()
            .iter()
            .map(|(a, b)| {
                (
                    *a,
                    *b,
                    self.graph.router_name(*a).to_string(),
                    self.graph.router_name(*b).to_string(),
                )
            })
            .collect();
        for (a, b, name_a, name_b) in links {
            // sort the names so both directions agree on the variable
            let pair = if name_a < name_b {
                format!("{}_{}", name_a, name_b)
            } else {
                format!("{}_{}", name_b, name_a)
            };
            let var = self.alloc_int(self.prefixed(format!("failed-internal_{}", pair)));
            self.failures.add_internal_link(a, b, var);
        }
    }

    // ------------------------------------------------------------------------------------------
    // Constraint phases
    // ------------------------------------------------------------------------------------------

    /// Restrict every header field to its natural bit-width and every numeric route field to its
    /// valid range.
    fn add_bound_constraints(&mut self) {
        let mut cs = Vec::new();
        let zero = || Term::int(0);
        let p = &self.packet;
        for field in &[&p.dst_ip, &p.src_ip] {
            cs.push((*field).clone().ge(zero()));
            cs.push((*field).clone().lt(Term::int(1 << 32)));
        }
        for field in &[&p.dst_port, &p.src_port] {
            cs.push((*field).clone().ge(zero()));
            cs.push((*field).clone().lt(Term::int(1 << 16)));
        }
        for field in &[&p.icmp_type, &p.ip_protocol] {
            cs.push((*field).clone().ge(zero()));
            cs.push((*field).clone().lt(Term::int(1 << 8)));
        }
        cs.push(p.icmp_code.clone().ge(zero()));
        cs.push(p.icmp_code.clone().lt(Term::int(1 << 4)));

        for rec in self.records.iter().filter(|r| r.is_used()) {
            for field in rec.numeric_fields() {
                cs.push(field.clone().ge(zero()));
            }
            if let Some(len) = rec.prefix_length() {
                cs.push(len.clone().le(Term::int(32)));
            }
        }
        self.constraints.extend(cs);
    }

    /// Every failure indicator is 0 or 1, and at most `k` of them are 1. For `k = 0` every
    /// indicator is pinned to 0, which is the same as not modeling failures at all.
    fn add_failure_constraints(&mut self, k: usize) {
        let mut cs = Vec::new();
        let vars: Vec<Term> = self.failures.all().cloned().collect();
        for var in vars.iter() {
            cs.push(var.clone().ge(Term::int(0)));
            cs.push(var.clone().le(Term::int(1)));
        }
        if k == 0 {
            for var in vars.iter() {
                cs.push(var.clone().eq(Term::int(0)));
            }
        } else {
            let sum = vars
                .iter()
                .fold(Term::int(0), |acc, v| acc.add(v.clone()));
            cs.push(sum.le(Term::int(k as i64)));
        }
        self.constraints.extend(cs);
    }

    /// For every declared redistribution, tie the redistribution record to the source protocol's
    /// best route through the declared policy. Without a policy, nothing is ever redistributed.
    fn add_redistribution_constraints(&mut self) -> Result<(), EncodeError> {
        let mut cs = Vec::new();
        for (_, redist) in self.logical.all_redist_edges() {
            let conf = self.graph.config(redist.router);
            let current = self.record(redist.record);
            match &redist.policy {
                None => cs.push(current.permitted().clone().not()),
                Some(name) => {
                    let pol = conf.policies.get(name).ok_or_else(|| {
                        TopologyError::UnknownPolicy {
                            router: conf.name.clone(),
                            name: name.clone(),
                        }
                    })?;
                    let other = self.record(self.best_vars(redist.router, redist.from));
                    let compiler =
                        TransferCompiler::new(conf, &self.packet, redist.from, None);
                    cs.push(compiler.compile(other, current, &pol.statements)?);
                }
            }
        }
        self.constraints.extend(cs);
        Ok(())
    }

    /// The per-edge import and export constraints (the transfer function of every logical edge).
    fn add_import_export_constraints(&mut self) -> Result<(), EncodeError> {
        let mut cs = Vec::new();
        for r in self.graph.routers() {
            for proto in self.graph.protocols(*r) {
                let originations = self.graph.originated_networks(*r, proto);
                let mut used_export = false;
                for id in self.logical.edges_for(*r, proto) {
                    let ledge = self.logical.edge(*id);
                    match ledge.dir {
                        EdgeDir::Import => {
                            self.import_constraint(*r, proto, *id, &originations, &mut cs)?
                        }
                        EdgeDir::Export => {
                            if self.shares_export(*r, proto) && used_export {
                                continue;
                            }
                            self.export_constraint(*r, proto, *id, &originations, &mut cs)?;
                            used_export = true;
                        }
                    }
                }
            }
        }
        self.constraints.extend(cs);
        Ok(())
    }

    fn import_constraint(
        &self,
        router: RouterId,
        proto: Protocol,
        id: logical::LogicalEdgeId,
        originations: &[Prefix],
        cs: &mut Vec<Term>,
    ) -> Result<(), EncodeError> {
        let ledge = self.logical.edge(id);
        let edge = ledge.edge;
        let vars = self.record(ledge.record);
        if !vars.is_used() {
            return Ok(());
        }
        let conf = self.graph.config(router);
        let iface = self.graph.interface(&edge);
        let active = Term::bool(iface.active);
        let not_failed = match self.failures.failed_variable(&edge) {
            Some(f) => f.clone().eq(Term::int(0)),
            None => Term::bool(true),
        };

        match proto {
            Protocol::Connected => {
                let p = iface.prefix.expect("connected interface without prefix");
                let relevant = Term::and(vec![
                    active,
                    prefix_bits_match(&self.packet.dst_ip, &p),
                    not_failed,
                ]);
                let values = Term::and(vec![
                    vars.permitted().clone(),
                    safe_eq(vars.prefix_length(), Term::int(p.len as i64)),
                    safe_eq(vars.admin_dist(), Term::int(1)),
                    safe_eq(vars.local_pref(), Term::int(0)),
                    safe_eq(vars.metric(), Term::int(0)),
                ]);
                cs.push(Term::ite(relevant, values, vars.permitted().clone().not()));
            }
            Protocol::Static => {
                let srs = self.graph.static_routes_on(router, &iface.name)?;
                let mut acc = vars.permitted().clone().not();
                for sr in srs {
                    let relevant = Term::and(vec![
                        active.clone(),
                        prefix_bits_match(&self.packet.dst_ip, &sr.network),
                        not_failed.clone(),
                    ]);
                    let values = Term::and(vec![
                        vars.permitted().clone(),
                        safe_eq(vars.prefix_length(), Term::int(sr.network.len as i64)),
                        safe_eq(vars.admin_dist(), Term::int(sr.admin_distance as i64)),
                        safe_eq(vars.local_pref(), Term::int(0)),
                        safe_eq(vars.metric(), Term::int(0)),
                    ]);
                    acc = Term::ite(relevant, values, acc);
                }
                cs.push(acc);
            }
            Protocol::Ospf | Protocol::Bgp => {
                let not_permitted = vars.permitted().clone().not();
                match self.logical.find_other_record(id) {
                    None => cs.push(not_permitted),
                    Some(other_id) => {
                        let other = self.record(other_id);
                        // a route is only usable when it is not originated here anyway
                        let is_root = self.relevant_origination(originations);
                        let usable = Term::and(vec![
                            is_root.not(),
                            active,
                            other.permitted().clone(),
                            not_failed,
                        ]);
                        let import_fn = match self.graph.find_import_policy(proto, &edge)? {
                            Some(pol) => {
                                let compiler =
                                    TransferCompiler::new(conf, &self.packet, proto, None);
                                compiler.compile(other, vars, &pol.statements)?
                            }
                            None => Term::and(vec![
                                vars.permitted().clone().eq(other.permitted().clone()),
                                safe_eq(
                                    vars.local_pref(),
                                    other
                                        .local_pref()
                                        .cloned()
                                        .unwrap_or_else(|| Term::int(default_local_pref())),
                                ),
                                safe_eq(
                                    vars.admin_dist(),
                                    other
                                        .admin_dist()
                                        .cloned()
                                        .unwrap_or_else(|| Term::int(default_admin_distance(
                                            proto,
                                        ))),
                                ),
                                safe_eq(
                                    vars.metric(),
                                    other
                                        .metric()
                                        .cloned()
                                        .unwrap_or_else(|| Term::int(default_metric(proto))),
                                ),
                                safe_eq(
                                    vars.med(),
                                    other
                                        .med()
                                        .cloned()
                                        .unwrap_or_else(|| Term::int(default_med(proto))),
                                ),
                                safe_eq(
                                    vars.prefix_length(),
                                    other
                                        .prefix_length()
                                        .cloned()
                                        .unwrap_or_else(|| Term::int(default_length())),
                                ),
                            ]),
                        };
                        cs.push(Term::ite(usable, import_fn, not_permitted));
                    }
                }
            }
        }
        Ok(())
    }

    fn export_constraint(
        &self,
        router: RouterId,
        proto: Protocol,
        id: logical::LogicalEdgeId,
        originations: &[Prefix],
        cs: &mut Vec<Term>,
    ) -> Result<(), EncodeError> {
        let ledge = self.logical.edge(id);
        let edge = ledge.edge;
        let vars = self.record(ledge.record);
        let conf = self.graph.config(router);
        let iface = self.graph.interface(&edge);
        let not_permitted = vars.permitted().clone().not();

        match proto {
            // connected and static routes are never re-exported
            Protocol::Connected | Protocol::Static => cs.push(not_permitted),
            Protocol::Ospf | Protocol::Bgp => {
                let active = Term::bool(iface.active);
                let not_failed = match self.failures.failed_variable(&edge) {
                    Some(f) => f.clone().eq(Term::int(0)),
                    None => Term::bool(true),
                };
                let cost = self.added_cost(proto, &edge);
                let best = self.record(self.best_vars(router, proto));

                let usable =
                    Term::and(vec![active.clone(), best.permitted().clone(), not_failed]);
                let propagate = match self.graph.find_export_policy(proto, &edge)? {
                    Some(pol) => {
                        let compiler =
                            TransferCompiler::new(conf, &self.packet, proto, Some(cost));
                        compiler.compile(best, vars, &pol.statements)?
                    }
                    None => Term::and(vec![
                        vars.permitted().clone().eq(Term::bool(true)),
                        safe_eq(
                            vars.prefix_length(),
                            best.prefix_length()
                                .cloned()
                                .unwrap_or_else(|| Term::int(default_length())),
                        ),
                        safe_eq(
                            vars.admin_dist(),
                            best.admin_dist()
                                .cloned()
                                .unwrap_or_else(|| Term::int(default_admin_distance(proto))),
                        ),
                        safe_eq(
                            vars.med(),
                            best.med().cloned().unwrap_or_else(|| Term::int(default_med(
                                proto,
                            ))),
                        ),
                        safe_eq(
                            vars.local_pref(),
                            best.local_pref()
                                .cloned()
                                .unwrap_or_else(|| Term::int(default_local_pref())),
                        ),
                        safe_eq_add(
                            vars.metric(),
                            best.metric()
                                .cloned()
                                .unwrap_or_else(|| Term::int(default_metric(proto))),
                            Some(cost),
                        ),
                    ]),
                };
                let mut acc = Term::ite(usable, propagate, not_permitted);

                // locally originated prefixes override the propagated route
                for p in originations {
                    let relevant = Term::and(vec![
                        active.clone(),
                        prefix_bits_match(&self.packet.dst_ip, p),
                    ]);
                    let values = Term::and(vec![
                        vars.permitted().clone(),
                        safe_eq(vars.local_pref(), Term::int(0)),
                        safe_eq(
                            vars.admin_dist(),
                            Term::int(default_admin_distance(proto)),
                        ),
                        safe_eq(vars.metric(), Term::int(cost)),
                        safe_eq(vars.med(), Term::int(default_med(proto))),
                        safe_eq(vars.prefix_length(), Term::int(p.len as i64)),
                    ]);
                    acc = Term::ite(relevant, values, acc);
                }
                cs.push(acc);
            }
        }
        Ok(())
    }

    /// True iff the symbolic destination lies in one of the originated prefixes.
    fn relevant_origination(&self, originations: &[Prefix]) -> Term {
        Term::or(
            originations
                .iter()
                .map(|p| prefix_bits_match(&self.packet.dst_ip, p))
                .collect(),
        )
    }

    /// The best route of a protocol is permitted iff some candidate is, it is `equal` to some
    /// permitted candidate, and it dominates every permitted candidate.
    fn add_best_per_protocol_constraints(&mut self) -> Result<(), EncodeError> {
        let mut cs = Vec::new();
        for r in self.graph.routers() {
            for proto in self.graph.protocols(*r) {
                let best = self.record(self.best_vars(*r, proto));
                let candidates = self.import_candidates(*r, proto);

                let mut some_permitted: Option<Term> = None;
                let mut acc: Option<Term> = None;
                for cand in candidates.iter() {
                    let vars = self.record(self.candidate_record(*cand)?);
                    let peer_id = self.candidate_peer_id(*cand);
                    let perm = vars.permitted().clone();
                    some_permitted = Some(match some_permitted {
                        None => perm.clone(),
                        Some(sp) => Term::or(vec![sp, perm.clone()]),
                    });
                    let eq = selection::equal(proto, best, vars, peer_id);
                    let v = Term::and(vec![perm.clone(), eq]);
                    acc = Some(match acc {
                        None => v,
                        Some(a) => Term::or(vec![a, v]),
                    });
                    cs.push(perm.implies(selection::greater_or_equal(
                        &self.opts, proto, best, vars, peer_id,
                    )));
                }

                match (some_permitted, acc) {
                    (Some(sp), Some(a)) => {
                        cs.push(sp.clone().eq(best.permitted().clone()));
                        cs.push(sp.implies(a));
                    }
                    _ => cs.push(best.permitted().clone().not()),
                }
            }
        }
        self.constraints.extend(cs);
        Ok(())
    }

    /// The router-wide best route: the same selection predicates, with the per-protocol best
    /// records as the candidates. Skipped for single-protocol routers, where both coincide.
    fn add_best_overall_constraints(&mut self) {
        let mut cs = Vec::new();
        for r in self.graph.routers() {
            if self.opts.has_single_protocol(*r) {
                continue;
            }
            let best = self.record(self.decisions.best_overall[r]);
            let mut some_permitted: Option<Term> = None;
            let mut acc: Option<Term> = None;
            for proto in self.graph.protocols(*r) {
                let vars = self.record(self.best_vars(*r, proto));
                let perm = vars.permitted().clone();
                some_permitted = Some(match some_permitted {
                    None => perm.clone(),
                    Some(sp) => Term::or(vec![sp, perm.clone()]),
                });
                let v = Term::and(vec![perm.clone(), selection::equal(proto, best, vars, None)]);
                acc = Some(match acc {
                    None => v,
                    Some(a) => Term::or(vec![a, v]),
                });
                cs.push(perm.implies(selection::greater_or_equal(
                    &self.opts, proto, best, vars, None,
                )));
            }
            match (some_permitted, acc) {
                (Some(sp), Some(a)) => {
                    cs.push(sp.clone().eq(best.permitted().clone()));
                    cs.push(sp.implies(a));
                }
                _ => cs.push(best.permitted().clone().not()),
            }
        }
        self.constraints.extend(cs);
    }

    /// A choice variable holds iff its candidate is permitted and ties the protocol best.
    fn add_choice_constraints(&mut self) -> Result<(), EncodeError> {
        let mut cs = Vec::new();
        for r in self.graph.routers() {
            for proto in self.graph.protocols(*r) {
                let best = self.record(self.best_vars(*r, proto));
                for cand in self.import_candidates(*r, proto) {
                    let vars = self.record(self.candidate_record(cand)?);
                    let peer_id = self.candidate_peer_id(cand);
                    let choice = self.decisions.choice[&(*r, proto, cand)].clone();
                    let is_best = selection::equal(proto, best, vars, peer_id);
                    cs.push(
                        choice.eq(Term::and(vec![vars.permitted().clone(), is_best])),
                    );
                }
            }
        }
        self.constraints.extend(cs);
        Ok(())
    }

    /// A router control-forwards out an edge iff some choice selecting that edge also ties the
    /// router-wide best. A redistribution choice forwards out the edges of its source protocol.
    /// Edges with no qualifying protocol never forward.
    fn add_control_forwarding_constraints(&mut self) -> Result<(), EncodeError> {
        let mut cs = Vec::new();
        for r in self.graph.routers() {
            let best = self.record(self.decisions.best_overall[r]);
            let mut some_edge = false;
            let mut cf_acc: HashMap<GraphEdge, Term> = HashMap::new();

            for proto in self.graph.protocols(*r) {
                for cand in self.import_candidates(*r, proto) {
                    some_edge = true;
                    let vars = self.record(self.candidate_record(cand)?);
                    let peer_id = self.candidate_peer_id(cand);
                    let choice = self.decisions.choice[&(*r, proto, cand)].clone();
                    let is_best = Term::and(vec![
                        choice,
                        selection::equal(proto, best, vars, peer_id),
                    ]);

                    match cand {
                        CandidateEdge::Graph(id) => {
                            let ge = self.logical.edge(id).edge;
                            let cf = self.decisions.control_forwarding[&(*r, ge)].clone();
                            cs.push(is_best.clone().implies(cf));
                            let entry = cf_acc.remove(&ge);
                            cf_acc.insert(
                                ge,
                                match entry {
                                    None => is_best,
                                    Some(e) => Term::or(vec![e, is_best]),
                                },
                            );
                        }
                        CandidateEdge::Redist(id) => {
                            let from = self.logical.redist_edge(id).from;
                            for lid in self.logical.edges_for(*r, from) {
                                let ledge = self.logical.edge(*lid);
                                if ledge.dir != EdgeDir::Import {
                                    continue;
                                }
                                let ge = ledge.edge;
                                let other_choice = self
                                    .decisions
                                    .choice[&(*r, from, CandidateEdge::Graph(*lid))]
                                    .clone();
                                let both =
                                    Term::and(vec![is_best.clone(), other_choice]);
                                let cf =
                                    self.decisions.control_forwarding[&(*r, ge)].clone();
                                cs.push(both.clone().implies(cf));
                                let entry = cf_acc.remove(&ge);
                                cf_acc.insert(
                                    ge,
                                    match entry {
                                        None => both,
                                        Some(e) => Term::or(vec![e, both]),
                                    },
                                );
                            }
                        }
                    }
                }
            }

            for ge in self.graph.edges(*r) {
                let cf = self.decisions.control_forwarding[&(*r, *ge)].clone();
                if !some_edge {
                    cs.push(cf.not());
                    continue;
                }
                match cf_acc.get(ge) {
                    Some(expr) => cs.push(expr.clone().not().implies(cf.not())),
                    None => cs.push(cf.not()),
                }
            }
        }
        self.constraints.extend(cs);
        Ok(())
    }

    /// Compile every attached ACL once into a named boolean.
    fn add_acl_constraints(&mut self) -> Result<(), EncodeError> {
        struct AclPlan {
            edge: GraphEdge,
            inbound: bool,
            var_name: String,
            acl_name: String,
            router: RouterId,
        }
        let mut plan: Vec<AclPlan> = Vec::new();
        for r in self.graph.routers() {
            for e in self.graph.edges(*r) {
                let iface = self.graph.interface(e);
                let router_name = self.graph.router_name(*r);
                if let Some(name) = &iface.inbound_acl {
                    plan.push(AclPlan {
                        edge: *e,
                        inbound: true,
                        var_name: format!(
                            "{}_{}_INBOUND_{}",
                            router_name, iface.name, name
                        ),
                        acl_name: name.clone(),
                        router: *r,
                    });
                }
                if let Some(name) = &iface.outbound_acl {
                    plan.push(AclPlan {
                        edge: *e,
                        inbound: false,
                        var_name: format!(
                            "{}_{}_OUTBOUND_{}",
                            router_name, iface.name, name
                        ),
                        acl_name: name.clone(),
                        router: *r,
                    });
                }
            }
        }
        for p in plan {
            let conf = self.graph.config(p.router);
            let acl = conf.acls.get(&p.acl_name).ok_or_else(|| {
                TopologyError::UnknownAcl {
                    router: conf.name.clone(),
                    name: p.acl_name.clone(),
                }
            })?;
            let compiled = acl::compile_acl(acl, &self.packet)?;
            let var = self.alloc_bool(self.prefixed(p.var_name));
            self.constraints.push(var.clone().eq(compiled));
            if p.inbound {
                self.inbound_acls.insert(p.edge, var);
            } else {
                self.outbound_acls.insert(p.edge, var);
            }
        }
        Ok(())
    }

    /// Data-plane forwarding requires control-plane forwarding, passing the outbound ACL of the
    /// local interface, and passing the inbound ACL of the peer interface.
    fn add_data_forwarding_constraints(&mut self) {
        let mut cs = Vec::new();
        for r in self.graph.routers() {
            for e in self.graph.edges(*r) {
                let out_acl = self
                    .outbound_acls
                    .get(e)
                    .cloned()
                    .unwrap_or_else(|| Term::bool(true));
                let in_acl = self
                    .graph
                    .other_end(e)
                    .and_then(|o| self.inbound_acls.get(&o).cloned())
                    .unwrap_or_else(|| Term::bool(true));
                let cf = self.decisions.control_forwarding[&(*r, *e)].clone();
                let df = self.decisions.data_forwarding[&(*r, *e)].clone();
                let not_blocked = Term::and(vec![cf, out_acl, in_acl]);
                cs.push(not_blocked.eq(df));
            }
        }
        self.constraints.extend(cs);
    }

    /// A record that is not permitted has every numeric field pinned to zero, so an unused
    /// record can never leak an arbitrary value into a model.
    fn add_default_value_constraints(&mut self) {
        let mut cs = Vec::new();
        for rec in self.records.iter().filter(|r| r.is_used()) {
            let not_permitted = rec.permitted().clone().not();
            for field in rec.numeric_fields() {
                cs.push(
                    not_permitted
                        .clone()
                        .implies(field.clone().eq(Term::int(0))),
                );
            }
        }
        self.constraints.extend(cs);
    }

    /// The symbolic destination lies within the prefix set under analysis.
    fn add_destination_constraint(&mut self) {
        let mut ranges = Vec::with_capacity(self.destinations.len());
        for p in self.destinations.iter() {
            let lower = p.network_address() as i64;
            let upper = p.end_address() as i64;
            if lower == upper {
                ranges.push(self.packet.dst_ip.clone().eq(Term::int(lower)));
            } else {
                ranges.push(Term::and(vec![
                    self.packet.dst_ip.clone().ge(Term::int(lower)),
                    self.packet.dst_ip.clone().le(Term::int(upper)),
                ]));
            }
        }
        self.constraints.push(Term::or(ranges));
    }

    // ------------------------------------------------------------------------------------------
    // Solving
    // ------------------------------------------------------------------------------------------

    /// Assert an additional constraint, typically the negation of the property under test.
    pub fn add_assertion(&mut self, term: Term) {
        self.constraints.push(term);
    }

    /// Push the formula into the solver, run the query, and decode the outcome. An
    /// unsatisfiable formula means the property holds for every consistent routing state; a
    /// model is decoded into a counterexample assignment; "unknown" is surfaced as inconclusive.
    pub fn verify<S: SmtSolver>(&self, solver: &mut S) -> Result<VerificationResult, S::Error> {
        for (name, sort) in self.variables.iter() {
            solver.declare_var(name, *sort)?;
        }
        for c in self.constraints.iter() {
            solver.assert(c)?;
        }

        let num_edges: usize =
            self.graph.routers().iter().map(|r| self.graph.neighbors(*r).len()).sum();
        info!(
            "solver query: {} variables, {} constraints",
            self.variables.len(),
            self.constraints.len()
        );

        let start = Instant::now();
        let sat = solver.check()?;
        let solve_time = start.elapsed();
        debug!("solver answered in {:?}", solve_time);

        let stats = VerificationStats {
            num_nodes: self.graph.routers().len(),
            num_edges,
            num_variables: self.variables.len(),
            num_constraints: self.constraints.len(),
            solve_time,
        };

        let status = match sat {
            SatResult::Unsat => VerificationStatus::Verified,
            SatResult::Unknown(reason) => VerificationStatus::Inconclusive(reason),
            SatResult::Sat => {
                let model = solver.model(&self.variables)?;
                if log_enabled!(Level::Debug) {
                    self.check_model(&model);
                }
                let mut assignment = BTreeMap::new();
                for (name, _) in self.variables.iter() {
                    if let Some(val) = model.get(name) {
                        assignment.insert(name.clone(), val.to_string());
                    }
                }
                VerificationStatus::CounterExample(assignment)
            }
        };

        Ok(VerificationResult { status, stats })
    }

    /// Evaluate every asserted constraint under the model and complain about violations. Only
    /// used for debugging solver integrations.
    fn check_model(&self, model: &Model) {
        for c in self.constraints.iter() {
            match evaluate_bool(c, model) {
                Ok(true) => {}
                Ok(false) => warn!("model violates constraint: {:?}", c),
                Err(e) => trace!("cannot evaluate constraint: {}", e),
            }
        }
    }

    // ------------------------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------------------------

    /// The topology under analysis.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The symbolic packet of this encoding.
    pub fn packet(&self) -> &SymbolicPacket {
        &self.packet
    }

    /// The encoding id distinguishing this encoding's variable names.
    pub fn encoding_id(&self) -> u32 {
        self.encoding_id
    }

    /// All declared variables with their sorts.
    pub fn variables(&self) -> &[(String, Sort)] {
        &self.variables
    }

    /// All asserted constraints.
    pub fn constraints(&self) -> &[Term] {
        &self.constraints
    }

    /// All symbolic records of the encoding.
    pub fn symbolic_records(&self) -> impl Iterator<Item = &SymbolicRecord> {
        self.records.iter()
    }

    /// All failure indicator variables.
    pub fn failure_indicators(&self) -> impl Iterator<Item = &Term> {
        self.failures.all()
    }

    /// The control-forwarding variable of a (router, edge) pair.
    pub fn control_forwarding(&self, router: RouterId, edge: &GraphEdge) -> Option<&Term> {
        self.decisions.control_forwarding.get(&(router, *edge))
    }

    /// The data-forwarding variable of a (router, edge) pair.
    pub fn data_forwarding(&self, router: RouterId, edge: &GraphEdge) -> Option<&Term> {
        self.decisions.data_forwarding.get(&(router, *edge))
    }
}
