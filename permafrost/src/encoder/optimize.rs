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

//! # Optimizer
//!
//! A pure static analysis over the topology, run once before any variable is allocated. It
//! decides which variables the encoding can elide: per-protocol best records on single-protocol
//! routers, one shared export record when a protocol's export edges are policy-indistinguishable,
//! merged import/export records on unfiltered internal links, and whole record fields that no
//! comparison can ever distinguish. The result is a set of read-only lookup tables consumed by
//! the encoder.

use crate::encoder::symbolic::RecordFields;
use crate::netmodel::graph::{Graph, GraphEdge};
use crate::netmodel::policy::{visit_statements, Statement};
use crate::netmodel::types::{Protocol, RouterId};

use itertools::Itertools;
use log::*;
use std::collections::{HashMap, HashSet};

/// Returns true if the protocol uses multipath semantics, in which case the router-id tie-break
/// is skipped and the router-id field is elided entirely.
pub(crate) fn multipath(_proto: Protocol) -> bool {
    true
}

/// Read-only lookup tables produced by the optimizer.
#[derive(Debug, Clone)]
pub struct Optimizations {
    keep_admin_dist: bool,
    keep_local_pref: bool,
    single_protocol: HashSet<RouterId>,
    single_export: HashMap<(RouterId, Protocol), bool>,
    merged_import: HashMap<(RouterId, Protocol), HashSet<GraphEdge>>,
}

impl Optimizations {
    /// Run the analysis. `ospf_costs` must hold the initialized per-interface OSPF costs, since
    /// export records may only be shared when all export edges add the same cost.
    pub fn compute(graph: &Graph, ospf_costs: &HashMap<(RouterId, usize), i64>) -> Self {
        let keep_admin_dist =
            graph.routers().iter().any(|r| graph.config(*r).protocols.len() > 1);

        // local-pref only matters if some policy writes it
        let mut keep_local_pref = false;
        for r in graph.routers() {
            let conf = graph.config(*r);
            for pol in conf.policies.values() {
                visit_statements(
                    conf,
                    &pol.statements,
                    &mut |s: &Statement| {
                        if let Statement::SetLocalPref(_) = s {
                            keep_local_pref = true;
                        }
                    },
                    &mut |_| {},
                );
            }
        }

        let single_protocol: HashSet<RouterId> = graph
            .routers()
            .iter()
            .filter(|r| graph.config(**r).protocols.len() == 1)
            .copied()
            .collect();

        let mut single_export: HashMap<(RouterId, Protocol), bool> = HashMap::new();
        let mut merged_import: HashMap<(RouterId, Protocol), HashSet<GraphEdge>> = HashMap::new();

        for r in graph.routers() {
            let conf = graph.config(*r);
            for proto in conf.protocols.iter().copied() {
                let used: Vec<GraphEdge> = graph
                    .edges(*r)
                    .iter()
                    .filter(|e| graph.is_interface_used(proto, e))
                    .copied()
                    .collect();

                // all export edges indistinguishable: same policy, same added cost, and same
                // administrative state everywhere
                let same_policy =
                    used.iter().map(|e| graph.export_policy_name(proto, e)).all_equal();
                let same_cost = match proto {
                    Protocol::Ospf => used
                        .iter()
                        .map(|e| ospf_costs.get(&(e.router, e.iface)).copied().unwrap_or(1))
                        .all_equal(),
                    _ => true,
                };
                let same_active = used.iter().map(|e| graph.interface(e).active).all_equal();
                single_export.insert((*r, proto), same_policy && same_cost && same_active);

                // an import record can reuse the peer's export record when the link is internal
                // and active, the peer runs the protocol on its side, and no import policy
                // filters the route
                let mut merged = HashSet::new();
                if proto.is_distributed() {
                    for e in used.iter().filter(|e| graph.interface(e).active) {
                        let peer_ok = match e.peer {
                            Some((p, _)) => {
                                graph.config(p).protocols.contains(&proto)
                                    && graph.is_interface_used(
                                        proto,
                                        &graph.other_end(e).unwrap(),
                                    )
                            }
                            None => false,
                        };
                        let has_policy = match graph.find_import_policy(proto, e) {
                            Ok(p) => p.is_some(),
                            Err(_) => true,
                        };
                        if peer_ok && !has_policy {
                            merged.insert(*e);
                        }
                    }
                }
                merged_import.insert((*r, proto), merged);
            }
        }

        debug!(
            "optimizations: keep_ad={}, keep_lp={}, single-protocol routers: {}",
            keep_admin_dist,
            keep_local_pref,
            single_protocol.len()
        );

        Self { keep_admin_dist, keep_local_pref, single_protocol, single_export, merged_import }
    }

    /// Lookup tables with the given keep flags and no per-router entries, for predicate tests.
    #[cfg(test)]
    pub(crate) fn with_flags(keep_admin_dist: bool, keep_local_pref: bool) -> Self {
        Self {
            keep_admin_dist,
            keep_local_pref,
            single_protocol: HashSet::new(),
            single_export: HashMap::new(),
            merged_import: HashMap::new(),
        }
    }

    /// Whether any comparison needs the administrative distance.
    pub fn keep_admin_dist(&self) -> bool {
        self.keep_admin_dist
    }

    /// Whether any comparison needs the local preference.
    pub fn keep_local_pref(&self) -> bool {
        self.keep_local_pref
    }

    /// Whether the router runs exactly one protocol, so the protocol best and overall best
    /// coincide.
    pub fn has_single_protocol(&self, router: RouterId) -> bool {
        self.single_protocol.contains(&router)
    }

    /// Whether all export edges of the protocol can share one record.
    pub fn can_share_export(&self, router: RouterId, proto: Protocol) -> bool {
        self.single_export.get(&(router, proto)).copied().unwrap_or(false)
    }

    /// Whether the import record of the given edge can be merged with the peer's export record.
    pub fn merges_import_export(&self, router: RouterId, proto: Protocol, edge: &GraphEdge) -> bool {
        self.merged_import
            .get(&(router, proto))
            .map(|s| s.contains(edge))
            .unwrap_or(false)
    }

    /// The fields a record of the given protocol carries.
    pub fn record_fields(&self, proto: Protocol) -> RecordFields {
        RecordFields {
            admin_dist: self.keep_admin_dist,
            local_pref: self.keep_local_pref && proto == Protocol::Bgp,
            metric: proto.is_distributed(),
            med: proto == Protocol::Bgp,
            router_id: proto == Protocol::Bgp && !multipath(proto),
        }
    }

    /// The fields the overall best record of a router carries: the union over all its protocols.
    pub fn overall_fields(&self, graph: &Graph, router: RouterId) -> RecordFields {
        graph
            .protocols(router)
            .map(|p| self.record_fields(p))
            .fold(RecordFields::default(), RecordFields::union)
    }
}
