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

//! # Logical Graph
//!
//! For every (router, protocol, physical edge) in use, the logical graph owns one import and one
//! export logical edge, each carrying a [`SymbolicRecord`]. Logical edges live in an arena
//! addressed by [`LogicalEdgeId`]; the opposite-end relation (the peer's matching logical edge on
//! the same physical link) is a parallel index array filled by a dedicated linking pass after all
//! edges are allocated. Redistribution edges connect two protocols on the same router and have no
//! physical counterpart.

use crate::encoder::symbolic::{RecordId, SymbolicRecord};
use crate::netmodel::graph::{Graph, GraphEdge};
use crate::netmodel::types::{Protocol, RouterId, TopologyError};

use std::collections::HashMap;

/// Index of a logical edge in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogicalEdgeId(pub(crate) usize);

/// Index of a redistribution edge in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RedistEdgeId(pub(crate) usize);

/// Direction of a logical edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeDir {
    /// The edge carries routes arriving at the router
    Import,
    /// The edge carries routes leaving the router
    Export,
}

/// A directed, protocol-specific view of one physical edge.
#[derive(Debug, Clone)]
pub struct LogicalGraphEdge {
    /// The underlying physical edge
    pub edge: GraphEdge,
    /// The protocol this view belongs to
    pub proto: Protocol,
    /// Import or export side
    pub dir: EdgeDir,
    /// The symbolic record carried by this edge
    pub record: RecordId,
}

/// A redistribution edge: protocol `proto` of the router reads the best route of protocol `from`.
#[derive(Debug, Clone)]
pub struct RedistEdge {
    /// The router on which the redistribution happens
    pub router: RouterId,
    /// The protocol receiving the route
    pub proto: Protocol,
    /// The protocol the route is taken from
    pub from: Protocol,
    /// The symbolic record carried by this edge
    pub record: RecordId,
    /// The redistribution policy name, if one was declared
    pub policy: Option<String>,
}

/// The logical graph arena.
#[derive(Debug, Clone, Default)]
pub struct LogicalGraph {
    edges: Vec<LogicalGraphEdge>,
    opposite: Vec<Option<LogicalEdgeId>>,
    by_router_proto: HashMap<(RouterId, Protocol), Vec<LogicalEdgeId>>,
    redist: Vec<RedistEdge>,
    redist_by_router_proto: HashMap<(RouterId, Protocol), Vec<RedistEdgeId>>,
    env: HashMap<LogicalEdgeId, RecordId>,
}

impl LogicalGraph {
    /// Create an empty logical graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a logical edge. The opposite-end relation is established later by
    /// [`link_opposites`](Self::link_opposites).
    pub fn add_edge(
        &mut self,
        edge: GraphEdge,
        proto: Protocol,
        dir: EdgeDir,
        record: RecordId,
    ) -> LogicalEdgeId {
        let id = LogicalEdgeId(self.edges.len());
        self.edges.push(LogicalGraphEdge { edge, proto, dir, record });
        self.opposite.push(None);
        self.by_router_proto.entry((edge.router, proto)).or_insert_with(Vec::new).push(id);
        id
    }

    /// Allocate a redistribution edge.
    pub fn add_redist_edge(
        &mut self,
        router: RouterId,
        proto: Protocol,
        from: Protocol,
        record: RecordId,
        policy: Option<String>,
    ) -> RedistEdgeId {
        let id = RedistEdgeId(self.redist.len());
        self.redist.push(RedistEdge { router, proto, from, record, policy });
        self.redist_by_router_proto.entry((router, proto)).or_insert_with(Vec::new).push(id);
        id
    }

    /// Attach an environment record to a boundary import edge.
    pub fn set_env_record(&mut self, edge: LogicalEdgeId, record: RecordId) {
        self.env.insert(edge, record);
    }

    /// The environment record of a boundary import edge, if one exists.
    pub fn env_record(&self, edge: LogicalEdgeId) -> Option<RecordId> {
        self.env.get(&edge).copied()
    }

    /// Access a logical edge by id.
    pub fn edge(&self, id: LogicalEdgeId) -> &LogicalGraphEdge {
        &self.edges[id.0]
    }

    /// Access a redistribution edge by id.
    pub fn redist_edge(&self, id: RedistEdgeId) -> &RedistEdge {
        &self.redist[id.0]
    }

    /// All logical edges of a (router, protocol) pair, in allocation order.
    pub fn edges_for(&self, router: RouterId, proto: Protocol) -> &[LogicalEdgeId] {
        self.by_router_proto.get(&(router, proto)).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// All redistribution edges of a (router, protocol) pair.
    pub fn redist_for(&self, router: RouterId, proto: Protocol) -> &[RedistEdgeId] {
        self.redist_by_router_proto.get(&(router, proto)).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// All logical edges of the arena.
    pub fn all_edges(&self) -> impl Iterator<Item = (LogicalEdgeId, &LogicalGraphEdge)> {
        self.edges.iter().enumerate().map(|(i, e)| (LogicalEdgeId(i), e))
    }

    /// All redistribution edges of the arena.
    pub fn all_redist_edges(&self) -> impl Iterator<Item = (RedistEdgeId, &RedistEdge)> {
        self.redist.iter().enumerate().map(|(i, e)| (RedistEdgeId(i), e))
    }

    /// The opposite end of a logical edge: the peer router's logical edge of the other direction
    /// on the same physical link.
    pub fn opposite(&self, id: LogicalEdgeId) -> Option<LogicalEdgeId> {
        self.opposite[id.0]
    }

    /// The linking pass. For every logical edge whose physical edge has a peer that runs the same
    /// protocol, find the matching logical edge of the opposite direction on the peer and store
    /// it in the opposite-end array. A peer that runs the protocol but has no matching logical
    /// edge is a topology inconsistency.
    pub fn link_opposites(&mut self, graph: &Graph) -> Result<(), TopologyError> {
        for i in 0..self.edges.len() {
            let (edge, proto, dir) = {
                let e = &self.edges[i];
                (e.edge, e.proto, e.dir)
            };
            let (peer_router, peer_iface) = match edge.peer {
                Some(p) => p,
                None => continue,
            };
            if !graph.config(peer_router).protocols.contains(&proto) {
                continue;
            }
            // the peer runs the protocol, but may not use it on this very interface
            let peer_edge = graph.other_end(&edge).unwrap();
            if !graph.is_interface_used(proto, &peer_edge) {
                continue;
            }
            let want_dir = match dir {
                EdgeDir::Import => EdgeDir::Export,
                EdgeDir::Export => EdgeDir::Import,
            };
            let other = self
                .by_router_proto
                .get(&(peer_router, proto))
                .and_then(|ids| {
                    ids.iter()
                        .find(|id| {
                            let o = &self.edges[id.0];
                            o.dir == want_dir && o.edge.iface == peer_iface
                        })
                        .copied()
                });
            match other {
                Some(o) => self.opposite[i] = Some(o),
                None => {
                    return Err(TopologyError::MissingOppositeEdge {
                        router: graph.router_name(edge.router).to_string(),
                        protocol: proto,
                        interface: graph.interface(&edge).name.clone(),
                    })
                }
            }
        }
        Ok(())
    }

    /// The record another import edge reads from: the opposite end's export record for internal
    /// links, the environment record for boundary edges with one, and nothing otherwise.
    pub fn find_other_record(&self, id: LogicalEdgeId) -> Option<RecordId> {
        match self.opposite(id) {
            Some(o) => Some(self.edges[o.0].record),
            None => self.env_record(id),
        }
    }

    /// Resolve the record actually carrying the variables of a logical edge. When the optimizer
    /// merged an import record away, the peer's export record is the real carrier.
    pub fn correct_record(
        &self,
        id: LogicalEdgeId,
        records: &[SymbolicRecord],
        graph: &Graph,
    ) -> Result<RecordId, TopologyError> {
        let e = &self.edges[id.0];
        if records[e.record.0].is_used() {
            return Ok(e.record);
        }
        match self.opposite(id) {
            Some(o) => Ok(self.edges[o.0].record),
            None => Err(TopologyError::MissingOppositeEdge {
                router: graph.router_name(e.edge.router).to_string(),
                protocol: e.proto,
                interface: graph.interface(&e.edge).name.clone(),
            }),
        }
    }
}
