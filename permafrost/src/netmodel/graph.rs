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

//! # Topology Model
//!
//! The [`Graph`] normalizes a set of router configurations into the view the encoder works on:
//! one node per router, a canonical list of directional edges per router (one per interface,
//! paired with the peer interface where two interfaces share a subnet), the per-router protocol
//! sets, the static routes indexed per interface, and the BGP neighbors resolved onto their
//! edges. Construction fails fast on any inconsistency; once a [`Graph`] exists, the encoder can
//! rely on all its lookups.

use crate::netmodel::config::{BgpNeighbor, Interface, RouterConfig, StaticRoute};
use crate::netmodel::policy::RoutingPolicy;
use crate::netmodel::types::{PhysNetwork, Prefix, Protocol, RouterId, TopologyError};

use log::*;
use std::collections::{BTreeSet, HashMap, HashSet};

/// A directional view of a physical edge: the interface `iface` of router `router`, possibly
/// paired with the peer interface on the other side of the link. Edges without a peer lead to the
/// outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphEdge {
    /// The router owning the interface
    pub router: RouterId,
    /// Index of the interface in the router's interface list
    pub iface: usize,
    /// The peer router and interface index, if the edge is an internal link
    pub peer: Option<(RouterId, usize)>,
}

/// # Topology Graph
///
/// Owns the router configurations for the duration of one analysis run and provides all derived
/// lookups. The structure is immutable after construction.
#[derive(Debug)]
pub struct Graph {
    net: PhysNetwork,
    routers: Vec<RouterId>,
    names: HashMap<String, RouterId>,
    configs: HashMap<RouterId, RouterConfig>,
    edge_map: HashMap<RouterId, Vec<GraphEdge>>,
    links: Vec<(RouterId, RouterId)>,
    static_routes: HashMap<RouterId, HashMap<String, Vec<StaticRoute>>>,
    bgp_neighbors: HashMap<GraphEdge, BgpNeighbor>,
    neighbors: HashMap<RouterId, BTreeSet<RouterId>>,
}

impl Graph {
    /// Build the topology from the given configurations. Fails on duplicate router names, static
    /// routes over unknown interfaces, and BGP neighbors on unknown interfaces.
    pub fn new(configs: Vec<RouterConfig>) -> Result<Self, TopologyError> {
        let mut net = PhysNetwork::default();
        let mut routers: Vec<RouterId> = Vec::with_capacity(configs.len());
        let mut names: HashMap<String, RouterId> = HashMap::new();
        let mut config_map: HashMap<RouterId, RouterConfig> = HashMap::new();

        for conf in configs {
            let id = net.add_node(());
            if names.insert(conf.name.clone(), id).is_some() {
                return Err(TopologyError::DuplicateRouterName(conf.name));
            }
            routers.push(id);
            config_map.insert(id, conf);
        }

        // validate interface references before anything else
        for id in routers.iter() {
            let conf = &config_map[id];
            for sr in conf.static_routes.iter() {
                if conf.interface(&sr.interface).is_none() {
                    return Err(TopologyError::UnknownNextHopInterface {
                        router: conf.name.clone(),
                        interface: sr.interface.clone(),
                    });
                }
            }
            for n in conf.bgp_neighbors.iter() {
                if conf.interface(&n.interface).is_none() {
                    return Err(TopologyError::UnknownNeighborInterface {
                        router: conf.name.clone(),
                        interface: n.interface.clone(),
                    });
                }
            }
        }

        // pair interfaces which share a subnet. every interface pairs at most once.
        let mut peers: HashMap<(RouterId, usize), (RouterId, usize)> = HashMap::new();
        let mut paired: HashSet<(RouterId, usize)> = HashSet::new();
        let mut links: Vec<(RouterId, RouterId)> = Vec::new();
        for (ai, a) in routers.iter().enumerate() {
            for b in routers.iter().skip(ai + 1) {
                let conf_a = &config_map[a];
                let conf_b = &config_map[b];
                for (ia, int_a) in conf_a.interfaces.iter().enumerate() {
                    for (ib, int_b) in conf_b.interfaces.iter().enumerate() {
                        if paired.contains(&(*a, ia)) || paired.contains(&(*b, ib)) {
                            continue;
                        }
                        if let (Some(pa), Some(pb)) = (int_a.prefix, int_b.prefix) {
                            if pa.same_network(&pb) {
                                paired.insert((*a, ia));
                                paired.insert((*b, ib));
                                peers.insert((*a, ia), (*b, ib));
                                peers.insert((*b, ib), (*a, ia));
                                links.push((*a, *b));
                                net.add_edge(*a, *b, ());
                                net.add_edge(*b, *a, ());
                                trace!(
                                    "link {}:{} <-> {}:{}",
                                    conf_a.name,
                                    int_a.name,
                                    conf_b.name,
                                    int_b.name
                                );
                            }
                        }
                    }
                }
            }
        }

        // the canonical directional edge list, one edge per interface
        let mut edge_map: HashMap<RouterId, Vec<GraphEdge>> = HashMap::new();
        for id in routers.iter() {
            let conf = &config_map[id];
            let edges = conf
                .interfaces
                .iter()
                .enumerate()
                .map(|(i, _)| GraphEdge {
                    router: *id,
                    iface: i,
                    peer: peers.get(&(*id, i)).copied(),
                })
                .collect();
            edge_map.insert(*id, edges);
        }

        // static routes indexed per interface; every interface gets a (possibly empty) table
        let mut static_routes: HashMap<RouterId, HashMap<String, Vec<StaticRoute>>> =
            HashMap::new();
        for id in routers.iter() {
            let conf = &config_map[id];
            let mut table: HashMap<String, Vec<StaticRoute>> = conf
                .interfaces
                .iter()
                .map(|i| (i.name.clone(), Vec::new()))
                .collect();
            for sr in conf.static_routes.iter() {
                table.get_mut(&sr.interface).unwrap().push(sr.clone());
            }
            static_routes.insert(*id, table);
        }

        // resolve BGP neighbors onto their edges
        let mut bgp_neighbors: HashMap<GraphEdge, BgpNeighbor> = HashMap::new();
        for id in routers.iter() {
            let conf = &config_map[id];
            for n in conf.bgp_neighbors.iter() {
                let (idx, _) = conf.interface(&n.interface).unwrap();
                let edge = edge_map[id][idx];
                bgp_neighbors.insert(edge, n.clone());
            }
        }

        let mut neighbors: HashMap<RouterId, BTreeSet<RouterId>> = HashMap::new();
        for id in routers.iter() {
            neighbors.insert(*id, BTreeSet::new());
        }
        for (a, b) in links.iter() {
            neighbors.get_mut(a).unwrap().insert(*b);
            neighbors.get_mut(b).unwrap().insert(*a);
        }

        debug!("topology: {} routers, {} internal links", routers.len(), links.len());

        Ok(Self {
            net,
            routers,
            names,
            configs: config_map,
            edge_map,
            links,
            static_routes,
            bgp_neighbors,
            neighbors,
        })
    }

    /// All routers, in insertion order.
    pub fn routers(&self) -> &[RouterId] {
        &self.routers
    }

    /// Look up a router by name.
    pub fn router(&self, name: &str) -> Option<RouterId> {
        self.names.get(name).copied()
    }

    /// The configuration of a router.
    pub fn config(&self, router: RouterId) -> &RouterConfig {
        &self.configs[&router]
    }

    /// The name of a router.
    pub fn router_name(&self, router: RouterId) -> &str {
        &self.configs[&router].name
    }

    /// All directional edges of a router, in interface order.
    pub fn edges(&self, router: RouterId) -> &[GraphEdge] {
        &self.edge_map[&router]
    }

    /// All internal links of the network, each appearing once.
    pub fn links(&self) -> &[(RouterId, RouterId)] {
        &self.links
    }

    /// The interface at the near end of the given edge.
    pub fn interface(&self, edge: &GraphEdge) -> &Interface {
        &self.configs[&edge.router].interfaces[edge.iface]
    }

    /// The edge at the other end of an internal link.
    pub fn other_end(&self, edge: &GraphEdge) -> Option<GraphEdge> {
        edge.peer.map(|(router, iface)| GraphEdge {
            router,
            iface,
            peer: Some((edge.router, edge.iface)),
        })
    }

    /// All neighboring routers, per router.
    pub fn neighbors(&self, router: RouterId) -> &BTreeSet<RouterId> {
        &self.neighbors[&router]
    }

    /// The protocols a router runs.
    pub fn protocols(&self, router: RouterId) -> impl Iterator<Item = Protocol> + '_ {
        self.configs[&router].protocols.iter().copied()
    }

    /// The static routes configured over the given interface. The table exists for every
    /// interface of the router; a missing entry is a topology inconsistency.
    pub fn static_routes_on(
        &self,
        router: RouterId,
        iface: &str,
    ) -> Result<&[StaticRoute], TopologyError> {
        self.static_routes[&router]
            .get(iface)
            .map(|v| v.as_slice())
            .ok_or_else(|| TopologyError::MissingStaticRoutes {
                router: self.router_name(router).to_string(),
                interface: iface.to_string(),
            })
    }

    /// The BGP neighbor configured over the given edge, if any.
    pub fn bgp_neighbor(&self, edge: &GraphEdge) -> Option<&BgpNeighbor> {
        self.bgp_neighbors.get(edge)
    }

    /// Checks whether a protocol makes use of the interface behind the given edge.
    pub fn is_interface_used(&self, proto: Protocol, edge: &GraphEdge) -> bool {
        let conf = &self.configs[&edge.router];
        let iface = &conf.interfaces[edge.iface];
        match proto {
            Protocol::Connected => iface.prefix.is_some(),
            Protocol::Static => self.static_routes[&edge.router]
                .get(&iface.name)
                .map(|srs| !srs.is_empty())
                .unwrap_or(false),
            Protocol::Ospf => iface.ospf_enabled && iface.prefix.is_some(),
            Protocol::Bgp => {
                self.bgp_neighbors.contains_key(edge)
                    || edge
                        .peer
                        .map(|(p, _)| self.configs[&p].protocols.contains(&Protocol::Bgp))
                        .unwrap_or(false)
            }
        }
    }

    /// Resolve the import policy applied on the given edge for the given protocol. The BGP
    /// neighbor attachment takes precedence over the per-(protocol, interface) attachment.
    pub fn find_import_policy(
        &self,
        proto: Protocol,
        edge: &GraphEdge,
    ) -> Result<Option<&RoutingPolicy>, TopologyError> {
        let conf = &self.configs[&edge.router];
        let iface = &conf.interfaces[edge.iface];
        let name = if proto == Protocol::Bgp {
            self.bgp_neighbors
                .get(edge)
                .and_then(|n| n.import_policy.as_ref())
                .or_else(|| conf.import_policies.get(&(proto, iface.name.clone())))
        } else {
            conf.import_policies.get(&(proto, iface.name.clone()))
        };
        self.resolve_policy(conf, name)
    }

    /// Resolve the export policy applied on the given edge for the given protocol.
    pub fn find_export_policy(
        &self,
        proto: Protocol,
        edge: &GraphEdge,
    ) -> Result<Option<&RoutingPolicy>, TopologyError> {
        let conf = &self.configs[&edge.router];
        let iface = &conf.interfaces[edge.iface];
        let name = if proto == Protocol::Bgp {
            self.bgp_neighbors
                .get(edge)
                .and_then(|n| n.export_policy.as_ref())
                .or_else(|| conf.export_policies.get(&(proto, iface.name.clone())))
        } else {
            conf.export_policies.get(&(proto, iface.name.clone()))
        };
        self.resolve_policy(conf, name)
    }

    fn resolve_policy<'a>(
        &self,
        conf: &'a RouterConfig,
        name: Option<&String>,
    ) -> Result<Option<&'a RoutingPolicy>, TopologyError> {
        match name {
            None => Ok(None),
            Some(n) => match conf.policies.get(n) {
                Some(p) => Ok(Some(p)),
                None => Err(TopologyError::UnknownPolicy {
                    router: conf.name.clone(),
                    name: n.clone(),
                }),
            },
        }
    }

    /// The name of the export policy attached to the given edge, if any. Used by the optimizer to
    /// decide whether all export edges of a protocol are policy-indistinguishable.
    pub fn export_policy_name(&self, proto: Protocol, edge: &GraphEdge) -> Option<&String> {
        let conf = &self.configs[&edge.router];
        let iface = &conf.interfaces[edge.iface];
        if proto == Protocol::Bgp {
            if let Some(name) = self.bgp_neighbors.get(edge).and_then(|n| n.export_policy.as_ref())
            {
                return Some(name);
            }
        }
        conf.export_policies.get(&(proto, iface.name.clone()))
    }

    /// The prefixes a router originates into the given protocol.
    pub fn originated_networks(&self, router: RouterId, proto: Protocol) -> Vec<Prefix> {
        let conf = &self.configs[&router];
        match proto {
            Protocol::Connected => {
                conf.interfaces.iter().filter_map(|i| i.prefix).collect()
            }
            Protocol::Static => conf.static_routes.iter().map(|sr| sr.network).collect(),
            Protocol::Ospf => conf
                .interfaces
                .iter()
                .filter(|i| i.active && i.ospf_enabled)
                .filter_map(|i| i.prefix)
                .collect(),
            Protocol::Bgp => conf.bgp_networks.clone(),
        }
    }

    /// The BGP router-id of the peer behind the given edge, if the peer is internal and has one
    /// configured.
    pub fn find_router_id(&self, edge: &GraphEdge) -> Option<i64> {
        edge.peer
            .and_then(|(p, _)| self.configs[&p].router_id)
            .map(|id| id as i64)
    }

    /// Reference to the underlying physical graph.
    pub fn phys_network(&self) -> &PhysNetwork {
        &self.net
    }
}
