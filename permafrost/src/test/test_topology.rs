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

use crate::netmodel::config::{BgpNeighbor, Interface, StaticRoute};
use crate::netmodel::types::AsId;
use crate::netmodel::{Graph, Prefix, Protocol, RouterConfig, TopologyError};

fn iface(name: &str, prefix: Prefix) -> Interface {
    let mut i = Interface::new(name, Some(prefix));
    i.ospf_cost = Some(1);
    i
}

fn two_router_net() -> Vec<RouterConfig> {
    let mut r1 = RouterConfig::new("r1");
    r1.protocols.insert(Protocol::Ospf);
    r1.interfaces.push(iface("eth0", Prefix::from_octets(10, 0, 0, 1, 30)));
    r1.interfaces.push(iface("eth1", Prefix::from_octets(10, 1, 0, 1, 24)));

    let mut r2 = RouterConfig::new("r2");
    r2.protocols.insert(Protocol::Ospf);
    r2.interfaces.push(iface("eth0", Prefix::from_octets(10, 0, 0, 2, 30)));

    vec![r1, r2]
}

#[test]
fn interfaces_pair_by_subnet() {
    let g = Graph::new(two_router_net()).unwrap();
    let r1 = g.router("r1").unwrap();
    let r2 = g.router("r2").unwrap();

    let edges = g.edges(r1);
    assert_eq!(edges.len(), 2);
    // eth0 on r1 pairs with eth0 on r2
    assert_eq!(edges[0].peer, Some((r2, 0)));
    // eth1 is a boundary edge
    assert_eq!(edges[1].peer, None);

    let other = g.other_end(&edges[0]).unwrap();
    assert_eq!(other.router, r2);
    assert_eq!(g.other_end(&other), Some(edges[0]));

    assert_eq!(g.neighbors(r1), &maplit::btreeset! { r2 });
    assert_eq!(g.neighbors(r2), &maplit::btreeset! { r1 });
    assert_eq!(g.links().len(), 1);
}

#[test]
fn duplicate_router_names_are_rejected() {
    let confs = vec![RouterConfig::new("r1"), RouterConfig::new("r1")];
    assert_eq!(
        Graph::new(confs).err(),
        Some(TopologyError::DuplicateRouterName("r1".to_string()))
    );
}

#[test]
fn static_route_over_unknown_interface_is_rejected() {
    let mut r1 = RouterConfig::new("r1");
    r1.protocols.insert(Protocol::Static);
    r1.static_routes.push(StaticRoute {
        network: Prefix::from_octets(10, 5, 0, 0, 24),
        interface: "eth9".to_string(),
        admin_distance: 1,
    });
    assert_eq!(
        Graph::new(vec![r1]).err(),
        Some(TopologyError::UnknownNextHopInterface {
            router: "r1".to_string(),
            interface: "eth9".to_string(),
        })
    );
}

#[test]
fn bgp_neighbor_over_unknown_interface_is_rejected() {
    let mut r1 = RouterConfig::new("r1");
    r1.protocols.insert(Protocol::Bgp);
    r1.bgp_neighbors.push(BgpNeighbor {
        interface: "eth9".to_string(),
        remote_as: AsId(65002),
        address: None,
        import_policy: None,
        export_policy: None,
    });
    assert_eq!(
        Graph::new(vec![r1]).err(),
        Some(TopologyError::UnknownNeighborInterface {
            router: "r1".to_string(),
            interface: "eth9".to_string(),
        })
    );
}

#[test]
fn interface_usage_per_protocol() {
    let mut confs = two_router_net();
    confs[0].protocols.insert(Protocol::Static);
    confs[0].static_routes.push(StaticRoute {
        network: Prefix::from_octets(10, 5, 0, 0, 24),
        interface: "eth1".to_string(),
        admin_distance: 1,
    });
    let g = Graph::new(confs).unwrap();
    let r1 = g.router("r1").unwrap();
    let edges = g.edges(r1).to_vec();

    // ospf runs on both interfaces
    assert!(g.is_interface_used(Protocol::Ospf, &edges[0]));
    assert!(g.is_interface_used(Protocol::Ospf, &edges[1]));
    // the static route points over eth1 only
    assert!(!g.is_interface_used(Protocol::Static, &edges[0]));
    assert!(g.is_interface_used(Protocol::Static, &edges[1]));
    // no BGP neighbor, and the peer does not run BGP
    assert!(!g.is_interface_used(Protocol::Bgp, &edges[0]));

    assert_eq!(g.static_routes_on(r1, "eth0").unwrap().len(), 0);
    assert_eq!(g.static_routes_on(r1, "eth1").unwrap().len(), 1);
    assert!(g.static_routes_on(r1, "eth9").is_err());
}

#[test]
fn originated_networks_per_protocol() {
    let mut confs = two_router_net();
    confs[0].protocols.insert(Protocol::Bgp);
    confs[0].bgp_networks.push(Prefix::from_octets(192, 168, 0, 0, 16));
    let g = Graph::new(confs).unwrap();
    let r1 = g.router("r1").unwrap();

    let ospf = g.originated_networks(r1, Protocol::Ospf);
    assert_eq!(
        ospf,
        vec![
            Prefix::from_octets(10, 0, 0, 0, 30),
            Prefix::from_octets(10, 1, 0, 0, 24),
        ]
    );
    assert_eq!(
        g.originated_networks(r1, Protocol::Bgp),
        vec![Prefix::from_octets(192, 168, 0, 0, 16)]
    );
    assert_eq!(
        g.originated_networks(r1, Protocol::Connected),
        vec![
            Prefix::from_octets(10, 0, 0, 0, 30),
            Prefix::from_octets(10, 1, 0, 0, 24),
        ]
    );
    assert!(g.originated_networks(r1, Protocol::Static).is_empty());
}

#[test]
fn router_id_lookup_follows_the_peer() {
    let mut confs = two_router_net();
    confs[1].router_id = Some(42);
    let g = Graph::new(confs).unwrap();
    let r1 = g.router("r1").unwrap();
    let edges = g.edges(r1);
    assert_eq!(g.find_router_id(&edges[0]), Some(42));
    assert_eq!(g.find_router_id(&edges[1]), None);
}
