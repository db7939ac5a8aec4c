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

use crate::encoder::optimize::Optimizations;
use crate::netmodel::config::Interface;
use crate::netmodel::policy::{IntExpr, RoutingPolicy, Statement};
use crate::netmodel::{Graph, Prefix, Protocol, RouterConfig};

use std::collections::HashMap;

fn iface(name: &str, prefix: Prefix) -> Interface {
    let mut i = Interface::new(name, Some(prefix));
    i.ospf_cost = Some(1);
    i
}

fn pair() -> Vec<RouterConfig> {
    let mut r1 = RouterConfig::new("r1");
    r1.protocols.insert(Protocol::Ospf);
    r1.interfaces.push(iface("eth0", Prefix::from_octets(10, 0, 0, 1, 30)));
    r1.interfaces.push(iface("eth1", Prefix::from_octets(10, 0, 1, 1, 30)));

    let mut r2 = RouterConfig::new("r2");
    r2.protocols.insert(Protocol::Ospf);
    r2.interfaces.push(iface("eth0", Prefix::from_octets(10, 0, 0, 2, 30)));
    r2.interfaces.push(iface("eth1", Prefix::from_octets(10, 0, 1, 2, 30)));

    vec![r1, r2]
}

fn compute(confs: Vec<RouterConfig>) -> (Graph, Optimizations) {
    let g = Graph::new(confs).unwrap();
    let opts = Optimizations::compute(&g, &HashMap::new());
    (g, opts)
}

#[test]
fn single_protocol_routers() {
    let (g, opts) = compute(pair());
    let r1 = g.router("r1").unwrap();
    assert!(opts.has_single_protocol(r1));
    // a single protocol everywhere means the administrative distance can never decide
    assert!(!opts.keep_admin_dist());

    let mut confs = pair();
    confs[0].protocols.insert(Protocol::Connected);
    let (g, opts) = compute(confs);
    let r1 = g.router("r1").unwrap();
    let r2 = g.router("r2").unwrap();
    assert!(!opts.has_single_protocol(r1));
    assert!(opts.has_single_protocol(r2));
    assert!(opts.keep_admin_dist());
}

#[test]
fn local_pref_is_kept_only_when_some_policy_writes_it() {
    let (_, opts) = compute(pair());
    assert!(!opts.keep_local_pref());

    let mut confs = pair();
    confs[0].policies.insert(
        "lp".to_string(),
        RoutingPolicy::new(
            "lp",
            vec![Statement::SetLocalPref(IntExpr::Literal(200)), Statement::ExitAccept],
        ),
    );
    let (_, opts) = compute(confs);
    assert!(opts.keep_local_pref());
}

#[test]
fn export_sharing_requires_indistinguishable_edges() {
    let (g, opts) = compute(pair());
    let r1 = g.router("r1").unwrap();
    assert!(opts.can_share_export(r1, Protocol::Ospf));

    // attaching an export policy to one of the two edges splits them
    let mut confs = pair();
    confs[0].policies.insert(
        "exp".to_string(),
        RoutingPolicy::new("exp", vec![Statement::ExitAccept]),
    );
    confs[0]
        .export_policies
        .insert((Protocol::Ospf, "eth0".to_string()), "exp".to_string());
    let (g, opts) = compute(confs);
    let r1 = g.router("r1").unwrap();
    assert!(!opts.can_share_export(r1, Protocol::Ospf));
}

#[test]
fn export_sharing_requires_equal_costs() {
    let g = Graph::new(pair()).unwrap();
    let r1 = g.router("r1").unwrap();
    let costs = maplit::hashmap! {
        (r1, 0) => 1,
        (r1, 1) => 5,
    };
    let opts = Optimizations::compute(&g, &costs);
    assert!(!opts.can_share_export(r1, Protocol::Ospf));
}

#[test]
fn import_merging_requires_unfiltered_internal_links() {
    let (g, opts) = compute(pair());
    let r1 = g.router("r1").unwrap();
    let edges = g.edges(r1).to_vec();
    assert!(opts.merges_import_export(r1, Protocol::Ospf, &edges[0]));
    assert!(opts.merges_import_export(r1, Protocol::Ospf, &edges[1]));

    // an import policy forces a separate import record
    let mut confs = pair();
    confs[0].policies.insert(
        "imp".to_string(),
        RoutingPolicy::new("imp", vec![Statement::ExitAccept]),
    );
    confs[0]
        .import_policies
        .insert((Protocol::Ospf, "eth0".to_string()), "imp".to_string());
    let (g, opts) = compute(confs);
    let r1 = g.router("r1").unwrap();
    let edges = g.edges(r1).to_vec();
    assert!(!opts.merges_import_export(r1, Protocol::Ospf, &edges[0]));
    assert!(opts.merges_import_export(r1, Protocol::Ospf, &edges[1]));
}

#[test]
fn record_fields_follow_the_protocol() {
    let (g, opts) = compute(pair());
    let ospf = opts.record_fields(Protocol::Ospf);
    assert!(ospf.metric);
    assert!(!ospf.med);
    assert!(!ospf.local_pref);
    assert!(!ospf.router_id);

    let bgp = opts.record_fields(Protocol::Bgp);
    assert!(bgp.metric);
    assert!(bgp.med);

    let conn = opts.record_fields(Protocol::Connected);
    assert!(!conn.metric);
    assert!(!conn.med);

    let r1 = g.router("r1").unwrap();
    let overall = opts.overall_fields(&g, r1);
    assert_eq!(overall, ospf);
}
