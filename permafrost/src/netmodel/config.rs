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

//! # Router Configuration
//!
//! This module contains the normalized, vendor-independent configuration of a single router, as
//! produced by the (external) vendor configuration parsers. The verifier treats these structures
//! as immutable for the duration of one analysis run.

use crate::netmodel::policy::{RouteFilterList, RoutingPolicy};
use crate::netmodel::types::{AsId, IpWildcard, LineAction, Prefix, Protocol, SubRange};

use std::collections::{BTreeSet, HashMap};

/// Default OSPF reference bandwidth (100 Mbit/s), used to derive interface costs from bandwidth.
pub const DEFAULT_OSPF_REFERENCE_BANDWIDTH: f64 = 1e8;

/// # Router Configuration
///
/// All control-plane state of a single router: its interfaces, the protocols it runs, its static
/// routes, BGP sessions, routing policies, route filters, ACLs and redistribution statements.
///
/// Policy attachment works on two levels: a [`BgpNeighbor`] may name import/export policies for
/// its session, and `import_policies`/`export_policies` attach a policy to a whole
/// (protocol, interface) pair. The neighbor-level attachment takes precedence.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Router hostname (must be unique in the network)
    pub name: String,
    /// BGP router-id, if explicitly configured
    pub router_id: Option<u32>,
    /// AS number of the router
    pub as_id: AsId,
    /// The set of routing protocols enabled on this router
    pub protocols: BTreeSet<Protocol>,
    /// All interfaces of the router
    pub interfaces: Vec<Interface>,
    /// All configured static routes
    pub static_routes: Vec<StaticRoute>,
    /// All configured BGP neighbors
    pub bgp_neighbors: Vec<BgpNeighbor>,
    /// Prefixes originated into BGP (`network` statements)
    pub bgp_networks: Vec<Prefix>,
    /// Named routing policies
    pub policies: HashMap<String, RoutingPolicy>,
    /// Named route-filter lists (prefix lists)
    pub route_filters: HashMap<String, RouteFilterList>,
    /// Named access control lists
    pub acls: HashMap<String, Acl>,
    /// Route redistribution statements
    pub redistributions: Vec<Redistribution>,
    /// Import policy attachment per (protocol, interface name)
    pub import_policies: HashMap<(Protocol, String), String>,
    /// Export policy attachment per (protocol, interface name)
    pub export_policies: HashMap<(Protocol, String), String>,
    /// OSPF reference bandwidth for deriving interface costs
    pub ospf_reference_bandwidth: f64,
}

impl RouterConfig {
    /// Create an empty configuration for a router with the given name.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            router_id: None,
            as_id: AsId(65001),
            protocols: BTreeSet::new(),
            interfaces: Vec::new(),
            static_routes: Vec::new(),
            bgp_neighbors: Vec::new(),
            bgp_networks: Vec::new(),
            policies: HashMap::new(),
            route_filters: HashMap::new(),
            acls: HashMap::new(),
            redistributions: Vec::new(),
            import_policies: HashMap::new(),
            export_policies: HashMap::new(),
            ospf_reference_bandwidth: DEFAULT_OSPF_REFERENCE_BANDWIDTH,
        }
    }

    /// Find an interface by name, returning its index and the interface itself.
    pub fn interface(&self, name: &str) -> Option<(usize, &Interface)> {
        self.interfaces.iter().enumerate().find(|(_, i)| i.name == name)
    }
}

/// A single network interface.
#[derive(Debug, Clone)]
pub struct Interface {
    /// Interface name (unique per router)
    pub name: String,
    /// The prefix assigned to the interface, if any
    pub prefix: Option<Prefix>,
    /// Administrative state of the interface
    pub active: bool,
    /// Interface bandwidth in bit/s
    pub bandwidth: Option<f64>,
    /// Explicitly configured OSPF cost
    pub ospf_cost: Option<u32>,
    /// Whether OSPF runs on this interface
    pub ospf_enabled: bool,
    /// Name of the ACL filtering packets arriving on this interface
    pub inbound_acl: Option<String>,
    /// Name of the ACL filtering packets leaving via this interface
    pub outbound_acl: Option<String>,
}

impl Interface {
    /// Create a new, active interface with the given name and prefix.
    pub fn new<S: Into<String>>(name: S, prefix: Option<Prefix>) -> Self {
        Self {
            name: name.into(),
            prefix,
            active: true,
            bandwidth: None,
            ospf_cost: None,
            ospf_enabled: true,
            inbound_acl: None,
            outbound_acl: None,
        }
    }
}

/// A statically configured route.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticRoute {
    /// Destination network
    pub network: Prefix,
    /// Name of the interface over which the route points
    pub interface: String,
    /// Administrative distance of the route
    pub admin_distance: u32,
}

/// A configured BGP session towards a peer outside (or inside) the network.
#[derive(Debug, Clone)]
pub struct BgpNeighbor {
    /// Name of the interface over which the session runs
    pub interface: String,
    /// AS number of the peer
    pub remote_as: AsId,
    /// Peer address, if known
    pub address: Option<u32>,
    /// Import policy applied to routes received from this peer
    pub import_policy: Option<String>,
    /// Export policy applied to routes sent to this peer
    pub export_policy: Option<String>,
}

/// A route redistribution statement: routes selected by protocol `from` are offered to protocol
/// `to`, subject to the named policy. Without a policy, nothing is redistributed.
#[derive(Debug, Clone)]
pub struct Redistribution {
    /// The protocol receiving the routes
    pub to: Protocol,
    /// The protocol the routes are taken from
    pub from: Protocol,
    /// The policy governing the redistribution
    pub policy: Option<String>,
}

/// An access control list: an ordered sequence of lines, evaluated first-match-wins, with an
/// implicit final reject.
#[derive(Debug, Clone)]
pub struct Acl {
    /// Name of the ACL
    pub name: String,
    /// The lines, in declaration order
    pub lines: Vec<AclLine>,
}

/// One line of an ACL.
#[derive(Debug, Clone)]
pub struct AclLine {
    /// Action taken when the line matches
    pub action: LineAction,
    /// Invert the match predicate of this line
    pub negate: bool,
    /// All match conditions of the line, combined with a logical and
    pub matches: Vec<AclMatch>,
}

impl AclLine {
    /// A line matching the given conditions, with the given action.
    pub fn new(action: LineAction, matches: Vec<AclMatch>) -> Self {
        Self { action, negate: false, matches }
    }
}

/// A single match condition of an ACL line. The translation into constraints supports only a
/// subset of the variants; the remaining ones exist so that the parser layer can represent them,
/// and translating them is a hard error rather than a silent approximation.
#[derive(Debug, Clone)]
pub enum AclMatch {
    /// Destination address matches one of the wildcards
    DstIp(Vec<IpWildcard>),
    /// Source address matches one of the wildcards
    SrcIp(Vec<IpWildcard>),
    /// Destination port lies in one of the ranges
    DstPort(Vec<SubRange>),
    /// Source port lies in one of the ranges
    SrcPort(Vec<SubRange>),
    /// ICMP type lies in one of the ranges
    IcmpType(Vec<SubRange>),
    /// ICMP code lies in one of the ranges
    IcmpCode(Vec<SubRange>),
    /// TCP flags equal one of the given combinations
    TcpFlags(Vec<TcpFlags>),
    /// IP protocol number is one of the given values
    IpProtocol(Vec<u32>),
    /// DSCP value (not supported by the translation)
    Dscp(Vec<u32>),
    /// ECN value (not supported by the translation)
    Ecn(Vec<u32>),
    /// Connection state (not supported by the translation)
    State(Vec<String>),
    /// Fragment offset (not supported by the translation)
    FragmentOffset(Vec<SubRange>),
    /// Negated destination address (not supported by the translation)
    NotDstIp(Vec<IpWildcard>),
    /// Negated source address (not supported by the translation)
    NotSrcIp(Vec<IpWildcard>),
    /// Negated destination port (not supported by the translation)
    NotDstPort(Vec<SubRange>),
    /// Negated source port (not supported by the translation)
    NotSrcPort(Vec<SubRange>),
}

/// A TCP flag combination. Each flag carries a `use` bit telling whether the flag takes part in
/// the match at all, and the expected value if it does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpFlags {
    /// match on the ACK flag
    pub use_ack: bool,
    /// expected ACK value
    pub ack: bool,
    /// match on the CWR flag
    pub use_cwr: bool,
    /// expected CWR value
    pub cwr: bool,
    /// match on the ECE flag
    pub use_ece: bool,
    /// expected ECE value
    pub ece: bool,
    /// match on the FIN flag
    pub use_fin: bool,
    /// expected FIN value
    pub fin: bool,
    /// match on the PSH flag
    pub use_psh: bool,
    /// expected PSH value
    pub psh: bool,
    /// match on the RST flag
    pub use_rst: bool,
    /// expected RST value
    pub rst: bool,
    /// match on the SYN flag
    pub use_syn: bool,
    /// expected SYN value
    pub syn: bool,
    /// match on the URG flag
    pub use_urg: bool,
    /// expected URG value
    pub urg: bool,
}

impl TcpFlags {
    /// A combination matching packets with SYN set and ACK cleared.
    pub fn syn_only() -> Self {
        Self { use_syn: true, syn: true, use_ack: true, ack: false, ..Default::default() }
    }
}
