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

//! Module containing all basic type definitions of the network model

use petgraph::prelude::*;
use petgraph::stable_graph::StableGraph;
use std::fmt;
use thiserror::Error;

type IndexType = u32;
/// Router Identification (and index into the topology graph)
pub type RouterId = NodeIndex<IndexType>;
/// Physical topology graph. Nodes are routers, edges are physical links.
pub type PhysNetwork = StableGraph<(), (), Directed, IndexType>;

/// AS Number
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct AsId(pub u32);

/// IPv4 prefix: a network address together with a prefix length.
///
/// The address is always stored in masked form, i.e., all bits after the prefix length are zero.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct Prefix {
    /// Network address (host bits cleared)
    pub addr: u32,
    /// Prefix length, in the range `[0, 32]`
    pub len: u8,
}

impl Prefix {
    /// Create a new prefix. The address is masked down to the given length.
    pub fn new(addr: u32, len: u8) -> Self {
        assert!(len <= 32);
        Self { addr: addr & Self::mask_of(len), len }
    }

    /// Build a prefix from four dotted octets and a length.
    pub fn from_octets(a: u8, b: u8, c: u8, d: u8, len: u8) -> Self {
        Self::new(
            ((a as u32) << 24) | ((b as u32) << 16) | ((c as u32) << 8) | (d as u32),
            len,
        )
    }

    fn mask_of(len: u8) -> u32 {
        if len == 0 {
            0
        } else {
            u32::max_value() << (32 - len as u32)
        }
    }

    /// The netmask of this prefix.
    pub fn mask(&self) -> u32 {
        Self::mask_of(self.len)
    }

    /// First address of the network.
    pub fn network_address(&self) -> u32 {
        self.addr
    }

    /// Last address of the network.
    pub fn end_address(&self) -> u32 {
        self.addr | !self.mask()
    }

    /// Checks if the given address lies inside the prefix.
    pub fn contains(&self, ip: u32) -> bool {
        ip & self.mask() == self.addr
    }

    /// Checks if both prefixes denote the very same network (address and length).
    pub fn same_network(&self, other: &Prefix) -> bool {
        self.len == other.len && self.addr == other.addr
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}/{}",
            (self.addr >> 24) & 0xff,
            (self.addr >> 16) & 0xff,
            (self.addr >> 8) & 0xff,
            self.addr & 0xff,
            self.len
        )
    }
}

/// Inclusive range of integers, used for prefix-length ranges, port ranges, and ICMP ranges.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct SubRange {
    /// lower bound (inclusive)
    pub start: u32,
    /// upper bound (inclusive)
    pub end: u32,
}

impl SubRange {
    /// Create a new inclusive range.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Range containing exactly one value.
    pub fn singleton(val: u32) -> Self {
        Self { start: val, end: val }
    }

    /// Checks if the value lies inside the range.
    pub fn contains(&self, val: u32) -> bool {
        val >= self.start && val <= self.end
    }

    /// Returns true if the range contains exactly one value.
    pub fn is_singleton(&self) -> bool {
        self.start == self.end
    }
}

/// An IP address combined with a wildcard mask (`1` bits are "don't care"). Only wildcards whose
/// ignored bits form a contiguous suffix can be translated into constraints; all others are
/// rejected as unsupported.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub struct IpWildcard {
    /// the address bits
    pub ip: u32,
    /// the wildcard mask, where a `1` marks a bit as ignored
    pub wildcard: u32,
}

impl IpWildcard {
    /// Create a new wildcard from an address and a wildcard mask.
    pub fn new(ip: u32, wildcard: u32) -> Self {
        Self { ip, wildcard }
    }

    /// Wildcard matching exactly the given prefix.
    pub fn from_prefix(prefix: Prefix) -> Self {
        Self { ip: prefix.network_address(), wildcard: !prefix.mask() }
    }

    /// Returns true if the ignored bits form a contiguous suffix, i.e., the wildcard is
    /// equivalent to a prefix.
    pub fn is_prefix(&self) -> bool {
        self.wildcard.wrapping_add(1) & self.wildcard == 0
    }

    /// Convert the wildcard to the equivalent prefix, if there is one.
    pub fn to_prefix(&self) -> Option<Prefix> {
        if self.is_prefix() {
            let len = 32 - self.wildcard.count_ones() as u8;
            Some(Prefix::new(self.ip, len))
        } else {
            None
        }
    }
}

/// Routing protocols known to the verifier.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub enum Protocol {
    /// Directly connected networks
    Connected,
    /// Statically configured routes
    Static,
    /// Open Shortest Path First
    Ospf,
    /// Border Gateway Protocol
    Bgp,
}

impl Protocol {
    /// Protocol name as it appears in variable names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected => "CONNECTED",
            Self::Static => "STATIC",
            Self::Ospf => "OSPF",
            Self::Bgp => "BGP",
        }
    }

    /// Default administrative distance of routes learned via this protocol.
    pub fn default_admin_distance(&self) -> u32 {
        match self {
            Self::Connected => 0,
            Self::Static => 1,
            Self::Ospf => 110,
            Self::Bgp => 20,
        }
    }

    /// Returns true if the protocol exchanges routes with neighboring routers. `Connected` and
    /// `Static` routes are originated locally and never propagated.
    pub fn is_distributed(&self) -> bool {
        matches!(self, Self::Ospf | Self::Bgp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Action of an ACL line or a route-filter line.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum LineAction {
    /// The line permits the matched packet or route
    Accept,
    /// The line denies the matched packet or route
    Reject,
}

impl LineAction {
    /// Returns `true` if the action is `Accept`.
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Topology Errors. All of them are fatal: they describe an inconsistency in the configuration
/// object model, and no constraint may be asserted once one is detected.
#[derive(Error, Debug, PartialEq)]
pub enum TopologyError {
    /// Two routers carry the same name
    #[error("Duplicate router name: {0}")]
    DuplicateRouterName(String),
    /// A router name is not present in the topology
    #[error("Router name was not found in topology: {0}")]
    RouterNameNotFound(String),
    /// A static route names a next-hop interface which does not exist on the router
    #[error("Static route on router {router} uses unknown interface {interface}")]
    UnknownNextHopInterface {
        /// Router on which the route is configured
        router: String,
        /// The missing interface name
        interface: String,
    },
    /// A BGP neighbor is attached to an interface which does not exist on the router
    #[error("BGP neighbor on router {router} uses unknown interface {interface}")]
    UnknownNeighborInterface {
        /// Router on which the neighbor is configured
        router: String,
        /// The missing interface name
        interface: String,
    },
    /// The static route table for an interface is missing
    #[error("No static route table for interface {interface} on router {router}")]
    MissingStaticRoutes {
        /// Router name
        router: String,
        /// Interface name
        interface: String,
    },
    /// An interface running OSPF has neither an explicit cost nor a bandwidth
    #[error("Interface {interface} on router {router} has no bandwidth to derive a cost from")]
    MissingBandwidth {
        /// Router name
        router: String,
        /// Interface name
        interface: String,
    },
    /// The peer of a logical edge could not be linked
    #[error("No opposite logical edge for {router} ({protocol}) on interface {interface}")]
    MissingOppositeEdge {
        /// Router name
        router: String,
        /// Protocol of the logical edge
        protocol: Protocol,
        /// Interface name of the physical edge
        interface: String,
    },
    /// A configuration references a routing policy which is not defined
    #[error("Router {router} references unknown policy {name}")]
    UnknownPolicy {
        /// Router name
        router: String,
        /// The missing policy name
        name: String,
    },
    /// A configuration references a route-filter list which is not defined
    #[error("Router {router} references unknown route filter {name}")]
    UnknownRouteFilter {
        /// Router name
        router: String,
        /// The missing filter name
        name: String,
    },
    /// An interface references an ACL which is not defined
    #[error("Router {router} references unknown ACL {name}")]
    UnknownAcl {
        /// Router name
        router: String,
        /// The missing ACL name
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_masks_host_bits() {
        let p = Prefix::from_octets(10, 0, 0, 42, 24);
        assert_eq!(p, Prefix::from_octets(10, 0, 0, 0, 24));
        assert_eq!(p.network_address(), 0x0a000000);
        assert_eq!(p.end_address(), 0x0a0000ff);
        assert!(p.contains(0x0a000017));
        assert!(!p.contains(0x0a000117));
        assert_eq!(format!("{}", p), "10.0.0.0/24");
    }

    #[test]
    fn zero_length_prefix_contains_everything() {
        let p = Prefix::new(0xffffffff, 0);
        assert_eq!(p.network_address(), 0);
        assert!(p.contains(0));
        assert!(p.contains(u32::max_value()));
    }

    #[test]
    fn wildcard_prefix_conversion() {
        let w = IpWildcard::new(0x0a000000, 0x000000ff);
        assert!(w.is_prefix());
        assert_eq!(w.to_prefix(), Some(Prefix::from_octets(10, 0, 0, 0, 24)));

        let w = IpWildcard::new(0x0a000000, 0x00ff00ff);
        assert!(!w.is_prefix());
        assert_eq!(w.to_prefix(), None);

        let w = IpWildcard::from_prefix(Prefix::from_octets(10, 1, 0, 0, 16));
        assert_eq!(w.wildcard, 0x0000ffff);
    }
}
