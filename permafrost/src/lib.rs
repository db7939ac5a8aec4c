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

#![deny(missing_docs)]

//! # Permafrost: Verifying Network-Wide Configuration Properties
//!
//! This is a library for proving properties of a network's control-plane configuration ("can
//! traffic towards destination X always reach it, even under up to K link failures?"). Instead
//! of simulating the network, the entire routing behavior (route origination, import/export
//! policies, best-route selection, redistribution, ACLs, forwarding) is compiled into a single
//! symbolic formula, and satisfiability of the formula together with the negated property is
//! decided by an external constraint solver. An unsatisfiable formula proves the property over
//! *all* consistent routing states at once; a model is a concrete counterexample scenario.
//!
//! ## Structure
//!
//! This library is structured in the following way:
//!
//! - **[`netmodel`]**: The normalized router/interface/policy object model as produced by the
//!   (external) vendor configuration parsers, and the [`Graph`](netmodel::Graph) topology model
//!   derived from it.
//!
//! - **[`smt`]**: The solver-agnostic term algebra ([`Term`](smt::Term)), the satisfiability
//!   oracle interface ([`SmtSolver`](smt::SmtSolver)), and a term evaluator. The solver library
//!   itself is an external collaborator; a Z3 backend ships behind the `z3` cargo feature.
//!
//! - **[`encoder`]**: The symbolic core. The [`Encoder`](encoder::Encoder) allocates the
//!   symbolic records, packet and failure indicators, builds the logical graph, evaluates all
//!   routing policies into transfer-function constraints, and assembles the phased formula. The
//!   [`Optimizations`](encoder::optimize::Optimizations) tables decide which variables can be
//!   elided up front.
//!
//! ## Usage
//!
//! Build the topology from the parsed configurations, encode it for a failure bound, assert the
//! negated property, and hand the formula to a solver backend:
//!
//! ```
//! use permafrost::encoder::Encoder;
//! use permafrost::netmodel::config::Interface;
//! use permafrost::netmodel::{Graph, Prefix, Protocol, RouterConfig};
//! use permafrost::Error;
//!
//! fn main() -> Result<(), Error> {
//!     let mut r1 = RouterConfig::new("r1");
//!     r1.protocols.insert(Protocol::Connected);
//!     r1.protocols.insert(Protocol::Ospf);
//!     let mut eth0 = Interface::new("eth0", Some(Prefix::from_octets(10, 0, 0, 1, 24)));
//!     eth0.bandwidth = Some(1e8);
//!     r1.interfaces.push(eth0);
//!
//!     let mut r2 = RouterConfig::new("r2");
//!     r2.protocols.insert(Protocol::Connected);
//!     r2.protocols.insert(Protocol::Ospf);
//!     let mut eth0 = Interface::new("eth0", Some(Prefix::from_octets(10, 0, 0, 2, 24)));
//!     eth0.bandwidth = Some(1e8);
//!     r2.interfaces.push(eth0);
//!
//!     let graph = Graph::new(vec![r1, r2])?;
//!     let mut encoder = Encoder::new(graph, vec![Prefix::from_octets(10, 0, 0, 0, 24)])?;
//!     encoder.encode(0)?;
//!
//!     // hand `encoder` to a solver backend via `encoder.verify(&mut solver)`
//!     println!("{} constraints built", encoder.constraints().len());
//!     Ok(())
//! }
//! ```
// test modules
mod test;

mod analysis;
pub mod encoder;
mod error;
pub mod netmodel;
pub mod smt;

pub use analysis::verify_reachability;
pub use error::Error;
