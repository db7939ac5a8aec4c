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

//! # Network Object Model
//!
//! This module contains the normalized router/interface/policy object model, produced by the
//! (external) vendor configuration parsers, and the [`Graph`] deriving the topology view the
//! encoder consumes.
//!
//! The module is structured as follows:
//! - [`types`]: basic types ([`Prefix`], [`Protocol`], [`RouterId`], ...) and the
//!   [`TopologyError`].
//! - [`config`]: the per-router configuration ([`config::RouterConfig`] and friends).
//! - [`policy`]: routing-policy statement trees and route-filter lists.
//! - [`graph`]: the [`Graph`] topology model.

pub mod config;
pub mod graph;
pub mod policy;
pub mod types;

pub use config::RouterConfig;
pub use graph::{Graph, GraphEdge};
pub use types::{
    AsId, IpWildcard, LineAction, Prefix, Protocol, RouterId, SubRange, TopologyError,
};
