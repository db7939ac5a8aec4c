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

//! Top-level convenience entry point.

use crate::encoder::{Encoder, VerificationResult};
use crate::netmodel::{Graph, Prefix, RouterConfig, TopologyError};
use crate::smt::{SmtSolver, Term};
use crate::Error;

use log::*;

/// Verify that some router named `source` always forwards traffic towards the destination
/// prefixes, under at most `max_failures` simultaneous link failures.
///
/// The property is encoded as its negation: the query asks the solver for a scenario in which
/// `source` data-forwards on none of its edges. An unsatisfiable query therefore means the
/// property holds.
pub fn verify_reachability<S: SmtSolver>(
    configs: Vec<RouterConfig>,
    source: &str,
    destinations: Vec<Prefix>,
    max_failures: usize,
    solver: &mut S,
) -> Result<VerificationResult, Error> {
    let graph = Graph::new(configs)?;
    let source_id = graph
        .router(source)
        .ok_or_else(|| TopologyError::RouterNameNotFound(source.to_string()))?;

    let mut encoder = Encoder::new(graph, destinations)?;
    encoder.encode(max_failures)?;

    let forwards = Term::or(
        encoder
            .graph()
            .edges(source_id)
            .iter()
            .filter_map(|e| encoder.data_forwarding(source_id, e))
            .cloned()
            .collect(),
    );
    encoder.add_assertion(forwards.not());

    info!("verifying reachability from {} under {} failures", source, max_failures);
    encoder.verify(solver).map_err(|e| Error::Solver(e.to_string()))
}
