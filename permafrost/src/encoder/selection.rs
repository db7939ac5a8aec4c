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

//! # Best-Route Selection Predicates
//!
//! The two predicates over pairs of symbolic records that drive route selection. `equal` holds
//! when every kept field agrees (absent fields compare against the protocol default).
//! `greater_or_equal` is the strict lexicographic preference chain: longer prefix wins, then
//! lower administrative distance, higher local preference, lower metric, lower MED, and finally
//! the lower router-id as tie-break (skipped under multipath semantics, or when the peer's
//! router-id is unknown). Each stage is "strictly better, or equal and defer to the next stage",
//! folded right to left into a single term.

use crate::encoder::optimize::{multipath, Optimizations};
use crate::encoder::symbolic::SymbolicRecord;
use crate::encoder::{
    default_admin_distance, default_length, default_local_pref, default_med, default_metric,
};
use crate::netmodel::types::Protocol;
use crate::smt::Term;

fn equal_helper(best: Option<&Term>, vars: Option<&Term>, default_val: i64) -> Term {
    match vars {
        None => match best {
            Some(b) => b.clone().eq(Term::int(default_val)),
            None => Term::bool(true),
        },
        Some(v) => match best {
            Some(b) => b.clone().eq(v.clone()),
            None => Term::bool(true),
        },
    }
}

fn ge_better_helper(
    best: Option<&Term>,
    vars: Option<&Term>,
    default_val: i64,
    less: bool,
    keep: bool,
) -> Term {
    match vars {
        None => match best {
            Some(b) if keep => {
                if less {
                    b.clone().lt(Term::int(default_val))
                } else {
                    b.clone().gt(Term::int(default_val))
                }
            }
            _ => Term::bool(false),
        },
        Some(v) => match best {
            Some(b) => {
                if less {
                    b.clone().lt(v.clone())
                } else {
                    b.clone().gt(v.clone())
                }
            }
            None => Term::bool(false),
        },
    }
}

fn ge_equal_helper(best: Option<&Term>, vars: Option<&Term>, default_val: i64, keep: bool) -> Term {
    match vars {
        None => match best {
            Some(b) if keep => b.clone().eq(Term::int(default_val)),
            _ => Term::bool(true),
        },
        Some(v) => match best {
            Some(b) => b.clone().eq(v.clone()),
            None => Term::bool(true),
        },
    }
}

fn router_id_tiebreak(
    proto: Protocol,
    best: &SymbolicRecord,
    vars: &SymbolicRecord,
    peer_router_id: Option<i64>,
    strict_equal: bool,
) -> Term {
    match vars.router_id() {
        Some(v) => match best.router_id() {
            Some(b) => {
                if strict_equal {
                    b.clone().eq(v.clone())
                } else {
                    b.clone().le(v.clone())
                }
            }
            None => Term::bool(true),
        },
        None => match best.router_id() {
            None => Term::bool(true),
            Some(b) => {
                if multipath(proto) {
                    return Term::bool(true);
                }
                match peer_router_id {
                    None => Term::bool(true),
                    Some(id) => {
                        if strict_equal {
                            b.clone().eq(Term::int(id))
                        } else {
                            b.clone().le(Term::int(id))
                        }
                    }
                }
            }
        },
    }
}

/// True iff every kept field of `best` and `vars` agrees, comparing absent fields against the
/// protocol's default constant.
pub(crate) fn equal(
    proto: Protocol,
    best: &SymbolicRecord,
    vars: &SymbolicRecord,
    peer_router_id: Option<i64>,
) -> Term {
    let equal_len = equal_helper(best.prefix_length(), vars.prefix_length(), default_length());
    let equal_ad =
        equal_helper(best.admin_dist(), vars.admin_dist(), default_admin_distance(proto));
    let equal_lp = equal_helper(best.local_pref(), vars.local_pref(), default_local_pref());
    let equal_met = equal_helper(best.metric(), vars.metric(), default_metric(proto));
    let equal_med = equal_helper(best.med(), vars.med(), default_med(proto));
    let equal_id = router_id_tiebreak(proto, best, vars, peer_router_id, true);

    Term::and(vec![equal_len, equal_ad, equal_lp, equal_met, equal_med, equal_id])
}

/// True iff `best` is at least as good as `vars` under the lexicographic preference chain.
pub(crate) fn greater_or_equal(
    opts: &Optimizations,
    proto: Protocol,
    best: &SymbolicRecord,
    vars: &SymbolicRecord,
    peer_router_id: Option<i64>,
) -> Term {
    let default_ad = default_admin_distance(proto);

    let better_len = ge_better_helper(
        best.prefix_length(),
        vars.prefix_length(),
        default_length(),
        false,
        true,
    );
    let equal_len =
        ge_equal_helper(best.prefix_length(), vars.prefix_length(), default_length(), true);

    let keep_ad = opts.keep_admin_dist();
    let better_ad =
        ge_better_helper(best.admin_dist(), vars.admin_dist(), default_ad, true, keep_ad);
    let equal_ad = ge_equal_helper(best.admin_dist(), vars.admin_dist(), default_ad, keep_ad);

    let keep_lp = opts.keep_local_pref();
    let better_lp = ge_better_helper(
        best.local_pref(),
        vars.local_pref(),
        default_local_pref(),
        false,
        keep_lp,
    );
    let equal_lp =
        ge_equal_helper(best.local_pref(), vars.local_pref(), default_local_pref(), keep_lp);

    let better_met =
        ge_better_helper(best.metric(), vars.metric(), default_metric(proto), true, true);
    let equal_met = ge_equal_helper(best.metric(), vars.metric(), default_metric(proto), true);

    let better_med = ge_better_helper(best.med(), vars.med(), default_med(proto), true, true);
    let equal_med = ge_equal_helper(best.med(), vars.med(), default_med(proto), true);

    let tiebreak = router_id_tiebreak(proto, best, vars, peer_router_id, false);

    // fold the chain right to left: most significant criterion last
    let b = Term::and(vec![equal_med, tiebreak]);
    let b = Term::or(vec![better_med, b]);
    let b = Term::and(vec![equal_met, b]);
    let b = Term::or(vec![better_met, b]);
    let b = Term::and(vec![equal_lp, b]);
    let b = Term::or(vec![better_lp, b]);
    let b = Term::and(vec![equal_ad, b]);
    let b = Term::or(vec![better_ad, b]);
    let b = Term::and(vec![equal_len, b]);
    Term::or(vec![better_len, b])
}
