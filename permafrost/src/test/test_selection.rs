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
use crate::encoder::selection::{equal, greater_or_equal};
use crate::encoder::symbolic::{RecordFields, SymbolicRecord};
use crate::netmodel::Protocol;
use crate::smt::eval::evaluate_bool;
use crate::smt::Model;

fn bgp_fields() -> RecordFields {
    RecordFields {
        admin_dist: true,
        local_pref: true,
        metric: true,
        med: true,
        router_id: false,
    }
}

fn assign(model: &mut Model, name: &str, len: i64, ad: i64, lp: i64, met: i64, med: i64) {
    model.set_bool(format!("{}_permitted", name), true);
    model.set_int(format!("{}_prefix-length", name), len);
    model.set_int(format!("{}_admin-dist", name), ad);
    model.set_int(format!("{}_local-pref", name), lp);
    model.set_int(format!("{}_metric", name), met);
    model.set_int(format!("{}_med", name), med);
}

fn check(
    model: &Model,
    best: &SymbolicRecord,
    vars: &SymbolicRecord,
) -> (bool, bool, bool) {
    let opts = Optimizations::with_flags(true, true);
    let eq = evaluate_bool(&equal(Protocol::Bgp, best, vars, None), model).unwrap();
    let ge =
        evaluate_bool(&greater_or_equal(&opts, Protocol::Bgp, best, vars, None), model).unwrap();
    let le =
        evaluate_bool(&greater_or_equal(&opts, Protocol::Bgp, vars, best, None), model).unwrap();
    (eq, ge, le)
}

#[test]
fn identical_records_are_equal_and_mutually_ge() {
    let best = SymbolicRecord::new("best", bgp_fields());
    let cand = SymbolicRecord::new("cand", bgp_fields());
    let mut model = Model::new();
    assign(&mut model, "best", 24, 20, 100, 5, 100);
    assign(&mut model, "cand", 24, 20, 100, 5, 100);

    let (eq, ge, le) = check(&model, &best, &cand);
    assert!(eq);
    assert!(ge);
    assert!(le);
}

#[test]
fn longer_prefix_dominates_everything() {
    let best = SymbolicRecord::new("best", bgp_fields());
    let cand = SymbolicRecord::new("cand", bgp_fields());
    let mut model = Model::new();
    // the candidate is better on every later criterion, but has a shorter prefix
    assign(&mut model, "best", 24, 110, 50, 100, 200);
    assign(&mut model, "cand", 16, 20, 200, 1, 0);

    let (eq, ge, le) = check(&model, &best, &cand);
    assert!(!eq);
    assert!(ge);
    assert!(!le);
}

#[test]
fn lower_admin_distance_wins_on_equal_prefix() {
    let best = SymbolicRecord::new("best", bgp_fields());
    let cand = SymbolicRecord::new("cand", bgp_fields());
    let mut model = Model::new();
    assign(&mut model, "best", 24, 20, 100, 5, 100);
    assign(&mut model, "cand", 24, 110, 100, 5, 100);

    let (eq, ge, le) = check(&model, &best, &cand);
    assert!(!eq);
    assert!(ge);
    assert!(!le);
}

#[test]
fn admin_distance_comparison_is_monotonic() {
    // best has the worse (higher) admin distance, so it is not >= the candidate; improving the
    // candidate further must never flip the comparison
    let best = SymbolicRecord::new("best", bgp_fields());
    let cand = SymbolicRecord::new("cand", bgp_fields());
    for cand_ad in &[100, 50, 20, 1, 0] {
        let mut model = Model::new();
        assign(&mut model, "best", 24, 110, 100, 5, 100);
        assign(&mut model, "cand", 24, *cand_ad, 100, 5, 100);
        let (_, ge, le) = check(&model, &best, &cand);
        assert!(!ge);
        assert!(le);
    }
}

#[test]
fn higher_local_pref_wins_after_admin_distance() {
    let best = SymbolicRecord::new("best", bgp_fields());
    let cand = SymbolicRecord::new("cand", bgp_fields());
    let mut model = Model::new();
    assign(&mut model, "best", 24, 20, 200, 50, 100);
    assign(&mut model, "cand", 24, 20, 100, 1, 0);

    let (eq, ge, le) = check(&model, &best, &cand);
    assert!(!eq);
    assert!(ge);
    assert!(!le);
}

#[test]
fn lower_metric_then_lower_med_break_remaining_ties() {
    let best = SymbolicRecord::new("best", bgp_fields());
    let cand = SymbolicRecord::new("cand", bgp_fields());

    let mut model = Model::new();
    assign(&mut model, "best", 24, 20, 100, 5, 200);
    assign(&mut model, "cand", 24, 20, 100, 10, 0);
    let (_, ge, le) = check(&model, &best, &cand);
    assert!(ge);
    assert!(!le);

    let mut model = Model::new();
    assign(&mut model, "best", 24, 20, 100, 5, 50);
    assign(&mut model, "cand", 24, 20, 100, 5, 100);
    let (_, ge, le) = check(&model, &best, &cand);
    assert!(ge);
    assert!(!le);
}

#[test]
fn elided_fields_compare_against_the_default() {
    // the candidate keeps no admin distance; the best record is only equal to it when it carries
    // the protocol default
    let best = SymbolicRecord::new("best", bgp_fields());
    let cand = SymbolicRecord::new(
        "cand",
        RecordFields { admin_dist: false, ..bgp_fields() },
    );

    let mut model = Model::new();
    assign(&mut model, "best", 24, 20, 100, 5, 100);
    assign(&mut model, "cand", 24, 0, 100, 5, 100);
    let (eq, _, _) = check(&model, &best, &cand);
    assert!(eq);

    let mut model = Model::new();
    assign(&mut model, "best", 24, 110, 100, 5, 100);
    assign(&mut model, "cand", 24, 0, 100, 5, 100);
    let (eq, _, _) = check(&model, &best, &cand);
    assert!(!eq);
}

#[test]
fn records_without_any_comparable_field_are_equal() {
    let best = SymbolicRecord::new("best", RecordFields::default());
    let cand = SymbolicRecord::new("cand", RecordFields::default());
    let mut model = Model::new();
    assign(&mut model, "best", 24, 0, 0, 0, 0);
    assign(&mut model, "cand", 24, 0, 0, 0, 0);
    let (eq, ge, le) = check(&model, &best, &cand);
    assert!(eq);
    assert!(ge);
    assert!(le);
}
