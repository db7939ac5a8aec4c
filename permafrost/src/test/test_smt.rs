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

use crate::smt::eval::{evaluate, evaluate_bool, EvalError};
use crate::smt::{Model, ModelValue, Term};

#[test]
fn and_or_simplification() {
    // all-true conjunct lists collapse
    assert_eq!(
        Term::and(vec![Term::bool(true), Term::bool(true)]),
        Term::bool(true)
    );
    // a single false conjunct collapses the whole conjunction
    assert_eq!(
        Term::and(vec![Term::var("x"), Term::bool(false)]),
        Term::bool(false)
    );
    // true conjuncts are dropped
    assert_eq!(
        Term::and(vec![Term::bool(true), Term::var("x")]),
        Term::var("x")
    );
    // duals for disjunction
    assert_eq!(Term::or(vec![]), Term::bool(false));
    assert_eq!(
        Term::or(vec![Term::var("x"), Term::bool(true)]),
        Term::bool(true)
    );
    assert_eq!(
        Term::or(vec![Term::bool(false), Term::var("x")]),
        Term::var("x")
    );
}

#[test]
fn not_and_ite_simplification() {
    assert_eq!(Term::bool(true).not(), Term::bool(false));
    assert_eq!(Term::var("x").not().not(), Term::var("x"));

    assert_eq!(
        Term::ite(Term::bool(true), Term::int(1), Term::int(2)),
        Term::int(1)
    );
    assert_eq!(
        Term::ite(Term::bool(false), Term::int(1), Term::int(2)),
        Term::int(2)
    );
    assert_eq!(
        Term::ite(Term::var("c"), Term::bool(true), Term::bool(false)),
        Term::var("c")
    );
    assert_eq!(
        Term::ite(Term::var("c"), Term::var("x"), Term::var("x")),
        Term::var("x")
    );
}

#[test]
fn literal_folding() {
    assert_eq!(Term::int(3).eq(Term::int(3)), Term::bool(true));
    assert_eq!(Term::int(3).lt(Term::int(2)), Term::bool(false));
    assert_eq!(Term::int(3).add(Term::int(4)), Term::int(7));
    assert_eq!(Term::var("x").add(Term::int(0)), Term::var("x"));
    assert_eq!(Term::bool(true).implies(Term::var("x")), Term::var("x"));
    assert_eq!(Term::bool(false).implies(Term::var("x")), Term::bool(true));
}

#[test]
fn evaluate_terms() {
    let mut model = Model::new();
    model.set_int("x", 10);
    model.set_int("y", 3);
    model.set_bool("b", true);

    let t = Term::var("x").add(Term::var("y")).eq(Term::int(13));
    assert_eq!(evaluate_bool(&t, &model), Ok(true));

    let t = Term::and(vec![Term::var("b"), Term::var("x").gt(Term::var("y"))]);
    assert_eq!(evaluate_bool(&t, &model), Ok(true));

    let t = Term::ite(Term::var("b"), Term::var("x"), Term::var("y"));
    assert_eq!(evaluate(&t, &model), Ok(ModelValue::Int(10)));

    let t = Term::var("b").implies(Term::var("x").lt(Term::int(5)));
    assert_eq!(evaluate_bool(&t, &model), Ok(false));
}

#[test]
fn evaluate_errors() {
    let model = Model::new();
    assert_eq!(
        evaluate_bool(&Term::var("missing"), &model),
        Err(EvalError::UnboundVariable("missing".to_string()))
    );

    let mut model = Model::new();
    model.set_int("x", 1);
    assert!(matches!(
        evaluate_bool(&Term::var("x"), &model),
        Err(EvalError::SortMismatch(_))
    ));
}

#[test]
fn model_getters_are_sort_checked() {
    let mut model = Model::new();
    model.set_int("x", 42);
    model.set_bool("b", false);
    assert_eq!(model.get_int("x"), Some(42));
    assert_eq!(model.get_bool("b"), Some(false));
    assert_eq!(model.get_int("b"), None);
    assert_eq!(model.get_bool("x"), None);
    assert_eq!(model.get("nope"), None);
}
