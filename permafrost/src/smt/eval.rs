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

//! Term evaluation under a concrete [`Model`]. Used to cross-check solver models when debug
//! logging is enabled, and as a deterministic oracle in the test suite.

use crate::smt::solver::{Model, ModelValue};
use crate::smt::term::Term;

use thiserror::Error;

/// Errors raised while evaluating a term.
#[derive(Error, Debug, PartialEq)]
pub enum EvalError {
    /// A variable is not assigned in the model
    #[error("Variable {0} is not assigned")]
    UnboundVariable(String),
    /// A sub-term has the wrong sort for its position
    #[error("Sort mismatch in {0}")]
    SortMismatch(&'static str),
}

fn eval_bool(term: &Term, model: &Model) -> Result<bool, EvalError> {
    match evaluate(term, model)? {
        ModelValue::Bool(b) => Ok(b),
        ModelValue::Int(_) => Err(EvalError::SortMismatch("boolean position")),
    }
}

fn eval_int(term: &Term, model: &Model) -> Result<i64, EvalError> {
    match evaluate(term, model)? {
        ModelValue::Int(i) => Ok(i),
        ModelValue::Bool(_) => Err(EvalError::SortMismatch("integer position")),
    }
}

/// Evaluate a term under the given model.
pub fn evaluate(term: &Term, model: &Model) -> Result<ModelValue, EvalError> {
    match term {
        Term::Var(name) => model
            .get(name)
            .ok_or_else(|| EvalError::UnboundVariable(name.clone())),
        Term::Int(i) => Ok(ModelValue::Int(*i)),
        Term::Bool(b) => Ok(ModelValue::Bool(*b)),
        Term::Not(t) => Ok(ModelValue::Bool(!eval_bool(t, model)?)),
        Term::And(ts) => {
            let mut acc = true;
            for t in ts {
                acc &= eval_bool(t, model)?;
            }
            Ok(ModelValue::Bool(acc))
        }
        Term::Or(ts) => {
            let mut acc = false;
            for t in ts {
                acc |= eval_bool(t, model)?;
            }
            Ok(ModelValue::Bool(acc))
        }
        Term::Implies(a, b) => {
            Ok(ModelValue::Bool(!eval_bool(a, model)? || eval_bool(b, model)?))
        }
        Term::Ite(c, t, e) => {
            if eval_bool(c, model)? {
                evaluate(t, model)
            } else {
                evaluate(e, model)
            }
        }
        Term::Eq(a, b) => match (evaluate(a, model)?, evaluate(b, model)?) {
            (ModelValue::Int(x), ModelValue::Int(y)) => Ok(ModelValue::Bool(x == y)),
            (ModelValue::Bool(x), ModelValue::Bool(y)) => Ok(ModelValue::Bool(x == y)),
            _ => Err(EvalError::SortMismatch("equality")),
        },
        Term::Lt(a, b) => Ok(ModelValue::Bool(eval_int(a, model)? < eval_int(b, model)?)),
        Term::Le(a, b) => Ok(ModelValue::Bool(eval_int(a, model)? <= eval_int(b, model)?)),
        Term::Gt(a, b) => Ok(ModelValue::Bool(eval_int(a, model)? > eval_int(b, model)?)),
        Term::Ge(a, b) => Ok(ModelValue::Bool(eval_int(a, model)? >= eval_int(b, model)?)),
        Term::Add(a, b) => Ok(ModelValue::Int(eval_int(a, model)? + eval_int(b, model)?)),
        Term::Sub(a, b) => Ok(ModelValue::Int(eval_int(a, model)? - eval_int(b, model)?)),
    }
}

/// Evaluate a term expected to be boolean.
pub fn evaluate_bool(term: &Term, model: &Model) -> Result<bool, EvalError> {
    eval_bool(term, model)
}
