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

//! The abstract satisfiability oracle. The encoder talks to any backend implementing
//! [`SmtSolver`]; the concrete solver library stays an external collaborator.

use crate::smt::term::{Sort, Term};
use std::collections::HashMap;
use std::fmt;

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq)]
pub enum SatResult {
    /// The asserted constraints are satisfiable
    Sat,
    /// The asserted constraints are unsatisfiable
    Unsat,
    /// The solver could not decide, with the backend's reason
    Unknown(String),
}

/// A concrete value assigned to a variable in a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelValue {
    /// A boolean value
    Bool(bool),
    /// An integer value
    Int(i64),
}

impl fmt::Display for ModelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelValue::Bool(b) => write!(f, "{}", b),
            ModelValue::Int(i) => write!(f, "{}", i),
        }
    }
}

/// A (partial) assignment of variables to values, as returned by a backend after a satisfiable
/// check, or as hand-built input to the [term evaluator](crate::smt::eval).
#[derive(Debug, Clone, Default)]
pub struct Model {
    values: HashMap<String, ModelValue>,
}

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a boolean value to a variable.
    pub fn set_bool<S: Into<String>>(&mut self, name: S, val: bool) {
        self.values.insert(name.into(), ModelValue::Bool(val));
    }

    /// Assign an integer value to a variable.
    pub fn set_int<S: Into<String>>(&mut self, name: S, val: i64) {
        self.values.insert(name.into(), ModelValue::Int(val));
    }

    /// Look up a value.
    pub fn get(&self, name: &str) -> Option<ModelValue> {
        self.values.get(name).copied()
    }

    /// Look up an integer value. Returns `None` if the variable is unassigned or boolean.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ModelValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// Look up a boolean value. Returns `None` if the variable is unassigned or integer.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ModelValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Iterate over all assignments.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ModelValue)> {
        self.values.iter()
    }
}

/// Abstract solver interface. One backend instance holds a set of declared variables and asserted
/// constraints; `push`/`pop` delimit scopes so a caller can layer a derived encoding on top of a
/// base one without re-asserting it.
pub trait SmtSolver {
    /// Backend-specific error type
    type Error: std::error::Error;

    /// Declare a variable of the given sort.
    fn declare_var(&mut self, name: &str, sort: Sort) -> Result<(), Self::Error>;

    /// Assert a boolean term.
    fn assert(&mut self, term: &Term) -> Result<(), Self::Error>;

    /// Open a new assertion scope.
    fn push(&mut self) -> Result<(), Self::Error>;

    /// Discard the most recent assertion scope.
    fn pop(&mut self) -> Result<(), Self::Error>;

    /// Check satisfiability of all asserted terms.
    fn check(&mut self) -> Result<SatResult, Self::Error>;

    /// Extract the values of the given variables from the model of the last satisfiable check.
    fn model(&mut self, vars: &[(String, Sort)]) -> Result<Model, Self::Error>;
}
