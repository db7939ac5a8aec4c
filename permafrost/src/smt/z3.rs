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

//! Z3 backend for the [`SmtSolver`] trait, available behind the `z3` cargo feature.

use crate::smt::solver::{Model, SatResult, SmtSolver};
use crate::smt::term::{Sort, Term};

use std::collections::HashMap;
use thiserror::Error;
use z3::SatResult as Z3SatResult;

/// Errors raised by the Z3 backend.
#[derive(Debug, Error)]
pub enum Z3Error {
    /// The backend reached an inconsistent state
    #[error("Z3 error: {0}")]
    Internal(String),
    /// A term references a variable which was never declared
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
}

enum Z3Term {
    Int(z3::ast::Int),
    Bool(z3::ast::Bool),
}

impl Z3Term {
    fn into_int(self) -> Result<z3::ast::Int, Z3Error> {
        match self {
            Z3Term::Int(i) => Ok(i),
            Z3Term::Bool(_) => Err(Z3Error::Internal("expected Int, got Bool".into())),
        }
    }

    fn into_bool(self) -> Result<z3::ast::Bool, Z3Error> {
        match self {
            Z3Term::Bool(b) => Ok(b),
            Z3Term::Int(_) => Err(Z3Error::Internal("expected Bool, got Int".into())),
        }
    }
}

/// An [`SmtSolver`] backed by Z3.
pub struct Z3Solver {
    solver: z3::Solver,
    int_vars: HashMap<String, z3::ast::Int>,
    bool_vars: HashMap<String, z3::ast::Bool>,
}

impl Z3Solver {
    /// Create a fresh solver instance.
    pub fn new() -> Self {
        Self {
            solver: z3::Solver::new(),
            int_vars: HashMap::new(),
            bool_vars: HashMap::new(),
        }
    }

    /// Create a solver with a wall-clock budget, in milliseconds.
    pub fn with_timeout_ms(timeout_ms: u32) -> Self {
        let solver = z3::Solver::new();
        let mut params = z3::Params::new();
        params.set_u32("timeout", timeout_ms);
        solver.set_params(&params);
        Self { solver, int_vars: HashMap::new(), bool_vars: HashMap::new() }
    }

    fn translate(&self, term: &Term) -> Result<Z3Term, Z3Error> {
        match term {
            Term::Var(name) => {
                if let Some(v) = self.int_vars.get(name) {
                    Ok(Z3Term::Int(v.clone()))
                } else if let Some(v) = self.bool_vars.get(name) {
                    Ok(Z3Term::Bool(v.clone()))
                } else {
                    Err(Z3Error::UnknownVariable(name.clone()))
                }
            }
            Term::Int(i) => Ok(Z3Term::Int(z3::ast::Int::from_i64(*i))),
            Term::Bool(b) => Ok(Z3Term::Bool(z3::ast::Bool::from_bool(*b))),
            Term::Not(t) => Ok(Z3Term::Bool(self.translate(t)?.into_bool()?.not())),
            Term::And(ts) => {
                let bools: Result<Vec<_>, _> =
                    ts.iter().map(|t| self.translate(t).and_then(|z| z.into_bool())).collect();
                let bools = bools?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::and(&refs)))
            }
            Term::Or(ts) => {
                let bools: Result<Vec<_>, _> =
                    ts.iter().map(|t| self.translate(t).and_then(|z| z.into_bool())).collect();
                let bools = bools?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::or(&refs)))
            }
            Term::Implies(a, b) => {
                let a = self.translate(a)?.into_bool()?;
                let b = self.translate(b)?.into_bool()?;
                Ok(Z3Term::Bool(a.implies(&b)))
            }
            Term::Ite(c, t, e) => {
                let c = self.translate(c)?.into_bool()?;
                match (self.translate(t)?, self.translate(e)?) {
                    (Z3Term::Int(ti), Z3Term::Int(ei)) => Ok(Z3Term::Int(c.ite(&ti, &ei))),
                    (Z3Term::Bool(tb), Z3Term::Bool(eb)) => Ok(Z3Term::Bool(c.ite(&tb, &eb))),
                    _ => Err(Z3Error::Internal("sort mismatch in ite".into())),
                }
            }
            Term::Eq(a, b) => match (self.translate(a)?, self.translate(b)?) {
                (Z3Term::Int(x), Z3Term::Int(y)) => Ok(Z3Term::Bool(x.eq(&y))),
                (Z3Term::Bool(x), Z3Term::Bool(y)) => Ok(Z3Term::Bool(x.eq(&y))),
                _ => Err(Z3Error::Internal("sort mismatch in eq".into())),
            },
            Term::Lt(a, b) => {
                let a = self.translate(a)?.into_int()?;
                let b = self.translate(b)?.into_int()?;
                Ok(Z3Term::Bool(a.lt(&b)))
            }
            Term::Le(a, b) => {
                let a = self.translate(a)?.into_int()?;
                let b = self.translate(b)?.into_int()?;
                Ok(Z3Term::Bool(a.le(&b)))
            }
            Term::Gt(a, b) => {
                let a = self.translate(a)?.into_int()?;
                let b = self.translate(b)?.into_int()?;
                Ok(Z3Term::Bool(a.gt(&b)))
            }
            Term::Ge(a, b) => {
                let a = self.translate(a)?.into_int()?;
                let b = self.translate(b)?.into_int()?;
                Ok(Z3Term::Bool(a.ge(&b)))
            }
            Term::Add(a, b) => {
                let a = self.translate(a)?.into_int()?;
                let b = self.translate(b)?.into_int()?;
                Ok(Z3Term::Int(&a + &b))
            }
            Term::Sub(a, b) => {
                let a = self.translate(a)?.into_int()?;
                let b = self.translate(b)?.into_int()?;
                Ok(Z3Term::Int(&a - &b))
            }
        }
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtSolver for Z3Solver {
    type Error = Z3Error;

    fn declare_var(&mut self, name: &str, sort: Sort) -> Result<(), Z3Error> {
        match sort {
            Sort::Int => {
                self.int_vars.insert(name.to_string(), z3::ast::Int::new_const(name));
            }
            Sort::Bool => {
                self.bool_vars.insert(name.to_string(), z3::ast::Bool::new_const(name));
            }
        }
        Ok(())
    }

    fn assert(&mut self, term: &Term) -> Result<(), Z3Error> {
        let t = self.translate(term)?.into_bool()?;
        self.solver.assert(&t);
        Ok(())
    }

    fn push(&mut self) -> Result<(), Z3Error> {
        self.solver.push();
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Z3Error> {
        self.solver.pop(1);
        Ok(())
    }

    fn check(&mut self) -> Result<SatResult, Z3Error> {
        match self.solver.check() {
            Z3SatResult::Sat => Ok(SatResult::Sat),
            Z3SatResult::Unsat => Ok(SatResult::Unsat),
            Z3SatResult::Unknown => Ok(SatResult::Unknown("z3 returned unknown".into())),
        }
    }

    fn model(&mut self, vars: &[(String, Sort)]) -> Result<Model, Z3Error> {
        let z3_model = self
            .solver
            .get_model()
            .ok_or_else(|| Z3Error::Internal("no model available".into()))?;
        let mut model = Model::new();
        for (name, sort) in vars {
            match sort {
                Sort::Int => {
                    if let Some(v) = self.int_vars.get(name) {
                        if let Some(val) = z3_model.eval::<z3::ast::Int>(v, true) {
                            if let Some(i) = val.as_i64() {
                                model.set_int(name.clone(), i);
                            }
                        }
                    }
                }
                Sort::Bool => {
                    if let Some(v) = self.bool_vars.get(name) {
                        if let Some(val) = z3_model.eval::<z3::ast::Bool>(v, true) {
                            if let Some(b) = val.as_bool() {
                                model.set_bool(name.clone(), b);
                            }
                        }
                    }
                }
            }
        }
        Ok(model)
    }
}
