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

//! Solver-agnostic term algebra. The encoder builds [`Term`]s; a backend implementing
//! [`SmtSolver`](crate::smt::SmtSolver) translates them into its own representation.
//!
//! All constructors are smart: constant sub-terms are folded away on the spot (an `and` over an
//! all-true list collapses to `true`, an `ite` with a constant condition picks its branch, and so
//! on), so the emitted formula never carries trivial structure.

/// The sort of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sort {
    /// Boolean sort
    Bool,
    /// Unbounded integer sort
    Int,
}

/// A term over boolean and integer variables.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// A variable reference by name
    Var(String),
    /// An integer literal
    Int(i64),
    /// A boolean literal
    Bool(bool),
    /// Negation
    Not(Box<Term>),
    /// Conjunction
    And(Vec<Term>),
    /// Disjunction
    Or(Vec<Term>),
    /// Implication
    Implies(Box<Term>, Box<Term>),
    /// If-then-else over terms of equal sort
    Ite(Box<Term>, Box<Term>, Box<Term>),
    /// Equality over terms of equal sort
    Eq(Box<Term>, Box<Term>),
    /// Strictly less
    Lt(Box<Term>, Box<Term>),
    /// Less or equal
    Le(Box<Term>, Box<Term>),
    /// Strictly greater
    Gt(Box<Term>, Box<Term>),
    /// Greater or equal
    Ge(Box<Term>, Box<Term>),
    /// Integer addition
    Add(Box<Term>, Box<Term>),
    /// Integer subtraction
    Sub(Box<Term>, Box<Term>),
}

impl Term {
    /// A variable reference.
    pub fn var<S: Into<String>>(name: S) -> Self {
        Term::Var(name.into())
    }

    /// An integer literal.
    pub fn int(val: i64) -> Self {
        Term::Int(val)
    }

    /// A boolean literal.
    pub fn bool(val: bool) -> Self {
        Term::Bool(val)
    }

    /// Conjunction of all terms. True literals are dropped; a false literal collapses the whole
    /// conjunction; the empty conjunction is `true`.
    pub fn and(terms: Vec<Term>) -> Self {
        let mut out = Vec::with_capacity(terms.len());
        for t in terms {
            match t {
                Term::Bool(true) => {}
                Term::Bool(false) => return Term::Bool(false),
                t => out.push(t),
            }
        }
        match out.len() {
            0 => Term::Bool(true),
            1 => out.pop().unwrap(),
            _ => Term::And(out),
        }
    }

    /// Disjunction of all terms. False literals are dropped; a true literal collapses the whole
    /// disjunction; the empty disjunction is `false`.
    pub fn or(terms: Vec<Term>) -> Self {
        let mut out = Vec::with_capacity(terms.len());
        for t in terms {
            match t {
                Term::Bool(false) => {}
                Term::Bool(true) => return Term::Bool(true),
                t => out.push(t),
            }
        }
        match out.len() {
            0 => Term::Bool(false),
            1 => out.pop().unwrap(),
            _ => Term::Or(out),
        }
    }

    /// Negation, folding literals and double negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        match self {
            Term::Bool(b) => Term::Bool(!b),
            Term::Not(t) => *t,
            t => Term::Not(Box::new(t)),
        }
    }

    /// Implication, folding constant antecedents and consequents.
    pub fn implies(self, other: Term) -> Self {
        match (self, other) {
            (Term::Bool(false), _) => Term::Bool(true),
            (Term::Bool(true), b) => b,
            (_, Term::Bool(true)) => Term::Bool(true),
            (a, Term::Bool(false)) => a.not(),
            (a, b) => Term::Implies(Box::new(a), Box::new(b)),
        }
    }

    /// If-then-else. A constant condition selects its branch directly; identical branches
    /// collapse; boolean literal branches reduce to the condition itself.
    pub fn ite(cond: Term, then: Term, els: Term) -> Self {
        match cond {
            Term::Bool(true) => return then,
            Term::Bool(false) => return els,
            _ => {}
        }
        if then == els {
            return then;
        }
        match (&then, &els) {
            (Term::Bool(true), Term::Bool(false)) => cond,
            (Term::Bool(false), Term::Bool(true)) => cond.not(),
            _ => Term::Ite(Box::new(cond), Box::new(then), Box::new(els)),
        }
    }

    /// Equality, folding literal pairs.
    pub fn eq(self, other: Term) -> Self {
        match (self, other) {
            (Term::Int(a), Term::Int(b)) => Term::Bool(a == b),
            (Term::Bool(a), Term::Bool(b)) => Term::Bool(a == b),
            (a, b) => Term::Eq(Box::new(a), Box::new(b)),
        }
    }

    /// Strictly less.
    pub fn lt(self, other: Term) -> Self {
        match (self, other) {
            (Term::Int(a), Term::Int(b)) => Term::Bool(a < b),
            (a, b) => Term::Lt(Box::new(a), Box::new(b)),
        }
    }

    /// Less or equal.
    pub fn le(self, other: Term) -> Self {
        match (self, other) {
            (Term::Int(a), Term::Int(b)) => Term::Bool(a <= b),
            (a, b) => Term::Le(Box::new(a), Box::new(b)),
        }
    }

    /// Strictly greater.
    pub fn gt(self, other: Term) -> Self {
        match (self, other) {
            (Term::Int(a), Term::Int(b)) => Term::Bool(a > b),
            (a, b) => Term::Gt(Box::new(a), Box::new(b)),
        }
    }

    /// Greater or equal.
    pub fn ge(self, other: Term) -> Self {
        match (self, other) {
            (Term::Int(a), Term::Int(b)) => Term::Bool(a >= b),
            (a, b) => Term::Ge(Box::new(a), Box::new(b)),
        }
    }

    /// Addition, folding literal pairs and a zero summand.
    #[allow(clippy::should_implement_trait)]
    pub fn add(self, other: Term) -> Self {
        match (self, other) {
            (Term::Int(a), Term::Int(b)) => Term::Int(a + b),
            (a, Term::Int(0)) => a,
            (Term::Int(0), b) => b,
            (a, b) => Term::Add(Box::new(a), Box::new(b)),
        }
    }

    /// Subtraction, folding literal pairs and a zero subtrahend.
    #[allow(clippy::should_implement_trait)]
    pub fn sub(self, other: Term) -> Self {
        match (self, other) {
            (Term::Int(a), Term::Int(b)) => Term::Int(a - b),
            (a, Term::Int(0)) => a,
            (a, b) => Term::Sub(Box::new(a), Box::new(b)),
        }
    }
}
