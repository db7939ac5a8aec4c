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

//! # Solver Interface
//!
//! The term algebra ([`Term`], [`Sort`]), the abstract satisfiability oracle ([`SmtSolver`],
//! [`SatResult`], [`Model`]), and a term evaluator ([`eval`]) for checking terms against concrete
//! assignments. A Z3-backed implementation of the oracle is available behind the `z3` feature.

pub mod eval;
pub mod solver;
pub mod term;
#[cfg(feature = "z3")]
pub mod z3;

pub use solver::{Model, ModelValue, SatResult, SmtSolver};
pub use term::{Sort, Term};
