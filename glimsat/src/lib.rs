//! A CDCL based SAT solver with glue-driven clause management.
//!
//! This crate contains the solver core: the assignment trail, two-watched-literal propagation
//! with a binary clause fast path, first-UIP conflict analysis with clause minimization, the
//! arena-backed clause database with glue (LBD) driven reduction, VSIDS branching and the
//! restart/reduce driven search loop. DIMACS parsing lives in `glimsat-dimacs`, the basic
//! formula types in `glimsat-formula` and the command line frontend in `glimsat-cli`.

pub mod config;
pub mod solver;

mod analyze;
mod assumptions;
mod binary;
mod budget;
mod cdcl;
mod clause;
mod context;
mod decision;
mod glue;
mod load;
mod proof;
mod prop;
mod schedule;
mod simplify;
mod state;
mod stats;
mod tmp;

pub use budget::Interrupter;
pub use proof::ProofFormat;
pub use solver::Solver;
pub use stats::Stats;

pub use glimsat_formula::{CnfFormula, Lit, Var};

/// DIMACS CNF parsing and writing, re-exported from `glimsat-dimacs`.
pub mod dimacs {
    pub use glimsat_dimacs::*;
}
