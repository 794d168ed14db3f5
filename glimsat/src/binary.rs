//! Binary clauses.
use partial_ref::{partial, PartialRef};

use glimsat_formula::Lit;

use crate::context::{AssignmentP, BinaryClausesP, Context};

/// Binary clauses, stored implicitly.
///
/// A binary clause is stored as two implication list entries, one per literal. The entry for a
/// clause `{a, b}` in the list of `¬a` is `b` and vice versa. The lists double as the binary
/// watchers, with the implied literal taking the role of the blocking literal.
#[derive(Default)]
pub struct BinaryClauses {
    by_lit: Vec<Vec<Lit>>,
    count: usize,
}

impl BinaryClauses {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.by_lit.resize(count * 2, vec![]);
    }

    /// Add a binary clause.
    pub fn add_binary_clause(&mut self, lits: [Lit; 2]) {
        for i in 0..2 {
            self.by_lit[(!lits[i]).code()].push(lits[i ^ 1]);
        }
        self.count += 1;
    }

    /// Implications of a given literal.
    pub fn implied(&self, lit: Lit) -> &[Lit] {
        &self.by_lit[lit.code()]
    }

    /// Number of binary clauses.
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Remove all binary clauses that are satisfied at level 0.
///
/// May only be called at level 0 with all assignments propagated. Any binary clause with an
/// assigned literal is satisfied then: a false literal would have propagated the other literal
/// to true.
pub fn simplify_binary(mut ctx: partial!(Context, mut BinaryClausesP, AssignmentP)) {
    let (binary_clauses, ctx) = ctx.split_part_mut(BinaryClausesP);
    let assignment = ctx.part(AssignmentP);

    let mut entries = 0;

    for code in 0..binary_clauses.by_lit.len() {
        let watched = Lit::from_code(code);
        let list = &mut binary_clauses.by_lit[code];

        if assignment.var_value(watched.var()).is_some() {
            list.clear();
        } else {
            list.retain(|&implied| assignment.lit_is_unk(implied));
        }

        entries += list.len();
    }

    debug_assert_eq!(entries % 2, 0);
    binary_clauses.count = entries / 2;
}
