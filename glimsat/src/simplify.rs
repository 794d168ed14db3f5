//! Level 0 simplification using unit clauses.
use partial_ref::{partial, PartialRef};

use crate::binary::simplify_binary;
use crate::clause::db::filter_clauses;
use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ImplGraphP, ProofP, TrailP,
    WatchlistsP,
};
use crate::proof::ProofStep;

/// Turn all level 0 propagations into unit clauses.
///
/// Afterwards no assignment depends on a clause anymore, so clauses can be deleted and collected
/// freely. The processed entries are removed from the trail, keeping it free for the next
/// decision levels. Returns whether there were any new units.
pub fn prove_units<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut ImplGraphP,
        mut ProofP<'a>,
        mut TrailP,
        AssignmentP,
        ClauseAllocP,
    ),
) -> bool {
    if ctx.part(TrailP).current_level() != 0 {
        return false;
    }

    let mut new_unit = false;

    let (impl_graph, mut ctx) = ctx.split_part_mut(ImplGraphP);
    let (trail, mut ctx) = ctx.split_part_mut(TrailP);

    for &lit in trail.trail() {
        new_unit = true;

        if !impl_graph.reason(lit.var()).is_unit() {
            ctx.part_mut(ProofP)
                .add_step(&ProofStep::UnitClauses { units: &[lit] });
            impl_graph.update_removed_unit(lit.var());
        }
    }

    trail.clear();

    new_unit
}

/// Remove satisfied clauses and false literals.
///
/// May only be called at level 0 with all assignments propagated and processed by
/// [`prove_units`]. Shrinking a clause below three literals moves it to the implicit binary
/// storage, so the watchlists are invalidated.
pub fn simplify<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ProofP<'a>,
        mut WatchlistsP,
        AssignmentP,
    ),
) {
    simplify_binary(ctx.borrow());

    let (assignment, mut ctx) = ctx.split_part(AssignmentP);
    let (proof, mut ctx) = ctx.split_part_mut(ProofP);

    let mut new_lits = vec![];
    let mut new_binary = vec![];

    filter_clauses(ctx.borrow(), |alloc, cref| {
        let clause = alloc.clause_mut(cref);
        new_lits.clear();
        for &lit in clause.lits() {
            match assignment.lit_value(lit) {
                None => new_lits.push(lit),
                Some(true) => {
                    proof.add_step(&ProofStep::DeleteClause {
                        clause: clause.lits(),
                    });
                    return false;
                }
                Some(false) => (),
            }
        }
        if new_lits.len() < clause.lits().len() {
            if proof.is_active() {
                proof.add_step(&ProofStep::AddClause { clause: &new_lits });
                proof.add_step(&ProofStep::DeleteClause {
                    clause: clause.lits(),
                });
            }

            match new_lits[..] {
                // After full propagation a clause cannot shrink below two literals: an empty
                // clause would have been a conflict and a unit clause a propagation, making the
                // clause satisfied and dropped above.
                [] | [_] => unreachable!(),
                [lit_0, lit_1] => {
                    new_binary.push([lit_0, lit_1]);
                    false
                }
                ref lits => {
                    clause.lits_mut()[..lits.len()].copy_from_slice(lits);
                    clause.header_mut().set_len(lits.len());
                    true
                }
            }
        } else {
            true
        }
    });

    for lits in new_binary {
        ctx.part_mut(BinaryClausesP).add_binary_clause(lits);
    }

    ctx.part_mut(WatchlistsP).disable();
}
