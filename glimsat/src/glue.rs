//! Compute glue levels of clauses.
//!
//! The glue of a clause is the number of distinct decision levels among its variables, also
//! known as the literal block distance (LBD). Clauses connecting few decision levels tend to
//! stay useful, so the smallest observed glue ranks learned clauses for reduction.
use partial_ref::{partial, PartialRef};

use glimsat_formula::Lit;

use crate::clause::ClauseRef;
use crate::context::{ClauseAllocP, Context, ImplGraphP, SolverConfigP, TmpDataP};

/// Compute the glue level of a clause.
///
/// All literals of the clause have to be assigned.
pub fn compute_glue(mut ctx: partial!(Context, mut TmpDataP, ImplGraphP), lits: &[Lit]) -> usize {
    let (tmp_data, ctx) = ctx.split_part_mut(TmpDataP);
    let impl_graph = ctx.part(ImplGraphP);
    let flags = &mut tmp_data.flags;

    let mut glue = 0;

    for &lit in lits {
        let level = impl_graph.level(lit.var());
        let flag = &mut flags[level];
        if !*flag {
            *flag = true;
            glue += 1
        }
    }

    for &lit in lits {
        let level = impl_graph.level(lit.var());
        flags[level] = false;
    }

    glue
}

/// Recompute and lower the glue of clauses involved in a conflict.
///
/// Has to be called before backtracking, while every literal of the involved clauses is still
/// assigned. Only redundant clauses are updated and glues never increase.
pub fn reestimate_glue(
    mut ctx: partial!(Context, mut ClauseAllocP, mut TmpDataP, ImplGraphP, SolverConfigP),
    involved: &[ClauseRef],
) {
    if !ctx.part(SolverConfigP).recalculate_lbd {
        return;
    }

    let (tmp_data, mut ctx) = ctx.split_part_mut(TmpDataP);
    let (alloc, ctx) = ctx.split_part_mut(ClauseAllocP);
    let impl_graph = ctx.part(ImplGraphP);
    let flags = &mut tmp_data.flags;

    for &cref in involved {
        let clause = alloc.clause_mut(cref);
        if !clause.header().redundant() || clause.header().deleted() {
            continue;
        }

        let mut glue = 0;
        for &lit in clause.lits() {
            let level = impl_graph.level(lit.var());
            let flag = &mut flags[level];
            if !*flag {
                *flag = true;
                glue += 1
            }
        }
        for &lit in clause.lits() {
            flags[impl_graph.level(lit.var())] = false;
        }

        if glue < clause.header().glue() {
            clause.header_mut().set_glue(glue);
        }
    }
}
