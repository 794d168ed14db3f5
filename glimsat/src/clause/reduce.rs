//! Clause database reduction.
use log::debug;

use ordered_float::OrderedFloat;
use partial_ref::{partial, PartialRef};

use crate::context::{
    ClauseAllocP, ClauseDbP, Context, ProofP, SolverConfigP, StatsP, WatchlistsP,
};

use super::db::delete_clause;

/// Delete the less useful half of the reducible learned clauses.
///
/// A learned clause is reducible when its glue is above the persistent threshold. The reducible
/// clauses are ranked by glue with activity as tie break and the worse half is deleted. With
/// `keep_median_lbd` set, the whole band sharing the median glue survives.
///
/// May only be called at decision level 0, where no long clause is the reason of an assignment.
pub fn reduce_learned<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ProofP<'a>,
        mut StatsP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) {
    let persistent_lbd = ctx.part(SolverConfigP).persistent_lbd;
    let keep_median_lbd = ctx.part(SolverConfigP).keep_median_lbd;

    let mut reducible: Vec<_> = {
        let alloc = ctx.part(ClauseAllocP);
        ctx.part(ClauseDbP)
            .clauses()
            .iter()
            .cloned()
            .filter(|&cref| {
                let header = alloc.header(cref);
                !header.deleted() && header.redundant() && header.glue() > persistent_lbd
            })
            .collect()
    };

    if reducible.len() <= 1 {
        ctx.part_mut(StatsP).reductions += 1;
        return;
    }

    {
        let alloc = ctx.part(ClauseAllocP);
        reducible.sort_unstable_by_key(|&cref| {
            let header = alloc.header(cref);
            (header.glue(), OrderedFloat(-header.activity()))
        });
    }

    let mut boundary = reducible.len() / 2;

    if keep_median_lbd {
        let median_lbd = ctx.part(ClauseAllocP).header(reducible[boundary]).glue();
        while boundary < reducible.len()
            && ctx.part(ClauseAllocP).header(reducible[boundary]).glue() == median_lbd
        {
            boundary += 1;
        }
    }

    let deleted = reducible.len() - boundary;
    for &cref in reducible[boundary..].iter() {
        delete_clause(ctx.borrow(), cref);
    }

    let stats = ctx.part_mut(StatsP);
    stats.reductions += 1;
    stats.reduced_clauses += deleted as u64;

    debug!(
        "reduced clause database, deleted {} of {} reducible clauses",
        deleted,
        reducible.len()
    );
}
