//! Unit propagation.
use partial_ref::{partial, PartialRef};

use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ImplGraphP, StatsP, TrailP,
    WatchlistsP,
};

pub mod assignment;
pub mod binary;
pub mod graph;
pub mod long;
pub mod watch;

pub use assignment::{backtrack, enqueue_assignment, full_restart, restart, Assignment, Trail};
pub use graph::{Conflict, ImplGraph, ImplNode, Reason};
pub use watch::{enable_watchlists, Watch, Watchlists};

/// Propagate all enqueued assignments.
///
/// Returns the conflicting clause on conflict. For every propagated literal the binary clauses
/// are examined before the long clauses.
pub fn propagate(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ImplGraphP,
        mut StatsP,
        mut TrailP,
        mut WatchlistsP,
        BinaryClausesP,
        ClauseDbP,
    ),
) -> Result<(), Conflict> {
    if !ctx.part(WatchlistsP).enabled() {
        enable_watchlists(ctx.borrow());
    }

    let mut propagations = 0u64;

    let result = loop {
        let lit = match ctx.part_mut(TrailP).pop_queue() {
            None => break Ok(()),
            Some(lit) => lit,
        };
        propagations += 1;

        if let Err(conflict) = binary::propagate_binary(ctx.borrow(), lit) {
            break Err(conflict);
        }

        if let Err(conflict) = long::propagate_long(ctx.borrow(), lit) {
            break Err(conflict);
        }
    };

    ctx.part_mut(StatsP).propagations += propagations;

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use glimsat_formula::{lits, Lit};

    use crate::context::set_var_count;
    use crate::load::load_clause;

    #[test]
    fn propagates_chains_of_implications() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 4);

        load_clause(ctx.borrow(), &lits![-1, 2]);
        load_clause(ctx.borrow(), &lits![-1, 3]);
        load_clause(ctx.borrow(), &lits![-2, -3, 4]);

        ctx.part_mut(TrailP).new_decision_level();
        enqueue_assignment(ctx.borrow(), Lit::from_dimacs(1), Reason::Unit);

        assert_eq!(propagate(ctx.borrow()), Ok(()));

        assert_eq!(ctx.part(TrailP).trail(), &lits![1, 2, 3, 4][..]);
        assert!(ctx.part(TrailP).fully_propagated());

        let four = Lit::from_dimacs(4).var();
        assert_eq!(ctx.part(ImplGraphP).level(four), 1);
        match ctx.part(ImplGraphP).reason(four) {
            Reason::Long(_) => (),
            other => panic!("unexpected reason {:?}", other),
        }

        assert_eq!(ctx.part(StatsP).propagations, 4);
    }

    #[test]
    fn detects_conflicting_binary_implications() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 3);

        load_clause(ctx.borrow(), &lits![-1, 2]);
        load_clause(ctx.borrow(), &lits![-1, 3]);
        load_clause(ctx.borrow(), &lits![-2, -3]);

        ctx.part_mut(TrailP).new_decision_level();
        enqueue_assignment(ctx.borrow(), Lit::from_dimacs(1), Reason::Unit);

        assert!(propagate(ctx.borrow()).is_err());
    }

    #[test]
    fn backtracking_restores_the_propagated_state() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 5);

        load_clause(ctx.borrow(), &lits![-1, 2]);
        load_clause(ctx.borrow(), &lits![-2, 3, 5]);
        load_clause(ctx.borrow(), &lits![-5]);

        assert_eq!(propagate(ctx.borrow()), Ok(()));

        let level_0_trail = ctx.part(TrailP).trail().to_owned();

        ctx.part_mut(TrailP).new_decision_level();
        enqueue_assignment(ctx.borrow(), Lit::from_dimacs(1), Reason::Unit);
        assert_eq!(propagate(ctx.borrow()), Ok(()));

        let propagated_trail = ctx.part(TrailP).trail().to_owned();
        assert!(propagated_trail.contains(&Lit::from_dimacs(3)));

        backtrack(ctx.borrow(), 0);
        assert_eq!(ctx.part(TrailP).trail(), &level_0_trail[..]);
        assert!(ctx.part(TrailP).fully_propagated());

        // repeating the decision reproduces the same propagations
        ctx.part_mut(TrailP).new_decision_level();
        enqueue_assignment(ctx.borrow(), Lit::from_dimacs(1), Reason::Unit);
        assert_eq!(propagate(ctx.borrow()), Ok(()));

        assert_eq!(ctx.part(TrailP).trail(), &propagated_trail[..]);
    }
}
