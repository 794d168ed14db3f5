//! Decision heuristics.
use partial_ref::{partial, PartialRef};

use glimsat_formula::{CnfFormula, Var};

use crate::context::{AssignmentP, Context, ImplGraphP, StatsP, TrailP, VsidsP};
use crate::prop::{enqueue_assignment, Reason};

pub mod vsids;

/// Make a decision and enqueue it.
///
/// Branches on the unassigned eligible variable with the highest activity, using the saved
/// phase as polarity.
///
/// Returns `false` if no decision was made because all eligible variables are assigned.
pub fn make_decision(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut StatsP,
        mut TrailP,
        mut VsidsP
    ),
) -> bool {
    let decision_var = loop {
        match ctx.part_mut(VsidsP).next() {
            None => return false,
            Some(var) => {
                if ctx.part(AssignmentP).var_value(var).is_none()
                    && ctx.part(VsidsP).is_eligible(var)
                {
                    break var;
                }
            }
        }
    };

    let decision = decision_var.lit(ctx.part(AssignmentP).last_var_value(decision_var));

    ctx.part_mut(TrailP).new_decision_level();

    enqueue_assignment(ctx.borrow(), decision, Reason::Unit);

    ctx.part_mut(StatsP).decisions += 1;

    true
}

/// Return an unassigned variable to the branching heuristic.
pub fn make_available(mut ctx: partial!(Context, mut VsidsP), var: Var) {
    ctx.part_mut(VsidsP).make_available(var);
}

/// Seed activities and phases from the literal occurrences of a formula.
///
/// The activity of a variable is its relative occurrence frequency, the preferred phase its more
/// frequent sign.
pub fn init_from_formula(
    mut ctx: partial!(Context, mut AssignmentP, mut VsidsP),
    formula: &CnfFormula,
) {
    let mut counts = vec![0usize; formula.var_count() * 2];

    for clause in formula.iter() {
        for &lit in clause {
            counts[lit.code()] += 1;
        }
    }

    let total: usize = counts.iter().sum();
    if total == 0 {
        return;
    }

    for index in 0..formula.var_count() {
        let var = Var::from_index(index);
        let positive = counts[var.positive().code()];
        let negative = counts[var.negative().code()];

        if positive + negative == 0 {
            continue;
        }

        let activity = (positive + negative) as f32 / total as f32;
        ctx.part_mut(VsidsP).seed_activity(var, activity);
        ctx.part_mut(AssignmentP)
            .set_last_value(var, positive >= negative);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use glimsat_formula::cnf_formula;

    use crate::context::set_var_count;

    #[test]
    fn decisions_cover_all_vars() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 4);

        while make_decision(ctx.borrow()) {}

        assert_eq!(ctx.part(TrailP).trail().len(), 4);
        assert_eq!(ctx.part(TrailP).current_level(), 4);
        assert_eq!(ctx.part(StatsP).decisions, 4);

        assert!(ctx
            .part(AssignmentP)
            .assignment()
            .iter()
            .all(|value| value.is_some()));
    }

    #[test]
    fn occurrence_seeding_directs_the_first_decision() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            2, 3;
            2, -1;
            2, 3;
        ];

        set_var_count(ctx.borrow(), formula.var_count());
        init_from_formula(ctx.borrow(), &formula);

        assert!(make_decision(ctx.borrow()));

        // Variable 2 occurs most often, always positively
        assert_eq!(ctx.part(TrailP).trail(), &glimsat_formula::lits![2][..]);
    }

    #[test]
    fn ineligible_vars_are_not_picked() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 3);

        ctx.part_mut(VsidsP).set_eligible(Var::from_index(1), false);

        while make_decision(ctx.borrow()) {}

        assert_eq!(ctx.part(TrailP).trail().len(), 2);
        assert!(ctx
            .part(AssignmentP)
            .var_value(Var::from_index(1))
            .is_none());
    }
}
