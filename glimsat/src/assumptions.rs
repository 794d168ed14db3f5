//! Solving under assumptions.
use partial_ref::{partial, split_borrow, PartialRef};

use glimsat_formula::Lit;

use crate::context::{
    AssignmentP, AssumptionsP, ClauseAllocP, Context, ImplGraphP, SolverStateP, TmpDataP, TrailP,
    VsidsP,
};
use crate::prop::{enqueue_assignment, full_restart, Reason};
use crate::state::SatState;

/// Assumptions active for the current solve call.
///
/// Assumptions are enqueued one per decision level below all real decisions. When an assumption
/// is falsified, the subset of assumptions responsible is recorded as the failed core.
#[derive(Default)]
pub struct Assumptions {
    assumptions: Vec<Lit>,
    failed_core: Vec<Lit>,
    assumption_levels: usize,
}

impl Assumptions {
    /// Current number of decision levels used for assumptions.
    pub fn assumption_levels(&self) -> usize {
        self.assumption_levels
    }

    /// Resets assumption_levels to zero on a full restart.
    pub fn full_restart(&mut self) {
        self.assumption_levels = 0;
    }

    /// Subset of the assumptions that made the formula unsatisfiable.
    pub fn failed_core(&self) -> &[Lit] {
        &self.failed_core
    }

    /// Current assumptions.
    pub fn assumptions(&self) -> &[Lit] {
        &self.assumptions
    }
}

/// Return type of [`enqueue_assumption`].
pub enum EnqueueAssumption {
    Done,
    Enqueued,
    Conflict,
}

/// Change the currently active assumptions.
pub fn set_assumptions(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut AssumptionsP,
        mut SolverStateP,
        mut TrailP,
        mut VsidsP,
    ),
    assumptions: &[Lit],
) {
    full_restart(ctx.borrow());

    let state = ctx.part_mut(SolverStateP);

    state.sat_state = match state.sat_state {
        SatState::Unsat => SatState::Unsat,
        SatState::Sat | SatState::UnsatUnderAssumptions | SatState::Unknown => SatState::Unknown,
    };

    let assumption_state = ctx.part_mut(AssumptionsP);

    assumption_state.assumptions.clear();
    assumption_state.assumptions.extend_from_slice(assumptions);
}

/// Enqueue another assumption if possible.
///
/// Returns whether an assumption was enqueued, whether no assumptions are left or whether the
/// assumptions became conflicting.
pub fn enqueue_assumption(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut AssumptionsP,
        mut ImplGraphP,
        mut TmpDataP,
        mut TrailP,
        ClauseAllocP,
    ),
) -> EnqueueAssumption {
    while let Some(&assumption) = ctx
        .part(AssumptionsP)
        .assumptions
        .get(ctx.part(TrailP).current_level())
    {
        match ctx.part(AssignmentP).lit_value(assumption) {
            Some(false) => {
                analyze_assumption_conflict(ctx.borrow(), assumption);
                return EnqueueAssumption::Conflict;
            }
            Some(true) => {
                // The next assumption is already implied by the previous ones, so we can drop it
                // without opening a decision level.
                let level = ctx.part(TrailP).current_level();
                let assumptions = ctx.part_mut(AssumptionsP);
                assumptions.assumptions.swap_remove(level);
            }
            None => {
                ctx.part_mut(TrailP).new_decision_level();
                enqueue_assignment(ctx.borrow(), assumption, Reason::Unit);
                let (assumptions, ctx) = ctx.split_part_mut(AssumptionsP);
                assumptions.assumption_levels = ctx.part(TrailP).current_level();
                return EnqueueAssumption::Enqueued;
            }
        }
    }
    EnqueueAssumption::Done
}

/// Analyze a conflicting set of assumptions.
///
/// Walks the implication graph backwards from the falsified assumption. Every reached assignment
/// without a reason clause is an assumption of the failed core.
fn analyze_assumption_conflict(
    mut ctx: partial!(
        Context,
        mut AssumptionsP,
        mut TmpDataP,
        ClauseAllocP,
        ImplGraphP,
        TrailP,
    ),
    assumption: Lit,
) {
    let (assumptions, mut ctx) = ctx.split_part_mut(AssumptionsP);
    let (tmp, mut ctx) = ctx.split_part_mut(TmpDataP);
    split_borrow!(lit_ctx = &(ClauseAllocP) ctx);
    let (trail, ctx) = ctx.split_part(TrailP);
    let impl_graph = ctx.part(ImplGraphP);

    let flags = &mut tmp.flags;

    assumptions.failed_core.clear();
    assumptions.failed_core.push(assumption);

    flags[assumption.index()] = true;
    let mut flag_count = 1;

    for &lit in trail.trail().iter().rev() {
        if flags[lit.index()] {
            flags[lit.index()] = false;
            flag_count -= 1;

            match impl_graph.reason(lit.var()) {
                Reason::Unit => {
                    if impl_graph.level(lit.var()) > 0 {
                        assumptions.failed_core.push(lit);
                    }
                }
                reason => {
                    for &reason_lit in reason.lits(&lit_ctx) {
                        if !flags[reason_lit.index()] && impl_graph.level(reason_lit.var()) > 0 {
                            flags[reason_lit.index()] = true;
                            flag_count += 1;
                        }
                    }
                }
            }

            if flag_count == 0 {
                break;
            }
        }
    }
}
