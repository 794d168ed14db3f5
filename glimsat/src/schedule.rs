//! Scheduling of restarts, reductions and simplification around the search.
use log::info;

use partial_ref::{partial, PartialRef};

use crate::cdcl::conflict_step;
use crate::clause::{collect_garbage, reduce_learned};
use crate::config::SolverConfig;
use crate::context::{
    AnalyzeConflictP, AssignmentP, AssumptionsP, BinaryClausesP, ClauseActivityP, ClauseAllocP,
    ClauseDbP, Context, ImplGraphP, ProofP, ScheduleP, SolverConfigP, SolverStateP, StatsP,
    TmpDataP, TrailP, VsidsP, WatchlistsP,
};
use crate::prop::{full_restart, propagate, restart};
use crate::simplify::{prove_units, simplify};
use crate::state::SatState;

mod average;

use average::BoundedAverage;

/// Number of conflicts between progress log lines.
const LOG_INTERVAL: u64 = 5000;

/// Scheduling of restarts, reductions and simplification.
///
/// Restarts follow the dynamic policy of Glucose: when the recently learned clauses have a worse
/// LBD than the long term average, the current search path is unlikely to be productive and is
/// abandoned. A restart is suppressed while the trail grows unusually large, as that indicates
/// progress towards a satisfying assignment.
pub struct Schedule {
    /// Conflict count threshold for the next clause database reduction.
    next_reduce: u64,
    /// Number of performed reductions.
    reduce_count: u64,
    /// Conflict count threshold for the next progress log line.
    next_log: u64,
    /// Conflict count threshold for the next variable decay adjustment.
    next_decay_ramp: u64,
    /// Current variable activity decay, ramped towards the configured maximum.
    current_var_decay: f32,
    /// LBDs of the most recent learned clauses.
    lbd_window: BoundedAverage,
    /// Trail sizes at the most recent conflicts.
    trail_window: BoundedAverage,
    /// Sum of all learned clause LBDs.
    sum_lbd: u64,
}

impl Default for Schedule {
    fn default() -> Schedule {
        let config = SolverConfig::default();
        Schedule {
            next_reduce: config.reduce_base,
            reduce_count: 0,
            next_log: LOG_INTERVAL,
            next_decay_ramp: config.var_decay_ramp_interval,
            current_var_decay: config.var_decay,
            lbd_window: BoundedAverage::new(config.restart_lbd_window),
            trail_window: BoundedAverage::new(config.restart_trail_window),
            sum_lbd: 0,
        }
    }
}

impl Schedule {
    /// Reset the ramped variable decay after a configuration change.
    pub fn set_var_decay(&mut self, var_decay: f32) {
        self.current_var_decay = var_decay;
    }

    /// Record a conflict and its learned clause LBD.
    ///
    /// Has to be called before backtracking, with the trail size at conflict time. Returns true
    /// when a pending restart was blocked because the trail indicates assignment progress.
    pub fn note_conflict(
        &mut self,
        lbd: u64,
        trail_len: u64,
        config: &SolverConfig,
        conflicts: u64,
    ) -> bool {
        self.trail_window.push(trail_len);

        let mut blocked = false;

        if conflicts > config.restart_blocking_min_conflicts
            && self.lbd_window.is_full()
            && trail_len as f64 > config.restart_blocking_r * self.trail_window.average()
        {
            self.lbd_window.clear();
            blocked = true;
        }

        self.lbd_window.push(lbd);
        self.sum_lbd += lbd;

        blocked
    }

    /// Whether the recent learned clause quality asks for a restart.
    fn restart_pending(&self, config: &SolverConfig, conflicts: u64) -> bool {
        conflicts > 0
            && self.lbd_window.is_full()
            && self.lbd_window.average() * config.restart_k > self.sum_lbd as f64 / conflicts as f64
    }

    /// A restart was performed, start a fresh restart window.
    fn note_restart(&mut self) {
        self.lbd_window.clear();
    }
}

/// Perform one step of the schedule.
///
/// Returns false when solving is done.
pub fn schedule_step<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut AssumptionsP,
        mut BinaryClausesP,
        mut ClauseActivityP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut ProofP<'a>,
        mut ScheduleP,
        mut SolverStateP,
        mut StatsP,
        mut TmpDataP,
        mut TrailP,
        mut VsidsP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) -> bool {
    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return false;
    }

    let conflicts = ctx.part(StatsP).conflicts;

    if conflicts >= ctx.part(ScheduleP).next_log {
        ctx.part_mut(ScheduleP).next_log = conflicts - conflicts % LOG_INTERVAL + LOG_INTERVAL;

        let stats = ctx.part(StatsP);
        let db = ctx.part(ClauseDbP);
        let units = ctx.part(TrailP).top_level_assignment_count();
        info!(
            "confl: {}k rest: {} (blocked: {}) free vars: {} bin: {} irred: {} red: {}",
            conflicts / 1000,
            stats.restarts,
            stats.blocked_restarts,
            ctx.part(AssignmentP).assignment().len() - units,
            ctx.part(BinaryClausesP).count(),
            db.irredundant_count(),
            db.redundant_count(),
        );
    }

    if conflicts >= ctx.part(ScheduleP).next_decay_ramp {
        let interval = ctx.part(SolverConfigP).var_decay_ramp_interval;
        let step = ctx.part(SolverConfigP).var_decay_ramp_step;
        let max_decay = ctx.part(SolverConfigP).max_var_decay;

        let schedule = ctx.part_mut(ScheduleP);
        schedule.next_decay_ramp = conflicts + interval;
        if schedule.current_var_decay < max_decay {
            schedule.current_var_decay = (schedule.current_var_decay + step).min(max_decay);
            let new_decay = schedule.current_var_decay;
            ctx.part_mut(VsidsP).set_decay(new_decay);
        }
    }

    if ctx
        .part(ScheduleP)
        .restart_pending(ctx.part(SolverConfigP), conflicts)
    {
        restart(ctx.borrow());
        ctx.part_mut(ScheduleP).note_restart();
        ctx.part_mut(StatsP).restarts += 1;
    }

    if conflicts >= ctx.part(ScheduleP).next_reduce {
        {
            let reduce_base = ctx.part(SolverConfigP).reduce_base;
            let reduce_inc = ctx.part(SolverConfigP).reduce_inc;
            let schedule = ctx.part_mut(ScheduleP);
            schedule.reduce_count += 1;
            schedule.next_reduce += reduce_base + reduce_inc * schedule.reduce_count;
        }

        // Reductions only happen at level 0, where no clause serves as a reason.
        full_restart(ctx.borrow());
        if propagate(ctx.borrow()).is_err() {
            // Conflict without any decisions, the formula is unsatisfiable
            ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
            return true;
        }
        prove_units(ctx.borrow());
        simplify(ctx.borrow());
        reduce_learned(ctx.borrow());
        collect_garbage(ctx.borrow());

        let (vsids, ctx) = ctx.split_part_mut(VsidsP);
        vsids.rebuild(ctx.part(AssignmentP));
    }

    conflict_step(ctx.borrow());
    true
}
