//! Learns a new clause by analyzing a conflict.
use std::mem::swap;

use partial_ref::{partial, split_borrow, PartialRef};

use vec_mut_scan::VecMutScan;

use glimsat_formula::{Lit, Var};

use crate::clause::ClauseRef;
use crate::context::{
    AnalyzeConflictP, AssignmentP, BinaryClausesP, ClauseAllocP, Context, ImplGraphP,
    SolverConfigP, StatsP, TmpDataP, TrailP, VsidsP,
};
use crate::prop::{Conflict, Reason};

/// Temporaries for conflict analysis.
#[derive(Default)]
pub struct AnalyzeConflict {
    /// This is the learned clause after analysis finishes.
    clause: Vec<Lit>,
    /// Number of literals of the current level in the current clause.
    current_level_count: usize,
    /// Variables in the current clause.
    var_flags: Vec<bool>,
    /// Entries to clean in `var_flags`.
    to_clean: Vec<Var>,
    /// Long clauses resolved on during the conflict.
    involved: Vec<ClauseRef>,
    /// Stack for recursive minimization.
    stack: Vec<Lit>,
}

impl AnalyzeConflict {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.var_flags.resize(count, false);
    }

    /// The learned clause.
    ///
    /// The asserting literal is in position 0 and a literal of the backtrack level in position 1.
    pub fn clause(&self) -> &[Lit] {
        &self.clause
    }

    /// Long clauses involved in the conflict.
    pub fn involved(&self) -> &[ClauseRef] {
        &self.involved
    }
}

/// Learns a new clause by analyzing a conflict.
///
/// Returns the lowest decision level that makes the learned clause asserting.
pub fn analyze_conflict(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut StatsP,
        mut TmpDataP,
        mut VsidsP,
        AssignmentP,
        BinaryClausesP,
        ClauseAllocP,
        ImplGraphP,
        SolverConfigP,
        TrailP,
    ),
    conflict: Conflict,
) -> usize {
    split_borrow!(lit_ctx = &(ClauseAllocP) ctx);

    {
        let analyze = ctx.part_mut(AnalyzeConflictP);

        analyze.clause.clear();
        analyze.involved.clear();
        analyze.current_level_count = 0;
    }

    if ctx.part(TrailP).current_level() == 0 {
        // Conflict without any decisions, the formula implies the empty clause
        return 0;
    }

    // We start with all literals of the conflicting clause
    for &lit in conflict.lits(&lit_ctx) {
        add_literal(ctx.borrow(), lit);
    }

    if let Conflict::Long(cref) = conflict {
        ctx.part_mut(AnalyzeConflictP).involved.push(cref);
    }

    // To get rid of all but one literal of the current level, we resolve the clause with the
    // reasons of those literals, in reverse chronological order.

    split_borrow!(ctx_trail = &(TrailP) ctx);

    for &lit in ctx_trail.part(TrailP).trail().iter().rev() {
        let analyze = ctx.part_mut(AnalyzeConflictP);
        let lit_present = &mut analyze.var_flags[lit.index()];
        // Is the lit present in the current clause?
        if *lit_present {
            *lit_present = false;
            analyze.current_level_count -= 1;
            if analyze.current_level_count == 0 {
                // lit is the last literal of the current level present in the current clause,
                // so the resulting clause asserts !lit and we put it into position 0.
                analyze.clause.push(!lit);
                let end = analyze.clause.len() - 1;
                analyze.clause.swap(0, end);

                break;
            } else {
                // We removed the literal and add its reason instead.
                let (graph, mut ctx) = ctx.split_part(ImplGraphP);

                let reason = graph.reason(lit.var());

                for &lit in reason.lits(&lit_ctx) {
                    add_literal(ctx.borrow(), lit);
                }

                if let &Reason::Long(cref) = reason {
                    ctx.part_mut(AnalyzeConflictP).involved.push(cref);
                }
            }
        }
    }

    let unminimized_len = ctx.part(AnalyzeConflictP).clause.len();

    // This needs var_flags set and keeps some var_flags set.
    minimize_clause(ctx.borrow());

    {
        let analyze = ctx.part_mut(AnalyzeConflictP);
        for var in analyze.to_clean.drain(..) {
            analyze.var_flags[var.index()] = false;
        }
    }

    minimize_binary(ctx.borrow());

    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);

    ctx.part_mut(StatsP).minimized_lits += (unminimized_len - analyze.clause.len()) as u64;

    // We find the highest level literal besides the asserting literal and move it into
    // position 1. This is important to ensure the watchlist constraints are not violated on
    // backtracking.
    let mut backtrack_to = 0;

    if analyze.clause.len() > 1 {
        let (prefix, rest) = analyze.clause.split_at_mut(2);
        let lit_1 = &mut prefix[1];
        backtrack_to = ctx.part(ImplGraphP).level(lit_1.var());
        for lit in rest.iter_mut() {
            let lit_level = ctx.part(ImplGraphP).level(lit.var());
            if lit_level > backtrack_to {
                backtrack_to = lit_level;
                swap(lit_1, lit);
            }
        }
    }

    ctx.part_mut(VsidsP).decay();

    backtrack_to
}

/// Add a literal to the current clause.
fn add_literal(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut VsidsP,
        ImplGraphP,
        TrailP
    ),
    lit: Lit,
) {
    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);
    let lit_level = ctx.part(ImplGraphP).level(lit.var());
    // No need to add literals that are set by unit clauses or already present
    if lit_level > 0 && !analyze.var_flags[lit.index()] {
        ctx.part_mut(VsidsP).bump(lit.var());

        analyze.var_flags[lit.index()] = true;
        if lit_level == ctx.part(TrailP).current_level() {
            analyze.current_level_count += 1;
        } else {
            analyze.clause.push(lit);
            analyze.to_clean.push(lit.var());
        }
    }
}

/// A Bloom filter of levels.
#[derive(Default)]
struct LevelAbstraction {
    bits: u64,
}

impl LevelAbstraction {
    /// Add a level to the Bloom filter.
    pub fn add(&mut self, level: usize) {
        self.bits |= 1 << (level % 64)
    }

    /// Test whether a level could be in the Bloom filter.
    pub fn test(&self, level: usize) -> bool {
        self.bits & (1 << (level % 64)) != 0
    }
}

/// Performs recursive clause minimization.
///
/// **Note:** Requires AnalyzeConflict's var_flags to be set for exactly the variables of the
/// unminimized clause. This sets some more var_flags, but lists them in to_clean.
///
/// This removes literals of the learned clause that are already implied by other literals of the
/// clause. Such literals are found by a DFS in the implication graph (following edges in
/// reverse) for each literal apart from the asserting one. The search doesn't expand literals
/// already known to be implied by clause literals. When it reaches a decision that is not in the
/// clause, the candidate literal is not redundant.
///
/// Two optimizations: the search stops as soon as it sees a literal whose decision level is not
/// among the clause's decision levels, since continuing from there would eventually reach the
/// decision of that level, which cannot be in the clause. The level check uses a Bloom filter
/// over the involved levels. Second, work is shared between the individual searches through
/// var_flags: when a literal turns out redundant, everything visited during its search is known
/// redundant and stays flagged, so later searches treat those literals as clause literals. When
/// a literal is not redundant, the flags set during its search are reverted (using the to_clean
/// entries past the recorded high water mark).
fn minimize_clause(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        ClauseAllocP,
        ImplGraphP,
        TrailP
    ),
) {
    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);
    split_borrow!(lit_ctx = &(ClauseAllocP) ctx);
    let impl_graph = ctx.part(ImplGraphP);

    let mut involved_levels = LevelAbstraction::default();

    for &lit in analyze.clause.iter() {
        involved_levels.add(impl_graph.level(lit.var()));
    }

    let mut scan = VecMutScan::new(&mut analyze.clause);

    // we always keep the asserting literal
    scan.next();

    'next_lit: while let Some(lit) = scan.next() {
        if impl_graph.reason(lit.var()) == &Reason::Unit {
            continue;
        }

        // Start the DFS
        analyze.stack.clear();
        analyze.stack.push(!*lit);

        // Used to remember which var_flags were set during this DFS
        let top = analyze.to_clean.len();

        while let Some(lit) = analyze.stack.pop() {
            let reason = impl_graph.reason(lit.var());

            for &reason_lit in reason.lits(&lit_ctx) {
                let reason_level = impl_graph.level(reason_lit.var());

                if !analyze.var_flags[reason_lit.index()] && reason_level > 0 {
                    // reason_lit is not known to be redundant, not visited yet and not implied
                    // by unit clauses.

                    if impl_graph.reason(reason_lit.var()) == &Reason::Unit
                        || !involved_levels.test(reason_level)
                    {
                        // reason_lit is a decision not in the clause or in a decision level
                        // known not to be in the clause. Abort the search.

                        // Reset the var_flags set during _this_ DFS.
                        for lit in analyze.to_clean.drain(top..) {
                            analyze.var_flags[lit.index()] = false;
                        }
                        continue 'next_lit;
                    } else {
                        analyze.var_flags[reason_lit.index()] = true;
                        analyze.to_clean.push(reason_lit.var());
                        analyze.stack.push(!reason_lit);
                    }
                }
            }
        }

        lit.remove();
    }
}

/// Performs minimization with binary clauses.
///
/// A learned clause literal `l` can be dropped when some binary clause `{clause[0], ¬l}` exists
/// and `¬l` is currently true: resolving the two clauses removes `l` and reintroduces only the
/// asserting literal. The binary implication list of the asserting literal's negation contains
/// exactly the candidates. Only applied to sufficiently small clauses, as it tends to be
/// worthless for large ones.
fn minimize_binary(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut TmpDataP,
        AssignmentP,
        BinaryClausesP,
        SolverConfigP,
    ),
) {
    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);

    if analyze.clause.len() < 2 || analyze.clause.len() > ctx.part(SolverConfigP).binary_minimize_limit
    {
        return;
    }

    let (tmp, ctx) = ctx.split_part_mut(TmpDataP);
    let flags = &mut tmp.flags;
    let assignment = ctx.part(AssignmentP);
    let binary_clauses = ctx.part(BinaryClausesP);

    let asserting = analyze.clause[0];

    let mut minimize = false;
    for &implied in binary_clauses.implied(!asserting) {
        if assignment.lit_is_true(implied) {
            flags[implied.index()] = true;
            minimize = true;
        }
    }

    if minimize {
        let mut write = 1;
        for read in 1..analyze.clause.len() {
            let lit = analyze.clause[read];
            if !flags[lit.index()] {
                analyze.clause[write] = lit;
                write += 1;
            }
        }
        analyze.clause.truncate(write);

        for &implied in binary_clauses.implied(!asserting) {
            flags[implied.index()] = false;
        }
    }
}
