//! Boolean satisfiability solver.
use std::io::{self, Write};
use std::time::Duration;

use partial_ref::{IntoPartialRef, IntoPartialRefMut, PartialRef};

use anyhow::Error;
use log::info;

use glimsat_dimacs::DimacsParser;
use glimsat_formula::{CnfFormula, Lit};

use crate::assumptions::set_assumptions;
use crate::budget::Interrupter;
use crate::config::{ConfigError, SolverConfigUpdate};
use crate::context::{config_changed, ensure_var_count, Context};
use crate::context::{AssignmentP, BudgetP, ProofP, SolverConfigP, SolverStateP, StatsP};
use crate::decision::init_from_formula;
use crate::load::load_clause;
use crate::proof::ProofFormat;
use crate::schedule::schedule_step;
use crate::state::SatState;
use crate::stats::Stats;

/// A boolean satisfiability solver.
#[derive(Default)]
pub struct Solver<'a> {
    ctx: Box<Context<'a>>,
}

impl<'a> Solver<'a> {
    /// Create a new solver.
    pub fn new() -> Solver<'a> {
        Solver::default()
    }

    /// Change the solver configuration.
    pub fn config(&mut self, update: &SolverConfigUpdate) -> Result<(), ConfigError> {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ctx.part_mut(SolverConfigP).merge(update)?;
        config_changed(ctx.borrow(), update);
        Ok(())
    }

    /// Add a formula to the solver.
    ///
    /// The branching heuristic is seeded from the literal occurrences of the formula.
    pub fn add_formula(&mut self, formula: &CnfFormula) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ensure_var_count(ctx.borrow(), formula.var_count());
        init_from_formula(ctx.borrow(), formula);
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }
    }

    /// Add a single clause to the solver.
    ///
    /// Returns false when the formula became trivially unsatisfiable.
    pub fn add_clause(&mut self, lits: &[Lit]) -> bool {
        let mut ctx = self.ctx.into_partial_ref_mut();
        let var_count = lits
            .iter()
            .map(|lit| lit.index() + 1)
            .max()
            .unwrap_or(0);
        ensure_var_count(ctx.borrow(), var_count);
        load_clause(ctx.borrow(), lits);
        ctx.part(SolverStateP).sat_state != SatState::Unsat
    }

    /// Read and add a formula in DIMACS CNF format.
    ///
    /// Using this avoids creating a temporary [`CnfFormula`] for the whole input.
    pub fn add_dimacs_cnf(&mut self, input: impl io::Read) -> Result<(), Error> {
        let parser = DimacsParser::parse_incremental(input, |parser| {
            self.add_formula(&parser.take_formula());
            Ok(())
        })?;

        info!(
            "Parsed formula with {} variables and {} clauses",
            parser.var_count(),
            parser.clause_count()
        );

        Ok(())
    }

    /// Assume the given literals for the next solve call.
    ///
    /// Replaces the assumptions of previous calls.
    pub fn assume(&mut self, assumptions: &[Lit]) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        let var_count = assumptions
            .iter()
            .map(|lit| lit.index() + 1)
            .max()
            .unwrap_or(0);
        ensure_var_count(ctx.borrow(), var_count);
        set_assumptions(ctx.borrow(), assumptions);
    }

    /// Check the satisfiability of the current formula under the current assumptions.
    ///
    /// Returns `None` when the budget was exhausted or the solver was interrupted before a
    /// result was found.
    pub fn solve(&mut self) -> Option<bool> {
        let mut ctx = self.ctx.into_partial_ref_mut();

        {
            let stats = *ctx.part(StatsP);
            ctx.part_mut(BudgetP).start(&stats);
        }

        while ctx.part(SolverStateP).sat_state == SatState::Unknown {
            let stats = *ctx.part(StatsP);
            if !ctx.part(BudgetP).within(&stats) {
                info!("budget exhausted or interrupted, giving up");
                ctx.part(BudgetP).clear_interrupt();
                return None;
            }
            schedule_step(ctx.borrow());
        }

        match ctx.part(SolverStateP).sat_state {
            SatState::Unknown => None,
            SatState::Sat => Some(true),
            SatState::Unsat => {
                ctx.part_mut(ProofP).solve_finished_unsat();
                Some(false)
            }
            SatState::UnsatUnderAssumptions => Some(false),
        }
    }

    /// Set of literals that satisfy the formula.
    ///
    /// Only valid after a solve call returned `Some(true)`.
    pub fn model(&self) -> Option<Vec<Lit>> {
        let ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state == SatState::Sat {
            Some(
                ctx.part(AssignmentP)
                    .assignment()
                    .iter()
                    .enumerate()
                    .flat_map(|(index, assignment)| {
                        assignment.map(|value| Lit::from_index(index, value))
                    })
                    .collect(),
            )
        } else {
            None
        }
    }

    /// Subset of the assumptions that made the formula unsatisfiable.
    ///
    /// Only valid after a solve call returned `Some(false)` with assumptions set.
    pub fn failed_core(&self) -> Option<&[Lit]> {
        let ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state == SatState::UnsatUnderAssumptions {
            Some(self.ctx.assumptions.failed_core())
        } else {
            None
        }
    }

    /// Limit the next solve call to the given number of conflicts, propagations and wall-clock
    /// time.
    pub fn set_budget(
        &mut self,
        conflicts: Option<u64>,
        propagations: Option<u64>,
        timeout: Option<Duration>,
    ) {
        self.ctx.budget.set_limits(conflicts, propagations, timeout);
    }

    /// A handle that can interrupt a running solve call.
    ///
    /// The handle can be moved to other threads and into signal handlers.
    pub fn interrupter(&self) -> Interrupter {
        self.ctx.budget.interrupter()
    }

    /// Write a proof of all clause database mutations to the given target.
    ///
    /// Has to be called before the first clauses are added to cover all derivations.
    pub fn write_proof(&mut self, target: impl Write + 'a, format: ProofFormat) {
        self.ctx.proof.write_proof(target, format);
    }

    /// Stop writing the proof.
    pub fn close_proof(&mut self) {
        self.ctx.proof.close_proof();
    }

    /// The first IO error encountered while writing the proof, if any.
    pub fn proof_io_error(&mut self) -> Option<io::Error> {
        self.ctx.proof.take_io_error()
    }

    /// Counters tracked during solving.
    pub fn stats(&self) -> Stats {
        self.ctx.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;

    use proptest::prelude::*;

    use glimsat_formula::{cnf_formula, lits, test::*, Var};
    use glimsat_dimacs::write_dimacs;

    #[derive(Default)]
    struct SharedBuf(RefCell<Vec<u8>>);

    impl Write for &SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn empty_formula_is_sat() {
        let mut solver = Solver::new();

        assert_eq!(solver.solve(), Some(true));
        assert_eq!(solver.model(), Some(vec![]));
    }

    #[test]
    fn contradicting_units_are_unsat() {
        let buf = SharedBuf::default();
        {
            let mut solver = Solver::new();
            solver.write_proof(&buf, ProofFormat::Drat);

            assert!(solver.add_clause(&lits![1]));
            assert!(!solver.add_clause(&lits![-1]));

            assert_eq!(solver.solve(), Some(false));
            solver.close_proof();
            assert!(solver.proof_io_error().is_none());
        }

        let output = String::from_utf8(buf.0.borrow().clone()).unwrap();
        assert!(output.ends_with("0\n"));
        assert_eq!(output.lines().last(), Some("0"));
    }

    #[test]
    fn all_sign_combinations_of_two_vars_are_unsat() {
        let mut solver = Solver::new();

        solver.add_formula(&cnf_formula![
            1, 2;
            -1, 2;
            1, -2;
            -1, -2;
        ]);

        assert_eq!(solver.solve(), Some(false));

        // two conflicts suffice: the first asserts a unit, the second derives the empty clause
        assert!(solver.stats().conflicts <= 4);
    }

    #[test]
    fn at_most_one_of_three() {
        let mut solver = Solver::new();

        let formula = cnf_formula![
            1, 2, 3;
            -1, -2;
            -2, -3;
            -1, -3;
        ];

        solver.add_formula(&formula);

        assert_eq!(solver.solve(), Some(true));

        let model = solver.model().unwrap();

        for clause in formula.iter() {
            assert!(clause.iter().any(|lit| model.contains(lit)));
        }

        // at most one of the three variables may be true
        let negative = lits![-1, -2, -3]
            .iter()
            .filter(|&&lit| model.contains(&lit))
            .count();
        assert!(negative >= 2);
    }

    #[test]
    fn pigeon_hole_3_2_is_unsat() {
        let mut solver = Solver::new();

        // variable 2 * pigeon + hole, for three pigeons and two holes
        solver.add_formula(&cnf_formula![
            1, 2;
            3, 4;
            5, 6;
            -1, -3;
            -1, -5;
            -3, -5;
            -2, -4;
            -2, -6;
            -4, -6;
        ]);

        assert_eq!(solver.solve(), Some(false));
    }

    #[test]
    fn assumptions_restrict_the_search() {
        let mut solver = Solver::new();

        solver.add_formula(&cnf_formula![
            1, 2;
            -2, 3;
        ]);

        solver.assume(&lits![-1]);
        assert_eq!(solver.solve(), Some(true));

        let model = solver.model().unwrap();
        assert!(model.contains(&Lit::from_dimacs(2)));
        assert!(model.contains(&Lit::from_dimacs(3)));

        solver.assume(&lits![-1, -3]);
        assert_eq!(solver.solve(), Some(false));

        let core = solver.failed_core().unwrap();
        assert!(!core.is_empty());
        for lit in core.iter() {
            assert!(lits![-1, -3].contains(lit));
        }

        // without assumptions the formula stays satisfiable
        solver.assume(&[]);
        assert_eq!(solver.solve(), Some(true));
    }

    #[test]
    fn conflict_budget_reports_unknown() {
        use proptest::strategy::ValueTree;

        let mut solver = Solver::new();

        let formula = sgen_unsat_formula(4..5usize)
            .new_tree(&mut proptest::test_runner::TestRunner::deterministic())
            .unwrap()
            .current();

        solver.add_formula(&formula);
        solver.set_budget(Some(1), None, None);

        assert_eq!(solver.solve(), None);

        // without the budget the result is found
        solver.set_budget(None, None, None);
        assert_eq!(solver.solve(), Some(false));
    }

    #[test]
    fn interrupter_stops_the_search() {
        let mut solver = Solver::new();

        solver.add_formula(&cnf_formula![
            1, 2;
            -2, 3;
        ]);

        solver.interrupter().interrupt();
        assert_eq!(solver.solve(), None);

        // the flag is cleared when solving starts again
        assert_eq!(solver.solve(), Some(true));
    }

    proptest! {
        #[test]
        fn sgen_unsat(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Some(false));
        }

        #[test]
        fn sgen_unsat_certified(formula in sgen_unsat_formula(1..5usize)) {
            let buf = SharedBuf::default();
            {
                let mut solver = Solver::new();
                solver.write_proof(&buf, ProofFormat::Drat);

                solver.add_formula(&formula);

                prop_assert_eq!(solver.solve(), Some(false));
                solver.close_proof();
            }

            let output = String::from_utf8(buf.0.borrow().clone()).unwrap();
            prop_assert_eq!(output.lines().last(), Some("0"));
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Some(true));

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn sat_via_dimacs(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            let mut dimacs = vec![];

            write_dimacs(&mut dimacs, &formula).unwrap();

            solver.add_dimacs_cnf(&mut &dimacs[..]).unwrap();

            prop_assert_eq!(solver.solve(), Some(true));

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn pigeon_hole_unsat_assumption_core(
            (enable_row, columns, formula) in conditional_pigeon_hole(1..5usize, 1..5usize),
        ) {
            let mut solver = Solver::new();
            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Some(true));

            let mut assumptions = enable_row.clone();
            assumptions.push(Lit::positive(Var::from_index(formula.var_count() + 10)));

            solver.assume(&assumptions);

            prop_assert_eq!(solver.solve(), Some(false));

            let mut candidates = solver.failed_core().unwrap().to_owned();
            let mut core: Vec<Lit> = vec![];

            while !candidates.is_empty() {
                solver.assume(&candidates[0..candidates.len() - 1]);

                match solver.solve() {
                    None => unreachable!(),
                    Some(true) => {
                        let skipped = *candidates.last().unwrap();
                        core.push(skipped);
                        solver.add_clause(&[skipped]);
                        candidates.pop();
                    }
                    Some(false) => {
                        candidates = solver.failed_core().unwrap().to_owned();
                    }
                }
            }

            prop_assert_eq!(core.len(), columns + 1);
        }
    }
}
