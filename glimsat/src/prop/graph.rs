//! The implication graph.
use partial_ref::{partial, PartialRef};

use glimsat_formula::lit::LitIdx;
use glimsat_formula::{Lit, Var};

use crate::clause::ClauseRef;
use crate::context::{ClauseAllocP, Context};

/// Assignments that caused a propagation.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Reason {
    /// Decision, assumption or unit clause.
    Unit,
    /// Implicitly stored binary clause, containing the other literal.
    Binary([Lit; 1]),
    /// Long clause with the propagated literal in position 0.
    Long(ClauseRef),
}

impl Reason {
    /// The falsified literals that caused the propagation.
    pub fn lits<'out, 'a, 'b>(&'a self, ctx: &'b partial!('b Context, ClauseAllocP)) -> &'out [Lit]
    where
        'a: 'out,
        'b: 'out,
    {
        match self {
            Reason::Unit => &[],
            Reason::Binary(lit) => lit,
            // The propagated literal is always kept in position 0
            Reason::Long(cref) => &ctx.part(ClauseAllocP).clause(*cref).lits()[1..],
        }
    }

    /// Whether the assignment had no propagating clause.
    pub fn is_unit(&self) -> bool {
        self == &Reason::Unit
    }
}

/// Propagation that resulted in a conflict.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Conflict {
    Binary([Lit; 2]),
    Long(ClauseRef),
}

impl Conflict {
    /// The literals of the conflicting clause.
    pub fn lits<'out, 'a, 'b>(&'a self, ctx: &'b partial!('b Context, ClauseAllocP)) -> &'out [Lit]
    where
        'a: 'out,
        'b: 'out,
    {
        match self {
            Conflict::Binary(lits) => lits,
            Conflict::Long(cref) => ctx.part(ClauseAllocP).clause(*cref).lits(),
        }
    }
}

/// Node and incoming edges of the implication graph.
#[derive(Copy, Clone)]
pub struct ImplNode {
    pub reason: Reason,
    pub level: LitIdx,
}

/// The implication graph.
///
/// A DAG over all assigned variables, with unit clauses, assumptions and decisions as sources.
/// Each propagated assignment has incoming edges from the assignments that made its reason
/// clause propagate.
#[derive(Default)]
pub struct ImplGraph {
    /// Contains only valid data for indices of assigned variables.
    pub nodes: Vec<ImplNode>,
}

impl ImplGraph {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.nodes.resize(
            count,
            ImplNode {
                reason: Reason::Unit,
                level: 0,
            },
        );
    }

    /// Get the reason for an assigned variable.
    ///
    /// Returns stale data if the variable isn't assigned.
    pub fn reason(&self, var: Var) -> &Reason {
        &self.nodes[var.index()].reason
    }

    /// Get the decision level of an assigned variable.
    ///
    /// Returns stale data if the variable isn't assigned.
    pub fn level(&self, var: Var) -> usize {
        self.nodes[var.index()].level as usize
    }

    /// Updates the reason of an assigned variable.
    ///
    /// The reason variables have to be in front of the assigned variable on the trail.
    pub fn update_reason(&mut self, var: Var, reason: Reason) {
        self.nodes[var.index()].reason = reason
    }

    /// Turns the reason of an assigned variable into a unit clause.
    ///
    /// Used when a level 0 propagation is converted into a unit clause, so the propagating clause
    /// can be deleted or collected afterwards.
    pub fn update_removed_unit(&mut self, var: Var) {
        debug_assert_eq!(self.nodes[var.index()].level, 0);
        self.nodes[var.index()].reason = Reason::Unit;
    }
}
