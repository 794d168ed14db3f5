//! Temporary data.
use glimsat_formula::Lit;

/// Temporary data used by various parts of the solver.
///
/// The `flags` buffer is shared between LBD computation, binary minimization and the final
/// conflict analysis. Every user has to reset the entries it sets before returning.
#[derive(Default)]
pub struct TmpData {
    pub lits: Vec<Lit>,
    pub lits_2: Vec<Lit>,
    /// Scratch flags, indexed by variable index, literal code or decision level.
    ///
    /// Reset to all-false, keep size.
    pub flags: Vec<bool>,
}

impl TmpData {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.flags.resize(count * 2, false);
    }
}
