//! Solver statistics.

/// Counters tracked during solving.
///
/// Each counter is owned by the component incrementing it and read by the search driver and the
/// frontends.
#[derive(Copy, Clone, Default, Debug)]
pub struct Stats {
    /// Number of conflicts found.
    pub conflicts: u64,
    /// Number of decisions made.
    pub decisions: u64,
    /// Number of propagated assignments.
    pub propagations: u64,
    /// Number of restarts performed.
    pub restarts: u64,
    /// Number of restarts suppressed by the blocking criterion.
    pub blocked_restarts: u64,
    /// Number of clause database reductions.
    pub reductions: u64,
    /// Number of learned clauses deleted by reductions.
    pub reduced_clauses: u64,
    /// Number of literals removed by conflict clause minimization.
    pub minimized_lits: u64,
}
