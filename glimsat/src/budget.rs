//! Resource budgets and interruption.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::stats::Stats;

/// Resource constraints checked between conflicts.
///
/// Limits are relative to the state at the start of the current `solve` call. The interrupt flag
/// can be set from other threads or from signal handlers.
#[derive(Default)]
pub struct Budget {
    conflict_limit: Option<u64>,
    propagation_limit: Option<u64>,
    timeout: Option<Duration>,

    conflict_threshold: Option<u64>,
    propagation_threshold: Option<u64>,
    deadline: Option<Instant>,

    interrupt: Arc<AtomicBool>,
}

impl Budget {
    /// Limit the next solve call to the given number of conflicts, propagations and wall-clock
    /// time.
    ///
    /// `None` disables the corresponding limit.
    pub fn set_limits(
        &mut self,
        conflicts: Option<u64>,
        propagations: Option<u64>,
        timeout: Option<Duration>,
    ) {
        self.conflict_limit = conflicts;
        self.propagation_limit = propagations;
        self.timeout = timeout;
    }

    /// Fix the absolute thresholds at the start of a solve call.
    pub fn start(&mut self, stats: &Stats) {
        self.conflict_threshold = self.conflict_limit.map(|limit| stats.conflicts + limit);
        self.propagation_threshold = self
            .propagation_limit
            .map(|limit| stats.propagations + limit);
        self.deadline = self.timeout.map(|timeout| Instant::now() + timeout);
    }

    /// Reset the interrupt flag after an interrupted solve call.
    pub fn clear_interrupt(&self) {
        self.interrupt.store(false, Ordering::Relaxed);
    }

    /// Whether the search is still within all limits.
    pub fn within(&self, stats: &Stats) -> bool {
        if self.interrupt.load(Ordering::Relaxed) {
            return false;
        }
        if let Some(threshold) = self.conflict_threshold {
            if stats.conflicts >= threshold {
                return false;
            }
        }
        if let Some(threshold) = self.propagation_threshold {
            if stats.propagations >= threshold {
                return false;
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return false;
            }
        }
        true
    }

    /// A handle that can interrupt this solver from elsewhere.
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            interrupt: self.interrupt.clone(),
        }
    }
}

/// A cloneable handle interrupting a running solve call.
#[derive(Clone)]
pub struct Interrupter {
    interrupt: Arc<AtomicBool>,
}

impl Interrupter {
    /// Make the solver return `None` at the next conflict boundary.
    ///
    /// This only stores an atomic flag and is safe to call from signal handlers.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_limit_is_relative() {
        let mut budget = Budget::default();
        let mut stats = Stats::default();
        stats.conflicts = 100;

        budget.set_limits(Some(10), None, None);
        budget.start(&stats);

        assert!(budget.within(&stats));
        stats.conflicts = 109;
        assert!(budget.within(&stats));
        stats.conflicts = 110;
        assert!(!budget.within(&stats));
    }

    #[test]
    fn interrupt_flag() {
        let mut budget = Budget::default();
        let stats = Stats::default();
        budget.start(&stats);

        let interrupter = budget.interrupter();
        assert!(budget.within(&stats));
        interrupter.interrupt();
        assert!(!budget.within(&stats));

        budget.clear_interrupt();
        assert!(budget.within(&stats));
    }
}
