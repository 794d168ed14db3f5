//! The VSIDS branching heuristic.
//!
//! VSIDS (Variable State Independent Decaying Sum) keeps an activity per variable. On every
//! conflict the variables involved in the analysis are bumped by a constant increment, and the
//! activities of all variables decay by a factor below one. Decisions branch on the unassigned
//! variable with the highest activity.
//!
//! Like Minisat and its descendants we bump all variables of the conflict clause and all
//! variables resolved on during conflict analysis.

use ordered_float::OrderedFloat;

use glimsat_formula::Var;

use crate::config::SolverConfig;
use crate::prop::Assignment;

/// The VSIDS branching heuristic.
///
/// Instead of decaying all activities on every conflict, the bump increment is divided by the
/// decay factor. When a value would overflow, all activities and the increment are scaled down.
/// Up to that shared scaling factor this is equivalent to the naive implementation, and only the
/// order of activities matters.
pub struct Vsids {
    /// The activity of each variable.
    activity: Vec<OrderedFloat<f32>>,
    /// Whether a variable may be picked by `make_decision`.
    eligible: Vec<bool>,
    /// A binary max-heap of the variables.
    heap: Vec<Var>,
    /// The position in the binary heap for each variable.
    position: Vec<Option<usize>>,
    /// The value to add on bumping.
    bump: f32,
    /// The inverse of the decay factor.
    inv_decay: f32,
}

impl Default for Vsids {
    fn default() -> Vsids {
        Vsids {
            activity: vec![],
            eligible: vec![],
            heap: vec![],
            position: vec![],
            bump: 1.0,
            inv_decay: 1.0 / SolverConfig::default().var_decay,
        }
    }
}

impl Vsids {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        let old_count = self.activity.len();
        debug_assert!(!self.heap.iter().any(|&v| v.index() >= count));
        self.activity.resize(count, OrderedFloat(0.0));
        self.eligible.resize(count, true);
        self.position.resize(count, None);

        for i in old_count..count {
            self.make_available(Var::from_index(i));
        }
    }

    /// Rescale activities if any value exceeds this value.
    fn rescale_limit() -> f32 {
        std::f32::MAX / 16.0
    }

    /// Change the decay factor.
    pub fn set_decay(&mut self, decay: f32) {
        assert!(decay < 1.0);
        assert!(decay > 1.0 / 16.0);
        self.inv_decay = 1.0 / decay;
    }

    /// Bump a variable by increasing its activity.
    pub fn bump(&mut self, var: Var) {
        let rescale = {
            let value = &mut self.activity[var.index()];
            value.0 += self.bump;
            value.0 >= Self::rescale_limit()
        };
        if rescale {
            self.rescale();
        }
        if let Some(pos) = self.position[var.index()] {
            self.sift_up(pos);
        }
    }

    /// Decay all variable activities.
    pub fn decay(&mut self) {
        self.bump *= self.inv_decay;
        if self.bump >= Self::rescale_limit() {
            self.rescale();
        }
    }

    /// Rescale all values to avoid an overflow.
    fn rescale(&mut self) {
        let rescale_factor = 1.0 / Self::rescale_limit();
        for activity in &mut self.activity {
            activity.0 *= rescale_factor;
        }
        self.bump *= rescale_factor;
    }

    /// Raise the activity of a variable to at least the given value.
    ///
    /// Lower values are ignored, so seeding never undoes bumps or previous seeds. As the
    /// activity can only increase, fixing the heap position is a sift towards the root.
    pub fn seed_activity(&mut self, var: Var, activity: f32) {
        if activity <= self.activity[var.index()].0 {
            return;
        }
        self.activity[var.index()] = OrderedFloat(activity);
        if let Some(pos) = self.position[var.index()] {
            self.sift_up(pos);
        }
    }

    /// Whether a variable may be used as a decision variable.
    pub fn is_eligible(&self, var: Var) -> bool {
        self.eligible[var.index()]
    }

    /// Control whether a variable may be used as a decision variable.
    ///
    /// Ineligible variables already in the heap are skipped when they surface.
    pub fn set_eligible(&mut self, var: Var, eligible: bool) {
        self.eligible[var.index()] = eligible;
        if eligible {
            self.make_available(var);
        }
    }

    /// Insert an eligible variable into the heap if not already present.
    pub fn make_available(&mut self, var: Var) {
        if self.position[var.index()].is_none() && self.eligible[var.index()] {
            let position = self.heap.len();
            self.position[var.index()] = Some(position);
            self.heap.push(var);
            self.sift_up(position);
        }
    }

    /// Rebuild the heap from all eligible unassigned variables.
    pub fn rebuild(&mut self, assignment: &Assignment) {
        while let Some(var) = self.heap.pop() {
            self.position[var.index()] = None;
        }

        for index in 0..self.activity.len() {
            let var = Var::from_index(index);
            if assignment.var_value(var).is_none() {
                self.make_available(var);
            }
        }
    }

    /// Move a variable closer to the root until the heap property is satisfied.
    fn sift_up(&mut self, mut pos: usize) {
        let var = self.heap[pos];
        loop {
            if pos == 0 {
                return;
            }
            let parent_pos = (pos - 1) / 2;
            let parent_var = self.heap[parent_pos];
            if self.activity[parent_var.index()] >= self.activity[var.index()] {
                return;
            }
            self.position[var.index()] = Some(parent_pos);
            self.heap[parent_pos] = var;
            self.position[parent_var.index()] = Some(pos);
            self.heap[pos] = parent_var;
            pos = parent_pos;
        }
    }

    /// Move a variable away from the root until the heap property is satisfied.
    fn sift_down(&mut self, mut pos: usize) {
        let var = self.heap[pos];
        loop {
            let mut largest_pos = pos;
            let mut largest_var = var;

            let left_pos = pos * 2 + 1;
            if left_pos < self.heap.len() {
                let left_var = self.heap[left_pos];

                if self.activity[largest_var.index()] < self.activity[left_var.index()] {
                    largest_pos = left_pos;
                    largest_var = left_var;
                }
            }

            let right_pos = pos * 2 + 2;
            if right_pos < self.heap.len() {
                let right_var = self.heap[right_pos];

                if self.activity[largest_var.index()] < self.activity[right_var.index()] {
                    largest_pos = right_pos;
                    largest_var = right_var;
                }
            }

            if largest_pos == pos {
                return;
            }

            self.position[var.index()] = Some(largest_pos);
            self.heap[largest_pos] = var;
            self.position[largest_var.index()] = Some(pos);
            self.heap[pos] = largest_var;
            pos = largest_pos;
        }
    }
}

impl Iterator for Vsids {
    type Item = Var;

    fn next(&mut self) -> Option<Var> {
        if self.heap.is_empty() {
            None
        } else {
            let var = self.heap.swap_remove(0);
            if !self.heap.is_empty() {
                let top_var = self.heap[0];
                self.position[top_var.index()] = Some(0);
                self.sift_down(0);
            }
            self.position[var.index()] = None;
            Some(var)
        }
    }
}
