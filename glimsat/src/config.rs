//! Solver configuration.
use serde::Deserialize;
use thiserror::Error;

/// Configurable parameters used during solving.
///
/// The restart window lengths are fixed when the solver is created and cannot be changed
/// afterwards.
pub struct SolverConfig {
    /// Initial multiplicative decay for variable activities. (Default: 0.8)
    pub var_decay: f32,

    /// Final multiplicative decay for variable activities. (Default: 0.95)
    ///
    /// The decay is tightened from `var_decay` towards this value while conflicts accumulate.
    pub max_var_decay: f32,

    /// Number of conflicts between variable decay adjustments. (Default: 5000)
    pub var_decay_ramp_interval: u64,

    /// Increase of the variable decay per adjustment. (Default: 0.01)
    pub var_decay_ramp_step: f32,

    /// Multiplicative decay for clause activities. (Default: 0.999)
    pub clause_activity_decay: f32,

    /// Scaling factor of the recent-LBD average for dynamic restarts. (Default: 0.8)
    ///
    /// A restart is triggered when the recent LBD average scaled by this factor exceeds the
    /// long-term LBD average.
    pub restart_k: f64,

    /// Trail size factor for blocking restarts. (Default: 1.4)
    pub restart_blocking_r: f64,

    /// Number of recent learned clause LBDs tracked for restarts. (Default: 50)
    pub restart_lbd_window: usize,

    /// Number of recent conflict trail sizes tracked for restart blocking. (Default: 5000)
    pub restart_trail_window: usize,

    /// Number of conflicts before restart blocking kicks in. (Default: 10000)
    pub restart_blocking_min_conflicts: u64,

    /// Largest LBD of learned clauses that are never deleted. (Default: 3)
    pub persistent_lbd: usize,

    /// Keep the complete median-LBD band when reducing the clause database. (Default: false)
    pub keep_median_lbd: bool,

    /// Recompute the LBD of clauses involved in a conflict. (Default: true)
    pub recalculate_lbd: bool,

    /// Largest learned clause size for binary-clause minimization. (Default: 30)
    pub binary_minimize_limit: usize,

    /// Number of conflicts before the first clause database reduction. (Default: 2000)
    pub reduce_base: u64,

    /// Increase of the reduction interval per performed reduction. (Default: 300)
    pub reduce_inc: u64,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            var_decay: 0.8,
            max_var_decay: 0.95,
            var_decay_ramp_interval: 5000,
            var_decay_ramp_step: 0.01,
            clause_activity_decay: 0.999,
            restart_k: 0.8,
            restart_blocking_r: 1.4,
            restart_lbd_window: 50,
            restart_trail_window: 5000,
            restart_blocking_min_conflicts: 10000,
            persistent_lbd: 3,
            keep_median_lbd: false,
            recalculate_lbd: true,
            binary_minimize_limit: 30,
            reduce_base: 2000,
            reduce_inc: 300,
        }
    }
}

/// Error raised when a configuration update is rejected.
#[derive(Debug, Error)]
#[error("configuration value out of range: {option}")]
pub struct ConfigError {
    pub option: &'static str,
}

macro_rules! merge_options {
    ($config:ident, $update:ident, $( $name:ident ),* ) => {
        $(
            if let Some(value) = $update.$name {
                $config.$name = value;
            }
        )*
    };
}

impl SolverConfig {
    /// Apply a partial update to this configuration.
    pub fn merge(&mut self, update: &SolverConfigUpdate) -> Result<(), ConfigError> {
        update.validate()?;

        let config = self;
        merge_options!(
            config,
            update,
            var_decay,
            max_var_decay,
            var_decay_ramp_interval,
            var_decay_ramp_step,
            clause_activity_decay,
            restart_k,
            restart_blocking_r,
            restart_blocking_min_conflicts,
            persistent_lbd,
            keep_median_lbd,
            recalculate_lbd,
            binary_minimize_limit,
            reduce_base,
            reduce_inc
        );
        Ok(())
    }

    /// A listing of all options with their default values.
    pub fn help() -> String {
        let defaults = SolverConfig::default();
        format!(
            concat!(
                "solver options (-C <option>=<value>):\n",
                "  var_decay                      initial variable activity decay (default {})\n",
                "  max_var_decay                  final variable activity decay (default {})\n",
                "  var_decay_ramp_interval        conflicts between decay adjustments (default {})\n",
                "  var_decay_ramp_step            decay increase per adjustment (default {})\n",
                "  clause_activity_decay          clause activity decay (default {})\n",
                "  restart_k                      recent-LBD scaling for restarts (default {})\n",
                "  restart_blocking_r             trail size factor blocking restarts (default {})\n",
                "  restart_blocking_min_conflicts conflicts before blocking kicks in (default {})\n",
                "  persistent_lbd                 largest LBD never deleted (default {})\n",
                "  keep_median_lbd                keep the median LBD band on reduction (default {})\n",
                "  recalculate_lbd                recompute LBDs of involved clauses (default {})\n",
                "  binary_minimize_limit          size limit for binary minimization (default {})\n",
                "  reduce_base                    conflicts before the first reduction (default {})\n",
                "  reduce_inc                     reduction interval increase (default {})\n",
            ),
            defaults.var_decay,
            defaults.max_var_decay,
            defaults.var_decay_ramp_interval,
            defaults.var_decay_ramp_step,
            defaults.clause_activity_decay,
            defaults.restart_k,
            defaults.restart_blocking_r,
            defaults.restart_blocking_min_conflicts,
            defaults.persistent_lbd,
            defaults.keep_median_lbd,
            defaults.recalculate_lbd,
            defaults.binary_minimize_limit,
            defaults.reduce_base,
            defaults.reduce_inc,
        )
    }
}

/// A partial update of a [`SolverConfig`].
///
/// The restart window lengths are not updatable.
#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfigUpdate {
    pub var_decay: Option<f32>,
    pub max_var_decay: Option<f32>,
    pub var_decay_ramp_interval: Option<u64>,
    pub var_decay_ramp_step: Option<f32>,
    pub clause_activity_decay: Option<f32>,
    pub restart_k: Option<f64>,
    pub restart_blocking_r: Option<f64>,
    pub restart_blocking_min_conflicts: Option<u64>,
    pub persistent_lbd: Option<usize>,
    pub keep_median_lbd: Option<bool>,
    pub recalculate_lbd: Option<bool>,
    pub binary_minimize_limit: Option<usize>,
    pub reduce_base: Option<u64>,
    pub reduce_inc: Option<u64>,
}

impl SolverConfigUpdate {
    /// Create an empty update.
    pub fn new() -> SolverConfigUpdate {
        SolverConfigUpdate::default()
    }

    /// Combine two updates, with values of `other` taking precedence.
    pub fn merge(&mut self, other: SolverConfigUpdate) {
        macro_rules! merge_update {
            ($( $name:ident ),*) => {
                $(
                    if let Some(value) = other.$name {
                        self.$name = Some(value);
                    }
                )*
            }
        }

        merge_update!(
            var_decay,
            max_var_decay,
            var_decay_ramp_interval,
            var_decay_ramp_step,
            clause_activity_decay,
            restart_k,
            restart_blocking_r,
            restart_blocking_min_conflicts,
            persistent_lbd,
            keep_median_lbd,
            recalculate_lbd,
            binary_minimize_limit,
            reduce_base,
            reduce_inc
        );
    }

    fn validate(&self) -> Result<(), ConfigError> {
        fn check_decay(value: Option<f32>, option: &'static str) -> Result<(), ConfigError> {
            match value {
                Some(decay) if decay <= 1.0 / 16.0 || decay >= 1.0 => Err(ConfigError { option }),
                _ => Ok(()),
            }
        }

        check_decay(self.var_decay, "var_decay")?;
        check_decay(self.max_var_decay, "max_var_decay")?;
        check_decay(self.clause_activity_decay, "clause_activity_decay")?;

        if let Some(k) = self.restart_k {
            if k <= 0.0 || k > 1.0 {
                return Err(ConfigError { option: "restart_k" });
            }
        }

        if let Some(r) = self.restart_blocking_r {
            if r < 1.0 {
                return Err(ConfigError {
                    option: "restart_blocking_r",
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_applies_values() {
        let mut config = SolverConfig::default();
        let mut update = SolverConfigUpdate::new();
        update.restart_k = Some(0.9);
        update.persistent_lbd = Some(5);

        config.merge(&update).unwrap();

        assert_eq!(config.restart_k, 0.9);
        assert_eq!(config.persistent_lbd, 5);
        assert_eq!(config.reduce_base, SolverConfig::default().reduce_base);
    }

    #[test]
    fn rejects_out_of_range_decay() {
        let mut config = SolverConfig::default();
        let mut update = SolverConfigUpdate::new();
        update.var_decay = Some(1.5);

        assert!(config.merge(&update).is_err());
        assert_eq!(config.var_decay, SolverConfig::default().var_decay);
    }
}
