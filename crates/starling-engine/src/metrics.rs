//! Per-step metrics for the simulation driver.
//!
//! [`StepMetrics`] captures timing and outcome counts for a single step,
//! for telemetry and profiling. The driver populates it on every
//! successful `step()`; consumers read it from the returned
//! [`StepResult`](crate::StepResult).

/// Timing and outcome metrics collected during a single step.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default)]
pub struct StepMetrics {
    /// Wall-clock time for the entire step, in microseconds.
    pub total_us: u64,
    /// Per-launch execution times: `(function name, microseconds)`.
    pub launch_us: Vec<(String, u64)>,
    /// Agents removed by death compaction this step.
    pub agents_died: u64,
    /// Agents appended by birth compaction this step.
    pub agents_born: u64,
    /// Messages finalized into readable lists this step.
    pub messages_emitted: u64,
    /// Live agent count after the step.
    pub population: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StepMetrics::default();
        assert_eq!(m.total_us, 0);
        assert!(m.launch_us.is_empty());
        assert_eq!(m.agents_died, 0);
        assert_eq!(m.agents_born, 0);
        assert_eq!(m.messages_emitted, 0);
        assert_eq!(m.population, 0);
    }
}
