use loadcell_instruments::prelude::SloReport;

/// Recommended result type for a scenario `main` function and any shared behaviour code written
/// for hooks. Compatible with [crate::definition::HookResult] so `?` propagates.
pub type LoadcellResult<T> = anyhow::Result<T>;

/// What [crate::run::run] hands back after a run that reached the measured phase.
///
/// A missing [RunReport::slo] means no targets were configured, not that the run failed; fatal
/// initialization failures never produce a report at all.
#[derive(Debug)]
pub struct RunReport {
    /// Number of agents that were still running their behaviour when the run ended.
    pub agents_at_completion: usize,
    /// The SLO verdict over the measured phase, when targets were configured.
    pub slo: Option<SloReport>,
}
