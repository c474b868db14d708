//! Suite Runner
//!
//! Drives every scenario through both engines, one at a time:
//!
//! ```text
//! Scenario ─▶ ScenarioBuilder ─▶ Configuration ─┬─▶ candidate ─▶ normalize ─┐
//!                                               └─▶ reference ─▶ normalize ─┴─▶ assert_equal
//! ```
//!
//! A scenario is never started before the previous one has finished; the
//! reference channel pair has no request ids. A failing scenario is recorded
//! and the suite moves on.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, Instrument};
use ulid::Ulid;

use crate::adapters::{
    AsyncExecutable, CandidateAdapter, EngineAdapter, EngineKind, ReferenceAdapter,
};
use crate::config::{ConfigError, SuiteSettings};
use crate::engines::ReferenceEngineHandle;
use crate::equivalence::assert_equal;
use crate::error::HarnessError;
use crate::normalize::{DenyList, normalize};
use crate::precision::PrecisionReconciler;
use crate::scenario::Scenario;

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone)]
pub enum ScenarioOutcome {
    Passed,
    Failed { error: HarnessError },
}

impl ScenarioOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, ScenarioOutcome::Passed)
    }

    pub fn error(&self) -> Option<&HarnessError> {
        match self {
            ScenarioOutcome::Passed => None,
            ScenarioOutcome::Failed { error } => Some(error),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub outcome: ScenarioOutcome,
    pub elapsed: Duration,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            ScenarioOutcome::Passed => {
                write!(f, "PASS {} ({} ms)", self.name, self.elapsed.as_millis())
            }
            ScenarioOutcome::Failed { error } => write!(
                f,
                "FAIL {} ({} ms) [{}] {}",
                self.name,
                self.elapsed.as_millis(),
                error.code(),
                error
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub run_id: Ulid,
    pub started_at: DateTime<Utc>,
    pub deny_list_version: u32,
    pub scenarios: Vec<ScenarioReport>,
}

/// Machine-readable totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl SuiteReport {
    pub fn all_passed(&self) -> bool {
        self.scenarios.iter().all(|s| s.outcome.is_passed())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioReport> {
        self.scenarios.iter().filter(|s| !s.outcome.is_passed())
    }

    pub fn get(&self, name: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    pub fn totals(&self) -> SuiteSummary {
        let failed = self.failures().count();
        SuiteSummary {
            total: self.scenarios.len(),
            passed: self.scenarios.len() - failed,
            failed,
        }
    }

    pub fn summary(&self) -> String {
        let totals = self.totals();
        format!(
            "run {} (deny-list v{}): {}/{} passed, {} failed",
            self.run_id, self.deny_list_version, totals.passed, totals.total, totals.failed
        )
    }
}

// ============================================================================
// Runner
// ============================================================================

pub struct SuiteRunner {
    candidate: Arc<dyn AsyncExecutable>,
    reference: Arc<dyn AsyncExecutable>,
    deny_list: DenyList,
    horizon_override: Option<f64>,
}

impl SuiteRunner {
    pub fn new(
        candidate: Arc<dyn AsyncExecutable>,
        reference: Arc<dyn AsyncExecutable>,
        deny_list: DenyList,
    ) -> Result<Self, HarnessError> {
        if candidate.kind() != EngineKind::Candidate || reference.kind() != EngineKind::Reference {
            return Err(HarnessError::Configuration(format!(
                "runner needs a candidate and a reference adapter, got {} and {}",
                candidate.kind(),
                reference.kind()
            )));
        }
        Ok(Self {
            candidate,
            reference,
            deny_list,
            horizon_override: None,
        })
    }

    /// Run every scenario with this horizon instead of its own
    pub fn with_horizon(mut self, years: Option<f64>) -> Self {
        self.horizon_override = years;
        self
    }

    pub fn deny_list(&self) -> &DenyList {
        &self.deny_list
    }

    pub fn candidate(&self) -> &Arc<dyn AsyncExecutable> {
        &self.candidate
    }

    /// Build, execute on both engines, normalize and compare one scenario
    pub async fn run_scenario(&self, scenario: &Scenario) -> Result<(), HarnessError> {
        let config = scenario.configuration()?;
        let years = self.horizon_override.unwrap_or(scenario.horizon_years);

        let candidate = self.candidate.execute(&config, years).await?;
        let reference = self.reference.execute(&config, years).await?;

        let candidate = normalize(&candidate, &self.deny_list)?;
        let reference = normalize(&reference, &self.deny_list)?;
        assert_equal(&candidate, &reference)
    }

    /// Run `scenarios` sequentially and collect one report per scenario
    pub async fn run(&self, scenarios: &[Scenario]) -> SuiteReport {
        let run_id = Ulid::new();
        let started_at = Utc::now();
        info!(
            %run_id,
            scenarios = scenarios.len(),
            deny_list_version = self.deny_list.version(),
            "Suite started"
        );

        let mut reports = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let span = info_span!("scenario", name = %scenario.name);
            let start = Instant::now();
            let result = self.run_scenario(scenario).instrument(span).await;
            let elapsed = start.elapsed();

            let outcome = match result {
                Ok(()) => {
                    info!(scenario = %scenario.name, elapsed_ms = elapsed.as_millis() as u64, "Scenario passed");
                    ScenarioOutcome::Passed
                }
                Err(error) => {
                    error!(scenario = %scenario.name, code = error.code(), %error, "Scenario failed");
                    ScenarioOutcome::Failed { error }
                }
            };
            reports.push(ScenarioReport {
                name: scenario.name.clone(),
                outcome,
                elapsed,
            });
        }

        let report = SuiteReport {
            run_id,
            started_at,
            deny_list_version: self.deny_list.version(),
            scenarios: reports,
        };
        info!(%run_id, summary = %report.summary(), "Suite finished");
        report
    }
}

/// Wire the runner to the bundled engines.
///
/// Installs the precision reconciler before the candidate adapter is built
/// and spawns the reference engine on the current runtime. The caller owns
/// the returned handle and shuts the engine down after the run.
pub fn with_bundled_engines(
    settings: &SuiteSettings,
) -> Result<(SuiteRunner, ReferenceEngineHandle), ConfigError> {
    let deny_list = settings.deny_list()?;
    PrecisionReconciler::install();

    let engine = ReferenceEngineHandle::spawn(settings.channel_capacity);
    let candidate = CandidateAdapter::new();
    let reference = ReferenceAdapter::new(
        Arc::new(engine.channels()),
        Duration::from_millis(settings.reference_timeout_ms),
    );

    let runner = SuiteRunner::new(
        Arc::new(EngineAdapter::Candidate(candidate)),
        Arc::new(EngineAdapter::Reference(reference)),
        deny_list,
    )
        .map_err(|e| ConfigError::Invalid(e.to_string()))?
        .with_horizon(settings.horizon_years);
    Ok((runner, engine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;
    use crate::engines::{CandidateModel, ExperienceValues, SimulationValues};
    use crate::equivalence::MismatchKind;
    use crate::precision::POW_EXP;
    use crate::result::SimulationResult;
    use crate::scenario::Preset;

    fn sample_result() -> SimulationResult {
        let mut sv = SimulationValues::new();
        sv.create_1750_state();
        CandidateModel::new(&POW_EXP)
            .model_execute(&sv, &ExperienceValues::new(100.0))
            .unwrap()
    }

    fn mocks(
        candidate: Result<SimulationResult, HarnessError>,
        reference: Result<SimulationResult, HarnessError>,
    ) -> (Arc<MockAdapter>, Arc<MockAdapter>, SuiteRunner) {
        let c = Arc::new(MockAdapter::new(EngineKind::Candidate, candidate));
        let r = Arc::new(MockAdapter::new(EngineKind::Reference, reference));
        let runner =
            SuiteRunner::new(c.clone(), r.clone(), DenyList::current().clone()).unwrap();
        (c, r, runner)
    }

    #[tokio::test]
    async fn test_unknown_override_fails_before_engine_calls() {
        let (c, r, runner) = mocks(Ok(sample_result()), Ok(sample_result()));
        let scenario = Scenario::new("bogus", Preset::PreIndustrial1750).with("bogus_value", 1.0);

        let err = runner.run_scenario(&scenario).await.unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
        assert_eq!(c.calls(), 0);
        assert_eq!(r.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_the_suite() {
        let (c, r, runner) = mocks(Ok(sample_result()), Ok(sample_result()));
        let scenarios = vec![
            Scenario::new("broken", Preset::ActualPresentDay).with("bogus_value", 1.0),
            Scenario::new("fine", Preset::ActualPresentDay),
        ];

        let report = runner.run(&scenarios).await;
        assert!(!report.all_passed());
        assert_eq!(report.totals(), SuiteSummary { total: 2, passed: 1, failed: 1 });
        assert!(report.get("fine").unwrap().outcome.is_passed());
        assert_eq!(c.calls(), 1);
        assert_eq!(r.calls(), 1);
    }

    #[tokio::test]
    async fn test_mismatch_is_reported_with_path() {
        let mut drifted = sample_result();
        drifted.final_temperature = f64::from_bits(drifted.final_temperature.to_bits() + 1);
        let (_, _, runner) = mocks(Ok(sample_result()), Ok(drifted));

        let err = runner
            .run_scenario(&Scenario::new("drift", Preset::PreIndustrial1750))
            .await
            .unwrap_err();
        match err {
            HarnessError::EquivalenceMismatch(m) => {
                assert_eq!(m.path, "final_temperature");
                assert_eq!(m.kind, MismatchKind::ValueDiffers);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_denied_difference_is_ignored() {
        let mut renamed = sample_result();
        renamed.name = "someone-else".to_string();
        renamed.time_step = 42.0;
        let (_, _, runner) = mocks(Ok(sample_result()), Ok(renamed));
        let report = runner
            .run(&[Scenario::new("identity", Preset::PreIndustrial1750)])
            .await;
        assert!(report.all_passed(), "{}", report.summary());
    }

    #[tokio::test]
    async fn test_reference_error_is_recorded() {
        let (_, _, runner) = mocks(
            Ok(sample_result()),
            Err(HarnessError::Timeout { after_ms: 5 }),
        );
        let report = runner
            .run(&[Scenario::new("slow", Preset::PreIndustrial1750)])
            .await;
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.outcome.error().unwrap().code(), "TIMEOUT");
        assert!(failure.to_string().starts_with("FAIL slow"));
    }

    #[test]
    fn test_runner_rejects_swapped_adapters() {
        let c = Arc::new(MockAdapter::new(EngineKind::Candidate, Ok(sample_result())));
        let r = Arc::new(MockAdapter::new(EngineKind::Reference, Ok(sample_result())));
        assert!(SuiteRunner::new(r, c, DenyList::current().clone()).is_err());
    }

    #[tokio::test]
    async fn test_bundled_runner_pairs_tagged_adapters() {
        let (runner, engine) = with_bundled_engines(&SuiteSettings::default()).unwrap();
        assert_eq!(runner.candidate().kind(), EngineKind::Candidate);
        assert_eq!(runner.reference.kind(), EngineKind::Reference);
        runner
            .run_scenario(&Scenario::new("short", Preset::ActualPresentDay).horizon(100.0))
            .await
            .unwrap();
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_horizon_override_reaches_engines() {
        let (runner, engine) = with_bundled_engines(&SuiteSettings {
            horizon_years: Some(0.0),
            ..SuiteSettings::default()
        })
        .unwrap();
        let err = runner
            .run_scenario(&Scenario::new("zero", Preset::PreIndustrial1750))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ENGINE_REPORTED_ERROR");
        engine.shutdown().await;
    }
}
