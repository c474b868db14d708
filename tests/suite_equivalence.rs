//! End-to-end equivalence of the bundled engines
//!
//! Runs through the public API only: reconciler, both adapters, the real
//! reference engine task, normalization and the assertor.

use std::sync::Arc;
use std::time::Duration;

use simclimat_parity::adapters::{AsyncExecutable, CandidateAdapter, ReferenceAdapter};
use simclimat_parity::config::SuiteSettings;
use simclimat_parity::engines::ReferenceEngineHandle;
use simclimat_parity::equivalence::first_mismatch;
use simclimat_parity::normalize::{DenyList, unclassified_paths};
use simclimat_parity::precision::{NATIVE_EXP, POW_EXP, PrecisionReconciler};
use simclimat_parity::runner::{SuiteRunner, with_bundled_engines};
use simclimat_parity::scenario::{Preset, Scenario, default_suite};
use simclimat_parity::{HarnessError, assert_equal, normalize};

async fn run_one(scenario: Scenario) -> Result<(), HarnessError> {
    let (runner, engine) = with_bundled_engines(&SuiteSettings::default()).unwrap();
    let outcome = runner.run_scenario(&scenario).await;
    engine.shutdown().await;
    outcome
}

#[tokio::test]
async fn test_default_suite_is_equivalent() {
    let (runner, engine) = with_bundled_engines(&SuiteSettings::default()).unwrap();
    let suite = default_suite();
    let report = runner.run(&suite).await;
    engine.shutdown().await;

    for failure in report.failures() {
        eprintln!("{}", failure);
    }
    assert_eq!(report.scenarios.len(), suite.len());
    assert!(report.all_passed(), "{}", report.summary());
}

#[tokio::test]
async fn test_native_exp_candidate_is_not_equivalent() {
    let engine = ReferenceEngineHandle::spawn(4);
    let runner = SuiteRunner::new(
        Arc::new(CandidateAdapter::with_math(&NATIVE_EXP)),
        Arc::new(ReferenceAdapter::new(
            Arc::new(engine.channels()),
            Duration::from_secs(30),
        )),
        DenyList::current().clone(),
    )
    .unwrap();
    let report = runner.run(&default_suite()).await;
    engine.shutdown().await;

    assert!(!report.all_passed(), "{}", report.summary());
    assert!(report.totals().failed > report.totals().total / 2, "{}", report.summary());
    for failure in report.failures() {
        assert_eq!(
            failure.outcome.error().unwrap().code(),
            "EQUIVALENCE_MISMATCH",
            "{}",
            failure
        );
    }
}

#[tokio::test]
async fn test_preindustrial_baseline_10000_years() {
    let scenario = Scenario::new("pre_industrial", Preset::PreIndustrial1750).horizon(10_000.0);
    run_one(scenario).await.unwrap();
}

#[tokio::test]
async fn test_present_day_fixed_albedo_42() {
    let scenario = Scenario::new("fixed_albedo", Preset::ActualPresentDay)
        .with("fixed_albedo", true)
        .with("albedo_value", 42.0);
    run_one(scenario).await.unwrap();
}

#[tokio::test]
async fn test_present_day_sun_distance() {
    let scenario = Scenario::new("sun_distance", Preset::ActualPresentDay)
        .with("distance_ts_value", 1.56789e11);
    run_one(scenario).await.unwrap();
}

#[tokio::test]
async fn test_unknown_override_is_configuration_error() {
    let scenario = Scenario::new("bogus", Preset::PreIndustrial1750).with("bogus_value", 1.0);
    let err = run_one(scenario).await.unwrap_err();
    assert_eq!(err.code(), "CONFIGURATION_ERROR");
}

#[tokio::test]
async fn test_each_adapter_is_deterministic() {
    PrecisionReconciler::install();
    let engine = ReferenceEngineHandle::spawn(2);
    let candidate = CandidateAdapter::new();
    let reference = ReferenceAdapter::new(Arc::new(engine.channels()), Duration::from_secs(30));
    let config = Scenario::new("det", Preset::ActualPresentDay)
        .with("fixed_water_vapor", true)
        .configuration()
        .unwrap();

    for adapter in [&candidate as &dyn AsyncExecutable, &reference] {
        let a = adapter.execute(&config, 10_000.0).await.unwrap();
        let b = adapter.execute(&config, 10_000.0).await.unwrap();
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap(),
            "{} not deterministic",
            adapter.kind()
        );
    }
    engine.shutdown().await;
}

#[tokio::test]
async fn test_both_engines_emit_only_classified_fields() {
    PrecisionReconciler::install();
    let engine = ReferenceEngineHandle::spawn(1);
    let candidate = CandidateAdapter::new();
    let reference = ReferenceAdapter::new(Arc::new(engine.channels()), Duration::from_secs(30));
    let config = Scenario::new("surface", Preset::PreIndustrial1750)
        .configuration()
        .unwrap();

    let list = DenyList::current();
    for adapter in [&candidate as &dyn AsyncExecutable, &reference] {
        let raw = adapter.execute(&config, 1_000.0).await.unwrap();
        let unclassified = unclassified_paths(&raw, list).unwrap();
        assert!(
            unclassified.is_empty(),
            "{} emits unclassified fields: {:?}",
            adapter.kind(),
            unclassified
        );
    }
    engine.shutdown().await;
}

#[tokio::test]
async fn test_known_divergent_fields_really_diverge() {
    let engine = ReferenceEngineHandle::spawn(1);
    let candidate = CandidateAdapter::with_math(&POW_EXP);
    let reference = ReferenceAdapter::new(Arc::new(engine.channels()), Duration::from_secs(30));
    let config = Scenario::new("divergent", Preset::ActualPresentDay)
        .configuration()
        .unwrap();

    let c = candidate.execute(&config, 10_000.0).await.unwrap();
    let r = reference.execute(&config, 10_000.0).await.unwrap();
    engine.shutdown().await;

    // Without the known-divergent revisions the results must not compare equal
    let v3 = DenyList::revision(3).unwrap();
    let err = assert_equal(&normalize(&c, &v3).unwrap(), &normalize(&r, &v3).unwrap()).unwrap_err();
    assert_eq!(err.code(), "EQUIVALENCE_MISMATCH");

    let current = DenyList::current();
    assert!(assert_equal(
        &normalize(&c, current).unwrap(),
        &normalize(&r, current).unwrap()
    )
    .is_ok());
}

#[tokio::test]
async fn test_mismatch_names_first_path_and_both_values() {
    let candidate = CandidateAdapter::with_math(&POW_EXP);
    let config = Scenario::new("one", Preset::PreIndustrial1750)
        .configuration()
        .unwrap();
    let other = Scenario::new("two", Preset::PreIndustrial1750)
        .with("solar_power_value", 1400.0)
        .configuration()
        .unwrap();

    let list = DenyList::current();
    let a = normalize(&candidate.execute(&config, 1_000.0).await.unwrap(), list).unwrap();
    let b = normalize(&candidate.execute(&other, 1_000.0).await.unwrap(), list).unwrap();

    let mismatch = first_mismatch(&a.value, &b.value).unwrap();
    assert!(!mismatch.path.is_empty());
    assert!(mismatch.candidate.is_some());
    assert!(mismatch.reference.is_some());
    assert_ne!(mismatch.candidate, mismatch.reference);
}
