//! SimClimat Parity - cross-engine equivalence oracle
//!
//! Runs a matrix of climate-model configurations through a candidate engine
//! and a trusted reference engine and demands field-for-field identical
//! output after normalization.
//!
//! # Modules
//!
//! - [`scenario`] - Configuration schema, presets, override builder, default suite
//! - [`precision`] - Process-wide exponential selection for bit-exact agreement
//! - [`engines`] - Bundled candidate (synchronous) and reference (channel) engines
//! - [`adapters`] - One async contract over both engines
//! - [`normalize`] - Versioned deny-list and result normalization
//! - [`equivalence`] - Strict structural comparison with first-mismatch report
//! - [`runner`] - Sequential suite execution and reporting
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌───────────┐   ┌────────────┐
//! │ Scenario │──▶│  Builder  │──▶│ Adapters  │──▶│ Normalize │──▶│ Equivalence│
//! └──────────┘   └───────────┘   └───────────┘   └───────────┘   └────────────┘
//! ```

pub mod config;
pub mod error;
pub mod logging;

pub mod adapters;
pub mod engines;
pub mod equivalence;
pub mod normalize;
pub mod precision;
pub mod result;
pub mod runner;
pub mod scenario;

// Convenient re-exports at crate root
pub use adapters::{AsyncExecutable, CandidateAdapter, EngineAdapter, EngineKind, ReferenceAdapter};
pub use config::{ConfigError, HarnessConfig, SuiteSettings};
pub use error::HarnessError;
pub use equivalence::{Mismatch, MismatchKind, assert_equal};
pub use normalize::{DenyList, NormalizedResult, normalize};
pub use precision::{MathProvider, PrecisionReconciler};
pub use result::SimulationResult;
pub use runner::{ScenarioOutcome, ScenarioReport, SuiteReport, SuiteRunner, with_bundled_engines};
pub use scenario::{Configuration, Overrides, Preset, Scenario, ScenarioBuilder, default_suite};
