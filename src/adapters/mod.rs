//! Engine Adapters
//!
//! One async execution contract over two structurally different engines.
//! Which one runs is an explicit [`EngineKind`] choice, never inferred from
//! the shape of the engine object.

pub mod candidate;
pub mod reference;

pub use candidate::CandidateAdapter;
pub use reference::{ReferenceAdapter, ReferenceChannels, Subscription};

use async_trait::async_trait;
use std::fmt;

use crate::error::HarnessError;
use crate::result::SimulationResult;
use crate::scenario::Configuration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    Candidate,
    Reference,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Candidate => f.write_str("candidate"),
            EngineKind::Reference => f.write_str("reference"),
        }
    }
}

/// Execution contract shared by both engines
#[async_trait]
pub trait AsyncExecutable: Send + Sync {
    fn kind(&self) -> EngineKind;

    /// Run one simulation of `years` for `config`.
    ///
    /// `config` is passed through untouched; the adapter never edits it.
    async fn execute(
        &self,
        config: &Configuration,
        years: f64,
    ) -> Result<SimulationResult, HarnessError>;
}

/// Tagged choice between the two adapters
pub enum EngineAdapter {
    Candidate(CandidateAdapter),
    Reference(ReferenceAdapter),
}

impl EngineAdapter {
    pub fn kind(&self) -> EngineKind {
        match self {
            EngineAdapter::Candidate(_) => EngineKind::Candidate,
            EngineAdapter::Reference(_) => EngineKind::Reference,
        }
    }
}

#[async_trait]
impl AsyncExecutable for EngineAdapter {
    fn kind(&self) -> EngineKind {
        EngineAdapter::kind(self)
    }

    async fn execute(
        &self,
        config: &Configuration,
        years: f64,
    ) -> Result<SimulationResult, HarnessError> {
        match self {
            EngineAdapter::Candidate(adapter) => adapter.execute(config, years).await,
            EngineAdapter::Reference(adapter) => adapter.execute(config, years).await,
        }
    }
}


#[cfg(test)]
pub use mock::MockAdapter;
