//! Bundled Engines
//!
//! Two engines over one energy-balance model, exposing the two invocation
//! shapes the adapters have to unify:
//!
//! - [`candidate`] - synchronous stateful object (`SimulationValues` + `model_execute`)
//! - [`reference`] - asynchronous task behind an input/output channel pair
//! - [`model`] - the shared integrator

pub mod candidate;
pub mod model;
pub mod reference;

pub use candidate::{CandidateError, CandidateModel, ExperienceValues, SimulationValues};
pub use reference::{
    ChannelError, ChannelPair, EngineMessage, ReferenceEngineHandle, ReferenceRequest,
};
