//! Reference Engine
//!
//! Long-lived task behind a one-shot channel pair:
//!
//! ```text
//!   ReferenceRequest ──mpsc──▶ ┌──────────────┐ ──broadcast──▶ EngineMessage
//!        (input)               │ engine task  │                 (output)
//!                              └──────────────┘
//! ```
//!
//! Exactly one output message per accepted input, in send order. Messages
//! carry no request id, and a message broadcast while nobody is subscribed
//! is lost: callers subscribe before they send.

use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::model::{self, Trajectory, GTC_PER_PPM, PHYSICS_TABLE, SAMPLE_COUNT};
use crate::precision::POW_EXP;
use crate::result::{SimulationResult, StepRecord, TimeSeries};
use crate::scenario::Configuration;

pub const REFERENCE_NAME: &str = "simclimat-reference";

// ============================================================================
// Messages
// ============================================================================

/// Input message
#[derive(Debug, Clone)]
pub struct ReferenceRequest {
    pub config: Configuration,
    pub years: f64,
}

/// Output message
#[derive(Debug, Clone)]
pub enum EngineMessage {
    Result(Box<SimulationResult>),
    /// Error payload in place of a result
    Error(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("reference engine is shut down")]
    Closed,
}

// ============================================================================
// Channel pair
// ============================================================================

/// Caller-side handles on the engine's input and output channels
#[derive(Clone)]
pub struct ChannelPair {
    input: mpsc::Sender<ReferenceRequest>,
    output: broadcast::Sender<EngineMessage>,
}

impl ChannelPair {
    /// Start receiving output messages
    pub fn subscribe(&self) -> Result<broadcast::Receiver<EngineMessage>, ChannelError> {
        if self.input.is_closed() {
            return Err(ChannelError::Closed);
        }
        Ok(self.output.subscribe())
    }

    /// Submit one request
    pub async fn send(&self, request: ReferenceRequest) -> Result<(), ChannelError> {
        self.input
            .send(request)
            .await
            .map_err(|_| ChannelError::Closed)
    }

    /// Live output subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.output.receiver_count()
    }
}

// ============================================================================
// Engine task
// ============================================================================

/// Owner of the running engine
pub struct ReferenceEngineHandle {
    channels: ChannelPair,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<u64>,
}

impl ReferenceEngineHandle {
    /// Spawn the engine on the current tokio runtime
    pub fn spawn(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (input_tx, input_rx) = mpsc::channel(capacity);
        let (output_tx, _) = broadcast::channel(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(serve(input_rx, output_tx.clone(), shutdown_rx));
        info!(capacity, "Reference engine started");

        Self {
            channels: ChannelPair {
                input: input_tx,
                output: output_tx,
            },
            shutdown_tx,
            task,
        }
    }

    pub fn channels(&self) -> ChannelPair {
        self.channels.clone()
    }

    /// Stop the engine; returns the number of requests served
    pub async fn shutdown(self) -> u64 {
        let _ = self.shutdown_tx.send(());
        match self.task.await {
            Ok(served) => {
                info!(served, "Reference engine stopped");
                served
            }
            Err(e) => {
                warn!(error = %e, "Reference engine task ended abnormally");
                0
            }
        }
    }
}

async fn serve(
    mut input: mpsc::Receiver<ReferenceRequest>,
    output: broadcast::Sender<EngineMessage>,
    mut shutdown: oneshot::Receiver<()>,
) -> u64 {
    let mut served = 0u64;
    loop {
        let request = tokio::select! {
            _ = &mut shutdown => break,
            request = input.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        let message = execute(&request);
        served += 1;
        if output.send(message).is_err() {
            // Nobody subscribed: the message is gone for good
            warn!(served, "Reference output dropped, no subscriber");
        } else {
            debug!(served, years = request.years, "Reference output published");
        }
    }
    // Closing the input makes later subscribe/send calls fail fast
    input.close();
    served
}

/// One deterministic run; failures become an error payload
pub fn execute(request: &ReferenceRequest) -> EngineMessage {
    match model::simulate(&request.config, request.years, &POW_EXP) {
        Ok(trajectory) => EngineMessage::Result(Box::new(package(&trajectory))),
        Err(e) => EngineMessage::Error(e.to_string()),
    }
}

// ============================================================================
// Packaging
// ============================================================================

fn series(
    trajectory: &Trajectory,
    mut value: impl FnMut(&model::Sample) -> f64,
) -> TimeSeries {
    let mut steps: Vec<StepRecord> = trajectory
        .samples
        .iter()
        .map(|s| StepRecord::new(s.year, value(s)))
        .collect();
    if let Some(first) = steps.first_mut() {
        let mut internals = trajectory.first_internals;
        internals.bio_storage /= GTC_PER_PPM;
        first.internals = Some(internals);
    }
    TimeSeries {
        resolution: trajectory.resolution(),
        index_min: 0,
        index_max: SAMPLE_COUNT - 1,
        steps,
    }
}

fn package(trajectory: &Trajectory) -> SimulationResult {
    let initial = trajectory.initial;
    let last = trajectory.last();
    let resolution = trajectory.resolution();

    let physics_constants: BTreeMap<String, f64> = PHYSICS_TABLE
        .iter()
        .map(|(k, v)| (k.to_uppercase(), *v))
        .collect();
    let variable_constants = BTreeMap::from([
        ("DT".to_string(), trajectory.time_step),
        ("HORIZON".to_string(), trajectory.years),
        ("NB_POINTS".to_string(), SAMPLE_COUNT as f64),
    ]);

    let mut cumulative_emissions = 0.0;

    SimulationResult {
        name: REFERENCE_NAME.to_string(),
        start_year: trajectory.start_year,
        end_year: last.year,
        final_temperature: last.temperature,
        final_co2: last.co2,
        final_sea_level: last.sea_level(&initial),
        final_albedo: last.albedo,
        mean_temperature: trajectory.mean_temperature(),
        index_min: 1,
        index_max: SAMPLE_COUNT,
        time_step: trajectory.time_step,
        deadline: trajectory.years,
        physics_constants,
        variable_constants,
        temperature: series(trajectory, |s| s.temperature),
        sea_level: series(trajectory, |s| {
            (model::THERMAL_EXPANSION * s.ocean_temperature
                - model::THERMAL_EXPANSION * initial.temperature)
                + (model::ICE_MELT_SEA_LEVEL * initial.ice - model::ICE_MELT_SEA_LEVEL * s.ice)
        }),
        albedo: series(trajectory, |s| (1.0 - (1.0 - s.albedo)) * 100.0),
        co2_emissions: series(trajectory, |s| {
            cumulative_emissions += s.emissions * resolution;
            cumulative_emissions
        }),
        co2_concentration: series(trajectory, |s| s.co2 * GTC_PER_PPM / GTC_PER_PPM),
        ice_cap: series(trajectory, |s| s.ice * 100.0),
    }
}
