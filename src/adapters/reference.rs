//! Reference Adapter
//!
//! Request/response on top of the engine's one-shot channel pair:
//!
//! 1. subscribe to the output channel
//! 2. send the request on the input channel
//! 3. resolve on the first output message (bounded by a timeout)
//! 4. unsubscribe, whatever happened
//!
//! Output messages carry no correlation id, so at most one request may be in
//! flight. A request that timed out is still unresolved from the engine's
//! point of view: its subscription is kept, and the next request first waits
//! (under the same timeout) for that late answer and discards it. The engine
//! answers each input exactly once and in order, so the first message on the
//! kept subscription is the stale one. If that drain times out too, or the
//! output lagged, ordering can no longer be trusted and the adapter refuses
//! further requests.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, warn};

use super::{AsyncExecutable, EngineKind};
use crate::engines::{ChannelError, ChannelPair, EngineMessage, ReferenceRequest};
use crate::error::{HarnessError, INPUT_CHANNEL, OUTPUT_CHANNEL};
use crate::result::SimulationResult;
use crate::scenario::Configuration;

/// Public channel contract of the reference engine
#[async_trait]
pub trait ReferenceChannels: Send + Sync {
    fn subscribe(&self) -> Result<broadcast::Receiver<EngineMessage>, ChannelError>;

    async fn send(&self, request: ReferenceRequest) -> Result<(), ChannelError>;
}

#[async_trait]
impl ReferenceChannels for ChannelPair {
    fn subscribe(&self) -> Result<broadcast::Receiver<EngineMessage>, ChannelError> {
        ChannelPair::subscribe(self)
    }

    async fn send(&self, request: ReferenceRequest) -> Result<(), ChannelError> {
        ChannelPair::send(self, request).await
    }
}

/// Output subscription, released on drop
pub struct Subscription {
    rx: broadcast::Receiver<EngineMessage>,
}

impl Subscription {
    async fn first_message(&mut self) -> Result<EngineMessage, RecvError> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!("Reference output unsubscribed");
    }
}

#[derive(Default)]
struct InFlight {
    /// Subscription of a timed-out request whose answer is still due
    stale: Option<Subscription>,
    /// Output ordering lost for good
    poisoned: bool,
}

pub struct ReferenceAdapter {
    channels: Arc<dyn ReferenceChannels>,
    timeout: Duration,
    in_flight: Mutex<InFlight>,
}

impl ReferenceAdapter {
    pub fn new(channels: Arc<dyn ReferenceChannels>, timeout: Duration) -> Self {
        Self {
            channels,
            timeout,
            in_flight: Mutex::new(InFlight::default()),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn after_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Wait for and discard the answer of a previously timed-out request
    async fn drain_stale(&self, in_flight: &mut InFlight) -> Result<(), HarnessError> {
        let Some(mut stale) = in_flight.stale.take() else {
            return Ok(());
        };

        match tokio::time::timeout(self.timeout, stale.first_message()).await {
            Ok(Ok(_)) => {
                debug!("Discarded late reference output of a timed-out request");
                Ok(())
            }
            // Engine gone; the subscribe below reports it
            Ok(Err(RecvError::Closed)) => Ok(()),
            Ok(Err(RecvError::Lagged(skipped))) => {
                in_flight.poisoned = true;
                warn!(skipped, "Reference output lagged while draining");
                Err(HarnessError::adapter(
                    INPUT_CHANNEL,
                    format!("lagged by {} messages while draining a stale answer", skipped),
                ))
            }
            Err(_) => {
                in_flight.poisoned = true;
                error!(after_ms = self.after_ms(), "Stale reference answer never arrived");
                Err(HarnessError::adapter(
                    INPUT_CHANNEL,
                    "a previous request is still unresolved; refusing to send",
                ))
            }
        }
    }

    fn subscribe(&self) -> Result<Subscription, HarnessError> {
        self.channels
            .subscribe()
            .map(|rx| Subscription { rx })
            .map_err(|e| HarnessError::adapter(OUTPUT_CHANNEL, e.to_string()))
    }
}

#[async_trait]
impl AsyncExecutable for ReferenceAdapter {
    fn kind(&self) -> EngineKind {
        EngineKind::Reference
    }

    async fn execute(
        &self,
        config: &Configuration,
        years: f64,
    ) -> Result<SimulationResult, HarnessError> {
        // One request at a time, held until the subscription is released
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.poisoned {
            return Err(HarnessError::adapter(
                INPUT_CHANNEL,
                "a previous request is still unresolved; refusing to send",
            ));
        }
        self.drain_stale(&mut in_flight).await?;

        let mut subscription = self.subscribe()?;

        let request = ReferenceRequest {
            config: config.clone(),
            years,
        };
        self.channels
            .send(request)
            .await
            .map_err(|e| HarnessError::adapter(INPUT_CHANNEL, e.to_string()))?;

        let received = tokio::time::timeout(self.timeout, subscription.first_message()).await;
        if received.is_err() {
            // Keep listening for the late answer so the next request can discard it
            in_flight.stale = Some(subscription);
        } else {
            drop(subscription);
        }

        match received {
            Err(_) => {
                let after_ms = self.after_ms();
                error!(after_ms, "Reference engine timed out");
                Err(HarnessError::Timeout { after_ms })
            }
            Ok(Err(RecvError::Closed)) => Err(HarnessError::adapter(
                OUTPUT_CHANNEL,
                "closed before a message arrived",
            )),
            Ok(Err(RecvError::Lagged(skipped))) => {
                in_flight.poisoned = true;
                warn!(skipped, "Reference output lagged");
                Err(HarnessError::adapter(
                    OUTPUT_CHANNEL,
                    format!("lagged by {} messages; output ordering lost", skipped),
                ))
            }
            Ok(Ok(EngineMessage::Result(result))) => Ok(*result),
            Ok(Ok(EngineMessage::Error(message))) => Err(HarnessError::EngineReported(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::ReferenceEngineHandle;
    use crate::engines::reference::execute;
    use crate::scenario::Preset;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Channel contract stub with switchable failures
    struct StubChannels {
        output: broadcast::Sender<EngineMessage>,
        fail_subscribe: bool,
        fail_send: bool,
        reply: Option<EngineMessage>,
    }

    impl StubChannels {
        fn new(reply: Option<EngineMessage>) -> Self {
            let (output, _) = broadcast::channel(4);
            Self {
                output,
                fail_subscribe: false,
                fail_send: false,
                reply,
            }
        }
    }

    #[async_trait]
    impl ReferenceChannels for StubChannels {
        fn subscribe(&self) -> Result<broadcast::Receiver<EngineMessage>, ChannelError> {
            if self.fail_subscribe {
                return Err(ChannelError::Closed);
            }
            Ok(self.output.subscribe())
        }

        async fn send(&self, _request: ReferenceRequest) -> Result<(), ChannelError> {
            if self.fail_send {
                return Err(ChannelError::Closed);
            }
            if let Some(reply) = &self.reply {
                let _ = self.output.send(reply.clone());
            }
            Ok(())
        }
    }

    fn config() -> Configuration {
        Configuration::preset(Preset::PreIndustrial1750)
    }

    #[tokio::test]
    async fn test_subscribe_failure_names_output_channel() {
        let mut stub = StubChannels::new(None);
        stub.fail_subscribe = true;
        let adapter = ReferenceAdapter::new(Arc::new(stub), Duration::from_millis(50));
        match adapter.execute(&config(), 10.0).await.unwrap_err() {
            HarnessError::Adapter { channel, .. } => assert_eq!(channel, OUTPUT_CHANNEL),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_send_failure_names_input_channel() {
        let mut stub = StubChannels::new(None);
        stub.fail_send = true;
        let adapter = ReferenceAdapter::new(Arc::new(stub), Duration::from_millis(50));
        match adapter.execute(&config(), 10.0).await.unwrap_err() {
            HarnessError::Adapter { channel, .. } => assert_eq!(channel, INPUT_CHANNEL),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_error_payload_is_engine_reported() {
        let stub = StubChannels::new(Some(EngineMessage::Error("diverged".into())));
        let adapter = ReferenceAdapter::new(Arc::new(stub), Duration::from_millis(500));
        match adapter.execute(&config(), 10.0).await.unwrap_err() {
            HarnessError::EngineReported(message) => assert_eq!(message, "diverged"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_silent_engine_times_out_then_refuses() {
        let stub = StubChannels::new(None);
        let adapter = ReferenceAdapter::new(Arc::new(stub), Duration::from_millis(20));

        let err = adapter.execute(&config(), 10.0).await.unwrap_err();
        assert!(matches!(err, HarnessError::Timeout { after_ms: 20 }));

        // The stale answer never arrives either: ordering is lost
        let err = adapter.execute(&config(), 10.0).await.unwrap_err();
        assert!(matches!(err, HarnessError::Adapter { channel: INPUT_CHANNEL, .. }));

        let err = adapter.execute(&config(), 10.0).await.unwrap_err();
        assert!(matches!(err, HarnessError::Adapter { channel: INPUT_CHANNEL, .. }));
    }

    /// Answers the first request late, every later one promptly
    struct SlowFirstChannels {
        output: broadcast::Sender<EngineMessage>,
        sent: AtomicUsize,
        base: SimulationResult,
    }

    #[async_trait]
    impl ReferenceChannels for SlowFirstChannels {
        fn subscribe(&self) -> Result<broadcast::Receiver<EngineMessage>, ChannelError> {
            Ok(self.output.subscribe())
        }

        async fn send(&self, _request: ReferenceRequest) -> Result<(), ChannelError> {
            let n = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
            let delay = if n == 1 { 200 } else { 1 };
            let mut reply = self.base.clone();
            reply.name = format!("reply-{}", n);
            let output = self.output.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                let _ = output.send(EngineMessage::Result(Box::new(reply)));
            });
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_late_answer_is_discarded_and_next_request_succeeds() {
        let base = match execute(&ReferenceRequest {
            config: config(),
            years: 10.0,
        }) {
            EngineMessage::Result(result) => *result,
            EngineMessage::Error(e) => panic!("unexpected error payload: {}", e),
        };
        let (output, _) = broadcast::channel(4);
        let channels = Arc::new(SlowFirstChannels {
            output,
            sent: AtomicUsize::new(0),
            base,
        });
        let adapter = ReferenceAdapter::new(channels.clone(), Duration::from_millis(50));

        let err = adapter.execute(&config(), 10.0).await.unwrap_err();
        assert_eq!(err.code(), "TIMEOUT");

        tokio::time::sleep(Duration::from_millis(400)).await;

        for n in 2..=4 {
            let result = adapter.execute(&config(), 10.0).await.unwrap();
            assert_eq!(result.name, format!("reply-{}", n));
        }
        assert_eq!(channels.output.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_drain_waits_for_answer_still_in_transit() {
        let base = match execute(&ReferenceRequest {
            config: config(),
            years: 10.0,
        }) {
            EngineMessage::Result(result) => *result,
            EngineMessage::Error(e) => panic!("unexpected error payload: {}", e),
        };
        let (output, _) = broadcast::channel(4);
        let channels = Arc::new(SlowFirstChannels {
            output,
            sent: AtomicUsize::new(0),
            base,
        });
        // 200 ms late answer: times out at 150 ms, drained within the next 150 ms
        let adapter = ReferenceAdapter::new(channels, Duration::from_millis(150));

        assert_eq!(adapter.execute(&config(), 10.0).await.unwrap_err().code(), "TIMEOUT");
        let result = adapter.execute(&config(), 10.0).await.unwrap();
        assert_eq!(result.name, "reply-2");
    }

    #[tokio::test]
    async fn test_unsubscribes_on_success_and_failure() {
        let engine = ReferenceEngineHandle::spawn(2);
        let channels = engine.channels();
        let adapter = ReferenceAdapter::new(Arc::new(channels.clone()), Duration::from_secs(30));

        adapter.execute(&config(), 100.0).await.unwrap();
        assert_eq!(channels.subscriber_count(), 0);

        let err = adapter.execute(&config(), -5.0).await.unwrap_err();
        assert!(matches!(err, HarnessError::EngineReported(_)));
        assert_eq!(channels.subscriber_count(), 0);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_shut_down_engine_is_adapter_error() {
        let engine = ReferenceEngineHandle::spawn(1);
        let channels = engine.channels();
        engine.shutdown().await;

        let adapter = ReferenceAdapter::new(Arc::new(channels), Duration::from_secs(1));
        let err = adapter.execute(&config(), 100.0).await.unwrap_err();
        assert_eq!(err.code(), "ADAPTER_ERROR");
    }
}
