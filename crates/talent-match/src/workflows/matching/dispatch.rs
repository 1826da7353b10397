use std::sync::Arc;

use metrics::counter;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::directory::{DirectoryClient, ResultSink};
use super::domain::MatchEvent;
use super::oracle::ScoringOracle;
use super::service::MatchOrchestrator;
use crate::config::{DispatchConfig, OverflowPolicy};

/// Bounded hand-off between the event listener and match runs.
///
/// At most `queue_capacity` events wait and at most `max_concurrent_runs` runs
/// execute at once, each in its own task.
pub struct MatchDispatcher {
    sender: mpsc::Sender<MatchEvent>,
    overflow: OverflowPolicy,
    pump: JoinHandle<()>,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("dispatch queue is full, event {0} rejected")]
    Saturated(String),
    #[error("dispatcher has shut down")]
    Closed,
}

impl MatchDispatcher {
    pub fn spawn<D, S, O>(
        orchestrator: Arc<MatchOrchestrator<D, S, O>>,
        config: DispatchConfig,
    ) -> Self
    where
        D: DirectoryClient + 'static,
        S: ResultSink + 'static,
        O: ScoringOracle + 'static,
    {
        let permits = config.max_concurrent_runs.max(1);
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let pump = tokio::spawn(run_pump(orchestrator, receiver, permits));

        Self {
            sender,
            overflow: config.overflow,
            pump,
        }
    }

    /// Queue an event, honouring the configured overflow policy.
    pub async fn dispatch(&self, event: MatchEvent) -> Result<(), DispatchError> {
        match self.overflow {
            OverflowPolicy::Wait => self
                .sender
                .send(event)
                .await
                .map_err(|_| DispatchError::Closed),
            OverflowPolicy::Reject => match self.sender.try_send(event) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(event)) => {
                    counter!("match_events_rejected_total").increment(1);
                    Err(DispatchError::Saturated(event.correlation_id.0))
                }
                Err(mpsc::error::TrySendError::Closed(_)) => Err(DispatchError::Closed),
            },
        }
    }

    /// Dispatcher whose queue is already closed, for exercising producers.
    #[cfg(test)]
    pub(crate) fn closed(overflow: OverflowPolicy) -> Self {
        let (sender, _receiver) = mpsc::channel(1);
        Self {
            sender,
            overflow,
            pump: tokio::spawn(async {}),
        }
    }

    /// Stop accepting events and wait until queued and in-flight runs finish.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(err) = self.pump.await {
            error!(error = %err, "dispatcher pump terminated abnormally");
        }
    }
}

async fn run_pump<D, S, O>(
    orchestrator: Arc<MatchOrchestrator<D, S, O>>,
    mut receiver: mpsc::Receiver<MatchEvent>,
    permits: usize,
) where
    D: DirectoryClient + 'static,
    S: ResultSink + 'static,
    O: ScoringOracle + 'static,
{
    let semaphore = Arc::new(Semaphore::new(permits));

    loop {
        // Take a permit before the next event so the backlog never exceeds the queue.
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let Some(event) = receiver.recv().await else {
            break;
        };

        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let correlation_id = event.correlation_id;
            debug!(%correlation_id, "match run dispatched");
            if let Err(err) = orchestrator.process_match(&correlation_id).await {
                debug!(%correlation_id, error = %err, "match run ended without scoring");
            }
        });
    }

    // Every permit back means every spawned run has completed.
    match u32::try_from(permits) {
        Ok(all) => {
            if semaphore.acquire_many(all).await.is_err() {
                warn!("dispatcher semaphore closed while draining");
            }
        }
        Err(_) => warn!(permits, "too many permits to drain"),
    }
}
