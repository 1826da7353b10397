use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tracing::{info, warn};

use super::dispatch::{DispatchError, MatchDispatcher};
use super::domain::MatchEvent;
use crate::config::EventBusConfig;

/// At-least-once source of job-posted notifications.
#[async_trait]
pub trait MatchEventSource: Send {
    /// Next event, or `None` once the subscription has ended.
    async fn next_event(&mut self) -> Option<MatchEvent>;
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("event bus connection failed: {0}")]
    Connect(#[from] redis::RedisError),
    #[error("event subscription closed")]
    Closed,
}

/// Turns a raw pub/sub payload into an event. Blank payloads carry no job.
pub fn parse_payload(payload: &str) -> Option<MatchEvent> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(MatchEvent::new(trimmed))
    }
}

/// Redis pub/sub subscription on the job-match channel.
pub struct RedisEventSource {
    channel: String,
    messages: BoxStream<'static, redis::Msg>,
}

impl RedisEventSource {
    pub async fn subscribe(config: &EventBusConfig) -> Result<Self, EventBusError> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(config.channel.as_str()).await?;
        info!(channel = %config.channel, "subscribed to match events");

        Ok(Self {
            channel: config.channel.clone(),
            messages: pubsub.into_on_message().boxed(),
        })
    }
}

#[async_trait]
impl MatchEventSource for RedisEventSource {
    async fn next_event(&mut self) -> Option<MatchEvent> {
        while let Some(message) = self.messages.next().await {
            let payload = match message.get_payload::<String>() {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(channel = %self.channel, error = %err, "dropping undecodable payload");
                    continue;
                }
            };

            match parse_payload(&payload) {
                Some(event) => return Some(event),
                None => warn!(channel = %self.channel, "dropping empty payload"),
            }
        }
        None
    }
}

/// Feed every event from `source` into the dispatcher until the source ends.
///
/// Returns the number of events handed to the dispatcher. Rejected events are
/// logged and not counted.
pub async fn pump_events<E>(source: &mut E, dispatcher: &MatchDispatcher) -> usize
where
    E: MatchEventSource + ?Sized,
{
    let mut accepted = 0;
    while let Some(event) = source.next_event().await {
        let correlation_id = event.correlation_id.clone();
        match dispatcher.dispatch(event).await {
            Ok(()) => accepted += 1,
            Err(DispatchError::Saturated(_)) => {
                warn!(%correlation_id, "match event rejected, dispatcher saturated");
            }
            Err(DispatchError::Closed) => {
                warn!(%correlation_id, "dispatcher closed, stopping event pump");
                break;
            }
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_the_trimmed_correlation_id() {
        let event = parse_payload("  65f0c1a2b3\n").expect("event");
        assert_eq!(event.correlation_id.as_str(), "65f0c1a2b3");
        assert!(parse_payload("   ").is_none());
    }
}
