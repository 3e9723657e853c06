use std::collections::BTreeSet;

use serde_json::json;

use crate::port::MessagePublisher;
use crate::usage::{IntervalKey, LeafInterval};

/// Publishes each historical interval at most once per process lifetime.
pub struct HistoricalPublisher<P> {
    publisher: P,
    topic: String,
    sent: BTreeSet<IntervalKey>,
}

impl<P: MessagePublisher> HistoricalPublisher<P> {
    pub fn new(publisher: P, topic: String) -> Self {
        Self {
            publisher,
            topic,
            sent: BTreeSet::new(),
        }
    }

    //Returns true if the interval was published. The key is only recorded after a successful hand-off.
    pub async fn publish(&mut self, leaf: &LeafInterval) -> anyhow::Result<bool> {
        if self.sent.contains(&leaf.key) {
            return Ok(false);
        }

        let payload = json!({
            "value": leaf.total_spend,
            "since": leaf.end_ts,
        });

        self.publisher.publish(self.topic.clone(), payload.to_string()).await?;

        tracing::info!("{} - {}", leaf.key, leaf.total_spend);
        self.sent.insert(leaf.key);

        Ok(true)
    }

    pub fn sent_count(&self) -> usize {
        self.sent.len()
    }
}
