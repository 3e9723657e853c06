use std::sync::Arc;

use anyhow::Context as _;
use rumqttc::v5::{AsyncClient, mqttbytes::QoS};

#[derive(Clone)]
pub struct MqttSender {
    client: Arc<AsyncClient>,
}

impl MqttSender {
    pub(super) fn new(client: Arc<AsyncClient>) -> Self {
        Self { client }
    }

    //fire-and-forget, fails instead of waiting when the request queue of the event loop is full
    #[tracing::instrument(skip_all, fields(topic = %topic, otel.name = format!("MQTT publish {}", topic)))]
    pub async fn publish(&self, topic: String, payload: String) -> anyhow::Result<()> {
        tracing::debug!("Publishing MQTT message to {topic}: {:?}", payload);

        self.client
            .try_publish(topic.clone(), QoS::AtMostOnce, false, payload)
            .with_context(|| format!("MQTT message to {} not queued", topic))
    }
}
