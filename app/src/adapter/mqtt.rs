use infrastructure::MqttSender;

use crate::port::MessagePublisher;

impl MessagePublisher for MqttSender {
    async fn publish(&self, topic: String, payload: String) -> anyhow::Result<()> {
        MqttSender::publish(self, topic, payload).await
    }
}
