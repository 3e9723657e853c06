use std::sync::Arc;
use std::time::Duration;

use rumqttc::v5::{AsyncClient, Event, EventLoop, MqttOptions, mqttbytes::v5::ConnectProperties, mqttbytes::v5::Packet};

use super::MqttSender;

pub struct Mqtt {
    client: Arc<AsyncClient>,
    event_loop: EventLoop,
}

impl Mqtt {
    pub fn connect(host: &str, port: u16, client_id: &str, keep_alive_secs: u64) -> Self {
        let mut mqttoptions = MqttOptions::new(client_id, host, port);
        mqttoptions.set_keep_alive(Duration::from_secs(keep_alive_secs));
        mqttoptions.set_clean_start(true);

        let mut connect_props = ConnectProperties::new();
        connect_props.max_packet_size = Some(1024 * 1024);
        mqttoptions.set_connect_properties(connect_props);

        //outgoing requests are buffered until the event loop picks them up
        let (client, event_loop) = AsyncClient::new(mqttoptions, 64);

        tracing::info!("MQTT client {} configured for {}:{}", client_id, host, port);

        Mqtt {
            client: Arc::new(client),
            event_loop,
        }
    }

    pub fn sender(&self) -> MqttSender {
        MqttSender::new(self.client.clone())
    }

    //Drives the connection. Publishes of all senders only leave the process while this is polled.
    pub async fn process(mut self) {
        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("MQTT connection established");
                }
                Ok(Event::Incoming(Packet::Disconnect(_))) => {
                    tracing::warn!("MQTT broker closed the connection");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("MQTT error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}
