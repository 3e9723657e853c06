use anyhow::Context;
use settings::Settings;

use crate::sensor::SpendSensor;

mod adapter;
mod core;
pub mod port;
mod sensor;
mod settings;
mod usage;

#[tokio::main(flavor = "multi_thread")]
pub async fn main() -> anyhow::Result<()> {
    let settings = Settings::new().context("Error reading configuration")?;

    settings.monitoring.init().context("Error initializing monitoring")?;
    settings.simply_energy.validate().context("Invalid Simply Energy configuration")?;

    let mqtt_client = settings.mqtt.new_client();
    let usage_client = settings
        .simply_energy
        .new_usage_client()
        .context("Error initializing Simply Energy client")?;

    let sensor = SpendSensor::setup(settings.simply_energy.sensor_config(), usage_client, mqtt_client.sender()).await?;
    let scan_interval = settings.simply_energy.scan_interval();

    let http_server_exec = {
        let state_rx = sensor.subscribe();

        async move {
            settings
                .http_server
                .run_server(move || vec![adapter::sensor_api::new_routes(state_rx.clone())])
                .await
        }
    };

    tracing::info!("Starting main loop, refreshing every {:?}", scan_interval);

    tokio::select!(
        _ = mqtt_client.process() => Ok(()),
        res = sensor.run(scan_interval) => res,
        res = http_server_exec => res,
    )
}
