use config::{Config, ConfigError, Environment, File};
use infrastructure::{HttpServerConfig, MonitoringConfig, MqttConfig};
use serde::Deserialize;

use crate::adapter::simply_energy::SimplyEnergy;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub mqtt: MqttConfig,
    pub http_server: HttpServerConfig,
    pub monitoring: MonitoringConfig,
    pub simply_energy: SimplyEnergy,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        //e.g. SIMPLY_ENERGY__SIMPLY_ENERGY__ACCESS_TOKEN
        let builder = Config::builder()
            .add_source(File::with_name("config.toml"))
            .add_source(
                Environment::with_prefix("SIMPLY_ENERGY")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }
}
