mod client;

use std::collections::HashMap;
use std::time::Duration;

use infrastructure::{HttpClientConfig, HttpMethod};
use serde::Deserialize;

use crate::sensor::{MissingFieldPolicy, SensorConfig};

pub use client::SimplyEnergyClient;

const ACCESS_TOKEN_PLACEHOLDER: &str = "{access_token}";
const DATE_PLACEHOLDER: &str = "{date}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    #[default]
    #[serde(alias = "https")]
    Https,
    #[serde(alias = "http")]
    Http,
}

impl Protocol {
    fn scheme(&self) -> &'static str {
        match self {
            Protocol::Https => "https",
            Protocol::Http => "http",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimplyEnergy {
    pub access_token: String,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_resource")]
    pub resource: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    #[serde(default)]
    pub force_update: bool,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
    #[serde(default)]
    pub missing_field_policy: MissingFieldPolicy,
    #[serde(default)]
    pub publish_zero_spend: bool,
}

fn default_host() -> String {
    "tracker.simplyenergy.com.au".to_string()
}

fn default_resource() -> String {
    "/api/tracker/usage?account_id={access_token}&from={date}".to_string()
}

fn default_name() -> String {
    "Simply Energy".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    10
}

fn default_currency() -> String {
    "$".to_string()
}

fn default_topic() -> String {
    "simply-energy/cost".to_string()
}

fn default_scan_interval() -> u64 {
    60
}

impl SimplyEnergy {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.access_token.is_empty() {
            anyhow::bail!("simply_energy.access_token must not be empty");
        }
        if self.timeout == 0 {
            anyhow::bail!("simply_energy.timeout must be a positive number of seconds");
        }
        if self.scan_interval == 0 {
            anyhow::bail!("simply_energy.scan_interval must be a positive number of seconds");
        }
        if self.topic.is_empty() || self.topic.contains(['+', '#']) {
            anyhow::bail!("simply_energy.topic {:?} is not a valid topic to publish to", self.topic);
        }

        Ok(())
    }

    pub fn new_usage_client(&self) -> anyhow::Result<SimplyEnergyClient> {
        let http_client = HttpClientConfig::new(
            self.headers.clone(),
            self.verify_ssl,
            Duration::from_secs(self.timeout),
        )
        .new_tracing_client()?;

        Ok(SimplyEnergyClient::new(http_client, self.method.into(), self.resource_url()))
    }

    pub fn sensor_config(&self) -> SensorConfig {
        SensorConfig {
            name: self.name.clone(),
            currency: self.currency.clone(),
            force_update: self.force_update,
            topic: self.topic.clone(),
            missing_field_policy: self.missing_field_policy,
            publish_zero_spend: self.publish_zero_spend,
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }

    fn resource_url(&self) -> ResourceUrl {
        let resource = self.resource.replace(ACCESS_TOKEN_PLACEHOLDER, &self.access_token);

        ResourceUrl {
            template: format!(
                "{}://{}{}",
                self.protocol.scheme(),
                self.host.to_lowercase(),
                resource
            ),
            access_token: self.access_token.clone(),
        }
    }
}

/// Request URL with the access token already substituted and the date still open.
#[derive(Debug, Clone)]
pub struct ResourceUrl {
    template: String,
    access_token: String,
}

impl ResourceUrl {
    pub fn for_date(&self, date: &str) -> String {
        self.template.replace(DATE_PLACEHOLDER, date)
    }

    pub fn redacted_for_date(&self, date: &str) -> String {
        let url = self.for_date(date);
        if self.access_token.is_empty() {
            url
        } else {
            url.replace(&self.access_token, "***")
        }
    }
}
