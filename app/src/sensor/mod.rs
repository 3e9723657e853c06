mod dedup;
mod state;

use std::time::Duration;

use derive_more::derive::{Display, Error};
use infrastructure::meter;
use serde::Deserialize;
use tokio::sync::watch;

use crate::core::time::DateTime;
use crate::port::{MessagePublisher, UsageSource};
use crate::usage::{DocumentError, UsageDocument, walk};

pub use dedup::HistoricalPublisher;
pub use state::SensorState;

/// What to do when a fetched document lacks a field the refresh needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFieldPolicy {
    //log and wait for the next cycle
    #[default]
    Skip,
    //stop refreshing, the service terminates
    Fatal,
}

#[derive(Debug, Clone)]
pub struct SensorConfig {
    pub name: String,
    pub currency: String,
    pub force_update: bool,
    pub topic: String,
    pub missing_field_policy: MissingFieldPolicy,
    pub publish_zero_spend: bool,
}

#[derive(Debug, Display, Error)]
pub enum SetupError {
    #[display("Usage data not available for {date}, platform not ready")]
    PlatformNotReady { date: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated { published_intervals: usize },
    Unavailable,
    NoDataForPeriod,
    Skipped(DocumentError),
}

/// Weekly spend sensor. Owns the current reading and the set of already published intervals,
/// both only touched from [`SpendSensor::refresh`].
pub struct SpendSensor<S, P> {
    config: SensorConfig,
    source: S,
    publisher: P,
    historical: HistoricalPublisher<P>,
    reading: Option<serde_json::Number>,
    available: bool,
    state_tx: watch::Sender<SensorState>,
}

impl<S, P> SpendSensor<S, P>
where
    S: UsageSource,
    P: MessagePublisher + Clone,
{
    /// Performs the readiness fetch. Without a response the sensor is not created at all.
    pub async fn setup(config: SensorConfig, mut source: S, publisher: P) -> Result<Self, SetupError> {
        let date = DateTime::now().to_date_param();

        if source.fetch(&date).await.is_none() {
            return Err(SetupError::PlatformNotReady { date });
        }

        let historical = HistoricalPublisher::new(publisher.clone(), format!("{}/historical", config.topic));

        let sensor = Self {
            config,
            source,
            publisher,
            historical,
            reading: None,
            available: true,
            state_tx: watch::channel(SensorState::default()).0,
        };
        sensor.state_tx.send_replace(sensor.state());

        tracing::info!("Sensor {} set up with topic {}", sensor.config.name, sensor.config.topic);

        Ok(sensor)
    }

    pub fn state(&self) -> SensorState {
        SensorState {
            name: self.config.name.clone(),
            state: self.reading.clone(),
            available: self.available,
            unit_of_measurement: self.config.currency.clone(),
            force_update: self.config.force_update,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SensorState> {
        self.state_tx.subscribe()
    }

    /// Refreshes immediately and then once per `scan_interval`. Returns only if a refresh fails fatally.
    pub async fn run(mut self, scan_interval: Duration) -> anyhow::Result<()> {
        let mut timer = tokio::time::interval(scan_interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            timer.tick().await;

            let outcome = self.refresh().await?;
            tracing::debug!("Refresh of {} finished: {:?}", self.config.name, outcome);
        }
    }

    #[tracing::instrument(skip(self), fields(sensor = %self.config.name))]
    pub async fn refresh(&mut self) -> anyhow::Result<RefreshOutcome> {
        let today = DateTime::now().to_date_param();

        let outcome = match self.try_refresh(&today).await {
            Ok(outcome) => outcome,
            Err(e) if self.config.missing_field_policy == MissingFieldPolicy::Skip => {
                tracing::error!("Skipping update for {}, unexpected response: {}", today, e);
                RefreshOutcome::Skipped(e)
            }
            Err(e) => return Err(anyhow::Error::new(e).context(format!("Unexpected response for {}", today))),
        };

        self.state_tx.send_replace(self.state());

        Ok(outcome)
    }

    async fn try_refresh(&mut self, today: &str) -> Result<RefreshOutcome, DocumentError> {
        let Some(mut document) = self.fetch(today).await else {
            tracing::error!("No data from Simply Energy for {}", today);
            return Ok(RefreshOutcome::Unavailable);
        };

        if !document.current_week_has_data()? {
            if !document.previous_week_has_data()? {
                tracing::error!("Energy not available for period {}", today);
                return Ok(RefreshOutcome::NoDataForPeriod);
            }

            let fallback_date = document.previous_week_from()?;
            tracing::info!("No data for current week of {}, falling back to {}", today, fallback_date);

            document = match self.fetch(&fallback_date).await {
                Some(document) => document,
                None => {
                    tracing::error!("No data from Simply Energy for {}", fallback_date);
                    return Ok(RefreshOutcome::Unavailable);
                }
            };

            if !document.current_week_has_data()? {
                tracing::error!("Energy not available for period {}", fallback_date);
                return Ok(RefreshOutcome::NoDataForPeriod);
            }
        }

        let weekly_total = document.weekly_total()?;
        let intervals = document.current_week_intervals()?;

        self.reading = Some(weekly_total.clone());
        if let Some(value) = weekly_total.as_f64() {
            meter::set("simply_energy_weekly_total", value, &[("sensor", self.config.name.as_str())]);
        }

        let state_topic = format!("{}/state", self.config.topic);
        if let Err(e) = self.publisher.publish(state_topic, weekly_total.to_string()).await {
            tracing::error!("Error publishing weekly total {}: {:?}", weekly_total, e);
        }

        let include_zero_spend = self.config.publish_zero_spend;
        let mut published_intervals = 0;

        for leaf in intervals.into_iter().flat_map(|intervals| walk(intervals, include_zero_spend)) {
            match self.historical.publish(&leaf).await {
                Ok(true) => {
                    published_intervals += 1;
                    meter::increment("simply_energy_historical_published_total", &[("sensor", self.config.name.as_str())]);
                }
                Ok(false) => {}
                Err(e) => tracing::error!("Error publishing interval {}, retrying on next discovery: {:?}", leaf.key, e),
            }
        }

        tracing::debug!(
            "Published {} new intervals, {} known in total",
            published_intervals,
            self.historical.sent_count()
        );

        Ok(RefreshOutcome::Updated { published_intervals })
    }

    async fn fetch(&mut self, date: &str) -> Option<UsageDocument> {
        let document = self.source.fetch(date).await;
        self.available = document.is_some();

        let result = if self.available { "ok" } else { "unavailable" };
        meter::increment("simply_energy_fetch_total", &[("result", result)]);

        document
    }
}
