use anyhow::Context;
use tokio::task_local;

task_local! {
    pub static FIXED_NOW: DateTime;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    delegate: chrono::DateTime<chrono::Local>,
}

impl DateTime {
    fn new<T: chrono::TimeZone>(delegate: chrono::DateTime<T>) -> Self {
        Self {
            delegate: delegate.with_timezone(&chrono::Local),
        }
    }

    pub fn now() -> Self {
        FIXED_NOW
            .try_with(|t| *t)
            .unwrap_or_else(|_| chrono::Local::now().into())
    }

    #[cfg(test)]
    pub fn from_iso(iso8601: &str) -> anyhow::Result<Self> {
        Ok(chrono::DateTime::parse_from_rfc3339(iso8601)?.into())
    }

    /// Interprets the given wall-clock text in the local time zone of the process.
    /// Ambiguous times (DST fold) resolve to the earlier instant, non-existent times (DST gap) fail.
    pub fn parse_local(text: &str, format: &str) -> anyhow::Result<Self> {
        let naive = chrono::NaiveDateTime::parse_from_str(text, format)
            .with_context(|| format!("Error parsing {:?} with format {:?}", text, format))?;

        let local = naive
            .and_local_timezone(chrono::Local)
            .earliest()
            .with_context(|| format!("{} does not exist in local time", naive))?;

        Ok(local.into())
    }

    pub fn timestamp(&self) -> i64 {
        self.delegate.timestamp()
    }

    //date in the format expected by the usage API
    pub fn to_date_param(&self) -> String {
        self.delegate.format("%Y-%m-%d").to_string()
    }
}

impl<T: chrono::TimeZone> From<chrono::DateTime<T>> for DateTime {
    fn from(val: chrono::DateTime<T>) -> Self {
        DateTime::new(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_local_is_deterministic() {
        let first = DateTime::parse_local("00:00 20240101", "%H:%M %Y%m%d").unwrap();
        let second = DateTime::parse_local("00:00 20240101", "%H:%M %Y%m%d").unwrap();

        assert_eq!(first.timestamp(), second.timestamp());
    }

    #[test]
    fn parse_local_keeps_wall_clock_distance() {
        let start = DateTime::parse_local("00:00 20240101", "%H:%M %Y%m%d").unwrap();
        let end = DateTime::parse_local("00:30 20240101", "%H:%M %Y%m%d").unwrap();

        assert_eq!(end.timestamp() - start.timestamp(), 30 * 60);
    }

    #[test]
    fn parse_local_rejects_malformed_text() {
        assert!(DateTime::parse_local("25:00 20240101", "%H:%M %Y%m%d").is_err());
        assert!(DateTime::parse_local("00:00 2024-01-01", "%H:%M %Y%m%d").is_err());
    }

    #[tokio::test]
    async fn now_honours_fixed_time() {
        let fixed = DateTime::from_iso("2024-03-05T12:00:00Z").unwrap();

        let now = FIXED_NOW.scope(fixed, async { DateTime::now() }).await;

        assert_eq!(now, fixed);
    }

    #[test]
    fn formats_date_param() {
        let dt = DateTime::parse_local("13:45 20240105", "%H:%M %Y%m%d").unwrap();

        assert_eq!(dt.to_date_param(), "2024-01-05");
    }
}
