use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

/// Identity of a time bucket: a date plus the hour-ending label for hourly buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey {
    pub date: NaiveDate,
    pub hour: Option<u8>,
}

impl BucketKey {
    pub fn new(date: NaiveDate, hour: Option<u8>) -> Self {
        Self { date, hour }
    }
}

impl std::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.hour {
            Some(h) => write!(f, "{} {:02}:00", self.date, h),
            None => write!(f, "{}", self.date),
        }
    }
}

/// One canonical slot of the output series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub key: BucketKey,
    /// Civil instant the bucket refers to (hour end, or start of day)
    pub instant: DateTime<FixedOffset>,
}

impl Bucket {
    pub fn new(key: BucketKey, instant: DateTime<FixedOffset>) -> Self {
        Self { key, instant }
    }

    pub fn date(&self) -> NaiveDate {
        self.key.date
    }

    pub fn hour(&self) -> Option<u8> {
        self.key.hour
    }

    /// Calendar year of the label date
    pub fn year(&self) -> i32 {
        self.key.date.year()
    }

    /// Day of year of the label date
    pub fn day_of_year(&self) -> u32 {
        self.key.date.ordinal()
    }

    /// `HH:MM` label, local midnight reads `24:00`
    pub fn time_label(&self) -> Option<String> {
        self.key.hour.map(|h| format!("{:02}:00", h))
    }

    pub fn report_time(&self) -> String {
        self.instant.to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    /// Timestamp on the label date, used for month-dependent validation
    pub fn timestamp(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.key.date, self.instant.time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_midnight_bucket_labels() {
        let label_date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let offset = FixedOffset::west_opt(8 * 3600).unwrap();
        let instant = offset.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bucket = Bucket::new(BucketKey::new(label_date, Some(24)), instant);

        assert_eq!(bucket.year(), 2023);
        assert_eq!(bucket.day_of_year(), 365);
        assert_eq!(bucket.time_label().as_deref(), Some("24:00"));
        assert_eq!(bucket.report_time(), "2024-01-01T00:00:00-08:00");
        assert_eq!(bucket.timestamp().date(), label_date);
        assert_eq!(bucket.key.to_string(), "2023-12-31 24:00");
    }
}
