use crate::error::{ProcessingError, Result};
use crate::models::{Bucket, BucketKey, Granularity};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Parse an IANA zone name such as `America/Los_Angeles`
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ProcessingError::UnknownTimezone(name.to_string()))
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let trimmed = s.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y%m%d"))
        .map_err(ProcessingError::from)
}

/// Canonical sequence of hourly or daily buckets for a date range
///
/// Hourly buckets carry hour-ending labels 1..=24: the civil instants
/// `begin 01:00` through `(end + 1) 00:00`, with local midnight attributed
/// to hour 24 of the previous date. Civil hours skipped by a spring-forward
/// transition are not emitted; the repeated hour of a fall-back transition
/// is emitted once, resolved to its earlier UTC instant.
#[derive(Debug, Clone)]
pub struct TimeAxis {
    begin: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
    timezone: Tz,
}

impl TimeAxis {
    pub fn new(begin: &str, end: &str, granularity: Granularity, timezone: Tz) -> Result<Self> {
        Self::from_dates(parse_date(begin)?, parse_date(end)?, granularity, timezone)
    }

    pub fn from_dates(
        begin: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
        timezone: Tz,
    ) -> Result<Self> {
        if granularity == Granularity::SubHourly {
            return Err(ProcessingError::InvalidGranularity(format!(
                "{} buckets are not supported on a time axis",
                granularity
            )));
        }

        Ok(Self {
            begin,
            end,
            granularity,
            timezone,
        })
    }

    pub fn begin(&self) -> NaiveDate {
        self.begin
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Lazily produce every bucket whose instant is not later than `now`
    pub fn buckets(&self, now: DateTime<Utc>) -> TimeAxisIter {
        let (start, stop, step) = match self.granularity {
            Granularity::Daily => (
                self.begin.and_time(NaiveTime::MIN),
                self.end.and_time(NaiveTime::MIN),
                Duration::days(1),
            ),
            _ => (
                self.begin.and_time(NaiveTime::MIN) + Duration::hours(1),
                self.end.and_time(NaiveTime::MIN) + Duration::days(1),
                Duration::hours(1),
            ),
        };

        TimeAxisIter {
            civil: start,
            stop,
            step,
            granularity: self.granularity,
            timezone: self.timezone,
            now: now.with_timezone(&self.timezone).fixed_offset(),
            finished: self.end < self.begin,
        }
    }

    /// Collect the axis up to now
    pub fn buckets_until_now(&self) -> Vec<Bucket> {
        self.buckets(Utc::now()).collect()
    }
}

pub struct TimeAxisIter {
    civil: NaiveDateTime,
    stop: NaiveDateTime,
    step: Duration,
    granularity: Granularity,
    timezone: Tz,
    now: DateTime<FixedOffset>,
    finished: bool,
}

impl TimeAxisIter {
    fn resolve(&self, civil: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self.timezone.from_local_datetime(&civil) {
            // Spring forward: this civil time does not exist
            chrono::LocalResult::None => None,
            chrono::LocalResult::Single(dt) => Some(dt.fixed_offset()),
            // Fall back: keep the earlier instant
            chrono::LocalResult::Ambiguous(earlier, _later) => Some(earlier.fixed_offset()),
        }
    }

    fn key_for(&self, civil: NaiveDateTime) -> BucketKey {
        match self.granularity {
            Granularity::Daily => BucketKey::new(civil.date(), None),
            _ if civil.hour() == 0 => {
                let previous = civil.date().pred_opt().unwrap_or(civil.date());
                BucketKey::new(previous, Some(24))
            }
            _ => BucketKey::new(civil.date(), Some(civil.hour() as u8)),
        }
    }
}

impl Iterator for TimeAxisIter {
    type Item = Bucket;

    fn next(&mut self) -> Option<Bucket> {
        while !self.finished && self.civil <= self.stop {
            let civil = self.civil;
            self.civil += self.step;

            let instant = match self.resolve(civil) {
                Some(instant) => instant,
                None if self.granularity == Granularity::Daily => {
                    // Midnight skipped by a transition: the day starts an hour later
                    match self.resolve(civil + Duration::hours(1)) {
                        Some(instant) => instant,
                        None => continue,
                    }
                }
                None => continue,
            };

            if instant > self.now {
                self.finished = true;
                return None;
            }

            return Some(Bucket::new(self.key_for(civil), instant));
        }

        self.finished = true;
        None
    }
}
