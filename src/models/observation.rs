use crate::models::bucket::BucketKey;
use crate::utils::constants::HOURS_PER_DAY;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One station's readings for a single time bucket, as fetched from a source
///
/// `hour` uses the hour-ending label convention (1..=24, local midnight is
/// hour 24 of the previous date) and is absent for daily records. Values
/// are raw: a `None` entry and a missing key both mean "no reading".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ObservationRecord {
    #[serde(default)]
    pub station: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub hour: Option<u8>,
    #[serde(default)]
    pub values: BTreeMap<String, Option<f64>>,
    /// Attribution labels carried by already-reconciled material (`<name>_src`)
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
}

impl ObservationRecord {
    pub fn new(date: NaiveDate, hour: Option<u8>) -> Self {
        Self {
            station: None,
            date: Some(date),
            hour,
            values: BTreeMap::new(),
            sources: BTreeMap::new(),
        }
    }

    pub fn daily(date: NaiveDate) -> Self {
        Self::new(date, None)
    }

    pub fn hourly(date: NaiveDate, hour: u8) -> Self {
        Self::new(date, Some(hour))
    }

    pub fn with_station(mut self, station: &str) -> Self {
        self.station = Some(station.to_string());
        self
    }

    pub fn with_value(mut self, name: &str, value: Option<f64>) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn with_source(mut self, name: &str, source: &str) -> Self {
        self.sources.insert(name.to_string(), source.to_string());
        self
    }

    pub fn set_value(&mut self, name: &str, value: Option<f64>) {
        self.values.insert(name.to_string(), value);
    }

    /// Raw reading for `name`; `None` when null or absent
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }

    pub fn source(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(|s| s.as_str())
    }

    /// Whether any field's attribution equals one of `origins`
    pub fn has_source_in(&self, origins: &[String]) -> bool {
        self.sources
            .values()
            .any(|src| origins.iter().any(|o| o == src))
    }

    /// Bucket this record belongs to, when its identifiers are present
    pub fn key(&self) -> Option<BucketKey> {
        self.date.map(|date| BucketKey::new(date, self.hour))
    }

    /// Hourly bucket under the hour-ending convention
    ///
    /// Hour `0` is the midnight that opens `date`, i.e. hour 24 of the
    /// previous date. `None` without a date or hour, or for labels past 24.
    pub fn hour_ending_key(&self) -> Option<BucketKey> {
        let date = self.date?;
        match self.hour? {
            0 => date
                .pred_opt()
                .map(|previous| BucketKey::new(previous, Some(HOURS_PER_DAY as u8))),
            hour if hour as usize <= HOURS_PER_DAY => Some(BucketKey::new(date, Some(hour))),
            _ => None,
        }
    }
}
