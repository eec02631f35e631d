use crate::error::{ProcessingError, Result};
use crate::models::attribution::Attribution;
use crate::models::bucket::Bucket;
use crate::models::variable::Granularity;
use crate::utils::constants::{COL_DATE, COL_HOUR};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value and attribution of one tracked variable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconciledField {
    pub value: Option<f64>,
    pub source: Attribution,
}

impl ReconciledField {
    pub fn new(value: Option<f64>, source: Attribution) -> Self {
        Self { value, source }
    }

    pub fn empty() -> Self {
        Self::new(None, Attribution::Empty)
    }

    pub fn out_of_range() -> Self {
        Self::new(None, Attribution::OutOfRange)
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }
}

/// Identifying columns of a reconciled record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketIdentity {
    pub date: NaiveDate,
    pub hour: Option<u8>,
    pub time: Option<String>,
    pub year: i32,
    pub day_of_year: u32,
    pub report_time: String,
}

/// Canonical output for one bucket: identifiers plus every tracked variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRecord {
    pub identity: BucketIdentity,
    pub granularity: Granularity,
    pub fields: BTreeMap<String, ReconciledField>,
}

impl ReconciledRecord {
    pub fn builder() -> ReconciledRecordBuilder {
        ReconciledRecordBuilder::new()
    }

    /// Record with every tracked variable null/`EMPTY`
    pub fn placeholder<'a>(
        bucket: &Bucket,
        granularity: Granularity,
        tracked: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self> {
        let mut builder = ReconciledRecordBuilder::new()
            .bucket(bucket)
            .granularity(granularity);
        for name in tracked {
            builder = builder.field(name, ReconciledField::empty());
        }
        builder.build()
    }

    pub fn get(&self, name: &str) -> Option<&ReconciledField> {
        self.fields.get(name)
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(|f| f.value)
    }

    pub fn source(&self, name: &str) -> Option<Attribution> {
        self.fields.get(name).map(|f| f.source)
    }

    pub fn set(&mut self, name: &str, value: Option<f64>, source: Attribution) {
        self.fields
            .insert(name.to_string(), ReconciledField::new(value, source));
    }

    pub fn is_null(&self, name: &str) -> bool {
        self.value(name).is_none()
    }

    /// Variables whose value is null
    pub fn null_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, f)| f.is_null())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Number of fields carrying each attribution
    pub fn attribution_counts(&self) -> BTreeMap<Attribution, usize> {
        let mut counts = BTreeMap::new();
        for field in self.fields.values() {
            *counts.entry(field.source).or_insert(0) += 1;
        }
        counts
    }
}

pub struct ReconciledRecordBuilder {
    date: Option<NaiveDate>,
    hour: Option<u8>,
    time: Option<String>,
    year: Option<i32>,
    day_of_year: Option<u32>,
    report_time: Option<String>,
    granularity: Option<Granularity>,
    fields: BTreeMap<String, ReconciledField>,
}

impl Default for ReconciledRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciledRecordBuilder {
    pub fn new() -> Self {
        Self {
            date: None,
            hour: None,
            time: None,
            year: None,
            day_of_year: None,
            report_time: None,
            granularity: None,
            fields: BTreeMap::new(),
        }
    }

    /// Copy every identifier from a bucket
    pub fn bucket(mut self, bucket: &Bucket) -> Self {
        self.date = Some(bucket.date());
        self.hour = bucket.hour();
        self.time = bucket.time_label();
        self.year = Some(bucket.year());
        self.day_of_year = Some(bucket.day_of_year());
        self.report_time = Some(bucket.report_time());
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn hour(mut self, hour: u8) -> Self {
        self.hour = Some(hour);
        self
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = Some(granularity);
        self
    }

    pub fn field(mut self, name: &str, field: ReconciledField) -> Self {
        self.fields.insert(name.to_string(), field);
        self
    }

    pub fn build(self) -> Result<ReconciledRecord> {
        let granularity = self
            .granularity
            .ok_or_else(|| ProcessingError::MissingData("granularity".to_string()))?;

        let bucket_label = self
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "<undated>".to_string());

        let date = self.date.ok_or_else(|| ProcessingError::MissingIdentifier {
            field: COL_DATE.to_string(),
            bucket: bucket_label.clone(),
        })?;

        if granularity != Granularity::Daily && self.hour.is_none() {
            return Err(ProcessingError::MissingIdentifier {
                field: COL_HOUR.to_string(),
                bucket: bucket_label,
            });
        }

        let time = self
            .time
            .or_else(|| self.hour.map(|h| format!("{:02}:00", h)));

        Ok(ReconciledRecord {
            identity: BucketIdentity {
                date,
                hour: self.hour,
                time,
                year: self.year.unwrap_or_else(|| chrono::Datelike::year(&date)),
                day_of_year: self
                    .day_of_year
                    .unwrap_or_else(|| chrono::Datelike::ordinal(&date)),
                report_time: self.report_time.unwrap_or_else(|| date.to_string()),
            },
            granularity,
            fields: self.fields,
        })
    }
}
