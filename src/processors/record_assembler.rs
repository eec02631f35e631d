use crate::error::{ProcessingError, Result};
use crate::models::{Granularity, ReconciledRecord, SourceTags};
use crate::utils::constants::{
    COL_DATE, COL_DAY_OF_YEAR, COL_HOUR, COL_REPORT_TIME, COL_TIME, COL_YEAR, SOURCE_SUFFIX,
};
use indexmap::IndexMap;
use serde_json::{Number, Value};

/// Flat column -> scalar mapping, in allow-list order
pub type FlatRecord = IndexMap<String, Value>;

/// Projects reconciled records onto the destination's column allow-list
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    columns: Vec<String>,
    tags: SourceTags,
}

impl RecordAssembler {
    pub fn new(qc_columns: Vec<String>, tags: SourceTags) -> Self {
        Self {
            columns: qc_columns,
            tags,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn assemble(&self, record: &ReconciledRecord) -> Result<FlatRecord> {
        let identity = &record.identity;
        let bucket = identity.date.to_string();

        if record.granularity != Granularity::Daily {
            if identity.hour.is_none() {
                return Err(ProcessingError::MissingIdentifier {
                    field: COL_HOUR.to_string(),
                    bucket,
                });
            }
            if identity.time.is_none() && self.wants(COL_TIME) {
                return Err(ProcessingError::MissingIdentifier {
                    field: COL_TIME.to_string(),
                    bucket,
                });
            }
        }

        let mut flat = FlatRecord::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = match column.as_str() {
                COL_DATE => Value::String(bucket.clone()),
                COL_HOUR => identity.hour.map(Value::from).unwrap_or(Value::Null),
                COL_TIME => identity.time.clone().map(Value::String).unwrap_or(Value::Null),
                COL_YEAR => Value::from(identity.year),
                COL_DAY_OF_YEAR => Value::from(identity.day_of_year),
                COL_REPORT_TIME => Value::String(identity.report_time.clone()),
                other => self.field_value(record, other),
            };
            flat.insert(column.clone(), value);
        }

        Ok(flat)
    }

    fn wants(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    fn field_value(&self, record: &ReconciledRecord, column: &str) -> Value {
        if let Some(name) = column.strip_suffix(SOURCE_SUFFIX) {
            if let Some(field) = record.get(name) {
                return Value::String(self.tags.label(field.source).to_string());
            }
        }

        record
            .value(column)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attribution, ReconciledField, ReconciledRecordBuilder};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn hourly_record() -> ReconciledRecord {
        ReconciledRecordBuilder::new()
            .granularity(Granularity::Hourly)
            .date(NaiveDate::from_ymd_opt(2023, 7, 15).unwrap())
            .hour(13)
            .field("TAIR", ReconciledField::new(Some(28.4), Attribution::Primary))
            .field("RELH", ReconciledField::new(Some(100.0), Attribution::RelhCap))
            .field("PRECIP", ReconciledField::empty())
            .build()
            .unwrap()
    }

    #[test]
    fn test_projection_follows_allow_list() {
        let assembler = RecordAssembler::new(
            cols(&["date", "hour", "time", "TAIR", "TAIR_src", "RELH_src", "PRECIP", "PRECIP_src"]),
            SourceTags::default(),
        );
        let flat = assembler.assemble(&hourly_record()).unwrap();

        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["date", "hour", "time", "TAIR", "TAIR_src", "RELH_src", "PRECIP", "PRECIP_src"]
        );
        assert_eq!(flat["date"], json!("2023-07-15"));
        assert_eq!(flat["hour"], json!(13));
        assert_eq!(flat["time"], json!("13:00"));
        assert_eq!(flat["TAIR"], json!(28.4));
        assert_eq!(flat["TAIR_src"], json!("primary"));
        assert_eq!(flat["RELH_src"], json!("RELH_CAP"));
        assert_eq!(flat["PRECIP"], Value::Null);
        assert_eq!(flat["PRECIP_src"], json!("EMPTY"));
        // Working fields outside the allow-list are dropped
        assert!(!flat.contains_key("RELH"));
    }

    #[test]
    fn test_values_are_flat_scalars() {
        let assembler = RecordAssembler::new(
            cols(&["date", "year", "julday", "report_time", "TAIR", "TAIR_src"]),
            SourceTags::new("station", "grid"),
        );
        let flat = assembler.assemble(&hourly_record()).unwrap();
        assert!(flat.values().all(|v| !v.is_object() && !v.is_array()));
        assert_eq!(flat["year"], json!(2023));
        assert_eq!(flat["julday"], json!(196));
        assert_eq!(flat["TAIR_src"], json!("station"));
    }

    #[test]
    fn test_daily_record_has_null_hour() {
        let record = ReconciledRecordBuilder::new()
            .granularity(Granularity::Daily)
            .date(NaiveDate::from_ymd_opt(2023, 7, 15).unwrap())
            .build()
            .unwrap();
        let assembler = RecordAssembler::new(cols(&["date", "hour"]), SourceTags::default());
        let flat = assembler.assemble(&record).unwrap();
        assert_eq!(flat["hour"], Value::Null);
    }

    #[test]
    fn test_hourly_record_without_hour_is_rejected() {
        let mut record = hourly_record();
        record.identity.hour = None;
        let assembler = RecordAssembler::new(cols(&["date", "hour"]), SourceTags::default());

        let err = assembler.assemble(&record).unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::MissingIdentifier { ref field, .. } if field == "hour"
        ));
    }
}
