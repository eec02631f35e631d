use crate::error::Result;
use crate::models::{Attribution, Bucket, BucketKey, ReconciledRecord, SourceTags, VariableRegistry};
use crate::processors::parallel_processor::ReconciliationReport;
use crate::processors::record_assembler::FlatRecord;
use crate::utils::constants::{RELH_MAX, SOURCE_SUFFIX};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    pub total_records: usize,
    pub expected_buckets: usize,
    pub missing_buckets: Vec<BucketKey>,
    pub duplicate_buckets: Vec<BucketKey>,
    pub unexpected_buckets: Vec<BucketKey>,
    pub complete_records: usize,
    pub null_fields: usize,
    pub violations: Vec<FieldViolation>,
    /// Field count per output label
    pub source_counts: BTreeMap<String, usize>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.missing_buckets.is_empty()
            && self.duplicate_buckets.is_empty()
            && self.unexpected_buckets.is_empty()
            && self.violations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    pub bucket: BucketKey,
    pub field: String,
    pub violation_type: ViolationType,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationType {
    ValueWithoutSource,
    HumidityAboveMax,
    NonFiniteValue,
    MissingSourceColumn,
}

/// Post-run checks on a reconciled series
///
/// Violations are collected into the report, never raised.
pub struct IntegrityChecker {
    registry: Arc<VariableRegistry>,
    tags: SourceTags,
}

impl IntegrityChecker {
    pub fn new(registry: Arc<VariableRegistry>, tags: SourceTags) -> Self {
        Self { registry, tags }
    }

    /// Check records against the buckets the axis expected
    pub fn check_integrity(
        &self,
        records: &[ReconciledRecord],
        expected: &[Bucket],
    ) -> Result<IntegrityReport> {
        let mut report = IntegrityReport {
            total_records: records.len(),
            expected_buckets: expected.len(),
            ..Default::default()
        };

        self.check_coverage(records, expected, &mut report);

        for record in records {
            self.check_record(record, &mut report);
        }

        Ok(report)
    }

    /// Coverage and field checks plus the `_src` pairing of the flat output
    pub fn check_report(
        &self,
        run: &ReconciliationReport,
        expected: &[Bucket],
    ) -> Result<IntegrityReport> {
        let mut report = self.check_integrity(&run.reconciled, expected)?;
        for (record, flat) in run.reconciled.iter().zip(&run.records) {
            self.check_source_columns(record, flat, &mut report);
        }
        Ok(report)
    }

    fn check_coverage(
        &self,
        records: &[ReconciledRecord],
        expected: &[Bucket],
        report: &mut IntegrityReport,
    ) {
        let mut seen: HashMap<BucketKey, usize> = HashMap::new();
        for record in records {
            let key = BucketKey::new(record.identity.date, record.identity.hour);
            *seen.entry(key).or_insert(0) += 1;
        }

        for bucket in expected {
            match seen.get(&bucket.key) {
                None => report.missing_buckets.push(bucket.key),
                Some(&n) if n > 1 => report.duplicate_buckets.push(bucket.key),
                Some(_) => {}
            }
        }

        let expected_keys: std::collections::HashSet<BucketKey> =
            expected.iter().map(|b| b.key).collect();
        let mut unexpected: Vec<BucketKey> = seen
            .keys()
            .filter(|k| !expected_keys.contains(k))
            .copied()
            .collect();
        unexpected.sort();
        report.unexpected_buckets = unexpected;
    }

    fn check_record(&self, record: &ReconciledRecord, report: &mut IntegrityReport) {
        let key = BucketKey::new(record.identity.date, record.identity.hour);
        let mut complete = true;

        for (name, field) in &record.fields {
            *report
                .source_counts
                .entry(self.tags.label(field.source).to_string())
                .or_insert(0) += 1;

            let Some(value) = field.value else {
                complete = false;
                report.null_fields += 1;
                continue;
            };

            if !field.source.carries_value() {
                report.violations.push(FieldViolation {
                    bucket: key,
                    field: name.clone(),
                    violation_type: ViolationType::ValueWithoutSource,
                    details: format!(
                        "value {} tagged {}",
                        value,
                        self.tags.label(field.source)
                    ),
                });
            }

            if !value.is_finite() {
                report.violations.push(FieldViolation {
                    bucket: key,
                    field: name.clone(),
                    violation_type: ViolationType::NonFiniteValue,
                    details: format!("value {} is not finite", value),
                });
            }

            let is_humidity = self
                .registry
                .category_of(name)
                .is_some_and(|c| c.is_relative_humidity());
            if is_humidity && value > RELH_MAX {
                report.violations.push(FieldViolation {
                    bucket: key,
                    field: name.clone(),
                    violation_type: ViolationType::HumidityAboveMax,
                    details: format!("relative humidity {} exceeds {}", value, RELH_MAX),
                });
            }
        }

        if complete {
            report.complete_records += 1;
        }
    }

    fn check_source_columns(
        &self,
        record: &ReconciledRecord,
        flat: &FlatRecord,
        report: &mut IntegrityReport,
    ) {
        let key = BucketKey::new(record.identity.date, record.identity.hour);
        for name in record.fields.keys() {
            if !flat.contains_key(name) {
                continue;
            }
            let src = format!("{}{}", name, SOURCE_SUFFIX);
            if !flat.contains_key(&src) {
                report.violations.push(FieldViolation {
                    bucket: key,
                    field: name.clone(),
                    violation_type: ViolationType::MissingSourceColumn,
                    details: format!("{} emitted without {}", name, src),
                });
            }
        }
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let mut summary = String::new();
        let pct = |n: usize, total: usize| {
            if total == 0 {
                0.0
            } else {
                100.0 * n as f64 / total as f64
            }
        };

        summary.push_str("=== Integrity Check Report ===\n");
        summary.push_str(&format!("Total Records: {}\n", report.total_records));
        summary.push_str(&format!("Expected Buckets: {}\n", report.expected_buckets));
        summary.push_str(&format!(
            "Complete Records: {} ({:.1}%)\n",
            report.complete_records,
            pct(report.complete_records, report.total_records)
        ));
        summary.push_str(&format!("Null Fields: {}\n", report.null_fields));
        summary.push_str(&format!(
            "Missing/Duplicate/Unexpected Buckets: {}/{}/{}\n",
            report.missing_buckets.len(),
            report.duplicate_buckets.len(),
            report.unexpected_buckets.len()
        ));

        let total_fields: usize = report.source_counts.values().sum();
        if total_fields > 0 {
            summary.push_str("\nField Sources:\n");
            for (label, count) in &report.source_counts {
                summary.push_str(&format!(
                    "  {:<12} {:>8} ({:.1}%)\n",
                    label,
                    count,
                    pct(*count, total_fields)
                ));
            }
        }

        summary.push_str(&format!("\nViolations: {}\n", report.violations.len()));
        if !report.violations.is_empty() {
            summary.push_str("\nTop 10 Violations:\n");
            for (i, violation) in report.violations.iter().take(10).enumerate() {
                summary.push_str(&format!(
                    "  {}. {} {}: {}\n",
                    i + 1,
                    violation.bucket,
                    violation.field,
                    violation.details
                ));
            }
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new(Arc::new(VariableRegistry::new()), SourceTags::default())
    }
}

/// Shorthand used by callers that only need the attribution totals
pub fn attribution_totals(records: &[ReconciledRecord]) -> BTreeMap<Attribution, usize> {
    let mut totals = BTreeMap::new();
    for record in records {
        for (attribution, count) in record.attribution_counts() {
            *totals.entry(attribution).or_insert(0) += count;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Granularity, ReconciledField, ReconciledRecordBuilder};
    use crate::processors::time_axis::{parse_timezone, TimeAxis};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn axis() -> Vec<Bucket> {
        TimeAxis::new(
            "2023-07-15",
            "2023-07-17",
            Granularity::Daily,
            parse_timezone("America/Los_Angeles").unwrap(),
        )
        .unwrap()
        .buckets(Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap())
        .collect()
    }

    fn record(day: u32, relh: ReconciledField) -> ReconciledRecord {
        ReconciledRecordBuilder::new()
            .granularity(Granularity::Daily)
            .date(NaiveDate::from_ymd_opt(2023, 7, day).unwrap())
            .field("RELH_MAX", relh)
            .build()
            .unwrap()
    }

    #[test]
    fn test_clean_series() {
        let records: Vec<ReconciledRecord> = (15..=17)
            .map(|d| record(d, ReconciledField::new(Some(88.0), Attribution::Primary)))
            .collect();
        let checker = IntegrityChecker::default();
        let report = checker.check_integrity(&records, &axis()).unwrap();

        assert!(report.is_clean());
        assert_eq!(report.complete_records, 3);
        assert_eq!(report.source_counts.get("primary"), Some(&3));
    }

    #[test]
    fn test_gaps_and_duplicates_are_reported() {
        let field = ReconciledField::new(Some(50.0), Attribution::Primary);
        let records = vec![record(15, field), record(15, field), record(18, field)];
        let report = IntegrityChecker::default()
            .check_integrity(&records, &axis())
            .unwrap();

        assert_eq!(report.duplicate_buckets.len(), 1);
        assert_eq!(report.missing_buckets.len(), 2);
        assert_eq!(report.unexpected_buckets.len(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_field_violations() {
        let records = vec![
            record(15, ReconciledField::new(Some(101.0), Attribution::Secondary)),
            record(16, ReconciledField::new(Some(40.0), Attribution::Empty)),
            record(17, ReconciledField::out_of_range()),
        ];
        let checker = IntegrityChecker::default();
        let report = checker.check_integrity(&records, &axis()).unwrap();

        let kinds: Vec<ViolationType> = report.violations.iter().map(|v| v.violation_type).collect();
        assert_eq!(
            kinds,
            vec![ViolationType::HumidityAboveMax, ViolationType::ValueWithoutSource]
        );
        assert_eq!(report.null_fields, 1);
        assert!(checker.generate_summary(&report).contains("Violations: 2"));
    }
}
