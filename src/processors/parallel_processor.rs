use crate::error::{ProcessingError, Result};
use crate::models::{Bucket, BucketKey, Granularity, ObservationRecord, ReconciledRecord};
use crate::processors::record_assembler::{FlatRecord, RecordAssembler};
use crate::processors::source_reconciler::{SecondaryMaterial, SourceReconciler};
use crate::utils::progress::ProgressReporter;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug_span, info, warn, Span};

/// A bucket that could not be emitted
#[derive(Debug, Clone, PartialEq)]
pub struct BucketFailure {
    pub bucket: BucketKey,
    pub reason: String,
}

/// Outcome of reconciling a whole axis
#[derive(Debug, Clone, Default)]
pub struct ReconciliationReport {
    /// Flat output records in bucket order
    pub records: Vec<FlatRecord>,
    /// Reconciled records backing `records`, same order
    pub reconciled: Vec<ReconciledRecord>,
    pub failures: Vec<BucketFailure>,
    pub skipped_primary: usize,
    pub skipped_secondary: usize,
    pub duplicate_inputs: usize,
}

impl ReconciliationReport {
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str("=== Reconciliation Summary ===\n");
        summary.push_str(&format!("Records Emitted: {}\n", self.records.len()));
        summary.push_str(&format!("Failed Buckets: {}\n", self.failures.len()));
        summary.push_str(&format!(
            "Skipped Inputs: {} primary, {} secondary\n",
            self.skipped_primary, self.skipped_secondary
        ));
        summary.push_str(&format!("Duplicate Inputs Ignored: {}\n", self.duplicate_inputs));

        for failure in self.failures.iter().take(10) {
            summary.push_str(&format!("  {}: {}\n", failure.bucket, failure.reason));
        }
        summary
    }
}

/// Bucket-keyed view over one input list
#[derive(Debug, Default)]
struct InputIndex<'a> {
    by_key: HashMap<BucketKey, &'a ObservationRecord>,
    hourly_by_date: HashMap<NaiveDate, BTreeMap<u8, &'a ObservationRecord>>,
    skipped: usize,
    duplicates: usize,
}

impl<'a> InputIndex<'a> {
    /// Index records at `granularity`; for daily runs, hourly secondary
    /// records are grouped by date instead
    ///
    /// Hourly labels are normalised to the hour-ending convention first, so
    /// hour `0` lands on hour 24 of the previous date.
    fn build(
        records: &'a [ObservationRecord],
        granularity: Granularity,
        group_hourly: bool,
        label: &str,
    ) -> Self {
        let mut index = Self::default();

        for record in records {
            let Some(date) = record.date else {
                index.skipped += 1;
                warn!(input = label, "skipping record without a date");
                continue;
            };

            match (granularity, record.hour) {
                (Granularity::Daily, None) => {
                    index.insert(BucketKey::new(date, None), record, label)
                }
                (Granularity::Daily, Some(_)) if !group_hourly => {
                    index.skipped += 1;
                    warn!(input = label, %date, "skipping hourly record in a daily run");
                }
                (_, Some(hour)) => {
                    let Some(key) = record.hour_ending_key() else {
                        index.skipped += 1;
                        warn!(input = label, %date, hour, "skipping record with an invalid hour");
                        continue;
                    };
                    if granularity == Granularity::Daily {
                        index.group(key, record, label);
                    } else {
                        index.insert(key, record, label);
                    }
                }
                (_, None) => {
                    index.skipped += 1;
                    warn!(input = label, %date, "skipping hourly record without an hour");
                }
            }
        }

        index
    }

    fn group(&mut self, key: BucketKey, record: &'a ObservationRecord, label: &str) {
        let Some(hour) = key.hour else {
            return;
        };
        let day = self.hourly_by_date.entry(key.date).or_default();
        if day.contains_key(&hour) {
            self.duplicates += 1;
            warn!(input = label, bucket = %key, "duplicate hourly record ignored");
        } else {
            day.insert(hour, record);
        }
    }

    fn insert(&mut self, key: BucketKey, record: &'a ObservationRecord, label: &str) {
        if self.by_key.contains_key(&key) {
            self.duplicates += 1;
            warn!(input = label, bucket = %key, "duplicate record ignored");
        } else {
            self.by_key.insert(key, record);
        }
    }

    fn get(&self, key: &BucketKey) -> Option<&'a ObservationRecord> {
        self.by_key.get(key).copied()
    }

    fn material(&self, key: &BucketKey) -> SecondaryMaterial<'a> {
        if let Some(record) = self.get(key) {
            return SecondaryMaterial::PointInTime(record);
        }
        match self.hourly_by_date.get(&key.date) {
            Some(day) if key.hour.is_none() => {
                SecondaryMaterial::HourlySet(day.values().copied().collect())
            }
            _ => SecondaryMaterial::None,
        }
    }
}

/// Reconciles every bucket of an axis on a bounded rayon pool
pub struct ParallelProcessor {
    reconciler: SourceReconciler,
    assembler: RecordAssembler,
    max_workers: usize,
    span: Span,
}

impl ParallelProcessor {
    pub fn new(reconciler: SourceReconciler, assembler: RecordAssembler) -> Self {
        Self {
            reconciler,
            assembler,
            max_workers: num_cpus::get(),
            span: Span::none(),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Parent span for every per-bucket span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn reconciler(&self) -> &SourceReconciler {
        &self.reconciler
    }

    pub fn assembler(&self) -> &RecordAssembler {
        &self.assembler
    }

    /// Reconcile `buckets` against pre-fetched primary and secondary records
    pub fn process(
        &self,
        buckets: &[Bucket],
        primary: &[ObservationRecord],
        secondary: &[ObservationRecord],
        progress: Option<&ProgressReporter>,
    ) -> Result<ReconciliationReport> {
        let _run = self.span.enter();
        let granularity = self.reconciler.granularity();

        let primary_index = InputIndex::build(primary, granularity, false, "primary");
        let secondary_index = InputIndex::build(secondary, granularity, true, "secondary");

        if let Some(p) = progress {
            p.set_message(&format!("Reconciling {} buckets...", buckets.len()));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let processed = AtomicUsize::new(0);
        let outcomes: Vec<std::result::Result<(ReconciledRecord, FlatRecord), BucketFailure>> =
            pool.install(|| {
                buckets
                    .par_iter()
                    .map(|bucket| {
                        let outcome = self.process_bucket(bucket, &primary_index, &secondary_index);

                        let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
                        if let Some(p) = progress {
                            p.update(count as u64);
                        }
                        outcome
                    })
                    .collect()
            });

        let mut report = ReconciliationReport {
            skipped_primary: primary_index.skipped,
            skipped_secondary: secondary_index.skipped,
            duplicate_inputs: primary_index.duplicates + secondary_index.duplicates,
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome {
                Ok((reconciled, flat)) => {
                    report.reconciled.push(reconciled);
                    report.records.push(flat);
                }
                Err(failure) => {
                    warn!(bucket = %failure.bucket, reason = %failure.reason, "bucket skipped");
                    report.failures.push(failure);
                }
            }
        }

        info!(
            buckets = buckets.len(),
            emitted = report.records.len(),
            failed = report.failures.len(),
            granularity = %granularity,
            "reconciliation finished"
        );

        if let Some(p) = progress {
            p.finish_with_message(&format!("Reconciled {} buckets", report.records.len()));
        }

        Ok(report)
    }

    fn process_bucket(
        &self,
        bucket: &Bucket,
        primary: &InputIndex<'_>,
        secondary: &InputIndex<'_>,
    ) -> std::result::Result<(ReconciledRecord, FlatRecord), BucketFailure> {
        let span = debug_span!(parent: &self.span, "bucket", key = %bucket.key);
        let _enter = span.enter();

        let failure = |e: ProcessingError| BucketFailure {
            bucket: bucket.key,
            reason: e.to_string(),
        };

        let reconciled = self
            .reconciler
            .reconcile_bucket(bucket, primary.get(&bucket.key), secondary.material(&bucket.key))
            .map_err(failure)?;
        let flat = self.assembler.assemble(&reconciled).map_err(failure)?;

        Ok((reconciled, flat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SourceTags, VariableRegistry};
    use crate::processors::time_axis::{parse_timezone, TimeAxis};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::Arc;

    fn columns() -> Vec<String> {
        ["date", "hour", "time", "TAIR", "TAIR_src", "PRECIP", "PRECIP_src"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn processor(granularity: Granularity) -> ParallelProcessor {
        let tags = SourceTags::default();
        let reconciler = SourceReconciler::from_columns(
            Arc::new(VariableRegistry::new()),
            &columns(),
            granularity,
            tags.clone(),
        )
        .unwrap();
        ParallelProcessor::new(reconciler, RecordAssembler::new(columns(), tags)).with_max_workers(2)
    }

    fn buckets(begin: &str, end: &str, granularity: Granularity) -> Vec<Bucket> {
        let axis = TimeAxis::new(
            begin,
            end,
            granularity,
            parse_timezone("America/Los_Angeles").unwrap(),
        )
        .unwrap();
        axis.buckets(Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap())
            .collect()
    }

    #[test]
    fn test_one_record_per_bucket_in_order() {
        let date = NaiveDate::from_ymd_opt(2023, 7, 15).unwrap();
        let primary = vec![
            ObservationRecord::hourly(date, 3).with_value("TAIR", Some(18.0)),
            ObservationRecord::hourly(date, 24).with_value("TAIR", Some(16.5)),
        ];

        let report = processor(Granularity::Hourly)
            .process(&buckets("2023-07-15", "2023-07-16", Granularity::Hourly), &primary, &[], None)
            .unwrap();

        assert_eq!(report.records.len(), 48);
        assert!(report.failures.is_empty());
        assert_eq!(report.records[2]["TAIR"], json!(18.0));
        assert_eq!(report.records[23]["time"], json!("24:00"));
        assert_eq!(report.records[23]["TAIR_src"], json!("primary"));
        assert_eq!(report.records[0]["TAIR_src"], json!("EMPTY"));
        assert_eq!(report.records[24]["date"], json!("2023-07-16"));
    }

    #[test]
    fn test_inputs_without_identifiers_are_counted() {
        let date = NaiveDate::from_ymd_opt(2023, 7, 15).unwrap();
        let mut undated = ObservationRecord::hourly(date, 1);
        undated.date = None;
        let primary = vec![
            undated,
            ObservationRecord::new(date, None),
            ObservationRecord::hourly(date, 1).with_value("TAIR", Some(20.0)),
            ObservationRecord::hourly(date, 1).with_value("TAIR", Some(99.0)),
        ];

        let report = processor(Granularity::Hourly)
            .process(&buckets("2023-07-15", "2023-07-15", Granularity::Hourly), &primary, &[], None)
            .unwrap();

        assert_eq!(report.skipped_primary, 2);
        assert_eq!(report.duplicate_inputs, 1);
        // First record wins
        assert_eq!(report.records[0]["TAIR"], json!(20.0));
    }

    #[test]
    fn test_daily_run_groups_hourly_secondary() {
        let date = NaiveDate::from_ymd_opt(2023, 7, 15).unwrap();
        let hourly: Vec<ObservationRecord> = (1..=24)
            .map(|h| ObservationRecord::hourly(date, h).with_value("PRECIP", Some(0.5)))
            .collect();
        let primary = vec![ObservationRecord::daily(date).with_value("TAIR", Some(22.0))];

        let report = processor(Granularity::Daily)
            .process(&buckets("2023-07-15", "2023-07-16", Granularity::Daily), &primary, &hourly, None)
            .unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0]["PRECIP"], json!(12.0));
        assert_eq!(report.records[0]["PRECIP_src"], json!("estimate"));
        assert_eq!(report.records[0]["hour"], serde_json::Value::Null);
        assert_eq!(report.records[1]["PRECIP_src"], json!("EMPTY"));
    }

    #[test]
    fn test_hour_zero_fills_previous_day_hour_24() {
        let next = NaiveDate::from_ymd_opt(2023, 7, 16).unwrap();
        let primary = vec![
            ObservationRecord::hourly(next, 0).with_value("TAIR", Some(20.0)),
            ObservationRecord::hourly(next, 25).with_value("TAIR", Some(21.0)),
        ];

        let report = processor(Granularity::Hourly)
            .process(&buckets("2023-07-15", "2023-07-15", Granularity::Hourly), &primary, &[], None)
            .unwrap();

        assert_eq!(report.records[23]["time"], json!("24:00"));
        assert_eq!(report.records[23]["TAIR"], json!(20.0));
        assert_eq!(report.records[23]["TAIR_src"], json!("primary"));
        assert_eq!(report.skipped_primary, 1);
        assert_eq!(report.duplicate_inputs, 0);
    }

    #[test]
    fn test_midnight_start_labels_do_not_make_a_complete_day() {
        // Hours 0..=23 cover the previous midnight and miss this day's hour 24
        let date = NaiveDate::from_ymd_opt(2023, 7, 15).unwrap();
        let hourly: Vec<ObservationRecord> = (0..24)
            .map(|h| ObservationRecord::hourly(date, h).with_value("PRECIP", Some(0.5)))
            .collect();

        let report = processor(Granularity::Daily)
            .process(&buckets("2023-07-14", "2023-07-15", Granularity::Daily), &[], &hourly, None)
            .unwrap();

        assert_eq!(report.records.len(), 2);
        assert!(report
            .records
            .iter()
            .all(|r| r["PRECIP_src"] == json!("EMPTY") && r["PRECIP"].is_null()));
        assert_eq!(report.skipped_secondary, 0);
    }

    #[test]
    fn test_daily_run_skips_hourly_primary_rows() {
        let date = NaiveDate::from_ymd_opt(2023, 7, 15).unwrap();
        let primary: Vec<ObservationRecord> = (1..=24)
            .map(|h| ObservationRecord::hourly(date, h).with_value("PRECIP", Some(0.5)))
            .collect();

        let report = processor(Granularity::Daily)
            .process(&buckets("2023-07-15", "2023-07-15", Granularity::Daily), &primary, &[], None)
            .unwrap();

        assert_eq!(report.skipped_primary, 24);
        assert_eq!(report.duplicate_inputs, 0);
        assert_eq!(report.records[0]["PRECIP"], serde_json::Value::Null);
        assert_eq!(report.records[0]["PRECIP_src"], json!("EMPTY"));
    }
}
