use chrono::{NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use station_qc_processor::models::{
    Bucket, Granularity, ObservationRecord, SourceTags, VariableRegistry,
};
use station_qc_processor::processors::{
    parse_timezone, IntegrityChecker, ParallelProcessor, RecordAssembler, SourceReconciler,
    TimeAxis,
};
use std::sync::Arc;

const VARIABLES: [&str; 6] = ["TAIR", "RELH", "DEWP", "PRECIP", "WSPD", "WDIR"];

fn columns() -> Vec<String> {
    let mut cols: Vec<String> = ["date", "hour", "time", "year", "julday", "report_time"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for name in VARIABLES {
        cols.push(name.to_string());
        cols.push(format!("{}_src", name));
    }
    cols
}

fn axis(days: u32, granularity: Granularity) -> Vec<Bucket> {
    let begin = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
    let end = begin + chrono::Duration::days(days as i64 - 1);
    TimeAxis::from_dates(
        begin,
        end,
        granularity,
        parse_timezone("America/Los_Angeles").unwrap(),
    )
    .unwrap()
    .buckets(Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap())
    .collect()
}

// Every fifth primary hour is missing, every seventh has an implausible humidity
fn create_test_inputs(buckets: &[Bucket]) -> (Vec<ObservationRecord>, Vec<ObservationRecord>) {
    let mut primary = Vec::with_capacity(buckets.len());
    let mut secondary = Vec::with_capacity(buckets.len());

    for (i, bucket) in buckets.iter().enumerate() {
        let hour = bucket.hour().unwrap_or(12);
        let temp = 8.0 + (hour as f64 - 12.0).abs() * -0.5 + (i % 13) as f64 * 0.1;
        let relh = if i % 7 == 0 { 103.0 } else { 55.0 + (i % 30) as f64 };

        let record = ObservationRecord::hourly(bucket.date(), hour)
            .with_value("TAIR", Some(temp))
            .with_value("RELH", Some(relh))
            .with_value("PRECIP", Some(if i % 11 == 0 { 0.4 } else { 0.0 }))
            .with_value("WSPD", Some(2.0 + (i % 9) as f64 * 0.3))
            .with_value("WDIR", Some((i * 37 % 360) as f64));

        if i % 5 != 0 {
            primary.push(record.clone());
        }
        secondary.push(record.with_value("TAIR", Some(temp + 0.2)));
    }

    (primary, secondary)
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
    ParallelProcessor::new(reconciler, RecordAssembler::new(columns(), tags))
}

fn benchmark_time_axis(c: &mut Criterion) {
    c.bench_function("time_axis_month_hourly", |b| {
        b.iter(|| black_box(axis(31, Granularity::Hourly).len()))
    });
}

fn benchmark_month_reconciliation(c: &mut Criterion) {
    let buckets = axis(31, Granularity::Hourly);
    let (primary, secondary) = create_test_inputs(&buckets);
    let processor = processor(Granularity::Hourly);

    c.bench_function("reconcile_month_hourly", |b| {
        b.iter(|| {
            let report = processor.process(&buckets, &primary, &secondary, None).unwrap();
            black_box(report.records.len())
        })
    });
}

fn benchmark_integrity_checker(c: &mut Criterion) {
    let buckets = axis(31, Granularity::Hourly);
    let (primary, secondary) = create_test_inputs(&buckets);
    let report = processor(Granularity::Hourly)
        .process(&buckets, &primary, &secondary, None)
        .unwrap();

    c.bench_function("integrity_checker_month", |b| {
        b.iter(|| {
            let checker = IntegrityChecker::default();
            let integrity = checker.check_report(&report, &buckets);
            black_box(integrity.map(|r| r.total_records).unwrap_or(0))
        })
    });
}

fn benchmark_varying_worker_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_by_workers");
    let buckets = axis(31, Granularity::Hourly);
    let (primary, secondary) = create_test_inputs(&buckets);

    for &workers in &[1usize, 2, 4, 8] {
        let processor = processor(Granularity::Hourly).with_max_workers(workers);
        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, _| {
            b.iter(|| {
                let report = processor.process(&buckets, &primary, &secondary, None).unwrap();
                black_box(report.records.len())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_time_axis,
    benchmark_month_reconciliation,
    benchmark_integrity_checker,
    benchmark_varying_worker_counts
);
criterion_main!(benches);
