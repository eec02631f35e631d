use crate::cli::args::{AxisArgs, Cli, Commands, InputArgs, OutputFormat};
use crate::config::EngineConfig;
use crate::models::{Bucket, VariableRegistry};
use crate::processors::integrity_checker::attribution_totals;
use crate::processors::{
    IntegrityChecker, ParallelProcessor, RecordAssembler, ReconciliationReport, SourceReconciler,
    TimeAxis,
};
use crate::readers::{ConcurrentReader, SchemaReader};
use crate::utils::filename::generate_default_output_filename;
use crate::utils::logging;
use crate::utils::progress::ProgressReporter;
use crate::writers::{JsonLinesWriter, ParquetWriter};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, info_span};

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    logging::init(cli.verbose, cli.log_file.as_deref())?;

    let mut config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Reconcile {
            axis,
            inputs,
            output_file,
            format,
            compression,
            chunk_size,
        } => {
            if let Some(compression) = compression {
                config.compression = compression;
            }
            apply_overrides(&mut config, &axis, Some(&inputs))?;

            let (buckets, report, checker) = reconcile(&config, &axis, &inputs).await?;
            println!("\n{}", report.summary());
            let integrity = checker.check_report(&report, &buckets)?;
            println!("{}", checker.generate_summary(&integrity));

            if report.records.is_empty() {
                println!("No records to write");
                return Ok(());
            }

            let output_file = output_file.unwrap_or_else(|| {
                generate_default_output_filename(
                    config.granularity().unwrap_or(crate::models::Granularity::Hourly),
                    format.extension(),
                )
            });
            if let Some(parent) = output_file.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let columns = read_schema(&inputs)?;
            println!(
                "Writing {} records to {}...",
                report.records.len(),
                output_file.display()
            );

            match format {
                OutputFormat::Parquet => {
                    let writer = ParquetWriter::new()
                        .with_compression(&config.compression)?
                        .with_row_group_size(config.row_group_size);
                    writer
                        .write_records_batched(&report.records, &columns, &output_file, chunk_size)
                        .with_context(|| format!("writing {}", output_file.display()))?;

                    let file_info = writer.get_file_info(&output_file)?;
                    println!("\n{}", file_info.summary());
                }
                OutputFormat::Jsonl => {
                    JsonLinesWriter::write_records(&report.records, &output_file)
                        .with_context(|| format!("writing {}", output_file.display()))?;
                }
            }

            println!("Reconciliation complete!");
        }

        Commands::Validate { axis, inputs } => {
            apply_overrides(&mut config, &axis, Some(&inputs))?;

            let (buckets, report, checker) = reconcile(&config, &axis, &inputs).await?;
            let integrity = checker.check_report(&report, &buckets)?;

            println!("\n{}", report.summary());
            println!("{}", checker.generate_summary(&integrity));

            if integrity.is_clean() && report.failures.is_empty() {
                println!("✅ Output passed all integrity checks");
            } else {
                println!(
                    "⚠️  Found {} integrity issues and {} failed buckets",
                    integrity.violations.len()
                        + integrity.missing_buckets.len()
                        + integrity.duplicate_buckets.len(),
                    report.failures.len()
                );
            }
        }

        Commands::Axis { axis, limit } => {
            apply_overrides(&mut config, &axis, None)?;
            let buckets = build_axis(&config, &axis)?;

            let shown = if limit == 0 { buckets.len() } else { limit };
            for bucket in buckets.iter().take(shown) {
                println!(
                    "{}\t{}\t{}",
                    bucket.key,
                    bucket.time_label().unwrap_or_default(),
                    bucket.report_time()
                );
            }
            println!("{} buckets", buckets.len());
        }

        Commands::Info { file, sample } => {
            println!("Analyzing Parquet file: {}", file.display());

            let writer = ParquetWriter::new();
            let file_info = writer
                .get_file_info(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            println!("\n{}", file_info.summary());
            println!("Columns: {}", file_info.columns.join(", "));

            if sample > 0 {
                println!("\nSample Records (showing up to {} records):", sample);
                match writer.read_sample_records(&file, sample) {
                    Ok(records) => {
                        for (i, record) in records.iter().enumerate() {
                            println!("{}. {}", i + 1, serde_json::to_string(record)?);
                        }
                    }
                    Err(e) => println!("Error reading sample data: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn apply_overrides(
    config: &mut EngineConfig,
    axis: &AxisArgs,
    inputs: Option<&InputArgs>,
) -> anyhow::Result<()> {
    if let Some(granularity) = &axis.granularity {
        config.granularity = granularity.clone();
    }
    if let Some(timezone) = &axis.timezone {
        config.timezone = timezone.clone();
    }
    if let Some(workers) = inputs.and_then(|i| i.max_workers) {
        config.max_workers = workers;
    }
    config.check().context("invalid options")?;
    Ok(())
}

fn build_axis(config: &EngineConfig, axis: &AxisArgs) -> anyhow::Result<Vec<Bucket>> {
    let time_axis = TimeAxis::new(&axis.begin, &axis.end, config.granularity()?, config.tz()?)
        .context("building time axis")?;
    Ok(time_axis.buckets_until_now())
}

fn read_schema(inputs: &InputArgs) -> anyhow::Result<Vec<String>> {
    SchemaReader::read_columns(&inputs.schema)
        .with_context(|| format!("reading schema {}", inputs.schema.display()))
}

async fn reconcile(
    config: &EngineConfig,
    axis: &AxisArgs,
    inputs: &InputArgs,
) -> anyhow::Result<(Vec<Bucket>, ReconciliationReport, IntegrityChecker)> {
    let granularity = config.granularity()?;
    let tags = config.source_tags();
    let registry = Arc::new(VariableRegistry::new());

    let columns = read_schema(inputs)?;
    let buckets = build_axis(config, axis)?;
    info!(
        buckets = buckets.len(),
        granularity = %granularity,
        timezone = %config.timezone,
        "time axis ready"
    );

    let data = ConcurrentReader::new()
        .with_mmap(inputs.use_mmap)
        .read_inputs(inputs.primary.clone(), inputs.secondary.clone())
        .await
        .context("reading observations")?;

    let reconciler =
        SourceReconciler::from_columns(registry.clone(), &columns, granularity, tags.clone())?;
    let processor = ParallelProcessor::new(reconciler, RecordAssembler::new(columns, tags.clone()))
        .with_max_workers(config.max_workers)
        .with_span(info_span!("reconcile", begin = %axis.begin, end = %axis.end));

    let progress = ProgressReporter::new(buckets.len() as u64, "Reconciling buckets...", false);
    let report = processor.process(&buckets, &data.primary, &data.secondary, Some(&progress))?;

    for (attribution, count) in attribution_totals(&report.reconciled) {
        info!(source = tags.label(attribution), fields = count, "attribution total");
    }

    Ok((buckets, report, IntegrityChecker::new(registry, tags)))
}
