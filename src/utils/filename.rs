use crate::models::Granularity;
use chrono::{Datelike, Local};
use std::path::PathBuf;

/// Default output path: output/station-qc-{granularity}-{YYMMDD}.{extension}
pub fn generate_default_output_filename(granularity: Granularity, extension: &str) -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year

    let filename = format!(
        "station-qc-{}-{:02}{:02}{:02}.{}",
        granularity.as_str().to_lowercase(),
        year,
        now.month(),
        now.day(),
        extension
    );
    PathBuf::from("output").join(filename)
}
