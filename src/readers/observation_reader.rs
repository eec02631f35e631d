use crate::error::{ProcessingError, Result};
use crate::models::ObservationRecord;
use crate::processors::time_axis::parse_date;
use crate::utils::constants::{COL_DATE, COL_HOUR, COL_TIME, DEFAULT_BUFFER_SIZE, SOURCE_SUFFIX};
use memmap2::Mmap;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

const COL_STATION: &str = "station";

/// Reads observation records from CSV or JSON files
///
/// CSV files carry a header row `date,hour,<VAR>,<VAR>_src,...`; an empty
/// cell, `NA` or `null` is a missing reading. JSON files hold an array of
/// flat objects with the same keys.
pub struct ObservationReader {
    use_mmap: bool,
}

impl ObservationReader {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    pub fn with_mmap(use_mmap: bool) -> Self {
        Self { use_mmap }
    }

    /// Read a file, choosing the format by extension
    pub fn read(&self, path: &Path) -> Result<Vec<ObservationRecord>> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let records = if is_json {
            self.read_json(path)?
        } else if self.use_mmap {
            let file = File::open(path)?;
            let mmap = unsafe { Mmap::map(&file)? };
            self.read_csv_from(&mmap[..])?
        } else {
            let file = File::open(path)?;
            self.read_csv_from(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file))?
        };

        debug!(path = %path.display(), records = records.len(), "read observations");
        Ok(records)
    }

    pub fn read_csv_from<R: Read>(&self, reader: R) -> Result<Vec<ObservationRecord>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        if !headers.iter().any(|h| h == COL_DATE) {
            return Err(ProcessingError::InvalidFormat(
                "observation file has no 'date' column".to_string(),
            ));
        }

        let mut records = Vec::new();
        for (line, row) in csv_reader.records().enumerate() {
            let row = row?;
            let cells = headers
                .iter()
                .map(String::as_str)
                .zip(row.iter().map(|c| Some(c.to_string())));
            let record = parse_fields(cells)
                .map_err(|e| ProcessingError::InvalidFormat(format!("row {}: {}", line + 2, e)))?;
            records.push(record);
        }

        Ok(records)
    }

    fn read_json(&self, path: &Path) -> Result<Vec<ObservationRecord>> {
        let file = File::open(path)?;
        let rows: Vec<serde_json::Map<String, Value>> =
            serde_json::from_reader(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file))?;

        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let cells = row.iter().map(|(k, v)| (k.as_str(), json_cell(v)));
                parse_fields(cells)
                    .map_err(|e| ProcessingError::InvalidFormat(format!("object {}: {}", i, e)))
            })
            .collect()
    }
}

impl Default for ObservationReader {
    fn default() -> Self {
        Self::new()
    }
}

fn json_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("null")
}

/// Hour label from `13`, `13:00` or `24:00`
///
/// `0` is accepted here; indexing moves it to hour 24 of the previous date.
fn parse_hour(cell: &str) -> std::result::Result<u8, String> {
    let hour_part = cell.split(':').next().unwrap_or(cell);
    match hour_part.trim().parse::<u8>() {
        Ok(h) if h <= 24 => Ok(h),
        _ => Err(format!("invalid hour '{}'", cell)),
    }
}

fn parse_fields<'a>(
    cells: impl Iterator<Item = (&'a str, Option<String>)>,
) -> std::result::Result<ObservationRecord, String> {
    let mut record = ObservationRecord::default();

    for (column, cell) in cells {
        let cell = cell.map(|c| c.trim().to_string()).filter(|c| !is_missing(c));

        match column {
            COL_DATE => {
                record.date = match cell {
                    Some(c) => Some(parse_date(&c).map_err(|e| e.to_string())?),
                    None => None,
                };
            }
            COL_HOUR | COL_TIME => {
                if let Some(c) = cell {
                    record.hour = Some(parse_hour(&c)?);
                }
            }
            COL_STATION => record.station = cell,
            name => {
                if let Some(variable) = name.strip_suffix(SOURCE_SUFFIX) {
                    if let Some(label) = cell {
                        record.sources.insert(variable.to_string(), label);
                    }
                    continue;
                }
                let value = match cell {
                    Some(c) => Some(
                        c.parse::<f64>()
                            .map_err(|_| format!("invalid value '{}' for {}", c, name))?,
                    ),
                    None => None,
                };
                record.values.insert(name.to_string(), value);
            }
        }
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CSV: &str = "date,hour,TAIR,TAIR_src,RELH\n\
                       2023-07-15,1,18.5,primary,71\n\
                       2023-07-15,24:00,,reanalysis,NA\n";

    #[test]
    fn test_read_csv() {
        let records = ObservationReader::new().read_csv_from(CSV.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2023, 7, 15));
        assert_eq!(first.hour, Some(1));
        assert_eq!(first.value("TAIR"), Some(18.5));
        assert_eq!(first.source("TAIR"), Some("primary"));

        let second = &records[1];
        assert_eq!(second.hour, Some(24));
        assert_eq!(second.value("TAIR"), None);
        assert_eq!(second.value("RELH"), None);
        assert_eq!(second.source("TAIR"), Some("reanalysis"));
    }

    #[test]
    fn test_mmap_and_buffered_agree() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();

        let buffered = ObservationReader::new().read(file.path()).unwrap();
        let mapped = ObservationReader::with_mmap(true).read(file.path()).unwrap();
        assert_eq!(buffered, mapped);
    }

    #[test]
    fn test_read_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"date": "2023-07-15", "hour": 3, "PRECIP": 0.2, "PRECIP_src": "grid"}},
               {{"date": "2023-07-15", "hour": null, "PRECIP": null}}]"#
        )
        .unwrap();

        let records = ObservationReader::new().read(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hour, Some(3));
        assert_eq!(records[0].value("PRECIP"), Some(0.2));
        assert_eq!(records[0].source("PRECIP"), Some("grid"));
        assert_eq!(records[1].hour, None);
        assert_eq!(records[1].value("PRECIP"), None);
    }

    #[test]
    fn test_bad_cells_are_reported() {
        let bad_value = "date,hour,TAIR\n2023-07-15,1,warm\n";
        let err = ObservationReader::new()
            .read_csv_from(bad_value.as_bytes())
            .unwrap_err();
        assert!(err.to_string().contains("row 2"));

        let bad_hour = "date,hour,TAIR\n2023-07-15,25,1.0\n";
        assert!(ObservationReader::new().read_csv_from(bad_hour.as_bytes()).is_err());

        let no_date = "hour,TAIR\n1,1.0\n";
        assert!(ObservationReader::new().read_csv_from(no_date.as_bytes()).is_err());
    }

    #[test]
    fn test_missing_date_cell_is_kept_for_the_processor() {
        let csv = "date,hour,TAIR\n,1,1.0\n";
        let records = ObservationReader::new().read_csv_from(csv.as_bytes()).unwrap();
        assert_eq!(records[0].date, None);
    }
}
