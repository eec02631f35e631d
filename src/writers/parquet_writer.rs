use crate::error::{ProcessingError, Result};
use crate::processors::record_assembler::FlatRecord;
use crate::utils::constants::{
    COL_DATE, COL_DAY_OF_YEAR, COL_HOUR, COL_REPORT_TIME, COL_TIME, COL_YEAR,
    DEFAULT_ROW_GROUP_SIZE, SOURCE_SUFFIX,
};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use serde_json::Value;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Arrow type of an output column
pub fn column_type(column: &str) -> DataType {
    match column {
        COL_DATE => DataType::Date32,
        COL_HOUR | COL_YEAR | COL_DAY_OF_YEAR => DataType::Int32,
        COL_TIME | COL_REPORT_TIME => DataType::Utf8,
        c if c.ends_with(SOURCE_SUFFIX) => DataType::Utf8,
        _ => DataType::Float64,
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            "snappy" => Compression::SNAPPY,
            "gzip" => Compression::GZIP(GzipLevel::default()),
            "lz4" => Compression::LZ4,
            "zstd" => Compression::ZSTD(ZstdLevel::default()),
            "none" => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Schema for an output allow-list
    pub fn create_schema(&self, columns: &[String]) -> Arc<Schema> {
        let fields: Vec<Field> = columns
            .iter()
            .map(|c| Field::new(c, column_type(c), c != COL_DATE))
            .collect();
        Arc::new(Schema::new(fields))
    }

    pub fn write_records(&self, records: &[FlatRecord], columns: &[String], path: &Path) -> Result<()> {
        self.write_records_batched(records, columns, path, records.len().max(1))
    }

    /// Write records in batches for memory efficiency
    pub fn write_records_batched(
        &self,
        records: &[FlatRecord],
        columns: &[String],
        path: &Path,
        batch_size: usize,
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let schema = self.create_schema(columns);
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        for chunk in records.chunks(batch_size.max(1)) {
            let batch = self.records_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
        }

        writer.close()?;
        Ok(())
    }

    fn records_to_batch(&self, records: &[FlatRecord], schema: Arc<Schema>) -> Result<RecordBatch> {
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

        for field in schema.fields() {
            let name = field.name();
            let cells = records.iter().map(|r| r.get(name).unwrap_or(&Value::Null));

            let array: ArrayRef = match field.data_type() {
                DataType::Date32 => {
                    let days = cells
                        .map(|v| {
                            let date = v
                                .as_str()
                                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                                .ok_or_else(|| ProcessingError::MissingIdentifier {
                                    field: name.clone(),
                                    bucket: v.to_string(),
                                })?;
                            Ok((date - epoch()).num_days() as i32)
                        })
                        .collect::<Result<Vec<i32>>>()?;
                    Arc::new(Date32Array::from(days))
                }
                DataType::Int32 => Arc::new(Int32Array::from(
                    cells
                        .map(|v| v.as_i64().map(|n| n as i32))
                        .collect::<Vec<Option<i32>>>(),
                )),
                DataType::Utf8 => Arc::new(StringArray::from(
                    cells.map(|v| v.as_str()).collect::<Vec<Option<&str>>>(),
                )),
                _ => Arc::new(Float64Array::from(
                    cells.map(|v| v.as_f64()).collect::<Vec<Option<f64>>>(),
                )),
            };
            arrays.push(array);
        }

        Ok(RecordBatch::try_new(schema, arrays)?)
    }

    /// Read back up to `limit` rows as flat records
    pub fn read_sample_records(&self, path: &Path, limit: usize) -> Result<Vec<FlatRecord>> {
        let file = File::open(path)?;
        let parquet_reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut records = Vec::new();

        for batch_result in parquet_reader {
            let batch = batch_result?;
            let schema = batch.schema();
            let take = batch.num_rows().min(limit - records.len());

            for row in 0..take {
                let mut record = FlatRecord::with_capacity(batch.num_columns());
                for (i, field) in schema.fields().iter().enumerate() {
                    record.insert(field.name().clone(), cell_value(batch.column(i), row)?);
                }
                records.push(record);
            }

            if records.len() >= limit {
                break;
            }
        }

        Ok(records)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let total_rows = file_metadata.num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        let columns = file_metadata
            .schema_descr()
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let compression = metadata
            .row_groups()
            .first()
            .and_then(|rg| rg.columns().first())
            .map(|c| c.compression())
            .unwrap_or(self.compression);

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression,
            columns,
        })
    }
}

fn cell_value(array: &ArrayRef, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let invalid = || ProcessingError::InvalidFormat(format!("unsupported column type {}", array.data_type()));

    let value = match array.data_type() {
        DataType::Date32 => {
            let days = array.as_any().downcast_ref::<Date32Array>().ok_or_else(invalid)?.value(row);
            let date = epoch() + chrono::Duration::days(days as i64);
            Value::String(date.to_string())
        }
        DataType::Int32 => Value::from(
            array.as_any().downcast_ref::<Int32Array>().ok_or_else(invalid)?.value(row),
        ),
        DataType::Utf8 => Value::String(
            array.as_any().downcast_ref::<StringArray>().ok_or_else(invalid)?.value(row).to_string(),
        ),
        DataType::Float64 => {
            let v = array.as_any().downcast_ref::<Float64Array>().ok_or_else(invalid)?.value(row);
            serde_json::Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
        }
        _ => return Err(invalid()),
    };
    Ok(value)
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
    pub columns: Vec<String>,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Columns: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.columns.len(),
            self.row_groups,
            self.file_size as f64 / 1_048_576.0, // Convert to MB
            self.compression,
            avg
        )
    }
}
