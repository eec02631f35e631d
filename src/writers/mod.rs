pub mod jsonl_writer;
pub mod parquet_writer;

pub use jsonl_writer::JsonLinesWriter;
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};
