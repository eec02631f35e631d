use crate::error::Result;
use crate::processors::record_assembler::FlatRecord;
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One flat JSON object per line, columns in allow-list order
pub struct JsonLinesWriter;

impl JsonLinesWriter {
    pub fn write_records(records: &[FlatRecord], path: &Path) -> Result<()> {
        let file = File::create(path)?;
        Self::write_to(records, BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file))
    }

    pub fn write_to<W: Write>(records: &[FlatRecord], mut writer: W) -> Result<()> {
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lines_keep_column_order() {
        let mut record = FlatRecord::new();
        record.insert("date".into(), json!("2023-07-15"));
        record.insert("PRECIP".into(), json!(12.0));
        record.insert("PRECIP_src".into(), json!("estimate"));

        let mut out = Vec::new();
        JsonLinesWriter::write_to(&[record.clone(), record], &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"date":"2023-07-15","PRECIP":12.0,"PRECIP_src":"estimate"}"#
        );
    }
}
