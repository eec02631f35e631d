use crate::error::{ProcessingError, Result};
use std::path::Path;

/// Reads the destination's column allow-list
///
/// A `.csv` file contributes its header row; any other file lists one
/// column per line, with blank lines and `#` comments ignored.
pub struct SchemaReader;

impl SchemaReader {
    pub fn read_columns(path: &Path) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(path)?;
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

        let columns = if is_csv {
            Self::parse_header(&content)
        } else {
            Self::parse_lines(&content)
        };

        if columns.is_empty() {
            return Err(ProcessingError::InvalidFormat(format!(
                "no columns in {}",
                path.display()
            )));
        }
        Ok(columns)
    }

    pub fn parse_header(content: &str) -> Vec<String> {
        content
            .lines()
            .next()
            .map(|header| {
                header
                    .split(',')
                    .map(|c| c.trim().trim_matches('"').to_string())
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn parse_lines(content: &str) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if !columns.iter().any(|c| c == line) {
                columns.push(line.to_string());
            }
        }
        columns
    }
}
