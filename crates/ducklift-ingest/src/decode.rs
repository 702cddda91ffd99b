//! Format-aware decoding of byte payloads into structured tables

use calamine::{Data, Reader};
use ducklift_common::{IngestError, Result, StructuredTable};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Cursor;
use tracing::debug;

/// Declared format of a remote file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FileFormat {
    Csv,
    Excel,
}

impl FileFormat {
    /// Parse a format tag, case-insensitively on every branch
    ///
    /// Accepts the extension-style spellings used in settings documents.
    /// Anything else is `UnsupportedFormat`; no fallback parsing is
    /// attempted.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag.to_lowercase().as_str() {
            "csv" | ".csv" => Ok(FileFormat::Csv),
            "excel" | "xlsx" | "xls" | ".xlsx" | ".xls" => Ok(FileFormat::Excel),
            _ => Err(IngestError::UnsupportedFormat(tag.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Excel => "excel",
        }
    }
}

impl TryFrom<String> for FileFormat {
    type Error = IngestError;

    fn try_from(value: String) -> Result<Self> {
        FileFormat::parse(&value)
    }
}

impl From<FileFormat> for String {
    fn from(format: FileFormat) -> Self {
        format.as_str().to_string()
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed decoder options
///
/// Unknown keys in a settings document are rejected at load time instead of
/// being forwarded blindly to the parsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeOptions {
    /// Field delimiter for CSV content
    pub delimiter: Option<char>,
    /// Whether the first (non-skipped) row names the columns
    pub has_header: bool,
    /// Worksheet name for spreadsheet content; first sheet when absent
    pub sheet: Option<String>,
    /// Rows to discard before reading the header
    pub skip_rows: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            sheet: None,
            skip_rows: 0,
        }
    }
}

/// Decode a byte payload into a structured table
pub fn decode(bytes: &[u8], format: FileFormat, options: &DecodeOptions) -> Result<StructuredTable> {
    debug!(%format, ?options, size = bytes.len(), "Decoding byte payload");
    match format {
        FileFormat::Csv => decode_csv(bytes, options),
        FileFormat::Excel => decode_excel(bytes, options),
    }
}

fn decode_csv(bytes: &[u8], options: &DecodeOptions) -> Result<StructuredTable> {
    let delimiter = options.delimiter.unwrap_or(',');
    if !delimiter.is_ascii() {
        return Err(IngestError::Decode {
            format: "csv".to_string(),
            message: format!("delimiter '{delimiter}' is not a single-byte character"),
        });
    }

    // Flexible so skipped preamble rows may have any width; data-row
    // uniformity is enforced against the column count below.
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = reader.records();
    for _ in 0..options.skip_rows {
        if records.next().transpose().map_err(csv_error)?.is_none() {
            return Ok(StructuredTable::empty());
        }
    }

    let columns = if options.has_header {
        match records.next().transpose().map_err(csv_error)? {
            Some(header) => header.iter().map(str::to_string).collect(),
            None => return Ok(StructuredTable::empty()),
        }
    } else {
        Vec::new()
    };

    let mut table = StructuredTable::new(columns);
    for record in records {
        let record = record.map_err(csv_error)?;
        if table.columns.is_empty() {
            table.columns = (0..record.len()).map(|i| format!("column{i}")).collect();
        }
        if record.len() != table.columns.len() {
            return Err(IngestError::Decode {
                format: "csv".to_string(),
                message: format!(
                    "row {} has {} fields, expected {}",
                    table.num_rows() + 1,
                    record.len(),
                    table.columns.len()
                ),
            });
        }
        table.push_row(record.iter().map(infer_scalar).collect());
    }

    Ok(table)
}

fn csv_error(err: csv::Error) -> IngestError {
    IngestError::Decode {
        format: "csv".to_string(),
        message: err.to_string(),
    }
}

fn decode_excel(bytes: &[u8], options: &DecodeOptions) -> Result<StructuredTable> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = calamine::open_workbook_auto_from_rs(cursor).map_err(excel_error)?;

    let sheet_name = match &options.sheet {
        Some(name) => name.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| IngestError::Decode {
                format: "excel".to_string(),
                message: "workbook contains no worksheets".to_string(),
            })?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(excel_error)?;

    let mut rows = range.rows().skip(options.skip_rows);

    let columns: Vec<String> = if options.has_header {
        match rows.next() {
            Some(header) => header.iter().map(cell_to_name).collect(),
            None => return Ok(StructuredTable::empty()),
        }
    } else {
        (0..range.width()).map(|i| format!("column{i}")).collect()
    };

    if columns.is_empty() {
        return Ok(StructuredTable::empty());
    }

    let mut table = StructuredTable::new(columns);
    for row in rows {
        let mut cells: Vec<Value> = row.iter().map(cell_to_value).collect();
        cells.resize(table.num_columns(), Value::Null);
        table.push_row(cells);
    }

    Ok(table)
}

fn excel_error<E: std::fmt::Display>(err: E) -> IngestError {
    IngestError::Decode {
        format: "excel".to_string(),
        message: err.to_string(),
    }
}

fn cell_to_name(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => Value::String(dt.to_string()),
        Data::Error(e) => Value::String(format!("#ERR:{e:?}")),
        other => Value::String(other.to_string()),
    }
}

/// Best-effort scalar typing for CSV fields: integer, then float, then
/// boolean, otherwise the raw string. Empty fields become null.
fn infer_scalar(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = field.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = field.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    match field {
        "true" | "True" | "TRUE" => Value::Bool(true),
        "false" | "False" | "FALSE" => Value::Bool(false),
        _ => Value::String(field.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_parsing_is_case_insensitive_on_both_branches() {
        assert_eq!(FileFormat::parse("csv").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::parse(".CSV").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::parse("Excel").unwrap(), FileFormat::Excel);
        assert_eq!(FileFormat::parse("XLSX").unwrap(), FileFormat::Excel);
        assert_eq!(FileFormat::parse(".xls").unwrap(), FileFormat::Excel);
    }

    #[test]
    fn test_unrecognized_format_fails() {
        let err = FileFormat::parse("pdf").unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(ref t) if t == "pdf"));
    }

    #[test]
    fn test_decode_csv_with_header() {
        let bytes = b"x,y\n1,hello\n2.5,world\n";
        let table = decode(bytes, FileFormat::Csv, &DecodeOptions::default()).unwrap();

        assert_eq!(table.columns, vec!["x", "y"]);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.rows[0], vec![json!(1), json!("hello")]);
        assert_eq!(table.rows[1], vec![json!(2.5), json!("world")]);
    }

    #[test]
    fn test_decode_csv_without_header_generates_column_names() {
        let options = DecodeOptions {
            has_header: false,
            ..Default::default()
        };
        let table = decode(b"1,2\n3,4\n", FileFormat::Csv, &options).unwrap();

        assert_eq!(table.columns, vec!["column0", "column1"]);
        assert_eq!(table.num_rows(), 2);
    }

    #[test]
    fn test_decode_csv_custom_delimiter_and_skip_rows() {
        let options = DecodeOptions {
            delimiter: Some(';'),
            skip_rows: 1,
            ..Default::default()
        };
        let table = decode(b"junk line\na;b\n1;2\n", FileFormat::Csv, &options).unwrap();

        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.rows, vec![vec![json!(1), json!(2)]]);
    }

    #[test]
    fn test_decode_csv_empty_payload_yields_empty_table() {
        let table = decode(b"", FileFormat::Csv, &DecodeOptions::default()).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.num_columns(), 0);
    }

    #[test]
    fn test_decode_csv_ragged_row_is_decode_error() {
        let err = decode(b"x,y\n1\n", FileFormat::Csv, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::Decode { ref format, .. } if format == "csv"));
    }

    /// Two-sheet workbook: "Scores" (id/name/score header plus two data
    /// rows) and "Meta" (one preamble row, then a key/value header).
    const SAMPLE_XLSX: &[u8] = include_bytes!("../tests/fixtures/sample.xlsx");

    #[test]
    fn test_decode_excel_first_sheet_by_default() {
        let table = decode(SAMPLE_XLSX, FileFormat::Excel, &DecodeOptions::default()).unwrap();

        assert_eq!(table.columns, vec!["id", "name", "score"]);
        assert_eq!(table.num_rows(), 2);
        // Spreadsheet numerics arrive as floats.
        assert_eq!(table.rows[0], vec![json!(1.0), json!("alpha"), json!(0.5)]);
        assert_eq!(table.rows[1], vec![json!(2.0), json!("beta"), json!(1.25)]);
    }

    #[test]
    fn test_decode_excel_named_sheet_with_skip_rows() {
        let options = DecodeOptions {
            sheet: Some("Meta".to_string()),
            skip_rows: 1,
            ..Default::default()
        };
        let table = decode(SAMPLE_XLSX, FileFormat::Excel, &options).unwrap();

        assert_eq!(table.columns, vec!["key", "value"]);
        assert_eq!(table.rows, vec![vec![json!("env"), json!("dev")]]);
    }

    #[test]
    fn test_decode_excel_without_header_generates_column_names() {
        let options = DecodeOptions {
            has_header: false,
            ..Default::default()
        };
        let table = decode(SAMPLE_XLSX, FileFormat::Excel, &options).unwrap();

        assert_eq!(table.columns, vec!["column0", "column1", "column2"]);
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.rows[0], vec![json!("id"), json!("name"), json!("score")]);
    }

    #[test]
    fn test_decode_excel_missing_sheet_is_decode_error() {
        let options = DecodeOptions {
            sheet: Some("NoSuchSheet".to_string()),
            ..Default::default()
        };
        let err = decode(SAMPLE_XLSX, FileFormat::Excel, &options).unwrap_err();
        assert!(matches!(err, IngestError::Decode { ref format, .. } if format == "excel"));
    }

    #[test]
    fn test_decode_excel_garbage_bytes_is_decode_error() {
        let err = decode(
            b"definitely not a workbook",
            FileFormat::Excel,
            &DecodeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::Decode { ref format, .. } if format == "excel"));
    }

    #[test]
    fn test_csv_round_trip_preserves_shape() {
        let original = StructuredTable {
            columns: vec!["id".into(), "name".into()],
            rows: vec![
                vec![json!(1), json!("alpha")],
                vec![json!(2), json!("beta")],
            ],
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&original.columns).unwrap();
        for row in &original.rows {
            let fields: Vec<String> = row
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            writer.write_record(&fields).unwrap();
        }
        let bytes = writer.into_inner().unwrap();

        let decoded = decode(&bytes, FileFormat::Csv, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.columns, original.columns);
        assert_eq!(decoded.num_rows(), original.num_rows());
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_options_reject_unknown_keys() {
        let yaml = "delimiter: ';'\nseperator: ','\n";
        let parsed: std::result::Result<DecodeOptions, _> = serde_yaml::from_str(yaml);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_infer_scalar_typing() {
        assert_eq!(infer_scalar(""), Value::Null);
        assert_eq!(infer_scalar("42"), json!(42));
        assert_eq!(infer_scalar("-3.5"), json!(-3.5));
        assert_eq!(infer_scalar("true"), json!(true));
        assert_eq!(infer_scalar("0042x"), json!("0042x"));
    }
}
