//! Delimited text reader with encoding auto-detection.
//!
//! Turns the raw bytes of one input file into a [`RawTable`] of trimmed
//! string fields. No column renaming or typing happens here, see
//! [`crate::transform`].

use std::path::Path;

use crate::error::{ParseError, ParseResult};

/// Parsed file before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column headers from the first line
    pub headers: Vec<String>,
    /// Data rows, each padded or cut to `headers.len()`
    pub rows: Vec<Vec<String>>,
    /// Detected or used encoding
    pub encoding: String,
}

impl RawTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> ParseResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);

    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            // chardet misreads short Latin-1 files as UTF-8 now and then
            Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        },
        // WHATWG decodes the Latin-1 labels as windows-1252, a superset
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => {
                let (text, _, had_errors) = enc.decode(bytes);
                if had_errors {
                    return Err(ParseError::Encoding { encoding: other.to_string() });
                }
                text.into_owned()
            }
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    Ok(decoded)
}

/// Split decoded content on `delimiter`.
///
/// The first line is the header. Blank lines are skipped, quoted fields are
/// unquoted and every value is trimmed.
///
/// # Example
/// ```ignore
/// use sheetmerge::parser::parse_str;
///
/// let table = parse_str("Fecha#Hora#T#\n01.02.2023#12:00#1,5#\n", '#').unwrap();
///
/// assert_eq!(table.headers, vec!["Fecha", "Hora", "T", ""]);
/// assert_eq!(table.rows[0][2], "1,5");
/// ```
pub fn parse_str(content: &str, delimiter: char) -> ParseResult<RawTable> {
    parse_with_encoding(content, delimiter, "utf-8".to_string())
}

fn parse_with_encoding(content: &str, delimiter: char, encoding: String) -> ParseResult<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut records = reader.records();

    // First non-blank record is the header
    let headers: Vec<String> = loop {
        match records.next() {
            None => return Err(ParseError::EmptyFile),
            Some(record) => {
                let record = record?;
                if is_blank(&record) {
                    continue;
                }
                break record.iter().map(|s| s.trim_matches('"').to_string()).collect();
            }
        }
    };

    let width = headers.len();
    let mut rows = Vec::new();

    for record in records {
        let record = record?;
        if is_blank(&record) {
            continue;
        }

        let mut row: Vec<String> = record
            .iter()
            .take(width)
            .map(|s| s.trim_matches('"').to_string())
            .collect();
        row.resize(width, String::new());
        rows.push(row);
    }

    Ok(RawTable {
        headers,
        rows,
        encoding,
    })
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|f| f.is_empty())
}

/// Parse raw bytes, detecting the encoding first.
pub fn parse_bytes(bytes: &[u8], delimiter: char) -> ParseResult<RawTable> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    parse_with_encoding(&content, delimiter, encoding)
}

/// Read and parse one input file.
pub fn parse_file(path: impl AsRef<Path>, delimiter: char) -> ParseResult<RawTable> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes, delimiter)
}
