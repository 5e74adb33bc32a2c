//! Catalog index reader with encoding and delimiter auto-detection.
//!
//! Turns the Socrata export into [`SourceRow`]s. No CKAN-specific logic here;
//! the only schema check is that the header carries the mapped columns.

use std::collections::HashMap;

use crate::error::{CsvError, CsvResult};
use crate::models::SourceRow;

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Rows in file order
    pub rows: Vec<SourceRow>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(e) => {
                return Err(CsvError::EncodingError(format!(
                    "invalid UTF-8 at byte {}",
                    e.valid_up_to()
                )))
            }
        },
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    Ok(decoded)
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Streaming reader over the rows of a decoded index.
pub struct RowReader<'a> {
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<&'a [u8]>,
}

impl<'a> RowReader<'a> {
    /// Read the header line and prepare to stream data rows.
    pub fn new(content: &'a str, delimiter: char) -> CsvResult<Self> {
        if content.trim().is_empty() {
            return Err(CsvError::EmptyFile);
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter as u8)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| CsvError::ParseError {
                line: 1,
                message: format!("Cannot read header: {}", e),
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        Ok(Self {
            headers,
            records: reader.into_records(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Fail when any of `required` is not a header.
    pub fn require_columns<S: AsRef<str>>(&self, required: &[S]) -> CsvResult<()> {
        let missing: Vec<String> = required
            .iter()
            .map(|c| c.as_ref())
            .filter(|col| !self.headers.iter().any(|h| h.as_str() == *col))
            .map(String::from)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CsvError::MissingColumns(missing))
        }
    }
}

impl Iterator for RowReader<'_> {
    type Item = CsvResult<SourceRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    return Some(Err(CsvError::ParseError {
                        line,
                        message: e.to_string(),
                    }));
                }
            };

            if record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }

            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let fields: HashMap<String, String> = self
                .headers
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    let value = record.get(i).unwrap_or("").to_string();
                    (header.clone(), value)
                })
                .collect();

            return Some(Ok(SourceRow::new(line, fields)));
        }
    }
}

/// Parse a decoded index with an explicit delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_str("U ID,Name\nabcd-1234,Roads", ',', &["U ID"])?;
/// assert_eq!(result.rows[0].get("Name"), Some("Roads"));
/// ```
pub fn parse_str<S: AsRef<str>>(
    content: &str,
    delimiter: char,
    required: &[S],
) -> CsvResult<ParseResult> {
    let reader = RowReader::new(content, delimiter)?;
    reader.require_columns(required)?;
    let headers = reader.headers().to_vec();
    let rows = reader.collect::<CsvResult<Vec<_>>>()?;

    Ok(ParseResult {
        rows,
        encoding: "utf-8".to_string(),
        delimiter,
        headers,
    })
}

/// Parse index bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto<S: AsRef<str>>(bytes: &[u8], required: &[S]) -> CsvResult<ParseResult> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);

    let mut result = parse_str(&content, delimiter, required)?;
    result.encoding = encoding;
    Ok(result)
}
