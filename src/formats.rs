//! Format detection and parsing of raw payloads into generic records
//!
//! Handles four formats: JSON, CSV, XML and plain text. The CSV rule is
//! deliberately simple: the first non-blank line is the header row unless
//! disabled, fields are comma-delimited, surrounding double quotes are
//! stripped, and embedded commas/quotes are not supported (a documented
//! limitation). CSV, XML and text fields all come out as JSON strings; no
//! numeric coercion happens at parse time.

use crate::{PointfieldError, Record, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::Value;

/// Wire format of a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Detect from content type, extension or payload
    Auto,
    Json,
    Csv,
    Xml,
    Text,
}

impl DataFormat {
    /// Stable name used in cache keys and metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Auto => "auto",
            DataFormat::Json => "json",
            DataFormat::Csv => "csv",
            DataFormat::Xml => "xml",
            DataFormat::Text => "text",
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect a format from an HTTP Content-Type header value
pub(crate) fn detect_from_content_type(content_type: &str) -> Option<DataFormat> {
    let ct = content_type.to_ascii_lowercase();
    if ct.contains("json") {
        Some(DataFormat::Json)
    } else if ct.contains("csv") {
        Some(DataFormat::Csv)
    } else if ct.contains("xml") {
        Some(DataFormat::Xml)
    } else if ct.contains("text/plain") {
        Some(DataFormat::Text)
    } else {
        None
    }
}

/// Detect a format from a URL's path extension
pub(crate) fn detect_from_url(url: &str) -> Option<DataFormat> {
    // Strip query/fragment before looking at the extension
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "json" => Some(DataFormat::Json),
        "csv" => Some(DataFormat::Csv),
        "xml" => Some(DataFormat::Xml),
        "txt" | "text" => Some(DataFormat::Text),
        _ => None,
    }
}

/// Last-resort detection from the payload itself
pub(crate) fn sniff(text: &str) -> DataFormat {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        DataFormat::Json
    } else if trimmed.starts_with('<') {
        DataFormat::Xml
    } else if trimmed.lines().next().is_some_and(|l| l.contains(',')) {
        DataFormat::Csv
    } else {
        DataFormat::Text
    }
}

/// Parse a raw payload into records according to `format`
///
/// `format` must already be resolved (not `Auto`).
pub(crate) fn parse_records(text: &str, format: DataFormat, csv_header: bool) -> Result<Vec<Record>> {
    match format {
        DataFormat::Json => parse_json(text),
        DataFormat::Csv => Ok(parse_csv(text, csv_header)),
        DataFormat::Xml => parse_xml(text),
        DataFormat::Text => Ok(parse_text(text)),
        DataFormat::Auto => parse_records(text, sniff(text), csv_header),
    }
}

/// JSON: top-level array becomes the record list (non-object elements wrapped
/// as `{"value": ...}`); a top-level object becomes a single record
fn parse_json(text: &str) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => map,
                other => {
                    let mut map = Record::new();
                    map.insert("value".to_string(), other);
                    map
                }
            })
            .collect()),
        Value::Object(map) => Ok(vec![map]),
        other => Err(PointfieldError::Parse(format!(
            "expected JSON array or object, got {other}"
        ))),
    }
}

fn parse_csv(text: &str, header: bool) -> Vec<Record> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let headers: Vec<String> = if header {
        match lines.next() {
            Some(line) => split_csv_fields(line),
            None => return Vec::new(),
        }
    } else {
        Vec::new()
    };

    lines
        .map(|line| {
            let mut record = Record::new();
            for (i, field) in split_csv_fields(line).into_iter().enumerate() {
                let key = headers
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| i.to_string());
                record.insert(key, Value::String(field));
            }
            record
        })
        .collect()
}

fn split_csv_fields(line: &str) -> Vec<String> {
    line.split(',')
        .map(|field| {
            let field = field.trim();
            field
                .strip_prefix('"')
                .and_then(|f| f.strip_suffix('"'))
                .unwrap_or(field)
                .to_string()
        })
        .collect()
}

/// Plain text: one record per non-blank line, field `text`
fn parse_text(text: &str) -> Vec<Record> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let mut record = Record::new();
            record.insert("text".to_string(), Value::String(line.to_string()));
            record
        })
        .collect()
}

/// XML: each child element of the document root becomes a record; its
/// attributes and child-element text become string fields
fn parse_xml(text: &str) -> Result<Vec<Record>> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let xml_err = |e: quick_xml::Error| PointfieldError::Parse(format!("malformed XML: {e}"));

    let mut records = Vec::new();
    let mut current: Option<Record> = None;
    let mut field: Option<String> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                if depth == 2 {
                    current = Some(attributes_to_record(&e)?);
                } else if depth == 3 {
                    field = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                }
            }
            Ok(Event::Empty(e)) => {
                if depth == 1 {
                    records.push(attributes_to_record(&e)?);
                }
            }
            Ok(Event::Text(t)) => {
                if depth == 3 {
                    if let (Some(record), Some(name)) = (current.as_mut(), field.as_ref()) {
                        let value = t.unescape().map_err(xml_err)?.into_owned();
                        record.insert(name.clone(), Value::String(value));
                    }
                }
            }
            Ok(Event::End(_)) => {
                if depth == 2 {
                    if let Some(record) = current.take() {
                        records.push(record);
                    }
                } else if depth == 3 {
                    field = None;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(PointfieldError::Parse(format!("malformed XML: {e}"))),
        }
    }

    Ok(records)
}

fn attributes_to_record(e: &quick_xml::events::BytesStart<'_>) -> Result<Record> {
    let mut record = Record::new();
    for attr in e.attributes() {
        let attr =
            attr.map_err(|e| PointfieldError::Parse(format!("malformed XML attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| PointfieldError::Parse(format!("malformed XML attribute: {e}")))?
            .into_owned();
        record.insert(key, Value::String(value));
    }
    Ok(record)
}
