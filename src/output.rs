//! Tabular and line-delimited JSON output of parsed records.

use crate::record::{FieldValue, WerRecord};

use std::io::{self, Write};
use thiserror::Error;

/// Fields written to CSV unless the caller picks its own.
pub const DEFAULT_CSV_COLUMNS: [&str; 9] = [
    "AppPath",
    "EventTime",
    "SHA1",
    "AppName",
    "NsAppName",
    "OriginalFilename",
    "EventType",
    "FriendlyEventName",
    "ReportType",
];

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Writing CSV output failed with: {0}")]
    Csv(#[from] csv::Error),

    #[error("`serde_json` failed with error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("An I/O error has occurred: {0}")]
    Io(#[from] io::Error),
}

/// Renders a single field as CSV cell text.
///
/// Timestamps use RFC 3339 (`2022-02-22T10:40:00Z`), lists and groups are written as compact JSON.
pub fn csv_cell(value: &FieldValue) -> Result<String, OutputError> {
    Ok(match value {
        FieldValue::Scalar(s) => s.clone(),
        FieldValue::Timestamp(ts) => ts.to_string(),
        FieldValue::List(_) | FieldValue::Group(_) => serde_json::to_string(value)?,
    })
}

/// Writes a header of `columns` followed by one row per record.
///
/// Fields missing from a record are left empty, fields not in `columns` are ignored.
pub fn write_csv<W: Write, S: AsRef<str>>(
    writer: W,
    records: &[WerRecord],
    columns: &[S],
) -> Result<(), OutputError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let header: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    wtr.write_record(&header)?;

    for record in records {
        let mut row = Vec::with_capacity(columns.len());
        for column in columns {
            row.push(match record.get(column.as_ref()) {
                Some(value) => csv_cell(value)?,
                None => String::new(),
            });
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes every record as a single line of JSON.
pub fn write_jsonl<W: Write>(mut writer: W, records: &[WerRecord]) -> Result<(), OutputError> {
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    Ok(())
}
