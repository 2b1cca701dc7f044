//! A parser for Windows Error Reporting `Report.wer` files.
//!
//! A report is a UTF-16 text file of `key=value` lines. Lines are folded into a [`WerRecord`]
//! whose fields are plain strings, lists (`Field[n]=value`) or groups
//! (`Field.Sub=value`, `Field[n].Name=label` + `Field[n].Value=value`).
//! After parsing, the executable SHA-1 is pulled out of `TargetAppId` and the
//! `EventTime`/`UploadTime` FILETIMEs are converted to UTC timestamps.
//!
//! Whole report archives can be parsed with [`scan_report_archive`], and records written out with
//! [`output::write_csv`] / [`output::write_jsonl`].

#![deny(unused_must_use)]
#![forbid(unsafe_code)]

pub use derived::{convert_filetime_field, sha1_from_target_app_id};
pub use err::{FieldError, Result, WerError};
pub use line::WerLine;
pub use record::{FieldValue, WerRecord};
pub use scan::{
    DEFAULT_REPORT_ARCHIVE, ScanResults, find_report_file, list_report_files, parse_report_files,
    scan_report_archive,
};
pub use utils::{encode_utf16le_with_bom, filetime_to_timestamp};
pub use wer_parser::{
    ParserSettings, REPORT_FILE_NAME, WerParser, is_report_file_name, parse_report_file,
};

pub mod derived;
pub mod err;
pub mod line;
pub mod output;
pub mod record;
pub mod scan;
mod utils;
mod wer_parser;
