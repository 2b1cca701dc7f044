use crate::derived::{FILETIME_FIELDS, convert_filetime, derive_sha1};
use crate::err::{FieldError, Result, WerError};
use crate::line::WerLine;
use crate::record::{FieldValue, WerRecord};
use crate::utils::decode_utf16_text;

use indexmap::IndexMap;
use log::{debug, trace, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// The file name (compared case-insensitively) a WER report is stored under.
pub const REPORT_FILE_NAME: &str = "Report.wer";

/// Fields whose list entries are lower-cased while parsing.
const LOWERCASED_LIST_FIELDS: [&str; 1] = ["LoadedModule"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserSettings {
    /// Worker threads used when scanning report archives, `0` means one per CPU.
    num_threads: usize,
    /// Fail on malformed lines, shape conflicts and bad derived fields instead of warning.
    strict: bool,
    /// Replace `EventTime`/`UploadTime` FILETIMEs with calendar timestamps.
    convert_timestamps: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        ParserSettings {
            num_threads: 0,
            strict: false,
            convert_timestamps: true,
        }
    }
}

impl ParserSettings {
    pub fn new() -> Self {
        ParserSettings::default()
    }

    /// Sets the number of worker threads.
    /// `0` will let rayon decide.
    ///
    /// Has no effect when the crate is built without the `multithreading` feature.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = if cfg!(feature = "multithreading") {
            num_threads
        } else {
            1
        };

        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;

        self
    }

    pub fn convert_timestamps(mut self, convert_timestamps: bool) -> Self {
        self.convert_timestamps = convert_timestamps;

        self
    }

    pub fn get_num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn should_convert_timestamps(&self) -> bool {
        self.convert_timestamps
    }
}

/// `true` if `path` names a `Report.wer` file (case-insensitive, the file need not exist).
pub fn is_report_file_name(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case(REPORT_FILE_NAME))
}

/// Parses `path` if it is an existing `Report.wer` file.
///
/// Returns `Ok(None)` when the file does not exist or is named differently.
pub fn parse_report_file(
    path: impl AsRef<Path>,
    settings: &ParserSettings,
) -> Result<Option<WerRecord>> {
    let path = path.as_ref();

    if !is_report_file_name(path) || !path.is_file() {
        debug!("{} is not a {} file, skipping", path.display(), REPORT_FILE_NAME);
        return Ok(None);
    }

    let parser = WerParser::from_path(path)?.with_configuration(settings.clone());
    parser.parse().map(Some)
}

/// Parser for a single `Report.wer` file.
///
/// ```
/// use wer::{WerParser, FieldValue, encode_utf16le_with_bom};
///
/// let bytes = encode_utf16le_with_bom("Version=1\r\nSig[0].Name=Application Name\r\nSig[0].Value=notepad.exe\r\n");
/// let record = WerParser::from_buffer(bytes).unwrap().parse().unwrap();
///
/// assert_eq!(record.get_str("Version"), Some("1"));
/// let sig = record.get("Sig").and_then(FieldValue::as_group).unwrap();
/// assert_eq!(sig.get("ApplicationName").map(String::as_str), Some("notepad.exe"));
/// ```
#[derive(Debug, Clone)]
pub struct WerParser {
    text: String,
    source: Option<PathBuf>,
    config: ParserSettings,
}

impl WerParser {
    /// Reads and decodes the file at `path`. The file name is not checked.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| WerError::FailedToOpenFile {
            path: path.to_path_buf(),
            source,
        })?;

        let mut parser = Self::from_buffer(bytes)?;
        parser.source = Some(path.to_path_buf());
        Ok(parser)
    }

    /// Decodes an in-memory UTF-16 report.
    pub fn from_buffer(buffer: Vec<u8>) -> Result<Self> {
        let text = decode_utf16_text(&buffer)
            .map_err(|message| WerError::FailedToDecodeUtf16 { message })?;

        Ok(Self::from_text(text))
    }

    /// Wraps already decoded report text.
    pub fn from_text(text: impl Into<String>) -> Self {
        WerParser {
            text: text.into(),
            source: None,
            config: ParserSettings::default(),
        }
    }

    pub fn with_configuration(mut self, configuration: ParserSettings) -> Self {
        self.config = configuration;
        self
    }

    /// The decoded report text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Classified lines with their 1-based line numbers.
    /// `\r\n`, `\n` and a lone `\r` all end a line.
    /// Lines without a `=` separator yield `None`.
    pub fn lines(&self) -> impl Iterator<Item = (usize, &str, Option<WerLine<'_>>)> {
        self.text
            .lines()
            .flat_map(|line| line.split('\r'))
            .enumerate()
            .map(|(i, raw)| (i + 1, raw, WerLine::parse(raw)))
    }

    /// Accumulates every line into a record and applies post-processing.
    pub fn parse(&self) -> Result<WerRecord> {
        if let Some(path) = &self.source {
            debug!("Parsing {}", path.display());
        }

        let mut builder = RecordBuilder::new(&self.config);
        for (line_no, raw, line) in self.lines() {
            match line {
                Some(line) => builder.feed(line_no, line)?,
                None if raw.trim().is_empty() => {}
                None if self.config.strict => {
                    return Err(WerError::MalformedLine {
                        line_no,
                        line: raw.to_owned(),
                    });
                }
                None => warn!("Line {}: missing `=` separator, skipping", line_no),
            }
        }

        builder.finish()
    }
}

/// Single-pass accumulation state for one report.
struct RecordBuilder<'s> {
    record: WerRecord,
    /// Label declared by the most recent `.Name`/`.Key` line.
    last_key_label: String,
    settings: &'s ParserSettings,
}

impl<'s> RecordBuilder<'s> {
    fn new(settings: &'s ParserSettings) -> Self {
        RecordBuilder {
            record: WerRecord::new(),
            last_key_label: String::new(),
            settings,
        }
    }

    fn feed(&mut self, line_no: usize, line: WerLine<'_>) -> Result<()> {
        trace!("Line {}: {:?}", line_no, line);
        let fields = self.record.fields_mut();

        let conflict = match line {
            WerLine::Plain { field, value } => match fields.get_mut(field) {
                None => {
                    fields.insert(field.to_owned(), FieldValue::Scalar(value.to_owned()));
                    None
                }
                Some(FieldValue::Scalar(existing)) => {
                    *existing = value.to_owned();
                    None
                }
                Some(other) => Some((other.shape_name(), "scalar")),
            },
            WerLine::Indexed { field, value } => {
                let value = if LOWERCASED_LIST_FIELDS.contains(&field) {
                    value.to_lowercase()
                } else {
                    value.to_owned()
                };

                match fields
                    .entry(field.to_owned())
                    .or_insert_with(|| FieldValue::List(Vec::new()))
                {
                    FieldValue::List(list) => {
                        list.push(value);
                        None
                    }
                    other => Some((other.shape_name(), "list")),
                }
            }
            WerLine::IndexedLabel { field, label } => {
                let label = label.replace(' ', "");
                match group_of(fields, field) {
                    Ok(group) => {
                        group.insert(label.clone(), String::new());
                        self.last_key_label = label;
                        None
                    }
                    Err(shape) => Some((shape, "group")),
                }
            }
            WerLine::IndexedEntry { field, value } => match group_of(fields, field) {
                Ok(group) => {
                    group.insert(self.last_key_label.clone(), value.to_owned());
                    None
                }
                Err(shape) => Some((shape, "group")),
            },
            WerLine::Dotted {
                field,
                sub_key,
                value,
            } => match group_of(fields, field) {
                Ok(group) => {
                    group.insert(sub_key.to_owned(), value.to_owned());
                    None
                }
                Err(shape) => Some((shape, "group")),
            },
        };

        match conflict {
            None => Ok(()),
            Some((existing, incoming)) if self.settings.strict => Err(WerError::ShapeConflict {
                line_no,
                field: line.field().to_owned(),
                existing,
                incoming,
            }),
            Some((existing, incoming)) => {
                warn!(
                    "Line {}: field `{}` is a {}, ignoring {} value",
                    line_no,
                    line.field(),
                    existing,
                    incoming
                );
                Ok(())
            }
        }
    }

    fn finish(mut self) -> Result<WerRecord> {
        let outcome = derive_sha1(&mut self.record);
        self.handle_field_outcome(outcome)?;

        if self.settings.convert_timestamps {
            for field in FILETIME_FIELDS {
                let outcome = convert_filetime(&mut self.record, field);
                self.handle_field_outcome(outcome)?;
            }
        }

        Ok(self.record)
    }

    fn handle_field_outcome(&mut self, outcome: std::result::Result<(), FieldError>) -> Result<()> {
        match outcome {
            Ok(()) => Ok(()),
            Err(e) if self.settings.strict => Err(e.into()),
            Err(e) => {
                warn!("{}", e);
                self.record.push_warning(e);
                Ok(())
            }
        }
    }
}

/// The group stored under `field`, created on first sight.
/// Returns the existing shape name when `field` holds something else.
fn group_of<'m>(
    fields: &'m mut IndexMap<String, FieldValue>,
    field: &str,
) -> std::result::Result<&'m mut IndexMap<String, String>, &'static str> {
    match fields
        .entry(field.to_owned())
        .or_insert_with(|| FieldValue::Group(IndexMap::new()))
    {
        FieldValue::Group(group) => Ok(group),
        other => Err(other.shape_name()),
    }
}
