use thiserror::Error;

use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, WerError>;

/// Errors scoped to a single field, raised while post-processing a finished record.
///
/// In lenient mode these are collected on the record as warnings and the raw value is kept.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("field `{field}`: `{value}` is not a valid FILETIME: {source}")]
    InvalidFiletime {
        field: String,
        value: String,
        source: ParseIntError,
    },

    #[error("field `{field}`: FILETIME {ticks} is outside of the representable calendar range")]
    FiletimeOutOfRange { field: String, ticks: u64 },

    #[error("field `{field}`: expected a scalar value")]
    NotAScalar { field: String },

    #[error("field `TargetAppId`: `{value}` does not match the `W:<product>!<file>` shape")]
    MalformedTargetAppId { value: String },
}

impl FieldError {
    /// Name of the field this error refers to.
    pub fn field(&self) -> &str {
        match self {
            FieldError::InvalidFiletime { field, .. }
            | FieldError::FiletimeOutOfRange { field, .. }
            | FieldError::NotAScalar { field } => field,
            FieldError::MalformedTargetAppId { .. } => "TargetAppId",
        }
    }
}

#[derive(Debug, Error)]
pub enum WerError {
    #[error("Failed to open file {}: {}", path.display(), source)]
    FailedToOpenFile { path: PathBuf, source: io::Error },

    #[error("An I/O error has occurred: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to decode UTF-16 text: {message}")]
    FailedToDecodeUtf16 { message: String },

    #[error("Line {line_no}: missing `=` separator in `{line}`")]
    MalformedLine { line_no: usize, line: String },

    #[error("Line {line_no}: field `{field}` is a {existing}, cannot store a {incoming} value")]
    ShapeConflict {
        line_no: usize,
        field: String,
        existing: &'static str,
        incoming: &'static str,
    },

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Failed to read report archive {}: {}", path.display(), source)]
    InvalidArchive { path: PathBuf, source: io::Error },
}

impl WerError {
    /// `true` when the underlying I/O failure was a permission error.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            WerError::FailedToOpenFile { source, .. }
            | WerError::InvalidArchive { source, .. }
            | WerError::Io(source) => source.kind() == io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_is_detected_through_open_failures() {
        let denied = WerError::FailedToOpenFile {
            path: PathBuf::from("/tmp/AppCrash_x/Report.wer"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(denied.is_permission_denied());

        let missing = WerError::FailedToOpenFile {
            path: PathBuf::from("/tmp/AppCrash_x/Report.wer"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(!missing.is_permission_denied());
    }

    #[test]
    fn test_permission_denied_on_archive_and_bare_io() {
        let archive = WerError::InvalidArchive {
            path: PathBuf::from("/tmp/ReportArchive"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(archive.is_permission_denied());
        assert!(WerError::from(io::Error::from(io::ErrorKind::PermissionDenied)).is_permission_denied());

        let field = WerError::from(FieldError::NotAScalar {
            field: "EventTime".to_owned(),
        });
        assert!(!field.is_permission_denied());
    }
}
