//! Values derived from a fully accumulated record.

use crate::err::FieldError;
use crate::record::{FieldValue, WerRecord};
use crate::utils::filetime_to_timestamp;

use log::debug;

pub const TARGET_APP_ID: &str = "TargetAppId";
pub const SHA1: &str = "SHA1";
pub const EVENT_TIME: &str = "EventTime";
pub const UPLOAD_TIME: &str = "UploadTime";

/// Fields holding a FILETIME that get converted to a calendar timestamp.
pub const FILETIME_FIELDS: [&str; 2] = [EVENT_TIME, UPLOAD_TIME];

/// Extracts the executable SHA-1 embedded in a Win32 `TargetAppId`.
///
/// Win32 application ids look like `W:<product id>!<file id>!<program name>`, where the file id
/// is `0000` followed by the SHA-1 of the executable, in the same format AmCache uses.
/// Note that Windows only hashes the first 31,457,280 bytes of the file.
///
/// Returns `Ok(None)` for ids that are not Win32 ids or carry no hash.
pub fn sha1_from_target_app_id(target_app_id: &str) -> Result<Option<&str>, FieldError> {
    if !target_app_id.starts_with("W:") {
        return Ok(None);
    }

    let file_id = target_app_id
        .split('!')
        .nth(1)
        .ok_or_else(|| FieldError::MalformedTargetAppId {
            value: target_app_id.to_owned(),
        })?;

    Ok(file_id.strip_prefix("0000"))
}

/// Parses a decimal FILETIME string and converts it to a calendar timestamp.
pub fn convert_filetime_field(field: &str, raw: &str) -> Result<FieldValue, FieldError> {
    let ticks = raw
        .parse::<u64>()
        .map_err(|source| FieldError::InvalidFiletime {
            field: field.to_owned(),
            value: raw.to_owned(),
            source,
        })?;

    filetime_to_timestamp(ticks)
        .map(FieldValue::Timestamp)
        .ok_or_else(|| FieldError::FiletimeOutOfRange {
            field: field.to_owned(),
            ticks,
        })
}

/// Adds the `SHA1` field when `TargetAppId` carries one.
pub(crate) fn derive_sha1(record: &mut WerRecord) -> Result<(), FieldError> {
    let sha1 = match record.get(TARGET_APP_ID) {
        None => return Ok(()),
        Some(FieldValue::Scalar(id)) => sha1_from_target_app_id(id)?.map(str::to_owned),
        Some(_) => {
            return Err(FieldError::NotAScalar {
                field: TARGET_APP_ID.to_owned(),
            });
        }
    };

    if let Some(sha1) = sha1 {
        debug!("Derived SHA1 `{}` from {}", sha1, TARGET_APP_ID);
        record.fields_mut().insert(SHA1.to_owned(), FieldValue::Scalar(sha1));
    }

    Ok(())
}

/// Replaces a FILETIME field with its converted timestamp.
///
/// On error the raw field is left untouched.
pub(crate) fn convert_filetime(record: &mut WerRecord, field: &str) -> Result<(), FieldError> {
    let converted = match record.get(field) {
        None => return Ok(()),
        Some(FieldValue::Scalar(raw)) => convert_filetime_field(field, raw)?,
        Some(_) => {
            return Err(FieldError::NotAScalar {
                field: field.to_owned(),
            });
        }
    };

    record.fields_mut().insert(field.to_owned(), converted);
    Ok(())
}
