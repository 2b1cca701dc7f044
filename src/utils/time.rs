use jiff::Timestamp;

/// Seconds between the FILETIME epoch (1601-01-01) and the unix epoch.
const WINDOWS_TO_UNIX_SECS: i64 = 11_644_473_600;

/// Converts a FILETIME (100ns ticks since 1601-01-01T00:00:00Z) to a UTC timestamp.
///
/// Ticks are truncated to whole microseconds before conversion, any sub-microsecond
/// remainder is dropped.
///
/// Returns `None` when the result does not fit the supported calendar range (years up to 9999).
pub fn filetime_to_timestamp(filetime: u64) -> Option<Timestamp> {
    // `u64::MAX / 10` always fits an `i64`.
    let micros_since_1601 = (filetime / 10) as i64;
    let micros = micros_since_1601.checked_sub(WINDOWS_TO_UNIX_SECS * 1_000_000)?;
    Timestamp::from_microsecond(micros).ok()
}
