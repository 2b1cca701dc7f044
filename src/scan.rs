//! Scanning of WER report archives.
//!
//! A report archive (`C:\ProgramData\Microsoft\Windows\WER\ReportArchive` by default) holds one
//! subdirectory per report, each with a `Report.wer` file inside.

use crate::err::{Result, WerError};
use crate::record::WerRecord;
use crate::wer_parser::{ParserSettings, is_report_file_name, parse_report_file};

use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "multithreading")]
use rayon::prelude::*;

/// The default report archive location on a live system.
pub const DEFAULT_REPORT_ARCHIVE: &str = r"C:\ProgramData\Microsoft\Windows\WER\ReportArchive";

/// Records and per-file failures gathered by a scan.
#[derive(Debug, Default)]
pub struct ScanResults {
    pub records: Vec<WerRecord>,
    pub failures: Vec<(PathBuf, WerError)>,
}

impl ScanResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, other: ScanResults) {
        self.records.extend(other.records);
        self.failures.extend(other.failures);
    }

    /// Adds the outcome of parsing `path`, logging failures.
    ///
    /// Reports without a single field are dropped.
    pub fn push_outcome(&mut self, path: PathBuf, outcome: Result<Option<WerRecord>>) {
        match outcome {
            Ok(Some(record)) if record.is_empty() => {
                debug!("{} has no fields, skipping", path.display())
            }
            Ok(Some(record)) => self.records.push(record),
            Ok(None) => debug!("{} yielded no record", path.display()),
            Err(e) => {
                if e.is_permission_denied() {
                    error!("Permission denied to {}", path.display());
                } else {
                    error!("Error parsing file {}. {}", path.display(), e);
                }
                self.failures.push((path, e));
            }
        }
    }
}

/// Finds the `Report.wer` file directly inside `dir`, matching the name case-insensitively.
pub fn find_report_file(dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let dir = dir.as_ref();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if is_report_file_name(entry.file_name()) && entry.file_type()?.is_file() {
            return Ok(Some(entry.path()));
        }
    }

    Ok(None)
}

/// Lists the report files of an archive, in subdirectory name order.
///
/// Subdirectories that cannot be listed are returned as failures instead of aborting.
pub fn list_report_files(archive: impl AsRef<Path>) -> Result<(Vec<PathBuf>, ScanResults)> {
    let archive = archive.as_ref();
    let invalid_archive = |source: std::io::Error| WerError::InvalidArchive {
        path: archive.to_path_buf(),
        source,
    };

    let mut subdirs = Vec::new();
    for entry in fs::read_dir(archive).map_err(invalid_archive)? {
        let entry = entry.map_err(invalid_archive)?;
        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => subdirs.push(entry.path()),
            Ok(_) => {}
            Err(e) => warn!("Failed to stat {}: {}", entry.path().display(), e),
        }
    }
    subdirs.sort();

    let mut report_files = Vec::with_capacity(subdirs.len());
    let mut unreadable = ScanResults::new();
    for subdir in subdirs {
        match find_report_file(&subdir) {
            Ok(Some(path)) => report_files.push(path),
            Ok(None) => debug!("No report file in {}, skipping", subdir.display()),
            Err(e) => unreadable.push_outcome(subdir, Err(e)),
        }
    }

    Ok((report_files, unreadable))
}

/// Parses every report in `archive`.
///
/// Fails only when `archive` itself cannot be read; failures of individual reports are collected
/// in the returned [`ScanResults`].
pub fn scan_report_archive(
    archive: impl AsRef<Path>,
    settings: &ParserSettings,
) -> Result<ScanResults> {
    let archive = archive.as_ref();
    info!("Scanning report archive {}", archive.display());

    let (report_files, mut results) = list_report_files(archive)?;
    results.extend(parse_report_files(report_files, settings));

    info!(
        "Parsed {} reports from {} ({} failures)",
        results.records.len(),
        archive.display(),
        results.failures.len()
    );
    Ok(results)
}

/// Parses the given report files, in parallel when possible, keeping input order.
pub fn parse_report_files(paths: Vec<PathBuf>, settings: &ParserSettings) -> ScanResults {
    let outcomes = parse_all(paths, settings);

    let mut results = ScanResults::new();
    for (path, outcome) in outcomes {
        results.push_outcome(path, outcome);
    }
    results
}

type Outcome = (PathBuf, Result<Option<WerRecord>>);

fn parse_sequential(paths: Vec<PathBuf>, settings: &ParserSettings) -> Vec<Outcome> {
    paths
        .into_iter()
        .map(|path| {
            let outcome = parse_report_file(&path, settings);
            (path, outcome)
        })
        .collect()
}

#[cfg(feature = "multithreading")]
fn parse_all(paths: Vec<PathBuf>, settings: &ParserSettings) -> Vec<Outcome> {
    let num_threads = settings.get_num_threads();
    if num_threads == 1 || paths.len() < 2 {
        return parse_sequential(paths, settings);
    }

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            warn!("Failed to build thread pool ({}), parsing sequentially", e);
            return parse_sequential(paths, settings);
        }
    };

    pool.install(|| {
        paths
            .into_par_iter()
            .map(|path| {
                let outcome = parse_report_file(&path, settings);
                (path, outcome)
            })
            .collect()
    })
}

#[cfg(not(feature = "multithreading"))]
fn parse_all(paths: Vec<PathBuf>, settings: &ParserSettings) -> Vec<Outcome> {
    parse_sequential(paths, settings)
}
