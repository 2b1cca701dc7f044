#![deny(unused_must_use)]

use anyhow::{Context, Result, bail, format_err};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::Confirm;
use indoc::indoc;
use log::{Level, error, info, warn};

use wer::output::{DEFAULT_CSV_COLUMNS, write_csv, write_jsonl};
use wer::{DEFAULT_REPORT_ARCHIVE, ParserSettings, ScanResults, parse_report_file, scan_report_archive};

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

#[cfg(all(feature = "fast-alloc", not(windows)))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[cfg(all(feature = "fast-alloc", windows))]
#[global_allocator]
static GLOBAL: rpmalloc::RpMalloc = rpmalloc::RpMalloc;

/// Where a single output stream goes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OutputTarget {
    Disabled,
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    fn from_matches(matches: &ArgMatches, path_arg: &str, disable_flag: &str) -> Self {
        if matches.get_flag(disable_flag) {
            return OutputTarget::Disabled;
        }

        match matches.get_one::<String>(path_arg).map(String::as_str) {
            None => OutputTarget::Disabled,
            Some("-") => OutputTarget::Stdout,
            Some(path) => OutputTarget::File(PathBuf::from(path)),
        }
    }
}

struct WerDump {
    parser_settings: ParserSettings,
    inputs: Vec<PathBuf>,
    globs: Vec<String>,
    csv_output: OutputTarget,
    jsonl_output: OutputTarget,
    columns: Vec<String>,
    prompt_before_overwrite: bool,
    verbosity_level: Option<Level>,
}

impl WerDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let mut inputs: Vec<PathBuf> = matches
            .get_many::<String>("INPUT")
            .map(|values| values.map(PathBuf::from).collect())
            .unwrap_or_default();

        let globs: Vec<String> = matches
            .get_many::<String>("glob")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        for pattern in &globs {
            glob::Pattern::new(pattern)
                .with_context(|| format!("invalid glob pattern `{pattern}`"))?;
        }

        if inputs.is_empty() && globs.is_empty() {
            inputs.push(PathBuf::from(DEFAULT_REPORT_ARCHIVE));
        }

        let num_threads = *matches.get_one::<usize>("num-threads").unwrap_or(&0);
        let num_threads = match (cfg!(feature = "multithreading"), num_threads) {
            (true, number) => number,
            (false, 0 | 1) => 1,
            (false, _) => {
                eprintln!(
                    "turned on threads, but library was compiled without `multithreading` feature! using fallback sync iterator"
                );
                1
            }
        };

        let columns = match matches.get_one::<String>("columns") {
            Some(columns) => columns
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_owned)
                .collect(),
            None => DEFAULT_CSV_COLUMNS.iter().map(|c| c.to_string()).collect(),
        };

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(Level::Info),
            2 => Some(Level::Debug),
            3 => Some(Level::Trace),
            _ => {
                eprintln!("using more than  -vvv does not affect verbosity level");
                Some(Level::Trace)
            }
        };

        Ok(WerDump {
            parser_settings: ParserSettings::new()
                .num_threads(num_threads)
                .strict(matches.get_flag("strict"))
                .convert_timestamps(!matches.get_flag("no-timestamps")),
            inputs,
            globs,
            csv_output: OutputTarget::from_matches(matches, "csv", "no-csv"),
            jsonl_output: OutputTarget::from_matches(matches, "jsonl", "no-jsonl"),
            columns,
            prompt_before_overwrite: !matches.get_flag("no-confirm-overwrite"),
            verbosity_level,
        })
    }

    /// Main entry point for `WerDump`
    pub fn run(&self) -> Result<()> {
        self.try_to_initialize_logging();

        if self.csv_output == OutputTarget::Stdout && self.jsonl_output == OutputTarget::Stdout {
            bail!("CSV and JSONL output cannot both be written to stdout");
        }

        let results = self.collect_records();

        if results.records.is_empty() {
            warn!("No reports were parsed, not writing any output");
            return Ok(());
        }

        info!(
            "Parsed {} reports ({} failures)",
            results.records.len(),
            results.failures.len()
        );

        if let Some(mut output) = self.open_output(&self.csv_output) {
            write_csv(&mut output, &results.records, &self.columns)
                .context("failed to write CSV output")?;
        }

        if let Some(mut output) = self.open_output(&self.jsonl_output) {
            write_jsonl(&mut output, &results.records).context("failed to write JSONL output")?;
        }

        Ok(())
    }

    fn expand_inputs(&self) -> Vec<PathBuf> {
        let mut inputs = self.inputs.clone();

        for pattern in &self.globs {
            let paths = match glob::glob(pattern) {
                Ok(paths) => paths,
                Err(e) => {
                    error!("invalid glob pattern `{}`: {}", pattern, e);
                    continue;
                }
            };

            for path in paths {
                match path {
                    Ok(path) => inputs.push(path),
                    Err(e) => warn!("Failed to read glob match: {}", e),
                }
            }
        }

        inputs
    }

    fn collect_records(&self) -> ScanResults {
        let mut results = ScanResults::new();

        for input in &self.expand_inputs() {
            if input.is_dir() {
                match scan_report_archive(input, &self.parser_settings) {
                    Ok(scanned) => results.extend(scanned),
                    Err(e) => error!("{}", e),
                }
            } else if input.exists() {
                match parse_report_file(input, &self.parser_settings) {
                    Ok(None) => warn!("{} is not a Report.wer file, skipping", input.display()),
                    outcome => results.push_outcome(input.clone(), outcome),
                }
            } else {
                warn!("Input {} does not exist, skipping", input.display());
            }
        }

        results
    }

    fn open_output(&self, target: &OutputTarget) -> Option<Box<dyn Write>> {
        let output: Box<dyn Write> = match target {
            OutputTarget::Disabled => return None,
            OutputTarget::Stdout => Box::new(BufWriter::new(io::stdout())),
            OutputTarget::File(path) => {
                match Self::create_output_file(path, self.prompt_before_overwrite) {
                    Ok(f) => Box::new(BufWriter::new(f)),
                    Err(e) => {
                        eprintln!(
                            "An error occurred while creating output file at `{}` - `{}`",
                            path.display(),
                            e
                        );
                        exit(1)
                    }
                }
            }
        };

        Some(output)
    }

    /// If `prompt` is passed, will display a confirmation prompt before overwriting files.
    fn create_output_file(path: impl AsRef<Path>, prompt: bool) -> Result<File> {
        let p = path.as_ref();

        if p.is_dir() {
            bail!(
                "There is a directory at {}, refusing to overwrite",
                p.display()
            );
        }

        if p.exists() {
            if prompt {
                match Confirm::new()
                    .with_prompt(format!(
                        "Are you sure you want to override output file at {}",
                        p.display()
                    ))
                    .default(false)
                    .interact()
                {
                    Ok(true) => Ok(File::create(p)?),
                    Ok(false) => bail!("Cancelled"),
                    Err(e) => Err(format_err!(
                        "Failed to write confirmation prompt to term caused by\n{}",
                        e
                    )),
                }
            } else {
                Ok(File::create(p)?)
            }
        } else {
            // Ok to assume p is not an existing directory
            match p.parent() {
                Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                    fs::create_dir_all(parent)?;
                    Ok(File::create(p)?)
                }
                Some(_) => Ok(File::create(p)?),
                None => bail!("Output file cannot be root."),
            }
        }
    }

    fn try_to_initialize_logging(&self) {
        let level = self
            .verbosity_level
            .map_or(simplelog::LevelFilter::Warn, |level| level.to_level_filter());

        if let Err(e) = simplelog::TermLogger::init(
            level,
            simplelog::Config::default(),
            simplelog::TerminalMode::Stderr,
            simplelog::ColorChoice::Auto,
        ) {
            eprintln!("Failed to initialize logging: {:?}", e)
        }
    }
}

fn command() -> Command {
    Command::new("WER Parser")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to parse Windows Error Reporting (Report.wer) files")
        .long_about(indoc!(r#"
            Utility to parse Windows Error Reporting (Report.wer) files.

            Every INPUT directory is treated as a report archive: each of its
            subdirectories is searched for a `Report.wer` file. INPUT files are
            parsed directly.

            Parsed reports are written to a CSV file (a fixed subset of fields)
            and to a JSON lines file (every field).
        "#))
        .arg(
            Arg::new("INPUT")
                .action(ArgAction::Append)
                .num_args(1..)
                .help(format!(
                    "Report archive directories or Report.wer files. Defaults to `{DEFAULT_REPORT_ARCHIVE}`."
                )),
        )
        .arg(
            Arg::new("glob")
                .long("glob")
                .action(ArgAction::Append)
                .value_name("PATTERN")
                .help("Glob pattern to expand into input paths (cross-platform). Can be passed multiple times."),
        )
        .arg(
            Arg::new("num-threads")
                .short('t')
                .long("threads")
                .default_value("0")
                .value_parser(clap::value_parser!(usize))
                .help("Sets the number of worker threads, defaults to number of CPU cores."),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .value_name("PATH")
                .default_value("wer_results.csv")
                .help("Writes the CSV summary to PATH, `-` writes to stdout."),
        )
        .arg(
            Arg::new("no-csv")
                .long("no-csv")
                .action(ArgAction::SetTrue)
                .help("When set, no CSV output is written."),
        )
        .arg(
            Arg::new("jsonl")
                .long("jsonl")
                .value_name("PATH")
                .default_value("wer_results.jsonl")
                .help("Writes every parsed report as a line of JSON to PATH, `-` writes to stdout."),
        )
        .arg(
            Arg::new("no-jsonl")
                .long("no-jsonl")
                .action(ArgAction::SetTrue)
                .help("When set, no JSONL output is written."),
        )
        .arg(
            Arg::new("columns")
                .long("columns")
                .value_name("FIELDS")
                .help(format!(
                    "Comma-separated list of fields written to CSV (default: {}).",
                    DEFAULT_CSV_COLUMNS.join(",")
                )),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help("When set, will not ask for confirmation before overwriting files, useful for automation"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .help("When set, reports with malformed lines or fields are treated as failures instead of being parsed leniently."),
        )
        .arg(
            Arg::new("no-timestamps")
                .long("no-timestamps")
                .action(ArgAction::SetTrue)
                .help("When set, `EventTime`/`UploadTime` are kept as raw FILETIME values."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help(indoc!(
                    "-v - info, -vv - debug, -vvv - trace
                    trace output is only available in debug builds, as it is extremely verbose"
                )),
        )
}

fn main() -> Result<()> {
    let matches = command().get_matches();

    let app = WerDump::from_cli_matches(&matches)?;
    app.run()
}
