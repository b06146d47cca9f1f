#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # vpreproc CLI
//!
//! A command-line host for the vpreproc library: reports the inactive
//! `` `ifdef `` regions of Verilog/SystemVerilog files.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use vpreproc::{Analysis, Debouncer, Diagnostic, PreprocessorConfig, Settings, is_hdl_source};

/// Exit codes for different error conditions
mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const IO_ERROR: i32 = 2;
}

/// Command-line interface for the vpreproc scanner
#[derive(Parser)]
#[command(
    name = "vpreproc",
    version,
    author,
    about = "Report inactive `ifdef regions of Verilog/SystemVerilog files",
    long_about = "vpreproc scans Verilog and SystemVerilog sources for `define/`ifdef/`ifndef/`else/`endif \
                  and `include directives and reports the text ranges that are compiled out.",
    after_help = "EXAMPLES:
  # Report inactive regions of a file
  $ vpreproc rtl/top.sv

  # Search extra include directories
  $ vpreproc rtl/top.sv -I rtl/include -I vendor/include

  # Use editor settings, with project overrides
  $ vpreproc rtl/top.sv --settings HDL_Syntax.sublime-settings --project chip.sublime-project

  # Machine-readable output
  $ vpreproc rtl/*.sv --json

  # Rescan whenever the files change
  $ vpreproc rtl/top.sv --watch"
)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Files to scan
    #[arg(required = true, help = "Verilog/SystemVerilog files to scan (.v, .vh, .sv, .svh)")]
    files: Vec<PathBuf>,

    /// Add include directory
    #[arg(
        short = 'I',
        long = "incdir",
        value_name = "DIR",
        help = "Add directory to the include search path (after settings incdirs)"
    )]
    incdirs: Vec<PathBuf>,

    /// User settings file
    #[arg(long, value_name = "FILE", help = "JSON user settings (delay, incdirs)")]
    settings: Option<PathBuf>,

    /// Project settings file
    #[arg(
        long,
        value_name = "FILE",
        help = "JSON project file whose \"settings\" member overrides the user settings"
    )]
    project: Option<PathBuf>,

    /// Maximum include nesting
    #[arg(
        long,
        default_value_t = vpreproc::DEFAULT_MAX_INCLUDE_DEPTH,
        help = "Maximum `include nesting depth"
    )]
    max_include_depth: usize,

    /// Output in JSON format
    #[arg(long, help = "Output regions and diagnostics in JSON format")]
    #[cfg(feature = "json")]
    json: bool,

    /// Output in plain text format (no formatting)
    #[arg(long, help = "Output byte ranges only, for scripts")]
    plain: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, help = "Enable verbose output with diagnostic information")]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short = 'q', long, help = "Suppress warnings (quiet mode)")]
    quiet: bool,

    /// Keep running and rescan on change
    #[arg(short = 'w', long, help = "Rescan files whenever they change")]
    watch: bool,

    /// Disable colored output
    #[arg(long, help = "Disable colored output")]
    no_color: bool,

    /// Force colored output
    #[arg(long, help = "Force colored output even when not a terminal")]
    force_color: bool,
}

/// One inactive region, with 1-based line/column positions
#[derive(Serialize)]
struct RegionReport {
    start: usize,
    end: usize,
    start_line: usize,
    start_column: usize,
    end_line: usize,
    end_column: usize,
}

/// Scan result of one file
#[derive(Serialize)]
struct FileReport {
    file: String,
    regions: Vec<RegionReport>,
    diagnostics: Vec<Diagnostic>,
}

/// Main application entry point
fn main() {
    std::process::exit(match run() {
        Ok(()) => exit_code::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            determine_exit_code(&e)
        }
    });
}

/// Determine the appropriate exit code based on the error
fn determine_exit_code(error: &anyhow::Error) -> i32 {
    let io = error.chain().any(|cause| {
        cause.downcast_ref::<std::io::Error>().is_some()
            || matches!(
                cause.downcast_ref::<vpreproc::PreprocessError>(),
                Some(vpreproc::PreprocessError::Io(_))
            )
    });
    if io {
        exit_code::IO_ERROR
    } else {
        exit_code::GENERAL_ERROR
    }
}

/// Run the main application logic
fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);
    init_colors(&cli);
    validate_args(&cli)?;

    let (settings, _) = Settings::load(cli.settings.as_deref(), cli.project.as_deref())
        .context("Failed to load settings")?;
    let config = create_config(&cli, &settings);
    debug!(
        "delay {}s, search dirs {:?}",
        settings.delay, config.search_dirs
    );

    let files: Vec<&PathBuf> = cli
        .files
        .iter()
        .filter(|file| {
            let accepted = is_hdl_source(file);
            if !accepted {
                warn!("skipping {}: not a Verilog/SystemVerilog file", file.display());
            }
            accepted
        })
        .collect();

    if cli.watch {
        return watch(&cli, &config, &files, settings.delay);
    }

    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        reports.push(scan_file(file, &config)?);
    }
    write_reports(&cli, &reports)
}

/// Set up the `tracing` subscriber; `RUST_LOG` wins over -v/-q
fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn init_colors(cli: &Cli) {
    if cli.no_color || cli.plain {
        colored::control::set_override(false);
    } else if cli.force_color {
        colored::control::set_override(true);
    } else if !atty::is(atty::Stream::Stdout) {
        colored::control::set_override(false);
    }
}

/// Validate command-line arguments
fn validate_args(cli: &Cli) -> Result<()> {
    if cli.max_include_depth == 0 {
        return Err(anyhow::anyhow!("Include depth limit must be greater than 0"));
    }
    if cli.no_color && cli.force_color {
        return Err(anyhow::anyhow!(
            "--no-color and --force-color cannot be used together"
        ));
    }
    Ok(())
}

/// Settings incdirs first, then -I directories
fn create_config(cli: &Cli, settings: &Settings) -> PreprocessorConfig {
    let mut config = PreprocessorConfig::from_settings(settings)
        .with_max_include_depth(cli.max_include_depth);
    for dir in &cli.incdirs {
        if dir.is_dir() {
            config = config.with_search_dir(dir);
        } else {
            warn!("path `{}` removed from `incdirs`", dir.display());
        }
    }
    config
}

fn scan_file(path: &Path, config: &PreprocessorConfig) -> Result<FileReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    let start_time = Instant::now();
    let analysis = vpreproc::analyze_source(&content, config, path);
    debug!(
        "scanned {} in {:?}: {} region(s)",
        path.display(),
        start_time.elapsed(),
        analysis.regions.len()
    );
    Ok(build_report(path, &content, analysis))
}

fn build_report(path: &Path, content: &str, analysis: Analysis) -> FileReport {
    let lines = LineIndex::new(content);
    let regions = analysis
        .regions
        .iter()
        .map(|region| {
            let (start_line, start_column) = lines.position(region.start);
            let (end_line, end_column) = lines.position(region.end);
            RegionReport {
                start: region.start,
                end: region.end,
                start_line,
                start_column,
                end_line,
                end_column,
            }
        })
        .collect();
    FileReport {
        file: path.display().to_string(),
        regions,
        diagnostics: analysis.diagnostics,
    }
}

/// Write reports to stdout
fn write_reports(cli: &Cli, reports: &[FileReport]) -> Result<()> {
    #[cfg(feature = "json")]
    if cli.json {
        println!("{}", serde_json::to_string_pretty(reports)?);
        return Ok(());
    }

    for report in reports {
        for region in &report.regions {
            if cli.plain {
                println!("{}:{}-{}", report.file, region.start, region.end);
            } else {
                println!(
                    "{}:{}:{}-{}:{} {}",
                    report.file.bold(),
                    region.start_line,
                    region.start_column,
                    region.end_line,
                    region.end_column,
                    "inactive".dimmed()
                );
            }
        }
        if cli.verbose && !cli.quiet {
            eprintln!(
                "{} {}: {} inactive region(s), {} diagnostic(s)",
                "✓".green(),
                report.file,
                report.regions.len(),
                report.diagnostics.len()
            );
        }
    }
    Ok(())
}

/// Poll the files and rescan each one once its edits have settled
fn watch(cli: &Cli, config: &PreprocessorConfig, files: &[&PathBuf], delay: f64) -> Result<()> {
    let poll = Duration::from_millis(50);
    let mut sessions: HashMap<&Path, (Option<SystemTime>, Debouncer)> = HashMap::new();

    for file in files {
        write_reports(cli, &[scan_file(file, config)?])?;
        sessions.insert(file.as_path(), (modified(file), Debouncer::new()));
    }

    loop {
        std::thread::sleep(poll);
        let now = Instant::now();
        for (file, (seen, session)) in &mut sessions {
            let current = modified(file);
            if current != *seen {
                *seen = current;
                let recheck = session.record_edit(now, delay);
                debug!("{} changed, rechecking in {recheck:?}", file.display());
            }
            if session.should_run(now, delay) {
                match scan_file(file, config) {
                    Ok(report) => write_reports(cli, &[report])?,
                    Err(e) => warn!("{e:#}"),
                }
            }
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Byte offset to 1-based line/column conversion
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(content: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&start| start <= offset);
        let column = offset - self.starts[line - 1] + 1;
        (line, column)
    }
}
