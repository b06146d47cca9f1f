#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # Verilog Conditional-Compilation Scanner
//!
//! This library finds the spans of Verilog/SystemVerilog source text that are
//! inactive under the current `` `define `` state, so an editor can dim them.
//! It tracks macro presence only; macro bodies are never expanded.
//!
//! ## Features
//!
//! - Comment- and string-aware scanning (directives inside them are ignored)
//! - `` `define ``, `` `undef ``, `` `resetall ``
//! - Conditional compilation (`` `ifdef ``, `` `ifndef ``, `` `else ``, `` `endif ``)
//! - `` `include `` resolution against the including file's directory and a search path,
//!   with cycle and depth guards
//! - Typed host settings and a debounce helper for editor integration
//!
//! ## Example
//!
//! ```rust
//! use vpreproc::inactive_regions;
//!
//! let code = "`ifdef SIM\ninitial $display(\"sim\");\n`endif\n";
//! let regions = inactive_regions(code, &[], ".");
//! assert_eq!(regions.len(), 1);
//! assert_eq!(regions[0].start, 0);
//! ```

mod conditional;
mod config;
mod define_table;
mod directive;
mod error;
mod include;
mod preprocessor;
mod region;
mod scanner;
mod session;
mod settings;
mod token;

pub use conditional::{ConditionalFrame, ConditionalStack, ExclusionCursor};
pub use config::{DEFAULT_MAX_INCLUDE_DEPTH, PreprocessorConfig};
pub use define_table::DefineTable;
pub use error::{Diagnostic, DiagnosticKind, PreprocessError};
pub use include::{DirectoryContext, resolve_include};
pub use preprocessor::{Analysis, Preprocessor};
pub use region::Region;
pub use session::{Debouncer, HDL_EXTENSIONS, is_hdl_source};
pub use settings::{DEFAULT_DELAY, Settings, SettingsWarning};

use std::path::{Path, PathBuf};

/// Inactive regions of `content`, the text of a file living in `base_dir`.
///
/// Includes not found next to the file are looked up in `search_dirs`, in order.
pub fn inactive_regions<P: AsRef<Path>>(
    content: &str,
    search_dirs: &[PathBuf],
    base_dir: P,
) -> Vec<Region> {
    let config = PreprocessorConfig::new().with_search_dirs(search_dirs.iter().cloned());
    analyze(content, &config, base_dir).regions
}

/// Scan `content` with the given configuration, returning regions and diagnostics
pub fn analyze<P: AsRef<Path>>(content: &str, config: &PreprocessorConfig, base_dir: P) -> Analysis {
    Preprocessor::with_config(config.clone()).process(content, base_dir)
}

/// Scan `content`, the current (possibly unsaved) text of the file at `path`
pub fn analyze_source<P: AsRef<Path>>(content: &str, config: &PreprocessorConfig, path: P) -> Analysis {
    Preprocessor::with_config(config.clone()).process_file(content, path)
}

/// Read and scan a source file; relative includes resolve against its directory
///
/// # Errors
/// Returns `PreprocessError` if the file cannot be read.
pub fn analyze_file<P: AsRef<Path>>(
    path: P,
    config: &PreprocessorConfig,
) -> Result<Analysis, PreprocessError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    Ok(analyze_source(&content, config, path))
}
