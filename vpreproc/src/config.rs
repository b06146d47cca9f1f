use std::path::PathBuf;

use crate::settings::Settings;

/// Default limit on nested `` `include `` depth
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// Configuration for a preprocessor run
#[derive(Clone, Debug)]
pub struct PreprocessorConfig {
    /// Directories searched, in order, for includes not found next to the including file
    pub search_dirs: Vec<PathBuf>,
    /// Maximum include nesting before the include is skipped
    pub max_include_depth: usize,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PreprocessorConfig {
    /// Configuration with no search directories
    #[must_use]
    pub const fn new() -> Self {
        Self {
            search_dirs: Vec::new(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// Configuration searching the validated `incdirs` of `settings`
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new().with_search_dirs(settings.incdirs.clone())
    }

    /// Replace the search directories
    #[must_use]
    pub fn with_search_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Append one search directory
    #[must_use]
    pub fn with_search_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    /// Override the include depth limit
    #[must_use]
    pub const fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }
}
