use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::conditional::{ConditionalStack, ExclusionCursor};
use crate::config::PreprocessorConfig;
use crate::define_table::DefineTable;
use crate::directive::{Directive, DirectiveMatch, match_directive};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::include::{DirectoryContext, resolve_include};
use crate::region::{Region, RegionCollector};
use crate::scanner::{Skip, next_marker, skip_block_comment, skip_line_comment, skip_string};
use crate::token::MarkerKind;

/// Result of scanning one top-level buffer
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Analysis {
    /// Inactive spans of the buffer, ascending and non-overlapping
    pub regions: Vec<Region>,
    /// Advisory findings, in the order they were met
    pub diagnostics: Vec<Diagnostic>,
}

/// The Verilog conditional-compilation scanner.
///
/// One value drives one top-level run at a time: [`Preprocessor::process`]
/// resets the define table and conditional stack before scanning, and every
/// file reached through `` `include `` shares them with the includer.
pub struct Preprocessor {
    config: PreprocessorConfig,
    defines: DefineTable,
    conditionals: ConditionalStack,
    dirs: DirectoryContext,
    include_chain: Vec<PathBuf>,
    current_file: Option<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    /// Create a preprocessor with no search directories
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PreprocessorConfig::new())
    }

    /// Create a preprocessor with the given configuration
    #[must_use]
    pub fn with_config(config: PreprocessorConfig) -> Self {
        Preprocessor {
            config,
            defines: DefineTable::new(),
            conditionals: ConditionalStack::new(),
            dirs: DirectoryContext::new(""),
            include_chain: Vec::new(),
            current_file: None,
            diagnostics: Vec::new(),
        }
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    /// Definitions left behind by the last run
    #[must_use]
    pub fn defines(&self) -> &DefineTable {
        &self.defines
    }

    /// Check if a macro was defined at the end of the last run
    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.defines.is_defined(name)
    }

    /// Scan `content`, the text of a file living in `base_dir`, and return its
    /// inactive regions.
    ///
    /// Never fails: malformed input only produces diagnostics.
    pub fn process<P: AsRef<Path>>(&mut self, content: &str, base_dir: P) -> Analysis {
        self.run(content, base_dir.as_ref(), None)
    }

    /// Scan `content`, the current text of the file at `path`.
    ///
    /// Like [`Preprocessor::process`] with the file's directory as base, but the
    /// file itself starts the include chain, so including it again is a cycle.
    pub fn process_file<P: AsRef<Path>>(&mut self, content: &str, path: P) -> Analysis {
        let path = path.as_ref();
        let base_dir = path.parent().unwrap_or(Path::new(""));
        self.run(content, base_dir, Some(path))
    }

    fn run(&mut self, content: &str, base_dir: &Path, source: Option<&Path>) -> Analysis {
        self.defines.clear();
        self.conditionals.clear();
        self.include_chain.clear();
        self.diagnostics.clear();
        self.current_file = None;
        self.dirs = DirectoryContext::new(base_dir);
        if let Some(source) = source {
            let canonical = fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
            self.include_chain.push(canonical);
        }

        let (regions, cursor) = self.scan(content);
        if cursor.excluding {
            self.report(DiagnosticKind::UnterminatedConditional, cursor.start);
        }

        Analysis {
            regions,
            diagnostics: std::mem::take(&mut self.diagnostics),
        }
    }

    /// Scan one buffer with its own exclusion cursor
    fn scan(&mut self, content: &str) -> (Vec<Region>, ExclusionCursor) {
        let bytes = content.as_bytes();
        let mut cursor = ExclusionCursor::default();
        let mut regions = RegionCollector::default();
        let mut pos = 0;

        while let Some(marker) = next_marker(bytes, pos) {
            pos = match marker.kind {
                MarkerKind::LineComment => {
                    self.skipped(skip_line_comment(bytes, marker.end), marker.start)
                }
                MarkerKind::BlockComment => {
                    self.skipped(skip_block_comment(bytes, marker.end), marker.start)
                }
                MarkerKind::StringQuote => {
                    self.skipped(skip_string(bytes, marker.end), marker.start)
                }
                MarkerKind::Directive => match match_directive(content, marker.start) {
                    Some(found) => {
                        if let Some(region) = self.execute(&found, &mut cursor) {
                            regions.push(region);
                        }
                        found.end
                    }
                    None => marker.end,
                },
            };
        }

        (regions.into_regions(), cursor)
    }

    fn skipped(&mut self, (resume, problem): Skip, start: usize) -> usize {
        if let Some(kind) = problem {
            self.report(kind, start);
        }
        resume
    }

    fn execute(&mut self, found: &DirectiveMatch<'_>, cursor: &mut ExclusionCursor) -> Option<Region> {
        match found.directive {
            Directive::Include(target) => {
                self.include(target, found.start);
                None
            }
            Directive::Define(name) => {
                self.defines.define(name);
                None
            }
            Directive::Undef(name) => {
                self.defines.undef(name);
                None
            }
            Directive::ResetAll => {
                self.defines.clear();
                None
            }
            Directive::Ifdef(name) => {
                let take = self.defines.is_defined(name);
                self.conditionals.open(take, cursor, found.start);
                None
            }
            Directive::Ifndef(name) => {
                let take = !self.defines.is_defined(name);
                self.conditionals.open(take, cursor, found.start);
                None
            }
            Directive::Else => {
                self.conditionals
                    .switch_branch(cursor, found.start, found.keyword_end)
            }
            Directive::Endif => self.conditionals.close(cursor, found.keyword_end),
        }
    }

    /// Scan an included file for its effect on the shared define table and
    /// conditional stack; its own regions are dropped.
    fn include(&mut self, target: &str, offset: usize) {
        let Some(path) = resolve_include(target, self.dirs.current(), &self.config.search_dirs)
        else {
            self.report(DiagnosticKind::IncludeNotFound(target.to_string()), offset);
            return;
        };

        // the base directory entry is the top-level buffer, not an include
        if self.dirs.depth() - 1 >= self.config.max_include_depth {
            self.report(
                DiagnosticKind::IncludeDepthExceeded(self.config.max_include_depth),
                offset,
            );
            return;
        }

        let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if self.include_chain.contains(&canonical) {
            self.report(DiagnosticKind::IncludeCycle(path), offset);
            return;
        }

        let content = match fs::read(&path) {
            Ok(raw) => String::from_utf8_lossy(&raw).into_owned(),
            Err(err) => {
                self.report(
                    DiagnosticKind::IncludeUnreadable {
                        path,
                        reason: err.to_string(),
                    },
                    offset,
                );
                return;
            }
        };

        debug!("including {}", path.display());
        self.within_include(path, canonical, |pp| {
            pp.scan(&content);
        });
    }

    /// Run `f` with `path` as the current file; the directory context and
    /// include chain are restored afterwards.
    fn within_include<R>(
        &mut self,
        path: PathBuf,
        canonical: PathBuf,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.dirs.push(dir);
        self.include_chain.push(canonical);
        let outer_file = self.current_file.replace(path);

        let result = f(self);

        self.current_file = outer_file;
        self.include_chain.pop();
        self.dirs.pop();
        result
    }

    fn report(&mut self, kind: DiagnosticKind, offset: usize) {
        match &self.current_file {
            Some(file) => warn!("{}@{offset}: {kind}", file.display()),
            None => warn!("@{offset}: {kind}"),
        }
        self.diagnostics.push(Diagnostic {
            kind,
            file: self.current_file.clone(),
            offset,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn regions(src: &str) -> Vec<Region> {
        Preprocessor::new().process(src, "").regions
    }

    fn covered<'a>(src: &'a str, region: &Region) -> &'a str {
        region.slice(src).unwrap()
    }

    #[test]
    fn plain_text_has_no_regions() {
        assert_eq!(regions("module top;\n  wire a = b & c;\nendmodule\n"), vec![]);
    }

    #[test]
    fn defined_branch_is_kept() {
        assert_eq!(regions("`define A\n`ifdef A\nfoo\n`endif\n"), vec![]);
    }

    #[test]
    fn undefined_branch_spans_ifdef_through_endif() {
        let src = "`ifdef A\nfoo\n`endif";
        let found = regions(src);
        assert_eq!(found, vec![Region::new(0, src.len())]);
        assert_eq!(covered(src, &found[0]), src);
    }

    #[test]
    fn else_branch_of_undefined_macro_is_kept() {
        let src = "`ifdef A\nfoo\n`else\nbar\n`endif\n";
        let found = regions(src);
        assert_eq!(found.len(), 1);
        assert_eq!(covered(src, &found[0]), "`ifdef A\nfoo\n");
    }

    #[test]
    fn else_branch_of_defined_macro_is_excluded() {
        let src = "`define A\n`ifdef A\nfoo\n`else\nbar\n`endif\nbaz\n";
        let found = regions(src);
        assert_eq!(found.len(), 1);
        assert_eq!(covered(src, &found[0]), "\nbar\n`endif");
    }

    #[test]
    fn ifndef_inverts_the_test() {
        let src = "`define A\n`ifndef A\nfoo\n`endif\n`ifndef B\nbar\n`endif\n";
        let found = regions(src);
        assert_eq!(found.len(), 1);
        assert_eq!(covered(src, &found[0]), "`ifndef A\nfoo\n`endif");
    }

    #[test]
    fn directives_in_comments_and_strings_are_inert() {
        let src = "// `define A\n/* `define B */\nx = \"`define C\";\n\
                   `ifdef A\n`endif\n`ifdef B\n`endif\n`ifdef C\n`endif\n";
        let mut pp = Preprocessor::new();
        let analysis = pp.process(src, "");
        assert_eq!(analysis.regions.len(), 3);
        assert!(pp.defines().is_empty());
        assert_eq!(analysis.diagnostics, vec![]);
    }

    #[test]
    fn escaped_quote_does_not_end_string() {
        let src = "s = \"a\\\" `define A\";\n`ifdef A\n`endif\n";
        let mut pp = Preprocessor::new();
        assert_eq!(pp.process(src, "").regions.len(), 1);
        assert!(!pp.is_defined("A"));
    }

    #[test]
    fn resetall_forgets_previous_definitions() {
        let src = "`define X\n`resetall\n`ifdef X\nfoo\n`endif\n";
        let found = regions(src);
        assert_eq!(found.len(), 1);
        assert_eq!(covered(src, &found[0]), "`ifdef X\nfoo\n`endif");
    }

    #[test]
    fn undef_removes_definition() {
        let src = "`define X\n`undef X\n`ifdef X\nfoo\n`endif\n";
        assert_eq!(regions(src).len(), 1);
    }

    #[test]
    fn nested_conditionals_inside_exclusion_yield_one_region() {
        let src = "`ifdef OUTER\n\
                   a\n\
                   `ifdef INNER\n\
                   b\n\
                   `else\n\
                   c\n\
                   `endif\n\
                   d\n\
                   `endif\n\
                   e\n";
        let found = regions(src);
        assert_eq!(found.len(), 1);
        let text = covered(src, &found[0]);
        assert!(text.starts_with("`ifdef OUTER"));
        assert!(text.ends_with("d\n`endif"));
    }

    #[test]
    fn nested_excluded_inner_inside_active_outer() {
        let src = "`define OUTER\n`ifdef OUTER\na\n`ifdef INNER\nb\n`endif\nc\n`endif\n";
        let found = regions(src);
        assert_eq!(found.len(), 1);
        assert_eq!(covered(src, &found[0]), "`ifdef INNER\nb\n`endif");
    }

    #[test]
    fn regions_are_ordered_and_disjoint() {
        let src = "`ifdef A\n1\n`endif\n`ifdef B\n2\n`else\n3\n`endif\n`define C\n`ifndef C\n4\n`endif\n";
        let found = regions(src);
        assert_eq!(found.len(), 3);
        assert!(found.windows(2).all(|w| w[0].end <= w[1].start));
    }

    #[test]
    fn unbalanced_else_and_endif_are_ignored() {
        let src = "`else\n`endif\n`ifdef A\nx\n`endif\n";
        let found = regions(src);
        assert_eq!(found.len(), 1);
        assert_eq!(covered(src, &found[0]), "`ifdef A\nx\n`endif");
    }

    #[test]
    fn malformed_directives_pass_through_silently() {
        let src = "`define\n`ifdef\n`timescale 1ns/1ps\n`WIDTH'd0\n";
        let analysis = Preprocessor::new().process(src, "");
        assert_eq!(analysis, Analysis::default());
    }

    #[test]
    fn unterminated_constructs_are_reported() {
        let analysis = Preprocessor::new().process("x /* open", "");
        assert_eq!(analysis.regions, vec![]);
        assert_eq!(
            analysis.diagnostics,
            vec![Diagnostic {
                kind: DiagnosticKind::UnterminatedBlockComment,
                file: None,
                offset: 2,
            }]
        );

        let analysis = Preprocessor::new().process("`ifdef A\n// tail", "");
        let kinds: Vec<_> = analysis.diagnostics.into_iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::UnterminatedLineComment,
                DiagnosticKind::UnterminatedConditional,
            ]
        );
        assert_eq!(analysis.regions, vec![]);
    }

    #[test]
    fn state_does_not_survive_between_runs() {
        let mut pp = Preprocessor::new();
        pp.process("`define A\n`ifdef B\n", "");
        assert!(pp.is_defined("A"));
        let found = pp.process("`ifdef A\nx\n`endif\n", "").regions;
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn include_shares_definitions_but_not_regions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("defs.vh"),
            "`define X\n`ifdef NOPE\nhidden in include\n`endif\n",
        )
        .unwrap();

        let src = "`include \"defs.vh\"\n`ifdef X\nkept\n`endif\n`ifdef NOPE\ngone\n`endif\n";
        let mut pp = Preprocessor::new();
        let analysis = pp.process(src, dir.path());
        assert_eq!(analysis.diagnostics, vec![]);
        assert_eq!(analysis.regions.len(), 1);
        assert_eq!(covered(src, &analysis.regions[0]), "`ifdef NOPE\ngone\n`endif");
        assert!(pp.is_defined("X"));
    }

    #[test]
    fn include_is_searched_in_configured_directories() {
        let top = tempfile::tempdir().unwrap();
        let inc = tempfile::tempdir().unwrap();
        fs::create_dir(inc.path().join("sub")).unwrap();
        fs::write(inc.path().join("pkg.svh"), "`include \"sub/more.svh\"\n").unwrap();
        fs::write(inc.path().join("sub").join("more.svh"), "`include \"leaf.svh\"\n").unwrap();
        fs::write(inc.path().join("sub").join("leaf.svh"), "`define LEAF\n").unwrap();

        let config = PreprocessorConfig::new().with_search_dir(inc.path());
        let mut pp = Preprocessor::with_config(config);
        let analysis = pp.process("`include \"pkg.svh\"\n", top.path());
        assert_eq!(analysis.diagnostics, vec![]);
        assert!(pp.is_defined("LEAF"));
    }

    #[test]
    fn missing_include_is_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let src = "`include \"nowhere.vh\" `define AFTER\n";
        let mut pp = Preprocessor::new();
        let analysis = pp.process(src, dir.path());
        assert_eq!(
            analysis.diagnostics,
            vec![Diagnostic {
                kind: DiagnosticKind::IncludeNotFound("nowhere.vh".to_string()),
                file: None,
                offset: 0,
            }]
        );
        assert!(pp.is_defined("AFTER"));
    }

    #[test]
    fn include_cycle_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.vh"), "`define A\n`include \"b.vh\"\n").unwrap();
        fs::write(dir.path().join("b.vh"), "`define B\n`include \"a.vh\"\n").unwrap();

        let mut pp = Preprocessor::new();
        let analysis = pp.process("`include \"a.vh\"\n", dir.path());
        assert!(pp.is_defined("A"));
        assert!(pp.is_defined("B"));
        assert_eq!(analysis.diagnostics.len(), 1);
        let diagnostic = &analysis.diagnostics[0];
        assert!(matches!(diagnostic.kind, DiagnosticKind::IncludeCycle(_)));
        assert_eq!(diagnostic.file.as_deref(), Some(dir.path().join("b.vh").as_path()));
    }

    #[test]
    fn include_depth_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        for level in 0..4 {
            fs::write(
                dir.path().join(format!("l{level}.vh")),
                format!("`define L{level}\n`include \"l{}.vh\"\n", level + 1),
            )
            .unwrap();
        }
        fs::write(dir.path().join("l4.vh"), "`define L4\n").unwrap();

        let config = PreprocessorConfig::new().with_max_include_depth(2);
        let mut pp = Preprocessor::with_config(config);
        assert_eq!(pp.config().max_include_depth, 2);
        let analysis = pp.process("`include \"l0.vh\"\n", dir.path());
        assert!(pp.is_defined("L1"));
        assert!(!pp.is_defined("L2"));
        assert_eq!(
            analysis.diagnostics.iter().map(|d| &d.kind).collect::<Vec<_>>(),
            vec![&DiagnosticKind::IncludeDepthExceeded(2)]
        );
    }

    #[test]
    fn include_inside_excluded_block_still_updates_definitions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("defs.vh"), "`define X\n").unwrap();
        let src = "`ifdef NOPE\n`include \"defs.vh\"\n`endif\n`ifdef X\nx\n`endif\n";
        let found = Preprocessor::new().process(src, dir.path()).regions;
        assert_eq!(found.len(), 1);
        assert_eq!(covered(src, &found[0]), "`ifdef NOPE\n`include \"defs.vh\"\n`endif");
    }

    #[test]
    fn file_including_itself_is_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let top = dir.path().join("top.sv");
        let src = "`include \"top.sv\"\n`ifdef LATE\nx\n`endif\n`define LATE\n";
        fs::write(&top, src).unwrap();

        let mut pp = Preprocessor::new();
        let analysis = pp.process_file(src, &top);
        assert_eq!(analysis.regions.len(), 1);
        assert_eq!(covered(src, &analysis.regions[0]), "`ifdef LATE\nx\n`endif");
        assert_eq!(
            analysis.diagnostics,
            vec![Diagnostic {
                kind: DiagnosticKind::IncludeCycle(top.clone()),
                file: None,
                offset: 0,
            }]
        );
        assert!(pp.is_defined("LATE"));
    }

    #[test]
    fn source_file_does_not_count_toward_include_depth() {
        let dir = tempfile::tempdir().unwrap();
        let top = dir.path().join("top.v");
        fs::write(dir.path().join("defs.vh"), "`define D\n").unwrap();
        let src = "`include \"defs.vh\"\n";
        fs::write(&top, src).unwrap();

        let config = PreprocessorConfig::new().with_max_include_depth(1);
        let mut pp = Preprocessor::with_config(config);
        let analysis = pp.process_file(src, &top);
        assert_eq!(analysis.diagnostics, vec![]);
        assert!(pp.is_defined("D"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_include_is_reported_and_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked.vh");
        fs::write(&locked, "`define LOCKED\n").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(&locked).is_ok() {
            // privileged user, permissions are not enforced
            return;
        }

        let mut pp = Preprocessor::new();
        let analysis = pp.process("`include \"locked.vh\"\n`define AFTER\n", dir.path());
        assert!(!pp.is_defined("LOCKED"));
        assert!(pp.is_defined("AFTER"));
        assert_eq!(analysis.diagnostics.len(), 1);
        let diagnostic = &analysis.diagnostics[0];
        assert_eq!(diagnostic.offset, 0);
        assert!(matches!(
            &diagnostic.kind,
            DiagnosticKind::IncludeUnreadable { path, .. } if *path == locked
        ));
    }
}
