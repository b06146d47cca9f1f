//! Include-path resolution and the directory context of nested scans.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

/// Resolve an `` `include `` target.
///
/// Tries `current_dir` first, then every search directory in order; the first
/// candidate that is an existing regular file wins.
#[must_use]
pub fn resolve_include(target: &str, current_dir: &Path, search_dirs: &[PathBuf]) -> Option<PathBuf> {
    std::iter::once(current_dir)
        .chain(search_dirs.iter().map(PathBuf::as_path))
        .map(|dir| normalize(&dir.join(target)))
        .find(|candidate| {
            let found = candidate.is_file();
            debug!("include candidate {} found={found}", candidate.display());
            found
        })
}

/// Fold `.` and `name/..` components without touching the filesystem
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Stack of directories relative includes are resolved against.
///
/// The top is the directory of the file currently being scanned.
#[derive(Clone, Debug)]
pub struct DirectoryContext {
    dirs: Vec<PathBuf>,
}

impl DirectoryContext {
    /// Start with the directory of the top-level buffer
    #[must_use]
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            dirs: vec![base.into()],
        }
    }

    /// Directory of the file currently being scanned
    #[must_use]
    pub fn current(&self) -> &Path {
        self.dirs.last().map_or(Path::new(""), PathBuf::as_path)
    }

    /// Enter an included file's directory
    pub fn push<P: Into<PathBuf>>(&mut self, dir: P) {
        self.dirs.push(dir.into());
    }

    /// Leave the innermost included file's directory; the base is never popped
    pub fn pop(&mut self) {
        if self.dirs.len() > 1 {
            self.dirs.pop();
        }
    }

    /// Number of entries, base directory included
    #[must_use]
    pub fn depth(&self) -> usize {
        self.dirs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn normalize_folds_dot_components() {
        assert_eq!(normalize(Path::new("a/./b/../c.vh")), PathBuf::from("a/c.vh"));
        assert_eq!(normalize(Path::new("../x.vh")), PathBuf::from("../x.vh"));
        assert_eq!(normalize(Path::new("/../x.vh")), PathBuf::from("/x.vh"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn current_directory_wins_over_search_dirs() {
        let local = tempfile::tempdir().unwrap();
        let shared = tempfile::tempdir().unwrap();
        fs::write(local.path().join("defs.vh"), "").unwrap();
        fs::write(shared.path().join("defs.vh"), "").unwrap();

        let found = resolve_include("defs.vh", local.path(), &[shared.path().to_path_buf()]);
        assert_eq!(found, Some(local.path().join("defs.vh")));
    }

    #[test]
    fn search_dirs_are_tried_in_order() {
        let local = tempfile::tempdir().unwrap();
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join("pkg.svh"), "").unwrap();
        fs::create_dir(first.path().join("pkg.svh")).unwrap();

        let dirs = [first.path().to_path_buf(), second.path().to_path_buf()];
        let found = resolve_include("pkg.svh", local.path(), &dirs);
        assert_eq!(found, Some(second.path().join("pkg.svh")));

        assert_eq!(resolve_include("missing.vh", local.path(), &dirs), None);
    }

    #[test]
    fn directory_context_keeps_its_base() {
        let mut ctx = DirectoryContext::new("/work");
        ctx.push("/work/inc");
        assert_eq!(ctx.current(), Path::new("/work/inc"));
        ctx.pop();
        ctx.pop();
        assert_eq!(ctx.current(), Path::new("/work"));
        assert_eq!(ctx.depth(), 1);
    }
}
