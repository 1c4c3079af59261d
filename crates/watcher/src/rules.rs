//! Ignore and filter rules applied while listing
//!
//! A candidate path passes three checks in order:
//! 1. Explicitly ignored paths (a directory excludes its whole subtree)
//! 2. Hidden files, when hidden files are ignored
//! 3. Filter hooks, in registration order (the first Skip wins)

use crate::error::WatchError;
use anyhow::Result;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use pollwatch_core::FileRecord;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of a filter hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No objection; later hooks still run
    Include,
    /// Leave the path (and a directory's subtree) out of the snapshot
    Skip,
}

/// Predicate consulted for every listed path
///
/// Returning an error aborts the snapshot being built; the error is reported
/// on the watcher's error channel and the previous snapshot is kept.
pub trait FilterHook: Send + Sync {
    fn check(&self, path: &Path, record: &FileRecord) -> Result<Verdict>;
}

impl<F> FilterHook for F
where
    F: Fn(&Path, &FileRecord) -> Result<Verdict> + Send + Sync,
{
    fn check(&self, path: &Path, record: &FileRecord) -> Result<Verdict> {
        self(path, record)
    }
}

/// Keeps only paths whose name (or full path) matches a regular expression
#[derive(Debug, Clone)]
pub struct RegexFilterHook {
    regex: Regex,
    match_full_path: bool,
    exempt_dirs: bool,
}

impl RegexFilterHook {
    /// Match against file names; directories are not exempt
    pub fn new(regex: Regex) -> Self {
        Self {
            regex,
            match_full_path: false,
            exempt_dirs: false,
        }
    }

    /// Match against the full path instead of the file name
    pub fn match_full_path(mut self, enabled: bool) -> Self {
        self.match_full_path = enabled;
        self
    }

    /// Let directories through regardless of the pattern so their
    /// contents are still listed
    pub fn exempt_dirs(mut self, enabled: bool) -> Self {
        self.exempt_dirs = enabled;
        self
    }
}

impl FilterHook for RegexFilterHook {
    fn check(&self, path: &Path, record: &FileRecord) -> Result<Verdict> {
        if self.exempt_dirs && record.is_dir {
            return Ok(Verdict::Include);
        }

        let matched = if self.match_full_path {
            self.regex.is_match(&path.to_string_lossy())
        } else {
            self.regex.is_match(&record.name)
        };

        Ok(if matched { Verdict::Include } else { Verdict::Skip })
    }
}

/// Skips paths matched by gitignore-format patterns
pub struct GitignoreHook {
    root: PathBuf,
    matcher: Gitignore,
}

impl GitignoreHook {
    /// Load patterns from a file; patterns are anchored at `root`
    pub fn from_file(root: &Path, file: &Path) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        if let Some(err) = builder.add(file) {
            return Err(err.into());
        }
        Ok(Self {
            root: root.to_path_buf(),
            matcher: builder.build()?,
        })
    }

    /// Build from in-memory patterns
    pub fn from_patterns(root: &Path, patterns: &[&str]) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in patterns {
            builder.add_line(None, pattern)?;
        }
        Ok(Self {
            root: root.to_path_buf(),
            matcher: builder.build()?,
        })
    }

    /// Number of patterns loaded
    pub fn len(&self) -> usize {
        self.matcher.num_ignores() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FilterHook for GitignoreHook {
    fn check(&self, path: &Path, record: &FileRecord) -> Result<Verdict> {
        if !path.starts_with(&self.root) {
            return Ok(Verdict::Include);
        }
        if self.matcher.matched(path, record.is_dir).is_ignore() {
            Ok(Verdict::Skip)
        } else {
            Ok(Verdict::Include)
        }
    }
}

/// Ignore set, hidden-file toggle and hook chain
#[derive(Clone, Default)]
pub struct IgnoreRules {
    /// Explicitly ignored absolute paths
    ignored: BTreeSet<PathBuf>,

    /// Exclude dot-files
    ignore_hidden: bool,

    /// Filter hooks in registration order
    hooks: Vec<Arc<dyn FilterHook>>,
}

impl IgnoreRules {
    pub fn new(ignore_hidden: bool) -> Self {
        Self {
            ignore_hidden,
            ..Self::default()
        }
    }

    /// Add an absolute path to the ignore set
    pub fn ignore(&mut self, path: PathBuf) {
        self.ignored.insert(path);
    }

    /// Returns whether the setting changed
    pub fn set_ignore_hidden(&mut self, enabled: bool) -> bool {
        std::mem::replace(&mut self.ignore_hidden, enabled) != enabled
    }

    /// Append a hook to the chain
    pub fn add_hook(&mut self, hook: Arc<dyn FilterHook>) {
        self.hooks.push(hook);
    }

    /// Explicitly ignored paths, in order
    pub fn ignored(&self) -> impl Iterator<Item = &Path> {
        self.ignored.iter().map(PathBuf::as_path)
    }

    /// Check whether a path is in (or under) the ignore set, or hidden
    pub fn is_excluded(&self, path: &Path) -> bool {
        if path.ancestors().any(|p| self.ignored.contains(p)) {
            return true;
        }
        self.ignore_hidden && is_hidden(path)
    }

    /// Run the hook chain for a listed path
    pub fn check_hooks(&self, path: &Path, record: &FileRecord) -> Result<Verdict, WatchError> {
        for hook in &self.hooks {
            match hook.check(path, record) {
                Ok(Verdict::Include) => continue,
                Ok(Verdict::Skip) => return Ok(Verdict::Skip),
                Err(source) => {
                    return Err(WatchError::Filter {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            }
        }
        Ok(Verdict::Include)
    }

    /// Full admission check for a listed path
    pub fn admit(&self, path: &Path, record: &FileRecord) -> Result<Verdict, WatchError> {
        if self.is_excluded(path) {
            return Ok(Verdict::Skip);
        }
        self.check_hooks(path, record)
    }
}

impl fmt::Debug for IgnoreRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreRules")
            .field("ignored", &self.ignored)
            .field("ignore_hidden", &self.ignore_hidden)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Whether the final component of `path` is hidden
///
/// Dot-files everywhere; on Windows also the hidden attribute.
pub fn is_hidden(path: &Path) -> bool {
    let dotted = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n != "." && n != "..");
    dotted || has_hidden_attribute(path)
}

#[cfg(windows)]
fn has_hidden_attribute(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    std::fs::symlink_metadata(path)
        .map(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn has_hidden_attribute(_path: &Path) -> bool {
    false
}
