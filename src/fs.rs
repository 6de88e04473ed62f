//! Static file indexes.
//!
//! A [`StaticFileIndex`] maps virtual request paths onto files. The dispatcher
//! consults the indexes of a static group for `GET` requests only, before or
//! after other groups depending on registration order.
//!
//! [`StaticDir`] builds an index by scanning a directory:
//!
//! ```rust,no_run
//! use httpdispatch::fs::{StaticDir, StaticOptions};
//! use std::sync::Arc;
//!
//! let options = StaticOptions {
//!     forbid_directories: true,
//!     exclude: vec!["*.map".into()],
//!     ..StaticOptions::default()
//! };
//! let public = Arc::new(StaticDir::open("public", options)?);
//!
//! // keep a handle around to pick up new files later
//! public.rescan()?;
//! # Ok::<_, httpdispatch::StaticError>(())
//! ```

use crate::error::StaticError;

use arc_swap::ArcSwap;
use glob::Pattern;
use std::collections::hash_map::{Entry, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use walkdir::{DirEntry, WalkDir};

/// What a virtual path resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticEntry {
    /// Serve this file.
    File(PathBuf),
    /// Respond with `403 Forbidden`.
    Forbidden,
}

/// A mapping from virtual request paths to static entries.
pub trait StaticFileIndex: Send + Sync {
    /// Resolves a virtual path such as `/css/site.css`. `None` means the index
    /// does not know the path.
    fn get(&self, path: &str) -> Option<StaticEntry>;

    /// Every virtual path known to the index.
    fn paths(&self) -> Vec<String>;

    /// How long clients may cache served files.
    fn max_age(&self) -> Option<Duration> {
        None
    }
}

impl StaticFileIndex for HashMap<String, StaticEntry> {
    fn get(&self, path: &str) -> Option<StaticEntry> {
        HashMap::get(self, path).cloned()
    }

    fn paths(&self) -> Vec<String> {
        let mut paths = self.keys().cloned().collect::<Vec<_>>();
        paths.sort();
        paths
    }
}

impl<T: StaticFileIndex + ?Sized> StaticFileIndex for Arc<T> {
    fn get(&self, path: &str) -> Option<StaticEntry> {
        (**self).get(path)
    }

    fn paths(&self) -> Vec<String> {
        (**self).paths()
    }

    fn max_age(&self) -> Option<Duration> {
        (**self).max_age()
    }
}

/// Options for [`StaticDir`].
#[derive(Debug, Clone, Default)]
pub struct StaticOptions {
    /// Map every directory, with and without a trailing slash, to
    /// [`StaticEntry::Forbidden`] instead of leaving it unknown.
    pub forbid_directories: bool,
    /// Glob patterns for files to leave out. A pattern without a `/` is
    /// matched against the file name, any other pattern against the virtual
    /// path.
    pub exclude: Vec<String>,
    /// Skip files and directories whose name starts with a dot.
    pub exclude_dot_files: bool,
    /// Sent as `Cache-Control: public, max-age=..` with every file.
    pub max_age: Option<Duration>,
}

/// A [`StaticFileIndex`] built by scanning a directory tree.
///
/// The index is a snapshot. Files added or removed after [`open`] are picked
/// up by [`rescan`], which swaps the new snapshot in atomically; requests in
/// flight keep the snapshot they started with.
///
/// [`open`]: StaticDir::open
/// [`rescan`]: StaticDir::rescan
pub struct StaticDir {
    root: PathBuf,
    options: StaticOptions,
    exclude: Vec<Pattern>,
    entries: ArcSwap<HashMap<String, StaticEntry>>,
}

impl StaticDir {
    /// Scans `root` and builds the initial snapshot.
    pub fn open(root: impl Into<PathBuf>, options: StaticOptions) -> Result<Self, StaticError> {
        let root = root.into();

        let exclude = options
            .exclude
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|source| StaticError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let entries = scan(&root, &options, &exclude)?;
        info!(root = %root.display(), entries = entries.len(), "scanned static directory");

        Ok(Self {
            root,
            options,
            exclude,
            entries: ArcSwap::from_pointee(entries),
        })
    }

    /// Rebuilds the snapshot from the current directory contents.
    pub fn rescan(&self) -> Result<(), StaticError> {
        let entries = scan(&self.root, &self.options, &self.exclude)?;
        info!(root = %self.root.display(), entries = entries.len(), "rescanned static directory");

        self.entries.store(Arc::new(entries));
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl StaticFileIndex for StaticDir {
    fn get(&self, path: &str) -> Option<StaticEntry> {
        HashMap::get(&**self.entries.load(), path).cloned()
    }

    fn paths(&self) -> Vec<String> {
        let mut paths = self.entries.load().keys().cloned().collect::<Vec<_>>();
        paths.sort();
        paths
    }

    fn max_age(&self) -> Option<Duration> {
        self.options.max_age
    }
}

impl std::fmt::Debug for StaticDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticDir")
            .field("root", &self.root)
            .field("options", &self.options)
            .field("entries", &self.entries.load().len())
            .finish()
    }
}

fn scan(
    root: &Path,
    options: &StaticOptions,
    exclude: &[Pattern],
) -> io::Result<HashMap<String, StaticEntry>> {
    let mut entries = HashMap::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !(options.exclude_dot_files && is_dot_file(entry))
        });

    for entry in walker {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }

        let virtual_path = virtual_path(root, entry.path());

        if entry.file_type().is_dir() {
            if options.forbid_directories {
                let slashed = format!("{}/", virtual_path);
                insert(&mut entries, slashed, StaticEntry::Forbidden);
                insert(&mut entries, virtual_path, StaticEntry::Forbidden);
            }
            continue;
        }

        if is_excluded(exclude, &entry, &virtual_path) {
            continue;
        }

        let file = StaticEntry::File(entry.into_path());
        insert(&mut entries, virtual_path, file);
    }

    Ok(entries)
}

// The first mapping for a virtual path wins.
fn insert(entries: &mut HashMap<String, StaticEntry>, path: String, entry: StaticEntry) {
    if let Entry::Vacant(vacant) = entries.entry(path) {
        vacant.insert(entry);
    }
}

fn virtual_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);

    relative.components().fold(String::new(), |mut virtual_path, component| {
        virtual_path.push('/');
        virtual_path.push_str(&component.as_os_str().to_string_lossy());
        virtual_path
    })
}

fn is_dot_file(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn is_excluded(exclude: &[Pattern], entry: &DirEntry, virtual_path: &str) -> bool {
    let name = entry.file_name().to_string_lossy();

    exclude.iter().any(|pattern| {
        if pattern.as_str().contains('/') {
            pattern.matches(virtual_path) || pattern.matches(virtual_path.trim_start_matches('/'))
        } else {
            pattern.matches(&name)
        }
    })
}
