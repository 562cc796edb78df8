//! The janitor's classification-and-move engine.
//!
//! Given a scan root and a [`CategoryTable`], the engine lists the root's
//! direct children once, classifies every regular file by extension and moves
//! it into `root/<category>/`. Subdirectories are never entered or moved.
//! Category folders are created the first time a file needs them.
//!
//! The pass is not transactional: every file move stands on its own, so an
//! interrupted pass can simply be run again.

use crate::category::CategoryTable;
use crate::config::CompiledFilters;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound on `name (N).ext` candidates tried by [`CollisionPolicy::Rename`].
const MAX_RENAME_ATTEMPTS: u32 = 10_000;

/// Errors that abort an organize pass before any file is touched.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The scan root does not exist or is not a directory.
    #[error("Invalid path {}: {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: String },
    /// The scan root could not be listed.
    #[error("Error reading directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for organize passes.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// What to do when `root/<category>/<name>` already exists.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Leave the file in place and report it as failed.
    #[default]
    Fail,
    /// Leave the file in place and report it as skipped.
    Skip,
    /// Move the file under the first free `name (N).ext`.
    Rename,
}

/// A file that was moved, or would be moved in a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovedFile {
    pub file_name: String,
    pub category: String,
    pub destination: PathBuf,
}

/// Why a file was left in place without being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No category lists the file's extension.
    Unmatched,
    /// Excluded by the configured filters.
    Filtered,
    /// Destination name taken under [`CollisionPolicy::Skip`].
    Collision,
    /// The file disappeared between listing and moving.
    Vanished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Destination name taken under [`CollisionPolicy::Fail`].
    Collision,
    /// The category folder could not be created.
    CreateDir,
    /// The move itself failed (permissions, cross-device, ...).
    Move,
}

/// A file that could not be organized. The batch continues past it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedMove {
    pub file_name: String,
    pub category: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of one organize pass.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizeReport {
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    /// True if the pass stopped early on request.
    pub cancelled: bool,
    pub moved: Vec<MovedFile>,
    pub skipped: Vec<SkippedFile>,
    pub failed: Vec<FailedMove>,
}

impl OrganizeReport {
    fn new(root: &Path, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            root: root.to_path_buf(),
            started_at: now,
            finished_at: now,
            dry_run,
            cancelled: false,
            moved: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Number of files relocated (or planned, in a dry run).
    pub fn moved_count(&self) -> usize {
        self.moved.len()
    }

    /// True if no file failed. Skips do not count as failures.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Moved files per category, sorted by category name.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for moved in &self.moved {
            *counts.entry(moved.category.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Skipped files with the given reason.
    pub fn skipped_with(&self, reason: SkipReason) -> impl Iterator<Item = &SkippedFile> {
        self.skipped.iter().filter(move |s| s.reason == reason)
    }

    fn skip(&mut self, file_name: &str, reason: SkipReason) {
        debug!(file = file_name, ?reason, "skipping file");
        self.skipped.push(SkippedFile {
            file_name: file_name.to_string(),
            reason,
        });
    }

    fn fail(&mut self, file_name: &str, category: &str, kind: FailureKind, message: String) {
        warn!(file = file_name, category, ?kind, "{}", message);
        self.failed.push(FailedMove {
            file_name: file_name.to_string(),
            category: category.to_string(),
            kind,
            message,
        });
    }
}

/// A regular file found directly under the scan root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScannedFile {
    /// The name exactly as the filesystem reports it.
    pub name: OsString,
    pub path: PathBuf,
}

impl ScannedFile {
    /// The name as text, with invalid UTF-8 replaced. For reports only.
    pub fn display_name(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }
}

/// Callback invoked once per file entry processed.
pub type ProgressCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Configurable organize pass.
///
/// # Examples
///
/// ```no_run
/// use nexus_toolkit::category::CategoryTable;
/// use nexus_toolkit::organizer::{CollisionPolicy, Organizer};
/// use std::path::Path;
///
/// let report = Organizer::new(CategoryTable::default())
///     .collision_policy(CollisionPolicy::Rename)
///     .organize(Path::new("/home/user/Downloads"))?;
/// println!("Cleaned {} files!", report.moved_count());
/// # Ok::<(), nexus_toolkit::organizer::OrganizeError>(())
/// ```
pub struct Organizer {
    table: CategoryTable,
    filters: CompiledFilters,
    collision_policy: CollisionPolicy,
    dry_run: bool,
    cancel_flag: Option<Arc<AtomicBool>>,
    on_progress: Option<ProgressCallback>,
}

impl Organizer {
    pub fn new(table: CategoryTable) -> Self {
        Self {
            table,
            filters: CompiledFilters::allow_all(),
            collision_policy: CollisionPolicy::default(),
            dry_run: false,
            cancel_flag: None,
            on_progress: None,
        }
    }

    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Plan only: no folder is created and no file is moved.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Stop before the next file once `flag` is set.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Lists the regular files directly under `root`, sorted by name.
    ///
    /// This is the snapshot an organize pass works from; it also lets callers
    /// size a progress bar before the pass starts.
    pub fn scan(&self, root: &Path) -> OrganizeResult<Vec<ScannedFile>> {
        validate_root(root)?;

        let entries = fs::read_dir(root).map_err(|source| OrganizeError::ReadDir {
            path: root.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %root.display(), "unreadable directory entry: {}", e);
                    continue;
                }
            };
            match entry.file_type() {
                Ok(file_type) if file_type.is_file() => files.push(ScannedFile {
                    name: entry.file_name(),
                    path: entry.path(),
                }),
                Ok(_) => {}
                Err(e) => warn!(
                    path = %entry.path().display(),
                    "cannot determine file type: {}",
                    e
                ),
            }
        }
        files.sort();
        Ok(files)
    }

    /// Classifies and relocates the files directly under `root`.
    ///
    /// # Errors
    ///
    /// Fails only if `root` is not an existing directory or cannot be listed;
    /// nothing is touched in that case. Per-file problems are recorded in the
    /// returned report and the pass carries on.
    pub fn organize(&self, root: &Path) -> OrganizeResult<OrganizeReport> {
        let files = self.scan(root)?;
        Ok(self.organize_files(root, &files))
    }

    /// Runs a pass over a snapshot previously taken with [`Organizer::scan`].
    pub fn organize_files(&self, root: &Path, files: &[ScannedFile]) -> OrganizeReport {
        info!(
            root = %root.display(),
            files = files.len(),
            dry_run = self.dry_run,
            "organizing directory"
        );

        let mut report = OrganizeReport::new(root, self.dry_run);
        let mut pass = Pass::default();

        for file in files {
            if self.is_cancelled() {
                info!("organize pass cancelled");
                report.cancelled = true;
                break;
            }

            let file_name = file.display_name();
            self.process_file(root, file, &file_name, &mut pass, &mut report);

            if let Some(callback) = &self.on_progress {
                callback(&file_name);
            }
        }

        report.finished_at = Utc::now();
        info!(
            moved = report.moved.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "organize pass complete"
        );
        report
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn process_file(
        &self,
        root: &Path,
        file: &ScannedFile,
        file_name: &str,
        pass: &mut Pass,
        report: &mut OrganizeReport,
    ) {
        let path = file.path.as_path();
        if !self.filters.should_include(Path::new(&file.name)) {
            report.skip(file_name, SkipReason::Filtered);
            return;
        }

        let Some(category) = self.table.classify_file_name(&file.name) else {
            report.skip(file_name, SkipReason::Unmatched);
            return;
        };
        let category_name = category.name();

        if let Err(e) = fs::symlink_metadata(path) {
            if e.kind() == io::ErrorKind::NotFound {
                report.skip(file_name, SkipReason::Vanished);
            } else {
                report.fail(file_name, category_name, FailureKind::Move, e.to_string());
            }
            return;
        }

        let category_dir = root.join(category_name);
        let direct = category_dir.join(&file.name);
        let destination = if !pass.is_taken(&direct) {
            direct
        } else {
            match self.collision_policy {
                CollisionPolicy::Fail => {
                    report.fail(
                        file_name,
                        category_name,
                        FailureKind::Collision,
                        format!("{} already exists", direct.display()),
                    );
                    return;
                }
                CollisionPolicy::Skip => {
                    report.skip(file_name, SkipReason::Collision);
                    return;
                }
                CollisionPolicy::Rename => match pass.free_name(&category_dir, &file.name) {
                    Some(renamed) => renamed,
                    None => {
                        report.fail(
                            file_name,
                            category_name,
                            FailureKind::Collision,
                            format!("no free name found for {}", direct.display()),
                        );
                        return;
                    }
                },
            }
        };

        if !self.dry_run {
            if !pass.ready_dirs.contains(category_name) {
                if let Err(e) = ensure_dir(&category_dir) {
                    report.fail(
                        file_name,
                        category_name,
                        FailureKind::CreateDir,
                        format!("Failed to create directory {}: {}", category_dir.display(), e),
                    );
                    return;
                }
                pass.ready_dirs.insert(category_name.to_string());
            }

            if let Err(e) = fs::rename(path, &destination) {
                if e.kind() == io::ErrorKind::NotFound && !path.exists() {
                    report.skip(file_name, SkipReason::Vanished);
                } else {
                    report.fail(
                        file_name,
                        category_name,
                        FailureKind::Move,
                        format!(
                            "Failed to move {} to {}: {}",
                            path.display(),
                            destination.display(),
                            e
                        ),
                    );
                }
                return;
            }
        }

        debug!(
            file = file_name,
            category = category_name,
            destination = %destination.display(),
            "moved file"
        );
        pass.claimed.insert(destination.clone());
        report.moved.push(MovedFile {
            file_name: file_name.to_string(),
            category: category_name.to_string(),
            destination,
        });
    }
}

/// Classifies and relocates the files directly under `root` with default
/// options: no filters, [`CollisionPolicy::Fail`].
pub fn organize(root: &Path, table: &CategoryTable) -> OrganizeResult<OrganizeReport> {
    Organizer::new(table.clone()).organize(root)
}

/// Bookkeeping for a single pass.
#[derive(Default)]
struct Pass {
    /// Category folders known to exist.
    ready_dirs: HashSet<String>,
    /// Destinations assigned during this pass. Keeps dry runs consistent with
    /// real runs when renames are involved.
    claimed: HashSet<PathBuf>,
}

impl Pass {
    fn is_taken(&self, path: &Path) -> bool {
        self.claimed.contains(path) || fs::symlink_metadata(path).is_ok()
    }

    fn free_name(&self, dir: &Path, file_name: &OsStr) -> Option<PathBuf> {
        let original = Path::new(file_name);
        let stem = original.file_stem().unwrap_or(file_name);
        let ext = original.extension();

        (1..=MAX_RENAME_ATTEMPTS)
            .map(|n| {
                let mut candidate = OsString::from(stem);
                candidate.push(format!(" ({})", n));
                if let Some(ext) = ext {
                    candidate.push(".");
                    candidate.push(ext);
                }
                dir.join(candidate)
            })
            .find(|candidate| !self.is_taken(candidate))
    }
}

fn validate_root(root: &Path) -> OrganizeResult<()> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(OrganizeError::InvalidPath {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        }),
        Err(e) => Err(OrganizeError::InvalidPath {
            path: root.to_path_buf(),
            reason: if e.kind() == io::ErrorKind::NotFound {
                "does not exist".to_string()
            } else {
                e.to_string()
            },
        }),
    }
}

/// Creates `dir` unless it already exists as a directory.
fn ensure_dir(dir: &Path) -> io::Result<()> {
    match fs::create_dir(dir) {
        Ok(()) => {
            debug!(dir = %dir.display(), "created category folder");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}
