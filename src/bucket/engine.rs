//! The bucket: a quota-bounded directory that removed items are moved into,
//! indexed by the history ledger.

use crate::bucket::fsops;
use crate::bucket::history::{Entry, History, Status, UNKNOWN_ORIGIN};
use crate::bucket::report::{EventStatus, Reporter};
use crate::bucket::settings::AppSettings;
use crate::bucket::util::{absolute, local_timestamp};
use crate::error::BucketError;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use filetime::FileTime;
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

type Result<T> = std::result::Result<T, BucketError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Deleted permanently, bypassing the bucket.
    Deleted { path: PathBuf },
    /// Moved into the bucket under `name`.
    Stored {
        path: PathBuf,
        name: String,
        index: u64,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Items found on disk without a history entry.
    pub added: Vec<String>,
    /// History entries whose item is gone from disk.
    pub dropped: Vec<String>,
}

#[derive(Debug)]
pub struct Bucket {
    path: PathBuf,
    max_size: u64,
    storetime: Duration,
    history: History,
    reporter: Reporter,
}

/// Size in bytes of a file, link, or whole directory tree.
///
/// Links are not followed; directories themselves count as zero.
pub fn compute_size(path: &Path) -> Result<u64> {
    let meta = fs::symlink_metadata(path).map_err(|err| BucketError::io("inspect", path, err))?;
    if !meta.is_dir() {
        return Ok(meta.len());
    }

    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(|err| BucketError::walk("walk", path, err))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let meta = entry
            .metadata()
            .map_err(|err| BucketError::walk("inspect", entry.path(), err))?;
        total = total.saturating_add(meta.len());
    }
    Ok(total)
}

fn remove_any(path: &Path, dry_run: bool) -> Result<()> {
    let meta = fs::symlink_metadata(path).map_err(|err| BucketError::io("inspect", path, err))?;
    if meta.is_dir() {
        fsops::remove_tree(path, dry_run)
    } else {
        fsops::remove(path, dry_run)
    }
}

/// Restart the retention clock of a freshly stored item. Links are stamped
/// themselves, never their targets.
fn stamp_ingest_time(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path).map_err(|err| BucketError::io("inspect", path, err))?;
    let atime = FileTime::from_last_access_time(&meta);
    filetime::set_symlink_file_times(path, atime, FileTime::now())
        .map_err(|err| BucketError::io("stamp", path, err))
}

fn move_any(src: &Path, dst: &Path, dry_run: bool) -> Result<()> {
    let meta = fs::symlink_metadata(src).map_err(|err| BucketError::io("inspect", src, err))?;
    if meta.is_dir() {
        fsops::move_tree(src, dst, dry_run)
    } else {
        fsops::move_item(src, dst, dry_run)
    }
}

impl Bucket {
    pub fn new(settings: &AppSettings, reporter: Reporter) -> Result<Self> {
        let history = History::open(&settings.bucket_history_path, reporter.clone())?;
        Ok(Self {
            path: settings.bucket_path.clone(),
            max_size: settings.bucket_size,
            storetime: Duration::from_secs(settings.bucket_timeout_cleanup),
            history,
            reporter,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// `true` when removing `origin` would take the bucket or its history
    /// store with it, or would move something out of the bucket.
    fn overlaps_bucket(&self, origin: &Path) -> bool {
        let bucket = absolute(&self.path).unwrap_or_else(|_| self.path.clone());
        let history = absolute(self.history.path())
            .unwrap_or_else(|_| self.history.path().to_path_buf());
        bucket.starts_with(origin) || origin.starts_with(&bucket) || history.starts_with(origin)
    }

    /// Make sure the bucket directory exists. Safe to call repeatedly.
    pub fn startup(&self) -> Result<()> {
        fsops::make_dir(&self.path, false)
    }

    pub fn create(&self, dry_run: bool) -> Result<()> {
        fsops::make_dir(&self.path, dry_run)?;
        self.reporter.dry_run_or_done(
            "create",
            dry_run,
            &format!("bucket {} ready", self.path.display()),
        );
        Ok(())
    }

    pub fn size(&self) -> Result<u64> {
        compute_size(&self.path)
    }

    /// Wipe the bucket directory and the history.
    pub fn cleanup(&mut self, dry_run: bool) -> Result<()> {
        fsops::remove_tree(&self.path, dry_run)?;
        fsops::make_dir(&self.path, dry_run)?;
        if !dry_run {
            self.history.clear()?;
        }
        self.reporter.dry_run_or_done(
            "cleanup",
            dry_run,
            &format!("bucket {} emptied", self.path.display()),
        );
        Ok(())
    }

    /// Move `path` into the bucket, or delete it outright when `force` is set.
    ///
    /// The quota is checked first in both cases. Paths that contain or sit
    /// inside the bucket, or that contain the history store, are refused.
    pub fn remove(&mut self, path: &Path, force: bool, dry_run: bool) -> Result<RemoveOutcome> {
        let origin = absolute(path).map_err(|err| BucketError::io("resolve", path, err))?;
        if self.overlaps_bucket(&origin) {
            return Err(BucketError::InsideBucket(origin));
        }

        let required = compute_size(&origin)?.saturating_add(self.size()?);
        if required >= self.max_size {
            return Err(BucketError::BucketFull {
                required,
                max_size: self.max_size,
            });
        }

        if force {
            remove_any(&origin, dry_run)?;
            self.reporter.dry_run_or_done(
                "force-remove",
                dry_run,
                &format!("{} deleted permanently", origin.display()),
            );
            return Ok(RemoveOutcome::Deleted { path: origin });
        }

        let name = uuid::Uuid::new_v4().to_string();
        let index = self.history.next_index();
        let stored = self.path.join(&name);
        move_any(&origin, &stored, dry_run)?;

        if !dry_run {
            // Expiry reads the mtime, which a rename keeps.
            if let Err(err) = stamp_ingest_time(&stored) {
                tracing::warn!(error = %err, "stored item keeps its original modification time");
            }
            let basename = origin
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| origin.display().to_string());
            self.history.set(
                name.clone(),
                Entry {
                    status: Status::Correct,
                    index,
                    name: name.clone(),
                    basename,
                    origin: origin.display().to_string(),
                    date: local_timestamp(),
                },
            )?;
        }
        self.reporter.dry_run_or_done(
            "ingest",
            dry_run,
            &format!("{} moved to bucket as {name} (index {index})", origin.display()),
        );

        Ok(RemoveOutcome::Stored {
            path: origin,
            name,
            index,
        })
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let read_dir =
            fs::read_dir(&self.path).map_err(|err| BucketError::io("list", &self.path, err))?;
        for entry in read_dir {
            let entry = entry.map_err(|err| BucketError::io("list", &self.path, err))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Reconcile the history with what is actually in the bucket directory.
    pub fn check(&mut self) -> Result<CheckOutcome> {
        let on_disk: BTreeSet<String> = self.list()?.into_iter().collect();
        let mut out = CheckOutcome::default();

        for name in &on_disk {
            if self.history.contains(name) {
                continue;
            }
            let index = self.history.next_index();
            self.history.set(
                name.clone(),
                Entry {
                    status: Status::Unknown,
                    index,
                    name: name.clone(),
                    basename: name.clone(),
                    origin: UNKNOWN_ORIGIN.to_string(),
                    date: local_timestamp(),
                },
            )?;
            self.reporter.event(
                "check",
                EventStatus::Skipped,
                &format!("untracked item {name} recorded with unknown origin"),
            );
            out.added.push(name.clone());
        }

        let stale: Vec<String> = self
            .history
            .keys()
            .filter(|key| !on_disk.contains(*key))
            .map(ToOwned::to_owned)
            .collect();
        for key in stale {
            self.history.delete(&key)?;
            out.dropped.push(key);
        }

        Ok(out)
    }

    /// Permanently delete items older than the retention period.
    ///
    /// The history is left alone; run [`Bucket::check`] afterwards.
    pub fn timeout_cleanup(&self, dry_run: bool) -> Result<Vec<String>> {
        let now = SystemTime::now();
        let mut expired = Vec::new();

        for name in self.list()? {
            let item = self.path.join(&name);
            let modified = fs::symlink_metadata(&item)
                .and_then(|meta| meta.modified())
                .map_err(|err| BucketError::io("read modification time of", &item, err))?;
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= self.storetime {
                continue;
            }

            remove_any(&item, dry_run)?;
            self.reporter.dry_run_or_done(
                "expire",
                dry_run,
                &format!("{name} expired after {}s", age.as_secs()),
            );
            expired.push(name);
        }

        Ok(expired)
    }

    /// Move the item recorded under `index` back to where it came from.
    pub fn restore(&mut self, index: u64, dry_run: bool) -> Result<PathBuf> {
        let Some((key, entry)) = self.history.find_by_index(index) else {
            return Err(BucketError::IndexNotFound(index));
        };
        if entry.status == Status::Unknown || entry.origin == UNKNOWN_ORIGIN {
            return Err(BucketError::OriginUnknown(entry.basename.clone()));
        }
        let origin = PathBuf::from(&entry.origin);
        if fs::symlink_metadata(&origin).is_ok() {
            return Err(BucketError::OriginExists(origin));
        }
        let stored = self.path.join(key);

        if let Some(parent) = origin.parent() {
            fsops::make_dir(parent, dry_run)?;
        }
        move_any(&stored, &origin, dry_run)?;
        self.reporter.dry_run_or_done(
            "restore",
            dry_run,
            &format!("index {index} restored to {}", origin.display()),
        );

        if !dry_run {
            self.check()?;
        }
        Ok(origin)
    }
}
