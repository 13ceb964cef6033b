//! Filesystem primitives used by the bucket engine.
//!
//! Every operation takes a `dry_run` flag. A dry run validates what it can
//! (trees are still walked, so a missing source still fails) and logs the
//! action it would take, but never touches the filesystem.

use crate::error::BucketError;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use walkdir::WalkDir;

type Result<T> = std::result::Result<T, BucketError>;

/// Remove a single file or symbolic link.
pub fn remove(path: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        tracing::info!(path = %path.display(), "dry run: would remove item");
        return Ok(());
    }

    fs::remove_file(path).map_err(|err| BucketError::io("remove", path, err))?;
    tracing::info!(path = %path.display(), "item removed");
    Ok(())
}

/// Remove a directory tree bottom-up: files and links first, then each
/// emptied directory, the root last.
pub fn remove_tree(path: &Path, dry_run: bool) -> Result<()> {
    let entries = walk(path, true)?;

    for entry in entries {
        let target = entry.path();
        if entry.file_type().is_dir() {
            if dry_run {
                tracing::info!(path = %target.display(), "dry run: would remove directory");
                continue;
            }
            fs::remove_dir(target).map_err(|err| BucketError::io("remove directory", target, err))?;
            tracing::debug!(path = %target.display(), "directory removed");
        } else {
            remove(target, dry_run)?;
        }
    }

    if !dry_run {
        tracing::info!(path = %path.display(), "directory tree removed");
    }
    Ok(())
}

/// Create `path` and any missing ancestors. An existing directory is fine.
pub fn make_dir(path: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        tracing::info!(path = %path.display(), "dry run: would create directory");
        return Ok(());
    }
    if path.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|err| BucketError::io("create directory", path, err))?;
    tracing::info!(path = %path.display(), "directory created");
    Ok(())
}

/// Move a single file or link. Falls back to copy and remove when the rename
/// crosses filesystems.
pub fn move_item(src: &Path, dst: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        tracing::info!(
            from = %src.display(),
            to = %dst.display(),
            "dry run: would move item"
        );
        return Ok(());
    }

    match fs::rename(src, dst) {
        Ok(()) => {}
        Err(rename_err) if rename_err.kind() == ErrorKind::CrossesDevices => {
            let meta =
                fs::symlink_metadata(src).map_err(|err| BucketError::io("inspect", src, err))?;
            if !meta.is_file() {
                return Err(BucketError::io("move", src, rename_err));
            }
            fs::copy(src, dst).map_err(|err| BucketError::io("copy", src, err))?;
            fs::remove_file(src).map_err(|err| BucketError::io("remove", src, err))?;
        }
        Err(rename_err) => return Err(BucketError::io("move", src, rename_err)),
    }

    tracing::info!(from = %src.display(), to = %dst.display(), "item moved");
    Ok(())
}

/// Recreate the structure of `src` under `dst`, move every file across, then
/// remove the emptied `src` tree.
pub fn move_tree(src: &Path, dst: &Path, dry_run: bool) -> Result<()> {
    let entries = walk(src, false)?;
    if dry_run {
        tracing::info!(
            from = %src.display(),
            to = %dst.display(),
            items = entries.len(),
            "dry run: would move directory tree"
        );
        return Ok(());
    }

    make_dir(dst, false)?;
    for entry in entries.iter().filter(|e| e.depth() > 0) {
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|err| BucketError::io("resolve", entry.path(), std::io::Error::other(err)))?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            make_dir(&target, false)?;
        } else {
            move_item(entry.path(), &target, false)?;
        }
    }

    remove_tree(src, false)?;
    tracing::info!(from = %src.display(), to = %dst.display(), "directory tree moved");
    Ok(())
}

fn walk(root: &Path, contents_first: bool) -> Result<Vec<walkdir::DirEntry>> {
    WalkDir::new(root)
        .follow_links(false)
        .contents_first(contents_first)
        .into_iter()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| BucketError::walk("walk", root, err))
}
