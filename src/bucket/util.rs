use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const SECONDS_IN_DAY: u64 = 24 * 60 * 60;
pub const BYTES_IN_MEGABYTE: u64 = 1024 * 1024;

/// Format used for the `date` column of history entries.
pub const TIME_FORMAT: &str = "%Y-%m-%d %I:%M:%S %p";

/// Return the current Unix epoch in seconds.
///
/// A clock set before the epoch reads as zero.
pub fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn local_timestamp() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Absolute, lexically normalized form of `path` (no symlink resolution).
pub fn absolute(path: &Path) -> io::Result<PathBuf> {
    let abs = std::path::absolute(path)?;
    let mut out = PathBuf::new();
    for component in abs.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_collapses_parent_components() {
        let got = absolute(Path::new("/tmp/a/../b/./c")).expect("absolute");
        assert_eq!(got, PathBuf::from("/tmp/b/c"));
    }

    #[test]
    fn expand_tilde_leaves_plain_paths_alone() {
        assert_eq!(expand_tilde("/var/data"), PathBuf::from("/var/data"));
        assert_eq!(expand_tilde("rel/~x"), PathBuf::from("rel/~x"));
    }

    #[test]
    fn timestamp_uses_twelve_hour_clock() {
        let stamp = local_timestamp();
        assert!(stamp.ends_with("AM") || stamp.ends_with("PM"));
    }
}
