use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use std::io;
use std::path::{Path, PathBuf};

use crate::bucket::engine::{Bucket, RemoveOutcome};
use crate::commands::{CommandReport, confirmation};
use crate::error::BucketError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

#[derive(Debug, Clone, Default)]
pub struct RmOptions {
    pub files: Vec<PathBuf>,
    /// Shell glob applied under each of `files`.
    pub pattern: Option<String>,
    pub force: bool,
    pub dry_run: bool,
    pub assume_yes: bool,
}

fn compile(pattern: &str) -> Result<Pattern, BucketError> {
    Pattern::new(pattern).map_err(|source| BucketError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Paths under `dir` matching `pattern`, sorted. The pattern may span
/// several components (`sub/*.txt`); `dir` itself is matched literally.
fn expand(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, BucketError> {
    let Some(base) = dir.to_str() else {
        return Err(BucketError::io(
            "expand",
            dir,
            io::Error::new(io::ErrorKind::InvalidInput, "path is not valid UTF-8"),
        ));
    };
    let full = Path::new(&Pattern::escape(base)).join(pattern);
    let paths = glob::glob_with(&full.to_string_lossy(), MATCH_OPTIONS).map_err(|source| {
        BucketError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        }
    })?;

    let mut out = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| {
            let path = err.path().to_path_buf();
            BucketError::io("expand", path, err.into_error())
        })?;
        out.push(path);
    }
    out.sort();
    Ok(out)
}

fn targets(opts: &RmOptions) -> Result<Vec<PathBuf>> {
    let Some(pattern) = opts.pattern.as_deref() else {
        return Ok(opts.files.clone());
    };
    compile(pattern)?;

    let mut out = Vec::new();
    for dir in &opts.files {
        out.extend(expand(dir, pattern)?);
    }
    Ok(out)
}

pub fn run(bucket: &mut Bucket, opts: &RmOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("rm");

    if opts.force && !confirmation("delete items permanently", opts.assume_yes)? {
        report.detail("aborted: permanent delete not confirmed");
        return Ok(report);
    }

    let targets = targets(opts)?;
    if targets.is_empty() {
        report.detail("nothing matched");
        return Ok(report);
    }

    let prefix = if opts.dry_run { "dry_run." } else { "" };
    for path in targets {
        let outcome = match bucket
            .remove(&path, opts.force, opts.dry_run)
            .with_context(|| format!("failed to remove {}", path.display()))
        {
            Ok(outcome) => outcome,
            Err(err) => {
                report.fail(&err);
                continue;
            }
        };
        match outcome {
            RemoveOutcome::Deleted { path } => {
                report.detail(format!("{prefix}deleted={}", path.display()));
            }
            RemoveOutcome::Stored { path, name, index } => {
                report.detail(format!(
                    "{prefix}stored={} index={index} name={name}",
                    path.display()
                ));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn options(dir: &Path, pattern: &str) -> RmOptions {
        RmOptions {
            files: vec![dir.to_path_buf()],
            pattern: Some(pattern.to_string()),
            ..RmOptions::default()
        }
    }

    #[test]
    fn invalid_pattern_is_reported() {
        assert!(matches!(
            compile("["),
            Err(BucketError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn glob_expands_to_matching_children() {
        let tmp = tempdir().expect("tempdir");
        fs::write(tmp.path().join("a.log"), "a").expect("write a");
        fs::write(tmp.path().join("b.log"), "b").expect("write b");
        fs::write(tmp.path().join("c.txt"), "c").expect("write c");
        fs::write(tmp.path().join(".hidden.log"), "h").expect("write hidden");

        let got = targets(&options(tmp.path(), "*.log")).expect("targets");
        assert_eq!(
            got,
            vec![tmp.path().join("a.log"), tmp.path().join("b.log")]
        );
    }

    #[test]
    fn glob_may_descend_into_subdirectories() {
        let tmp = tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("sub")).expect("mkdir");
        fs::write(tmp.path().join("sub/x.txt"), "x").expect("write x");
        fs::write(tmp.path().join("top.txt"), "t").expect("write top");

        let got = targets(&options(tmp.path(), "sub/*.txt")).expect("targets");
        assert_eq!(got, vec![tmp.path().join("sub/x.txt")]);
    }

    #[test]
    fn directory_name_is_not_a_pattern() {
        let tmp = tempdir().expect("tempdir");
        let dir = tmp.path().join("[logs]");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("app.log"), "a").expect("write");

        let got = targets(&options(&dir, "*.log")).expect("targets");
        assert_eq!(got, vec![dir.join("app.log")]);
    }
}
