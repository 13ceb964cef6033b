use anyhow::{Context, Result};

use crate::bucket::engine::Bucket;
use crate::commands::{CommandReport, confirmation};

#[derive(Debug, Clone, Default)]
pub struct MaintainOptions {
    pub create: bool,
    pub cleanup: bool,
    pub check: bool,
    pub timeout_cleanup: bool,
    pub dry_run: bool,
    pub assume_yes: bool,
}

pub fn run(bucket: &mut Bucket, opts: &MaintainOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("bucket");
    let prefix = if opts.dry_run { "dry_run." } else { "" };

    if !(opts.create || opts.cleanup || opts.check || opts.timeout_cleanup) {
        report.detail("no action requested (use --create, --cleanup, --check or --timeout-cleanup)");
        return Ok(report);
    }

    if opts.create {
        bucket.create(opts.dry_run).context("failed to create bucket")?;
        report.detail(format!("{prefix}created={}", bucket.path().display()));
    }

    if opts.cleanup {
        if confirmation("cleanup the bucket", opts.assume_yes)? {
            bucket
                .cleanup(opts.dry_run)
                .context("failed to clean up bucket")?;
            report.detail(format!("{prefix}cleaned={}", bucket.path().display()));
        } else {
            report.detail("aborted: cleanup not confirmed");
        }
    }

    if opts.timeout_cleanup {
        let expired = bucket
            .timeout_cleanup(opts.dry_run)
            .context("failed to expire bucket items")?;
        for name in &expired {
            report.detail(format!("{prefix}expired={name}"));
        }
        report.detail(format!("{prefix}expired_count={}", expired.len()));
    }

    // Expiry bypasses the history, so reconcile after it.
    if (opts.check || opts.timeout_cleanup) && !opts.dry_run {
        let outcome = bucket.check().context("failed to check bucket")?;
        for name in &outcome.added {
            report.detail(format!("check.unknown={name}"));
        }
        report.detail(format!("check.added={}", outcome.added.len()));
        report.detail(format!("check.dropped={}", outcome.dropped.len()));
    }

    if opts.check || opts.timeout_cleanup || opts.create {
        let size = bucket.size().context("failed to compute bucket size")?;
        report.detail(format!("size_bytes={size}"));
        report.detail(format!("max_size_bytes={}", bucket.max_size()));
        report.detail(format!("entries={}", bucket.history().len()));
    }

    Ok(report)
}
