use anyhow::{Context, Result};

use crate::bucket::engine::Bucket;
use crate::commands::CommandReport;

#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    pub indices: Vec<u64>,
    pub dry_run: bool,
}

pub fn run(bucket: &mut Bucket, opts: &RestoreOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("restore");

    for &index in &opts.indices {
        let origin = match bucket
            .restore(index, opts.dry_run)
            .with_context(|| format!("failed to restore index {index}"))
        {
            Ok(origin) => origin,
            Err(err) => {
                report.fail(&err);
                continue;
            }
        };
        let prefix = if opts.dry_run { "dry_run." } else { "" };
        report.detail(format!("{prefix}restored={} index={index}", origin.display()));
    }

    Ok(report)
}
