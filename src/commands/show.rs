use anyhow::{Context, Result};

use crate::bucket::engine::Bucket;
use crate::commands::CommandReport;

#[derive(Debug, Clone)]
pub struct ShowOptions {
    pub limit: usize,
    pub page: usize,
}

impl Default for ShowOptions {
    fn default() -> Self {
        Self { limit: 10, page: 1 }
    }
}

pub fn run(bucket: &Bucket, opts: &ShowOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("show");
    let table = bucket
        .history()
        .show(opts.limit, opts.page)
        .context("failed to show history")?;
    report.detail(table);
    Ok(report)
}
