use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::bucket::paths::MyrmPaths;
use crate::bucket::settings::{AppSettings, generate};
use crate::commands::CommandReport;

#[derive(Debug, Clone, Default)]
pub struct SettingsOptions {
    /// `Some(None)` writes to the default settings location.
    pub generate: Option<Option<PathBuf>>,
    pub dry_run: bool,
}

pub fn run(
    paths: &MyrmPaths,
    settings: &AppSettings,
    opts: &SettingsOptions,
) -> Result<CommandReport> {
    let mut report = CommandReport::new("settings");

    let Some(target) = &opts.generate else {
        report.detail(
            settings
                .to_pretty_json()
                .context("failed to render settings")?,
        );
        return Ok(report);
    };

    let target = target.clone().unwrap_or_else(|| paths.settings_file.clone());
    if opts.dry_run {
        report.detail(format!("dry_run.generated={}", target.display()));
        return Ok(report);
    }

    generate(&target, settings)
        .with_context(|| format!("failed to generate settings at {}", target.display()))?;
    report.detail(format!("generated={}", target.display()));
    Ok(report)
}
