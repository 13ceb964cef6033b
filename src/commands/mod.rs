pub mod maintain;
pub mod restore;
pub mod rm;
pub mod settings;
pub mod show;

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{self, BufRead, Write};

use crate::error::{self, IssuesReported};

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
    #[serde(skip)]
    exit_code: Option<i32>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
            exit_code: None,
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    /// Record a failed target; the first failure decides the exit status.
    pub fn fail(&mut self, err: &anyhow::Error) {
        self.exit_code.get_or_insert_with(|| error::exit_code(err));
        self.issue(format!("{err:#}"));
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.details {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    pub fn render_issues(&self) -> String {
        let mut out = String::new();
        for line in &self.issues {
            out.push_str("issue: ");
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// `Ok` when no issue was recorded.
    pub fn into_result(self) -> Result<(), IssuesReported> {
        if self.ok {
            return Ok(());
        }
        Err(IssuesReported {
            count: self.issues.len(),
            code: self.exit_code.unwrap_or(error::EPERM),
            command: self.command,
        })
    }
}

/// Ask a yes/no question on stderr and read the answer from `input`.
pub fn confirm_with(question: &str, input: &mut impl BufRead) -> Result<bool> {
    eprint!("{question} (yes/no): ");
    io::stderr().flush().ok();

    let mut answer = String::new();
    let read = input
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    if read == 0 {
        return Ok(false);
    }
    Ok(matches!(answer.trim().to_lowercase().as_str(), "yes" | "y"))
}

/// `true` when `assume_yes` is set or the user answers yes on stdin.
pub fn confirmation(question: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    confirm_with(question, &mut io::stdin().lock())
}
