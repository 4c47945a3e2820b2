//! Scan result structures and report persistence.
//!
//! Every executed job ends in exactly one [`ScanOutcome`]: either a
//! [`ScanReport`] carrying the scanner's structured payload and the findings
//! that matched the requested severity levels, or a [`ScanFailure`] carrying
//! a short message and the captured process output for postmortem. Both
//! variants expose the same `write_report` contract so callers never need to
//! distinguish them for persistence, only for logging.

use std::collections::BTreeSet;
use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::Value;

use crate::core::error::ScanError;
use crate::core::types::{AlertLevel, ScannerKind, TaskId};

/// Characters that must not appear in a report filename.
const UNWANTED_SYMBOLS: &[char] = &[':', '/', '\\', '*', '?', '+'];

/// Longest sanitized target identifier kept verbatim in a filename.
const MAX_SANITIZED_LEN: usize = 200;

/// A successful scan with its structured payload and filtered findings.
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Scanner that produced the report.
    pub scanner: ScannerKind,
    /// Target that was scanned.
    pub target: String,
    /// The full scanner-specific payload, kept for reference.
    pub raw: Value,
    /// Severity levels the caller asked for. Empty means all levels.
    pub levels: BTreeSet<AlertLevel>,
    /// Findings matching the requested levels.
    pub findings: Vec<Value>,
}

impl ScanReport {
    /// Creates a new report.
    pub fn new(
        scanner: ScannerKind,
        target: impl Into<String>,
        raw: Value,
        levels: BTreeSet<AlertLevel>,
        findings: Vec<Value>,
    ) -> Self {
        Self {
            scanner,
            target: target.into(),
            raw,
            levels,
            findings,
        }
    }

    /// Returns the number of findings that matched the requested levels.
    pub fn finding_count(&self) -> usize {
        self.findings.len()
    }

    /// Writes the matched findings to `folder` as pretty-printed JSON.
    ///
    /// Returns `Ok(None)` without touching the filesystem when there are no
    /// findings, so clean scans do not clutter the report directory.
    pub fn write_report(&self, folder: &Path) -> Result<Option<PathBuf>, ScanError> {
        if self.findings.is_empty() {
            return Ok(None);
        }
        let file = folder.join(make_report_filename(self.scanner.as_str(), &self.target));
        std::fs::write(&file, serde_json::to_string_pretty(&self.findings)?)?;
        Ok(Some(file))
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}, levels {:?}, {} alert(s)",
            self.scanner,
            self.target,
            self.levels,
            self.findings.len()
        )
    }
}

/// A failed scan with its diagnostic payload.
#[derive(Debug, Clone)]
pub struct ScanFailure {
    /// Scanner that attempted the job.
    pub scanner: ScannerKind,
    /// Target that was being scanned.
    pub target: String,
    /// Short human-readable description of what went wrong.
    pub message: String,
    /// Captured process output for postmortem analysis.
    pub output: String,
}

impl ScanFailure {
    /// Creates a new failure record.
    pub fn new(
        scanner: ScannerKind,
        target: impl Into<String>,
        message: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            scanner,
            target: target.into(),
            message: message.into(),
            output: output.into(),
        }
    }

    /// Writes the captured process output to `folder`.
    ///
    /// Unlike a clean [`ScanReport`], a failure always produces a file.
    pub fn write_report(&self, folder: &Path) -> Result<Option<PathBuf>, ScanError> {
        let prefix = format!("{}-error", self.scanner);
        let file = folder.join(make_report_filename(&prefix, &self.target));
        std::fs::write(&file, &self.output)?;
        Ok(Some(file))
    }
}

impl fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.scanner, self.target, self.message)
    }
}

/// The classified outcome of one scan job.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// The scan completed and produced a report artifact.
    Report(ScanReport),
    /// The scan failed in an expected way (timeout, crash, missing or
    /// unparsable artifact).
    Failed(ScanFailure),
}

impl ScanOutcome {
    /// Returns the scanner that ran the job.
    pub fn scanner(&self) -> ScannerKind {
        match self {
            Self::Report(report) => report.scanner,
            Self::Failed(failure) => failure.scanner,
        }
    }

    /// Returns the target the job ran against.
    pub fn target(&self) -> &str {
        match self {
            Self::Report(report) => &report.target,
            Self::Failed(failure) => &failure.target,
        }
    }

    /// Returns `true` if the scan completed successfully.
    pub fn is_report(&self) -> bool {
        matches!(self, Self::Report(_))
    }

    /// Returns `true` if the scan failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Writes the report artifact for this outcome, whatever its variant.
    ///
    /// Returns the written path, or `None` when nothing needed writing.
    pub fn write_report(&self, folder: &Path) -> Result<Option<PathBuf>, ScanError> {
        match self {
            Self::Report(report) => report.write_report(folder),
            Self::Failed(failure) => failure.write_report(folder),
        }
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Report(report) => report.fmt(f),
            Self::Failed(failure) => failure.fmt(f),
        }
    }
}

/// The unit placed on the result queue: a task id, its outcome, and when
/// the job ran.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Correlation key of the job that produced this result.
    pub id: TaskId,
    /// The classified outcome.
    pub outcome: ScanOutcome,
    /// When the scan started.
    pub started_at: DateTime<Utc>,
    /// When the scan completed.
    pub completed_at: DateTime<Utc>,
    /// How long the scan took.
    pub duration: Duration,
}

impl TaskResult {
    /// Creates a result stamped with the current time.
    pub fn new(id: TaskId, outcome: ScanOutcome, duration: Duration) -> Self {
        let now = Utc::now();
        Self {
            id,
            outcome,
            started_at: now - chrono::Duration::from_std(duration).unwrap_or_default(),
            completed_at: now,
            duration,
        }
    }
}

/// Builds a deterministic, filesystem-safe report filename.
///
/// The target's URL scheme and trailing slash are dropped, characters that
/// are awkward in filenames are replaced with underscores, and names longer
/// than 200 characters are truncated with a randomized five-digit suffix to
/// avoid collisions between long targets sharing a prefix.
pub fn make_report_filename(prefix: &str, url: &str) -> String {
    let trimmed = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
        .trim_end_matches('/');
    let mut sanitized: String = trimmed
        .chars()
        .map(|c| if UNWANTED_SYMBOLS.contains(&c) { '_' } else { c })
        .collect();
    if sanitized.chars().count() > MAX_SANITIZED_LEN {
        sanitized = sanitized.chars().take(MAX_SANITIZED_LEN).collect();
        let suffix: u32 = rand::thread_rng().gen_range(1..99999);
        let _ = write!(sanitized, "_{suffix:05}");
    }
    format!("{prefix}-{sanitized}.json")
}
