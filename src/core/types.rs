//! Core types used throughout the scanherd library.
//!
//! This module defines the closed set of supported scanner kinds, the alert
//! severity levels callers can filter on, and the task correlation key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::ScanError;

/// The closed set of supported scanner kinds.
///
/// Adding a scanner means adding a variant here and registering a backend
/// for it; there is no string-based dispatch anywhere in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerKind {
    /// OWASP ZAP, run as a docker container.
    Zap,
    /// Scripted scanner used in tests and examples.
    Mock,
}

impl ScannerKind {
    /// Returns the stable lowercase identifier used in logs and filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zap => "zap",
            Self::Mock => "mock",
        }
    }
}

impl fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScannerKind {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zap" => Ok(Self::Zap),
            "mock" => Ok(Self::Mock),
            other => Err(ScanError::configuration(format!(
                "unknown scanner kind '{other}'"
            ))),
        }
    }
}

/// Severity level of a reported finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Informational findings.
    Info,
    /// Low severity.
    Low,
    /// Medium severity.
    Medium,
    /// High severity.
    High,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Correlation key for a submitted job and its eventual result.
///
/// A `TaskId` is not required to be globally unique: submitting the same
/// scanner/target pair twice is legal and produces two independent results.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId {
    /// The scanner that will run the job.
    pub scanner: ScannerKind,
    /// The target identifier, typically a URL.
    pub target: String,
}

impl TaskId {
    /// Creates a new task id.
    pub fn new(scanner: ScannerKind, target: impl Into<String>) -> Self {
        Self {
            scanner,
            target: target.into(),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.scanner, self.target)
    }
}
