//! Scripted scanner for testing.
//!
//! This module provides a configurable mock scanner that can be used in
//! tests to simulate scan outcomes without invoking a real scan engine or
//! docker.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::{
    AlertLevel, ScanError, ScanFailure, ScanOutcome, ScanReport, Scanner, ScannerKind,
};

/// Scripted per-target behavior.
#[derive(Debug, Clone)]
enum MockResponse {
    /// Succeed with the given findings.
    Findings(Vec<Value>),
    /// Fail with the given message and captured output.
    Failure { message: String, output: String },
}

/// A mock scanner for testing purposes.
///
/// By default every target yields a clean report with no findings.
/// Individual targets can be scripted to produce findings or failures, and
/// a global latency can be added to simulate slow scans.
///
/// # Examples
///
/// ```rust
/// use scanherd::backends::MockScanner;
/// use std::time::Duration;
///
/// let scanner = MockScanner::new()
///     .with_failure("https://broken.example.com", "report was not produced")
///     .with_latency(Duration::from_millis(50));
/// ```
#[derive(Debug)]
pub struct MockScanner {
    /// The kind this instance claims to be.
    kind: ScannerKind,
    /// Scripted responses keyed by target.
    responses: RwLock<HashMap<String, MockResponse>>,
    /// Severity levels attached to successful reports.
    levels: BTreeSet<AlertLevel>,
    /// Simulated latency for scans.
    latency: Option<Duration>,
    /// Counter for scan operations.
    scan_count: AtomicU64,
}

impl MockScanner {
    /// Creates a mock scanner that reports every target as clean.
    pub fn new() -> Self {
        Self {
            kind: ScannerKind::Mock,
            responses: RwLock::new(HashMap::new()),
            levels: BTreeSet::new(),
            latency: None,
            scan_count: AtomicU64::new(0),
        }
    }

    /// Makes this instance claim a different scanner kind.
    pub fn with_kind(mut self, kind: ScannerKind) -> Self {
        self.kind = kind;
        self
    }

    /// Scripts a successful scan with the given findings for `target`.
    pub fn with_findings(self, target: impl Into<String>, findings: Vec<Value>) -> Self {
        self.responses
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(target.into(), MockResponse::Findings(findings));
        self
    }

    /// Scripts a failed scan for `target`.
    pub fn with_failure(self, target: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(
                target.into(),
                MockResponse::Failure {
                    message: message.into(),
                    output: String::new(),
                },
            );
        self
    }

    /// Sets the severity levels attached to successful reports.
    pub fn with_levels(mut self, levels: BTreeSet<AlertLevel>) -> Self {
        self.levels = levels;
        self
    }

    /// Sets the simulated latency for scans.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns the number of scans performed.
    pub fn scan_count(&self) -> u64 {
        self.scan_count.load(Ordering::Relaxed)
    }
}

impl Default for MockScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for MockScanner {
    fn kind(&self) -> ScannerKind {
        self.kind
    }

    async fn scan(&self, target: &str) -> Result<ScanOutcome, ScanError> {
        self.scan_count.fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = self
            .responses
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(target)
            .cloned();

        let outcome = match scripted {
            Some(MockResponse::Failure { message, output }) => {
                ScanOutcome::Failed(ScanFailure::new(self.kind, target, message, output))
            }
            Some(MockResponse::Findings(findings)) => ScanOutcome::Report(ScanReport::new(
                self.kind,
                target,
                json!({ "findings": findings }),
                self.levels.clone(),
                findings,
            )),
            None => ScanOutcome::Report(ScanReport::new(
                self.kind,
                target,
                json!({}),
                self.levels.clone(),
                Vec::new(),
            )),
        };
        Ok(outcome)
    }
}
