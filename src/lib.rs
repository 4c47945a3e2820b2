//! # Scanherd
//!
//! A bounded-concurrency orchestration engine for long-running web security
//! scans, with an OWASP ZAP backend that runs inside resource-capped docker
//! containers.
//!
//! ## Overview
//!
//! Scanherd fans a set of scan jobs out over a fixed pool of workers,
//! allowing you to:
//!
//! - Submit scan jobs through a consistent API
//! - Bound concurrency with a fixed worker pool
//! - Enforce per-job wall-clock limits with interrupt-then-kill escalation
//! - Collect results in completion order and detect when the run is done
//! - Write per-target JSON reports with sanitized filenames
//! - Load targets from bug bounty program exports
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scanherd::backends::{ZapConfig, ZapScanner};
//! use scanherd::{Orchestrator, ScannerKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut orchestrator = Orchestrator::builder()
//!         .add_scanner(ZapScanner::new(ZapConfig::default()))
//!         .start()?;
//!
//!     orchestrator.submit(ScannerKind::Zap, "https://example.com")?;
//!
//!     while let Some(result) = orchestrator.next_result().await {
//!         println!("{}", result.outcome);
//!     }
//!
//!     orchestrator.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several layers:
//!
//! - **Core**: Fundamental types, traits, and error handling
//! - **Backends**: Individual scanner implementations
//! - **Orchestrator**: Worker pool, task/result queues, termination detection
//! - **Targets**: Loading scan targets from program exports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod backends;
pub mod core;
pub mod orchestrator;
pub mod targets;

// Re-export commonly used types at the crate root
pub use crate::core::{
    make_report_filename, AlertLevel, ArcScanner, ScanError, ScanFailure, ScanOutcome, ScanReport,
    Scanner, ScannerKind, TaskId, TaskResult,
};

pub use crate::orchestrator::{Orchestrator, OrchestratorBuilder};
pub use crate::targets::{load_targets, Target, TargetType};

/// Prelude module for convenient imports.
///
/// ```rust
/// use scanherd::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        make_report_filename, AlertLevel, ArcScanner, ScanError, ScanFailure, ScanOutcome,
        ScanReport, Scanner, ScannerKind, TaskId, TaskResult,
    };
    pub use crate::orchestrator::{Orchestrator, OrchestratorBuilder};
    pub use crate::targets::{load_targets, Target, TargetType};
}
