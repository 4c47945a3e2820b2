//! Core types and traits for the scanherd library.
//!
//! - [`types`] - Scanner kinds, alert levels, and task ids
//! - [`traits`] - The `Scanner` backend seam
//! - [`error`] - Structured error types
//! - [`result`] - Scan outcomes and report persistence

pub mod error;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types at the core level
pub use error::ScanError;
pub use result::{make_report_filename, ScanFailure, ScanOutcome, ScanReport, TaskResult};
pub use traits::{ArcScanner, Scanner};
pub use types::{AlertLevel, ScannerKind, TaskId};
