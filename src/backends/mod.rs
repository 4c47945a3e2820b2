//! Scanner backend implementations.
//!
//! This module provides concrete [`Scanner`](crate::core::Scanner)
//! implementations:
//!
//! - [`zap`]: OWASP ZAP running inside a resource-capped docker container
//! - [`mock`]: scriptable in-memory scanner for testing
//!
//! # Example
//!
//! ```rust,ignore
//! use scanherd::backends::{ZapConfig, ZapScanner};
//!
//! let scanner = ZapScanner::new(ZapConfig::default());
//! ```

pub mod mock;
pub(crate) mod process;
pub mod zap;

pub use mock::MockScanner;
pub use zap::{ZapConfig, ZapScanType, ZapScanner, DEFAULT_ZAP_IMAGE};
