//! # logload - nginx access logs to CSV and ClickHouse
//!
//! This library provides functionality to:
//! - Parse access logs using nginx-style format templates
//! - Extract log formats from nginx configuration files
//! - Normalize records into typed rows (date split, integer coercion)
//! - Write rows to CSV or bulk-load them into ClickHouse, all-or-nothing
//!
//! ## Quick Start
//!
//! ```rust
//! use logload::{AccessLogRow, Reader, COMBINED_FORMAT};
//! use std::io::Cursor;
//!
//! let log_data = r#"192.168.1.1 - - [05/Jan/2024:08:00:00 +0000] "GET /a HTTP/1.1" 404 512 "-" "curl/7.68.0""#;
//!
//! let reader = Reader::new(Cursor::new(log_data), COMBINED_FORMAT)?;
//!
//! for entry in reader {
//!     let row = AccessLogRow::from_entry(&entry?)?;
//!     assert_eq!(row.status, 404);
//!     assert_eq!(row.to_record()[0], "2024-01-05");
//! }
//! # Ok::<(), logload::Error>(())
//! ```
//!
//! Whole runs go through [`pipeline::import`], which feeds a [`RowSink`]
//! and commits it only if every line succeeded (or, with
//! [`ErrorPolicy::Skip`], after dropping the bad ones).

pub mod clean;
pub mod cli;
pub mod clickhouse;
pub mod config;
pub mod entry;
pub mod error;
pub mod nginx;
pub mod parser;
pub mod pipeline;
pub mod reader;
pub mod row;
pub mod sink;

// Re-export main types for convenience
pub use entry::{Entry, Fields};
pub use error::{Error, Mismatch, Result};
pub use parser::{Parser, StringParser};
pub use pipeline::{import, ErrorPolicy, ImportStats};
pub use reader::Reader;
pub use row::{AccessLogRow, COLUMNS, COMBINED_FORMAT};
pub use sink::{CsvFileSink, CsvSink, RowSink};
