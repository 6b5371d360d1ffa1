//! cxlens-core
//!
//! Shared domain types, errors, configuration and the tabular I/O around the
//! theme engine: CSV tables, complaint cleaning and report writing.

pub mod config;
pub mod data_processor;
pub mod dates;
pub mod error;
pub mod report;
pub mod table;
pub mod traits;
pub mod types;
