//! Shared building blocks for Ducklift
//!
//! This crate holds the pieces used across the workspace:
//!
//! - [`error`]: the `IngestError` taxonomy and `Result` alias
//! - [`logging`]: tracing subscriber configuration and initialization
//! - [`table`]: the in-memory tabular representation passed between the
//!   decoders and the analytical-store sink

pub mod error;
pub mod logging;
pub mod table;

pub use error::{IngestError, Result};
pub use table::{ColumnPolicy, StructuredTable};
