//! Ducklift Ingest Library
//!
//! Ingests tabular files (CSV, spreadsheets) from a remote file-storage
//! service into named tables of an embedded DuckDB database, driven by a
//! declarative YAML settings document.
//!
//! # Pipeline
//!
//! For every configured job entry the orchestrator discovers files
//! (folder listing plus optional glob filtering), fetches each file's
//! bytes, decodes them into a [`ducklift_common::StructuredTable`],
//! concatenates per-folder results, and loads the outcome into the target
//! table with create-or-replace semantics.
//!
//! # Example
//!
//! ```no_run
//! use ducklift_ingest::config::Settings;
//! use ducklift_ingest::pipeline::run_ingest;
//! use ducklift_ingest::remote::drive::DriveClient;
//! use ducklift_ingest::sink::DuckDbSink;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_file("settings.yml")?;
//!     let store = DriveClient::from_env()?;
//!     let sink = DuckDbSink::open("analytics.duckdb")?;
//!     let report = run_ingest(&store, &sink, &settings).await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod decode;
pub mod pipeline;
pub mod remote;
pub mod sink;
pub mod source;
