//! # Source
//!
//! Read-only client for the collaboration source of truth and the per-run
//! [`SourceSnapshot`] built from it.
//!
//! ## Example
//!
//! ```ignore
//! use coldap_source::{SourceClient, SourceConfig, SourceSnapshot};
//!
//! let config = SourceConfig::new("https://sbs.example.org", "sysread", "secret");
//! let client = SourceClient::new(&config)?;
//! let snapshot = SourceSnapshot::fetch(&client, config.source_host()?).await?;
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod snapshot;

pub use client::{SourceClient, SourceConfig};
pub use error::{SourceError, SourceResult};
pub use snapshot::{CollaborationData, SourceSnapshot};
