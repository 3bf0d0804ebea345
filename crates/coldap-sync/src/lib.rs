//! # Sync
//!
//! Reconciles a [`SourceSnapshot`](coldap_source::SourceSnapshot) into the
//! directory. A run converges every organization, person and group membership,
//! deletes what the source no longer vouches for and publishes one
//! notification per changed collaboration.
//!
//! ## Example
//!
//! ```ignore
//! use coldap_sync::{Orchestrator, SyncOptions};
//!
//! let options = SyncOptions::new("dc=example,dc=org", "sbs.example.org");
//! let report = Orchestrator::new(&directory, &publisher, options)
//!     .run(&snapshot)
//!     .await?;
//! ```

pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod reconciler;
pub mod report;
pub mod writer;

pub use error::{SyncError, SyncResult};
pub use orchestrator::{Orchestrator, SyncOptions, DEFAULT_TOPIC};
pub use reconciler::{CleanupSummary, Reconciler};
pub use report::{EntryKind, KindCounts, RunReport};
pub use writer::{DirectoryWriter, Outcome};
