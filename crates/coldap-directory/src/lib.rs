//! # Directory
//!
//! Directory store access for coldap: canonical attribute sets, the diff
//! engine that decides between create, modify and no-op, deterministic
//! addresses, and the [`Directory`] trait with its implementations.
//!
//! ## Implementations
//!
//! - [`LdapDirectory`] - a bound connection to an LDAP server
//! - [`InMemoryDirectory`] - a strict in-process store with an operation log
//! - [`DryRunDirectory`] - wraps another directory and skips all writes
//!
//! ## Example
//!
//! ```ignore
//! use coldap_directory::{decide, AttributeMapper, Decision, Directory, LdapConfig, LdapDirectory};
//!
//! let directory = LdapDirectory::connect(LdapConfig::new(
//!     "ldap://localhost:389",
//!     "cn=admin,dc=example,dc=org",
//!     "secret",
//! ))
//! .await?;
//!
//! let proposed = AttributeMapper::new().map(vec![("o", "Physics")]);
//! let current = directory.read("o=Physics,dc=example,dc=org").await?;
//! match decide(&proposed, current.as_ref()) {
//!     Decision::Create => { /* add */ }
//!     Decision::Modify(changes) => { /* modify */ }
//!     Decision::NoOp => {}
//! }
//! ```

pub mod attributes;
pub mod diff;
pub mod directory;
pub mod dn;
pub mod dry_run;
pub mod error;
pub mod filter;
pub mod ldap;
pub mod memory;

// Re-exports
pub use attributes::{AttributeInput, AttributeMapper, AttributeSet, OBJECT_CLASS, SENTINEL};
pub use diff::{decide, modification_list, AttributeDiff, Decision, Modification};
pub use directory::{Directory, DirectoryEntry};
pub use dn::OrgAddress;
pub use dry_run::DryRunDirectory;
pub use error::{DirectoryError, DirectoryResult, WriteOperation};
pub use filter::Filter;
pub use ldap::{LdapConfig, LdapDirectory};
pub use memory::InMemoryDirectory;
