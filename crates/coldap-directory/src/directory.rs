//! Directory store abstraction
//!
//! The sync only needs one-level searches, base reads and single-entry writes.
//! Deletes are never recursive at this level; subtree removal is done by the
//! caller, leaf first.

use async_trait::async_trait;

use crate::attributes::AttributeSet;
use crate::diff::Modification;
use crate::error::DirectoryResult;
use crate::filter::Filter;

/// An entry returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Address of the entry.
    pub dn: String,
    /// Stored attributes.
    pub attributes: AttributeSet,
}

impl DirectoryEntry {
    /// Create a new entry.
    pub fn new(dn: impl Into<String>, attributes: AttributeSet) -> Self {
        Self {
            dn: dn.into(),
            attributes,
        }
    }
}

/// Operations the sync performs against the directory store.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Search the direct children of `base` matching `filter`.
    ///
    /// A missing `base` yields an empty result, not an error.
    async fn search_one_level(
        &self,
        base: &str,
        filter: &Filter,
    ) -> DirectoryResult<Vec<DirectoryEntry>>;

    /// Read a single entry, `None` when it does not exist.
    async fn read(&self, dn: &str) -> DirectoryResult<Option<AttributeSet>>;

    /// Create an entry. The parent must exist.
    async fn add(&self, dn: &str, attributes: &AttributeSet) -> DirectoryResult<()>;

    /// Apply a modification list to an existing entry.
    async fn modify(&self, dn: &str, changes: &[Modification]) -> DirectoryResult<()>;

    /// Delete a leaf entry.
    async fn delete(&self, dn: &str) -> DirectoryResult<()>;

    /// Release the connection.
    async fn unbind(&self) -> DirectoryResult<()>;
}
