//! Dry-run decorator
//!
//! Passes reads through to the wrapped directory and logs writes instead of
//! issuing them.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::attributes::AttributeSet;
use crate::diff::{describe, Modification};
use crate::directory::{Directory, DirectoryEntry};
use crate::error::DirectoryResult;
use crate::filter::Filter;

/// Directory wrapper that never writes.
pub struct DryRunDirectory<D> {
    inner: D,
    skipped: AtomicUsize,
}

impl<D: Directory> DryRunDirectory<D> {
    /// Wrap a directory.
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            skipped: AtomicUsize::new(0),
        }
    }

    /// Number of writes that were skipped.
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    /// The wrapped directory.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    fn skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl<D: Directory> Directory for DryRunDirectory<D> {
    async fn search_one_level(
        &self,
        base: &str,
        filter: &Filter,
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.inner.search_one_level(base, filter).await
    }

    async fn read(&self, dn: &str) -> DirectoryResult<Option<AttributeSet>> {
        self.inner.read(dn).await
    }

    async fn add(&self, dn: &str, attributes: &AttributeSet) -> DirectoryResult<()> {
        info!(dn = %dn, attributes = %attributes, "[dry-run] would add entry");
        self.skip();
        Ok(())
    }

    async fn modify(&self, dn: &str, changes: &[Modification]) -> DirectoryResult<()> {
        info!(dn = %dn, changes = %describe(changes), "[dry-run] would modify entry");
        self.skip();
        Ok(())
    }

    async fn delete(&self, dn: &str) -> DirectoryResult<()> {
        info!(dn = %dn, "[dry-run] would delete entry");
        self.skip();
        Ok(())
    }

    async fn unbind(&self) -> DirectoryResult<()> {
        self.inner.unbind().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDirectory;

    const BASE: &str = "dc=example,dc=org";

    #[tokio::test]
    async fn test_writes_are_skipped() {
        let memory = InMemoryDirectory::new(BASE);
        let dry = DryRunDirectory::new(memory.clone());

        let attrs = AttributeSet::new()
            .with("objectClass", "organization")
            .with("o", "Physics");
        dry.add("o=Physics,dc=example,dc=org", &attrs).await.unwrap();
        dry.delete(BASE).await.unwrap();

        assert_eq!(dry.skipped(), 2);
        assert_eq!(memory.write_count().await, 0);
        assert!(!memory.contains("o=Physics,dc=example,dc=org").await);
    }

    #[tokio::test]
    async fn test_reads_pass_through() {
        let memory = InMemoryDirectory::new(BASE);
        memory
            .seed(
                "o=Physics,dc=example,dc=org",
                AttributeSet::new()
                    .with("objectClass", "organization")
                    .with("o", "Physics"),
            )
            .await;
        let dry = DryRunDirectory::new(memory);

        let found = dry
            .search_one_level(BASE, &Filter::object_class("organization"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(dry.read("o=Physics,dc=example,dc=org").await.unwrap().is_some());
    }
}
