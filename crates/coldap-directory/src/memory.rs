//! In-memory directory
//!
//! Behaves like a strict LDAP server for the operations the sync uses: adds
//! need an existing parent, deletes refuse entries that still have children,
//! and modifies follow LDAP add/replace/delete semantics. Every accepted write
//! is appended to an operation log.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::attributes::{AttributeSet, OBJECT_CLASS};
use crate::diff::{describe, Modification};
use crate::directory::{Directory, DirectoryEntry};
use crate::dn::{normalize_dn, parent_dn};
use crate::error::{DirectoryError, DirectoryResult, WriteOperation};
use crate::filter::Filter;

#[derive(Debug, Clone)]
struct StoredEntry {
    dn: String,
    parent: Option<String>,
    attributes: AttributeSet,
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, StoredEntry>,
    operations: Vec<(WriteOperation, String)>,
    rejected: Vec<String>,
}

/// In-memory directory store.
#[derive(Debug, Clone)]
pub struct InMemoryDirectory {
    base_dn: String,
    state: Arc<RwLock<State>>,
}

impl InMemoryDirectory {
    /// Create a directory holding only the base entry.
    pub fn new(base_dn: impl Into<String>) -> Self {
        let base_dn = base_dn.into();
        let mut state = State::default();
        state.entries.insert(
            normalize_dn(&base_dn),
            StoredEntry {
                dn: base_dn.clone(),
                parent: None,
                attributes: AttributeSet::new()
                    .with(OBJECT_CLASS, "top")
                    .with(OBJECT_CLASS, "domain"),
            },
        );
        Self {
            base_dn,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// The base entry address.
    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    /// Insert an entry directly, without the parent check and without logging.
    pub async fn seed(&self, dn: &str, attributes: AttributeSet) {
        let mut state = self.state.write().await;
        state.entries.insert(
            normalize_dn(dn),
            StoredEntry {
                dn: dn.to_string(),
                parent: parent_dn(dn).map(normalize_dn),
                attributes,
            },
        );
    }

    /// Make every later write to `dn` fail as a server rejection would.
    pub async fn reject_writes_to(&self, dn: &str) {
        self.state.write().await.rejected.push(normalize_dn(dn));
    }

    /// Stored attributes of an entry.
    pub async fn entry(&self, dn: &str) -> Option<AttributeSet> {
        let state = self.state.read().await;
        state
            .entries
            .get(&normalize_dn(dn))
            .map(|entry| entry.attributes.clone())
    }

    /// Whether an entry exists.
    pub async fn contains(&self, dn: &str) -> bool {
        self.state
            .read()
            .await
            .entries
            .contains_key(&normalize_dn(dn))
    }

    /// Addresses of the direct children of `dn`.
    pub async fn children(&self, dn: &str) -> Vec<String> {
        let key = normalize_dn(dn);
        let state = self.state.read().await;
        state
            .entries
            .values()
            .filter(|entry| entry.parent.as_deref() == Some(key.as_str()))
            .map(|entry| entry.dn.clone())
            .collect()
    }

    /// Number of entries, the base included.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether only the base entry is left.
    pub async fn is_empty(&self) -> bool {
        self.len().await <= 1
    }

    /// Accepted writes, in order.
    pub async fn operations(&self) -> Vec<(WriteOperation, String)> {
        self.state.read().await.operations.clone()
    }

    /// Number of accepted writes.
    pub async fn write_count(&self) -> usize {
        self.state.read().await.operations.len()
    }

    /// Forget the recorded writes.
    pub async fn clear_operations(&self) {
        self.state.write().await.operations.clear();
    }
}

fn reject(
    operation: WriteOperation,
    dn: &str,
    payload: String,
    message: impl Into<String>,
) -> DirectoryError {
    DirectoryError::write_rejected(operation, dn, payload, message)
}

fn apply(
    attributes: &mut AttributeSet,
    dn: &str,
    changes: &[Modification],
) -> DirectoryResult<()> {
    let payload = || describe(changes);
    for change in changes {
        match change {
            Modification::Add {
                attribute,
                values,
            } => {
                if let Some(value) = values
                    .iter()
                    .find(|v| attributes.contains_value(attribute, v))
                {
                    return Err(reject(
                        WriteOperation::Modify,
                        dn,
                        payload(),
                        format!("attributeOrValueExists: {}={}", attribute, value),
                    ));
                }
                for value in values {
                    attributes.append(attribute, value.clone());
                }
            }
            Modification::Replace {
                attribute,
                values,
            } => attributes.set(attribute, values.iter().cloned()),
            Modification::Delete { attribute } => {
                if attributes.remove(attribute).is_none() {
                    return Err(reject(
                        WriteOperation::Modify,
                        dn,
                        payload(),
                        format!("noSuchAttribute: {}", attribute),
                    ));
                }
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn search_one_level(
        &self,
        base: &str,
        filter: &Filter,
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let key = normalize_dn(base);
        let state = self.state.read().await;
        if !state.entries.contains_key(&key) {
            return Ok(Vec::new());
        }
        Ok(state
            .entries
            .values()
            .filter(|entry| entry.parent.as_deref() == Some(key.as_str()))
            .filter(|entry| filter.matches(&entry.attributes))
            .map(|entry| DirectoryEntry::new(entry.dn.clone(), entry.attributes.clone()))
            .collect())
    }

    async fn read(&self, dn: &str) -> DirectoryResult<Option<AttributeSet>> {
        Ok(self.entry(dn).await)
    }

    async fn add(&self, dn: &str, attributes: &AttributeSet) -> DirectoryResult<()> {
        let key = normalize_dn(dn);
        let mut state = self.state.write().await;
        let payload = || attributes.to_string();

        if state.rejected.contains(&key) {
            return Err(reject(WriteOperation::Add, dn, payload(), "unwillingToPerform"));
        }
        if state.entries.contains_key(&key) {
            return Err(reject(WriteOperation::Add, dn, payload(), "entryAlreadyExists"));
        }
        let parent = parent_dn(dn).map(normalize_dn);
        match &parent {
            Some(p) if state.entries.contains_key(p) => {}
            _ => return Err(reject(WriteOperation::Add, dn, payload(), "noSuchObject: parent")),
        }
        if attributes.is_empty() {
            return Err(reject(WriteOperation::Add, dn, payload(), "objectClassViolation"));
        }

        state.entries.insert(
            key,
            StoredEntry {
                dn: dn.to_string(),
                parent,
                attributes: attributes.clone(),
            },
        );
        state.operations.push((WriteOperation::Add, dn.to_string()));
        Ok(())
    }

    async fn modify(&self, dn: &str, changes: &[Modification]) -> DirectoryResult<()> {
        let key = normalize_dn(dn);
        let mut state = self.state.write().await;

        if state.rejected.contains(&key) {
            return Err(reject(
                WriteOperation::Modify,
                dn,
                describe(changes),
                "unwillingToPerform",
            ));
        }
        let Some(entry) = state.entries.get(&key) else {
            return Err(reject(
                WriteOperation::Modify,
                dn,
                describe(changes),
                "noSuchObject",
            ));
        };

        // Apply to a copy so a failing change leaves the entry untouched.
        let mut updated = entry.attributes.clone();
        apply(&mut updated, dn, changes)?;

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.attributes = updated;
        }
        state.operations.push((WriteOperation::Modify, dn.to_string()));
        Ok(())
    }

    async fn delete(&self, dn: &str) -> DirectoryResult<()> {
        let key = normalize_dn(dn);
        let mut state = self.state.write().await;

        if state.rejected.contains(&key) {
            return Err(reject(WriteOperation::Delete, dn, String::new(), "unwillingToPerform"));
        }
        if !state.entries.contains_key(&key) {
            return Err(reject(WriteOperation::Delete, dn, String::new(), "noSuchObject"));
        }
        if state
            .entries
            .values()
            .any(|entry| entry.parent.as_deref() == Some(key.as_str()))
        {
            return Err(reject(
                WriteOperation::Delete,
                dn,
                String::new(),
                "notAllowedOnNonLeaf",
            ));
        }

        state.entries.remove(&key);
        state.operations.push((WriteOperation::Delete, dn.to_string()));
        Ok(())
    }

    async fn unbind(&self) -> DirectoryResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "dc=example,dc=org";

    fn org(name: &str) -> AttributeSet {
        AttributeSet::new()
            .with("objectClass", "top")
            .with("objectClass", "organization")
            .with("o", name)
    }

    #[tokio::test]
    async fn test_add_and_search_one_level() {
        let dir = InMemoryDirectory::new(BASE);
        dir.add("o=Physics,dc=example,dc=org", &org("Physics"))
            .await
            .unwrap();
        dir.add(
            "ou=People,o=Physics,dc=example,dc=org",
            &AttributeSet::new().with("ou", "People"),
        )
        .await
        .unwrap();

        let found = dir
            .search_one_level(BASE, &Filter::object_class("organization"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].dn, "o=Physics,dc=example,dc=org");
        assert_eq!(dir.write_count().await, 2);
    }

    #[tokio::test]
    async fn test_search_missing_base_is_empty() {
        let dir = InMemoryDirectory::new(BASE);
        let found = dir
            .search_one_level("ou=People,o=Nope,dc=example,dc=org", &Filter::any())
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_add_requires_parent_and_uniqueness() {
        let dir = InMemoryDirectory::new(BASE);
        let orphan = dir
            .add("uid=a,ou=People,o=Physics,dc=example,dc=org", &org("x"))
            .await;
        assert!(matches!(orphan, Err(DirectoryError::WriteRejected { .. })));

        dir.add("o=Physics,dc=example,dc=org", &org("Physics"))
            .await
            .unwrap();
        let duplicate = dir.add("O=physics,dc=example,dc=org", &org("Physics")).await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_delete_refuses_non_leaf() {
        let dir = InMemoryDirectory::new(BASE);
        dir.add("o=Physics,dc=example,dc=org", &org("Physics"))
            .await
            .unwrap();
        dir.add(
            "ou=Groups,o=Physics,dc=example,dc=org",
            &AttributeSet::new().with("ou", "Groups"),
        )
        .await
        .unwrap();

        assert!(dir.delete("o=Physics,dc=example,dc=org").await.is_err());
        dir.delete("ou=Groups,o=Physics,dc=example,dc=org")
            .await
            .unwrap();
        dir.delete("o=Physics,dc=example,dc=org").await.unwrap();
        assert!(dir.is_empty().await);
    }

    #[tokio::test]
    async fn test_modify_semantics() {
        let dir = InMemoryDirectory::new(BASE);
        let dn = "o=Physics,dc=example,dc=org";
        dir.add(dn, &org("Physics").with("description", "old"))
            .await
            .unwrap();

        dir.modify(
            dn,
            &[
                Modification::Replace {
                    attribute: "description".to_string(),
                    values: vec!["new".to_string()],
                },
                Modification::Add {
                    attribute: "labeledURI".to_string(),
                    values: vec!["https://sp".to_string()],
                },
            ],
        )
        .await
        .unwrap();

        let stored = dir.entry(dn).await.unwrap();
        assert_eq!(stored.first("description"), Some("new"));
        assert_eq!(stored.first("labeledURI"), Some("https://sp"));

        let missing_attr = dir
            .modify(
                dn,
                &[Modification::Delete {
                    attribute: "seeAlso".to_string(),
                }],
            )
            .await;
        assert!(missing_attr.is_err());
        // Failed modify leaves the entry untouched.
        assert_eq!(dir.entry(dn).await.unwrap(), stored);
    }

    #[tokio::test]
    async fn test_rejected_writes() {
        let dir = InMemoryDirectory::new(BASE);
        let dn = "o=Physics,dc=example,dc=org";
        dir.reject_writes_to(dn).await;
        let err = dir.add(dn, &org("Physics")).await.unwrap_err();
        match err {
            DirectoryError::WriteRejected { dn: target, payload, .. } => {
                assert_eq!(target, dn);
                assert!(payload.contains("Physics"));
            }
            other => panic!("Expected WriteRejected, got {:?}", other),
        }
        assert_eq!(dir.write_count().await, 0);
    }
}
