//! Orphan reconciler
//!
//! Removes managed entries the snapshot no longer vouches for. Only
//! organizations stamped with the current source identity are considered.

use coldap_directory::dn::{child_dn, is_container, GROUPS_OU, PEOPLE_OU};
use coldap_directory::{modification_list, Directory, DirectoryEntry, Filter};
use coldap_notify::Notifier;
use coldap_source::SourceSnapshot;
use tracing::{debug, info, warn};

use crate::error::SyncResult;
use crate::writer::{HOST_ATTRIBUTE, MEMBER_ATTRIBUTE};

/// Counts of what a cleanup pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Organizations removed with their subtree.
    pub organizations_deleted: usize,
    /// Persons removed from validated organizations.
    pub persons_deleted: usize,
    /// Groups deleted because their last member was removed.
    pub groups_deleted: usize,
    /// Groups that lost a member.
    pub groups_pruned: usize,
    /// Entries removed in total, subtree contents included.
    pub entries_deleted: usize,
    /// Organizations skipped because another source owns them.
    pub foreign_skipped: usize,
}

/// Deletes organizations and persons absent from the snapshot.
pub struct Reconciler<'a> {
    directory: &'a dyn Directory,
    base_dn: String,
    host: String,
    topic: String,
    prune_group_members: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        directory: &'a dyn Directory,
        base_dn: impl Into<String>,
        host: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            base_dn: base_dn.into(),
            host: host.into(),
            topic: topic.into(),
            prune_group_members: false,
        }
    }

    /// Also remove deleted persons from the groups of their organization.
    pub fn with_group_pruning(mut self, enabled: bool) -> Self {
        self.prune_group_members = enabled;
        self
    }

    /// Run one cleanup pass.
    pub async fn run(
        &self,
        snapshot: &SourceSnapshot,
        notifier: &mut Notifier,
    ) -> SyncResult<CleanupSummary> {
        let mut summary = CleanupSummary::default();
        let organizations = self
            .directory
            .search_one_level(&self.base_dn, &Filter::object_class("organization"))
            .await?;

        for entry in organizations {
            if is_container(&entry.dn) {
                continue;
            }
            if entry.attributes.first(HOST_ATTRIBUTE) != Some(self.host.as_str()) {
                debug!(dn = %entry.dn, "Skipping organization owned by another source");
                summary.foreign_skipped += 1;
                continue;
            }
            let Some(name) = entry.attributes.first("o").map(str::to_string) else {
                warn!(dn = %entry.dn, "Managed organization without a name, skipping");
                continue;
            };

            if snapshot.contains(&name) {
                self.remove_departed_persons(snapshot, notifier, &entry, &name, &mut summary)
                    .await?;
            } else {
                info!(organization = %name, "Organization no longer in source, deleting");
                notifier.record(&self.topic, &name);
                summary.entries_deleted += self.delete_subtree(&entry.dn).await?;
                summary.organizations_deleted += 1;
            }
        }

        info!(
            organizations = summary.organizations_deleted,
            persons = summary.persons_deleted,
            foreign = summary.foreign_skipped,
            "Cleanup finished"
        );
        Ok(summary)
    }

    async fn remove_departed_persons(
        &self,
        snapshot: &SourceSnapshot,
        notifier: &mut Notifier,
        organization: &DirectoryEntry,
        name: &str,
        summary: &mut CleanupSummary,
    ) -> SyncResult<()> {
        let members = snapshot.member_uids(name);
        let people = child_dn("ou", PEOPLE_OU, &organization.dn);
        let persons = self.directory.search_one_level(&people, &Filter::any()).await?;

        for person in persons {
            let uid = person.attributes.first("uid").unwrap_or_default();
            if members.contains(uid) {
                continue;
            }
            info!(organization = %name, uid = %uid, "Person no longer a member, deleting");
            notifier.record(&self.topic, name);
            self.directory.delete(&person.dn).await?;
            summary.persons_deleted += 1;
            summary.entries_deleted += 1;

            if self.prune_group_members {
                self.prune_member(notifier, organization, name, &person.dn, summary)
                    .await?;
            }
        }
        Ok(())
    }

    async fn prune_member(
        &self,
        notifier: &mut Notifier,
        organization: &DirectoryEntry,
        name: &str,
        person: &str,
        summary: &mut CleanupSummary,
    ) -> SyncResult<()> {
        let groups_dn = child_dn("ou", GROUPS_OU, &organization.dn);
        let groups = self
            .directory
            .search_one_level(&groups_dn, &Filter::eq(MEMBER_ATTRIBUTE, person))
            .await?;

        for group in groups {
            let mut updated = group.attributes.clone();
            updated.remove_value(MEMBER_ATTRIBUTE, person);
            notifier.record(&self.topic, name);

            if updated.has(MEMBER_ATTRIBUTE) {
                let changes = modification_list(&group.attributes, &updated);
                self.directory.modify(&group.dn, &changes).await?;
                summary.groups_pruned += 1;
                debug!(group = %group.dn, person = %person, "Removed dangling member");
            } else {
                self.directory.delete(&group.dn).await?;
                summary.groups_deleted += 1;
                summary.entries_deleted += 1;
                debug!(group = %group.dn, "Deleted group left without members");
            }
        }
        Ok(())
    }

    /// Delete `root` and everything below it, children before parents.
    ///
    /// Returns the number of entries deleted.
    pub async fn delete_subtree(&self, root: &str) -> SyncResult<usize> {
        let mut stack: Vec<(String, bool)> = vec![(root.to_string(), false)];
        let mut deleted = 0;

        while let Some((dn, expanded)) = stack.pop() {
            if expanded {
                self.directory.delete(&dn).await?;
                deleted += 1;
                continue;
            }
            let children = self.directory.search_one_level(&dn, &Filter::any()).await?;
            stack.push((dn, true));
            stack.extend(children.into_iter().map(|child| (child.dn, false)));
        }

        debug!(root = %root, deleted = deleted, "Deleted subtree");
        Ok(deleted)
    }
}
