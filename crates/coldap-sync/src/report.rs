//! Run report

use serde::Serialize;
use tracing::info;

use crate::reconciler::CleanupSummary;
use crate::writer::Outcome;

/// Kind of managed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Organization,
    Person,
    Group,
}

/// Outcome counts for one kind of entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub created: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl KindCounts {
    fn tally(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Modified => self.modified += 1,
            Outcome::Unchanged => self.unchanged += 1,
            // Counted by cleanup as a skipped foreign organization.
            Outcome::Foreign => {}
        }
    }

    /// Created, modified and deleted entries.
    pub fn writes(&self) -> usize {
        self.created + self.modified + self.deleted
    }
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub organizations: KindCounts,
    pub persons: KindCounts,
    pub groups: KindCounts,
    /// Entries removed by cleanup, subtree contents included.
    pub entries_deleted: usize,
    /// Organizations left alone because another source owns them.
    pub foreign_skipped: usize,
    /// Notifications accepted by the transport.
    pub notifications: usize,
    pub dry_run: bool,
}

impl RunReport {
    /// Count an upsert outcome.
    pub fn tally(&mut self, kind: EntryKind, outcome: Outcome) {
        match kind {
            EntryKind::Organization => self.organizations.tally(outcome),
            EntryKind::Person => self.persons.tally(outcome),
            EntryKind::Group => self.groups.tally(outcome),
        }
    }

    /// Fold in the result of the cleanup pass.
    pub fn absorb(&mut self, cleanup: &CleanupSummary) {
        self.organizations.deleted += cleanup.organizations_deleted;
        self.persons.deleted += cleanup.persons_deleted;
        self.groups.deleted += cleanup.groups_deleted;
        self.groups.modified += cleanup.groups_pruned;
        self.entries_deleted += cleanup.entries_deleted;
        self.foreign_skipped += cleanup.foreign_skipped;
    }

    /// Whether the run changed anything.
    pub fn has_changes(&self) -> bool {
        self.organizations.writes() + self.persons.writes() + self.groups.writes() > 0
    }

    /// Log the report.
    pub fn log(&self) {
        info!(
            dry_run = self.dry_run,
            organizations_created = self.organizations.created,
            organizations_modified = self.organizations.modified,
            organizations_deleted = self.organizations.deleted,
            persons_created = self.persons.created,
            persons_modified = self.persons.modified,
            persons_deleted = self.persons.deleted,
            groups_created = self.groups.created,
            groups_modified = self.groups.modified,
            groups_deleted = self.groups.deleted,
            entries_deleted = self.entries_deleted,
            foreign_skipped = self.foreign_skipped,
            notifications = self.notifications,
            "Sync run finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_and_absorb() {
        let mut report = RunReport::default();
        report.tally(EntryKind::Organization, Outcome::Created);
        report.tally(EntryKind::Person, Outcome::Unchanged);
        report.tally(EntryKind::Group, Outcome::Modified);
        report.absorb(&CleanupSummary {
            organizations_deleted: 1,
            entries_deleted: 4,
            foreign_skipped: 2,
            ..CleanupSummary::default()
        });

        assert_eq!(report.organizations.created, 1);
        assert_eq!(report.organizations.deleted, 1);
        assert_eq!(report.persons.unchanged, 1);
        assert_eq!(report.groups.modified, 1);
        assert_eq!(report.entries_deleted, 4);
        assert_eq!(report.foreign_skipped, 2);
        assert!(report.has_changes());
    }

    #[test]
    fn test_unchanged_run_has_no_changes() {
        let mut report = RunReport::default();
        report.tally(EntryKind::Person, Outcome::Unchanged);
        assert!(!report.has_changes());
        assert_eq!(
            serde_json::to_value(&report).unwrap()["persons"]["unchanged"],
            1
        );
    }
}
