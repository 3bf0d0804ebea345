//! Run orchestration
//!
//! One pass: upsert every organization, person and membership from the
//! snapshot, clean up orphans, flush notifications, unbind. Organizations
//! owned by another source are skipped with everything below them. The first
//! error aborts the pass and is returned as is.

use coldap_directory::Directory;
use coldap_notify::{Notifier, Publisher};
use coldap_source::SourceSnapshot;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::SyncResult;
use crate::plan;
use crate::reconciler::Reconciler;
use crate::report::{EntryKind, RunReport};
use crate::writer::{DirectoryWriter, Outcome};

/// Default notification topic.
pub const DEFAULT_TOPIC: &str = "ldap";

/// Settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Base address of the managed subtree.
    pub base_dn: String,
    /// Identity of the source, stamped on every managed organization.
    pub host: String,
    /// Topic of every change notification.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Remove deleted persons from groups.
    #[serde(default)]
    pub prune_group_members: bool,
    /// Writes are skipped by the directory; recorded in the report.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

impl SyncOptions {
    pub fn new(base_dn: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            host: host.into(),
            topic: default_topic(),
            prune_group_members: false,
            dry_run: false,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_group_pruning(mut self, enabled: bool) -> Self {
        self.prune_group_members = enabled;
        self
    }

    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}

/// Drives a reconciliation pass against one directory.
pub struct Orchestrator<'a> {
    directory: &'a dyn Directory,
    publisher: &'a dyn Publisher,
    options: SyncOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        directory: &'a dyn Directory,
        publisher: &'a dyn Publisher,
        options: SyncOptions,
    ) -> Self {
        Self {
            directory,
            publisher,
            options,
        }
    }

    /// Run one pass for the given snapshot.
    #[instrument(skip(self, snapshot), fields(base_dn = %self.options.base_dn, host = %self.options.host))]
    pub async fn run(&self, snapshot: &SourceSnapshot) -> SyncResult<RunReport> {
        let mut notifier = Notifier::new();
        let mut report = RunReport {
            dry_run: self.options.dry_run,
            ..RunReport::default()
        };

        let writer = DirectoryWriter::new(
            self.directory,
            &self.options.base_dn,
            &self.options.host,
            &self.options.topic,
        );

        let plans = plan::build(snapshot);
        info!(organizations = plans.len(), "Converging organizations");

        for org_plan in &plans {
            let outcome = writer
                .upsert_organization(
                    &mut notifier,
                    &org_plan.name,
                    org_plan.description.as_deref(),
                    &org_plan.extra,
                )
                .await?;
            report.tally(EntryKind::Organization, outcome);
            if outcome == Outcome::Foreign {
                continue;
            }

            let org = writer.organization(&org_plan.name);
            for person in &org_plan.persons {
                let outcome = writer
                    .upsert_person(&mut notifier, &org, &person.uid, &person.attributes)
                    .await?;
                report.tally(EntryKind::Person, outcome);
            }
            for (role, uid) in &org_plan.memberships {
                let outcome = writer
                    .upsert_group_membership(&mut notifier, &org, role, uid)
                    .await?;
                report.tally(EntryKind::Group, outcome);
            }
        }

        let reconciler = Reconciler::new(
            self.directory,
            &self.options.base_dn,
            &self.options.host,
            &self.options.topic,
        )
        .with_group_pruning(self.options.prune_group_members);
        let cleanup = reconciler.run(snapshot, &mut notifier).await?;
        report.absorb(&cleanup);

        report.notifications = notifier.flush(self.publisher).await;

        self.directory.unbind().await?;

        report.log();
        Ok(report)
    }
}
