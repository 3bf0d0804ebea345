//! Directory writer
//!
//! Idempotent upserts of organizations, persons and group memberships. Each
//! upsert that writes records a change notification for the owning
//! collaboration.

use coldap_directory::{
    decide, modification_list, AttributeInput, AttributeMapper, AttributeSet, Decision, Directory,
    DirectoryEntry, Filter, OrgAddress,
};
use coldap_notify::Notifier;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::plan::classify_role;

/// Object classes of an organization entry.
pub const ORGANIZATION_CLASSES: &[&str] = &["top", "organization", "extensibleObject"];

/// Object classes of the People and Groups containers.
pub const CONTAINER_CLASSES: &[&str] = &["top", "organizationalUnit"];

/// Object classes of a person entry.
pub const PERSON_CLASSES: &[&str] = &["top", "organizationalPerson", "inetOrgPerson"];

/// Object classes of a group entry.
pub const GROUP_CLASSES: &[&str] = &["top", "groupOfNames"];

/// Attribute carrying the owning source identity.
pub const HOST_ATTRIBUTE: &str = "host";

/// Attribute listing group members.
pub const MEMBER_ATTRIBUTE: &str = "member";

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Modified,
    Unchanged,
    /// The entry belongs to another source and was left alone.
    Foreign,
}

impl Outcome {
    /// Whether the directory was written.
    pub fn is_write(self) -> bool {
        matches!(self, Outcome::Created | Outcome::Modified)
    }
}

/// Writes managed entries under one base.
pub struct DirectoryWriter<'a> {
    directory: &'a dyn Directory,
    mapper: AttributeMapper,
    base_dn: String,
    host: String,
    topic: String,
}

impl<'a> DirectoryWriter<'a> {
    /// Create a writer stamping `host` on organizations and recording
    /// notifications under `topic`.
    pub fn new(
        directory: &'a dyn Directory,
        base_dn: impl Into<String>,
        host: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            mapper: AttributeMapper::new(),
            base_dn: base_dn.into(),
            host: host.into(),
            topic: topic.into(),
        }
    }

    /// Addresses of the organization `name`.
    pub fn organization(&self, name: &str) -> OrgAddress {
        OrgAddress::new(&self.base_dn, name)
    }

    /// Canonical attributes of an organization entry.
    pub fn organization_attributes(
        &self,
        name: &str,
        description: Option<&str>,
        extra: &[(String, AttributeInput)],
    ) -> AttributeSet {
        let mut pairs: Vec<(String, AttributeInput)> = vec![
            ("objectClass".to_string(), ORGANIZATION_CLASSES.to_vec().into()),
            ("o".to_string(), name.into()),
            ("description".to_string(), description.into()),
            (HOST_ATTRIBUTE.to_string(), self.host.as_str().into()),
        ];
        pairs.extend(extra.iter().cloned());
        self.mapper.map(pairs)
    }

    /// Create or converge an organization and, on creation, its containers.
    ///
    /// An organization stamped with another host, or with none, is never
    /// modified and yields [`Outcome::Foreign`].
    pub async fn upsert_organization(
        &self,
        notifier: &mut Notifier,
        name: &str,
        description: Option<&str>,
        extra: &[(String, AttributeInput)],
    ) -> SyncResult<Outcome> {
        let org = self.organization(name);
        let filter = Filter::and(vec![
            Filter::object_class("organization"),
            Filter::eq("o", name),
        ]);
        let found = self.find_unique(&self.base_dn, &filter).await?;
        let proposed = self.organization_attributes(name, description, extra);

        match found {
            None => {
                self.directory.add(org.dn(), &proposed).await?;
                self.add_container(&org.people(), coldap_directory::dn::PEOPLE_OU)
                    .await?;
                self.add_container(&org.groups(), coldap_directory::dn::GROUPS_OU)
                    .await?;
                info!(organization = %name, "Created organization");
                notifier.record(&self.topic, name);
                Ok(Outcome::Created)
            }
            Some(entry) if entry.attributes.first(HOST_ATTRIBUTE) != Some(self.host.as_str()) => {
                warn!(
                    organization = %name,
                    owner = entry.attributes.first(HOST_ATTRIBUTE).unwrap_or_default(),
                    "Organization owned by another source, leaving it alone"
                );
                Ok(Outcome::Foreign)
            }
            Some(entry) => self.converge(notifier, name, &entry, &proposed).await,
        }
    }

    /// Create or converge a person in the organization's People container.
    pub async fn upsert_person(
        &self,
        notifier: &mut Notifier,
        org: &OrgAddress,
        uid: &str,
        attributes: &[(String, AttributeInput)],
    ) -> SyncResult<Outcome> {
        let filter = Filter::and(vec![
            Filter::object_class("organizationalPerson"),
            Filter::eq("uid", uid),
        ]);
        let found = self.find_unique(&org.people(), &filter).await?;

        let mut pairs: Vec<(String, AttributeInput)> = vec![
            ("objectClass".to_string(), PERSON_CLASSES.to_vec().into()),
            ("uid".to_string(), uid.into()),
        ];
        pairs.extend(attributes.iter().cloned());
        let proposed = self.mapper.map(pairs);

        match found {
            None => {
                self.directory.add(&org.person(uid), &proposed).await?;
                info!(organization = %org.name(), uid = %uid, "Created person");
                notifier.record(&self.topic, org.name());
                Ok(Outcome::Created)
            }
            Some(entry) => self.converge(notifier, org.name(), &entry, &proposed).await,
        }
    }

    /// Make sure `uid` is listed in the group `role`.
    ///
    /// Existing members are never removed.
    pub async fn upsert_group_membership(
        &self,
        notifier: &mut Notifier,
        org: &OrgAddress,
        role: &str,
        uid: &str,
    ) -> SyncResult<Outcome> {
        let person = org.person(uid);
        let found = self
            .find_unique(&org.groups(), &Filter::eq("cn", role))
            .await?;

        let outcome = match found {
            None => {
                let group = self.group_attributes(org, role, &person);
                self.directory.add(&org.group(role), &group).await?;
                info!(organization = %org.name(), role = %role, uid = %uid, "Created group");
                Outcome::Created
            }
            Some(entry) if !entry.attributes.has(MEMBER_ATTRIBUTE) => {
                let group = self.group_attributes(org, role, &person);
                let changes = modification_list(&entry.attributes, &group);
                self.directory.modify(&entry.dn, &changes).await?;
                info!(organization = %org.name(), role = %role, uid = %uid, "Rebuilt group without members");
                Outcome::Modified
            }
            Some(entry) if entry.attributes.contains_value(MEMBER_ATTRIBUTE, &person) => {
                debug!(role = %role, uid = %uid, "Already a member");
                Outcome::Unchanged
            }
            Some(entry) => {
                let current = self
                    .directory
                    .read(&entry.dn)
                    .await?
                    .unwrap_or(entry.attributes);
                let mut updated = current.clone();
                updated.append(MEMBER_ATTRIBUTE, person);
                let changes = modification_list(&current, &updated);
                self.directory.modify(&entry.dn, &changes).await?;
                info!(organization = %org.name(), role = %role, uid = %uid, "Added group member");
                Outcome::Modified
            }
        };

        if outcome.is_write() {
            notifier.record(&self.topic, org.name());
        }
        Ok(outcome)
    }

    fn group_attributes(&self, org: &OrgAddress, role: &str, person: &str) -> AttributeSet {
        self.mapper.map(vec![
            ("objectClass", AttributeInput::from(GROUP_CLASSES.to_vec())),
            ("cn", role.into()),
            (MEMBER_ATTRIBUTE, person.into()),
            ("businessCategory", classify_role(role).into()),
            ("o", org.name().into()),
        ])
    }

    async fn add_container(&self, dn: &str, ou: &str) -> SyncResult<()> {
        let attributes = self.mapper.map(vec![
            ("objectClass", AttributeInput::from(CONTAINER_CLASSES.to_vec())),
            ("ou", ou.into()),
        ]);
        self.directory.add(dn, &attributes).await?;
        Ok(())
    }

    async fn converge(
        &self,
        notifier: &mut Notifier,
        subject: &str,
        entry: &DirectoryEntry,
        proposed: &AttributeSet,
    ) -> SyncResult<Outcome> {
        match decide(proposed, Some(&entry.attributes)) {
            Decision::Modify(changes) => {
                self.directory.modify(&entry.dn, &changes).await?;
                info!(dn = %entry.dn, changes = changes.len(), "Converged entry");
                notifier.record(&self.topic, subject);
                Ok(Outcome::Modified)
            }
            Decision::NoOp | Decision::Create => {
                debug!(dn = %entry.dn, "Entry in sync");
                Ok(Outcome::Unchanged)
            }
        }
    }

    async fn find_unique(&self, base: &str, filter: &Filter) -> SyncResult<Option<DirectoryEntry>> {
        let mut entries = self.directory.search_one_level(base, filter).await?;
        if entries.len() > 1 {
            return Err(SyncError::NotUnique {
                base: base.to_string(),
                filter: filter.to_string(),
                count: entries.len(),
            });
        }
        Ok(entries.pop())
    }
}
