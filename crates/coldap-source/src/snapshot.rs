//! Run snapshot
//!
//! Everything fetched from the source for one run. It is the only ground truth
//! for deciding which managed entries are kept.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::client::SourceClient;
use crate::error::SourceResult;
use crate::models::{CollaborationDetail, GroupDetail, Organisation};

/// One collaboration with its expanded authorisation groups.
#[derive(Debug, Clone)]
pub struct CollaborationData {
    pub detail: CollaborationDetail,
    pub groups: Vec<GroupDetail>,
}

impl CollaborationData {
    /// Collaboration name.
    pub fn name(&self) -> &str {
        &self.detail.name
    }

    /// Uids of every member of the collaboration and of its groups.
    pub fn member_uids(&self) -> BTreeSet<String> {
        self.detail
            .collaboration_memberships
            .iter()
            .chain(self.groups.iter().flat_map(|g| g.collaboration_memberships.iter()))
            .map(|m| m.user.uid.clone())
            .collect()
    }
}

/// Source data for the current run.
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    host: String,
    organisations: Vec<Organisation>,
    collaborations: Vec<CollaborationData>,
}

impl SourceSnapshot {
    /// Build a snapshot from already fetched data.
    pub fn new(
        host: impl Into<String>,
        organisations: Vec<Organisation>,
        collaborations: Vec<CollaborationData>,
    ) -> Self {
        Self {
            host: host.into(),
            organisations,
            collaborations,
        }
    }

    /// Fetch everything the run needs. Fails if the source is not healthy.
    pub async fn fetch(client: &SourceClient, host: impl Into<String>) -> SourceResult<Self> {
        client.check_health().await?;

        let organisations = client.organisations().await?;
        let listing = client.collaborations().await?;

        let mut collaborations = Vec::with_capacity(listing.len());
        for co in &listing {
            let detail = client.collaboration(co.id).await?;
            let mut groups = Vec::with_capacity(detail.authorisation_groups.len());
            for group in &detail.authorisation_groups {
                groups.push(client.group(group.id).await?);
            }
            debug!(
                collaboration = %detail.name,
                members = detail.collaboration_memberships.len(),
                groups = groups.len(),
                "Fetched collaboration"
            );
            collaborations.push(CollaborationData { detail, groups });
        }

        info!(
            organisations = organisations.len(),
            collaborations = collaborations.len(),
            "Fetched source snapshot"
        );

        Ok(Self::new(host, organisations, collaborations))
    }

    /// Identity of the source instance.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// All organisations.
    pub fn organisations(&self) -> &[Organisation] {
        &self.organisations
    }

    /// All collaborations, in fetch order.
    pub fn collaborations(&self) -> &[CollaborationData] {
        &self.collaborations
    }

    /// Name of an organisation by id.
    pub fn organisation_name(&self, id: i64) -> Option<&str> {
        self.organisations
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.name.as_str())
    }

    /// Names of all collaborations.
    pub fn collaboration_names(&self) -> BTreeSet<&str> {
        self.collaborations.iter().map(CollaborationData::name).collect()
    }

    /// Whether a collaboration with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.collaborations.iter().any(|c| c.name() == name)
    }

    /// Member uids recorded for a collaboration name.
    ///
    /// Collaborations sharing a name share one organization, so their member
    /// sets are merged.
    pub fn member_uids(&self, name: &str) -> BTreeSet<String> {
        self.collaborations
            .iter()
            .filter(|c| c.name() == name)
            .flat_map(CollaborationData::member_uids)
            .collect()
    }
}
