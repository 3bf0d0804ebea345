//! Test data builders for sync integration tests.

#![allow(dead_code)]

use coldap_directory::{AttributeSet, Directory, InMemoryDirectory, OrgAddress};
use coldap_notify::InMemoryPublisher;
use coldap_source::models::{
    CollaborationDetail, GroupDetail, Membership, Organisation, Service, User,
};
use coldap_source::{CollaborationData, SourceSnapshot};
use coldap_sync::{Orchestrator, RunReport, SyncOptions, SyncResult};

pub const BASE: &str = "dc=example,dc=org";
pub const HOST: &str = "sbs.example.org";
pub const FOREIGN_HOST: &str = "sbs.other.org";

/// A source user with a display name and mail address.
pub fn user(uid: &str) -> User {
    User {
        uid: uid.to_string(),
        name: Some(format!("{} Example", capitalize(uid))),
        family_name: Some("Example".to_string()),
        given_name: Some(capitalize(uid)),
        email: Some(format!("{uid}@example.org")),
        ssh_keys: Vec::new(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn member(uid: &str) -> Membership {
    membership(uid, "member", None)
}

pub fn admin(uid: &str) -> Membership {
    membership(uid, "admin", None)
}

pub fn membership(uid: &str, role: &str, status: Option<&str>) -> Membership {
    Membership {
        user_id: 1,
        role: role.to_string(),
        status: status.map(str::to_string),
        user: user(uid),
    }
}

/// Builder for one collaboration in a snapshot.
#[derive(Debug, Clone)]
pub struct CollaborationBuilder {
    data: CollaborationData,
}

impl CollaborationBuilder {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            data: CollaborationData {
                detail: CollaborationDetail {
                    id,
                    name: name.to_string(),
                    short_name: None,
                    description: Some(format!("{name} collaboration")),
                    organisation_id: None,
                    collaboration_memberships: Vec::new(),
                    authorisation_groups: Vec::new(),
                    services: Vec::new(),
                },
                groups: Vec::new(),
            },
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.data.detail.description = Some(description.to_string());
        self
    }

    pub fn organisation(mut self, id: i64) -> Self {
        self.data.detail.organisation_id = Some(id);
        self
    }

    pub fn member(mut self, membership: Membership) -> Self {
        self.data.detail.collaboration_memberships.push(membership);
        self
    }

    pub fn service(mut self, entity_id: &str) -> Self {
        self.data.detail.services.push(Service {
            entity_id: entity_id.to_string(),
            name: None,
        });
        self
    }

    pub fn group(mut self, id: i64, short_name: &str, members: Vec<Membership>) -> Self {
        self.data.groups.push(GroupDetail {
            id,
            name: short_name.to_string(),
            short_name: Some(short_name.to_string()),
            collaboration_memberships: members,
        });
        self
    }

    pub fn build(self) -> CollaborationData {
        self.data
    }
}

pub fn snapshot(collaborations: Vec<CollaborationData>) -> SourceSnapshot {
    SourceSnapshot::new(
        HOST,
        vec![Organisation {
            id: 10,
            name: "University".to_string(),
            short_name: Some("uni".to_string()),
        }],
        collaborations,
    )
}

/// Scenario A: "Physics" with a single admin, alice.
pub fn physics_with_alice() -> SourceSnapshot {
    snapshot(vec![CollaborationBuilder::new(1, "Physics")
        .member(admin("alice"))
        .build()])
}

pub fn options() -> SyncOptions {
    SyncOptions::new(BASE, HOST)
}

pub fn physics() -> OrgAddress {
    OrgAddress::new(BASE, "Physics")
}

pub async fn run(
    directory: &dyn Directory,
    publisher: &InMemoryPublisher,
    snapshot: &SourceSnapshot,
) -> SyncResult<RunReport> {
    Orchestrator::new(directory, publisher, options())
        .run(snapshot)
        .await
}

/// Seed an organization owned by `host`, with its containers.
pub async fn seed_organization(directory: &InMemoryDirectory, name: &str, host: &str) {
    let org = OrgAddress::new(BASE, name);
    directory
        .seed(
            org.dn(),
            AttributeSet::new()
                .with("objectClass", "top")
                .with("objectClass", "organization")
                .with("objectClass", "extensibleObject")
                .with("o", name)
                .with("description", "n/a")
                .with("host", host),
        )
        .await;
    for (dn, ou) in [(org.people(), "People"), (org.groups(), "Groups")] {
        directory
            .seed(
                &dn,
                AttributeSet::new()
                    .with("objectClass", "top")
                    .with("objectClass", "organizationalUnit")
                    .with("ou", ou),
            )
            .await;
    }
}

/// Names of organizations under the base carrying `host`.
pub async fn organizations_owned_by(directory: &InMemoryDirectory, host: &str) -> Vec<String> {
    let mut names = Vec::new();
    for dn in directory.children(BASE).await {
        if let Some(attrs) = directory.entry(&dn).await {
            if attrs.first("host") == Some(host) {
                if let Some(name) = attrs.first("o") {
                    names.push(name.to_string());
                }
            }
        }
    }
    names.sort();
    names
}
