//! Sync plan
//!
//! Turns the source snapshot into the organizations, persons and group
//! memberships the writer has to converge. Role labels:
//!
//! | Role | Members |
//! |---|---|
//! | `CO:<name>` | every collaboration member |
//! | `GRP:CO:members:all` | every collaboration member |
//! | `GRP:CO:members:active` | members whose status is absent or `active` |
//! | `GRP:CO:admins` | members with role `admin` |
//! | `GRP:<label>` | members of an authorisation group |

use std::collections::{BTreeSet, HashMap};

use coldap_directory::AttributeInput;
use coldap_source::models::{Membership, User};
use coldap_source::{CollaborationData, SourceSnapshot};

/// Prefix marking a role as a group rather than a collaboration.
pub const GROUP_PREFIX: &str = "GRP:";

/// Role holding all collaboration members.
pub const MEMBERS_ALL: &str = "GRP:CO:members:all";

/// Role holding active collaboration members.
pub const MEMBERS_ACTIVE: &str = "GRP:CO:members:active";

/// Role holding collaboration admins.
pub const ADMINS: &str = "GRP:CO:admins";

/// Role named after the collaboration itself.
pub fn collaboration_role(name: &str) -> String {
    format!("CO:{name}")
}

/// Role for an authorisation group.
pub fn group_role(label: &str) -> String {
    format!("{GROUP_PREFIX}{label}")
}

/// Classification stored in a group's `businessCategory`.
pub fn classify_role(role: &str) -> &'static str {
    if role.starts_with(GROUP_PREFIX) {
        "group"
    } else {
        "co"
    }
}

/// Ordered attribute pairs for the mapper.
pub type AttributePairs = Vec<(String, AttributeInput)>;

/// A person to converge inside an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonPlan {
    pub uid: String,
    pub attributes: AttributePairs,
}

/// A collaboration to converge as an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationPlan {
    pub name: String,
    pub description: Option<String>,
    pub extra: AttributePairs,
    pub persons: Vec<PersonPlan>,
    /// `(role, uid)` pairs, deduplicated, in first-seen order.
    pub memberships: Vec<(String, String)>,
}

/// Build one plan per collaboration name, in first-seen order.
///
/// Collaborations sharing a name converge to the same organization: the first
/// one supplies description and extra attributes, persons and memberships of
/// all of them are merged.
pub fn build(snapshot: &SourceSnapshot) -> Vec<OrganizationPlan> {
    let mut builders: Vec<PlanBuilder> = Vec::new();
    let mut by_name: HashMap<&str, usize> = HashMap::new();

    for co in snapshot.collaborations() {
        let index = *by_name.entry(co.name()).or_insert_with(|| {
            builders.push(PlanBuilder::new(snapshot, co));
            builders.len() - 1
        });
        builders[index].add_members(co);
    }

    builders.into_iter().map(PlanBuilder::finish).collect()
}

struct PlanBuilder {
    plan: OrganizationPlan,
    seen_uids: BTreeSet<String>,
    memberships: Memberships,
}

impl PlanBuilder {
    fn new(snapshot: &SourceSnapshot, co: &CollaborationData) -> Self {
        let detail = &co.detail;

        let mut extra: AttributePairs = Vec::new();
        let entity_ids: Vec<String> =
            detail.services.iter().map(|s| s.entity_id.clone()).collect();
        if !entity_ids.is_empty() {
            extra.push(("labeledURI".to_string(), AttributeInput::List(entity_ids)));
        }
        if let Some(parent) = detail
            .organisation_id
            .and_then(|id| snapshot.organisation_name(id))
        {
            extra.push(("businessCategory".to_string(), parent.into()));
        }

        Self {
            plan: OrganizationPlan {
                name: detail.name.clone(),
                description: detail.description.clone(),
                extra,
                persons: Vec::new(),
                memberships: Vec::new(),
            },
            seen_uids: BTreeSet::new(),
            memberships: Memberships::default(),
        }
    }

    fn add_members(&mut self, co: &CollaborationData) {
        let co_role = collaboration_role(&self.plan.name);

        for membership in &co.detail.collaboration_memberships {
            self.add_person(&membership.user);
            for role in collaboration_roles(membership, &co_role) {
                self.memberships.push(role, &membership.user.uid);
            }
        }

        for group in &co.groups {
            let role = group_role(group.label());
            for membership in &group.collaboration_memberships {
                self.add_person(&membership.user);
                self.memberships.push(role.clone(), &membership.user.uid);
            }
        }
    }

    fn add_person(&mut self, user: &User) {
        if self.seen_uids.insert(user.uid.clone()) {
            self.plan.persons.push(person_plan(user));
        }
    }

    fn finish(mut self) -> OrganizationPlan {
        self.plan.memberships = self.memberships.pairs;
        self.plan
    }
}

fn collaboration_roles(membership: &Membership, co_role: &str) -> Vec<String> {
    let mut roles = vec![co_role.to_string(), MEMBERS_ALL.to_string()];
    if membership.is_active() {
        roles.push(MEMBERS_ACTIVE.to_string());
    }
    if membership.is_admin() {
        roles.push(ADMINS.to_string());
    }
    roles
}

fn person_plan(user: &User) -> PersonPlan {
    let mut attributes: AttributePairs = vec![
        ("cn".to_string(), user.name.clone().into()),
        ("displayName".to_string(), user.name.clone().into()),
        ("sn".to_string(), user.family_name.clone().into()),
        ("givenName".to_string(), user.given_name.clone().into()),
        ("mail".to_string(), user.email.clone().into()),
    ];
    if !user.ssh_keys.is_empty() {
        let keys: Vec<String> = user.ssh_keys.iter().map(|k| k.ssh_value.clone()).collect();
        attributes.push(("sshPublicKey".to_string(), AttributeInput::List(keys)));
    }
    PersonPlan {
        uid: user.uid.clone(),
        attributes,
    }
}

#[derive(Default)]
struct Memberships {
    seen: BTreeSet<(String, String)>,
    pairs: Vec<(String, String)>,
}

impl Memberships {
    fn push(&mut self, role: String, uid: &str) {
        let pair = (role, uid.to_string());
        if self.seen.insert(pair.clone()) {
            self.pairs.push(pair);
        }
    }
}
