//! Source API payloads
//!
//! Only the fields the sync consumes are modelled; unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

impl Health {
    /// Whether the source reports itself as up.
    pub fn is_up(&self) -> bool {
        self.status == "UP"
    }
}

/// Entry of `GET /api/organisations/all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
}

/// Entry of `GET /api/collaborations/all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaboration {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub organisation_id: Option<i64>,
}

/// `GET /api/collaborations/{id}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationDetail {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub organisation_id: Option<i64>,
    #[serde(default)]
    pub collaboration_memberships: Vec<Membership>,
    #[serde(default)]
    pub authorisation_groups: Vec<AuthorisationGroup>,
    #[serde(default)]
    pub services: Vec<Service>,
}

/// A user's membership of a collaboration or group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: i64,
    pub role: String,
    /// Absent means active.
    #[serde(default)]
    pub status: Option<String>,
    pub user: User,
}

impl Membership {
    /// Whether the membership counts as active.
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .map_or(true, |s| s.eq_ignore_ascii_case("active"))
    }

    /// Whether the member administers the collaboration.
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// The user behind a membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub ssh_keys: Vec<SshKey>,
}

/// A public SSH key registered by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKey {
    pub ssh_value: String,
}

/// Authorisation group reference inside a collaboration detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorisationGroup {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
}

impl AuthorisationGroup {
    /// Label used in group roles: the short name, or the name when absent.
    pub fn label(&self) -> &str {
        self.short_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name)
    }
}

/// `GET /api/groups/{id}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDetail {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub collaboration_memberships: Vec<Membership>,
}

impl GroupDetail {
    /// Label used in group roles: the short name, or the name when absent.
    pub fn label(&self) -> &str {
        self.short_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name)
    }
}

/// A service connected to a collaboration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub entity_id: String,
    #[serde(default)]
    pub name: Option<String>,
}
