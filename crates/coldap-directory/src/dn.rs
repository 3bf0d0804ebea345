//! Directory addresses
//!
//! Every managed address is a deterministic function of the configured base
//! and the entity identity:
//!
//! ```text
//! o=<name>,<base>
//! ou=People,o=<name>,<base>      uid=<uid>,ou=People,o=<name>,<base>
//! ou=Groups,o=<name>,<base>      cn=<role>,ou=Groups,o=<name>,<base>
//! ```

/// Name of the container holding person entries.
pub const PEOPLE_OU: &str = "People";

/// Name of the container holding group entries.
pub const GROUPS_OU: &str = "Groups";

/// RFC 4514 escaping of an RDN value, so collaboration names such as
/// `R&D, Physics` or ` #1` stay a single RDN.
pub fn escape_dn_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len() * 2);

    for (i, ch) in value.chars().enumerate() {
        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '\0' => escaped.push_str("\\00"),
            ' ' if i == 0 || i == last => escaped.push_str("\\20"),
            '#' if i == 0 => escaped.push_str("\\23"),
            _ => escaped.push(ch),
        }
    }

    escaped
}

/// Build `<attr>=<escaped value>,<parent>`.
pub fn child_dn(attribute: &str, value: &str, parent: &str) -> String {
    format!("{}={},{}", attribute, escape_dn_value(value), parent)
}

/// The parent of an address, or `None` for a single-RDN address.
pub fn parent_dn(dn: &str) -> Option<&str> {
    let mut escaped = false;
    for (i, ch) in dn.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            ',' => return Some(dn[i + 1..].trim_start()),
            _ => {}
        }
    }
    None
}

/// The leading RDN of an address, e.g. `ou=People`.
pub fn leading_rdn(dn: &str) -> &str {
    match parent_dn(dn) {
        Some(parent) => {
            let cut = dn.len() - parent.len();
            dn[..cut].trim_end().trim_end_matches(',')
        }
        None => dn,
    }
}

/// Canonical form used to compare addresses.
pub fn normalize_dn(dn: &str) -> String {
    let mut parts = Vec::new();
    let mut rest = dn;
    loop {
        let rdn = leading_rdn(rest);
        parts.push(rdn.trim().to_ascii_lowercase());
        match parent_dn(rest) {
            Some(parent) => rest = parent,
            None => break,
        }
    }
    parts.join(",")
}

/// Whether two addresses name the same entry.
pub fn same_dn(a: &str, b: &str) -> bool {
    normalize_dn(a) == normalize_dn(b)
}

/// Whether the address is one of the fixed People/Groups containers.
pub fn is_container(dn: &str) -> bool {
    let rdn = leading_rdn(dn);
    rdn.eq_ignore_ascii_case(&format!("ou={}", PEOPLE_OU))
        || rdn.eq_ignore_ascii_case(&format!("ou={}", GROUPS_OU))
}

/// Addresses belonging to one managed organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgAddress {
    name: String,
    dn: String,
}

impl OrgAddress {
    /// Address of the organization `name` under `base`.
    pub fn new(base: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            dn: child_dn("o", name, base),
        }
    }

    /// The organization name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The organization entry itself.
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// The People container.
    pub fn people(&self) -> String {
        child_dn("ou", PEOPLE_OU, &self.dn)
    }

    /// The Groups container.
    pub fn groups(&self) -> String {
        child_dn("ou", GROUPS_OU, &self.dn)
    }

    /// A person inside the People container.
    pub fn person(&self, uid: &str) -> String {
        child_dn("uid", uid, &self.people())
    }

    /// A group inside the Groups container.
    pub fn group(&self, role: &str) -> String {
        child_dn("cn", role, &self.groups())
    }
}
