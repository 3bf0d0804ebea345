//! Search filters
//!
//! The small subset of RFC 4515 filters the sync needs, rendered to LDAP
//! syntax for the server and evaluated directly by the in-memory directory.

use crate::attributes::{AttributeSet, OBJECT_CLASS};

/// Filter for one-level searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Match entries where attribute equals value (ASCII case-insensitive).
    Equals { attribute: String, value: String },

    /// Match entries where the attribute has any value.
    Present { attribute: String },

    /// Logical AND of multiple filters.
    And { filters: Vec<Filter> },
}

impl Filter {
    /// Create an equals filter.
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a presence filter.
    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// Create an AND filter.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    /// Match entries of the given object class.
    pub fn object_class(class: impl Into<String>) -> Self {
        Self::eq(OBJECT_CLASS, class)
    }

    /// Match any entry.
    pub fn any() -> Self {
        Self::present(OBJECT_CLASS)
    }

    /// Render as an LDAP filter string.
    pub fn to_ldap(&self) -> String {
        match self {
            Filter::Equals { attribute, value } => {
                format!("({}={})", attribute, escape_filter_value(value))
            }
            Filter::Present { attribute } => format!("({}=*)", attribute),
            Filter::And { filters } => {
                let inner: Vec<String> = filters.iter().map(Filter::to_ldap).collect();
                format!("(&{})", inner.join(""))
            }
        }
    }

    /// Evaluate against an attribute set.
    pub fn matches(&self, attrs: &AttributeSet) -> bool {
        match self {
            Filter::Equals { attribute, value } => attrs.contains_value(attribute, value),
            Filter::Present { attribute } => attrs.has(attribute),
            Filter::And { filters } => filters.iter().all(|f| f.matches(attrs)),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_ldap())
    }
}

/// Escape special characters in LDAP filter values (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}
