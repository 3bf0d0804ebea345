//! Diff engine
//!
//! Decides whether a proposed attribute set requires a create, a modify or
//! nothing at all, and builds the modification list for a modify.
//!
//! An attribute present on both sides only counts as modified when the two
//! value sets share no value at all. A multi-valued attribute that merely gained
//! or lost a value is therefore not enough to trigger a modify on its own.
//! When a modify is triggered by another key, the full modification list still
//! rewrites every differing attribute.

use std::collections::HashSet;

use crate::attributes::AttributeSet;

/// A single change inside a modify operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification {
    /// Add an attribute that is not present yet.
    Add { attribute: String, values: Vec<String> },
    /// Replace all values of an attribute.
    Replace { attribute: String, values: Vec<String> },
    /// Remove an attribute with all its values.
    Delete { attribute: String },
}

impl Modification {
    /// The attribute this change touches.
    pub fn attribute(&self) -> &str {
        match self {
            Modification::Add { attribute, .. }
            | Modification::Replace { attribute, .. }
            | Modification::Delete { attribute } => attribute,
        }
    }
}

impl std::fmt::Display for Modification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modification::Add { attribute, values } => {
                write!(f, "add {}: [{}]", attribute, values.join(", "))
            }
            Modification::Replace { attribute, values } => {
                write!(f, "replace {}: [{}]", attribute, values.join(", "))
            }
            Modification::Delete { attribute } => write!(f, "delete {}", attribute),
        }
    }
}

/// Render a modification list for error reports.
pub fn describe(changes: &[Modification]) -> String {
    let parts: Vec<String> = changes.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join("; "))
}

/// Key-level comparison of a proposed set against the stored one.
///
/// Attribute names are folded to lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    pub same: Vec<String>,
}

impl AttributeDiff {
    /// Compare `proposed` against `current`.
    pub fn compute(proposed: &AttributeSet, current: &AttributeSet) -> Self {
        let ours = proposed.folded_names();
        let theirs = current.folded_names();

        let mut added: Vec<String> = ours.difference(&theirs).cloned().collect();
        let mut removed: Vec<String> = theirs.difference(&ours).cloned().collect();
        let mut modified = Vec::new();
        let mut same = Vec::new();

        for name in ours.intersection(&theirs) {
            let a = value_set(proposed, name);
            let b = value_set(current, name);
            if a.is_disjoint(&b) {
                modified.push(name.clone());
            } else {
                same.push(name.clone());
            }
        }

        added.sort();
        removed.sort();
        modified.sort();
        same.sort();

        Self {
            added,
            removed,
            modified,
            same,
        }
    }

    /// True when nothing was added, removed or modified.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

fn value_set<'a>(set: &'a AttributeSet, name: &str) -> HashSet<&'a str> {
    set.get(name)
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .collect()
}

/// What to do with an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The entry does not exist yet.
    Create,
    /// The entry exists and diverges; apply these changes.
    Modify(Vec<Modification>),
    /// The entry exists and is considered in sync.
    NoOp,
}

/// Decide between create, modify and no-op.
pub fn decide(proposed: &AttributeSet, current: Option<&AttributeSet>) -> Decision {
    let Some(current) = current else {
        return Decision::Create;
    };

    if AttributeDiff::compute(proposed, current).is_unchanged() {
        Decision::NoOp
    } else {
        Decision::Modify(modification_list(current, proposed))
    }
}

/// Full modification list turning `old` into `new`.
///
/// Attributes only in `new` are added, attributes only in `old` are deleted and
/// attributes whose value sets differ are replaced.
pub fn modification_list(old: &AttributeSet, new: &AttributeSet) -> Vec<Modification> {
    let mut changes = Vec::new();

    for (name, values) in new.iter() {
        match old.get(name) {
            None => changes.push(Modification::Add {
                attribute: name.clone(),
                values: values.clone(),
            }),
            Some(previous) => {
                let before: HashSet<&str> = previous.iter().map(String::as_str).collect();
                let after: HashSet<&str> = values.iter().map(String::as_str).collect();
                if before != after {
                    changes.push(Modification::Replace {
                        attribute: name.clone(),
                        values: values.clone(),
                    });
                }
            }
        }
    }

    for name in old.names() {
        if !new.has(name) {
            changes.push(Modification::Delete {
                attribute: name.to_string(),
            });
        }
    }

    changes
}
