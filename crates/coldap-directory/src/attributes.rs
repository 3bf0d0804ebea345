//! Canonical attribute sets and the attribute mapper
//!
//! The mapper turns an explicit, ordered list of `(attribute, value)` pairs into
//! the canonical [`AttributeSet`] that is used as desired state when diffing
//! against the directory.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Literal written in place of an absent or empty value, so required
/// attributes are always accepted by the directory.
pub const SENTINEL: &str = "n/a";

/// Attributes that require an auxiliary object class on the entry.
///
/// Injection into `objectClass` happens in table order.
pub const AUXILIARY_CLASSES: &[(&str, &str)] = &[
    ("labeledURI", "labeledURIObject"),
    ("sshPublicKey", "ldapPublicKey"),
    ("eduPersonPrincipalName", "eduPerson"),
    ("voPersonExternalID", "voPerson"),
];

/// Name of the object class attribute.
pub const OBJECT_CLASS: &str = "objectClass";

/// A value handed to the mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeInput {
    /// No value.
    Absent,
    /// A single value.
    Scalar(String),
    /// Multiple values, in order.
    List(Vec<String>),
}

impl AttributeInput {
    /// Values after sentinel substitution and scalar promotion.
    fn into_values(self) -> Vec<String> {
        let values = match self {
            AttributeInput::Absent => Vec::new(),
            AttributeInput::Scalar(s) if s.is_empty() => Vec::new(),
            AttributeInput::Scalar(s) => vec![s],
            AttributeInput::List(list) => list.into_iter().filter(|v| !v.is_empty()).collect(),
        };
        if values.is_empty() {
            vec![SENTINEL.to_string()]
        } else {
            values
        }
    }
}

impl From<&str> for AttributeInput {
    fn from(s: &str) -> Self {
        AttributeInput::Scalar(s.to_string())
    }
}

impl From<String> for AttributeInput {
    fn from(s: String) -> Self {
        AttributeInput::Scalar(s)
    }
}

impl From<&String> for AttributeInput {
    fn from(s: &String) -> Self {
        AttributeInput::Scalar(s.clone())
    }
}

impl<T: Into<AttributeInput>> From<Option<T>> for AttributeInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(AttributeInput::Absent, Into::into)
    }
}

impl From<Vec<String>> for AttributeInput {
    fn from(list: Vec<String>) -> Self {
        AttributeInput::List(list)
    }
}

impl From<Vec<&str>> for AttributeInput {
    fn from(list: Vec<&str>) -> Self {
        AttributeInput::List(list.into_iter().map(str::to_string).collect())
    }
}

/// Mapping from attribute name to an ordered, deduplicated list of values.
///
/// Attribute names are matched case-insensitively, the way the directory
/// treats them; the spelling of the first insert is kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeSet {
    #[serde(flatten)]
    attributes: BTreeMap<String, Vec<String>>,
}

impl AttributeSet {
    /// Create a new empty attribute set.
    pub fn new() -> Self {
        Self {
            attributes: BTreeMap::new(),
        }
    }

    fn key_for(&self, name: &str) -> Option<&String> {
        self.attributes
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
    }

    /// Append a value unless it is already present.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let key = self
            .key_for(name)
            .cloned()
            .unwrap_or_else(|| name.to_string());
        let values = self.attributes.entry(key).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    /// Append a value using builder pattern.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    /// Replace all values of an attribute.
    pub fn set(&mut self, name: &str, values: impl IntoIterator<Item = impl Into<String>>) {
        self.remove(name);
        for value in values {
            self.append(name, value);
        }
    }

    /// Get the values of an attribute.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.key_for(name)
            .and_then(|k| self.attributes.get(k))
            .map(Vec::as_slice)
    }

    /// Get the first value of an attribute.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Check if an attribute carries a value, ignoring ASCII case.
    pub fn contains_value(&self, name: &str, value: &str) -> bool {
        self.get(name)
            .is_some_and(|values| values.iter().any(|v| v.eq_ignore_ascii_case(value)))
    }

    /// Check if an attribute exists.
    pub fn has(&self, name: &str) -> bool {
        self.key_for(name).is_some()
    }

    /// Remove an attribute.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        let key = self.key_for(name).cloned()?;
        self.attributes.remove(&key)
    }

    /// Remove a single value; drops the attribute when no value is left.
    pub fn remove_value(&mut self, name: &str, value: &str) -> bool {
        let Some(key) = self.key_for(name).cloned() else {
            return false;
        };
        let mut removed = false;
        if let Some(values) = self.attributes.get_mut(&key) {
            let before = values.len();
            values.retain(|v| !v.eq_ignore_ascii_case(value));
            removed = values.len() != before;
            if values.is_empty() {
                self.attributes.remove(&key);
            }
        }
        removed
    }

    /// Get all attribute names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Attribute names folded to lowercase, for set arithmetic.
    pub fn folded_names(&self) -> HashSet<String> {
        self.attributes.keys().map(|k| k.to_ascii_lowercase()).collect()
    }

    /// Get the number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate over all attributes.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.attributes.iter()
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        if self.folded_names() != other.folded_names() {
            return false;
        }
        self.iter().all(|(name, values)| {
            let ours: HashSet<&str> = values.iter().map(String::as_str).collect();
            let theirs: HashSet<&str> = other
                .get(name)
                .unwrap_or_default()
                .iter()
                .map(String::as_str)
                .collect();
            ours == theirs
        })
    }
}

impl Eq for AttributeSet {}

impl FromIterator<(String, Vec<String>)> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        let mut set = AttributeSet::new();
        for (name, values) in iter {
            for value in values {
                set.append(&name, value);
            }
        }
        set
    }
}

impl std::fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (name, values)) in self.attributes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: [{}]", name, values.join(", "))?;
        }
        write!(f, "}}")
    }
}

/// Builds canonical attribute sets from ordered `(name, value)` pairs.
#[derive(Debug, Clone)]
pub struct AttributeMapper {
    auxiliary_classes: Vec<(String, String)>,
}

impl Default for AttributeMapper {
    fn default() -> Self {
        Self::with_table(AUXILIARY_CLASSES)
    }
}

impl AttributeMapper {
    /// Create a mapper with the default auxiliary class table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mapper with a custom auxiliary class table.
    pub fn with_table(table: &[(&str, &str)]) -> Self {
        Self {
            auxiliary_classes: table
                .iter()
                .map(|(attr, class)| (attr.to_string(), class.to_string()))
                .collect(),
        }
    }

    /// Map the pairs to a canonical attribute set.
    pub fn map<I, N, V>(&self, pairs: I) -> AttributeSet
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<AttributeInput>,
    {
        let mut set = AttributeSet::new();
        for (name, value) in pairs {
            let input: AttributeInput = value.into();
            for v in input.into_values() {
                set.append(name.as_ref(), v);
            }
        }

        for (attribute, class) in &self.auxiliary_classes {
            if set.has(attribute) {
                set.append(OBJECT_CLASS, class.clone());
            }
        }

        set
    }
}
