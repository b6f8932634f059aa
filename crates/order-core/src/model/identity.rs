use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::errors::{OrderError, Result};

/// Separator used by hierarchical path lookups (`"a.b.c"`)
pub const PATH_SEPARATOR: char = '.';

/// Characters that may never appear in an object name
pub const RESERVED_NAME_CHARS: [char; 2] = [PATH_SEPARATOR, '/'];

/// Kind - the type tag of a domain entity
///
/// Kinds form an open set: the built-in domain kinds use static constants,
/// library users can create their own with [`Kind::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(Cow<'static, str>);

impl Kind {
    /// Create a kind from a static string (usable in constants)
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create a kind from any string
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Requested id of an object
///
/// `Auto` is the reserved sentinel meaning "assign the next free id of the
/// owning index". It is replaced by `Explicit` once the object is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IdSpec {
    #[default]
    Auto,
    Explicit(i64),
}

impl From<i64> for IdSpec {
    fn from(id: i64) -> Self {
        IdSpec::Explicit(id)
    }
}

impl From<u32> for IdSpec {
    fn from(id: u32) -> Self {
        IdSpec::Explicit(i64::from(id))
    }
}

/// Identity of an object: `(kind, name, id)`
///
/// Assigned at construction and immutable from outside the crate. Only the
/// owning index resolves an auto id or re-keys a name on rename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    kind: Kind,
    name: String,
    id: IdSpec,
}

impl IdentityKey {
    /// Validate and build an identity key
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentity` if the name is empty, padded with
    /// whitespace or contains a reserved separator, or if the id is negative.
    pub fn normalize(kind: Kind, name: impl Into<String>, id: impl Into<IdSpec>) -> Result<Self> {
        let name = name.into();
        let id = id.into();

        validate_name(&kind, &name)?;

        if let IdSpec::Explicit(value) = id {
            if value < 0 {
                return Err(OrderError::InvalidIdentity {
                    kind: kind.to_string(),
                    name,
                    reason: format!("id must be non-negative, got {}", value),
                });
            }
        }

        Ok(Self { kind, name, id })
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> IdSpec {
        self.id
    }

    /// The numeric id, once it is no longer the auto sentinel
    pub fn resolved_id(&self) -> Option<u64> {
        match self.id {
            IdSpec::Auto => None,
            IdSpec::Explicit(value) => u64::try_from(value).ok(),
        }
    }

    /// Name-based identity used by the relation manager
    pub fn node_key(&self) -> NodeKey {
        NodeKey {
            kind: self.kind.clone(),
            name: self.name.clone(),
        }
    }

    /// Replace the auto sentinel with a concrete id
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentity` if `id` does not fit the signed id range.
    pub(crate) fn resolve(&mut self, id: u64) -> Result<()> {
        let id = i64::try_from(id).map_err(|_| OrderError::InvalidIdentity {
            kind: self.kind.to_string(),
            name: self.name.clone(),
            reason: format!("id {} exceeds the largest id {}", id, i64::MAX),
        })?;
        self.id = IdSpec::Explicit(id);
        Ok(())
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resolved_id() {
            Some(id) => write!(f, "{}:{}#{}", self.kind, self.name, id),
            None => write!(f, "{}:{}#auto", self.kind, self.name),
        }
    }
}

/// Validate an object name for the given kind
///
/// # Errors
///
/// Returns `InvalidIdentity` when the name is empty, has leading or trailing
/// whitespace, or contains one of [`RESERVED_NAME_CHARS`].
pub fn validate_name(kind: &Kind, name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name cannot be empty".to_string())
    } else if name.trim() != name {
        Some("name cannot have leading or trailing whitespace".to_string())
    } else if let Some(c) = name.chars().find(|c| RESERVED_NAME_CHARS.contains(c)) {
        Some(format!("name cannot contain reserved character '{}'", c))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(OrderError::InvalidIdentity {
            kind: kind.to_string(),
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Dual-path lookup key: by name or by resolved id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    Name(String),
    Id(u64),
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Name(name) => write!(f, "name={}", name),
            ObjectRef::Id(id) => write!(f, "id={}", id),
        }
    }
}

impl From<&str> for ObjectRef {
    fn from(name: &str) -> Self {
        ObjectRef::Name(name.to_string())
    }
}

impl From<String> for ObjectRef {
    fn from(name: String) -> Self {
        ObjectRef::Name(name)
    }
}

impl From<&String> for ObjectRef {
    fn from(name: &String) -> Self {
        ObjectRef::Name(name.clone())
    }
}

impl From<u64> for ObjectRef {
    fn from(id: u64) -> Self {
        ObjectRef::Id(id)
    }
}

/// Name-based identity `(kind, name)` of a registered object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub kind: Kind,
    pub name: String,
}

impl NodeKey {
    pub fn new(kind: Kind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAT: Kind = Kind::from_static("category");

    #[test]
    fn test_normalize_accepts_auto_and_explicit() {
        let auto = IdentityKey::normalize(CAT, "ee", IdSpec::Auto).unwrap();
        assert_eq!(auto.resolved_id(), None);

        let explicit = IdentityKey::normalize(CAT, "mumu", 7i64).unwrap();
        assert_eq!(explicit.resolved_id(), Some(7));
        assert_eq!(explicit.to_string(), "category:mumu#7");
    }

    #[test]
    fn test_normalize_rejects_bad_names() {
        for name in ["", " ee", "ee ", "a.b", "a/b"] {
            let result = IdentityKey::normalize(CAT, name, IdSpec::Auto);
            assert!(
                matches!(result, Err(OrderError::InvalidIdentity { .. })),
                "name {:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_normalize_rejects_negative_id() {
        let result = IdentityKey::normalize(CAT, "ee", -3i64);
        assert!(matches!(result, Err(OrderError::InvalidIdentity { .. })));
    }

    #[test]
    fn test_kind_equality_ignores_storage() {
        assert_eq!(Kind::new("category"), CAT);
    }

    #[test]
    fn test_object_ref_display() {
        assert_eq!(ObjectRef::from("2016").to_string(), "name=2016");
        assert_eq!(ObjectRef::from(3u64).to_string(), "id=3");
    }
}
