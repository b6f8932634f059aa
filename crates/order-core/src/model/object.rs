use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use super::aux_store::AuxStore;
use super::identity::{IdSpec, IdentityKey, Kind, NodeKey};
use super::tags::TagSet;
use crate::errors::Result;
use crate::ops::relations::RelationDecl;

static NEXT_INDEX_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a [`UniqueObjectIndex`](crate::ops::UniqueObjectIndex)
///
/// Objects keep the id of their owning index as a weak back-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexId(u64);

impl IndexId {
    pub(crate) fn next() -> Self {
        Self(NEXT_INDEX_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// UniqueObject - identity, auxiliary data and tags shared by every entity
///
/// Domain kinds embed a `UniqueObject` and expose it through the capability
/// traits ([`HasIdentity`], [`HasAux`], [`HasTags`]), usually via the
/// [`unique_object!`](crate::unique_object) macro.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueObject {
    key: IdentityKey,
    aux: AuxStore,
    tags: TagSet,
    owner: Option<IndexId>,
}

impl UniqueObject {
    /// Create a new, unregistered object
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentity` if the name or id fails validation.
    pub fn new(kind: Kind, name: impl Into<String>, id: impl Into<IdSpec>) -> Result<Self> {
        Ok(Self::from_key(IdentityKey::normalize(kind, name, id)?))
    }

    pub(crate) fn from_key(key: IdentityKey) -> Self {
        Self {
            key,
            aux: AuxStore::new(),
            tags: TagSet::new(),
            owner: None,
        }
    }

    /// Replace the initial auxiliary data
    pub fn with_aux(mut self, aux: AuxStore) -> Self {
        self.aux = aux;
        self
    }

    /// Set one initial auxiliary value
    ///
    /// # Errors
    ///
    /// Returns `AuxiliaryPathConflict` if the path runs through a scalar.
    pub fn with_aux_value<S: AsRef<str>>(mut self, path: &[S], value: Value) -> Result<Self> {
        self.aux.set(path, value)?;
        Ok(self)
    }

    /// Add initial tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags);
        self
    }

    pub fn key(&self) -> &IdentityKey {
        &self.key
    }

    /// The index currently owning this object, if any
    pub fn owner(&self) -> Option<IndexId> {
        self.owner
    }

    pub(crate) fn key_mut(&mut self) -> &mut IdentityKey {
        &mut self.key
    }

    pub(crate) fn set_owner(&mut self, owner: Option<IndexId>) {
        self.owner = owner;
    }
}

/// Permission to mutate identity-bearing state
///
/// Only this crate can construct one, so any type may implement
/// [`HasIdentity::unique_mut`] but only the registry can call it. Names and
/// ids of registered objects change through
/// [`UniqueObjectIndex`](crate::ops::UniqueObjectIndex) alone.
///
/// ```compile_fail
/// use order_core::model::IdentityAccess;
///
/// let access = IdentityAccess(());
/// ```
#[derive(Debug)]
pub struct IdentityAccess(());

impl IdentityAccess {
    pub(crate) const fn grant() -> Self {
        Self(())
    }
}

/// Capability: globally unique identity
pub trait HasIdentity {
    fn unique(&self) -> &UniqueObject;

    fn unique_mut(&mut self, access: IdentityAccess) -> &mut UniqueObject;

    fn identity(&self) -> &IdentityKey {
        self.unique().key()
    }

    fn kind(&self) -> &Kind {
        self.identity().kind()
    }

    fn name(&self) -> &str {
        self.identity().name()
    }

    /// Resolved numeric id (None while still `Auto`)
    fn id(&self) -> Option<u64> {
        self.identity().resolved_id()
    }

    fn node_key(&self) -> NodeKey {
        self.identity().node_key()
    }

    fn is_registered(&self) -> bool {
        self.unique().owner().is_some()
    }
}

/// Capability: auxiliary data
pub trait HasAux {
    fn aux(&self) -> &AuxStore;

    fn aux_mut(&mut self) -> &mut AuxStore;
}

/// Capability: string tags
pub trait HasTags {
    fn tags(&self) -> &TagSet;

    fn tags_mut(&mut self) -> &mut TagSet;

    fn has_tag(&self, tag: &str) -> bool {
        self.tags().has(tag)
    }

    fn add_tag(&mut self, tag: impl Into<String>) -> bool
    where
        Self: Sized,
    {
        self.tags_mut().add(tag)
    }

    fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags_mut().remove(tag)
    }
}

/// Capability: participation in declared relations
///
/// A kind lists the relations it takes part in so that a
/// [`RelationRegistry`](crate::ops::RelationRegistry) can declare them all
/// with `declare_for::<Kind>()`.
pub trait HasRelations: HasIdentity {
    fn relation_decls() -> Vec<RelationDecl>
    where
        Self: Sized;
}

/// Construction of a kind from a validated [`UniqueObject`]
///
/// Used by [`UniqueObjectIndex::add_new`](crate::ops::UniqueObjectIndex::add_new)
/// to build objects from construction arguments.
pub trait FromIdentity: HasIdentity {
    fn from_unique(unique: UniqueObject) -> Self;
}

/// Bundle of the data capabilities every registry entry offers
pub trait Entity: HasIdentity + HasAux + HasTags + Clone {}

impl<T: HasIdentity + HasAux + HasTags + Clone> Entity for T {}

impl HasIdentity for UniqueObject {
    fn unique(&self) -> &UniqueObject {
        self
    }

    fn unique_mut(&mut self, _access: IdentityAccess) -> &mut UniqueObject {
        self
    }
}

impl HasAux for UniqueObject {
    fn aux(&self) -> &AuxStore {
        &self.aux
    }

    fn aux_mut(&mut self) -> &mut AuxStore {
        &mut self.aux
    }
}

impl HasTags for UniqueObject {
    fn tags(&self) -> &TagSet {
        &self.tags
    }

    fn tags_mut(&mut self) -> &mut TagSet {
        &mut self.tags
    }
}

impl FromIdentity for UniqueObject {
    fn from_unique(unique: UniqueObject) -> Self {
        unique
    }
}

/// Implement the data capabilities for a struct embedding a `UniqueObject`
///
/// # Example
///
/// ```
/// use order_core::model::{HasIdentity, HasTags, Kind, UniqueObject};
/// use order_core::unique_object;
///
/// #[derive(Debug, Clone)]
/// struct Shift {
///     unique: UniqueObject,
///     up: bool,
/// }
///
/// unique_object!(Shift, unique);
///
/// let mut shift = Shift {
///     unique: UniqueObject::new(Kind::new("shift"), "jes_up", 0i64).unwrap(),
///     up: true,
/// };
/// shift.add_tag("jes");
/// assert_eq!(shift.name(), "jes_up");
/// assert!(shift.has_tag("jes"));
/// ```
#[macro_export]
macro_rules! unique_object {
    ($ty:ty, $field:ident) => {
        impl $crate::model::HasIdentity for $ty {
            fn unique(&self) -> &$crate::model::UniqueObject {
                &self.$field
            }

            fn unique_mut(
                &mut self,
                _access: $crate::model::IdentityAccess,
            ) -> &mut $crate::model::UniqueObject {
                &mut self.$field
            }
        }

        impl $crate::model::HasAux for $ty {
            fn aux(&self) -> &$crate::model::AuxStore {
                $crate::model::HasAux::aux(&self.$field)
            }

            fn aux_mut(&mut self) -> &mut $crate::model::AuxStore {
                $crate::model::HasAux::aux_mut(&mut self.$field)
            }
        }

        impl $crate::model::HasTags for $ty {
            fn tags(&self) -> &$crate::model::TagSet {
                $crate::model::HasTags::tags(&self.$field)
            }

            fn tags_mut(&mut self) -> &mut $crate::model::TagSet {
                $crate::model::HasTags::tags_mut(&mut self.$field)
            }
        }
    };
}
