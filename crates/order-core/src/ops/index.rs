use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::ops::{Deref, DerefMut};

use super::relations::RelationManager;
use crate::errors::{OrderError, Result};
use crate::model::identity::{validate_name, IdSpec, IdentityKey, Kind, ObjectRef};
use crate::model::{FromIdentity, HasIdentity, IdentityAccess, IndexId, UniqueObject};

/// Largest id an index hands out; ids are stored as non-negative `i64`
pub const MAX_ID: u64 = i64::MAX.unsigned_abs();

/// How auto ids are assigned after removals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdPolicy {
    /// Removed ids are retired for the lifetime of the index
    #[default]
    NeverReuse,
    /// Auto ids take the lowest id not currently in use
    ReuseLowestFree,
}

/// UniqueObjectIndex - registry of all objects of one kind
///
/// Objects are reachable by name and by id. Both lookup paths are updated
/// together and iteration follows insertion order, stable across removals of
/// other objects.
///
/// Mutating operations either succeed completely or leave the index
/// untouched.
#[derive(Debug, Clone)]
pub struct UniqueObjectIndex<T> {
    index_id: IndexId,
    kind: Kind,
    policy: IdPolicy,
    objects: IndexMap<String, T>,
    ids: HashMap<u64, String>,
    next_id: u64,
    retired: BTreeSet<u64>,
}

impl<T: HasIdentity> UniqueObjectIndex<T> {
    /// Create an empty index for `kind` with the default id policy
    pub fn new(kind: Kind) -> Self {
        Self::with_policy(kind, IdPolicy::default())
    }

    pub fn with_policy(kind: Kind, policy: IdPolicy) -> Self {
        Self {
            index_id: IndexId::next(),
            kind,
            policy,
            objects: IndexMap::new(),
            ids: HashMap::new(),
            next_id: 0,
            retired: BTreeSet::new(),
        }
    }

    pub fn index_id(&self) -> IndexId {
        self.index_id
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn policy(&self) -> IdPolicy {
        self.policy
    }

    /// Register an object, resolving an auto id
    ///
    /// # Errors
    ///
    /// - `KindMismatch` if the object is of another kind
    /// - `AlreadyRegistered` if another index owns the object
    /// - `DuplicateObject` if the name or id is taken (or retired)
    /// - `InvalidIdentity` if an auto id is requested once every id up to
    ///   [`MAX_ID`] has been handed out
    pub fn add(&mut self, mut object: T) -> Result<&T> {
        if object.kind() != &self.kind {
            return Err(OrderError::KindMismatch {
                expected: self.kind.to_string(),
                found: object.kind().to_string(),
            });
        }
        if object.is_registered() {
            return Err(OrderError::AlreadyRegistered {
                kind: self.kind.to_string(),
                name: object.name().to_string(),
            });
        }

        let name = object.name().to_string();
        if self.objects.contains_key(&name) {
            return Err(self.duplicate(ObjectRef::Name(name)));
        }

        let id = match object.identity().id() {
            IdSpec::Auto => self.next_free_id().ok_or_else(|| OrderError::InvalidIdentity {
                kind: self.kind.to_string(),
                name: name.clone(),
                reason: format!("no free id left up to {}", MAX_ID),
            })?,
            IdSpec::Explicit(_) => {
                let id = object.id().ok_or_else(|| OrderError::Internal {
                    message: format!("unresolvable id on {}", object.identity()),
                })?;
                if self.ids.contains_key(&id)
                    || (self.policy == IdPolicy::NeverReuse && self.retired.contains(&id))
                {
                    return Err(self.duplicate(ObjectRef::Id(id)));
                }
                id
            }
        };

        let unique = object.unique_mut(IdentityAccess::grant());
        unique.key_mut().resolve(id)?;
        unique.set_owner(Some(self.index_id));

        self.ids.insert(id, name.clone());
        self.next_id = self.next_id.max(id + 1);
        tracing::debug!(kind = %self.kind, name = %name, id, "registered");

        let (index, _) = self.objects.insert_full(name, object);
        Ok(&self.objects[index])
    }

    /// Construct an object from identity arguments and register it
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentity` for invalid arguments, otherwise the errors
    /// of [`add`](Self::add).
    pub fn add_new(&mut self, name: impl Into<String>, id: impl Into<IdSpec>) -> Result<&T>
    where
        T: FromIdentity,
    {
        let unique = UniqueObject::new(self.kind.clone(), name, id)?;
        self.add(T::from_unique(unique))
    }

    /// Look up by name or id
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotFound` if nothing matches.
    pub fn get(&self, key: impl Into<ObjectRef>) -> Result<&T> {
        let key = key.into();
        match self.locate(&key) {
            Some(index) => Ok(&self.objects[index]),
            None => Err(self.not_found(key)),
        }
    }

    /// Look up by name or id, `None` on a miss
    pub fn find(&self, key: impl Into<ObjectRef>) -> Option<&T> {
        self.locate(&key.into()).map(|index| &self.objects[index])
    }

    /// Mutable access to aux data, tags and domain attributes
    ///
    /// The returned guard keeps the identity fixed; see [`ObjectMut`].
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotFound` if nothing matches.
    pub fn get_mut(&mut self, key: impl Into<ObjectRef>) -> Result<ObjectMut<'_, T>> {
        let key = key.into();
        match self.locate(&key) {
            Some(index) => Ok(ObjectMut::new(&mut self.objects[index])),
            None => Err(self.not_found(key)),
        }
    }

    pub fn contains(&self, key: impl Into<ObjectRef>) -> bool {
        self.locate(&key.into()).is_some()
    }

    /// Unregister an object and sever all of its relation edges
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotFound` if nothing matches.
    pub fn remove(&mut self, key: impl Into<ObjectRef>, relations: &mut RelationManager) -> Result<T> {
        let key = key.into();
        let index = self.locate(&key).ok_or_else(|| self.not_found(key))?;

        let node = self.objects[index].node_key();
        relations.cascade_remove(&node);

        let (name, mut object) = self
            .objects
            .shift_remove_index(index)
            .ok_or_else(|| OrderError::Internal {
                message: format!("index position {} vanished", index),
            })?;
        if let Some(id) = object.id() {
            self.ids.remove(&id);
            if self.policy == IdPolicy::NeverReuse {
                self.retired.insert(id);
            }
        }
        object.unique_mut(IdentityAccess::grant()).set_owner(None);
        tracing::debug!(kind = %self.kind, name = %name, "unregistered");
        Ok(object)
    }

    /// Rename an object in place, keeping its position and its edges
    ///
    /// # Errors
    ///
    /// - `ObjectNotFound` if nothing matches
    /// - `InvalidIdentity` if the new name is invalid
    /// - `DuplicateObject` if the new name is taken
    pub fn rename(
        &mut self,
        key: impl Into<ObjectRef>,
        new_name: &str,
        relations: &mut RelationManager,
    ) -> Result<()> {
        let key = key.into();
        let index = self.locate(&key).ok_or_else(|| self.not_found(key))?;
        validate_name(&self.kind, new_name)?;

        let old_node = self.objects[index].node_key();
        if old_node.name == new_name {
            return Ok(());
        }
        if self.objects.contains_key(new_name) {
            return Err(self.duplicate(ObjectRef::Name(new_name.to_string())));
        }

        let (_, mut object) = self
            .objects
            .shift_remove_index(index)
            .ok_or_else(|| OrderError::Internal {
                message: format!("index position {} vanished", index),
            })?;
        object
            .unique_mut(IdentityAccess::grant())
            .key_mut()
            .set_name(new_name.to_string());
        if let Some(id) = object.id() {
            self.ids.insert(id, new_name.to_string());
        }
        let new_node = object.node_key();
        self.objects.shift_insert(index, new_name.to_string(), object);

        relations.rekey(&old_node, &new_node);
        tracing::debug!(kind = %self.kind, old = %old_node.name, new = new_name, "renamed");
        Ok(())
    }

    /// Names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    /// Ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.objects.values().filter_map(|object| object.id())
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Id that the next auto-id registration would receive, `None` once
    /// every id up to [`MAX_ID`] is spent
    pub fn peek_next_id(&self) -> Option<u64> {
        self.next_free_id()
    }

    /// Retired ids (only filled under [`IdPolicy::NeverReuse`])
    pub fn retired_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.retired.iter().copied()
    }

    /// Name reached through the id path, for consistency checks
    pub(crate) fn name_of_id(&self, id: u64) -> Option<&str> {
        self.ids.get(&id).map(String::as_str)
    }

    pub(crate) fn id_count(&self) -> usize {
        self.ids.len()
    }

    /// Drop a just-added object without retiring its id
    pub(crate) fn undo_add(&mut self, name: &str, previous_next_id: u64) -> Option<T> {
        let mut object = self.objects.shift_remove(name)?;
        if let Some(id) = object.id() {
            self.ids.remove(&id);
        }
        self.next_id = previous_next_id;
        object.unique_mut(IdentityAccess::grant()).set_owner(None);
        Some(object)
    }

    pub(crate) fn next_id_counter(&self) -> u64 {
        self.next_id
    }

    fn next_free_id(&self) -> Option<u64> {
        match self.policy {
            IdPolicy::NeverReuse => Some(self.next_id).filter(|id| *id <= MAX_ID),
            IdPolicy::ReuseLowestFree => (0..=MAX_ID).find(|id| !self.ids.contains_key(id)),
        }
    }

    fn locate(&self, key: &ObjectRef) -> Option<usize> {
        match key {
            ObjectRef::Name(name) => self.objects.get_index_of(name),
            ObjectRef::Id(id) => self
                .ids
                .get(id)
                .and_then(|name| self.objects.get_index_of(name)),
        }
    }

    fn not_found(&self, key: ObjectRef) -> OrderError {
        OrderError::ObjectNotFound {
            kind: self.kind.to_string(),
            key,
        }
    }

    fn duplicate(&self, key: ObjectRef) -> OrderError {
        OrderError::DuplicateObject {
            kind: self.kind.to_string(),
            key,
        }
    }
}

/// Guard returned by [`UniqueObjectIndex::get_mut`]
///
/// Dereferences to the registered object so auxiliary data, tags and domain
/// attributes can be edited in place. The identity and owner are put back
/// when the guard drops, even if the object was replaced wholesale; names
/// change through [`UniqueObjectIndex::rename`] only.
pub struct ObjectMut<'a, T: HasIdentity> {
    object: &'a mut T,
    key: IdentityKey,
    owner: Option<IndexId>,
}

impl<'a, T: HasIdentity> ObjectMut<'a, T> {
    fn new(object: &'a mut T) -> Self {
        let key = object.identity().clone();
        let owner = object.unique().owner();
        Self { object, key, owner }
    }
}

impl<T: HasIdentity> Deref for ObjectMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.object
    }
}

impl<T: HasIdentity> DerefMut for ObjectMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.object
    }
}

impl<T: HasIdentity> Drop for ObjectMut<'_, T> {
    fn drop(&mut self) {
        let unique = self.object.unique_mut(IdentityAccess::grant());
        if unique.key() != &self.key {
            tracing::debug!(kept = %self.key, discarded = %unique.key(), "identity change discarded");
            *unique.key_mut() = self.key.clone();
        }
        unique.set_owner(self.owner);
    }
}

impl<T: HasIdentity + std::fmt::Debug> std::fmt::Debug for ObjectMut<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ObjectMut").field(&self.object).finish()
    }
}

impl<'a, T> IntoIterator for &'a UniqueObjectIndex<T> {
    type Item = &'a T;
    type IntoIter = indexmap::map::Values<'a, String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.values()
    }
}
