//! Analysis - aggregate owner of the built-in indices and their relations
//!
//! `Analysis` holds one [`UniqueObjectIndex`] per built-in kind plus the
//! [`RelationManager`] connecting them, and exposes the boundary operations
//! of the registry. Boundary operations log through the operation macros:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Hosts that share an `Analysis` between threads wrap it in a single
//! exclusive lock.

use std::collections::HashSet;

use super::copy::{copy_subtree, copy_with, CopyOptions};
use super::index::{ObjectMut, UniqueObjectIndex};
use super::relations::{Direction, RelationManager};
use crate::config::RegistryConfig;
use crate::errors::{OrderError, Result};
use crate::logging_facility;
use crate::model::identity::{IdSpec, Kind, NodeKey, ObjectRef};
use crate::model::kinds::{
    Campaign, Category, Channel, Dataset, Process, Variable, CAMPAIGN, CATEGORY, CHANNEL,
    DATASET, PROCESS, VARIABLE,
};
use crate::model::{Entity, FromIdentity, HasRelations};
use crate::rules::{invariants, validate_index, validate_relations};
use crate::{log_op_end, log_op_error, log_op_start};

/// A built-in kind stored in an [`Analysis`]
pub trait AnalysisKind: Entity + FromIdentity + HasRelations + Sized {
    const KIND: Kind;

    fn index(analysis: &Analysis) -> &UniqueObjectIndex<Self>;

    /// The kind's index together with the relation manager
    fn parts_mut(analysis: &mut Analysis) -> (&mut UniqueObjectIndex<Self>, &mut RelationManager);
}

macro_rules! analysis_kind {
    ($ty:ty, $kind:expr, $field:ident) => {
        impl AnalysisKind for $ty {
            const KIND: Kind = $kind;

            fn index(analysis: &Analysis) -> &UniqueObjectIndex<Self> {
                &analysis.$field
            }

            fn parts_mut(
                analysis: &mut Analysis,
            ) -> (&mut UniqueObjectIndex<Self>, &mut RelationManager) {
                (&mut analysis.$field, &mut analysis.relations)
            }
        }
    };
}

analysis_kind!(Campaign, CAMPAIGN, campaigns);
analysis_kind!(Dataset, DATASET, datasets);
analysis_kind!(Process, PROCESS, processes);
analysis_kind!(Channel, CHANNEL, channels);
analysis_kind!(Category, CATEGORY, categories);
analysis_kind!(Variable, VARIABLE, variables);

#[derive(Debug, Clone)]
pub struct Analysis {
    config: RegistryConfig,
    campaigns: UniqueObjectIndex<Campaign>,
    datasets: UniqueObjectIndex<Dataset>,
    processes: UniqueObjectIndex<Process>,
    channels: UniqueObjectIndex<Channel>,
    categories: UniqueObjectIndex<Category>,
    variables: UniqueObjectIndex<Variable>,
    relations: RelationManager,
}

impl Analysis {
    /// Build an empty analysis
    ///
    /// Initializes logging when the configuration names a profile.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for inconsistent relation declarations.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        if let Some(profile) = config.log_profile {
            logging_facility::init(profile);
        }
        let relations = RelationManager::new(config.relation_registry()?);
        let policy = config.id_policy;

        Ok(Self {
            campaigns: UniqueObjectIndex::with_policy(CAMPAIGN, policy),
            datasets: UniqueObjectIndex::with_policy(DATASET, policy),
            processes: UniqueObjectIndex::with_policy(PROCESS, policy),
            channels: UniqueObjectIndex::with_policy(CHANNEL, policy),
            categories: UniqueObjectIndex::with_policy(CATEGORY, policy),
            variables: UniqueObjectIndex::with_policy(VARIABLE, policy),
            relations,
            config,
        })
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` for an invalid document.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Self::new(RegistryConfig::from_toml_str(input)?)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn relations(&self) -> &RelationManager {
        &self.relations
    }

    pub fn index<T: AnalysisKind>(&self) -> &UniqueObjectIndex<T> {
        T::index(self)
    }

    pub fn campaigns(&self) -> &UniqueObjectIndex<Campaign> {
        &self.campaigns
    }

    pub fn datasets(&self) -> &UniqueObjectIndex<Dataset> {
        &self.datasets
    }

    pub fn processes(&self) -> &UniqueObjectIndex<Process> {
        &self.processes
    }

    pub fn channels(&self) -> &UniqueObjectIndex<Channel> {
        &self.channels
    }

    pub fn categories(&self) -> &UniqueObjectIndex<Category> {
        &self.categories
    }

    pub fn variables(&self) -> &UniqueObjectIndex<Variable> {
        &self.variables
    }

    /// # Errors
    ///
    /// Returns `ObjectNotFound` if nothing matches.
    pub fn get<T: AnalysisKind>(&self, key: impl Into<ObjectRef>) -> Result<&T> {
        T::index(self).get(key)
    }

    pub fn find<T: AnalysisKind>(&self, key: impl Into<ObjectRef>) -> Option<&T> {
        T::index(self).find(key)
    }

    /// Edit aux data, tags or attributes of a registered object
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotFound` if nothing matches.
    pub fn get_mut<T: AnalysisKind>(
        &mut self,
        key: impl Into<ObjectRef>,
    ) -> Result<ObjectMut<'_, T>> {
        T::parts_mut(self).0.get_mut(key)
    }

    /// Register an object in the index of its kind
    ///
    /// # Errors
    ///
    /// See [`UniqueObjectIndex::add`].
    pub fn add<T: AnalysisKind>(&mut self, object: T) -> Result<&T> {
        let name = object.name().to_string();
        log_op_start!("add", kind = %T::KIND, name = %name);
        let start = std::time::Instant::now();

        let (index, _) = T::parts_mut(self);
        match index.add(object) {
            Ok(added) => {
                log_op_end!(
                    "add",
                    duration_ms = start.elapsed().as_millis() as u64,
                    kind = %T::KIND,
                    id = ?added.id()
                );
                Ok(added)
            }
            Err(e) => {
                log_op_error!(
                    "add",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    name = %name
                );
                Err(e)
            }
        }
    }

    /// Construct and register an object
    ///
    /// # Errors
    ///
    /// See [`UniqueObjectIndex::add_new`].
    pub fn add_new<T: AnalysisKind>(
        &mut self,
        name: impl Into<String>,
        id: impl Into<IdSpec>,
    ) -> Result<&T> {
        let object = T::from_unique(crate::model::UniqueObject::new(T::KIND, name, id)?);
        self.add(object)
    }

    /// Unregister an object, severing all of its edges
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotFound` if nothing matches.
    pub fn remove<T: AnalysisKind>(&mut self, key: impl Into<ObjectRef>) -> Result<T> {
        let key = key.into();
        log_op_start!("remove", kind = %T::KIND, key = %key);
        let start = std::time::Instant::now();

        let (index, relations) = T::parts_mut(self);
        let removed = index.remove(key, relations).map_err(|e| {
            log_op_error!(
                "remove",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "remove",
            duration_ms = start.elapsed().as_millis() as u64,
            kind = %T::KIND,
            name = %removed.name()
        );
        Ok(removed)
    }

    /// Rename an object, keeping its position and edges
    ///
    /// # Errors
    ///
    /// See [`UniqueObjectIndex::rename`].
    pub fn rename<T: AnalysisKind>(&mut self, key: impl Into<ObjectRef>, new_name: &str) -> Result<()> {
        let key = key.into();
        log_op_start!("rename", kind = %T::KIND, key = %key, new_name = new_name);
        let start = std::time::Instant::now();

        let (index, relations) = T::parts_mut(self);
        index.rename(key, new_name, relations).map_err(|e| {
            log_op_error!(
                "rename",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!("rename", duration_ms = start.elapsed().as_millis() as u64);
        Ok(())
    }

    /// Link two registered objects
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` for an unknown object, otherwise see
    /// [`RelationManager::link`].
    pub fn link<A, B>(
        &mut self,
        source: impl Into<ObjectRef>,
        target: impl Into<ObjectRef>,
        relation: &str,
    ) -> Result<()>
    where
        A: AnalysisKind,
        B: AnalysisKind,
    {
        log_op_start!("link", relation = relation);
        let start = std::time::Instant::now();

        let result = self.link_impl::<A, B>(source.into(), target.into(), relation);
        self.finish("link", start, result)
    }

    fn link_impl<A: AnalysisKind, B: AnalysisKind>(
        &mut self,
        source: ObjectRef,
        target: ObjectRef,
        relation: &str,
    ) -> Result<()> {
        let source = A::index(self).get(source)?.node_key();
        let target = B::index(self).get(target)?.node_key();
        self.relations.link_nodes(source, target, relation)
    }

    /// Link `child` under `parent` in a parent/child relation
    ///
    /// # Errors
    ///
    /// `CyclicRelation` if the child is the parent or one of its ancestors,
    /// otherwise as [`link`](Self::link).
    pub fn link_parent_child<T: AnalysisKind>(
        &mut self,
        parent: impl Into<ObjectRef>,
        child: impl Into<ObjectRef>,
        relation: &str,
    ) -> Result<()> {
        log_op_start!("link_parent_child", relation = relation);
        let start = std::time::Instant::now();

        let result = self.link_parent_child_impl::<T>(parent.into(), child.into(), relation);
        self.finish("link_parent_child", start, result)
    }

    fn link_parent_child_impl<T: AnalysisKind>(
        &mut self,
        parent: ObjectRef,
        child: ObjectRef,
        relation: &str,
    ) -> Result<()> {
        let (index, relations) = T::parts_mut(self);
        relations.link_parent_child(index.get(parent)?, index.get(child)?, relation)
    }

    /// Remove an edge; a missing edge is a no-op
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` for an unknown object, `RelationNotFound` for an
    /// undeclared relation.
    pub fn unlink<A, B>(
        &mut self,
        source: impl Into<ObjectRef>,
        target: impl Into<ObjectRef>,
        relation: &str,
    ) -> Result<bool>
    where
        A: AnalysisKind,
        B: AnalysisKind,
    {
        log_op_start!("unlink", relation = relation);
        let start = std::time::Instant::now();

        let result = self.unlink_impl::<A, B>(source.into(), target.into(), relation);
        self.finish("unlink", start, result)
    }

    fn unlink_impl<A: AnalysisKind, B: AnalysisKind>(
        &mut self,
        source: ObjectRef,
        target: ObjectRef,
        relation: &str,
    ) -> Result<bool> {
        let source = A::index(self).get(source)?.node_key();
        let target = B::index(self).get(target)?.node_key();
        self.relations.unlink_nodes(&source, &target, relation)
    }

    /// Copy an object and register the copy with its inherited links
    ///
    /// # Errors
    ///
    /// See [`copy`] and [`Copied::register`](super::copy::Copied::register).
    pub fn copy<T: AnalysisKind>(
        &mut self,
        key: impl Into<ObjectRef>,
        options: CopyOptions,
    ) -> Result<&T> {
        self.copy_with(key, options, |_: &T, _: &mut T| {})
    }

    /// Copy an object, rewrite it with `callback`, and register it
    ///
    /// # Errors
    ///
    /// See [`copy_with`] and [`Copied::register`](super::copy::Copied::register).
    pub fn copy_with<T, F>(
        &mut self,
        key: impl Into<ObjectRef>,
        options: CopyOptions,
        callback: F,
    ) -> Result<&T>
    where
        T: AnalysisKind,
        F: FnOnce(&T, &mut T),
    {
        let key = key.into();
        log_op_start!("copy", kind = %T::KIND, key = %key);
        let start = std::time::Instant::now();

        let copied = T::index(self)
            .get(key)
            .and_then(|object| copy_with(object, &self.relations, options, callback));
        let copied = match copied {
            Ok(copied) => copied,
            Err(e) => {
                log_op_error!(
                    "copy",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                return Err(e);
            }
        };

        let live: HashSet<NodeKey> = copied
            .links
            .iter()
            .map(|link| &link.partner)
            .filter(|partner| self.contains_node(partner))
            .cloned()
            .collect();
        let (index, relations) = T::parts_mut(self);
        match copied.register(index, relations, |partner| live.contains(partner)) {
            Ok(registered) => {
                log_op_end!(
                    "copy",
                    duration_ms = start.elapsed().as_millis() as u64,
                    name = %registered.name()
                );
                Ok(registered)
            }
            Err(e) => {
                log_op_error!(
                    "copy",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                Err(e)
            }
        }
    }

    /// Copy a parent/child subtree of one kind
    ///
    /// # Errors
    ///
    /// See [`copy_subtree`].
    pub fn copy_subtree<T, F>(
        &mut self,
        root: impl Into<ObjectRef>,
        relation: &str,
        rename: F,
    ) -> Result<NodeKey>
    where
        T: AnalysisKind,
        F: Fn(&str) -> String,
    {
        let root = root.into();
        log_op_start!("copy_subtree", kind = %T::KIND, root = %root, relation = relation);
        let start = std::time::Instant::now();

        let (index, relations) = T::parts_mut(self);
        let result = copy_subtree(index, relations, root, relation, rename);
        self.finish("copy_subtree", start, result)
    }

    /// Targets of kind `T` linked from the `S` object `key`
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` for an unknown object, `RelationNotFound` for an
    /// undeclared relation.
    pub fn targets<S, T>(&self, key: impl Into<ObjectRef>, relation: &str) -> Result<Vec<&T>>
    where
        S: AnalysisKind,
        T: AnalysisKind,
    {
        let node = S::index(self).get(key)?.node_key();
        self.resolve_all(self.relations.targets(&node, relation)?)
    }

    /// Sources of kind `S` linked to the `T` object `key`
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` for an unknown object, `RelationNotFound` for an
    /// undeclared relation.
    pub fn sources<S, T>(&self, key: impl Into<ObjectRef>, relation: &str) -> Result<Vec<&S>>
    where
        S: AnalysisKind,
        T: AnalysisKind,
    {
        let node = T::index(self).get(key)?.node_key();
        self.resolve_all(self.relations.sources(&node, relation)?)
    }

    /// Descendants of `key` in depth-first pre-order, each once
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` for an unknown object, `RelationNotFound` for an
    /// undeclared relation.
    pub fn walk_descendants<T: AnalysisKind>(
        &self,
        key: impl Into<ObjectRef>,
        relation: &str,
    ) -> Result<Vec<&T>> {
        self.walk::<T>(key.into(), relation, Direction::Forward)
    }

    /// Ancestors of `key` in depth-first pre-order, each once
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` for an unknown object, `RelationNotFound` for an
    /// undeclared relation.
    pub fn walk_ancestors<T: AnalysisKind>(
        &self,
        key: impl Into<ObjectRef>,
        relation: &str,
    ) -> Result<Vec<&T>> {
        self.walk::<T>(key.into(), relation, Direction::Inverse)
    }

    fn walk<T: AnalysisKind>(
        &self,
        key: ObjectRef,
        relation: &str,
        direction: Direction,
    ) -> Result<Vec<&T>> {
        let node = T::index(self).get(key)?.node_key();
        let nodes: Vec<NodeKey> = self.relations.walk(&node, relation, direction)?.collect();
        self.resolve_all(nodes)
    }

    /// Resolve a `"a.b.c"` path of child names below `root`
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` if the root or a segment is unknown.
    pub fn find_by_path<T: AnalysisKind>(
        &self,
        root: impl Into<ObjectRef>,
        path: &str,
        relation: &str,
    ) -> Result<&T> {
        let root = T::index(self).get(root)?.node_key();
        let node = self.relations.resolve_path(&root, path, relation)?;
        T::index(self).get(node.name)
    }

    /// Whether `node` names a registered object of a built-in kind
    pub fn contains_node(&self, node: &NodeKey) -> bool {
        let name = node.name.as_str();
        match node.kind.as_str() {
            k if k == CAMPAIGN.as_str() => self.campaigns.contains(name),
            k if k == DATASET.as_str() => self.datasets.contains(name),
            k if k == PROCESS.as_str() => self.processes.contains(name),
            k if k == CHANNEL.as_str() => self.channels.contains(name),
            k if k == CATEGORY.as_str() => self.categories.contains(name),
            k if k == VARIABLE.as_str() => self.variables.contains(name),
            _ => false,
        }
    }

    /// Check every index and the relation graph for consistency
    ///
    /// # Errors
    ///
    /// `Internal` or `CyclicRelation` describing the first violation.
    pub fn validate(&self) -> Result<()> {
        validate_index(&self.campaigns)?;
        validate_index(&self.datasets)?;
        validate_index(&self.processes)?;
        validate_index(&self.channels)?;
        validate_index(&self.categories)?;
        validate_index(&self.variables)?;
        validate_relations(&self.relations)?;

        let dangling = invariants::find_dangling_edges(&self.relations, |node| self.contains_node(node));
        if let Some((relation, source, target)) = dangling.first() {
            return Err(OrderError::Internal {
                message: format!(
                    "edge {} -> {} in {} references an unregistered object",
                    source, target, relation
                ),
            });
        }
        Ok(())
    }

    // every inherited link must point at a registered object
    fn resolve_all<T: AnalysisKind>(&self, nodes: Vec<NodeKey>) -> Result<Vec<&T>> {
        nodes
            .into_iter()
            .filter(|node| node.kind == T::KIND)
            .map(|node| T::index(self).get(node.name))
            .collect()
    }

    fn finish<R>(&self, op: &'static str, start: std::time::Instant, result: Result<R>) -> Result<R> {
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                log_op_end!(op, duration_ms = duration_ms);
            }
            Err(e) => {
                log_op_error!(op, e.clone(), duration_ms = duration_ms);
            }
        }
        result
    }
}
