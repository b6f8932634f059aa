//! Relation manager with bidirectional, insertion-ordered adjacency.
//!
//! Relations connect registered objects with typed edges. Every relation
//! keeps a forward index (source -> targets) and an inverse index
//! (target -> sources), so both directions are O(1) to reach and can never
//! diverge.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::{OrderError, Result};
use crate::model::identity::{Kind, NodeKey, ObjectRef, PATH_SEPARATOR};
use crate::model::{HasIdentity, HasRelations};

/// Shape of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Any number of targets per source and sources per target
    ManyToMany,
    /// Acyclic parent -> child edges between objects of one kind
    ParentChild,
}

/// Declaration of a relation type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDecl {
    pub name: String,
    pub source_kind: Kind,
    pub target_kind: Kind,
    pub cardinality: Cardinality,
}

impl RelationDecl {
    pub fn many_to_many(name: impl Into<String>, source_kind: Kind, target_kind: Kind) -> Self {
        Self {
            name: name.into(),
            source_kind,
            target_kind,
            cardinality: Cardinality::ManyToMany,
        }
    }

    pub fn parent_child(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            source_kind: kind.clone(),
            target_kind: kind,
            cardinality: Cardinality::ParentChild,
        }
    }

    pub fn is_parent_child(&self) -> bool {
        self.cardinality == Cardinality::ParentChild
    }

    /// Whether objects of `kind` take part on either side
    pub fn involves(&self, kind: &Kind) -> bool {
        &self.source_kind == kind || &self.target_kind == kind
    }
}

/// Relation types known to a [`RelationManager`]
#[derive(Debug, Clone, Default)]
pub struct RelationRegistry {
    decls: IndexMap<String, RelationDecl>,
}

impl RelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of declarations
    ///
    /// # Errors
    ///
    /// Returns `RelationAlreadyDeclared` if a name appears twice.
    pub fn from_decls(decls: impl IntoIterator<Item = RelationDecl>) -> Result<Self> {
        let mut registry = Self::new();
        for decl in decls {
            registry.declare(decl)?;
        }
        Ok(registry)
    }

    /// Declare a relation type
    ///
    /// # Errors
    ///
    /// Returns `RelationAlreadyDeclared` if the name is taken.
    pub fn declare(&mut self, decl: RelationDecl) -> Result<()> {
        if self.decls.contains_key(&decl.name) {
            return Err(OrderError::RelationAlreadyDeclared {
                relation: decl.name,
            });
        }
        tracing::debug!(relation = %decl.name, "declared relation");
        self.decls.insert(decl.name.clone(), decl);
        Ok(())
    }

    /// Declare every relation a kind participates in
    ///
    /// Declarations identical to an existing one are skipped, so kinds that
    /// share a relation can all be declared.
    ///
    /// # Errors
    ///
    /// Returns `RelationAlreadyDeclared` if a name is taken by a different
    /// declaration.
    pub fn declare_for<K: HasRelations>(&mut self) -> Result<()> {
        let decls = K::relation_decls();
        for decl in &decls {
            if let Some(existing) = self.decls.get(&decl.name) {
                if existing != decl {
                    return Err(OrderError::RelationAlreadyDeclared {
                        relation: decl.name.clone(),
                    });
                }
            }
        }
        for decl in decls {
            if !self.decls.contains_key(&decl.name) {
                self.declare(decl)?;
            }
        }
        Ok(())
    }

    /// Look up a declaration
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` for an undeclared name.
    pub fn get(&self, relation: &str) -> Result<&RelationDecl> {
        self.decls
            .get(relation)
            .ok_or_else(|| OrderError::RelationNotFound {
                relation: relation.to_string(),
            })
    }

    pub fn contains(&self, relation: &str) -> bool {
        self.decls.contains_key(relation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationDecl> {
        self.decls.values()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Edges {
    pub(crate) forward: IndexMap<NodeKey, IndexSet<NodeKey>>,
    pub(crate) inverse: IndexMap<NodeKey, IndexSet<NodeKey>>,
}

impl Edges {
    fn has(&self, source: &NodeKey, target: &NodeKey) -> bool {
        self.forward
            .get(source)
            .is_some_and(|targets| targets.contains(target))
    }

    fn insert(&mut self, source: NodeKey, target: NodeKey) {
        self.forward
            .entry(source.clone())
            .or_default()
            .insert(target.clone());
        self.inverse.entry(target).or_default().insert(source);
    }

    fn remove(&mut self, source: &NodeKey, target: &NodeKey) -> bool {
        let removed = detach(&mut self.forward, source, target);
        detach(&mut self.inverse, target, source);
        removed
    }

    fn len(&self) -> usize {
        self.forward.values().map(IndexSet::len).sum()
    }
}

// remove `partner` from the set of `node`, dropping the set once empty
fn detach(
    map: &mut IndexMap<NodeKey, IndexSet<NodeKey>>,
    node: &NodeKey,
    partner: &NodeKey,
) -> bool {
    let Some(set) = map.get_mut(node) else {
        return false;
    };
    let removed = set.shift_remove(partner);
    if set.is_empty() {
        map.shift_remove(node);
    }
    removed
}

// replace `old` by `new` in place, keeping its position
fn rekey_map<V>(map: &mut IndexMap<NodeKey, V>, old: &NodeKey, new: &NodeKey) {
    if let Some((index, _, value)) = map.shift_remove_full(old) {
        map.shift_insert(index, new.clone(), value);
    }
}

fn rekey_set(set: &mut IndexSet<NodeKey>, old: &NodeKey, new: &NodeKey) {
    if let Some((index, _)) = set.shift_remove_full(old) {
        set.shift_insert(index, new.clone());
    }
}

/// Direction of a graph walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// source -> target (parent -> child)
    Forward,
    /// target -> source (child -> parent)
    Inverse,
}

/// RelationManager - typed edges between registered objects
///
/// Nodes are identified by their [`NodeKey`]. Indices keep the manager in
/// sync: removing an object cascades through [`cascade_remove`], renaming
/// re-keys through [`rekey`].
///
/// [`cascade_remove`]: RelationManager::cascade_remove
/// [`rekey`]: RelationManager::rekey
#[derive(Debug, Clone, Default)]
pub struct RelationManager {
    registry: RelationRegistry,
    pub(crate) edges: IndexMap<String, Edges>,
}

impl RelationManager {
    pub fn new(registry: RelationRegistry) -> Self {
        let edges = registry
            .iter()
            .map(|decl| (decl.name.clone(), Edges::default()))
            .collect();
        Self { registry, edges }
    }

    pub fn registry(&self) -> &RelationRegistry {
        &self.registry
    }

    /// Declare an additional relation type
    ///
    /// # Errors
    ///
    /// Returns `RelationAlreadyDeclared` if the name is taken.
    pub fn declare(&mut self, decl: RelationDecl) -> Result<()> {
        let name = decl.name.clone();
        self.registry.declare(decl)?;
        self.edges.insert(name, Edges::default());
        Ok(())
    }

    /// Link two registered objects
    ///
    /// Linking an existing edge is a no-op. Parent/child relations go through
    /// the same cycle check as [`link_parent_child`](Self::link_parent_child).
    ///
    /// # Errors
    ///
    /// - `ObjectNotFound` if either object is not registered in an index
    /// - `RelationNotFound` if the relation was never declared
    /// - `RelationKindMismatch` if a kind does not match the declaration
    /// - `CyclicRelation` if a parent/child link would close a cycle
    pub fn link<A, B>(&mut self, source: &A, target: &B, relation: &str) -> Result<()>
    where
        A: HasIdentity + ?Sized,
        B: HasIdentity + ?Sized,
    {
        ensure_registered(source)?;
        ensure_registered(target)?;
        self.link_nodes(source.node_key(), target.node_key(), relation)
    }

    /// Link `child` under `parent` in a parent/child relation
    ///
    /// # Errors
    ///
    /// Same as [`link`](Self::link); a relation that is not parent/child
    /// fails with `RelationKindMismatch`.
    pub fn link_parent_child<A, B>(&mut self, parent: &A, child: &B, relation: &str) -> Result<()>
    where
        A: HasIdentity + ?Sized,
        B: HasIdentity + ?Sized,
    {
        let decl = self.registry.get(relation)?;
        if !decl.is_parent_child() {
            return Err(OrderError::RelationKindMismatch {
                relation: relation.to_string(),
                expected: "parent_child".to_string(),
                found: "many_to_many".to_string(),
            });
        }
        self.link(parent, child, relation)
    }

    /// Remove an edge; removing a missing edge is a no-op
    ///
    /// Returns whether an edge was removed.
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if the relation was never declared.
    pub fn unlink<A, B>(&mut self, source: &A, target: &B, relation: &str) -> Result<bool>
    where
        A: HasIdentity + ?Sized,
        B: HasIdentity + ?Sized,
    {
        self.unlink_nodes(&source.node_key(), &target.node_key(), relation)
    }

    pub(crate) fn link_nodes(
        &mut self,
        source: NodeKey,
        target: NodeKey,
        relation: &str,
    ) -> Result<()> {
        if self.edges_of(relation)?.has(&source, &target) {
            return Ok(());
        }
        self.check_link(&source, &target, relation)?;

        tracing::debug!(relation, source = %source, target = %target, "link");
        self.edges_of_mut(relation)?.insert(source, target);
        Ok(())
    }

    pub(crate) fn unlink_nodes(
        &mut self,
        source: &NodeKey,
        target: &NodeKey,
        relation: &str,
    ) -> Result<bool> {
        let removed = self.edges_of_mut(relation)?.remove(source, target);
        if removed {
            tracing::debug!(relation, source = %source, target = %target, "unlink");
        }
        Ok(removed)
    }

    /// Validate a prospective edge without mutating anything
    pub(crate) fn check_link(&self, source: &NodeKey, target: &NodeKey, relation: &str) -> Result<()> {
        let decl = self.registry.get(relation)?;
        check_kind(relation, &decl.source_kind, &source.kind)?;
        check_kind(relation, &decl.target_kind, &target.kind)?;

        if decl.is_parent_child() && (source == target || self.is_ancestor(target, source, relation)?)
        {
            return Err(OrderError::CyclicRelation {
                relation: relation.to_string(),
                parent: source.to_string(),
                child: target.to_string(),
            });
        }
        Ok(())
    }

    // true when `candidate` is reachable upwards from `node`
    fn is_ancestor(&self, candidate: &NodeKey, node: &NodeKey, relation: &str) -> Result<bool> {
        for ancestor in self.walk(node, relation, Direction::Inverse)? {
            if &ancestor == candidate {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Sever every edge touching `node`, in every relation
    ///
    /// Returns the number of edges removed.
    pub fn cascade_remove(&mut self, node: &NodeKey) -> usize {
        let mut removed = 0;
        for edges in self.edges.values_mut() {
            if let Some(targets) = edges.forward.shift_remove(node) {
                for target in &targets {
                    detach(&mut edges.inverse, target, node);
                }
                removed += targets.len();
            }
            if let Some(sources) = edges.inverse.shift_remove(node) {
                for source in &sources {
                    detach(&mut edges.forward, source, node);
                }
                removed += sources.len();
            }
        }
        if removed > 0 {
            tracing::debug!(node = %node, edges = removed, "cascade remove");
        }
        removed
    }

    /// Re-key every edge of `old` to `new`, keeping all orderings
    pub fn rekey(&mut self, old: &NodeKey, new: &NodeKey) {
        if old == new {
            return;
        }
        for edges in self.edges.values_mut() {
            if let Some(targets) = edges.forward.get(old) {
                for target in targets.clone() {
                    if let Some(sources) = edges.inverse.get_mut(&target) {
                        rekey_set(sources, old, new);
                    }
                }
            }
            if let Some(sources) = edges.inverse.get(old) {
                for source in sources.clone() {
                    if let Some(targets) = edges.forward.get_mut(&source) {
                        rekey_set(targets, old, new);
                    }
                }
            }
            rekey_map(&mut edges.forward, old, new);
            rekey_map(&mut edges.inverse, old, new);
        }
        tracing::debug!(old = %old, new = %new, "rekey");
    }

    /// Forward partners of `node` in insertion order
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if the relation was never declared.
    pub fn targets(&self, node: &NodeKey, relation: &str) -> Result<Vec<NodeKey>> {
        Ok(partners(&self.edges_of(relation)?.forward, node))
    }

    /// Inverse partners of `node` in insertion order
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if the relation was never declared.
    pub fn sources(&self, node: &NodeKey, relation: &str) -> Result<Vec<NodeKey>> {
        Ok(partners(&self.edges_of(relation)?.inverse, node))
    }

    /// Direct children in a parent/child relation
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if the relation was never declared.
    pub fn children(&self, node: &NodeKey, relation: &str) -> Result<Vec<NodeKey>> {
        self.targets(node, relation)
    }

    /// Direct parents in a parent/child relation
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if the relation was never declared.
    pub fn parents(&self, node: &NodeKey, relation: &str) -> Result<Vec<NodeKey>> {
        self.sources(node, relation)
    }

    /// Lazy depth-first pre-order walk below `node`
    ///
    /// Children are visited in insertion order and every descendant is
    /// yielded once, even when reachable through several parents. The
    /// returned iterator can be cloned to restart from any point.
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if the relation was never declared.
    pub fn walk_descendants(&self, node: &NodeKey, relation: &str) -> Result<Walk<'_>> {
        self.walk(node, relation, Direction::Forward)
    }

    /// Lazy depth-first pre-order walk above `node`
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if the relation was never declared.
    pub fn walk_ancestors(&self, node: &NodeKey, relation: &str) -> Result<Walk<'_>> {
        self.walk(node, relation, Direction::Inverse)
    }

    /// Lazy walk in either direction
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if the relation was never declared.
    pub fn walk(&self, node: &NodeKey, relation: &str, direction: Direction) -> Result<Walk<'_>> {
        let edges = self.edges_of(relation)?;
        let adjacency = match direction {
            Direction::Forward => &edges.forward,
            Direction::Inverse => &edges.inverse,
        };
        Ok(Walk::new(adjacency, node))
    }

    /// # Errors
    ///
    /// Returns `RelationNotFound` if the relation was never declared.
    pub fn has_edge(&self, source: &NodeKey, target: &NodeKey, relation: &str) -> Result<bool> {
        Ok(self.edges_of(relation)?.has(source, target))
    }

    /// Number of edges in a relation
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if the relation was never declared.
    pub fn edge_count(&self, relation: &str) -> Result<usize> {
        Ok(self.edges_of(relation)?.len())
    }

    /// Names of the relations in which `node` has at least one edge
    pub fn relations_of(&self, node: &NodeKey) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, edges)| edges.forward.contains_key(node) || edges.inverse.contains_key(node))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Whether `node` has any edge at all
    pub fn is_linked(&self, node: &NodeKey) -> bool {
        !self.relations_of(node).is_empty()
    }

    /// Resolve a separator-joined path of child names below `root`
    ///
    /// `resolve_path(root, "a.b", rel)` returns the child `b` of the child
    /// `a` of `root`.
    ///
    /// # Errors
    ///
    /// - `RelationNotFound` if the relation was never declared
    /// - `ObjectNotFound` if a segment names no child
    pub fn resolve_path(&self, root: &NodeKey, path: &str, relation: &str) -> Result<NodeKey> {
        let edges = self.edges_of(relation)?;
        let mut current = root.clone();
        for segment in path.split(PATH_SEPARATOR) {
            let next = edges
                .forward
                .get(&current)
                .and_then(|children| children.iter().find(|child| child.name == segment))
                .cloned()
                .ok_or_else(|| OrderError::ObjectNotFound {
                    kind: current.kind.to_string(),
                    key: ObjectRef::Name(path.to_string()),
                })?;
            current = next;
        }
        Ok(current)
    }

    /// Every edge of a relation as `(source, target)` in insertion order
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if the relation was never declared.
    pub fn edges(&self, relation: &str) -> Result<Vec<(NodeKey, NodeKey)>> {
        let edges = self.edges_of(relation)?;
        Ok(edges
            .forward
            .iter()
            .flat_map(|(source, targets)| {
                targets
                    .iter()
                    .map(move |target| (source.clone(), target.clone()))
            })
            .collect())
    }

    fn edges_of(&self, relation: &str) -> Result<&Edges> {
        self.edges
            .get(relation)
            .ok_or_else(|| OrderError::RelationNotFound {
                relation: relation.to_string(),
            })
    }

    fn edges_of_mut(&mut self, relation: &str) -> Result<&mut Edges> {
        self.edges
            .get_mut(relation)
            .ok_or_else(|| OrderError::RelationNotFound {
                relation: relation.to_string(),
            })
    }
}

fn partners(map: &IndexMap<NodeKey, IndexSet<NodeKey>>, node: &NodeKey) -> Vec<NodeKey> {
    map.get(node)
        .map(|set| set.iter().cloned().collect())
        .unwrap_or_default()
}

fn ensure_registered<T: HasIdentity + ?Sized>(object: &T) -> Result<()> {
    if object.is_registered() {
        Ok(())
    } else {
        Err(OrderError::ObjectNotFound {
            kind: object.kind().to_string(),
            key: ObjectRef::Name(object.name().to_string()),
        })
    }
}

fn check_kind(relation: &str, expected: &Kind, found: &Kind) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(OrderError::RelationKindMismatch {
            relation: relation.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}

/// Depth-first pre-order iterator over one direction of a relation
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    adjacency: &'a IndexMap<NodeKey, IndexSet<NodeKey>>,
    stack: Vec<&'a NodeKey>,
    seen: HashSet<&'a NodeKey>,
    start: NodeKey,
}

impl<'a> Walk<'a> {
    fn new(adjacency: &'a IndexMap<NodeKey, IndexSet<NodeKey>>, start: &NodeKey) -> Self {
        let mut walk = Self {
            adjacency,
            stack: Vec::new(),
            seen: HashSet::new(),
            start: start.clone(),
        };
        if let Some(partners) = adjacency.get(start) {
            walk.stack.extend(partners.iter().rev());
        }
        walk
    }
}

impl Iterator for Walk<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            if *node == self.start || !self.seen.insert(node) {
                continue;
            }
            if let Some(partners) = self.adjacency.get(node) {
                self.stack.extend(partners.iter().rev());
            }
            return Some(node.clone());
        }
        None
    }
}
