//! Copy engine
//!
//! Copies are deep: the whole entity is cloned, auxiliary data is filtered
//! and merged with overrides, and the relation edges of the source are
//! recorded as pending links. A copy is not registered anywhere until
//! [`Copied::register`] adds it to an index and applies its links.

use std::collections::HashSet;

use super::index::UniqueObjectIndex;
use super::relations::{Cardinality, RelationManager};
use crate::errors::{OrderError, Result};
use crate::model::identity::{IdSpec, IdentityKey, NodeKey, ObjectRef};
use crate::model::{AuxStore, Entity, HasIdentity, IdentityAccess, MergePolicy};

/// Which relations a copy inherits
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RelationSelection {
    #[default]
    All,
    None,
    Only(Vec<String>),
}

/// Which auxiliary entries a copy inherits
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuxSelection {
    #[default]
    All,
    None,
    /// Top-level keys to keep
    Keys(Vec<String>),
}

/// Options for [`copy`]
///
/// By default the copy keeps the source name, receives an auto id and
/// inherits every relation, all auxiliary data and all tags.
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    pub name: Option<String>,
    pub id: IdSpec,
    pub relations: RelationSelection,
    pub aux: AuxSelection,
    pub skip_tags: bool,
    pub aux_overrides: Option<AuxStore>,
}

impl CopyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(mut self, id: impl Into<IdSpec>) -> Self {
        self.id = id.into();
        self
    }

    pub fn relations(mut self, relations: RelationSelection) -> Self {
        self.relations = relations;
        self
    }

    pub fn aux(mut self, aux: AuxSelection) -> Self {
        self.aux = aux;
        self
    }

    pub fn tags(mut self, keep: bool) -> Self {
        self.skip_tags = !keep;
        self
    }

    /// Values merged over the copied auxiliary data
    pub fn aux_overrides(mut self, overrides: AuxStore) -> Self {
        self.aux_overrides = Some(overrides);
        self
    }
}

/// A link to apply once the copy is registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLink {
    pub relation: String,
    pub partner: NodeKey,
    /// `true` when the copy is the source of the edge
    pub outgoing: bool,
}

/// An unregistered copy plus the links it inherits
#[derive(Debug, Clone)]
pub struct Copied<T> {
    pub object: T,
    pub links: Vec<PendingLink>,
}

impl<T: Entity> Copied<T> {
    /// Register the copy and apply its links
    ///
    /// Partners of the index's own kind are looked up in `index`; partners
    /// of other kinds are checked with `is_registered`, typically a lookup in
    /// their own index. Either the copy ends up registered with every link
    /// applied, or the index and the relation manager are left as they were.
    ///
    /// # Errors
    ///
    /// - `ObjectNotFound` if a partner is no longer registered
    /// - the errors of [`UniqueObjectIndex::add`] and of linking
    pub fn register<'a, F>(
        self,
        index: &'a mut UniqueObjectIndex<T>,
        relations: &mut RelationManager,
        is_registered: F,
    ) -> Result<&'a T>
    where
        F: Fn(&NodeKey) -> bool,
    {
        let node = self.object.node_key();
        for link in &self.links {
            let present = if &link.partner.kind == index.kind() {
                index.contains(link.partner.name.as_str())
            } else {
                is_registered(&link.partner)
            };
            if !present {
                return Err(OrderError::ObjectNotFound {
                    kind: link.partner.kind.to_string(),
                    key: ObjectRef::Name(link.partner.name.clone()),
                });
            }
            let (source, target) = link.endpoints(&node);
            relations.check_link(source, target, &link.relation)?;
        }

        let previous_next_id = index.next_id_counter();
        let name = index.add(self.object)?.name().to_string();

        let mut applied: Vec<&PendingLink> = Vec::with_capacity(self.links.len());
        for link in &self.links {
            let (source, target) = link.endpoints(&node);
            let existed = relations.has_edge(source, target, &link.relation)?;
            if let Err(err) = relations.link_nodes(source.clone(), target.clone(), &link.relation) {
                for done in applied {
                    let (source, target) = done.endpoints(&node);
                    relations.unlink_nodes(source, target, &done.relation)?;
                }
                index.undo_add(&name, previous_next_id);
                return Err(err);
            }
            if !existed {
                applied.push(link);
            }
        }

        tracing::debug!(node = %node, links = self.links.len(), "registered copy");
        index.get(name)
    }
}

impl PendingLink {
    fn endpoints<'a>(&'a self, node: &'a NodeKey) -> (&'a NodeKey, &'a NodeKey) {
        if self.outgoing {
            (node, &self.partner)
        } else {
            (&self.partner, node)
        }
    }
}

/// Deep-copy an entity
///
/// The copy gets a freshly validated identity and no owner. Outgoing edges of
/// every selected relation are recorded as pending links; incoming edges
/// only for many-to-many relations, so a parent/child copy never gains the
/// source's parents.
///
/// # Errors
///
/// - `InvalidIdentity` if the new name or id is invalid
/// - `RelationNotFound` if a selected relation was never declared
pub fn copy<T: Entity>(object: &T, relations: &RelationManager, options: CopyOptions) -> Result<Copied<T>> {
    copy_with(object, relations, options, |_, _| {})
}

/// Deep-copy an entity, letting `callback` rewrite the copy
///
/// `callback` receives the source and the copy after auxiliary data and tags
/// were filtered. It may change any attribute; the identity chosen by
/// `options` and the unregistered state are reapplied afterwards.
///
/// # Errors
///
/// See [`copy`].
pub fn copy_with<T, F>(
    object: &T,
    relations: &RelationManager,
    options: CopyOptions,
    callback: F,
) -> Result<Copied<T>>
where
    T: Entity,
    F: FnOnce(&T, &mut T),
{
    let name = options
        .name
        .clone()
        .unwrap_or_else(|| object.name().to_string());
    let key = IdentityKey::normalize(object.kind().clone(), name, options.id)?;

    let mut copied = object.clone();
    match &options.aux {
        AuxSelection::All => {}
        AuxSelection::None => copied.aux_mut().clear(),
        AuxSelection::Keys(keys) => copied.aux_mut().retain_keys(keys.as_slice()),
    }
    if let Some(overrides) = &options.aux_overrides {
        copied.aux_mut().merge(overrides, MergePolicy::Overwrite);
    }
    if options.skip_tags {
        copied.tags_mut().clear();
    }

    callback(object, &mut copied);
    {
        let unique = copied.unique_mut(IdentityAccess::grant());
        *unique.key_mut() = key;
        unique.set_owner(None);
    }

    let links = pending_links(object, relations, &options.relations)?;
    tracing::debug!(
        source = %object.node_key(),
        copy = %copied.node_key(),
        links = links.len(),
        "copied"
    );
    Ok(Copied {
        object: copied,
        links,
    })
}

fn pending_links<T: HasIdentity>(
    object: &T,
    relations: &RelationManager,
    selection: &RelationSelection,
) -> Result<Vec<PendingLink>> {
    let registry = relations.registry();
    let selected: Vec<_> = match selection {
        RelationSelection::None => Vec::new(),
        RelationSelection::All => registry.iter().collect(),
        RelationSelection::Only(names) => names
            .iter()
            .map(|name| registry.get(name))
            .collect::<Result<_>>()?,
    };

    let node = object.node_key();
    let mut links = Vec::new();
    for decl in selected {
        if &decl.source_kind == object.kind() {
            for partner in relations.targets(&node, &decl.name)? {
                links.push(PendingLink {
                    relation: decl.name.clone(),
                    partner,
                    outgoing: true,
                });
            }
        }
        if &decl.target_kind == object.kind() && decl.cardinality == Cardinality::ManyToMany {
            for partner in relations.sources(&node, &decl.name)? {
                links.push(PendingLink {
                    relation: decl.name.clone(),
                    partner,
                    outgoing: false,
                });
            }
        }
    }
    Ok(links)
}

/// Deep-copy a parent/child subtree within one index
///
/// `root` and all of its descendants in `relation` are copied with names
/// produced by `rename`; the copies are linked to mirror the original tree.
/// The new root has no parent. Other relations are not inherited.
///
/// # Errors
///
/// - `ObjectNotFound` if `root` is not in the index
/// - `RelationNotFound` / `RelationKindMismatch` for an unusable relation
/// - `InvalidIdentity` / `DuplicateObject` if a produced name is invalid or
///   taken; nothing is registered in that case
pub fn copy_subtree<T, F>(
    index: &mut UniqueObjectIndex<T>,
    relations: &mut RelationManager,
    root: impl Into<ObjectRef>,
    relation: &str,
    rename: F,
) -> Result<NodeKey>
where
    T: Entity,
    F: Fn(&str) -> String,
{
    let decl = relations.registry().get(relation)?;
    if decl.cardinality != Cardinality::ParentChild || &decl.source_kind != index.kind() {
        return Err(OrderError::RelationKindMismatch {
            relation: relation.to_string(),
            expected: format!("parent_child of {}", index.kind()),
            found: format!("{:?} of {}", decl.cardinality, decl.source_kind),
        });
    }

    let root_node = index.get(root)?.node_key();
    let mut nodes = vec![root_node.clone()];
    nodes.extend(relations.walk_descendants(&root_node, relation)?);

    let mut copies = Vec::with_capacity(nodes.len());
    let mut new_names = HashSet::new();
    for node in &nodes {
        let new_name = rename(&node.name);
        if index.contains(new_name.as_str()) || !new_names.insert(new_name.clone()) {
            return Err(OrderError::DuplicateObject {
                kind: index.kind().to_string(),
                key: ObjectRef::Name(new_name),
            });
        }
        let options = CopyOptions::new()
            .name(new_name)
            .relations(RelationSelection::None);
        copies.push(copy(index.get(node.name.as_str())?, relations, options)?);
    }

    let mut edges = Vec::new();
    for node in &nodes {
        for child in relations.children(node, relation)? {
            edges.push((
                NodeKey::new(node.kind.clone(), rename(&node.name)),
                NodeKey::new(child.kind.clone(), rename(&child.name)),
            ));
        }
    }

    let previous_next_id = index.next_id_counter();
    let mut added: Vec<String> = Vec::with_capacity(copies.len());
    for copied in copies {
        match index.add(copied.object) {
            Ok(object) => added.push(object.name().to_string()),
            Err(err) => {
                for name in added.iter().rev() {
                    index.undo_add(name, previous_next_id);
                }
                return Err(err);
            }
        }
    }
    for (parent, child) in edges {
        relations.link_nodes(parent, child, relation)?;
    }

    let new_root = NodeKey::new(root_node.kind.clone(), rename(&root_node.name));
    tracing::debug!(root = %root_node, copy = %new_root, nodes = nodes.len(), "copied subtree");
    Ok(new_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::kinds::{builtin_relations, Category, CATEGORY, CATEGORY_CHILDREN};
    use crate::model::HasAux;
    use crate::ops::relations::RelationRegistry;
    use serde_json::json;

    fn setup() -> (UniqueObjectIndex<Category>, RelationManager) {
        let registry = RelationRegistry::from_decls(builtin_relations()).unwrap();
        (UniqueObjectIndex::new(CATEGORY), RelationManager::new(registry))
    }

    #[test]
    fn test_copy_is_unregistered_with_fresh_identity() {
        let (mut idx, rel) = setup();
        let original = Category::new("ee", IdSpec::Auto)
            .unwrap()
            .with_selection("n_e == 2");
        idx.add(original).unwrap();

        let copied = copy(
            idx.get("ee").unwrap(),
            &rel,
            CopyOptions::new().name("ee_copy"),
        )
        .unwrap();

        assert_eq!(copied.object.name(), "ee_copy");
        assert_eq!(copied.object.id(), None);
        assert!(!copied.object.is_registered());
        assert_eq!(copied.object.selection(), "(n_e == 2)");
    }

    #[test]
    fn test_callback_rewrites_attributes_not_identity() {
        let (mut idx, rel) = setup();
        idx.add(Category::new("ee", IdSpec::Auto).unwrap().with_selection("n_e == 2"))
            .unwrap();

        let copied = copy_with(
            idx.get("ee").unwrap(),
            &rel,
            CopyOptions::new().name("ee_loose"),
            |source, copy| {
                let loosened = source.selection().replace("==", ">=");
                *copy = Category::new("hijacked", 9i64)
                    .unwrap()
                    .with_selection(&loosened);
            },
        )
        .unwrap();

        assert_eq!(copied.object.name(), "ee_loose");
        assert_eq!(copied.object.id(), None);
        assert_eq!(copied.object.selection(), "(n_e >= 2)");
    }

    #[test]
    fn test_aux_keys_and_overrides() {
        let (mut idx, rel) = setup();
        let mut original = Category::new("mm", IdSpec::Auto).unwrap();
        original.aux_mut().set(&["a"], json!(1)).unwrap();
        original.aux_mut().set(&["b", "c"], json!(2)).unwrap();
        idx.add(original).unwrap();

        let overrides: AuxStore = [("b".to_string(), json!({"d": 3}))].into_iter().collect();
        let copied = copy(
            idx.get("mm").unwrap(),
            &rel,
            CopyOptions::new()
                .name("mm2")
                .aux(AuxSelection::Keys(vec!["b".to_string()]))
                .aux_overrides(overrides),
        )
        .unwrap();

        assert!(!copied.object.aux().contains(&["a"]));
        assert_eq!(copied.object.aux().get(&["b", "c"]).unwrap(), &json!(2));
        assert_eq!(copied.object.aux().get(&["b", "d"]).unwrap(), &json!(3));
    }

    #[test]
    fn test_copy_subtree_mirrors_tree() {
        let (mut idx, mut rel) = setup();
        for name in ["a", "b", "c"] {
            idx.add_new(name, IdSpec::Auto).unwrap();
        }
        rel.link(idx.get("a").unwrap(), idx.get("b").unwrap(), CATEGORY_CHILDREN)
            .unwrap();
        rel.link(idx.get("b").unwrap(), idx.get("c").unwrap(), CATEGORY_CHILDREN)
            .unwrap();

        let new_root =
            copy_subtree(&mut idx, &mut rel, "a", CATEGORY_CHILDREN, |n| format!("{}_x", n))
                .unwrap();

        assert_eq!(new_root.name, "a_x");
        let walked: Vec<_> = rel
            .walk_descendants(&new_root, CATEGORY_CHILDREN)
            .unwrap()
            .map(|node| node.name)
            .collect();
        assert_eq!(walked, vec!["b_x", "c_x"]);
        assert_eq!(idx.len(), 6);
    }

    #[test]
    fn test_copy_subtree_collision_registers_nothing() {
        let (mut idx, mut rel) = setup();
        idx.add_new("a", IdSpec::Auto).unwrap();
        idx.add_new("b", IdSpec::Auto).unwrap();
        rel.link(idx.get("a").unwrap(), idx.get("b").unwrap(), CATEGORY_CHILDREN)
            .unwrap();

        let result = copy_subtree(&mut idx, &mut rel, "a", CATEGORY_CHILDREN, |_| {
            "same".to_string()
        });

        assert!(matches!(result, Err(OrderError::DuplicateObject { .. })));
        assert_eq!(idx.len(), 2);
        assert_eq!(rel.edge_count(CATEGORY_CHILDREN).unwrap(), 1);
    }
}
