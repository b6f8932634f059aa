use std::collections::HashSet;

use crate::model::identity::NodeKey;
use crate::model::HasIdentity;
use crate::ops::relations::Cardinality;
use crate::ops::{RelationManager, UniqueObjectIndex};

/// An edge reported by an invariant check: `(relation, source, target)`
pub type EdgeRef = (String, NodeKey, NodeKey);

/// Find edges present in only one of the forward and inverse indices
pub fn find_asymmetric_edges(relations: &RelationManager) -> Vec<EdgeRef> {
    let mut asymmetric = Vec::new();

    for (name, edges) in &relations.edges {
        for (source, targets) in &edges.forward {
            for target in targets {
                let mirrored = edges
                    .inverse
                    .get(target)
                    .is_some_and(|sources| sources.contains(source));
                if !mirrored {
                    asymmetric.push((name.clone(), source.clone(), target.clone()));
                }
            }
        }
        for (target, sources) in &edges.inverse {
            for source in sources {
                let mirrored = edges
                    .forward
                    .get(source)
                    .is_some_and(|targets| targets.contains(target));
                if !mirrored {
                    asymmetric.push((name.clone(), source.clone(), target.clone()));
                }
            }
        }
    }

    asymmetric
}

/// Find edges with an endpoint for which `is_registered` is false
pub fn find_dangling_edges<F>(relations: &RelationManager, is_registered: F) -> Vec<EdgeRef>
where
    F: Fn(&NodeKey) -> bool,
{
    let mut dangling = Vec::new();

    for (name, edges) in &relations.edges {
        for (source, targets) in &edges.forward {
            for target in targets {
                if !is_registered(source) || !is_registered(target) {
                    dangling.push((name.clone(), source.clone(), target.clone()));
                }
            }
        }
    }

    dangling
}

/// Find empty adjacency sets left behind by removals
pub fn find_empty_partner_sets(relations: &RelationManager) -> Vec<(String, NodeKey)> {
    let mut empty = Vec::new();

    for (name, edges) in &relations.edges {
        for (node, partners) in edges.forward.iter().chain(edges.inverse.iter()) {
            if partners.is_empty() {
                empty.push((name.clone(), node.clone()));
            }
        }
    }

    empty
}

/// Find nodes that are their own descendant in a parent/child relation
///
/// Returns `(relation, node)` for each node on a cycle.
pub fn find_cycles(relations: &RelationManager) -> Vec<(String, NodeKey)> {
    let mut cycles = Vec::new();

    for decl in relations.registry().iter() {
        if decl.cardinality != Cardinality::ParentChild {
            continue;
        }
        let Some(edges) = relations.edges.get(&decl.name) else {
            continue;
        };
        for start in edges.forward.keys() {
            if reaches(edges, start) {
                cycles.push((decl.name.clone(), start.clone()));
            }
        }
    }

    cycles
}

// DFS over forward edges, true if `start` is reachable from itself
fn reaches(edges: &crate::ops::relations::Edges, start: &NodeKey) -> bool {
    let mut seen = HashSet::new();
    let mut stack: Vec<&NodeKey> = edges
        .forward
        .get(start)
        .map(|children| children.iter().collect())
        .unwrap_or_default();

    while let Some(node) = stack.pop() {
        if node == start {
            return true;
        }
        if !seen.insert(node) {
            continue;
        }
        if let Some(children) = edges.forward.get(node) {
            stack.extend(children.iter());
        }
    }

    false
}

/// Find disagreements between the name and id lookup paths of an index
///
/// Returns a description per inconsistency.
pub fn find_index_inconsistencies<T: HasIdentity>(index: &UniqueObjectIndex<T>) -> Vec<String> {
    let mut problems = Vec::new();

    for object in index.iter() {
        if object.kind() != index.kind() {
            problems.push(format!("{} stored in {} index", object.identity(), index.kind()));
        }
        if object.unique().owner() != Some(index.index_id()) {
            problems.push(format!("{} does not point back to its index", object.identity()));
        }
        match object.id() {
            None => problems.push(format!("{} has no resolved id", object.identity())),
            Some(id) => {
                if index.name_of_id(id) != Some(object.name()) {
                    problems.push(format!(
                        "id {} maps to {:?}, expected '{}'",
                        id,
                        index.name_of_id(id),
                        object.name()
                    ));
                }
            }
        }
    }

    if index.id_count() != index.len() {
        problems.push(format!(
            "{} ids for {} objects",
            index.id_count(),
            index.len()
        ));
    }

    problems
}
