use crate::errors::{OrderError, Result};
use crate::model::HasIdentity;
use crate::ops::{RelationManager, UniqueObjectIndex};

use super::invariants;

/// Validate that both lookup paths of an index hold the same objects
///
/// # Errors
///
/// Returns `Internal` describing the first inconsistency found. Call
/// [`invariants::find_index_inconsistencies`] for all of them.
pub fn validate_index<T: HasIdentity>(index: &UniqueObjectIndex<T>) -> Result<()> {
    match invariants::find_index_inconsistencies(index).into_iter().next() {
        Some(problem) => Err(OrderError::Internal { message: problem }),
        None => Ok(()),
    }
}

/// Validate the relation graph
///
/// Checks that forward and inverse indices mirror each other, that no empty
/// partner set is left behind and that every parent/child relation is
/// acyclic.
///
/// # Errors
///
/// - `Internal` for an asymmetric edge or an empty partner set
/// - `CyclicRelation` for a cycle in a parent/child relation
pub fn validate_relations(relations: &RelationManager) -> Result<()> {
    if let Some((relation, source, target)) = invariants::find_asymmetric_edges(relations).first() {
        return Err(OrderError::Internal {
            message: format!(
                "edge {} -> {} in {} is not mirrored",
                source, target, relation
            ),
        });
    }

    if let Some((relation, node)) = invariants::find_empty_partner_sets(relations).first() {
        return Err(OrderError::Internal {
            message: format!("empty partner set for {} in {}", node, relation),
        });
    }

    if let Some((relation, node)) = invariants::find_cycles(relations).first() {
        return Err(OrderError::CyclicRelation {
            relation: relation.clone(),
            parent: node.to_string(),
            child: node.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::identity::NodeKey;
    use crate::model::kinds::{builtin_relations, Category, CATEGORY, CATEGORY_CHILDREN};
    use crate::model::IdSpec;
    use crate::ops::RelationRegistry;

    fn setup() -> (UniqueObjectIndex<Category>, RelationManager) {
        let registry = RelationRegistry::from_decls(builtin_relations()).unwrap();
        (UniqueObjectIndex::new(CATEGORY), RelationManager::new(registry))
    }

    #[test]
    fn test_consistent_state_validates() {
        let (mut idx, mut rel) = setup();
        idx.add_new("a", IdSpec::Auto).unwrap();
        idx.add_new("b", IdSpec::Auto).unwrap();
        rel.link(idx.get("a").unwrap(), idx.get("b").unwrap(), CATEGORY_CHILDREN)
            .unwrap();

        validate_index(&idx).unwrap();
        validate_relations(&rel).unwrap();
    }

    #[test]
    fn test_detects_asymmetric_edge() {
        let (_, mut rel) = setup();
        let a = NodeKey::new(CATEGORY, "a");
        let b = NodeKey::new(CATEGORY, "b");
        rel.link_nodes(a.clone(), b.clone(), CATEGORY_CHILDREN)
            .unwrap();
        if let Some(edges) = rel.edges.get_mut(CATEGORY_CHILDREN) {
            edges.inverse.clear();
        }

        assert!(matches!(
            validate_relations(&rel),
            Err(OrderError::Internal { .. })
        ));
        assert_eq!(
            invariants::find_asymmetric_edges(&rel),
            vec![(CATEGORY_CHILDREN.to_string(), a, b)]
        );
    }

    #[test]
    fn test_detects_cycle_inserted_behind_the_manager() {
        let (_, mut rel) = setup();
        let a = NodeKey::new(CATEGORY, "a");
        let b = NodeKey::new(CATEGORY, "b");
        rel.link_nodes(a.clone(), b.clone(), CATEGORY_CHILDREN)
            .unwrap();
        if let Some(edges) = rel.edges.get_mut(CATEGORY_CHILDREN) {
            edges.forward.entry(b.clone()).or_default().insert(a.clone());
            edges.inverse.entry(a).or_default().insert(b);
        }

        assert!(matches!(
            validate_relations(&rel),
            Err(OrderError::CyclicRelation { .. })
        ));
    }
}
