use serde_json::json;

use order_core::errors::OrderError;
use order_core::model::kinds::{
    Campaign, Category, Dataset, Variable, CAMPAIGN, CAMPAIGN_DATASETS, CATEGORY_CHILDREN,
    CATEGORY_VARIABLES, DATASET,
};
use order_core::model::{AuxStore, HasAux, HasIdentity, HasTags, IdSpec, NodeKey};
use order_core::ops::{copy, AuxSelection, RelationSelection};
use order_core::{CopyOptions, UniqueObjectIndex};

mod common;

fn populated_dataset(analysis: &mut order_core::Analysis) {
    let mut dataset = Dataset::new("ttbar", IdSpec::Auto).unwrap();
    dataset.set_n_events(Some(1_000u64));
    dataset
        .aux_mut()
        .set(&["xsec", "value"], json!(831.76))
        .unwrap();
    dataset.aux_mut().set(&["generator"], json!("powheg")).unwrap();
    dataset.add_tag("top");
    analysis.add(dataset).unwrap();
}

#[test]
fn test_copy_is_deep_and_independent() {
    // GIVEN a dataset with aux data and tags
    let mut analysis = common::new_analysis();
    populated_dataset(&mut analysis);

    // WHEN copying it under a new name
    analysis
        .copy::<Dataset>("ttbar", CopyOptions::new().name("ttbar_alt"))
        .unwrap();

    // THEN the copy carries equal attributes and a fresh identity
    let source = analysis.get::<Dataset>("ttbar").unwrap().clone();
    let copied = analysis.get::<Dataset>("ttbar_alt").unwrap().clone();
    assert_eq!(copied.aux(), source.aux());
    assert_eq!(copied.tags(), source.tags());
    assert_eq!(copied.n_events(), Some(1_000));
    assert_ne!(copied.id(), source.id());

    // AND mutating the copy leaves the source untouched
    let mut copied = analysis.get_mut::<Dataset>("ttbar_alt").unwrap();
    copied
        .aux_mut()
        .set(&["xsec", "value"], json!(1.0))
        .unwrap();
    copied.add_tag("alt");
    copied.set_n_events(None);
    drop(copied);

    let source = analysis.get::<Dataset>("ttbar").unwrap();
    assert_eq!(
        source.aux().get(&["xsec", "value"]).unwrap(),
        &json!(831.76)
    );
    assert!(!source.has_tag("alt"));
    assert_eq!(source.n_events(), Some(1_000));
}

#[test]
fn test_copy_filters_aux_and_tags() {
    // GIVEN a dataset with two aux entries and a tag
    let mut analysis = common::new_analysis();
    populated_dataset(&mut analysis);

    // WHEN copying only one aux key, with an override and without tags
    let mut overrides = AuxStore::new();
    overrides.set(&["xsec", "unc"], json!(0.05)).unwrap();
    let options = CopyOptions::new()
        .name("ttbar_sys")
        .aux(AuxSelection::Keys(vec!["xsec".to_string()]))
        .aux_overrides(overrides)
        .tags(false);
    let copied = analysis.copy::<Dataset>("ttbar", options).unwrap();

    // THEN only the selected entries survive, merged with the override
    assert!(!copied.aux().contains(&["generator"]));
    assert_eq!(copied.aux().get(&["xsec", "value"]).unwrap(), &json!(831.76));
    assert_eq!(copied.aux().get(&["xsec", "unc"]).unwrap(), &json!(0.05));
    assert!(copied.tags().is_empty());
}

#[test]
fn test_copy_inherits_many_to_many_links_both_ways() {
    // GIVEN a category linked to a channel-independent variable and a parent
    let mut analysis = common::new_analysis();
    common::category_chain(&mut analysis, &["incl", "ee"], CATEGORY_CHILDREN);
    analysis.add_new::<Category>("ee_sub", IdSpec::Auto).unwrap();
    analysis
        .link_parent_child::<Category>("ee", "ee_sub", CATEGORY_CHILDREN)
        .unwrap();
    analysis.add_new::<Variable>("pt", IdSpec::Auto).unwrap();
    analysis
        .link::<Category, Variable>("ee", "pt", CATEGORY_VARIABLES)
        .unwrap();

    // WHEN copying ee
    analysis
        .copy::<Category>("ee", CopyOptions::new().name("ee_copy"))
        .unwrap();

    // THEN outgoing links are inherited
    let variables = analysis
        .targets::<Category, Variable>("ee_copy", CATEGORY_VARIABLES)
        .unwrap();
    assert_eq!(variables.len(), 1);
    let children = analysis
        .targets::<Category, Category>("ee_copy", CATEGORY_CHILDREN)
        .unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name(), "ee_sub");

    // AND the parent is not
    assert!(analysis
        .sources::<Category, Category>("ee_copy", CATEGORY_CHILDREN)
        .unwrap()
        .is_empty());
    analysis.validate().unwrap();
}

#[test]
fn test_copy_inverse_many_to_many_links() {
    // GIVEN a campaign holding a dataset
    let mut analysis = common::new_analysis();
    analysis.add_new::<Campaign>("2017", IdSpec::Auto).unwrap();
    analysis.add_new::<Dataset>("data_B", IdSpec::Auto).unwrap();
    analysis
        .link::<Campaign, Dataset>("2017", "data_B", CAMPAIGN_DATASETS)
        .unwrap();

    // WHEN copying the dataset
    analysis
        .copy::<Dataset>("data_B", CopyOptions::new().name("data_C"))
        .unwrap();

    // THEN the campaign holds both
    let datasets = analysis
        .targets::<Campaign, Dataset>("2017", CAMPAIGN_DATASETS)
        .unwrap();
    let names: Vec<_> = datasets.iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["data_B", "data_C"]);
}

#[test]
fn test_copy_without_relations() {
    let mut analysis = common::new_analysis();
    analysis.add_new::<Category>("ee", IdSpec::Auto).unwrap();
    analysis.add_new::<Variable>("pt", IdSpec::Auto).unwrap();
    analysis
        .link::<Category, Variable>("ee", "pt", CATEGORY_VARIABLES)
        .unwrap();

    let options = CopyOptions::new()
        .name("ee2")
        .relations(RelationSelection::None);
    let copied = analysis.copy::<Category>("ee", options).unwrap().node_key();

    assert!(!analysis.relations().is_linked(&copied));
}

#[test]
fn test_copy_with_clashing_name_leaves_state_unchanged() {
    // GIVEN two linked categories
    let mut analysis = common::new_analysis();
    common::category_chain(&mut analysis, &["a", "b"], CATEGORY_CHILDREN);
    let edges_before = analysis.relations().edge_count(CATEGORY_CHILDREN).unwrap();
    let next_before = analysis.categories().peek_next_id();

    // WHEN copying b onto the existing name a
    let result = analysis.copy::<Category>("b", CopyOptions::new().name("a"));

    // THEN the copy is refused and nothing changed
    assert!(matches!(result, Err(OrderError::DuplicateObject { .. })));
    assert_eq!(analysis.categories().len(), 2);
    assert_eq!(
        analysis.relations().edge_count(CATEGORY_CHILDREN).unwrap(),
        edges_before
    );
    assert_eq!(analysis.categories().peek_next_id(), next_before);
}

#[test]
fn test_unregistered_copy_then_register() {
    // GIVEN a registered category tree
    let (mut index, mut relations) = common::category_registry();
    common::add_categories(&mut index, &["p", "c"]);
    relations
        .link(index.get("p").unwrap(), index.get("c").unwrap(), CATEGORY_CHILDREN)
        .unwrap();

    // WHEN copying p without registering
    let copied = copy(
        index.get("p").unwrap(),
        &relations,
        CopyOptions::new().name("p2").id(7u32),
    )
    .unwrap();

    // THEN the copy is free-standing with one pending link
    assert!(!copied.object.is_registered());
    assert_eq!(copied.links.len(), 1);
    assert_eq!(copied.links[0].partner, NodeKey::new(index.kind().clone(), "c"));
    assert_eq!(relations.edge_count(CATEGORY_CHILDREN).unwrap(), 1);

    // WHEN registering it
    let registered = copied.register(&mut index, &mut relations, |_| false).unwrap();

    // THEN the copy is owned and linked
    assert!(registered.is_registered());
    assert_eq!(registered.id(), Some(7));
    let p2 = NodeKey::new(index.kind().clone(), "p2");
    let children = relations.children(&p2, CATEGORY_CHILDREN).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name, "c");
}

#[test]
fn test_register_fails_when_partner_was_removed() {
    // GIVEN a campaign holding one dataset, in standalone indices
    let (_, mut relations) = common::category_registry();
    let mut campaigns = UniqueObjectIndex::<Campaign>::new(CAMPAIGN);
    let mut datasets = UniqueObjectIndex::<Dataset>::new(DATASET);
    campaigns.add_new("2017", IdSpec::Auto).unwrap();
    datasets.add_new("data_B", IdSpec::Auto).unwrap();
    relations
        .link(
            campaigns.get("2017").unwrap(),
            datasets.get("data_B").unwrap(),
            CAMPAIGN_DATASETS,
        )
        .unwrap();

    // AND an unregistered copy of the campaign
    let copied = copy(
        campaigns.get("2017").unwrap(),
        &relations,
        CopyOptions::new().name("2018"),
    )
    .unwrap();
    assert_eq!(copied.links.len(), 1);

    // WHEN the dataset is removed before the copy is registered
    datasets.remove("data_B", &mut relations).unwrap();
    let next_before = campaigns.peek_next_id();
    let result = copied.register(&mut campaigns, &mut relations, |node| {
        node.kind == DATASET && datasets.contains(node.name.as_str())
    });

    // THEN registration is refused and nothing dangles
    assert!(matches!(result, Err(OrderError::ObjectNotFound { .. })));
    assert!(!campaigns.contains("2018"));
    assert_eq!(campaigns.peek_next_id(), next_before);
    assert_eq!(relations.edge_count(CAMPAIGN_DATASETS).unwrap(), 0);
    assert!(!relations.is_linked(&NodeKey::new(DATASET, "data_B")));
}

#[test]
fn test_register_fails_when_same_kind_partner_was_removed() {
    let (mut index, mut relations) = common::category_registry();
    common::add_categories(&mut index, &["p", "c"]);
    relations
        .link(index.get("p").unwrap(), index.get("c").unwrap(), CATEGORY_CHILDREN)
        .unwrap();
    let copied = copy(index.get("p").unwrap(), &relations, CopyOptions::new().name("p2")).unwrap();

    index.remove("c", &mut relations).unwrap();
    // the callback is not consulted for partners of the index's own kind
    let result = copied.register(&mut index, &mut relations, |_| true);

    assert!(matches!(result, Err(OrderError::ObjectNotFound { .. })));
    assert!(!index.contains("p2"));
}

#[test]
fn test_copy_with_callback_in_analysis() {
    // GIVEN a category linked to a variable
    let mut analysis = common::new_analysis();
    analysis
        .add(
            Category::new("ee", IdSpec::Auto)
                .unwrap()
                .with_selection("n_e == 2"),
        )
        .unwrap();
    analysis.add_new::<Variable>("pt", IdSpec::Auto).unwrap();
    analysis
        .link::<Category, Variable>("ee", "pt", CATEGORY_VARIABLES)
        .unwrap();

    // WHEN copying with a callback that rewrites the selection and tags
    analysis
        .copy_with::<Category, _>("ee", CopyOptions::new().name("ee_tight"), |source, copy| {
            copy.set_selection(&format!("{} && pt > 30", source.selection()));
            copy.add_tag("tight");
        })
        .unwrap();

    // THEN the rewritten copy is registered and linked
    let tight = analysis.get::<Category>("ee_tight").unwrap();
    assert_eq!(tight.selection(), "((n_e == 2) && pt > 30)");
    assert!(tight.has_tag("tight"));
    assert!(!analysis.get::<Category>("ee").unwrap().has_tag("tight"));
    let variables = analysis
        .targets::<Category, Variable>("ee_tight", CATEGORY_VARIABLES)
        .unwrap();
    assert_eq!(variables.len(), 1);
    analysis.validate().unwrap();
}

#[test]
fn test_copy_subtree_mirrors_tree() {
    // GIVEN root -> {a -> a1, b}
    let mut analysis = common::new_analysis();
    for name in ["root", "a", "a1", "b"] {
        analysis.add_new::<Category>(name, IdSpec::Auto).unwrap();
    }
    for (parent, child) in [("root", "a"), ("a", "a1"), ("root", "b")] {
        analysis
            .link_parent_child::<Category>(parent, child, CATEGORY_CHILDREN)
            .unwrap();
    }

    // WHEN copying the subtree with a suffix
    let new_root = analysis
        .copy_subtree::<Category, _>("root", CATEGORY_CHILDREN, |name| format!("{name}_up"))
        .unwrap();

    // THEN the copy has the same shape
    assert_eq!(new_root.name, "root_up");
    let walked: Vec<_> = analysis
        .walk_descendants::<Category>("root_up", CATEGORY_CHILDREN)
        .unwrap()
        .into_iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(walked, vec!["a_up", "a1_up", "b_up"]);
    assert_eq!(analysis.categories().len(), 8);
    analysis.validate().unwrap();
}

#[test]
fn test_copy_subtree_name_clash_is_atomic() {
    let mut analysis = common::new_analysis();
    common::category_chain(&mut analysis, &["x", "y"], CATEGORY_CHILDREN);
    analysis.add_new::<Category>("y_copy", IdSpec::Auto).unwrap();

    let result =
        analysis.copy_subtree::<Category, _>("x", CATEGORY_CHILDREN, |name| format!("{name}_copy"));

    assert!(matches!(result, Err(OrderError::DuplicateObject { .. })));
    assert!(analysis.find::<Category>("x_copy").is_none());
    assert_eq!(analysis.categories().len(), 3);
}
