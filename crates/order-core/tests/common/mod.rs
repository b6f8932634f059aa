use order_core::model::kinds::builtin_relations;
use order_core::model::kinds::{Category, CATEGORY};
use order_core::model::IdSpec;
use order_core::{Analysis, RegistryConfig, RelationManager, RelationRegistry, UniqueObjectIndex};

/// Create an empty analysis with the default configuration
#[allow(dead_code)]
pub fn new_analysis() -> Analysis {
    Analysis::new(RegistryConfig::default()).expect("default config is valid")
}

/// Create a category index plus a relation manager with the built-in relations
#[allow(dead_code)]
pub fn category_registry() -> (UniqueObjectIndex<Category>, RelationManager) {
    let registry = RelationRegistry::from_decls(builtin_relations()).expect("built-in relations");
    (UniqueObjectIndex::new(CATEGORY), RelationManager::new(registry))
}

/// Register categories with auto ids, in order
#[allow(dead_code)]
pub fn add_categories(index: &mut UniqueObjectIndex<Category>, names: &[&str]) {
    for name in names {
        index
            .add_new(*name, IdSpec::Auto)
            .expect("category should register");
    }
}

/// Register a chain `names[0] -> names[1] -> ...` in an analysis
#[allow(dead_code)]
pub fn category_chain(analysis: &mut Analysis, names: &[&str], relation: &str) {
    for name in names {
        analysis
            .add_new::<Category>(*name, IdSpec::Auto)
            .expect("category should register");
    }
    for pair in names.windows(2) {
        analysis
            .link_parent_child::<Category>(pair[0], pair[1], relation)
            .expect("chain link should succeed");
    }
}
