//! Built-in domain kinds of an analysis
//!
//! Every kind embeds a [`UniqueObject`](crate::model::UniqueObject) and opts
//! into the capability traits. The relation names below are declared by
//! [`builtin_relations`] and used by [`Analysis`](crate::ops::Analysis).

pub mod campaign;
pub mod category;
pub mod channel;
pub mod dataset;
pub mod label;
pub mod process;
pub mod selection;
pub mod variable;

pub use campaign::Campaign;
pub use category::Category;
pub use channel::Channel;
pub use dataset::Dataset;
pub use label::{to_root_latex, Label};
pub use process::Process;
pub use selection::{join_selection, Selection, SelectionMode};
pub use variable::{Binning, TitleOptions, Variable};

use super::identity::Kind;
use crate::ops::relations::RelationDecl;

pub const CAMPAIGN: Kind = Kind::from_static("campaign");
pub const DATASET: Kind = Kind::from_static("dataset");
pub const PROCESS: Kind = Kind::from_static("process");
pub const CHANNEL: Kind = Kind::from_static("channel");
pub const CATEGORY: Kind = Kind::from_static("category");
pub const VARIABLE: Kind = Kind::from_static("variable");

pub const CAMPAIGN_DATASETS: &str = "campaign_datasets";
pub const DATASET_PROCESSES: &str = "dataset_processes";
pub const PROCESS_CHILDREN: &str = "process_children";
pub const CHANNEL_CHILDREN: &str = "channel_children";
pub const CATEGORY_CHILDREN: &str = "category_children";
pub const CHANNEL_CATEGORIES: &str = "channel_categories";
pub const CATEGORY_VARIABLES: &str = "category_variables";

/// Declarations of every relation between the built-in kinds
pub fn builtin_relations() -> Vec<RelationDecl> {
    vec![
        RelationDecl::many_to_many(CAMPAIGN_DATASETS, CAMPAIGN, DATASET),
        RelationDecl::many_to_many(DATASET_PROCESSES, DATASET, PROCESS),
        RelationDecl::parent_child(PROCESS_CHILDREN, PROCESS),
        RelationDecl::parent_child(CHANNEL_CHILDREN, CHANNEL),
        RelationDecl::parent_child(CATEGORY_CHILDREN, CATEGORY),
        RelationDecl::many_to_many(CHANNEL_CATEGORIES, CHANNEL, CATEGORY),
        RelationDecl::many_to_many(CATEGORY_VARIABLES, CATEGORY, VARIABLE),
    ]
}

/// Subset of [`builtin_relations`] naming one of `names`
pub(crate) fn builtin_relations_named(names: &[&str]) -> Vec<RelationDecl> {
    builtin_relations()
        .into_iter()
        .filter(|decl| names.contains(&decl.name.as_str()))
        .collect()
}
