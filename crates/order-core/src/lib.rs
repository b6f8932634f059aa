//! Order Core - unique-object registry and relational graph engine
//!
//! This crate provides the data model behind a physics-analysis
//! configuration:
//! - globally unique objects with a `(kind, name, id)` identity, nested
//!   auxiliary data and tags
//! - per-kind indices with synchronized name and id lookup
//! - typed many-to-many and acyclic parent/child relations with automatic
//!   inverse bookkeeping
//! - deep copies with selectable relations and auxiliary data
//! - built-in analysis kinds (campaigns, datasets, processes, channels,
//!   categories, variables) owned by an [`Analysis`]
//!
//! Everything is synchronous and in-memory.
//!
//! # Example
//!
//! ```
//! use order_core::model::kinds::{Category, CATEGORY_CHILDREN};
//! use order_core::model::{HasIdentity, IdSpec};
//! use order_core::{Analysis, RegistryConfig};
//!
//! let mut analysis = Analysis::new(RegistryConfig::default()).unwrap();
//! for name in ["incl", "ee", "ee_2j"] {
//!     analysis.add_new::<Category>(name, IdSpec::Auto).unwrap();
//! }
//! analysis.link_parent_child::<Category>("incl", "ee", CATEGORY_CHILDREN).unwrap();
//! analysis.link_parent_child::<Category>("ee", "ee_2j", CATEGORY_CHILDREN).unwrap();
//!
//! let names: Vec<_> = analysis
//!     .walk_descendants::<Category>("incl", CATEGORY_CHILDREN)
//!     .unwrap()
//!     .into_iter()
//!     .map(|category| category.name().to_string())
//!     .collect();
//! assert_eq!(names, ["ee", "ee_2j"]);
//! ```

pub mod config;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod rules;

pub use order_core_types::schema;

// Re-export commonly used types
pub use config::RegistryConfig;
pub use errors::{ExError, ExErrorKind, OrderError, Result};
pub use model::{
    AuxStore, HasAux, HasIdentity, HasTags, IdSpec, Kind, NodeKey, ObjectRef, UniqueObject,
};
pub use ops::{
    Analysis, CopyOptions, IdPolicy, RelationDecl, RelationManager, RelationRegistry,
    UniqueObjectIndex,
};
