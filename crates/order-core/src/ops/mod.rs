pub mod analysis;
pub mod copy;
pub mod index;
pub mod relations;

pub use analysis::{Analysis, AnalysisKind};
pub use copy::{copy, copy_subtree, copy_with, AuxSelection, Copied, CopyOptions, PendingLink, RelationSelection};
pub use index::{IdPolicy, ObjectMut, UniqueObjectIndex, MAX_ID};
pub use relations::{
    Cardinality, Direction, RelationDecl, RelationManager, RelationRegistry, Walk,
};
