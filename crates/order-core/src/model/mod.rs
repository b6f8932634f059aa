pub mod aux_store;
pub mod identity;
pub mod kinds;
pub mod object;
pub mod tags;

pub use aux_store::{merge_values, AuxStore, MergePolicy};
pub use identity::{IdSpec, IdentityKey, Kind, NodeKey, ObjectRef};
pub use kinds::{Campaign, Category, Channel, Dataset, Process, Variable};
pub use object::{
    Entity, FromIdentity, HasAux, HasIdentity, HasRelations, HasTags, IdentityAccess, IndexId,
    UniqueObject,
};
pub use tags::{PatternSyntax, TagMatchMode, TagSet};
