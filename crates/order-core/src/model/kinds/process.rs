use super::label::{to_root_latex, Label};
use super::{builtin_relations_named, DATASET_PROCESSES, PROCESS, PROCESS_CHILDREN};
use crate::errors::Result;
use crate::model::{FromIdentity, HasIdentity, HasRelations, IdSpec, UniqueObject};
use crate::ops::relations::RelationDecl;
use crate::unique_object;

/// Process - a physics process contributing events (signal or background)
///
/// Processes form a hierarchy through the `process_children` relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    unique: UniqueObject,
    is_data: bool,
    label: Label,
    color: Option<(u8, u8, u8)>,
}

unique_object!(Process, unique);

impl Process {
    /// Create a new, unregistered process
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentity` for an invalid name or id.
    pub fn new(name: impl Into<String>, id: impl Into<IdSpec>) -> Result<Self> {
        Ok(Self::from_unique(UniqueObject::new(PROCESS, name, id)?))
    }

    pub fn is_data(&self) -> bool {
        self.is_data
    }

    pub fn set_is_data(&mut self, is_data: bool) {
        self.is_data = is_data;
    }

    pub fn label(&self) -> &str {
        self.label.label(self.name())
    }

    pub fn label_short(&self) -> &str {
        self.label.short(self.name())
    }

    pub fn label_root(&self) -> String {
        to_root_latex(self.label())
    }

    pub fn set_label(&mut self, label: Option<String>, short: Option<String>) {
        self.label = Label::new(label, short);
    }

    pub fn color(&self) -> Option<(u8, u8, u8)> {
        self.color
    }

    pub fn set_color(&mut self, color: Option<(u8, u8, u8)>) {
        self.color = color;
    }
}

impl FromIdentity for Process {
    fn from_unique(unique: UniqueObject) -> Self {
        Self {
            unique,
            is_data: false,
            label: Label::default(),
            color: None,
        }
    }
}

impl HasRelations for Process {
    fn relation_decls() -> Vec<RelationDecl> {
        builtin_relations_named(&[DATASET_PROCESSES, PROCESS_CHILDREN])
    }
}
