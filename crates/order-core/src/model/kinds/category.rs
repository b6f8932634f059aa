use super::label::{to_root_latex, Label};
use super::selection::{Selection, SelectionMode};
use super::{
    builtin_relations_named, CATEGORY, CATEGORY_CHILDREN, CATEGORY_VARIABLES, CHANNEL_CATEGORIES,
};
use crate::errors::Result;
use crate::model::{FromIdentity, HasIdentity, HasRelations, IdSpec, UniqueObject};
use crate::ops::relations::RelationDecl;
use crate::unique_object;

/// Category - a phase-space region defined by a selection
///
/// Categories nest through the `category_children` relation; a category may
/// have several parents as long as no cycle is formed.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    unique: UniqueObject,
    selection: Selection,
    label: Label,
}

unique_object!(Category, unique);

impl Category {
    /// Create a new, unregistered category selecting everything
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentity` for an invalid name or id.
    pub fn new(name: impl Into<String>, id: impl Into<IdSpec>) -> Result<Self> {
        Ok(Self::from_unique(UniqueObject::new(CATEGORY, name, id)?))
    }

    pub fn with_selection(mut self, selection: &str) -> Self {
        self.selection.set(selection);
        self
    }

    pub fn selection(&self) -> &str {
        self.selection.as_str()
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection.mode()
    }

    pub fn set_selection(&mut self, selection: &str) {
        self.selection.set(selection);
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.selection.set_mode(mode);
    }

    /// Combine another selection with the current one
    pub fn add_selection(&mut self, selection: &str, op: Option<&str>, bracket: bool) {
        self.selection.add(selection, op, bracket);
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
}

impl FromIdentity for Category {
    fn from_unique(unique: UniqueObject) -> Self {
        Self {
            unique,
            selection: Selection::default(),
            label: Label::default(),
        }
    }
}

impl HasRelations for Category {
    fn relation_decls() -> Vec<RelationDecl> {
        builtin_relations_named(&[CHANNEL_CATEGORIES, CATEGORY_CHILDREN, CATEGORY_VARIABLES])
    }
}
