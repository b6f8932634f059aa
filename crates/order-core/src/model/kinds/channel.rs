use super::label::{to_root_latex, Label};
use super::{builtin_relations_named, CHANNEL, CHANNEL_CATEGORIES, CHANNEL_CHILDREN};
use crate::errors::Result;
use crate::model::{FromIdentity, HasIdentity, HasRelations, IdSpec, UniqueObject};
use crate::ops::relations::RelationDecl;
use crate::unique_object;

/// Channel - a final-state signature of an analysis (e.g. dilepton)
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    unique: UniqueObject,
    label: Label,
}

unique_object!(Channel, unique);

impl Channel {
    /// Create a new, unregistered channel
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentity` for an invalid name or id.
    pub fn new(name: impl Into<String>, id: impl Into<IdSpec>) -> Result<Self> {
        Ok(Self::from_unique(UniqueObject::new(CHANNEL, name, id)?))
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

impl FromIdentity for Channel {
    fn from_unique(unique: UniqueObject) -> Self {
        Self {
            unique,
            label: Label::default(),
        }
    }
}

impl HasRelations for Channel {
    fn relation_decls() -> Vec<RelationDecl> {
        builtin_relations_named(&[CHANNEL_CHILDREN, CHANNEL_CATEGORIES])
    }
}
