use super::{builtin_relations_named, CAMPAIGN_DATASETS, DATASET, DATASET_PROCESSES};
use crate::errors::Result;
use crate::model::{FromIdentity, HasRelations, IdSpec, UniqueObject};
use crate::ops::relations::RelationDecl;
use crate::unique_object;

/// Dataset - a collection of recorded or simulated events
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    unique: UniqueObject,
    is_data: bool,
    n_events: Option<u64>,
}

unique_object!(Dataset, unique);

impl Dataset {
    /// Create a new, unregistered (simulated) dataset
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentity` for an invalid name or id.
    pub fn new(name: impl Into<String>, id: impl Into<IdSpec>) -> Result<Self> {
        Ok(Self::from_unique(UniqueObject::new(DATASET, name, id)?))
    }

    pub fn with_is_data(mut self, is_data: bool) -> Self {
        self.is_data = is_data;
        self
    }

    pub fn is_data(&self) -> bool {
        self.is_data
    }

    pub fn is_mc(&self) -> bool {
        !self.is_data
    }

    pub fn set_is_data(&mut self, is_data: bool) {
        self.is_data = is_data;
    }

    /// `"data"` or `"mc"`
    pub fn data_source(&self) -> &'static str {
        if self.is_data {
            "data"
        } else {
            "mc"
        }
    }

    pub fn n_events(&self) -> Option<u64> {
        self.n_events
    }

    pub fn set_n_events(&mut self, n_events: Option<u64>) {
        self.n_events = n_events;
    }
}

impl FromIdentity for Dataset {
    fn from_unique(unique: UniqueObject) -> Self {
        Self {
            unique,
            is_data: false,
            n_events: None,
        }
    }
}

impl HasRelations for Dataset {
    fn relation_decls() -> Vec<RelationDecl> {
        builtin_relations_named(&[CAMPAIGN_DATASETS, DATASET_PROCESSES])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source() {
        let mut dataset = Dataset::new("data_mu_b", IdSpec::Auto).unwrap();
        assert!(dataset.is_mc());
        assert_eq!(dataset.data_source(), "mc");

        dataset.set_is_data(true);
        assert!(dataset.is_data());
        assert_eq!(dataset.data_source(), "data");
    }

    #[test]
    fn test_relation_decls() {
        let names: Vec<_> = Dataset::relation_decls()
            .into_iter()
            .map(|decl| decl.name)
            .collect();
        assert_eq!(names, vec![CAMPAIGN_DATASETS, DATASET_PROCESSES]);
    }
}
