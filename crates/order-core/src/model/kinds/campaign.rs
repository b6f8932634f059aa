use super::{builtin_relations_named, CAMPAIGN, CAMPAIGN_DATASETS};
use crate::errors::{OrderError, Result};
use crate::model::{FromIdentity, HasIdentity, HasRelations, IdSpec, UniqueObject};
use crate::ops::relations::RelationDecl;
use crate::unique_object;

/// Campaign - a data-taking period (e.g. a year of recorded collisions)
#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    unique: UniqueObject,
    ecm: Option<f64>,
    bx: Option<f64>,
}

unique_object!(Campaign, unique);

impl Campaign {
    /// Create a new, unregistered campaign
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentity` for an invalid name or id.
    pub fn new(name: impl Into<String>, id: impl Into<IdSpec>) -> Result<Self> {
        Ok(Self::from_unique(UniqueObject::new(CAMPAIGN, name, id)?))
    }

    /// Centre-of-mass energy in GeV
    pub fn ecm(&self) -> Option<f64> {
        self.ecm
    }

    /// Bunch crossing spacing in ns
    pub fn bx(&self) -> Option<f64> {
        self.bx
    }

    pub fn set_bx(&mut self, bx: Option<f64>) {
        self.bx = bx;
    }

    /// Set the centre-of-mass energy in GeV
    ///
    /// # Errors
    ///
    /// Returns `InvalidAttribute` for a non-positive energy.
    pub fn set_ecm(&mut self, ecm: f64) -> Result<()> {
        if !(ecm > 0.0) {
            return Err(OrderError::InvalidAttribute {
                object: self.name().to_string(),
                attribute: "ecm".to_string(),
                reason: format!("must be positive, got {}", ecm),
            });
        }
        self.ecm = Some(ecm);
        Ok(())
    }
}

impl FromIdentity for Campaign {
    fn from_unique(unique: UniqueObject) -> Self {
        Self {
            unique,
            ecm: None,
            bx: None,
        }
    }
}

impl HasRelations for Campaign {
    fn relation_decls() -> Vec<RelationDecl> {
        builtin_relations_named(&[CAMPAIGN_DATASETS])
    }
}
