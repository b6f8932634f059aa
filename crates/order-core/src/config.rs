//! Registry configuration
//!
//! A [`RegistryConfig`] selects the id policy of the indices, the relation
//! types declared at startup and the logging profile. It can be built in
//! code or loaded from TOML:
//!
//! ```toml
//! id_policy = "reuse_lowest_free"
//! log_profile = "production"
//!
//! [[relations]]
//! name = "variable_children"
//! source_kind = "variable"
//! target_kind = "variable"
//! cardinality = "parent_child"
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::errors::{OrderError, Result};
use crate::logging_facility::Profile;
use crate::model::kinds::builtin_relations;
use crate::ops::index::IdPolicy;
use crate::ops::relations::{Cardinality, RelationDecl, RelationRegistry};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default)]
    pub id_policy: IdPolicy,
    /// Declare the relations between the built-in kinds
    #[serde(default = "default_true")]
    pub builtin_relations: bool,
    /// Additional relation types
    #[serde(default)]
    pub relations: Vec<RelationDecl>,
    #[serde(default)]
    pub log_profile: Option<Profile>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            id_policy: IdPolicy::default(),
            builtin_relations: true,
            relations: Vec::new(),
            log_profile: None,
        }
    }
}

impl RegistryConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for malformed TOML, unknown fields or an
    /// inconsistent relation declaration.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: RegistryConfig =
            toml::from_str(input).map_err(|e| OrderError::InvalidConfig {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| OrderError::InvalidConfig {
            reason: format!("failed to read '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&input)
    }

    /// Every relation this configuration declares
    pub fn relation_decls(&self) -> Vec<RelationDecl> {
        let mut decls = if self.builtin_relations {
            builtin_relations()
        } else {
            Vec::new()
        };
        decls.extend(self.relations.iter().cloned());
        decls
    }

    /// Build the relation registry
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an inconsistent declaration.
    pub fn relation_registry(&self) -> Result<RelationRegistry> {
        self.validate()?;
        RelationRegistry::from_decls(self.relation_decls()).map_err(|e| {
            OrderError::InvalidConfig {
                reason: e.to_string(),
            }
        })
    }

    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for decl in self.relation_decls() {
            if decl.name.trim().is_empty() {
                return Err(OrderError::InvalidConfig {
                    reason: "relation name cannot be empty".to_string(),
                });
            }
            if decl.cardinality == Cardinality::ParentChild && decl.source_kind != decl.target_kind
            {
                return Err(OrderError::InvalidConfig {
                    reason: format!(
                        "parent/child relation '{}' links {} to {}",
                        decl.name, decl.source_kind, decl.target_kind
                    ),
                });
            }
            if !seen.insert(decl.name.clone()) {
                return Err(OrderError::InvalidConfig {
                    reason: format!("relation '{}' declared twice", decl.name),
                });
            }
        }
        Ok(())
    }
}
