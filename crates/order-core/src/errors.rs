use thiserror::Error;

use crate::model::identity::ObjectRef;

/// Result type alias using OrderError
pub type Result<T> = std::result::Result<T, OrderError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// This taxonomy provides a stable, structured classification of all errors
/// raised by the registry. Each kind maps to a stable error code that can be
/// used for programmatic error handling, testing, and log assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Identity
    InvalidIdentity,
    AlreadyExists,
    AlreadyRegistered,
    KindMismatch,
    NotFound,

    // Auxiliary data
    AuxiliaryKey,
    AuxiliaryConflict,

    // Relations
    CycleDetected,
    RelationNotFound,
    RelationConflict,

    // Validation
    InvalidInput,
    InvalidAttribute,
    InvalidConfig,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidIdentity => "ERR_INVALID_IDENTITY",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::AlreadyRegistered => "ERR_ALREADY_REGISTERED",
            ExErrorKind::KindMismatch => "ERR_KIND_MISMATCH",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AuxiliaryKey => "ERR_AUXILIARY_KEY",
            ExErrorKind::AuxiliaryConflict => "ERR_AUXILIARY_CONFLICT",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::RelationNotFound => "ERR_RELATION_NOT_FOUND",
            ExErrorKind::RelationConflict => "ERR_RELATION_CONFLICT",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidAttribute => "ERR_INVALID_ATTRIBUTE",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification of an [`OrderError`] plus the context a log
/// line or a calling layer needs: the operation, the object and the relation
/// involved.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    object: Option<String>,
    relation: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            object: None,
            relation: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add object context (usually `kind:name`)
    pub fn with_object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Add relation context
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn object(&self) -> Option<&str> {
        self.object.as_deref()
    }

    pub fn relation(&self) -> Option<&str> {
        self.relation.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(object) = &self.object {
            write!(f, " (object: {})", object)?;
        }
        if let Some(relation) = &self.relation {
            write!(f, " (relation: {})", relation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for registry, relation and copy operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    // ===== Identity Errors =====
    /// Name or id failed validation at construction or rename
    #[error("Invalid identity for {kind} '{name}': {reason}")]
    InvalidIdentity {
        kind: String,
        name: String,
        reason: String,
    },

    /// Name or resolved id already present in the index
    #[error("Duplicate {kind} object: {key}")]
    DuplicateObject { kind: String, key: ObjectRef },

    /// Lookup miss without a default
    #[error("{kind} object not found: {key}")]
    ObjectNotFound { kind: String, key: ObjectRef },

    /// Object is already owned by another index
    #[error("{kind} object '{name}' is already registered in another index")]
    AlreadyRegistered { kind: String, name: String },

    /// Object kind does not match the index kind
    #[error("Kind mismatch: expected {expected}, found {found}")]
    KindMismatch { expected: String, found: String },

    // ===== Auxiliary Errors =====
    #[error("Auxiliary data not found at path '{path}'")]
    AuxiliaryKeyError { path: String },

    #[error("Auxiliary path '{path}' is blocked by a non-mapping value at '{segment}'")]
    AuxiliaryPathConflict { path: String, segment: String },

    // ===== Relation Errors =====
    /// Parent/child link would create a cycle
    #[error("Cycle detected in relation {relation}: {child} is an ancestor of {parent}")]
    CyclicRelation {
        relation: String,
        parent: String,
        child: String,
    },

    /// Relation type was never declared
    #[error("Relation not declared: {relation}")]
    RelationNotFound { relation: String },

    #[error("Relation already declared: {relation}")]
    RelationAlreadyDeclared { relation: String },

    #[error("Relation {relation} expects {expected} but got {found}")]
    RelationKindMismatch {
        relation: String,
        expected: String,
        found: String,
    },

    // ===== Validation Errors =====
    #[error("Invalid tag pattern '{pattern}': {reason}")]
    InvalidTagPattern { pattern: String, reason: String },

    #[error("Invalid {attribute} on '{object}': {reason}")]
    InvalidAttribute {
        object: String,
        attribute: String,
        reason: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // ===== Generic Errors =====
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<OrderError> for ExError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidIdentity { kind, name, reason } => {
                ExError::new(ExErrorKind::InvalidIdentity)
                    .with_object(format!("{}:{}", kind, name))
                    .with_message(reason)
            }

            OrderError::DuplicateObject { kind, key } => ExError::new(ExErrorKind::AlreadyExists)
                .with_object(format!("{}:{}", kind, key))
                .with_message("Object already exists in index"),

            OrderError::ObjectNotFound { kind, key } => ExError::new(ExErrorKind::NotFound)
                .with_object(format!("{}:{}", kind, key))
                .with_message("Object not found"),

            OrderError::AlreadyRegistered { kind, name } => {
                ExError::new(ExErrorKind::AlreadyRegistered)
                    .with_object(format!("{}:{}", kind, name))
                    .with_message("Object is owned by another index")
            }

            OrderError::KindMismatch { expected, found } => {
                ExError::new(ExErrorKind::KindMismatch)
                    .with_message(format!("Expected {}, found {}", expected, found))
            }

            OrderError::AuxiliaryKeyError { path } => ExError::new(ExErrorKind::AuxiliaryKey)
                .with_message(format!("Missing auxiliary path {}", path)),

            OrderError::AuxiliaryPathConflict { path, segment } => {
                ExError::new(ExErrorKind::AuxiliaryConflict).with_message(format!(
                    "Path {} blocked by non-mapping value at {}",
                    path, segment
                ))
            }

            OrderError::CyclicRelation {
                relation,
                parent,
                child,
            } => ExError::new(ExErrorKind::CycleDetected)
                .with_relation(relation)
                .with_object(child)
                .with_message(format!("Linking under {} would create a cycle", parent)),

            OrderError::RelationNotFound { relation } => {
                ExError::new(ExErrorKind::RelationNotFound)
                    .with_relation(relation)
                    .with_message("Relation not declared")
            }

            OrderError::RelationAlreadyDeclared { relation } => {
                ExError::new(ExErrorKind::RelationConflict)
                    .with_relation(relation)
                    .with_message("Relation already declared")
            }

            OrderError::RelationKindMismatch {
                relation,
                expected,
                found,
            } => ExError::new(ExErrorKind::KindMismatch)
                .with_relation(relation)
                .with_message(format!("Expected {}, found {}", expected, found)),

            OrderError::InvalidTagPattern { pattern, reason } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_message(format!("Invalid tag pattern {}: {}", pattern, reason))
            }

            OrderError::InvalidAttribute {
                object,
                attribute,
                reason,
            } => ExError::new(ExErrorKind::InvalidAttribute)
                .with_object(object)
                .with_message(format!("{}: {}", attribute, reason)),

            OrderError::InvalidConfig { reason } => {
                ExError::new(ExErrorKind::InvalidConfig).with_message(reason)
            }

            OrderError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}
