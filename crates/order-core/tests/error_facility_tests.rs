use order_core::errors::{ExError, ExErrorKind, OrderError};
use order_core::model::kinds::{Category, CATEGORY_CHILDREN};
use order_core::model::{IdSpec, ObjectRef};

mod common;

#[test]
fn test_not_found_verifiable_by_kind() {
    let err = OrderError::ObjectNotFound {
        kind: "campaign".to_string(),
        key: ObjectRef::Id(4),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::NotFound);
    assert_eq!(ex_err.code(), "ERR_NOT_FOUND");
    assert_eq!(ex_err.object(), Some("campaign:id=4"));
}

#[test]
fn test_duplicate_distinct_from_already_registered() {
    let duplicate: ExError = OrderError::DuplicateObject {
        kind: "dataset".to_string(),
        key: ObjectRef::Name("ttbar".to_string()),
    }
    .into();
    let registered: ExError = OrderError::AlreadyRegistered {
        kind: "dataset".to_string(),
        name: "ttbar".to_string(),
    }
    .into();

    assert_eq!(duplicate.kind(), ExErrorKind::AlreadyExists);
    assert_eq!(registered.kind(), ExErrorKind::AlreadyRegistered);
    assert_ne!(duplicate.code(), registered.code());
}

#[test]
fn test_relation_errors_carry_relation() {
    let ex_err: ExError = OrderError::RelationKindMismatch {
        relation: "campaign_datasets".to_string(),
        expected: "parent_child".to_string(),
        found: "many_to_many".to_string(),
    }
    .into();

    assert_eq!(ex_err.kind(), ExErrorKind::KindMismatch);
    assert_eq!(ex_err.relation(), Some("campaign_datasets"));
    assert!(ex_err.message().contains("parent_child"));
}

#[test]
fn test_error_kind_code_mapping() {
    let kinds = vec![
        (ExErrorKind::InvalidIdentity, "ERR_INVALID_IDENTITY"),
        (ExErrorKind::AlreadyExists, "ERR_ALREADY_EXISTS"),
        (ExErrorKind::NotFound, "ERR_NOT_FOUND"),
        (ExErrorKind::CycleDetected, "ERR_CYCLE_DETECTED"),
        (ExErrorKind::RelationNotFound, "ERR_RELATION_NOT_FOUND"),
        (ExErrorKind::AuxiliaryKey, "ERR_AUXILIARY_KEY"),
        (ExErrorKind::InvalidConfig, "ERR_INVALID_CONFIG"),
    ];

    for (kind, expected_code) in kinds {
        assert_eq!(kind.code(), expected_code);
    }
}

#[test]
fn test_context_builders_and_display() {
    let root = ExError::new(ExErrorKind::NotFound).with_message("missing");
    let err = ExError::new(ExErrorKind::InvalidInput)
        .with_op("copy")
        .with_object("category:ee")
        .with_message("bad")
        .with_source(root);

    assert_eq!(err.op(), Some("copy"));
    assert_eq!(err.source_error().map(ExError::kind), Some(ExErrorKind::NotFound));
    assert_eq!(
        err.to_string(),
        "[ERR_INVALID_INPUT] in operation 'copy': bad (object: category:ee)"
    );
}

#[test]
fn test_operation_error_classifies_cycle() {
    // GIVEN a -> b
    let mut analysis = common::new_analysis();
    common::category_chain(&mut analysis, &["a", "b"], CATEGORY_CHILDREN);

    // WHEN closing the cycle
    let err = analysis
        .link_parent_child::<Category>("b", "a", CATEGORY_CHILDREN)
        .unwrap_err();

    // THEN the structured error names the relation
    let ex_err: ExError = err.into();
    assert_eq!(ex_err.kind(), ExErrorKind::CycleDetected);
    assert_eq!(ex_err.relation(), Some(CATEGORY_CHILDREN));
}

#[test]
fn test_invalid_identity_classified() {
    let mut analysis = common::new_analysis();

    let err = analysis
        .add_new::<Category>("a.b", IdSpec::Auto)
        .unwrap_err();

    let ex_err: ExError = err.into();
    assert_eq!(ex_err.kind(), ExErrorKind::InvalidIdentity);
    assert_eq!(ex_err.object(), Some("category:a.b"));
}
