// ErrorIds test suite: stable, per-object correlation identifiers.
use std::fmt;
use weak_identity_map::{Error, ErrorIds, Referent, WeakReferent};

#[derive(Debug)]
struct Failure {
    message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Failure {}

// Every instance equals every other one, like an error type with a
// degenerate equality.
#[derive(Debug)]
struct AlwaysEqual;

impl PartialEq for AlwaysEqual {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

fn failure(msg: &str) -> Referent<Failure> {
    Referent::new(Failure {
        message: msg.to_string(),
    })
}

// Test: the same instance always gets the same identifier, a different
// instance a different one.
#[test]
fn stable_for_one_instance_unique_across_instances() {
    let _ = env_logger::builder().is_test(true).try_init();
    let ids = ErrorIds::new();
    let e = failure("boom");
    let id = ids.unique_id(&e);
    assert!(!id.trim().is_empty());
    assert_eq!(id, ids.unique_id(&e));
    assert_eq!(id, ids.unique_id(&e.clone()));
    assert_ne!(id, ids.unique_id(&failure("boom")));
}

// Test: value-equal instances still get distinct identifiers.
#[test]
fn value_equal_instances_differ() {
    let ids = ErrorIds::new();
    let a = Referent::new(AlwaysEqual);
    let b = Referent::new(AlwaysEqual);
    assert_eq!(a, b);
    assert_ne!(ids.unique_id(&a), ids.unique_id(&b));
}

// Test: identifiers are forgotten once the error is dropped.
#[test]
fn dropped_errors_are_forgotten() {
    let ids = ErrorIds::new();
    let kept = failure("kept");
    ids.unique_id(&kept);
    {
        let transient = failure("transient");
        ids.unique_id(&transient);
        assert_eq!(ids.len(), 2);
    }
    assert_eq!(ids.len(), 1);
    drop(kept);
    assert!(ids.is_empty());
}

// Test: the sequence keeps growing, so re-identifying a new error after
// the old one died never repeats an identifier.
#[test]
fn identifiers_never_repeat_within_a_service() {
    let ids = ErrorIds::new();
    let mut seen = std::collections::HashSet::new();
    for _ in 0..100 {
        let e = failure("same");
        assert!(seen.insert(ids.unique_id(&e)));
    }
}

// Test: separate services are independent; reset restarts a service.
#[test]
fn services_are_independent_and_resettable() {
    let ids = ErrorIds::new();
    let other = ErrorIds::new();
    let e = failure("x");
    let first = ids.unique_id(&e);
    let _ = other.unique_id(&e);
    assert_eq!(other.len(), 1);

    ids.reset();
    assert!(ids.is_empty());
    assert_eq!(other.len(), 1);
    // Same object, same counter position after reset: same derivation.
    assert_eq!(ids.unique_id(&e), first);
}

// Test: weak and null arguments.
#[test]
fn try_unique_id_rejects_null() {
    let ids: ErrorIds<Failure> = ErrorIds::new();
    let null = WeakReferent::new();
    assert_eq!(
        ids.try_unique_id(&null),
        Err(Error::ArgumentNull { name: "error" })
    );
    assert!(ids.is_empty());

    let e = failure("live");
    let via_weak = ids.try_unique_id(&e.downgrade()).unwrap();
    assert_eq!(via_weak, ids.unique_id(&e));
}

// Test: pre-assigned identifiers are kept and cannot be overwritten.
#[test]
fn assign_seeds_identifier_once() {
    let ids = ErrorIds::new();
    let e = failure("upstream");
    ids.assign(&e, "req-7f3a".to_string()).unwrap();
    assert_eq!(ids.unique_id(&e), "req-7f3a");
    let err = ids.assign(&e, "req-other".to_string()).unwrap_err();
    assert_eq!(err, Error::PropertyAlreadySet { name: "id" });
    assert_eq!(err.to_string(), "Property [id] has already been set.");

    let minted = failure("minted");
    ids.unique_id(&minted);
    assert!(ids.assign(&minted, "late".to_string()).is_err());
}
