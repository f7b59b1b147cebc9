//! Error type tests

use scr_domain::Error;
use std::error::Error as _;

#[test]
fn test_error_messages() {
    assert_eq!(
        Error::already_disposed(7).to_string(),
        "Component instance 7 is already disposed"
    );
    assert_eq!(
        Error::unsatisfied("consumer", "reference 'data' has 0 of 1 required services").to_string(),
        "Unsatisfied dependency for component 'consumer': reference 'data' has 0 of 1 required services"
    );
    assert_eq!(
        Error::filter_syntax("(a=b", 4, "expected ')'").to_string(),
        "Filter syntax error in '(a=b' at position 4: expected ')'"
    );
}

#[test]
fn test_activation_failure_keeps_source() {
    let cause = Error::internal("boom");
    let err = Error::activation_failed_with_source("consumer", "activate failed", cause);
    assert!(err.is_activation_failure());
    assert!(!err.is_unsatisfied());
    assert_eq!(
        err.source().map(|e| e.to_string()),
        Some("Internal error: boom".to_string())
    );
}

#[test]
fn test_json_errors_convert() {
    let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
    let err: Error = parse.unwrap_err().into();
    assert!(matches!(err, Error::Json { .. }));
}
