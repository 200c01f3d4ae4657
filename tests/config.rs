use ferrous_scoped::{DiError, ExecutorOptions};
use serial_test::serial;
use std::env;
use std::time::Duration;

const PREFIX: &str = "FERROUS_SCOPED_TEST_";

fn clear() {
    for key in ["NAME", "MAX_CONCURRENCY", "TIMEOUT_MS"] {
        env::remove_var(format!("{}{}", PREFIX, key));
    }
}

#[test]
#[serial]
fn test_from_env_reads_prefixed_variables() {
    clear();
    env::set_var("FERROUS_SCOPED_TEST_NAME", "reports");
    env::set_var("FERROUS_SCOPED_TEST_MAX_CONCURRENCY", " 16 ");
    env::set_var("FERROUS_SCOPED_TEST_TIMEOUT_MS", "2500");

    let options = ExecutorOptions::from_env(PREFIX).unwrap();
    clear();

    assert_eq!(options.name, "reports");
    assert_eq!(options.max_concurrency, 16);
    assert_eq!(options.timeout, Duration::from_millis(2500));
}

#[test]
#[serial]
fn test_from_env_keeps_defaults_for_unset_variables() {
    clear();
    env::set_var("FERROUS_SCOPED_TEST_NAME", "partial");

    let options = ExecutorOptions::from_env(PREFIX).unwrap();
    clear();

    assert_eq!(options.name, "partial");
    assert_eq!(options.max_concurrency, ExecutorOptions::default().max_concurrency);
    assert_eq!(options.timeout, ExecutorOptions::default().timeout);
}

#[test]
#[serial]
fn test_from_env_rejects_unparsable_values() {
    clear();
    env::set_var("FERROUS_SCOPED_TEST_TIMEOUT_MS", "soon");

    let result = ExecutorOptions::from_env(PREFIX);
    clear();

    match result {
        Err(DiError::InvalidArgument(msg)) => assert!(msg.contains("TIMEOUT_MS")),
        other => panic!("expected InvalidArgument, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_from_env_validates_the_result() {
    clear();
    env::set_var("FERROUS_SCOPED_TEST_MAX_CONCURRENCY", "0");

    let result = ExecutorOptions::from_env(PREFIX);
    clear();

    assert!(matches!(result, Err(DiError::InvalidArgument(_))));
}

#[cfg(feature = "config")]
#[test]
fn test_from_json_rejects_invalid_documents() {
    assert!(ExecutorOptions::from_json("{").is_err());
    assert!(matches!(
        ExecutorOptions::from_json(r#"{"max_concurrency": 0}"#),
        Err(DiError::InvalidArgument(_))
    ));
}
