//! Custom assertion macros and utilities
//!
//! Provides assertion macros with more descriptive failure output for
//! results, error replies and converged documents.

/// Assert that a result is ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $message, e),
        }
    };
}

/// Assert that a result is an error, optionally of a given shape
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        assert!($result.is_err(), "Expected Err, got Ok");
    };
    ($result:expr, $pattern:pat) => {
        match $result {
            Err($pattern) => {}
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => panic!("Expected different error variant, got: {:?}", e),
        }
    };
}

/// Assert that a server message is an `error` reply of the given kind
#[macro_export]
macro_rules! assert_error_reply {
    ($message:expr, $kind:expr) => {
        match $message {
            convergedoc::shared::ServerMessage::Error { kind, reason } => {
                assert_eq!(kind, $kind, "unexpected error kind (reason: {})", reason);
            }
            other => panic!("Expected error reply, got: {:?}", other),
        }
    };
}

/// Assert that every replica holds the same text
#[macro_export]
macro_rules! assert_converged {
    ($expected:expr, $replicas:expr) => {
        for (index, replica) in $replicas.iter().enumerate() {
            assert_eq!(
                replica.as_str(),
                $expected,
                "replica {} diverged from the server",
                index
            );
        }
    };
}

/// Assert that a string contains a substring
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        assert!(
            $haystack.contains($needle),
            "Expected '{}' to contain '{}'",
            $haystack,
            $needle
        );
    };
}
