//! Property-based tests

pub mod transform_proptest;
