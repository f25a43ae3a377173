//! Common test utilities for integration tests.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

pub mod test_db;
