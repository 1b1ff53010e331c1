//! Cross-module test suites.
//!
//! Unit tests that belong to a single module live next to it; everything
//! that spans the bus, sync service, and stores lives here, built on the
//! mocks in `crate::testing`.

mod integration;
