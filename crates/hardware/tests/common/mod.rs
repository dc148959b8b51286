//! Shared test infrastructure.

/// Test rigs, geometries and trace helpers.
pub mod harness;
