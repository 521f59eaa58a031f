//! Unit tests for the task module.
//!
//! Tests are organised by layer: domain values, the in-memory store, the
//! path and assignment helpers, and the lifecycle service with its
//! notification side effects.

mod support;
