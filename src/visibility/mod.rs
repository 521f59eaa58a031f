//! Per-actor task visibility.
//!
//! [`build_predicate`] turns an actor and listing options into a
//! [`TaskPredicate`], a small boolean expression over task fields that
//! in-memory adapters evaluate directly and SQL adapters compile into a
//! `WHERE` clause. Building a predicate never fails: an actor without a
//! resolvable identity simply yields a predicate that matches nothing.
//!
//! Top-level listings apply disjoint-subtask promotion: a visible task whose
//! parent is not visible to the actor surfaces as a root item. Only the
//! immediate parent is inspected, because visibility is defined by direct
//! assignment and grants rather than by ancestor visibility.

mod builder;
mod predicate;

pub use builder::{ListingScope, VisibilityOptions, access_predicate, build_predicate, is_visible};
pub use predicate::TaskPredicate;
