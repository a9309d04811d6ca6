// ABOUTME: DOM traversal utilities shared by the sanitizer and the extraction engine.
// ABOUTME: Provides deny-list predicates and skip-set aware serialization over scraper trees.

//! DOM utilities for HTML cleanup.
//!
//! Removal is expressed as a set of node ids to skip during serialization,
//! so the parsed tree itself is never mutated.

pub mod cleaners;
pub mod serialize;
