//! Adapter trait abstractions.
//!
//! One trait per provider family. The coordinator dispatches through trait
//! objects registered by id, so adding a provider never touches the
//! fallback logic.

pub mod extractor;
pub mod generator;
pub mod searcher;
