//! Shared data structures for planogram compliance
//!
//! This module defines the types that flow through the classification pipeline:
//! - Detection (external detector output: label, bounding box, confidence)
//! - ReferenceEntry (one row of the planogram table)
//! - Finding (classified compliance result, the engine's only output)
//! - AlertView (presentation form of a finding for the upload endpoint)

mod detection;
mod reference;
mod finding;

pub use detection::*;
pub use reference::*;
pub use finding::*;
