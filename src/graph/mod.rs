//! Graph document data model and graph algorithms.

mod algorithms;
mod document;

pub use algorithms::*;
pub use document::*;
