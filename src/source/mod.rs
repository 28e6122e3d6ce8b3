//! Signal source adapters.
//!
//! The engine only sees [`Sample`] values; where they come from (a camera
//! pipeline, a browser, a recording) is the source's business.

pub mod replay;
pub mod types;

pub use replay::{ReplaySource, SourceError};
pub use types::Sample;
