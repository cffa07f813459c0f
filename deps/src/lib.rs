//! Internal re-export shim.
//!
//! Keeps the third-party decimal/json crates pinned to a single version
//! across the workspace without every crate re-declaring them.

pub use bigdecimal;
pub use serde_json;
