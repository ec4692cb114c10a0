//! Utility modules for the build pipeline.

pub mod glob;
pub mod slug;
