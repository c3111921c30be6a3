//! Dependency manifest: one `name[==version]` record per line.

pub mod entry;
pub mod format;
pub mod name;
pub mod parse;

pub use entry::{Manifest, Requirement};
pub use name::normalize;
