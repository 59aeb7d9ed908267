//! Static file lookup beneath the document root.
//!
//! Maps request targets onto files, refusing anything that would escape the
//! document root through `..` segments or symlinks.

pub mod resolver;

pub use resolver::{FileMetadata, FileResolver, ResolvedFile};
