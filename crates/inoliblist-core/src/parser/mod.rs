//! Pure decoders for remote payloads
//!
//! - `link`: pagination `Link` header
//! - `properties`: `library.properties` metadata files
//! - `manifest`: `library.json` metadata files
//! - `index`: Library Manager index repository URLs

pub mod index;
pub mod link;
pub mod manifest;
pub mod properties;

// Re-export main parsing functions
pub use index::github_full_name;
pub use link::{parse_link_header, Pagination};
pub use manifest::{parse_library_manifest, FieldIssue, LibraryManifest, ParsedManifest};
pub use properties::{parse_library_properties, LibraryProperties};
