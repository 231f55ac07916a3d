//! inoliblist Core Library
//!
//! This crate discovers Arduino library repositories on GitHub and verifies,
//! from remote directory listings alone, that each one really holds a
//! library.
//!
//! # Features
//! - Library Manager index walk and date-windowed repository searches
//! - Rate-limited, retrying GitHub API client with pagination support
//! - Library detection heuristics with a one-level subfolder search
//! - `library.properties` and `library.json` metadata extraction

pub mod audit;
pub mod catalog;
pub mod client;
pub mod detect;
pub mod error;
pub mod metadata;
pub mod parser;
pub mod record;
pub mod scanner;
pub mod search;
pub mod types;

// Re-export main types for convenience
pub use audit::AuditLog;
pub use catalog::{Catalog, CatalogStats, RowOutcome, LIBRARY_INDEX_URL};
pub use client::{ClientConfig, GithubClient, RateLimiter};
pub use detect::{classify, DetectionOutcome};
pub use error::{CatalogError, FailureKind, Result};
pub use metadata::{LibraryMetadata, MetadataOutcome};
pub use record::{CandidateRecord, HEADERS};
pub use scanner::{FolderScanner, ScanOutcome};
pub use search::{ForkFilter, SearchConfig, SearchQuery, SearchSegmenter, SearchWindow};
pub use types::{ApiClass, FetchResult, FolderEntry, FolderListing, LicenseId, Repository};
