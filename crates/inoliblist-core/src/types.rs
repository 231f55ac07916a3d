//! Data types for inoliblist
//!
//! Payload shapes returned by the GitHub API and the Library Manager index,
//! plus the small value types shared by the scanner and the detector.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two independently metered GitHub API allowances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiClass {
    /// `api.github.com/search/*`
    Search,
    /// Every other API endpoint
    Core,
}

impl ApiClass {
    /// Both classes, in the order they are re-checked after throttling.
    pub const ALL: [ApiClass; 2] = [ApiClass::Core, ApiClass::Search];

    /// Pick the class that meters a request to the given API path.
    pub fn for_path(path: &str) -> Self {
        if path.trim_start_matches('/').starts_with("search") {
            ApiClass::Search
        } else {
            ApiClass::Core
        }
    }
}

impl fmt::Display for ApiClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiClass::Search => f.write_str("search"),
            ApiClass::Core => f.write_str("core"),
        }
    }
}

/// Kind of an item in a contents listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    /// Symlinks and submodules; ignored by classification
    #[serde(other)]
    Other,
}

/// One item of a directory listing, as returned by the contents API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl FolderEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// One directory level, in whatever order the API returned it
pub type FolderListing = Vec<FolderEntry>;

/// Result of one logical remote request
#[derive(Debug, Clone)]
pub struct FetchResult<T> {
    /// Decoded payload
    pub payload: T,
    /// Whether the pagination header announced a next page
    pub has_more: bool,
    /// Page count from the "last" relation; 1 without one, 0 for an empty payload
    pub total_pages: u32,
}

/// Repository owner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// Reference to a fork parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRepository {
    pub full_name: String,
}

/// License detected by GitHub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryLicense {
    pub spdx_id: Option<String>,
}

/// Repository object from the search or repos API
///
/// Search results omit `parent`, so it is optional here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub owner: Owner,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub parent: Option<ParentRepository>,
    #[serde(default)]
    pub pushed_at: Option<String>,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub license: Option<RepositoryLicense>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

fn default_branch() -> String {
    "master".to_string()
}

/// One page of `search/repositories`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default)]
    pub items: Vec<Repository>,
}

/// Budget of one API class from the `rate_limit` endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateResource {
    pub limit: u64,
    pub remaining: u64,
    /// Unix timestamp (seconds) when the budget is refilled
    pub reset: u64,
}

/// Both budgets from the `rate_limit` endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateResources {
    pub core: RateResource,
    pub search: RateResource,
}

/// Payload of `GET /rate_limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub resources: RateResources,
}

impl RateLimitStatus {
    pub fn resource(&self, class: ApiClass) -> RateResource {
        match class {
            ApiClass::Core => self.resources.core,
            ApiClass::Search => self.resources.search,
        }
    }
}

/// Combined status of the head commit of a branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitStatus {
    pub state: String,
}

/// Arduino Library Manager index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryIndex {
    #[serde(default)]
    pub libraries: Vec<IndexedLibrary>,
}

/// One release entry of the Library Manager index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexedLibrary {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub repository: String,
}

/// License column value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseId {
    /// Recognized SPDX identifier
    Spdx(String),
    /// No license file in the repository root
    NoLicense,
    /// License file present but not recognized
    Unrecognized,
}

impl LicenseId {
    pub fn from_repository(repository: &Repository) -> Self {
        match repository.license.as_ref() {
            None => LicenseId::NoLicense,
            Some(license) => match license.spdx_id.as_deref() {
                None | Some("NOASSERTION") => LicenseId::Unrecognized,
                Some(id) => LicenseId::Spdx(id.to_string()),
            },
        }
    }
}

impl fmt::Display for LicenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LicenseId::Spdx(id) => f.write_str(id),
            LicenseId::NoLicense => f.write_str("none"),
            LicenseId::Unrecognized => f.write_str("unrecognized"),
        }
    }
}
