//! Library folder search
//!
//! [`FolderScanner`] looks for a library in the repository root and, when the
//! root is not conclusive, in the immediate subfolders. Deeper levels are
//! never searched.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audit::AuditLog;
use crate::client::GithubClient;
use crate::detect::{classify, is_denied_subfolder, DetectionOutcome};
use crate::error::{CatalogError, Result};
use crate::metadata::{folder_segment, read_metadata, LibraryMetadata};
use crate::types::{FolderEntry, FolderListing, Repository};

/// Library path of a library in the repository root
pub const ROOT_FOLDER: &str = "/";

/// Where a library was found, and the metadata read from that folder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// `/` for the root, a subfolder name, or `None` when no library was found
    pub path: Option<String>,
    pub metadata: LibraryMetadata,
}

impl ScanOutcome {
    fn found(path: impl Into<String>, metadata: LibraryMetadata) -> Self {
        Self {
            path: Some(path.into()),
            metadata,
        }
    }

    fn not_found() -> Self {
        Self::default()
    }
}

/// Scans one repository at a time through the contents API
pub struct FolderScanner<'a> {
    client: &'a GithubClient,
    audit: &'a AuditLog,
}

impl<'a> FolderScanner<'a> {
    pub fn new(client: &'a GithubClient, audit: &'a AuditLog) -> Self {
        Self { client, audit }
    }

    /// Find the folder holding the repository's library.
    ///
    /// Cheap probes against the raw file host come first: metadata files in
    /// the root, then (without verification) a header named after the
    /// repository. Only then is the root listing fetched and classified.
    pub async fn find_library_folder(&self, repository: &Repository, verify: bool) -> ScanOutcome {
        let metadata = read_metadata(self.client, repository, ROOT_FOLDER).await;
        if metadata.found() {
            debug!(repository = %repository.full_name, "metadata file in root folder");
            return ScanOutcome::found(ROOT_FOLDER, metadata);
        }

        if !verify && self.probe_root_header(repository).await {
            return ScanOutcome::found(ROOT_FOLDER, metadata);
        }

        let root_listing = match self.list_folder(repository, None).await {
            Ok(listing) => listing,
            Err(CatalogError::NotFound(_)) => {
                info!(repository = %repository.full_name, "skipping empty repository");
                return ScanOutcome::not_found();
            }
            Err(e) => {
                warn!(repository = %repository.full_name, error = %e, "could not load contents of the root folder");
                return ScanOutcome::not_found();
            }
        };

        match classify(&root_listing, verify) {
            DetectionOutcome::Found => return ScanOutcome::found(ROOT_FOLDER, metadata),
            DetectionOutcome::NotFound if verify => return ScanOutcome::not_found(),
            DetectionOutcome::NotFound | DetectionOutcome::Inconclusive => {}
        }

        self.scan_subfolders(repository, &root_listing, verify).await
    }

    /// One level down; the first subfolder classified as a library wins
    async fn scan_subfolders(&self, repository: &Repository, root_listing: &[FolderEntry], verify: bool) -> ScanOutcome {
        for entry in root_listing.iter().filter(|entry| entry.is_dir()) {
            let name = entry.name.as_str();
            if is_denied_subfolder(name) {
                debug!(folder = name, "skipping deny-listed subfolder");
                continue;
            }

            let listing = match self.list_folder(repository, Some(name)).await {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(folder = name, error = %e, "could not load folder contents, moving on to the next folder");
                    continue;
                }
            };

            if classify(&listing, verify) == DetectionOutcome::Found {
                let metadata = read_metadata(self.client, repository, name).await;
                return ScanOutcome::found(name, metadata);
            }

            if let Err(e) = self.audit.record_non_library_folder(name) {
                warn!(folder = name, error = %e, "failed to record non-library folder");
            }
        }

        ScanOutcome::not_found()
    }

    /// Single attempt to open `{name}.h` in the root of the default branch
    async fn probe_root_header(&self, repository: &Repository) -> bool {
        let url = self.client.raw_url(
            &repository.full_name,
            &repository.default_branch,
            "",
            &format!("{}.h", repository.name),
        );
        self.client.probe(&url).await
    }

    /// Every page of a folder listing; `None` is the root
    pub async fn list_folder(&self, repository: &Repository, folder: Option<&str>) -> Result<FolderListing> {
        let path = match folder {
            Some(folder) => format!(
                "repos/{}/contents/{}",
                repository.full_name,
                folder_segment(folder)
            ),
            None => format!("repos/{}/contents", repository.full_name),
        };
        self.client.fetch_all_pages(&self.client.api_url(&path)).await
    }
}
