//! Library metadata files
//!
//! Both metadata formats are read straight from the raw file host, which
//! costs no API budget. A file that exists but cannot be parsed still marks
//! its folder as a library.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::GithubClient;
use crate::detect::METADATA_FILE_NAMES;
use crate::error::CatalogError;
use crate::parser::{parse_library_manifest, parse_library_properties, LibraryManifest, LibraryProperties};
use crate::types::Repository;

/// Result of reading one metadata file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataOutcome<T> {
    Parsed(T),
    /// The file exists but its content could not be decoded
    Unparsable,
    Absent,
}

impl<T> MetadataOutcome<T> {
    pub fn is_present(&self) -> bool {
        !matches!(self, MetadataOutcome::Absent)
    }

    pub fn parsed(&self) -> Option<&T> {
        match self {
            MetadataOutcome::Parsed(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_parsed(self) -> Option<T> {
        match self {
            MetadataOutcome::Parsed(value) => Some(value),
            _ => None,
        }
    }
}

/// Metadata found in one folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryMetadata {
    /// `library.properties`
    pub properties: MetadataOutcome<LibraryProperties>,
    /// `library.json`
    pub manifest: MetadataOutcome<LibraryManifest>,
}

impl LibraryMetadata {
    pub fn absent() -> Self {
        Self {
            properties: MetadataOutcome::Absent,
            manifest: MetadataOutcome::Absent,
        }
    }

    /// Whether either metadata file exists
    pub fn found(&self) -> bool {
        self.properties.is_present() || self.manifest.is_present()
    }
}

impl Default for LibraryMetadata {
    fn default() -> Self {
        Self::absent()
    }
}

/// Percent-encode a folder name for use as a path segment; `/` is the root
pub(crate) fn folder_segment(folder: &str) -> Cow<'_, str> {
    if folder.is_empty() || folder == "/" {
        Cow::Borrowed(folder)
    } else {
        urlencoding::encode(folder)
    }
}

/// Read both metadata files from `folder` of the repository's default branch
pub async fn read_metadata(client: &GithubClient, repository: &Repository, folder: &str) -> LibraryMetadata {
    let [properties_file, manifest_file] = METADATA_FILE_NAMES;
    let raw = |file: &str| {
        client.raw_url(
            &repository.full_name,
            &repository.default_branch,
            &folder_segment(folder),
            file,
        )
    };

    LibraryMetadata {
        properties: read_properties(client, &raw(properties_file)).await,
        manifest: read_manifest(client, &raw(manifest_file)).await,
    }
}

async fn read_properties(client: &GithubClient, url: &str) -> MetadataOutcome<LibraryProperties> {
    match client.fetch_text(url).await {
        Ok(text) => MetadataOutcome::Parsed(parse_library_properties(&text)),
        Err(e) => {
            debug!(%url, error = %e, "no library.properties");
            MetadataOutcome::Absent
        }
    }
}

async fn read_manifest(client: &GithubClient, url: &str) -> MetadataOutcome<LibraryManifest> {
    let document = match client.fetch(url).await {
        Ok(result) => result.payload,
        Err(CatalogError::MalformedResponse { .. }) => {
            warn!(%url, "unable to decode library.json");
            return MetadataOutcome::Unparsable;
        }
        Err(e) => {
            debug!(%url, error = %e, "no library.json");
            return MetadataOutcome::Absent;
        }
    };

    match parse_library_manifest(&document) {
        Some(parsed) => {
            for issue in &parsed.issues {
                warn!(%url, field = issue.field, shape = issue.shape, "unhandled library.json field type");
            }
            MetadataOutcome::Parsed(parsed.manifest)
        }
        None => {
            warn!(%url, "library.json is not a JSON object");
            MetadataOutcome::Unparsable
        }
    }
}
