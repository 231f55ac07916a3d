//! Output rows
//!
//! A [`CandidateRecord`] is built once per accepted repository and rendered
//! with [`CandidateRecord::to_row`] in the fixed [`HEADERS`] column order.

use serde::{Deserialize, Serialize};

use crate::parser::{LibraryManifest, LibraryProperties};
use crate::types::LicenseId;

/// Column headings, in output order
pub const HEADERS: [&str; 38] = [
    "Repository URL",
    "Owner",
    "Repo Name",
    "Default Branch",
    "Library Path",
    "Archived",
    "Fork",
    "Fork Of",
    "Last Push",
    "#Forks",
    "#Stars",
    "#Contributors",
    "Status",
    "License",
    "Language",
    "Repo Description",
    "GitHub Topics",
    "In Library Manager",
    "LM name",
    "LM version",
    "LM author",
    "LM maintainer",
    "LM sentence",
    "LM paragraph",
    "LM category",
    "LM url",
    "LM architectures",
    "PIO name",
    "PIO description",
    "PIO keywords",
    "PIO authors",
    "PIO repository",
    "PIO version",
    "PIO license",
    "PIO downloadUrl",
    "PIO homepage",
    "PIO frameworks",
    "PIO platforms",
];

/// One accepted repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub repository_url: String,
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    /// `/`, a subfolder name, or empty when unverified and not found
    pub library_path: String,
    pub archived: bool,
    pub fork: bool,
    pub fork_of: Option<String>,
    pub last_push: Option<String>,
    pub forks: u64,
    pub stars: u64,
    /// `None` when the count could not be determined
    pub contributors: Option<u32>,
    /// Combined head commit status; `None` for "pending"
    pub status: Option<String>,
    pub license: LicenseId,
    pub language: Option<String>,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub in_library_manager: bool,
    pub properties: Option<LibraryProperties>,
    pub manifest: Option<LibraryManifest>,
}

fn flag(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Tabs would split the cell and line breaks the row; surrounding whitespace is noise
fn sanitize(cell: String) -> String {
    cell.replace('\t', "    ")
        .replace("\r\n", " ")
        .replace(['\r', '\n'], " ")
        .trim()
        .to_string()
}

impl CandidateRecord {
    /// Render the record as sanitized cells matching [`HEADERS`]
    pub fn to_row(&self) -> Vec<String> {
        let properties = self.properties.clone().unwrap_or_default();
        let manifest = self.manifest.clone().unwrap_or_default();

        let cells = vec![
            self.repository_url.clone(),
            self.owner.clone(),
            self.name.clone(),
            self.default_branch.clone(),
            self.library_path.clone(),
            flag(self.archived),
            flag(self.fork),
            text(&self.fork_of),
            text(&self.last_push),
            self.forks.to_string(),
            self.stars.to_string(),
            self.contributors.map(|n| n.to_string()).unwrap_or_default(),
            text(&self.status),
            self.license.to_string(),
            text(&self.language),
            text(&self.description),
            self.topics.join(", "),
            flag(self.in_library_manager),
            text(&properties.name),
            text(&properties.version),
            text(&properties.author),
            text(&properties.maintainer),
            text(&properties.sentence),
            text(&properties.paragraph),
            text(&properties.category),
            text(&properties.url),
            text(&properties.architectures),
            text(&manifest.name),
            text(&manifest.description),
            text(&manifest.keywords),
            text(&manifest.authors),
            text(&manifest.repository),
            text(&manifest.version),
            text(&manifest.license),
            text(&manifest.download_url),
            text(&manifest.homepage),
            text(&manifest.frameworks),
            text(&manifest.platforms),
        ];

        cells.into_iter().map(sanitize).collect()
    }
}
