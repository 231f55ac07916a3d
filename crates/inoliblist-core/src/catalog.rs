//! Catalog of Arduino library repositories
//!
//! This module provides the high-level API that ties everything together:
//! it walks the Library Manager index and the curated searches, runs each
//! candidate through the folder scanner and accumulates the accepted rows.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::AuditLog;
use crate::client::GithubClient;
use crate::detect::{denied_topic, is_denied_repository_name};
use crate::error::Result;
use crate::parser::github_full_name;
use crate::record::CandidateRecord;
use crate::scanner::{FolderScanner, ScanOutcome};
use crate::search::{default_queries, SearchConfig, SearchQuery, SearchSegmenter};
use crate::types::{CommitStatus, LibraryIndex, LicenseId, Repository};

/// Library Manager index location
pub const LIBRARY_INDEX_URL: &str = "https://downloads.arduino.cc/libraries/library_index.json";

/// Commit status GitHub reports for commits without any status
const PENDING_STATUS: &str = "pending";

/// Source counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    /// Every repository handed to [`Catalog::populate_row`]
    pub sources: u64,
    /// Sources whose name and topics passed the deny-lists
    pub non_blacklisted: u64,
    /// Non-blacklisted sources not already in the catalog
    pub unique: u64,
}

/// What happened to one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Accepted,
    DeniedName,
    DeniedTopic,
    Duplicate,
    /// No library found while verification was required
    FailedVerification,
    /// A request needed to fill the row failed
    Failed,
}

/// Single owner of the run state: client, side logs, accepted rows, counters.
///
/// # Example
/// ```no_run
/// use inoliblist_core::{AuditLog, Catalog, GithubClient, LIBRARY_INDEX_URL};
///
/// # async fn example() -> Result<(), inoliblist_core::CatalogError> {
/// let mut catalog = Catalog::new(GithubClient::new()?, AuditLog::in_dir("output")?);
/// catalog.process_library_manager_index(LIBRARY_INDEX_URL).await?;
/// catalog.run_default_searches().await;
/// println!("{} libraries found", catalog.records().len());
/// # Ok(())
/// # }
/// ```
pub struct Catalog {
    client: Arc<GithubClient>,
    audit: AuditLog,
    search_config: SearchConfig,
    records: Vec<CandidateRecord>,
    seen: HashSet<String>,
    stats: CatalogStats,
}

impl Catalog {
    pub fn new(client: GithubClient, audit: AuditLog) -> Self {
        Self {
            client: Arc::new(client),
            audit,
            search_config: SearchConfig::default(),
            records: Vec::new(),
            seen: HashSet::new(),
            stats: CatalogStats::default(),
        }
    }

    /// Replace the search retry settings
    pub fn with_search_config(mut self, search_config: SearchConfig) -> Self {
        self.search_config = search_config;
        self
    }

    pub fn client(&self) -> &GithubClient {
        &self.client
    }

    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CandidateRecord> {
        self.records
    }

    pub fn stats(&self) -> CatalogStats {
        self.stats
    }

    /// Add every GitHub repository listed in the Library Manager index.
    ///
    /// Consecutive releases of the same library share a repository and are
    /// only looked up once. Repositories on other hosts are skipped.
    ///
    /// # Errors
    /// Returns an error only if the index itself cannot be fetched or decoded;
    /// failures on individual entries are logged and skipped.
    pub async fn process_library_manager_index(&mut self, index_url: &str) -> Result<()> {
        info!("Processing the Library Manager index");
        let index: LibraryIndex = self.client.fetch_json(index_url).await?.payload;

        let mut previous_url: Option<&str> = None;
        for library in &index.libraries {
            let url = library.repository.as_str();
            if previous_url == Some(url) {
                continue;
            }
            previous_url = Some(url);

            let Some(full_name) = github_full_name(url) else {
                info!(repository = url, library = %library.name, "skipping non-GitHub repository");
                continue;
            };

            let repository = match self.fetch_repository(&full_name).await {
                Ok(repository) => repository,
                Err(e) => {
                    warn!(repository = %full_name, error = %e, "unable to load repository");
                    continue;
                }
            };
            self.populate_row(repository, true, false, false).await;
        }

        Ok(())
    }

    /// Run one curated search over all of its windows
    pub async fn search_repositories(&mut self, query: &SearchQuery) {
        info!(query = %query.query, "Processing GitHub search");
        let client = Arc::clone(&self.client);
        let mut segmenter = SearchSegmenter::new(&client, query, self.search_config.clone());

        while let Some(batch) = segmenter.next_batch().await {
            for repository in batch {
                self.populate_row(
                    repository,
                    false,
                    query.verify,
                    query.log_verification_failures,
                )
                .await;
            }
        }
    }

    /// Run every curated search in order
    pub async fn run_default_searches(&mut self) {
        for query in default_queries() {
            self.search_repositories(&query).await;
        }
    }

    /// Decide whether a repository belongs in the catalog and add its row.
    ///
    /// # Arguments
    /// * `repository` - Repository object from the search or repos API
    /// * `in_library_manager` - Whether it came from the Library Manager index
    /// * `verify` - Require a library to be found, and apply the deny-lists
    /// * `log_verification_failures` - Record rejected repositories in the side log
    pub async fn populate_row(
        &mut self,
        repository: Repository,
        in_library_manager: bool,
        verify: bool,
        log_verification_failures: bool,
    ) -> RowOutcome {
        let url = repository.html_url.clone();
        info!(repository = %url, "attempting to populate row");
        self.stats.sources += 1;

        if verify {
            if is_denied_repository_name(&repository.name) {
                info!(repository = %url, "skipping blacklisted repository name");
                return RowOutcome::DeniedName;
            }
            if let Some(topic) = denied_topic(&repository.topics) {
                info!(repository = %url, topic, "skipping repository with blacklisted topic");
                return RowOutcome::DeniedTopic;
            }
        }
        self.stats.non_blacklisted += 1;

        if self.seen.contains(&url) {
            info!(repository = %url, "skipping duplicate");
            return RowOutcome::Duplicate;
        }
        self.stats.unique += 1;

        let scan = FolderScanner::new(&self.client, &self.audit)
            .find_library_folder(&repository, verify)
            .await;

        if scan.path.is_none() && verify {
            info!(repository = %url, "skipping, library verification failed");
            if log_verification_failures {
                if let Err(e) = self.audit.record_verification_failure(&url) {
                    warn!(repository = %url, error = %e, "failed to record verification failure");
                }
            }
            return RowOutcome::FailedVerification;
        }

        match self.build_record(repository, scan, in_library_manager).await {
            Ok(record) => {
                info!(repository = %url, path = %record.library_path, "added library");
                self.seen.insert(url);
                self.records.push(record);
                RowOutcome::Accepted
            }
            Err(e) => {
                warn!(repository = %url, error = %e, "unable to populate row, skipping");
                RowOutcome::Failed
            }
        }
    }

    async fn fetch_repository(&self, full_name: &str) -> Result<Repository> {
        let url = self.client.api_url(&format!("repos/{}", full_name));
        Ok(self.client.fetch_json(&url).await?.payload)
    }

    async fn build_record(
        &self,
        mut repository: Repository,
        scan: ScanOutcome,
        in_library_manager: bool,
    ) -> Result<CandidateRecord> {
        // search results omit the parent of a fork
        if repository.fork && repository.parent.is_none() {
            repository = self.fetch_repository(&repository.full_name).await?;
        }

        let contributors = self.contributor_count(&repository).await;
        let status = self.head_commit_status(&repository).await?;
        let license = LicenseId::from_repository(&repository);

        Ok(CandidateRecord {
            repository_url: repository.html_url,
            owner: repository.owner.login,
            name: repository.name,
            default_branch: repository.default_branch,
            library_path: scan.path.unwrap_or_default(),
            archived: repository.archived,
            fork: repository.fork,
            fork_of: repository.parent.map(|parent| parent.full_name),
            last_push: repository.pushed_at,
            forks: repository.forks_count,
            stars: repository.stargazers_count,
            contributors,
            status,
            license,
            language: repository.language,
            description: repository.description,
            topics: repository.topics,
            in_library_manager,
            properties: scan.metadata.properties.into_parsed(),
            manifest: scan.metadata.manifest.into_parsed(),
        })
    }

    /// With one contributor per page, the page count is the contributor count
    async fn contributor_count(&self, repository: &Repository) -> Option<u32> {
        let url = self
            .client
            .api_url(&format!("repos/{}/contributors?per_page=1", repository.full_name));
        match self.client.fetch(&url).await {
            Ok(result) => Some(result.total_pages),
            Err(e) => {
                warn!(repository = %repository.full_name, error = %e, "unable to get contributor count");
                None
            }
        }
    }

    async fn head_commit_status(&self, repository: &Repository) -> Result<Option<String>> {
        let url = self.client.api_url(&format!(
            "repos/{}/commits/{}/status",
            repository.full_name, repository.default_branch
        ));
        let status: CommitStatus = self.client.fetch_json(&url).await?.payload;
        Ok(Some(status.state).filter(|state| state != PENDING_STATUS))
    }
}
