//! Windowed repository search
//!
//! The search API returns at most 1000 results per query, so every query is
//! issued once per creation-date window. [`SearchSegmenter`] walks the
//! windows and their pages lazily, one batch of repositories at a time.

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::GithubClient;
use crate::error::Result;
use crate::types::{Repository, SearchPage};

/// Maximum number of times a page is re-requested while incomplete or empty
const MAX_SEARCH_RETRIES: u32 = 10;

/// Delay before re-requesting an incomplete page
const SEARCH_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Inclusive range of repository creation dates; `None` is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl SearchWindow {
    /// Everything created on or before `end`
    pub fn until(end: NaiveDate) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// Everything created on or after `start`
    pub fn since(start: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

/// Renders the `created:` qualifier syntax of the search API
impl fmt::Display for SearchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (None, None) => f.write_str("*"),
            (None, Some(end)) => write!(f, "<={}", end),
            (Some(start), None) => write!(f, ">={}", start),
            (Some(start), Some(end)) => write!(f, "{}..{}", start, end),
        }
    }
}

/// Problem found by [`validate_windows`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowGap {
    Empty,
    BoundedStart(SearchWindow),
    BoundedEnd(SearchWindow),
    /// Window at this index does not start the day after the previous one ends
    NotContiguous(usize),
}

/// Check that windows partition the whole timeline, in order.
///
/// # Errors
/// Returns the first gap or overlap found.
pub fn validate_windows(windows: &[SearchWindow]) -> std::result::Result<(), WindowGap> {
    let (first, last) = match (windows.first(), windows.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(WindowGap::Empty),
    };
    if first.start.is_some() {
        return Err(WindowGap::BoundedStart(*first));
    }
    if last.end.is_some() {
        return Err(WindowGap::BoundedEnd(*last));
    }

    for (index, pair) in windows.windows(2).enumerate() {
        let next_day = pair[0].end.and_then(|end| end.succ_opt());
        if next_day.is_none() || next_day != pair[1].start {
            return Err(WindowGap::NotContiguous(index + 1));
        }
    }

    Ok(())
}

/// Fork qualifier of a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForkFilter {
    /// Forks and non-forks
    True,
    /// Non-forks only
    False,
    /// Forks only
    Only,
}

impl fmt::Display for ForkFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForkFilter::True => f.write_str("true"),
            ForkFilter::False => f.write_str("false"),
            ForkFilter::Only => f.write_str("only"),
        }
    }
}

/// One curated search and how its results are treated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query in search syntax, `+` separated
    pub query: String,
    pub windows: Vec<SearchWindow>,
    pub fork: ForkFilter,
    /// Require the repository to pass library verification
    pub verify: bool,
    /// Append rejected repositories to the verification failure log
    pub log_verification_failures: bool,
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| panic!("invalid window date {}-{}-{}", year, month, day))
}

/// Build contiguous windows from the last day of each window but the final one
fn windows_ending(ends: &[(i32, u32, u32)]) -> Vec<SearchWindow> {
    let mut windows = Vec::with_capacity(ends.len() + 1);
    let mut start: Option<NaiveDate> = None;

    for &(year, month, day) in ends {
        let end = date(year, month, day);
        windows.push(SearchWindow {
            start,
            end: Some(end),
        });
        start = end.succ_opt();
    }
    windows.push(SearchWindow { start, end: None });

    windows
}

/// The curated searches, in run order.
///
/// The window boundaries are tuned by hand so that no window holds more
/// than 1000 results; they need rebalancing when a window outgrows that.
pub fn default_queries() -> Vec<SearchQuery> {
    vec![
        SearchQuery {
            query: "topic:arduino-library".to_string(),
            windows: windows_ending(&[(2018, 5, 29)]),
            fork: ForkFilter::True,
            verify: false,
            log_verification_failures: false,
        },
        SearchQuery {
            query: "topic:arduino".to_string(),
            windows: windows_ending(&[
                (2016, 3, 23),
                (2017, 1, 7),
                (2017, 3, 22),
                (2017, 6, 15),
                (2017, 9, 18),
                (2017, 12, 19),
                (2018, 3, 7),
                (2018, 6, 5),
            ]),
            fork: ForkFilter::True,
            verify: true,
            log_verification_failures: false,
        },
        SearchQuery {
            query: "arduino+library+NOT+mongoose+NOT+particle+topics:0+language:cpp+language:c+language:arduino"
                .to_string(),
            windows: windows_ending(&[
                (2012, 12, 25),
                (2013, 12, 27),
                (2014, 10, 5),
                (2015, 4, 28),
                (2015, 11, 25),
                (2016, 5, 18),
                (2016, 11, 20),
                (2017, 4, 14),
                (2017, 9, 18),
                (2018, 1, 31),
                (2018, 6, 12),
            ]),
            fork: ForkFilter::False,
            verify: true,
            log_verification_failures: true,
        },
    ]
}

/// Search retry settings
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Attempts per page while results are incomplete or empty (default: 10)
    pub max_retries: u32,
    /// Delay before re-requesting an incomplete page (default: 60s)
    pub retry_delay: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_SEARCH_RETRIES,
            retry_delay: SEARCH_RETRY_DELAY,
        }
    }
}

/// Position inside the current window
#[derive(Debug, Default)]
struct WindowCursor {
    page: u32,
    retrieved: u64,
    total_count: u64,
}

/// Lazy walk over every page of every window of one query.
///
/// Pages are fetched strictly in order, windows in list order. A window
/// whose page cannot be fetched is abandoned and the walk moves on.
pub struct SearchSegmenter<'a> {
    client: &'a GithubClient,
    query: &'a SearchQuery,
    config: SearchConfig,
    window: usize,
    cursor: WindowCursor,
    capped: Vec<SearchWindow>,
}

impl<'a> SearchSegmenter<'a> {
    pub fn new(client: &'a GithubClient, query: &'a SearchQuery, config: SearchConfig) -> Self {
        Self {
            client,
            query,
            config,
            window: 0,
            cursor: WindowCursor {
                page: 1,
                ..WindowCursor::default()
            },
            capped: Vec::new(),
        }
    }

    /// Windows that ended with fewer results than GitHub reported
    pub fn capped_windows(&self) -> &[SearchWindow] {
        &self.capped
    }

    /// Search URL for one window, without pagination parameters
    pub fn window_url(&self, window: &SearchWindow) -> String {
        self.client.api_url(&format!(
            "search/repositories?q={}+created:{}+fork:{}&sort=forks&order=desc",
            self.query.query, window, self.query.fork
        ))
    }

    /// Next non-empty batch of repositories, or `None` once every window is done
    pub async fn next_batch(&mut self) -> Option<Vec<Repository>> {
        while let Some(window) = self.query.windows.get(self.window).copied() {
            let url = self.client.paged_url(&self.window_url(&window), self.cursor.page);

            let (page, has_more) = match self.fetch_page(&url).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(query = %self.query.query, %window, error = %e, "search failed, skipping window");
                    self.finish_window(&window);
                    continue;
                }
            };

            self.cursor.retrieved += page.items.len() as u64;
            self.cursor.total_count = page.total_count;

            if has_more {
                self.cursor.page += 1;
            } else {
                if self.cursor.retrieved < self.cursor.total_count {
                    warn!(
                        query = %self.query.query,
                        %window,
                        retrieved = self.cursor.retrieved,
                        total = self.cursor.total_count,
                        "maximum search results count reached for search window"
                    );
                    self.capped.push(window);
                }
                self.finish_window(&window);
            }

            if !page.items.is_empty() {
                return Some(page.items);
            }
        }

        None
    }

    fn finish_window(&mut self, window: &SearchWindow) {
        info!(
            query = %self.query.query,
            %window,
            count = self.cursor.retrieved,
            "finished search window"
        );
        self.window += 1;
        self.cursor = WindowCursor {
            page: 1,
            ..WindowCursor::default()
        };
    }

    /// Fetch one page, re-requesting it while it is incomplete or empty
    async fn fetch_page(&self, url: &str) -> Result<(SearchPage, bool)> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.client.fetch_json::<SearchPage>(url).await?;
            let page = result.payload;

            if attempt < self.config.max_retries {
                if page.incomplete_results {
                    warn!(%url, attempt, "search results are incomplete due to a timeout, retrying");
                    sleep(self.config.retry_delay).await;
                    continue;
                }
                if page.total_count == 0 {
                    debug!(%url, attempt, "search returned 0 results, retrying");
                    continue;
                }
            }

            return Ok((page, result.has_more));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;
    use proptest::prelude::*;

    #[test]
    fn test_window_display() {
        let a = date(2016, 3, 24);
        let b = date(2017, 1, 7);
        assert_eq!(SearchWindow::until(b).to_string(), "<=2017-01-07");
        assert_eq!(SearchWindow::since(a).to_string(), ">=2016-03-24");
        assert_eq!(SearchWindow::between(a, b).to_string(), "2016-03-24..2017-01-07");
    }

    #[test]
    fn test_window_contains_bounds() {
        let window = SearchWindow::between(date(2017, 1, 8), date(2017, 3, 22));
        assert!(window.contains(date(2017, 1, 8)));
        assert!(window.contains(date(2017, 3, 22)));
        assert!(!window.contains(date(2017, 1, 7)));
        assert!(!window.contains(date(2017, 3, 23)));
    }

    #[test]
    fn test_default_queries_windows() {
        let queries = default_queries();
        assert_eq!(queries.len(), 3);

        let rendered: Vec<String> = queries[0].windows.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["<=2018-05-29", ">=2018-05-30"]);

        assert_eq!(queries[1].windows.len(), 9);
        assert_eq!(queries[1].windows[1].to_string(), "2016-03-24..2017-01-07");
        assert_eq!(queries[1].windows[8].to_string(), ">=2018-06-06");

        assert_eq!(queries[2].windows.len(), 12);
        assert_eq!(queries[2].windows[0].to_string(), "<=2012-12-25");
        assert_eq!(queries[2].windows[10].to_string(), "2018-02-01..2018-06-12");
        assert_eq!(queries[2].windows[11].to_string(), ">=2018-06-13");
    }

    #[test]
    fn test_default_queries_flags() {
        let queries = default_queries();
        assert_eq!(
            queries
                .iter()
                .map(|q| (q.fork, q.verify, q.log_verification_failures))
                .collect::<Vec<_>>(),
            [
                (ForkFilter::True, false, false),
                (ForkFilter::True, true, false),
                (ForkFilter::False, true, true),
            ]
        );
    }

    #[test]
    fn test_default_queries_are_valid() {
        for query in default_queries() {
            assert_eq!(validate_windows(&query.windows), Ok(()), "{}", query.query);
        }
    }

    #[test]
    fn test_validate_windows_detects_problems() {
        assert_eq!(validate_windows(&[]), Err(WindowGap::Empty));

        let bounded = SearchWindow::since(date(2018, 1, 1));
        assert_eq!(
            validate_windows(&[bounded]),
            Err(WindowGap::BoundedStart(bounded))
        );

        let gap = [
            SearchWindow::until(date(2018, 1, 1)),
            SearchWindow::since(date(2018, 1, 3)),
        ];
        assert_eq!(validate_windows(&gap), Err(WindowGap::NotContiguous(1)));

        let overlap = [
            SearchWindow::until(date(2018, 1, 1)),
            SearchWindow::since(date(2018, 1, 1)),
        ];
        assert_eq!(validate_windows(&overlap), Err(WindowGap::NotContiguous(1)));
    }

    #[test]
    fn test_window_url() {
        let client = GithubClient::new().unwrap();
        let query = &default_queries()[0];
        let segmenter = SearchSegmenter::new(&client, query, SearchConfig::default());
        assert_eq!(
            segmenter.window_url(&query.windows[0]),
            "https://api.github.com/search/repositories?q=topic:arduino-library+created:<=2018-05-29+fork:true&sort=forks&order=desc"
        );
    }

    #[test]
    fn test_search_config_default() {
        let config = SearchConfig::default();
        assert_eq!(config.max_retries, 10);
        assert_eq!(config.retry_delay, Duration::from_secs(60));
    }

    proptest! {
        #[test]
        fn prop_every_date_in_exactly_one_window(offset in 0u64..40_000) {
            let day = date(1990, 1, 1).checked_add_days(Days::new(offset)).unwrap();
            for query in default_queries() {
                let hits = query.windows.iter().filter(|w| w.contains(day)).count();
                prop_assert_eq!(hits, 1, "{} in {}", day, query.query);
            }
        }
    }
}
