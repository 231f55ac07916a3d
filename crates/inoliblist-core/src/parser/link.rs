//! Pagination `Link` header parser
//!
//! GitHub paginates with RFC 8288 style headers:
//! `<https://api.github.com/...&page=2>; rel="next", <...&page=5>; rel="last"`

use url::Url;

/// Pagination facts extracted from a `Link` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    /// A `rel="next"` relation is present
    pub has_next: bool,
    /// Page number of the `rel="last"` relation, if any
    pub last_page: Option<u32>,
}

/// Parse a `Link` header value.
///
/// # Examples
/// ```
/// use inoliblist_core::parser::parse_link_header;
///
/// let header = r#"<https://api.github.com/x?page=2>; rel="next", <https://api.github.com/x?page=7>; rel="last""#;
/// let pagination = parse_link_header(header);
/// assert!(pagination.has_next);
/// assert_eq!(pagination.last_page, Some(7));
/// ```
pub fn parse_link_header(value: &str) -> Pagination {
    let mut pagination = Pagination::default();

    for link in value.split(',') {
        let mut parts = link.split(';');
        let Some(target) = parts.next() else {
            continue;
        };
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');

        for param in parts {
            let Some((key, rel)) = param.split_once('=') else {
                continue;
            };
            if key.trim() != "rel" {
                continue;
            }
            match rel.trim().trim_matches('"') {
                "next" => pagination.has_next = true,
                "last" => pagination.last_page = page_parameter(target),
                _ => {}
            }
        }
    }

    pagination
}

/// Extract the `page` query parameter of a link target.
fn page_parameter(target: &str) -> Option<u32> {
    if let Ok(url) = Url::parse(target) {
        return url
            .query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok());
    }

    // relative targets
    target
        .split(|c| c == '?' || c == '&')
        .find_map(|parameter| parameter.strip_prefix("page="))
        .and_then(|value| value.parse().ok())
}
