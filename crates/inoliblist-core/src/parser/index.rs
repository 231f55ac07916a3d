//! Library Manager index helpers

use url::Url;

/// Extract `owner/name` from a GitHub repository URL.
///
/// Only `github.com` URLs are accepted; a trailing `.git` is removed.
///
/// # Examples
/// ```
/// use inoliblist_core::parser::github_full_name;
///
/// assert_eq!(
///     github_full_name("https://github.com/bblanchon/ArduinoJson.git"),
///     Some("bblanchon/ArduinoJson".to_string())
/// );
/// assert_eq!(github_full_name("https://gitlab.com/a/b.git"), None);
/// ```
pub fn github_full_name(repository_url: &str) -> Option<String> {
    let url = Url::parse(repository_url.trim()).ok()?;
    if url.host_str()? != "github.com" {
        return None;
    }

    let mut segments = url.path_segments()?.filter(|segment| !segment.is_empty());
    let owner = segments.next()?;
    let name = segments.next()?;
    let name = name.strip_suffix(".git").unwrap_or(name);
    if name.is_empty() {
        return None;
    }

    Some(format!("{}/{}", owner, name))
}
