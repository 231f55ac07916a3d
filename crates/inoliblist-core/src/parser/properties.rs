//! `library.properties` parser
//!
//! The Arduino library metadata format: one `key=value` pair per line.

use serde::{Deserialize, Serialize};

/// Recognized fields of `library.properties`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryProperties {
    pub name: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub maintainer: Option<String>,
    pub sentence: Option<String>,
    pub paragraph: Option<String>,
    pub category: Option<String>,
    pub url: Option<String>,
    pub architectures: Option<String>,
}

/// Parse the text of a `library.properties` file.
///
/// Lines are split on the first `=`. Keys are trimmed, values are kept as
/// written. Unknown keys and lines without `=` are ignored; a repeated key
/// keeps its last value.
pub fn parse_library_properties(text: &str) -> LibraryProperties {
    let mut properties = LibraryProperties::default();

    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let slot = match key.trim() {
            "name" => &mut properties.name,
            "version" => &mut properties.version,
            "author" => &mut properties.author,
            "maintainer" => &mut properties.maintainer,
            "sentence" => &mut properties.sentence,
            "paragraph" => &mut properties.paragraph,
            "category" => &mut properties.category,
            "url" => &mut properties.url,
            "architectures" => &mut properties.architectures,
            _ => continue,
        };
        *slot = Some(value.to_string());
    }

    properties
}
