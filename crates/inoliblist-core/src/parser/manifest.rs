//! `library.json` parser
//!
//! PlatformIO's manifest allows several shapes for some fields. Each field is
//! read by its own function that yields the normalized text or the shape it
//! could not handle, so "absent" and "malformed" stay distinguishable.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Normalized fields of `library.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryManifest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub authors: Option<String>,
    pub repository: Option<String>,
    pub version: Option<String>,
    pub license: Option<String>,
    pub download_url: Option<String>,
    pub homepage: Option<String>,
    pub frameworks: Option<String>,
    pub platforms: Option<String>,
}

/// A field that was present but had a shape we do not understand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub shape: &'static str,
}

/// Manifest plus the fields that had to be left blank
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedManifest {
    pub manifest: LibraryManifest,
    pub issues: Vec<FieldIssue>,
}

/// Either one string or a list of strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextOrList {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct Person {
    name: String,
}

/// `authors` is a list of people, a single person, or free text
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Authors {
    List(Vec<Person>),
    One(Person),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RepositoryField {
    url: String,
}

type FieldResult = Result<Option<String>, &'static str>;

/// Parse a decoded `library.json` document.
///
/// Returns `None` when the document is not a JSON object.
pub fn parse_library_manifest(document: &Value) -> Option<ParsedManifest> {
    let object = document.as_object()?;
    let mut parsed = ParsedManifest::default();

    {
        let manifest = &mut parsed.manifest;
        let issues = &mut parsed.issues;
        let mut set = |field: &'static str, slot: &mut Option<String>, result: FieldResult| match result {
            Ok(value) => *slot = value,
            Err(shape) => issues.push(FieldIssue { field, shape }),
        };

        set("name", &mut manifest.name, scalar_field(object, "name"));
        set(
            "description",
            &mut manifest.description,
            scalar_field(object, "description"),
        );
        set(
            "keywords",
            &mut manifest.keywords,
            text_or_list_field(object, "keywords"),
        );
        set("authors", &mut manifest.authors, authors_field(object));
        set(
            "repository",
            &mut manifest.repository,
            repository_field(object),
        );
        set("version", &mut manifest.version, scalar_field(object, "version"));
        set("license", &mut manifest.license, scalar_field(object, "license"));
        set(
            "downloadUrl",
            &mut manifest.download_url,
            scalar_field(object, "downloadUrl"),
        );
        set(
            "homepage",
            &mut manifest.homepage,
            scalar_field(object, "homepage"),
        );
        set(
            "frameworks",
            &mut manifest.frameworks,
            text_or_list_field(object, "frameworks"),
        );
        set(
            "platforms",
            &mut manifest.platforms,
            text_or_list_field(object, "platforms"),
        );
    }

    Some(parsed)
}

fn present<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|value| !value.is_null())
}

fn scalar_field(object: &Map<String, Value>, key: &str) -> FieldResult {
    let Some(value) = present(object, key) else {
        return Ok(None);
    };
    match value {
        Value::String(text) => Ok(Some(text.clone())),
        Value::Number(number) => Ok(Some(number.to_string())),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        other => Err(json_shape(other)),
    }
}

fn text_or_list_field(object: &Map<String, Value>, key: &str) -> FieldResult {
    let Some(value) = present(object, key) else {
        return Ok(None);
    };
    match TextOrList::deserialize(value) {
        Ok(TextOrList::Text(text)) => Ok(Some(text)),
        Ok(TextOrList::List(items)) => Ok(Some(items.join(", "))),
        Err(_) => Err(json_shape(value)),
    }
}

fn authors_field(object: &Map<String, Value>) -> FieldResult {
    let Some(value) = present(object, "authors") else {
        return Ok(None);
    };
    match Authors::deserialize(value) {
        Ok(Authors::List(people)) => Ok(Some(
            people
                .into_iter()
                .map(|person| person.name)
                .collect::<Vec<_>>()
                .join(", "),
        )),
        Ok(Authors::One(person)) => Ok(Some(person.name)),
        Ok(Authors::Text(text)) => Ok(Some(text)),
        Err(_) => Err(json_shape(value)),
    }
}

fn repository_field(object: &Map<String, Value>) -> FieldResult {
    let Some(value) = present(object, "repository") else {
        return Ok(None);
    };
    match RepositoryField::deserialize(value) {
        Ok(repository) => Ok(Some(repository.url)),
        Err(_) => Err(json_shape(value)),
    }
}

fn json_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
