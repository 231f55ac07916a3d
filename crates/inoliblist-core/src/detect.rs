//! Library detection heuristics
//!
//! [`classify`] decides from a single directory listing whether that
//! directory holds an Arduino library. The curated name lists used by the
//! scanner and the catalog also live here.
//!
//! Every list is a set of case-insensitive, full-match regular expressions.

use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::types::FolderEntry;

/// Metadata file names (Arduino and PlatformIO formats)
pub const METADATA_FILE_NAMES: [&str; 2] = ["library.properties", "library.json"];

/// Arduino IDE syntax highlighting file
pub const KEYWORDS_FILE_NAME: &str = "keywords.txt";

/// Header extensions recognized by the Arduino IDE, plus wrong-case variants
/// that still show the author meant a header file
pub const HEADER_FILE_EXTENSIONS: [&str; 8] =
    [".h", ".H", ".hh", ".Hh", ".HH", ".hpp", ".Hpp", ".HPP"];

/// Sketch file extensions
pub const SKETCH_FILE_EXTENSIONS: [&str; 2] = [".ino", ".pde"];

/// Conventional names of a library's examples folder
const EXAMPLES_FOLDER_NAMES: &[&str] = &["examples", "example"];

/// Files that say nothing about library vs. sketch
const ADMINISTRATIVE_FILES: &[&str] = &[
    r"\..*",    // dotfiles
    r"[^\.]*", // no extension (LICENSE, Makefile)
    r".*\.adoc",
    r".*\.bmp",
    r".*\.fzz",
    r".*\.html",
    r".*\.gif",
    r".*\.jpeg",
    r".*\.jpg",
    r".*\.json",
    r".*\.md",
    r".*\.mk",
    r".*\.png",
    r".*\.pdf",
    r".*\.rst",
    r".*\.sln",
    r".*\.textile",
    r".*\.txt",
    r"thumbs\.db",
    r".*\.vcxproj",
    r".*\.vcxproj\.filters",
    r".*\.yaml",
    r".*\.yml",
    r".*\.zip",
    r"platformio\.ini",
];

/// Subfolders never searched for a library
const SUBFOLDER_DENY_LIST: &[&str] = &[
    r"\..*",
    r"3dmodel.",
    r"android",
    r"android.app",
    r"androidapp",
    r"app",
    r"apps",
    r"arduino.sketch.*",
    r"arduinosketch.*",
    r"assets",
    r"bin",
    r"board",
    r"bom",
    r"bootloader.*",
    r"cad",
    r"cmake.*",
    r"compiled",
    r"cores",
    r"data",
    r".*datasheet.*",
    r"demo",
    r"demos",
    r"dependencies",
    r"design",
    r"diagrams",
    r"doc",
    r"docs",
    r"documentation",
    r"documents",
    r"eagle",
    r"etc",
    r"example",
    r"examples",
    r"extra",
    r"extras",
    r".*fritzing.*",
    r"gerbers",
    r"graphics",
    r"hardware",
    r"html",
    r"image",
    r"im.genes",
    r"imagens",
    r"images",
    r"img",
    r"imgs",
    r"java",
    r"js",
    r"kicad.*",
    r"lib",
    r"matlab",
    r"media",
    r"misc",
    r"models",
    r"node\.js",
    r"nodejs",
    r"openscad",
    r"other",
    r"pcb.*",
    r"pi",
    r"pdf.*",
    r"photos",
    r"php",
    r"pics",
    r"pictures",
    r"presentation",
    r"processing",
    r"projectsettings",
    r"python",
    r"python.code.*",
    r"python.script.*",
    r"raspberry",
    r"raspberry.*pi",
    r"raspi",
    r"readme.*",
    r"reference",
    r"references",
    r"report",
    r"resources",
    r"rpi",
    r"ruby",
    r"samples",
    r"schematic.*",
    r"screenshot.",
    r"scripts",
    r"sketch",
    r"sketch_.*",
    r".*sketchbook.*",
    r"sketches",
    r"slic3r",
    r"solidworks",
    r"stl",
    r"test",
    r"tests",
    r"tools",
    r"unity",
    r"unitypackage.*",
    r"utils",
    r"variants",
    r"web",
    r"website",
    r"wiki",
    r"www",
];

/// Repository names that are collections or sketchbooks, not libraries
const REPOSITORY_NAME_DENY_LIST: &[&str] = &[
    r"arduino",
    r"arduino.*libs",
    r"arduino.*project.",
    r"arduino.*libraries",
    r"libraries",
    r"my.*arduino.*librar((y)|(ies)).*",
    r".*sketches.*",
    r".*sketchbook.*",
];

/// Topics marking repositories that are not Arduino libraries
pub const TOPIC_DENY_LIST: [&str; 8] = [
    "arduino-sketch",
    "mongoose-os",
    "particle",
    "particle-core",
    "particle-devices",
    "particle-electron",
    "particle-io",
    "particle-photon",
];

/// Outcome of classifying one listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionOutcome {
    /// The directory holds a library
    Found,
    /// The directory does not hold a library
    NotFound,
    /// Only administrative files; look one level down
    Inconclusive,
}

/// Ordered set of case-insensitive full-match patterns
#[derive(Debug)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compile a list of patterns; each must match the whole name.
    ///
    /// # Panics
    /// Panics if a pattern is not a valid regular expression.
    pub fn new(sources: &[&str]) -> Self {
        let patterns = sources
            .iter()
            .map(|source| {
                Regex::new(&format!("(?i)^(?:{})$", source))
                    .unwrap_or_else(|e| panic!("invalid name pattern {:?}: {}", source, e))
            })
            .collect();
        Self { patterns }
    }

    /// Whether any pattern matches `name`; the first hit short-circuits
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(name))
    }
}

fn examples_folders() -> &'static PatternSet {
    static SET: OnceLock<PatternSet> = OnceLock::new();
    SET.get_or_init(|| PatternSet::new(EXAMPLES_FOLDER_NAMES))
}

fn administrative_files() -> &'static PatternSet {
    static SET: OnceLock<PatternSet> = OnceLock::new();
    SET.get_or_init(|| PatternSet::new(ADMINISTRATIVE_FILES))
}

fn subfolder_deny_list() -> &'static PatternSet {
    static SET: OnceLock<PatternSet> = OnceLock::new();
    SET.get_or_init(|| PatternSet::new(SUBFOLDER_DENY_LIST))
}

fn repository_name_deny_list() -> &'static PatternSet {
    static SET: OnceLock<PatternSet> = OnceLock::new();
    SET.get_or_init(|| PatternSet::new(REPOSITORY_NAME_DENY_LIST))
}

pub fn is_examples_folder(name: &str) -> bool {
    examples_folders().matches(name)
}

pub fn is_administrative_file(name: &str) -> bool {
    administrative_files().matches(name)
}

/// Subfolders matching the deny-list are never fetched
pub fn is_denied_subfolder(name: &str) -> bool {
    subfolder_deny_list().matches(name)
}

pub fn is_denied_repository_name(name: &str) -> bool {
    repository_name_deny_list().matches(name)
}

/// First deny-listed topic carried by a repository
pub fn denied_topic(topics: &[String]) -> Option<&'static str> {
    TOPIC_DENY_LIST
        .iter()
        .copied()
        .find(|denied| topics.iter().any(|topic| topic == denied))
}

/// Signals observed in one listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Signals {
    metadata_file: bool,
    keywords_file: bool,
    header_file: bool,
    sketch_file: bool,
    examples_folder: bool,
    only_administrative: bool,
}

fn observe(listing: &[FolderEntry], verify: bool) -> Signals {
    let mut signals = Signals {
        metadata_file: false,
        keywords_file: false,
        header_file: false,
        sketch_file: false,
        examples_folder: false,
        only_administrative: true,
    };

    for entry in listing {
        let name = entry.name.as_str();

        if entry.is_file() {
            if METADATA_FILE_NAMES.contains(&name) {
                signals.metadata_file = true;
            } else if name == KEYWORDS_FILE_NAME {
                signals.keywords_file = true;
            } else if HEADER_FILE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
                signals.header_file = true;
            }
        }

        if !verify {
            continue;
        }

        if entry.is_file() {
            if SKETCH_FILE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
                signals.sketch_file = true;
            }
            if !is_administrative_file(name) {
                signals.only_administrative = false;
            }
        } else if entry.is_dir() && is_examples_folder(name) {
            signals.examples_folder = true;
        }
    }

    signals
}

/// Classify one directory listing.
///
/// Without verification, a metadata file or any header file is enough.
/// With verification, a header next to a sketch only counts when an
/// examples folder or `keywords.txt` corroborates it, and a listing of
/// nothing but administrative files is [`DetectionOutcome::Inconclusive`].
///
/// # Examples
/// ```
/// use inoliblist_core::detect::{classify, DetectionOutcome};
/// use inoliblist_core::types::FolderEntry;
///
/// let listing = vec![FolderEntry::file("library.properties")];
/// assert_eq!(classify(&listing, false), DetectionOutcome::Found);
/// ```
pub fn classify(listing: &[FolderEntry], verify: bool) -> DetectionOutcome {
    let signals = observe(listing, verify);

    if signals.metadata_file {
        return DetectionOutcome::Found;
    }

    if !verify {
        return if signals.header_file {
            DetectionOutcome::Found
        } else {
            DetectionOutcome::NotFound
        };
    }

    if signals.header_file {
        if !signals.sketch_file || signals.examples_folder || signals.keywords_file {
            DetectionOutcome::Found
        } else {
            DetectionOutcome::NotFound
        }
    } else if signals.only_administrative {
        DetectionOutcome::Inconclusive
    } else {
        DetectionOutcome::NotFound
    }
}
