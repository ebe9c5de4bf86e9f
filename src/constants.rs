//! Constants for logseq-compiler
//!
//! This module contains the Logseq export key names, output folder names,
//! labels, and limits used throughout the codebase.

// === Logseq Export Keys ===

/// Integer identity of a record
pub const KEY_ID: &str = "db/id";

/// Stable external identity (used by `((uuid))` references)
pub const KEY_UUID: &str = "block/uuid";

/// Lowercased page name
pub const KEY_NAME: &str = "block/name";

/// Page name as typed by the author
pub const KEY_ORIGINAL_NAME: &str = "block/original-name";

/// Raw block text
pub const KEY_CONTENT: &str = "block/content";

/// Containing page reference
pub const KEY_PAGE: &str = "block/page";

/// Parent block reference
pub const KEY_PARENT: &str = "block/parent";

/// Left sibling reference
pub const KEY_LEFT: &str = "block/left";

/// Namespace parent reference
pub const KEY_NAMESPACE: &str = "block/namespace";

pub const KEY_PROPERTIES: &str = "block/properties";
pub const KEY_PRE_BLOCK: &str = "block/pre-block?";
pub const KEY_COLLAPSED: &str = "block/collapsed?";
pub const KEY_CREATED_AT: &str = "block/created-at";
pub const KEY_UPDATED_AT: &str = "block/updated-at";

/// Outbound references
pub const KEY_REFS: &str = "block/refs";

/// References inherited from ancestors
pub const KEY_PATH_REFS: &str = "block/path-refs";

/// Alias pages
pub const KEY_ALIAS: &str = "block/alias";

// === Property Names ===

/// Explicit visibility flag
pub const PROP_PUBLIC: &str = "public";

/// Marks the page exported as the site root
pub const PROP_HOME: &str = "home";

/// Page alias names
pub const PROP_ALIAS: &str = "alias";

/// Page cover image
pub const PROP_IMAGE: &str = "image";

/// Node properties whose names collide with front matter keys, and the
/// names they are exported under
pub const RENAMED_PROPERTIES: [(&str, &str); 4] = [
    ("url", "external-url"),
    ("links", "external-links"),
    ("title", "logseq-title"),
    ("weight", "logseq-weight"),
];

// === Front Matter Keys ===

pub const FM_TITLE: &str = "title";
pub const FM_BACKLINKS: &str = "backlinks";
pub const FM_ALIASES: &str = "aliases";
pub const FM_NAMESPACE: &str = "namespace";
pub const FM_LINKS: &str = "links";
pub const FM_COLLAPSED: &str = "collapsed";
pub const FM_TYPE: &str = "logseq-type";
pub const FM_WEIGHT: &str = "weight";
pub const FM_DATE: &str = "date";
pub const FM_LASTMOD: &str = "lastmod";

// === File and Directory Names ===

/// Root segment of every export path
pub const NOTES_FOLDER: &str = "graph";

/// Filename written into every node directory
pub const INDEX_FILENAME: &str = "_index.md";

/// Asset folder name, both in the Logseq graph and in the site
pub const ASSETS_FOLDER: &str = "assets";

/// Destination entry preserved when the destination is emptied
pub const PRESERVED_FOLDER: &str = "files";

// === Labels ===

/// Label rendered in place of any non-public target
pub const REDACTED_LABEL: &str = "redacted";

/// Non-resolving link target rendered for non-public targets
pub const REDACTED_PATH: &str = "-";

/// Fallback title for blocks without text
pub const UNTITLED_TITLE: &str = "Untitled";

// === Limits ===

/// Maximum characters of a block title before it is cut
pub const MAX_TITLE_LENGTH: usize = 100;

/// Ellipsis appended to a cut title
pub const TITLE_ELLIPSIS: &str = "...";

/// Maximum depth for nested reference labels
pub const MAX_LABEL_DEPTH: usize = 2;

// === Environment ===

/// Enables assume-public mode when set to a truthy value
pub const ENV_ASSUME_PUBLIC: &str = "LOGSEQ_ASSUME_PUBLIC";
