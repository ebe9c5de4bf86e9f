//! Node model and record normalization
//!
//! A [`Node`] is one page or block of the Logseq graph. Raw export records are
//! generic JSON objects; [`Node::from_record`] turns one into a typed node or
//! drops it when the identity keys are missing.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::constants as C;
use crate::util;
use crate::visibility::Publicity;

/// Integer identity of a node
pub type NodeId = i64;

/// A dynamically typed property value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Convert a JSON value, returning `None` for null and objects
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(PropertyValue::Bool(*b)),
            Value::Number(n) => Some(PropertyValue::Number(n.clone())),
            Value::String(s) => Some(PropertyValue::Text(s.clone())),
            Value::Array(items) => Some(PropertyValue::List(
                items.iter().filter_map(PropertyValue::from_json).collect(),
            )),
            Value::Null | Value::Object(_) => None,
        }
    }

    /// Interpret the value as a visibility flag
    ///
    /// Native booleans are taken as-is, strings are true only when they read
    /// "true" (any case). Everything else is false.
    pub fn as_flag(&self) -> bool {
        match self {
            PropertyValue::Bool(b) => *b,
            PropertyValue::Text(s) => s.trim().eq_ignore_ascii_case("true"),
            PropertyValue::Number(_) | PropertyValue::List(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Collect the string values, splitting comma-separated text
    pub fn texts(&self) -> Vec<String> {
        match self {
            PropertyValue::Text(s) => s
                .split(',')
                .map(|part| part.trim().trim_start_matches("[[").trim_end_matches("]]").trim())
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
            PropertyValue::List(items) => items.iter().flat_map(PropertyValue::texts).collect(),
            _ => Vec::new(),
        }
    }
}

/// A page or block of the graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Stable key used in `((...))` references
    pub external_key: String,

    pub name: Option<String>,
    pub display_name: Option<String>,
    pub text: Option<String>,

    pub parent_id: Option<NodeId>,
    pub container_page_id: Option<NodeId>,
    pub left_sibling_id: Option<NodeId>,
    pub namespace_parent_id: Option<NodeId>,

    pub properties: BTreeMap<String, PropertyValue>,
    pub is_page_properties_block: bool,
    pub is_collapsed: bool,

    /// Milliseconds since the Unix epoch
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,

    pub outbound_ref_ids: Vec<NodeId>,
    pub inherited_ref_ids: Vec<NodeId>,
    pub alias_ids: Vec<NodeId>,
}

impl Node {
    /// Normalize one raw export record
    ///
    /// Returns `None` when the record has no integer id or no external key.
    pub fn from_record(record: &Map<String, Value>) -> Option<Self> {
        let id = match record.get(C::KEY_ID).and_then(Value::as_i64) {
            Some(id) => id,
            None => {
                debug!("dropping record without {}", C::KEY_ID);
                return None;
            }
        };
        let external_key = match record.get(C::KEY_UUID).and_then(Value::as_str) {
            Some(key) => key.to_string(),
            None => {
                debug!(id, "dropping record without {}", C::KEY_UUID);
                return None;
            }
        };

        let properties = match record.get(C::KEY_PROPERTIES) {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(key, value)| {
                    PropertyValue::from_json(value).map(|v| (key.clone(), v))
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        Some(Node {
            id,
            external_key,
            name: trimmed_string(record, C::KEY_NAME),
            display_name: trimmed_string(record, C::KEY_ORIGINAL_NAME),
            text: record
                .get(C::KEY_CONTENT)
                .and_then(Value::as_str)
                .map(str::to_string),
            parent_id: reference(record, C::KEY_PARENT),
            container_page_id: reference(record, C::KEY_PAGE),
            left_sibling_id: reference(record, C::KEY_LEFT),
            namespace_parent_id: reference(record, C::KEY_NAMESPACE),
            properties,
            is_page_properties_block: flag(record, C::KEY_PRE_BLOCK),
            is_collapsed: flag(record, C::KEY_COLLAPSED),
            created_at: timestamp(record, C::KEY_CREATED_AT),
            updated_at: timestamp(record, C::KEY_UPDATED_AT),
            outbound_ref_ids: reference_list(record, C::KEY_REFS),
            inherited_ref_ids: reference_list(record, C::KEY_PATH_REFS),
            alias_ids: reference_list(record, C::KEY_ALIAS),
        })
    }

    /// A page has neither a parent nor a containing page
    pub fn is_page(&self) -> bool {
        self.parent_id.is_none() && self.container_page_id.is_none()
    }

    /// Whether this page is exported as the site root
    pub fn is_home(&self) -> bool {
        self.properties
            .get(C::PROP_HOME)
            .map(PropertyValue::as_flag)
            .unwrap_or(false)
    }

    /// Pages always have a document; blocks only when they carry text
    pub fn is_showable(&self) -> bool {
        if self.is_page() {
            return true;
        }
        let has_text = self
            .text
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false);
        !self.is_page_properties_block && has_text
    }

    /// The explicit `public` property, if set
    pub fn visibility_flag(&self) -> Option<bool> {
        self.properties.get(C::PROP_PUBLIC).map(PropertyValue::as_flag)
    }

    /// Human name of a page (author casing first)
    pub fn page_title(&self) -> Option<&str> {
        self.display_name.as_deref().or(self.name.as_deref())
    }

    /// Alias names declared through the `alias` property
    pub fn alias_names(&self) -> Vec<String> {
        self.properties
            .get(C::PROP_ALIAS)
            .map(PropertyValue::texts)
            .unwrap_or_default()
    }

    /// Path segment of this node inside an export path
    ///
    /// Public pages use a slug of their title. Private pages and every block
    /// use the opaque external key, so no name or content reaches a path.
    pub fn path_component(&self, publicity: &Publicity) -> String {
        if self.is_page() && publicity.is_public(self.id) {
            let slug = self.page_title().map(util::slugify).unwrap_or_default();
            if slug.is_empty() {
                self.id.to_string()
            } else {
                slug
            }
        } else {
            self.external_key.clone()
        }
    }
}

fn trimmed_string(record: &Map<String, Value>, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn flag(record: &Map<String, Value>, key: &str) -> bool {
    record.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn timestamp(record: &Map<String, Value>, key: &str) -> Option<i64> {
    let value = record.get(key)?;
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

/// Resolve a `{ "db/id": X }` reference
fn reference(record: &Map<String, Value>, key: &str) -> Option<NodeId> {
    record.get(key).and_then(id_of)
}

fn reference_list(record: &Map<String, Value>, key: &str) -> Vec<NodeId> {
    match record.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(id_of).collect(),
        _ => Vec::new(),
    }
}

fn id_of(value: &Value) -> Option<NodeId> {
    value.as_object()?.get(C::KEY_ID)?.as_i64()
}
