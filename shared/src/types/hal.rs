use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single link relation inside `_links`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub templated: bool,
}

impl Link {
    pub fn new(href: &str) -> Self {
        Self {
            href: href.to_string(),
            templated: false,
        }
    }

    /// A URI-template link, e.g. `/articles/{category}`.
    pub fn templated(href: &str) -> Self {
        Self {
            href: href.to_string(),
            templated: true,
        }
    }
}

/// A HAL resource: `_links`, `_embedded`, and arbitrary data fields
/// flattened onto the top level of the JSON object.
///
/// Every response body either server sends is one of these, so the wire
/// shape lives here rather than in the server crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(
        rename = "_links",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub links: BTreeMap<String, Link>,

    #[serde(
        rename = "_embedded",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub embedded: BTreeMap<String, Vec<Resource>>,

    #[serde(flatten)]
    pub data: serde_json::Map<String, Value>,
}

impl Resource {
    /// New resource with its `self` link already set.
    pub fn new(self_href: &str) -> Self {
        let mut resource = Self::default();
        resource.set_self(self_href);
        resource
    }

    pub fn set_self(&mut self, href: &str) {
        self.links.insert("self".to_string(), Link::new(href));
    }

    pub fn add_link(&mut self, rel: &str, link: Link) {
        self.links.insert(rel.to_string(), link);
    }

    pub fn add_embed(&mut self, rel: &str, resource: Resource) {
        self.embedded
            .entry(rel.to_string())
            .or_default()
            .push(resource);
    }

    /// Set a top-level data field.
    pub fn insert(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    pub fn self_href(&self) -> Option<&str> {
        self.links.get("self").map(|l| l.href.as_str())
    }
}
