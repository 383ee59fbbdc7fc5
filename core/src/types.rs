//! Wire DTOs for the Confluence REST API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently.
//! Integration tests catch any schema drift between the two crates. Nested
//! objects default when absent, matching how the server omits them for
//! partially expanded entities.

use serde::{Deserialize, Serialize};

/// A single space record from `/rest/api/space`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Space {
    pub id: i64,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "_links", default)]
    pub links: SpaceLinks,
    #[serde(rename = "_expandable", default)]
    pub expandable: SpaceExpandable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpaceLinks {
    #[serde(default)]
    pub webui: String,
    #[serde(rename = "self", default)]
    pub self_link: String,
}

/// Links to sub-resources that were not expanded in this response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpaceExpandable {
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub homepage: String,
}

/// A collection endpoint payload: one page of `results`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionResponse<T> {
    pub results: Vec<T>,
}

impl<T> Default for CollectionResponse<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
        }
    }
}

pub type SpaceResponse = CollectionResponse<Space>;
