//! Metadata record model.
//!
//! # Responsibility
//! - Define the catalog entry (`Metadata`) and its contacts (`Maintainer`).
//! - Provide the search result envelope returned to transports.
//!
//! # Invariants
//! - `Metadata` carries no identifier; ids are assigned by the repository
//!   and live beside the record in storage.
//! - An empty string field means "unset", both for writes and as a search
//!   filter ("don't care").

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a stored metadata record.
pub type MetadataId = Uuid;

/// Stable identifier of a stored maintainer.
pub type MaintainerId = Uuid;

/// One person or team responsible for a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    #[serde(default)]
    pub name: String,
    /// Unique across the store, compared case-insensitively.
    #[serde(default)]
    pub email: String,
}

impl Maintainer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Catalog entry describing one software package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub website: String,
    /// Source repository URL.
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub description: String,
    /// Ordered as provided by the caller; may be empty.
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,
}

impl Metadata {
    /// Returns the maintainer emails in declaration order.
    pub fn maintainer_emails(&self) -> Vec<&str> {
        self.maintainers
            .iter()
            .map(|maintainer| maintainer.email.as_str())
            .collect()
    }
}

/// Search response envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<Metadata>,
}
