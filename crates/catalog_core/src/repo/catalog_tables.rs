//! Storage rows and table declarations backing the catalog.
//!
//! # Responsibility
//! - Define the stored shapes of metadata and maintainer rows.
//! - Declare both tables and their indexes in one place.
//!
//! # Invariants
//! - `maintainers.email` is required, unique and case-insensitive.
//! - `metadata.website` and `metadata.source` are case-insensitive.
//! - `MaintainerRow::metadata_ids` never holds the same id twice.

use crate::model::metadata::{Maintainer, MaintainerId, Metadata, MetadataId};
use crate::store::{IndexSchema, StoreResult, Table, TableSchema};

pub const METADATA_TABLE: &str = "metadata";
pub const MAINTAINERS_TABLE: &str = "maintainers";

pub const ID_INDEX: &str = "id";
pub const TITLE_INDEX: &str = "title";
pub const VERSION_INDEX: &str = "version";
pub const COMPANY_INDEX: &str = "company";
pub const WEBSITE_INDEX: &str = "website";
pub const SOURCE_INDEX: &str = "source";
pub const LICENSE_INDEX: &str = "license";
pub const DESCRIPTION_INDEX: &str = "description";
pub const MAINTAINER_IDS_INDEX: &str = "maintainer_ids";
pub const NAME_INDEX: &str = "name";
pub const EMAIL_INDEX: &str = "email";

/// Stored metadata record with its resolved maintainer ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRow {
    pub id: MetadataId,
    pub metadata: Metadata,
    /// Same order as `metadata.maintainers`.
    pub maintainer_ids: Vec<MaintainerId>,
}

/// Stored maintainer with back-references to the records naming it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintainerRow {
    pub id: MaintainerId,
    pub maintainer: Maintainer,
    pub metadata_ids: Vec<MetadataId>,
}

impl MaintainerRow {
    pub fn new(id: MaintainerId, maintainer: Maintainer, metadata_id: MetadataId) -> Self {
        Self {
            id,
            maintainer,
            metadata_ids: vec![metadata_id],
        }
    }

    /// Adds a back-reference. Returns `false` if it was already recorded.
    ///
    /// Linking is linear in the number of back-references, and the caller
    /// copies the row out of the snapshot first, so one write costs O(n)
    /// for a maintainer shared by n records.
    pub fn link(&mut self, metadata_id: MetadataId) -> bool {
        if self.metadata_ids.contains(&metadata_id) {
            return false;
        }
        self.metadata_ids.push(metadata_id);
        true
    }
}

/// Both catalog tables; one value of this type is one snapshot.
#[derive(Clone)]
pub struct CatalogTables {
    pub metadata: Table<MetadataRow>,
    pub maintainers: Table<MaintainerRow>,
}

impl CatalogTables {
    pub fn new() -> StoreResult<Self> {
        Ok(Self {
            metadata: Table::new(metadata_schema())?,
            maintainers: Table::new(maintainers_schema())?,
        })
    }
}

fn metadata_schema() -> TableSchema<MetadataRow> {
    TableSchema::new(
        METADATA_TABLE,
        IndexSchema::field(ID_INDEX, |row: &MetadataRow| row.id.to_string()),
    )
    .with_index(IndexSchema::field(TITLE_INDEX, |row: &MetadataRow| {
        row.metadata.title.clone()
    }))
    .with_index(IndexSchema::field(VERSION_INDEX, |row: &MetadataRow| {
        row.metadata.version.clone()
    }))
    .with_index(IndexSchema::field(COMPANY_INDEX, |row: &MetadataRow| {
        row.metadata.company.clone()
    }))
    .with_index(
        IndexSchema::field(WEBSITE_INDEX, |row: &MetadataRow| {
            row.metadata.website.clone()
        })
        .lowercase(),
    )
    .with_index(
        IndexSchema::field(SOURCE_INDEX, |row: &MetadataRow| row.metadata.source.clone())
            .lowercase(),
    )
    .with_index(IndexSchema::field(LICENSE_INDEX, |row: &MetadataRow| {
        row.metadata.license.clone()
    }))
    .with_index(IndexSchema::field(DESCRIPTION_INDEX, |row: &MetadataRow| {
        row.metadata.description.clone()
    }))
    .with_index(IndexSchema::strings(
        MAINTAINER_IDS_INDEX,
        |row: &MetadataRow| row.maintainer_ids.iter().map(ToString::to_string).collect(),
    ))
}

fn maintainers_schema() -> TableSchema<MaintainerRow> {
    TableSchema::new(
        MAINTAINERS_TABLE,
        IndexSchema::field(ID_INDEX, |row: &MaintainerRow| row.id.to_string()),
    )
    .with_index(IndexSchema::field(NAME_INDEX, |row: &MaintainerRow| {
        row.maintainer.name.clone()
    }))
    .with_index(
        IndexSchema::field(EMAIL_INDEX, |row: &MaintainerRow| {
            row.maintainer.email.clone()
        })
        .unique()
        .required()
        .lowercase(),
    )
}
