//! Metadata repository contract and in-memory implementation.
//!
//! # Responsibility
//! - Provide insert/update/get/search over catalog records.
//! - Maintain the record <-> maintainer relation inside one transaction.
//!
//! # Invariants
//! - A maintainer is resolved by email; a known email reuses its row.
//! - Each write runs in one write transaction: all of it commits or none
//!   of it becomes visible.
//! - Update replaces the record row but never removes maintainer rows or
//!   their back-references, so those may go stale.
//!
//! # See also
//! - `repo::catalog_tables` for the table and index declarations.
//! - `search::query` for how `search` resolves predicates.

use crate::model::metadata::{Maintainer, MaintainerId, Metadata, MetadataId};
use crate::repo::catalog_tables::{
    CatalogTables, MaintainerRow, MetadataRow, EMAIL_INDEX, ID_INDEX,
};
use crate::search::query::{run_query, QueryParams};
use crate::store::{MemStore, StoreError};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for metadata persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// No record is stored under the id.
    NotFound(MetadataId),
    /// A search referenced a field that has no index.
    InvalidQueryField(String),
    Store(StoreError),
    /// Stored state breaks a relation invariant.
    InvalidData(String),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "metadata not found: {id}"),
            Self::InvalidQueryField(field) => write!(f, "invalid query field `{field}`"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid stored catalog data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::UnknownIndex { index, .. } => Self::InvalidQueryField(index),
            other => Self::Store(other),
        }
    }
}

/// Repository interface for catalog records.
pub trait MetadataRepository {
    /// Stores a new record and returns its generated id.
    fn insert(&self, metadata: &Metadata) -> RepoResult<MetadataId>;
    /// Replaces the record stored under `id`.
    fn update(&self, id: MetadataId, metadata: &Metadata) -> RepoResult<()>;
    fn get(&self, id: MetadataId) -> RepoResult<Metadata>;
    /// Returns every record matching all non-empty fields of `filter`.
    fn search(&self, filter: &Metadata) -> RepoResult<Vec<Metadata>>;
}

/// Read model of a stored maintainer and the records pointing at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintainerRecord {
    pub id: MaintainerId,
    pub maintainer: Maintainer,
    pub metadata_ids: Vec<MetadataId>,
}

impl From<&MaintainerRow> for MaintainerRecord {
    fn from(row: &MaintainerRow) -> Self {
        Self {
            id: row.id,
            maintainer: row.maintainer.clone(),
            metadata_ids: row.metadata_ids.clone(),
        }
    }
}

/// Repository backed by a process-local [`MemStore`].
pub struct MemoryMetadataRepository {
    store: MemStore<CatalogTables>,
}

impl MemoryMetadataRepository {
    /// Creates a repository over a fresh, empty store.
    pub fn new() -> RepoResult<Self> {
        let tables = CatalogTables::new()?;
        info!("event=store_open module=repo status=ok tables=metadata,maintainers");
        Ok(Self {
            store: MemStore::new(tables),
        })
    }

    /// Underlying store handle, for callers that need explicit transactions.
    pub fn store(&self) -> &MemStore<CatalogTables> {
        &self.store
    }

    /// Number of records in the latest snapshot.
    pub fn len(&self) -> usize {
        self.store.read().data().metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a maintainer by email, ignoring case.
    pub fn maintainer_by_email(&self, email: &str) -> RepoResult<Option<MaintainerRecord>> {
        self.store.view(|txn| {
            let row = txn.data().maintainers.first(EMAIL_INDEX, email)?;
            Ok(row.map(|row| MaintainerRecord::from(row.as_ref())))
        })
    }

    /// Runs an explicit predicate set against one read snapshot.
    pub fn query_by_params(&self, params: &QueryParams) -> RepoResult<Vec<Metadata>> {
        let started_at = Instant::now();
        self.store.view(|txn| {
            let result = run_query(txn.data(), params);
            match &result {
                Ok(rows) => info!(
                    "event=metadata_search module=repo status=ok txn_id={} predicates={} results={} duration_ms={}",
                    txn.id(),
                    params.predicate_count(),
                    rows.len(),
                    started_at.elapsed().as_millis()
                ),
                Err(err) => error!(
                    "event=metadata_search module=repo status=error txn_id={} predicates={} error={}",
                    txn.id(),
                    params.predicate_count(),
                    err
                ),
            }
            Ok(result?
                .into_iter()
                .map(|row| row.metadata.clone())
                .collect())
        })
    }

    /// Returns records reachable from every email in `emails`.
    pub fn query_by_emails(&self, emails: &[String]) -> RepoResult<Vec<Metadata>> {
        let params = emails
            .iter()
            .fold(QueryParams::new(), |params, email| params.with_email(email.as_str()));
        self.query_by_params(&params)
    }
}

impl MetadataRepository for MemoryMetadataRepository {
    fn insert(&self, metadata: &Metadata) -> RepoResult<MetadataId> {
        let started_at = Instant::now();
        let id = Uuid::new_v4();
        let result = self
            .store
            .update(|txn| write_metadata(txn.data_mut(), id, metadata));
        log_write("metadata_insert", id, metadata, started_at, &result);
        result.map(|()| id)
    }

    fn update(&self, id: MetadataId, metadata: &Metadata) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.store.update(|txn| {
            let tables = txn.data_mut();
            let key = id.to_string();
            if tables.metadata.first(ID_INDEX, &key)?.is_none() {
                return Err(RepoError::NotFound(id));
            }
            tables.metadata.delete(&key)?;
            write_metadata(tables, id, metadata)
        });
        log_write("metadata_update", id, metadata, started_at, &result);
        result
    }

    fn get(&self, id: MetadataId) -> RepoResult<Metadata> {
        self.store.view(|txn| {
            match txn.data().metadata.first(ID_INDEX, &id.to_string())? {
                Some(row) => Ok(row.metadata.clone()),
                None => {
                    info!("event=metadata_get module=repo status=not_found metadata_id={id}");
                    Err(RepoError::NotFound(id))
                }
            }
        })
    }

    fn search(&self, filter: &Metadata) -> RepoResult<Vec<Metadata>> {
        self.query_by_params(&QueryParams::from_filter(filter))
    }
}

/// Resolves maintainers by email and stores the record row under `id`.
fn write_metadata(
    tables: &mut CatalogTables,
    id: MetadataId,
    metadata: &Metadata,
) -> RepoResult<()> {
    let mut maintainer_ids = Vec::with_capacity(metadata.maintainers.len());

    for maintainer in &metadata.maintainers {
        let existing = tables.maintainers.first(EMAIL_INDEX, &maintainer.email)?;
        let maintainer_id = match existing {
            Some(row) => {
                let mut row = MaintainerRow::clone(&row);
                let maintainer_id = row.id;
                if row.link(id) {
                    tables.maintainers.insert(row)?;
                }
                maintainer_id
            }
            None => {
                let maintainer_id = Uuid::new_v4();
                tables.maintainers.insert(MaintainerRow::new(
                    maintainer_id,
                    maintainer.clone(),
                    id,
                ))?;
                maintainer_id
            }
        };
        maintainer_ids.push(maintainer_id);
    }

    tables.metadata.insert(MetadataRow {
        id,
        metadata: metadata.clone(),
        maintainer_ids,
    })?;
    Ok(())
}

fn log_write(
    event: &str,
    id: MetadataId,
    metadata: &Metadata,
    started_at: Instant,
    result: &RepoResult<()>,
) {
    match result {
        Ok(()) => info!(
            "event={event} module=repo status=ok metadata_id={id} maintainers={} duration_ms={}",
            metadata.maintainers.len(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={event} module=repo status=error metadata_id={id} duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryMetadataRepository, MetadataRepository, RepoError};
    use crate::model::metadata::{Maintainer, Metadata};
    use crate::store::StoreError;

    fn sample(email: &str) -> Metadata {
        Metadata {
            title: "catalog".to_string(),
            version: "1.0".to_string(),
            maintainers: vec![Maintainer::new("Tester", email)],
            ..Metadata::default()
        }
    }

    #[test]
    fn unknown_index_maps_to_invalid_query_field() {
        let err = RepoError::from(StoreError::UnknownIndex {
            table: "metadata",
            index: "colour".to_string(),
        });
        assert!(matches!(err, RepoError::InvalidQueryField(ref field) if field == "colour"));
    }

    #[test]
    fn repeated_email_in_one_record_creates_one_maintainer() {
        let repo = MemoryMetadataRepository::new().unwrap();
        let mut metadata = sample("dup@x.io");
        metadata.maintainers.push(Maintainer::new("Again", "DUP@x.io"));

        let id = repo.insert(&metadata).unwrap();
        let maintainer = repo.maintainer_by_email("dup@x.io").unwrap().unwrap();
        assert_eq!(maintainer.metadata_ids, vec![id]);
        assert_eq!(maintainer.maintainer.name, "Tester");
        assert_eq!(repo.store().read().data().maintainers.len(), 1);
    }

    #[test]
    fn not_found_is_distinguishable() {
        let repo = MemoryMetadataRepository::new().unwrap();
        let err = repo.get(uuid::Uuid::new_v4()).unwrap_err();
        assert!(err.is_not_found());
        assert!(!RepoError::InvalidQueryField("x".to_string()).is_not_found());
    }
}
