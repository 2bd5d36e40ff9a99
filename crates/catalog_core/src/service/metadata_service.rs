//! Metadata use-case service.
//!
//! # Responsibility
//! - Run inbound validation before every repository call.
//! - Provide create/update/get/search entry points for transports.
//!
//! # Invariants
//! - Writes reach the repository only after `validate_and_sanitize`
//!   succeeds; searches only after `sanitize_urls` succeeds.
//! - Repository errors are returned unchanged inside `ServiceError::Repo`.

use crate::model::metadata::{Metadata, MetadataId, SearchResults};
use crate::repo::metadata_repo::{MetadataRepository, RepoError};
use crate::validation::validator::MetadataValidator;
use crate::validation::AggregatedValidationError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for metadata use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Input was rejected; nothing was persisted.
    Validation(AggregatedValidationError),
    Repo(RepoError),
}

impl ServiceError {
    /// Whether the failure means "no such record".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Repo(err) if err.is_not_found())
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<AggregatedValidationError> for ServiceError {
    fn from(value: AggregatedValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Composition of one validator and one repository.
pub struct MetadataService<R: MetadataRepository, V: MetadataValidator> {
    repo: R,
    validator: V,
}

impl<R: MetadataRepository, V: MetadataValidator> MetadataService<R, V> {
    pub fn new(repo: R, validator: V) -> Self {
        Self { repo, validator }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Validates, sanitizes and stores a new record.
    pub fn create_metadata(&self, mut metadata: Metadata) -> ServiceResult<MetadataId> {
        self.validate(&mut metadata)?;
        let id = self.repo.insert(&metadata)?;
        info!("event=metadata_create module=service status=ok metadata_id={id}");
        Ok(id)
    }

    /// Validates, sanitizes and replaces the record stored under `id`.
    pub fn update_metadata(&self, id: MetadataId, mut metadata: Metadata) -> ServiceResult<()> {
        self.validate(&mut metadata)?;
        Ok(self.repo.update(id, &metadata)?)
    }

    pub fn get_metadata(&self, id: MetadataId) -> ServiceResult<Metadata> {
        Ok(self.repo.get(id)?)
    }

    /// Sanitizes the filter template and returns every matching record.
    pub fn search_metadata(&self, mut filter: Metadata) -> ServiceResult<SearchResults> {
        if let Err(err) = self.validator.sanitize_urls(&mut filter) {
            warn!(
                "event=metadata_validate module=service status=error op=search fields={}",
                err.errors().len()
            );
            return Err(err.into());
        }
        let results = self.repo.search(&filter)?;
        Ok(SearchResults { results })
    }

    fn validate(&self, metadata: &mut Metadata) -> ServiceResult<()> {
        self.validator.validate_and_sanitize(metadata).map_err(|err| {
            warn!(
                "event=metadata_validate module=service status=error op=write fields={}",
                err.errors().len()
            );
            ServiceError::from(err)
        })
    }
}
