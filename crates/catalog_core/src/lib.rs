//! Core domain logic for the metadata catalog.
//! This crate is the single source of truth for catalog invariants.

pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod store;
pub mod validation;

pub use logging::{active_log_config, init_logging, LogConfig, LogLevel, LoggingError};
pub use model::metadata::{Maintainer, MaintainerId, Metadata, MetadataId, SearchResults};
pub use repo::metadata_repo::{
    MaintainerRecord, MemoryMetadataRepository, MetadataRepository, RepoError, RepoResult,
};
pub use search::query::{QueryField, QueryParams};
pub use service::metadata_service::{MetadataService, ServiceError, ServiceResult};
pub use store::StoreError;
pub use validation::validator::{MetadataValidator, SimpleValidator};
pub use validation::{AggregatedValidationError, ValidationError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
