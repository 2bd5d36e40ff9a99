//! Core use-case services.
//!
//! # Responsibility
//! - Compose validation and repository calls into use-case level APIs.
//! - Keep transports decoupled from storage details.

pub mod metadata_service;
