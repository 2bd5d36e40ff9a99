//! Validator contract and the default field-by-field implementation.
//!
//! # Responsibility
//! - Enforce presence of every catalog field on writes.
//! - Normalize URLs (scheme/host case) and emails (bare address, domain
//!   case) for writes and searches alike.
//!
//! # Invariants
//! - Validation never stops at the first error.
//! - Sanitizing an already sanitized record is a no-op.
//!
//! # See also
//! - `service::metadata_service` for where each pass runs.

use super::errors::AggregatedValidationError;
use crate::model::metadata::Metadata;
use once_cell::sync::Lazy;
use regex::Regex;

static URL_WITH_SCHEME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*)://(?P<authority>[^/?#]*)(?P<rest>.*)$")
        .expect("valid url regex")
});
static BAD_PERCENT_ESCAPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%([^0-9A-Fa-f]|[0-9A-Fa-f][^0-9A-Fa-f]|[0-9A-Fa-f]?$)")
        .expect("valid percent escape regex")
});
static NAMED_ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>[^<>]*)<(?P<address>[^<>]+)>$").expect("valid named address regex")
});
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[^@\s<>()\[\],;:"]+@[^@\s<>()\[\],;:"]+$"#).expect("valid email regex")
});

const EMPTY_VALUE: &str = "empty value";
const MALFORMED_URL: &str = "url not properly formed";
const MALFORMED_EMAIL: &str = "email address not properly formed";

/// Inbound check applied before the repository sees a record.
pub trait MetadataValidator {
    /// Full check for insert/update; sanitizes in place on success.
    fn validate_and_sanitize(&self, metadata: &mut Metadata)
        -> Result<(), AggregatedValidationError>;
    /// Normalization only, for search templates; no presence checks.
    fn sanitize_urls(&self, metadata: &mut Metadata) -> Result<(), AggregatedValidationError>;
}

/// Field-by-field validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleValidator;

impl MetadataValidator for SimpleValidator {
    fn validate_and_sanitize(
        &self,
        metadata: &mut Metadata,
    ) -> Result<(), AggregatedValidationError> {
        let mut errors = AggregatedValidationError::new();

        let required = [
            ("title", &metadata.title),
            ("version", &metadata.version),
            ("company", &metadata.company),
            ("license", &metadata.license),
            ("description", &metadata.description),
        ];
        for (path, value) in required {
            if value.trim().is_empty() {
                errors.push(path, EMPTY_VALUE);
            }
        }

        for (path, value) in [
            ("website", &mut metadata.website),
            ("source", &mut metadata.source),
        ] {
            if value.trim().is_empty() {
                errors.push(path, EMPTY_VALUE);
            } else {
                sanitize_url_field(path, value, &mut errors);
            }
        }

        if metadata.maintainers.is_empty() {
            errors.push("maintainers", EMPTY_VALUE);
        }
        for (position, maintainer) in metadata.maintainers.iter_mut().enumerate() {
            if maintainer.name.trim().is_empty() {
                errors.push(format!("maintainers[{position}].name"), EMPTY_VALUE);
            }
            let path = format!("maintainers[{position}].email");
            if maintainer.email.trim().is_empty() {
                errors.push(path, EMPTY_VALUE);
            } else {
                sanitize_email_field(path, &mut maintainer.email, &mut errors);
            }
        }

        errors.into_result()
    }

    fn sanitize_urls(&self, metadata: &mut Metadata) -> Result<(), AggregatedValidationError> {
        let mut errors = AggregatedValidationError::new();

        for (path, value) in [
            ("website", &mut metadata.website),
            ("source", &mut metadata.source),
        ] {
            if !value.is_empty() {
                sanitize_url_field(path, value, &mut errors);
            }
        }

        for (position, maintainer) in metadata.maintainers.iter_mut().enumerate() {
            if !maintainer.email.is_empty() {
                let path = format!("maintainers[{position}].email");
                sanitize_email_field(path, &mut maintainer.email, &mut errors);
            }
        }

        errors.into_result()
    }
}

fn sanitize_url_field(path: &str, value: &mut String, errors: &mut AggregatedValidationError) {
    match normalize_url(value) {
        Some(normalized) => *value = normalized,
        None => errors.push(path, MALFORMED_URL),
    }
}

fn sanitize_email_field(path: String, value: &mut String, errors: &mut AggregatedValidationError) {
    match normalize_email(value) {
        Some(normalized) => *value = normalized,
        None => errors.push(path, MALFORMED_EMAIL),
    }
}

/// Normalizes a URL or bare host/path reference.
///
/// Returns `None` for values with embedded whitespace or control
/// characters, broken percent escapes, a missing scheme before `://`, or
/// an empty host. Scheme and host are lower-cased; the rest is kept.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.starts_with(':')
        || trimmed
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        || BAD_PERCENT_ESCAPE_RE.is_match(trimmed)
    {
        return None;
    }

    let Some(caps) = URL_WITH_SCHEME_RE.captures(trimmed) else {
        if trimmed.contains("://") {
            return None;
        }
        return Some(trimmed.to_string());
    };

    let authority = &caps["authority"];
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if host.is_empty() {
        return None;
    }
    let authority = match authority.rsplit_once('@') {
        Some((user_info, host)) => format!("{user_info}@{}", host.to_lowercase()),
        None => authority.to_lowercase(),
    };

    Some(format!(
        "{}://{}{}",
        caps["scheme"].to_lowercase(),
        authority,
        &caps["rest"]
    ))
}

/// Normalizes `addr@domain` or `Display Name <addr@domain>` to the bare
/// address with a lower-cased domain.
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let address = match NAMED_ADDRESS_RE.captures(trimmed) {
        Some(caps) => caps
            .name("address")
            .map_or("", |address| address.as_str())
            .trim(),
        None => trimmed,
    };

    if !EMAIL_RE.is_match(address) {
        return None;
    }
    let (local, domain) = address.rsplit_once('@')?;
    Some(format!("{local}@{}", domain.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::{normalize_email, normalize_url, MetadataValidator, SimpleValidator};
    use crate::model::metadata::{Maintainer, Metadata};

    fn complete() -> Metadata {
        Metadata {
            title: "Valid App 1".to_string(),
            version: "0.0.1".to_string(),
            company: "Random Inc.".to_string(),
            website: "HTTPS://Website.COM/Docs".to_string(),
            source: "https://github.com/random/repo".to_string(),
            license: "Apache-2.0".to_string(),
            description: "Interesting Title".to_string(),
            maintainers: vec![
                Maintainer::new("firstmaintainer app1", "firstmaintainer@hotmail.com"),
                Maintainer::new("secondmaintainer app1", "Second <secondmaintainer@GMAIL.com>"),
            ],
        }
    }

    #[test]
    fn complete_record_is_sanitized() {
        let mut metadata = complete();
        SimpleValidator.validate_and_sanitize(&mut metadata).unwrap();
        assert_eq!(metadata.website, "https://website.com/Docs");
        assert_eq!(metadata.maintainers[1].email, "secondmaintainer@gmail.com");
    }

    #[test]
    fn every_missing_field_is_reported() {
        let mut metadata = Metadata {
            maintainers: vec![Maintainer::new("", "not-an-email")],
            ..Metadata::default()
        };
        let err = SimpleValidator
            .validate_and_sanitize(&mut metadata)
            .unwrap_err();
        let paths = err
            .errors()
            .iter()
            .map(|e| e.path.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            paths,
            vec![
                "title",
                "version",
                "company",
                "license",
                "description",
                "website",
                "source",
                "maintainers[0].name",
                "maintainers[0].email",
            ]
        );
    }

    #[test]
    fn missing_maintainers_are_reported() {
        let mut metadata = complete();
        metadata.maintainers.clear();
        let err = SimpleValidator
            .validate_and_sanitize(&mut metadata)
            .unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.errors()[0].path, "maintainers");
    }

    #[test]
    fn sanitize_only_skips_presence_checks() {
        let mut filter = Metadata {
            website: "HTTP://Example.org".to_string(),
            maintainers: vec![Maintainer::new("", "Who <Me@Example.ORG>")],
            ..Metadata::default()
        };
        SimpleValidator.sanitize_urls(&mut filter).unwrap();
        assert_eq!(filter.website, "http://example.org");
        assert_eq!(filter.maintainers[0].email, "Me@example.org");
    }

    #[test]
    fn sanitize_only_reports_malformed_values() {
        let mut filter = Metadata {
            source: "http://bad host".to_string(),
            maintainers: vec![Maintainer::new("", "nobody")],
            ..Metadata::default()
        };
        let err = SimpleValidator.sanitize_urls(&mut filter).unwrap_err();
        assert_eq!(err.errors().len(), 2);
    }

    #[test]
    fn url_normalization_rules() {
        assert_eq!(
            normalize_url(" dummyCompany.com ").as_deref(),
            Some("dummyCompany.com")
        );
        assert_eq!(
            normalize_url("https://User@GitHub.com/Org/Repo?q=A").as_deref(),
            Some("https://User@github.com/Org/Repo?q=A")
        );
        assert_eq!(normalize_url("https://"), None);
        assert_eq!(normalize_url("://host"), None);
        assert_eq!(normalize_url("http://x.io/%zz"), None);
        assert_eq!(normalize_url("http://x.io/%2F").as_deref(), Some("http://x.io/%2F"));
    }

    #[test]
    fn email_normalization_rules() {
        assert_eq!(normalize_email("a@B.io").as_deref(), Some("a@b.io"));
        assert_eq!(normalize_email("  <a@b.io> ").as_deref(), Some("a@b.io"));
        assert_eq!(normalize_email("a@@b.io"), None);
        assert_eq!(normalize_email("a b@c.io"), None);
        assert_eq!(normalize_email(""), None);
    }
}
