use catalog_core::{
    Maintainer, MemoryMetadataRepository, Metadata, MetadataService, ServiceError,
    SimpleValidator,
};
use uuid::Uuid;

fn service() -> MetadataService<MemoryMetadataRepository, SimpleValidator> {
    MetadataService::new(MemoryMetadataRepository::new().unwrap(), SimpleValidator)
}

fn valid(title: &str) -> Metadata {
    Metadata {
        title: title.to_string(),
        version: "1.0.1".to_string(),
        company: "Upbound Inc.".to_string(),
        website: "HTTPS://Upbound.IO".to_string(),
        source: "https://github.com/upbound/repo".to_string(),
        license: "Apache-2.0".to_string(),
        description: "### Why app 2 is the best".to_string(),
        maintainers: vec![Maintainer::new(
            "AppTwo Maintainer",
            "App Two <apptwo@Hotmail.COM>",
        )],
    }
}

#[test]
fn create_stores_sanitized_record() {
    let service = service();
    let id = service.create_metadata(valid("Valid App 2")).unwrap();

    let stored = service.get_metadata(id).unwrap();
    assert_eq!(stored.website, "https://upbound.io");
    assert_eq!(stored.maintainers[0].email, "apptwo@hotmail.com");
}

#[test]
fn invalid_record_is_rejected_and_not_stored() {
    let service = service();
    let mut metadata = valid("Broken");
    metadata.version.clear();
    metadata.website = "https://bad url".to_string();
    metadata.maintainers[0].email = "not an email".to_string();

    let err = service.create_metadata(metadata).unwrap_err();
    let ServiceError::Validation(errors) = &err else {
        panic!("expected validation error, got {err}");
    };
    let paths = errors
        .errors()
        .iter()
        .map(|e| e.path.as_str())
        .collect::<Vec<_>>();
    assert_eq!(paths, vec!["version", "website", "maintainers[0].email"]);
    assert!(!err.is_not_found());
    assert!(service.repository().is_empty());
}

#[test]
fn update_validates_then_replaces() {
    let service = service();
    let id = service.create_metadata(valid("First")).unwrap();

    let mut invalid = valid("Second");
    invalid.license.clear();
    assert!(matches!(
        service.update_metadata(id, invalid),
        Err(ServiceError::Validation(_))
    ));
    assert_eq!(service.get_metadata(id).unwrap().title, "First");

    service.update_metadata(id, valid("Second")).unwrap();
    assert_eq!(service.get_metadata(id).unwrap().title, "Second");
}

#[test]
fn missing_ids_surface_as_not_found() {
    let service = service();
    assert!(service.get_metadata(Uuid::new_v4()).unwrap_err().is_not_found());
    assert!(service
        .update_metadata(Uuid::new_v4(), valid("ghost"))
        .unwrap_err()
        .is_not_found());
}

#[test]
fn search_sanitizes_the_filter_first() {
    let service = service();
    service.create_metadata(valid("Valid App 2")).unwrap();
    service.create_metadata(valid("Valid App 3")).unwrap();

    let by_email = service
        .search_metadata(Metadata {
            maintainers: vec![Maintainer::new("", "Anyone <APPTWO@hotmail.com>")],
            ..Metadata::default()
        })
        .unwrap();
    assert_eq!(by_email.results.len(), 2);

    let by_site_and_title = service
        .search_metadata(Metadata {
            title: "Valid App 3".to_string(),
            website: "https://UPBOUND.io".to_string(),
            ..Metadata::default()
        })
        .unwrap();
    assert_eq!(by_site_and_title.results.len(), 1);
    assert_eq!(by_site_and_title.results[0].title, "Valid App 3");
}

#[test]
fn malformed_search_filter_is_rejected() {
    let service = service();
    let err = service
        .search_metadata(Metadata {
            source: "://nowhere".to_string(),
            ..Metadata::default()
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(err.to_string(), "invalid fields: source");
}

#[test]
fn search_results_serialize_as_envelope() {
    let service = service();
    service.create_metadata(valid("Valid App 2")).unwrap();
    let results = service
        .search_metadata(Metadata {
            company: "Upbound Inc.".to_string(),
            ..Metadata::default()
        })
        .unwrap();

    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(json["results"][0]["title"], "Valid App 2");
    assert_eq!(json["results"][0]["maintainers"][0]["email"], "apptwo@hotmail.com");
}
