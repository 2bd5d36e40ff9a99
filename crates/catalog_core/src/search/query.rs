//! Predicate projection and index-intersection query engine.
//!
//! # Responsibility
//! - Map field names to indexes through an explicit enum.
//! - Evaluate one index lookup per predicate and intersect the results.
//! - Join maintainer emails to records through maintainer back-references.
//!
//! # Invariants
//! - Empty values are "don't care" and never become predicates.
//! - No predicates means no results, never "all records".
//! - Several emails combine by intersection, like every other predicate.
//! - Result order is unspecified.

use crate::model::metadata::Metadata;
use crate::repo::catalog_tables::{
    CatalogTables, MetadataRow, COMPANY_INDEX, DESCRIPTION_INDEX, EMAIL_INDEX, LICENSE_INDEX,
    SOURCE_INDEX, TITLE_INDEX, VERSION_INDEX, WEBSITE_INDEX,
};
use crate::repo::metadata_repo::{RepoError, RepoResult};
use crate::store::RowRef;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Field a search predicate can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryField {
    Title,
    Version,
    Company,
    Website,
    Source,
    License,
    Description,
    /// Maintainer email, resolved through the maintainers table.
    Email,
}

const QUERY_FIELDS: &[QueryField] = &[
    QueryField::Title,
    QueryField::Version,
    QueryField::Company,
    QueryField::Website,
    QueryField::Source,
    QueryField::License,
    QueryField::Description,
    QueryField::Email,
];

impl QueryField {
    /// Every searchable field.
    pub fn all() -> &'static [QueryField] {
        QUERY_FIELDS
    }

    /// Stable field name used by [`QueryParams::parse`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Version => "version",
            Self::Company => "company",
            Self::Website => "website",
            Self::Source => "source",
            Self::License => "license",
            Self::Description => "description",
            Self::Email => "email",
        }
    }

    /// Index consulted for this field. `Email` lives on the maintainers table.
    pub fn index_name(self) -> &'static str {
        match self {
            Self::Title => TITLE_INDEX,
            Self::Version => VERSION_INDEX,
            Self::Company => COMPANY_INDEX,
            Self::Website => WEBSITE_INDEX,
            Self::Source => SOURCE_INDEX,
            Self::License => LICENSE_INDEX,
            Self::Description => DESCRIPTION_INDEX,
            Self::Email => EMAIL_INDEX,
        }
    }

    /// Parses a field name, ignoring ASCII case and surrounding spaces.
    pub fn parse(value: &str) -> RepoResult<Self> {
        let normalized = value.trim();
        Self::all()
            .iter()
            .copied()
            .find(|field| field.as_str().eq_ignore_ascii_case(normalized))
            .ok_or_else(|| RepoError::InvalidQueryField(value.to_string()))
    }
}

impl Display for QueryField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of non-empty predicates combined with AND semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    fields: BTreeMap<QueryField, String>,
    emails: Vec<String>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects a filter template: one predicate per non-empty scalar field,
    /// plus the emails of all listed maintainers.
    pub fn from_filter(filter: &Metadata) -> Self {
        let scalars = [
            (QueryField::Title, &filter.title),
            (QueryField::Version, &filter.version),
            (QueryField::Company, &filter.company),
            (QueryField::Website, &filter.website),
            (QueryField::Source, &filter.source),
            (QueryField::License, &filter.license),
            (QueryField::Description, &filter.description),
        ];

        let params = scalars
            .into_iter()
            .fold(Self::new(), |params, (field, value)| {
                params.with(field, value.as_str())
            });
        filter
            .maintainers
            .iter()
            .fold(params, |params, maintainer| {
                params.with_email(maintainer.email.as_str())
            })
    }

    /// Builds predicates from name/value pairs.
    ///
    /// # Errors
    /// - `InvalidQueryField` for any name that is not a [`QueryField`].
    pub fn parse<I, K, V>(pairs: I) -> RepoResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        pairs.into_iter().try_fold(Self::new(), |params, (name, value)| {
            let field = QueryField::parse(name.as_ref())?;
            Ok(params.with(field, value.as_ref()))
        })
    }

    /// Adds an equality predicate; empty values are ignored.
    /// `Email` predicates accumulate instead of replacing each other.
    pub fn with(mut self, field: QueryField, value: &str) -> Self {
        if value.is_empty() {
            return self;
        }
        if field == QueryField::Email {
            self.emails.push(value.to_string());
        } else {
            self.fields.insert(field, value.to_string());
        }
        self
    }

    pub fn with_email(self, email: &str) -> Self {
        self.with(QueryField::Email, email)
    }

    pub fn get(&self, field: QueryField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn emails(&self) -> &[String] {
        &self.emails
    }

    /// Number of predicates; all emails together count as one.
    pub fn predicate_count(&self) -> usize {
        self.fields.len() + usize::from(!self.emails.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.predicate_count() == 0
    }
}

/// Evaluates `params` against one snapshot of the catalog tables.
pub fn run_query(
    tables: &CatalogTables,
    params: &QueryParams,
) -> RepoResult<Vec<Arc<MetadataRow>>> {
    let mut matched: Option<BTreeSet<RowRef>> = None;

    for (field, value) in &params.fields {
        let rows = tables.metadata.lookup(field.index_name(), value)?;
        matched = Some(intersect(matched, rows));
    }

    if !params.emails.is_empty() {
        let rows = metadata_refs_by_emails(tables, &params.emails)?;
        matched = Some(intersect(matched, rows));
    }

    matched
        .unwrap_or_default()
        .iter()
        .map(|row_ref| {
            tables.metadata.row(row_ref).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "maintainer back-reference `{row_ref}` has no metadata row"
                ))
            })
        })
        .collect()
}

/// Record ids reachable from every email. An unknown email matches nothing.
fn metadata_refs_by_emails(
    tables: &CatalogTables,
    emails: &[String],
) -> RepoResult<BTreeSet<RowRef>> {
    let mut matched: Option<BTreeSet<RowRef>> = None;

    for email in emails {
        let ids = match tables.maintainers.first(EMAIL_INDEX, email)? {
            Some(maintainer) => maintainer
                .metadata_ids
                .iter()
                .map(|id| RowRef::from(id.to_string()))
                .collect(),
            // Why: an unknown email is a valid filter that matches nothing.
            None => BTreeSet::new(),
        };
        matched = Some(intersect(matched, ids));
    }

    Ok(matched.unwrap_or_default())
}

fn intersect(acc: Option<BTreeSet<RowRef>>, next: BTreeSet<RowRef>) -> BTreeSet<RowRef> {
    match acc {
        None => next,
        Some(acc) => acc.intersection(&next).cloned().collect(),
    }
}
