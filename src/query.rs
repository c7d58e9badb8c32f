//! Query composition
//!
//! Turns a list request (filters, sorts, page) against one set into a
//! [`RecordQuery`], runs it through a [`QueryProvider`] and returns a page of
//! records plus the total number of matches.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AdminError, Result};
use crate::filter::{Comparison, FilterSpec, Predicate};
use crate::introspect::Introspector;
use crate::provider::{Include, IncludeMode, QueryProvider, RecordQuery, Window};
use crate::schema::{ContextDefinition, SetDefinition};
use crate::sort::{SortKey, SortSpec};
use crate::value::Record;

/// Requested page; a non-positive field disables pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpec {
    pub page_number: i64,
    pub page_size: i64,
}

impl PageSpec {
    pub fn new(page_number: i64, page_size: i64) -> Self {
        Self {
            page_number,
            page_size,
        }
    }

    /// Every matching record in one page
    pub fn unpaginated() -> Self {
        Self::new(0, 0)
    }

    /// Skip/take for this page, `None` when pagination is disabled
    pub fn window(&self) -> Option<Window> {
        if self.page_number <= 0 || self.page_size <= 0 {
            return None;
        }
        let take = self.page_size as u64;
        let skip = (self.page_number as u64 - 1).saturating_mul(take);
        Some(Window { skip, take })
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// Wire form of a list request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub sorts: Vec<SortSpec>,
    #[serde(default)]
    pub page: PageSpec,
}

/// One page of records
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub records: Vec<Record>,
    /// Matches before pagination
    pub total_count: u64,
    pub page_number: i64,
}

/// Composes and executes list queries for the sets of one context
pub struct QueryComposer<'a> {
    context: &'a ContextDefinition,
    provider: &'a dyn QueryProvider,
    include_mode: IncludeMode,
}

impl<'a> QueryComposer<'a> {
    pub fn new(context: &'a ContextDefinition, provider: &'a dyn QueryProvider) -> Self {
        Self {
            context,
            provider,
            include_mode: IncludeMode::Joined,
        }
    }

    /// Load related records with separate round-trips
    pub fn split_queries(mut self, split: bool) -> Self {
        self.include_mode = if split {
            IncludeMode::Split
        } else {
            IncludeMode::Joined
        };
        self
    }

    fn introspector(&self) -> Introspector<'a> {
        Introspector::new(&self.context.model)
    }

    fn set(&self, set_name: &str) -> Result<&'a SetDefinition> {
        self.context.find_set(set_name).ok_or_else(|| {
            AdminError::set_not_found(format!("{}/{}", self.context.name, set_name))
        })
    }

    /// Base query for a set: its type, storage metadata and displayable includes
    fn base_query(&self, set: &SetDefinition) -> Result<RecordQuery<'a>> {
        let introspector = self.introspector();
        let model = introspector.model();
        let record_type = introspector.record_type(&set.record_type)?;
        let entity = model
            .find_entity(&set.record_type)
            .ok_or_else(|| AdminError::entity_not_found(&set.record_type))?;

        let mut query = RecordQuery::new(record_type, entity);
        query.include_mode = self.include_mode;

        for relation in introspector.displayable_relations(&set.record_type) {
            let target = model
                .find_record_type(&relation.target)
                .zip(model.find_entity(&relation.target));
            let target_key = model
                .find_entity(&relation.target)
                .and_then(|e| e.key.as_ref());

            match (relation.foreign_key.as_deref(), target, target_key) {
                (Some(foreign_key), Some((target_type, target_entity)), Some(key)) => {
                    query.includes.push(Include {
                        relation,
                        foreign_key,
                        target_type,
                        target_entity,
                        target_key: &key.property,
                    });
                }
                _ => warn!(
                    record_type = %set.record_type,
                    relation = %relation.name,
                    "Include skipped: relation target metadata incomplete"
                ),
            }
        }

        Ok(query)
    }

    /// One page of a set, filtered then sorted
    pub async fn page(
        &self,
        set_name: &str,
        filters: &[FilterSpec],
        sorts: &[SortSpec],
        page: PageSpec,
    ) -> Result<Page> {
        let set = self.set(set_name)?;
        let mut query = self.base_query(set)?;

        query.predicate = Predicate::build_all(query.record_type, filters);
        query.ordering = SortKey::build_all(query.record_type, sorts);

        let total_count = self.provider.count(&query).await?;

        query.window = page.window();
        debug!(
            context = %self.context.name,
            set = %set.name,
            predicates = query.predicate.leaf_count(),
            sort_keys = query.ordering.len(),
            window = ?query.window,
            include_mode = ?query.include_mode,
            "Composed page query"
        );
        let records = self.provider.fetch(&query).await?;

        debug!(
            set = %set.name,
            total_count,
            returned = records.len(),
            "Page fetched"
        );
        Ok(Page {
            records,
            total_count,
            page_number: page.page_number,
        })
    }

    /// `page` driven by a wire request
    pub async fn page_request(&self, set_name: &str, request: &PageRequest) -> Result<Page> {
        self.page(set_name, &request.filters, &request.sorts, request.page)
            .await
    }

    /// Load one record by its primary key literal
    ///
    /// Fails when the set's type has no declared key or the literal does not
    /// parse as the key's type.
    pub async fn find(&self, set_name: &str, key_literal: &str) -> Result<Option<Record>> {
        let set = self.set(set_name)?;
        let introspector = self.introspector();
        let key = introspector.primary_key(&set.record_type)?;

        let mut query = self.base_query(set)?;
        let key_property = query
            .record_type
            .find_property(&key.property)
            .ok_or_else(|| {
                AdminError::primary_key_not_found(format!(
                    "Key property '{}' is not declared on '{}'",
                    key.property, set.record_type
                ))
            })?;
        let value = key_property
            .property_type
            .parse_literal(key_literal)
            .ok_or_else(|| {
                AdminError::validation(format!(
                    "'{}' is not a valid key for '{}'",
                    key_literal, set.record_type
                ))
            })?;

        query.predicate = Predicate::Compare {
            property: key.property.clone(),
            property_type: key_property.property_type.clone(),
            comparison: Comparison::Equal,
            value,
        };
        query.window = Some(Window { skip: 0, take: 1 });

        Ok(self.provider.fetch(&query).await?.into_iter().next())
    }
}
