//! In-process query provider
//!
//! Evaluates predicates and orderings directly over stored records. Joined
//! and split include modes produce the same result here; the mode only
//! changes execution shape on real stores.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::provider::{Include, QueryProvider, RecordQuery};
use crate::schema::RecordType;
use crate::sort::apply_ordering;
use crate::value::{Record, Value};

/// Records grouped by record type name, in insertion order
#[derive(Debug, Default)]
pub struct MemoryProvider {
    records: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record after validating it against its type
    pub async fn insert(&self, record_type: &RecordType, record: Record) -> Result<()> {
        record_type.validate(&record)?;
        self.records
            .write()
            .await
            .entry(record_type.name.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    pub async fn insert_all<I>(&self, record_type: &RecordType, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Record>,
    {
        for record in records {
            self.insert(record_type, record).await?;
        }
        Ok(())
    }

    /// Number of stored records of a type
    pub async fn len(&self, record_type: &str) -> usize {
        self.records
            .read()
            .await
            .get(record_type)
            .map_or(0, Vec::len)
    }

    pub async fn is_empty(&self, record_type: &str) -> bool {
        self.len(record_type).await == 0
    }

    fn matching(store: &HashMap<String, Vec<Record>>, query: &RecordQuery<'_>) -> Vec<Record> {
        store
            .get(&query.record_type.name)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| query.predicate.evaluate(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn attach(store: &HashMap<String, Vec<Record>>, include: &Include<'_>, record: &mut Record) {
        let key = record.get(include.foreign_key);
        let related = if key.is_null() {
            None
        } else {
            store.get(&include.target_type.name).and_then(|targets| {
                targets
                    .iter()
                    .find(|t| t.get(include.target_key) == key)
                    .cloned()
            })
        };
        let value = related.map_or(Value::Null, Value::from);
        record.set(include.relation.name.clone(), value);
    }
}

#[async_trait]
impl QueryProvider for MemoryProvider {
    async fn count(&self, query: &RecordQuery<'_>) -> Result<u64> {
        let store = self.records.read().await;
        Ok(Self::matching(&store, query).len() as u64)
    }

    async fn fetch(&self, query: &RecordQuery<'_>) -> Result<Vec<Record>> {
        let store = self.records.read().await;

        let mut records = Self::matching(&store, query);
        apply_ordering(&query.ordering, &mut records);

        let mut records: Vec<Record> = match query.window {
            Some(window) => records
                .into_iter()
                .skip(usize::try_from(window.skip).unwrap_or(usize::MAX))
                .take(usize::try_from(window.take).unwrap_or(usize::MAX))
                .collect(),
            None => records,
        };

        for record in &mut records {
            for include in &query.includes {
                Self::attach(&store, include, record);
            }
        }

        debug!(
            record_type = %query.record_type.name,
            fetched = records.len(),
            includes = query.includes.len(),
            "Fetched records from memory"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterOperator, FilterSpec, Predicate};
    use crate::provider::Window;
    use crate::schema::{EntityModel, RelationDefinition};
    use crate::sort::{SortKey, SortSpec};
    use crate::types::{PropertyDefinition, PropertyType};

    fn job_type() -> RecordType {
        RecordType::new("JobEntity")
            .property(PropertyDefinition::new("Id", PropertyType::integer()).not_null())
            .property(PropertyDefinition::new("Name", PropertyType::text()))
    }

    fn parent_type() -> RecordType {
        RecordType::new("ParentEntity")
            .property(PropertyDefinition::new("Id", PropertyType::integer()).not_null())
            .property(PropertyDefinition::new("Name", PropertyType::text()))
            .property(PropertyDefinition::new("JobId", PropertyType::integer()))
            .property(PropertyDefinition::new("Job", PropertyType::record("JobEntity")))
    }

    async fn seeded() -> MemoryProvider {
        let provider = MemoryProvider::new();
        provider
            .insert(&job_type(), Record::new("JobEntity").with("Id", 1_i64).with("Name", "Dev"))
            .await
            .unwrap();
        for (id, name, job) in [(1_i64, "Ada", Some(1_i64)), (2, "Bob", None), (3, "Cy", Some(9))] {
            let mut record = Record::new("ParentEntity").with("Id", id).with("Name", name);
            if let Some(job) = job {
                record.set("JobId", job);
            }
            provider.insert(&parent_type(), record).await.unwrap();
        }
        provider
    }

    #[tokio::test]
    async fn test_insert_validates() {
        let provider = MemoryProvider::new();
        let result = provider
            .insert(&job_type(), Record::new("JobEntity").with("Name", "No id"))
            .await;
        assert!(result.is_err());
        assert!(provider.is_empty("JobEntity").await);
    }

    #[tokio::test]
    async fn test_count_ignores_window() {
        let provider = seeded().await;
        let parent = parent_type();
        let entity = EntityModel::new("ParentEntity").key("Id");

        let mut query = RecordQuery::new(&parent, &entity);
        query.window = Some(Window { skip: 0, take: 1 });

        assert_eq!(provider.count(&query).await.unwrap(), 3);
        assert_eq!(provider.fetch(&query).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_filter_sort_window() {
        let provider = seeded().await;
        let parent = parent_type();
        let entity = EntityModel::new("ParentEntity").key("Id");

        let mut query = RecordQuery::new(&parent, &entity);
        query.predicate = Predicate::build_all(
            &parent,
            &[FilterSpec::new("Name", FilterOperator::DoesNotContain, "o")],
        );
        query.ordering = SortKey::build_all(&parent, &[SortSpec::descending("Name")]);
        query.window = Some(Window { skip: 1, take: 5 });

        let records = provider.fetch(&query).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("Name"), &Value::Text("Ada".into()));
        assert_eq!(provider.count(&query).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_includes_attach_related_records() {
        let provider = seeded().await;
        let parent = parent_type();
        let job = job_type();
        let job_entity = EntityModel::new("JobEntity").key("Id");
        let relation = RelationDefinition::reference("Job", "JobEntity").foreign_key("JobId");
        let entity = EntityModel::new("ParentEntity")
            .key("Id")
            .relation(relation.clone());

        let mut query = RecordQuery::new(&parent, &entity);
        query.includes.push(Include {
            relation: &relation,
            foreign_key: "JobId",
            target_type: &job,
            target_entity: &job_entity,
            target_key: "Id",
        });
        query.ordering = SortKey::build_all(&parent, &[SortSpec::ascending("Id")]);

        let records = provider.fetch(&query).await.unwrap();
        let related = records[0].get("Job").as_record().unwrap();
        assert_eq!(related.get("Name"), &Value::Text("Dev".into()));
        // no key, and a dangling key
        assert!(records[1].get("Job").is_null());
        assert!(records[2].get("Job").is_null());
    }

    #[tokio::test]
    async fn test_unknown_type_is_empty() {
        let provider = MemoryProvider::new();
        let parent = parent_type();
        let entity = EntityModel::new("ParentEntity").key("Id");
        let query = RecordQuery::new(&parent, &entity);

        assert_eq!(provider.count(&query).await.unwrap(), 0);
        assert!(provider.fetch(&query).await.unwrap().is_empty());
    }
}
