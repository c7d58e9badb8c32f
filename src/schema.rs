//! Schema-related types
//!
//! Includes RecordType (the runtime shape of a record), the storage model
//! (EntityModel, KeyDefinition, RelationDefinition, DataModel) and the
//! context/set definitions discovered at startup.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AdminError, Result};
use crate::types::PropertyDefinition;
use crate::value::Record;

/// Record-to-text conversion
pub type Describer = Arc<dyn Fn(&Record) -> String + Send + Sync>;

/// Runtime shape of a record type
#[derive(Clone, Serialize, Deserialize)]
pub struct RecordType {
    /// Type name, unique within a data model
    pub name: String,
    /// Properties in declared order
    pub properties: Vec<PropertyDefinition>,
    /// The type's own text conversion; `Record`'s `Display` when absent
    #[serde(skip)]
    describer: Option<Describer>,
}

impl RecordType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            describer: None,
        }
    }

    /// Append a property
    pub fn property(mut self, property: PropertyDefinition) -> Self {
        self.properties.push(property);
        self
    }

    /// Set the type's own text conversion
    pub fn describe_with<F>(mut self, describer: F) -> Self
    where
        F: Fn(&Record) -> String + Send + Sync + 'static,
    {
        self.describer = Some(Arc::new(describer));
        self
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Describe a record of this type as text
    pub fn describe(&self, record: &Record) -> String {
        match &self.describer {
            Some(describer) => describer(record),
            None => record.to_string(),
        }
    }

    /// Validate a record against the declared properties
    pub fn validate(&self, record: &Record) -> Result<()> {
        if record.record_type != self.name {
            return Err(AdminError::validation(format!(
                "Record of type '{}' cannot be stored as '{}'",
                record.record_type, self.name
            )));
        }
        for name in record.fields.keys() {
            if self.find_property(name).is_none() {
                return Err(AdminError::validation(format!(
                    "Unknown property '{}' on '{}'",
                    name, self.name
                )));
            }
        }
        for property in &self.properties {
            let value = record.get(&property.name);
            if let Err(e) = property.property_type.validate_value(value) {
                return Err(AdminError::validation(format!(
                    "Invalid value for property '{}': {}",
                    property.name, e
                )));
            }
            if !property.nullable
                && value.is_null()
                && property.property_type.referenced_type().is_none()
            {
                return Err(AdminError::validation(format!(
                    "Property '{}' does not allow null values",
                    property.name
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .field("describer", &self.describer.is_some())
            .finish()
    }
}

// ============================================================================
// Storage model
// ============================================================================

/// How the store produces key values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueGeneration {
    /// The caller supplies the key
    #[default]
    Never,
    /// The store generates the key when a record is added
    OnAdd,
}

/// Declared primary key of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDefinition {
    pub property: String,
    #[serde(default)]
    pub generation: ValueGeneration,
}

/// Relation multiplicity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    /// Zero-or-one related record
    One,
    /// Zero-or-many related records
    Many,
}

/// A declared reference from one record type to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    /// Name of the navigation property on the declaring type
    pub name: String,
    /// Related record type
    pub target: String,
    pub cardinality: Cardinality,
    /// For `One`: property on the declaring type holding the target's key.
    /// For `Many`: property on the target holding the declaring type's key.
    #[serde(rename = "foreignKey", skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
}

impl RelationDefinition {
    /// A zero-or-one reference
    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            cardinality: Cardinality::One,
            foreign_key: None,
        }
    }

    /// A zero-or-many collection
    pub fn collection(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            cardinality: Cardinality::Many,
            foreign_key: None,
        }
    }

    pub fn foreign_key(mut self, property: impl Into<String>) -> Self {
        self.foreign_key = Some(property.into());
        self
    }
}

/// Storage-model metadata for one record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityModel {
    #[serde(rename = "recordType")]
    pub record_type: String,
    /// Backing table (defaults to the record type name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<KeyDefinition>,
    #[serde(default)]
    pub relations: Vec<RelationDefinition>,
}

impl EntityModel {
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            table: None,
            key: None,
            relations: Vec::new(),
        }
    }

    /// Declare a caller-supplied primary key
    pub fn key(mut self, property: impl Into<String>) -> Self {
        self.key = Some(KeyDefinition {
            property: property.into(),
            generation: ValueGeneration::Never,
        });
        self
    }

    /// Declare a store-generated primary key
    pub fn generated_key(mut self, property: impl Into<String>) -> Self {
        self.key = Some(KeyDefinition {
            property: property.into(),
            generation: ValueGeneration::OnAdd,
        });
        self
    }

    pub fn relation(mut self, relation: RelationDefinition) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.record_type)
    }

    pub fn find_relation(&self, name: &str) -> Option<&RelationDefinition> {
        self.relations.iter().find(|r| r.name == name)
    }
}

/// Record types plus the storage model that maps them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataModel {
    #[serde(rename = "recordTypes")]
    pub record_types: BTreeMap<String, RecordType>,
    pub entities: BTreeMap<String, EntityModel>,
}

impl DataModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_type(mut self, record_type: RecordType) -> Self {
        self.record_types
            .insert(record_type.name.clone(), record_type);
        self
    }

    pub fn entity(mut self, entity: EntityModel) -> Self {
        self.entities.insert(entity.record_type.clone(), entity);
        self
    }

    pub fn find_record_type(&self, name: &str) -> Option<&RecordType> {
        self.record_types.get(name)
    }

    pub fn find_entity(&self, name: &str) -> Option<&EntityModel> {
        self.entities.get(name)
    }
}

// ============================================================================
// Contexts and sets
// ============================================================================

/// A named, typed collection of records within a context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDefinition {
    /// Member name on the context, e.g. `Parents`
    pub name: String,
    /// Record type of the set, e.g. `ParentEntity`
    #[serde(rename = "recordType")]
    pub record_type: String,
}

/// A named grouping of sets sharing one data model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextDefinition {
    /// Context type name, e.g. `DemoDbContext`
    pub name: String,
    pub sets: Vec<SetDefinition>,
    pub model: DataModel,
}

impl ContextDefinition {
    pub fn new(name: impl Into<String>, model: DataModel) -> Self {
        Self {
            name: name.into(),
            sets: Vec::new(),
            model,
        }
    }

    /// Add a set
    pub fn set(mut self, name: impl Into<String>, record_type: impl Into<String>) -> Self {
        self.sets.push(SetDefinition {
            name: name.into(),
            record_type: record_type.into(),
        });
        self
    }

    pub fn find_set(&self, name: &str) -> Option<&SetDefinition> {
        self.sets.iter().find(|s| s.name == name)
    }

    /// First set whose record type is `record_type`
    pub fn set_for_type(&self, record_type: &str) -> Option<&SetDefinition> {
        self.sets.iter().find(|s| s.record_type == record_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertyType;
    use crate::value::Value;

    fn job_type() -> RecordType {
        RecordType::new("JobEntity")
            .property(PropertyDefinition::new("Id", PropertyType::integer()).not_null())
            .property(PropertyDefinition::new("Name", PropertyType::text()))
            .property(PropertyDefinition::new("Salary", PropertyType::integer()))
    }

    #[test]
    fn test_describe_falls_back_to_display() {
        let record = Record::new("JobEntity").with("Name", "Dev");
        assert_eq!(job_type().describe(&record), r#"JobEntity { Name: "Dev" }"#);
    }

    #[test]
    fn test_describe_with_custom_describer() {
        let record_type = job_type().describe_with(|r| {
            format!(
                "{} ({})",
                r.get("Name").as_text().unwrap_or_default(),
                r.get("Salary")
            )
        });
        let record = Record::new("JobEntity")
            .with("Name", "Dev")
            .with("Salary", 100_i64);

        assert_eq!(record_type.describe(&record), "Dev (100)");
    }

    #[test]
    fn test_validate_record() {
        let record_type = job_type();

        let ok = Record::new("JobEntity").with("Id", 1_i64).with("Name", "Dev");
        assert!(record_type.validate(&ok).is_ok());

        let missing_id = Record::new("JobEntity").with("Name", "Dev");
        assert!(record_type.validate(&missing_id).is_err());

        let wrong_type = Record::new("JobEntity")
            .with("Id", 1_i64)
            .with("Salary", "lots");
        assert!(record_type.validate(&wrong_type).is_err());

        let unknown = Record::new("JobEntity")
            .with("Id", 1_i64)
            .with("Bonus", Value::Integer(5));
        assert!(record_type.validate(&unknown).is_err());

        let other_type = Record::new("Person").with("Id", 1_i64);
        assert!(record_type.validate(&other_type).is_err());
    }

    #[test]
    fn test_entity_model_builder() {
        let entity = EntityModel::new("ChildEntity")
            .generated_key("Id")
            .relation(RelationDefinition::reference("Father", "ParentEntity").foreign_key("FatherId"))
            .table("children");

        assert_eq!(entity.table_name(), "children");
        let key = entity.key.as_ref().unwrap();
        assert_eq!(key.property, "Id");
        assert_eq!(key.generation, ValueGeneration::OnAdd);
        let father = entity.find_relation("Father").unwrap();
        assert_eq!(father.cardinality, Cardinality::One);
        assert_eq!(father.foreign_key.as_deref(), Some("FatherId"));
        assert!(entity.find_relation("Mother").is_none());
    }

    #[test]
    fn test_table_name_defaults_to_type() {
        assert_eq!(EntityModel::new("JobEntity").table_name(), "JobEntity");
    }

    #[test]
    fn test_context_definition_lookup() {
        let model = DataModel::new()
            .record_type(job_type())
            .entity(EntityModel::new("JobEntity").key("Id"));
        let context = ContextDefinition::new("DemoDbContext", model).set("Jobs", "JobEntity");

        assert_eq!(context.find_set("Jobs").unwrap().record_type, "JobEntity");
        assert_eq!(context.set_for_type("JobEntity").unwrap().name, "Jobs");
        assert!(context.find_set("Parents").is_none());
        assert!(context.model.find_record_type("JobEntity").is_some());
    }

    #[test]
    fn test_entity_model_serialization() {
        let entity = EntityModel::new("JobEntity").generated_key("Id");
        let json = serde_json::to_string(&entity).unwrap();
        assert!(json.contains("\"recordType\":\"JobEntity\""));
        assert!(json.contains("\"generation\":\"onAdd\""));
        assert!(!json.contains("\"table\""));
    }
}
