//! Property introspection
//!
//! Wraps a record type's metadata and the storage model behind a small
//! surface. Primary-key questions fail loudly; relation questions degrade to
//! "no relations" when the model knows nothing about the type.

use serde::Serialize;
use tracing::warn;

use crate::error::{AdminError, Result};
use crate::schema::{
    Cardinality, DataModel, EntityModel, KeyDefinition, RecordType, RelationDefinition,
    ValueGeneration,
};
use crate::types::PropertyType;

/// Introspected view of one property
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(rename = "runtimeType")]
    pub runtime_type: PropertyType,
    #[serde(rename = "isPrimaryKey")]
    pub is_primary_key: bool,
    #[serde(rename = "isGeneratedKey")]
    pub is_generated_key: bool,
    #[serde(rename = "isRelation")]
    pub is_relation: bool,
    #[serde(rename = "relatedType", skip_serializing_if = "Option::is_none")]
    pub related_type: Option<String>,
}

/// Read-only view over a context's data model
#[derive(Debug, Clone, Copy)]
pub struct Introspector<'a> {
    model: &'a DataModel,
}

impl<'a> Introspector<'a> {
    pub fn new(model: &'a DataModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &'a DataModel {
        self.model
    }

    pub fn record_type(&self, name: &str) -> Result<&'a RecordType> {
        self.model
            .find_record_type(name)
            .ok_or_else(|| AdminError::entity_not_found(name))
    }

    fn entity(&self, record_type: &str) -> Result<&'a EntityModel> {
        self.model
            .find_entity(record_type)
            .ok_or_else(|| AdminError::entity_not_found(record_type))
    }

    /// Declared primary key of a record type
    ///
    /// Fails when the type is unknown to the storage model or declares no key.
    pub fn primary_key(&self, record_type: &str) -> Result<&'a KeyDefinition> {
        let entity = self.entity(record_type)?;
        entity.key.as_ref().ok_or_else(|| {
            AdminError::primary_key_not_found(format!(
                "Primary key for entity type {} not found",
                record_type
            ))
        })
    }

    pub fn is_primary_key(&self, record_type: &str, property: &str) -> Result<bool> {
        Ok(self.primary_key(record_type)?.property == property)
    }

    pub fn is_generated_primary_key(&self, record_type: &str, property: &str) -> Result<bool> {
        let key = self.primary_key(record_type)?;
        Ok(key.property == property && key.generation != ValueGeneration::Never)
    }

    /// Declared relations of a record type, empty when the model does not know it
    pub fn relations(&self, record_type: &str) -> &'a [RelationDefinition] {
        match self.model.find_entity(record_type) {
            Some(entity) => &entity.relations,
            None => {
                warn!(record_type, "Record type unknown to the storage model, assuming no relations");
                &[]
            }
        }
    }

    pub fn relation(&self, record_type: &str, property: &str) -> Option<&'a RelationDefinition> {
        self.relations(record_type).iter().find(|r| r.name == property)
    }

    /// Whether the storage model declares `property` as a relation
    ///
    /// A property holding a record shape that the model does not declare as a
    /// relation is a value object, not a relation.
    pub fn is_relation(&self, record_type: &str, property: &str) -> bool {
        self.relation(record_type, property).is_some()
    }

    /// Relations worth loading for list display: single references
    ///
    /// Collections are excluded since a list cell renders one related record.
    pub fn displayable_relations(&self, record_type: &str) -> Vec<&'a RelationDefinition> {
        self.relations(record_type)
            .iter()
            .filter(|r| r.cardinality == Cardinality::One)
            .collect()
    }

    /// Every property of a record type in declared order
    pub fn properties_of(&self, record_type: &RecordType) -> Result<Vec<PropertyDescriptor>> {
        let key = self.primary_key(&record_type.name)?;
        Ok(record_type
            .properties
            .iter()
            .map(|property| {
                let relation = self.relation(&record_type.name, &property.name);
                let is_primary_key = key.property == property.name;
                PropertyDescriptor {
                    name: property.name.clone(),
                    runtime_type: property.property_type.clone(),
                    is_primary_key,
                    is_generated_key: is_primary_key && key.generation != ValueGeneration::Never,
                    is_relation: relation.is_some(),
                    related_type: relation.map(|r| r.target.clone()),
                }
            })
            .collect())
    }

    /// Descriptor of a single property
    pub fn describe_property(
        &self,
        record_type: &RecordType,
        property: &str,
    ) -> Result<PropertyDescriptor> {
        self.properties_of(record_type)?
            .into_iter()
            .find(|p| p.name == property)
            .ok_or_else(|| {
                AdminError::validation(format!(
                    "Property '{}' not found on '{}'",
                    property, record_type.name
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertyDefinition;

    fn model() -> DataModel {
        DataModel::new()
            .record_type(
                RecordType::new("ParentEntity")
                    .property(PropertyDefinition::new("Id", PropertyType::uuid()))
                    .property(PropertyDefinition::new("Name", PropertyType::text()))
                    .property(PropertyDefinition::new("Job", PropertyType::record("JobEntity")))
                    .property(PropertyDefinition::new(
                        "FatheredChildren",
                        PropertyType::records("ChildEntity"),
                    ))
                    .property(PropertyDefinition::new("Address", PropertyType::record("Address"))),
            )
            .record_type(
                RecordType::new("JobEntity")
                    .property(PropertyDefinition::new("Id", PropertyType::integer())),
            )
            .record_type(
                RecordType::new("Keyless")
                    .property(PropertyDefinition::new("Name", PropertyType::text())),
            )
            .entity(
                EntityModel::new("ParentEntity")
                    .generated_key("Id")
                    .relation(RelationDefinition::reference("Job", "JobEntity").foreign_key("JobId"))
                    .relation(
                        RelationDefinition::collection("FatheredChildren", "ChildEntity")
                            .foreign_key("FatherId"),
                    ),
            )
            .entity(EntityModel::new("JobEntity").key("Id"))
            .entity(EntityModel::new("Keyless"))
    }

    // =========================================================================
    // Primary Key Tests
    // =========================================================================

    #[test]
    fn test_primary_key_lookup() {
        let model = model();
        let introspector = Introspector::new(&model);

        assert_eq!(introspector.primary_key("ParentEntity").unwrap().property, "Id");
        assert!(introspector.is_primary_key("ParentEntity", "Id").unwrap());
        assert!(!introspector.is_primary_key("ParentEntity", "Name").unwrap());
        assert!(introspector.is_generated_primary_key("ParentEntity", "Id").unwrap());
        assert!(!introspector.is_generated_primary_key("JobEntity", "Id").unwrap());
    }

    #[test]
    fn test_primary_key_fails_loudly() {
        let model = model();
        let introspector = Introspector::new(&model);

        assert!(matches!(
            introspector.primary_key("Unknown"),
            Err(AdminError::EntityNotFound(_))
        ));
        assert!(matches!(
            introspector.primary_key("Keyless"),
            Err(AdminError::PrimaryKeyNotFound(_))
        ));
    }

    // =========================================================================
    // Relation Tests
    // =========================================================================

    #[test]
    fn test_relation_is_declared_not_inferred() {
        let model = model();
        let introspector = Introspector::new(&model);

        assert!(introspector.is_relation("ParentEntity", "Job"));
        assert!(introspector.is_relation("ParentEntity", "FatheredChildren"));
        // record-shaped but undeclared: a value object
        assert!(!introspector.is_relation("ParentEntity", "Address"));
        assert!(!introspector.is_relation("ParentEntity", "Name"));
    }

    #[test]
    fn test_relations_degrade_for_unknown_type() {
        let model = model();
        let introspector = Introspector::new(&model);

        assert!(introspector.relations("Unknown").is_empty());
        assert!(!introspector.is_relation("Unknown", "Job"));
        assert!(introspector.displayable_relations("Unknown").is_empty());
    }

    #[test]
    fn test_displayable_relations_skip_collections() {
        let model = model();
        let introspector = Introspector::new(&model);

        let names: Vec<_> = introspector
            .displayable_relations("ParentEntity")
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["Job"]);
    }

    // =========================================================================
    // Descriptor Tests
    // =========================================================================

    #[test]
    fn test_properties_of() {
        let model = model();
        let introspector = Introspector::new(&model);
        let record_type = model.find_record_type("ParentEntity").unwrap();

        let descriptors = introspector.properties_of(record_type).unwrap();
        assert_eq!(descriptors.len(), 5);

        let id = &descriptors[0];
        assert!(id.is_primary_key && id.is_generated_key && !id.is_relation);

        let job = &descriptors[2];
        assert!(job.is_relation);
        assert_eq!(job.related_type.as_deref(), Some("JobEntity"));

        let address = &descriptors[4];
        assert!(!address.is_relation);
        assert!(address.related_type.is_none());
    }

    #[test]
    fn test_properties_of_requires_key() {
        let model = model();
        let introspector = Introspector::new(&model);
        let record_type = model.find_record_type("Keyless").unwrap();

        assert!(introspector.properties_of(record_type).is_err());
    }

    #[test]
    fn test_describe_property() {
        let model = model();
        let introspector = Introspector::new(&model);
        let record_type = model.find_record_type("ParentEntity").unwrap();

        let name = introspector.describe_property(record_type, "Name").unwrap();
        assert_eq!(name.runtime_type, PropertyType::text());
        assert!(introspector.describe_property(record_type, "Missing").is_err());
    }
}
