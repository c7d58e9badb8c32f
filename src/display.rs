//! Per-set display configuration
//!
//! A [`DisplayConfig`] is filled in once by the configuration builders and is
//! read-only afterwards. Overrides are keyed by [`PropertyKey`], a
//! (record type, property name) pair computed when the override is
//! registered.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AdminError, Result};
use crate::schema::{Describer, RecordType};
use crate::types::PropertyType;
use crate::value::Record;

/// Stable identity of a property within a data model
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyKey {
    pub record_type: String,
    pub property: String,
}

impl PropertyKey {
    pub fn new(record_type: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            property: property.into(),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.record_type, self.property)
    }
}

/// What a custom component promises to handle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ComponentContract {
    /// Displays a single value of the given type
    PropertyDisplay { property_type: PropertyType },
    /// Edits properties of records of the given type
    PropertyEdit { record_type: String },
    /// Displays whole records of the given type
    EntityDisplay { record_type: String },
}

/// Reference to a host-supplied rendering component
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentRef {
    pub name: String,
    pub contract: ComponentContract,
}

impl ComponentRef {
    pub fn property_display(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            contract: ComponentContract::PropertyDisplay { property_type },
        }
    }

    pub fn property_editor(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contract: ComponentContract::PropertyEdit {
                record_type: record_type.into(),
            },
        }
    }

    pub fn entity_display(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contract: ComponentContract::EntityDisplay {
                record_type: record_type.into(),
            },
        }
    }

    /// Check the component can display `property` of `record_type`
    pub fn check_property_display(&self, record_type: &RecordType, property: &str) -> Result<()> {
        let definition = find_property(record_type, property)?;
        match &self.contract {
            ComponentContract::PropertyDisplay { property_type }
                if *property_type == definition.property_type =>
            {
                Ok(())
            }
            _ => Err(self.mismatch(&format!(
                "a display component for {:?}",
                definition.property_type
            ))),
        }
    }

    /// Check the component can edit properties of `record_type`
    pub fn check_property_edit(&self, record_type: &RecordType, property: &str) -> Result<()> {
        find_property(record_type, property)?;
        match &self.contract {
            ComponentContract::PropertyEdit { record_type: t } if *t == record_type.name => Ok(()),
            _ => Err(self.mismatch(&format!("an edit component for {}", record_type.name))),
        }
    }

    /// Check the component can display whole records of `record_type`
    pub fn check_entity_display(&self, record_type: &RecordType) -> Result<()> {
        match &self.contract {
            ComponentContract::EntityDisplay { record_type: t } if *t == record_type.name => Ok(()),
            _ => Err(self.mismatch(&format!(
                "an entity display component for {}",
                record_type.name
            ))),
        }
    }

    fn mismatch(&self, expected: &str) -> AdminError {
        AdminError::configuration(format!(
            "Component '{}' ({:?}) is not {}",
            self.name, self.contract, expected
        ))
    }
}

fn find_property<'r>(
    record_type: &'r RecordType,
    property: &str,
) -> Result<&'r crate::types::PropertyDefinition> {
    record_type.find_property(property).ok_or_else(|| {
        AdminError::configuration(format!(
            "Property '{}' not found on '{}'",
            property, record_type.name
        ))
    })
}

/// How whole records of a type render
#[derive(Clone)]
pub enum EntityDisplay {
    /// A custom component; any string display is unused
    Component(ComponentRef),
    /// A configured record-to-text function
    Text(Describer),
    /// The record type's own text conversion
    Default,
}

impl EntityDisplay {
    /// Text form of a record, `None` when a component renders it
    pub fn describe(&self, record_type: &RecordType, record: &Record) -> Option<String> {
        match self {
            EntityDisplay::Component(_) => None,
            EntityDisplay::Text(describer) => Some(describer(record)),
            EntityDisplay::Default => Some(record_type.describe(record)),
        }
    }
}

impl fmt::Debug for EntityDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityDisplay::Component(c) => f.debug_tuple("Component").field(c).finish(),
            EntityDisplay::Text(_) => write!(f, "Text(..)"),
            EntityDisplay::Default => write!(f, "Default"),
        }
    }
}

impl PartialEq for EntityDisplay {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EntityDisplay::Component(a), EntityDisplay::Component(b)) => a == b,
            (EntityDisplay::Text(a), EntityDisplay::Text(b)) => Arc::ptr_eq(a, b),
            (EntityDisplay::Default, EntityDisplay::Default) => true,
            _ => false,
        }
    }
}

/// Display configuration for the records of one type
#[derive(Clone)]
pub struct DisplayConfig {
    record_type: String,
    title: Option<String>,
    string_display: Option<Describer>,
    entity_component: Option<ComponentRef>,
    hidden: Vec<String>,
    display_overrides: Vec<(PropertyKey, ComponentRef)>,
    edit_overrides: Vec<(PropertyKey, ComponentRef)>,
}

impl DisplayConfig {
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            title: None,
            string_display: None,
            entity_component: None,
            hidden: Vec::new(),
            display_overrides: Vec::new(),
            edit_overrides: Vec::new(),
        }
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn hidden(&self) -> &[String] {
        &self.hidden
    }

    pub fn is_hidden(&self, property: &str) -> bool {
        self.hidden.iter().any(|h| h == property)
    }

    pub fn display_override(&self, property: &str) -> Option<&ComponentRef> {
        Self::find_override(&self.display_overrides, property)
    }

    pub fn edit_override(&self, property: &str) -> Option<&ComponentRef> {
        Self::find_override(&self.edit_overrides, property)
    }

    fn find_override<'c>(
        overrides: &'c [(PropertyKey, ComponentRef)],
        property: &str,
    ) -> Option<&'c ComponentRef> {
        overrides
            .iter()
            .find(|(key, _)| key.property == property)
            .map(|(_, component)| component)
    }

    /// Whole-record display; a component beats a string display
    pub fn entity_display(&self) -> EntityDisplay {
        if let Some(component) = &self.entity_component {
            return EntityDisplay::Component(component.clone());
        }
        if let Some(describer) = &self.string_display {
            return EntityDisplay::Text(describer.clone());
        }
        EntityDisplay::Default
    }

    // Mutation is limited to the configuration builders.

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = Some(title);
    }

    pub(crate) fn set_string_display(&mut self, describer: Describer) {
        self.string_display = Some(describer);
    }

    pub(crate) fn set_entity_component(&mut self, component: ComponentRef) {
        self.entity_component = Some(component);
    }

    pub(crate) fn hide(&mut self, property: &str) {
        if !self.is_hidden(property) {
            self.hidden.push(property.to_string());
        }
    }

    /// Register a display override; the first registration for a property wins
    pub(crate) fn add_display_override(&mut self, property: &str, component: ComponentRef) -> bool {
        if self.display_override(property).is_some() {
            return false;
        }
        self.display_overrides
            .push((PropertyKey::new(&self.record_type, property), component));
        true
    }

    /// Register an edit override; the first registration for a property wins
    pub(crate) fn add_edit_override(&mut self, property: &str, component: ComponentRef) -> bool {
        if self.edit_override(property).is_some() {
            return false;
        }
        self.edit_overrides
            .push((PropertyKey::new(&self.record_type, property), component));
        true
    }
}

impl fmt::Debug for DisplayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayConfig")
            .field("record_type", &self.record_type)
            .field("title", &self.title)
            .field("string_display", &self.string_display.is_some())
            .field("entity_component", &self.entity_component)
            .field("hidden", &self.hidden)
            .field("display_overrides", &self.display_overrides)
            .field("edit_overrides", &self.edit_overrides)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertyDefinition;

    fn job_type() -> RecordType {
        RecordType::new("JobEntity")
            .property(PropertyDefinition::new("Id", PropertyType::integer()))
            .property(PropertyDefinition::new("Name", PropertyType::text()))
            .property(PropertyDefinition::new("Salary", PropertyType::integer()))
    }

    // =========================================================================
    // Contract Tests
    // =========================================================================

    #[test]
    fn test_property_display_contract() {
        let t = job_type();
        let money = ComponentRef::property_display("MoneyDisplay", PropertyType::integer());

        assert!(money.check_property_display(&t, "Salary").is_ok());
        assert!(matches!(
            money.check_property_display(&t, "Name"),
            Err(AdminError::Configuration(_))
        ));
        assert!(money.check_property_display(&t, "Missing").is_err());
    }

    #[test]
    fn test_property_edit_contract() {
        let t = job_type();
        let editor = ComponentRef::property_editor("SalarySlider", "JobEntity");
        let other = ComponentRef::property_editor("ChildEditor", "ChildEntity");

        assert!(editor.check_property_edit(&t, "Salary").is_ok());
        assert!(other.check_property_edit(&t, "Salary").is_err());
        assert!(editor.check_entity_display(&t).is_err());
    }

    #[test]
    fn test_entity_display_contract() {
        let t = job_type();
        assert!(ComponentRef::entity_display("JobCard", "JobEntity")
            .check_entity_display(&t)
            .is_ok());
        assert!(ComponentRef::entity_display("JobCard", "ParentEntity")
            .check_entity_display(&t)
            .is_err());
    }

    // =========================================================================
    // Override Tests
    // =========================================================================

    #[test]
    fn test_first_override_wins() {
        let mut config = DisplayConfig::new("JobEntity");
        let first = ComponentRef::property_display("First", PropertyType::integer());
        let second = ComponentRef::property_display("Second", PropertyType::integer());

        assert!(config.add_display_override("Salary", first.clone()));
        assert!(!config.add_display_override("Salary", second));
        assert_eq!(config.display_override("Salary"), Some(&first));
        assert!(config.edit_override("Salary").is_none());
    }

    #[test]
    fn test_hidden_is_deduplicated() {
        let mut config = DisplayConfig::new("JobEntity");
        config.hide("Salary");
        config.hide("Salary");
        assert_eq!(config.hidden(), &["Salary".to_string()]);
        assert!(config.is_hidden("Salary"));
        assert!(!config.is_hidden("Name"));
    }

    // =========================================================================
    // Entity Display Tests
    // =========================================================================

    #[test]
    fn test_entity_display_precedence() {
        let t = job_type();
        let record = Record::new("JobEntity").with("Name", "Dev").with("Salary", 10_i64);
        let mut config = DisplayConfig::new("JobEntity");

        assert_eq!(config.entity_display(), EntityDisplay::Default);
        assert_eq!(
            config.entity_display().describe(&t, &record).unwrap(),
            record.to_string()
        );

        config.set_string_display(Arc::new(|r: &Record| {
            format!("{} ({})", r.get("Name").as_text().unwrap_or_default(), r.get("Salary"))
        }));
        assert_eq!(
            config.entity_display().describe(&t, &record).as_deref(),
            Some("Dev (10)")
        );

        let card = ComponentRef::entity_display("JobCard", "JobEntity");
        config.set_entity_component(card.clone());
        assert_eq!(config.entity_display(), EntityDisplay::Component(card));
        assert!(config.entity_display().describe(&t, &record).is_none());
    }

    #[test]
    fn test_property_key_display() {
        assert_eq!(PropertyKey::new("JobEntity", "Salary").to_string(), "JobEntity.Salary");
    }
}
