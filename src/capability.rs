//! Capability resolution
//!
//! Decides, per property and surface, which rendering capability applies.
//! Precedence, most specific first:
//!
//! 1. hidden
//! 2. explicit per-property override (display or edit component)
//! 3. primary key exclusion on create/edit surfaces
//! 4. enumeration editor
//! 5. relation viewer/picker (declared relations only)
//! 6. scalar editor by primitive family
//!
//! A property that falls through all six (bytes, JSON, free-standing value
//! objects) is a configuration error; `AdminConfig::build` surfaces it at
//! startup.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::display::{ComponentRef, DisplayConfig, EntityDisplay};
use crate::error::{AdminError, Result};
use crate::introspect::Introspector;
use crate::schema::{Cardinality, DataModel};
use crate::types::{EnumType, PropertyType, ScalarKind};

/// Where a property is being rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Surface {
    /// List and detail views
    Display,
    /// Form for a new record
    Create,
    /// Form for an existing record
    Edit,
}

impl Surface {
    pub const ALL: [Surface; 3] = [Surface::Display, Surface::Create, Surface::Edit];

    pub fn is_form(&self) -> bool {
        !matches!(self, Surface::Display)
    }
}

/// Built-in editor per primitive family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EditorKind {
    Text,
    Integer,
    Float,
    Decimal,
    Boolean,
    DateTime,
    Date,
    Time,
    Uuid,
}

impl From<ScalarKind> for EditorKind {
    fn from(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Text => EditorKind::Text,
            ScalarKind::Integer => EditorKind::Integer,
            ScalarKind::Float => EditorKind::Float,
            ScalarKind::Decimal => EditorKind::Decimal,
            ScalarKind::Boolean => EditorKind::Boolean,
            ScalarKind::DateTime => EditorKind::DateTime,
            ScalarKind::Date => EditorKind::Date,
            ScalarKind::Time => EditorKind::Time,
            ScalarKind::Uuid => EditorKind::Uuid,
        }
    }
}

/// Resolved rendering choice for one property on one surface
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityChoice {
    Hidden,
    /// Not part of this surface at all (keys on create/edit forms)
    Excluded,
    CustomDisplay(ComponentRef),
    CustomEdit(ComponentRef),
    /// Members listed in declared order
    EnumEditor {
        enum_type: EnumType,
        read_only: bool,
    },
    RelationViewer {
        related_type: String,
        cardinality: Cardinality,
        display: EntityDisplay,
    },
    RelationPicker {
        related_type: String,
        cardinality: Cardinality,
        display: EntityDisplay,
    },
    ScalarEditor {
        editor: EditorKind,
        read_only: bool,
    },
}

impl CapabilityChoice {
    /// Whether the property appears on the surface at all
    pub fn is_visible(&self) -> bool {
        !matches!(self, CapabilityChoice::Hidden | CapabilityChoice::Excluded)
    }
}

/// Resolves capabilities for the record types of one context
#[derive(Debug, Clone, Copy)]
pub struct CapabilityResolver<'a> {
    introspector: Introspector<'a>,
    displays: &'a BTreeMap<String, DisplayConfig>,
}

impl<'a> CapabilityResolver<'a> {
    /// `displays` is keyed by record type name; types without an entry use
    /// an empty configuration
    pub fn new(model: &'a DataModel, displays: &'a BTreeMap<String, DisplayConfig>) -> Self {
        Self {
            introspector: Introspector::new(model),
            displays,
        }
    }

    /// Whole-record display of a record type
    pub fn entity_display(&self, record_type: &str) -> EntityDisplay {
        self.displays
            .get(record_type)
            .map_or(EntityDisplay::Default, DisplayConfig::entity_display)
    }

    /// Resolve one property of a record type on a surface
    pub fn resolve(
        &self,
        record_type: &str,
        property: &str,
        surface: Surface,
    ) -> Result<CapabilityChoice> {
        let definition = self
            .introspector
            .record_type(record_type)?
            .find_property(property)
            .ok_or_else(|| {
                AdminError::validation(format!(
                    "Property '{}' not found on '{}'",
                    property, record_type
                ))
            })?;

        if let Some(display) = self.displays.get(record_type) {
            if display.is_hidden(property) {
                return Ok(CapabilityChoice::Hidden);
            }
            let custom = match surface {
                Surface::Display => display
                    .display_override(property)
                    .map(|c| CapabilityChoice::CustomDisplay(c.clone())),
                Surface::Create | Surface::Edit => display
                    .edit_override(property)
                    .map(|c| CapabilityChoice::CustomEdit(c.clone())),
            };
            if let Some(custom) = custom {
                return Ok(custom);
            }
        }

        let excluded = match surface {
            Surface::Display => false,
            Surface::Create => self
                .introspector
                .is_generated_primary_key(record_type, property)?,
            Surface::Edit => self.introspector.is_primary_key(record_type, property)?,
        };
        if excluded {
            return Ok(CapabilityChoice::Excluded);
        }

        let read_only = !surface.is_form();

        if let PropertyType::Enum(enum_type) = &definition.property_type {
            return Ok(CapabilityChoice::EnumEditor {
                enum_type: enum_type.clone(),
                read_only,
            });
        }

        if let Some(relation) = self.introspector.relation(record_type, property) {
            let related_type = relation.target.clone();
            let cardinality = relation.cardinality;
            let display = self.entity_display(&relation.target);
            return Ok(if surface.is_form() {
                CapabilityChoice::RelationPicker {
                    related_type,
                    cardinality,
                    display,
                }
            } else {
                CapabilityChoice::RelationViewer {
                    related_type,
                    cardinality,
                    display,
                }
            });
        }

        match &definition.property_type {
            PropertyType::Scalar(kind) => Ok(CapabilityChoice::ScalarEditor {
                editor: EditorKind::from(*kind),
                read_only,
            }),
            other => Err(AdminError::configuration(format!(
                "No built-in editor for property '{}.{}' of type {:?}; hide it or register an override",
                record_type, property, other
            ))),
        }
    }

    /// Visible properties of a record type on a surface, in declared order
    pub fn visible_properties(
        &self,
        record_type: &str,
        surface: Surface,
    ) -> Result<Vec<(String, CapabilityChoice)>> {
        let definition = self.introspector.record_type(record_type)?;
        let mut visible = Vec::new();
        for property in &definition.properties {
            let choice = self.resolve(record_type, &property.name, surface)?;
            if choice.is_visible() {
                visible.push((property.name.clone(), choice));
            }
        }
        Ok(visible)
    }
}
