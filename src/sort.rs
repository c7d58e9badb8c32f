//! Ordering building
//!
//! A sort request only applies to orderable properties (scalars and
//! enumerations). Anything else degrades to "no sort" with a warning.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::schema::RecordType;
use crate::types::PropertyType;
use crate::value::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Ascending,
    Descending,
    /// Column present in the request but not sorted
    #[default]
    None,
}

/// A single user-supplied sort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub property: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Executable ordering key
///
/// Ascending puts nulls first; descending reverses the whole order, so nulls
/// come last.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub property: String,
    pub property_type: PropertyType,
    pub descending: bool,
}

impl SortKey {
    pub fn build(record_type: &RecordType, spec: &SortSpec) -> Option<SortKey> {
        let descending = match spec.direction {
            SortDirection::Ascending => false,
            SortDirection::Descending => true,
            SortDirection::None => return None,
        };

        let Some(property) = record_type.find_property(&spec.property) else {
            warn!(
                record_type = %record_type.name,
                property = %spec.property,
                "Sort dropped: unknown property"
            );
            return None;
        };

        if !property.property_type.is_orderable() {
            warn!(
                record_type = %record_type.name,
                property = %spec.property,
                "Sort dropped: property type has no total order"
            );
            return None;
        }

        Some(SortKey {
            property: spec.property.clone(),
            property_type: property.property_type.clone(),
            descending,
        })
    }

    /// Compile every sort, keeping request order
    pub fn build_all(record_type: &RecordType, specs: &[SortSpec]) -> Vec<SortKey> {
        specs
            .iter()
            .filter_map(|spec| SortKey::build(record_type, spec))
            .collect()
    }

    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ordering = self
            .property_type
            .compare_values(a.get(&self.property), b.get(&self.property));
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Stable multi-key sort: each key only breaks ties left by the previous ones
pub fn apply_ordering(keys: &[SortKey], records: &mut [Record]) {
    if keys.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        keys.iter()
            .map(|key| key.compare(a, b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}
