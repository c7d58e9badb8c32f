//! Startup discovery of contexts and sets
//!
//! Hosts register data-access objects implementing [`DataContext`]; the
//! [`Catalog`] is built from them exactly once and is read-only afterwards.

use std::collections::HashSet;

use tracing::info;

use crate::error::{AdminError, Result};
use crate::introspect::Introspector;
use crate::schema::{ContextDefinition, SetDefinition};

/// A data-access object that can describe its sets and model
pub trait DataContext: Send + Sync {
    fn definition(&self) -> ContextDefinition;
}

impl DataContext for ContextDefinition {
    fn definition(&self) -> ContextDefinition {
        self.clone()
    }
}

/// Every discovered context, in registration order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    contexts: Vec<ContextDefinition>,
}

impl Catalog {
    /// Scan the registered contexts
    ///
    /// Fails on duplicate context names, duplicate set names within a context,
    /// or a set whose record type is not declared in its context's model.
    pub fn discover<'a, I>(contexts: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a dyn DataContext>,
    {
        let mut discovered: Vec<ContextDefinition> = Vec::new();
        let mut context_names = HashSet::new();

        for context in contexts {
            let definition = context.definition();
            if !context_names.insert(definition.name.clone()) {
                return Err(AdminError::configuration(format!(
                    "Context '{}' registered twice",
                    definition.name
                )));
            }

            let mut set_names = HashSet::new();
            for set in &definition.sets {
                if !set_names.insert(set.name.as_str()) {
                    return Err(AdminError::configuration(format!(
                        "Set '{}' declared twice on context '{}'",
                        set.name, definition.name
                    )));
                }
                if definition.model.find_record_type(&set.record_type).is_none() {
                    return Err(AdminError::configuration(format!(
                        "Set '{}' on context '{}' uses undeclared record type '{}'",
                        set.name, definition.name, set.record_type
                    )));
                }
            }

            info!(
                context = %definition.name,
                sets = definition.sets.len(),
                "Discovered data context"
            );
            discovered.push(definition);
        }

        Ok(Self {
            contexts: discovered,
        })
    }

    pub fn contexts(&self) -> &[ContextDefinition] {
        &self.contexts
    }

    pub fn context(&self, name: &str) -> Result<&ContextDefinition> {
        self.contexts
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| AdminError::context_not_found(name))
    }

    /// Resolve a set by context name and set name
    pub fn set(&self, context: &str, set: &str) -> Result<(&ContextDefinition, &SetDefinition)> {
        let definition = self.context(context)?;
        let set_definition = definition
            .find_set(set)
            .ok_or_else(|| AdminError::set_not_found(format!("{}/{}", context, set)))?;
        Ok((definition, set_definition))
    }

    /// Every (context, set) pair
    pub fn pairs(&self) -> impl Iterator<Item = (&ContextDefinition, &SetDefinition)> {
        self.contexts
            .iter()
            .flat_map(|c| c.sets.iter().map(move |s| (c, s)))
    }

    /// Introspector over a context's model
    pub fn introspector(&self, context: &str) -> Result<Introspector<'_>> {
        Ok(Introspector::new(&self.context(context)?.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DataModel, EntityModel, RecordType};
    use crate::types::{PropertyDefinition, PropertyType};

    fn model() -> DataModel {
        DataModel::new()
            .record_type(
                RecordType::new("JobEntity")
                    .property(PropertyDefinition::new("Id", PropertyType::integer())),
            )
            .entity(EntityModel::new("JobEntity").generated_key("Id"))
    }

    #[test]
    fn test_discover_contexts() {
        let demo = ContextDefinition::new("DemoDbContext", model()).set("Jobs", "JobEntity");
        let other = ContextDefinition::new("OtherContext", model()).set("Jobs", "JobEntity");

        let catalog = Catalog::discover([&demo as &dyn DataContext, &other]).unwrap();

        assert_eq!(catalog.contexts().len(), 2);
        assert_eq!(catalog.pairs().count(), 2);
        let (context, set) = catalog.set("OtherContext", "Jobs").unwrap();
        assert_eq!(context.name, "OtherContext");
        assert_eq!(set.record_type, "JobEntity");
    }

    #[test]
    fn test_discover_rejects_duplicate_context() {
        let demo = ContextDefinition::new("DemoDbContext", model());
        let result = Catalog::discover([&demo as &dyn DataContext, &demo]);
        assert!(matches!(result, Err(AdminError::Configuration(_))));
    }

    #[test]
    fn test_discover_rejects_duplicate_set() {
        let demo = ContextDefinition::new("DemoDbContext", model())
            .set("Jobs", "JobEntity")
            .set("Jobs", "JobEntity");
        let result = Catalog::discover([&demo as &dyn DataContext]);
        assert!(matches!(result, Err(AdminError::Configuration(_))));
    }

    #[test]
    fn test_discover_rejects_undeclared_record_type() {
        let demo = ContextDefinition::new("DemoDbContext", model()).set("People", "Person");
        let result = Catalog::discover([&demo as &dyn DataContext]);
        assert!(matches!(result, Err(AdminError::Configuration(_))));
    }

    #[test]
    fn test_introspector_reads_context_model() {
        let demo = ContextDefinition::new("DemoDbContext", model()).set("Jobs", "JobEntity");
        let catalog = Catalog::discover([&demo as &dyn DataContext]).unwrap();

        let introspector = catalog.introspector("DemoDbContext").unwrap();
        assert!(introspector.is_generated_primary_key("JobEntity", "Id").unwrap());
        assert!(matches!(
            catalog.introspector("Missing"),
            Err(AdminError::ContextNotFound(_))
        ));
    }

    #[test]
    fn test_lookup_errors() {
        let demo = ContextDefinition::new("DemoDbContext", model()).set("Jobs", "JobEntity");
        let catalog = Catalog::discover([&demo as &dyn DataContext]).unwrap();

        assert!(matches!(
            catalog.context("Missing"),
            Err(AdminError::ContextNotFound(_))
        ));
        assert!(matches!(
            catalog.set("DemoDbContext", "Missing"),
            Err(AdminError::SetNotFound(_))
        ));
    }
}
