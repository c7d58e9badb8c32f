//! Configuration for the admin engine
//!
//! Provides consuming builders for per-context and per-set configuration:
//! titles, hidden properties, display components and authorization
//! overrides. Everything configured here lives in the returned
//! [`AdminConfig`]; nothing is global.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::capability::{CapabilityResolver, Surface};
use crate::discovery::Catalog;
use crate::display::{ComponentRef, DisplayConfig};
use crate::error::{AdminError, Result};
use crate::policy::{
    Action, ActionInfo, AuthorizationCallback, AuthorizationEvaluator, PolicyIdentity,
    PolicyPredicate, PolicyRegistry, Principal, allow_all, default_policies,
};
use crate::provider::QueryProvider;
use crate::query::QueryComposer;
use crate::schema::{ContextDefinition, RecordType, SetDefinition};
use crate::value::Record;

/// Configuration of one context
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub name: String,
    /// Display title; the context name when unset
    pub title: Option<String>,
    /// Load related records with separate round-trips
    pub split_queries: bool,
    /// Display configuration keyed by record type name
    pub displays: BTreeMap<String, DisplayConfig>,
}

impl ContextConfig {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            split_queries: false,
            displays: BTreeMap::new(),
        }
    }

    pub fn display(&self, record_type: &str) -> Option<&DisplayConfig> {
        self.displays.get(record_type)
    }
}

/// Validated admin configuration
#[derive(Debug, Clone)]
pub struct AdminConfig {
    catalog: Catalog,
    contexts: BTreeMap<String, ContextConfig>,
    policies: PolicyRegistry,
}

impl AdminConfig {
    /// Create a new configuration builder over discovered contexts
    pub fn builder(catalog: &Catalog) -> AdminConfigBuilder<'_> {
        AdminConfigBuilder::new(catalog)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn context(&self, name: &str) -> Result<&ContextConfig> {
        self.contexts
            .get(name)
            .ok_or_else(|| AdminError::context_not_found(name))
    }

    /// Display configuration of a record type within a context
    pub fn display(&self, context: &str, record_type: &str) -> Result<Option<&DisplayConfig>> {
        Ok(self.context(context)?.display(record_type))
    }

    pub fn context_title(&self, context: &str) -> Result<&str> {
        let config = self.context(context)?;
        Ok(config.title.as_deref().unwrap_or(&config.name))
    }

    /// Title of a set; the set name when unset
    pub fn set_title<'s>(&'s self, context: &str, set: &str) -> Result<&'s str> {
        let (_, definition) = self.catalog.set(context, set)?;
        let title = self
            .context(context)?
            .display(&definition.record_type)
            .and_then(DisplayConfig::title);
        Ok(title.unwrap_or(&definition.name))
    }

    /// Capability resolver for a context
    pub fn resolver(&self, context: &str) -> Result<CapabilityResolver<'_>> {
        let definition = self.catalog.context(context)?;
        let config = self.context(context)?;
        Ok(CapabilityResolver::new(&definition.model, &config.displays))
    }

    /// Query composer for a context, honoring its split-query setting
    pub fn composer<'a>(
        &'a self,
        context: &str,
        provider: &'a dyn QueryProvider,
    ) -> Result<QueryComposer<'a>> {
        let definition = self.catalog.context(context)?;
        let config = self.context(context)?;
        Ok(QueryComposer::new(definition, provider).split_queries(config.split_queries))
    }

    pub fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    /// Evaluate the policy guarding `action` for `principal`
    pub fn authorize(&self, action: &ActionInfo, principal: &Principal) -> Result<bool> {
        self.policies.evaluate(&action.identity(), principal)
    }

    /// Every property of every set must resolve on every surface
    fn validate(&self) -> Result<()> {
        for definition in self.catalog.contexts() {
            let resolver = self.resolver(&definition.name)?;
            for set in &definition.sets {
                for surface in Surface::ALL {
                    resolver
                        .visible_properties(&set.record_type, surface)
                        .map_err(|e| {
                            AdminError::configuration(format!(
                                "{}/{} on {:?} surface: {}",
                                definition.name, set.name, surface, e
                            ))
                        })?;
                }
            }
        }
        Ok(())
    }
}

/// Builder for AdminConfig
pub struct AdminConfigBuilder<'a> {
    catalog: &'a Catalog,
    callback: AuthorizationCallback,
    contexts: Vec<ContextConfigBuilder<'a>>,
}

impl<'a> AdminConfigBuilder<'a> {
    /// Create a new builder; every action is allowed until configured otherwise
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            callback: allow_all(),
            contexts: Vec::new(),
        }
    }

    /// Host callback consulted by every policy without an explicit override
    pub fn authorization_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ActionInfo, &Principal) -> bool + Send + Sync + 'static,
    {
        self.callback = Arc::new(callback);
        self
    }

    /// Configure a discovered context
    ///
    /// Configuring the same context twice continues from the earlier
    /// configuration.
    pub fn context<F>(mut self, name: &str, configure: F) -> Result<Self>
    where
        F: FnOnce(ContextConfigBuilder<'a>) -> Result<ContextConfigBuilder<'a>>,
    {
        let definition = self.catalog.context(name).map_err(|_| {
            AdminError::configuration(format!("Cannot configure unknown context '{}'", name))
        })?;

        let builder = match self
            .contexts
            .iter()
            .position(|c| c.definition.name == name)
        {
            Some(index) => self.contexts.remove(index),
            None => ContextConfigBuilder::new(definition),
        };
        self.contexts.push(configure(builder)?);
        Ok(self)
    }

    /// Register policies and validate the configuration
    pub fn build(self) -> Result<AdminConfig> {
        let mut policies = PolicyRegistry::new();
        policies.register_all(default_policies(self.catalog, &self.callback));

        let mut contexts: BTreeMap<String, ContextConfig> = self
            .catalog
            .contexts()
            .iter()
            .map(|c| (c.name.clone(), ContextConfig::new(&c.name)))
            .collect();

        let mut overrides = 0usize;
        for builder in self.contexts {
            let (config, context_policies) = builder.finish();
            for (identity, predicate) in context_policies {
                policies.add_policy(identity, predicate);
                overrides += 1;
            }
            contexts.insert(config.name.clone(), config);
        }

        let config = AdminConfig {
            catalog: self.catalog.clone(),
            contexts,
            policies,
        };
        config.validate()?;

        info!(
            contexts = config.contexts.len(),
            policies = config.policies.len(),
            policy_overrides = overrides,
            "Admin configuration built"
        );
        Ok(config)
    }
}

/// Builder for one context's configuration
pub struct ContextConfigBuilder<'a> {
    definition: &'a ContextDefinition,
    title: Option<String>,
    split_queries: bool,
    info_policy: Option<PolicyPredicate>,
    sets: Vec<SetConfigBuilder<'a>>,
}

impl<'a> ContextConfigBuilder<'a> {
    fn new(definition: &'a ContextDefinition) -> Self {
        Self {
            definition,
            title: None,
            split_queries: false,
            info_policy: None,
            sets: Vec::new(),
        }
    }

    /// Set the display title (default: the context name)
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Load related records with separate round-trips (default: false)
    pub fn split_queries(mut self, enabled: bool) -> Self {
        self.split_queries = enabled;
        self
    }

    /// Guard the context overview with a predicate instead of the callback
    pub fn user_can_read_info_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Principal) -> bool + Send + Sync + 'static,
    {
        self.info_policy = Some(Arc::new(predicate));
        self
    }

    /// Configure a set of this context
    ///
    /// Sets sharing a record type share one display configuration.
    pub fn set<F>(mut self, name: &str, configure: F) -> Result<Self>
    where
        F: FnOnce(SetConfigBuilder<'a>) -> Result<SetConfigBuilder<'a>>,
    {
        let definition = self.definition;
        let set = definition.find_set(name).ok_or_else(|| {
            AdminError::configuration(format!(
                "Cannot configure unknown set '{}' on context '{}'",
                name, definition.name
            ))
        })?;

        let builder = match self
            .sets
            .iter()
            .position(|s| s.set.record_type == set.record_type)
        {
            Some(index) => self.sets.remove(index),
            None => {
                let record_type = definition
                    .model
                    .find_record_type(&set.record_type)
                    .ok_or_else(|| AdminError::entity_not_found(&set.record_type))?;
                SetConfigBuilder::new(&definition.name, set, record_type)
            }
        };
        self.sets.push(configure(builder)?);
        Ok(self)
    }

    fn finish(self) -> (ContextConfig, Vec<(PolicyIdentity, PolicyPredicate)>) {
        let mut config = ContextConfig::new(&self.definition.name);
        config.title = self.title;
        config.split_queries = self.split_queries;

        let mut policies = Vec::new();
        if let Some(predicate) = self.info_policy {
            policies.push((
                PolicyIdentity::context(&self.definition.name, Action::ReadContextInfo),
                predicate,
            ));
        }

        for set in self.sets {
            for (action, predicate) in set.policies {
                policies.push((
                    PolicyIdentity::set(set.context, &set.set.record_type, action),
                    predicate,
                ));
            }
            config
                .displays
                .insert(set.record_type.name.clone(), set.display);
        }

        (config, policies)
    }
}

/// Builder for one set's configuration
pub struct SetConfigBuilder<'a> {
    context: &'a str,
    set: &'a SetDefinition,
    record_type: &'a RecordType,
    display: DisplayConfig,
    policies: Vec<(Action, PolicyPredicate)>,
}

impl<'a> SetConfigBuilder<'a> {
    fn new(context: &'a str, set: &'a SetDefinition, record_type: &'a RecordType) -> Self {
        Self {
            context,
            set,
            record_type,
            display: DisplayConfig::new(&record_type.name),
            policies: Vec::new(),
        }
    }

    /// Set the display title (default: the set name)
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.display.set_title(title.into());
        self
    }

    /// Hide a property on every surface
    pub fn hide(mut self, property: &str) -> Result<Self> {
        self.require_property(property)?;
        self.display.hide(property);
        Ok(self)
    }

    /// Render whole records as text
    pub fn string_display<F>(mut self, describe: F) -> Self
    where
        F: Fn(&Record) -> String + Send + Sync + 'static,
    {
        self.display.set_string_display(Arc::new(describe));
        self
    }

    /// Render whole records with a component; takes precedence over
    /// [`string_display`](Self::string_display)
    pub fn entity_component(mut self, component: ComponentRef) -> Result<Self> {
        component.check_entity_display(self.record_type)?;
        self.display.set_entity_component(component);
        Ok(self)
    }

    /// Display a property with a component
    pub fn display_with(mut self, property: &str, component: ComponentRef) -> Result<Self> {
        component.check_property_display(self.record_type, property)?;
        if !self.display.add_display_override(property, component) {
            debug!(
                set = %self.set.name,
                property,
                "Display override ignored: already registered"
            );
        }
        Ok(self)
    }

    /// Edit a property with a component
    pub fn edit_with(mut self, property: &str, component: ComponentRef) -> Result<Self> {
        component.check_property_edit(self.record_type, property)?;
        if !self.display.add_edit_override(property, component) {
            debug!(
                set = %self.set.name,
                property,
                "Edit override ignored: already registered"
            );
        }
        Ok(self)
    }

    pub fn user_can_read_if<F>(self, predicate: F) -> Self
    where
        F: Fn(&Principal) -> bool + Send + Sync + 'static,
    {
        self.policy(Action::ReadRecords, predicate)
    }

    pub fn user_can_create_if<F>(self, predicate: F) -> Self
    where
        F: Fn(&Principal) -> bool + Send + Sync + 'static,
    {
        self.policy(Action::CreateRecord, predicate)
    }

    pub fn user_can_edit_if<F>(self, predicate: F) -> Self
    where
        F: Fn(&Principal) -> bool + Send + Sync + 'static,
    {
        self.policy(Action::EditRecord, predicate)
    }

    pub fn user_can_delete_if<F>(self, predicate: F) -> Self
    where
        F: Fn(&Principal) -> bool + Send + Sync + 'static,
    {
        self.policy(Action::DeleteRecord, predicate)
    }

    fn policy<F>(mut self, action: Action, predicate: F) -> Self
    where
        F: Fn(&Principal) -> bool + Send + Sync + 'static,
    {
        self.policies.push((action, Arc::new(predicate)));
        self
    }

    fn require_property(&self, property: &str) -> Result<()> {
        match self.record_type.find_property(property) {
            Some(_) => Ok(()),
            None => Err(AdminError::configuration(format!(
                "Property '{}' not found on '{}'",
                property, self.record_type.name
            ))),
        }
    }
}
