//! # runtara-admin
//!
//! A model-driven admin engine for browsing and editing record sets.
//!
//! This crate turns declared data contexts (named groups of typed record sets)
//! into everything an admin UI needs: filtered, sorted and paginated listings,
//! per-property rendering decisions, and authorization policies for every
//! entry point. Storage is pluggable through [`QueryProvider`]; an in-memory
//! provider and a PostgreSQL provider ship with the crate.
//!
//! ## Features
//!
//! - **Property Introspection**: Primary keys, generated keys and relations from the storage model
//! - **Filtering**: Text and comparison predicates with fail-open handling of bad input
//! - **Ordering**: Multi-key, stable sorting with declared enum order and nulls first
//! - **Pagination**: Totals counted before the page window is applied
//! - **Capability Resolution**: Hidden, overridden, key, enum, relation and scalar editors per surface
//! - **Policies**: Deterministic identities per context and set action
//! - **SQL Injection Prevention**: All identifiers are quoted and validated, all literals bound
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use runtara_admin::{
//!     AdminConfig, Catalog, ContextDefinition, DataContext, DataModel, EntityModel, FilterSpec,
//!     FilterOperator, PageSpec, PostgresProvider, PropertyDefinition, PropertyType, RecordType,
//!     SortSpec,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = DataModel::new()
//!         .record_type(
//!             RecordType::new("ParentEntity")
//!                 .property(PropertyDefinition::new("Id", PropertyType::integer()))
//!                 .property(PropertyDefinition::new("Name", PropertyType::text())),
//!         )
//!         .entity(EntityModel::new("ParentEntity").generated_key("Id").table("parents"));
//!     let demo = ContextDefinition::new("DemoDbContext", model).set("Parents", "ParentEntity");
//!
//!     let catalog = Catalog::discover([&demo as &dyn DataContext])?;
//!     let config = AdminConfig::builder(&catalog)
//!         .context("DemoDbContext", |ctx| {
//!             ctx.title("Demo").set("Parents", |set| Ok(set.title("Parents")))
//!         })?
//!         .build()?;
//!
//!     let provider = PostgresProvider::connect("postgres://localhost/mydb").await?;
//!     let page = config
//!         .composer("DemoDbContext", &provider)?
//!         .page(
//!             "Parents",
//!             &[FilterSpec::new("Name", FilterOperator::Contains, "a")],
//!             &[SortSpec::ascending("Name")],
//!             PageSpec::new(1, 10),
//!         )
//!         .await?;
//!
//!     println!("{} of {}", page.records.len(), page.total_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Authorization
//!
//! Every context and set action is guarded by a policy whose identity is a
//! plain string such as `DemoDbContext/ParentEntity/Edit`:
//!
//! ```rust
//! use runtara_admin::{Action, PolicyIdentity};
//!
//! let identity = PolicyIdentity::set("DemoDbContext", "ParentEntity", Action::EditRecord);
//! assert_eq!(identity.as_str(), "DemoDbContext/ParentEntity/Edit");
//! ```

pub mod capability;
pub mod config;
pub mod discovery;
pub mod display;
pub mod error;
pub mod filter;
pub mod introspect;
pub mod navigation;
pub mod policy;
pub mod provider;
pub mod query;
pub mod schema;
pub mod sort;
pub mod sql;
pub mod types;
pub mod value;

// Re-export main types for convenience
pub use capability::{CapabilityChoice, CapabilityResolver, EditorKind, Surface};
pub use config::{
    AdminConfig, AdminConfigBuilder, ContextConfig, ContextConfigBuilder, SetConfigBuilder,
};
pub use discovery::{Catalog, DataContext};
pub use display::{ComponentContract, ComponentRef, DisplayConfig, EntityDisplay, PropertyKey};
pub use error::{AdminError, Result};
pub use filter::{Comparison, FilterOperator, FilterSpec, Predicate, StringComparison, TextOperation};
pub use introspect::{Introspector, PropertyDescriptor};
pub use navigation::{DefaultNavigationPaths, NavigationPaths};
pub use policy::{
    Action, ActionInfo, AuthorizationCallback, AuthorizationEvaluator, PolicyIdentity,
    PolicyPredicate, PolicyRegistry, Principal,
};
pub use provider::{IncludeMode, MemoryProvider, PostgresProvider, QueryProvider, RecordQuery};
pub use query::{Page, PageRequest, PageSpec, QueryComposer};
pub use schema::{
    Cardinality, ContextDefinition, DataModel, EntityModel, KeyDefinition, RecordType,
    RelationDefinition, SetDefinition, ValueGeneration,
};
pub use sort::{SortDirection, SortKey, SortSpec};
pub use types::{EnumType, PropertyDefinition, PropertyType, ScalarKind};
pub use value::{Record, Value};

// Re-export SQL utilities for advanced users
pub use sql::condition::{build_order_by_clause, build_where_clause};
pub use sql::sanitize::{quote_identifier, validate_identifier};
