//! Query provider abstraction
//!
//! The composer never talks to storage directly. It builds a [`RecordQuery`]
//! (predicate, ordering, window, includes) and hands it to a
//! [`QueryProvider`]:
//! - `MemoryProvider`: records held in process (tests, demos, small hosts)
//! - `PostgresProvider`: PostgreSQL through sqlx

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::Predicate;
use crate::schema::{EntityModel, RecordType, RelationDefinition};
use crate::sort::SortKey;
use crate::value::Record;

pub mod memory;
pub mod postgres;

pub use memory::MemoryProvider;
pub use postgres::PostgresProvider;

/// How related records are loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncludeMode {
    /// Loaded in the same round-trip as the page
    #[default]
    Joined,
    /// Loaded with one extra round-trip per relation
    Split,
}

/// A to-one relation to load alongside each record
#[derive(Debug, Clone, Copy)]
pub struct Include<'a> {
    pub relation: &'a RelationDefinition,
    /// Property on the declaring record holding the related key
    pub foreign_key: &'a str,
    pub target_type: &'a RecordType,
    pub target_entity: &'a EntityModel,
    /// Key property of the related record type
    pub target_key: &'a str,
}

/// Skip/take applied after filtering and ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub take: u64,
}

/// A fully composed query against one record type
#[derive(Debug, Clone)]
pub struct RecordQuery<'a> {
    pub record_type: &'a RecordType,
    pub entity: &'a EntityModel,
    pub includes: Vec<Include<'a>>,
    pub include_mode: IncludeMode,
    pub predicate: Predicate,
    pub ordering: Vec<SortKey>,
    /// `None` returns every matching record
    pub window: Option<Window>,
}

impl<'a> RecordQuery<'a> {
    pub fn new(record_type: &'a RecordType, entity: &'a EntityModel) -> Self {
        Self {
            record_type,
            entity,
            includes: Vec::new(),
            include_mode: IncludeMode::Joined,
            predicate: Predicate::True,
            ordering: Vec::new(),
            window: None,
        }
    }

    /// Key property of the queried type, when the model declares one
    pub fn key_property(&self) -> Option<&'a str> {
        self.entity.key.as_ref().map(|k| k.property.as_str())
    }
}

/// Executes composed queries
///
/// Failures are returned unchanged; providers own their timeouts and the
/// composer never retries.
#[async_trait]
pub trait QueryProvider: Send + Sync {
    /// Number of records matching the predicate, ignoring ordering and window
    async fn count(&self, query: &RecordQuery<'_>) -> Result<u64>;

    /// Matching records, ordered and windowed, with includes attached
    async fn fetch(&self, query: &RecordQuery<'_>) -> Result<Vec<Record>>;
}
