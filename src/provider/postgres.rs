//! PostgreSQL query provider
//!
//! Each record type maps to one table (see [`EntityModel::table_name`]) whose
//! columns are named after the properties. Rows are read back through
//! `to_jsonb`, so every property type shares one decoding path.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::error::{AdminError, Result};
use crate::filter::Predicate;
use crate::provider::{Include, IncludeMode, QueryProvider, RecordQuery};
use crate::schema::EntityModel;
use crate::sql::condition::{build_order_by_clause, build_where_clause};
use crate::sql::sanitize::{qualified_column, quote_identifier, validate_identifier};
use crate::value::{Record, Value};

/// Alias of the queried table in generated statements
const ALIAS: &str = "t";

/// Query provider backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PostgresProvider {
    pool: PgPool,
}

impl PostgresProvider {
    /// Connect to the database
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| AdminError::provider(format!("Database connection failed: {}", e)))?;
        Ok(Self { pool })
    }

    /// Use an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_split(&self, include: &Include<'_>, records: &mut [Record]) -> Result<()> {
        let keys: Vec<String> = records
            .iter()
            .filter_map(|r| r.get(include.foreign_key).to_literal())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let mut related: HashMap<String, Record> = HashMap::new();
        if !keys.is_empty() {
            let sql = build_split_sql(include);
            debug!(sql = %sql, keys = keys.len(), "Loading related records");
            let rows = sqlx::query(&sql).bind(&keys).fetch_all(&self.pool).await?;
            for row in &rows {
                let json: serde_json::Value = row.try_get("record")?;
                let record = Record::from_json(include.target_type, &json)?;
                if let Some(key) = record.get(include.target_key).to_literal() {
                    related.insert(key, record);
                }
            }
        }

        for record in records.iter_mut() {
            let value = record
                .get(include.foreign_key)
                .to_literal()
                .and_then(|key| related.get(&key).cloned())
                .map_or(Value::Null, Value::from);
            record.set(include.relation.name.clone(), value);
        }
        Ok(())
    }
}

#[async_trait]
impl QueryProvider for PostgresProvider {
    async fn count(&self, query: &RecordQuery<'_>) -> Result<u64> {
        validate_query(query)?;
        let (sql, params) = build_count_sql(query)?;
        debug!(sql = %sql, params = params.len(), "Counting records");

        let mut count_query = sqlx::query_as::<_, (i64,)>(&sql);
        for param in params {
            count_query = count_query.bind(param);
        }
        let (total_count,) = count_query.fetch_one(&self.pool).await?;
        Ok(u64::try_from(total_count).unwrap_or(0))
    }

    async fn fetch(&self, query: &RecordQuery<'_>) -> Result<Vec<Record>> {
        validate_query(query)?;
        let joined = query.include_mode == IncludeMode::Joined;
        let (sql, params) = build_fetch_sql(query, joined)?;
        debug!(sql = %sql, params = params.len(), "Fetching records");

        let mut select_query = sqlx::query(&sql);
        for param in params {
            select_query = select_query.bind(param);
        }
        if let Some(window) = query.window {
            select_query = select_query
                .bind(i64::try_from(window.take).unwrap_or(i64::MAX))
                .bind(i64::try_from(window.skip).unwrap_or(i64::MAX));
        }
        let rows = select_query.fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let json: serde_json::Value = row.try_get("record")?;
            let mut record = Record::from_json(query.record_type, &json)?;
            if joined {
                for (i, include) in query.includes.iter().enumerate() {
                    let column = format!("include_{}", i);
                    let related: Option<serde_json::Value> = row.try_get(column.as_str())?;
                    let value = match related {
                        Some(doc) => Value::from(Record::from_json(include.target_type, &doc)?),
                        None => Value::Null,
                    };
                    record.set(include.relation.name.clone(), value);
                }
            }
            records.push(record);
        }

        if !joined {
            for include in &query.includes {
                self.load_split(include, &mut records).await?;
            }
        }

        Ok(records)
    }
}

// ============================================================================
// Statement building
// ============================================================================

fn table(entity: &EntityModel) -> String {
    quote_identifier(entity.table_name())
}

/// Reject identifiers that cannot be spliced into SQL
fn validate_query(query: &RecordQuery<'_>) -> Result<()> {
    let mut names: Vec<&str> = vec![query.entity.table_name()];
    names.extend(query.key_property());
    names.extend(query.ordering.iter().map(|k| k.property.as_str()));
    collect_properties(&query.predicate, &mut names);
    for include in &query.includes {
        names.push(include.foreign_key);
        names.push(include.target_key);
        names.push(include.target_entity.table_name());
    }

    for name in names {
        validate_identifier(name).map_err(AdminError::validation)?;
    }
    Ok(())
}

fn collect_properties<'p>(predicate: &'p Predicate, names: &mut Vec<&'p str>) {
    match predicate {
        Predicate::True => {}
        Predicate::Text { property, .. } | Predicate::Compare { property, .. } => {
            names.push(property)
        }
        Predicate::Not(inner) => collect_properties(inner, names),
        Predicate::And(predicates) => {
            for p in predicates {
                collect_properties(p, names);
            }
        }
    }
}

fn where_clause(query: &RecordQuery<'_>) -> Result<(String, Vec<String>)> {
    let mut param_offset = 1;
    build_where_clause(&query.predicate, ALIAS, &mut param_offset).map_err(AdminError::validation)
}

/// `SELECT COUNT(*)` over the filtered table; ordering, window and includes
/// do not affect the count
fn build_count_sql(query: &RecordQuery<'_>) -> Result<(String, Vec<String>)> {
    let (where_sql, params) = where_clause(query)?;
    let sql = format!(
        "SELECT COUNT(*) FROM {} {} WHERE {}",
        table(query.entity),
        ALIAS,
        where_sql
    );
    Ok((sql, params))
}

/// Page statement; LIMIT/OFFSET placeholders follow the filter parameters
fn build_fetch_sql(query: &RecordQuery<'_>, joined: bool) -> Result<(String, Vec<String>)> {
    let (where_sql, params) = where_clause(query)?;

    let mut select_columns = vec![format!("to_jsonb({}) AS \"record\"", ALIAS)];
    let mut joins = Vec::new();
    if joined {
        for (i, include) in query.includes.iter().enumerate() {
            let related_alias = format!("r{}", i);
            select_columns.push(format!("i{}.doc AS \"include_{}\"", i, i));
            joins.push(format!(
                "LEFT JOIN LATERAL (SELECT to_jsonb({ra}) AS doc FROM {target} {ra} WHERE {target_key} = {foreign_key} LIMIT 1) i{i} ON TRUE",
                ra = related_alias,
                target = table(include.target_entity),
                target_key = qualified_column(&related_alias, include.target_key),
                foreign_key = qualified_column(ALIAS, include.foreign_key),
                i = i
            ));
        }
    }

    let mut sql = format!(
        "SELECT {} FROM {} {}",
        select_columns.join(", "),
        table(query.entity),
        ALIAS
    );
    for join in &joins {
        sql.push(' ');
        sql.push_str(join);
    }
    sql.push_str(&format!(" WHERE {}", where_sql));

    if let Some(order_by) = build_order_by_clause(&query.ordering, ALIAS, query.key_property()) {
        sql.push_str(&format!(" ORDER BY {}", order_by));
    }
    if query.window.is_some() {
        sql.push_str(&format!(
            " LIMIT ${} OFFSET ${}",
            params.len() + 1,
            params.len() + 2
        ));
    }

    Ok((sql, params))
}

/// Related records by key, for split include mode
fn build_split_sql(include: &Include<'_>) -> String {
    format!(
        "SELECT to_jsonb(r) AS \"record\" FROM {} r WHERE {}::text = ANY($1)",
        table(include.target_entity),
        qualified_column("r", include.target_key)
    )
}
