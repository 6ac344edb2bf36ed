//! Tabular data store used by the `unique` rule.
//!
//! The rule only needs to know how many rows carry a given value in a given
//! column, so that is the whole contract. `PgDataStore` answers it with a
//! parameterized query over the diesel pool; `MemoryDataStore` keeps rows in
//! process for tests and local tooling.

use std::collections::HashMap;
use std::sync::RwLock;

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::db::Pool;
use crate::constants::RULE_UNIQUE;
use crate::error::{ServiceError, ServiceResult};

static IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

pub trait DataStore: Send + Sync {
    /// Number of rows in `table` whose `column` equals `value`.
    fn count_matching(&self, table: &str, column: &str, value: &str) -> ServiceResult<u64>;
}

/// Whether `identifier` is a plain SQL identifier that can be quoted safely.
pub fn is_valid_identifier(identifier: &str) -> bool {
    IDENTIFIER_REGEX.is_match(identifier)
}

#[derive(QueryableByName)]
struct MatchCount {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// Postgres-backed store.
///
/// The column is compared through its text form so integer, uuid, date and
/// numeric columns match their posted representation.
#[derive(Clone)]
pub struct PgDataStore {
    pool: Pool,
}

impl PgDataStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl DataStore for PgDataStore {
    fn count_matching(&self, table: &str, column: &str, value: &str) -> ServiceResult<u64> {
        // Identifiers are spliced into the SQL text, values never are.
        if !is_valid_identifier(table) || !is_valid_identifier(column) {
            return Err(ServiceError::invalid_rule_param(
                RULE_UNIQUE,
                format!("{}.{}", table, column),
            ));
        }

        let mut conn = self.pool.get()?;
        let query = format!(
            "SELECT COUNT(*) AS count FROM \"{}\" WHERE \"{}\"::text = $1",
            table, column
        );

        let row = diesel::sql_query(query)
            .bind::<Text, _>(value)
            .get_result::<MatchCount>(&mut conn)
            .map_err(|e| {
                log::error!("Unique lookup on {}.{} failed: {}", table, column, e);
                ServiceError::from(e)
            })?;

        Ok(u64::try_from(row.count).unwrap_or(0))
    }
}

/// In-process store keyed by `(table, column)`.
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    rows: RwLock<HashMap<(String, String), Vec<String>>>,
    failure: RwLock<Option<String>>,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, table: &str, column: &str, value: &str) {
        match self.rows.write() {
            Ok(mut rows) => rows
                .entry((table.to_string(), column.to_string()))
                .or_default()
                .push(value.to_string()),
            Err(_) => log::warn!("Memory data store lock was poisoned, dropping insert"),
        }
    }

    /// Makes every following lookup fail with `message`.
    pub fn fail_with(&self, message: &str) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = Some(message.to_string());
        }
    }
}

impl DataStore for MemoryDataStore {
    fn count_matching(&self, table: &str, column: &str, value: &str) -> ServiceResult<u64> {
        if let Some(message) = self
            .failure
            .read()
            .map_err(|_| ServiceError::internal_server_error("Data store lock poisoned"))?
            .as_ref()
        {
            return Err(ServiceError::dependency(message.clone()));
        }

        let rows = self
            .rows
            .read()
            .map_err(|_| ServiceError::internal_server_error("Data store lock poisoned"))?;

        let count = rows
            .get(&(table.to_string(), column.to_string()))
            .map_or(0, |values| values.iter().filter(|v| v.as_str() == value).count());

        Ok(count as u64)
    }
}
