use crate::error::AppError;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::{
    MySql, MySqlPool,
    mysql::MySqlArguments,
    query::{Query, QueryAs, QueryScalar},
};

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Accepts `YYYY-MM-DD HH:MM:SS` as well as the ISO `T` separator.
pub fn parse_local_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s.trim(), f).ok())
}

/// Binds dynamically collected values in order.
pub trait BindValues: Sized {
    fn bind_value(self, value: SqlValue) -> Self;

    fn bind_values<I: IntoIterator<Item = SqlValue>>(self, values: I) -> Self {
        values.into_iter().fold(self, Self::bind_value)
    }
}

macro_rules! bind_sql_value {
    ($query:expr, $value:expr) => {
        match $value {
            SqlValue::String(v) => $query.bind(v),
            SqlValue::U64(v) => $query.bind(v),
            SqlValue::I64(v) => $query.bind(v),
            SqlValue::F64(v) => $query.bind(v),
            SqlValue::Bool(v) => $query.bind(v),
            SqlValue::Date(v) => $query.bind(v),
            SqlValue::DateTime(v) => $query.bind(v),
            SqlValue::Null => $query.bind(None::<String>),
        }
    };
}

impl<'q> BindValues for Query<'q, MySql, MySqlArguments> {
    fn bind_value(self, value: SqlValue) -> Self {
        bind_sql_value!(self, value)
    }
}

impl<'q, O> BindValues for QueryAs<'q, MySql, O, MySqlArguments> {
    fn bind_value(self, value: SqlValue) -> Self {
        bind_sql_value!(self, value)
    }
}

impl<'q, O> BindValues for QueryScalar<'q, MySql, O, MySqlArguments> {
    fn bind_value(self, value: SqlValue) -> Self {
        bind_sql_value!(self, value)
    }
}

fn to_sql_value(value: &Value) -> Result<SqlValue, AppError> {
    let converted = match value {
        Value::String(s) => {
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                SqlValue::Date(d)
            } else if let Some(dt) = parse_local_datetime(s) {
                SqlValue::DateTime(dt)
            } else {
                SqlValue::String(s.clone())
            }
        }
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                SqlValue::U64(u)
            } else if let Some(i) = n.as_i64() {
                SqlValue::I64(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::F64(f)
            } else {
                return Err(AppError::Validation("Unsupported number".to_string()));
            }
        }
        Value::Bool(b) => SqlValue::Bool(*b),
        Value::Null => SqlValue::Null,
        _ => return Err(AppError::Validation("Unsupported JSON value type".to_string())),
    };
    Ok(converted)
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Only keys listed in `allowed` may be updated; anything else is rejected
/// before it can reach the SQL text.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, AppError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::Validation("Payload must be a JSON object".to_string()))?;

    if obj.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }

    if let Some(unknown) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(AppError::Validation(format!(
            "Field '{unknown}' cannot be updated"
        )));
    }

    // Build SET clause
    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table, set_clause, id_column
    );

    let mut values = obj
        .values()
        .map(to_sql_value)
        .collect::<Result<Vec<_>, _>>()?;

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let result = sqlx::query::<MySql>(&update.sql)
        .bind_values(update.values)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
