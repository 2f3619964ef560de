use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{self, postgres::PgArguments, postgres::PgRow, FromRow, PgPool, Row};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::filter::{Filter, FilterData, SqlParam, SqlResult};

pub struct QueryBuilder<T> {
    filter: Filter,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(table_name: impl Into<String>) -> Result<Self, DatabaseError> {
        Ok(Self {
            filter: Filter::new(table_name)?,
            _phantom: std::marker::PhantomData,
        })
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, DatabaseError> {
        self.filter.assign(filter_data)?;
        Ok(self)
    }

    pub async fn select_all(self, pool: &PgPool) -> Result<Vec<T>, DatabaseError> {
        let sql_result = self.filter.to_sql()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(pool).await?)
    }

    pub async fn select_optional(self, pool: &PgPool) -> Result<Option<T>, DatabaseError> {
        let sql_result = self.filter.to_sql()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_optional(pool).await?)
    }

    pub async fn count(self, pool: &PgPool) -> Result<i64, DatabaseError> {
        let sql_result: SqlResult = self.filter.to_count_sql()?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }
}

/// Concrete SQL type for a filter parameter.
///
/// Comparison operands that are UUIDs or RFC 3339 timestamps are bound with
/// those types so they compare against `uuid` and `timestamptz` columns.
/// Pattern and array operands keep the type the filter pinned them to.
#[derive(Debug, PartialEq)]
enum BindValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Text(String),
    TextArray(Vec<String>),
    Json(Value),
}

impl From<&SqlParam> for BindValue {
    fn from(param: &SqlParam) -> Self {
        match param {
            SqlParam::Text(s) => BindValue::Text(s.clone()),
            SqlParam::TextArray(items) => BindValue::TextArray(items.clone()),
            SqlParam::Value(v) => BindValue::from(v),
        }
    }
}

impl From<&Value> for BindValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::Int(i)
                } else {
                    BindValue::Float(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => {
                if let Ok(id) = Uuid::parse_str(s) {
                    BindValue::Uuid(id)
                } else if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                    BindValue::Timestamp(ts.with_timezone(&Utc))
                } else {
                    BindValue::Text(s.clone())
                }
            }
            Value::Array(_) | Value::Object(_) => BindValue::Json(v.clone()),
        }
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &SqlParam,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match BindValue::from(v) {
        BindValue::Null => q.bind(None::<String>),
        BindValue::Bool(b) => q.bind(b),
        BindValue::Int(i) => q.bind(i),
        BindValue::Float(f) => q.bind(f),
        BindValue::Uuid(id) => q.bind(id),
        BindValue::Timestamp(ts) => q.bind(ts),
        BindValue::Text(s) => q.bind(s),
        BindValue::TextArray(items) => q.bind(items),
        BindValue::Json(j) => q.bind(sqlx::types::Json(j)),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &SqlParam,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match BindValue::from(v) {
        BindValue::Null => q.bind(None::<String>),
        BindValue::Bool(b) => q.bind(b),
        BindValue::Int(i) => q.bind(i),
        BindValue::Float(f) => q.bind(f),
        BindValue::Uuid(id) => q.bind(id),
        BindValue::Timestamp(ts) => q.bind(ts),
        BindValue::Text(s) => q.bind(s),
        BindValue::TextArray(items) => q.bind(items),
        BindValue::Json(j) => q.bind(sqlx::types::Json(j)),
    }
}
