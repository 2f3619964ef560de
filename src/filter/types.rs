use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    In,
    Between,
    Any,
    All,
    Size,
}

impl FilterOp {
    pub fn parse(op_key: &str) -> Option<Self> {
        Some(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$between" => FilterOp::Between,
            "$any" => FilterOp::Any,
            "$all" => FilterOp::All,
            "$size" => FilterOp::Size,
            _ => return None,
        })
    }
}

/// Everything a list query can carry: conditions, ordering and a window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    #[serde(rename = "where")]
    pub where_clause: Option<Value>,
    pub order: Option<Value>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl FilterData {
    pub fn new(where_clause: Value) -> Self {
        Self {
            where_clause: Some(where_clause),
            ..Default::default()
        }
    }

    pub fn order(mut self, order: impl Into<Value>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn window(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

/// A positional parameter and the SQL type it is bound as.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Comparison operands. Typed from the JSON value; ids and timestamps
    /// arrive as strings and bind as `uuid` / `timestamptz`.
    Value(Value),
    /// `$like` / `$ilike` patterns, always `text`.
    Text(String),
    /// `$any` / `$all` operands, one `text[]`.
    TextArray(Vec<String>),
}

impl PartialEq<Value> for SqlParam {
    fn eq(&self, other: &Value) -> bool {
        match self {
            SqlParam::Value(value) => value == other,
            SqlParam::Text(text) => other.as_str() == Some(text.as_str()),
            SqlParam::TextArray(items) => other.as_array().is_some_and(|values| {
                values.len() == items.len() && values.iter().zip(items).all(|(v, item)| v.as_str() == Some(item.as_str()))
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// Identifiers are interpolated into SQL, so only plain snake_case names pass.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escapes the LIKE metacharacters so user text matches literally.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Wraps user text for a substring `$ilike`.
pub fn like_pattern(text: &str) -> String {
    format!("%{}%", escape_like(text))
}
