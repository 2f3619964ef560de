use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{is_valid_identifier, FilterOp, FilterWhereInfo, SqlParam};

/// Compiles a JSON condition tree into a SQL predicate plus positional params.
///
/// Placeholders are numbered from `starting_param_index + 1` and stay
/// contiguous through nested `$and` / `$or` / `$not` groups.
///
/// Pattern and array operands are pinned to `text` / `text[]` so user text
/// that happens to look like an id or a date still compares as text.
pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<SqlParam>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build(where_data)?;
        Ok((sql, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    /// Returns an empty string when there is nothing to filter on.
    fn build(&mut self, where_data: &Value) -> Result<String, FilterError> {
        match where_data {
            Value::Null => Ok(String::new()),
            Value::Object(obj) => Ok(self.build_object(obj)?.join(" AND ")),
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn build_object(&mut self, obj: &Map<String, Value>) -> Result<Vec<String>, FilterError> {
        let mut sql_conditions = Vec::new();
        for (key, value) in obj {
            if key.starts_with('$') {
                sql_conditions.push(self.build_logical(key, value)?);
            } else {
                for condition in Self::parse_field_condition(key, value)? {
                    sql_conditions.push(self.build_sql_condition(&condition)?);
                }
            }
        }
        Ok(sql_conditions)
    }

    fn build_group(&mut self, value: &Value) -> Result<String, FilterError> {
        let obj = value
            .as_object()
            .ok_or_else(|| FilterError::InvalidOperatorData("Logical group members must be objects".to_string()))?;
        let parts = self.build_object(obj)?;
        if parts.is_empty() {
            Ok("TRUE".to_string())
        } else {
            Ok(format!("({})", parts.join(" AND ")))
        }
    }

    fn build_logical(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    // Empty conjunction is true, empty disjunction is false
                    return Ok(if op == "$and" { "TRUE" } else { "FALSE" }.to_string());
                }
                let mut sql_parts = Vec::with_capacity(arr.len());
                for v in arr {
                    sql_parts.push(self.build_group(v)?);
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", sql_parts.join(joiner)))
            }
            "$not" => Ok(format!("NOT {}", self.build_group(value)?)),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        if !is_valid_identifier(field) {
            return Err(FilterError::InvalidColumn(field.to_string()));
        }

        match value {
            Value::Object(obj) => obj
                .iter()
                .map(|(op_key, op_val)| {
                    let operator = FilterOp::parse(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    Ok(FilterWhereInfo {
                        column: field.to_string(),
                        operator,
                        data: op_val.clone(),
                    })
                })
                .collect(),
            // Implicit equality: { field: value }
            _ => Ok(vec![FilterWhereInfo {
                column: field.to_string(),
                operator: FilterOp::Eq,
                data: value.clone(),
            }]),
        }
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", condition.column);
        let data = &condition.data;

        let sql = match condition.operator {
            FilterOp::Eq if data.is_null() => format!("{} IS NULL", quoted_column),
            FilterOp::Eq => format!("{} = {}", quoted_column, self.param(data)),
            FilterOp::Ne if data.is_null() => format!("{} IS NOT NULL", quoted_column),
            FilterOp::Ne => format!("{} <> {}", quoted_column, self.param(data)),
            FilterOp::Gt => format!("{} > {}", quoted_column, self.scalar_param(data, "$gt")?),
            FilterOp::Gte => format!("{} >= {}", quoted_column, self.scalar_param(data, "$gte")?),
            FilterOp::Lt => format!("{} < {}", quoted_column, self.scalar_param(data, "$lt")?),
            FilterOp::Lte => format!("{} <= {}", quoted_column, self.scalar_param(data, "$lte")?),
            FilterOp::Like => format!("{} LIKE {}", quoted_column, self.string_param(data, "$like")?),
            FilterOp::ILike => format!("{} ILIKE {}", quoted_column, self.string_param(data, "$ilike")?),
            FilterOp::In => match data {
                Value::Array(values) if values.is_empty() => "FALSE".to_string(),
                Value::Array(values) => {
                    let params = self.params(values);
                    format!("{} IN ({})", quoted_column, params.join(", "))
                }
                _ => format!("{} = {}", quoted_column, self.param(data)),
            },
            FilterOp::Between => match data {
                Value::Array(values) if values.len() == 2 => {
                    let low = self.param(&values[0]);
                    let high = self.param(&values[1]);
                    format!("{} BETWEEN {} AND {}", quoted_column, low, high)
                }
                _ => {
                    return Err(FilterError::InvalidOperatorData(
                        "$between requires exactly 2 values".to_string(),
                    ))
                }
            },
            FilterOp::Any => match data {
                Value::Array(values) if values.is_empty() => "FALSE".to_string(),
                _ => format!("{} && {}::text[]", quoted_column, self.text_array_param(data, "$any")?),
            },
            FilterOp::All => match data {
                Value::Array(values) if values.is_empty() => "TRUE".to_string(),
                _ => format!("{} @> {}::text[]", quoted_column, self.text_array_param(data, "$all")?),
            },
            FilterOp::Size => {
                if !data.is_u64() {
                    return Err(FilterError::InvalidOperatorData(
                        "$size requires a non-negative integer".to_string(),
                    ));
                }
                format!("COALESCE(array_length({}, 1), 0) = {}", quoted_column, self.param(data))
            }
        };

        Ok(sql)
    }

    fn scalar_param(&mut self, data: &Value, op: &str) -> Result<String, FilterError> {
        match data {
            Value::Number(_) | Value::String(_) => Ok(self.param(data)),
            _ => Err(FilterError::InvalidOperatorData(format!("{} requires a number, date or string", op))),
        }
    }

    fn string_param(&mut self, data: &Value, op: &str) -> Result<String, FilterError> {
        match data {
            Value::String(pattern) => Ok(self.push(SqlParam::Text(pattern.clone()))),
            _ => Err(FilterError::InvalidOperatorData(format!("{} requires a string pattern", op))),
        }
    }

    /// A single string or an array of strings, bound as one `text[]`.
    fn text_array_param(&mut self, data: &Value, op: &str) -> Result<String, FilterError> {
        let items = match data {
            Value::String(item) => vec![item.clone()],
            Value::Array(values) => values
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires strings", op)))?,
            _ => return Err(FilterError::InvalidOperatorData(format!("{} requires strings", op))),
        };
        Ok(self.push(SqlParam::TextArray(items)))
    }

    fn params(&mut self, values: &[Value]) -> Vec<String> {
        values.iter().map(|v| self.param(v)).collect()
    }

    fn param(&mut self, value: &Value) -> String {
        self.push(SqlParam::Value(value.clone()))
    }

    fn push(&mut self, param: SqlParam) -> String {
        self.param_values.push(param);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn implicit_equality_and_null() {
        let (sql, params) = FilterWhere::generate(&json!({ "status": "active", "deadline": null }), 0).unwrap();
        assert_eq!(sql, "\"deadline\" IS NULL AND \"status\" = $1");
        assert_eq!(params, vec![json!("active")]);
    }

    #[test]
    fn nested_groups_keep_numbering_contiguous() {
        let where_data = json!({
            "is_public": true,
            "$or": [
                { "title": { "$ilike": "%a%" } },
                { "description": { "$ilike": "%b%" } }
            ],
            "tags": { "$any": ["rust", "go"] }
        });
        let (sql, params) = FilterWhere::generate(&where_data, 0).unwrap();
        assert_eq!(
            sql,
            "((\"title\" ILIKE $1) OR (\"description\" ILIKE $2)) AND \"is_public\" = $3 AND \"tags\" && $4::text[]"
        );
        assert_eq!(params.len(), 4);
        assert_eq!(params[3], SqlParam::TextArray(vec!["rust".into(), "go".into()]));
    }

    #[test]
    fn starting_index_is_respected() {
        let (sql, _) = FilterWhere::generate(&json!({ "featured": true }), 3).unwrap();
        assert_eq!(sql, "\"featured\" = $4");
    }

    #[test]
    fn not_and_between() {
        let (sql, params) = FilterWhere::generate(
            &json!({ "$not": { "status": "draft" }, "hours_spent": { "$between": [1, 5] } }),
            0,
        )
        .unwrap();
        assert_eq!(sql, "NOT (\"status\" = $1) AND \"hours_spent\" BETWEEN $2 AND $3");
        assert_eq!(params, vec![json!("draft"), json!(1), json!(5)]);
    }

    #[test]
    fn id_and_date_shaped_text_stays_text() {
        let id = "6f1c2b1e-9d5a-4c3e-8b7a-2f0e1d3c4b5a";
        let (sql, params) = FilterWhere::generate(
            &json!({ "tags": { "$all": [id, "2024-01-01T00:00:00Z"] }, "title": { "$ilike": id } }),
            0,
        )
        .unwrap();
        assert_eq!(sql, "\"tags\" @> $1::text[] AND \"title\" ILIKE $2");
        assert_eq!(
            params,
            vec![
                SqlParam::TextArray(vec![id.to_string(), "2024-01-01T00:00:00Z".to_string()]),
                SqlParam::Text(id.to_string()),
            ]
        );
    }

    #[test]
    fn array_operators_need_strings() {
        assert!(matches!(
            FilterWhere::generate(&json!({ "tags": { "$any": [1, 2] } }), 0),
            Err(FilterError::InvalidOperatorData(_))
        ));
        let (sql, _) = FilterWhere::generate(&json!({ "tags": { "$any": [] } }), 0).unwrap();
        assert_eq!(sql, "FALSE");
    }

    #[test]
    fn empty_in_matches_nothing() {
        let (sql, params) = FilterWhere::generate(&json!({ "id": { "$in": [] } }), 0).unwrap();
        assert_eq!(sql, "FALSE");
        assert!(params.is_empty());
    }

    #[test]
    fn rejects_bad_columns_and_operators() {
        assert!(matches!(
            FilterWhere::generate(&json!({ "name\"; --": 1 }), 0),
            Err(FilterError::InvalidColumn(_))
        ));
        assert!(matches!(
            FilterWhere::generate(&json!({ "name": { "$regex": "x" } }), 0),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(matches!(
            FilterWhere::generate(&json!({ "$xor": [] }), 0),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(FilterWhere::validate(&json!("1=1")).is_err());
    }
}
