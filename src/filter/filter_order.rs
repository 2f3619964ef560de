use serde_json::Value;

use super::error::FilterError;
use super::types::{is_valid_identifier, FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Accepts `"created_at desc, title"`, `["created_at desc", "title"]`
    /// or `{ "created_at": "desc" }`.
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let infos = match order {
            Value::Null => vec![],
            Value::String(s) => Self::parse_order_string(s)?,
            Value::Array(arr) => {
                let mut out = Vec::new();
                for v in arr {
                    let s = v
                        .as_str()
                        .ok_or_else(|| FilterError::InvalidOperatorData("order entries must be strings".to_string()))?;
                    out.extend(Self::parse_order_string(s)?);
                }
                out
            }
            Value::Object(obj) => {
                let mut out = Vec::new();
                for (k, v) in obj {
                    out.push(FilterOrderInfo {
                        column: k.clone(),
                        sort: Self::parse_direction(v.as_str().unwrap_or("asc"))?,
                    });
                }
                out
            }
            _ => return Err(FilterError::InvalidOperatorData("Unsupported order format".to_string())),
        };

        for info in &infos {
            if !is_valid_identifier(&info.column) {
                return Err(FilterError::InvalidColumn(info.column.clone()));
            }
        }
        Ok(infos)
    }

    fn parse_order_string(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let sort = Self::parse_direction(it.next().unwrap_or("asc"))?;
                out.push(FilterOrderInfo { column: col.to_string(), sort });
            }
        }
        Ok(out)
    }

    fn parse_direction(dir: &str) -> Result<SortDirection, FilterError> {
        if dir.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else if dir.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else {
            Err(FilterError::InvalidOperatorData(format!("Unknown sort direction: {}", dir)))
        }
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
