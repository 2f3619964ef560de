use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;

/// `?page=&limit=` as sent by clients; both optional.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    /// Page defaults to 1, limit to `default`, and limit is clamped to `[1, max]`.
    pub fn from_query(page: Option<i64>, limit: Option<i64>, default: i64, max: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default).clamp(1, max.max(1)),
        }
    }

    /// Uses the configured page-size bounds with a per-resource default.
    pub fn from_params(params: PageParams, default: i64) -> Self {
        let api = &crate::config::config().api;
        Self::from_query(params.page, params.limit, default, api.max_page_size)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn meta(&self, total: i64) -> PaginationMeta {
        PaginationMeta {
            page: self.page,
            limit: self.limit,
            total,
            pages: (total + self.limit - 1) / self.limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

/// `{ <key>: [...], pagination: { page, limit, total, pages } }`
#[derive(Debug)]
pub struct ListResponse<T> {
    key: &'static str,
    items: Vec<T>,
    pagination: PaginationMeta,
}

impl<T> ListResponse<T> {
    pub fn new(key: &'static str, items: Vec<T>, pagination: &Pagination, total: i64) -> Self {
        Self {
            key,
            items,
            pagination: pagination.meta(total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListResponse<U> {
        ListResponse {
            key: self.key,
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

impl<T: Serialize> Serialize for ListResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.key, &self.items)?;
        map.serialize_entry("pagination", &self.pagination)?;
        map.end()
    }
}
