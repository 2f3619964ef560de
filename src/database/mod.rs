pub mod manager;
pub mod models;
pub mod pagination;
pub mod query_builder;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use pagination::{ListResponse, PageParams, Pagination, PaginationMeta};
pub use repository::Repository;
