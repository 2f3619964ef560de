pub mod auth;
pub mod response;
pub mod validated_json;
pub mod validated_query;

pub use auth::{admin_auth_middleware, jwt_auth_middleware, optional_auth_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult};
pub use validated_json::ValidatedJson;
pub use validated_query::ValidatedQuery;
