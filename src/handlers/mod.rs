// Handlers grouped by who may call them:
// public (anonymous, optional token) → protected (valid token) → elevated (administrator).
pub mod elevated;
pub mod protected;
pub mod public;

use uuid::Uuid;

use crate::error::ApiError;

/// Parses a `:id` path segment; anything malformed is reported as a miss.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(format!("{} not found", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_are_not_found() {
        let err = parse_id("not-a-uuid", "Project").unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.message(), "Project not found");
        assert!(parse_id(&Uuid::new_v4().to_string(), "Project").is_ok());
    }
}
