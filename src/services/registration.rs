use crate::database::DatabaseError;
use crate::error::ApiError;

/// Why a challenge or event registration was refused.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("Registration for this {0} has closed")]
    Closed(&'static str),
    #[error("This {0} is full")]
    Full(&'static str),
    #[error("Already registered for this {0}")]
    AlreadyRegistered(&'static str),
    #[error("Not registered for this {0}")]
    NotRegistered(&'static str),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for RegistrationError {
    fn from(err: sqlx::Error) -> Self {
        RegistrationError::Database(err.into())
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::NotFound(message) => ApiError::not_found(message),
            RegistrationError::Database(db) => db.into(),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refusals_are_client_errors() {
        let err: ApiError = RegistrationError::Full("event").into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "This event is full");

        let err: ApiError = RegistrationError::NotFound("Challenge not found").into();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.message(), "Challenge not found");
    }
}
