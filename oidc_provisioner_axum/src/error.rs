use http::StatusCode;
use oidc_provisioner::{CoordinationError, OidcError};

/// Helper trait for converting errors to a standard response error format
pub trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

fn status_for(error: &CoordinationError) -> StatusCode {
    match error {
        CoordinationError::Authentication(_) => StatusCode::UNAUTHORIZED,
        CoordinationError::InvalidState(_) => StatusCode::BAD_REQUEST,
        CoordinationError::OidcError(err) => match err {
            OidcError::Authentication(_) => StatusCode::UNAUTHORIZED,
            OidcError::MalformedUserInfo(_) | OidcError::StateMismatch(_) => {
                StatusCode::BAD_REQUEST
            }
            OidcError::FetchUserInfo(_) | OidcError::TokenExchange(_) => StatusCode::BAD_GATEWAY,
            OidcError::Configuration(_) | OidcError::Utils(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl<T> IntoResponseError<T> for Result<T, CoordinationError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| (status_for(&e), e.to_string()))
    }
}
