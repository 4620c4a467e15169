use actix_web::{
    error,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use derive_more::Display;
use log::error;

/// Every failure a request can end with. The message is what the client
/// sees in `{"detail": ...}`, except for `Internal` which never leaks details.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    InvalidFilter(String),

    #[display(fmt = "{}", _0)]
    InvalidColumn(String),

    #[display(fmt = "{}", _0)]
    UnsupportedOperation(String),

    #[display(fmt = "{}", _0)]
    InvalidPath(String),

    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "{}", _0)]
    Gone(String),

    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "{}", _0)]
    ServiceUnavailable(String),

    #[display(fmt = "Internal server error")]
    Internal,
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    detail: String,
}

impl error::ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        response.insert_header(ContentType::json());
        if let ApiError::Unauthorized(_) = self {
            response.insert_header(("WWW-Authenticate", "Bearer"));
        }
        response.json(ErrorBody {
            detail: self.to_string(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            ApiError::InvalidFilter(_)
            | ApiError::InvalidColumn(_)
            | ApiError::UnsupportedOperation(_)
            | ApiError::InvalidPath(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        error!("database error: {:?}", err);
        ApiError::Internal
    }
}

impl From<sqlx::migrate::MigrateError> for ApiError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        error!("migration error: {:?}", err);
        ApiError::Internal
    }
}
