use actix_web::{error, HttpResponse};
use actix_web::http::StatusCode;
use derive_more::{Display, Error};
use log::error;
use crate::server::database::store::StoreError;
use crate::server::model::MessageResponse;

#[derive(Debug, Display, Error)]
pub(crate) enum CustomError {
    #[display("server is busy")]
    ServerIsBusy,
    #[display("{message}")]
    BadRequest { message: String },
    #[display("Transición no válida de '{from}' a '{to}'")]
    InvalidTransition { from: String, to: String },
    #[display("{message}")]
    Unauthorized { message: String },
    #[display("{message}")]
    Forbidden { message: String },
    #[display("{message}")]
    ResourceNotFound { message: String },
    /// raw driver message, surfaced as is
    #[display("{message}")]
    DbError { message: String },
    #[display("timeout occurred")]
    Timeout,
}

impl CustomError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        CustomError::BadRequest { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        CustomError::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        CustomError::Forbidden { message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CustomError::ResourceNotFound { message: message.into() }
    }
}

impl error::ResponseError for CustomError {
    fn status_code(&self) -> StatusCode {
        match *self {
            CustomError::BadRequest { .. } | CustomError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            CustomError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            CustomError::Forbidden { .. } => StatusCode::FORBIDDEN,
            CustomError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            CustomError::ServerIsBusy => StatusCode::SERVICE_UNAVAILABLE,
            CustomError::DbError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CustomError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(MessageResponse::new(self.to_string()))
    }
}

impl From<StoreError> for CustomError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation { message } => CustomError::BadRequest { message },
            StoreError::CheckViolation { message } => CustomError::BadRequest { message },
            StoreError::PoolExhausted => CustomError::ServerIsBusy,
            StoreError::Timeout => CustomError::Timeout,
            e => {
                error!("database error, {}", e);
                CustomError::DbError { message: e.to_string() }
            }
        }
    }
}

impl From<validator::ValidationErrors> for CustomError {
    fn from(e: validator::ValidationErrors) -> Self {
        // report the first violated rule with its own message
        let message = e
            .field_errors()
            .values()
            .flat_map(|errors| errors.iter())
            .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| e.to_string());
        CustomError::BadRequest { message }
    }
}

/// Map a unique-index rejection to a domain message, pass everything else through.
pub(crate) fn unique_as(message: &str) -> impl FnOnce(StoreError) -> CustomError + '_ {
    move |e| match e {
        StoreError::UniqueViolation { .. } => CustomError::bad_request(message),
        e => e.into(),
    }
}
