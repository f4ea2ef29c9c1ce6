use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use playslot_collab::{AuthError, BookingError, DatabaseError, InvalidStatus, SlotError};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("A user with this email already exists")]
    DuplicateEmail,
    #[error("External session is invalid")]
    InvalidExternalSession,
    #[error("{0}")]
    IllegalTransition(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound {
                resource: _,
                identifier: _,
            } => StatusCode::NOT_FOUND,
            Self::Conflict {
                resource: _,
                field: _,
                value: _,
            } => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            // The register contract reports a taken email as a plain
            // bad request
            Self::DuplicateEmail => StatusCode::BAD_REQUEST,
            Self::InvalidExternalSession => StatusCode::UNAUTHORIZED,
            Self::IllegalTransition(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials | AuthError::InvalidSession => Self::InvalidCredentials,
            AuthError::DuplicateEmail => Self::DuplicateEmail,
            AuthError::InvalidExternalSession => Self::InvalidExternalSession,
            AuthError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<BookingError> for ServerError {
    fn from(value: BookingError) -> Self {
        match value {
            BookingError::InvalidTimeRange => Self::BadRequest(value.to_string()),
            BookingError::InvalidInput(e) => Self::BadRequest(e.to_string()),
            e @ BookingError::InvalidTransition { .. } => Self::IllegalTransition(e.to_string()),
            BookingError::Db(e) => e.into(),
        }
    }
}

impl From<SlotError> for ServerError {
    fn from(value: SlotError) -> Self {
        match value {
            SlotError::InvalidTimeRange => Self::BadRequest(value.to_string()),
            SlotError::InvalidInput(e) => Self::BadRequest(e.to_string()),
            e @ SlotError::InvalidTransition { .. } => Self::IllegalTransition(e.to_string()),
            SlotError::Db(e) => e.into(),
        }
    }
}

impl From<InvalidStatus> for ServerError {
    fn from(value: InvalidStatus) -> Self {
        Self::BadRequest(value.to_string())
    }
}
