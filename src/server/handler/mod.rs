//! This module holds the handler of amity

use std::fmt::{Display, Formatter};

use actix_toolbox::tb_middleware::actix_session::{SessionGetError, SessionInsertError};
use actix_web::body::BoxBody;
use actix_web::HttpResponse;
use log::{debug, error, info, trace};
use serde::{Deserialize, Serialize};
use serde_repr::Serialize_repr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub use crate::server::handler::accounts::*;
pub use crate::server::handler::auth::*;
pub use crate::server::handler::friends::*;
pub use crate::server::handler::health::*;
pub use crate::server::handler::messages::*;
pub use crate::server::handler::posts::*;
pub use crate::server::handler::version::*;
pub use crate::server::handler::websocket::*;

pub mod accounts;
pub mod auth;
pub mod friends;
pub mod health;
pub mod messages;
pub mod posts;
pub mod version;
pub mod websocket;

/// The result that is used throughout the complete api.
pub type ApiResult<T> = Result<T, ApiError>;

/// Path parameter with a single uuid
#[derive(Deserialize, IntoParams)]
pub struct PathUuid {
    /// The uuid of the addressed entity
    pub(crate) uuid: Uuid,
}

/// Path parameter with a single numeric id
#[derive(Deserialize, IntoParams)]
pub struct PathId {
    /// The id of the addressed entity
    #[param(example = 1337)]
    pub(crate) id: i64,
}

#[derive(Serialize_repr, ToSchema)]
#[repr(u16)]
pub(crate) enum ApiStatusCode {
    Unauthenticated = 1000,
    LoginFailed = 1001,
    EmailAlreadyOccupied = 1002,
    InvalidEmail = 1003,
    InvalidDisplayName = 1004,
    InvalidPassword = 1005,
    InvalidContent = 1006,
    SelfFriendRequest = 1007,
    FriendshipAlreadyExists = 1008,
    MissingPrivileges = 1009,
    InvalidUuid = 1010,
    InvalidId = 1011,
    NotFound = 1012,
    EmptyJson = 1013,
    InvalidJson = 1014,
    PayloadOverflow = 1015,
    SessionCorrupt = 1016,

    InternalServerError = 2000,
    DatabaseError = 2001,
    SessionError = 2002,
}

/// Representation of an error response
#[derive(Serialize, ToSchema)]
pub struct ApiErrorResponse {
    #[schema(example = "Error message is here")]
    message: String,
    #[schema(example = 1000)]
    status_code: ApiStatusCode,
}

impl ApiErrorResponse {
    fn new(status_code: ApiStatusCode, message: String) -> Self {
        Self {
            message,
            status_code,
        }
    }
}

/// This enum holds all possible error types that can occur in the API
#[derive(Debug)]
pub enum ApiError {
    /// The user is not allowed to access the resource
    Unauthenticated,
    /// Login was not successful. Can be caused by incorrect email / password
    LoginFailed,
    /// The email address is already in use by another account
    EmailAlreadyOccupied,
    /// Empty or malformed email address
    InvalidEmail,
    /// Empty display name
    InvalidDisplayName,
    /// Empty password
    InvalidPassword,
    /// Empty (after trimming) or too long text content
    InvalidContent,
    /// A friend request where requester and target are the same account
    SelfFriendRequest,
    /// A friendship or friend request between the pair already exists
    FriendshipAlreadyExists,
    /// The executing user is not allowed to perform the operation
    MissingPrivileges,
    /// The requested uuid does not point to an existing account
    InvalidUuid,
    /// The requested id does not point to an entity of the executing user
    InvalidId,
    /// The requested resource does not exist
    NotFound,
    /// Update request without any fields to update
    EmptyJson,
    /// Received json could not be deserialized
    InvalidJson,
    /// The payload size limit was exceeded
    PayloadOverflow,
    /// Session is in an invalid state
    SessionCorrupt,
    /// An error occurred while retrieving data from the session
    SessionGet(SessionGetError),
    /// An error occurred while inserting data into the session
    SessionInsert(SessionInsertError),
    /// Unspecified internal error
    InternalServerError,
    /// All errors that are thrown by the database
    DatabaseError(rorm::Error),
    /// An invalid hash is retrieved from the database
    InvalidHash(argon2::password_hash::Error),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthenticated => write!(f, "Unauthenticated"),
            ApiError::LoginFailed => write!(f, "The login was not successful"),
            ApiError::EmailAlreadyOccupied => write!(f, "Email address is already in use"),
            ApiError::InvalidEmail => write!(f, "Invalid email address"),
            ApiError::InvalidDisplayName => write!(f, "Invalid display name"),
            ApiError::InvalidPassword => write!(f, "Invalid password"),
            ApiError::InvalidContent => write!(f, "Invalid content"),
            ApiError::SelfFriendRequest => {
                write!(f, "Friend requests to your own account are not possible")
            }
            ApiError::FriendshipAlreadyExists => {
                write!(f, "A friendship or friend request already exists")
            }
            ApiError::MissingPrivileges => write!(f, "Missing privileges"),
            ApiError::InvalidUuid => write!(f, "Invalid uuid"),
            ApiError::InvalidId => write!(f, "Invalid id"),
            ApiError::NotFound => write!(f, "Not found"),
            ApiError::EmptyJson => write!(f, "Request is missing fields to process"),
            ApiError::InvalidJson => write!(f, "Json could not be deserialized"),
            ApiError::PayloadOverflow => write!(f, "Payload exceeded the size limit"),
            ApiError::SessionCorrupt => write!(f, "Session is corrupt"),
            ApiError::SessionGet(_) | ApiError::SessionInsert(_) => {
                write!(f, "Session error occurred")
            }
            ApiError::InternalServerError => write!(f, "Internal server error"),
            ApiError::DatabaseError(_) => write!(f, "Database error occurred"),
            ApiError::InvalidHash(_) => write!(f, "Internal server error"),
        }
    }
}

impl actix_web::ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            ApiError::Unauthenticated => {
                trace!("Unauthenticated");

                HttpResponse::BadRequest().json(ApiErrorResponse::new(
                    ApiStatusCode::Unauthenticated,
                    self.to_string(),
                ))
            }
            ApiError::LoginFailed => {
                debug!("Login request failed");

                HttpResponse::BadRequest().json(ApiErrorResponse::new(
                    ApiStatusCode::LoginFailed,
                    self.to_string(),
                ))
            }
            ApiError::EmailAlreadyOccupied => {
                debug!("Email address is already occupied");

                HttpResponse::BadRequest().json(ApiErrorResponse::new(
                    ApiStatusCode::EmailAlreadyOccupied,
                    self.to_string(),
                ))
            }
            ApiError::InvalidEmail => HttpResponse::BadRequest().json(ApiErrorResponse::new(
                ApiStatusCode::InvalidEmail,
                self.to_string(),
            )),
            ApiError::InvalidDisplayName => HttpResponse::BadRequest().json(
                ApiErrorResponse::new(ApiStatusCode::InvalidDisplayName, self.to_string()),
            ),
            ApiError::InvalidPassword => HttpResponse::BadRequest().json(ApiErrorResponse::new(
                ApiStatusCode::InvalidPassword,
                self.to_string(),
            )),
            ApiError::InvalidContent => HttpResponse::BadRequest().json(ApiErrorResponse::new(
                ApiStatusCode::InvalidContent,
                self.to_string(),
            )),
            ApiError::SelfFriendRequest => HttpResponse::BadRequest().json(ApiErrorResponse::new(
                ApiStatusCode::SelfFriendRequest,
                self.to_string(),
            )),
            ApiError::FriendshipAlreadyExists => {
                debug!("Friendship already exists");

                HttpResponse::BadRequest().json(ApiErrorResponse::new(
                    ApiStatusCode::FriendshipAlreadyExists,
                    self.to_string(),
                ))
            }
            ApiError::MissingPrivileges => {
                debug!("Missing privileges");

                HttpResponse::BadRequest().json(ApiErrorResponse::new(
                    ApiStatusCode::MissingPrivileges,
                    self.to_string(),
                ))
            }
            ApiError::InvalidUuid => HttpResponse::BadRequest().json(ApiErrorResponse::new(
                ApiStatusCode::InvalidUuid,
                self.to_string(),
            )),
            ApiError::InvalidId => HttpResponse::BadRequest().json(ApiErrorResponse::new(
                ApiStatusCode::InvalidId,
                self.to_string(),
            )),
            ApiError::NotFound => HttpResponse::NotFound().json(ApiErrorResponse::new(
                ApiStatusCode::NotFound,
                self.to_string(),
            )),
            ApiError::EmptyJson => HttpResponse::BadRequest().json(ApiErrorResponse::new(
                ApiStatusCode::EmptyJson,
                self.to_string(),
            )),
            ApiError::InvalidJson => HttpResponse::BadRequest().json(ApiErrorResponse::new(
                ApiStatusCode::InvalidJson,
                self.to_string(),
            )),
            ApiError::PayloadOverflow => HttpResponse::BadRequest().json(ApiErrorResponse::new(
                ApiStatusCode::PayloadOverflow,
                self.to_string(),
            )),
            ApiError::SessionCorrupt => {
                info!("Corrupt session");

                HttpResponse::BadRequest().json(ApiErrorResponse::new(
                    ApiStatusCode::SessionCorrupt,
                    self.to_string(),
                ))
            }
            ApiError::SessionGet(err) => {
                error!("Error retrieving data from the session: {err}");

                HttpResponse::InternalServerError().json(ApiErrorResponse::new(
                    ApiStatusCode::SessionError,
                    self.to_string(),
                ))
            }
            ApiError::SessionInsert(err) => {
                error!("Error inserting data into the session: {err}");

                HttpResponse::InternalServerError().json(ApiErrorResponse::new(
                    ApiStatusCode::SessionError,
                    self.to_string(),
                ))
            }
            ApiError::InternalServerError => HttpResponse::InternalServerError().json(
                ApiErrorResponse::new(ApiStatusCode::InternalServerError, self.to_string()),
            ),
            ApiError::DatabaseError(err) => {
                error!("Database error: {err}");

                HttpResponse::InternalServerError().json(ApiErrorResponse::new(
                    ApiStatusCode::DatabaseError,
                    self.to_string(),
                ))
            }
            ApiError::InvalidHash(err) => {
                error!("Got invalid password hash from db: {err}");

                HttpResponse::InternalServerError().json(ApiErrorResponse::new(
                    ApiStatusCode::InternalServerError,
                    self.to_string(),
                ))
            }
        }
    }
}

impl From<rorm::Error> for ApiError {
    fn from(value: rorm::Error) -> Self {
        Self::DatabaseError(value)
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::InvalidHash(value)
    }
}

impl From<SessionGetError> for ApiError {
    fn from(value: SessionGetError) -> Self {
        Self::SessionGet(value)
    }
}

impl From<SessionInsertError> for ApiError {
    fn from(value: SessionInsertError) -> Self {
        Self::SessionInsert(value)
    }
}
