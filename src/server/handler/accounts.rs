//! All handlers for the account endpoints live in here

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, put, HttpResponse};
use argon2::password_hash::{Error, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::NaiveDate;
use log::error;
use rand::thread_rng;
use rorm::{insert, query, update, Database, Model};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::chan::{WsManagerChan, WsManagerMessage};
use crate::models::{
    Account, AccountInsert, Friendship, Message, Post, PostComment, PostLike,
};
use crate::server::handler::{ApiError, ApiErrorResponse, ApiResult, PathUuid};
use rorm::FieldAccess;

/// The content to register a new account
#[derive(Debug, Deserialize, ToSchema)]
pub struct AccountRegistrationRequest {
    #[schema(example = "herbert@example.com")]
    email: String,
    #[schema(example = "Herbert")]
    display_name: String,
    #[schema(example = "super-secure-password")]
    password: String,
    /// Optional date of birth for the profile
    date_of_birth: Option<NaiveDate>,
}

/// Register a new account
#[utoipa::path(
    tag = "Accounts",
    responses(
        (status = 200, description = "Account got created"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = AccountRegistrationRequest,
)]
#[post("/api/v1/accounts/register")]
pub async fn register_account(
    req: Json<AccountRegistrationRequest>,
    db: Data<Database>,
) -> ApiResult<HttpResponse> {
    let mut tx = db.start_transaction().await?;

    if req.email.is_empty() || !req.email.contains('@') {
        return Err(ApiError::InvalidEmail);
    }

    if req.display_name.is_empty() {
        return Err(ApiError::InvalidDisplayName);
    }

    if req.password.is_empty() {
        return Err(ApiError::InvalidPassword);
    }

    if query!(&mut tx, (Account::F.uuid,))
        .condition(Account::F.email.equals(&req.email))
        .optional()
        .await?
        .is_some()
    {
        return Err(ApiError::EmailAlreadyOccupied);
    }

    let salt = SaltString::generate(&mut thread_rng());
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)?
        .to_string();

    let uuid = Uuid::new_v4();
    insert!(&mut tx, AccountInsert)
        .single(&AccountInsert {
            uuid,
            email: req.email.clone(),
            display_name: req.display_name.clone(),
            password_hash,
            date_of_birth: req.date_of_birth,
            profile_image: None,
            last_login: None,
        })
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// The account data
#[derive(Serialize, Deserialize, ToSchema, Eq, Ord, PartialOrd, PartialEq, Clone, Debug)]
pub struct AccountResponse {
    pub(crate) uuid: Uuid,
    #[schema(example = "herbert@example.com")]
    pub(crate) email: String,
    #[schema(example = "Herbert")]
    pub(crate) display_name: String,
}

/// The profile data of the logged-in account
#[derive(Serialize, ToSchema)]
pub struct AccountMeResponse {
    pub(crate) uuid: Uuid,
    #[schema(example = "herbert@example.com")]
    pub(crate) email: String,
    #[schema(example = "Herbert")]
    pub(crate) display_name: String,
    pub(crate) date_of_birth: Option<NaiveDate>,
    #[schema(example = "/images/herbert.png")]
    pub(crate) profile_image: Option<String>,
}

/// Returns the account that is currently logged-in
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the account data of the current user", body = AccountMeResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/accounts/me")]
pub async fn get_me(db: Data<Database>, session: Session) -> ApiResult<Json<AccountMeResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let account = query!(db.as_ref(), Account)
        .condition(Account::F.uuid.equals(uuid))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    Ok(Json(AccountMeResponse {
        uuid: account.uuid,
        email: account.email,
        display_name: account.display_name,
        date_of_birth: account.date_of_birth,
        profile_image: account.profile_image,
    }))
}

/// Deletes the currently logged-in account
///
/// As user references restrict deletes, everything the account owns or takes
/// part in is removed first: comments, likes, messages (both directions),
/// friendships (both directions) and posts, all in a single transaction.
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Deleted the currently logged-in account"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[delete("/accounts/me")]
pub async fn delete_me(
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    rorm::delete!(&mut tx, PostComment)
        .condition(PostComment::F.user.equals(uuid))
        .await?;
    rorm::delete!(&mut tx, PostLike)
        .condition(PostLike::F.user.equals(uuid))
        .await?;
    rorm::delete!(&mut tx, Message)
        .condition(Message::F.sender.equals(uuid))
        .await?;
    rorm::delete!(&mut tx, Message)
        .condition(Message::F.receiver.equals(uuid))
        .await?;
    rorm::delete!(&mut tx, Friendship)
        .condition(Friendship::F.from.equals(uuid))
        .await?;
    rorm::delete!(&mut tx, Friendship)
        .condition(Friendship::F.to.equals(uuid))
        .await?;
    // Likes and comments of other users on these posts go down with them
    rorm::delete!(&mut tx, Post)
        .condition(Post::F.author.equals(uuid))
        .await?;
    rorm::delete!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .await?;

    tx.commit().await?;

    // Clear the current session
    session.purge();

    // Close open websocket connections
    if let Err(err) = ws_manager_chan
        .send(WsManagerMessage::CloseSocket(uuid))
        .await
    {
        error!("Could not send to ws manager chan: {err}");
    }

    Ok(HttpResponse::Ok().finish())
}

/// The set password request data
///
/// The parameter `new_password` must not be empty
#[derive(Deserialize, ToSchema)]
pub struct SetPasswordRequest {
    #[schema(example = "super-secure-password")]
    old_password: String,
    #[schema(example = "ultra-secure-password!!11!")]
    new_password: String,
}

/// Sets a new password for the currently logged-in account
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "New password has been set"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = SetPasswordRequest,
    security(("session_cookie" = []))
)]
#[post("/accounts/me/setPassword")]
pub async fn set_password(
    req: Json<SetPasswordRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    if req.new_password.is_empty() {
        return Err(ApiError::InvalidPassword);
    }

    let mut tx = db.start_transaction().await?;

    let (pw_hash,) = query!(&mut tx, (Account::F.password_hash,))
        .condition(Account::F.uuid.equals(uuid))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    Argon2::default()
        .verify_password(req.old_password.as_bytes(), &PasswordHash::new(&pw_hash)?)
        .map_err(|e| match e {
            Error::Password => ApiError::LoginFailed,
            _ => ApiError::InvalidHash(e),
        })?;

    let salt = SaltString::generate(&mut thread_rng());
    let password_hash = Argon2::default()
        .hash_password(req.new_password.as_bytes(), &salt)?
        .to_string();

    update!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .set(Account::F.password_hash, password_hash)
        .exec()
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// Update account request data
///
/// All parameter are optional, but at least one of them is required.
#[derive(Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    #[schema(example = "herbert@example.com")]
    email: Option<String>,
    #[schema(example = "Heeeerbeeeert")]
    display_name: Option<String>,
    date_of_birth: Option<NaiveDate>,
    #[schema(example = "/images/herbert.png")]
    profile_image: Option<String>,
}

/// Updates the currently logged-in account
///
/// All parameter are optional, but at least one of them is required.
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Account has been updated"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = UpdateAccountRequest,
    security(("session_cookie" = []))
)]
#[put("/accounts/me")]
pub async fn update_me(
    req: Json<UpdateAccountRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let UpdateAccountRequest {
        email,
        display_name,
        date_of_birth,
        profile_image,
    } = req.into_inner();

    let mut tx = db.start_transaction().await?;

    if let Some(email) = &email {
        if email.is_empty() || !email.contains('@') {
            return Err(ApiError::InvalidEmail);
        }

        if query!(&mut tx, (Account::F.uuid,))
            .condition(Account::F.email.equals(email))
            .optional()
            .await?
            .is_some()
        {
            return Err(ApiError::EmailAlreadyOccupied);
        }
    }

    if let Some(display_name) = &display_name {
        if display_name.is_empty() {
            return Err(ApiError::InvalidDisplayName);
        }
    }

    update!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .begin_dyn_set()
        .set_if(Account::F.email, email)
        .set_if(Account::F.display_name, display_name)
        .set_if(Account::F.date_of_birth, date_of_birth.map(Some))
        .set_if(Account::F.profile_image, profile_image.map(Some))
        .finish_dyn_set()
        .map_err(|_| ApiError::EmptyJson)?
        .exec()
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// Retrieve details for an account by uuid
///
/// As email addresses are changeable, accounts are identified by uuids, which
/// are used throughout the API.
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the requested account data", body = AccountResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = [])))]
#[get("/accounts/{uuid}")]
pub async fn lookup_account_by_uuid(
    req: Path<PathUuid>,
    db: Data<Database>,
) -> ApiResult<Json<AccountResponse>> {
    let account = query!(db.as_ref(), Account)
        .condition(Account::F.uuid.equals(req.uuid))
        .optional()
        .await?
        .ok_or(ApiError::InvalidUuid)?;

    Ok(Json(AccountResponse {
        uuid: req.uuid,
        email: account.email,
        display_name: account.display_name,
    }))
}

/// The request to lookup an account by its email address
#[derive(Deserialize, ToSchema)]
pub struct LookupAccountEmailRequest {
    #[schema(example = "herbert@example.com")]
    email: String,
}

/// Retrieve details for an account by its email address
///
/// Email addresses can be changed, so don't cache them to do lookups. If you
/// receive an email address from a user, convert it with this endpoint to an
/// uuid. Those are used in the database to uniquely identify a user and can't
/// be changed, just deleted.
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the requested account data", body = AccountResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = LookupAccountEmailRequest,
    security(("session_cookie" = []))
)]
#[post("/accounts/lookup")]
pub async fn lookup_account_by_email(
    req: Json<LookupAccountEmailRequest>,
    db: Data<Database>,
) -> ApiResult<Json<AccountResponse>> {
    let account = query!(db.as_ref(), Account)
        .condition(Account::F.email.equals(&req.email))
        .optional()
        .await?
        .ok_or(ApiError::InvalidEmail)?;

    Ok(Json(AccountResponse {
        uuid: account.uuid,
        email: account.email,
        display_name: account.display_name,
    }))
}
