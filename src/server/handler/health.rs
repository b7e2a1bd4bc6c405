use actix_web::get;
use actix_web::web::{Data, Json};
use log::error;
use rorm::{query, Database, Model};
use serde::Serialize;
use tokio::sync::oneshot;
use utoipa::ToSchema;

use crate::chan::{WsManagerChan, WsManagerMessage};
use crate::models::Account;
use crate::server::handler::{ApiError, ApiErrorResponse, ApiResult};

/// The health data of this server
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = 1337)]
    registered_accounts: u64,
    #[schema(example = 31337)]
    open_connections: u64,
}

/// Request health data from this server.
///
/// `registered_accounts` are the currently registered user accounts on the server
/// `open_connections` are the currently open websocket connections
#[utoipa::path(
    tag = "Server status",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Health data of this server", body = HealthResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/health")]
pub async fn health(
    db: Data<Database>,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<Json<HealthResponse>> {
    let accounts = query!(db.as_ref(), (Account::F.uuid,)).all().await?;

    let (tx, rx) = oneshot::channel();

    if let Err(err) = ws_manager_chan
        .send(WsManagerMessage::RetrieveWsCount(tx))
        .await
    {
        error!("Could not send to ws manager chan: {err}");
        return Err(ApiError::InternalServerError);
    }

    let connections = rx.await.map_err(|err| {
        error!("Error receiving message from ws manager chan: {err}");
        ApiError::InternalServerError
    })?;

    Ok(Json(HealthResponse {
        registered_accounts: accounts.len() as u64,
        open_connections: connections,
    }))
}
