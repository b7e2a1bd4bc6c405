//! This module holds the server definition

use std::net::SocketAddr;

use actix_toolbox::tb_middleware::{
    setup_logging_mw, DBSessionStore, LoggingMiddlewareConfig, PersistentSession,
    SessionMiddleware,
};
use actix_web::cookie::time::Duration;
use actix_web::cookie::Key;
use actix_web::http::StatusCode;
use actix_web::middleware::{Compress, ErrorHandlers};
use actix_web::web::{scope, Data, JsonConfig, PayloadConfig};
use actix_web::{App, HttpServer};
use log::info;
use rorm::Database;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::chan::WsManagerChan;
use crate::config::Config;
use crate::server::error::StartServerError;
use crate::server::handler::{
    accept_friend_request, cancel_friend_request, create_comment, create_friend_request,
    create_post, delete_friend, delete_me, delete_message, get_conversation, get_conversations,
    get_feed, get_friend_suggestions, get_friends, get_me, get_unread_count, health, login,
    logout, lookup_account_by_email, lookup_account_by_uuid, register_account, reject_friend_request,
    search_accounts, send_message, set_password, toggle_like, update_me, version, websocket,
};
use crate::server::middleware::{handle_not_found, json_extractor_error, AuthenticationRequired};
use crate::server::swagger::ApiDoc;

pub mod error;
pub mod handler;
pub mod middleware;
pub mod swagger;

/// Start the amity server
///
/// **Parameter**:
/// - `config`: Reference to a [Config] struct
/// - `db`: [Database]
/// - `ws_manager_chan`: [WsManagerChan] : The channel to manage websocket connections
pub async fn start_server(
    config: &Config,
    db: Database,
    ws_manager_chan: WsManagerChan,
) -> Result<(), StartServerError> {
    let s_addr = SocketAddr::new(config.server.listen_address, config.server.listen_port);

    info!("Starting to listen on {}", s_addr);

    let key = Key::generate();

    HttpServer::new(move || {
        App::new()
            .app_data(PayloadConfig::default())
            .app_data(JsonConfig::default().error_handler(json_extractor_error))
            .app_data(Data::new(db.clone()))
            .app_data(Data::new(ws_manager_chan.clone()))
            .wrap(setup_logging_mw(LoggingMiddlewareConfig::default()))
            .wrap(
                SessionMiddleware::builder(DBSessionStore::new(db.clone()), key.clone())
                    .session_lifecycle(
                        PersistentSession::default().session_ttl(Duration::days(14)),
                    )
                    .cookie_name("id".to_string())
                    .build(),
            )
            .wrap(Compress::default())
            .wrap(ErrorHandlers::new().handler(StatusCode::NOT_FOUND, handle_not_found))
            .service(SwaggerUi::new("/docs/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()))
            .service(register_account)
            .service(version)
            .service(scope("/api/v1/auth").service(login).service(logout))
            .service(
                scope("/api/v1")
                    .wrap(AuthenticationRequired)
                    .service(get_me)
                    .service(update_me)
                    .service(delete_me)
                    .service(set_password)
                    .service(lookup_account_by_email)
                    .service(lookup_account_by_uuid)
                    .service(get_friends)
                    .service(get_friend_suggestions)
                    .service(search_accounts)
                    .service(create_friend_request)
                    .service(accept_friend_request)
                    .service(reject_friend_request)
                    .service(cancel_friend_request)
                    .service(delete_friend)
                    .service(get_conversations)
                    .service(get_conversation)
                    .service(send_message)
                    .service(delete_message)
                    .service(get_unread_count)
                    .service(get_feed)
                    .service(create_post)
                    .service(toggle_like)
                    .service(create_comment)
                    .service(health)
                    .service(websocket),
            )
    })
    .bind(s_addr)?
    .run()
    .await?;

    Ok(())
}
