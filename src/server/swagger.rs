//! This module holds the definition of the swagger declaration

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::server::handler;

struct CookieSecurity;

impl Modify for CookieSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("id"))),
            )
        }
    }
}

/// Helper struct for the openapi definitions.
#[derive(OpenApi)]
#[openapi(
    paths(
        handler::register_account,
        handler::get_me,
        handler::update_me,
        handler::delete_me,
        handler::set_password,
        handler::lookup_account_by_uuid,
        handler::lookup_account_by_email,
        handler::login,
        handler::logout,
        handler::version,
        handler::create_friend_request,
        handler::accept_friend_request,
        handler::reject_friend_request,
        handler::cancel_friend_request,
        handler::delete_friend,
        handler::get_friends,
        handler::get_friend_suggestions,
        handler::search_accounts,
        handler::get_conversations,
        handler::get_conversation,
        handler::send_message,
        handler::delete_message,
        handler::get_unread_count,
        handler::get_feed,
        handler::create_post,
        handler::toggle_like,
        handler::create_comment,
        handler::health,
        handler::websocket,
    ),
    components(schemas(
        handler::ApiErrorResponse,
        handler::ApiStatusCode,
        handler::AccountRegistrationRequest,
        handler::AccountResponse,
        handler::AccountMeResponse,
        handler::SetPasswordRequest,
        handler::UpdateAccountRequest,
        handler::LookupAccountEmailRequest,
        handler::LoginRequest,
        handler::VersionResponse,
        handler::CreateFriendRequest,
        handler::FriendResponse,
        handler::FriendRequestResponse,
        handler::GetFriendsResponse,
        handler::UserSearchResponse,
        handler::GetSuggestionsResponse,
        handler::SearchAccountsResponse,
        handler::MessageResponse,
        handler::ConversationResponse,
        handler::GetConversationsResponse,
        handler::GetConversationResponse,
        handler::SendMessageRequest,
        handler::SendMessageResponse,
        handler::UnreadCountResponse,
        handler::CreatePostRequest,
        handler::CreatePostResponse,
        handler::CommentResponse,
        handler::PostResponse,
        handler::GetFeedResponse,
        handler::CreateCommentRequest,
        handler::HealthResponse,
    )),
    modifiers(&CookieSecurity)
)]
pub struct ApiDoc;
