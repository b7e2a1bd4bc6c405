//! Handlers for direct messages: the conversation list, single conversations,
//! sending and deleting.
//!
//! A conversation is not a stored entity. It is the set of all messages
//! between two users, grouped at query time.

use std::cmp::Ordering;
use std::collections::HashMap;

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, HttpResponse};
use chrono::{DateTime, NaiveDateTime, Utc};
use itertools::Itertools;
use log::error;
use rorm::fields::types::ForeignModelByField;
use rorm::FieldAccess;
use rorm::{and, insert, query, update, Database, Model};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::chan::{WsManagerChan, WsManagerMessage, WsMessage};
use crate::models::{pair_key, Account, Friendship, FriendshipStatus, Message, MessageInsert};
use crate::server::handler::{AccountResponse, ApiError, ApiErrorResponse, ApiResult, PathId, PathUuid};

/// The maximum length of a message
const MESSAGE_LENGTH_LIMIT: usize = 2048;
/// The number of characters of the last message shown in the conversation list
const PREVIEW_LENGTH: usize = 50;

/// A single direct message
///
/// The parameter `id` should be used to uniquely identify a message
#[derive(Serialize, ToSchema, Eq, Deserialize, Clone, Debug)]
pub struct MessageResponse {
    #[schema(example = 1337)]
    id: i64,
    sender: AccountResponse,
    #[schema(example = "Hello there!")]
    content: String,
    sent_at: DateTime<Utc>,
    /// Whether the receiver has opened the conversation since this message
    /// arrived
    is_read: bool,
}

impl Ord for MessageResponse {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sent_at.cmp(&other.sent_at)
    }
}

impl PartialOrd for MessageResponse {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MessageResponse {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// A single entry of the conversation list
#[derive(Serialize, ToSchema)]
pub struct ConversationResponse {
    partner: AccountResponse,
    /// The first `PREVIEW_LENGTH` characters of the most recent message
    #[schema(example = "Hello there!")]
    last_message: String,
    last_message_at: DateTime<Utc>,
    /// Whether the most recent message was sent by the executing user
    last_message_from_me: bool,
    /// Messages of the partner the executing user has not seen yet
    #[schema(example = 2)]
    unread: u64,
}

/// The conversation list of the executing user
///
/// `conversations` is sorted by the most recent message, newest first.
#[derive(Serialize, ToSchema)]
pub struct GetConversationsResponse {
    conversations: Vec<ConversationResponse>,
    #[schema(example = 5)]
    total_unread: u64,
}

/// Retrieve all conversations of the executing user
///
/// Every account the user has exchanged at least one message with shows up
/// with a preview of the most recent message and the count of unread messages
/// from that account.
#[utoipa::path(
    tag = "Messages",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the conversation list", body = GetConversationsResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/conversations")]
pub async fn get_conversations(
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<GetConversationsResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let mut messages: Vec<FlatMessage> = query!(&mut tx, Message)
        .condition(Message::F.sender.equals(uuid))
        .all()
        .await?
        .iter()
        .map(FlatMessage::from_model)
        .collect();
    messages.extend(
        query!(&mut tx, Message)
            .condition(Message::F.receiver.equals(uuid))
            .all()
            .await?
            .iter()
            .map(FlatMessage::from_model),
    );

    let summaries = fold_conversations(uuid, &messages);
    let total_unread = summaries.iter().map(|s| s.unread).sum();

    let mut conversations = Vec::new();
    for summary in summaries {
        let Some(partner) = query!(&mut tx, Account)
            .condition(Account::F.uuid.equals(summary.partner))
            .optional()
            .await?
        else {
            continue;
        };

        conversations.push(ConversationResponse {
            partner: AccountResponse {
                uuid: partner.uuid,
                email: partner.email,
                display_name: partner.display_name,
            },
            last_message: summary.last_message,
            last_message_at: DateTime::from_utc(summary.last_message_at, Utc),
            last_message_from_me: summary.last_message_from_me,
            unread: summary.unread,
        });
    }

    tx.commit().await?;

    Ok(Json(GetConversationsResponse {
        conversations,
        total_unread,
    }))
}

/// A single conversation
///
/// `messages` is sorted by `sent_at`, oldest first.
#[derive(Serialize, ToSchema)]
pub struct GetConversationResponse {
    partner: AccountResponse,
    messages: Vec<MessageResponse>,
}

/// Retrieve the conversation with another account
///
/// Only conversations with accepted friends can be opened. Opening a
/// conversation marks all unread messages of the partner as read, in the same
/// transaction that collects them.
#[utoipa::path(
    tag = "Messages",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the conversation", body = GetConversationResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[get("/conversations/{uuid}")]
pub async fn get_conversation(
    path: Path<PathUuid>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<GetConversationResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let partner = query!(&mut tx, Account)
        .condition(Account::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::InvalidUuid)?;

    // Conversations are only available between accepted friends
    match query!(&mut tx, Friendship)
        .condition(Friendship::F.pair.equals(&pair_key(uuid, partner.uuid)))
        .optional()
        .await?
    {
        Some(friendship) if friendship.status == FriendshipStatus::Accepted => {}
        _ => return Err(ApiError::MissingPrivileges),
    }

    // Everything the partner sent counts as seen now
    update!(&mut tx, Message)
        .condition(and!(
            Message::F.sender.equals(partner.uuid),
            Message::F.receiver.equals(uuid),
            Message::F.is_read.equals(false)
        ))
        .set(Message::F.is_read, true)
        .set(Message::F.read_at, Some(Utc::now().naive_utc()))
        .exec()
        .await?;

    let me = query!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    let mut messages = query!(&mut tx, Message)
        .condition(and!(
            Message::F.sender.equals(uuid),
            Message::F.receiver.equals(partner.uuid)
        ))
        .all()
        .await?;
    messages.extend(
        query!(&mut tx, Message)
            .condition(and!(
                Message::F.sender.equals(partner.uuid),
                Message::F.receiver.equals(uuid)
            ))
            .all()
            .await?,
    );

    tx.commit().await?;

    let partner_response = AccountResponse {
        uuid: partner.uuid,
        email: partner.email,
        display_name: partner.display_name,
    };
    let me_response = AccountResponse {
        uuid: me.uuid,
        email: me.email,
        display_name: me.display_name,
    };

    Ok(Json(GetConversationResponse {
        messages: messages
            .into_iter()
            .map(|m| {
                let sender = if *m.sender.key() == uuid {
                    me_response.clone()
                } else {
                    partner_response.clone()
                };
                MessageResponse {
                    id: m.id,
                    sender,
                    content: m.content,
                    sent_at: DateTime::from_utc(m.sent_at, Utc),
                    is_read: m.is_read,
                }
            })
            .sorted()
            .collect(),
        partner: partner_response,
    }))
}

/// The request to send a direct message
#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// The uuid of the account to send the message to
    receiver: Uuid,
    #[schema(example = "Hello there!")]
    content: String,
}

/// The response after sending a direct message
#[derive(Serialize, ToSchema)]
pub struct SendMessageResponse {
    #[schema(example = 1337)]
    id: i64,
}

/// Send a direct message
///
/// Messages can only be sent to accepted friends. The content is trimmed and
/// must not be empty afterwards. The receiver is notified via websocket if
/// they are connected.
#[utoipa::path(
    tag = "Messages",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The message has been sent", body = SendMessageResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = SendMessageRequest,
    security(("session_cookie" = []))
)]
#[post("/messages")]
pub async fn send_message(
    req: Json<SendMessageRequest>,
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<Json<SendMessageResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let content = req.content.trim();
    if content.is_empty() || content.chars().count() > MESSAGE_LENGTH_LIMIT {
        return Err(ApiError::InvalidContent);
    }

    let mut tx = db.start_transaction().await?;

    let receiver = query!(&mut tx, Account)
        .condition(Account::F.uuid.equals(req.receiver))
        .optional()
        .await?
        .ok_or(ApiError::InvalidUuid)?;

    // Messages can only be sent to accepted friends
    match query!(&mut tx, Friendship)
        .condition(Friendship::F.pair.equals(&pair_key(uuid, receiver.uuid)))
        .optional()
        .await?
    {
        Some(friendship) if friendship.status == FriendshipStatus::Accepted => {}
        _ => return Err(ApiError::MissingPrivileges),
    }

    let id = insert!(&mut tx, MessageInsert)
        .return_primary_key()
        .single(&MessageInsert {
            sender: ForeignModelByField::Key(uuid),
            receiver: ForeignModelByField::Key(receiver.uuid),
            content: content.to_string(),
            is_read: false,
            read_at: None,
        })
        .await?;

    let message = query!(&mut tx, Message)
        .condition(Message::F.id.equals(id))
        .optional()
        .await?
        .ok_or(ApiError::InternalServerError)?;

    let sender = query!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    tx.commit().await?;

    let notification = WsMessage::IncomingMessage {
        message: MessageResponse {
            id,
            sender: AccountResponse {
                uuid: sender.uuid,
                email: sender.email,
                display_name: sender.display_name,
            },
            content: message.content,
            sent_at: DateTime::from_utc(message.sent_at, Utc),
            is_read: message.is_read,
        },
    };

    if let Err(err) = ws_manager_chan
        .send(WsManagerMessage::SendMessage(receiver.uuid, notification))
        .await
    {
        error!("Could not send to ws manager chan: {err}");
    }

    Ok(Json(SendMessageResponse { id }))
}

/// Delete a direct message
///
/// Only the sender of a message may delete it. The row is removed, there is
/// no tombstone; the receiver simply stops seeing the message.
#[utoipa::path(
    tag = "Messages",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The message has been deleted"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathId),
    security(("session_cookie" = []))
)]
#[delete("/messages/{id}")]
pub async fn delete_message(
    path: Path<PathId>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let message = query!(&mut tx, Message)
        .condition(Message::F.id.equals(path.id))
        .optional()
        .await?
        .ok_or(ApiError::InvalidId)?;

    if *message.sender.key() != uuid {
        return Err(ApiError::MissingPrivileges);
    }

    rorm::delete!(&mut tx, Message).single(&message).await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// The number of unread messages of the executing user
#[derive(Serialize, ToSchema)]
pub struct UnreadCountResponse {
    #[schema(example = 5)]
    count: u64,
}

/// Retrieve the number of unread messages of the executing user
///
/// Counts over all conversations, for badge display.
#[utoipa::path(
    tag = "Messages",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the unread message count", body = UnreadCountResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/messages/unreadCount")]
pub async fn get_unread_count(
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<UnreadCountResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let unread = query!(db.as_ref(), (Message::F.id,))
        .condition(and!(
            Message::F.receiver.equals(uuid),
            Message::F.is_read.equals(false)
        ))
        .all()
        .await?;

    Ok(Json(UnreadCountResponse {
        count: unread.len() as u64,
    }))
}

/// A flat copy of a [Message] row.
///
/// The conversation folding below works on plain ids instead of foreign key
/// wrappers, so it stays testable without a database.
struct FlatMessage {
    id: i64,
    sender: Uuid,
    receiver: Uuid,
    content: String,
    sent_at: NaiveDateTime,
    is_read: bool,
}

impl FlatMessage {
    fn from_model(message: &Message) -> Self {
        Self {
            id: message.id,
            sender: *message.sender.key(),
            receiver: *message.receiver.key(),
            content: message.content.clone(),
            sent_at: message.sent_at,
            is_read: message.is_read,
        }
    }
}

/// One conversation of `user`, derived from the flat message list
struct ConversationSummary {
    partner: Uuid,
    last_message: String,
    last_message_at: NaiveDateTime,
    last_message_from_me: bool,
    unread: u64,
}

/// Cut `content` down to the first `PREVIEW_LENGTH` characters
fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_LENGTH {
        let mut preview: String = content.chars().take(PREVIEW_LENGTH).collect();
        preview.push_str("...");
        preview
    } else {
        content.to_string()
    }
}

/// Group all messages `user` takes part in into conversations.
///
/// For every partner the most recent message wins the preview and the unread
/// count covers the messages the partner sent that `user` has not seen.
/// The result is sorted by the most recent message, newest first.
fn fold_conversations(user: Uuid, messages: &[FlatMessage]) -> Vec<ConversationSummary> {
    let mut by_partner: HashMap<Uuid, Vec<&FlatMessage>> = HashMap::new();
    for message in messages {
        let partner = if message.sender == user {
            message.receiver
        } else {
            message.sender
        };
        by_partner.entry(partner).or_default().push(message);
    }

    by_partner
        .into_iter()
        .filter_map(|(partner, messages)| {
            let last = messages
                .iter()
                .max_by_key(|m| (m.sent_at, m.id))?;

            Some(ConversationSummary {
                partner,
                last_message: preview(&last.content),
                last_message_at: last.sent_at,
                last_message_from_me: last.sender == user,
                unread: messages
                    .iter()
                    .filter(|m| m.sender == partner && !m.is_read)
                    .count() as u64,
            })
        })
        .sorted_by(|a, b| b.last_message_at.cmp(&a.last_message_at))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDateTime, Utc};
    use uuid::Uuid;

    use super::{fold_conversations, preview, FlatMessage, PREVIEW_LENGTH};

    fn at(offset: i64) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::seconds(offset)
    }

    fn message(
        id: i64,
        sender: Uuid,
        receiver: Uuid,
        content: &str,
        offset: i64,
        is_read: bool,
    ) -> FlatMessage {
        FlatMessage {
            id,
            sender,
            receiver,
            content: content.to_string(),
            sent_at: at(offset),
            is_read,
        }
    }

    #[test]
    fn preview_keeps_short_messages() {
        assert_eq!(preview("hi"), "hi");
    }

    #[test]
    fn preview_truncates_long_messages() {
        let long = "x".repeat(PREVIEW_LENGTH + 1);

        let cut = preview(&long);
        assert_eq!(cut.chars().count(), PREVIEW_LENGTH + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        let long = "ä".repeat(PREVIEW_LENGTH);
        assert_eq!(preview(&long), long);
    }

    #[test]
    fn conversations_group_by_partner() {
        let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let messages = [
            message(1, alice, bob, "hi bob", 0, true),
            message(2, bob, alice, "hi alice", 1, true),
            message(3, carol, alice, "hey", 2, false),
        ];

        let conversations = fold_conversations(alice, &messages);
        assert_eq!(conversations.len(), 2);
    }

    #[test]
    fn conversations_are_sorted_by_most_recent_message() {
        let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let messages = [
            message(1, bob, alice, "old", 0, true),
            message(2, carol, alice, "newer", 5, true),
            message(3, alice, bob, "newest", 10, true),
        ];

        let conversations = fold_conversations(alice, &messages);
        assert_eq!(conversations[0].partner, bob);
        assert_eq!(conversations[0].last_message, "newest");
        assert!(conversations[0].last_message_from_me);
        assert_eq!(conversations[1].partner, carol);
        assert!(!conversations[1].last_message_from_me);
    }

    #[test]
    fn unread_counts_only_messages_of_the_partner() {
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let messages = [
            // alice's own unread messages at bob's side must not count
            message(1, alice, bob, "one", 0, false),
            message(2, bob, alice, "two", 1, false),
            message(3, bob, alice, "three", 2, false),
            message(4, bob, alice, "seen already", 3, true),
        ];

        let conversations = fold_conversations(alice, &messages);
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].unread, 2);
    }

    #[test]
    fn unread_is_zero_after_all_messages_are_read() {
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let messages = [
            message(1, bob, alice, "one", 0, true),
            message(2, bob, alice, "two", 1, true),
        ];

        let conversations = fold_conversations(alice, &messages);
        assert_eq!(conversations[0].unread, 0);

        // Folding again does not bring anything back
        let conversations = fold_conversations(alice, &messages);
        assert_eq!(conversations[0].unread, 0);
    }

    #[test]
    fn total_unread_is_the_sum_over_all_conversations() {
        let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let messages = [
            message(1, bob, alice, "one", 0, false),
            message(2, carol, alice, "two", 1, false),
            message(3, carol, alice, "three", 2, false),
        ];

        let conversations = fold_conversations(alice, &messages);
        let total: u64 = conversations.iter().map(|c| c.unread).sum();
        assert_eq!(total, 3);
    }
}
