//! Handlers for the friend graph: requests, the friend list, suggestions and
//! account search.

use std::collections::HashSet;

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path, Query};
use actix_web::{delete, get, post, HttpResponse};
use chrono::{DateTime, NaiveDateTime, Utc};
use itertools::Itertools;
use log::error;
use rorm::fields::types::ForeignModelByField;
use rorm::FieldAccess;
use rorm::{insert, query, update, Database, Model};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::chan::{WsManagerChan, WsManagerMessage, WsMessage};
use crate::models::{
    pair_key, Account, Friendship, FriendshipInsert, FriendshipStatus,
};
use crate::server::handler::{AccountResponse, ApiError, ApiErrorResponse, ApiResult, PathId};

/// The maximum number of friend suggestions a single request returns
const SUGGESTION_LIMIT: usize = 10;
/// The maximum number of search results a single request returns
const SEARCH_LIMIT: usize = 20;

/// The request of a new friendship
#[derive(Deserialize, ToSchema)]
pub struct CreateFriendRequest {
    /// The uuid of the account to send the request to
    uuid: Uuid,
}

/// Create a new friend request
///
/// Any existing relation between the pair, regardless of its state and of who
/// initiated it, makes this fail. A rejected request keeps blocking the pair
/// until one side removes the relation.
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Friend request has been created"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = CreateFriendRequest,
    security(("session_cookie" = []))
)]
#[post("/friends/request")]
pub async fn create_friend_request(
    req: Json<CreateFriendRequest>,
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    if uuid == req.uuid {
        return Err(ApiError::SelfFriendRequest);
    }

    let mut tx = db.start_transaction().await?;

    // Check if target exists
    let target = query!(&mut tx, Account)
        .condition(Account::F.uuid.equals(req.uuid))
        .optional()
        .await?
        .ok_or(ApiError::InvalidUuid)?;

    // Check if the pair is already in a relation, in either direction.
    // The unique pair column catches the race two concurrent requests open.
    if query!(&mut tx, (Friendship::F.id,))
        .condition(Friendship::F.pair.equals(&pair_key(uuid, target.uuid)))
        .optional()
        .await?
        .is_some()
    {
        return Err(ApiError::FriendshipAlreadyExists);
    }

    let id = insert!(&mut tx, FriendshipInsert)
        .return_primary_key()
        .single(&FriendshipInsert {
            pair: pair_key(uuid, target.uuid),
            from: ForeignModelByField::Key(uuid),
            to: ForeignModelByField::Key(target.uuid),
            status: FriendshipStatus::Pending,
            accepted_at: None,
        })
        .await?;

    let executing_account = query!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    tx.commit().await?;

    let notification = WsMessage::FriendRequestReceived {
        id,
        from: AccountResponse {
            uuid: executing_account.uuid,
            email: executing_account.email,
            display_name: executing_account.display_name,
        },
    };

    if let Err(err) = ws_manager_chan
        .send(WsManagerMessage::SendMessage(target.uuid, notification))
        .await
    {
        error!("Could not send to ws manager chan: {err}");
    }

    Ok(HttpResponse::Ok().finish())
}

/// Accept a friend request
///
/// Only the target of a pending request may accept it.
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Friend request has been accepted"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathId),
    security(("session_cookie" = []))
)]
#[post("/friends/{id}/accept")]
pub async fn accept_friend_request(
    path: Path<PathId>,
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let friendship = query!(&mut tx, Friendship)
        .condition(Friendship::F.id.equals(path.id))
        .optional()
        .await?
        .ok_or(ApiError::InvalidId)?;

    // A request is only visible to its target; everyone else gets the same
    // answer as for a missing row
    if friendship.status != FriendshipStatus::Pending || *friendship.to.key() != uuid {
        return Err(ApiError::InvalidId);
    }

    update!(&mut tx, Friendship)
        .condition(Friendship::F.id.equals(friendship.id))
        .set(Friendship::F.status, FriendshipStatus::Accepted)
        .set(Friendship::F.accepted_at, Some(Utc::now().naive_utc()))
        .exec()
        .await?;

    let executing_account = query!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    tx.commit().await?;

    let notification = WsMessage::FriendRequestAccepted {
        id: friendship.id,
        by: AccountResponse {
            uuid: executing_account.uuid,
            email: executing_account.email,
            display_name: executing_account.display_name,
        },
    };

    if let Err(err) = ws_manager_chan
        .send(WsManagerMessage::SendMessage(
            *friendship.from.key(),
            notification,
        ))
        .await
    {
        error!("Could not send to ws manager chan: {err}");
    }

    Ok(HttpResponse::Ok().finish())
}

/// Reject a friend request
///
/// Only the target of a pending request may reject it. The row is retained:
/// the pair stays blocked for new requests until one side removes it.
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Friend request has been rejected"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathId),
    security(("session_cookie" = []))
)]
#[post("/friends/{id}/reject")]
pub async fn reject_friend_request(
    path: Path<PathId>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let friendship = query!(&mut tx, Friendship)
        .condition(Friendship::F.id.equals(path.id))
        .optional()
        .await?
        .ok_or(ApiError::InvalidId)?;

    if friendship.status != FriendshipStatus::Pending || *friendship.to.key() != uuid {
        return Err(ApiError::InvalidId);
    }

    update!(&mut tx, Friendship)
        .condition(Friendship::F.id.equals(friendship.id))
        .set(Friendship::F.status, FriendshipStatus::Rejected)
        .exec()
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// Retract a friend request that has not been answered yet
///
/// Only the sender of a pending request may retract it. The row is deleted,
/// so a new request for the pair becomes possible again.
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Friend request has been retracted"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathId),
    security(("session_cookie" = []))
)]
#[delete("/friends/requests/{id}")]
pub async fn cancel_friend_request(
    path: Path<PathId>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let friendship = query!(&mut tx, Friendship)
        .condition(Friendship::F.id.equals(path.id))
        .optional()
        .await?
        .ok_or(ApiError::InvalidId)?;

    if friendship.status != FriendshipStatus::Pending || *friendship.from.key() != uuid {
        return Err(ApiError::InvalidId);
    }

    rorm::delete!(&mut tx, Friendship).single(&friendship).await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// Remove a friend relation
///
/// Both sides may remove the relation, whatever state it is in. The row is
/// deleted, so a new request for the pair becomes possible again.
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The friend relation has been removed"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathId),
    security(("session_cookie" = []))
)]
#[delete("/friends/{id}")]
pub async fn delete_friend(
    path: Path<PathId>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let friendship = query!(&mut tx, Friendship)
        .condition(Friendship::F.id.equals(path.id))
        .optional()
        .await?
        .ok_or(ApiError::InvalidId)?;

    if *friendship.from.key() != uuid && *friendship.to.key() != uuid {
        return Err(ApiError::InvalidId);
    }

    rorm::delete!(&mut tx, Friendship).single(&friendship).await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// A single accepted friend
#[derive(Serialize, ToSchema)]
pub struct FriendResponse {
    #[schema(example = 1337)]
    id: i64,
    online: bool,
    #[serde(flatten)]
    account: AccountResponse,
    /// When the friendship was accepted
    friends_since: DateTime<Utc>,
    #[schema(example = 3)]
    mutual_friends: u64,
}

/// A single pending friend request, incoming or outgoing
#[derive(Serialize, ToSchema)]
pub struct FriendRequestResponse {
    #[schema(example = 1337)]
    id: i64,
    /// For incoming requests the sender, for outgoing requests the target
    #[serde(flatten)]
    account: AccountResponse,
    requested_at: DateTime<Utc>,
    #[schema(example = 3)]
    mutual_friends: u64,
}

/// The friend list of the executing user
#[derive(Serialize, ToSchema)]
pub struct GetFriendsResponse {
    friends: Vec<FriendResponse>,
    pending: Vec<FriendRequestResponse>,
    sent: Vec<FriendRequestResponse>,
}

/// Retrieve the friend list of the executing user
///
/// `friends` holds all accepted relations, annotated with the number of
/// mutual friends and the websocket online state. `pending` holds incoming,
/// `sent` outgoing requests that have not been answered yet.
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the friend list", body = GetFriendsResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/friends")]
pub async fn get_friends(
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<Json<GetFriendsResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let rows: Vec<FriendshipRow> = query!(&mut tx, Friendship)
        .all()
        .await?
        .iter()
        .map(FriendshipRow::from_model)
        .collect();

    let mut friends = Vec::new();
    let mut pending = Vec::new();
    let mut sent = Vec::new();

    for row in rows.iter().filter(|r| r.touches(uuid)) {
        let other = row.other_side(uuid);

        let Some(account) = query!(&mut tx, Account)
            .condition(Account::F.uuid.equals(other))
            .optional()
            .await?
        else {
            continue;
        };

        let account = AccountResponse {
            uuid: account.uuid,
            email: account.email,
            display_name: account.display_name,
        };
        let mutual_friends = mutual_friend_count(uuid, other, &rows);

        match row.status {
            FriendshipStatus::Accepted => friends.push(FriendResponse {
                id: row.id,
                online: false,
                account,
                friends_since: DateTime::from_utc(
                    row.accepted_at.unwrap_or(row.requested_at),
                    Utc,
                ),
                mutual_friends,
            }),
            FriendshipStatus::Pending => {
                let entry = FriendRequestResponse {
                    id: row.id,
                    account,
                    requested_at: DateTime::from_utc(row.requested_at, Utc),
                    mutual_friends,
                };
                if row.to == uuid {
                    pending.push(entry);
                } else {
                    sent.push(entry);
                }
            }
            FriendshipStatus::Rejected | FriendshipStatus::Blocked => {}
        }
    }

    tx.commit().await?;

    // Annotate the accepted friends with their websocket online state
    let friend_uuids = friends.iter().map(|f| f.account.uuid).collect();
    let (otx, orx) = oneshot::channel();

    if let Err(err) = ws_manager_chan
        .send(WsManagerMessage::RetrieveOnlineState(friend_uuids, otx))
        .await
    {
        error!("Could not send to ws manager chan: {err}");
        return Err(ApiError::InternalServerError);
    }

    let online_states = orx.await.map_err(|err| {
        error!("Error receiving message from ws manager chan: {err}");
        ApiError::InternalServerError
    })?;

    for (friend, online) in friends.iter_mut().zip(online_states) {
        friend.online = online;
    }

    Ok(Json(GetFriendsResponse {
        friends,
        pending,
        sent,
    }))
}

/// A single account in search results or friend suggestions
#[derive(Serialize, ToSchema)]
pub struct UserSearchResponse {
    uuid: Uuid,
    #[schema(example = "herbert@example.com")]
    email: String,
    #[schema(example = "Herbert")]
    display_name: String,
    #[schema(example = "/images/herbert.png")]
    profile_image: Option<String>,
    is_friend: bool,
    /// Whether this account has sent the executing user a request that is
    /// still unanswered
    has_pending_request: bool,
    /// Whether the executing user has sent this account a request that is
    /// still unanswered
    has_sent_request: bool,
    #[schema(example = 3)]
    mutual_friends: u64,
}

/// The friend suggestions for the executing user
#[derive(Serialize, ToSchema)]
pub struct GetSuggestionsResponse {
    suggestions: Vec<UserSearchResponse>,
}

/// Retrieve friend suggestions for the executing user
///
/// Suggested are friends of the user's friends. Accounts that already share a
/// relation with the user, whatever its state, are skipped. Results are
/// ordered by the number of mutual friends.
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the friend suggestions", body = GetSuggestionsResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/friends/suggestions")]
pub async fn get_friend_suggestions(
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<GetSuggestionsResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let rows: Vec<FriendshipRow> = query!(&mut tx, Friendship)
        .all()
        .await?
        .iter()
        .map(FriendshipRow::from_model)
        .collect();

    let mut suggestions = Vec::new();
    for candidate in friend_suggestions(uuid, &rows) {
        let Some(account) = query!(&mut tx, Account)
            .condition(Account::F.uuid.equals(candidate))
            .optional()
            .await?
        else {
            continue;
        };

        suggestions.push(UserSearchResponse {
            uuid: account.uuid,
            email: account.email,
            display_name: account.display_name,
            profile_image: account.profile_image,
            is_friend: false,
            has_pending_request: false,
            has_sent_request: false,
            mutual_friends: mutual_friend_count(uuid, candidate, &rows),
        });
    }

    tx.commit().await?;

    Ok(Json(GetSuggestionsResponse { suggestions }))
}

/// The query parameters of an account search
#[derive(Deserialize, IntoParams)]
pub struct SearchAccountsQuery {
    /// Substring to match email addresses and display names against
    #[param(example = "herbert")]
    query: String,
}

/// The results of an account search
#[derive(Serialize, ToSchema)]
pub struct SearchAccountsResponse {
    results: Vec<UserSearchResponse>,
}

/// Search accounts by email address or display name
///
/// The match is a case insensitive substring match. Every result is annotated
/// with its relation to the executing user. An empty query yields an empty
/// result list.
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns all matching accounts", body = SearchAccountsResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(SearchAccountsQuery),
    security(("session_cookie" = []))
)]
#[get("/friends/search")]
pub async fn search_accounts(
    search: Query<SearchAccountsQuery>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<SearchAccountsResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let needle = search.query.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(Json(SearchAccountsResponse {
            results: Vec::new(),
        }));
    }

    let mut tx = db.start_transaction().await?;

    let rows: Vec<FriendshipRow> = query!(&mut tx, Friendship)
        .all()
        .await?
        .iter()
        .map(FriendshipRow::from_model)
        .collect();

    let accounts = query!(&mut tx, Account).all().await?;

    tx.commit().await?;

    let results = accounts
        .into_iter()
        .filter(|a| a.uuid != uuid)
        .filter(|a| {
            a.email.to_lowercase().contains(&needle)
                || a.display_name.to_lowercase().contains(&needle)
        })
        .take(SEARCH_LIMIT)
        .map(|account| {
            let flags = relationship_flags(uuid, account.uuid, &rows);
            UserSearchResponse {
                mutual_friends: mutual_friend_count(uuid, account.uuid, &rows),
                uuid: account.uuid,
                email: account.email,
                display_name: account.display_name,
                profile_image: account.profile_image,
                is_friend: flags.is_friend,
                has_pending_request: flags.has_pending_request,
                has_sent_request: flags.has_sent_request,
            }
        })
        .collect();

    Ok(Json(SearchAccountsResponse { results }))
}

/// A flat copy of a [Friendship] row.
///
/// The graph computations below work on plain ids instead of foreign key
/// wrappers, so they stay testable without a database.
struct FriendshipRow {
    id: i64,
    from: Uuid,
    to: Uuid,
    status: FriendshipStatus,
    requested_at: NaiveDateTime,
    accepted_at: Option<NaiveDateTime>,
}

impl FriendshipRow {
    fn from_model(friendship: &Friendship) -> Self {
        Self {
            id: friendship.id,
            from: *friendship.from.key(),
            to: *friendship.to.key(),
            status: friendship.status,
            requested_at: friendship.requested_at,
            accepted_at: friendship.accepted_at,
        }
    }

    fn touches(&self, user: Uuid) -> bool {
        self.from == user || self.to == user
    }

    fn other_side(&self, user: Uuid) -> Uuid {
        if self.from == user {
            self.to
        } else {
            self.from
        }
    }
}

/// The relation of one account to another, as shown in search results
struct RelationshipFlags {
    is_friend: bool,
    has_pending_request: bool,
    has_sent_request: bool,
}

/// Collect the ids of all accepted friends of `user`
fn accepted_friend_ids(user: Uuid, rows: &[FriendshipRow]) -> HashSet<Uuid> {
    rows.iter()
        .filter(|r| r.status == FriendshipStatus::Accepted && r.touches(user))
        .map(|r| r.other_side(user))
        .collect()
}

/// Count the accounts that are accepted friends of both `a` and `b`
fn mutual_friend_count(a: Uuid, b: Uuid, rows: &[FriendshipRow]) -> u64 {
    let friends_of_a = accepted_friend_ids(a, rows);
    let friends_of_b = accepted_friend_ids(b, rows);

    friends_of_a.intersection(&friends_of_b).count() as u64
}

/// Compute friend suggestions for `user`: accepted friends of the user's
/// accepted friends.
///
/// The user itself and every account that already shares a relation with the
/// user are excluded, whatever state that relation is in. Results are ordered
/// by the number of mutual friends and capped at `SUGGESTION_LIMIT`.
fn friend_suggestions(user: Uuid, rows: &[FriendshipRow]) -> Vec<Uuid> {
    let related: HashSet<Uuid> = rows
        .iter()
        .filter(|r| r.touches(user))
        .map(|r| r.other_side(user))
        .collect();

    accepted_friend_ids(user, rows)
        .into_iter()
        .flat_map(|friend| accepted_friend_ids(friend, rows))
        .filter(|candidate| *candidate != user && !related.contains(candidate))
        .unique()
        .sorted_by_key(|candidate| {
            (
                std::cmp::Reverse(mutual_friend_count(user, *candidate, rows)),
                *candidate,
            )
        })
        .take(SUGGESTION_LIMIT)
        .collect()
}

/// Determine how `other` relates to `user`
fn relationship_flags(user: Uuid, other: Uuid, rows: &[FriendshipRow]) -> RelationshipFlags {
    RelationshipFlags {
        is_friend: rows.iter().any(|r| {
            r.status == FriendshipStatus::Accepted && r.touches(user) && r.other_side(user) == other
        }),
        has_pending_request: rows.iter().any(|r| {
            r.status == FriendshipStatus::Pending && r.from == other && r.to == user
        }),
        has_sent_request: rows.iter().any(|r| {
            r.status == FriendshipStatus::Pending && r.from == user && r.to == other
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{
        accepted_friend_ids, friend_suggestions, mutual_friend_count, relationship_flags,
        FriendshipRow, SUGGESTION_LIMIT,
    };
    use crate::models::FriendshipStatus;

    fn row(id: i64, from: Uuid, to: Uuid, status: FriendshipStatus) -> FriendshipRow {
        FriendshipRow {
            id,
            from,
            to,
            status,
            requested_at: Utc::now().naive_utc(),
            accepted_at: None,
        }
    }

    #[test]
    fn accepted_friends_ignore_direction() {
        let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rows = [
            row(1, alice, bob, FriendshipStatus::Accepted),
            row(2, carol, alice, FriendshipStatus::Accepted),
        ];

        let friends = accepted_friend_ids(alice, &rows);
        assert!(friends.contains(&bob));
        assert!(friends.contains(&carol));
        assert_eq!(friends.len(), 2);
    }

    #[test]
    fn pending_rows_are_not_friends() {
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let rows = [row(1, alice, bob, FriendshipStatus::Pending)];

        assert!(accepted_friend_ids(alice, &rows).is_empty());
        assert!(accepted_friend_ids(bob, &rows).is_empty());
    }

    #[test]
    fn mutual_friend_count_is_symmetric() {
        let (alice, bob, carol, dave) = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        // carol and dave are friends with both alice and bob
        let rows = [
            row(1, alice, carol, FriendshipStatus::Accepted),
            row(2, carol, bob, FriendshipStatus::Accepted),
            row(3, dave, alice, FriendshipStatus::Accepted),
            row(4, bob, dave, FriendshipStatus::Accepted),
            row(5, alice, bob, FriendshipStatus::Pending),
        ];

        assert_eq!(mutual_friend_count(alice, bob, &rows), 2);
        assert_eq!(
            mutual_friend_count(alice, bob, &rows),
            mutual_friend_count(bob, alice, &rows)
        );
    }

    #[test]
    fn suggestions_are_friends_of_friends() {
        let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rows = [
            row(1, alice, bob, FriendshipStatus::Accepted),
            row(2, bob, carol, FriendshipStatus::Accepted),
        ];

        assert_eq!(friend_suggestions(alice, &rows), vec![carol]);
        assert_eq!(friend_suggestions(carol, &rows), vec![alice]);
        // bob is friends with everyone already
        assert!(friend_suggestions(bob, &rows).is_empty());
    }

    #[test]
    fn suggestions_skip_any_existing_relation() {
        let (alice, bob, carol, dave) = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        let rows = [
            row(1, alice, bob, FriendshipStatus::Accepted),
            row(2, bob, carol, FriendshipStatus::Accepted),
            row(3, bob, dave, FriendshipStatus::Accepted),
            // carol already rejected alice, dave is blocked
            row(4, alice, carol, FriendshipStatus::Rejected),
            row(5, dave, alice, FriendshipStatus::Blocked),
        ];

        assert!(friend_suggestions(alice, &rows).is_empty());
    }

    #[test]
    fn suggestions_are_capped() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let mut rows = vec![row(0, alice, bob, FriendshipStatus::Accepted)];
        for i in 0..2 * SUGGESTION_LIMIT {
            rows.push(row(
                i as i64 + 1,
                bob,
                Uuid::new_v4(),
                FriendshipStatus::Accepted,
            ));
        }

        assert_eq!(friend_suggestions(alice, &rows).len(), SUGGESTION_LIMIT);
    }

    #[test]
    fn search_flags_reflect_a_sent_request() {
        let (carol, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let rows = [row(1, carol, bob, FriendshipStatus::Pending)];

        // carol searching for bob
        let flags = relationship_flags(carol, bob, &rows);
        assert!(!flags.is_friend);
        assert!(flags.has_sent_request);
        assert!(!flags.has_pending_request);

        // bob searching for carol sees the mirror image
        let flags = relationship_flags(bob, carol, &rows);
        assert!(!flags.is_friend);
        assert!(!flags.has_sent_request);
        assert!(flags.has_pending_request);
    }

    #[test]
    fn search_flags_after_accept() {
        let (carol, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let rows = [row(1, carol, bob, FriendshipStatus::Accepted)];

        let flags = relationship_flags(carol, bob, &rows);
        assert!(flags.is_friend);
        assert!(!flags.has_sent_request);
        assert!(!flags.has_pending_request);
    }
}
