//! Handlers for the post feed: creating posts, likes and comments.

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, HttpResponse};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use rorm::fields::types::ForeignModelByField;
use rorm::FieldAccess;
use rorm::{and, insert, query, Database, Model};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    Account, Post, PostComment, PostCommentInsert, PostInsert, PostLike, PostLikeInsert,
};
use crate::server::handler::{AccountResponse, ApiError, ApiErrorResponse, ApiResult, PathId};

/// The maximum length of a post title
const TITLE_LENGTH_LIMIT: usize = 255;
/// The maximum length of a post body
const POST_LENGTH_LIMIT: usize = 2048;
/// The maximum length of a comment
const COMMENT_LENGTH_LIMIT: usize = 1024;

/// The request to create a new post
#[derive(Deserialize, ToSchema)]
pub struct CreatePostRequest {
    #[schema(example = "Hello world")]
    title: String,
    #[schema(example = "My first post!")]
    content: String,
}

/// The response after creating a new post
#[derive(Serialize, ToSchema)]
pub struct CreatePostResponse {
    #[schema(example = 1337)]
    id: i64,
}

/// Create a new post in the feed
#[utoipa::path(
    tag = "Feed",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The post has been created", body = CreatePostResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = CreatePostRequest,
    security(("session_cookie" = []))
)]
#[post("/posts")]
pub async fn create_post(
    req: Json<CreatePostRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<CreatePostResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let title = req.title.trim();
    let content = req.content.trim();
    if title.is_empty() || title.chars().count() > TITLE_LENGTH_LIMIT {
        return Err(ApiError::InvalidContent);
    }
    if content.is_empty() || content.chars().count() > POST_LENGTH_LIMIT {
        return Err(ApiError::InvalidContent);
    }

    let id = insert!(db.as_ref(), PostInsert)
        .return_primary_key()
        .single(&PostInsert {
            author: ForeignModelByField::Key(uuid),
            title: title.to_string(),
            content: content.to_string(),
        })
        .await?;

    Ok(Json(CreatePostResponse { id }))
}

/// A single comment below a post
#[derive(Serialize, ToSchema)]
pub struct CommentResponse {
    #[schema(example = 1337)]
    id: i64,
    author: AccountResponse,
    #[schema(example = "Nice post!")]
    content: String,
    created_at: DateTime<Utc>,
}

/// A single post of the feed
#[derive(Serialize, ToSchema)]
pub struct PostResponse {
    #[schema(example = 1337)]
    id: i64,
    author: AccountResponse,
    #[schema(example = "Hello world")]
    title: String,
    #[schema(example = "My first post!")]
    content: String,
    created_at: DateTime<Utc>,
    #[schema(example = 3)]
    likes: u64,
    /// Whether the executing user has liked this post
    liked_by_me: bool,
    /// All comments below the post, oldest first
    comments: Vec<CommentResponse>,
}

/// The feed of all posts
///
/// `posts` is sorted by creation time, newest first.
#[derive(Serialize, ToSchema)]
pub struct GetFeedResponse {
    posts: Vec<PostResponse>,
}

/// Retrieve the feed
///
/// Returns all posts, newest first, each with its author, like count and
/// comments.
#[utoipa::path(
    tag = "Feed",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the feed", body = GetFeedResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/feed")]
pub async fn get_feed(db: Data<Database>, session: Session) -> ApiResult<Json<GetFeedResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let post_rows = query!(&mut tx, Post).all().await?;

    let mut posts = Vec::new();
    for post in post_rows
        .into_iter()
        .sorted_by(|a, b| b.created_at.cmp(&a.created_at))
    {
        let Some(author) = query!(&mut tx, Account)
            .condition(Account::F.uuid.equals(*post.author.key()))
            .optional()
            .await?
        else {
            continue;
        };

        let likes = query!(&mut tx, PostLike)
            .condition(PostLike::F.post.equals(post.id))
            .all()
            .await?;

        let comment_rows = query!(&mut tx, PostComment)
            .condition(PostComment::F.post.equals(post.id))
            .all()
            .await?;

        let mut comments = Vec::new();
        for comment in comment_rows
            .into_iter()
            .sorted_by_key(|c| c.created_at)
        {
            let Some(comment_author) = query!(&mut tx, Account)
                .condition(Account::F.uuid.equals(*comment.user.key()))
                .optional()
                .await?
            else {
                continue;
            };

            comments.push(CommentResponse {
                id: comment.id,
                author: AccountResponse {
                    uuid: comment_author.uuid,
                    email: comment_author.email,
                    display_name: comment_author.display_name,
                },
                content: comment.content,
                created_at: DateTime::from_utc(comment.created_at, Utc),
            });
        }

        posts.push(PostResponse {
            id: post.id,
            author: AccountResponse {
                uuid: author.uuid,
                email: author.email,
                display_name: author.display_name,
            },
            title: post.title,
            content: post.content,
            created_at: DateTime::from_utc(post.created_at, Utc),
            likes: likes.len() as u64,
            liked_by_me: likes.iter().any(|l| *l.user.key() == uuid),
            comments,
        });
    }

    tx.commit().await?;

    Ok(Json(GetFeedResponse { posts }))
}

/// Toggle the like of the executing user on a post
///
/// Liking a post twice removes the like again, so a user holds at most one
/// like per post.
#[utoipa::path(
    tag = "Feed",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The like has been toggled"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathId),
    security(("session_cookie" = []))
)]
#[post("/posts/{id}/like")]
pub async fn toggle_like(
    path: Path<PathId>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    query!(&mut tx, (Post::F.id,))
        .condition(Post::F.id.equals(path.id))
        .optional()
        .await?
        .ok_or(ApiError::InvalidId)?;

    let existing = query!(&mut tx, PostLike)
        .condition(and!(
            PostLike::F.post.equals(path.id),
            PostLike::F.user.equals(uuid)
        ))
        .optional()
        .await?;

    if let Some(like) = existing {
        rorm::delete!(&mut tx, PostLike).single(&like).await?;
    } else {
        insert!(&mut tx, PostLikeInsert)
            .single(&PostLikeInsert {
                user: ForeignModelByField::Key(uuid),
                post: ForeignModelByField::Key(path.id),
            })
            .await?;
    }

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// The request to comment on a post
#[derive(Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    #[schema(example = "Nice post!")]
    content: String,
}

/// Comment on a post
#[utoipa::path(
    tag = "Feed",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The comment has been created"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathId),
    request_body = CreateCommentRequest,
    security(("session_cookie" = []))
)]
#[post("/posts/{id}/comments")]
pub async fn create_comment(
    path: Path<PathId>,
    req: Json<CreateCommentRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let content = req.content.trim();
    if content.is_empty() || content.chars().count() > COMMENT_LENGTH_LIMIT {
        return Err(ApiError::InvalidContent);
    }

    let mut tx = db.start_transaction().await?;

    query!(&mut tx, (Post::F.id,))
        .condition(Post::F.id.equals(path.id))
        .optional()
        .await?
        .ok_or(ApiError::InvalidId)?;

    insert!(&mut tx, PostCommentInsert)
        .single(&PostCommentInsert {
            user: ForeignModelByField::Key(uuid),
            post: ForeignModelByField::Key(path.id),
            content: content.to_string(),
        })
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}
