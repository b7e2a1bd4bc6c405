use rorm::fields::types::ForeignModel;
use rorm::{Model, Patch};

use crate::models::Account;

/// A post in the public feed
#[derive(Model)]
pub struct Post {
    /// The primary key of a post
    #[rorm(id)]
    pub id: i64,

    /// The account that created the post
    #[rorm(on_update = "Cascade", on_delete = "Restrict")]
    pub author: ForeignModel<Account>,

    /// The title of the post
    #[rorm(max_length = 255)]
    pub title: String,

    /// The body of the post
    #[rorm(max_length = 2048)]
    pub content: String,

    /// The creation time of the post
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "Post")]
pub(crate) struct PostInsert {
    pub(crate) author: ForeignModel<Account>,
    pub(crate) title: String,
    pub(crate) content: String,
}

/// The like of a single user on a single post.
///
/// The like handler toggles: it deletes an existing row instead of inserting
/// a second one, so a user can hold at most one like per post.
#[derive(Model)]
pub struct PostLike {
    /// The primary key of a like
    #[rorm(id)]
    pub id: i64,

    /// The account that liked the post
    #[rorm(on_update = "Cascade", on_delete = "Restrict")]
    pub user: ForeignModel<Account>,

    /// The post that was liked
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub post: ForeignModel<Post>,

    /// The point in time the like was given
    #[rorm(auto_create_time)]
    pub liked_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "PostLike")]
pub(crate) struct PostLikeInsert {
    pub(crate) user: ForeignModel<Account>,
    pub(crate) post: ForeignModel<Post>,
}

/// A comment below a post
#[derive(Model)]
pub struct PostComment {
    /// The primary key of a comment
    #[rorm(id)]
    pub id: i64,

    /// The account that wrote the comment
    #[rorm(on_update = "Cascade", on_delete = "Restrict")]
    pub user: ForeignModel<Account>,

    /// The post the comment belongs to
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub post: ForeignModel<Post>,

    /// The text of the comment
    #[rorm(max_length = 1024)]
    pub content: String,

    /// The creation time of the comment
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "PostComment")]
pub(crate) struct PostCommentInsert {
    pub(crate) user: ForeignModel<Account>,
    pub(crate) post: ForeignModel<Post>,
    pub(crate) content: String,
}
