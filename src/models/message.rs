use rorm::fields::types::ForeignModel;
use rorm::{Model, Patch};

use crate::models::Account;

/// A direct message between two users.
///
/// Messages may only be created while the two users hold an accepted
/// [Friendship](crate::models::Friendship). The read state is owned by the
/// receiver and flips exactly once, when the receiver opens the conversation.
#[derive(Model)]
pub struct Message {
    /// The primary key of a message
    #[rorm(id)]
    pub id: i64,

    /// The account that sent the message
    #[rorm(on_update = "Cascade", on_delete = "Restrict")]
    pub sender: ForeignModel<Account>,

    /// The account the message was sent to
    #[rorm(on_update = "Cascade", on_delete = "Restrict")]
    pub receiver: ForeignModel<Account>,

    /// The maximum length of a message
    #[rorm(max_length = 2048)]
    pub content: String,

    /// The timestamp when the message was received by the server
    #[rorm(auto_create_time)]
    pub sent_at: chrono::NaiveDateTime,

    /// Whether the receiver has seen the message yet
    pub is_read: bool,

    /// The point in time the receiver opened the conversation, if they have
    pub read_at: Option<chrono::NaiveDateTime>,
}

#[derive(Patch)]
#[rorm(model = "Message")]
pub(crate) struct MessageInsert {
    pub(crate) sender: ForeignModel<Account>,
    pub(crate) receiver: ForeignModel<Account>,
    pub(crate) content: String,
    pub(crate) is_read: bool,
    pub(crate) read_at: Option<chrono::NaiveDateTime>,
}
