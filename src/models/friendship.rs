use rorm::fields::types::ForeignModel;
use rorm::{DbEnum, Model, Patch};
use uuid::Uuid;

use crate::models::Account;

/// The state a [Friendship] is currently in.
///
/// A row is created as `Pending` and only ever transitions to `Accepted` or
/// `Rejected` through the target of the request. `Rejected` rows are retained
/// and keep blocking new requests for the pair. Cancelling a pending request
/// or unfriending deletes the row entirely.
#[derive(DbEnum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum FriendshipStatus {
    /// The request has not been answered yet
    Pending,
    /// The request was accepted, the two users are friends
    Accepted,
    /// The request was rejected by its target
    Rejected,
    /// One side blocked the other
    Blocked,
}

/// A friend relation between two users.
///
/// There is at most one row per unordered pair of users, regardless of who
/// sent the request. This is enforced by the unique [Friendship::pair] column.
#[derive(Model)]
pub struct Friendship {
    /// Primary key of this friendship
    #[rorm(id)]
    pub id: i64,

    /// Canonical key of the user pair, direction independent
    #[rorm(max_length = 73, unique)]
    pub pair: String,

    /// The user that sent the request
    #[rorm(on_update = "Cascade", on_delete = "Restrict")]
    pub from: ForeignModel<Account>,

    /// The user the request was sent to
    #[rorm(on_update = "Cascade", on_delete = "Restrict")]
    pub to: ForeignModel<Account>,

    /// The current state of the relation
    pub status: FriendshipStatus,

    /// The point in time the request was sent
    #[rorm(auto_create_time)]
    pub requested_at: chrono::NaiveDateTime,

    /// The point in time the request was accepted, if it was
    pub accepted_at: Option<chrono::NaiveDateTime>,
}

#[derive(Patch)]
#[rorm(model = "Friendship")]
pub(crate) struct FriendshipInsert {
    pub(crate) pair: String,
    pub(crate) from: ForeignModel<Account>,
    pub(crate) to: ForeignModel<Account>,
    pub(crate) status: FriendshipStatus,
    pub(crate) accepted_at: Option<chrono::NaiveDateTime>,
}

/// Build the canonical pair key for two users.
///
/// The key is direction independent: the lexicographically smaller uuid comes
/// first. The unique constraint on [Friendship::pair] therefore rejects a
/// second row for the same pair even if the direction is reversed.
pub(crate) fn pair_key(a: Uuid, b: Uuid) -> String {
    if a < b {
        format!("{a}:{b}")
    } else {
        format!("{b}:{a}")
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::pair_key;

    #[test]
    fn pair_key_is_direction_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(pair_key(a, b), pair_key(b, a));
    }

    #[test]
    fn pair_key_differs_between_pairs() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        assert_ne!(pair_key(a, b), pair_key(a, c));
        assert_ne!(pair_key(a, b), pair_key(b, c));
    }
}
