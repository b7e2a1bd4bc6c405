use rorm::{Model, Patch};
use uuid::Uuid;

/// A user account
#[derive(Model)]
pub struct Account {
    /// The primary key of a user.
    ///
    /// This will be a uuid.
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The email address of the user, also used as login name
    #[rorm(max_length = 255, unique)]
    pub email: String,

    /// The name that is displayed for this user
    #[rorm(max_length = 255)]
    pub display_name: String,

    /// The password hash of the user.
    #[rorm(max_length = 1024)]
    pub password_hash: String,

    /// The date of birth of the user
    pub date_of_birth: Option<chrono::NaiveDate>,

    /// Reference to the profile image of the user.
    ///
    /// Storage and upload of the image itself is not handled by this server.
    #[rorm(max_length = 255)]
    pub profile_image: Option<String>,

    /// The last time the user has logged in
    pub last_login: Option<chrono::NaiveDateTime>,
}

#[derive(Patch)]
#[rorm(model = "Account")]
pub(crate) struct AccountInsert {
    pub(crate) uuid: Uuid,
    pub(crate) email: String,
    pub(crate) display_name: String,
    pub(crate) password_hash: String,
    pub(crate) date_of_birth: Option<chrono::NaiveDate>,
    pub(crate) profile_image: Option<String>,
    pub(crate) last_login: Option<chrono::NaiveDateTime>,
}
