//! The signed-in session block.

use secrecy::SecretString;

use keylab_core::{Email, UserId};

/// The signed-in user and their backend tokens.
///
/// A stored session means the user is logged in; logging out deletes it.
/// Tokens are absent after an offline login.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub email: Email,
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub is_admin: bool,
}

impl Session {
    /// Whether this session may call the backend as the user.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        self.access_token.is_some()
    }
}
