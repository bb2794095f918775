//! Local user records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keylab_core::{Email, UserId};

/// A user known to this device.
///
/// `password_hash` is an argon2 PHC string. It is `None` for accounts that
/// have only ever signed in through an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub avatar_url: Option<String>,
}

/// User fields for insert or upsert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: Option<String>,
    pub avatar_url: Option<String>,
}
