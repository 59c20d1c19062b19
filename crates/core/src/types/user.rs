//! Account record as returned by the backend.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::UserId;
use super::status::Role;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub role: Role,
}
