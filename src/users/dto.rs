use serde::{Deserialize, Serialize};

use crate::users::repo_types::UserChanges;

/// Request body for user registration. Fields are optional so that a missing
/// one is reported by name instead of as a JSON rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub id: i64,
}

/// Request body for `PUT /users/:id`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub new_email: Option<String>,
    pub new_first_name: Option<String>,
    pub new_last_name: Option<String>,
}

impl UpdateUserRequest {
    /// Empty strings count as absent; the email is trimmed like at registration.
    pub fn into_changes(self) -> UserChanges {
        UserChanges {
            email: non_empty(self.new_email.map(|e| e.trim().to_owned())),
            first_name: non_empty(self.new_first_name),
            last_name: non_empty(self.new_last_name),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub email: Option<String>,
}

pub(crate) fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}
