use crate::models::user::User;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct NewUserRequest {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub privilege: u8,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UserStatusRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub user_id: String,
    pub name: String,
    pub privilege: u8,
}

impl From<User> for Member {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            name: user.name,
            privilege: user.privilege,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MembersResponse {
    pub members: Vec<Member>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttendanceEntry {
    pub user_id: String,
    pub name: String,
    /// `%Y-%m-%d %H:%M:%S`
    pub timestamp: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttendanceResponse {
    pub attendance: Vec<AttendanceEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FingerprintsResponse {
    pub user_id: String,
    pub total_fingerprints: usize,
    pub finger_indexes: Vec<u8>,
}
