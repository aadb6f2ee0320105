/// A user record as stored on the terminal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// Internal device slot
    pub uid: u16,
    /// Enrollment identifier shown on the terminal
    pub user_id: String,
    pub name: String,
    /// Access level, without the disabled bit
    pub privilege: u8,
    pub password: String,
    pub group_id: String,
    pub card: u32,
    pub enabled: bool,
}

/// Fields written by a user-set command. The device session picks the slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserUpdate {
    pub user_id: String,
    pub name: String,
    pub privilege: u8,
    pub password: String,
    pub enabled: bool,
}

impl User {
    /// Same user, resubmitted with a different enabled flag
    pub fn with_enabled(&self, enabled: bool) -> UserUpdate {
        UserUpdate {
            user_id: self.user_id.clone(),
            name: self.name.clone(),
            privilege: self.privilege,
            password: self.password.clone(),
            enabled,
        }
    }
}
