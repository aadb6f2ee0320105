use chrono::NaiveDateTime;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttendanceLog {
    pub uid: u16,
    pub user_id: String,
    /// Terminal local time, no zone attached
    pub timestamp: NaiveDateTime,
    pub status: u8,
    pub punch: u8,
}
