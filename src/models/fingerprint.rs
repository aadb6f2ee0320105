/// A stored fingerprint enrollment, one per finger per user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FingerprintTemplate {
    pub uid: u16,
    /// Resolved from `uid` through the user list, falls back to the slot number
    pub user_id: String,
    /// Finger slot, 0-9
    pub finger_index: u8,
    pub valid: bool,
    /// Length of the raw template bytes
    pub size: usize,
}
