use thiserror::Error;

/// Errors raised while talking to the attendance terminal
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Failed to connect to device: {0}")]
    Connect(String),

    #[error("Device did not respond within {0}ms")]
    Timeout(u64),

    #[error("Device I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device closed the connection")]
    ConnectionClosed,

    #[error("Malformed device packet: {0}")]
    Malformed(String),

    #[error("Device rejected {command} (response code {code})")]
    Rejected { command: &'static str, code: u16 },

    #[error("Device requires a valid comm key")]
    Unauthorized,

    #[error("User {0} not found on device")]
    UserNotFound(String),

    #[error("Can't pack user: {0}")]
    InvalidUser(String),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
