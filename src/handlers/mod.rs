pub mod attendance;
pub mod fallback;
pub mod fingerprint;
pub mod members;
pub mod root;
pub mod user;
