pub mod api;
pub mod attendance;
pub mod fingerprint;
pub mod user;
