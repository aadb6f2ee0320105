pub mod core;
pub mod device;
pub mod handlers;
pub mod models;
pub mod utils;
pub mod validation;
