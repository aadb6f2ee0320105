pub mod client;
pub mod constants;
pub mod error;
pub mod gateway;
#[cfg(test)]
pub mod mock;
pub mod packet;
pub mod records;
