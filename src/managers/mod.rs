pub mod connection;
pub mod toolkit;
