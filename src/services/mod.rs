pub mod auth;
pub mod bookmark;
pub mod logger;
pub mod payload;
pub mod transport;
pub mod validation;
