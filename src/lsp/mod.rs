pub mod handler;
pub mod logger;
pub mod transport;
