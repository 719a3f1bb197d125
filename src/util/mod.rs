pub mod error;
pub mod log;
pub mod position;
pub mod text;
