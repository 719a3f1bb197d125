pub mod config;
pub mod generator;
pub mod lsp;
pub mod session;
pub mod sourcemap;
pub mod util;
