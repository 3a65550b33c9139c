pub mod api;
pub mod database;
pub mod live_quotes;
pub mod models;
pub mod server;
pub mod universe;
