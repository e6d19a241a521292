pub mod handlers;
pub mod message;
pub mod models;
