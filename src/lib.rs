pub mod app;
pub mod auth;
pub mod backend;
pub mod categories;
pub mod config;
pub mod error;
pub mod expenses;
pub mod state;
pub mod users;
