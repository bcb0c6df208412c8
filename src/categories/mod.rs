pub mod dto;
pub mod handlers;
pub mod predefined;
mod repo;
pub mod repo_types;
pub mod resolver;

use crate::state::AppState;
use axum::Router;

pub use resolver::{lookup, require, Resolution};

pub fn router() -> Router<AppState> {
    handlers::category_routes()
}
