mod dto;
pub mod guard;
pub mod handlers;
mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use guard::authorize;

pub fn router() -> Router<AppState> {
    handlers::expense_routes()
}
