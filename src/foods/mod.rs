pub mod client;
pub mod handlers;
pub mod service;
pub mod vision;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
