pub mod bus;
pub mod handlers;
pub mod watch;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
