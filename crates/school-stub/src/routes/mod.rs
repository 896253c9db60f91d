pub mod assignments;
pub mod attendance;
pub mod profiles;
pub mod schools;
pub mod submissions;

use axum::{middleware, Router};
use serde::Deserialize;

use crate::middleware::auth::require_bearer;
use crate::state::StubState;

/// `?school=<id>` filter accepted by the collection endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SchoolFilter {
    pub school: Option<i64>,
}

pub fn api_routes(state: StubState) -> Router<StubState> {
    Router::new()
        .merge(schools::routes())
        .merge(assignments::routes())
        .merge(submissions::routes())
        .merge(attendance::routes())
        .merge(profiles::routes())
        .route_layer(middleware::from_fn_with_state(state, require_bearer))
}
