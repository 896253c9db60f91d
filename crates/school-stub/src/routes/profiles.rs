use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use school_types::Profile;

use super::SchoolFilter;
use crate::middleware::auth::CurrentUser;
use crate::state::StubState;

pub fn routes() -> Router<StubState> {
    Router::new().route("/api/profiles/", get(list_profiles))
}

/// Lists profiles, the caller's own first.
async fn list_profiles(
    State(state): State<StubState>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Query(filter): Query<SchoolFilter>,
) -> Json<Vec<Profile>> {
    let data = state.lock();
    let ownId = data.users.get(&username).map(|u| u.profile_id);

    let mut profiles: Vec<Profile> = data
        .profiles
        .iter()
        .filter(|p| filter.school.is_none() || p.school == filter.school)
        .cloned()
        .collect();
    profiles.sort_by_key(|p| Some(p.id) != ownId);

    Json(profiles)
}
