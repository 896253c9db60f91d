use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use school_types::{NewSchool, School};

use crate::error::StubError;
use crate::state::StubState;

pub fn routes() -> Router<StubState> {
    Router::new()
        .route("/api/schools/", get(list_schools).post(create_school))
        .route("/api/schools/:id/", get(get_school))
}

async fn list_schools(State(state): State<StubState>) -> Json<Vec<School>> {
    Json(state.lock().schools.clone())
}

async fn get_school(
    State(state): State<StubState>,
    Path(id): Path<i64>,
) -> Result<Json<School>, StubError> {
    state
        .lock()
        .schools
        .iter()
        .find(|s| s.id == id)
        .cloned()
        .map(Json)
        .ok_or(StubError::NotFound)
}

async fn create_school(
    State(state): State<StubState>,
    Json(body): Json<NewSchool>,
) -> Result<(StatusCode, Json<School>), StubError> {
    if body.name.trim().is_empty() {
        return Err(StubError::BadRequest("name: this field may not be blank".into()));
    }

    let mut data = state.lock();
    let school = School {
        id: data.next_id(),
        name: body.name,
        address: (!body.address.is_empty()).then_some(body.address),
        description: (!body.description.is_empty()).then_some(body.description),
    };
    data.schools.push(school.clone());
    tracing::info!("created school {} ({})", school.id, school.name);

    Ok((StatusCode::CREATED, Json(school)))
}
