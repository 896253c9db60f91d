use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use school_types::{Assignment, NewAssignment};

use super::SchoolFilter;
use crate::error::StubError;
use crate::state::StubState;

pub fn routes() -> Router<StubState> {
    Router::new().route("/api/assignments/", get(list_assignments).post(create_assignment))
}

async fn list_assignments(
    State(state): State<StubState>,
    Query(filter): Query<SchoolFilter>,
) -> Json<Vec<Assignment>> {
    let data = state.lock();
    let assignments = data
        .assignments
        .iter()
        .filter(|a| filter.school.is_none() || a.school == filter.school)
        .cloned()
        .collect();
    Json(assignments)
}

async fn create_assignment(
    State(state): State<StubState>,
    Json(body): Json<NewAssignment>,
) -> Result<(StatusCode, Json<Assignment>), StubError> {
    if body.title.trim().is_empty() {
        return Err(StubError::BadRequest("title: this field may not be blank".into()));
    }

    let mut data = state.lock();
    if let Some(school) = body.school {
        if !data.schools.iter().any(|s| s.id == school) {
            return Err(StubError::BadRequest(format!("school: invalid pk {school}")));
        }
    }

    let assignment = Assignment {
        id: data.next_id(),
        title: body.title,
        description: (!body.description.is_empty()).then_some(body.description),
        due_date: body.due_date,
        created_at: chrono::Utc::now().to_rfc3339(),
        school: body.school,
    };
    data.assignments.push(assignment.clone());

    Ok((StatusCode::CREATED, Json(assignment)))
}
