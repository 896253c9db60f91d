use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use school_types::{GradeRequest, Submission};

use super::SchoolFilter;
use crate::error::StubError;
use crate::state::StubState;

pub fn routes() -> Router<StubState> {
    Router::new()
        .route("/api/submissions/", get(list_submissions))
        .route("/api/submissions/:id/grade/", post(grade_submission))
}

async fn list_submissions(
    State(state): State<StubState>,
    Query(filter): Query<SchoolFilter>,
) -> Json<Vec<Submission>> {
    let data = state.lock();
    let submissions = data
        .submissions
        .iter()
        .filter(|s| {
            filter.school.is_none() || data.school_of_assignment(s.assignment) == filter.school
        })
        .cloned()
        .collect();
    Json(submissions)
}

async fn grade_submission(
    State(state): State<StubState>,
    Path(id): Path<i64>,
    Json(body): Json<GradeRequest>,
) -> Result<Json<Submission>, StubError> {
    if let Some(grade) = body.grade {
        if !(0.0..=100.0).contains(&grade) {
            return Err(StubError::BadRequest(format!(
                "grade: {grade} is outside 0-100"
            )));
        }
    }

    let mut data = state.lock();
    let submission = data
        .submissions
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or(StubError::NotFound)?;
    submission.grade = body.grade;

    Ok(Json(submission.clone()))
}
