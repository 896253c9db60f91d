use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use school_types::{AttendanceRecord, NewAttendance};

use super::SchoolFilter;
use crate::error::StubError;
use crate::state::StubState;

pub fn routes() -> Router<StubState> {
    Router::new().route("/api/attendance/", get(list_attendance).post(record_attendance))
}

async fn list_attendance(
    State(state): State<StubState>,
    Query(filter): Query<SchoolFilter>,
) -> Json<Vec<AttendanceRecord>> {
    let data = state.lock();
    let records = data
        .attendance
        .iter()
        .filter(|r| filter.school.is_none() || data.school_of_profile(r.student) == filter.school)
        .cloned()
        .collect();
    Json(records)
}

async fn record_attendance(
    State(state): State<StubState>,
    Json(body): Json<NewAttendance>,
) -> Result<(StatusCode, Json<AttendanceRecord>), StubError> {
    let student = body
        .student
        .ok_or_else(|| StubError::BadRequest("student: this field is required".into()))?;

    let mut data = state.lock();
    if data.profile(student).is_none() {
        return Err(StubError::BadRequest(format!("student: invalid pk {student}")));
    }

    let record = AttendanceRecord {
        id: data.next_id(),
        student,
        date: body.date.unwrap_or_else(|| chrono::Local::now().date_naive()),
        status: body.status,
        notes: body.notes.filter(|n| !n.is_empty()),
    };
    data.attendance.push(record.clone());

    Ok((StatusCode::CREATED, Json(record)))
}
