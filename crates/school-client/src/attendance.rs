use school_session::ApiRequest;
use school_types::{AttendanceRecord, NewAttendance};

use crate::{with_school, Result, SchoolClient};

impl SchoolClient {
    pub async fn list_attendance(&self, school: Option<i64>) -> Result<Vec<AttendanceRecord>> {
        self.fetch_json(with_school(ApiRequest::get("/api/attendance/"), school))
            .await
    }

    pub async fn record_attendance(&self, record: &NewAttendance) -> Result<()> {
        let request = ApiRequest::post_json("/api/attendance/", record)?;
        self.send_expecting_success(request).await
    }
}
