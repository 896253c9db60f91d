use school_session::ApiRequest;
use school_types::{Assignment, NewAssignment};

use crate::{with_school, Result, SchoolClient};

impl SchoolClient {
    pub async fn list_assignments(&self, school: Option<i64>) -> Result<Vec<Assignment>> {
        self.fetch_json(with_school(ApiRequest::get("/api/assignments/"), school))
            .await
    }

    pub async fn create_assignment(&self, assignment: &NewAssignment) -> Result<()> {
        let request = ApiRequest::post_json("/api/assignments/", assignment)?;
        self.send_expecting_success(request).await
    }
}
