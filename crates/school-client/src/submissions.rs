use school_session::ApiRequest;
use school_types::{GradeRequest, Submission};

use crate::{with_school, ClientError, Result, SchoolClient};

impl SchoolClient {
    pub async fn list_submissions(&self, school: Option<i64>) -> Result<Vec<Submission>> {
        self.fetch_json(with_school(ApiRequest::get("/api/submissions/"), school))
            .await
    }

    /// Sets or, with `None`, clears the grade of a submission.
    pub async fn grade_submission(&self, submission: i64, grade: Option<f64>) -> Result<()> {
        if let Some(value) = grade {
            if !(0.0..=100.0).contains(&value) {
                return Err(ClientError::InvalidGrade(value));
            }
        }

        let request = ApiRequest::post_json(
            format!("/api/submissions/{submission}/grade/"),
            &GradeRequest { grade },
        )?;
        self.send_expecting_success(request).await
    }
}
