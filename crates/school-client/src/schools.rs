use school_session::ApiRequest;
use school_types::{NewSchool, School};

use crate::{Result, SchoolClient};

impl SchoolClient {
    pub async fn list_schools(&self) -> Result<Vec<School>> {
        self.fetch_json(ApiRequest::get("/api/schools/")).await
    }

    pub async fn get_school(&self, id: i64) -> Result<School> {
        self.fetch_json(ApiRequest::get(format!("/api/schools/{id}/")))
            .await
    }

    /// Creates a school and returns the record as stored by the server.
    pub async fn create_school(&self, school: &NewSchool) -> Result<School> {
        let request = ApiRequest::post_json("/api/schools/", school)?;
        let created: School = self.fetch_json(request).await?;
        tracing::info!("created school {} ({})", created.id, created.name);
        Ok(created)
    }
}
