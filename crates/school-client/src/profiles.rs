use school_session::ApiRequest;
use school_types::Profile;

use crate::{with_school, ClientError, Result, SchoolClient};

impl SchoolClient {
    pub async fn list_profiles(&self, school: Option<i64>) -> Result<Vec<Profile>> {
        self.fetch_json(with_school(ApiRequest::get("/api/profiles/"), school))
            .await
    }

    /// The signed-in user's profile: the first one the API lists.
    pub async fn current_profile(&self) -> Result<Profile> {
        self.list_profiles(None)
            .await?
            .into_iter()
            .next()
            .ok_or(ClientError::NoProfile)
    }

    /// Student profiles enrolled in `school`.
    pub async fn students(&self, school: i64) -> Result<Vec<Profile>> {
        let profiles = self.list_profiles(Some(school)).await?;
        Ok(profiles
            .into_iter()
            .filter(|p| p.is_student() && p.school == Some(school))
            .collect())
    }
}
