use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use school_types::{AttendanceRecord, Assignment, Profile, ProfileUser, School, Submission};

#[derive(Clone, Debug)]
pub struct StubUser {
    pub password: String,
    pub profile_id: i64,
}

/// Everything the stub server knows. Lives behind a mutex that is never
/// held across an await point.
#[derive(Debug, Default)]
pub struct StubData {
    pub users: HashMap<String, StubUser>,
    pub access_tokens: HashMap<String, String>,
    pub refresh_tokens: HashMap<String, String>,
    pub schools: Vec<School>,
    pub assignments: Vec<Assignment>,
    pub submissions: Vec<Submission>,
    pub attendance: Vec<AttendanceRecord>,
    pub profiles: Vec<Profile>,
    pub hits: HashMap<String, usize>,
    next_id: i64,
    next_token: u64,
}

impl StubData {
    pub fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn issue_access(&mut self, username: &str) -> String {
        self.next_token += 1;
        let token = format!("access-{}", self.next_token);
        self.access_tokens.insert(token.clone(), username.to_string());
        token
    }

    pub fn issue_refresh(&mut self, username: &str) -> String {
        self.next_token += 1;
        let token = format!("refresh-{}", self.next_token);
        self.refresh_tokens.insert(token.clone(), username.to_string());
        token
    }

    pub fn profile(&self, id: i64) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn school_of_assignment(&self, assignmentId: i64) -> Option<i64> {
        self.assignments
            .iter()
            .find(|a| a.id == assignmentId)
            .and_then(|a| a.school)
    }

    pub fn school_of_profile(&self, profileId: i64) -> Option<i64> {
        self.profile(profileId).and_then(|p| p.school)
    }

    pub fn create_user(
        &mut self,
        username: &str,
        password: &str,
        email: &str,
        role: &str,
        school: Option<i64>,
    ) -> i64 {
        let profileId = self.next_id();
        self.profiles.push(Profile {
            id: profileId,
            user: Some(ProfileUser {
                username: username.to_string(),
                email: (!email.is_empty()).then(|| email.to_string()),
            }),
            role: role.to_string(),
            school,
        });
        self.users.insert(
            username.to_string(),
            StubUser {
                password: password.to_string(),
                profile_id: profileId,
            },
        );
        profileId
    }
}

/// Shared handle to the stub's in-memory data.
#[derive(Clone, Debug, Default)]
pub struct StubState {
    inner: Arc<Mutex<StubData>>,
}

impl StubState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, StubData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an account with a profile and returns the profile id.
    pub fn seed_user(
        &self,
        username: &str,
        password: &str,
        role: &str,
        school: Option<i64>,
    ) -> i64 {
        self.lock().create_user(username, password, "", role, school)
    }

    pub fn seed_school(&self, name: &str) -> School {
        let mut data = self.lock();
        let school = School {
            id: data.next_id(),
            name: name.to_string(),
            address: None,
            description: None,
        };
        data.schools.push(school.clone());
        school
    }

    pub fn seed_assignment(&self, school: i64, title: &str) -> Assignment {
        let mut data = self.lock();
        let assignment = Assignment {
            id: data.next_id(),
            title: title.to_string(),
            description: None,
            due_date: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            school: Some(school),
        };
        data.assignments.push(assignment.clone());
        assignment
    }

    pub fn seed_submission(&self, assignment: i64, studentProfile: i64) -> Submission {
        let mut data = self.lock();
        let submission = Submission {
            id: data.next_id(),
            assignment,
            student: Some(school_types::StudentRef::Id(studentProfile)),
            grade: None,
            content: None,
        };
        data.submissions.push(submission.clone());
        submission
    }

    /// A stub pre-populated for local development: a school, a `teacher`
    /// and two students (passwords equal usernames), assignments and a few
    /// submissions.
    pub fn with_demo_data() -> Self {
        let state = Self::new();
        let school = state.seed_school("Riverside High");
        state.seed_user("teacher", "teacher", "teacher", Some(school.id));
        let ada = state.seed_user("ada", "ada", "student", Some(school.id));
        let linus = state.seed_user("linus", "linus", "student", Some(school.id));

        let essay = state.seed_assignment(school.id, "Essay: the water cycle");
        let lab = state.seed_assignment(school.id, "Lab report: pendulums");
        state.seed_submission(essay.id, ada);
        state.seed_submission(essay.id, linus);
        state.seed_submission(lab.id, ada);
        state
    }

    /// Invalidates every issued access token, forcing clients onto the
    /// refresh path.
    pub fn revoke_access_tokens(&self) {
        self.lock().access_tokens.clear();
    }

    pub fn revoke_refresh_tokens(&self) {
        self.lock().refresh_tokens.clear();
    }

    /// Number of requests received for `path` (query string excluded).
    pub fn hits(&self, path: &str) -> usize {
        self.lock().hits.get(path).copied().unwrap_or(0)
    }
}
