use chrono::NaiveDate;
use school_types::{
    Assignment, AttendanceRecord, AttendanceStatus, NewAttendance, Profile, Submission,
};

use crate::{collection, Result, SchoolClient};

/// The signed-in student's own view.
#[derive(Clone, Debug, PartialEq)]
pub struct StudentDashboard {
    pub profile: Profile,
    /// Only the student's own attendance records.
    pub attendance: Vec<AttendanceRecord>,
    pub assignments: Vec<Assignment>,
    pub submissions: Vec<Submission>,
}

impl SchoolClient {
    /// Loads the current profile and, when it belongs to a school, that
    /// school's assignments, submissions and the student's attendance.
    pub async fn student_dashboard(&self) -> Result<StudentDashboard> {
        let profile = self.current_profile().await?;

        let Some(school) = profile.school else {
            return Ok(StudentDashboard {
                profile,
                attendance: Vec::new(),
                assignments: Vec::new(),
                submissions: Vec::new(),
            });
        };

        let filter = Some(school);
        let (attendanceResult, assignmentsResult, submissionsResult) = tokio::join!(
            self.fetch_if_ok::<Vec<AttendanceRecord>>(collection("/api/attendance/", filter)),
            self.fetch_if_ok::<Vec<Assignment>>(collection("/api/assignments/", filter)),
            self.fetch_if_ok::<Vec<Submission>>(collection("/api/submissions/", filter)),
        );

        let attendance = attendanceResult?
            .unwrap_or_default()
            .into_iter()
            .filter(|record| record.student == profile.id)
            .collect();

        Ok(StudentDashboard {
            attendance,
            assignments: assignmentsResult?.unwrap_or_default(),
            submissions: submissionsResult?.unwrap_or_default(),
            profile,
        })
    }

    /// Records attendance for the signed-in user on `date`.
    pub async fn check_in(&self, date: NaiveDate, status: AttendanceStatus) -> Result<()> {
        let profile = self.current_profile().await?;
        self.record_attendance(&NewAttendance {
            student: Some(profile.id),
            date: Some(date),
            status,
            notes: None,
        })
        .await?;

        tracing::info!("checked in {} as {status} on {date}", profile.display_name());
        Ok(())
    }
}
