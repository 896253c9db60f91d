use school_types::{Assignment, AttendanceRecord, AttendanceStatus, Profile, School, Submission};

use crate::{collection, Result, SchoolClient};

#[derive(Clone, Debug, PartialEq)]
pub struct SchoolStats {
    pub students: usize,
    pub assignments: usize,
    pub submissions: usize,
    pub graded: usize,
    pub pending: usize,
    pub attendance: usize,
    pub present: usize,
    /// Percentage of attendance records marked present, `0.0` when there are none.
    pub attendance_rate: f64,
    /// Mean over graded submissions, `0.0` when nothing is graded.
    pub average_grade: f64,
}

impl SchoolStats {
    pub fn compute(
        profiles: &[Profile],
        assignments: &[Assignment],
        submissions: &[Submission],
        attendance: &[AttendanceRecord],
    ) -> Self {
        let grades: Vec<f64> = submissions.iter().filter_map(|s| s.grade).collect();
        let averageGrade = if grades.is_empty() {
            0.0
        } else {
            grades.iter().sum::<f64>() / grades.len() as f64
        };

        let present = attendance
            .iter()
            .filter(|record| record.status == AttendanceStatus::Present)
            .count();
        let attendanceRate = if attendance.is_empty() {
            0.0
        } else {
            present as f64 / attendance.len() as f64 * 100.0
        };

        Self {
            students: profiles.iter().filter(|p| p.is_student()).count(),
            assignments: assignments.len(),
            submissions: submissions.len(),
            graded: grades.len(),
            pending: submissions.len() - grades.len(),
            attendance: attendance.len(),
            present,
            attendance_rate: attendanceRate,
            average_grade: averageGrade,
        }
    }
}

/// Everything shown on a school's detail view.
#[derive(Clone, Debug, PartialEq)]
pub struct SchoolOverview {
    pub school: School,
    pub assignments: Vec<Assignment>,
    pub submissions: Vec<Submission>,
    pub attendance: Vec<AttendanceRecord>,
    pub profiles: Vec<Profile>,
    pub stats: SchoolStats,
}

impl SchoolClient {
    /// Loads a school and its collections concurrently.
    ///
    /// The school itself must load; a collection the server refuses is shown
    /// as empty.
    pub async fn school_overview(&self, id: i64) -> Result<SchoolOverview> {
        let filter = Some(id);
        let (
            schoolResult,
            assignmentsResult,
            submissionsResult,
            attendanceResult,
            profilesResult,
        ) = tokio::join!(
            self.get_school(id),
            self.fetch_if_ok::<Vec<Assignment>>(collection("/api/assignments/", filter)),
            self.fetch_if_ok::<Vec<Submission>>(collection("/api/submissions/", filter)),
            self.fetch_if_ok::<Vec<AttendanceRecord>>(collection("/api/attendance/", filter)),
            self.fetch_if_ok::<Vec<Profile>>(collection("/api/profiles/", filter)),
        );

        let school = schoolResult?;
        let assignments = assignmentsResult?.unwrap_or_default();
        let submissions = submissionsResult?.unwrap_or_default();
        let attendance = attendanceResult?.unwrap_or_default();
        let profiles = profilesResult?.unwrap_or_default();

        let stats = SchoolStats::compute(&profiles, &assignments, &submissions, &attendance);

        Ok(SchoolOverview {
            school,
            assignments,
            submissions,
            attendance,
            profiles,
            stats,
        })
    }
}
