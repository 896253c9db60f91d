use school_client::{SchoolOverview, StudentDashboard};
use school_types::{Assignment, AttendanceRecord, Profile, School, Submission};

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

fn format_grade(grade: Option<f64>) -> String {
    match grade {
        Some(value) => format!("{value:.2}"),
        None => "-".into(),
    }
}

fn format_rate(records: usize, rate: f64) -> String {
    if records == 0 {
        "0".into()
    } else {
        format!("{rate:.1}")
    }
}

pub fn schools(schools: &[School]) -> String {
    if schools.is_empty() {
        return "No schools found".into();
    }

    let mut out = format!("{:>5}  {:<28}  {}\n", "ID", "NAME", "ADDRESS");
    for school in schools {
        out.push_str(&format!(
            "{:>5}  {:<28}  {}\n",
            school.id,
            school.name,
            or_dash(school.address.as_deref())
        ));
    }
    out
}

pub fn assignments(assignments: &[Assignment]) -> String {
    if assignments.is_empty() {
        return "No assignments available".into();
    }

    let mut out = format!("{:>5}  {:<32}  {:<10}  {}\n", "ID", "TITLE", "DUE", "DESCRIPTION");
    for assignment in assignments {
        let due = assignment
            .due_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".into());
        out.push_str(&format!(
            "{:>5}  {:<32}  {:<10}  {}\n",
            assignment.id,
            assignment.title,
            due,
            or_dash(assignment.description.as_deref())
        ));
    }
    out
}

pub fn submissions(submissions: &[Submission]) -> String {
    if submissions.is_empty() {
        return "No submissions".into();
    }

    let mut out = format!(
        "{:>5}  {:>10}  {:<16}  {:>6}  {}\n",
        "ID", "ASSIGNMENT", "STUDENT", "GRADE", "STATUS"
    );
    for submission in submissions {
        let student = submission
            .student
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "student".into());
        let status = if submission.is_graded() { "Graded" } else { "Pending" };
        out.push_str(&format!(
            "{:>5}  {:>10}  {:<16}  {:>6}  {}\n",
            submission.id,
            submission.assignment,
            student,
            format_grade(submission.grade),
            status
        ));
    }
    out
}

pub fn attendance(records: &[AttendanceRecord]) -> String {
    if records.is_empty() {
        return "No attendance records yet".into();
    }

    let mut out = format!(
        "{:>5}  {:>7}  {:<10}  {:<7}  {}\n",
        "ID", "STUDENT", "DATE", "STATUS", "NOTES"
    );
    for record in records {
        out.push_str(&format!(
            "{:>5}  {:>7}  {:<10}  {:<7}  {}\n",
            record.id,
            record.student,
            record.date,
            record.status.as_str().to_uppercase(),
            or_dash(record.notes.as_deref())
        ));
    }
    out
}

pub fn profiles(profiles: &[Profile]) -> String {
    if profiles.is_empty() {
        return "No profiles".into();
    }

    let mut out = format!("{:>5}  {:<20}  {:<10}  {}\n", "ID", "USERNAME", "ROLE", "SCHOOL");
    for profile in profiles {
        let school = profile
            .school
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into());
        out.push_str(&format!(
            "{:>5}  {:<20}  {:<10}  {}\n",
            profile.id,
            profile.display_name(),
            profile.role,
            school
        ));
    }
    out
}

pub fn overview(overview: &SchoolOverview) -> String {
    let school = &overview.school;
    let stats = &overview.stats;

    let mut out = format!("{} (#{})\n", school.name, school.id);
    if let Some(address) = school.address.as_deref().filter(|a| !a.is_empty()) {
        out.push_str(&format!("{address}\n"));
    }
    if let Some(description) = school.description.as_deref().filter(|d| !d.is_empty()) {
        out.push_str(&format!("{description}\n"));
    }

    out.push_str(&format!(
        "\nStudents: {}  Assignments: {}  Avg grade: {:.1}\n",
        stats.students, stats.assignments, stats.average_grade
    ));
    out.push_str(&format!(
        "Submissions: {}  Graded: {}  Pending grades: {}\n",
        stats.submissions, stats.graded, stats.pending
    ));
    out.push_str(&format!(
        "Attendance records: {}  Attendance rate: {}%  Present: {} / {}\n",
        stats.attendance,
        format_rate(stats.attendance, stats.attendance_rate),
        stats.present,
        stats.attendance
    ));
    out.push_str("\n== Assignments ==\n");
    out.push_str(&assignments(&overview.assignments));
    out.push_str("\n== Submissions ==\n");
    out.push_str(&submissions(&overview.submissions));
    out.push_str("\n== Attendance ==\n");
    out.push_str(&attendance(&overview.attendance));
    out
}

pub fn dashboard(dashboard: &StudentDashboard) -> String {
    let mut out = format!("Welcome, {}!\n", dashboard.profile.display_name());
    out.push_str(&format!(
        "\nAttendance records: {}  Assignments: {}  Submissions: {}\n",
        dashboard.attendance.len(),
        dashboard.assignments.len(),
        dashboard.submissions.len()
    ));

    let recentAttendance: Vec<AttendanceRecord> =
        dashboard.attendance.iter().take(10).cloned().collect();
    let recentAssignments: Vec<Assignment> =
        dashboard.assignments.iter().take(5).cloned().collect();

    out.push_str("\n== My attendance ==\n");
    out.push_str(&attendance(&recentAttendance));
    out.push_str("\n== Recent assignments ==\n");
    out.push_str(&assignments(&recentAssignments));
    if !dashboard.submissions.is_empty() {
        out.push_str("\n== My submissions ==\n");
        out.push_str(&submissions(&dashboard.submissions));
    }
    out
}
