#![allow(non_snake_case)]

mod config;
mod render;

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use school_client::{ClientError, SchoolClient};
use school_session::{FileStore, HttpTransport, SessionClient};
use school_types::{AttendanceStatus, NewAssignment, NewAttendance, NewSchool};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "school-console", about = "Administrative console for the school management API")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "SCHOOL_CONSOLE_CONFIG", default_value = "config.example.toml")]
    config: String,

    /// Overrides `server.base_url` from the config file.
    #[arg(long, env = "SCHOOL_API_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the in-memory API stub for local development.
    Stub {
        /// Start with a demo school, users and assignments.
        #[arg(long)]
        demo: bool,
    },
    #[command(flatten)]
    Api(ApiCommand),
}

/// Commands that talk to the API through a session.
#[derive(Subcommand, Debug)]
enum ApiCommand {
    /// Sign in and store the token pair.
    Login {
        username: String,
        #[arg(long, env = "SCHOOL_PASSWORD")]
        password: String,
    },
    /// Forget the stored tokens.
    Logout,
    /// Create an account.
    Register {
        username: String,
        #[arg(long, env = "SCHOOL_PASSWORD")]
        password: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    /// List schools.
    Schools,
    /// Show a school with its assignments, submissions and attendance.
    School { id: i64 },
    CreateSchool {
        name: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Assignments {
        #[arg(long)]
        school: Option<i64>,
    },
    CreateAssignment {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Due date, YYYY-MM-DD.
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long)]
        school: Option<i64>,
    },
    Submissions {
        #[arg(long)]
        school: Option<i64>,
    },
    /// Grade a submission; omit the grade to clear it.
    Grade { submission: i64, grade: Option<f64> },
    Attendance {
        #[arg(long)]
        school: Option<i64>,
    },
    RecordAttendance {
        /// Student profile id.
        student: i64,
        #[arg(long, default_value = "present")]
        status: AttendanceStatus,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
    Profiles {
        #[arg(long)]
        school: Option<i64>,
    },
    /// Show the signed-in student's dashboard.
    Dashboard,
    /// Record attendance for the signed-in user, today unless --date is given.
    CheckIn {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "present")]
        status: AttendanceStatus,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut appConfig = config::load(&cli.config);
    if let Some(baseUrl) = cli.base_url {
        appConfig.server.base_url = baseUrl;
    }
    tracing::debug!(
        "loaded config from {}: base_url={}",
        cli.config,
        appConfig.server.base_url
    );

    match run(cli.command, appConfig).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn connect(appConfig: &Config) -> anyhow::Result<SchoolClient> {
    let timeout = appConfig.server.timeout_secs.map(Duration::from_secs);
    let transport = HttpTransport::new(&appConfig.server.base_url, timeout)?;
    let store = FileStore::new(&appConfig.storage.path);
    let session = SessionClient::restore(Arc::new(transport), Arc::new(store))
        .with_context(|| format!("failed to load session from {}", appConfig.storage.path))?;
    Ok(SchoolClient::new(Arc::new(session)))
}

/// Adds a login hint when the server refused the request even after a refresh.
fn explain(err: ClientError) -> anyhow::Error {
    if err.is_unauthorized() {
        anyhow!("{err}\nnot signed in or session expired; run `school-console login <username>`")
    } else {
        anyhow::Error::new(err)
    }
}

async fn run(command: Command, appConfig: Config) -> anyhow::Result<()> {
    match command {
        Command::Stub { demo } => serve_stub(&appConfig, demo).await,
        Command::Api(apiCommand) => {
            let client = connect(&appConfig)?;
            run_api(apiCommand, &client).await
        }
    }
}

async fn run_api(command: ApiCommand, client: &SchoolClient) -> anyhow::Result<()> {
    match command {
        ApiCommand::Login { username, password } => {
            client.session().login(&username, &password).await?;
            println!("Signed in as {username}");
        }
        ApiCommand::Logout => {
            client.session().logout();
            println!("Signed out");
        }
        ApiCommand::Register {
            username,
            password,
            email,
        } => {
            client.session().register(&username, &password, &email).await?;
            println!("Registration successful. Please log in.");
        }
        ApiCommand::Schools => {
            let schools = client.list_schools().await.map_err(explain)?;
            println!("{}", render::schools(&schools));
        }
        ApiCommand::School { id } => {
            let overview = client.school_overview(id).await.map_err(explain)?;
            println!("{}", render::overview(&overview));
        }
        ApiCommand::CreateSchool {
            name,
            address,
            description,
        } => {
            let school = client
                .create_school(&NewSchool {
                    name,
                    address,
                    description,
                })
                .await
                .map_err(explain)?;
            println!("Created school #{} {}", school.id, school.name);
        }
        ApiCommand::Assignments { school } => {
            let assignments = client.list_assignments(school).await.map_err(explain)?;
            println!("{}", render::assignments(&assignments));
        }
        ApiCommand::CreateAssignment {
            title,
            description,
            due,
            school,
        } => {
            client
                .create_assignment(&NewAssignment {
                    title,
                    description,
                    due_date: due,
                    school,
                })
                .await
                .map_err(explain)?;
            println!("Assignment created");
        }
        ApiCommand::Submissions { school } => {
            let submissions = client.list_submissions(school).await.map_err(explain)?;
            println!("{}", render::submissions(&submissions));
        }
        ApiCommand::Grade { submission, grade } => {
            client
                .grade_submission(submission, grade)
                .await
                .map_err(explain)?;
            println!("Grade updated");
        }
        ApiCommand::Attendance { school } => {
            let records = client.list_attendance(school).await.map_err(explain)?;
            println!("{}", render::attendance(&records));
        }
        ApiCommand::RecordAttendance {
            student,
            status,
            date,
            notes,
        } => {
            client
                .record_attendance(&NewAttendance {
                    student: Some(student),
                    date,
                    status,
                    notes,
                })
                .await
                .map_err(explain)?;
            println!("Attendance recorded");
        }
        ApiCommand::Profiles { school } => {
            let profiles = client.list_profiles(school).await.map_err(explain)?;
            println!("{}", render::profiles(&profiles));
        }
        ApiCommand::Dashboard => {
            let dashboard = client.student_dashboard().await.map_err(explain)?;
            println!("{}", render::dashboard(&dashboard));
        }
        ApiCommand::CheckIn { date, status } => {
            let day = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            client.check_in(day, status).await.map_err(explain)?;
            println!("Check-in successful!");
        }
    }

    Ok(())
}

async fn serve_stub(appConfig: &Config, demo: bool) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", appConfig.stub.bind, appConfig.stub.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid stub address {}:{}",
                appConfig.stub.bind, appConfig.stub.port
            )
        })?;

    let state = if demo {
        tracing::info!("seeding demo data: sign in as teacher/teacher, ada/ada or linus/linus");
        school_stub::StubState::with_demo_data()
    } else {
        school_stub::StubState::new()
    };

    school_stub::serve(state, addr)
        .await
        .with_context(|| format!("stub server on {addr} failed"))
}
