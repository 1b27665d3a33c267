use axum::extract::State;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    AppState,
    auth::AuthContext,
    models::{Job, JobFilter, Profile},
    response::{Outcome, Page, attempt},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentDashboard {
    pub profile: Option<Profile>,
    /// Jobs posted in the last seven days, newest first.
    pub recent_jobs: Vec<Job>,
}

/// student_dashboard
///
/// [Student Route] The caller's profile and the week's new tutoring jobs.
#[utoipa::path(
    get,
    path = "/student/dashboard",
    responses((status = 200, description = "Student dashboard", body = StudentDashboard))
)]
pub async fn student_dashboard(
    user: AuthContext,
    State(state): State<AppState>,
) -> Outcome<Page<StudentDashboard>> {
    let profile = attempt!(state.repo.get_profile(user.id).await);
    let listing = JobFilter::RecentJobs.listing(None, Utc::now());
    let recent_jobs = attempt!(state.repo.list_jobs(&listing).await);
    Outcome::Data(Page::new(
        user,
        StudentDashboard {
            profile,
            recent_jobs,
        },
    ))
}
