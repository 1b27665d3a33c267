use axum::{
    Form,
    extract::{Query, State},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    AppState,
    auth::AuthContext,
    handlers::{APPLIED_JOBS_PER_PAGE, PageQuery},
    models::{ApplicationWithJob, Pagination, Profile, ProfileForm},
    response::{Outcome, Page, attempt},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct TutorDashboard {
    pub profile: Option<Profile>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AppliedJobs {
    pub applications: Vec<ApplicationWithJob>,
    pub pagination: Pagination,
}

/// tutor_dashboard
///
/// [Tutor Route] The caller's profile, if filled in.
#[utoipa::path(
    get,
    path = "/tutor/dashboard",
    responses((status = 200, description = "Tutor profile", body = TutorDashboard))
)]
pub async fn tutor_dashboard(
    user: AuthContext,
    State(state): State<AppState>,
) -> Outcome<Page<TutorDashboard>> {
    let profile = attempt!(state.repo.get_profile(user.id).await);
    Outcome::Data(Page::new(user, TutorDashboard { profile }))
}

/// update_profile
///
/// [Tutor Route] Creates or replaces the caller's profile.
#[utoipa::path(
    post,
    path = "/tutor/profile",
    request_body(content = ProfileForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 200, description = "Profile saved", body = TutorDashboard))
)]
pub async fn update_profile(
    user: AuthContext,
    State(state): State<AppState>,
    Form(form): Form<ProfileForm>,
) -> Outcome<Page<TutorDashboard>> {
    let profile = attempt!(state.repo.upsert_profile(user.id, form).await);
    tracing::debug!(user_id = user.id, "profile updated");
    Outcome::Data(Page::new(
        user,
        TutorDashboard {
            profile: Some(profile),
        },
    ))
}

/// applied_jobs
///
/// [Tutor Route] The caller's applications, newest first, with the job attached.
#[utoipa::path(
    get,
    path = "/tutor/applied-jobs",
    params(PageQuery),
    responses((status = 200, description = "Applied jobs", body = AppliedJobs))
)]
pub async fn applied_jobs(
    user: AuthContext,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Outcome<Page<AppliedJobs>> {
    let total = attempt!(state.repo.count_applied_jobs(user.id).await);
    let pagination = query.paginate(APPLIED_JOBS_PER_PAGE, total);
    let applications = attempt!(state.repo.applied_jobs(user.id, &pagination).await);

    Outcome::Data(Page::new(
        user,
        AppliedJobs {
            applications,
            pagination,
        },
    ))
}
