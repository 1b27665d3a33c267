use axum::{
    Form,
    extract::{Path, Query, State},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    AppState,
    auth::AuthContext,
    error::AppError,
    handlers::{APPLICATIONS_PER_PAGE, JOBS_PER_PAGE, PageQuery},
    lifecycle::Lifecycle,
    models::{
        ActionMessage, ApplicationWithUser, Job, JobApplication, JobStatusForm, JobWithManager,
        ManagedJob, Pagination, Profile, StageForm, User,
    },
    repository::ClaimOutcome,
    response::{Outcome, Page, attempt},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboard {
    pub jobs: Vec<JobWithManager>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ManagedJobs {
    pub managed_jobs: Vec<ManagedJob>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobApplications {
    pub job: Job,
    pub applications: Vec<ApplicationWithUser>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserDetails {
    pub profile_user: User,
    pub profile: Option<Profile>,
}

/// Loads a job and checks that `admin_id` manages it.
async fn managed_job(state: &AppState, job_id: i64, admin_id: i64) -> Result<Job, AppError> {
    let job = state
        .repo
        .get_job(job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job"))?;
    if job.managed_by_id != Some(admin_id) {
        return Err(AppError::Forbidden(
            "Forbidden: You are not the manager of this job".to_string(),
        ));
    }
    Ok(job)
}

/// admin_dashboard
///
/// [Admin Route] All jobs with their manager, active first then newest.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    params(PageQuery),
    responses((status = 200, description = "Jobs with managers", body = AdminDashboard))
)]
pub async fn admin_dashboard(
    user: AuthContext,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Outcome<Page<AdminDashboard>> {
    let total = attempt!(state.repo.count_jobs(query.search()).await);
    let pagination = query.paginate(JOBS_PER_PAGE, total);
    let jobs = attempt!(
        state
            .repo
            .jobs_with_managers(query.search(), &pagination)
            .await
    );
    Outcome::Data(Page::new(user, AdminDashboard { jobs, pagination }))
}

/// claim_job
///
/// [Admin Route] Takes over management of an unmanaged job. Exclusive: if another admin got
/// there first the call fails with 409 and the existing manager is kept.
#[utoipa::path(
    post,
    path = "/admin/jobs/{id}/claim",
    params(("id" = i64, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job claimed", body = ActionMessage),
        (status = 404, description = "Job not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already managed", body = crate::error::ErrorBody)
    )
)]
pub async fn claim_job(
    user: AuthContext,
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
) -> Outcome<ActionMessage> {
    match attempt!(state.repo.claim_job(job_id, user.id).await) {
        ClaimOutcome::Claimed(job) => {
            tracing::info!(job_id = job.id, admin_id = user.id, "job claimed");
            Outcome::Data(ActionMessage::success("Job is now managed by you."))
        }
        ClaimOutcome::AlreadyManaged { managed_by } if managed_by == user.id => {
            AppError::Conflict("You already manage this job.".to_string()).into()
        }
        ClaimOutcome::AlreadyManaged { .. } => {
            AppError::Conflict("Job is already managed by another admin.".to_string()).into()
        }
        ClaimOutcome::NotFound => AppError::not_found("Job").into(),
    }
}

/// managed_jobs
///
/// [Admin Route] Jobs the caller manages, each with its applicants.
#[utoipa::path(
    get,
    path = "/admin/manage",
    params(PageQuery),
    responses((status = 200, description = "Managed jobs", body = ManagedJobs))
)]
pub async fn managed_jobs(
    user: AuthContext,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Outcome<Page<ManagedJobs>> {
    let total = attempt!(state.repo.count_managed_jobs(user.id, query.search()).await);
    let pagination = query.paginate(JOBS_PER_PAGE, total);
    let managed_jobs = attempt!(
        state
            .repo
            .managed_jobs(user.id, query.search(), &pagination)
            .await
    );
    Outcome::Data(Page::new(
        user,
        ManagedJobs {
            managed_jobs,
            pagination,
        },
    ))
}

/// set_job_status
///
/// [Admin Route] Activates or deactivates a job the caller manages.
#[utoipa::path(
    post,
    path = "/admin/jobs/{id}/status",
    params(("id" = i64, Path, description = "Job id")),
    request_body(content = JobStatusForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Status updated", body = ActionMessage),
        (status = 403, description = "Not the manager", body = crate::error::ErrorBody),
        (status = 404, description = "Job not found", body = crate::error::ErrorBody)
    )
)]
pub async fn set_job_status(
    user: AuthContext,
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    Form(form): Form<JobStatusForm>,
) -> Outcome<ActionMessage> {
    attempt!(managed_job(&state, job_id, user.id).await);
    if attempt!(state.repo.set_job_status(job_id, form.status).await).is_none() {
        return AppError::not_found("Job").into();
    }
    tracing::info!(job_id, status = form.status.as_str(), "job status updated");
    Outcome::Data(ActionMessage::success("Job status updated successfully."))
}

/// job_applications
///
/// [Admin Route] Applicants of a job the caller manages, searchable by name or email.
#[utoipa::path(
    get,
    path = "/admin/jobs/{id}/applications",
    params(("id" = i64, Path, description = "Job id"), PageQuery),
    responses(
        (status = 200, description = "Applications", body = JobApplications),
        (status = 403, description = "Not the manager", body = crate::error::ErrorBody),
        (status = 404, description = "Job not found", body = crate::error::ErrorBody)
    )
)]
pub async fn job_applications(
    user: AuthContext,
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Outcome<Page<JobApplications>> {
    let job = attempt!(managed_job(&state, job_id, user.id).await);
    let total = attempt!(state.repo.count_job_applications(job_id, query.search()).await);
    let pagination = query.paginate(APPLICATIONS_PER_PAGE, total);
    let applications = attempt!(
        state
            .repo
            .job_applications(job_id, query.search(), &pagination)
            .await
    );
    Outcome::Data(Page::new(
        user,
        JobApplications {
            job,
            applications,
            pagination,
        },
    ))
}

/// set_application_stage
///
/// [Admin Route] Moves an application to any stage. No transition rules apply; the
/// operator picks the stage.
#[utoipa::path(
    post,
    path = "/admin/applications/{id}/stage",
    params(("id" = i64, Path, description = "Application id")),
    request_body(content = StageForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Stage updated", body = JobApplication),
        (status = 403, description = "Not the manager of the job", body = crate::error::ErrorBody),
        (status = 404, description = "Application not found", body = crate::error::ErrorBody)
    )
)]
pub async fn set_application_stage(
    user: AuthContext,
    State(state): State<AppState>,
    Path(application_id): Path<i64>,
    Form(form): Form<StageForm>,
) -> Outcome<JobApplication> {
    let Some(application) = attempt!(state.repo.get_application(application_id).await) else {
        return AppError::not_found("Application").into();
    };
    attempt!(managed_job(&state, application.job_id, user.id).await);

    match attempt!(
        state
            .repo
            .set_application_stage(application_id, form.stage)
            .await
    ) {
        Some(updated) => {
            tracing::info!(application_id, stage = updated.stage.as_str(), "stage updated");
            Outcome::Data(updated)
        }
        None => AppError::not_found("Application").into(),
    }
}

/// user_details
///
/// [Admin Route] An applicant's account and profile.
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User with profile", body = UserDetails),
        (status = 404, description = "User not found", body = crate::error::ErrorBody)
    )
)]
pub async fn user_details(
    user: AuthContext,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Outcome<Page<UserDetails>> {
    let Some(profile_user) = attempt!(state.repo.get_user(user_id).await) else {
        return AppError::not_found("User").into();
    };
    let profile = attempt!(state.repo.get_profile(user_id).await);
    Outcome::Data(Page::new(
        user,
        UserDetails {
            profile_user,
            profile,
        },
    ))
}
