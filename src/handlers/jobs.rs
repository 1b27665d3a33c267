use axum::{
    Form,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    AppState,
    auth::{AuthContext, MaybeSession},
    error::AppError,
    handlers::non_blank,
    models::{ActionMessage, CreateJobForm, Job, JobFilter, Profile, User},
    repository::RepositoryError,
    response::{Outcome, Page, attempt},
};

/// JobBoardQuery
///
/// Query parameters of the public job board (`GET /jobs`).
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct JobBoardQuery {
    pub search: Option<String>,
    /// `all`, `today`, `recent-jobs`, `recent-male-job` or `recent-female-job`.
    pub filter: Option<JobFilter>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobBoard {
    pub jobs: Vec<Job>,
    pub total: usize,
    pub search: String,
    pub filter: JobFilter,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobDetails {
    pub job: Job,
    pub posted_by: Option<User>,
    pub poster_profile: Option<Profile>,
    /// Whether the signed-in visitor already applied. Always false for anonymous visitors.
    pub has_applied: bool,
    pub application_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedJob {
    pub job: Job,
}

/// list_jobs
///
/// [Public Route] Job board, newest first, with optional search and preset filter.
#[utoipa::path(
    get,
    path = "/jobs",
    params(JobBoardQuery),
    responses((status = 200, description = "Job board", body = JobBoard))
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobBoardQuery>,
) -> Outcome<JobBoard> {
    let filter = query.filter.unwrap_or_default();
    let listing = filter.listing(query.search.clone(), Utc::now());
    let jobs = attempt!(state.repo.list_jobs(&listing).await);

    Outcome::Data(JobBoard {
        total: jobs.len(),
        jobs,
        search: query.search.unwrap_or_default(),
        filter,
    })
}

/// job_details
///
/// [Public Route] Counts the view, then returns the job with its poster and, for a signed-in
/// visitor, whether they already applied.
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    params(("id" = i64, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job details", body = JobDetails),
        (status = 404, description = "Job not found", body = crate::error::ErrorBody)
    )
)]
pub async fn job_details(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    MaybeSession(session): MaybeSession,
) -> Outcome<JobDetails> {
    let Some(job) = attempt!(state.repo.record_job_view(id).await) else {
        return AppError::not_found("Job").into();
    };

    let (posted_by, poster_profile) = match job.posted_by_id {
        Some(poster_id) => (
            attempt!(state.repo.get_user(poster_id).await),
            attempt!(state.repo.get_profile(poster_id).await),
        ),
        None => (None, None),
    };

    let has_applied = match &session {
        Some(claim) => attempt!(state.repo.find_application(claim.user_id, id).await).is_some(),
        None => false,
    };
    let application_count = attempt!(state.repo.count_job_applications(id, None).await);

    Outcome::Data(JobDetails {
        job,
        posted_by,
        poster_profile,
        has_applied,
        application_count,
    })
}

/// apply_to_job
///
/// [Public Route, session required] Creates an application in stage `APPLIED`.
///
/// A second application for the same job is refused by the pre-check with 409
/// "Already applied"; the unique (user, job) constraint maps to the same 409 when two
/// requests race past the pre-check.
#[utoipa::path(
    post,
    path = "/jobs/{id}/apply",
    params(("id" = i64, Path, description = "Job id")),
    responses(
        (status = 200, description = "Application created", body = ActionMessage),
        (status = 401, description = "No session", body = crate::error::ErrorBody),
        (status = 404, description = "Job not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already applied", body = crate::error::ErrorBody)
    )
)]
pub async fn apply_to_job(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    MaybeSession(session): MaybeSession,
) -> Outcome<ActionMessage> {
    let Some(claim) = session else {
        return AppError::Unauthorized("User not authenticated".to_string()).into();
    };
    if attempt!(state.repo.get_user(claim.user_id).await).is_none() {
        return AppError::Unauthorized("User not authenticated".to_string()).into();
    }
    if attempt!(state.repo.get_job(job_id).await).is_none() {
        return AppError::not_found("Job").into();
    }

    if attempt!(state.repo.find_application(claim.user_id, job_id).await).is_some() {
        return AppError::Conflict("Already applied".to_string()).into();
    }

    match state.repo.create_application(claim.user_id, job_id).await {
        Ok(application) => {
            tracing::info!(
                application_id = application.id,
                user_id = claim.user_id,
                job_id,
                "application created"
            );
            Outcome::Data(ActionMessage::success("Applied successfully"))
        }
        Err(RepositoryError::Conflict(_)) => AppError::Conflict("Already applied".to_string()).into(),
        Err(e) => AppError::from(e).into(),
    }
}

/// create_job
///
/// [Admin/Superadmin Route] Publishes a new job posted by the caller.
#[utoipa::path(
    post,
    path = "/jobs",
    request_body(content = CreateJobForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Job created", body = CreatedJob),
        (status = 400, description = "Missing required fields", body = crate::error::ErrorBody)
    )
)]
pub async fn create_job(
    user: AuthContext,
    State(state): State<AppState>,
    Form(mut form): Form<CreateJobForm>,
) -> Outcome<Page<CreatedJob>> {
    form.title = form.title.trim().to_string();
    form.location = form.location.trim().to_string();
    form.publisher = form.publisher.trim().to_string();
    if form.title.is_empty() || form.location.is_empty() || form.publisher.is_empty() {
        return AppError::Validation("Title, location and publisher are required.".to_string())
            .into();
    }
    form.student_gender = non_blank(form.student_gender);
    form.subjects = non_blank(form.subjects);

    let job = attempt!(state.repo.create_job(form, user.id).await);
    tracing::info!(job_id = job.id, posted_by = user.id, "job created");
    Outcome::Data(Page::new(user, CreatedJob { job }))
}
