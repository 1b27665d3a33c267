use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, query_builder::QueryBuilder};
use uuid::Uuid;

use crate::{
    lifecycle::{ApplicationStage, JobStatus, Lifecycle, OrderStatus},
    models::{
        ApplicationWithJob, ApplicationWithUser, CreateJobForm, CreateShopForm, Job,
        JobApplication, JobListing, JobWithManager, ManagedJob, NewOrder, NewUser, Order,
        OrderItem, Pagination, Product, NewProduct, Profile, ProfileForm, Role, Shop,
        SuperadminStats, User,
    },
};

/// RepositoryError
///
/// Store-level failures. Unique-constraint violations are surfaced as `Conflict` so that
/// callers can turn them into a 409 instead of a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Constraint violation (duplicate email, handle, application, ...).
    #[error("{0}")]
    Conflict(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Maps a unique violation to `Conflict(message)`, everything else to `Database`.
fn conflict_or(message: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError + '_ {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(message.to_owned());
        }
        RepositoryError::Database(e)
    }
}

/// Result of an admin trying to take over a job.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    Claimed(Job),
    /// Someone (possibly the caller) already manages it.
    AlreadyManaged { managed_by: i64 },
    NotFound,
}

/// Repository Trait
///
/// Every persistence operation the handlers need. Implemented by [`PostgresRepository`] for
/// production and by [`crate::memory::InMemoryRepository`] for tests and local experiments.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>>;
    /// Looks a user up by email or phone, whichever matches.
    async fn find_user_by_login(&self, email_or_phone: &str) -> RepoResult<Option<User>>;
    async fn email_taken(&self, email: &str) -> RepoResult<bool>;
    async fn phone_taken(&self, phone: &str) -> RepoResult<bool>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    /// Creates the user unless one with the same email exists. Returns whether a row was inserted.
    async fn seed_user(&self, user: NewUser) -> RepoResult<bool>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn set_user_role(&self, id: i64, role: Role) -> RepoResult<Option<User>>;
    async fn delete_user(&self, id: i64) -> RepoResult<bool>;
    /// Platform counters; "new" means created at or after `since`.
    async fn platform_stats(&self, since: DateTime<Utc>) -> RepoResult<SuperadminStats>;

    // --- Profiles ---
    async fn get_profile(&self, user_id: i64) -> RepoResult<Option<Profile>>;
    async fn upsert_profile(&self, user_id: i64, form: ProfileForm) -> RepoResult<Profile>;

    // --- Jobs ---
    async fn list_jobs(&self, listing: &JobListing) -> RepoResult<Vec<Job>>;
    async fn get_job(&self, id: i64) -> RepoResult<Option<Job>>;
    /// Increments the view counter and returns the updated job.
    async fn record_job_view(&self, id: i64) -> RepoResult<Option<Job>>;
    async fn create_job(&self, form: CreateJobForm, posted_by: i64) -> RepoResult<Job>;
    async fn set_job_status(&self, id: i64, status: JobStatus) -> RepoResult<Option<Job>>;
    async fn count_jobs(&self, search: Option<&str>) -> RepoResult<i64>;
    async fn jobs_with_managers(
        &self,
        search: Option<&str>,
        page: &Pagination,
    ) -> RepoResult<Vec<JobWithManager>>;
    /// Assigns the job to `admin_id` only if nobody manages it yet.
    async fn claim_job(&self, job_id: i64, admin_id: i64) -> RepoResult<ClaimOutcome>;
    async fn count_managed_jobs(&self, admin_id: i64, search: Option<&str>) -> RepoResult<i64>;
    async fn managed_jobs(
        &self,
        admin_id: i64,
        search: Option<&str>,
        page: &Pagination,
    ) -> RepoResult<Vec<ManagedJob>>;

    // --- Applications ---
    async fn find_application(&self, user_id: i64, job_id: i64)
    -> RepoResult<Option<JobApplication>>;
    async fn get_application(&self, id: i64) -> RepoResult<Option<JobApplication>>;
    /// Fails with `Conflict` when the (user, job) pair already exists.
    async fn create_application(&self, user_id: i64, job_id: i64) -> RepoResult<JobApplication>;
    async fn set_application_stage(
        &self,
        id: i64,
        stage: ApplicationStage,
    ) -> RepoResult<Option<JobApplication>>;
    /// Applicant search matches name or email.
    async fn count_job_applications(&self, job_id: i64, search: Option<&str>) -> RepoResult<i64>;
    async fn job_applications(
        &self,
        job_id: i64,
        search: Option<&str>,
        page: &Pagination,
    ) -> RepoResult<Vec<ApplicationWithUser>>;
    async fn count_applied_jobs(&self, user_id: i64) -> RepoResult<i64>;
    async fn applied_jobs(
        &self,
        user_id: i64,
        page: &Pagination,
    ) -> RepoResult<Vec<ApplicationWithJob>>;

    // --- Shops ---
    /// Fails with `Conflict` when the handle is taken.
    async fn create_shop(
        &self,
        owner_id: i64,
        handle: String,
        form: CreateShopForm,
    ) -> RepoResult<Shop>;
    async fn get_shop(&self, id: Uuid) -> RepoResult<Option<Shop>>;
    async fn get_shop_by_handle(&self, handle: &str) -> RepoResult<Option<Shop>>;
    async fn shops_by_owner(&self, owner_id: i64) -> RepoResult<Vec<Shop>>;

    // --- Products ---
    async fn count_products(&self, shop_id: Uuid) -> RepoResult<i64>;
    /// Newest first. `None` returns the whole catalogue.
    async fn list_products(
        &self,
        shop_id: Uuid,
        page: Option<&Pagination>,
    ) -> RepoResult<Vec<Product>>;
    async fn get_product(&self, id: Uuid) -> RepoResult<Option<Product>>;
    async fn create_product(&self, product: NewProduct) -> RepoResult<Product>;
    async fn update_product(&self, id: Uuid, product: NewProduct) -> RepoResult<Option<Product>>;
    async fn delete_product(&self, id: Uuid) -> RepoResult<bool>;

    // --- Orders ---
    /// Creates the order and its single item atomically, status `pending`.
    async fn place_order(&self, order: NewOrder) -> RepoResult<Order>;
    async fn get_order(&self, id: Uuid) -> RepoResult<Option<Order>>;
    async fn order_items(&self, order_id: Uuid) -> RepoResult<Vec<OrderItem>>;
    async fn count_orders(&self, shop_id: Uuid) -> RepoResult<i64>;
    async fn list_orders(&self, shop_id: Uuid, page: &Pagination) -> RepoResult<Vec<Order>>;
    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> RepoResult<Option<Order>>;
}

/// RepositoryState
///
/// The store handle shared through `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are checked at runtime (`query_as` + `bind`),
/// so building the crate does not need a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn users_by_ids(&self, ids: &[i64]) -> RepoResult<HashMap<i64, User>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    async fn jobs_by_ids(&self, ids: &[i64]) -> RepoResult<HashMap<i64, Job>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let jobs = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(jobs.into_iter().map(|j| (j.id, j)).collect())
    }

    /// Joins each application with its applicant, dropping rows whose user vanished.
    async fn with_users(
        &self,
        applications: Vec<JobApplication>,
    ) -> RepoResult<Vec<ApplicationWithUser>> {
        let ids: Vec<i64> = applications.iter().map(|a| a.user_id).collect();
        let users = self.users_by_ids(&ids).await?;
        Ok(applications
            .into_iter()
            .filter_map(|a| {
                let user = users.get(&a.user_id).cloned()?;
                Some(ApplicationWithUser::new(a, user))
            })
            .collect())
    }
}

fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"))
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_login(&self, email_or_phone: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 OR phone = $1 ORDER BY id LIMIT 1",
        )
        .bind(email_or_phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn email_taken(&self, email: &str) -> RepoResult<bool> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(taken)
    }

    async fn phone_taken(&self, phone: &str) -> RepoResult<bool> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE phone = $1)")
                .bind(phone)
                .fetch_one(&self.pool)
                .await?;
        Ok(taken)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, phone, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_or("User already exists"))
    }

    async fn seed_user(&self, user: NewUser) -> RepoResult<bool> {
        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO users (name, email, phone, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(inserted.is_some())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn set_user_role(&self, id: i64, role: Role) -> RepoResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>("UPDATE users SET role = $2 WHERE id = $1 RETURNING *")
                .bind(id)
                .bind(role.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn platform_stats(&self, since: DateTime<Utc>) -> RepoResult<SuperadminStats> {
        let stats = sqlx::query_as::<_, SuperadminStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM jobs) AS total_jobs,
                (SELECT COUNT(*) FROM jobs WHERE created_at >= $1) AS new_jobs_today,
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM users WHERE created_at >= $1) AS new_users_today,
                (SELECT COUNT(*) FROM users WHERE role = 'admin') AS admin_count,
                (SELECT COUNT(*) FROM users WHERE role = 'tutor') AS tutor_count,
                (SELECT COUNT(*) FROM users WHERE role = 'superadmin') AS superadmin_count
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn get_profile(&self, user_id: i64) -> RepoResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn upsert_profile(&self, user_id: i64, form: ProfileForm) -> RepoResult<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (
                user_id, living_location, preferred_locations, gender,
                ssc_school, ssc_group, ssc_result, ssc_medium,
                hsc_college, hsc_group, hsc_result, hsc_medium,
                current_university, current_department, current_year_in_university,
                last_semester_result
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (user_id) DO UPDATE SET
                living_location = EXCLUDED.living_location,
                preferred_locations = EXCLUDED.preferred_locations,
                gender = EXCLUDED.gender,
                ssc_school = EXCLUDED.ssc_school,
                ssc_group = EXCLUDED.ssc_group,
                ssc_result = EXCLUDED.ssc_result,
                ssc_medium = EXCLUDED.ssc_medium,
                hsc_college = EXCLUDED.hsc_college,
                hsc_group = EXCLUDED.hsc_group,
                hsc_result = EXCLUDED.hsc_result,
                hsc_medium = EXCLUDED.hsc_medium,
                current_university = EXCLUDED.current_university,
                current_department = EXCLUDED.current_department,
                current_year_in_university = EXCLUDED.current_year_in_university,
                last_semester_result = EXCLUDED.last_semester_result,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(form.living_location)
        .bind(form.preferred_locations)
        .bind(form.gender)
        .bind(form.ssc_school)
        .bind(form.ssc_group)
        .bind(form.ssc_result)
        .bind(form.ssc_medium)
        .bind(form.hsc_college)
        .bind(form.hsc_group)
        .bind(form.hsc_result)
        .bind(form.hsc_medium)
        .bind(form.current_university)
        .bind(form.current_department)
        .bind(form.current_year_in_university)
        .bind(form.last_semester_result)
        .fetch_one(&self.pool)
        .await?;
        Ok(profile)
    }

    /// list_jobs
    ///
    /// Public board. Optional criteria are appended with `QueryBuilder` so every value is bound.
    async fn list_jobs(&self, listing: &JobListing) -> RepoResult<Vec<Job>> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT * FROM jobs WHERE 1 = 1");

        if let Some(since) = listing.created_since {
            builder.push(" AND created_at >= ");
            builder.push_bind(since);
        }
        if let Some(gender) = &listing.student_gender {
            builder.push(" AND student_gender = ");
            builder.push_bind(gender.clone());
        }
        if let Some(pattern) = like_pattern(listing.search.as_deref()) {
            builder.push(" AND (title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR location ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR subjects ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
        builder.push(" ORDER BY created_at DESC");

        let jobs = builder.build_query_as::<Job>().fetch_all(&self.pool).await?;
        Ok(jobs)
    }

    async fn get_job(&self, id: i64) -> RepoResult<Option<Job>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn record_job_view(&self, id: i64) -> RepoResult<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            "UPDATE jobs SET views = views + 1 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn create_job(&self, form: CreateJobForm, posted_by: i64) -> RepoResult<Job> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (
                title, description, location, salary, publisher, student_gender,
                tutor_gender_need, tutor_university_need, tutor_university_type_need,
                tutor_department_need, subjects, days_in_week, tutoring_time, posted_by_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(form.title)
        .bind(form.description)
        .bind(form.location)
        .bind(form.salary)
        .bind(form.publisher)
        .bind(form.student_gender)
        .bind(form.tutor_gender_need)
        .bind(form.tutor_university_need)
        .bind(form.tutor_university_type_need)
        .bind(form.tutor_department_need)
        .bind(form.subjects)
        .bind(form.days_in_week)
        .bind(form.tutoring_time)
        .bind(posted_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(job)
    }

    async fn set_job_status(&self, id: i64, status: JobStatus) -> RepoResult<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn count_jobs(&self, search: Option<&str>) -> RepoResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM jobs
            WHERE ($1::text IS NULL OR title ILIKE $1 OR description ILIKE $1)
            "#,
        )
        .bind(like_pattern(search))
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn jobs_with_managers(
        &self,
        search: Option<&str>,
        page: &Pagination,
    ) -> RepoResult<Vec<JobWithManager>> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE ($1::text IS NULL OR title ILIKE $1 OR description ILIKE $1)
            ORDER BY status ASC, created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(like_pattern(search))
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let manager_ids: Vec<i64> = jobs.iter().filter_map(|j| j.managed_by_id).collect();
        let managers = self.users_by_ids(&manager_ids).await?;

        Ok(jobs
            .into_iter()
            .map(|job| JobWithManager {
                managed_by: job.managed_by_id.and_then(|id| managers.get(&id).cloned()),
                job,
            })
            .collect())
    }

    /// claim_job
    ///
    /// Runs in one transaction: the conditional update only succeeds while `managed_by_id`
    /// is still NULL, so two admins racing for the same job cannot both win.
    async fn claim_job(&self, job_id: i64, admin_id: i64) -> RepoResult<ClaimOutcome> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET managed_by_id = $2, managed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND managed_by_id IS NULL
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(admin_id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match claimed {
            Some(job) => ClaimOutcome::Claimed(job),
            None => {
                let current: Option<Option<i64>> =
                    sqlx::query_scalar("SELECT managed_by_id FROM jobs WHERE id = $1")
                        .bind(job_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                match current {
                    Some(Some(managed_by)) => ClaimOutcome::AlreadyManaged { managed_by },
                    _ => ClaimOutcome::NotFound,
                }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn count_managed_jobs(&self, admin_id: i64, search: Option<&str>) -> RepoResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM jobs
            WHERE managed_by_id = $1
              AND ($2::text IS NULL OR title ILIKE $2 OR description ILIKE $2)
            "#,
        )
        .bind(admin_id)
        .bind(like_pattern(search))
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn managed_jobs(
        &self,
        admin_id: i64,
        search: Option<&str>,
        page: &Pagination,
    ) -> RepoResult<Vec<ManagedJob>> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE managed_by_id = $1
              AND ($2::text IS NULL OR title ILIKE $2 OR description ILIKE $2)
            ORDER BY status ASC, created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(admin_id)
        .bind(like_pattern(search))
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let job_ids: Vec<i64> = jobs.iter().map(|j| j.id).collect();
        let applications = sqlx::query_as::<_, JobApplication>(
            "SELECT * FROM job_applications WHERE job_id = ANY($1) ORDER BY stage ASC, applied_at ASC",
        )
        .bind(&job_ids)
        .fetch_all(&self.pool)
        .await?;
        let applications = self.with_users(applications).await?;

        let mut by_job: HashMap<i64, Vec<ApplicationWithUser>> = HashMap::new();
        for application in applications {
            by_job
                .entry(application.application.job_id)
                .or_default()
                .push(application);
        }

        Ok(jobs
            .into_iter()
            .map(|job| ManagedJob {
                applications: by_job.remove(&job.id).unwrap_or_default(),
                job,
            })
            .collect())
    }

    async fn find_application(
        &self,
        user_id: i64,
        job_id: i64,
    ) -> RepoResult<Option<JobApplication>> {
        let application = sqlx::query_as::<_, JobApplication>(
            "SELECT * FROM job_applications WHERE user_id = $1 AND job_id = $2",
        )
        .bind(user_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(application)
    }

    async fn get_application(&self, id: i64) -> RepoResult<Option<JobApplication>> {
        let application =
            sqlx::query_as::<_, JobApplication>("SELECT * FROM job_applications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(application)
    }

    async fn create_application(&self, user_id: i64, job_id: i64) -> RepoResult<JobApplication> {
        sqlx::query_as::<_, JobApplication>(
            r#"
            INSERT INTO job_applications (user_id, job_id, stage)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(job_id)
        .bind(ApplicationStage::Applied.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_or("Already applied"))
    }

    async fn set_application_stage(
        &self,
        id: i64,
        stage: ApplicationStage,
    ) -> RepoResult<Option<JobApplication>> {
        let application = sqlx::query_as::<_, JobApplication>(
            "UPDATE job_applications SET stage = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(stage.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(application)
    }

    async fn count_job_applications(&self, job_id: i64, search: Option<&str>) -> RepoResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM job_applications a
            JOIN users u ON u.id = a.user_id
            WHERE a.job_id = $1
              AND ($2::text IS NULL OR u.name ILIKE $2 OR u.email ILIKE $2)
            "#,
        )
        .bind(job_id)
        .bind(like_pattern(search))
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn job_applications(
        &self,
        job_id: i64,
        search: Option<&str>,
        page: &Pagination,
    ) -> RepoResult<Vec<ApplicationWithUser>> {
        let applications = sqlx::query_as::<_, JobApplication>(
            r#"
            SELECT a.* FROM job_applications a
            JOIN users u ON u.id = a.user_id
            WHERE a.job_id = $1
              AND ($2::text IS NULL OR u.name ILIKE $2 OR u.email ILIKE $2)
            ORDER BY a.applied_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(job_id)
        .bind(like_pattern(search))
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        self.with_users(applications).await
    }

    async fn count_applied_jobs(&self, user_id: i64) -> RepoResult<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM job_applications WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }

    async fn applied_jobs(
        &self,
        user_id: i64,
        page: &Pagination,
    ) -> RepoResult<Vec<ApplicationWithJob>> {
        let applications = sqlx::query_as::<_, JobApplication>(
            r#"
            SELECT * FROM job_applications
            WHERE user_id = $1
            ORDER BY applied_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let job_ids: Vec<i64> = applications.iter().map(|a| a.job_id).collect();
        let jobs = self.jobs_by_ids(&job_ids).await?;

        Ok(applications
            .into_iter()
            .filter_map(|application| {
                jobs.get(&application.job_id)
                    .cloned()
                    .map(|job| ApplicationWithJob { application, job })
            })
            .collect())
    }

    async fn create_shop(
        &self,
        owner_id: i64,
        handle: String,
        form: CreateShopForm,
    ) -> RepoResult<Shop> {
        sqlx::query_as::<_, Shop>(
            r#"
            INSERT INTO shops (id, owner_id, name, handle, phone, location)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(form.name.trim())
        .bind(&handle)
        .bind(form.phone)
        .bind(form.location)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_or("Shop handle already taken"))
    }

    async fn get_shop(&self, id: Uuid) -> RepoResult<Option<Shop>> {
        let shop = sqlx::query_as::<_, Shop>("SELECT * FROM shops WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(shop)
    }

    async fn get_shop_by_handle(&self, handle: &str) -> RepoResult<Option<Shop>> {
        let shop = sqlx::query_as::<_, Shop>("SELECT * FROM shops WHERE handle = $1")
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?;
        Ok(shop)
    }

    async fn shops_by_owner(&self, owner_id: i64) -> RepoResult<Vec<Shop>> {
        let shops = sqlx::query_as::<_, Shop>(
            "SELECT * FROM shops WHERE owner_id = $1 ORDER BY created_at ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(shops)
    }

    async fn count_products(&self, shop_id: Uuid) -> RepoResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE shop_id = $1")
            .bind(shop_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn list_products(
        &self,
        shop_id: Uuid,
        page: Option<&Pagination>,
    ) -> RepoResult<Vec<Product>> {
        let (limit, offset) = match page {
            Some(page) => (Some(page.per_page), page.offset()),
            None => (None, 0),
        };
        // LIMIT NULL means no limit in Postgres.
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE shop_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(shop_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn get_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn create_product(&self, product: NewProduct) -> RepoResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, shop_id, name, description, price, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.shop_id)
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(product.image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    async fn update_product(&self, id: Uuid, product: NewProduct) -> RepoResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4, image_url = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(product.image_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn delete_product(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// place_order
    ///
    /// Order and item are written in one transaction. The item keeps the unit price
    /// at purchase time.
    async fn place_order(&self, order: NewOrder) -> RepoResult<Order> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (id, shop_id, customer_name, customer_phone, customer_address, total, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order.shop_id)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.customer_address)
        .bind(order.total)
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(created.id)
        .bind(order.product_id)
        .bind(order.quantity)
        .bind(order.unit_price)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn order_items(&self, order_id: Uuid) -> RepoResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name, oi.quantity, oi.price
            FROM order_items oi
            LEFT JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn count_orders(&self, shop_id: Uuid) -> RepoResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE shop_id = $1")
            .bind(shop_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn list_orders(&self, shop_id: Uuid, page: &Pagination) -> RepoResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE shop_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(shop_id)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> RepoResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }
}
