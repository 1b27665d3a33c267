use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::lifecycle::{ApplicationStage, JobStatus, OrderStatus, UnknownVariant};

// --- Identity ---

/// Role
///
/// The RBAC field of a user. Each role owns a dashboard at `/{role}/dashboard`, which is
/// where the authorization gate sends callers who hit another role's area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Tutor,
    Student,
    Admin,
    Superadmin,
    /// Shop owner (Shoppy).
    Shop,
}

impl Role {
    pub const ALL: &'static [Role] = &[
        Role::Tutor,
        Role::Student,
        Role::Admin,
        Role::Superadmin,
        Role::Shop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tutor => "tutor",
            Role::Student => "student",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
            Role::Shop => "shop",
        }
    }

    /// Landing page of this role.
    pub fn dashboard_path(&self) -> String {
        format!("/{}/dashboard", self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tutor" => Ok(Role::Tutor),
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::Superadmin),
            "shop" => Ok(Role::Shop),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// User
///
/// Canonical identity record from the `users` table. The password hash is loaded for
/// sign-in only and never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Profile
///
/// Tutor profile, one per user, upserted from the tutor dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Profile {
    pub user_id: i64,
    pub living_location: Option<String>,
    pub preferred_locations: Option<String>,
    pub gender: Option<String>,
    pub ssc_school: Option<String>,
    pub ssc_group: Option<String>,
    pub ssc_result: Option<f64>,
    pub ssc_medium: Option<String>,
    pub hsc_college: Option<String>,
    pub hsc_group: Option<String>,
    pub hsc_result: Option<f64>,
    pub hsc_medium: Option<String>,
    pub current_university: Option<String>,
    pub current_department: Option<String>,
    pub current_year_in_university: Option<i32>,
    pub last_semester_result: Option<f64>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Jobify ---

/// Job
///
/// A tutoring job listing. `managed_by_id` is the admin who claimed it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Job {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub location: String,
    pub salary: Option<f64>,
    pub publisher: String,
    pub student_gender: Option<String>,
    pub tutor_gender_need: Option<String>,
    pub tutor_university_need: Option<String>,
    pub tutor_university_type_need: Option<String>,
    pub tutor_department_need: Option<String>,
    pub subjects: Option<String>,
    pub days_in_week: Option<String>,
    pub tutoring_time: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    pub views: i64,
    pub posted_by_id: Option<i64>,
    pub managed_by_id: Option<i64>,
    #[ts(type = "string | null")]
    pub managed_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// JobApplication
///
/// Links a user to a job. One per (user, job) pair.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct JobApplication {
    pub id: i64,
    pub user_id: i64,
    pub job_id: i64,
    #[sqlx(try_from = "String")]
    pub stage: ApplicationStage,
    #[ts(type = "string")]
    pub applied_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Application joined with its applicant, for the admin review pages.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationWithUser {
    #[serde(flatten)]
    pub application: JobApplication,
    pub user: User,
    pub stage_color: String,
}

impl ApplicationWithUser {
    pub fn new(application: JobApplication, user: User) -> Self {
        Self {
            stage_color: application.stage.color().to_string(),
            application,
            user,
        }
    }
}

/// Application joined with its job, for the tutor's applied-jobs page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationWithJob {
    #[serde(flatten)]
    pub application: JobApplication,
    pub job: Job,
}

/// Job joined with the admin managing it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobWithManager {
    #[serde(flatten)]
    pub job: Job,
    pub managed_by: Option<User>,
}

/// A job claimed by the calling admin, with its applicants ordered by stage.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ManagedJob {
    #[serde(flatten)]
    pub job: Job,
    pub applications: Vec<ApplicationWithUser>,
}

/// JobFilter
///
/// Preset filters of the public job board (`?filter=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum JobFilter {
    #[default]
    All,
    /// Posted since midnight (UTC).
    Today,
    /// Posted in the last seven days.
    RecentJobs,
    RecentMaleJob,
    RecentFemaleJob,
}

/// Store-level criteria for the public job board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobListing {
    pub search: Option<String>,
    pub created_since: Option<DateTime<Utc>>,
    pub student_gender: Option<String>,
}

impl JobFilter {
    /// listing
    ///
    /// Resolves the preset against `now` into concrete store criteria.
    pub fn listing(self, search: Option<String>, now: DateTime<Utc>) -> JobListing {
        let search = search.filter(|s| !s.trim().is_empty());
        let mut listing = JobListing {
            search,
            ..JobListing::default()
        };
        match self {
            JobFilter::All => {}
            JobFilter::Today => {
                listing.created_since = now
                    .date_naive()
                    .and_hms_opt(0, 0, 0)
                    .map(|midnight| midnight.and_utc());
            }
            JobFilter::RecentJobs => listing.created_since = Some(now - chrono::Duration::days(7)),
            JobFilter::RecentMaleJob => listing.student_gender = Some("Male".to_string()),
            JobFilter::RecentFemaleJob => listing.student_gender = Some("Female".to_string()),
        }
        listing
    }
}

// --- Shoppy ---

/// Shop
///
/// A storefront owned by a user and addressed publicly by its unique `handle`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Shop {
    pub id: Uuid,
    pub owner_id: i64,
    pub name: String,
    pub handle: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl Shop {
    /// handle_for
    ///
    /// Derives the public handle from a shop name: words split on whitespace, `-` and `_`,
    /// each capitalized, joined and prefixed with `@` (`"rimi cake-shop"` → `@RimiCakeShop`).
    pub fn handle_for(name: &str) -> String {
        let pascal: String = name
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                    None => String::new(),
                }
            })
            .collect();
        format!("@{pascal}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Product {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image_url: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Order
///
/// A customer order placed against a shop. `total` is fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Order {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: Option<String>,
    pub total: i64,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// OrderItem
///
/// `price` is the unit price at purchase time, independent of later product edits.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    /// Name of the product if it still exists (joined at read time).
    #[sqlx(default)]
    pub product_name: Option<String>,
    pub quantity: i32,
    pub price: i64,
}

// --- Request Payloads (Form Schemas) ---

/// empty_string_as_none
///
/// HTML forms submit untouched inputs as `field=`; treat that as absent instead of a parse error.
pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(de::Error::custom),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct SignInForm {
    #[serde(default, alias = "emailOrPhone")]
    pub email_or_phone: String,
    #[serde(default)]
    pub password: String,
}

/// SignUpForm
///
/// `account` selects the self-service role; admin roles are only granted by a superadmin.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct SignUpForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
    pub account: Option<Role>,
}

/// Values needed to insert a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateJobForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub salary: Option<f64>,
    #[serde(default)]
    pub publisher: String,
    pub student_gender: Option<String>,
    pub tutor_gender_need: Option<String>,
    pub tutor_university_need: Option<String>,
    pub tutor_university_type_need: Option<String>,
    pub tutor_department_need: Option<String>,
    pub subjects: Option<String>,
    pub days_in_week: Option<String>,
    pub tutoring_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ProfileForm {
    pub living_location: Option<String>,
    pub preferred_locations: Option<String>,
    pub gender: Option<String>,
    pub ssc_school: Option<String>,
    pub ssc_group: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub ssc_result: Option<f64>,
    pub ssc_medium: Option<String>,
    pub hsc_college: Option<String>,
    pub hsc_group: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub hsc_result: Option<f64>,
    pub hsc_medium: Option<String>,
    pub current_university: Option<String>,
    pub current_department: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub current_year_in_university: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub last_semester_result: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobStatusForm {
    pub status: JobStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StageForm {
    pub stage: ApplicationStage,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderStatusForm {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleForm {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateShopForm {
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    pub location: Option<String>,
}

/// ProductForm
///
/// Create/update payload. `shop_id` must name a shop owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ProductForm {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub shop_id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub price: Option<i64>,
    pub image_url: Option<String>,
}

/// Validated product fields ready for the store.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub shop_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image_url: Option<String>,
}

/// PlaceOrderForm
///
/// Public checkout form. Fields are optional at the wire level so that missing values
/// surface as a validation error rather than an extractor rejection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct PlaceOrderForm {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub product_id: Option<Uuid>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub quantity: Option<i32>,
}

/// Validated checkout ready for the store.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub shop_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: Option<String>,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    /// `unit_price * quantity`, checked by the caller.
    pub total: i64,
}

// --- Dashboard & Listing Schemas (Output) ---

/// Pagination
///
/// Page window metadata returned alongside every paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Pagination {
    pub current_page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl Pagination {
    /// Pages past the end are pulled back to the last page, pages below 1 to the first.
    pub fn new(current_page: i64, per_page: i64, total_items: i64) -> Self {
        let total_pages = if per_page > 0 {
            total_items / per_page + i64::from(total_items % per_page > 0)
        } else {
            0
        };
        Self {
            current_page: current_page.clamp(1, total_pages.max(1)),
            per_page,
            total_items,
            total_pages,
        }
    }

    /// Row offset of the current page.
    pub fn offset(&self) -> i64 {
        (self.current_page.max(1) - 1).saturating_mul(self.per_page)
    }
}

/// SuperadminStats
///
/// Platform-wide counters for the superadmin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq, Eq)]
#[ts(export)]
pub struct SuperadminStats {
    pub total_jobs: i64,
    pub new_jobs_today: i64,
    pub total_users: i64,
    pub new_users_today: i64,
    pub admin_count: i64,
    pub tutor_count: i64,
    pub superadmin_count: i64,
}

/// Short confirmation payload returned by form actions that do not redirect.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct ActionMessage {
    pub message: String,
    pub success: bool,
}

impl ActionMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }
}
