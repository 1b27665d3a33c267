use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    lifecycle::{ApplicationStage, JobStatus, OrderStatus},
    models::{
        ApplicationWithJob, ApplicationWithUser, CreateJobForm, CreateShopForm, Job,
        JobApplication, JobListing, JobWithManager, ManagedJob, NewOrder, NewUser, Order,
        OrderItem, Pagination, Product, NewProduct, Profile, ProfileForm, Role, Shop,
        SuperadminStats, User,
    },
    repository::{ClaimOutcome, RepoResult, Repository, RepositoryError},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    profiles: HashMap<i64, Profile>,
    jobs: Vec<Job>,
    applications: Vec<JobApplication>,
    shops: Vec<Shop>,
    products: Vec<Product>,
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    next_user: i64,
    next_job: i64,
    next_application: i64,
}

impl Tables {
    fn user(&self, id: i64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn job(&self, id: i64) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    fn with_user(&self, application: &JobApplication) -> Option<ApplicationWithUser> {
        self.user(application.user_id)
            .cloned()
            .map(|user| ApplicationWithUser::new(application.clone(), user))
    }

    fn applicants(&self, job_id: i64, search: Option<&str>) -> Vec<ApplicationWithUser> {
        let mut found: Vec<ApplicationWithUser> = self
            .applications
            .iter()
            .filter(|a| a.job_id == job_id)
            .filter_map(|a| self.with_user(a))
            .filter(|a| contains_any(search, &[a.user.name.as_str(), a.user.email.as_str()]))
            .collect();
        found.sort_by(|a, b| b.application.applied_at.cmp(&a.application.applied_at));
        found
    }

    fn managed(&self, admin_id: i64, search: Option<&str>) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self
            .jobs
            .iter()
            .filter(|j| j.managed_by_id == Some(admin_id))
            .filter(|j| contains_any(search, &[j.title.as_str(), j.description.as_str()]))
            .collect();
        sort_for_admin(&mut jobs);
        jobs
    }
}

/// Case-insensitive substring match against any of `fields`; no search matches everything.
fn contains_any(search: Option<&str>, fields: &[&str]) -> bool {
    match search.map(str::trim).filter(|s| !s.is_empty()) {
        None => true,
        Some(needle) => {
            let needle = needle.to_lowercase();
            fields.iter().any(|f| f.to_lowercase().contains(&needle))
        }
    }
}

fn sort_for_admin(jobs: &mut [&Job]) {
    jobs.sort_by(|a, b| {
        a.status
            .to_string()
            .cmp(&b.status.to_string())
            .then(b.created_at.cmp(&a.created_at))
    });
}

fn window<T>(rows: Vec<T>, page: &Pagination) -> Vec<T> {
    rows.into_iter()
        .skip(page.offset().max(0) as usize)
        .take(page.per_page.max(0) as usize)
        .collect()
}

/// InMemoryRepository
///
/// `Repository` kept entirely in process memory. Enforces the same uniqueness rules as the
/// SQL schema (email, phone, shop handle, one application per user and job) so that handler
/// tests observe the same conflicts.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully formed job (tests use this to control ids and timestamps).
    pub async fn insert_job(&self, job: Job) -> Job {
        let mut t = self.tables.write().await;
        t.next_job = t.next_job.max(job.id);
        t.jobs.push(job.clone());
        job
    }

    /// Inserts a fully formed user.
    pub async fn insert_user(&self, user: User) -> User {
        let mut t = self.tables.write().await;
        t.next_user = t.next_user.max(user.id);
        t.users.push(user.clone());
        user
    }

    pub async fn insert_order(&self, order: Order, items: Vec<OrderItem>) -> Order {
        let mut t = self.tables.write().await;
        t.orders.push(order.clone());
        t.items.extend(items);
        order
    }

    /// Number of stored applications for a (user, job) pair.
    pub async fn application_count(&self, user_id: i64, job_id: i64) -> usize {
        let t = self.tables.read().await;
        t.applications
            .iter()
            .filter(|a| a.user_id == user_id && a.job_id == job_id)
            .count()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.tables.read().await.user(id).cloned())
    }

    async fn find_user_by_login(&self, email_or_phone: &str) -> RepoResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users
            .iter()
            .find(|u| u.email == email_or_phone || u.phone.as_deref() == Some(email_or_phone))
            .cloned())
    }

    async fn email_taken(&self, email: &str) -> RepoResult<bool> {
        Ok(self.tables.read().await.users.iter().any(|u| u.email == email))
    }

    async fn phone_taken(&self, phone: &str) -> RepoResult<bool> {
        let t = self.tables.read().await;
        Ok(t.users.iter().any(|u| u.phone.as_deref() == Some(phone)))
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut t = self.tables.write().await;
        let duplicate = t.users.iter().any(|u| {
            u.email == user.email || (user.phone.is_some() && u.phone == user.phone)
        });
        if duplicate {
            return Err(RepositoryError::Conflict("User already exists".to_string()));
        }
        t.next_user += 1;
        let created = User {
            id: t.next_user,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        t.users.push(created.clone());
        Ok(created)
    }

    async fn seed_user(&self, user: NewUser) -> RepoResult<bool> {
        if self.email_taken(&user.email).await? {
            return Ok(false);
        }
        self.create_user(user).await.map(|_| true)
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut users = self.tables.read().await.users.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn set_user_role(&self, id: i64, role: Role) -> RepoResult<Option<User>> {
        let mut t = self.tables.write().await;
        Ok(t.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.role = role;
            u.clone()
        }))
    }

    async fn delete_user(&self, id: i64) -> RepoResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.users.len();
        t.users.retain(|u| u.id != id);
        if t.users.len() == before {
            return Ok(false);
        }
        t.profiles.remove(&id);
        t.applications.retain(|a| a.user_id != id);
        t.shops.retain(|s| s.owner_id != id);
        for job in t.jobs.iter_mut() {
            if job.posted_by_id == Some(id) {
                job.posted_by_id = None;
            }
            if job.managed_by_id == Some(id) {
                job.managed_by_id = None;
            }
        }
        Ok(true)
    }

    async fn platform_stats(&self, since: DateTime<Utc>) -> RepoResult<SuperadminStats> {
        let t = self.tables.read().await;
        let count_role = |role: Role| t.users.iter().filter(|u| u.role == role).count() as i64;
        Ok(SuperadminStats {
            total_jobs: t.jobs.len() as i64,
            new_jobs_today: t.jobs.iter().filter(|j| j.created_at >= since).count() as i64,
            total_users: t.users.len() as i64,
            new_users_today: t.users.iter().filter(|u| u.created_at >= since).count() as i64,
            admin_count: count_role(Role::Admin),
            tutor_count: count_role(Role::Tutor),
            superadmin_count: count_role(Role::Superadmin),
        })
    }

    async fn get_profile(&self, user_id: i64) -> RepoResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn upsert_profile(&self, user_id: i64, form: ProfileForm) -> RepoResult<Profile> {
        let profile = Profile {
            user_id,
            living_location: form.living_location,
            preferred_locations: form.preferred_locations,
            gender: form.gender,
            ssc_school: form.ssc_school,
            ssc_group: form.ssc_group,
            ssc_result: form.ssc_result,
            ssc_medium: form.ssc_medium,
            hsc_college: form.hsc_college,
            hsc_group: form.hsc_group,
            hsc_result: form.hsc_result,
            hsc_medium: form.hsc_medium,
            current_university: form.current_university,
            current_department: form.current_department,
            current_year_in_university: form.current_year_in_university,
            last_semester_result: form.last_semester_result,
            updated_at: Utc::now(),
        };
        let mut t = self.tables.write().await;
        t.profiles.insert(user_id, profile.clone());
        Ok(profile)
    }

    async fn list_jobs(&self, listing: &JobListing) -> RepoResult<Vec<Job>> {
        let t = self.tables.read().await;
        let mut jobs: Vec<Job> = t
            .jobs
            .iter()
            .filter(|j| listing.created_since.is_none_or(|since| j.created_at >= since))
            .filter(|j| {
                listing
                    .student_gender
                    .as_ref()
                    .is_none_or(|g| j.student_gender.as_ref() == Some(g))
            })
            .filter(|j| {
                let subjects = j.subjects.as_deref().unwrap_or_default();
                contains_any(
                    listing.search.as_deref(),
                    &[j.title.as_str(), j.location.as_str(), subjects],
                )
            })
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn get_job(&self, id: i64) -> RepoResult<Option<Job>> {
        Ok(self.tables.read().await.job(id).cloned())
    }

    async fn record_job_view(&self, id: i64) -> RepoResult<Option<Job>> {
        let mut t = self.tables.write().await;
        Ok(t.jobs.iter_mut().find(|j| j.id == id).map(|j| {
            j.views += 1;
            j.clone()
        }))
    }

    async fn create_job(&self, form: CreateJobForm, posted_by: i64) -> RepoResult<Job> {
        let mut t = self.tables.write().await;
        t.next_job += 1;
        let now = Utc::now();
        let job = Job {
            id: t.next_job,
            title: form.title,
            description: form.description,
            location: form.location,
            salary: form.salary,
            publisher: form.publisher,
            student_gender: form.student_gender,
            tutor_gender_need: form.tutor_gender_need,
            tutor_university_need: form.tutor_university_need,
            tutor_university_type_need: form.tutor_university_type_need,
            tutor_department_need: form.tutor_department_need,
            subjects: form.subjects,
            days_in_week: form.days_in_week,
            tutoring_time: form.tutoring_time,
            status: JobStatus::Active,
            views: 0,
            posted_by_id: Some(posted_by),
            managed_by_id: None,
            managed_at: None,
            created_at: now,
            updated_at: now,
        };
        t.jobs.push(job.clone());
        Ok(job)
    }

    async fn set_job_status(&self, id: i64, status: JobStatus) -> RepoResult<Option<Job>> {
        let mut t = self.tables.write().await;
        Ok(t.jobs.iter_mut().find(|j| j.id == id).map(|j| {
            j.status = status;
            j.updated_at = Utc::now();
            j.clone()
        }))
    }

    async fn count_jobs(&self, search: Option<&str>) -> RepoResult<i64> {
        let t = self.tables.read().await;
        Ok(t.jobs
            .iter()
            .filter(|j| contains_any(search, &[j.title.as_str(), j.description.as_str()]))
            .count() as i64)
    }

    async fn jobs_with_managers(
        &self,
        search: Option<&str>,
        page: &Pagination,
    ) -> RepoResult<Vec<JobWithManager>> {
        let t = self.tables.read().await;
        let mut jobs: Vec<&Job> = t
            .jobs
            .iter()
            .filter(|j| contains_any(search, &[j.title.as_str(), j.description.as_str()]))
            .collect();
        sort_for_admin(&mut jobs);
        let rows = jobs
            .into_iter()
            .map(|job| JobWithManager {
                managed_by: job.managed_by_id.and_then(|id| t.user(id).cloned()),
                job: job.clone(),
            })
            .collect();
        Ok(window(rows, page))
    }

    async fn claim_job(&self, job_id: i64, admin_id: i64) -> RepoResult<ClaimOutcome> {
        let mut t = self.tables.write().await;
        let Some(job) = t.jobs.iter_mut().find(|j| j.id == job_id) else {
            return Ok(ClaimOutcome::NotFound);
        };
        if let Some(managed_by) = job.managed_by_id {
            return Ok(ClaimOutcome::AlreadyManaged { managed_by });
        }
        let now = Utc::now();
        job.managed_by_id = Some(admin_id);
        job.managed_at = Some(now);
        job.updated_at = now;
        Ok(ClaimOutcome::Claimed(job.clone()))
    }

    async fn count_managed_jobs(&self, admin_id: i64, search: Option<&str>) -> RepoResult<i64> {
        Ok(self.tables.read().await.managed(admin_id, search).len() as i64)
    }

    async fn managed_jobs(
        &self,
        admin_id: i64,
        search: Option<&str>,
        page: &Pagination,
    ) -> RepoResult<Vec<ManagedJob>> {
        let t = self.tables.read().await;
        let rows = t
            .managed(admin_id, search)
            .into_iter()
            .map(|job| {
                let mut applications: Vec<ApplicationWithUser> = t
                    .applications
                    .iter()
                    .filter(|a| a.job_id == job.id)
                    .filter_map(|a| t.with_user(a))
                    .collect();
                applications.sort_by(|a, b| {
                    a.application
                        .stage
                        .to_string()
                        .cmp(&b.application.stage.to_string())
                });
                ManagedJob {
                    job: job.clone(),
                    applications,
                }
            })
            .collect();
        Ok(window(rows, page))
    }

    async fn find_application(
        &self,
        user_id: i64,
        job_id: i64,
    ) -> RepoResult<Option<JobApplication>> {
        let t = self.tables.read().await;
        Ok(t.applications
            .iter()
            .find(|a| a.user_id == user_id && a.job_id == job_id)
            .cloned())
    }

    async fn get_application(&self, id: i64) -> RepoResult<Option<JobApplication>> {
        let t = self.tables.read().await;
        Ok(t.applications.iter().find(|a| a.id == id).cloned())
    }

    async fn create_application(&self, user_id: i64, job_id: i64) -> RepoResult<JobApplication> {
        let mut t = self.tables.write().await;
        if t
            .applications
            .iter()
            .any(|a| a.user_id == user_id && a.job_id == job_id)
        {
            return Err(RepositoryError::Conflict("Already applied".to_string()));
        }
        t.next_application += 1;
        let now = Utc::now();
        let application = JobApplication {
            id: t.next_application,
            user_id,
            job_id,
            stage: ApplicationStage::Applied,
            applied_at: now,
            updated_at: now,
        };
        t.applications.push(application.clone());
        Ok(application)
    }

    async fn set_application_stage(
        &self,
        id: i64,
        stage: ApplicationStage,
    ) -> RepoResult<Option<JobApplication>> {
        let mut t = self.tables.write().await;
        Ok(t.applications.iter_mut().find(|a| a.id == id).map(|a| {
            a.stage = stage;
            a.updated_at = Utc::now();
            a.clone()
        }))
    }

    async fn count_job_applications(&self, job_id: i64, search: Option<&str>) -> RepoResult<i64> {
        Ok(self.tables.read().await.applicants(job_id, search).len() as i64)
    }

    async fn job_applications(
        &self,
        job_id: i64,
        search: Option<&str>,
        page: &Pagination,
    ) -> RepoResult<Vec<ApplicationWithUser>> {
        let t = self.tables.read().await;
        Ok(window(t.applicants(job_id, search), page))
    }

    async fn count_applied_jobs(&self, user_id: i64) -> RepoResult<i64> {
        let t = self.tables.read().await;
        Ok(t.applications.iter().filter(|a| a.user_id == user_id).count() as i64)
    }

    async fn applied_jobs(
        &self,
        user_id: i64,
        page: &Pagination,
    ) -> RepoResult<Vec<ApplicationWithJob>> {
        let t = self.tables.read().await;
        let mut rows: Vec<ApplicationWithJob> = t
            .applications
            .iter()
            .filter(|a| a.user_id == user_id)
            .filter_map(|a| {
                t.job(a.job_id).cloned().map(|job| ApplicationWithJob {
                    application: a.clone(),
                    job,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.application.applied_at.cmp(&a.application.applied_at));
        Ok(window(rows, page))
    }

    async fn create_shop(
        &self,
        owner_id: i64,
        handle: String,
        form: CreateShopForm,
    ) -> RepoResult<Shop> {
        let mut t = self.tables.write().await;
        if t.shops.iter().any(|s| s.handle == handle) {
            return Err(RepositoryError::Conflict(
                "Shop handle already taken".to_string(),
            ));
        }
        let shop = Shop {
            id: Uuid::new_v4(),
            owner_id,
            name: form.name.trim().to_string(),
            handle,
            phone: form.phone,
            location: form.location,
            created_at: Utc::now(),
        };
        t.shops.push(shop.clone());
        Ok(shop)
    }

    async fn get_shop(&self, id: Uuid) -> RepoResult<Option<Shop>> {
        let t = self.tables.read().await;
        Ok(t.shops.iter().find(|s| s.id == id).cloned())
    }

    async fn get_shop_by_handle(&self, handle: &str) -> RepoResult<Option<Shop>> {
        let t = self.tables.read().await;
        Ok(t.shops.iter().find(|s| s.handle == handle).cloned())
    }

    async fn shops_by_owner(&self, owner_id: i64) -> RepoResult<Vec<Shop>> {
        let t = self.tables.read().await;
        Ok(t.shops
            .iter()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn count_products(&self, shop_id: Uuid) -> RepoResult<i64> {
        let t = self.tables.read().await;
        Ok(t.products.iter().filter(|p| p.shop_id == shop_id).count() as i64)
    }

    async fn list_products(
        &self,
        shop_id: Uuid,
        page: Option<&Pagination>,
    ) -> RepoResult<Vec<Product>> {
        let t = self.tables.read().await;
        let mut products: Vec<Product> = t
            .products
            .iter()
            .filter(|p| p.shop_id == shop_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(match page {
            Some(page) => window(products, page),
            None => products,
        })
    }

    async fn get_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
        let t = self.tables.read().await;
        Ok(t.products.iter().find(|p| p.id == id).cloned())
    }

    async fn create_product(&self, product: NewProduct) -> RepoResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            shop_id: product.shop_id,
            name: product.name,
            description: product.description,
            price: product.price,
            image_url: product.image_url,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: Uuid, product: NewProduct) -> RepoResult<Option<Product>> {
        let mut t = self.tables.write().await;
        Ok(t.products.iter_mut().find(|p| p.id == id).map(|p| {
            p.name = product.name;
            p.description = product.description;
            p.price = product.price;
            p.image_url = product.image_url;
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn delete_product(&self, id: Uuid) -> RepoResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.products.len();
        t.products.retain(|p| p.id != id);
        let removed = t.products.len() != before;
        if removed {
            for item in t.items.iter_mut().filter(|i| i.product_id == Some(id)) {
                item.product_id = None;
            }
        }
        Ok(removed)
    }

    async fn place_order(&self, order: NewOrder) -> RepoResult<Order> {
        let now = Utc::now();
        let created = Order {
            id: Uuid::new_v4(),
            shop_id: order.shop_id,
            customer_name: order.customer_name,
            customer_phone: order.customer_phone,
            customer_address: order.customer_address,
            total: order.total,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let item = OrderItem {
            id: Uuid::new_v4(),
            order_id: created.id,
            product_id: Some(order.product_id),
            product_name: None,
            quantity: order.quantity,
            price: order.unit_price,
        };
        let mut t = self.tables.write().await;
        t.orders.push(created.clone());
        t.items.push(item);
        Ok(created)
    }

    async fn get_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        let t = self.tables.read().await;
        Ok(t.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn order_items(&self, order_id: Uuid) -> RepoResult<Vec<OrderItem>> {
        let t = self.tables.read().await;
        Ok(t.items
            .iter()
            .filter(|i| i.order_id == order_id)
            .map(|i| {
                let mut item = i.clone();
                item.product_name = i
                    .product_id
                    .and_then(|pid| t.products.iter().find(|p| p.id == pid))
                    .map(|p| p.name.clone());
                item
            })
            .collect())
    }

    async fn count_orders(&self, shop_id: Uuid) -> RepoResult<i64> {
        let t = self.tables.read().await;
        Ok(t.orders.iter().filter(|o| o.shop_id == shop_id).count() as i64)
    }

    async fn list_orders(&self, shop_id: Uuid, page: &Pagination) -> RepoResult<Vec<Order>> {
        let t = self.tables.read().await;
        let mut orders: Vec<Order> = t
            .orders
            .iter()
            .filter(|o| o.shop_id == shop_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(window(orders, page))
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> RepoResult<Option<Order>> {
        let mut t = self.tables.write().await;
        Ok(t.orders.iter_mut().find(|o| o.id == id).map(|o| {
            o.status = status;
            o.updated_at = Utc::now();
            o.clone()
        }))
    }
}
