use chrono::NaiveDate;
use entity::{app_user, department, employee};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::access::ensure_department_access;
use crate::audit;
use crate::error::{ApiError, ApiResult};

/// Logical table key used in audit entries.
const AUDIT_TABLE: &str = "employees";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub hire_date: NaiveDate,
    pub job_title: String,
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub manager_id: Option<Uuid>,
    #[serde(default)]
    pub salary_cents: Option<i64>,
    #[serde(default)]
    pub status: Option<employee::Status>,
}

/// Full-overwrite patch: every field replaces the stored value, matching the
/// update semantics of the REST surface. Hire date is immutable.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub job_title: String,
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub manager_id: Option<Uuid>,
    #[serde(default)]
    pub salary_cents: Option<i64>,
    pub status: employee::Status,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    Id,
    FirstName,
    LastName,
    Email,
    HireDate,
    JobTitle,
    Salary,
    Status,
    CreatedAt,
}

impl SortField {
    fn column(self) -> employee::Column {
        match self {
            SortField::Id => employee::Column::Id,
            SortField::FirstName => employee::Column::FirstName,
            SortField::LastName => employee::Column::LastName,
            SortField::Email => employee::Column::Email,
            SortField::HireDate => employee::Column::HireDate,
            SortField::JobTitle => employee::Column::JobTitle,
            SortField::Salary => employee::Column::SalaryCents,
            SortField::Status => employee::Column::Status,
            SortField::CreatedAt => employee::Column::CreatedAt,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Optional, AND-combined search filters. An unset field matches every row.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmployeeSearch {
    pub employee_id: Option<Uuid>,
    pub search_term: Option<String>,
    pub department_id: Option<Uuid>,
    pub job_title: Option<String>,
    pub status: Option<employee::Status>,
    pub hire_date_start: Option<NaiveDate>,
    pub hire_date_end: Option<NaiveDate>,
    pub page: Option<u64>,
    pub size: Option<u64>,
    pub sort_by: Option<SortField>,
    pub sort_direction: Option<SortDirection>,
}

pub const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

pub async fn create(
    db: &DatabaseConnection,
    input: NewEmployee,
    actor: &app_user::Model,
) -> ApiResult<employee::Model> {
    let department_id = input
        .department_id
        .ok_or_else(|| ApiError::field_validation("departmentId", "department is required"))?;

    let txn = db.begin().await?;

    department::Entity::find_by_id(department_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("department not found: {department_id}")))?;
    if let Some(manager_id) = input.manager_id {
        ensure_manager_exists(&txn, manager_id).await?;
    }
    if employee_email_taken(&txn, &input.email).await? {
        return Err(ApiError::Duplicate(format!(
            "employee email already exists: {}",
            input.email
        )));
    }
    ensure_department_access(actor, department_id)?;

    let now = chrono::Utc::now();
    let saved = employee::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set(input.first_name),
        last_name: Set(input.last_name),
        email: Set(input.email),
        hire_date: Set(input.hire_date),
        job_title: Set(input.job_title),
        department_id: Set(Some(department_id)),
        manager_id: Set(input.manager_id),
        salary_cents: Set(input.salary_cents),
        status: Set(input.status.unwrap_or(employee::Status::Active)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        created_by: Set(Some(actor.id)),
        updated_by: Set(None),
    }
    .insert(&txn)
    .await?;

    audit::log_activity(
        &txn,
        AUDIT_TABLE,
        saved.id,
        entity::audit_trail::Action::Create,
        None::<&employee::Model>,
        Some(&saved),
        Some(actor.id),
    )
    .await?;

    txn.commit().await?;
    tracing::info!(employee = %saved.id, actor = %actor.id, "employee created");
    Ok(saved)
}

pub async fn update(
    db: &DatabaseConnection,
    id: Uuid,
    patch: EmployeeUpdate,
    actor: &app_user::Model,
) -> ApiResult<employee::Model> {
    let txn = db.begin().await?;

    let existing = employee::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("employee not found: {id}")))?;

    // Scope check runs against the department the record is in today, not
    // the one the patch would move it to.
    if let Some(current_dept) = existing.department_id {
        ensure_department_access(actor, current_dept)?;
    }

    if let Some(department_id) = patch.department_id {
        department::Entity::find_by_id(department_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("department not found: {department_id}")))?;
    }
    if let Some(manager_id) = patch.manager_id {
        if manager_id == id {
            return Err(ApiError::field_validation(
                "managerId",
                "an employee cannot be their own manager",
            ));
        }
        ensure_manager_exists(&txn, manager_id).await?;
    }
    // Email uniqueness is intentionally not re-checked on update; the unique
    // index still rejects hard collisions.

    let old_state = existing.clone();

    let mut active: employee::ActiveModel = existing.into();
    active.first_name = Set(patch.first_name);
    active.last_name = Set(patch.last_name);
    active.email = Set(patch.email);
    active.job_title = Set(patch.job_title);
    active.salary_cents = Set(patch.salary_cents);
    active.department_id = Set(patch.department_id);
    active.manager_id = Set(patch.manager_id);
    active.status = Set(patch.status);
    active.updated_by = Set(Some(actor.id));
    active.updated_at = Set(chrono::Utc::now().into());
    let saved = active.update(&txn).await?;

    audit::log_activity(
        &txn,
        AUDIT_TABLE,
        saved.id,
        entity::audit_trail::Action::Update,
        Some(&old_state),
        Some(&saved),
        Some(actor.id),
    )
    .await?;

    txn.commit().await?;
    tracing::info!(employee = %saved.id, actor = %actor.id, "employee updated");
    Ok(saved)
}

/// Soft delete: flips status to INACTIVE and leaves the row in place. The
/// audit entry is a DELETE action whose old and new snapshots are both
/// populated, because nothing is physically removed.
pub async fn delete(db: &DatabaseConnection, id: Uuid, actor: &app_user::Model) -> ApiResult<()> {
    let txn = db.begin().await?;

    let existing = employee::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("employee not found: {id}")))?;
    if let Some(dept) = existing.department_id {
        ensure_department_access(actor, dept)?;
    }

    let old_state = existing.clone();

    let mut active: employee::ActiveModel = existing.into();
    active.status = Set(employee::Status::Inactive);
    active.updated_by = Set(Some(actor.id));
    active.updated_at = Set(chrono::Utc::now().into());
    let saved = active.update(&txn).await?;

    audit::log_activity(
        &txn,
        AUDIT_TABLE,
        saved.id,
        entity::audit_trail::Action::Delete,
        Some(&old_state),
        Some(&saved),
        Some(actor.id),
    )
    .await?;

    txn.commit().await?;
    tracing::info!(employee = %id, actor = %actor.id, "employee deactivated");
    Ok(())
}

pub async fn get(
    db: &DatabaseConnection,
    id: Uuid,
    actor: &app_user::Model,
) -> ApiResult<employee::Model> {
    let found = employee::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("employee not found: {id}")))?;
    if let Some(dept) = found.department_id {
        ensure_department_access(actor, dept)?;
    }
    Ok(found)
}

pub async fn search(
    db: &DatabaseConnection,
    criteria: EmployeeSearch,
    actor: &app_user::Model,
) -> ApiResult<Page<employee::Model>> {
    if let Some(department_id) = criteria.department_id {
        ensure_department_access(actor, department_id)?;
    }

    let span = info_span!(
        "employees.search",
        has_term = criteria.search_term.is_some(),
        has_department = criteria.department_id.is_some(),
        status = criteria.status.map(|s| s.as_str()).unwrap_or(""),
    );

    let mut query = employee::Entity::find();
    if let Some(employee_id) = criteria.employee_id {
        query = query.filter(employee::Column::Id.eq(employee_id));
    }
    if let Some(term) = criteria
        .search_term
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        let pattern = format!("%{}%", term.to_lowercase());
        let first_expr = Expr::expr(Func::lower(Expr::col(employee::Column::FirstName)));
        let last_expr = Expr::expr(Func::lower(Expr::col(employee::Column::LastName)));
        query = query.filter(
            Condition::any()
                .add(first_expr.like(pattern.clone()))
                .add(last_expr.like(pattern)),
        );
    }
    if let Some(department_id) = criteria.department_id {
        query = query.filter(employee::Column::DepartmentId.eq(department_id));
    }
    if let Some(title) = criteria
        .job_title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        let pattern = format!("%{}%", title.to_lowercase());
        let title_expr = Expr::expr(Func::lower(Expr::col(employee::Column::JobTitle)));
        query = query.filter(title_expr.like(pattern));
    }
    if let Some(status) = criteria.status {
        query = query.filter(employee::Column::Status.eq(status));
    }
    if let Some(start) = criteria.hire_date_start {
        query = query.filter(employee::Column::HireDate.gte(start));
    }
    if let Some(end) = criteria.hire_date_end {
        query = query.filter(employee::Column::HireDate.lte(end));
    }

    let order = match criteria.sort_direction.unwrap_or_default() {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    };
    query = query.order_by(criteria.sort_by.unwrap_or_default().column(), order);

    let page = criteria.page.unwrap_or(0);
    let per_page = criteria.size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    async {
        let paginator = query.paginate(db, per_page);
        let counts = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page).await?;

        Ok(Page {
            items,
            total: counts.number_of_items,
            page,
            per_page,
            total_pages: counts.number_of_pages,
        })
    }
    .instrument(span)
    .await
}

async fn ensure_manager_exists<C: ConnectionTrait>(conn: &C, manager_id: Uuid) -> ApiResult<()> {
    employee::Entity::find_by_id(manager_id)
        .one(conn)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("manager not found: {manager_id}")))?;
    Ok(())
}

async fn employee_email_taken<C: ConnectionTrait>(conn: &C, email: &str) -> ApiResult<bool> {
    let found = employee::Entity::find()
        .filter(employee::Column::Email.eq(email))
        .one(conn)
        .await?;
    Ok(found.is_some())
}
