use entity::app_user::{self, Role};
use entity::{department, employee};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::access::{ensure_admin, ensure_department_access};
use crate::audit;
use crate::error::{ApiError, ApiResult};

const AUDIT_TABLE: &str = "departments";

#[derive(Clone, Debug, Deserialize)]
pub struct DepartmentInput {
    pub name: String,
}

pub async fn create(
    db: &DatabaseConnection,
    input: DepartmentInput,
    actor: &app_user::Model,
) -> ApiResult<department::Model> {
    ensure_admin(actor)?;

    let txn = db.begin().await?;
    ensure_name_free(&txn, &input.name).await?;

    let saved = department::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.name),
        created_at: Set(chrono::Utc::now().into()),
    }
    .insert(&txn)
    .await?;

    audit::log_activity(
        &txn,
        AUDIT_TABLE,
        saved.id,
        entity::audit_trail::Action::Create,
        None::<&department::Model>,
        Some(&saved),
        Some(actor.id),
    )
    .await?;

    txn.commit().await?;
    tracing::info!(department = %saved.id, name = %saved.name, "department created");
    Ok(saved)
}

pub async fn update(
    db: &DatabaseConnection,
    id: Uuid,
    input: DepartmentInput,
    actor: &app_user::Model,
) -> ApiResult<department::Model> {
    ensure_admin(actor)?;

    let txn = db.begin().await?;
    let existing = department::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("department not found: {id}")))?;

    if existing.name != input.name {
        ensure_name_free(&txn, &input.name).await?;
    }

    let old_state = existing.clone();
    let mut active: department::ActiveModel = existing.into();
    active.name = Set(input.name);
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
    Ok(saved)
}

/// Hard delete. Refuses with a business conflict while any employee still
/// references the department.
pub async fn delete(db: &DatabaseConnection, id: Uuid, actor: &app_user::Model) -> ApiResult<()> {
    ensure_admin(actor)?;

    let txn = db.begin().await?;
    let existing = department::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("department not found: {id}")))?;

    let staffed = employee::Entity::find()
        .filter(employee::Column::DepartmentId.eq(id))
        .count(&txn)
        .await?;
    if staffed > 0 {
        return Err(ApiError::Conflict(
            "cannot delete a department that still has employees".into(),
        ));
    }

    let old_state = existing.clone();
    existing.delete(&txn).await?;

    audit::log_activity(
        &txn,
        AUDIT_TABLE,
        id,
        entity::audit_trail::Action::Delete,
        Some(&old_state),
        None::<&department::Model>,
        Some(actor.id),
    )
    .await?;

    txn.commit().await?;
    tracing::info!(department = %id, actor = %actor.id, "department deleted");
    Ok(())
}

pub async fn get(
    db: &DatabaseConnection,
    id: Uuid,
    actor: &app_user::Model,
) -> ApiResult<department::Model> {
    ensure_department_access(actor, id)?;
    department::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("department not found: {id}")))
}

/// ADMIN and HR see everything, a MANAGER sees only their own department,
/// everyone else gets an empty list rather than an error.
pub async fn list_all(
    db: &DatabaseConnection,
    actor: &app_user::Model,
) -> ApiResult<Vec<department::Model>> {
    match actor.role {
        Role::Admin | Role::Hr => {
            let all = department::Entity::find()
                .order_by_asc(department::Column::Name)
                .all(db)
                .await?;
            Ok(all)
        }
        Role::Manager => match actor.department_id {
            Some(dept_id) => {
                let own = department::Entity::find_by_id(dept_id).one(db).await?;
                Ok(own.into_iter().collect())
            }
            None => Ok(vec![]),
        },
        Role::Employee => Ok(vec![]),
    }
}

async fn ensure_name_free<C: ConnectionTrait>(conn: &C, name: &str) -> ApiResult<()> {
    let taken = department::Entity::find()
        .filter(department::Column::Name.eq(name))
        .one(conn)
        .await?
        .is_some();
    if taken {
        Err(ApiError::Duplicate(format!(
            "department name already exists: {name}"
        )))
    } else {
        Ok(())
    }
}
