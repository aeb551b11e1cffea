use entity::app_user::{self, Role};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::users::hash_password;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Idempotent bootstrap: creates the default administrator account if no
/// user with that username exists yet. Change the password after first login.
pub async fn ensure_admin_user(db: &DatabaseConnection) -> ApiResult<Option<app_user::Model>> {
    let existing = app_user::Entity::find()
        .filter(app_user::Column::Username.eq(DEFAULT_ADMIN_USERNAME))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(None);
    }

    let admin = app_user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(DEFAULT_ADMIN_USERNAME.to_string()),
        password_hash: Set(hash_password(DEFAULT_ADMIN_PASSWORD)?),
        role: Set(Role::Admin),
        email: Set("admin@example.com".to_string()),
        department_id: Set(None),
        created_at: Set(chrono::Utc::now().into()),
        last_login: Set(None),
    }
    .insert(db)
    .await?;

    tracing::info!(user = %admin.id, "bootstrap admin user created");
    Ok(Some(admin))
}
