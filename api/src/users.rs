use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use entity::app_user::{self, Role};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, ModelTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::audit;
use crate::error::{ApiError, ApiResult};

const AUDIT_TABLE: &str = "users";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub department_id: Option<Uuid>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    pub role: Role,
    /// Empty or absent leaves the stored hash untouched.
    #[serde(default)]
    pub password: Option<String>,
}

pub fn hash_password(plaintext: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::Internal(format!("password hashing failed: {err}")))
}

pub fn verify_password(stored_hash: &str, candidate: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}

/// User provisioning audits as a system action (`changed_by` is null); the
/// REST surface restricts these calls to administrators.
pub async fn create(db: &DatabaseConnection, input: NewUser) -> ApiResult<app_user::Model> {
    let txn = db.begin().await?;

    if username_taken(&txn, &input.username).await? {
        return Err(ApiError::Duplicate(format!(
            "username already exists: {}",
            input.username
        )));
    }
    if email_taken(&txn, &input.email).await? {
        return Err(ApiError::Duplicate(format!(
            "email already exists: {}",
            input.email
        )));
    }

    let saved = app_user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(input.username),
        password_hash: Set(hash_password(&input.password)?),
        role: Set(input.role),
        email: Set(input.email),
        department_id: Set(input.department_id),
        created_at: Set(Utc::now().into()),
        last_login: Set(None),
    }
    .insert(&txn)
    .await?;

    audit::log_activity(
        &txn,
        AUDIT_TABLE,
        saved.id,
        entity::audit_trail::Action::Create,
        None::<&app_user::Model>,
        Some(&saved),
        None,
    )
    .await?;

    txn.commit().await?;
    tracing::info!(user = %saved.id, username = %saved.username, "user created");
    Ok(saved)
}

pub async fn update(
    db: &DatabaseConnection,
    id: Uuid,
    patch: UserUpdate,
) -> ApiResult<app_user::Model> {
    let txn = db.begin().await?;

    let existing = app_user::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user not found: {id}")))?;

    // Uniqueness is only re-checked when the value actually changes.
    if existing.username != patch.username && username_taken(&txn, &patch.username).await? {
        return Err(ApiError::Duplicate(format!(
            "username already exists: {}",
            patch.username
        )));
    }
    if existing.email != patch.email && email_taken(&txn, &patch.email).await? {
        return Err(ApiError::Duplicate(format!(
            "email already exists: {}",
            patch.email
        )));
    }

    let old_state = existing.clone();

    let mut active: app_user::ActiveModel = existing.into();
    active.username = Set(patch.username);
    active.email = Set(patch.email);
    active.role = Set(patch.role);
    if let Some(password) = patch.password.as_deref().filter(|p| !p.is_empty()) {
        active.password_hash = Set(hash_password(password)?);
    }
    let saved = active.update(&txn).await?;

    audit::log_activity(
        &txn,
        AUDIT_TABLE,
        saved.id,
        entity::audit_trail::Action::Update,
        Some(&old_state),
        Some(&saved),
        None,
    )
    .await?;

    txn.commit().await?;
    Ok(saved)
}

pub async fn delete(db: &DatabaseConnection, id: Uuid) -> ApiResult<()> {
    let txn = db.begin().await?;

    let existing = app_user::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user not found: {id}")))?;

    let old_state = existing.clone();
    existing.delete(&txn).await?;

    audit::log_activity(
        &txn,
        AUDIT_TABLE,
        id,
        entity::audit_trail::Action::Delete,
        Some(&old_state),
        None::<&app_user::Model>,
        None,
    )
    .await?;

    txn.commit().await?;
    tracing::info!(user = %id, "user deleted");
    Ok(())
}

/// A missing user and a wrong password are indistinguishable to the caller.
/// Success stamps `last_login` and returns the refreshed record.
pub async fn login(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> ApiResult<app_user::Model> {
    let found = app_user::Entity::find()
        .filter(app_user::Column::Username.eq(username))
        .one(db)
        .await?;
    let Some(user) = found else {
        return Err(ApiError::InvalidCredentials);
    };
    if !verify_password(&user.password_hash, password) {
        return Err(ApiError::InvalidCredentials);
    }

    let mut active: app_user::ActiveModel = user.into();
    active.last_login = Set(Some(Utc::now().into()));
    let refreshed = active.update(db).await?;
    tracing::info!(user = %refreshed.id, "login succeeded");
    Ok(refreshed)
}

pub async fn get_by_id(db: &DatabaseConnection, id: Uuid) -> ApiResult<app_user::Model> {
    app_user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user not found: {id}")))
}

pub async fn list_all(db: &DatabaseConnection) -> ApiResult<Vec<app_user::Model>> {
    let users = app_user::Entity::find()
        .order_by_asc(app_user::Column::Username)
        .all(db)
        .await?;
    Ok(users)
}

pub async fn find_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> ApiResult<Option<app_user::Model>> {
    let found = app_user::Entity::find()
        .filter(app_user::Column::Username.eq(username))
        .one(db)
        .await?;
    Ok(found)
}

async fn username_taken<C: ConnectionTrait>(conn: &C, username: &str) -> ApiResult<bool> {
    let found = app_user::Entity::find()
        .filter(app_user::Column::Username.eq(username))
        .one(conn)
        .await?;
    Ok(found.is_some())
}

async fn email_taken<C: ConnectionTrait>(conn: &C, email: &str) -> ApiResult<bool> {
    let found = app_user::Entity::find()
        .filter(app_user::Column::Email.eq(email))
        .one(conn)
        .await?;
    Ok(found.is_some())
}
