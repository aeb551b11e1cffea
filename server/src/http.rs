use std::collections::BTreeMap;
use std::sync::Arc;

use api::access::ensure_role_any;
use api::{audit, departments, employees, error::ApiError, users};
use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use entity::app_user::{self, Role};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/v1/users/login", axum::routing::post(login))
        .route("/api/v1/users", get(list_users).post(create_user))
        .route(
            "/api/v1/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route(
            "/api/v1/employees",
            get(search_employees).post(create_employee),
        )
        .route("/api/v1/employees/search", get(search_employees))
        .route(
            "/api/v1/employees/{id}",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route(
            "/api/v1/departments",
            get(list_departments).post(create_department),
        )
        .route(
            "/api/v1/departments/{id}",
            get(get_department)
                .put(update_department)
                .delete(delete_department),
        )
        .route("/api/v1/audit", get(list_audit))
        .route(
            "/api/v1/audit/records/{table}/{record_id}",
            get(audit_for_record),
        )
        .route("/api/v1/audit/users/{id}", get(audit_for_user))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Structured error body carried by every non-2xx response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    timestamp: DateTime<Utc>,
    code: &'static str,
    message: String,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<BTreeMap<String, String>>,
}

pub struct Failure {
    status: StatusCode,
    body: ErrorBody,
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn status_for(err: &ApiError) -> StatusCode {
    match err {
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::AccessDenied(_) => StatusCode::FORBIDDEN,
        ApiError::Duplicate(_) => StatusCode::CONFLICT,
        ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
        ApiError::Conflict(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        ApiError::Db(_) | ApiError::Snapshot(_) | ApiError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn reject(uri: &Uri, err: ApiError) -> Failure {
    let status = status_for(&err);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, path = %uri.path(), "request failed");
    }
    let errors = match &err {
        ApiError::Validation { errors, .. } if !errors.is_empty() => Some(errors.clone()),
        _ => None,
    };
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        "an unexpected error occurred".to_string()
    } else {
        err.to_string()
    };
    Failure {
        status,
        body: ErrorBody {
            timestamp: Utc::now(),
            code: err.code(),
            message,
            path: uri.path().to_string(),
            errors,
        },
    }
}

/// Authenticated caller, resolved from HTTP Basic credentials on every
/// request. The password is verified against the stored argon2 hash.
pub struct AuthUser(pub app_user::Model);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Failure;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let uri = parts.uri.clone();
        let Some((username, password)) = basic_credentials(parts) else {
            return Err(reject(&uri, ApiError::InvalidCredentials));
        };
        let found = users::find_by_username(state.db.as_ref(), &username)
            .await
            .map_err(|err| reject(&uri, err))?;
        let Some(user) = found else {
            return Err(reject(&uri, ApiError::InvalidCredentials));
        };
        if !users::verify_password(&user.password_hash, &password) {
            return Err(reject(&uri, ApiError::InvalidCredentials));
        }
        Ok(AuthUser(user))
    }
}

fn basic_credentials(parts: &Parts) -> Option<(String, String)> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// User payload with the password hash stripped.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    id: Uuid,
    username: String,
    role: Role,
    email: String,
    department_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl From<app_user::Model> for UserResponse {
    fn from(model: app_user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            role: model.role,
            email: model.email,
            department_id: model.department_id,
            created_at: model.created_at.into(),
            last_login: model.last_login.map(Into::into),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    uri: Uri,
    Json(req): Json<LoginRequest>,
) -> Result<Json<UserResponse>, Failure> {
    let user = users::login(state.db.as_ref(), &req.username, &req.password)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(Json(user.into()))
}

async fn create_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Json(input): Json<users::NewUser>,
) -> Result<(StatusCode, Json<UserResponse>), Failure> {
    ensure_role_any(&actor, &[Role::Admin]).map_err(|err| reject(&uri, err))?;
    let created = users::create(state.db.as_ref(), input)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn update_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Path(id): Path<Uuid>,
    Json(patch): Json<users::UserUpdate>,
) -> Result<Json<UserResponse>, Failure> {
    ensure_role_any(&actor, &[Role::Admin]).map_err(|err| reject(&uri, err))?;
    let updated = users::update(state.db.as_ref(), id, patch)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(Json(updated.into()))
}

async fn get_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, Failure> {
    ensure_role_any(&actor, &[Role::Admin]).map_err(|err| reject(&uri, err))?;
    let user = users::get_by_id(state.db.as_ref(), id)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(Json(user.into()))
}

async fn list_users(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
) -> Result<Json<Vec<UserResponse>>, Failure> {
    ensure_role_any(&actor, &[Role::Admin]).map_err(|err| reject(&uri, err))?;
    let all = users::list_all(state.db.as_ref())
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(Json(all.into_iter().map(Into::into).collect()))
}

async fn delete_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, Failure> {
    ensure_role_any(&actor, &[Role::Admin]).map_err(|err| reject(&uri, err))?;
    users::delete(state.db.as_ref(), id)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_employee(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Json(input): Json<employees::NewEmployee>,
) -> Result<(StatusCode, Json<entity::employee::Model>), Failure> {
    ensure_role_any(&actor, &[Role::Admin, Role::Hr]).map_err(|err| reject(&uri, err))?;
    let created = employees::create(state.db.as_ref(), input, &actor)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_employee(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Path(id): Path<Uuid>,
    Json(patch): Json<employees::EmployeeUpdate>,
) -> Result<Json<entity::employee::Model>, Failure> {
    ensure_role_any(&actor, &[Role::Admin, Role::Hr, Role::Manager])
        .map_err(|err| reject(&uri, err))?;
    let updated = employees::update(state.db.as_ref(), id, patch, &actor)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(Json(updated))
}

async fn get_employee(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Path(id): Path<Uuid>,
) -> Result<Json<entity::employee::Model>, Failure> {
    ensure_role_any(&actor, &[Role::Admin, Role::Hr, Role::Manager])
        .map_err(|err| reject(&uri, err))?;
    let found = employees::get(state.db.as_ref(), id, &actor)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(Json(found))
}

async fn search_employees(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Query(criteria): Query<employees::EmployeeSearch>,
) -> Result<Json<employees::Page<entity::employee::Model>>, Failure> {
    ensure_role_any(&actor, &[Role::Admin, Role::Hr, Role::Manager])
        .map_err(|err| reject(&uri, err))?;
    let page = employees::search(state.db.as_ref(), criteria, &actor)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(Json(page))
}

async fn delete_employee(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, Failure> {
    ensure_role_any(&actor, &[Role::Admin, Role::Hr]).map_err(|err| reject(&uri, err))?;
    employees::delete(state.db.as_ref(), id, &actor)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_department(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Json(input): Json<departments::DepartmentInput>,
) -> Result<(StatusCode, Json<entity::department::Model>), Failure> {
    let created = departments::create(state.db.as_ref(), input, &actor)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_department(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Path(id): Path<Uuid>,
    Json(input): Json<departments::DepartmentInput>,
) -> Result<Json<entity::department::Model>, Failure> {
    let updated = departments::update(state.db.as_ref(), id, input, &actor)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(Json(updated))
}

async fn get_department(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Path(id): Path<Uuid>,
) -> Result<Json<entity::department::Model>, Failure> {
    ensure_role_any(&actor, &[Role::Admin, Role::Hr, Role::Manager])
        .map_err(|err| reject(&uri, err))?;
    let found = departments::get(state.db.as_ref(), id, &actor)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(Json(found))
}

async fn list_departments(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
) -> Result<Json<Vec<entity::department::Model>>, Failure> {
    let all = departments::list_all(state.db.as_ref(), &actor)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(Json(all))
}

async fn delete_department(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, Failure> {
    departments::delete(state.db.as_ref(), id, &actor)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_audit(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
) -> Result<Json<Vec<entity::audit_trail::Model>>, Failure> {
    ensure_role_any(&actor, &[Role::Admin]).map_err(|err| reject(&uri, err))?;
    let all = audit::list_all(state.db.as_ref())
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(Json(all))
}

async fn audit_for_record(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Path((table, record_id)): Path<(String, Uuid)>,
) -> Result<Json<Vec<entity::audit_trail::Model>>, Failure> {
    ensure_role_any(&actor, &[Role::Admin]).map_err(|err| reject(&uri, err))?;
    let trail = audit::trail_for_record(state.db.as_ref(), &table, record_id)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(Json(trail))
}

async fn audit_for_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    uri: Uri,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<entity::audit_trail::Model>>, Failure> {
    ensure_role_any(&actor, &[Role::Admin]).map_err(|err| reject(&uri, err))?;
    let actions = audit::actions_by_user(state.db.as_ref(), id)
        .await
        .map_err(|err| reject(&uri, err))?;
    Ok(Json(actions))
}
