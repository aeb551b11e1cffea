use entity::app_user::{self, Role};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Department-scoped read/write predicate. ADMIN and HR are unrestricted;
/// a MANAGER is confined to their own department. EMPLOYEE falls through as
/// allowed here; route-level role gates keep that role away from the
/// employee surface entirely.
pub fn can_access_department(user: &app_user::Model, department_id: Uuid) -> bool {
    match user.role {
        Role::Admin | Role::Hr => true,
        Role::Manager => user.department_id == Some(department_id),
        Role::Employee => true,
    }
}

pub fn ensure_department_access(user: &app_user::Model, department_id: Uuid) -> ApiResult<()> {
    if can_access_department(user, department_id) {
        Ok(())
    } else {
        Err(ApiError::AccessDenied(
            "managers can only access their own department".into(),
        ))
    }
}

/// Department create/update/delete is restricted to administrators.
pub fn ensure_admin(user: &app_user::Model) -> ApiResult<()> {
    if user.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::AccessDenied(
            "only administrators can perform this operation".into(),
        ))
    }
}

pub fn ensure_role_any(user: &app_user::Model, allowed: &[Role]) -> ApiResult<()> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::AccessDenied(format!(
            "role {} may not perform this operation",
            user.role.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: Role, department_id: Option<Uuid>) -> app_user::Model {
        app_user::Model {
            id: Uuid::new_v4(),
            username: "u".into(),
            password_hash: "x".into(),
            role,
            email: "u@example.com".into(),
            department_id,
            created_at: Utc::now().into(),
            last_login: None,
        }
    }

    #[test]
    fn admin_and_hr_are_unrestricted() {
        let dept = Uuid::new_v4();
        assert!(can_access_department(&user(Role::Admin, None), dept));
        assert!(can_access_department(&user(Role::Hr, None), dept));
    }

    #[test]
    fn manager_is_confined_to_own_department() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        let manager = user(Role::Manager, Some(own));
        assert!(can_access_department(&manager, own));
        assert!(!can_access_department(&manager, other));
        assert!(ensure_department_access(&manager, other).is_err());
    }

    #[test]
    fn manager_without_department_is_denied() {
        let manager = user(Role::Manager, None);
        assert!(!can_access_department(&manager, Uuid::new_v4()));
    }

    #[test]
    fn only_admin_passes_admin_gate() {
        assert!(ensure_admin(&user(Role::Admin, None)).is_ok());
        for role in [Role::Hr, Role::Manager, Role::Employee] {
            assert!(ensure_admin(&user(role, None)).is_err());
        }
    }
}
