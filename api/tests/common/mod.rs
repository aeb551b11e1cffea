#![allow(dead_code)]

use api::employees::NewEmployee;
use chrono::{NaiveDate, Utc};
use entity::app_user::{self, Role};
use entity::department;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, Database, DatabaseBackend,
    DatabaseConnection, Statement,
};
use uuid::Uuid;

/// In-memory schema mirroring the Postgres migration. Uniqueness is left to
/// the service-level checks so tests can observe them directly.
pub async fn bootstrap_sqlite() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE department (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE app_user (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL,
            email TEXT NOT NULL,
            department_id TEXT REFERENCES department (id),
            created_at TEXT NOT NULL,
            last_login TEXT
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE employee (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            hire_date TEXT NOT NULL,
            job_title TEXT NOT NULL,
            department_id TEXT REFERENCES department (id),
            manager_id TEXT REFERENCES employee (id),
            salary_cents INTEGER,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            created_by TEXT REFERENCES app_user (id),
            updated_by TEXT REFERENCES app_user (id)
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE audit_trail (
            id TEXT PRIMARY KEY,
            table_name TEXT NOT NULL,
            record_id TEXT NOT NULL,
            action TEXT NOT NULL,
            old_values TEXT,
            new_values TEXT,
            changed_by TEXT REFERENCES app_user (id),
            changed_at TEXT NOT NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db
}

pub async fn seed_department(db: &DatabaseConnection, name: &str) -> department::Model {
    department::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_user(
    db: &DatabaseConnection,
    username: &str,
    role: Role,
    department_id: Option<Uuid>,
) -> app_user::Model {
    app_user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        password_hash: Set(api::users::hash_password("pass1234").unwrap()),
        role: Set(role),
        email: Set(format!("{username}@example.com")),
        department_id: Set(department_id),
        created_at: Set(Utc::now().into()),
        last_login: Set(None),
    }
    .insert(db)
    .await
    .unwrap()
}

pub fn employee_input(email: &str, department_id: Uuid) -> NewEmployee {
    NewEmployee {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: email.into(),
        hire_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        job_title: "Engineer".into(),
        department_id: Some(department_id),
        manager_id: None,
        salary_cents: Some(950_000),
        status: None,
    }
}
